//! Autocomplete, related searches and popular tags.

use serde::Serialize;

use crate::model::{BlogData, Category};
use crate::text::{contains_lower, encode_uri_component};

/// Most suggestions returned for one autocomplete query.
pub const MAX_SUGGESTIONS: usize = 8;

/// Most related searches attached to a result page.
pub const MAX_RELATED: usize = 5;

/// Most tags returned by [`popular_tags`].
pub const MAX_POPULAR_TAGS: usize = 10;

/// Keywords counted as tags in article text.
const TAG_KEYWORDS: [&str; 25] = [
    "javascript",
    "react",
    "nextjs",
    "node",
    "python",
    "html",
    "css",
    "tailwind",
    "vue",
    "angular",
    "typescript",
    "php",
    "java",
    "csharp",
    "gaming",
    "mobile",
    "web",
    "design",
    "tutorial",
    "beginners",
    "advanced",
    "performance",
    "seo",
    "security",
    "database",
];

/// Where a suggestion comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// A published article title.
    Article,
    /// A category name.
    Category,
    /// A user's display name.
    Author,
    /// A popular tag.
    Tag,
}

/// One autocomplete entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Text to show and search for.
    pub text: String,
    /// Source of the suggestion.
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    /// Front-end link.
    pub url: String,
}

/// Tag keywords found in published article text, most frequent first.
///
/// Ties keep keyword order.
#[must_use]
pub fn popular_tags(data: &BlogData) -> Vec<&'static str> {
    let text = data
        .articles
        .iter()
        .filter(|a| a.is_published())
        .map(|a| format!("{} {} {}", a.title, a.excerpt, a.content))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut counts: Vec<(&'static str, usize)> = TAG_KEYWORDS
        .iter()
        .map(|tag| (*tag, text.matches(tag).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_POPULAR_TAGS)
        .map(|(tag, _)| tag)
        .collect()
}

fn push_unique(out: &mut Vec<Suggestion>, text: String, kind: SuggestionKind, url: String) {
    if !out.iter().any(|s| s.text == text) {
        out.push(Suggestion { text, kind, url });
    }
}

/// Autocomplete suggestions for `query`.
///
/// Draws from published article titles, then category names, popular tags
/// and user names, keeping the first occurrence of each text.
#[must_use]
pub fn suggestions(data: &BlogData, query: &str) -> Vec<Suggestion> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for article in data.articles.iter().filter(|a| a.is_published()) {
        if contains_lower(&article.title, &term) {
            push_unique(
                &mut out,
                article.title.clone(),
                SuggestionKind::Article,
                format!("/blog/{}", article.slug),
            );
        }
    }
    for category in Category::ALL {
        if category.as_str().contains(&term) {
            push_unique(
                &mut out,
                category.as_str().to_string(),
                SuggestionKind::Category,
                format!("/blog?category={category}"),
            );
        }
    }
    for tag in popular_tags(data) {
        if tag.contains(&term) {
            push_unique(
                &mut out,
                tag.to_string(),
                SuggestionKind::Tag,
                format!("/blog?search={}", encode_uri_component(tag)),
            );
        }
    }
    for user in &data.users {
        if contains_lower(&user.name, &term) {
            push_unique(
                &mut out,
                user.name.clone(),
                SuggestionKind::Author,
                format!("/blog?search={}", encode_uri_component(&user.name)),
            );
        }
    }

    out.truncate(MAX_SUGGESTIONS);
    out
}

/// Related searches for a result page: categories and authors with
/// published articles whose title or excerpt matches, then matching tags.
#[must_use]
pub fn related_searches(data: &BlogData, query: &str) -> Vec<String> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let matching: Vec<_> = data
        .articles
        .iter()
        .filter(|a| a.is_published())
        .filter(|a| contains_lower(&a.title, &term) || contains_lower(&a.excerpt, &term))
        .collect();

    let mut related: Vec<String> = Vec::new();
    let mut add = |value: String| {
        if !related.contains(&value) {
            related.push(value);
        }
    };

    for category in Category::ALL {
        if matching.iter().any(|a| a.category == category) {
            add(category.as_str().to_string());
        }
    }
    for user in &data.users {
        if matching.iter().any(|a| a.author_id() == user.id) {
            add(user.name.clone());
        }
    }
    for tag in popular_tags(data) {
        if tag.contains(&term) {
            add(tag.to_string());
        }
    }

    related.truncate(MAX_RELATED);
    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, ArticleStatus, AuthorRef, Role, User};
    use chrono::Utc;

    fn article(title: &str, content: &str, category: Category) -> Article {
        Article {
            id: title.to_string(),
            title: title.to_string(),
            slug: crate::text::generate_slug(title),
            excerpt: String::new(),
            content: content.to_string(),
            category,
            image: None,
            author: AuthorRef {
                id: "u1".to_string(),
                name: "Josué Raoult".to_string(),
                avatar: String::new(),
            },
            published_at: Utc::now(),
            updated_at: Utc::now(),
            views: 0,
            likes: 0,
            reading_time: 1,
            status: ArticleStatus::Published,
        }
    }

    fn data() -> BlogData {
        BlogData {
            users: vec![User {
                id: "u1".to_string(),
                username: "root".to_string(),
                password: String::new(),
                name: "Josué Raoult".to_string(),
                email: "root@example.com".to_string(),
                avatar: String::new(),
                role: Role::Admin,
                created_at: Utc::now(),
                last_login: Utc::now(),
            }],
            articles: vec![
                article("React hooks", "react react react and css", Category::Tutorials),
                article("Gaming news", "gaming on mobile with react", Category::Gaming),
            ],
            ..BlogData::default()
        }
    }

    #[test]
    fn test_popular_tags_ordered_by_count() {
        let tags = popular_tags(&data());
        // "react" appears 5 times (titles and content), "gaming" twice.
        assert_eq!(tags[0], "react");
        assert!(tags.contains(&"gaming"));
        assert!(tags.contains(&"css"));
        assert!(!tags.contains(&"python"));
    }

    #[test]
    fn test_popular_tags_ignore_drafts() {
        let mut data = data();
        for article in &mut data.articles {
            article.status = ArticleStatus::Draft;
        }
        assert!(popular_tags(&data).is_empty());
    }

    #[test]
    fn test_suggestions_kinds_and_urls() {
        let found = suggestions(&data(), "gam");
        assert_eq!(found[0].text, "Gaming news");
        assert_eq!(found[0].kind, SuggestionKind::Article);
        assert_eq!(found[0].url, "/blog/gaming-news");
        assert_eq!(found[1].text, "gaming");
        assert_eq!(found[1].kind, SuggestionKind::Category);
        assert_eq!(found[1].url, "/blog?category=gaming");
        // The "gaming" tag is deduplicated against the category.
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_suggestions_author_url_encoded() {
        let found = suggestions(&data(), "josu");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, SuggestionKind::Author);
        assert_eq!(found[0].url, "/blog?search=Josu%C3%A9%20Raoult");
    }

    #[test]
    fn test_suggestions_capped_and_unique() {
        let mut data = data();
        for i in 0..12 {
            data.articles
                .push(article(&format!("Rust part {i}"), "", Category::News));
        }
        data.articles.push(article("Rust part 0", "", Category::News));

        let found = suggestions(&data, "rust");
        assert_eq!(found.len(), MAX_SUGGESTIONS);
        let mut texts: Vec<_> = found.iter().map(|s| s.text.clone()).collect();
        texts.dedup();
        assert_eq!(texts.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_suggestions_empty_query() {
        assert!(suggestions(&data(), "  ").is_empty());
    }

    #[test]
    fn test_related_searches() {
        let related = related_searches(&data(), "react");
        assert_eq!(related, vec!["tutorials", "Josué Raoult", "react"]);
        assert!(related_searches(&data(), "").is_empty());
    }
}
