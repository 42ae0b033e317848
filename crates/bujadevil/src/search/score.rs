//! Relevance scoring.
//!
//! Scores add fixed weights for every field containing the term
//! (case-insensitive) plus a small popularity bonus. An empty term scores 0.

use crate::model::{Article, Comment, PublicUser};
use crate::text::contains_lower;

/// Score an article against a search term.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn article_score(article: &Article, term: &str) -> f64 {
    let term = term.to_lowercase();
    if term.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if contains_lower(&article.title, &term) {
        score += 10.0;
    }
    if contains_lower(&article.excerpt, &term) {
        score += 5.0;
    }
    if contains_lower(&article.content, &term) {
        score += 3.0;
    }
    if contains_lower(&article.author.name, &term) {
        score += 2.0;
    }
    score + (article.views as f64 + 1.0).ln() * 0.1 + article.likes as f64 * 0.05
}

/// Score a comment against a search term.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn comment_score(comment: &Comment, term: &str) -> f64 {
    let term = term.to_lowercase();
    if term.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if contains_lower(&comment.content, &term) {
        score += 8.0;
    }
    if contains_lower(&comment.author.name, &term) {
        score += 4.0;
    }
    score + comment.likes as f64 * 0.1
}

/// Score a user against a search term.
#[must_use]
pub fn user_score(user: &PublicUser, term: &str) -> f64 {
    let term = term.to_lowercase();
    if term.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if contains_lower(&user.name, &term) {
        score += 10.0;
    }
    if contains_lower(&user.email, &term) {
        score += 8.0;
    }
    if contains_lower(&user.username, &term) {
        score += 6.0;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArticleStatus, AuthorRef, Category, Role};
    use chrono::Utc;

    fn article(title: &str, content: &str) -> Article {
        Article {
            id: "a".to_string(),
            title: title.to_string(),
            slug: "a".to_string(),
            excerpt: String::new(),
            content: content.to_string(),
            category: Category::News,
            image: None,
            author: AuthorRef {
                id: "u".to_string(),
                name: "Josué".to_string(),
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

    #[test]
    fn test_article_score_weights() {
        assert!((article_score(&article("Rust", ""), "rust") - 10.0).abs() < 1e-9);
        assert!((article_score(&article("", "rust"), "RUST") - 3.0).abs() < 1e-9);
        assert!((article_score(&article("Rust", "rust"), "rust") - 13.0).abs() < 1e-9);
        assert!((article_score(&article("x", "y"), "josué") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_article_popularity_bonus() {
        let mut popular = article("Rust", "");
        popular.views = 99;
        popular.likes = 20;
        let expected = 10.0 + 100f64.ln() * 0.1 + 1.0;
        assert!((article_score(&popular, "rust") - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_term_scores_zero() {
        let mut popular = article("Rust", "");
        popular.views = 1000;
        assert!(article_score(&popular, "").abs() < f64::EPSILON);
    }

    #[test]
    fn test_user_score() {
        let user = PublicUser {
            id: "u".to_string(),
            username: "alice".to_string(),
            name: "Alice Liddell".to_string(),
            email: "alice@example.com".to_string(),
            avatar: String::new(),
            role: Role::User,
            created_at: Utc::now(),
            last_login: Utc::now(),
        };
        assert!((user_score(&user, "alice") - 24.0).abs() < 1e-9);
        assert!((user_score(&user, "example") - 8.0).abs() < 1e-9);
        assert!(user_score(&user, "bob").abs() < f64::EPSILON);
    }
}
