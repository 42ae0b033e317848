//! Articles: writing, listing and slug management.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ensure_owner_or_admin, BlogDb};
use crate::error::{Error, Result};
use crate::model::{Article, ArticleStatus, AuthorRef, BlogData, Category};
use crate::text::{contains_lower, generate_id, generate_slug, paginate, reading_time, truncate};

/// Length of an excerpt derived from the content.
const EXCERPT_LENGTH: usize = 150;

/// Input for a new article.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    /// Headline; the slug is derived from it.
    pub title: String,
    /// Derived from the content when empty.
    #[serde(default)]
    pub excerpt: String,
    /// Markdown body.
    pub content: String,
    /// Category.
    pub category: Category,
    /// Cover image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Published unless stated otherwise.
    #[serde(default)]
    pub status: ArticleStatus,
}

/// Changes to an article. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    /// New headline; regenerates the slug.
    pub title: Option<String>,
    /// New summary.
    pub excerpt: Option<String>,
    /// New body; recomputes the reading time.
    pub content: Option<String>,
    /// New category.
    pub category: Option<Category>,
    /// New cover image.
    pub image: Option<String>,
    /// New publication state.
    pub status: Option<ArticleStatus>,
}

/// Which publication states a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Published articles only.
    #[default]
    Published,
    /// Drafts only.
    Draft,
    /// Everything.
    All,
}

impl StatusFilter {
    fn accepts(self, status: ArticleStatus) -> bool {
        match self {
            Self::Published => status == ArticleStatus::Published,
            Self::Draft => status == ArticleStatus::Draft,
            Self::All => true,
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleSort {
    /// Most recently published first.
    #[default]
    Newest,
    /// Highest views plus ten per like first.
    Popular,
    /// Popularity boosted for articles younger than 100 hours.
    Trending,
}

/// Article listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleQuery {
    /// Restrict to one category.
    pub category: Option<Category>,
    /// Publication states to include.
    pub status: StatusFilter,
    /// Case-insensitive text that must appear in the title, excerpt or content.
    pub search: Option<String>,
    /// Ordering.
    pub sort: ArticleSort,
    /// 1-based page. Paging only happens when `limit` is set.
    pub page: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
}

/// Views plus ten points per like.
#[must_use]
pub fn popularity_score(article: &Article) -> u64 {
    article.views.saturating_add(article.likes.saturating_mul(10))
}

/// Popularity plus one point for each hour the article is younger than 100
/// hours.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trending_score(article: &Article, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - article.published_at).num_seconds() as f64 / 3600.0;
    popularity_score(article) as f64 + (100.0 - age_hours).max(0.0)
}

/// Filter, order and page articles.
pub(crate) fn select_articles(
    data: &BlogData,
    query: &ArticleQuery,
    now: DateTime<Utc>,
) -> Vec<Article> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut articles: Vec<Article> = data
        .articles
        .iter()
        .filter(|a| query.status.accepts(a.status))
        .filter(|a| query.category.is_none_or(|c| a.category == c))
        .filter(|a| {
            needle.as_deref().is_none_or(|n| {
                contains_lower(&a.title, n)
                    || contains_lower(&a.excerpt, n)
                    || contains_lower(&a.content, n)
            })
        })
        .cloned()
        .collect();

    match query.sort {
        ArticleSort::Newest => articles.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        ArticleSort::Popular => {
            articles.sort_by_key(|a| std::cmp::Reverse(popularity_score(a)));
        }
        ArticleSort::Trending => articles.sort_by(|a, b| {
            trending_score(b, now).total_cmp(&trending_score(a, now))
        }),
    }

    match query.limit {
        Some(limit) => paginate(articles, query.page.unwrap_or(1), limit).0,
        None => articles,
    }
}

/// Remove articles and everything that hangs off them.
///
/// Returns the number of articles removed.
pub(crate) fn remove_articles(data: &mut BlogData, ids: &HashSet<&str>) -> usize {
    let before = data.articles.len();
    data.articles.retain(|a| !ids.contains(a.id.as_str()));

    let removed_comments: HashSet<String> = data
        .comments
        .iter()
        .filter(|c| ids.contains(c.article_id.as_str()))
        .map(|c| c.id.clone())
        .collect();
    data.comments.retain(|c| !removed_comments.contains(&c.id));
    data.comment_likes
        .retain(|l| !removed_comments.contains(&l.comment_id));
    data.likes.retain(|l| !ids.contains(l.article_id.as_str()));
    data.bookmarks.retain(|b| !ids.contains(b.article_id.as_str()));

    before - data.articles.len()
}

fn ensure_unique_slug(data: &BlogData, slug: &str, except_id: Option<&str>) -> Result<()> {
    if slug.is_empty() {
        return Err(Error::invalid("title must contain letters or digits"));
    }
    if data
        .articles
        .iter()
        .any(|a| a.slug == slug && Some(a.id.as_str()) != except_id)
    {
        return Err(Error::conflict(format!(
            "an article with slug '{slug}' already exists"
        )));
    }
    Ok(())
}

impl BlogDb {
    /// Publish a new article written by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty title or content,
    /// [`Error::NotFound`] for an unknown author and [`Error::Conflict`] when
    /// the title's slug is taken.
    pub fn create_article(&self, input: NewArticle, author_id: &str) -> Result<Article> {
        let title = input.title.trim().to_string();
        if title.is_empty() || input.content.trim().is_empty() {
            return Err(Error::invalid("title and content are required"));
        }
        let slug = generate_slug(&title);

        let article = self.mutate(|data| {
            ensure_unique_slug(data, &slug, None)?;
            let author = data
                .user(author_id)
                .map(AuthorRef::from)
                .ok_or_else(|| Error::not_found("user", author_id))?;

            let now = Utc::now();
            let excerpt = if input.excerpt.trim().is_empty() {
                truncate(&input.content, EXCERPT_LENGTH)
            } else {
                input.excerpt
            };
            let article = Article {
                id: generate_id(),
                title,
                slug,
                excerpt,
                reading_time: reading_time(&input.content),
                content: input.content,
                category: input.category,
                image: input.image.filter(|i| !i.trim().is_empty()),
                author,
                published_at: now,
                updated_at: now,
                views: 0,
                likes: 0,
                status: input.status,
            };
            data.articles.insert(0, article.clone());
            Ok(article)
        })?;

        info!("Created article '{}' ({})", article.title, article.slug);
        Ok(article)
    }

    /// Change an article. Only its author or an admin may do this.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Forbidden`],
    /// [`Error::InvalidInput`] for an empty title, or [`Error::Conflict`]
    /// when a new title's slug is taken.
    pub fn update_article(
        &self,
        article_id: &str,
        update: ArticleUpdate,
        user_id: &str,
    ) -> Result<Article> {
        self.mutate(|data| {
            let article = data
                .article(article_id)
                .ok_or_else(|| Error::not_found("article", article_id))?;
            ensure_owner_or_admin(data, article.author_id(), user_id)?;

            let new_slug = match update.title.as_deref().map(str::trim) {
                Some("") => return Err(Error::invalid("title cannot be empty")),
                Some(title) => {
                    let slug = generate_slug(title);
                    ensure_unique_slug(data, &slug, Some(article_id))?;
                    Some(slug)
                }
                None => None,
            };

            let article = data
                .article_mut(article_id)
                .ok_or_else(|| Error::not_found("article", article_id))?;
            if let (Some(title), Some(slug)) = (update.title, new_slug) {
                article.title = title.trim().to_string();
                article.slug = slug;
            }
            if let Some(excerpt) = update.excerpt {
                article.excerpt = excerpt;
            }
            if let Some(content) = update.content {
                article.reading_time = reading_time(&content);
                article.content = content;
            }
            if let Some(category) = update.category {
                article.category = category;
            }
            if let Some(image) = update.image {
                article.image = Some(image).filter(|i| !i.trim().is_empty());
            }
            if let Some(status) = update.status {
                article.status = status;
            }
            article.updated_at = Utc::now();
            Ok(article.clone())
        })
    }

    /// Delete an article with its comments, likes and bookmarks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn delete_article(&self, article_id: &str, user_id: &str) -> Result<()> {
        self.mutate(|data| {
            let article = data
                .article(article_id)
                .ok_or_else(|| Error::not_found("article", article_id))?;
            ensure_owner_or_admin(data, article.author_id(), user_id)?;
            remove_articles(data, &HashSet::from([article_id]));
            Ok(())
        })?;
        info!("Deleted article {}", article_id);
        Ok(())
    }

    /// List articles.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        Ok(select_articles(&self.load_data()?, query, Utc::now()))
    }

    /// Look up an article by id without counting a view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get_article(&self, article_id: &str) -> Result<Article> {
        self.load_data()?
            .article(article_id)
            .cloned()
            .ok_or_else(|| Error::not_found("article", article_id))
    }

    /// Read an article by slug, counting one view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown slug.
    pub fn get_article_by_slug(&self, slug: &str) -> Result<Article> {
        self.mutate(|data| {
            let article = data
                .articles
                .iter_mut()
                .find(|a| a.slug == slug)
                .ok_or_else(|| Error::not_found("article", slug))?;
            article.views = article.views.saturating_add(1);
            Ok(article.clone())
        })
    }

    /// Published articles by one author, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_articles_by_author(&self, author_id: &str) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .load_data()?
            .articles
            .into_iter()
            .filter(|a| a.author_id() == author_id && a.is_published())
            .collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(articles)
    }
}
