//! Full-text search over articles, comments and users.
//!
//! Search works on a loaded [`BlogData`] snapshot and never writes. Matching
//! is case-insensitive substring containment; ranking uses the weights in
//! [`score`]. Matched fields are returned with `<mark>` highlighting.

pub mod score;
pub mod suggest;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::SearchConfig;
use crate::model::{Article, BlogData, Category, Comment, PublicUser};
use crate::text::{contains_lower, highlight, paginate, Pagination};

pub use score::{article_score, comment_score, user_score};
pub use suggest::{popular_tags, related_searches, suggestions, Suggestion, SuggestionKind};

/// Which record kinds a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Articles, comments and users.
    #[default]
    All,
    /// Published articles.
    Articles,
    /// Approved comments.
    Comments,
    /// Accounts.
    Users,
}

impl SearchKind {
    fn includes(self, other: SearchKind) -> bool {
        self == SearchKind::All || self == other
    }
}

impl std::str::FromStr for SearchKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "articles" => Ok(Self::Articles),
            "comments" => Ok(Self::Comments),
            "users" => Ok(Self::Users),
            other => Err(crate::error::Error::invalid(format!(
                "unknown search type: {other}"
            ))),
        }
    }
}

/// Parse a category filter where `all` (or nothing) means no filter.
///
/// # Errors
///
/// Returns [`crate::error::Error::InvalidInput`] for an unknown category.
pub fn parse_category_filter(value: Option<&str>) -> crate::error::Result<Option<Category>> {
    match value.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(name) => name.parse().map(Some),
    }
}

fn deserialize_category_filter<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    parse_category_filter(value.as_deref()).map_err(serde::de::Error::custom)
}

/// Clamp a requested page size to the configured bounds.
#[must_use]
pub fn resolve_limit(requested: Option<usize>, config: &SearchConfig) -> usize {
    requested
        .filter(|l| *l > 0)
        .unwrap_or(config.default_limit)
        .min(config.max_limit)
}

/// Parameters of a simple search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Search term.
    pub query: String,
    /// Record kinds to search.
    pub kind: SearchKind,
    /// Restrict articles to one category.
    pub category: Option<Category>,
    /// 1-based page.
    pub page: usize,
    /// Page size.
    pub limit: usize,
}

/// The record a hit points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HitRecord {
    /// An article, excerpt highlighted.
    Article(Article),
    /// A comment, content highlighted.
    Comment(Comment),
    /// An account.
    User(PublicUser),
}

/// Kind label of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    /// See [`HitRecord::Article`].
    Article,
    /// See [`HitRecord::Comment`].
    Comment,
    /// See [`HitRecord::User`].
    User,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Record kind.
    #[serde(rename = "type")]
    pub kind: HitKind,
    /// The record itself, flattened into the hit.
    #[serde(flatten)]
    pub record: HitRecord,
    /// Relevance score.
    #[serde(rename = "_score")]
    pub score: f64,
    /// Highlighted copies of the matched fields.
    #[serde(rename = "_highlight")]
    pub highlight: BTreeMap<&'static str, String>,
}

impl SearchHit {
    fn article(mut article: Article, term: &str) -> Self {
        let score = article_score(&article, term);
        let excerpt = highlight(&article.excerpt, term);
        let highlight = BTreeMap::from([
            ("title", highlight(&article.title, term)),
            ("excerpt", excerpt.clone()),
        ]);
        article.excerpt = excerpt;
        Self {
            kind: HitKind::Article,
            record: HitRecord::Article(article),
            score,
            highlight,
        }
    }

    fn comment(mut comment: Comment, term: &str) -> Self {
        let score = comment_score(&comment, term);
        let content = highlight(&comment.content, term);
        let highlight = BTreeMap::from([("content", content.clone())]);
        comment.content = content;
        Self {
            kind: HitKind::Comment,
            record: HitRecord::Comment(comment),
            score,
            highlight,
        }
    }

    fn user(user: PublicUser, term: &str) -> Self {
        let score = user_score(&user, term);
        let highlight = BTreeMap::from([
            ("name", highlight(&user.name, term)),
            ("email", highlight(&user.email, term)),
        ]);
        Self {
            kind: HitKind::User,
            record: HitRecord::User(user),
            score,
            highlight,
        }
    }
}

/// Hit counts per kind, before paging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// All hits.
    pub total: usize,
    /// Article hits.
    pub articles: usize,
    /// Comment hits.
    pub comments: usize,
    /// User hits.
    pub users: usize,
}

impl SearchStats {
    fn count(hits: &[SearchHit]) -> Self {
        let of = |kind| hits.iter().filter(|h| h.kind == kind).count();
        Self {
            total: hits.len(),
            articles: of(HitKind::Article),
            comments: of(HitKind::Comment),
            users: of(HitKind::User),
        }
    }
}

/// Echo of the filters a search ran with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFilters {
    /// Search term.
    pub query: String,
    /// Record kinds.
    #[serde(rename = "type")]
    pub kind: SearchKind,
    /// Category filter.
    pub category: Option<Category>,
    /// Page size.
    pub limit: usize,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    /// Hits on this page.
    pub results: Vec<SearchHit>,
    /// Paging metadata.
    pub pagination: Pagination,
    /// Counts across all pages.
    pub stats: SearchStats,
    /// Related searches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    /// Filters that were applied.
    pub filters: SearchFilters,
}

/// Search articles, comments and users.
///
/// Only published articles (in the requested category) and approved
/// comments are searched. An empty query finds nothing.
#[must_use]
pub fn search(data: &BlogData, params: &SearchParams) -> SearchResults {
    let term = params.query.trim();
    let needle = term.to_lowercase();
    let mut hits = Vec::new();

    if !needle.is_empty() {
        if params.kind.includes(SearchKind::Articles) {
            hits.extend(
                data.articles
                    .iter()
                    .filter(|a| a.is_published())
                    .filter(|a| params.category.is_none_or(|c| a.category == c))
                    .filter(|a| {
                        contains_lower(&a.title, &needle)
                            || contains_lower(&a.excerpt, &needle)
                            || contains_lower(&a.content, &needle)
                            || contains_lower(&a.author.name, &needle)
                    })
                    .map(|a| SearchHit::article(a.clone(), term)),
            );
        }
        if params.kind.includes(SearchKind::Comments) {
            hits.extend(
                data.comments
                    .iter()
                    .filter(|c| c.is_approved)
                    .filter(|c| {
                        contains_lower(&c.content, &needle)
                            || contains_lower(&c.author.name, &needle)
                    })
                    .map(|c| SearchHit::comment(c.clone(), term)),
            );
        }
        if params.kind.includes(SearchKind::Users) {
            hits.extend(
                data.users
                    .iter()
                    .filter(|u| {
                        contains_lower(&u.name, &needle)
                            || contains_lower(&u.email, &needle)
                            || contains_lower(&u.username, &needle)
                    })
                    .map(|u| SearchHit::user(PublicUser::from(u), term)),
            );
        }
    }

    // Stable, so equal scores keep article/comment/user order.
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    let stats = SearchStats::count(&hits);
    let (results, pagination) = paginate(hits, params.page, params.limit);
    SearchResults {
        results,
        pagination,
        stats,
        related: related_searches(data, term),
        filters: SearchFilters {
            query: params.query.clone(),
            kind: params.kind,
            category: params.category,
            limit: params.limit,
        },
    }
}

/// Inclusive publication date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest publication time.
    #[serde(default, deserialize_with = "deserialize_bound")]
    pub start: Option<DateTime<Utc>>,
    /// Latest publication time.
    #[serde(default, deserialize_with = "deserialize_bound")]
    pub end: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_bound(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn deserialize_bound<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_bound(value.trim())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{value}'"))),
    }
}

impl DateRange {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end.is_none_or(|e| at <= e)
    }
}

/// Ordering of advanced search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    /// Highest relevance first.
    #[default]
    Relevance,
    /// Most recently published first.
    Newest,
    /// Oldest first.
    Oldest,
    /// Highest views plus ten per like first.
    Popular,
}

/// Parameters of an advanced article search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSearchParams {
    /// Text in the title, excerpt or content.
    pub query: String,
    /// Echoed back; advanced search only covers articles.
    #[serde(rename = "type")]
    pub kind: SearchKind,
    /// Category filter; `all` means none.
    #[serde(deserialize_with = "deserialize_category_filter")]
    pub category: Option<Category>,
    /// Any of these must appear in the title, excerpt or content.
    pub tags: Vec<String>,
    /// Substring of the author's name.
    pub author: String,
    /// Publication date bounds.
    pub date_range: DateRange,
    /// Ordering.
    pub sort_by: SearchSort,
    /// Page size.
    pub limit: Option<usize>,
    /// 1-based page.
    pub page: Option<usize>,
}

/// Search published articles with structured filters.
///
/// `limit` is the already-resolved page size.
#[must_use]
pub fn advanced_search(
    data: &BlogData,
    params: &AdvancedSearchParams,
    limit: usize,
) -> SearchResults {
    let term = params.query.trim();
    let needle = term.to_lowercase();
    let author = params.author.trim().to_lowercase();
    let tags: Vec<String> = params
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let in_text = |a: &Article, n: &str| {
        contains_lower(&a.title, n)
            || contains_lower(&a.excerpt, n)
            || contains_lower(&a.content, n)
    };

    let mut articles: Vec<&Article> = data
        .articles
        .iter()
        .filter(|a| a.is_published())
        .filter(|a| needle.is_empty() || in_text(a, &needle))
        .filter(|a| params.category.is_none_or(|c| a.category == c))
        .filter(|a| tags.is_empty() || tags.iter().any(|t| in_text(a, t)))
        .filter(|a| author.is_empty() || contains_lower(&a.author.name, &author))
        .filter(|a| params.date_range.contains(a.published_at))
        .collect();

    match params.sort_by {
        SearchSort::Relevance => {
            articles.sort_by(|a, b| article_score(b, term).total_cmp(&article_score(a, term)));
        }
        SearchSort::Newest => articles.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SearchSort::Oldest => articles.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        SearchSort::Popular => {
            articles.sort_by_key(|a| std::cmp::Reverse(crate::blog::popularity_score(a)));
        }
    }

    let hits: Vec<SearchHit> = articles
        .into_iter()
        .map(|a| SearchHit::article(a.clone(), term))
        .collect();
    let stats = SearchStats::count(&hits);
    let (results, pagination) = paginate(hits, params.page.unwrap_or(1), limit);

    SearchResults {
        results,
        pagination,
        stats,
        related: Vec::new(),
        filters: SearchFilters {
            query: params.query.clone(),
            kind: params.kind,
            category: params.category,
            limit,
        },
    }
}
