//! Site administration: statistics, settings, bulk actions and backups.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::articles::{remove_articles, select_articles, ArticleQuery, ArticleSort};
use super::BlogDb;
use crate::error::{Error, Result};
use crate::model::{Article, ArticleStatus, BlogData, Comment, Settings};

/// Number of articles in the popular list.
const POPULAR_COUNT: usize = 5;

/// Number of recent items on the dashboard.
const RECENT_COUNT: usize = 5;

/// Site-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogStats {
    /// Articles, drafts included.
    pub total_articles: usize,
    /// Accounts.
    pub total_users: usize,
    /// Comments, approved or not.
    pub total_comments: usize,
    /// Article likes.
    pub total_likes: usize,
    /// Most popular published articles.
    pub popular_articles: Vec<Article>,
}

/// Admin landing page data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Site counters.
    pub stats: BlogStats,
    /// Latest published articles.
    pub recent_articles: Vec<Article>,
    /// Latest comments.
    pub recent_comments: Vec<Comment>,
}

/// Settings changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// Header title.
    pub site_title: Option<String>,
    /// `auto` or a supported language.
    pub language: Option<String>,
    /// Front-end theme.
    pub theme: Option<String>,
}

/// An action applied to many articles at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    /// Mark as published.
    Publish,
    /// Mark as draft.
    Unpublish,
    /// Delete with comments, likes and bookmarks.
    Delete,
}

fn compute_stats(data: &BlogData) -> BlogStats {
    let popular = select_articles(
        data,
        &ArticleQuery {
            sort: ArticleSort::Popular,
            limit: Some(POPULAR_COUNT),
            ..ArticleQuery::default()
        },
        Utc::now(),
    );
    BlogStats {
        total_articles: data.articles.len(),
        total_users: data.users.len(),
        total_comments: data.comments.len(),
        total_likes: data.likes.len(),
        popular_articles: popular,
    }
}

/// Check that a blob is safe to install as the whole blog.
fn validate_import(data: &BlogData) -> Result<()> {
    if !data.users.iter().any(crate::model::User::is_admin) {
        return Err(Error::invalid("imported data must contain an admin account"));
    }
    let mut slugs = HashSet::new();
    if let Some(dup) = data.articles.iter().find(|a| !slugs.insert(a.slug.as_str())) {
        return Err(Error::invalid(format!(
            "imported data has duplicate slug '{}'",
            dup.slug
        )));
    }
    let mut ids = HashSet::new();
    if let Some(dup) = data.users.iter().find(|u| !ids.insert(u.id.as_str())) {
        return Err(Error::invalid(format!(
            "imported data has duplicate user id '{}'",
            dup.id
        )));
    }
    Ok(())
}

impl BlogDb {
    /// Site counters and the most popular articles.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_stats(&self) -> Result<BlogStats> {
        Ok(compute_stats(&self.load_data()?))
    }

    /// Counters plus the latest articles and comments.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn dashboard(&self) -> Result<Dashboard> {
        let data = self.load_data()?;
        let recent_articles = select_articles(
            &data,
            &ArticleQuery {
                limit: Some(RECENT_COUNT),
                ..ArticleQuery::default()
            },
            Utc::now(),
        );
        let mut recent_comments = data.comments.clone();
        recent_comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_comments.truncate(RECENT_COUNT);

        Ok(Dashboard {
            stats: compute_stats(&data),
            recent_articles,
            recent_comments,
        })
    }

    /// Current site settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.load_data()?.settings)
    }

    /// Change site settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty title or an unsupported
    /// language.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        if let Some(language) = &update.language {
            self.check_language(language)?;
        }
        if update.site_title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::invalid("site title cannot be empty"));
        }

        let settings = self.mutate(|data| {
            if let Some(title) = update.site_title {
                data.settings.site_title = title.trim().to_string();
            }
            if let Some(language) = update.language {
                data.settings.language = language;
            }
            if let Some(theme) = update.theme {
                data.settings.theme = theme;
            }
            Ok(data.settings.clone())
        })?;
        info!("Settings updated");
        Ok(settings)
    }

    /// Set the display language preference (`auto` or a supported language).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unsupported language.
    pub fn update_language_preference(&self, language: &str) -> Result<Settings> {
        self.update_settings(SettingsUpdate {
            language: Some(language.to_string()),
            ..SettingsUpdate::default()
        })
    }

    fn check_language(&self, language: &str) -> Result<()> {
        let supported = &self.config.site.supported_languages;
        if language == "auto" || supported.iter().any(|l| l == language) {
            Ok(())
        } else {
            Err(Error::invalid(format!("unsupported language: {language}")))
        }
    }

    /// Pick the display language.
    ///
    /// A stored preference other than `auto` wins. Otherwise the first
    /// supported primary tag in `accept_language` (an `Accept-Language`
    /// style list) is used, falling back to the configured default.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn detect_language(&self, accept_language: Option<&str>) -> Result<String> {
        let preference = self.load_data()?.settings.language;
        if preference != "auto" && self.check_language(&preference).is_ok() {
            return Ok(preference);
        }

        let supported = &self.config.site.supported_languages;
        let detected = accept_language
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|tag| tag.split(';').next())
            .filter_map(|tag| tag.trim().split(['-', '_']).next())
            .map(str::to_lowercase)
            .find(|tag| supported.contains(tag));

        Ok(detected.unwrap_or_else(|| self.config.site.default_language.clone()))
    }

    /// Apply `action` to every listed article. Unknown ids are skipped.
    ///
    /// Returns the number of articles affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn bulk_action(&self, action: BulkAction, ids: &[String]) -> Result<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let affected = self.mutate(|data| {
            let status = match action {
                BulkAction::Delete => return Ok(remove_articles(data, &wanted)),
                BulkAction::Publish => ArticleStatus::Published,
                BulkAction::Unpublish => ArticleStatus::Draft,
            };
            let now = Utc::now();
            let mut count = 0;
            for article in data.articles.iter_mut().filter(|a| wanted.contains(a.id.as_str())) {
                article.status = status;
                article.updated_at = now;
                count += 1;
            }
            Ok(count)
        })?;

        if affected < wanted.len() {
            warn!("Bulk {:?}: {} of {} ids matched", action, affected, wanted.len());
        }
        info!("Bulk {:?} applied to {} articles", action, affected);
        Ok(affected)
    }

    /// Snapshot of the whole blog, including password hashes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn export_data(&self) -> Result<BlogData> {
        self.load_data()
    }

    /// Replace the whole blog with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the data has no admin account or
    /// repeats a slug or user id.
    pub fn import_data(&self, data: &BlogData) -> Result<()> {
        validate_import(data)?;
        self.save_data(data)?;
        info!(
            "Imported {} users, {} articles, {} comments",
            data.users.len(),
            data.articles.len(),
            data.comments.len()
        );
        Ok(())
    }

    /// Replace the whole blog with a JSON export.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for malformed JSON, and everything
    /// [`BlogDb::import_data`] returns.
    pub fn import_json(&self, json: &str) -> Result<()> {
        let data: BlogData = serde_json::from_str(json)
            .map_err(|e| Error::invalid(format!("invalid import data: {e}")))?;
        self.import_data(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::test_support::*;
    use crate::blog::{NewArticle, NewComment};
    use crate::model::Category;

    fn add_article(db: &BlogDb, title: &str) -> Article {
        db.create_article(
            NewArticle {
                title: title.to_string(),
                excerpt: String::new(),
                content: "Body".to_string(),
                category: Category::News,
                image: None,
                status: ArticleStatus::Published,
            },
            &admin_id(db),
        )
        .unwrap()
    }

    #[test]
    fn test_get_stats() {
        let db = open_test_db();
        let alice = register(&db, "alice");
        let welcome = db.load_data().unwrap().articles[0].id.clone();
        db.toggle_like(&welcome, &alice).unwrap();
        db.create_comment(
            NewComment {
                article_id: welcome.clone(),
                content: "Hi".to_string(),
                parent_id: None,
            },
            &alice,
        )
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_articles, 1);
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_comments, 1);
        assert_eq!(stats.total_likes, 1);
        assert_eq!(stats.popular_articles[0].id, welcome);
    }

    #[test]
    fn test_stats_count_drafts() {
        let db = open_test_db();
        db.create_article(
            NewArticle {
                title: "Work in progress".to_string(),
                excerpt: String::new(),
                content: "Body".to_string(),
                category: Category::News,
                image: None,
                status: ArticleStatus::Draft,
            },
            &admin_id(&db),
        )
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_articles, 2);
        assert_eq!(stats.popular_articles.len(), 1);
    }

    #[test]
    fn test_popular_articles_capped() {
        let db = open_empty_db();
        for i in 0..7 {
            add_article(&db, &format!("Article {i}"));
        }
        assert_eq!(db.get_stats().unwrap().popular_articles.len(), 5);
    }

    #[test]
    fn test_dashboard() {
        let db = open_test_db();
        let dashboard = db.dashboard().unwrap();
        assert_eq!(dashboard.recent_articles.len(), 1);
        assert!(dashboard.recent_comments.is_empty());
        assert_eq!(dashboard.stats.total_users, 1);
    }

    #[test]
    fn test_update_settings() {
        let db = open_test_db();
        let settings = db
            .update_settings(SettingsUpdate {
                site_title: Some("My Blog".to_string()),
                theme: Some("dark".to_string()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(settings.site_title, "My Blog");
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.language, "auto");
        assert_eq!(db.settings().unwrap(), settings);
    }

    #[test]
    fn test_update_settings_rejects_bad_language() {
        let db = open_test_db();
        assert!(matches!(
            db.update_language_preference("de"),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(db.update_language_preference("es").unwrap().language, "es");
    }

    #[test]
    fn test_detect_language() {
        let db = open_test_db();
        assert_eq!(db.detect_language(Some("en-US,en;q=0.9")).unwrap(), "en");
        assert_eq!(db.detect_language(Some("de-DE, es;q=0.8")).unwrap(), "es");
        assert_eq!(db.detect_language(Some("de")).unwrap(), "fr");
        assert_eq!(db.detect_language(None).unwrap(), "fr");

        db.update_language_preference("es").unwrap();
        assert_eq!(db.detect_language(Some("en")).unwrap(), "es");
    }

    #[test]
    fn test_bulk_publish_and_delete() {
        let db = open_empty_db();
        let a = add_article(&db, "A");
        let b = add_article(&db, "B");

        let ids = vec![a.id.clone(), b.id.clone(), "missing".to_string()];
        assert_eq!(db.bulk_action(BulkAction::Unpublish, &ids).unwrap(), 2);
        assert!(db.get_articles(&ArticleQuery::default()).unwrap().is_empty());

        assert_eq!(db.bulk_action(BulkAction::Publish, &ids[..1]).unwrap(), 1);
        assert_eq!(db.get_articles(&ArticleQuery::default()).unwrap().len(), 1);

        assert_eq!(db.bulk_action(BulkAction::Delete, &ids).unwrap(), 2);
        assert!(db.load_data().unwrap().articles.is_empty());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let db = open_test_db();
        register(&db, "alice");
        let exported = serde_json::to_string(&db.export_data().unwrap()).unwrap();

        let other = open_empty_db();
        other.import_json(&exported).unwrap();
        assert_eq!(other.export_data().unwrap(), db.export_data().unwrap());
    }

    #[test]
    fn test_import_rejects_bad_data() {
        let db = open_test_db();
        assert!(matches!(
            db.import_json("{oops"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            db.import_json(r#"{"users": []}"#),
            Err(Error::InvalidInput(_))
        ));

        let mut data = db.export_data().unwrap();
        let copy = data.articles[0].clone();
        data.articles.push(copy);
        assert!(matches!(db.import_data(&data), Err(Error::InvalidInput(_))));

        // Nothing was replaced.
        assert_eq!(db.load_data().unwrap().articles.len(), 1);
    }
}
