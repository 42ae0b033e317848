//! The blog's data-access object.
//!
//! [`BlogDb`] keeps the entire blog in one JSON document stored under
//! [`DATA_KEY`]. Reads deserialize the whole document; writes go through
//! [`BlogDb::mutate`], which loads, changes and stores the document inside a
//! single storage transaction so concurrent writers cannot lose updates.
//!
//! Operations are split by concern:
//!
//! - `users`: registration, login, sessions, profiles, admin tokens
//! - `articles`: publishing, listing, slugs
//! - `comments`: comments, replies, comment likes, moderation
//! - `interactions`: article likes, bookmarks, notifications
//! - `admin`: statistics, settings, bulk actions, export/import

mod admin;
mod articles;
mod comments;
mod interactions;
mod users;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::hash_password;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    Article, ArticleStatus, AuthorRef, BlogData, Category, Role, Settings, User,
};
use crate::storage::Storage;
use crate::text::{generate_id, generate_slug, reading_time};

pub use admin::{BlogStats, BulkAction, Dashboard, SettingsUpdate};
pub use articles::{
    popularity_score, trending_score, ArticleQuery, ArticleSort, ArticleUpdate, NewArticle,
    StatusFilter,
};
pub use comments::{CommentLikeToggle, CommentWithArticle, NewComment};
pub use interactions::LikeToggle;
pub use users::{AdminLogin, AuthSession, NewUser, ProfileUpdate};

/// Storage key holding the serialized [`BlogData`].
pub const DATA_KEY: &str = "bujadevil_data";

/// Storage key holding the token of the locally remembered session.
pub const SESSION_KEY: &str = "bujadevil_session";

const WELCOME_TITLE: &str = "Bienvenue sur BujaDevil";

const WELCOME_EXCERPT: &str =
    "Découvrez le blog moderne de Josué Raoult dédié à la tech, gaming et développement.";

const WELCOME_CONTENT: &str = "# Bienvenue sur BujaDevil 👋

Bienvenue sur mon blog personnel ! Je suis Josué Raoult, un passionné de technologie.

## Ce que vous trouverez ici

- **News** : Les dernières actualités tech
- **Gaming** : Reviews et analyses de jeux
- **Apps** : Démonstrations d'applications
- **Tutoriels** : Guides pas à pas

Restez connecté pour du contenu frais et excitant ! 🚀";

const WELCOME_IMAGE: &str =
    "https://images.unsplash.com/photo-1555066931-4365d14bab8c?w=800&h=400&fit=crop";

/// Data-access object over the blog document.
#[derive(Debug)]
pub struct BlogDb {
    storage: Storage,
    config: Config,
}

impl BlogDb {
    /// Open the blog on top of `storage`, seeding it on first use.
    ///
    /// A fresh store receives the configured admin account, default settings
    /// and (unless disabled) a welcome article.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn open(storage: Storage, config: Config) -> Result<Self> {
        let db = Self { storage, config };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory blog, mostly useful for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory store cannot be created.
    pub fn open_in_memory(config: Config) -> Result<Self> {
        Self::open(Storage::open_in_memory()?, config)
    }

    /// The configuration this blog was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying key/value store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn initialize(&self) -> Result<()> {
        let seeded = self.storage.update_item(DATA_KEY, |current| match current {
            Some(existing) => Ok((existing, false)),
            None => Ok((serde_json::to_string(&self.initial_data())?, true)),
        })?;

        if seeded {
            info!("Initialized blog data with admin account '{}'", self.config.site.admin.username);
        } else {
            debug!("Blog data already present");
        }
        Ok(())
    }

    fn initial_data(&self) -> BlogData {
        let now = Utc::now();
        let admin = &self.config.site.admin;
        let admin_user = User {
            id: generate_id(),
            username: admin.username.clone(),
            password: hash_password(&admin.password),
            name: admin.name.clone(),
            email: admin.email.clone(),
            avatar: admin.avatar.clone(),
            role: Role::Admin,
            created_at: now,
            last_login: now,
        };

        let mut articles = Vec::new();
        if self.config.site.seed_welcome_article {
            articles.push(Article {
                id: generate_id(),
                title: WELCOME_TITLE.to_string(),
                slug: generate_slug(WELCOME_TITLE),
                excerpt: WELCOME_EXCERPT.to_string(),
                content: WELCOME_CONTENT.to_string(),
                category: Category::News,
                image: Some(WELCOME_IMAGE.to_string()),
                author: AuthorRef::from(&admin_user),
                published_at: now,
                updated_at: now,
                views: 0,
                likes: 0,
                reading_time: reading_time(WELCOME_CONTENT),
                status: ArticleStatus::Published,
            });
        }

        BlogData {
            users: vec![admin_user],
            articles,
            settings: Settings {
                site_title: self.config.site.name.clone(),
                ..Settings::default()
            },
            ..BlogData::default()
        }
    }

    /// Load the whole blog document.
    ///
    /// A missing or unreadable document loads as an empty blog; the problem
    /// is logged rather than returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails.
    pub fn load_data(&self) -> Result<BlogData> {
        let Some(raw) = self.storage.get_item(DATA_KEY)? else {
            warn!("No blog data found under '{}'", DATA_KEY);
            return Ok(BlogData::default());
        };
        match serde_json::from_str(&raw) {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(error = %e, "Stored blog data is unreadable, using an empty blog");
                Ok(BlogData::default())
            }
        }
    }

    /// Replace the whole blog document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store fails.
    pub fn save_data(&self, data: &BlogData) -> Result<()> {
        self.storage.set_item(DATA_KEY, &serde_json::to_string(data)?)
    }

    /// Apply `f` to the blog document as one atomic read-modify-write.
    ///
    /// Nothing is written when `f` fails. Unlike [`BlogDb::load_data`], an
    /// unreadable document is an error here so that it is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a storage/serialization error.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut BlogData) -> Result<T>) -> Result<T> {
        self.storage.update_item(DATA_KEY, |current| {
            let mut data = match current {
                Some(raw) => serde_json::from_str(&raw)?,
                None => BlogData::default(),
            };
            let output = f(&mut data)?;
            Ok((serde_json::to_string(&data)?, output))
        })
    }

    /// Store `token` as the locally remembered session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn remember_session(&self, token: &str) -> Result<()> {
        self.storage.set_item(SESSION_KEY, token)
    }

    /// Token of the locally remembered session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn remembered_session(&self) -> Result<Option<String>> {
        self.storage.get_item(SESSION_KEY)
    }

    /// Drop the locally remembered session pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn forget_session(&self) -> Result<bool> {
        self.storage.remove_item(SESSION_KEY)
    }
}

/// Permission check shared by article and comment operations.
fn ensure_owner_or_admin(data: &BlogData, owner_id: &str, user_id: &str) -> Result<()> {
    if owner_id == user_id || data.is_admin(user_id) {
        Ok(())
    } else {
        Err(Error::forbidden("only the author or an admin can do this"))
    }
}
