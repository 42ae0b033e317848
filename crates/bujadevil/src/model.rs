//! Core record types for bujadevil.
//!
//! Everything the blog knows lives in one [`BlogData`] value that is
//! serialized as a single JSON document. Field names are camelCase on the
//! wire so that exported blobs stay readable by the web front end.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to the admin surface.
    Admin,
    /// Regular reader account.
    #[default]
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Article category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Tech news.
    News,
    /// Game reviews and analysis.
    Gaming,
    /// Application showcases.
    Apps,
    /// Step-by-step guides.
    Tutorials,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 4] = [Self::News, Self::Gaming, Self::Apps, Self::Tutorials];

    /// Lowercase name, as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Gaming => "gaming",
            Self::Apps => "apps",
            Self::Tutorials => "tutorials",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid(format!("unknown category: {s}")))
    }
}

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Visible to admins only.
    Draft,
    /// Publicly listed.
    #[default]
    Published,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// A stored account, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Reversible password encoding, see [`crate::auth::hash_password`].
    pub password: String,
    /// Display name.
    pub name: String,
    /// Contact email, unique across users.
    pub email: String,
    /// Avatar URL.
    pub avatar: String,
    /// Account role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    pub last_login: DateTime<Utc>,
}

impl User {
    /// Check whether the user has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check whether `identifier` is this user's email or username.
    #[must_use]
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.email == identifier || self.username == identifier
    }
}

/// A user with the password stripped, safe to hand out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Unique identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Avatar URL.
    pub avatar: String,
    /// Account role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    pub last_login: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Snapshot of an author embedded in articles and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    /// The author's user id.
    pub id: String,
    /// Display name at the time of writing.
    pub name: String,
    /// Avatar URL at the time of writing.
    pub avatar: String,
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// A blog article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Unique identifier.
    pub id: String,
    /// Headline.
    pub title: String,
    /// URL segment derived from the title. Unique across articles.
    pub slug: String,
    /// Short summary shown in listings.
    pub excerpt: String,
    /// Markdown body.
    pub content: String,
    /// Category.
    pub category: Category,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Who wrote it.
    pub author: AuthorRef,
    /// First publication time.
    pub published_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Number of reads.
    #[serde(default)]
    pub views: u64,
    /// Number of likes.
    #[serde(default)]
    pub likes: u64,
    /// Estimated reading time in minutes.
    #[serde(default)]
    pub reading_time: u32,
    /// Publication state.
    #[serde(default)]
    pub status: ArticleStatus,
}

impl Article {
    /// Id of the user who wrote the article.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author.id
    }

    /// Check whether the article is publicly listed.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }
}

/// A reader comment, possibly a reply to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier.
    pub id: String,
    /// Article the comment belongs to.
    pub article_id: String,
    /// Who wrote it.
    pub author: AuthorRef,
    /// Comment text.
    pub content: String,
    /// Comment this one replies to.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Number of likes.
    #[serde(default)]
    pub likes: u64,
    /// Visible to readers.
    pub is_approved: bool,
    /// Content was changed after posting.
    #[serde(default)]
    pub edited: bool,
    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Admin who last changed the approval flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderated_by: Option<String>,
    /// When the approval flag was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderated_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Id of the user who wrote the comment.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author.id
    }
}

/// A user's like on an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    /// Unique identifier.
    pub id: String,
    /// Liked article.
    pub article_id: String,
    /// User who liked it.
    pub user_id: String,
    /// When.
    pub created_at: DateTime<Utc>,
}

/// A user's like on a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLike {
    /// Unique identifier.
    pub id: String,
    /// Liked comment.
    pub comment_id: String,
    /// User who liked it.
    pub user_id: String,
    /// When.
    pub created_at: DateTime<Utc>,
}

/// A user's saved article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Unique identifier.
    pub id: String,
    /// Saved article.
    pub article_id: String,
    /// Owner of the bookmark.
    pub user_id: String,
    /// When.
    pub created_at: DateTime<Utc>,
}

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier.
    pub id: String,
    /// Session owner.
    pub user_id: String,
    /// Opaque bearer token.
    pub token: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone commented on an article (sent to admins).
    NewComment,
    /// Someone replied to your comment.
    CommentReply,
    /// Someone liked your comment.
    CommentLike,
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier.
    pub id: String,
    /// Recipient.
    pub user_id: String,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Human readable message.
    pub message: String,
    /// Front-end link to the subject.
    pub link: String,
    /// Id of the comment the notification refers to.
    pub related_id: String,
    /// Has been seen.
    #[serde(default)]
    pub read: bool,
    /// When.
    pub created_at: DateTime<Utc>,
}

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Title shown in the header.
    pub site_title: String,
    /// `auto` or one of the supported languages.
    pub language: String,
    /// Front-end theme preference.
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_title: "BujaDevil".to_string(),
            language: "auto".to_string(),
            theme: "system".to_string(),
        }
    }
}

/// The whole persisted state of the blog.
///
/// Missing collections deserialize as empty so that partial or older blobs
/// still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlogData {
    /// Accounts.
    pub users: Vec<User>,
    /// Articles, newest first.
    pub articles: Vec<Article>,
    /// Comments, newest first.
    pub comments: Vec<Comment>,
    /// Article likes.
    pub likes: Vec<Like>,
    /// Comment likes.
    pub comment_likes: Vec<CommentLike>,
    /// Bookmarks.
    pub bookmarks: Vec<Bookmark>,
    /// Open sessions.
    pub sessions: Vec<Session>,
    /// Notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Site settings.
    pub settings: Settings,
}

impl BlogData {
    /// Find a user by id.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Find a user by id for modification.
    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// Find an article by id.
    #[must_use]
    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// Find an article by id for modification.
    pub fn article_mut(&mut self, id: &str) -> Option<&mut Article> {
        self.articles.iter_mut().find(|a| a.id == id)
    }

    /// Find an article by slug.
    #[must_use]
    pub fn article_by_slug(&self, slug: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.slug == slug)
    }

    /// Find a comment by id.
    #[must_use]
    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// Find a comment by id for modification.
    pub fn comment_mut(&mut self, id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == id)
    }

    /// Check whether `user_id` belongs to an admin.
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.user(user_id).is_some_and(User::is_admin)
    }
}
