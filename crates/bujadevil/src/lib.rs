//! `bujadevil` - a small tech blog engine
//!
//! This library provides the blog domain (articles, comments, likes,
//! bookmarks, notifications and sessions) over a single JSON document kept in
//! a local `SQLite` key/value store, a relevance-ranked search engine and a
//! JSON HTTP API.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod blog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod search;
pub mod storage;
pub mod text;

pub use blog::BlogDb;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Article, BlogData, Category, Comment, PublicUser, User};
pub use storage::{Storage, StorageStats};
