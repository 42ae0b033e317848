//! Configuration management for bujadevil.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "bujadevil";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "blog.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "BUJADEVIL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BUJADEVIL_`, sections split on `__`)
/// 2. TOML config file at `~/.config/bujadevil/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Site identity and the seeded admin account.
    pub site: SiteConfig,
    /// Session and admin token lifetimes.
    pub auth: AuthConfig,
    /// Comment behaviour.
    pub comments: CommentsConfig,
    /// Search paging.
    pub search: SearchConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/bujadevil/blog.db`
    pub database_path: Option<PathBuf>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Answer CORS preflights with permissive headers.
    pub cors_enabled: bool,
}

/// The seeded admin account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Login name of the primary admin. This account cannot be deleted.
    pub username: String,
    /// Admin password, checked in plain text at admin login.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Avatar URL.
    pub avatar: String,
}

/// Site identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site title written into the initial settings.
    pub name: String,
    /// Language used when detection finds nothing supported.
    pub default_language: String,
    /// Languages the site can be displayed in.
    pub supported_languages: Vec<String>,
    /// Create the welcome article when the store is first initialised.
    pub seed_welcome_article: bool,
    /// The primary admin account.
    pub admin: AdminConfig,
}

/// Session and token lifetimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of a user session in days.
    pub session_ttl_days: u32,
    /// Lifetime of an admin API token in hours.
    pub admin_token_ttl_hours: u32,
}

/// Comment behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// New comments are visible without moderation.
    pub auto_approve: bool,
    /// Page size for comment listings.
    pub default_limit: usize,
}

/// Search paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size when the request does not give one.
    pub default_limit: usize,
    /// Largest page size a request may ask for.
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_enabled: true,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            password: "root".to_string(),
            name: "Josué Raoult".to_string(),
            email: "raoultjosue2@gmail.com".to_string(),
            avatar: "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=200&h=200&fit=crop&crop=face".to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "BujaDevil".to_string(),
            default_language: "fr".to_string(),
            supported_languages: vec!["fr".to_string(), "en".to_string(), "es".to_string()],
            seed_welcome_article: true,
            admin: AdminConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: 7,
            admin_token_ttl_hours: 24,
        }
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            auto_approve: true,
            default_limit: 50,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.site.admin.username.trim().is_empty() || self.site.admin.password.is_empty() {
            return Err(Error::ConfigValidation {
                message: "site.admin.username and site.admin.password must be set".to_string(),
            });
        }

        if !self
            .site
            .supported_languages
            .contains(&self.site.default_language)
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "site.default_language ({}) is not in site.supported_languages",
                    self.site.default_language
                ),
            });
        }

        if self.auth.session_ttl_days == 0 || self.auth.admin_token_ttl_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "auth lifetimes must be greater than 0".to_string(),
            });
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(Error::ConfigValidation {
                message: format!(
                    "search.default_limit ({}) must be between 1 and search.max_limit ({})",
                    self.search.default_limit, self.search.max_limit
                ),
            });
        }

        if self.comments.default_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "comments.default_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!(
                    "invalid bind address {}:{}",
                    self.server.host, self.server.port
                ),
            })
    }

    /// Get the session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::days(i64::from(self.auth.session_ttl_days))
    }

    /// Get the admin token lifetime.
    #[must_use]
    pub fn admin_token_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.auth.admin_token_ttl_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.site.name, "BujaDevil");
        assert_eq!(config.site.admin.username, "root");
        assert!(config.site.seed_welcome_article);
        assert!(config.comments.auto_approve);
        assert!(config.server.cors_enabled);
    }

    #[test]
    fn test_default_auth_config() {
        let auth = AuthConfig::default();

        assert_eq!(auth.session_ttl_days, 7);
        assert_eq!(auth.admin_token_ttl_hours, 24);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_unsupported_default_language() {
        let mut config = Config::default();
        config.site.default_language = "de".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_language"));
    }

    #[test]
    fn test_validate_search_limits() {
        let mut config = Config::default();
        config.search.default_limit = 500;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("search.default_limit"));
    }

    #[test]
    fn test_validate_empty_admin() {
        let mut config = Config::default();
        config.site.admin.password = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("blog.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/blog.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/blog.sqlite")
        );
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr().unwrap();
        assert_eq!(addr.port(), 3000);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(bad.bind_addr().is_err());
    }

    #[test]
    fn test_lifetimes() {
        let config = Config::default();

        assert_eq!(config.session_ttl(), Duration::days(7));
        assert_eq!(config.admin_token_ttl(), Duration::hours(24));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("bujadevil"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[comments]\nauto_approve = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.comments.auto_approve);
        assert_eq!(config.site.admin.username, "root");
    }

    #[test]
    fn test_site_config_deserialize_partial() {
        let json = r#"{"name": "Other Blog"}"#;
        let site: SiteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(site.name, "Other Blog");
        assert_eq!(site.default_language, "fr");
    }
}
