//! Credentials and admin tokens.
//!
//! This is bookkeeping, not security: passwords are stored base64-encoded
//! (reversible) and admin tokens are unsigned base64 JSON. Anyone who can read
//! the database or craft a token can act as any user.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AdminConfig;
use crate::error::{Error, Result};
use crate::model::{BlogData, PublicUser};

/// Encode a password for storage.
#[must_use]
pub fn hash_password(password: &str) -> String {
    STANDARD.encode(password.as_bytes())
}

/// Check a password against its stored encoding.
#[must_use]
pub fn verify_password(password: &str, hashed: &str) -> bool {
    hash_password(password) == hashed
}

/// Check admin login input against the configured admin credentials.
///
/// Returns every failed check; an empty list means the login is valid.
#[must_use]
pub fn validate_admin_login(username: &str, password: &str, admin: &AdminConfig) -> Vec<String> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push("username is required".to_string());
    }
    if password.is_empty() {
        errors.push("password is required".to_string());
    }
    if username != admin.username {
        errors.push("incorrect username".to_string());
    }
    if password != admin.password {
        errors.push("incorrect password".to_string());
    }
    errors
}

/// Payload of an admin API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminToken {
    /// Admin login name.
    pub username: String,
    /// Issue time, milliseconds since the epoch.
    pub timestamp: i64,
    /// Expiry time, milliseconds since the epoch.
    pub expires: i64,
}

impl AdminToken {
    /// Create a token for `username` valid for `ttl` from `now`.
    #[must_use]
    pub fn issue(username: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        let timestamp = now.timestamp_millis();
        Self {
            username: username.to_string(),
            timestamp,
            expires: timestamp + ttl.num_milliseconds(),
        }
    }

    /// Serialize to the bearer string handed to clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Parse a bearer string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the token is not base64 JSON of the
    /// expected shape.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|_| Error::unauthorized("malformed token"))?;
        serde_json::from_slice(&bytes).map_err(|_| Error::unauthorized("malformed token"))
    }

    /// Check whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() > self.expires
    }
}

/// Resolve an admin token to the admin it was issued for.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] when the token is malformed or expired, or
/// when its user is missing or not an admin.
pub fn verify_admin_token(data: &BlogData, token: &str, now: DateTime<Utc>) -> Result<PublicUser> {
    let token = AdminToken::decode(token)?;
    if token.is_expired_at(now) {
        return Err(Error::unauthorized("token expired"));
    }
    data.users
        .iter()
        .find(|u| u.username == token.username)
        .filter(|u| u.is_admin())
        .map(PublicUser::from)
        .ok_or_else(|| Error::unauthorized("token does not belong to an admin"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, User};

    fn data_with(role: Role) -> BlogData {
        BlogData {
            users: vec![User {
                id: "u1".to_string(),
                username: "root".to_string(),
                password: hash_password("root"),
                name: "Root".to_string(),
                email: "root@example.com".to_string(),
                avatar: String::new(),
                role,
                created_at: Utc::now(),
                last_login: Utc::now(),
            }],
            ..BlogData::default()
        }
    }

    #[test]
    fn test_hash_password_is_base64() {
        assert_eq!(hash_password("root"), "cm9vdA==");
        assert!(verify_password("root", "cm9vdA=="));
        assert!(!verify_password("Root", "cm9vdA=="));
    }

    #[test]
    fn test_hash_password_unicode() {
        let hashed = hash_password("mot de passé");
        assert!(verify_password("mot de passé", &hashed));
    }

    #[test]
    fn test_validate_admin_login() {
        let admin = AdminConfig::default();
        assert!(validate_admin_login("root", "root", &admin).is_empty());

        let errors = validate_admin_login("", "", &admin);
        assert_eq!(errors.len(), 4);

        let errors = validate_admin_login("root", "wrong", &admin);
        assert_eq!(errors, vec!["incorrect password".to_string()]);
    }

    #[test]
    fn test_token_roundtrip_and_expiry() {
        let now = Utc::now();
        let token = AdminToken::issue("root", now, Duration::hours(24));
        let decoded = AdminToken::decode(&token.encode().unwrap()).unwrap();

        assert_eq!(decoded, token);
        assert!(!decoded.is_expired_at(now));
        assert!(decoded.is_expired_at(now + Duration::hours(25)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            AdminToken::decode("not base64 !!"),
            Err(Error::Unauthorized(_))
        ));
        let not_json = STANDARD.encode("hello");
        assert!(AdminToken::decode(&not_json).is_err());
    }

    #[test]
    fn test_verify_admin_token() {
        let now = Utc::now();
        let token = AdminToken::issue("root", now, Duration::hours(1))
            .encode()
            .unwrap();

        let admin = verify_admin_token(&data_with(Role::Admin), &token, now).unwrap();
        assert_eq!(admin.username, "root");

        assert!(verify_admin_token(&data_with(Role::User), &token, now).is_err());
        let later = now + Duration::hours(2);
        assert!(verify_admin_token(&data_with(Role::Admin), &token, later).is_err());
    }

    #[test]
    fn test_verify_admin_token_unknown_user() {
        let now = Utc::now();
        let token = AdminToken::issue("ghost", now, Duration::hours(1))
            .encode()
            .unwrap();
        assert!(verify_admin_token(&data_with(Role::Admin), &token, now).is_err());
    }
}
