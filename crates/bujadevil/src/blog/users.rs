//! Accounts, sessions and admin tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::BlogDb;
use crate::auth::{
    hash_password, validate_admin_login, verify_admin_token, verify_password, AdminToken,
};
use crate::error::{Error, Result};
use crate::model::{BlogData, PublicUser, Role, Session, User};
use crate::text::{encode_uri_component, generate_id, generate_token, is_valid_email};

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Login name, unique.
    pub username: String,
    /// Contact email, unique.
    pub email: String,
    /// Plain password.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Generated from the name when absent.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Profile fields a user may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email, must stay unique.
    pub email: Option<String>,
    /// New avatar URL.
    pub avatar: Option<String>,
    /// New plain password.
    pub password: Option<String>,
}

/// A logged-in user together with their new session.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    /// The account.
    pub user: PublicUser,
    /// The session that was opened.
    pub session: Session,
}

/// Result of a successful admin login.
#[derive(Debug, Clone, Serialize)]
pub struct AdminLogin {
    /// Bearer token for the admin API.
    pub token: String,
    /// The admin account.
    pub user: PublicUser,
}

fn default_avatar(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        encode_uri_component(name)
    )
}

/// Open a session for `user_id`, closing any session it already had.
fn open_session(
    data: &mut BlogData,
    user_id: &str,
    now: DateTime<Utc>,
    ttl: chrono::Duration,
) -> Session {
    data.sessions.retain(|s| s.user_id != user_id);
    let session = Session {
        id: generate_id(),
        user_id: user_id.to_string(),
        token: generate_token(),
        expires_at: now + ttl,
        created_at: now,
    };
    data.sessions.push(session.clone());
    session
}

impl BlogDb {
    /// Create an account and log it in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for missing fields or a malformed
    /// email, and [`Error::Conflict`] when the email or username is taken.
    pub fn register_user(&self, input: NewUser) -> Result<AuthSession> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();
        let name = input.name.trim().to_string();
        if username.is_empty() || name.is_empty() || input.password.is_empty() {
            return Err(Error::invalid("username, name and password are required"));
        }
        if !is_valid_email(&email) {
            return Err(Error::invalid(format!("invalid email: {email}")));
        }

        let ttl = self.config.session_ttl();
        let auth = self.mutate(|data| {
            if data.users.iter().any(|u| u.email == email) {
                return Err(Error::conflict("email already registered"));
            }
            if data.users.iter().any(|u| u.username == username) {
                return Err(Error::conflict("username already taken"));
            }

            let now = Utc::now();
            let user = User {
                id: generate_id(),
                avatar: input
                    .avatar
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| default_avatar(&name)),
                username,
                password: hash_password(&input.password),
                name,
                email,
                role: Role::User,
                created_at: now,
                last_login: now,
            };
            let session = open_session(data, &user.id, now, ttl);
            let public = PublicUser::from(&user);
            data.users.push(user);
            Ok(AuthSession {
                user: public,
                session,
            })
        })?;

        info!("Registered user {}", auth.user.username);
        Ok(auth)
    }

    /// Log in with an email or username.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when no account matches the
    /// credentials.
    pub fn login_user(&self, identifier: &str, password: &str) -> Result<AuthSession> {
        let identifier = identifier.trim();
        let ttl = self.config.session_ttl();
        let auth = self.mutate(|data| {
            let now = Utc::now();
            let user = data
                .users
                .iter_mut()
                .find(|u| {
                    u.matches_identifier(identifier) && verify_password(password, &u.password)
                })
                .ok_or_else(|| Error::unauthorized("invalid credentials"))?;
            user.last_login = now;
            let public = PublicUser::from(&*user);
            let session = open_session(data, &public.id, now, ttl);
            Ok(AuthSession {
                user: public,
                session,
            })
        })?;

        debug!("User {} logged in", auth.user.username);
        Ok(auth)
    }

    /// Open a new session for an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown user.
    pub fn create_session(&self, user_id: &str) -> Result<Session> {
        let ttl = self.config.session_ttl();
        self.mutate(|data| {
            if data.user(user_id).is_none() {
                return Err(Error::not_found("user", user_id));
            }
            Ok(open_session(data, user_id, Utc::now(), ttl))
        })
    }

    /// Resolve a session token to its user.
    ///
    /// An expired session is deleted and resolves to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn current_user(&self, token: &str) -> Result<Option<PublicUser>> {
        let data = self.load_data()?;
        let now = Utc::now();
        let Some(session) = data.sessions.iter().find(|s| s.token == token) else {
            return Ok(None);
        };

        if session.is_expired_at(now) {
            debug!("Session {} expired", session.id);
            self.mutate(|data| {
                data.sessions.retain(|s| s.token != token);
                Ok(())
            })?;
            return Ok(None);
        }

        Ok(data.user(&session.user_id).map(PublicUser::from))
    }

    /// Like [`BlogDb::current_user`] but fails when nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the token is missing, unknown or
    /// expired.
    pub fn require_user(&self, token: Option<&str>) -> Result<PublicUser> {
        let token = token.ok_or_else(|| Error::unauthorized("login required"))?;
        self.current_user(token)?
            .ok_or_else(|| Error::unauthorized("session expired or invalid"))
    }

    /// Close the session identified by `token`.
    ///
    /// Returns whether a session was closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn logout_user(&self, token: &str) -> Result<bool> {
        self.mutate(|data| {
            let before = data.sessions.len();
            data.sessions.retain(|s| s.token != token);
            Ok(data.sessions.len() < before)
        })
    }

    /// Change a user's own profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown user,
    /// [`Error::InvalidInput`] for empty or malformed values and
    /// [`Error::Conflict`] when the new email belongs to someone else.
    pub fn update_user_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<PublicUser> {
        if let Some(email) = &update.email {
            if !is_valid_email(email.trim()) {
                return Err(Error::invalid(format!("invalid email: {email}")));
            }
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::invalid("name cannot be empty"));
        }
        if update.password.as_deref().is_some_and(str::is_empty) {
            return Err(Error::invalid("password cannot be empty"));
        }

        self.mutate(|data| {
            if let Some(email) = &update.email {
                let email = email.trim();
                if data.users.iter().any(|u| u.email == email && u.id != user_id) {
                    return Err(Error::conflict("email already registered"));
                }
            }

            let user = data
                .user_mut(user_id)
                .ok_or_else(|| Error::not_found("user", user_id))?;
            if let Some(name) = update.name {
                user.name = name.trim().to_string();
            }
            if let Some(email) = update.email {
                user.email = email.trim().to_string();
            }
            if let Some(avatar) = update.avatar {
                user.avatar = avatar;
            }
            if let Some(password) = update.password {
                user.password = hash_password(&password);
            }
            Ok(PublicUser::from(&*user))
        })
    }

    /// Check whether `user_id` is an admin.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn is_admin(&self, user_id: &str) -> Result<bool> {
        Ok(self.load_data()?.is_admin(user_id))
    }

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown user.
    pub fn get_user(&self, user_id: &str) -> Result<PublicUser> {
        self.load_data()?
            .user(user_id)
            .map(PublicUser::from)
            .ok_or_else(|| Error::not_found("user", user_id))
    }

    /// Every account, passwords stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_users(&self) -> Result<Vec<PublicUser>> {
        Ok(self.load_data()?.users.iter().map(PublicUser::from).collect())
    }

    /// Delete an account together with its sessions and notifications.
    ///
    /// Articles and comments keep their author snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for the primary admin and
    /// [`Error::NotFound`] for an unknown user.
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        let primary = self.config.site.admin.username.clone();
        self.mutate(|data| {
            let user = data
                .user(user_id)
                .ok_or_else(|| Error::not_found("user", user_id))?;
            if user.username == primary {
                return Err(Error::forbidden("the primary admin cannot be deleted"));
            }
            data.users.retain(|u| u.id != user_id);
            data.sessions.retain(|s| s.user_id != user_id);
            data.notifications.retain(|n| n.user_id != user_id);
            Ok(())
        })?;
        info!("Deleted user {}", user_id);
        Ok(())
    }

    /// Log in to the admin surface with the configured admin credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] listing every failed check, or when
    /// the admin account is missing from the store.
    pub fn admin_login(&self, username: &str, password: &str) -> Result<AdminLogin> {
        let errors = validate_admin_login(username, password, &self.config.site.admin);
        if !errors.is_empty() {
            return Err(Error::unauthorized(errors.join(", ")));
        }

        let now = Utc::now();
        let user = self.mutate(|data| {
            let user = data
                .users
                .iter_mut()
                .find(|u| u.username == username && u.is_admin())
                .ok_or_else(|| Error::unauthorized("admin account not found"))?;
            user.last_login = now;
            Ok(PublicUser::from(&*user))
        })?;

        let token = AdminToken::issue(&user.username, now, self.config.admin_token_ttl()).encode()?;
        info!("Admin {} logged in", user.username);
        Ok(AdminLogin { token, user })
    }

    /// Resolve an admin bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for a malformed, expired or non-admin
    /// token.
    pub fn admin_from_token(&self, token: &str) -> Result<PublicUser> {
        verify_admin_token(&self.load_data()?, token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::test_support::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
            name: "Some One".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_register_and_login() {
        let db = open_test_db();
        let auth = db.register_user(new_user("alice", "alice@example.com")).unwrap();

        assert_eq!(auth.user.role, Role::User);
        assert!(auth.user.avatar.contains("Some%20One"));
        assert_eq!(auth.session.user_id, auth.user.id);

        let by_email = db.login_user("alice@example.com", "secret").unwrap();
        let by_name = db.login_user("alice", "secret").unwrap();
        assert_eq!(by_email.user.id, by_name.user.id);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let db = open_test_db();
        db.register_user(new_user("alice", "alice@example.com")).unwrap();

        let err = db.register_user(new_user("bob", "alice@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let err = db.register_user(new_user("alice", "other@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_register_validates_input() {
        let db = open_test_db();
        assert!(matches!(
            db.register_user(new_user("alice", "not-an-email")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            db.register_user(new_user("  ", "a@b.co")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_login_wrong_password() {
        let db = open_test_db();
        register(&db, "alice");
        assert!(matches!(
            db.login_user("alice", "nope"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_new_session_replaces_old_one() {
        let db = open_test_db();
        let first = db.register_user(new_user("alice", "alice@example.com")).unwrap();
        let second = db.login_user("alice", "secret").unwrap();

        assert!(db.current_user(&first.session.token).unwrap().is_none());
        assert_eq!(
            db.current_user(&second.session.token).unwrap().unwrap().username,
            "alice"
        );
        let data = db.load_data().unwrap();
        assert_eq!(data.sessions.iter().filter(|s| s.user_id == first.user.id).count(), 1);
    }

    #[test]
    fn test_expired_session_is_removed() {
        let db = open_test_db();
        let auth = db.register_user(new_user("alice", "alice@example.com")).unwrap();

        db.mutate(|data| {
            data.sessions[0].expires_at = Utc::now() - chrono::Duration::seconds(1);
            Ok(())
        })
        .unwrap();

        assert!(db.current_user(&auth.session.token).unwrap().is_none());
        assert!(db.load_data().unwrap().sessions.is_empty());
        assert!(matches!(
            db.require_user(Some(&auth.session.token)),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_logout() {
        let db = open_test_db();
        let auth = db.register_user(new_user("alice", "alice@example.com")).unwrap();

        assert!(db.logout_user(&auth.session.token).unwrap());
        assert!(!db.logout_user(&auth.session.token).unwrap());
        assert!(db.current_user(&auth.session.token).unwrap().is_none());
    }

    #[test]
    fn test_update_profile() {
        let db = open_test_db();
        let id = register(&db, "alice");

        let updated = db
            .update_user_profile(
                &id,
                ProfileUpdate {
                    name: Some("Alice B".to_string()),
                    password: Some("new".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Alice B");
        assert_eq!(updated.role, Role::User);
        assert!(db.login_user("alice", "new").is_ok());
    }

    #[test]
    fn test_update_profile_email_conflict() {
        let db = open_test_db();
        let alice = register(&db, "alice");
        register(&db, "bob");

        let err = db
            .update_user_profile(
                &alice,
                ProfileUpdate {
                    email: Some("bob@example.com".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_delete_user() {
        let db = open_test_db();
        let alice = register(&db, "alice");

        db.delete_user(&alice).unwrap();
        assert!(db.get_user(&alice).unwrap_err().is_not_found());
        assert!(db.load_data().unwrap().sessions.is_empty());
    }

    #[test]
    fn test_primary_admin_cannot_be_deleted() {
        let db = open_test_db();
        let admin = admin_id(&db);
        assert!(matches!(db.delete_user(&admin), Err(Error::Forbidden(_))));
    }

    #[test]
    fn test_admin_login_and_token() {
        let db = open_test_db();
        let login = db.admin_login("root", "root").unwrap();

        let admin = db.admin_from_token(&login.token).unwrap();
        assert_eq!(admin.username, "root");
        assert!(db.is_admin(&admin.id).unwrap());
    }

    #[test]
    fn test_admin_login_rejects_bad_credentials() {
        let db = open_test_db();
        let err = db.admin_login("root", "wrong").unwrap_err();
        assert!(err.to_string().contains("incorrect password"));
        assert!(db.admin_from_token("garbage").is_err());
    }

    #[test]
    fn test_list_users_has_no_passwords() {
        let db = open_test_db();
        register(&db, "alice");
        let users = db.list_users().unwrap();
        assert_eq!(users.len(), 2);
        let json = serde_json::to_string(&users).unwrap();
        assert!(!json.contains("password"));
    }
}
