//! Article likes, bookmarks and notifications.

use chrono::Utc;
use serde::Serialize;

use super::BlogDb;
use crate::error::{Error, Result};
use crate::model::{Article, BlogData, Bookmark, Like, Notification, NotificationKind};
use crate::text::generate_id;

/// Outcome of toggling an article like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    /// Whether the user now likes the article.
    pub liked: bool,
    /// The article's like count after the change.
    pub likes: u64,
}

/// Queue a notification for `user_id`, newest first.
pub(crate) fn push_notification(
    data: &mut BlogData,
    user_id: &str,
    kind: NotificationKind,
    title: String,
    message: String,
    link: String,
    related_id: &str,
) {
    data.notifications.insert(
        0,
        Notification {
            id: generate_id(),
            user_id: user_id.to_string(),
            kind,
            title,
            message,
            link,
            related_id: related_id.to_string(),
            read: false,
            created_at: Utc::now(),
        },
    );
}

fn ensure_user(data: &BlogData, user_id: &str) -> Result<()> {
    data.user(user_id)
        .map(|_| ())
        .ok_or_else(|| Error::not_found("user", user_id))
}

impl BlogDb {
    /// Like or unlike an article.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown article or user.
    pub fn toggle_like(&self, article_id: &str, user_id: &str) -> Result<LikeToggle> {
        self.mutate(|data| {
            ensure_user(data, user_id)?;
            if data.article(article_id).is_none() {
                return Err(Error::not_found("article", article_id));
            }

            let existing = data
                .likes
                .iter()
                .position(|l| l.article_id == article_id && l.user_id == user_id);
            let liked = if let Some(index) = existing {
                data.likes.remove(index);
                false
            } else {
                data.likes.push(Like {
                    id: generate_id(),
                    article_id: article_id.to_string(),
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                true
            };

            let article = data
                .article_mut(article_id)
                .ok_or_else(|| Error::not_found("article", article_id))?;
            article.likes = if liked {
                article.likes.saturating_add(1)
            } else {
                article.likes.saturating_sub(1)
            };
            Ok(LikeToggle {
                liked,
                likes: article.likes,
            })
        })
    }

    /// Save or unsave an article. Returns whether it is now bookmarked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown article or user.
    pub fn toggle_bookmark(&self, article_id: &str, user_id: &str) -> Result<bool> {
        self.mutate(|data| {
            ensure_user(data, user_id)?;
            if data.article(article_id).is_none() {
                return Err(Error::not_found("article", article_id));
            }

            let existing = data
                .bookmarks
                .iter()
                .position(|b| b.article_id == article_id && b.user_id == user_id);
            if let Some(index) = existing {
                data.bookmarks.remove(index);
                Ok(false)
            } else {
                data.bookmarks.push(Bookmark {
                    id: generate_id(),
                    article_id: article_id.to_string(),
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                Ok(true)
            }
        })
    }

    /// Articles bookmarked by a user, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn bookmarks_for(&self, user_id: &str) -> Result<Vec<Article>> {
        let data = self.load_data()?;
        let mut saved: Vec<&Bookmark> = data
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .collect();
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(saved
            .into_iter()
            .filter_map(|b| data.article(&b.article_id).cloned())
            .collect())
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn notifications_for(&self, user_id: &str) -> Result<Vec<Notification>> {
        Ok(self
            .load_data()?
            .notifications
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect())
    }

    /// Mark one of the user's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the notification does not exist or
    /// belongs to someone else.
    pub fn mark_notification_read(&self, notification_id: &str, user_id: &str) -> Result<()> {
        self.mutate(|data| {
            let notification = data
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id && n.user_id == user_id)
                .ok_or_else(|| Error::not_found("notification", notification_id))?;
            notification.read = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::test_support::*;
    use crate::blog::NewComment;

    fn welcome_id(db: &BlogDb) -> String {
        db.load_data().unwrap().articles[0].id.clone()
    }

    #[test]
    fn test_toggle_like() {
        let db = open_test_db();
        let article = welcome_id(&db);
        let alice = register(&db, "alice");
        let bob = register(&db, "bob");

        assert_eq!(
            db.toggle_like(&article, &alice).unwrap(),
            LikeToggle { liked: true, likes: 1 }
        );
        assert_eq!(
            db.toggle_like(&article, &bob).unwrap(),
            LikeToggle { liked: true, likes: 2 }
        );
        assert_eq!(
            db.toggle_like(&article, &alice).unwrap(),
            LikeToggle { liked: false, likes: 1 }
        );
        assert_eq!(db.load_data().unwrap().likes.len(), 1);
    }

    #[test]
    fn test_like_count_never_underflows() {
        let db = open_test_db();
        let article = welcome_id(&db);
        let alice = register(&db, "alice");
        db.toggle_like(&article, &alice).unwrap();
        db.mutate(|data| {
            data.article_mut(&article).unwrap().likes = 0;
            Ok(())
        })
        .unwrap();

        let toggle = db.toggle_like(&article, &alice).unwrap();
        assert!(!toggle.liked);
        assert_eq!(toggle.likes, 0);
    }

    #[test]
    fn test_toggle_like_unknown_article() {
        let db = open_test_db();
        let alice = register(&db, "alice");
        assert!(db.toggle_like("nope", &alice).unwrap_err().is_not_found());
        assert!(db
            .toggle_like(&welcome_id(&db), "ghost")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_toggle_bookmark() {
        let db = open_test_db();
        let article = welcome_id(&db);
        let alice = register(&db, "alice");

        assert!(db.toggle_bookmark(&article, &alice).unwrap());
        let saved = db.bookmarks_for(&alice).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, article);

        assert!(!db.toggle_bookmark(&article, &alice).unwrap());
        assert!(db.bookmarks_for(&alice).unwrap().is_empty());
    }

    #[test]
    fn test_mark_notification_read() {
        let db = open_test_db();
        let admin = admin_id(&db);
        let alice = register(&db, "alice");
        db.create_comment(
            NewComment {
                article_id: welcome_id(&db),
                content: "Hi".to_string(),
                parent_id: None,
            },
            &alice,
        )
        .unwrap();

        let notes = db.notifications_for(&admin).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].read);

        assert!(db
            .mark_notification_read(&notes[0].id, &alice)
            .unwrap_err()
            .is_not_found());
        db.mark_notification_read(&notes[0].id, &admin).unwrap();
        assert!(db.notifications_for(&admin).unwrap()[0].read);
    }
}
