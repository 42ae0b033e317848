//! Comments, replies, comment likes and moderation.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::interactions::push_notification;
use super::{ensure_owner_or_admin, BlogDb};
use crate::error::{Error, Result};
use crate::model::{AuthorRef, BlogData, Comment, CommentLike, NotificationKind};
use crate::text::generate_id;

/// Input for a new comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Article being commented on.
    pub article_id: String,
    /// Comment text.
    pub content: String,
    /// Comment being replied to, on the same article.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Outcome of toggling a comment like.
#[derive(Debug, Clone, Serialize)]
pub struct CommentLikeToggle {
    /// Whether the user now likes the comment.
    pub liked: bool,
    /// The comment after the change.
    pub comment: Comment,
}

/// A comment with the title of its article, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithArticle {
    /// The comment.
    #[serde(flatten)]
    pub comment: Comment,
    /// Title of the article, if it still exists.
    pub article_title: Option<String>,
}

fn article_slug(data: &BlogData, article_id: &str) -> String {
    data.article(article_id)
        .map(|a| a.slug.clone())
        .unwrap_or_default()
}

/// Ids of `root` and every reply below it.
fn comment_thread(data: &BlogData, root: &str) -> HashSet<String> {
    let mut thread = HashSet::from([root.to_string()]);
    loop {
        let before = thread.len();
        for comment in &data.comments {
            if comment
                .parent_id
                .as_ref()
                .is_some_and(|p| thread.contains(p))
            {
                thread.insert(comment.id.clone());
            }
        }
        if thread.len() == before {
            return thread;
        }
    }
}

fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::invalid("comment content is required"));
    }
    Ok(content.to_string())
}

impl BlogDb {
    /// Post a comment as `user_id`.
    ///
    /// Admins are notified of the new comment, and the parent's author is
    /// notified of a reply. Nobody is notified of their own actions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty content or a parent on
    /// another article, and [`Error::NotFound`] for an unknown article,
    /// parent or user.
    pub fn create_comment(&self, input: NewComment, user_id: &str) -> Result<Comment> {
        let content = validate_content(&input.content)?;
        let auto_approve = self.config.comments.auto_approve;

        let comment = self.mutate(|data| {
            let author = data
                .user(user_id)
                .ok_or_else(|| Error::not_found("user", user_id))?;
            let author_name = author.name.clone();
            let author = AuthorRef::from(author);
            let article = data
                .article(&input.article_id)
                .ok_or_else(|| Error::not_found("article", &input.article_id))?;
            let (slug, article_title) = (article.slug.clone(), article.title.clone());

            let parent_author = match &input.parent_id {
                Some(parent_id) => {
                    let parent = data
                        .comment(parent_id)
                        .ok_or_else(|| Error::not_found("comment", parent_id))?;
                    if parent.article_id != input.article_id {
                        return Err(Error::invalid(
                            "a reply must be on the same article as its parent",
                        ));
                    }
                    Some(parent.author_id().to_string())
                }
                None => None,
            };

            let now = Utc::now();
            let comment = Comment {
                id: generate_id(),
                article_id: input.article_id,
                author,
                content,
                parent_id: input.parent_id,
                likes: 0,
                is_approved: auto_approve,
                edited: false,
                created_at: now,
                updated_at: now,
                moderated_by: None,
                moderated_at: None,
            };
            data.comments.insert(0, comment.clone());

            let admins: Vec<String> = data
                .users
                .iter()
                .filter(|u| u.is_admin() && u.id != user_id)
                .map(|u| u.id.clone())
                .collect();
            for admin in admins {
                push_notification(
                    data,
                    &admin,
                    NotificationKind::NewComment,
                    "New comment".to_string(),
                    format!("{author_name} commented on \"{article_title}\""),
                    format!("/blog/{slug}#comments"),
                    &comment.id,
                );
            }
            if let Some(parent_author) = parent_author.filter(|a| a != user_id) {
                push_notification(
                    data,
                    &parent_author,
                    NotificationKind::CommentReply,
                    "New reply".to_string(),
                    format!("{author_name} replied to your comment"),
                    format!("/blog/{slug}#comment-{}", comment.id),
                    &comment.id,
                );
            }
            Ok(comment)
        })?;

        debug!("Comment {} posted on {}", comment.id, comment.article_id);
        Ok(comment)
    }

    /// Approved comments on an article, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_article_comments(&self, article_id: &str, limit: usize) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .load_data()?
            .comments
            .into_iter()
            .filter(|c| c.article_id == article_id && c.is_approved)
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments.truncate(limit);
        Ok(comments)
    }

    /// Like or unlike a comment.
    ///
    /// Liking someone else's comment notifies its author.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown comment or user.
    pub fn toggle_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> Result<CommentLikeToggle> {
        self.mutate(|data| {
            let liker_name = data
                .user(user_id)
                .map(|u| u.name.clone())
                .ok_or_else(|| Error::not_found("user", user_id))?;
            let comment = data
                .comment(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            let author_id = comment.author_id().to_string();
            let slug = article_slug(data, &comment.article_id);

            let existing = data
                .comment_likes
                .iter()
                .position(|l| l.comment_id == comment_id && l.user_id == user_id);
            let liked = if let Some(index) = existing {
                data.comment_likes.remove(index);
                false
            } else {
                data.comment_likes.push(CommentLike {
                    id: generate_id(),
                    comment_id: comment_id.to_string(),
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                true
            };

            let comment = data
                .comment_mut(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            comment.likes = if liked {
                comment.likes.saturating_add(1)
            } else {
                comment.likes.saturating_sub(1)
            };
            let comment = comment.clone();

            if liked && author_id != user_id {
                push_notification(
                    data,
                    &author_id,
                    NotificationKind::CommentLike,
                    "Comment liked".to_string(),
                    format!("{liker_name} liked your comment"),
                    format!("/blog/{slug}#comment-{comment_id}"),
                    comment_id,
                );
            }
            Ok(CommentLikeToggle { liked, comment })
        })
    }

    /// Edit a comment. Only its author or an admin may do this.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`], [`Error::NotFound`] or
    /// [`Error::Forbidden`].
    pub fn update_comment(
        &self,
        comment_id: &str,
        content: &str,
        user_id: &str,
    ) -> Result<Comment> {
        let content = validate_content(content)?;
        self.mutate(|data| {
            let comment = data
                .comment(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            ensure_owner_or_admin(data, comment.author_id(), user_id)?;

            let comment = data
                .comment_mut(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            comment.content = content;
            comment.edited = true;
            comment.updated_at = Utc::now();
            Ok(comment.clone())
        })
    }

    /// Delete a comment together with its replies and their likes.
    ///
    /// Returns the number of comments removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<usize> {
        let removed = self.mutate(|data| {
            let comment = data
                .comment(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            ensure_owner_or_admin(data, comment.author_id(), user_id)?;

            let thread = comment_thread(data, comment_id);
            data.comments.retain(|c| !thread.contains(&c.id));
            data.comment_likes.retain(|l| !thread.contains(&l.comment_id));
            Ok(thread.len())
        })?;
        info!("Deleted comment {} ({} total)", comment_id, removed);
        Ok(removed)
    }

    /// Approve or hide a comment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown comment and
    /// [`Error::Forbidden`] when `moderator_id` is not an admin.
    pub fn moderate_comment(
        &self,
        comment_id: &str,
        approve: bool,
        moderator_id: &str,
    ) -> Result<Comment> {
        self.mutate(|data| {
            if !data.is_admin(moderator_id) {
                return Err(Error::forbidden("only admins can moderate comments"));
            }
            let comment = data
                .comment_mut(comment_id)
                .ok_or_else(|| Error::not_found("comment", comment_id))?;
            let now = Utc::now();
            comment.is_approved = approve;
            comment.moderated_by = Some(moderator_id.to_string());
            comment.moderated_at = Some(now);
            comment.updated_at = now;
            Ok(comment.clone())
        })
    }

    /// Every comment, approved or not, with its article's title.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_comments_with_titles(&self) -> Result<Vec<CommentWithArticle>> {
        let data = self.load_data()?;
        Ok(data
            .comments
            .iter()
            .map(|c| CommentWithArticle {
                comment: c.clone(),
                article_title: data.article(&c.article_id).map(|a| a.title.clone()),
            })
            .collect())
    }
}
