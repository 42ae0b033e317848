//! `/api/comments` handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{bearer_token, parse_number, ApiError, AppState};
use crate::blog::NewComment;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    article_id: Option<String>,
    limit: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentBody {
    #[serde(default)]
    article_id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentBody {
    #[serde(default)]
    comment_id: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    content: Option<String>,
}

/// `GET /api/comments?articleId=&limit=`
pub async fn list_comments(
    State(state): State<AppState>,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let article_id = query
        .article_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("articleId is required"))?;

    let comments = state.with_db(|db| {
        let limit = parse_number(query.limit.as_deref())
            .filter(|l| *l > 0)
            .unwrap_or(db.config().comments.default_limit);
        db.get_article_comments(&article_id, limit)
    })?;
    Ok(Json(json!({
        "success": true,
        "total": comments.len(),
        "data": comments,
    })))
}

/// `POST /api/comments` with `{articleId, content, parentId}`.
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateCommentBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    if body.article_id.is_empty() || body.content.trim().is_empty() {
        return Err(ApiError::bad_request("articleId and content are required"));
    }

    let comment = state.with_db(|db| {
        let user = db.require_user(bearer_token(&headers))?;
        db.create_comment(
            NewComment {
                article_id: body.article_id,
                content: body.content,
                parent_id: body.parent_id.filter(|p| !p.is_empty()),
            },
            &user.id,
        )
    })?;
    Ok(Json(json!({ "success": true, "comment": comment })))
}

/// `PUT /api/comments` with `{commentId, action: like|update, content}`.
pub async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<UpdateCommentBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    if body.comment_id.is_empty() || body.action.is_empty() {
        return Err(ApiError::bad_request("commentId and action are required"));
    }

    match body.action.as_str() {
        "like" => {
            let toggle = state.with_db(|db| {
                let user = db.require_user(bearer_token(&headers))?;
                db.toggle_comment_like(&body.comment_id, &user.id)
            })?;
            Ok(Json(json!({
                "success": true,
                "liked": toggle.liked,
                "comment": toggle.comment,
            })))
        }
        "update" => {
            let content = body
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("content is required"))?;
            let comment = state.with_db(|db| {
                let user = db.require_user(bearer_token(&headers))?;
                db.update_comment(&body.comment_id, &content, &user.id)
            })?;
            Ok(Json(json!({ "success": true, "comment": comment })))
        }
        other => Err(ApiError::bad_request(format!("unknown action: {other}"))),
    }
}

/// `DELETE /api/comments?id=`
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("id is required"))?;

    let removed = state.with_db(|db| {
        let user = db.require_user(bearer_token(&headers))?;
        db.delete_comment(&id, &user.id)
    })?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}
