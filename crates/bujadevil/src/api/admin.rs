//! `/api/admin` handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{bearer_token, ApiError, AppState};
use crate::blog::{
    ArticleQuery, ArticleUpdate, BulkAction, NewArticle, ProfileUpdate, SettingsUpdate,
    StatusFilter,
};
use crate::error::Error;
use crate::model::BlogData;

type ApiResult = Result<Json<Value>, ApiError>;

/// Body of `POST` and `PUT` requests.
#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    action: String,
    #[serde(default)]
    data: Value,
    /// Admin token; the `Authorization` header is used when absent.
    #[serde(default)]
    token: Option<String>,
}

impl AdminRequest {
    fn token<'a>(&'a self, headers: &'a HeaderMap) -> Option<&'a str> {
        self.token.as_deref().or_else(|| bearer_token(headers))
    }

    fn data<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    action: Option<String>,
    resource: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateArticleData {
    id: String,
    #[serde(default)]
    updates: ArticleUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRef {
    article_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModerateData {
    comment_id: String,
    approve: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRef {
    comment_id: String,
}

#[derive(Debug, Deserialize)]
struct BulkData {
    action: BulkAction,
    #[serde(default)]
    articles: Vec<String>,
}

fn require_token(token: Option<&str>) -> Result<&str, ApiError> {
    token.ok_or_else(|| Error::unauthorized("admin token required").into())
}

/// `GET /api/admin?action=stats|articles|users|comments`
pub async fn get_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<AdminQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let token = require_token(bearer_token(&headers))?;

    let body = state.with_db(|db| {
        db.admin_from_token(token)?;
        Ok(match query.action.as_deref() {
            None | Some("") => json!({ "success": true, "data": db.dashboard()? }),
            Some("stats") => json!({ "success": true, "data": db.get_stats()? }),
            Some("articles") => {
                let articles = db.get_articles(&ArticleQuery {
                    status: StatusFilter::All,
                    ..ArticleQuery::default()
                })?;
                json!({ "success": true, "data": articles })
            }
            Some("users") => json!({ "success": true, "data": db.list_users()? }),
            Some("comments") => {
                json!({ "success": true, "data": db.list_comments_with_titles()? })
            }
            Some(other) => return Err(Error::invalid(format!("unknown action: {other}"))),
        })
    })?;
    Ok(Json(body))
}

/// `POST /api/admin` with `{action, data, token}`.
pub async fn post_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<AdminRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = request?;
    debug!("Admin POST action {}", request.action);

    if request.action == "login" {
        let login: LoginData = request.data()?;
        let result = state.with_db(|db| db.admin_login(&login.username, &login.password))?;
        return Ok(Json(json!({
            "success": true,
            "token": result.token,
            "user": result.user,
        })));
    }

    let token = require_token(request.token(&headers))?;
    // Payloads are parsed before taking the lock.
    let body = match request.action.as_str() {
        "create-article" => {
            let input: NewArticle = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                let article = db.create_article(input, &admin.id)?;
                Ok(json!({ "success": true, "article": article }))
            })?
        }
        "update-article" => {
            let input: UpdateArticleData = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                let article = db.update_article(&input.id, input.updates, &admin.id)?;
                Ok(json!({ "success": true, "article": article }))
            })?
        }
        "delete-article" => {
            let input: ArticleRef = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                db.delete_article(&input.article_id, &admin.id)?;
                Ok(json!({ "success": true }))
            })?
        }
        "update-profile" => {
            let input: ProfileUpdate = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                let user = db.update_user_profile(&admin.id, input)?;
                Ok(json!({ "success": true, "user": user }))
            })?
        }
        "moderate-comment" => {
            let input: ModerateData = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                let comment = db.moderate_comment(&input.comment_id, input.approve, &admin.id)?;
                Ok(json!({ "success": true, "comment": comment }))
            })?
        }
        "delete-comment" => {
            let input: CommentRef = request.data()?;
            state.with_db(|db| {
                let admin = db.admin_from_token(token)?;
                let removed = db.delete_comment(&input.comment_id, &admin.id)?;
                Ok(json!({ "success": true, "removed": removed }))
            })?
        }
        "export-data" => state.with_db(|db| {
            db.admin_from_token(token)?;
            Ok(json!({
                "success": true,
                "data": db.export_data()?,
                "exportedAt": Utc::now(),
            }))
        })?,
        "import-data" => {
            let data: BlogData = serde_json::from_value(request.data.clone())
                .map_err(|e| Error::invalid(format!("invalid import data: {e}")))?;
            state.with_db(|db| {
                db.admin_from_token(token)?;
                db.import_data(&data)?;
                Ok(json!({ "success": true }))
            })?
        }
        other => return Err(ApiError::bad_request(format!("unknown action: {other}"))),
    };
    Ok(Json(body))
}

/// `PUT /api/admin` with `{action, data, token}`.
pub async fn put_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<AdminRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = request?;
    let token = require_token(request.token(&headers))?;

    let body = match request.action.as_str() {
        "update-settings" => {
            let update: SettingsUpdate = request.data()?;
            state.with_db(|db| {
                db.admin_from_token(token)?;
                let settings = db.update_settings(update)?;
                Ok(json!({ "success": true, "settings": settings }))
            })?
        }
        "bulk-actions" => {
            let bulk: BulkData = request.data()?;
            state.with_db(|db| {
                db.admin_from_token(token)?;
                let affected = db.bulk_action(bulk.action, &bulk.articles)?;
                Ok(json!({ "success": true, "affected": affected }))
            })?
        }
        other => return Err(ApiError::bad_request(format!("unknown action: {other}"))),
    };
    Ok(Json(body))
}

/// `DELETE /api/admin?resource=user|article|comment&id=`
pub async fn delete_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<AdminQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let token = require_token(bearer_token(&headers))?;
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("id is required"))?;

    state.with_db(|db| {
        let admin = db.admin_from_token(token)?;
        match query.resource.as_deref() {
            Some("user") => db.delete_user(&id),
            Some("article") => db.delete_article(&id, &admin.id),
            Some("comment") => db.delete_comment(&id, &admin.id).map(|_| ()),
            other => Err(Error::invalid(format!(
                "unknown resource: {}",
                other.unwrap_or_default()
            ))),
        }
    })?;
    Ok(Json(json!({ "success": true })))
}
