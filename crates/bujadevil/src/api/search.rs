//! `/api/search` handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_number, ApiError, AppState};
use crate::error::Error;
use crate::search::{
    self as engine, parse_category_filter, resolve_limit, AdvancedSearchParams, SearchKind,
    SearchParams, SearchResults,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    category: Option<String>,
    limit: Option<String>,
    page: Option<String>,
    autocomplete: Option<String>,
}

/// Search results wrapped with the request echo.
#[derive(Debug, Serialize)]
struct SearchEnvelope {
    success: bool,
    #[serde(rename = "type")]
    kind: &'static str,
    query: String,
    #[serde(flatten)]
    results: SearchResults,
}

/// `GET /api/search?q=&type=&category=&limit=&page=&autocomplete=`
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let q = query.q.unwrap_or_default();

    if query.autocomplete.as_deref() == Some("true") && !q.is_empty() {
        let suggestions = state.with_db(|db| Ok(engine::suggestions(&db.load_data()?, &q)))?;
        return Ok(Json(json!({
            "success": true,
            "type": "autocomplete",
            "query": q,
            "suggestions": suggestions,
        })));
    }

    let kind: SearchKind = query.kind.as_deref().unwrap_or_default().parse()?;
    let category = parse_category_filter(query.category.as_deref())?;
    let results = state.with_db(|db| {
        let params = SearchParams {
            query: q.clone(),
            kind,
            category,
            page: parse_number(query.page.as_deref()).unwrap_or(1),
            limit: resolve_limit(parse_number(query.limit.as_deref()), &db.config().search),
        };
        Ok(engine::search(&db.load_data()?, &params))
    })?;

    Ok(Json(serde_json::to_value(SearchEnvelope {
        success: true,
        kind: "search",
        query: q,
        results,
    })
    .map_err(Error::from)?))
}

/// `POST /api/search` with an advanced search body.
pub async fn advanced_search(
    State(state): State<AppState>,
    body: Result<Json<AdvancedSearchParams>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(params) = body?;
    let results = state.with_db(|db| {
        let limit = resolve_limit(params.limit, &db.config().search);
        Ok(engine::advanced_search(&db.load_data()?, &params, limit))
    })?;

    Ok(Json(serde_json::to_value(SearchEnvelope {
        success: true,
        kind: "advanced_search",
        query: params.query.clone(),
        results,
    })
    .map_err(Error::from)?))
}
