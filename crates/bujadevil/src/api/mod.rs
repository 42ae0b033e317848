//! JSON HTTP API.
//!
//! Three resources, mirroring the blog front end:
//!
//! - `/api/admin`: dashboard, content management and backups (admin token)
//! - `/api/comments`: reading and writing comments (session token)
//! - `/api/search`: search and autocomplete (public)
//!
//! Successful responses carry `"success": true`; failures carry
//! `{"error": "..."}` with a matching status code.

mod admin;
mod comments;
mod error;
mod search;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::blog::BlogDb;
use crate::error::Result;

pub use error::ApiError;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    db: Arc<Mutex<BlogDb>>,
}

impl AppState {
    /// Wrap an opened blog.
    #[must_use]
    pub fn new(db: BlogDb) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` with exclusive access to the blog.
    ///
    /// The lock is released when `f` returns; never call this across an
    /// `.await`.
    pub fn with_db<T>(&self, f: impl FnOnce(&BlogDb) -> Result<T>) -> Result<T> {
        let db = self.db.lock();
        f(&db)
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors_enabled = state.db.lock().config().server.cors_enabled;

    let router = Router::new()
        .route(
            "/api/admin",
            get(admin::get_admin)
                .post(admin::post_admin)
                .put(admin::put_admin)
                .delete(admin::delete_admin),
        )
        .route(
            "/api/comments",
            get(comments::list_comments)
                .post(comments::create_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/api/search",
            get(search::search).post(search::advanced_search),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
    } else {
        router
    }
}

/// Serve the API on `addr` until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Token from an `Authorization: Bearer ...` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Lenient integer parameter: anything unparsable counts as absent.
fn parse_number(value: Option<&str>) -> Option<usize> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(Some("12")), Some(12));
        assert_eq!(parse_number(Some("abc")), None);
        assert_eq!(parse_number(Some("-3")), None);
        assert_eq!(parse_number(None), None);
    }
}
