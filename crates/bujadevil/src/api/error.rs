use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Error returned by HTTP handlers.
///
/// Domain errors keep their message; anything else is logged and reported
/// as a generic server error.
#[derive(Debug)]
pub struct ApiError(Error);

impl ApiError {
    /// A 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(Error::invalid(message))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) | Error::Conflict(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("invalid request data: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!(error = %self.0, "Request failed");
            "internal server error".to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(Error::invalid("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::conflict("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::unauthorized("x")), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::forbidden("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(Error::not_found("article", "a")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(Error::internal("disk on fire")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
