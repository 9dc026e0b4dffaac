//! Error types for fip-context
//!
//! Every failure reaching the HTTP layer is a 500 with an
//! `{"error":{"code","message"}}` body. There is no degraded 200 response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::types::UpstreamError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Now-playing, resolution or genre lookup failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Persisting the enriched song failed
    #[error("couldn't store song: {0}")]
    Storage(#[from] fip_common::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code();
        let message = self.to_string();
        error!(code = error_code, error = %message, "Request failed");

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NowPlayingError;

    #[tokio::test]
    async fn test_upstream_error_renders_500_body() {
        let err = ApiError::from(UpstreamError::from(NowPlayingError::Transport(
            "connection refused".to_string(),
        )));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(
            json["error"]["message"],
            "couldn't get current song: FIP API transport error: connection refused"
        );
    }

    #[test]
    fn test_storage_error_code() {
        let err = ApiError::from(fip_common::Error::Config("x".to_string()));
        assert_eq!(err.code(), "STORAGE_ERROR");
    }
}
