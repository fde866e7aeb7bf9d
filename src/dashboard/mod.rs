//! Admin dashboard API
//!
//! Read-only views over the log service (recent entries, error summary,
//! latency per endpoint) plus retention and flush triggers, served over HTTP.

pub mod middleware;
pub mod server;

pub use middleware::{capture_errors, request_info, request_logging};
pub use server::{router, start, DashboardState, ServerHandle};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::logging::{ErrorInfo, ParseLevelError};

/// `?hours=&level=` parameters of the query endpoints
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub hours: Option<u32>,
    pub level: Option<String>,
}

/// `?days=` parameter of the cleanup endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<u32>,
}

/// Errors returned by dashboard handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidLevel(#[from] ParseLevelError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidLevel(_) => StatusCode::BAD_REQUEST,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();

        // Picked up by the capture_errors middleware
        if status.is_server_error() {
            let error = ErrorInfo {
                name: "ApiError".to_string(),
                ..ErrorInfo::from_error(&self)
            };
            response.extensions_mut().insert(error);
        }
        response
    }
}
