use crate::services::{
    blob_store::StoreError,
    lifecycle::FileError,
    metadata_cache::CacheError,
    share::ResolveError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(_) => AppError::not_found(err.to_string()),
            FileError::Upload { .. } | FileError::Delete { .. } => {
                AppError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            FileError::Cache(inner) => inner.into(),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        // Viewers cannot tell a deleted file from an unreachable store;
        // both render as "file unavailable". Keep the real cause in the log.
        if let ResolveError::Store(path, source) = &err {
            tracing::warn!(%path, "share resolution hit a store failure: {source}");
        }
        AppError::not_found("file unavailable")
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound(_) => AppError::not_found(err.to_string()),
            StoreError::InvalidPath(_) => AppError::new(StatusCode::BAD_REQUEST, err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}
