//! Defines routes for the file sharing API.
//!
//! ## Structure
//! - **Authenticated endpoints** (require `x-user-id`)
//!   - `POST   /api/files` — upload a file (multipart)
//!   - `GET    /api/files` — list the caller's uploads
//!   - `DELETE /api/files/{*file_id}` — delete an upload by id
//!
//! - **Public endpoints**
//!   - `GET /download/{file_id}` — resolve a share link into file metadata
//!   - `GET /files/{*path}` — download an object's bytes
//!   - `GET /healthz`, `GET /readyz` — probes
//!
//! File ids are storage paths, so the delete and byte-serving routes use
//! wildcards to allow the embedded `/`; share ids arrive percent-encoded as
//! a single segment.

use crate::{
    handlers::{
        file_handlers::{delete_file, list_files, resolve_share, serve_file, upload_file},
        health_handlers::{healthz, readyz},
    },
    services::lifecycle::FileService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Upper bound for uploaded bodies.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Build and return the router for the whole service.
///
/// The router carries shared state (`FileService`) to all handlers.
pub fn routes() -> Router<FileService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // authenticated file management
        .route("/api/files", post(upload_file).get(list_files))
        .route("/api/files/{*file_id}", delete(delete_file))
        // public share surface
        .route("/download/{file_id}", get(resolve_share))
        .route("/files/{*path}", get(serve_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
