//! HTTP handlers for uploads, listings, deletes and share links.
//! Streams response bodies to avoid buffering in memory and delegates all
//! storage concerns to `FileService`.

use crate::{
    errors::AppError,
    services::{lifecycle::FileService, share::display_name_for},
};
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use futures::stream;
use std::io;
use tokio_util::io::ReaderStream;

/// Authenticated caller identity, taken from the `x-user-id` header.
///
/// The identity collaborator lives in front of this service; here the user
/// id is only ever an opaque string.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "missing x-user-id header"))
    }
}

/// POST `/api/files` — upload the first file part of a multipart body.
pub async fn upload_file(
    State(service): State<FileService>,
    OwnerId(owner_id): OwnerId,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().unwrap_or("").to_string();

        // Feed the field's chunks straight through to the store instead of
        // buffering the file; the record's size is the byte count written.
        let stream = stream::try_unfold(field, |mut field| async move {
            match field.chunk().await {
                Ok(Some(bytes)) => Ok(Some((bytes, field))),
                Ok(None) => Ok(None),
                Err(err) => Err(io::Error::other(err)),
            }
        });
        let record = service
            .upload(&owner_id, &file_name, &mime_type, None, stream, None)
            .await?;

        return Ok((StatusCode::CREATED, Json(record)));
    }

    Err(AppError::new(
        StatusCode::BAD_REQUEST,
        "multipart body contained no file",
    ))
}

/// GET `/api/files` — list the caller's uploads.
pub async fn list_files(
    State(service): State<FileService>,
    OwnerId(owner_id): OwnerId,
) -> Result<impl IntoResponse, AppError> {
    let records = service.list(&owner_id).await?;
    Ok(Json(records))
}

/// DELETE `/api/files/{*file_id}` — delete one of the caller's uploads.
///
/// A failed remote removal propagates and leaves the record listed, so the
/// delete stays retryable.
pub async fn delete_file(
    State(service): State<FileService>,
    OwnerId(owner_id): OwnerId,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Files belonging to someone else are indistinguishable from absent ones.
    match service.find_by_id(&file_id).await? {
        Some(record) if record.owner_id == owner_id => {}
        _ => return Err(AppError::not_found(format!("file `{file_id}` not found"))),
    }

    service.delete(&file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/download/{file_id}` — resolve a share link into a record.
///
/// Unauthenticated: share links must work in sessions that never uploaded
/// the file, degrading to a derived record when the cache has no entry.
pub async fn resolve_share(
    State(service): State<FileService>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = service.resolve(&file_id).await?;
    Ok(Json(record))
}

/// GET `/files/{*path}` — serve an object's bytes publicly, streamed.
pub async fn serve_file(
    State(service): State<FileService>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.store().open(&path).await?;

    // Cached metadata improves the headers; a missing entry is fine.
    let cached = service.find_by_id(&path).await.unwrap_or(None);
    let (name, mime_type) = match cached {
        Some(record) => (record.name, record.mime_type),
        None => (display_name_for(&path), String::new()),
    };
    let content_type = if mime_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime_type
    };

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "_"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
