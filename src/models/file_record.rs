//! Represents one uploaded file and its share metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single uploaded file.
///
/// A record is created on successful upload and indexed by `id` in the
/// metadata cache. Records read back through a share link may instead be
/// derived from the blob store alone; such derived records carry `size = 0`,
/// an empty `mime_type` and an empty `owner_id` because that information is
/// not recoverable from the store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier; equal to the storage path and embedded in share links.
    pub id: String,

    /// Original filename, used for display and as the suggested download name.
    pub name: String,

    /// Size in bytes; 0 when unknown (derived records).
    pub size: u64,

    /// MIME type; may be empty when unknown.
    pub mime_type: String,

    /// URL resolving to the object's bytes without authentication.
    pub public_url: String,

    /// Share link: `{origin}/download/{percent-encoded id}`. Always
    /// recomputable from `id`, never persisted independently of it.
    pub share_link: String,

    /// When the file was uploaded. Fabricated as "now" for derived records,
    /// since the store alone carries no authoritative creation time.
    pub uploaded_at: DateTime<Utc>,

    /// Owner of the upload; empty for derived records.
    pub owner_id: String,

    /// Storage path in the blob store. Currently equal to `id`, kept as a
    /// separate field so the two may diverge if path encoding rules change.
    pub storage_path: String,
}
