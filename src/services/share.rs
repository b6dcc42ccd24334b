//! src/services/share.rs
//!
//! Share links and share resolution.
//!
//! A share link is `{origin}/download/{percent-encoded id}` — the only
//! wire-visible contract of this service, since links are handed out
//! externally and must stay resolvable. Resolution is cache-first: a cached
//! record is returned verbatim, and an id with no cache entry (a link opened
//! in a session that never uploaded the file) is recovered from the blob
//! store alone as a derived record with best-effort metadata.

use crate::{
    models::file_record::FileRecord,
    services::{blob_store::BlobStore, metadata_cache::MetadataCache},
};
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use tracing::{debug, warn};

/// The escape set of JavaScript's `encodeURIComponent`: everything except
/// `A-Za-z0-9 - _ . ! ~ * ' ( )` is escaped, including `/`. Links in the
/// wild were minted with exactly this escaping.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither a cache entry nor a resolvable remote path.
    #[error("file `{0}` not found")]
    NotFound(String),
    /// The store could not be consulted during fallback. Presented to
    /// viewers identically to `NotFound`; the distinction only exists at
    /// this seam.
    #[error("storage lookup failed while resolving `{0}`")]
    Store(String, #[source] crate::services::blob_store::StoreError),
}

/// Resolves share identifiers into displayable records.
#[derive(Clone)]
pub struct ShareResolver {
    cache: MetadataCache,
    store: BlobStore,
    origin: String,
}

impl ShareResolver {
    pub fn new(cache: MetadataCache, store: BlobStore, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self {
            cache,
            store,
            origin,
        }
    }

    /// Render the share link for a file id. Deterministic; never persisted
    /// separately from the id.
    pub fn share_link_for(&self, id: &str) -> String {
        format!(
            "{}/download/{}",
            self.origin,
            utf8_percent_encode(id, COMPONENT)
        )
    }

    /// Resolve a possibly-unindexed file identifier.
    ///
    /// 1. Cache lookup by the id as given — the authoritative record.
    /// 2. Otherwise URL-decode the id, treat it as a storage path, and ask
    ///    the store whether it resolves; absent paths are `NotFound`.
    /// 3. Synthesize a derived record: unknown size/mime/owner, fabricated
    ///    upload time, display name recovered from the path.
    pub async fn resolve(&self, file_id: &str) -> Result<FileRecord, ResolveError> {
        match self.cache.find_by_id(file_id).await {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => {}
            // A broken cache must not break shared links; fall through to
            // the store like any other cache miss.
            Err(err) => warn!(file_id, "cache lookup failed, trying store: {err}"),
        }

        let path = decode_component(file_id);
        let present = self
            .store
            .exists(&path)
            .await
            .map_err(|err| ResolveError::Store(path.clone(), err))?;
        if !present {
            return Err(ResolveError::NotFound(file_id.to_string()));
        }

        debug!(%path, "serving derived record for uncached share");
        Ok(FileRecord {
            public_url: self.store.public_url_for(&path),
            share_link: self.share_link_for(&path),
            name: display_name_for(&path),
            id: path.clone(),
            size: 0,
            mime_type: String::new(),
            uploaded_at: Utc::now(),
            owner_id: String::new(),
            storage_path: path,
        })
    }
}

fn decode_component(value: &str) -> String {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Recover a display name from a storage path: take the final segment,
/// strip the generation-time `{timestamp}-{token}-` prefix, and turn the
/// sanitizer's underscores back into spaces.
pub fn display_name_for(path: &str) -> String {
    let segment = path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("file");
    strip_generated_prefix(segment).replace('_', " ")
}

/// Strip a leading `{digits}-{word chars}-` prefix, the shape written by
/// the path generator. Matches `^\d+-\w+-` exactly: both runs must be
/// non-empty and each followed by a literal `-`.
fn strip_generated_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 || i >= bytes.len() || bytes[i] != b'-' {
        return name;
    }
    let mut j = i + 1;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    if j == i + 1 || j >= bytes.len() || bytes[j] != b'-' {
        return name;
    }
    &name[j + 1..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_only_the_generated_prefix() {
        // Only the leading timestamp-token pair goes; leading words stay.
        assert_eq!(
            display_name_for("u1/1700000000000-abc1234-My_Report.pdf"),
            "My Report.pdf"
        );
    }

    #[test]
    fn display_name_without_prefix_is_kept() {
        assert_eq!(display_name_for("u1/plain_name.txt"), "plain name.txt");
        assert_eq!(display_name_for("u1/123.txt"), "123.txt");
        // digits not followed by `-token-` are part of the name
        assert_eq!(display_name_for("u1/2024_budget.xlsx"), "2024 budget.xlsx");
    }

    #[test]
    fn display_name_handles_internal_dashes() {
        assert_eq!(
            display_name_for("u1/123-ab-cd-file.txt"),
            "cd-file.txt"
        );
    }

    #[test]
    fn empty_final_segment_falls_back_to_generic_name() {
        assert_eq!(display_name_for("u1/"), "file");
    }

    #[test]
    fn component_encoding_matches_encode_uri_component() {
        let encoded = utf8_percent_encode("u1/1-a-b c(1)!.txt", COMPONENT).to_string();
        assert_eq!(encoded, "u1%2F1-a-b%20c(1)!.txt");
        assert_eq!(decode_component(&encoded), "u1/1-a-b c(1)!.txt");
    }
}
