//! src/services/lifecycle.rs
//!
//! FileService — the lifecycle manager orchestrating uploads and deletes
//! across the path generator, blob store gateway, and metadata cache. It is
//! also the state handed to every HTTP handler.
//!
//! Ordering rules it enforces:
//! - upload: nothing is cached unless the store write succeeded
//! - delete: the remote object goes first; a store failure leaves the cache
//!   entry in place so the item stays listed and the delete is retryable

use crate::{
    models::file_record::FileRecord,
    services::{
        blob_store::{BlobStore, StoreError},
        metadata_cache::{CacheError, MetadataCache},
        path_gen,
        share::{ResolveError, ShareResolver},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::io;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("upload of `{name}` failed")]
    Upload {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("delete of `{id}` failed")]
    Delete {
        id: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type FileResult<T> = Result<T, FileError>;

/// Progress events emitted during an upload.
///
/// `Measured` is byte-accurate and only available when the caller declared
/// the total size up front. Without one, the service falls back to a
/// monotonically increasing `Estimated` heartbeat — an estimate by name,
/// never to be presented as a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProgress {
    Measured { bytes_written: u64, total_bytes: u64 },
    Estimated { percent: u8 },
    Completed,
}

const ESTIMATE_STEP: u8 = 5;
const ESTIMATE_CEILING: u8 = 95;

/// Orchestrates the file lifecycle and exposes the other services.
#[derive(Clone)]
pub struct FileService {
    store: BlobStore,
    cache: MetadataCache,
    resolver: ShareResolver,
}

impl FileService {
    pub fn new(store: BlobStore, cache: MetadataCache, resolver: ShareResolver) -> Self {
        Self {
            store,
            cache,
            resolver,
        }
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Upload a file: generate a storage path, write the bytes, and index
    /// the resulting record. On a failed write nothing is cached.
    ///
    /// `declared_size` only drives progress reporting; the record's size is
    /// always the byte count actually written. `progress` is optional and
    /// lossy: events are dropped rather than ever stalling the upload.
    pub async fn upload<S>(
        &self,
        owner_id: &str,
        file_name: &str,
        mime_type: &str,
        declared_size: Option<u64>,
        stream: S,
        progress: Option<mpsc::Sender<UploadProgress>>,
    ) -> FileResult<FileRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let path = path_gen::generate_path(owner_id, file_name);

        let reporter = progress.clone();
        let mut bytes_seen: u64 = 0;
        let mut estimate: u8 = 0;
        let stream = stream.map(move |chunk| {
            if let (Ok(bytes), Some(tx)) = (&chunk, reporter.as_ref()) {
                bytes_seen += bytes.len() as u64;
                let event = match declared_size {
                    Some(total_bytes) => UploadProgress::Measured {
                        bytes_written: bytes_seen,
                        total_bytes,
                    },
                    None => {
                        estimate = (estimate + ESTIMATE_STEP).min(ESTIMATE_CEILING);
                        UploadProgress::Estimated { percent: estimate }
                    }
                };
                let _ = tx.try_send(event);
            }
            chunk
        });

        let stored = self
            .store
            .put(&path, stream)
            .await
            .map_err(|source| FileError::Upload {
                name: file_name.to_string(),
                source,
            })?;

        let record = FileRecord {
            id: stored.path.clone(),
            name: file_name.to_string(),
            size: stored.size_bytes,
            mime_type: mime_type.to_string(),
            public_url: self.store.public_url_for(&stored.path),
            share_link: self.resolver.share_link_for(&stored.path),
            uploaded_at: Utc::now(),
            owner_id: owner_id.to_string(),
            storage_path: stored.path,
        };
        self.cache.append(record.clone()).await?;

        if let Some(tx) = progress {
            let _ = tx.try_send(UploadProgress::Completed);
        }
        info!(
            owner_id,
            id = %record.id,
            size = record.size,
            "uploaded {}",
            record.name
        );
        Ok(record)
    }

    /// Delete a file by id.
    ///
    /// Looks up the record, removes the remote object, then evicts the
    /// cache entry — strictly in that order. A store failure propagates
    /// without touching the cache, leaving the item listed for retry.
    pub async fn delete(&self, file_id: &str) -> FileResult<()> {
        let record = self
            .cache
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| FileError::NotFound(file_id.to_string()))?;

        if let Err(source) = self.store.remove(&record.storage_path).await {
            warn!(file_id, "remote removal failed, record left cached: {source}");
            return Err(FileError::Delete {
                id: file_id.to_string(),
                source,
            });
        }

        self.cache.remove(file_id).await?;
        info!(file_id, "deleted file");
        Ok(())
    }

    /// All of one owner's records, in insertion order.
    pub async fn list(&self, owner_id: &str) -> FileResult<Vec<FileRecord>> {
        Ok(self.cache.list_by_owner(owner_id).await?)
    }

    /// Exact-match cache lookup.
    pub async fn find_by_id(&self, file_id: &str) -> FileResult<Option<FileRecord>> {
        Ok(self.cache.find_by_id(file_id).await?)
    }

    /// Resolve a share identifier (cache first, store fallback).
    pub async fn resolve(&self, file_id: &str) -> Result<FileRecord, ResolveError> {
        self.resolver.resolve(file_id).await
    }
}
