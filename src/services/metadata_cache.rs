//! src/services/metadata_cache.rs
//!
//! MetadataCache — the local index of uploaded files, persisted as one JSON
//! file holding the full record list. Every mutation is read-modify-write of
//! the whole list, written through a temp file and an atomic rename so
//! readers only ever see a complete list and a crash mid-write cannot empty
//! the index. Mutations are serialized through an in-process mutex; the
//! cache assumes a single active writer and is NOT safe for multiple
//! processes writing the same file.
//!
//! The cache is a best-effort index, not a source of truth: a missing or
//! unreadable file reads as an empty list and never takes the service down.

use crate::models::file_record::FileRecord;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode cache contents: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// JSON-file-backed list of `FileRecord`.
///
/// An explicitly owned service handle: construct one at startup and pass
/// clones wherever the cache is needed. Clones share the write lock.
#[derive(Clone)]
pub struct MetadataCache {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl MetadataCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read the full persisted list.
    ///
    /// Absent file reads as `[]`. A corrupt file also reads as `[]` (with a
    /// warning) rather than failing every operation behind it.
    pub async fn load(&self) -> CacheResult<Vec<FileRecord>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(
                    "cache file {} is unreadable, treating as empty: {}",
                    self.path.display(),
                    err
                );
                Ok(Vec::new())
            }
        }
    }

    /// Write the full list back.
    ///
    /// Goes through a temp file in the same directory and an atomic rename:
    /// a concurrent `load` sees either the old list or the new one, never a
    /// truncated file.
    async fn store(&self, records: &[FileRecord]) -> CacheResult<()> {
        let bytes = serde_json::to_vec(records)?;
        let tmp_path = self.path.with_file_name(format!(".tmp-{}", Uuid::new_v4()));
        fs::write(&tmp_path, bytes).await?;
        if let Err(err) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Append a record to the end of the list.
    ///
    /// No dedup check: callers guarantee uniqueness through generated ids.
    pub async fn append(&self, record: FileRecord) -> CacheResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.push(record);
        self.store(&records).await
    }

    /// All records belonging to `owner_id`, in insertion order.
    pub async fn list_by_owner(&self, owner_id: &str) -> CacheResult<Vec<FileRecord>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.owner_id == owner_id)
            .collect())
    }

    /// Exact-match lookup by id.
    pub async fn find_by_id(&self, id: &str) -> CacheResult<Option<FileRecord>> {
        let records = self.load().await?;
        Ok(records.into_iter().find(|record| record.id == id))
    }

    /// Remove the first (expected-only) record with `id`; no-op when absent.
    pub async fn remove(&self, id: &str) -> CacheResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if let Some(pos) = records.iter().position(|record| record.id == id) {
            records.remove(pos);
            self.store(&records).await?;
        }
        Ok(())
    }

    /// Number of cached records; used by the readiness probe.
    pub async fn count(&self) -> CacheResult<usize> {
        Ok(self.load().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scratch_cache() -> (MetadataCache, PathBuf) {
        let path = std::env::temp_dir().join(format!("filedrop-cache-{}.json", Uuid::new_v4()));
        (MetadataCache::new(&path), path)
    }

    fn record(id: &str, owner: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: "notes.txt".to_string(),
            size: 5,
            mime_type: "text/plain".to_string(),
            public_url: format!("http://localhost:3000/files/{id}"),
            share_link: format!("http://localhost:3000/download/{id}"),
            uploaded_at: Utc::now(),
            owner_id: owner.to_string(),
            storage_path: id.to_string(),
        }
    }

    #[tokio::test]
    async fn absent_file_reads_as_empty() {
        let (cache, path) = scratch_cache();
        assert!(cache.load().await.unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn append_find_remove_cycle() {
        let (cache, path) = scratch_cache();
        cache.append(record("u1/1-aa-notes.txt", "u1")).await.unwrap();
        cache.append(record("u1/2-bb-notes.txt", "u1")).await.unwrap();

        let found = cache.find_by_id("u1/1-aa-notes.txt").await.unwrap();
        assert_eq!(found.unwrap().owner_id, "u1");

        cache.remove("u1/1-aa-notes.txt").await.unwrap();
        assert!(cache.find_by_id("u1/1-aa-notes.txt").await.unwrap().is_none());
        assert_eq!(cache.count().await.unwrap(), 1);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn remove_absent_id_is_a_no_op() {
        let (cache, path) = scratch_cache();
        cache.append(record("u1/1-aa-notes.txt", "u1")).await.unwrap();
        cache.remove("u9/none").await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn listing_never_crosses_owners() {
        let (cache, path) = scratch_cache();
        cache.append(record("u1/1-aa-notes.txt", "u1")).await.unwrap();
        cache.append(record("u2/1-bb-notes.txt", "u2")).await.unwrap();

        let mine = cache.list_by_owner("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|r| r.owner_id == "u1"));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn readers_never_observe_a_torn_write() {
        let (cache, path) = scratch_cache();
        cache
            .append(record("u1/0-stable-notes.txt", "u1"))
            .await
            .unwrap();

        // One writer churning the list while a reader repeatedly lists: the
        // stable record must be present in every read.
        let churn = cache.clone();
        let writer = tokio::spawn(async move {
            for i in 0..200 {
                let id = format!("u1/{i}-churn-extra.txt");
                churn.append(record(&id, "u1")).await.unwrap();
                churn.remove(&id).await.unwrap();
            }
        });

        while !writer.is_finished() {
            let listed = cache.list_by_owner("u1").await.unwrap();
            assert!(
                listed.iter().any(|r| r.id == "u1/0-stable-notes.txt"),
                "stable record vanished from listing"
            );
        }
        writer.await.unwrap();

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let (cache, path) = scratch_cache();
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(cache.load().await.unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }
}
