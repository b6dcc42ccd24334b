//! src/services/blob_store.rs
//!
//! BlobStore — a stateless gateway over the local object store. Payloads
//! live on disk beneath `root/{storage path}`; the gateway owns no record
//! list, only the bytes. Writes are durable (temp file + fsync + atomic
//! rename) and public URLs are computed without touching the filesystem.

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage path `{0}`")]
    InvalidPath(String),
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("failed to write object `{path}`")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete object `{path}`")]
    Delete {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read object `{path}`")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a successful `put`.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// The path the bytes were stored at (echoes the requested path).
    pub path: String,
    /// Number of bytes written.
    pub size_bytes: u64,
}

/// Escape set for one URL path segment: keep unreserved characters only.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const MAX_PATH_LEN: usize = 1024;

/// Stateless facade over the object store.
///
/// - `put` streams bytes to disk durably
/// - `public_url_for` is a pure function of path and configuration
/// - `remove` deletes and surfaces the store's native missing-object error
/// - `exists` is the stat used by share resolution fallback
#[derive(Clone)]
pub struct BlobStore {
    /// Base directory on disk where object payloads are stored.
    root: PathBuf,

    /// Base URL under which `/files/{path}` serves the payloads.
    public_base_url: String,
}

impl BlobStore {
    /// Create a gateway rooted at `root`, issuing public URLs under
    /// `public_base_url`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Basic path validation to avoid trivial traversal vectors.
    ///
    /// Rejects empty or oversized paths, paths that begin with `/` or
    /// contain `..`, and control bytes.
    fn ensure_path_safe(&self, path: &str) -> StoreResult<()> {
        if path.is_empty() || path.len() > MAX_PATH_LEN {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        if path.starts_with('/') || path.contains("..") {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        if path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    /// Physical location of an object's payload. Does not check existence.
    fn object_path(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for segment in path.split('/') {
            full.push(segment);
        }
        full
    }

    /// Stream-write an object's bytes at `path`.
    ///
    /// - Writes incrementally to a temporary file.
    /// - Counts bytes while streaming.
    /// - Atomically renames into the final location.
    ///
    /// Ensures durable writes (fsync) and cleans up temp files on errors.
    /// Any failure surfaces as `StoreError::Write`; nothing is left behind
    /// at the target path.
    pub async fn put<S>(&self, path: &str, stream: S) -> StoreResult<StoredObject>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_path_safe(path)?;

        let write_err = |source: io::Error| StoreError::Write {
            path: path.to_string(),
            source,
        };

        let file_path = self.object_path(path);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| write_err(io::Error::other("object path missing parent directory")))?;
        fs::create_dir_all(&parent).await.map_err(write_err)?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await.map_err(write_err)?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(write_err(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(write_err(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(write_err(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(write_err(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await.map_err(write_err)?;
                fs::rename(&tmp_path, &file_path).await.map_err(write_err)?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(write_err(err));
            }
        }

        debug!(path, size_bytes, "stored object");
        Ok(StoredObject {
            path: path.to_string(),
            size_bytes,
        })
    }

    /// Public URL for an object: `{base}/files/{path}`, each path segment
    /// percent-encoded.
    ///
    /// Deterministic function of path and configuration; performs no I/O and
    /// does not verify the object exists.
    pub fn public_url_for(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/files/{}", self.public_base_url, encoded)
    }

    /// Delete an object's payload.
    ///
    /// Surfaces the store's native error when the object is already absent;
    /// tolerating that is a caller policy, not a gateway one. Empty parent
    /// directories are pruned best-effort afterwards.
    pub async fn remove(&self, path: &str) -> StoreResult<()> {
        self.ensure_path_safe(path)?;
        let file_path = self.object_path(path);
        fs::remove_file(&file_path)
            .await
            .map_err(|source| StoreError::Delete {
                path: path.to_string(),
                source,
            })?;
        debug!(path, "removed object");

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Check whether an object's payload is present.
    ///
    /// A syntactically invalid path resolves to `false` rather than an
    /// error; I/O failures other than absence are surfaced so callers can
    /// tell "gone" from "unreachable" if they care to.
    pub async fn exists(&self, path: &str) -> StoreResult<bool> {
        if self.ensure_path_safe(path).is_err() {
            return Ok(false);
        }
        match fs::metadata(self.object_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    /// Open an object for reading.
    ///
    /// Returns an open file handle and the payload length, ready for
    /// streaming out.
    pub async fn open(&self, path: &str) -> StoreResult<(File, u64)> {
        self.ensure_path_safe(path)?;
        let file_path = self.object_path(path);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::NotFound(path.to_string())
            } else {
                StoreError::Io {
                    path: path.to_string(),
                    source: err,
                }
            }
        })?;
        let len = file
            .metadata()
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_string(),
                source,
            })?
            .len();
        Ok((file, len))
    }

    /// Recursively remove empty directories up to the store root.
    ///
    /// Stops on the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.root) && current != self.root {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn scratch_store() -> (BlobStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("filedrop-store-{}", Uuid::new_v4()));
        (
            BlobStore::new(&root, "http://localhost:3000"),
            root,
        )
    }

    fn one_chunk(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::iter([Ok(Bytes::from_static(bytes))])
    }

    #[tokio::test]
    async fn put_then_exists_then_remove() {
        let (store, root) = scratch_store();
        let stored = store.put("u1/1-aa-f.txt", one_chunk(b"hello")).await.unwrap();
        assert_eq!(stored.path, "u1/1-aa-f.txt");
        assert_eq!(stored.size_bytes, 5);
        assert!(store.exists("u1/1-aa-f.txt").await.unwrap());

        store.remove("u1/1-aa-f.txt").await.unwrap();
        assert!(!store.exists("u1/1-aa-f.txt").await.unwrap());
        // owner directory pruned along with the object
        assert!(!root.join("u1").exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn remove_missing_object_surfaces_native_error() {
        let (store, root) = scratch_store();
        let err = store.remove("u1/absent.bin").await.unwrap_err();
        assert!(matches!(err, StoreError::Delete { .. }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn unsafe_paths_are_rejected() {
        let (store, root) = scratch_store();
        for bad in ["", "/abs/path", "u1/../../etc/passwd"] {
            let err = store.put(bad, one_chunk(b"x")).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)), "accepted {bad:?}");
        }
        assert!(!store.exists("u1/../escape").await.unwrap());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn public_url_is_pure_and_segment_encoded() {
        let store = BlobStore::new("/tmp/unused", "http://localhost:3000/");
        assert_eq!(
            store.public_url_for("u1/170-abc-a b.txt"),
            "http://localhost:3000/files/u1/170-abc-a%20b.txt"
        );
        // no I/O happens, so a path that was never stored still gets a URL
        assert_eq!(
            store.public_url_for("ghost/none"),
            "http://localhost:3000/files/ghost/none"
        );
    }
}
