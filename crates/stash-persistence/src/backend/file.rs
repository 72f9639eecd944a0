//! # Filesystem Backend
//!
//! One file per entry under a sharded directory tree:
//!
//! ```text
//! <root>/<hash[0:2]>/<hash[2:4]>/<hash>
//! ```
//!
//! where `hash` is the hex SHA-256 digest of the storage id. Each file holds
//! a JSON `CacheEntry` envelope. Writes go to a unique temp file in the
//! shard directory and are renamed into place, so a reader sees either the
//! previous or the new complete entry. There is no locking: concurrent
//! writers to one key race and the last rename wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use stash_domain::{CacheEntry, StorageId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{BackendKind, CacheBackend};
use crate::error::{CacheError, Result};

/// Hex characters per shard directory name
const SHARD_WIDTH: usize = 2;

/// Number of nested shard directories
const SHARD_DEPTH: usize = 2;

/// Permissions for shard directories created by the backend
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Location of one entry inside the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardedPath {
    digest: String,
    dir: PathBuf,
    file: PathBuf,
}

impl ShardedPath {
    pub fn resolve(root: &Path, id: &StorageId) -> Self {
        let digest = hex::encode(Sha256::digest(id.as_bytes()));

        let dir = (0..SHARD_DEPTH).fold(root.to_path_buf(), |dir, level| {
            let start = level * SHARD_WIDTH;
            dir.join(&digest[start..start + SHARD_WIDTH])
        });
        let file = dir.join(&digest);

        Self { digest, dir, file }
    }

    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn temp_file(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}.tmp", self.digest, Uuid::new_v4().simple()))
    }
}

/// Filesystem-backed cache storage
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// The root is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, id: &StorageId) -> ShardedPath {
        ShardedPath::resolve(&self.root, id)
    }

    async fn ensure_dir(dir: &Path) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);

        builder.create(dir).await.map_err(|source| {
            tracing::warn!(dir = %dir.display(), error = %source, "Cannot create cache directory");
            CacheError::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            }
        })
    }

    async fn write_atomic(path: &ShardedPath, bytes: &[u8]) -> Result<()> {
        let temp = path.temp_file();

        let mut file = match fs::File::create(&temp).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::warn!(dir = %path.dir().display(), "Cache directory not writable");
                return Err(CacheError::DirectoryNotWritable {
                    path: path.dir().to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp, path.file()).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        file = %temp.display(),
                        error = %cleanup,
                        "Failed to remove temporary cache file"
                    );
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove an entry found stale or unreadable during a read. Failure is
    /// logged and otherwise ignored; the read still reports a miss.
    async fn discard(path: &ShardedPath, reason: &str) {
        match fs::remove_file(path.file()).await {
            Ok(()) => tracing::debug!(file = %path.file().display(), reason, "Discarded cache file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                file = %path.file().display(),
                reason,
                error = %e,
                "Failed to remove cache file"
            ),
        }
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn get(&self, id: &StorageId) -> Result<Option<Value>> {
        let path = self.path_for(id);

        let bytes = match fs::read(path.file()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(file = %path.file().display(), error = %e, "Undecodable cache file");
                Self::discard(&path, "undecodable").await;
                return Ok(None);
            }
        };

        if let Err(e) = entry.check_version() {
            tracing::warn!(file = %path.file().display(), error = %e, "Unsupported cache file");
            Self::discard(&path, "unsupported version").await;
            return Ok(None);
        }

        if !entry.belongs_to(id) {
            // Digest collision: the file belongs to another id, leave it alone
            tracing::debug!(%id, owner = %entry.key, "Cache file owned by another key");
            return Ok(None);
        }

        if entry.is_expired(Utc::now()) {
            Self::discard(&path, "expired").await;
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    async fn set(&self, id: &StorageId, value: &Value, expires_at: DateTime<Utc>) -> Result<bool> {
        let path = self.path_for(id);
        Self::ensure_dir(path.dir()).await?;

        let entry = CacheEntry::new(id, value.clone(), expires_at);
        let bytes = serde_json::to_vec(&entry)?;
        Self::write_atomic(&path, &bytes).await?;

        Ok(true)
    }

    async fn delete(&self, id: &StorageId) -> Result<bool> {
        let path = self.path_for(id);

        match fs::remove_file(path.file()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::File
    }
}
