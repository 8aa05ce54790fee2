//! File-backed gallery storage
//!
//! The whole collection lives in one JSON array, most recent first. Every
//! operation runs under one async mutex so read-modify-write cycles never
//! interleave, and writes go through a temp file plus rename so readers
//! never observe a partial document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::GalleryEntry;
use crate::auth::tokens_match;
use crate::error::GatewayError;

/// Result of a delete attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// Entry exists but the token did not match; nothing changed
    Unauthorized,
}

/// Bounded, durable gallery collection
#[derive(Debug)]
pub struct GalleryStore {
    path: PathBuf,
    max_items: usize,
    lock: Mutex<()>,
}

impl GalleryStore {
    /// Open a store, creating an empty document if none exists
    pub async fn open(path: impl Into<PathBuf>, max_items: usize) -> Result<Self, GatewayError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        if !fs::try_exists(&path).await? {
            fs::write(&path, b"[]").await?;
            info!("Created empty gallery at {}", path.display());
        }

        Ok(Self {
            path,
            max_items,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full collection. Unreadable or corrupt documents yield an
    /// empty collection.
    pub async fn read_all(&self) -> Vec<GalleryEntry> {
        let _guard = self.lock.lock().await;
        self.load().await.unwrap_or_else(|e| {
            warn!("{}, treating gallery as empty", e);
            Vec::new()
        })
    }

    /// Prepend an entry, evicting the oldest past capacity
    pub async fn insert(&self, entry: GalleryEntry) -> Result<(), GatewayError> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        let id = entry.id.clone();
        entries.insert(0, entry);

        if entries.len() > self.max_items {
            let evicted = entries.len() - self.max_items;
            entries.truncate(self.max_items);
            debug!("Evicted {} oldest gallery entries", evicted);
        }

        self.persist(&entries).await?;
        info!("Gallery entry {} added ({} total)", id, entries.len());
        Ok(())
    }

    /// Remove an entry if `token` matches its delete token
    pub async fn remove_by_id(&self, id: &str, token: &str) -> Result<RemoveOutcome, GatewayError> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return Ok(RemoveOutcome::NotFound);
        };

        if !tokens_match(&entries[index].delete_token, token) {
            warn!("Rejected delete of gallery entry {}: token mismatch", id);
            return Ok(RemoveOutcome::Unauthorized);
        }

        entries.remove(index);
        self.persist(&entries).await?;
        info!("Gallery entry {} deleted", id);
        Ok(RemoveOutcome::Removed)
    }

    /// Read the document for a mutation. A missing file is empty, other I/O
    /// failures are errors so a write never replaces entries it could not see.
    async fn load(&self) -> Result<Vec<GalleryEntry>, GatewayError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GatewayError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!("Gallery {} is corrupt, treating as empty: {}", self.path.display(), e);
                return Ok(Vec::new());
            }
        };

        // Skip unreadable records individually so their siblings survive
        Ok(records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping gallery record {} in {}: {}", index, self.path.display(), e);
                    None
                }
            })
            .collect())
    }

    async fn persist(&self, entries: &[GalleryEntry]) -> Result<(), GatewayError> {
        let data = serde_json::to_vec(entries)?;
        let tmp_path = self.temp_path();

        let written = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(GatewayError::Storage(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Unique sibling path so the final rename stays on one filesystem
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gallery".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
    }
}
