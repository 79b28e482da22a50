//! # Asset storage for avatars and article images
//!
//! An [`AssetStore`] accepts an uploaded blob and returns the stable reference
//! name that is saved on the user or article document. The HTTP layer serves
//! stored names under `/assets/<name>`.
//!
//! | Implementation | Used by |
//! |----------------|---------|
//! | [`DiskAssets`] | The server; writes into a directory on disk |
//! | [`MemoryAssets`] | Tests |
//!
//! Reference names are `<stem>_<millis>_<suffix>.<ext>`, derived from the
//! uploaded file name with anything outside `[A-Za-z0-9_-]` replaced.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

/// A file received with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist the upload and return its reference name.
    async fn save(&self, upload: &Upload) -> io::Result<String>;

    /// Remove a stored asset. Removing a name that does not exist is not an error.
    async fn remove(&self, name: &str) -> io::Result<()>;
}

/// Build the reference name for an uploaded file.
pub fn asset_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };
    let stem = sanitize(stem);
    let stem = if stem.is_empty() { "asset".to_string() } else { stem };
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    let millis = Utc::now().timestamp_millis();
    match ext.map(sanitize).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{stem}_{millis}_{suffix}.{}", ext.to_lowercase()),
        None => format!("{stem}_{millis}_{suffix}"),
    }
}

/// Remove an asset that is no longer referenced. Failures are logged only.
pub(crate) async fn discard(assets: &dyn AssetStore, name: &str) {
    if let Err(e) = assets.remove(name).await {
        tracing::warn!(asset = %name, error = %e, "Failed to remove asset");
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Only names produced by [`asset_name`] are accepted for removal.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Assets stored as files in one directory.
#[derive(Clone, Debug)]
pub struct DiskAssets {
    dir: PathBuf,
}

impl DiskAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AssetStore for DiskAssets {
    async fn save(&self, upload: &Upload) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = asset_name(&upload.file_name);
        tokio::fs::write(self.dir.join(&name), &upload.bytes).await?;
        tracing::debug!(%name, size = upload.bytes.len(), "Stored asset");
        Ok(name)
    }

    async fn remove(&self, name: &str) -> io::Result<()> {
        if !is_plain_name(name) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid asset name"));
        }
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory assets keyed by reference name.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(name))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| io::Error::other("asset map poisoned"))
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn save(&self, upload: &Upload) -> io::Result<String> {
        let name = asset_name(&upload.file_name);
        self.lock()?.insert(name.clone(), upload.bytes.clone());
        Ok(name)
    }

    async fn remove(&self, name: &str) -> io::Result<()> {
        self.lock()?.remove(name);
        Ok(())
    }
}
