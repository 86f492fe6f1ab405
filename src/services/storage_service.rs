//! src/services/storage_service.rs
//!
//! AssetStore: append-only image storage on local disk. Every asset is
//! named by a fresh 128-bit random token, so concurrent requests never share
//! a filename and no locking is required. Files are written to a temp name,
//! synced, then renamed into place, so a cancelled request leaves at most an
//! orphaned `.tmp-*` file and never a half-written asset.

use crate::models::asset::{StoredAsset, ValidatedImage};
use bytes::Bytes;
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_RELATIVE_PATH_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    IoFailure(#[from] io::Error),
    #[error("invalid asset path `{0}`")]
    InvalidPath(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Directory-backed store for validated images.
///
/// The directory is shared with the static file server; whatever is written
/// here becomes reachable under the static URL prefix.
#[derive(Clone, Debug)]
pub struct AssetStore {
    /// Base directory on disk where assets are written.
    pub base_path: PathBuf,
}

impl AssetStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// A fresh asset token: 128 bits from the thread-local CSPRNG, hex encoded.
    pub fn new_token() -> String {
        format!("{:032x}", rand::random::<u128>())
    }

    /// Reject relative paths that could escape the base directory.
    fn ensure_path_safe(&self, relative_path: &str) -> StorageResult<()> {
        if relative_path.is_empty()
            || relative_path.len() > MAX_RELATIVE_PATH_LEN
            || relative_path.contains('/')
            || relative_path.contains('\\')
            || relative_path.contains("..")
            || relative_path.bytes().any(|b| b.is_ascii_control())
        {
            return Err(StorageError::InvalidPath(relative_path.to_string()));
        }
        Ok(())
    }

    fn asset_path(&self, relative_path: &str) -> PathBuf {
        self.base_path.join(relative_path)
    }

    /// Write a validated image under a new random name.
    ///
    /// - Writes to a temporary file in the base directory.
    /// - Flushes and fsyncs.
    /// - Renames into `{token}{ext}`.
    ///
    /// The temp file is removed on any error.
    pub async fn persist(&self, image: &ValidatedImage) -> StorageResult<StoredAsset> {
        fs::create_dir_all(&self.base_path).await?;

        let id = Self::new_token();
        let relative_path = format!("{}{}", id, image.canonical_extension);
        let final_path = self.asset_path(&relative_path);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, &image.canonical_bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::IoFailure(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::IoFailure(err));
        }

        debug!(
            asset_id = %id,
            bytes = image.canonical_bytes.len(),
            "stored asset {}",
            final_path.display()
        );

        Ok(StoredAsset { id, relative_path })
    }

    /// Read a stored asset back from disk.
    pub async fn resolve(&self, asset: &StoredAsset) -> StorageResult<Bytes> {
        self.ensure_path_safe(&asset.relative_path)?;
        let bytes = fs::read(self.asset_path(&asset.relative_path)).await?;
        Ok(Bytes::from(bytes))
    }

    /// Write/read/delete a probe file in the base directory.
    pub async fn probe(&self) -> StorageResult<()> {
        let probe_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&probe_path, b"readyz").await?;
        let read_back = fs::read(&probe_path).await;
        let _ = fs::remove_file(&probe_path).await;

        if read_back? != b"readyz" {
            return Err(StorageError::IoFailure(io::Error::new(
                io::ErrorKind::InvalidData,
                "probe file content mismatch",
            )));
        }
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::asset::CanonicalExtension;
    use regex::Regex;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn image(bytes: &'static [u8], ext: CanonicalExtension) -> ValidatedImage {
        ValidatedImage {
            canonical_bytes: Bytes::from_static(bytes),
            canonical_extension: ext,
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn persisted_asset_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path());

        let asset = store
            .persist(&image(b"pixels", CanonicalExtension::Webp))
            .await
            .unwrap();

        let token = Regex::new(r"^[0-9a-f]{32}$").unwrap();
        assert!(token.is_match(&asset.id));
        assert_eq!(asset.relative_path, format!("{}.webp", asset.id));
        assert_eq!(store.resolve(&asset).await.unwrap(), Bytes::from_static(b"pixels"));
    }

    #[tokio::test]
    async fn no_temp_files_are_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path());
        store.persist(&image(b"a", CanonicalExtension::Png)).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with(".tmp-"));
    }

    #[tokio::test]
    async fn concurrent_persists_get_distinct_tokens() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .persist(&image(b"same bytes", CanonicalExtension::Png))
                    .await
                    .unwrap()
            });
        }

        let mut ids = HashSet::new();
        while let Some(asset) = tasks.join_next().await {
            assert!(ids.insert(asset.unwrap().id));
        }
        assert_eq!(ids.len(), 32);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 32);
    }

    #[tokio::test]
    async fn resolve_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path());
        let asset = StoredAsset {
            id: "x".into(),
            relative_path: "../etc/passwd".into(),
        };
        assert!(matches!(
            store.resolve(&asset).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn unwritable_directory_is_an_io_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let store = AssetStore::new(&blocker);

        let err = store
            .persist(&image(b"a", CanonicalExtension::Png))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::IoFailure(_)));
    }

    #[tokio::test]
    async fn probe_succeeds_on_writable_directory() {
        let dir = TempDir::new().unwrap();
        AssetStore::new(dir.path()).probe().await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
