//! File <-> payload adapters
//!
//! The session never touches the filesystem directly; it goes through a
//! [`PayloadStore`] to turn a selected file into a payload and to materialize a
//! received payload back into a file.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use peerlink_config::PeerConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads outgoing payloads from files and saves incoming payloads to files
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Read the whole file at `path`
    async fn load(&self, path: &Path) -> Result<Bytes>;

    /// Persist a received payload and return where it was written
    async fn save(&self, payload: &Bytes) -> Result<PathBuf>;
}

/// Filesystem-backed store
///
/// Every received payload is written to the same file name inside `dir`,
/// replacing whatever was there before.
#[derive(Debug, Clone)]
pub struct FsPayloadStore {
    dir: PathBuf,
    file_name: String,
}

impl FsPayloadStore {
    /// Create a store writing `file_name` inside `dir`
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// Create a store from the peer configuration
    pub fn from_config(config: &PeerConfig) -> Self {
        Self::new(config.save_dir.clone(), config.received_file_name.clone())
    }

    /// Path received payloads are written to
    pub fn target_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[async_trait]
impl PayloadStore for FsPayloadStore {
    async fn load(&self, path: &Path) -> Result<Bytes> {
        let contents = tokio::fs::read(path).await?;
        debug!(path = %path.display(), len = contents.len(), "loaded payload");
        Ok(Bytes::from(contents))
    }

    async fn save(&self, payload: &Bytes) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.target_path();
        tokio::fs::write(&path, payload).await?;
        debug!(path = %path.display(), len = payload.len(), "saved payload");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[tokio::test]
    async fn test_save_creates_dir_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPayloadStore::new(dir.path().join("inbox"), "picture");

        let first = store.save(&Bytes::from_static(b"first version")).await.unwrap();
        let second = store.save(&Bytes::from_static(b"v2")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tokio::fs::read(&second).await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        tokio::fs::write(&path, [0xFFu8, 0xD8, 0xFF, 0xE0]).await.unwrap();

        let store = FsPayloadStore::new(dir.path(), "unused");
        let payload = store.load(&path).await.unwrap();

        assert_eq!(&payload[..], &[0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPayloadStore::new(dir.path(), "unused");

        let result = store.load(&dir.path().join("nope")).await;
        assert!(matches!(result, Err(SessionError::Store(_))));
    }

    #[test]
    fn test_from_config() {
        let config = PeerConfig::default().with_save_dir("/tmp/peerlink-inbox");
        let store = FsPayloadStore::from_config(&config);
        assert_eq!(store.target_path(), config.received_file_path());
    }
}
