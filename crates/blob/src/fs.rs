use std::path::PathBuf;

use async_trait::async_trait;

use crate::{content_address, error::Result, BlobError, BlobId, BlobVault};

/// Filesystem-backed [`BlobVault`] with a two-level fan-out directory layout
/// (`<root>/<first-2-hex-chars>/<id>`), the common sharding scheme used by
/// content-addressed stores to keep any one directory from growing without
/// bound.
pub struct FsBlobVault {
    root: PathBuf,
}

impl FsBlobVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let (shard, rest) = id.split_at(2.min(id.len()));
        self.root.join(shard).join(rest)
    }
}

#[async_trait]
impl BlobVault for FsBlobVault {
    async fn create_blob(&self, data: &[u8]) -> Result<(BlobId, u64)> {
        let id = content_address(data);
        let path = self.path_for(&id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BlobError::Io(e.to_string()))?;
        }
        tokio::fs::write(&path, data).await.map_err(|e| BlobError::Io(e.to_string()))?;
        Ok((id, data.len() as u64))
    }

    async fn serve_blob(&self, id: &BlobId) -> Result<Vec<u8>> {
        let path = self.path_for(id);
        tokio::fs::read(&path).await.map_err(|_| BlobError::BlobNotFound(id.clone()))
    }

    async fn purge_blob(&self, id: &BlobId) -> Result<()> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsBlobVault::new(dir.path());
        let (id, size) = vault.create_blob(b"metalocker").await.unwrap();
        assert_eq!(size, 10);
        let back = vault.serve_blob(&id).await.unwrap();
        assert_eq!(back, b"metalocker");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsBlobVault::new(dir.path());
        let err = vault.serve_blob(&"deadbeef".to_string()).await.unwrap_err();
        assert!(matches!(err, BlobError::BlobNotFound(_)));
    }
}
