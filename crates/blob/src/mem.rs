use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{content_address, error::Result, BlobError, BlobId, BlobVault};

/// In-memory [`BlobVault`], used in unit tests and the demo binary.
#[derive(Default)]
pub struct MemBlobVault {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
}

impl MemBlobVault {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobVault for MemBlobVault {
    async fn create_blob(&self, data: &[u8]) -> Result<(BlobId, u64)> {
        let id = content_address(data);
        let len = data.len() as u64;
        self.blobs.write().entry(id.clone()).or_insert_with(|| data.to_vec());
        Ok((id, len))
    }

    async fn serve_blob(&self, id: &BlobId) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| BlobError::BlobNotFound(id.clone()))
    }

    async fn purge_blob(&self, id: &BlobId) -> Result<()> {
        self.blobs.write().remove(id);
        Ok(())
    }
}
