//! Off-chain blob vault interface (component C2).
//!
//! The ledger core never stores binary payloads itself; it only stores the
//! `operationAddress` a vault hands back from [`BlobVault::create_blob`] (see
//! the `Lease` operation in `metalocker-ledger`). Production vault backends
//! (object storage, etc.) are out of scope here; this crate defines the
//! trait contract plus two test/demo doubles.

mod error;
mod fs;
mod mem;

pub use error::{BlobError, Result};
pub use fs::FsBlobVault;
pub use mem::MemBlobVault;

use async_trait::async_trait;

/// Opaque content-derived identifier for a stored blob.
pub type BlobId = String;

/// Content-addressed binary storage consumed by the ledger for operation
/// payloads (spec §4.2). Identical bytes always yield the same `BlobId`.
#[async_trait]
pub trait BlobVault: Send + Sync {
    /// Stores `data`, returning its content address and size in bytes.
    async fn create_blob(&self, data: &[u8]) -> Result<(BlobId, u64)>;

    /// Fetches the bytes previously stored under `id`.
    async fn serve_blob(&self, id: &BlobId) -> Result<Vec<u8>>;

    /// Removes the blob stored under `id`, if present.
    ///
    /// Callers are expected to consult the ledger's data-asset state
    /// counter (`GetDataAssetState`) first; purging an asset still in use
    /// is a caller error, not something this trait enforces.
    async fn purge_blob(&self, id: &BlobId) -> Result<()>;
}

/// Computes the content address used by both vault implementations in this
/// crate: a BLAKE3 digest, hex-encoded.
pub(crate) fn content_address(data: &[u8]) -> BlobId {
    blake3::hash(data).to_hex().to_string()
}
