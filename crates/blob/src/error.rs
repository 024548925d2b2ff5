use thiserror::Error;

/// Errors surfaced by a [`crate::BlobVault`]. Named to match the taxonomy in
/// spec.md §7. `BlobNotFound` is a sentinel, not an internal error, and is
/// expected to propagate to callers unchanged.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("blob vault io error: {0}")]
    Io(String),

    /// Not raised by this crate's own vault implementations; `purge_blob`
    /// purges unconditionally. A caller that wires this vault up to the
    /// ledger's `GetDataAssetState` is expected to check for `Keep` first
    /// and map that into this variant before ever calling `purge_blob`.
    #[error("data asset still in use: {0}")]
    DataAssetInUse(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;
