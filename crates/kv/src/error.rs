use thiserror::Error;

/// Errors surfaced by the key-value store.
///
/// `BucketMissing` is the schema-invariant violation described in the core
/// contract: every public method re-asserts the buckets it needs inside its
/// own transaction, and a missing bucket is always fatal rather than an
/// empty-result read.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("bucket missing: {0}")]
    BucketMissing(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("transaction aborted: {0}")]
    Aborted(String),
}

impl From<sled::Error> for KvError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KvError>;
