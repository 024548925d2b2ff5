use crate::error::Result;

/// A read-only view over the store, valid for the lifetime of one `View`
/// transaction. Implementations must make `get`/`for_each` observe a
/// consistent point-in-time snapshot with respect to concurrently committing
/// writers (spec §5: "readers are wait-free relative to writers").
pub trait ReadTransaction {
    /// Fetches the value stored at `key` in `bucket`.
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Iterates all entries of `bucket` in key-sorted order.
    fn for_each(
        &self,
        bucket: &str,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()>;

    /// Returns whether `bucket` has been created (root bucket ensured at
    /// startup, or nested bucket created via `create_nested`).
    fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Fails with [`crate::KvError::BucketMissing`] unless every bucket in
    /// `names` exists. Every public ledger method calls this first.
    fn require_buckets(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.bucket_exists(name)? {
                return Err(crate::KvError::BucketMissing((*name).to_string()));
            }
        }
        Ok(())
    }
}

/// A read-write transaction. All mutations performed through one
/// `WriteTransaction` commit atomically (spec §4.1: "all-or-nothing
/// commit").
pub trait WriteTransaction: ReadTransaction {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()>;

    /// Creates `parent::name` if it does not already exist. Idempotent.
    fn create_nested(&self, parent: &str, name: &str) -> Result<()>;
}

/// The bucketed key-value store contract consumed by the ledger engine
/// (spec §4.1). Not object-safe by design: callers are generic over a
/// concrete `KvStore` implementation, mirroring the teacher's own
/// `Database::view`/`Database::update` shape.
///
/// `view`/`update` are generic over the closure's error type rather than
/// fixed to [`crate::KvError`], so a caller layered on top (the ledger
/// crate's own `LedgerError`) can return its own error variants from inside
/// a transaction and still use `?` on calls into [`ReadTransaction`] /
/// [`WriteTransaction`]. The only requirement is `E: From<KvError>`, the
/// same shape `thiserror`'s `#[from]` already produces.
pub trait KvStore: Send + Sync + 'static {
    /// Ensures every name in `names` exists as a root bucket, creating it if
    /// necessary. Called once at ledger startup.
    fn ensure_buckets(&self, names: &[&str]) -> Result<()>;

    /// Runs `f` in a read-only transaction.
    fn view<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn ReadTransaction) -> std::result::Result<T, E>,
        E: From<crate::error::KvError>;

    /// Runs `f` in a read-write transaction; commits iff `f` returns `Ok`.
    fn update<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn WriteTransaction) -> std::result::Result<T, E>,
        E: From<crate::error::KvError>;
}
