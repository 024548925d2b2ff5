use std::{cell::RefCell, path::Path};

use sled::transaction::{ConflictableTransactionError, TransactionalTree};

use crate::{
    buckets,
    error::{KvError, Result},
    traits::{KvStore, ReadTransaction, WriteTransaction},
};

const BUCKET_REGISTRY: &str = "__buckets__";

fn encode_key(bucket: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bucket.len() + 1 + key.len());
    out.extend_from_slice(bucket.as_bytes());
    out.push(0);
    out.extend_from_slice(key);
    out
}

fn bucket_prefix(bucket: &str) -> Vec<u8> {
    let mut out = bucket.as_bytes().to_vec();
    out.push(0);
    out
}

/// Production [`KvStore`] backed by a single `sled` database file. All root
/// and nested buckets share one `sled::Tree`, namespaced by a
/// `bucket\0key` composite key, so that an arbitrary, dynamically-named set
/// of buckets (spec §4.1's "nested sub-buckets keyed by decimal position")
/// can still be mutated inside one atomic `sled::Tree::transaction`. `sled`
/// only supports atomic multi-key transactions within a single `Tree`, not
/// across a runtime-determined set of named `Tree`s.
pub struct SledKv {
    tree: sled::Tree,
}

impl SledKv {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let tree = db.open_tree("metalocker_main")?;
        tracing::info!(path = %path.display(), "opened sled store");
        Ok(Self { tree })
    }

    fn bucket_marker_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.tree.contains_key(encode_key(BUCKET_REGISTRY, bucket.as_bytes()))?)
    }

    fn mark_bucket(&self, bucket: &str) -> Result<()> {
        self.tree.insert(encode_key(BUCKET_REGISTRY, bucket.as_bytes()), b"1".as_ref())?;
        Ok(())
    }
}

struct SledView<'a> {
    tree: &'a sled::Tree,
}

impl ReadTransaction for SledView<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(encode_key(bucket, key))?.map(|v| v.to_vec()))
    }

    fn for_each(
        &self,
        bucket: &str,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let prefix = bucket_prefix(bucket);
        for entry in self.tree.scan_prefix(&prefix) {
            let (k, v) = entry?;
            f(&k[prefix.len()..], &v)?;
        }
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.tree.contains_key(encode_key(BUCKET_REGISTRY, bucket.as_bytes()))?)
    }
}

/// Wraps `sled`'s `TransactionalTree`. `sled` does not support range scans
/// from inside a transaction, so `for_each` here reads the outer tree
/// directly rather than the in-flight transaction. The ledger engine never
/// needs to enumerate a bucket while sealing a block (spec §4.5.3 resolves
/// pending records by id from a prior read txn, §4.5.6 step 1).
struct SledUpdate<'a> {
    tt: &'a TransactionalTree,
    outer: &'a sled::Tree,
}

impl ReadTransaction for SledUpdate<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .tt
            .get(encode_key(bucket, key))
            .map_err(|e| KvError::Backend(e.to_string()))?
            .map(|v| v.to_vec()))
    }

    fn for_each(
        &self,
        bucket: &str,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let prefix = bucket_prefix(bucket);
        for entry in self.outer.scan_prefix(&prefix) {
            let (k, v) = entry?;
            f(&k[prefix.len()..], &v)?;
        }
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self
            .tt
            .get(encode_key(BUCKET_REGISTRY, bucket.as_bytes()))
            .map_err(|e| KvError::Backend(e.to_string()))?
            .is_some())
    }
}

impl WriteTransaction for SledUpdate<'_> {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.tt
            .insert(encode_key(bucket, key), value)
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()> {
        self.tt
            .remove(encode_key(bucket, key))
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(())
    }

    fn create_nested(&self, parent: &str, name: &str) -> Result<()> {
        let full = buckets::nested_name(parent, name);
        self.tt
            .insert(encode_key(BUCKET_REGISTRY, full.as_bytes()), b"1".as_ref())
            .map_err(|e| KvError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl KvStore for SledKv {
    fn ensure_buckets(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.bucket_marker_exists(name)? {
                self.mark_bucket(name)?;
            }
        }
        Ok(())
    }

    fn view<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn ReadTransaction) -> std::result::Result<T, E>,
        E: From<KvError>,
    {
        let tx = SledView { tree: &self.tree };
        f(&tx)
    }

    fn update<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn WriteTransaction) -> std::result::Result<T, E>,
        E: From<KvError>,
    {
        // `sled::Tree::transaction` requires `Fn` because it may retry the
        // closure on write conflicts. The ledger engine is the sole writer
        // (spec §5), so a retry never actually happens in practice; the
        // `RefCell<Option<F>>` dance lets us still accept a `FnOnce` at the
        // `KvStore::update` call site.
        let slot = RefCell::new(Some(f));
        let outer = &self.tree;
        let result = self.tree.transaction(move |tt| {
            let tx = SledUpdate { tt, outer };
            let f = slot.borrow_mut().take().expect("update closure invoked more than once");
            f(&tx).map_err(ConflictableTransactionError::Abort)
        });
        result.map_err(|e| match e {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => E::from(KvError::Backend(e.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let kv = SledKv::open(dir.path().join("db")).unwrap();
        kv.ensure_buckets(&[buckets::RECORDS]).unwrap();

        kv.update(|tx| {
            tx.put(buckets::RECORDS, b"r1", b"payload")?;
            Ok(())
        })
        .unwrap();

        let value = kv.view(|tx| tx.get(buckets::RECORDS, b"r1")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn nested_bucket_is_namespaced() {
        let dir = tempfile::tempdir().unwrap();
        let kv = SledKv::open(dir.path().join("db")).unwrap();
        kv.ensure_buckets(&[buckets::BLOCK_COMPOSITION]).unwrap();

        kv.update(|tx| {
            tx.create_nested(buckets::BLOCK_COMPOSITION, "1")?;
            let bucket = buckets::nested_name(buckets::BLOCK_COMPOSITION, "1");
            tx.put(&bucket, b"0", b"r1,rk,ki")?;
            Ok(())
        })
        .unwrap();

        let bucket = buckets::nested_name(buckets::BLOCK_COMPOSITION, "1");
        let exists = kv.view(|tx| tx.bucket_exists(&bucket)).unwrap();
        assert!(exists);

        let value = kv.view(|tx| tx.get(&bucket, b"0")).unwrap();
        assert_eq!(value.as_deref(), Some(&b"r1,rk,ki"[..]));
    }

    #[test]
    fn failed_update_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let kv = SledKv::open(dir.path().join("db")).unwrap();
        kv.ensure_buckets(&[buckets::RECORDS]).unwrap();

        let result: Result<()> = kv.update(|tx| {
            tx.put(buckets::RECORDS, b"r1", b"payload")?;
            Err(KvError::Aborted("nope".into()))
        });
        assert!(result.is_err());

        let value = kv.view(|tx| tx.get(buckets::RECORDS, b"r1")).unwrap();
        assert_eq!(value, None);
    }
}
