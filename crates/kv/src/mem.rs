use std::{cell::RefCell, collections::BTreeMap};

use parking_lot::RwLock;

use crate::{
    error::Result,
    traits::{KvStore, ReadTransaction, WriteTransaction},
};

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Default, Clone)]
struct State {
    buckets: BTreeMap<String, Bucket>,
}

/// An in-memory [`KvStore`] backed by nested `BTreeMap`s, used for fast unit
/// tests that don't need a filesystem. Grounded on the clone-then-swap
/// snapshot shape of `foundry-rs/foundry`'s `anvil` in-memory backend
/// (`mem-storage.rs`): an `Update` transaction mutates a private clone of the
/// state and is only swapped in on success, giving all-or-nothing commit
/// without a real write-ahead log.
#[derive(Default)]
pub struct MemKv {
    state: RwLock<State>,
}

impl MemKv {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemView<'a> {
    state: &'a State,
}

impl ReadTransaction for MemView<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.buckets.get(bucket).and_then(|b| b.get(key).cloned()))
    }

    fn for_each(
        &self,
        bucket: &str,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        if let Some(b) = self.state.buckets.get(bucket) {
            for (k, v) in b {
                f(k, v)?;
            }
        }
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.state.buckets.contains_key(bucket))
    }
}

/// Holds a private clone of the store, mutated in place and swapped back in
/// only if the transaction closure returns `Ok`. `RefCell` gives interior
/// mutability through the shared `&dyn WriteTransaction` reference the
/// `KvStore::update` closure receives.
struct MemUpdate<'a> {
    state: &'a RefCell<State>,
}

impl ReadTransaction for MemUpdate<'_> {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.borrow().buckets.get(bucket).and_then(|b| b.get(key).cloned()))
    }

    fn for_each(
        &self,
        bucket: &str,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let snapshot = self.state.borrow().buckets.get(bucket).cloned();
        if let Some(b) = snapshot {
            for (k, v) in &b {
                f(k, v)?;
            }
        }
        Ok(())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.state.borrow().buckets.contains_key(bucket))
    }
}

impl WriteTransaction for MemUpdate<'_> {
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.state
            .borrow_mut()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()> {
        if let Some(b) = self.state.borrow_mut().buckets.get_mut(bucket) {
            b.remove(key);
        }
        Ok(())
    }

    fn create_nested(&self, parent: &str, name: &str) -> Result<()> {
        let full = crate::buckets::nested_name(parent, name);
        self.state.borrow_mut().buckets.entry(full).or_default();
        Ok(())
    }
}

impl KvStore for MemKv {
    fn ensure_buckets(&self, names: &[&str]) -> Result<()> {
        let mut state = self.state.write();
        for name in names {
            state.buckets.entry((*name).to_string()).or_default();
        }
        Ok(())
    }

    fn view<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn ReadTransaction) -> std::result::Result<T, E>,
        E: From<crate::error::KvError>,
    {
        let guard = self.state.read();
        let tx = MemView { state: &guard };
        f(&tx)
    }

    fn update<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn WriteTransaction) -> std::result::Result<T, E>,
        E: From<crate::error::KvError>,
    {
        let mut guard = self.state.write();
        let working = RefCell::new(guard.clone());
        let tx = MemUpdate { state: &working };
        let result = f(&tx);
        if result.is_ok() {
            *guard = working.into_inner();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets;

    #[test]
    fn put_then_get_round_trips() {
        let kv = MemKv::new();
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
    fn failed_update_does_not_commit() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::RECORDS]).unwrap();

        let result: Result<()> = kv.update(|tx| {
            tx.put(buckets::RECORDS, b"r1", b"payload")?;
            Err(crate::KvError::Aborted("rollback me".into()))
        });
        assert!(result.is_err());

        let value = kv.view(|tx| tx.get(buckets::RECORDS, b"r1")).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn for_each_visits_keys_in_sorted_order() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::BLOCKS]).unwrap();
        kv.update(|tx| {
            tx.put(buckets::BLOCKS, b"0000000003", b"c")?;
            tx.put(buckets::BLOCKS, b"0000000001", b"a")?;
            tx.put(buckets::BLOCKS, b"0000000002", b"b")?;
            Ok(())
        })
        .unwrap();

        let mut seen = Vec::new();
        kv.view(|tx| {
            tx.for_each(buckets::BLOCKS, &mut |k, _v| {
                seen.push(k.to_vec());
                Ok(())
            })
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![b"0000000001".to_vec(), b"0000000002".to_vec(), b"0000000003".to_vec()]
        );
    }

    #[test]
    fn bucket_missing_is_detected() {
        let kv = MemKv::new();
        let result = kv.view(|tx| tx.require_buckets(&[buckets::HEADS]));
        assert!(matches!(result, Err(crate::KvError::BucketMissing(_))));
    }
}
