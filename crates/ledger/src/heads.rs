//! Asset Head Registry (component C4, spec §4.4).
//!
//! Like C3, this is not a separate service: a `heads` bucket, read and
//! written only while sealing an `AssetHead` record (spec §4.5.3).

use metalocker_kv::{buckets, ReadTransaction, WriteTransaction};

use crate::error::Result;

/// `GetAssetHead(headID)`: the id of the record currently pointed to by
/// `head_id`, if any.
pub fn get_asset_head(tx: &dyn ReadTransaction, head_id: &str) -> Result<Option<String>> {
    let value = tx
        .get(buckets::HEADS, head_id.as_bytes())?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    Ok(value)
}

/// Writes `new_record_id` as the new pointer for `head_id`, returning the
/// previous pointer if one existed (spec §4.4: "read the previous head
/// value, write the new one"). The caller is responsible for transitioning
/// the previous record to `Revoked`.
pub fn redirect(
    tx: &dyn WriteTransaction,
    head_id: &str,
    new_record_id: &str,
) -> Result<Option<String>> {
    let previous = get_asset_head(tx, head_id)?;
    tx.put(buckets::HEADS, head_id.as_bytes(), new_record_id.as_bytes())?;
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalocker_kv::{KvStore, MemKv};

    #[test]
    fn redirect_reports_previous_pointer() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::HEADS]).unwrap();

        let first = kv.update(|tx| redirect(tx, "X", "R3")).unwrap();
        assert_eq!(first, None);
        assert_eq!(kv.view(|tx| get_asset_head(tx, "X")).unwrap(), Some("R3".to_string()));

        let second = kv.update(|tx| redirect(tx, "X", "R4")).unwrap();
        assert_eq!(second, Some("R3".to_string()));
        assert_eq!(kv.view(|tx| get_asset_head(tx, "X")).unwrap(), Some("R4".to_string()));
    }
}
