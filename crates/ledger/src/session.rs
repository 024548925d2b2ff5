//! Block Session (spec §3, §4.5.2, §4.5.5): the engine's private journal of
//! pending record ids destined for the next block.

use metalocker_kv::{buckets, ReadTransaction, WriteTransaction};

use crate::{composition::decimal_key, controls, error::Result};

/// `"block<unixSeconds>"` (spec §3).
pub fn session_name(unix_seconds: u64) -> String {
    format!("block{unix_seconds}")
}

/// Creates a new session sub-bucket, makes it current, and returns its id
/// (spec §4.5.6 step 6, §4.5.2 step 3). Does not touch the in-memory
/// pending list; callers reset that themselves.
pub fn open_new_session(tx: &dyn WriteTransaction, unix_seconds: u64) -> Result<String> {
    let session_id = session_name(unix_seconds);
    tx.create_nested(buckets::UNCONFIRMED_RECORDS, &session_id)?;
    controls::write_current_session_id(tx, &session_id)?;
    Ok(session_id)
}

/// Appends `record_id` at the next free position of `session_id`'s
/// sub-bucket (spec §4.5.5: `unconfirmed_records[sessionID][decimal(len(pending))]`).
pub fn append_pending(
    tx: &dyn WriteTransaction,
    session_id: &str,
    index: u64,
    record_id: &str,
) -> Result<()> {
    let bucket = buckets::nested_name(buckets::UNCONFIRMED_RECORDS, session_id);
    tx.put(&bucket, &decimal_key(index), record_id.as_bytes())?;
    Ok(())
}

/// Rebuilds the in-memory pending list from `session_id`'s sub-bucket in
/// decimal-key order (spec §4.5.2 step 3: "iterate in decimal-key order and
/// rebuild the in-memory pending list").
pub fn rebuild_pending(tx: &dyn ReadTransaction, session_id: &str) -> Result<Vec<String>> {
    let bucket = buckets::nested_name(buckets::UNCONFIRMED_RECORDS, session_id);
    let mut ids = Vec::new();
    tx.for_each(&bucket, &mut |_k, v| {
        ids.push(String::from_utf8_lossy(v).into_owned());
        Ok(())
    })?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalocker_kv::{KvStore, MemKv};

    #[test]
    fn append_then_rebuild_preserves_order() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::UNCONFIRMED_RECORDS, buckets::CONTROLS]).unwrap();

        let session_id = kv.update(|tx| open_new_session(tx, 1_700_000_000)).unwrap();
        kv.update(|tx| {
            append_pending(tx, &session_id, 0, "r1")?;
            append_pending(tx, &session_id, 1, "r2")?;
            append_pending(tx, &session_id, 2, "r3")?;
            Ok(())
        })
        .unwrap();

        let pending = kv.view(|tx| rebuild_pending(tx, &session_id)).unwrap();
        assert_eq!(pending, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn session_name_matches_spec_format() {
        assert_eq!(session_name(1_700_000_000), "block1700000000");
    }
}
