//! Thin read/write helpers over the `records`, `record_states` and
//! `blocks` buckets, shared by the engine's persistence and sealing paths.

use metalocker_kv::{buckets, ReadTransaction, WriteTransaction};

use crate::{
    block::Block,
    composition::decimal_key,
    error::{LedgerError, Result},
    record::{Record, RecordState},
};

pub fn get_record(tx: &dyn ReadTransaction, id: &str) -> Result<Option<Record>> {
    match tx.get(buckets::RECORDS, id.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn put_record(tx: &dyn WriteTransaction, record: &Record) -> Result<()> {
    let bytes = serde_json::to_vec(record)?;
    tx.put(buckets::RECORDS, record.id.as_bytes(), &bytes)?;
    Ok(())
}

pub fn get_state(tx: &dyn ReadTransaction, id: &str) -> Result<Option<RecordState>> {
    match tx.get(buckets::RECORD_STATES, id.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn put_state(tx: &dyn WriteTransaction, id: &str, state: RecordState) -> Result<()> {
    let bytes = serde_json::to_vec(&state)?;
    tx.put(buckets::RECORD_STATES, id.as_bytes(), &bytes)?;
    Ok(())
}

/// Like [`put_state`], but enforces the terminal-`Revoked` invariant (spec
/// §3: "Once status = Revoked, the state is terminal") before writing: a
/// record already `Revoked` cannot be moved to any other status.
pub fn transition_state(tx: &dyn WriteTransaction, id: &str, state: RecordState) -> Result<()> {
    if let Some(existing) = get_state(tx, id)? {
        if existing.is_revoked() && !state.is_revoked() {
            return Err(LedgerError::RevokedImmutable(id.to_string()));
        }
    }
    put_state(tx, id, state)
}

pub fn get_block(tx: &dyn ReadTransaction, number: u64) -> Result<Option<Block>> {
    match tx.get(buckets::BLOCKS, &decimal_key(number))? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn put_block(tx: &dyn WriteTransaction, block: &Block) -> Result<()> {
    let bytes = serde_json::to_vec(block)?;
    tx.put(buckets::BLOCKS, &decimal_key(block.number), &bytes)?;
    Ok(())
}

pub fn get_block_composition(
    tx: &dyn ReadTransaction,
    number: u64,
) -> Result<Vec<crate::composition::CompositionEntry>> {
    let bucket = buckets::nested_name(buckets::BLOCK_COMPOSITION, &number.to_string());
    let mut entries = Vec::new();
    tx.for_each(&bucket, &mut |_k, v| {
        entries.push(
            crate::composition::CompositionEntry::unpack(&String::from_utf8_lossy(v))
                .map_err(|e| metalocker_kv::KvError::Backend(e.to_string()))?,
        );
        Ok(())
    })?;
    Ok(entries)
}
