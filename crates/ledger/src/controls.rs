//! Scalar control values in the `controls` bucket (spec §4.1, §6):
//! `top_block_number` and `current_session_id`.

use metalocker_kv::{buckets::controls as keys, buckets::CONTROLS, ReadTransaction, WriteTransaction};

use crate::{composition::decimal_key, error::Result};

pub fn read_top_block_number(tx: &dyn ReadTransaction) -> Result<Option<u64>> {
    let value = tx.get(CONTROLS, keys::TOP_BLOCK_NUMBER)?;
    Ok(value.map(|bytes| decode_decimal(&bytes)))
}

pub fn write_top_block_number(tx: &dyn WriteTransaction, number: u64) -> Result<()> {
    tx.put(CONTROLS, keys::TOP_BLOCK_NUMBER, &decimal_key(number))?;
    Ok(())
}

pub fn read_current_session_id(tx: &dyn ReadTransaction) -> Result<Option<String>> {
    let value = tx
        .get(CONTROLS, keys::CURRENT_SESSION_ID)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    Ok(value)
}

pub fn write_current_session_id(tx: &dyn WriteTransaction, session_id: &str) -> Result<()> {
    tx.put(CONTROLS, keys::CURRENT_SESSION_ID, session_id.as_bytes())?;
    Ok(())
}

fn decode_decimal(bytes: &[u8]) -> u64 {
    std::str::from_utf8(bytes).ok().and_then(|s| s.trim_start_matches('0').parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalocker_kv::{KvStore, MemKv};

    #[test]
    fn top_block_number_round_trips() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[CONTROLS]).unwrap();
        kv.update(|tx| write_top_block_number(tx, 42)).unwrap();
        assert_eq!(kv.view(|tx| read_top_block_number(tx)).unwrap(), Some(42));
    }

    #[test]
    fn zero_decodes_correctly() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[CONTROLS]).unwrap();
        kv.update(|tx| write_top_block_number(tx, 0)).unwrap();
        assert_eq!(kv.view(|tx| read_top_block_number(tx)).unwrap(), Some(0));
    }
}
