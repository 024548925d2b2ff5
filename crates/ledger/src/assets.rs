//! Data-Asset State Counter (component C3, spec §4.3).
//!
//! Not a separate service: a `data_asset_states` bucket plus the two
//! mutation rules below, invoked only as atomic side effects of block
//! sealing (§4.5.3).

use metalocker_kv::{buckets, ReadTransaction, WriteTransaction};

use crate::error::Result;

/// `GetDataAssetState` response (spec §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// Counter is positive: some surviving lease still references the asset.
    Keep,
    /// Counter is zero: no surviving lease references the asset: eligible
    /// for the off-chain vault to purge.
    Remove,
    /// The asset was never registered.
    NotFound,
}

fn decode_counter(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let len = bytes.len().min(4);
    buf[4 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    u32::from_be_bytes(buf)
}

fn encode_counter(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// `GetDataAssetState(id)` (spec §4.3, §4.5.1).
pub fn get_data_asset_state(tx: &dyn ReadTransaction, asset_id: &str) -> Result<AssetState> {
    let state = match tx.get(buckets::DATA_ASSET_STATES, asset_id.as_bytes())? {
        None => AssetState::NotFound,
        Some(bytes) if decode_counter(&bytes) == 0 => AssetState::Remove,
        Some(_) => AssetState::Keep,
    };
    Ok(state)
}

/// Increments the counter for `asset_id`, initializing it to 0 on first
/// touch (spec §4.3: "for each assetID..., increment the counter
/// (initialized to 0 on first touch, then ++)").
pub fn bump(tx: &dyn WriteTransaction, asset_id: &str) -> Result<()> {
    let current = tx
        .get(buckets::DATA_ASSET_STATES, asset_id.as_bytes())?
        .map(|b| decode_counter(&b))
        .unwrap_or(0);
    tx.put(buckets::DATA_ASSET_STATES, asset_id.as_bytes(), &encode_counter(current + 1))?;
    Ok(())
}

/// Decrements the counter for `asset_id`, clamped at zero (spec §4.3:
/// "decrement if counter > 0; never go below zero"). A never-touched asset
/// stays absent rather than being created at zero.
pub fn decrement(tx: &dyn WriteTransaction, asset_id: &str) -> Result<()> {
    let Some(bytes) = tx.get(buckets::DATA_ASSET_STATES, asset_id.as_bytes())? else {
        return Ok(());
    };
    let current = decode_counter(&bytes);
    let next = current.saturating_sub(1);
    tx.put(buckets::DATA_ASSET_STATES, asset_id.as_bytes(), &encode_counter(next))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalocker_kv::{KvStore, MemKv};

    #[test]
    fn bump_then_decrement_clamps_at_zero() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::DATA_ASSET_STATES]).unwrap();

        kv.update(|tx| {
            bump(tx, "A")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(kv.view(|tx| get_data_asset_state(tx, "A")).unwrap(), AssetState::Keep);

        kv.update(|tx| {
            decrement(tx, "A")?;
            decrement(tx, "A")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(kv.view(|tx| get_data_asset_state(tx, "A")).unwrap(), AssetState::Remove);
    }

    #[test]
    fn untouched_asset_is_not_found() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::DATA_ASSET_STATES]).unwrap();
        assert_eq!(
            kv.view(|tx| get_data_asset_state(tx, "Z")).unwrap(),
            AssetState::NotFound
        );
    }

    #[test]
    fn multiple_leases_then_one_revocation_keeps_positive() {
        let kv = MemKv::new();
        kv.ensure_buckets(&[buckets::DATA_ASSET_STATES]).unwrap();

        kv.update(|tx| {
            bump(tx, "A")?;
            bump(tx, "A")?;
            Ok(())
        })
        .unwrap();
        kv.update(|tx| {
            decrement(tx, "A")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(kv.view(|tx| get_data_asset_state(tx, "A")).unwrap(), AssetState::Keep);
    }
}
