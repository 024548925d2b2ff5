use crate::error::{LedgerError, Result};

/// One entry of a block's composition manifest (spec §3, §4.5.3 step 4):
/// `(recordId, routingKey, keyIndex)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionEntry {
    pub record_id: String,
    pub routing_key: String,
    pub key_index: String,
}

/// The separator used by [`pack`]/[`unpack`] is reserved: routing keys and
/// key indexes must not contain it (spec §7).
const SEPARATOR: char = ',';

impl CompositionEntry {
    /// `pack(r)` = `"<id>,<routingKey>,<keyIndex>"` (spec §4.5.3).
    pub fn pack(&self) -> String {
        format!("{}{SEPARATOR}{}{SEPARATOR}{}", self.record_id, self.routing_key, self.key_index)
    }

    /// Splits a packed entry back into its three fields.
    pub fn unpack(packed: &str) -> Result<Self> {
        let mut parts = packed.splitn(3, SEPARATOR);
        let record_id = parts.next().unwrap_or_default().to_string();
        let routing_key = parts.next().unwrap_or_default().to_string();
        let key_index = parts.next().unwrap_or_default().to_string();
        if record_id.is_empty() {
            return Err(LedgerError::InvalidRecord(format!(
                "malformed block composition entry: {packed:?}"
            )));
        }
        Ok(Self { record_id, routing_key, key_index })
    }
}

/// Rejects routing keys / key indexes that would corrupt `pack`'s encoding.
pub fn check_no_reserved_separator(routing_key: &str, key_index: &str) -> Result<()> {
    if routing_key.contains(SEPARATOR) || key_index.contains(SEPARATOR) {
        return Err(LedgerError::InvalidRecord(
            "routingKey/keyIndex must not contain the ',' separator".into(),
        ));
    }
    Ok(())
}

/// Fixed-width, zero-padded ASCII decimal key for a position inside a
/// block composition / unconfirmed-records sub-bucket (spec §6: "Block
/// number keys are fixed-width, zero-padded ASCII int64 to preserve
/// byte-lexicographic order = numeric order").
pub fn decimal_key(index: u64) -> Vec<u8> {
    format!("{index:020}").into_bytes()
}
