//! Root bucket names required by the ledger schema (spec §4.1).

pub const BLOCKS: &str = "blocks";
pub const BLOCK_COMPOSITION: &str = "block_composition";
pub const RECORDS: &str = "records";
pub const RECORD_STATES: &str = "record_states";
pub const CONTROLS: &str = "controls";
pub const UNCONFIRMED_RECORDS: &str = "unconfirmed_records";
pub const DATA_ASSET_STATES: &str = "data_asset_states";
pub const HEADS: &str = "heads";

/// All root buckets the ledger schema requires to exist before any public
/// method runs.
pub const ROOT_BUCKETS: &[&str] = &[
    BLOCKS,
    BLOCK_COMPOSITION,
    RECORDS,
    RECORD_STATES,
    CONTROLS,
    UNCONFIRMED_RECORDS,
    DATA_ASSET_STATES,
    HEADS,
];

/// Scalar keys stored in the `controls` bucket.
pub mod controls {
    pub const TOP_BLOCK_NUMBER: &[u8] = b"top_block_number";
    pub const CURRENT_SESSION_ID: &[u8] = b"current_session_id";
}

/// Builds the name of a nested bucket, e.g. `block_composition::42` or
/// `unconfirmed_records::block1700000000`.
pub fn nested_name(parent: &str, name: &str) -> String {
    format!("{parent}::{name}")
}
