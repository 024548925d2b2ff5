use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Constructor parameters for the ledger engine (spec §6), shaped the way
/// the teacher exposes `NetworkArgs`/`DatabaseArgs`: a flattened struct with
/// a `Default` impl rather than a handful of buried constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path to the `sled` database file.
    pub db_file: PathBuf,
    /// Block-check tick interval. Zero means *instant mode* (spec §4.5.2
    /// step 4, §6: "interval = 0 ⇒ instant mode").
    pub block_check_interval: Duration,
    /// Maximum number of records batched into one block (spec §4.5.4).
    pub max_records_per_block: usize,
    /// Capacity of the bounded inbound records channel (spec §4.5.4:
    /// "bounded buffer, capacity 100").
    pub channel_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_file: PathBuf::from("metalocker.db"),
            block_check_interval: Duration::ZERO,
            max_records_per_block: 100,
            channel_capacity: 100,
        }
    }
}

impl LedgerConfig {
    /// Instant mode seals a block as soon as any record is persisted
    /// (spec §4.5.4).
    pub fn is_instant_mode(&self) -> bool {
        self.block_check_interval.is_zero()
    }
}
