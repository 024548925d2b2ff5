//! The MetaLocker ledger: an append-only, hash-chained record of `Lease`,
//! `LeaseRevocation` and `AssetHead` operations, sealed into blocks by a
//! single cooperative engine task (component C5).

pub mod assets;
pub mod block;
pub mod composition;
pub mod config;
pub mod controls;
mod engine;
pub mod error;
pub mod heads;
mod metrics;
pub mod record;
mod session;
mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use assets::AssetState;
pub use block::{Block, NonceSource};
pub use composition::CompositionEntry;
pub use config::LedgerConfig;
pub use engine::LedgerHandle;
pub use error::{LedgerError, LedgerErrorKind, Result};
pub use record::{OperationKind, Record, RecordState, RecordStatus};
