//! Abstract *Notification Bus* collaborator (spec.md §1, §4.5.3, §6).
//!
//! The ledger engine treats notification delivery as an external capability
//! it publishes to, fire-and-forget, after a block is sealed; it never
//! subscribes to its own topic. Grounded on the teacher's `reth-exex`
//! notification pipeline and on the sibling example `aptos-labs-aptos-core`'s
//! `event-notifications`/`mempool-notifications` crates, both of which exist
//! for the same "tell other components something landed" purpose.

mod bus;
mod message;

pub use bus::{InMemoryBus, NotificationBus};
pub use message::{NewBlockMessage, NEW_BLOCK_TOPIC};
