use serde::{Deserialize, Serialize};

/// Topic the ledger engine publishes to after sealing a block (spec §6).
pub const NEW_BLOCK_TOPIC: &str = "ledger.new-block";

/// Payload published on [`NEW_BLOCK_TOPIC`] (spec §6:
/// `{type: "new-block", number: int64}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlockMessage {
    #[serde(rename = "type")]
    pub message_type: NewBlockMessageType,
    pub number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewBlockMessageType {
    NewBlock,
}

impl NewBlockMessage {
    pub fn new(number: u64) -> Self {
        Self { message_type: NewBlockMessageType::NewBlock, number }
    }
}
