use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};

/// Domain-separation prefix for the block seal hash (spec §3, §6). Not
/// versioned; see Open Question (c) in DESIGN.md.
const BLOCK_CONSTRUCTION_PREFIX: &[u8] = b"block construction";

/// A sealed, immutable block (spec §3): `{number, hash, parentHash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
}

/// The internal seal input: `{parentHash, nonce(32 random bytes), number}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSealInput {
    pub parent_hash: String,
    pub nonce: [u8; 32],
    pub number: u64,
}

impl BlockSealInput {
    /// `hash = H("block construction" ∥ decode64(parentHash) ∥
    /// decode64(nonce) ∥ ascii(number))`, H = SHA-256, base64-encoded.
    pub fn seal(&self) -> Result<Block> {
        let parent_bytes = if self.parent_hash.is_empty() {
            Vec::new()
        } else {
            STANDARD
                .decode(&self.parent_hash)
                .map_err(|e| LedgerError::InvalidRecord(format!("bad parentHash: {e}")))?
        };

        let mut hasher = Sha256::new();
        hasher.update(BLOCK_CONSTRUCTION_PREFIX);
        hasher.update(&parent_bytes);
        hasher.update(self.nonce);
        hasher.update(self.number.to_string().as_bytes());
        let digest = hasher.finalize();
        let hash = STANDARD.encode(digest);

        Ok(Block { number: self.number, hash, parent_hash: self.parent_hash.clone() })
    }
}

/// Builds and seals the genesis block (block 0, empty `parentHash`),
/// spec §4.5.2 step 2.
pub fn genesis_block(nonce: [u8; 32]) -> Result<Block> {
    BlockSealInput { parent_hash: String::new(), nonce, number: 0 }.seal()
}

/// Source of nonces for block sealing. `Deterministic` is the "seed...
/// for tests" knob named in spec §4.5.6 step 4; `Random` is the production
/// path.
pub enum NonceSource {
    Random,
    Deterministic(u64),
}

impl NonceSource {
    pub fn next_nonce(&self) -> [u8; 32] {
        let mut nonce = [0u8; 32];
        match self {
            Self::Random => rand::thread_rng().fill_bytes(&mut nonce),
            Self::Deterministic(seed) => StdRng::seed_from_u64(*seed).fill_bytes(&mut nonce),
        }
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_has_empty_parent_hash() {
        let block = genesis_block([0u8; 32]).unwrap();
        assert_eq!(block.number, 0);
        assert_eq!(block.parent_hash, "");
    }

    #[test]
    fn seal_is_deterministic_for_same_inputs() {
        let input = BlockSealInput { parent_hash: String::new(), nonce: [7u8; 32], number: 1 };
        let a = input.seal().unwrap();
        let b = input.seal().unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn different_numbers_yield_different_hashes() {
        let a = BlockSealInput { parent_hash: String::new(), nonce: [7u8; 32], number: 1 }
            .seal()
            .unwrap();
        let b = BlockSealInput { parent_hash: String::new(), nonce: [7u8; 32], number: 2 }
            .seal()
            .unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn deterministic_nonce_source_repeats() {
        let source = NonceSource::Deterministic(42);
        assert_eq!(source.next_nonce(), source.next_nonce());
    }
}
