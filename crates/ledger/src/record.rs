use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// The three operation kinds a [`Record`] may carry (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Lease,
    LeaseRevocation,
    AssetHead,
}

/// The unit accepted by the ledger (spec §3). Every field that is
/// "only for kind X" is modeled as `Option`/`Vec` and checked for presence
/// by [`Record::validate`] rather than split into per-kind wire types,
/// since all three kinds share one JSON envelope on the wire, the same
/// shape the teacher's transaction envelopes use for their own per-type
/// optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub operation: OperationKind,

    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub key_index: String,

    /// `LeaseRevocation` only: the id of the `Lease` being revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_record: Option<String>,

    /// `LeaseRevocation` only: the preimage presented to revoke the lease.
    /// Spec requires exactly one element; `validate` only checks
    /// non-emptiness, the exact-length check happens during block
    /// generation's proof verification (spec §4.5.6 step 2).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revocation_proof: Vec<String>,

    /// `Lease` only: base64(SHA-256(proof)) that a future revocation must
    /// reproduce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorising_commitment: Option<String>,

    /// `Lease` only: data assets this lease grants access to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_assets: Vec<String>,

    /// `Lease` only: off-chain blob identifier for the operation payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_address: Option<String>,

    /// `AssetHead` only. The record's own `id` is the value written into
    /// `heads[head_id]`; there is no separate "head value" field (see S5:
    /// `AssetHead H{headID=X, id=R3}` points `heads[X]` at `R3` itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_id: Option<String>,
}

impl Record {
    /// Shape/field validation performed by `SubmitRecord` (spec §3
    /// Invariant): non-empty id, recognized operation, mandatory fields for
    /// the operation kind present.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(LedgerError::InvalidRecord("id must not be empty".into()));
        }
        match self.operation {
            OperationKind::Lease => {
                if self.operation_address.as_deref().unwrap_or("").is_empty() {
                    return Err(LedgerError::InvalidRecord(
                        "lease records require operationAddress".into(),
                    ));
                }
                if self.authorising_commitment.as_deref().unwrap_or("").is_empty() {
                    return Err(LedgerError::InvalidRecord(
                        "lease records require authorisingCommitment".into(),
                    ));
                }
            }
            OperationKind::LeaseRevocation => {
                if self.subject_record.as_deref().unwrap_or("").is_empty() {
                    return Err(LedgerError::InvalidRecord(
                        "revocation records require subjectRecord".into(),
                    ));
                }
                if self.revocation_proof.is_empty() {
                    return Err(LedgerError::InvalidRecord(
                        "revocation records require revocationProof".into(),
                    ));
                }
            }
            OperationKind::AssetHead => {
                if self.head_id.as_deref().unwrap_or("").is_empty() {
                    return Err(LedgerError::InvalidRecord(
                        "asset head records require headID".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The set of asset ids this record's effects touch (spec §4.3):
    /// `dataAssets ∪ {operationAddress}` for a `Lease`, empty otherwise.
    pub fn affected_assets(&self) -> Vec<&str> {
        if self.operation != OperationKind::Lease {
            return Vec::new();
        }
        let mut assets: Vec<&str> = self.data_assets.iter().map(String::as_str).collect();
        if let Some(addr) = self.operation_address.as_deref() {
            assets.push(addr);
        }
        assets
    }
}

/// Stable status encoding (spec §6): `Pending=0, Published=1, Revoked=2,
/// Failed=3`. Serialized as the variant name ("JSON emits names").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordStatus {
    Pending = 0,
    Published = 1,
    Revoked = 2,
    Failed = 3,
}

/// `{status, blockNumber}` (spec §3). `block_number = -1` means "not yet
/// placed in a block" or "revoked without new block context", kept as a
/// plain `i64` sentinel rather than `Option<u64>` to match the wire format
/// exactly (spec §6 stores it as fixed-width ASCII inside `record_states`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordState {
    pub status: RecordStatus,
    pub block_number: i64,
}

impl RecordState {
    pub const UNPLACED: i64 = -1;

    pub fn pending() -> Self {
        Self { status: RecordStatus::Pending, block_number: Self::UNPLACED }
    }

    pub fn published(block_number: u64) -> Self {
        Self { status: RecordStatus::Published, block_number: block_number as i64 }
    }

    pub fn revoked_without_block() -> Self {
        Self { status: RecordStatus::Revoked, block_number: Self::UNPLACED }
    }

    pub fn failed(block_number: u64) -> Self {
        Self { status: RecordStatus::Failed, block_number: block_number as i64 }
    }

    pub fn is_revoked(&self) -> bool {
        matches!(self.status, RecordStatus::Revoked)
    }
}
