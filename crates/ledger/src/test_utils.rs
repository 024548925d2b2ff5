//! Deterministic record construction for tests, in the spirit of the
//! transaction pool's `MockTransactionFactory`: a small stateful builder that
//! hands out unique, predictable ids instead of leaving every test to invent
//! its own.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::record::{OperationKind, Record};

/// Hands out `r0`, `r1`, `r2`, ... Every constructor takes the caller's
/// intent (subject, data assets, head id) and fills in the rest.
#[derive(Default)]
pub struct MockRecordFactory {
    next_id: u64,
}

impl MockRecordFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> String {
        let id = format!("r{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// A `Lease` over `data_assets`, storing its payload at `operation_address`.
    /// The revocation preimage is the record's own id; its commitment is
    /// `base64(SHA256(preimage))`. Callers who need the exact preimage back
    /// to build a matching revocation should use [`Self::lease_with_proof`].
    pub fn lease(&mut self, data_assets: &[&str], operation_address: &str) -> Record {
        let (record, _proof) = self.lease_with_proof(data_assets, operation_address);
        record
    }

    /// Like [`Self::lease`] but also returns the revocation preimage, so a
    /// caller can later build a [`Self::revocation`] that actually verifies.
    pub fn lease_with_proof(&mut self, data_assets: &[&str], operation_address: &str) -> (Record, String) {
        let id = self.next_id();
        let preimage = format!("preimage-for-{id}");
        let commitment = STANDARD.encode(Sha256::digest(preimage.as_bytes()));
        let record = Record {
            id,
            operation: OperationKind::Lease,
            routing_key: "rk".into(),
            key_index: "ki".into(),
            subject_record: None,
            revocation_proof: Vec::new(),
            authorising_commitment: Some(commitment),
            data_assets: data_assets.iter().map(|s| s.to_string()).collect(),
            operation_address: Some(operation_address.to_string()),
            head_id: None,
        };
        (record, preimage)
    }

    /// A `LeaseRevocation` of `subject`, presenting `preimage` (base64
    /// encoded) as its proof.
    pub fn revocation(&mut self, subject: &str, preimage: &str) -> Record {
        Record {
            id: self.next_id(),
            operation: OperationKind::LeaseRevocation,
            routing_key: "rk".into(),
            key_index: "ki".into(),
            subject_record: Some(subject.to_string()),
            revocation_proof: vec![STANDARD.encode(preimage.as_bytes())],
            authorising_commitment: None,
            data_assets: Vec::new(),
            operation_address: None,
            head_id: None,
        }
    }

    /// A `LeaseRevocation` carrying a proof that will never match any
    /// commitment, for the "bad proof" scenario.
    pub fn bad_revocation(&mut self, subject: &str) -> Record {
        self.revocation(subject, "not-the-real-preimage")
    }

    /// An `AssetHead` record pointing `head_id` at its own id.
    pub fn asset_head(&mut self, head_id: &str) -> Record {
        Record {
            id: self.next_id(),
            operation: OperationKind::AssetHead,
            routing_key: "rk".into(),
            key_index: "ki".into(),
            subject_record: None,
            revocation_proof: Vec::new(),
            authorising_commitment: None,
            data_assets: Vec::new(),
            operation_address: None,
            head_id: Some(head_id.to_string()),
        }
    }
}
