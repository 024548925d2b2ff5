use metalocker_kv::KvError;
use thiserror::Error;

/// Error taxonomy for the ledger engine (spec.md §7), layered over
/// [`KvError`] the way the teacher layers `reth-errors` over lower-level
/// storage errors: one small `thiserror` enum per crate, composed upward
/// with `#[from]`.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Shape/field validation failure on `SubmitRecord`.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("block not found: {0}")]
    BlockNotFound(u64),

    /// Persistence invariant breach: `SaveRecord` ran with no current
    /// session key set. Fatal; the engine loop terminates on this error
    /// (spec §7).
    #[error("no active block session")]
    NoActiveSession,

    /// Mismatched commitment during block generation (spec §4.5.6 step 2).
    /// The block is not sealed; the offending record stays `Pending`.
    #[error("bad revocation proof for record {0}")]
    BadRevocationProof(String),

    /// Attempted to move a record's state away from `Revoked` (spec §3:
    /// "Once status = Revoked, the state is terminal").
    #[error("record {0} is revoked and its state is immutable")]
    RevokedImmutable(String),

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Stable classification an external layer (e.g. the HTTP account surface,
/// out of scope here) can match on without needing the full error text,
/// mirroring how `reth-errors`'s enums expose enough structure for
/// `reth-rpc`'s error-to-status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    InvalidRecord,
    NotFound,
    NoActiveSession,
    BadRevocationProof,
    RevokedImmutable,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> LedgerErrorKind {
        match self {
            Self::InvalidRecord(_) => LedgerErrorKind::InvalidRecord,
            Self::RecordNotFound(_) | Self::BlockNotFound(_) => LedgerErrorKind::NotFound,
            Self::NoActiveSession => LedgerErrorKind::NoActiveSession,
            Self::BadRevocationProof(_) => LedgerErrorKind::BadRevocationProof,
            Self::RevokedImmutable(_) => LedgerErrorKind::RevokedImmutable,
            Self::Kv(_) | Self::Serde(_) => LedgerErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
