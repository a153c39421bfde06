use plancheck_consensus::ConsensusError;
use plancheck_store::StoreError;
use plancheck_store_lmdb::LmdbError;
use plancheck_verification::VerificationError;
use thiserror::Error;

/// Errors surfaced to callers of the acceptance service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input. Fix and resubmit; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Anti-abuse window violation. A soft rejection, not a failure.
    #[error("duplicate submission for {key}")]
    DuplicateSubmission { key: String },

    /// Missing, superseded or expired verification.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic writes kept losing; retry the whole operation.
    #[error("concurrency conflict on {key} after {attempts} attempts")]
    ConcurrencyConflict { key: String, attempts: u32 },

    /// Backing store failed; fatal for this call.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::StoreUnavailable(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::VersionConflict { key, .. } => {
                Self::ConcurrencyConflict { key, attempts: 1 }
            }
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<LmdbError> for ServiceError {
    fn from(e: LmdbError) -> Self {
        StoreError::from(e).into()
    }
}

impl From<VerificationError> for ServiceError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Validation(reason) => Self::Validation(reason),
            VerificationError::DuplicateSubmission { key } => Self::DuplicateSubmission { key },
            VerificationError::NotFound(what) => Self::NotFound(what),
            VerificationError::Store(e) => e.into(),
        }
    }
}

impl From<ConsensusError> for ServiceError {
    fn from(e: ConsensusError) -> Self {
        match e {
            ConsensusError::ConcurrencyConflict { key, attempts } => {
                Self::ConcurrencyConflict { key, attempts }
            }
            ConsensusError::Store(e) => e.into(),
        }
    }
}
