use plancheck_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid claim: {0}")]
    Validation(String),

    #[error("duplicate submission for {key} from this origin within the anti-abuse window")]
    DuplicateSubmission { key: String },

    #[error("verification {0} not found or no longer active")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
