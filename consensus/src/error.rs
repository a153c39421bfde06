use plancheck_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("acceptance record {key} kept changing underneath recompute ({attempts} attempts)")]
    ConcurrencyConflict { key: String, attempts: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
