use plancheck_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("corrupted record: {0}")]
    Corruption(String),
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Heed(_) | LmdbError::Io(_) => StoreError::Unavailable(e.to_string()),
            LmdbError::Serialization(_) => StoreError::Serialization(e.to_string()),
            LmdbError::SchemaTooNew { .. } | LmdbError::Corruption(_) => {
                StoreError::Corruption(e.to_string())
            }
        }
    }
}
