//! LMDB environment setup and the shared key/value encoding.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use plancheck_types::{Timestamp, VerificationId};

use crate::migration::Migrator;
use crate::LmdbError;

/// Named databases in one plancheck environment.
pub(crate) const DATABASES: &[&str] = &[
    "verifications",
    "active_by_key",
    "expiry_index",
    "submission_dedup",
    "votes",
    "acceptance",
    "meta",
];

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
///
/// Implements every plancheck store trait. Each compound trait operation
/// runs in exactly one write transaction; LMDB admits one writer at a time,
/// so those operations are serialized against each other.
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    path: PathBuf,
    /// id → VerificationEntry
    pub(crate) verifications_db: Database<Bytes, Bytes>,
    /// key bytes ++ id → () for every active entry
    pub(crate) active_by_key_db: Database<Bytes, Bytes>,
    /// expires_at (BE) ++ id → () for every active entry
    pub(crate) expiry_db: Database<Bytes, Bytes>,
    /// origin ++ key ++ claim → created_at (BE) of the latest such submission
    pub(crate) dedup_db: Database<Bytes, Bytes>,
    /// id ++ voter → VoteRecord
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// key bytes → AcceptanceRecord
    pub(crate) acceptance_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an environment under `path` and bring its schema up
    /// to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(DATABASES.len() as u32);
        // SAFETY: the environment is opened once per path by this process;
        // the data directory is not shared with other openers of the same file.
        let env = unsafe { options.open(path)? };

        let mut wtxn = env.write_txn()?;
        let verifications_db = env.create_database(&mut wtxn, Some("verifications"))?;
        let active_by_key_db = env.create_database(&mut wtxn, Some("active_by_key"))?;
        let expiry_db = env.create_database(&mut wtxn, Some("expiry_index"))?;
        let dedup_db = env.create_database(&mut wtxn, Some("submission_dedup"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let acceptance_db = env.create_database(&mut wtxn, Some("acceptance"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let store = Self {
            env,
            path: path.to_path_buf(),
            verifications_db,
            active_by_key_db,
            expiry_db,
            dedup_db,
            votes_db,
            acceptance_db,
            meta_db,
        };
        Migrator::run(&store)?;
        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn get_entry<T: DeserializeOwned>(
        &self,
        txn: &RoTxn<'_>,
        db: Database<Bytes, Bytes>,
        key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        match db.get(txn, key)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    /// Keys of every row whose key starts with `prefix`.
    pub(crate) fn keys_with_prefix(
        &self,
        txn: &RoTxn<'_>,
        db: Database<Bytes, Bytes>,
        prefix: &[u8],
    ) -> Result<Vec<Vec<u8>>, LmdbError> {
        let mut keys = Vec::new();
        for row in db.prefix_iter(txn, prefix)? {
            let (key, _) = row?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

/// `prefix ++ suffix`.
pub(crate) fn composite_key(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

/// `expires_at (BE) ++ id`, so index order is expiry order.
pub(crate) fn expiry_key(expires_at: Timestamp, id: &VerificationId) -> Vec<u8> {
    composite_key(&expires_at.to_be_bytes(), id.as_bytes())
}

/// Split the trailing verification id off an index key.
pub(crate) fn trailing_id(key: &[u8]) -> Result<VerificationId, LmdbError> {
    let start = key
        .len()
        .checked_sub(32)
        .ok_or_else(|| LmdbError::Corruption(format!("index key of {} bytes", key.len())))?;
    let mut id = [0u8; 32];
    id.copy_from_slice(&key[start..]);
    Ok(VerificationId::new(id))
}

pub(crate) fn timestamp_from(bytes: &[u8]) -> Result<Timestamp, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("timestamp of {} bytes", bytes.len())))?;
    Ok(Timestamp::from_be_bytes(arr))
}
