//! LMDB implementation of AcceptanceStore.

use plancheck_store::{AcceptanceRecord, AcceptanceStore, StoreError};
use plancheck_types::AcceptanceKey;

use crate::environment::{encode, LmdbEnvironment};
use crate::LmdbError;

impl AcceptanceStore for LmdbEnvironment {
    fn get_acceptance(&self, key: &AcceptanceKey) -> Result<Option<AcceptanceRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.get_entry(&rtxn, self.acceptance_db, &key.to_bytes())?)
    }

    fn put_acceptance_if_version(
        &self,
        record: &AcceptanceRecord,
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        let key = record.key.to_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current: Option<AcceptanceRecord> = self.get_entry(&wtxn, self.acceptance_db, &key)?;
        let found = current.map(|r| r.version);
        if found != expected {
            return Err(StoreError::VersionConflict {
                key: record.key.to_string(),
                expected,
                found,
            });
        }
        self.acceptance_db
            .put(&mut wtxn, &key, &encode(record)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn acceptance_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.acceptance_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
