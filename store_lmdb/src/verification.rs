//! LMDB implementation of VerificationStore.
//!
//! Entries are keyed by id. Two secondary indexes track active entries
//! only: `active_by_key` (acceptance key prefix scan) and `expiry_index`
//! (chronological scan for the sweep). Both are removed when an entry
//! leaves the active state.

use heed::RwTxn;

use plancheck_store::{StoreError, VerificationEntry, VerificationStore};
use plancheck_types::{AcceptanceKey, Timestamp, VerificationId, VerificationStatus};

use crate::environment::{
    composite_key, encode, expiry_key, timestamp_from, trailing_id, LmdbEnvironment,
};
use crate::LmdbError;

impl LmdbEnvironment {
    /// Store a status change and drop the entry from the active indexes.
    fn retire(
        &self,
        wtxn: &mut RwTxn<'_>,
        entry: &mut VerificationEntry,
        status: VerificationStatus,
    ) -> Result<(), LmdbError> {
        entry.status = status;
        self.verifications_db
            .put(wtxn, entry.id.as_bytes(), &encode(&*entry)?)?;
        self.active_by_key_db.delete(
            wtxn,
            &composite_key(&entry.key.to_bytes(), entry.id.as_bytes()),
        )?;
        self.expiry_db
            .delete(wtxn, &expiry_key(entry.expires_at, &entry.id))?;
        Ok(())
    }

    fn load_entry(
        &self,
        txn: &heed::RoTxn<'_>,
        id: &VerificationId,
    ) -> Result<VerificationEntry, LmdbError> {
        self.get_entry(txn, self.verifications_db, id.as_bytes())?
            .ok_or_else(|| LmdbError::Corruption(format!("index points at missing verification {id}")))
    }

    fn insert_in_txn(
        &self,
        wtxn: &mut RwTxn<'_>,
        entry: &VerificationEntry,
        window_start: Timestamp,
    ) -> Result<Vec<VerificationId>, StoreError> {
        let dedup_key = entry.dedup_key();
        if let Some(bytes) = self.dedup_db.get(wtxn, &dedup_key).map_err(LmdbError::from)? {
            if timestamp_from(bytes)? >= window_start {
                return Err(StoreError::Duplicate(format!(
                    "{} already claimed by origin within window",
                    entry.key
                )));
            }
        }
        if self
            .verifications_db
            .get(wtxn, entry.id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(entry.id.to_string()));
        }

        let key_bytes = entry.key.to_bytes();
        let mut superseded = Vec::new();
        for index_key in self.keys_with_prefix(wtxn, self.active_by_key_db, &key_bytes)? {
            let id = trailing_id(&index_key)?;
            let mut existing = self.load_entry(wtxn, &id)?;
            if existing.origin == entry.origin {
                self.retire(wtxn, &mut existing, VerificationStatus::Superseded)?;
                superseded.push(id);
            }
        }

        self.verifications_db
            .put(wtxn, entry.id.as_bytes(), &encode(entry)?)
            .map_err(LmdbError::from)?;
        self.active_by_key_db
            .put(wtxn, &composite_key(&key_bytes, entry.id.as_bytes()), &[])
            .map_err(LmdbError::from)?;
        self.expiry_db
            .put(wtxn, &expiry_key(entry.expires_at, &entry.id), &[])
            .map_err(LmdbError::from)?;
        self.dedup_db
            .put(wtxn, &dedup_key, &entry.created_at.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(superseded)
    }
}

impl VerificationStore for LmdbEnvironment {
    fn insert_verification(
        &self,
        entry: &VerificationEntry,
        window_start: Timestamp,
    ) -> Result<Vec<VerificationId>, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        // Dropping the transaction on any error aborts every write above.
        let superseded = self.insert_in_txn(&mut wtxn, entry, window_start)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(superseded)
    }

    fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<VerificationEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.get_entry(&rtxn, self.verifications_db, id.as_bytes())?)
    }

    fn active_verifications(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Vec<VerificationEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut entries = Vec::new();
        for index_key in self.keys_with_prefix(&rtxn, self.active_by_key_db, &key.to_bytes())? {
            entries.push(self.load_entry(&rtxn, &trailing_id(&index_key)?)?);
        }
        entries.sort_by_key(|e| (e.created_at, e.id));
        Ok(entries)
    }

    fn expire_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<VerificationEntry>, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut due = Vec::new();
        for row in self.expiry_db.iter(&wtxn).map_err(LmdbError::from)? {
            if due.len() >= limit {
                break;
            }
            let (key, _) = row.map_err(LmdbError::from)?;
            if key.len() < 8 || timestamp_from(&key[..8])? > now {
                break;
            }
            due.push(trailing_id(key)?);
        }

        let mut flipped = Vec::with_capacity(due.len());
        for id in due {
            let mut entry = self.load_entry(&wtxn, &id)?;
            self.retire(&mut wtxn, &mut entry, VerificationStatus::Expired)?;
            flipped.push(entry);
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(flipped)
    }

    fn verification_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.verifications_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}
