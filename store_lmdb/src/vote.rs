//! LMDB implementation of VoteStore.
//!
//! Votes use composite keys `verification_id ++ voter` so each vote is its
//! own LMDB key/value pair. Listing all votes for a verification is a
//! prefix scan over the fixed-width id.

use plancheck_store::{StoreError, VerificationEntry, VoteRecord, VoteStore, VoteWrite};
use plancheck_types::{Fingerprint, VerificationId};

use crate::environment::{composite_key, decode, encode, LmdbEnvironment};
use crate::LmdbError;

fn vote_key(id: &VerificationId, voter: &Fingerprint) -> Vec<u8> {
    composite_key(id.as_bytes(), voter.as_str().as_bytes())
}

impl VoteStore for LmdbEnvironment {
    fn update_vote<F>(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
        apply: F,
    ) -> Result<VoteWrite, StoreError>
    where
        F: FnOnce(&mut VerificationEntry, Option<&VoteRecord>) -> Result<Option<VoteRecord>, StoreError>,
    {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut entry: VerificationEntry = self
            .get_entry(&wtxn, self.verifications_db, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("verification {id}")))?;
        let key = vote_key(id, voter);
        let previous: Option<VoteRecord> = self.get_entry(&wtxn, self.votes_db, &key)?;

        let written = match apply(&mut entry, previous.as_ref())? {
            Some(record) => {
                self.votes_db
                    .put(&mut wtxn, &key, &encode(&record)?)
                    .map_err(LmdbError::from)?;
                self.verifications_db
                    .put(&mut wtxn, id.as_bytes(), &encode(&entry)?)
                    .map_err(LmdbError::from)?;
                wtxn.commit().map_err(LmdbError::from)?;
                true
            }
            // Nothing to store; the transaction aborts on drop.
            None => false,
        };
        Ok(VoteWrite {
            entry,
            previous,
            written,
        })
    }

    fn get_vote(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.get_entry(&rtxn, self.votes_db, &vote_key(id, voter))?)
    }

    fn votes_for(&self, id: &VerificationId) -> Result<Vec<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut votes = Vec::new();
        for row in self
            .votes_db
            .prefix_iter(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
        {
            let (_, value) = row.map_err(LmdbError::from)?;
            votes.push(decode(value)?);
        }
        Ok(votes)
    }
}
