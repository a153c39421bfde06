//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All maps live behind one mutex, so every compound trait operation is
//! atomic with respect to every other, the same guarantee a single LMDB
//! write transaction gives.

use plancheck_store::{
    AcceptanceRecord, AcceptanceStore, StoreError, VerificationEntry, VerificationStore,
    VoteRecord, VoteStore, VoteWrite,
};
use plancheck_types::{AcceptanceKey, Fingerprint, Timestamp, VerificationId, VerificationStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct NullState {
    entries: BTreeMap<VerificationId, VerificationEntry>,
    /// dedup key -> creation time of the latest matching submission
    dedup: HashMap<Vec<u8>, Timestamp>,
    votes: BTreeMap<(VerificationId, Fingerprint), VoteRecord>,
    acceptance: HashMap<AcceptanceKey, AcceptanceRecord>,
    /// Remaining acceptance writes to fail with a version conflict.
    injected_conflicts: u32,
    unavailable: bool,
    acceptance_writes: u64,
}

/// An in-memory implementation of every plancheck store trait.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<NullState>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` acceptance writes with [`StoreError::VersionConflict`],
    /// as if another writer had won the race each time.
    pub fn inject_version_conflicts(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.injected_conflicts = n;
        }
    }

    /// While set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    /// Number of successful acceptance writes so far.
    pub fn acceptance_writes(&self) -> u64 {
        self.state.lock().map(|s| s.acceptance_writes).unwrap_or(0)
    }

    fn state(&self) -> Result<MutexGuard<'_, NullState>, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("null store mutex poisoned".into()))?;
        if state.unavailable {
            return Err(StoreError::Unavailable("null store marked unavailable".into()));
        }
        Ok(state)
    }
}

impl VerificationStore for NullStore {
    fn insert_verification(
        &self,
        entry: &VerificationEntry,
        window_start: Timestamp,
    ) -> Result<Vec<VerificationId>, StoreError> {
        let mut state = self.state()?;
        let dedup_key = entry.dedup_key();
        if let Some(last) = state.dedup.get(&dedup_key) {
            if *last >= window_start {
                return Err(StoreError::Duplicate(format!(
                    "{} already claimed by origin within window",
                    entry.key
                )));
            }
        }
        if state.entries.contains_key(&entry.id) {
            return Err(StoreError::Duplicate(entry.id.to_string()));
        }

        let mut superseded = Vec::new();
        for existing in state.entries.values_mut() {
            if existing.key == entry.key
                && existing.origin == entry.origin
                && existing.status.is_active()
            {
                existing.status = VerificationStatus::Superseded;
                superseded.push(existing.id);
            }
        }

        state.dedup.insert(dedup_key, entry.created_at);
        state.entries.insert(entry.id, entry.clone());
        Ok(superseded)
    }

    fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<VerificationEntry>, StoreError> {
        Ok(self.state()?.entries.get(id).cloned())
    }

    fn active_verifications(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Vec<VerificationEntry>, StoreError> {
        let state = self.state()?;
        let mut active: Vec<VerificationEntry> = state
            .entries
            .values()
            .filter(|e| &e.key == key && e.status.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|e| (e.created_at, e.id));
        Ok(active)
    }

    fn expire_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<VerificationEntry>, StoreError> {
        let mut state = self.state()?;
        let mut due: Vec<(Timestamp, VerificationId)> = state
            .entries
            .values()
            .filter(|e| e.status.is_active() && e.expires_at <= now)
            .map(|e| (e.expires_at, e.id))
            .collect();
        due.sort();
        due.truncate(limit);

        let mut flipped = Vec::with_capacity(due.len());
        for (_, id) in due {
            if let Some(entry) = state.entries.get_mut(&id) {
                entry.status = VerificationStatus::Expired;
                flipped.push(entry.clone());
            }
        }
        Ok(flipped)
    }

    fn verification_count(&self) -> Result<u64, StoreError> {
        Ok(self.state()?.entries.len() as u64)
    }
}

impl VoteStore for NullStore {
    fn update_vote<F>(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
        apply: F,
    ) -> Result<VoteWrite, StoreError>
    where
        F: FnOnce(&mut VerificationEntry, Option<&VoteRecord>) -> Result<Option<VoteRecord>, StoreError>,
    {
        let mut state = self.state()?;
        let mut entry = state
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("verification {id}")))?;
        let vote_key = (*id, voter.clone());
        let previous = state.votes.get(&vote_key).cloned();

        let written = match apply(&mut entry, previous.as_ref())? {
            Some(record) => {
                state.votes.insert(vote_key, record);
                state.entries.insert(*id, entry.clone());
                true
            }
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
        Ok(self.state()?.votes.get(&(*id, voter.clone())).cloned())
    }

    fn votes_for(&self, id: &VerificationId) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .state()?
            .votes
            .iter()
            .filter(|((vid, _), _)| vid == id)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

impl AcceptanceStore for NullStore {
    fn get_acceptance(&self, key: &AcceptanceKey) -> Result<Option<AcceptanceRecord>, StoreError> {
        Ok(self.state()?.acceptance.get(key).cloned())
    }

    fn put_acceptance_if_version(
        &self,
        record: &AcceptanceRecord,
        expected: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let found = state.acceptance.get(&record.key).map(|r| r.version);
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(StoreError::VersionConflict {
                key: record.key.to_string(),
                expected,
                found,
            });
        }
        if found != expected {
            return Err(StoreError::VersionConflict {
                key: record.key.to_string(),
                expected,
                found,
            });
        }
        state.acceptance.insert(record.key.clone(), record.clone());
        state.acceptance_writes += 1;
        Ok(())
    }

    fn acceptance_count(&self) -> Result<u64, StoreError> {
        Ok(self.state()?.acceptance.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plancheck_types::{DataSource, VoteDirection};

    fn entry(origin: &str, accepts: bool, created: u64) -> VerificationEntry {
        let key = AcceptanceKey::new("npi-1", "plan-1");
        VerificationEntry {
            id: VerificationId::derive(&[origin.as_bytes(), &created.to_be_bytes(), &[accepts as u8]]),
            key,
            accepts_insurance: accepts,
            accepts_new_patients: None,
            note: None,
            evidence_ref: None,
            submitted_by: None,
            origin: Fingerprint::new(origin),
            source: DataSource::CommunitySubmitted,
            created_at: Timestamp::new(created),
            expires_at: Timestamp::new(created + 1_000),
            upvotes: 0,
            downvotes: 0,
            status: VerificationStatus::Active,
        }
    }

    #[test]
    fn duplicate_within_window_is_rejected_without_writes() {
        let store = NullStore::new();
        store.insert_verification(&entry("o1", true, 100), Timestamp::EPOCH).unwrap();
        let err = store
            .insert_verification(&entry("o1", true, 150), Timestamp::new(100))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.verification_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_window_spans_locations() {
        let store = NullStore::new();
        let mut first = entry("o1", true, 100);
        first.key = first.key.clone().at("clinic-a");
        store.insert_verification(&first, Timestamp::EPOCH).unwrap();

        let mut elsewhere = entry("o1", true, 150);
        elsewhere.key = elsewhere.key.clone().at("clinic-b");
        let err = store
            .insert_verification(&elsewhere, Timestamp::new(100))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.active_verifications(&elsewhere.key).unwrap().is_empty());
    }

    #[test]
    fn same_origin_resubmission_supersedes_previous() {
        let store = NullStore::new();
        let first = entry("o1", true, 100);
        store.insert_verification(&first, Timestamp::EPOCH).unwrap();
        let superseded = store
            .insert_verification(&entry("o1", false, 110), Timestamp::new(50))
            .unwrap();
        assert_eq!(superseded, vec![first.id]);
        let active = store.active_verifications(&first.key).unwrap();
        assert_eq!(active.len(), 1);
        assert!(!active[0].accepts_insurance);
    }

    #[test]
    fn expire_due_respects_limit_and_order() {
        let store = NullStore::new();
        for (i, origin) in ["a", "b", "c"].iter().enumerate() {
            store
                .insert_verification(&entry(origin, true, 100 + i as u64), Timestamp::EPOCH)
                .unwrap();
        }
        let flipped = store.expire_due(Timestamp::new(5_000), 2).unwrap();
        assert_eq!(flipped.len(), 2);
        assert!(flipped.iter().all(|e| e.status == VerificationStatus::Expired));
        assert_eq!(flipped[0].created_at, Timestamp::new(100));
        let rest = store.expire_due(Timestamp::new(5_000), 10).unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn update_vote_none_writes_nothing() {
        let store = NullStore::new();
        let e = entry("o1", true, 100);
        store.insert_verification(&e, Timestamp::EPOCH).unwrap();
        let voter = Fingerprint::new("v1");
        let write = store.update_vote(&e.id, &voter, |_, _| Ok(None)).unwrap();
        assert!(!write.written);
        assert!(store.get_vote(&e.id, &voter).unwrap().is_none());
    }

    #[test]
    fn update_vote_missing_entry_is_not_found() {
        let store = NullStore::new();
        let err = store
            .update_vote(&VerificationId::ZERO, &Fingerprint::new("v"), |_, _| Ok(None))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn update_vote_persists_record_and_counters_together() {
        let store = NullStore::new();
        let e = entry("o1", true, 100);
        store.insert_verification(&e, Timestamp::EPOCH).unwrap();
        let voter = Fingerprint::new("v1");
        store
            .update_vote(&e.id, &voter, |entry, _| {
                entry.upvotes += 1;
                Ok(Some(VoteRecord {
                    verification: entry.id,
                    voter: Fingerprint::new("v1"),
                    direction: VoteDirection::Up,
                    created_at: Timestamp::new(120),
                    updated_at: Timestamp::new(120),
                }))
            })
            .unwrap();
        assert_eq!(store.get_verification(&e.id).unwrap().unwrap().upvotes, 1);
        assert_eq!(store.votes_for(&e.id).unwrap().len(), 1);
    }

    #[test]
    fn acceptance_cas_and_injected_conflicts() {
        let store = NullStore::new();
        let mut record =
            AcceptanceRecord::new(AcceptanceKey::new("npi-1", "plan-1"), Timestamp::new(1));
        record.version = 1;
        store.put_acceptance_if_version(&record, None).unwrap();
        assert!(matches!(
            store.put_acceptance_if_version(&record, None),
            Err(StoreError::VersionConflict { .. })
        ));

        store.inject_version_conflicts(1);
        record.version = 2;
        assert!(store.put_acceptance_if_version(&record, Some(1)).is_err());
        store.put_acceptance_if_version(&record, Some(1)).unwrap();
        assert_eq!(store.acceptance_writes(), 2);
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = NullStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.verification_count(),
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert_eq!(store.verification_count().unwrap(), 0);
    }
}
