//! The acceptance service: ledger, votes and consensus behind one facade.
//!
//! Every mutation returns a [`DirtyKey`] from the verification layer; the
//! service feeds it straight into [`ConsensusEngine::recompute`] before
//! returning, so callers always see the post-recompute acceptance record.

use plancheck_consensus::{ConfidenceExplanation, ConsensusEngine, Recomputed};
use plancheck_store::{AcceptanceRecord, PlanStore, SpecialtyDirectory, VerificationEntry};
use plancheck_store_lmdb::LmdbEnvironment;
use plancheck_types::{
    AcceptanceKey, Clock, ConsensusParams, Fingerprint, LedgerParams, SystemClock,
    VerificationId, VoteDirection,
};
use plancheck_verification::{
    Claim, CounterAudit, DirtyCause, DirtyKey, VerificationError, VerificationLedger,
    VoteAggregator, VoteResult,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::NodeConfig;
use crate::ServiceError;

/// A committed submission and the acceptance record it produced.
#[derive(Clone, Debug, Serialize)]
pub struct Submitted {
    pub entry: VerificationEntry,
    pub superseded: Vec<VerificationId>,
    pub acceptance: AcceptanceRecord,
}

/// A cast vote and, when it changed anything, the recomputed record.
#[derive(Clone, Debug, Serialize)]
pub struct Voted {
    pub vote: VoteResult,
    pub acceptance: Option<AcceptanceRecord>,
}

/// Totals over one or more sweep batches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub batches: usize,
    pub expired: usize,
    pub recomputed: usize,
    /// Keys whose recompute failed after their entries were expired.
    pub failed: Vec<AcceptanceKey>,
    pub more: bool,
}

impl SweepSummary {
    pub fn absorb(&mut self, other: &SweepSummary) {
        self.batches += other.batches;
        self.expired += other.expired;
        self.recomputed += other.recomputed;
        self.failed.extend(other.failed.iter().cloned());
        self.more = other.more;
    }
}

pub struct AcceptanceService<S> {
    store: Arc<S>,
    ledger: VerificationLedger<S>,
    votes: VoteAggregator<S>,
    engine: ConsensusEngine<S>,
    sweep_batch_size: usize,
    /// Keys whose recompute failed after their entries expired. No later
    /// sweep returns them, so they are retried until they succeed.
    pending: Mutex<BTreeSet<AcceptanceKey>>,
}

impl AcceptanceService<LmdbEnvironment> {
    /// Open the LMDB environment under `config.data_dir` with the system
    /// clock and the configured specialty table.
    pub fn open_lmdb(config: &NodeConfig) -> Result<Self, ServiceError> {
        let store = Arc::new(LmdbEnvironment::open(
            &config.data_dir,
            config.map_size_bytes(),
        )?);
        Ok(Self::new(
            store,
            Arc::new(config.specialty_directory()),
            Arc::new(SystemClock),
            config.ledger.clone(),
            &config.consensus,
        ))
    }
}

impl<S: PlanStore> AcceptanceService<S> {
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn SpecialtyDirectory>,
        clock: Arc<dyn Clock>,
        ledger_params: LedgerParams,
        consensus_params: &ConsensusParams,
    ) -> Self {
        let sweep_batch_size = ledger_params.sweep_batch_size;
        Self {
            ledger: VerificationLedger::new(Arc::clone(&store), Arc::clone(&clock), ledger_params),
            votes: VoteAggregator::new(Arc::clone(&store), Arc::clone(&clock)),
            engine: ConsensusEngine::new(Arc::clone(&store), directory, clock, consensus_params),
            store,
            sweep_batch_size,
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record a claim and recompute its key.
    ///
    /// If the recompute fails the entry is still committed and the error is
    /// surfaced. Retrying the claim then hits the duplicate window, which
    /// recomputes the key before rejecting, so the record catches up.
    pub fn submit(&self, claim: Claim) -> Result<Submitted, ServiceError> {
        let key = claim.key.clone();
        let submission = match self.ledger.submit(claim) {
            Ok(submission) => submission,
            Err(e @ VerificationError::DuplicateSubmission { .. }) => {
                if let Err(repair) = self.dispatch(&DirtyKey::new(key, DirtyCause::Submission)) {
                    tracing::warn!(error = %repair, "recompute on duplicate submission failed");
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let recomputed = self.dispatch(&submission.dirty)?;
        Ok(Submitted {
            entry: submission.entry,
            superseded: submission.superseded,
            acceptance: recomputed.record,
        })
    }

    /// Cast or switch a vote. Repeating the same vote changes nothing and
    /// triggers no recompute.
    pub fn cast_vote(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
        direction: VoteDirection,
    ) -> Result<Voted, ServiceError> {
        let vote = self.votes.cast_vote(id, voter, direction)?;
        let acceptance = match &vote.dirty {
            Some(dirty) => Some(self.dispatch(dirty)?.record),
            None => None,
        };
        Ok(Voted { vote, acceptance })
    }

    pub fn get_acceptance(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Option<AcceptanceRecord>, ServiceError> {
        Ok(self.engine.get_acceptance(key)?)
    }

    pub fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<VerificationEntry>, ServiceError> {
        Ok(self.ledger.get(id)?)
    }

    /// Read-only factor breakdown for the stored record.
    pub fn explain_confidence(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Option<ConfidenceExplanation>, ServiceError> {
        Ok(self.engine.explain_confidence(key)?)
    }

    pub fn recompute(&self, key: &AcceptanceKey) -> Result<Recomputed, ServiceError> {
        Ok(self.engine.recompute(key)?)
    }

    /// Feed one dirty key into the consensus engine.
    pub fn dispatch(&self, dirty: &DirtyKey) -> Result<Recomputed, ServiceError> {
        let recomputed = self.engine.recompute(&dirty.key)?;
        tracing::debug!(
            dirty = %dirty,
            written = recomputed.written,
            status = %recomputed.record.status,
            confidence = recomputed.record.confidence,
            "dirty key dispatched"
        );
        Ok(recomputed)
    }

    pub fn audit_counters(&self, id: &VerificationId) -> Result<CounterAudit, ServiceError> {
        Ok(self.votes.audit_counters(id)?)
    }

    /// Expire one batch of overdue entries and recompute every key they
    /// touched. A failed recompute is logged, reported and queued for
    /// [`Self::retry_pending`]; it is not fatal.
    pub fn sweep_expired(&self, batch_size: usize) -> Result<SweepSummary, ServiceError> {
        let report = self.ledger.sweep_expired(batch_size)?;
        let mut summary = SweepSummary {
            batches: 1,
            expired: report.expired,
            more: report.more,
            ..SweepSummary::default()
        };
        for dirty in &report.dirty {
            match self.dispatch(dirty) {
                Ok(_) => summary.recomputed += 1,
                Err(e) => {
                    tracing::error!(key = %dirty.key, error = %e, "recompute after expiry failed");
                    self.pending().insert(dirty.key.clone());
                    summary.failed.push(dirty.key.clone());
                }
            }
        }
        Ok(summary)
    }

    /// Recompute every key left over from a failed expiry recompute. Keys
    /// that fail again stay queued.
    pub fn retry_pending(&self) -> SweepSummary {
        let keys = std::mem::take(&mut *self.pending());
        let mut summary = SweepSummary::default();
        for key in keys {
            match self.dispatch(&DirtyKey::new(key.clone(), DirtyCause::Expiry)) {
                Ok(_) => summary.recomputed += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "queued recompute failed again");
                    self.pending().insert(key.clone());
                    summary.failed.push(key);
                }
            }
        }
        summary
    }

    /// Number of keys waiting for a recompute retry.
    pub fn pending_recomputes(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, BTreeSet<AcceptanceKey>> {
        // The set stays consistent even if a holder panicked.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retry queued recomputes, then run sweep batches until nothing
    /// overdue remains.
    pub fn sweep_all(&self, batch_size: usize) -> Result<SweepSummary, ServiceError> {
        let batch_size = if batch_size == 0 {
            self.sweep_batch_size
        } else {
            batch_size
        };
        let mut total = self.retry_pending();
        loop {
            let pass = self.sweep_expired(batch_size)?;
            total.absorb(&pass);
            if !pass.more || pass.expired == 0 {
                break;
            }
        }
        if total.expired > 0 || total.recomputed > 0 {
            tracing::info!(
                batches = total.batches,
                expired = total.expired,
                recomputed = total.recomputed,
                failed = total.failed.len(),
                "sweep finished"
            );
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plancheck_nullables::{NullClock, NullStore};
    use plancheck_store::StaticSpecialtyDirectory;
    use plancheck_types::{AcceptanceStatus, SECS_PER_DAY};

    const START: u64 = 1_000 * SECS_PER_DAY;

    fn service() -> (AcceptanceService<NullStore>, Arc<NullStore>, Arc<NullClock>) {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(START));
        let service = AcceptanceService::new(
            Arc::clone(&store),
            Arc::new(StaticSpecialtyDirectory::new()),
            clock.clone(),
            LedgerParams::default(),
            &ConsensusParams::default(),
        );
        (service, store, clock)
    }

    fn key() -> AcceptanceKey {
        AcceptanceKey::new("npi-1", "plan-1")
    }

    fn claim(origin: &str, accepts: bool) -> Claim {
        Claim::new(key(), accepts, Fingerprint::new(origin))
    }

    #[test]
    fn submit_returns_recomputed_record() {
        let (service, _, _) = service();
        let submitted = service.submit(claim("o1", true)).unwrap();
        assert_eq!(submitted.acceptance.verification_count, 1);
        assert_eq!(submitted.acceptance.status, AcceptanceStatus::Unknown);
        assert_eq!(
            service.get_acceptance(&key()).unwrap(),
            Some(submitted.acceptance)
        );
    }

    #[test]
    fn repeated_vote_does_not_recompute() {
        let (service, store, _) = service();
        let id = service.submit(claim("o1", true)).unwrap().entry.id;
        let writes = store.acceptance_writes();

        let first = service.cast_vote(&id, &Fingerprint::new("v"), VoteDirection::Up).unwrap();
        assert!(first.acceptance.is_some());
        let writes_after_first = store.acceptance_writes();
        assert!(writes_after_first > writes);

        let again = service.cast_vote(&id, &Fingerprint::new("v"), VoteDirection::Up).unwrap();
        assert!(again.acceptance.is_none());
        assert_eq!(store.acceptance_writes(), writes_after_first);
    }

    #[test]
    fn sweep_all_drains_in_batches() {
        let (service, _, clock) = service();
        for i in 0..5 {
            let key = AcceptanceKey::new(format!("npi-{i}"), "plan-1");
            service
                .submit(Claim::new(key, true, Fingerprint::new("o")))
                .unwrap();
        }
        clock.advance_days(181);

        let summary = service.sweep_all(2).unwrap();
        assert_eq!(summary.expired, 5);
        assert_eq!(summary.recomputed, 5);
        assert_eq!(summary.batches, 3);
        assert!(!summary.more);
        assert!(summary.failed.is_empty());
        assert_eq!(service.sweep_all(2).unwrap().expired, 0);
    }

    #[test]
    fn recompute_failure_after_submit_is_surfaced() {
        let (service, store, _) = service();
        service.submit(claim("o1", true)).unwrap();
        store.inject_version_conflicts(100);
        let err = service.submit(claim("o2", true)).unwrap_err();
        assert!(matches!(err, ServiceError::ConcurrencyConflict { attempts: 5, .. }));
        assert!(err.is_transient());

        // the entry itself was committed; a retry is a duplicate
        assert_eq!(
            service.get_acceptance(&key()).unwrap().unwrap().verification_count,
            1
        );
        store.inject_version_conflicts(0);
        assert!(matches!(
            service.submit(claim("o2", true)),
            Err(ServiceError::DuplicateSubmission { .. })
        ));
        let repaired = service.get_acceptance(&key()).unwrap().unwrap();
        assert_eq!(repaired.verification_count, 2);
    }

    #[test]
    fn duplicate_of_current_claim_writes_nothing() {
        let (service, store, _) = service();
        service.submit(claim("o1", true)).unwrap();
        let writes = store.acceptance_writes();
        assert!(matches!(
            service.submit(claim("o1", true)),
            Err(ServiceError::DuplicateSubmission { .. })
        ));
        assert_eq!(store.acceptance_writes(), writes);
    }

    #[test]
    fn failed_expiry_recompute_is_retried_on_next_sweep() {
        let (service, store, clock) = service();
        service.submit(claim("o1", true)).unwrap();
        clock.advance_days(181);

        store.inject_version_conflicts(100);
        let first = service.sweep_all(0).unwrap();
        assert_eq!(first.expired, 1);
        assert_eq!(first.failed, vec![key()]);
        assert_eq!(service.pending_recomputes(), 1);
        assert_eq!(
            service.get_acceptance(&key()).unwrap().unwrap().verification_count,
            1
        );

        store.inject_version_conflicts(0);
        let second = service.sweep_all(0).unwrap();
        assert_eq!(second.expired, 0);
        assert_eq!(second.recomputed, 1);
        assert!(second.failed.is_empty());
        assert_eq!(service.pending_recomputes(), 0);
        assert_eq!(
            service.get_acceptance(&key()).unwrap().unwrap().verification_count,
            0
        );
    }

    #[test]
    fn still_failing_key_stays_queued() {
        let (service, store, clock) = service();
        service.submit(claim("o1", true)).unwrap();
        clock.advance_days(181);
        store.inject_version_conflicts(1_000);
        service.sweep_all(0).unwrap();

        let retried = service.retry_pending();
        assert_eq!(retried.recomputed, 0);
        assert_eq!(retried.failed, vec![key()]);
        assert_eq!(service.pending_recomputes(), 1);
    }

    #[test]
    fn unavailable_store_maps_to_store_unavailable() {
        let (service, store, _) = service();
        store.set_unavailable(true);
        assert!(matches!(
            service.get_acceptance(&key()),
            Err(ServiceError::StoreUnavailable(_))
        ));
    }
}
