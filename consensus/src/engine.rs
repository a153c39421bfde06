//! The consensus engine: the only writer of acceptance records.

use crate::aggregate::EvidenceSnapshot;
use crate::error::ConsensusError;
use crate::policy::StatusPolicy;
use plancheck_confidence::{ConfidenceInput, ConfidenceScore, ConfidenceScorer};
use plancheck_store::{
    AcceptanceRecord, AcceptanceStore, SpecialtyDirectory, StoreError, VerificationStore,
};
use plancheck_types::{AcceptanceKey, Clock, ConsensusParams, Timestamp};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one [`ConsensusEngine::recompute`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recomputed {
    /// The record as persisted after the call.
    pub record: AcceptanceRecord,
    /// False when the recomputed content matched what was stored.
    pub written: bool,
    pub status_changed: bool,
    /// Write attempts used, including the successful one.
    pub attempts: u32,
}

/// Read-only view of how a stored confidence score was reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfidenceExplanation {
    pub record: AcceptanceRecord,
    pub confidence: ConfidenceScore,
}

pub struct ConsensusEngine<S> {
    store: Arc<S>,
    directory: Arc<dyn SpecialtyDirectory>,
    clock: Arc<dyn Clock>,
    scorer: ConfidenceScorer,
    policy: StatusPolicy,
    max_write_attempts: u32,
}

impl<S: VerificationStore + AcceptanceStore> ConsensusEngine<S> {
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn SpecialtyDirectory>,
        clock: Arc<dyn Clock>,
        params: &ConsensusParams,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            scorer: ConfidenceScorer::new(),
            policy: StatusPolicy::new(params),
            max_write_attempts: params.max_write_attempts.max(1),
        }
    }

    /// Rebuild the acceptance record for `key` from its live verifications.
    ///
    /// Read, aggregate and compare-and-swap write, retried on version
    /// conflicts up to the configured attempt limit. When the result equals
    /// the stored record nothing is written.
    pub fn recompute(&self, key: &AcceptanceKey) -> Result<Recomputed, ConsensusError> {
        for attempt in 1..=self.max_write_attempts {
            let now = self.clock.now();
            let existing = self.store.get_acceptance(key)?;
            let entries = self.store.active_verifications(key)?;
            let evidence = EvidenceSnapshot::from_entries(&entries, now);

            let base = existing
                .clone()
                .unwrap_or_else(|| AcceptanceRecord::new(key.clone(), now));
            let mut candidate = self.aggregate_into(&base, &evidence, now);
            let score = self.scorer.score(&self.input_for(&candidate, now));
            candidate.confidence = score.score;
            candidate.status = self.policy.next_status(base.status, &evidence, score.score);

            if let Some(current) = &existing {
                if current.same_content(&candidate) {
                    return Ok(Recomputed {
                        record: current.clone(),
                        written: false,
                        status_changed: false,
                        attempts: attempt,
                    });
                }
            }

            let expected = existing
                .as_ref()
                .filter(|r| r.is_persisted())
                .map(|r| r.version);
            candidate.version = expected.unwrap_or(0) + 1;
            match self.store.put_acceptance_if_version(&candidate, expected) {
                Ok(()) => {
                    let status_changed = candidate.status != base.status;
                    if status_changed {
                        tracing::info!(
                            key = %key,
                            from = %base.status,
                            to = %candidate.status,
                            confidence = candidate.confidence,
                            verifications = candidate.verification_count,
                            "acceptance status changed"
                        );
                    } else {
                        tracing::debug!(
                            key = %key,
                            confidence = candidate.confidence,
                            verifications = candidate.verification_count,
                            version = candidate.version,
                            "acceptance record refreshed"
                        );
                    }
                    return Ok(Recomputed {
                        record: candidate,
                        written: true,
                        status_changed,
                        attempts: attempt,
                    });
                }
                Err(StoreError::VersionConflict { expected, found, .. }) => {
                    tracing::warn!(
                        key = %key,
                        attempt,
                        ?expected,
                        ?found,
                        "acceptance write lost a race, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ConsensusError::ConcurrencyConflict {
            key: key.to_string(),
            attempts: self.max_write_attempts,
        })
    }

    pub fn get_acceptance(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Option<AcceptanceRecord>, ConsensusError> {
        Ok(self.store.get_acceptance(key)?)
    }

    /// Factor breakdown and explanation for the stored record, evaluated as
    /// of now so recency and staleness keep aging between writes. The
    /// record keeps its stored confidence. Writes nothing.
    pub fn explain_confidence(
        &self,
        key: &AcceptanceKey,
    ) -> Result<Option<ConfidenceExplanation>, ConsensusError> {
        let Some(record) = self.store.get_acceptance(key)? else {
            return Ok(None);
        };
        let confidence = self.scorer.score(&self.input_for(&record, self.clock.now()));
        Ok(Some(ConfidenceExplanation { record, confidence }))
    }

    /// Copy the aggregate facts into a fresh candidate. With no live
    /// evidence the last known verification facts are carried forward.
    fn aggregate_into(
        &self,
        base: &AcceptanceRecord,
        evidence: &EvidenceSnapshot,
        now: Timestamp,
    ) -> AcceptanceRecord {
        let mut record = base.clone();
        record.verification_count = evidence.count;
        record.upvotes = evidence.upvotes;
        record.downvotes = evidence.downvotes;
        if let Some(latest) = evidence.latest {
            record.source = Some(latest.source);
            record.last_verified_at = Some(latest.created_at);
            record.expires_at = Some(latest.expires_at);
        }
        record.updated_at = now;
        record
    }

    fn input_for(&self, record: &AcceptanceRecord, as_of: Timestamp) -> ConfidenceInput {
        ConfidenceInput {
            source: record.source,
            last_verified_at: record.last_verified_at,
            verification_count: record.verification_count,
            upvotes: record.upvotes,
            downvotes: record.downvotes,
            specialty: self.directory.specialty_of(&record.key.provider),
            as_of,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plancheck_confidence::ConfidenceLevel;
    use plancheck_nullables::{NullClock, NullStore};
    use plancheck_store::{StaticSpecialtyDirectory, VerificationEntry};
    use plancheck_types::{
        AcceptanceStatus, DataSource, Fingerprint, SpecialtyCategory, VerificationId,
        VerificationStatus, SECS_PER_DAY,
    };

    const NOW: u64 = 2_000 * SECS_PER_DAY;

    struct Fixture {
        engine: ConsensusEngine<NullStore>,
        store: Arc<NullStore>,
        clock: Arc<NullClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(NOW));
        let directory = StaticSpecialtyDirectory::new()
            .with("npi-1", SpecialtyCategory::PrimaryCare)
            .with("npi-mh", SpecialtyCategory::MentalHealth);
        let engine = ConsensusEngine::new(
            store.clone(),
            Arc::new(directory),
            clock.clone(),
            &ConsensusParams::default(),
        );
        Fixture { engine, store, clock }
    }

    fn key() -> AcceptanceKey {
        AcceptanceKey::new("npi-1", "plan-1")
    }

    /// Insert an active entry `age_days` old with one upvote.
    fn add(f: &Fixture, origin: &str, accepts: bool, age_days: u64) -> VerificationEntry {
        let created = Timestamp::new(NOW).minus_days(age_days);
        let entry = VerificationEntry {
            id: VerificationId::derive(&[origin.as_bytes(), &created.to_be_bytes()]),
            key: key(),
            accepts_insurance: accepts,
            accepts_new_patients: None,
            note: None,
            evidence_ref: None,
            submitted_by: None,
            origin: Fingerprint::new(origin),
            source: DataSource::CommunitySubmitted,
            created_at: created,
            expires_at: created.plus_days(180),
            upvotes: 1,
            downvotes: 0,
            status: VerificationStatus::Active,
        };
        f.store.insert_verification(&entry, Timestamp::EPOCH).unwrap();
        entry
    }

    #[test]
    fn three_agreeing_verifications_flip_to_accepted() {
        let f = fixture();
        for (origin, age) in [("a", 2), ("b", 5), ("c", 10)] {
            add(&f, origin, true, age);
        }
        let r = f.engine.recompute(&key()).unwrap();
        assert!(r.written);
        assert!(r.status_changed);
        assert_eq!(r.record.status, AcceptanceStatus::Accepted);
        assert_eq!(r.record.confidence, 90);
        assert_eq!(r.record.verification_count, 3);
        assert_eq!((r.record.upvotes, r.record.downvotes), (3, 0));
        assert_eq!(r.record.version, 1);
        assert_eq!(
            r.record.last_verified_at,
            Some(Timestamp::new(NOW).minus_days(2))
        );

        let explained = f.engine.explain_confidence(&key()).unwrap().unwrap();
        assert_eq!(explained.confidence.score, 90);
        assert_eq!(explained.confidence.level, ConfidenceLevel::High);
        assert_eq!(explained.confidence.factors.recency, 30);
    }

    #[test]
    fn single_verification_keeps_prior_status() {
        let f = fixture();
        add(&f, "a", true, 1);
        let r = f.engine.recompute(&key()).unwrap();
        assert_eq!(r.record.status, AcceptanceStatus::Unknown);
        assert!(!r.status_changed);
        // 15 + 30 + 10 + 20
        assert_eq!(r.record.confidence, 75);
        let explained = f.engine.explain_confidence(&key()).unwrap().unwrap();
        assert_eq!(explained.confidence.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn recompute_is_idempotent() {
        let f = fixture();
        for origin in ["a", "b", "c"] {
            add(&f, origin, true, 3);
        }
        let first = f.engine.recompute(&key()).unwrap();
        f.clock.advance(30);
        let second = f.engine.recompute(&key()).unwrap();
        assert!(!second.written);
        assert_eq!(first.record, second.record);
        assert_eq!(f.store.acceptance_writes(), 1);
    }

    #[test]
    fn split_evidence_is_pending() {
        let f = fixture();
        add(&f, "a", true, 1);
        add(&f, "b", true, 1);
        add(&f, "c", false, 1);
        add(&f, "d", false, 1);
        let r = f.engine.recompute(&key()).unwrap();
        assert_eq!(r.record.status, AcceptanceStatus::Pending);
    }

    #[test]
    fn status_is_retained_when_evidence_thins_out() {
        let f = fixture();
        add(&f, "a", false, 1);
        add(&f, "b", false, 1);
        add(&f, "c", false, 100);
        let r = f.engine.recompute(&key()).unwrap();
        assert_eq!(r.record.status, AcceptanceStatus::NotAccepted);

        // the old entry passes its expiry; two live entries remain
        f.clock.advance_days(81);
        let r = f.engine.recompute(&key()).unwrap();
        assert!(r.written);
        assert_eq!(r.record.verification_count, 2);
        assert_eq!(r.record.status, AcceptanceStatus::NotAccepted);
    }

    #[test]
    fn fully_expired_key_carries_last_known_facts() {
        let f = fixture();
        let e = add(&f, "a", true, 1);
        f.engine.recompute(&key()).unwrap();
        f.clock.advance_days(200);
        let r = f.engine.recompute(&key()).unwrap();
        assert_eq!(r.record.verification_count, 0);
        assert_eq!(r.record.last_verified_at, Some(e.created_at));
        assert_eq!(r.record.expires_at, Some(e.expires_at));
        assert!(r.record.is_stale(f.clock.now()));
        assert_eq!(
            r.record.display_status(f.clock.now()),
            AcceptanceStatus::Unknown
        );
    }

    #[test]
    fn version_conflicts_are_retried() {
        let f = fixture();
        add(&f, "a", true, 1);
        f.store.inject_version_conflicts(2);
        let r = f.engine.recompute(&key()).unwrap();
        assert_eq!(r.attempts, 3);
        assert_eq!(r.record.version, 1);
    }

    #[test]
    fn exhausted_retries_surface_a_conflict() {
        let f = fixture();
        add(&f, "a", true, 1);
        f.store.inject_version_conflicts(100);
        assert!(matches!(
            f.engine.recompute(&key()),
            Err(ConsensusError::ConcurrencyConflict { attempts: 5, .. })
        ));
        f.store.inject_version_conflicts(0);
        assert!(f.engine.get_acceptance(&key()).unwrap().is_none());
    }

    #[test]
    fn unavailable_store_is_fatal_for_the_call() {
        let f = fixture();
        f.store.set_unavailable(true);
        assert!(matches!(
            f.engine.recompute(&key()),
            Err(ConsensusError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn explain_missing_record_is_none() {
        let f = fixture();
        assert!(f.engine.explain_confidence(&key()).unwrap().is_none());
        assert_eq!(f.store.acceptance_writes(), 0);
    }

    #[test]
    fn explain_scores_as_of_now_and_keeps_stored_confidence() {
        let f = fixture();
        for origin in ["a", "b", "c"] {
            add(&f, origin, true, 0);
        }
        let stored = f.engine.recompute(&key()).unwrap().record;
        f.clock.advance_days(61);

        let explained = f.engine.explain_confidence(&key()).unwrap().unwrap();
        assert_eq!(explained.confidence.metadata.days_since_verification, Some(61));
        assert!(explained.confidence.metadata.is_stale);
        assert_eq!(explained.confidence.factors.recency, 10);
        assert_eq!(explained.record.confidence, stored.confidence);
        assert_eq!(f.store.acceptance_writes(), 1);
    }

    #[test]
    fn explanation_serializes_to_json() {
        let f = fixture();
        add(&f, "a", true, 1);
        f.engine.recompute(&key()).unwrap();
        let explained = f.engine.explain_confidence(&key()).unwrap().unwrap();
        let json = serde_json::to_value(&explained).unwrap();
        assert_eq!(json["record"]["status"], "unknown");
        assert_eq!(json["confidence"]["level"], "medium");
    }
}
