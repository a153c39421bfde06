//! Vote aggregation: one vote per (verification, voter), counters kept in
//! lockstep with the vote records.

use crate::error::VerificationError;
use crate::events::{DirtyCause, DirtyKey};
use plancheck_store::{StoreError, VerificationStore, VoteRecord, VoteStore};
use plancheck_types::{Clock, Fingerprint, VerificationId, VoteDirection};
use serde::Serialize;
use std::sync::Arc;

/// What a cast did to the voter's record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteOutcome {
    /// First vote by this voter on this verification.
    Created,
    /// Same direction as the existing vote; nothing changed.
    Unchanged,
    /// Existing vote moved to the other direction.
    Switched,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub verification: VerificationId,
    pub outcome: VoteOutcome,
    pub upvotes: u32,
    pub downvotes: u32,
    /// `None` when nothing changed.
    pub dirty: Option<DirtyKey>,
}

/// Stored counters versus the tally of vote records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CounterAudit {
    pub verification: VerificationId,
    pub stored_upvotes: u32,
    pub stored_downvotes: u32,
    pub counted_upvotes: u32,
    pub counted_downvotes: u32,
}

impl CounterAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored_upvotes == self.counted_upvotes
            && self.stored_downvotes == self.counted_downvotes
    }
}

pub struct VoteAggregator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: VerificationStore + VoteStore> VoteAggregator<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record `voter`'s vote on a verification.
    ///
    /// Idempotent per (verification, voter, direction). Switching direction
    /// moves one count from the old counter to the new one in the same write
    /// as the record update. Missing, superseded and expired verifications
    /// fail with [`VerificationError::NotFound`].
    pub fn cast_vote(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
        direction: VoteDirection,
    ) -> Result<VoteResult, VerificationError> {
        if !voter.is_valid() {
            return Err(VerificationError::Validation(
                "voter fingerprint is missing".to_string(),
            ));
        }
        let now = self.clock.now();

        let write = self
            .store
            .update_vote(id, voter, |entry, existing| {
                if !entry.is_live(now) {
                    return Err(StoreError::NotFound(format!("verification {}", entry.id)));
                }
                match existing {
                    None => {
                        bump(&mut entry.upvotes, &mut entry.downvotes, direction);
                        Ok(Some(VoteRecord {
                            verification: entry.id,
                            voter: voter.clone(),
                            direction,
                            created_at: now,
                            updated_at: now,
                        }))
                    }
                    Some(record) if record.direction == direction => Ok(None),
                    Some(record) => {
                        unbump(&mut entry.upvotes, &mut entry.downvotes, record.direction);
                        bump(&mut entry.upvotes, &mut entry.downvotes, direction);
                        Ok(Some(VoteRecord {
                            direction,
                            updated_at: now,
                            ..record.clone()
                        }))
                    }
                }
            })
            .map_err(|e| match e {
                StoreError::NotFound(_) => VerificationError::NotFound(id.to_string()),
                other => VerificationError::Store(other),
            })?;

        let outcome = match (&write.previous, write.written) {
            (_, false) => VoteOutcome::Unchanged,
            (None, true) => VoteOutcome::Created,
            (Some(_), true) => VoteOutcome::Switched,
        };
        let dirty = write
            .written
            .then(|| DirtyKey::new(write.entry.key.clone(), DirtyCause::Vote));

        tracing::debug!(
            verification = %id,
            direction = %direction,
            outcome = ?outcome,
            upvotes = write.entry.upvotes,
            downvotes = write.entry.downvotes,
            "vote cast"
        );
        Ok(VoteResult {
            verification: *id,
            outcome,
            upvotes: write.entry.upvotes,
            downvotes: write.entry.downvotes,
            dirty,
        })
    }

    /// Recount the vote records for a verification and compare against its
    /// stored counters.
    pub fn audit_counters(&self, id: &VerificationId) -> Result<CounterAudit, VerificationError> {
        let entry = self
            .store
            .get_verification(id)?
            .ok_or_else(|| VerificationError::NotFound(id.to_string()))?;
        let votes = self.store.votes_for(id)?;
        let counted_upvotes = votes.iter().filter(|v| v.direction == VoteDirection::Up).count();
        let counted_downvotes = votes.len() - counted_upvotes;

        let audit = CounterAudit {
            verification: *id,
            stored_upvotes: entry.upvotes,
            stored_downvotes: entry.downvotes,
            counted_upvotes: u32::try_from(counted_upvotes).unwrap_or(u32::MAX),
            counted_downvotes: u32::try_from(counted_downvotes).unwrap_or(u32::MAX),
        };
        if !audit.is_consistent() {
            tracing::warn!(
                verification = %id,
                stored_up = audit.stored_upvotes,
                stored_down = audit.stored_downvotes,
                counted_up = audit.counted_upvotes,
                counted_down = audit.counted_downvotes,
                "vote counter drift"
            );
        }
        Ok(audit)
    }
}

fn bump(up: &mut u32, down: &mut u32, direction: VoteDirection) {
    match direction {
        VoteDirection::Up => *up = up.saturating_add(1),
        VoteDirection::Down => *down = down.saturating_add(1),
    }
}

fn unbump(up: &mut u32, down: &mut u32, direction: VoteDirection) {
    match direction {
        VoteDirection::Up => *up = up.saturating_sub(1),
        VoteDirection::Down => *down = down.saturating_sub(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::Claim;
    use crate::ledger::VerificationLedger;
    use plancheck_nullables::{NullClock, NullStore};
    use plancheck_types::{AcceptanceKey, LedgerParams, SECS_PER_DAY};

    struct Fixture {
        votes: VoteAggregator<NullStore>,
        ledger: VerificationLedger<NullStore>,
        store: Arc<NullStore>,
        clock: Arc<NullClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(500 * SECS_PER_DAY));
        Fixture {
            votes: VoteAggregator::new(store.clone(), clock.clone()),
            ledger: VerificationLedger::new(store.clone(), clock.clone(), LedgerParams::default()),
            store,
            clock,
        }
    }

    fn submit(f: &Fixture, origin: &str) -> VerificationId {
        f.ledger
            .submit(Claim::new(
                AcceptanceKey::new("npi-1", "plan-1"),
                true,
                Fingerprint::from_ip(origin),
            ))
            .unwrap()
            .entry
            .id
    }

    fn voter(n: u32) -> Fingerprint {
        Fingerprint::from_ip(&format!("192.168.0.{n}"))
    }

    #[test]
    fn first_vote_creates_record_and_counter() {
        let f = fixture();
        let id = submit(&f, "a");
        let r = f.votes.cast_vote(&id, &voter(1), VoteDirection::Up).unwrap();
        assert_eq!(r.outcome, VoteOutcome::Created);
        assert_eq!((r.upvotes, r.downvotes), (1, 0));
        assert_eq!(
            r.dirty.unwrap(),
            DirtyKey::new(AcceptanceKey::new("npi-1", "plan-1"), DirtyCause::Vote)
        );
    }

    #[test]
    fn repeating_a_vote_is_idempotent() {
        let f = fixture();
        let id = submit(&f, "a");
        f.votes.cast_vote(&id, &voter(1), VoteDirection::Up).unwrap();
        let again = f.votes.cast_vote(&id, &voter(1), VoteDirection::Up).unwrap();
        assert_eq!(again.outcome, VoteOutcome::Unchanged);
        assert_eq!((again.upvotes, again.downvotes), (1, 0));
        assert!(again.dirty.is_none());
    }

    #[test]
    fn switching_moves_one_count() {
        let f = fixture();
        let id = submit(&f, "a");
        for n in 1..=3 {
            f.votes.cast_vote(&id, &voter(n), VoteDirection::Up).unwrap();
        }
        f.votes.cast_vote(&id, &voter(4), VoteDirection::Down).unwrap();

        let r = f.votes.cast_vote(&id, &voter(2), VoteDirection::Down).unwrap();
        assert_eq!(r.outcome, VoteOutcome::Switched);
        assert_eq!((r.upvotes, r.downvotes), (2, 2));

        let record = f.store.get_vote(&id, &voter(2)).unwrap().unwrap();
        assert_eq!(record.direction, VoteDirection::Down);
        assert!(f.votes.audit_counters(&id).unwrap().is_consistent());
    }

    #[test]
    fn unknown_verification_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.votes.cast_vote(&VerificationId::ZERO, &voter(1), VoteDirection::Up),
            Err(VerificationError::NotFound(_))
        ));
    }

    #[test]
    fn expired_verification_is_not_found_even_before_sweep() {
        let f = fixture();
        let id = submit(&f, "a");
        f.clock.advance_days(181);
        assert!(matches!(
            f.votes.cast_vote(&id, &voter(1), VoteDirection::Up),
            Err(VerificationError::NotFound(_))
        ));
        assert!(f.store.votes_for(&id).unwrap().is_empty());
    }

    #[test]
    fn superseded_verification_is_not_found() {
        let f = fixture();
        let id = submit(&f, "a");
        f.clock.advance(10);
        f.ledger
            .submit(Claim::new(
                AcceptanceKey::new("npi-1", "plan-1"),
                false,
                Fingerprint::from_ip("a"),
            ))
            .unwrap();
        assert!(matches!(
            f.votes.cast_vote(&id, &voter(1), VoteDirection::Up),
            Err(VerificationError::NotFound(_))
        ));
    }

    #[test]
    fn blank_voter_is_rejected() {
        let f = fixture();
        let id = submit(&f, "a");
        assert!(matches!(
            f.votes.cast_vote(&id, &Fingerprint::new(""), VoteDirection::Up),
            Err(VerificationError::Validation(_))
        ));
    }
}
