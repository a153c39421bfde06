//! The verification ledger: append-only submissions with an anti-abuse
//! window and a time-to-live.

use crate::claim::Claim;
use crate::error::VerificationError;
use crate::events::{DirtyCause, DirtyKey};
use plancheck_store::{StoreError, VerificationEntry, VerificationStore};
use plancheck_types::{
    Clock, LedgerParams, Timestamp, VerificationId, VerificationStatus,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A committed submission.
#[derive(Clone, Debug)]
pub struct Submission {
    pub entry: VerificationEntry,
    /// Earlier active entries from the same origin for the same key.
    pub superseded: Vec<VerificationId>,
    pub dirty: DirtyKey,
}

/// Result of one sweep batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    /// Each affected key once.
    pub dirty: Vec<DirtyKey>,
    /// The batch was full, so more entries may be due.
    pub more: bool,
}

pub struct VerificationLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    params: LedgerParams,
}

impl<S: VerificationStore> VerificationLedger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, params: LedgerParams) -> Self {
        Self { store, clock, params }
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Validate and persist a claim.
    ///
    /// Rejected claims write nothing. A repeat of the same claim value for
    /// the same key from the same origin inside the dedup window fails with
    /// [`VerificationError::DuplicateSubmission`].
    pub fn submit(&self, claim: Claim) -> Result<Submission, VerificationError> {
        let accepts = claim.validate(&self.params)?;
        let now = self.clock.now();
        let entry = VerificationEntry {
            id: entry_id(&claim, accepts, now),
            key: claim.key,
            accepts_insurance: accepts,
            accepts_new_patients: claim.accepts_new_patients,
            note: claim.note,
            evidence_ref: claim.evidence_ref,
            submitted_by: claim.submitted_by,
            origin: claim.origin,
            source: claim.source,
            created_at: now,
            expires_at: now.plus_secs(self.params.verification_ttl_secs),
            upvotes: 0,
            downvotes: 0,
            status: VerificationStatus::Active,
        };

        let window_start = now.minus_secs(self.params.dedup_window_secs);
        let superseded = match self.store.insert_verification(&entry, window_start) {
            Ok(superseded) => superseded,
            Err(StoreError::Duplicate(_)) => {
                tracing::info!(key = %entry.key, "submission rejected: duplicate within window");
                return Err(VerificationError::DuplicateSubmission {
                    key: entry.key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            id = %entry.id,
            key = %entry.key,
            accepts = accepts,
            source = %entry.source,
            superseded = superseded.len(),
            "verification submitted"
        );
        let dirty = DirtyKey::new(entry.key.clone(), DirtyCause::Submission);
        Ok(Submission {
            entry,
            superseded,
            dirty,
        })
    }

    pub fn get(&self, id: &VerificationId) -> Result<Option<VerificationEntry>, VerificationError> {
        Ok(self.store.get_verification(id)?)
    }

    /// Flip at most `batch_size` overdue active entries to expired.
    ///
    /// Run repeatedly until `more` is false to drain a backlog.
    pub fn sweep_expired(&self, batch_size: usize) -> Result<SweepReport, VerificationError> {
        if batch_size == 0 {
            return Ok(SweepReport::default());
        }
        let now = self.clock.now();
        let flipped = self.store.expire_due(now, batch_size)?;

        let keys: BTreeSet<_> = flipped.iter().map(|e| e.key.clone()).collect();
        let report = SweepReport {
            expired: flipped.len(),
            dirty: keys
                .into_iter()
                .map(|k| DirtyKey::new(k, DirtyCause::Expiry))
                .collect(),
            more: flipped.len() == batch_size,
        };
        if report.expired > 0 {
            tracing::info!(
                expired = report.expired,
                keys = report.dirty.len(),
                more = report.more,
                "sweep batch expired verifications"
            );
        }
        Ok(report)
    }
}

fn entry_id(claim: &Claim, accepts: bool, now: Timestamp) -> VerificationId {
    VerificationId::derive(&[
        &claim.key.to_bytes(),
        claim.origin.as_str().as_bytes(),
        &[accepts as u8],
        &now.to_be_bytes(),
    ])
}
