//! Verification entries and their storage trait.

use crate::StoreError;
use plancheck_types::{
    AcceptanceKey, DataSource, Fingerprint, Timestamp, VerificationId, VerificationStatus,
};
use serde::{Deserialize, Serialize};

/// One user-submitted claim that a provider does (or does not) accept a plan.
///
/// The claim content is immutable once stored; only the vote counters and
/// `status` change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    pub id: VerificationId,
    pub key: AcceptanceKey,
    pub accepts_insurance: bool,
    pub accepts_new_patients: Option<bool>,
    pub note: Option<String>,
    pub evidence_ref: Option<String>,
    /// Authenticated submitter, if any. Anonymous submissions are allowed.
    pub submitted_by: Option<String>,
    pub origin: Fingerprint,
    pub source: DataSource,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub upvotes: u32,
    pub downvotes: u32,
    pub status: VerificationStatus,
}

impl VerificationEntry {
    /// Active and not yet past its expiry, whether or not a sweep has run.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.status.is_active() && now < self.expires_at
    }

    /// Anti-abuse de-duplication key: (origin, provider, plan, claim value).
    ///
    /// The location is left out, so one origin cannot repeat a claim for a
    /// provider and plan by spreading it over practice locations.
    pub fn dedup_key(&self) -> Vec<u8> {
        let origin = self.origin.as_str().as_bytes();
        let provider = self.key.provider.as_str().as_bytes();
        let plan = self.key.plan.as_str().as_bytes();
        let mut out = Vec::with_capacity(7 + origin.len() + provider.len() + plan.len());
        push_segment(&mut out, origin);
        push_segment(&mut out, provider);
        push_segment(&mut out, plan);
        out.push(self.accepts_insurance as u8);
        out
    }
}

fn push_segment(out: &mut Vec<u8>, segment: &[u8]) {
    let len = segment.len().min(u16::MAX as usize);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(&segment[..len]);
}

/// Trait for verification ledger storage.
pub trait VerificationStore {
    /// Insert a new `active` entry.
    ///
    /// In one atomic unit:
    /// - fail with [`StoreError::Duplicate`] if the same origin submitted the
    ///   same claim value for the same provider and plan, at any location,
    ///   at or after `window_start`;
    /// - mark every other active entry from the same origin for the same key
    ///   `superseded`;
    /// - store the entry and its indexes.
    ///
    /// Returns the ids of the superseded entries.
    fn insert_verification(
        &self,
        entry: &VerificationEntry,
        window_start: Timestamp,
    ) -> Result<Vec<VerificationId>, StoreError>;

    fn get_verification(&self, id: &VerificationId)
        -> Result<Option<VerificationEntry>, StoreError>;

    /// All entries for `key` whose status is `active`, oldest first.
    ///
    /// Entries past expiry that a sweep has not flipped yet are included;
    /// callers filter with [`VerificationEntry::is_live`].
    fn active_verifications(&self, key: &AcceptanceKey)
        -> Result<Vec<VerificationEntry>, StoreError>;

    /// Flip up to `limit` active entries with `expires_at <= now` to
    /// `expired` in one write, earliest expiry first. Returns the flipped
    /// entries (with their new status).
    fn expire_due(&self, now: Timestamp, limit: usize)
        -> Result<Vec<VerificationEntry>, StoreError>;

    fn verification_count(&self) -> Result<u64, StoreError>;
}
