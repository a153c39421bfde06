//! Per-voter vote records and their storage trait.

use crate::verification::VerificationEntry;
use crate::StoreError;
use plancheck_types::{Fingerprint, Timestamp, VerificationId, VoteDirection};
use serde::{Deserialize, Serialize};

/// One identity's stance on one verification. At most one per
/// (verification, voter) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub verification: VerificationId,
    pub voter: Fingerprint,
    pub direction: VoteDirection,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of [`VoteStore::update_vote`].
#[derive(Clone, Debug)]
pub struct VoteWrite {
    /// The entry as it stands after the call.
    pub entry: VerificationEntry,
    /// The voter's record before the call.
    pub previous: Option<VoteRecord>,
    /// Whether anything was persisted.
    pub written: bool,
}

/// Trait for vote storage.
pub trait VoteStore {
    /// Read-modify-write of one vote and its parent entry as a single unit.
    ///
    /// `apply` receives the entry and the voter's current record (if any).
    /// It may adjust the entry's counters and returns the record to store:
    /// `Some` persists that record together with the modified entry, `None`
    /// persists nothing. An error from `apply` aborts without writing.
    ///
    /// Fails with [`StoreError::NotFound`] before calling `apply` when no
    /// entry with `id` exists.
    fn update_vote<F>(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
        apply: F,
    ) -> Result<VoteWrite, StoreError>
    where
        F: FnOnce(&mut VerificationEntry, Option<&VoteRecord>) -> Result<Option<VoteRecord>, StoreError>;

    fn get_vote(
        &self,
        id: &VerificationId,
        voter: &Fingerprint,
    ) -> Result<Option<VoteRecord>, StoreError>;

    /// Every vote cast on one verification.
    fn votes_for(&self, id: &VerificationId) -> Result<Vec<VoteRecord>, StoreError>;
}
