//! Aggregation of the live verifications behind one acceptance key.

use plancheck_store::VerificationEntry;
use plancheck_types::{DataSource, Timestamp};

/// Facts about the most recent live verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatestVerification {
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub source: DataSource,
}

/// Everything the scorer and the status policy need, summed over the live
/// entries for a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvidenceSnapshot {
    pub count: u32,
    pub upvotes: u32,
    pub downvotes: u32,
    /// Live entries claiming the provider accepts the plan.
    pub accepts: u32,
    /// Live entries claiming it does not.
    pub rejects: u32,
    pub latest: Option<LatestVerification>,
}

impl EvidenceSnapshot {
    /// Aggregate the entries that are live at `now`; the rest are ignored.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a VerificationEntry>,
        now: Timestamp,
    ) -> Self {
        let mut snapshot = Self::default();
        let mut newest: Option<&VerificationEntry> = None;
        for entry in entries.into_iter().filter(|e| e.is_live(now)) {
            snapshot.count += 1;
            snapshot.upvotes = snapshot.upvotes.saturating_add(entry.upvotes);
            snapshot.downvotes = snapshot.downvotes.saturating_add(entry.downvotes);
            if entry.accepts_insurance {
                snapshot.accepts += 1;
            } else {
                snapshot.rejects += 1;
            }
            if newest.map_or(true, |n| (entry.created_at, entry.id) > (n.created_at, n.id)) {
                newest = Some(entry);
            }
        }
        snapshot.latest = newest.map(|e| LatestVerification {
            created_at: e.created_at,
            expires_at: e.expires_at,
            source: e.source,
        });
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
