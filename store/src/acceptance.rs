//! Denormalized acceptance records and their storage trait.

use crate::StoreError;
use plancheck_types::{AcceptanceKey, AcceptanceStatus, DataSource, Timestamp};
use serde::{Deserialize, Serialize};

/// The single current answer for one (provider, plan, location?) key.
///
/// Score, count and timestamps are always recomputed from the live
/// verifications for the key. `status` is written only by the consensus
/// engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    pub key: AcceptanceKey,
    pub status: AcceptanceStatus,
    /// 0–100, derived.
    pub confidence: u8,
    /// Source of the most recent live verification.
    pub source: Option<DataSource>,
    pub last_verified_at: Option<Timestamp>,
    /// Number of live verifications that contributed.
    pub verification_count: u32,
    /// Vote totals across those verifications.
    pub upvotes: u32,
    pub downvotes: u32,
    /// Mirrors the expiry of the most recent verification.
    pub expires_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version; 0 means never persisted.
    pub version: u64,
}

impl AcceptanceRecord {
    /// A fresh, unpersisted record with no verdict.
    pub fn new(key: AcceptanceKey, now: Timestamp) -> Self {
        Self {
            key,
            status: AcceptanceStatus::Unknown,
            confidence: 0,
            source: None,
            last_verified_at: None,
            verification_count: 0,
            upvotes: 0,
            downvotes: 0,
            expires_at: None,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Past the expiry of its most recent verification.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// The status to show readers: stale records never display a verdict.
    pub fn display_status(&self, now: Timestamp) -> AcceptanceStatus {
        if self.is_stale(now) {
            AcceptanceStatus::Unknown
        } else {
            self.status
        }
    }

    /// Equal in everything except bookkeeping (`updated_at`, `version`).
    pub fn same_content(&self, other: &Self) -> bool {
        self.key == other.key
            && self.status == other.status
            && self.confidence == other.confidence
            && self.source == other.source
            && self.last_verified_at == other.last_verified_at
            && self.verification_count == other.verification_count
            && self.upvotes == other.upvotes
            && self.downvotes == other.downvotes
            && self.expires_at == other.expires_at
    }
}

/// Trait for acceptance record storage.
pub trait AcceptanceStore {
    fn get_acceptance(&self, key: &AcceptanceKey) -> Result<Option<AcceptanceRecord>, StoreError>;

    /// Compare-and-swap write.
    ///
    /// Stores `record` only if the persisted version equals `expected`
    /// (`None`: no record may exist yet); otherwise fails with
    /// [`StoreError::VersionConflict`]. The caller sets `record.version` to
    /// the new version.
    fn put_acceptance_if_version(
        &self,
        record: &AcceptanceRecord,
        expected: Option<u64>,
    ) -> Result<(), StoreError>;

    fn acceptance_count(&self) -> Result<u64, StoreError>;
}
