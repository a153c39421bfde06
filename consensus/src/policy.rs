//! The status-change policy.

use crate::aggregate::EvidenceSnapshot;
use plancheck_types::{AcceptanceStatus, ConsensusParams};

/// Decides whether the displayed status may move, and where to.
#[derive(Clone, Debug)]
pub struct StatusPolicy {
    min_verifications: u32,
    min_confidence: u8,
}

impl StatusPolicy {
    pub fn new(params: &ConsensusParams) -> Self {
        Self {
            min_verifications: params.min_verifications_for_consensus,
            min_confidence: params.min_confidence_for_status_change,
        }
    }

    /// Enough corroboration and confidence to move the verdict.
    pub fn may_change(&self, evidence: &EvidenceSnapshot, score: u8) -> bool {
        evidence.count >= self.min_verifications && score >= self.min_confidence
    }

    /// The status to persist. Thin evidence keeps `previous`.
    pub fn next_status(
        &self,
        previous: AcceptanceStatus,
        evidence: &EvidenceSnapshot,
        score: u8,
    ) -> AcceptanceStatus {
        if self.may_change(evidence, score) {
            majority(evidence.accepts, evidence.rejects)
        } else {
            previous
        }
    }
}

/// Majority of accepts-insurance claims; a tie is pending.
pub fn majority(accepts: u32, rejects: u32) -> AcceptanceStatus {
    use std::cmp::Ordering;
    match accepts.cmp(&rejects) {
        Ordering::Greater => AcceptanceStatus::Accepted,
        Ordering::Less => AcceptanceStatus::NotAccepted,
        Ordering::Equal => AcceptanceStatus::Pending,
    }
}
