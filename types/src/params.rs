//! Tunable parameters for the ledger and the consensus engine.
//!
//! Defaults are the production policy; every field can be overridden from
//! the node's TOML configuration.

use serde::{Deserialize, Serialize};

use crate::time::SECS_PER_DAY;

/// Minimum active verifications before the displayed status may change.
pub const MIN_VERIFICATIONS_FOR_CONSENSUS: u32 = 3;

/// Minimum confidence score before the displayed status may change.
pub const MIN_CONFIDENCE_FOR_STATUS_CHANGE: u8 = 60;

/// Anti-abuse de-duplication window.
pub const SUBMISSION_DEDUP_WINDOW_DAYS: u64 = 30;

/// Time-to-live of a verification (six months).
pub const VERIFICATION_TTL_DAYS: u64 = 180;

/// Parameters for the verification ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    /// Same origin + key + claim value is rejected within this many seconds.
    pub dedup_window_secs: u64,

    /// A verification stops contributing this many seconds after creation.
    pub verification_ttl_secs: u64,

    /// Longest accepted free-text note, in bytes.
    pub max_note_len: usize,

    /// Longest accepted evidence reference, in bytes.
    pub max_evidence_len: usize,

    /// Entries flipped per sweep batch.
    pub sweep_batch_size: usize,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            dedup_window_secs: SUBMISSION_DEDUP_WINDOW_DAYS * SECS_PER_DAY,
            verification_ttl_secs: VERIFICATION_TTL_DAYS * SECS_PER_DAY,
            max_note_len: 1000,
            max_evidence_len: 500,
            sweep_batch_size: 500,
        }
    }
}

/// Parameters for the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    pub min_verifications_for_consensus: u32,

    pub min_confidence_for_status_change: u8,

    /// Optimistic write attempts per recompute before surfacing a conflict.
    pub max_write_attempts: u32,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            min_verifications_for_consensus: MIN_VERIFICATIONS_FOR_CONSENSUS,
            min_confidence_for_status_change: MIN_CONFIDENCE_FOR_STATUS_CHANGE,
            max_write_attempts: 5,
        }
    }
}
