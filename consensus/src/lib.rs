//! Consensus: turns live verifications and votes into one acceptance record
//! per (provider, plan, location?) key.
//!
//! ## Module overview
//!
//! - [`aggregate`]: Sums the live verifications behind a key.
//! - [`policy`]: When the displayed status may change, and to what.
//! - [`engine`]: Recompute loop with optimistic, bounded-retry writes.
//! - [`error`]: Consensus error types.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod policy;

pub use aggregate::{EvidenceSnapshot, LatestVerification};
pub use engine::{ConfidenceExplanation, ConsensusEngine, Recomputed};
pub use error::ConsensusError;
pub use policy::{majority, StatusPolicy};
