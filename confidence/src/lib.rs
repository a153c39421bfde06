//! Confidence scoring for acceptance records.
//!
//! Turns a snapshot of the evidence behind a (provider, plan) answer into a
//! 0–100 score, a qualitative level and a human-readable explanation. Pure
//! and infallible; the caller supplies the evaluation instant.
//!
//! The 100-point budget is split across four factors:
//!
//! | factor        | points | driven by |
//! |---------------|--------|-----------|
//! | source        | 0–25   | data-source tag of the latest verification |
//! | recency       | 0–30   | age of the latest verification, per specialty decay table |
//! | verifications | 0–25   | number of live verifications (flat past 3) |
//! | agreement     | 0–20   | share of upvotes among all votes |

pub mod factors;
pub mod level;
pub mod recency;
pub mod scorer;

pub use factors::FactorBreakdown;
pub use level::ConfidenceLevel;
pub use recency::{RecencyTable, RecencyTier};
pub use scorer::{ConfidenceInput, ConfidenceMetadata, ConfidenceScore, ConfidenceScorer};
