//! Verification ledger and vote aggregation.
//!
//! - **Ledger**: append-only user claims about whether a provider accepts a
//!   plan. One origin may not repeat the same claim for the same key within
//!   the anti-abuse window; every entry expires after its time-to-live and
//!   is flipped to `expired` by an incremental sweep.
//! - **Votes**: one up/down vote per (verification, voter). The entry's
//!   counters and the vote records are written together, so the counters
//!   always equal the tally of records.
//!
//! Every successful mutation returns a [`DirtyKey`] naming the acceptance
//! record that must be recomputed.

pub mod claim;
pub mod error;
pub mod events;
pub mod ledger;
pub mod voting;

pub use claim::Claim;
pub use error::VerificationError;
pub use events::{DirtyCause, DirtyKey};
pub use ledger::{Submission, SweepReport, VerificationLedger};
pub use voting::{CounterAudit, VoteAggregator, VoteOutcome, VoteResult};
