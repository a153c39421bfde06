//! Fundamental types for plancheck.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! provider/plan/location keys, origin fingerprints, verification ids, timestamps,
//! data-source and specialty tags, status enums, and tunable parameters.

pub mod hash;
pub mod keys;
pub mod params;
pub mod source;
pub mod specialty;
pub mod state;
pub mod time;

pub use hash::VerificationId;
pub use keys::{AcceptanceKey, Fingerprint, LocationKey, PlanKey, ProviderKey};
pub use params::{ConsensusParams, LedgerParams};
pub use source::DataSource;
pub use specialty::{DecayProfile, SpecialtyCategory};
pub use state::{AcceptanceStatus, VerificationStatus, VoteDirection};
pub use time::{Clock, SystemClock, Timestamp, SECS_PER_DAY};
