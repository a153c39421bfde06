//! Record types and abstract storage traits for plancheck.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Each trait method that changes more than one record is a single atomic
//! unit in every backend: a failed or rejected call leaves nothing behind.

pub mod acceptance;
pub mod directory;
pub mod error;
pub mod meta;
pub mod verification;
pub mod vote;

pub use acceptance::{AcceptanceRecord, AcceptanceStore};
pub use directory::{SpecialtyDirectory, StaticSpecialtyDirectory};
pub use error::StoreError;
pub use meta::MetaStore;
pub use verification::{VerificationEntry, VerificationStore};
pub use vote::{VoteRecord, VoteStore, VoteWrite};

/// Everything the verification ledger, vote aggregator and consensus engine
/// need from a backend.
pub trait PlanStore: VerificationStore + VoteStore + AcceptanceStore + Send + Sync {}

impl<T> PlanStore for T where T: VerificationStore + VoteStore + AcceptanceStore + Send + Sync {}
