//! plancheck service: wires the verification ledger, vote aggregation and
//! the consensus engine into one facade.
//!
//! The service:
//! - Accepts claims and votes, recomputing the affected acceptance record
//!   before returning
//! - Serves acceptance records and confidence explanations
//! - Sweeps expired verifications on a schedule
//!
//! Configuration is loaded from TOML ([`NodeConfig`]); logging goes through
//! `tracing` ([`init_logging`]).

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod shutdown;
pub mod sweeper;

pub use config::NodeConfig;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
pub use service::{AcceptanceService, Submitted, SweepSummary, Voted};
pub use shutdown::ShutdownController;
pub use sweeper::Sweeper;
