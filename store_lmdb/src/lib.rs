//! LMDB storage backend for plancheck.
//!
//! Implements all storage traits from `plancheck-store` using the `heed` LMDB
//! bindings. Every logical store maps to one or more LMDB databases within a
//! single environment; values are `bincode`-encoded.

pub mod acceptance;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod verification;
pub mod vote;

pub use environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
pub use integrity::{check_data_dir, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
