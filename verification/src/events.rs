//! Dirty-key events emitted by ledger and vote mutations.
//!
//! Every successful mutation hands back the acceptance key whose aggregate
//! is now out of date. The caller feeds it to the consensus engine.

use plancheck_types::AcceptanceKey;
use serde::Serialize;
use std::fmt;

/// What made a key dirty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirtyCause {
    Submission,
    Vote,
    Expiry,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DirtyKey {
    pub key: AcceptanceKey,
    pub cause: DirtyCause,
}

impl DirtyKey {
    pub fn new(key: AcceptanceKey, cause: DirtyCause) -> Self {
        Self { key, cause }
    }
}

impl fmt::Display for DirtyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.key, self.cause)
    }
}
