//! Incoming claims and their shape validation.

use crate::error::VerificationError;
use plancheck_types::{AcceptanceKey, DataSource, Fingerprint, LedgerParams};
use serde::{Deserialize, Serialize};

/// A user's assertion about one (provider, plan, location?) key, as it
/// arrives from the route layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub key: AcceptanceKey,
    /// Required. Optional here only so a missing value is a validation
    /// error rather than a decoding one.
    pub accepts_insurance: Option<bool>,
    #[serde(default)]
    pub accepts_new_patients: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub evidence_ref: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
    pub origin: Fingerprint,
    #[serde(default = "default_source")]
    pub source: DataSource,
}

fn default_source() -> DataSource {
    DataSource::CommunitySubmitted
}

impl Claim {
    /// A community claim with only the required fields set.
    pub fn new(key: AcceptanceKey, accepts_insurance: bool, origin: Fingerprint) -> Self {
        Self {
            key,
            accepts_insurance: Some(accepts_insurance),
            accepts_new_patients: None,
            note: None,
            evidence_ref: None,
            submitted_by: None,
            origin,
            source: default_source(),
        }
    }

    /// Check the claim's shape. Returns the accepts-insurance value.
    pub fn validate(&self, params: &LedgerParams) -> Result<bool, VerificationError> {
        if !self.key.provider.is_valid() {
            return Err(invalid("provider key is missing or malformed"));
        }
        if !self.key.plan.is_valid() {
            return Err(invalid("plan key is missing or malformed"));
        }
        if !self.key.is_valid() {
            return Err(invalid("location key is malformed"));
        }
        if !self.origin.is_valid() {
            return Err(invalid("origin fingerprint is missing"));
        }
        let Some(accepts) = self.accepts_insurance else {
            return Err(invalid("accepts-insurance value is missing"));
        };
        if self.note.as_ref().is_some_and(|n| n.len() > params.max_note_len) {
            return Err(VerificationError::Validation(format!(
                "note exceeds {} bytes",
                params.max_note_len
            )));
        }
        if self
            .evidence_ref
            .as_ref()
            .is_some_and(|e| e.len() > params.max_evidence_len)
        {
            return Err(VerificationError::Validation(format!(
                "evidence reference exceeds {} bytes",
                params.max_evidence_len
            )));
        }
        Ok(accepts)
    }
}

fn invalid(reason: &str) -> VerificationError {
    VerificationError::Validation(reason.to_string())
}
