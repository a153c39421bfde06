//! Provider specialty categories and the recency-decay profile each maps to.
//!
//! Network participation churns at different rates by specialty: behavioral
//! health practices join and leave plans often, hospital-based providers
//! rarely. The mapping is a closed table so recency policy stays exhaustively
//! testable.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialtyCategory {
    MentalHealth,
    PrimaryCare,
    Specialist,
    HospitalBased,
    Other,
}

/// How fast trust in a verification decays with age.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecayProfile {
    FastChurn,
    Standard,
    SlowChurn,
}

impl SpecialtyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MentalHealth => "mental-health",
            Self::PrimaryCare => "primary-care",
            Self::Specialist => "specialist",
            Self::HospitalBased => "hospital-based",
            Self::Other => "other",
        }
    }

    /// Parse a free-form specialty label from reference data.
    ///
    /// Case, `_`/`-`/space separators and a handful of common aliases are
    /// accepted. Anything unrecognised falls back to [`SpecialtyCategory::Other`].
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "mental-health" | "behavioral-health" | "psychiatry" | "psychology" | "therapy" => {
                Self::MentalHealth
            }
            "primary-care" | "family-medicine" | "internal-medicine" | "pediatrics" => {
                Self::PrimaryCare
            }
            "specialist" | "specialty" => Self::Specialist,
            "hospital-based" | "hospital" | "hospitalist" | "anesthesiology" | "radiology"
            | "emergency-medicine" => Self::HospitalBased,
            _ => Self::Other,
        }
    }

    pub fn decay_profile(&self) -> DecayProfile {
        match self {
            Self::MentalHealth => DecayProfile::FastChurn,
            Self::PrimaryCare | Self::Specialist | Self::Other => DecayProfile::Standard,
            Self::HospitalBased => DecayProfile::SlowChurn,
        }
    }
}

impl fmt::Display for SpecialtyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DecayProfile {
    /// Profile for a provider whose specialty may be unknown.
    pub fn for_specialty(specialty: Option<SpecialtyCategory>) -> Self {
        specialty.map_or(Self::Standard, |s| s.decay_profile())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastChurn => "fast-churn",
            Self::Standard => "standard",
            Self::SlowChurn => "slow-churn",
        }
    }
}

impl fmt::Display for DecayProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
