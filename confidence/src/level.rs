use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse confidence bands shown to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            91.. => Self::VeryHigh,
            76..=90 => Self::High,
            51..=75 => Self::Medium,
            26..=50 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    /// Thinly corroborated answers never display above Medium.
    pub fn capped(self, verification_count: u32) -> Self {
        if verification_count < crate::factors::FULL_CORROBORATION {
            self.min(Self::Medium)
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
