//! Provenance tag attached to every verification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a verification's evidence came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// Government provider registry.
    OfficialRegistry,
    /// Network directory published by the insurance carrier.
    CarrierData,
    /// Confirmed directly by the provider's office.
    ProviderConfirmed,
    /// Anonymous or signed-in community member.
    CommunitySubmitted,
    /// Scraper or other automated import.
    Automated,
    Unknown,
}

impl DataSource {
    pub const ALL: [DataSource; 6] = [
        Self::OfficialRegistry,
        Self::CarrierData,
        Self::ProviderConfirmed,
        Self::CommunitySubmitted,
        Self::Automated,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfficialRegistry => "official-registry",
            Self::CarrierData => "carrier-data",
            Self::ProviderConfirmed => "provider-confirmed",
            Self::CommunitySubmitted => "community-submitted",
            Self::Automated => "automated",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a tag, accepting `_` or `-` separators in any case.
    /// Anything unrecognised is [`DataSource::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tag_is_lenient() {
        assert_eq!(DataSource::from_tag("CARRIER_DATA"), DataSource::CarrierData);
        assert_eq!(
            DataSource::from_tag(" community-submitted "),
            DataSource::CommunitySubmitted
        );
        assert_eq!(DataSource::from_tag("fax"), DataSource::Unknown);
    }

    #[test]
    fn serde_matches_as_str() {
        for source in DataSource::ALL {
            let json = serde_json::to_string(&source).expect("serialize");
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
    }
}
