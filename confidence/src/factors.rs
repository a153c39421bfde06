//! The four scoring factors and their human-readable reasons.

use plancheck_types::DataSource;
use serde::Serialize;

pub const SOURCE_MAX: u8 = 25;
pub const VERIFICATIONS_MAX: u8 = 25;
pub const AGREEMENT_MAX: u8 = 20;

/// Independent reports needed for full corroboration credit.
pub const FULL_CORROBORATION: u32 = 3;

/// Points contributed by each factor. Sums to the total score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FactorBreakdown {
    pub source: u8,
    pub recency: u8,
    pub verifications: u8,
    pub agreement: u8,
}

impl FactorBreakdown {
    pub fn total(&self) -> u8 {
        self.source + self.recency + self.verifications + self.agreement
    }
}

/// Trust in the provenance of the data.
pub fn source_points(source: DataSource) -> u8 {
    match source {
        DataSource::OfficialRegistry => 25,
        DataSource::CarrierData => 20,
        DataSource::ProviderConfirmed => 20,
        DataSource::CommunitySubmitted => 15,
        DataSource::Automated => 10,
        DataSource::Unknown => 10,
    }
}

/// Flat credit for independent reports; nothing extra past three.
pub fn verification_points(count: u32) -> u8 {
    match count {
        0 => 0,
        1 => 10,
        2 => 15,
        _ => VERIFICATIONS_MAX,
    }
}

/// Bucketed upvote share. No votes at all earns nothing.
pub fn agreement_points(upvotes: u32, downvotes: u32) -> u8 {
    let up = u64::from(upvotes);
    let total = up + u64::from(downvotes);
    if total == 0 {
        return 0;
    }
    if up == total {
        AGREEMENT_MAX
    } else if up * 5 >= total * 4 {
        15
    } else if up * 5 >= total * 3 {
        10
    } else if up * 5 >= total * 2 {
        5
    } else {
        0
    }
}

pub(crate) fn source_reason(source: DataSource) -> &'static str {
    match source {
        DataSource::OfficialRegistry => "Listed in an official provider registry.",
        DataSource::CarrierData => "Reported in the insurance carrier's network directory.",
        DataSource::ProviderConfirmed => "Confirmed directly by the provider's office.",
        DataSource::CommunitySubmitted => "Reported by community members.",
        DataSource::Automated => "Collected by an automated import.",
        DataSource::Unknown => "The origin of this data is not known.",
    }
}

pub(crate) fn recency_reason(days: u64) -> String {
    match days {
        0 => "Verified today.".to_string(),
        1 => "Last verified 1 day ago.".to_string(),
        n => format!("Last verified {n} days ago."),
    }
}

pub(crate) fn verification_reason(count: u32) -> String {
    match count {
        1 => "Based on 1 verification.".to_string(),
        n if n >= FULL_CORROBORATION => {
            format!("Confirmed by {n} independent verifications.")
        }
        n => format!("Based on {n} verifications."),
    }
}

pub(crate) fn agreement_reason(upvotes: u32, downvotes: u32) -> String {
    let total = u64::from(upvotes) + u64::from(downvotes);
    let pct = u64::from(upvotes) * 100 / total.max(1);
    let noun = if total == 1 { "vote" } else { "votes" };
    format!("{pct}% of {total} {noun} agree.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_defaults_to_ten() {
        assert_eq!(source_points(DataSource::Unknown), 10);
        assert_eq!(source_points(DataSource::from_tag("bogus")), 10);
    }

    #[test]
    fn source_points_within_budget() {
        for source in DataSource::ALL {
            assert!(source_points(source) <= SOURCE_MAX);
        }
    }

    #[test]
    fn verification_points_are_flat_past_three() {
        assert_eq!(verification_points(0), 0);
        assert_eq!(verification_points(1), 10);
        assert_eq!(verification_points(2), 15);
        assert_eq!(verification_points(3), 25);
        assert_eq!(verification_points(300), 25);
    }

    #[test]
    fn agreement_buckets() {
        assert_eq!(agreement_points(0, 0), 0);
        assert_eq!(agreement_points(3, 0), 20);
        assert_eq!(agreement_points(4, 1), 15);
        assert_eq!(agreement_points(3, 2), 10);
        assert_eq!(agreement_points(2, 3), 5);
        assert_eq!(agreement_points(1, 4), 0);
        assert_eq!(agreement_points(0, 5), 0);
    }

    #[test]
    fn agreement_survives_counter_extremes() {
        assert_eq!(agreement_points(u32::MAX, 0), 20);
        assert_eq!(agreement_points(u32::MAX, u32::MAX), 5);
    }

    #[test]
    fn reasons_read_naturally() {
        assert_eq!(recency_reason(0), "Verified today.");
        assert_eq!(recency_reason(12), "Last verified 12 days ago.");
        assert_eq!(verification_reason(1), "Based on 1 verification.");
        assert_eq!(verification_reason(4), "Confirmed by 4 independent verifications.");
        assert_eq!(agreement_reason(3, 1), "75% of 4 votes agree.");
        assert_eq!(agreement_reason(1, 0), "100% of 1 vote agree.");
    }
}
