//! Specialty-specific recency decay tables.
//!
//! Each table maps the age of the latest verification to one of
//! {30, 20, 10, 5, 0} points. All tables reach zero after 180 days, the
//! verification time-to-live.

use plancheck_types::DecayProfile;
use serde::Serialize;

/// Upper bound of recency points.
pub const RECENCY_MAX: u8 = 30;

/// Ages up to and including `max_days` earn `points`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecencyTier {
    pub max_days: u64,
    pub points: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecencyTable {
    pub profile: DecayProfile,
    /// Older than this, the answer is considered stale for the specialty.
    pub staleness_threshold_days: u64,
    pub tiers: &'static [RecencyTier],
}

const fn tier(max_days: u64, points: u8) -> RecencyTier {
    RecencyTier { max_days, points }
}

/// Mental health and other high-turnover networks.
pub const FAST_CHURN: RecencyTable = RecencyTable {
    profile: DecayProfile::FastChurn,
    staleness_threshold_days: 30,
    tiers: &[tier(15, 30), tier(30, 20), tier(60, 10), tier(180, 5)],
};

/// Primary care, specialists, and anything uncategorised.
pub const STANDARD: RecencyTable = RecencyTable {
    profile: DecayProfile::Standard,
    staleness_threshold_days: 60,
    tiers: &[tier(30, 30), tier(60, 20), tier(90, 10), tier(180, 5)],
};

/// Hospital-based providers, whose contracts rarely change.
pub const SLOW_CHURN: RecencyTable = RecencyTable {
    profile: DecayProfile::SlowChurn,
    staleness_threshold_days: 90,
    tiers: &[tier(45, 30), tier(90, 20), tier(135, 10), tier(180, 5)],
};

impl RecencyTable {
    pub fn for_profile(profile: DecayProfile) -> &'static RecencyTable {
        match profile {
            DecayProfile::FastChurn => &FAST_CHURN,
            DecayProfile::Standard => &STANDARD,
            DecayProfile::SlowChurn => &SLOW_CHURN,
        }
    }

    /// Points for a verification `days` old; no verification scores 0.
    pub fn points(&self, days: Option<u64>) -> u8 {
        let Some(days) = days else {
            return 0;
        };
        self.tiers
            .iter()
            .find(|t| days <= t.max_days)
            .map_or(0, |t| t.points)
    }

    pub fn is_stale(&self, days: Option<u64>) -> bool {
        days.map_or(true, |d| d > self.staleness_threshold_days)
    }

    /// Within the last fifth of the freshness window, or already past it.
    pub fn nearing_staleness(&self, days: Option<u64>) -> bool {
        days.map_or(true, |d| d * 5 >= self.staleness_threshold_days * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: [DecayProfile; 3] = [
        DecayProfile::FastChurn,
        DecayProfile::Standard,
        DecayProfile::SlowChurn,
    ];

    #[test]
    fn tiers_only_use_allowed_points() {
        for profile in PROFILES {
            let table = RecencyTable::for_profile(profile);
            for t in table.tiers {
                assert!([30, 20, 10, 5].contains(&t.points));
            }
            assert!(table.tiers.windows(2).all(|w| w[0].max_days < w[1].max_days));
            assert!(table.tiers.windows(2).all(|w| w[0].points > w[1].points));
        }
    }

    #[test]
    fn standard_table_boundaries() {
        let t = RecencyTable::for_profile(DecayProfile::Standard);
        assert_eq!(t.points(Some(0)), 30);
        assert_eq!(t.points(Some(30)), 30);
        assert_eq!(t.points(Some(31)), 20);
        assert_eq!(t.points(Some(60)), 20);
        assert_eq!(t.points(Some(90)), 10);
        assert_eq!(t.points(Some(180)), 5);
        assert_eq!(t.points(Some(181)), 0);
    }

    #[test]
    fn fast_churn_decays_sooner_than_slow_churn() {
        let fast = RecencyTable::for_profile(DecayProfile::FastChurn);
        let slow = RecencyTable::for_profile(DecayProfile::SlowChurn);
        assert_eq!(fast.points(Some(40)), 10);
        assert_eq!(slow.points(Some(40)), 30);
    }

    #[test]
    fn no_verification_scores_zero_and_is_stale() {
        for profile in PROFILES {
            let table = RecencyTable::for_profile(profile);
            assert_eq!(table.points(None), 0);
            assert!(table.is_stale(None));
        }
    }

    #[test]
    fn two_hundred_days_is_zero_everywhere() {
        for profile in PROFILES {
            let table = RecencyTable::for_profile(profile);
            assert_eq!(table.points(Some(200)), 0);
            assert!(table.is_stale(Some(200)));
        }
    }

    #[test]
    fn nearing_staleness_starts_at_eighty_percent() {
        let t = RecencyTable::for_profile(DecayProfile::Standard);
        assert!(!t.nearing_staleness(Some(47)));
        assert!(t.nearing_staleness(Some(48)));
    }
}
