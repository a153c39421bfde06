//! The confidence scorer.

use crate::factors::{self, FactorBreakdown};
use crate::level::ConfidenceLevel;
use crate::recency::RecencyTable;
use plancheck_types::{DataSource, DecayProfile, SpecialtyCategory, Timestamp};
use serde::Serialize;

/// Aggregated evidence for one acceptance key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfidenceInput {
    /// Source of the most recent live verification, if any.
    pub source: Option<DataSource>,
    pub last_verified_at: Option<Timestamp>,
    pub verification_count: u32,
    pub upvotes: u32,
    pub downvotes: u32,
    /// Selects the recency decay table only.
    pub specialty: Option<SpecialtyCategory>,
    /// The instant the score is evaluated at.
    pub as_of: Timestamp,
}

impl ConfidenceInput {
    /// Whole days between the latest verification and `as_of`.
    pub fn days_since_verification(&self) -> Option<u64> {
        self.last_verified_at.map(|t| t.days_since(self.as_of))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfidenceMetadata {
    pub days_since_verification: Option<u64>,
    pub decay_profile: DecayProfile,
    pub staleness_threshold_days: u64,
    pub is_stale: bool,
    pub recommend_reverification: bool,
    /// The level was lowered because of thin corroboration.
    pub level_capped: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfidenceScore {
    /// Raw 0–100 total. Never capped, even when `level` is.
    pub score: u8,
    pub level: ConfidenceLevel,
    pub factors: FactorBreakdown,
    pub explanation: String,
    pub metadata: ConfidenceMetadata,
}

/// Stateless scorer. Deterministic for a given input.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, input: &ConfidenceInput) -> ConfidenceScore {
        let source = input.source.unwrap_or(DataSource::Unknown);
        let profile = DecayProfile::for_specialty(input.specialty);
        let table = RecencyTable::for_profile(profile);
        let days = input.days_since_verification();

        let breakdown = FactorBreakdown {
            source: factors::source_points(source),
            recency: table.points(days),
            verifications: factors::verification_points(input.verification_count),
            agreement: factors::agreement_points(input.upvotes, input.downvotes),
        };
        let score = breakdown.total();

        let raw_level = ConfidenceLevel::from_score(score);
        let level = raw_level.capped(input.verification_count);

        let is_stale = table.is_stale(days);
        let recommend_reverification = is_stale
            || table.nearing_staleness(days)
            || input.downvotes > input.upvotes;

        ConfidenceScore {
            score,
            level,
            factors: breakdown,
            explanation: explain(&breakdown, source, days, input),
            metadata: ConfidenceMetadata {
                days_since_verification: days,
                decay_profile: profile,
                staleness_threshold_days: table.staleness_threshold_days,
                is_stale,
                recommend_reverification,
                level_capped: level != raw_level,
            },
        }
    }
}

fn explain(
    breakdown: &FactorBreakdown,
    source: DataSource,
    days: Option<u64>,
    input: &ConfidenceInput,
) -> String {
    let mut reasons: Vec<String> = Vec::with_capacity(4);
    if breakdown.source > 0 {
        reasons.push(factors::source_reason(source).to_string());
    }
    if breakdown.recency > 0 {
        if let Some(days) = days {
            reasons.push(factors::recency_reason(days));
        }
    }
    if breakdown.verifications > 0 {
        reasons.push(factors::verification_reason(input.verification_count));
    }
    if breakdown.agreement > 0 {
        reasons.push(factors::agreement_reason(input.upvotes, input.downvotes));
    }
    reasons.join(" ")
}
