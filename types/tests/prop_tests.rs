use proptest::prelude::*;

use plancheck_types::{AcceptanceKey, DataSource, SpecialtyCategory, Timestamp, SECS_PER_DAY};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta.to_be_bytes() <= tb.to_be_bytes(), a <= b);
    }

    /// days_since agrees with integer division of the elapsed seconds.
    #[test]
    fn days_since_matches_division(base in 0u64..1_000_000_000, offset in 0u64..100_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.days_since(now), offset / SECS_PER_DAY);
    }

    /// plus_days never moves a timestamp backwards, even near u64::MAX.
    #[test]
    fn plus_days_monotonic(base in 0u64..u64::MAX, days in 0u64..u64::MAX) {
        let t = Timestamp::new(base);
        prop_assert!(t.plus_days(days) >= t);
    }

    /// Distinct keys never share an encoding, and neither encoding prefixes the other.
    #[test]
    fn acceptance_key_encoding_is_prefix_free(
        p1 in "[a-z0-9]{1,12}",
        q1 in "[a-z0-9]{1,12}",
        l1 in proptest::option::of("[a-z0-9]{1,8}"),
        p2 in "[a-z0-9]{1,12}",
        q2 in "[a-z0-9]{1,12}",
        l2 in proptest::option::of("[a-z0-9]{1,8}"),
    ) {
        let mut a = AcceptanceKey::new(p1.as_str(), q1.as_str());
        if let Some(l) = &l1 {
            a = a.at(l.as_str());
        }
        let mut b = AcceptanceKey::new(p2.as_str(), q2.as_str());
        if let Some(l) = &l2 {
            b = b.at(l.as_str());
        }
        if a != b {
            let (ea, eb) = (a.to_bytes(), b.to_bytes());
            prop_assert_ne!(&ea, &eb);
            prop_assert!(!ea.starts_with(&eb));
            prop_assert!(!eb.starts_with(&ea));
        }
    }

    /// Lenient parsers never panic on arbitrary input.
    #[test]
    fn lenient_parsers_total(label in ".{0,40}") {
        let _ = SpecialtyCategory::from_label(&label).decay_profile();
        let _ = DataSource::from_tag(&label);
    }
}
