use std::fmt;

/// Staleness bucket for a record, ordered from freshest to oldest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Urgency {
    Fresh1,
    Fresh2,
    Warm1,
    Warm2,
    Stale1,
    Stale2,
    Stale3,
    Stale4,
    Old1,
    Old2,
}

/// Exclusive upper bound, in seconds, of every bucket but the last.
const THRESHOLDS: [(i64, Urgency); 9] = [
    (60, Urgency::Fresh1),
    (120, Urgency::Fresh2),
    (300, Urgency::Warm1),
    (600, Urgency::Warm2),
    (900, Urgency::Stale1),
    (1200, Urgency::Stale2),
    (1800, Urgency::Stale3),
    (3600, Urgency::Stale4),
    (7200, Urgency::Old1),
];

impl Urgency {
    pub const ALL: [Urgency; 10] = [
        Urgency::Fresh1,
        Urgency::Fresh2,
        Urgency::Warm1,
        Urgency::Warm2,
        Urgency::Stale1,
        Urgency::Stale2,
        Urgency::Stale3,
        Urgency::Stale4,
        Urgency::Old1,
        Urgency::Old2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Fresh1 => "fresh-1",
            Urgency::Fresh2 => "fresh-2",
            Urgency::Warm1 => "warm-1",
            Urgency::Warm2 => "warm-2",
            Urgency::Stale1 => "stale-1",
            Urgency::Stale2 => "stale-2",
            Urgency::Stale3 => "stale-3",
            Urgency::Stale4 => "stale-4",
            Urgency::Old1 => "old-1",
            Urgency::Old2 => "old-2",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps seconds since arrival to a bucket. Negative input (clock skew) is fresh.
pub fn classify(elapsed_secs: i64) -> Urgency {
    THRESHOLDS
        .iter()
        .find(|(upper, _)| elapsed_secs < *upper)
        .map(|(_, level)| *level)
        .unwrap_or(Urgency::Old2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_match_documented_buckets() {
        let cases = [
            (0, Urgency::Fresh1),
            (59, Urgency::Fresh1),
            (60, Urgency::Fresh2),
            (119, Urgency::Fresh2),
            (120, Urgency::Warm1),
            (299, Urgency::Warm1),
            (300, Urgency::Warm2),
            (599, Urgency::Warm2),
            (600, Urgency::Stale1),
            (899, Urgency::Stale1),
            (900, Urgency::Stale2),
            (1199, Urgency::Stale2),
            (1200, Urgency::Stale3),
            (1799, Urgency::Stale3),
            (1800, Urgency::Stale4),
            (3599, Urgency::Stale4),
            (3600, Urgency::Old1),
            (7199, Urgency::Old1),
            (7200, Urgency::Old2),
            (i64::MAX, Urgency::Old2),
        ];
        for (elapsed, expected) in cases {
            assert_eq!(classify(elapsed), expected, "elapsed={elapsed}");
        }
    }

    #[test]
    fn negative_elapsed_is_fresh() {
        assert_eq!(classify(-5), Urgency::Fresh1);
        assert_eq!(classify(i64::MIN), Urgency::Fresh1);
    }

    #[test]
    fn classification_is_monotonic() {
        let mut previous = classify(0);
        for elapsed in 1..=8_000 {
            let current = classify(elapsed);
            assert!(current >= previous, "regressed at {elapsed}");
            previous = current;
        }
    }

    #[test]
    fn every_level_is_reachable_in_order() {
        let mut seen = Vec::new();
        for elapsed in 0..=8_000 {
            let level = classify(elapsed);
            if seen.last() != Some(&level) {
                seen.push(level);
            }
        }
        assert_eq!(seen, Urgency::ALL.to_vec());
    }
}
