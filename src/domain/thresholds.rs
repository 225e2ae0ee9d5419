use crate::domain::{ClassifyError, ThemeError};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire value of [`Thresholds::Detect`].
pub const DETECT_SENTINEL: &str = "<to_be_detected>";

/// Inclusive contribution count range for one bucket.
///
/// A range with `min > max` is unobserved: detection found no day in that
/// color, so it never matches a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct ThresholdRange {
    pub min: u32,
    pub max: u32,
}

impl ThresholdRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn unobserved() -> Self {
        Self {
            min: u32::MAX,
            max: 0,
        }
    }

    pub fn is_unobserved(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, count: u32) -> bool {
        self.min <= count && count <= self.max
    }
}

impl From<(u32, u32)> for ThresholdRange {
    fn from((min, max): (u32, u32)) -> Self {
        Self { min, max }
    }
}

impl From<ThresholdRange> for (u32, u32) {
    fn from(range: ThresholdRange) -> Self {
        (range.min, range.max)
    }
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unobserved() {
            write!(f, "[unobserved]")
        } else if self.max == u32::MAX {
            write!(f, "[{}+]", self.min)
        } else {
            write!(f, "[{}..={}]", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thresholds {
    /// Must be computed from the live calendar before use.
    Detect,
    Ranges(Vec<ThresholdRange>),
}

impl Thresholds {
    /// Build a resolved threshold list, checking that observed ranges are
    /// well formed, increasing and non-overlapping.
    pub fn ranges(ranges: Vec<ThresholdRange>) -> Result<Self, ThemeError> {
        if ranges.is_empty() {
            return Err(ThemeError::InvalidThresholds("no ranges given".to_string()));
        }

        let mut previous: Option<ThresholdRange> = None;
        for range in ranges.iter().filter(|r| !r.is_unobserved()) {
            if let Some(prev) = previous {
                if range.min <= prev.max {
                    return Err(ThemeError::InvalidThresholds(format!(
                        "{} overlaps or precedes {}",
                        range, prev
                    )));
                }
            }
            previous = Some(*range);
        }

        if previous.is_none() {
            return Err(ThemeError::InvalidThresholds(
                "every range is unobserved".to_string(),
            ));
        }

        Ok(Thresholds::Ranges(ranges))
    }

    /// Convert the old "lower bound per bucket" format, e.g. `[10, 8, 5, 3, 0]`,
    /// into inclusive ranges ordered from the lowest bucket up.
    pub fn from_lower_bounds(bounds: &[u32]) -> Result<Self, ThemeError> {
        let mut bounds = bounds.to_vec();
        bounds.sort_unstable();
        bounds.dedup();

        let ranges = bounds
            .iter()
            .enumerate()
            .map(|(i, &min)| {
                let max = bounds.get(i + 1).map_or(u32::MAX, |next| next - 1);
                ThresholdRange::new(min, max)
            })
            .collect();

        Self::ranges(ranges)
    }

    pub fn is_detect(&self) -> bool {
        matches!(self, Thresholds::Detect)
    }

    pub fn as_ranges(&self) -> Option<&[ThresholdRange]> {
        match self {
            Thresholds::Detect => None,
            Thresholds::Ranges(ranges) => Some(ranges),
        }
    }

    /// Number of buckets, if resolved.
    pub fn bucket_count(&self) -> Option<usize> {
        self.as_ranges().map(<[ThresholdRange]>::len)
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thresholds::Detect => write!(f, "{}", DETECT_SENTINEL),
            Thresholds::Ranges(ranges) => {
                let parts: Vec<String> = ranges.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl Serialize for Thresholds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Thresholds::Detect => serializer.serialize_str(DETECT_SENTINEL),
            Thresholds::Ranges(ranges) => ranges.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThresholds {
    Sentinel(String),
    Ranges(Vec<ThresholdRange>),
}

impl<'de> Deserialize<'de> for Thresholds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawThresholds::deserialize(deserializer)? {
            RawThresholds::Sentinel(s) if s == DETECT_SENTINEL => Ok(Thresholds::Detect),
            RawThresholds::Sentinel(s) => Err(de::Error::custom(format!(
                "unknown thresholds sentinel {:?}",
                s
            ))),
            RawThresholds::Ranges(ranges) => Thresholds::ranges(ranges).map_err(de::Error::custom),
        }
    }
}

/// Map a contribution count to its bucket index.
///
/// A count outside every range is rendered in bucket 0 rather than failing the
/// whole calendar.
pub fn classify(count: u32, thresholds: &Thresholds) -> Result<usize, ClassifyError> {
    let ranges = thresholds.as_ranges().ok_or(ClassifyError::NotReady)?;

    match ranges.iter().position(|range| range.contains(count)) {
        Some(bucket) => Ok(bucket),
        None => {
            log::warn!(
                "contribution count {} matches no threshold in {}; using bucket 0",
                count,
                thresholds
            );
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn github_like() -> Thresholds {
        Thresholds::ranges(vec![
            ThresholdRange::new(0, 0),
            ThresholdRange::new(1, 5),
            ThresholdRange::new(6, 10),
            ThresholdRange::new(11, 999_999),
        ])
        .unwrap()
    }

    #[test]
    fn test_classify_picks_first_matching_range() {
        assert_eq!(classify(7, &github_like()), Ok(2));
        assert_eq!(classify(0, &github_like()), Ok(0));
        assert_eq!(classify(11, &github_like()), Ok(3));
    }

    #[test]
    fn test_classify_degrades_to_lowest_bucket() {
        assert_eq!(classify(1_000_000, &github_like()), Ok(0));
    }

    #[test]
    fn test_classify_requires_resolved_thresholds() {
        assert_eq!(classify(3, &Thresholds::Detect), Err(ClassifyError::NotReady));
    }

    #[test]
    fn test_unobserved_ranges_never_match() {
        let thresholds = Thresholds::ranges(vec![
            ThresholdRange::new(0, 0),
            ThresholdRange::unobserved(),
            ThresholdRange::new(1, 4),
        ])
        .unwrap();

        assert_eq!(classify(2, &thresholds), Ok(2));
    }

    #[test]
    fn test_overlapping_ranges_are_rejected() {
        let err = Thresholds::ranges(vec![ThresholdRange::new(0, 5), ThresholdRange::new(5, 9)]);
        assert!(matches!(err, Err(ThemeError::InvalidThresholds(_))));

        assert!(Thresholds::ranges(vec![]).is_err());
        assert!(Thresholds::ranges(vec![ThresholdRange::new(3, 1)]).is_err());
    }

    #[test]
    fn test_lower_bounds_conversion() {
        let thresholds = Thresholds::from_lower_bounds(&[10, 8, 5, 3, 0]).unwrap();
        assert_eq!(
            thresholds.as_ranges().unwrap(),
            &[
                ThresholdRange::new(0, 2),
                ThresholdRange::new(3, 4),
                ThresholdRange::new(5, 7),
                ThresholdRange::new(8, 9),
                ThresholdRange::new(10, u32::MAX),
            ]
        );
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(github_like()).unwrap();
        assert_eq!(json, serde_json::json!([[0, 0], [1, 5], [6, 10], [11, 999_999]]));

        let detect = serde_json::to_value(Thresholds::Detect).unwrap();
        assert_eq!(detect, serde_json::json!("<to_be_detected>"));

        let parsed: Thresholds = serde_json::from_value(detect).unwrap();
        assert!(parsed.is_detect());

        assert!(serde_json::from_value::<Thresholds>(serde_json::json!("auto")).is_err());
        assert!(serde_json::from_value::<Thresholds>(serde_json::json!([[5, 1]])).is_err());
    }

    fn sorted_ranges() -> impl Strategy<Value = Vec<ThresholdRange>> {
        prop::collection::vec(1u32..50, 1..8).prop_map(|widths| {
            let mut min = 0;
            widths
                .into_iter()
                .map(|width| {
                    let range = ThresholdRange::new(min, min + width - 1);
                    min += width;
                    range
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            max_global_rejects: 65536,
            ..ProptestConfig::default()
        })]
        #[test]
        fn prop_classification_is_monotonic(
            ranges in sorted_ranges(),
            a in 0u32..400,
            b in 0u32..400,
        ) {
            let top = ranges.last().unwrap().max;
            prop_assume!(a <= top && b <= top);

            let thresholds = Thresholds::ranges(ranges).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

            prop_assert!(classify(hi, &thresholds).unwrap() >= classify(lo, &thresholds).unwrap());
        }
    }
}
