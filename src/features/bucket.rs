//! Categorize-by-threshold bucketing
//!
//! Maps a continuous value onto one of a fixed, ordered set of labels. The cut
//! points partition the real line into `(-inf, c1], (c1, c2], ..., (cn, +inf)`,
//! so every finite or infinite input lands in exactly one bucket and later
//! buckets always hold larger inputs.
//!
//! Each model keeps its own rule, frozen to the data it was trained on. The two
//! recency rules below differ in both the sentinel and the cut point.

use crate::{FormcastError, Result};
use serde::{Deserialize, Serialize};

pub const NEVER: &str = "never";
pub const RECENT: &str = "recent";
pub const OLD: &str = "old";

/// Upper bound (inclusive) of one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub upper: f64,
    pub label: String,
}

#[derive(Deserialize)]
struct RawBucketRule {
    cuts: Vec<Cut>,
    overflow: String,
}

/// Ordered cut points plus the label for everything above the last cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBucketRule")]
pub struct BucketRule {
    cuts: Vec<Cut>,
    overflow: String,
}

impl TryFrom<RawBucketRule> for BucketRule {
    type Error = FormcastError;

    fn try_from(raw: RawBucketRule) -> Result<Self> {
        BucketRule::new(raw.cuts, raw.overflow)
    }
}

impl BucketRule {
    /// Create a rule. Cut points must be finite and strictly increasing, and
    /// every label must be distinct.
    pub fn new(cuts: Vec<Cut>, overflow: impl Into<String>) -> Result<Self> {
        let overflow = overflow.into();

        for cut in &cuts {
            if !cut.upper.is_finite() {
                return Err(FormcastError::Config(format!(
                    "bucket {:?} has a non-finite upper bound",
                    cut.label
                )));
            }
        }
        for pair in cuts.windows(2) {
            if pair[1].upper <= pair[0].upper {
                return Err(FormcastError::Config(format!(
                    "bucket cut points must increase: {} then {}",
                    pair[0].upper, pair[1].upper
                )));
            }
        }

        let rule = BucketRule { cuts, overflow };
        let labels: Vec<&str> = rule.labels().collect();
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(FormcastError::Config(format!(
                    "bucket label {:?} appears more than once",
                    label
                )));
            }
        }
        Ok(rule)
    }

    /// Build from `(upper, label)` pairs
    pub fn from_cuts(cuts: &[(f64, &str)], overflow: &str) -> Result<Self> {
        let cuts = cuts
            .iter()
            .map(|&(upper, label)| Cut {
                upper,
                label: label.to_string(),
            })
            .collect();
        Self::new(cuts, overflow)
    }

    /// `-1` means never contacted, up to 100 days is recent, beyond is old
    pub fn recency_sentinel_minus_one() -> Self {
        BucketRule {
            cuts: vec![
                Cut {
                    upper: -1.0,
                    label: NEVER.to_string(),
                },
                Cut {
                    upper: 100.0,
                    label: RECENT.to_string(),
                },
            ],
            overflow: OLD.to_string(),
        }
    }

    /// Up to 5 days is recent, `999` (and above) means never contacted
    pub fn recency_sentinel_999() -> Self {
        BucketRule {
            cuts: vec![
                Cut {
                    upper: 5.0,
                    label: RECENT.to_string(),
                },
                Cut {
                    upper: 998.0,
                    label: OLD.to_string(),
                },
            ],
            overflow: NEVER.to_string(),
        }
    }

    /// Named rules available to profiles and the command line
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "recency-sentinel-minus-one" => Some(Self::recency_sentinel_minus_one()),
            "recency-sentinel-999" => Some(Self::recency_sentinel_999()),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["recency-sentinel-minus-one", "recency-sentinel-999"]
    }

    /// Label for a value; `None` only for NaN
    pub fn bucketize(&self, value: f64) -> Option<&str> {
        if value.is_nan() {
            return None;
        }
        let label = self
            .cuts
            .iter()
            .find(|cut| value <= cut.upper)
            .map(|cut| cut.label.as_str())
            .unwrap_or(self.overflow.as_str());
        Some(label)
    }

    /// Labels in rank order
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.cuts
            .iter()
            .map(|cut| cut.label.as_str())
            .chain(std::iter::once(self.overflow.as_str()))
    }

    /// Rank of a label (0 = lowest bucket)
    pub fn rank(&self, label: &str) -> Option<usize> {
        self.labels().position(|l| l == label)
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn overflow(&self) -> &str {
        &self.overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minus_one_rule_examples() {
        let rule = BucketRule::recency_sentinel_minus_one();
        assert_eq!(rule.bucketize(-1.0), Some(NEVER));
        assert_eq!(rule.bucketize(0.0), Some(RECENT));
        assert_eq!(rule.bucketize(100.0), Some(RECENT));
        assert_eq!(rule.bucketize(101.0), Some(OLD));
    }

    #[test]
    fn test_999_rule_examples() {
        let rule = BucketRule::recency_sentinel_999();
        assert_eq!(rule.bucketize(0.0), Some(RECENT));
        assert_eq!(rule.bucketize(5.0), Some(RECENT));
        assert_eq!(rule.bucketize(6.0), Some(OLD));
        assert_eq!(rule.bucketize(998.0), Some(OLD));
        assert_eq!(rule.bucketize(999.0), Some(NEVER));
    }

    #[test]
    fn test_rules_are_total_and_monotonic() {
        for rule in [
            BucketRule::recency_sentinel_minus_one(),
            BucketRule::recency_sentinel_999(),
        ] {
            let mut last_rank = 0;
            for value in -1_100..=1_100 {
                let label = rule.bucketize(value as f64).unwrap();
                let rank = rule.rank(label).unwrap();
                assert!(rank >= last_rank, "rank dropped at {}", value);
                last_rank = rank;
            }
            assert!(rule.bucketize(f64::NEG_INFINITY).is_some());
            assert!(rule.bucketize(f64::INFINITY).is_some());
            assert_eq!(rule.bucketize(f64::NAN), None);
        }
    }

    #[test]
    fn test_new_rejects_unordered_cuts() {
        let result = BucketRule::from_cuts(&[(10.0, "low"), (5.0, "mid")], "high");
        assert!(matches!(result, Err(FormcastError::Config(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_labels() {
        let result = BucketRule::from_cuts(&[(10.0, "low")], "low");
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let rule: BucketRule = serde_json::from_str(
            r#"{"cuts": [{"upper": -1, "label": "never"}, {"upper": 100, "label": "recent"}], "overflow": "old"}"#,
        )
        .unwrap();
        assert_eq!(rule, BucketRule::recency_sentinel_minus_one());

        let bad = serde_json::from_str::<BucketRule>(
            r#"{"cuts": [{"upper": 5, "label": "a"}, {"upper": 5, "label": "b"}], "overflow": "c"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_builtin_lookup() {
        for name in BucketRule::builtin_names() {
            assert!(BucketRule::builtin(name).is_some());
        }
        assert!(BucketRule::builtin("weekly").is_none());
    }
}
