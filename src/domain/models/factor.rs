//! Results of the factor variance analysis.

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;

/// How strongly a dimension moves the outcome measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

impl ImpactTier {
    /// Tier for a variance given the `(high, medium)` cutoffs.
    pub fn classify(variance: f64, high: f64, medium: f64) -> Self {
        if variance > high {
            Self::High
        } else if variance > medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// How consistent a value's outcomes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReliabilityTier {
    High,
    Medium,
    Low,
}

impl ReliabilityTier {
    /// Lower dispersion means higher reliability.
    pub fn classify(std_dev: f64, high_below: f64, medium_below: f64) -> Self {
        if std_dev < high_below {
            Self::High
        } else if std_dev < medium_below {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One row of the importance ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorImportance {
    pub dimension: Dimension,
    /// Population variance of the per-value means.
    pub variance: f64,
    /// Share of the summed variance across the requested dimensions.
    pub percent_explained: f64,
    pub impact: ImpactTier,
    /// Distinct values that contributed a group mean.
    pub values: usize,
    pub samples: usize,
}

/// Per-value aggregate for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorAggregate {
    pub dimension: Dimension,
    pub value: String,
    pub uses: usize,
    /// Mean of the configured primary outcome measure.
    pub avg_outcome: f64,
    pub avg_impressions: f64,
    pub avg_engagement_rate: f64,
    pub avg_likes: f64,
    pub avg_followers_gained: f64,
    pub distinct_topics: usize,
    pub distinct_formats: usize,
    pub distinct_tones: usize,
    pub distinct_generators: usize,
    /// Standard deviation of the primary measure ("consistency").
    pub std_dev: f64,
    pub reliability: ReliabilityTier,
}

/// A combination of values across several dimensions that outperforms
/// the overall baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synergy {
    /// `(dimension, value)` pairs in the order the dimensions were requested.
    pub values: Vec<(Dimension, String)>,
    pub uses: usize,
    pub avg_outcome: f64,
    /// `avg_outcome / baseline`.
    pub lift: f64,
}

impl Synergy {
    pub fn label(&self) -> String {
        self.values
            .iter()
            .map(|(d, v)| format!("{d}={v}"))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_tiers() {
        assert_eq!(ImpactTier::classify(20_000.0, 10_000.0, 1_000.0), ImpactTier::High);
        assert_eq!(ImpactTier::classify(10_000.0, 10_000.0, 1_000.0), ImpactTier::Medium);
        assert_eq!(ImpactTier::classify(1_000.0, 10_000.0, 1_000.0), ImpactTier::Low);
        assert_eq!(ImpactTier::classify(0.0, 10_000.0, 1_000.0), ImpactTier::Low);
    }

    #[test]
    fn test_reliability_tiers() {
        assert_eq!(ReliabilityTier::classify(10.0, 50.0, 150.0), ReliabilityTier::High);
        assert_eq!(ReliabilityTier::classify(50.0, 50.0, 150.0), ReliabilityTier::Medium);
        assert_eq!(ReliabilityTier::classify(150.0, 50.0, 150.0), ReliabilityTier::Low);
    }

    #[test]
    fn test_synergy_label() {
        let synergy = Synergy {
            values: vec![(Dimension::Topic, "rust".into()), (Dimension::Tone, "dry".into())],
            uses: 6,
            avg_outcome: 300.0,
            lift: 2.0,
        };
        assert_eq!(synergy.label(), "topic=rust + tone=dry");
    }
}
