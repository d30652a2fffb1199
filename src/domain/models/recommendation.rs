//! The aggregated recommendation handed to the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ReadinessThresholds;
use super::factor::{FactorAggregate, FactorImportance};
use super::momentum::{AccountGrowth, EmergingSignals, FactorMomentum};

/// Sample-size readiness of the learning system. Recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Readiness {
    InsufficientData,
    PatternsEmerging,
    ReadyForOptimization,
}

impl Readiness {
    pub fn assess(total_events: u64, thresholds: &ReadinessThresholds) -> Self {
        if total_events < thresholds.patterns_emerging {
            Self::InsufficientData
        } else if total_events < thresholds.ready_for_optimization {
            Self::PatternsEmerging
        } else {
            Self::ReadyForOptimization
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            Self::InsufficientData => Confidence::Low,
            Self::PatternsEmerging => Confidence::Medium,
            Self::ReadyForOptimization => Confidence::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::PatternsEmerging => "PATTERNS_EMERGING",
            Self::ReadyForOptimization => "READY_FOR_OPTIMIZATION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Composition of variance rankings, momentum and account growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub readiness: Readiness,
    pub confidence: Confidence,
    pub total_events: u64,
    pub importance: Vec<FactorImportance>,
    /// Aggregates of the highest-variance dimension.
    pub top_dimension_aggregates: Vec<FactorAggregate>,
    pub momentum: Vec<FactorMomentum>,
    pub emerging: EmergingSignals,
    pub account_growth: AccountGrowth,
    /// Ordered, human-readable actions.
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Recommendation {
    /// A recommendation carrying only the readiness verdict and messages.
    pub fn collecting(total_events: u64, readiness: Readiness, recommendations: Vec<String>) -> Self {
        Self {
            readiness,
            confidence: readiness.confidence(),
            total_events,
            importance: Vec::new(),
            top_dimension_aggregates: Vec::new(),
            momentum: Vec::new(),
            emerging: EmergingSignals::default(),
            account_growth: AccountGrowth::empty(),
            recommendations,
            generated_at: Utc::now(),
        }
    }
}
