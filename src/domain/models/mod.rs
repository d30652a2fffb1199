pub mod arm;
pub mod config;
pub mod content;
pub mod dimension;
pub mod factor;
pub mod momentum;
pub mod recommendation;

pub use arm::{ArmKey, ArmStats, BetaDistribution, SelectionDecision};
pub use config::{
    AnalysisConfig, BanditConfig, Config, DatabaseConfig, LoggingConfig, MomentumThresholds,
    ReadinessThresholds, ReliabilityThresholds, SampleThresholds, SynergyConfig,
    VarianceThresholds,
};
pub use content::{
    ContentEvent, EventFilter, EventKind, OutcomeFilter, OutcomeMetric, OutcomeRecord,
    RecentSummary, SchemaReport,
};
pub use dimension::{parse_dimensions, Dimension, OutcomeMeasure};
pub use factor::{FactorAggregate, FactorImportance, ImpactTier, ReliabilityTier, Synergy};
pub use momentum::{
    week_start, AccountGrowth, AccountTrend, EmergingSignals, FactorMomentum, MomentumStatus,
    WeeklyBucket,
};
pub use recommendation::{Confidence, Readiness, Recommendation};
