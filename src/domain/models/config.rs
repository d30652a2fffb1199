use serde::{Deserialize, Serialize};

use super::dimension::{Dimension, OutcomeMeasure};

/// Engagement rate at or above which a post counts as a success for its arm.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.02;

/// Main configuration structure for strategist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bandit configuration
    #[serde(default)]
    pub bandit: BanditConfig,

    /// Analysis thresholds
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".strategist/strategist.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Bandit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BanditConfig {
    /// Engagement rate counted as a success (fixed, not learned)
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,

    /// TTL of the arm statistics read cache; 0 disables the cache
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

const fn default_success_threshold() -> f64 {
    DEFAULT_SUCCESS_THRESHOLD
}

const fn default_cache_ttl_secs() -> u64 {
    5
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            success_threshold: default_success_threshold(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Cutoffs for the impact tier of a dimension's variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for VarianceThresholds {
    fn default() -> Self {
        Self {
            high: 10_000.0,
            medium: 1_000.0,
        }
    }
}

/// Standard-deviation cutoffs for aggregate reliability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityThresholds {
    pub high_below: f64,
    pub medium_below: f64,
}

impl Default for ReliabilityThresholds {
    fn default() -> Self {
        Self {
            high_below: 50.0,
            medium_below: 150.0,
        }
    }
}

/// Growth-percent cutoffs for momentum status. Each is an exclusive lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumThresholds {
    pub accelerating: f64,
    pub growing: f64,
    pub stable: f64,
    pub declining: f64,
}

impl Default for MomentumThresholds {
    fn default() -> Self {
        Self {
            accelerating: 100.0,
            growing: 20.0,
            stable: -20.0,
            declining: -50.0,
        }
    }
}

/// Total-event cutoffs for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessThresholds {
    pub patterns_emerging: u64,
    pub ready_for_optimization: u64,
}

impl Default for ReadinessThresholds {
    fn default() -> Self {
        Self {
            patterns_emerging: 200,
            ready_for_optimization: 500,
        }
    }
}

/// Minimum sample sizes before a value is reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleThresholds {
    pub aggregate_min_uses: usize,
    pub momentum_min_weeks: usize,
    pub momentum_min_uses: usize,
    pub new_entrant_max_uses: usize,
    pub new_entrant_min_growth: f64,
}

impl Default for SampleThresholds {
    fn default() -> Self {
        Self {
            aggregate_min_uses: 5,
            momentum_min_weeks: 2,
            momentum_min_uses: 5,
            new_entrant_max_uses: 10,
            new_entrant_min_growth: 50.0,
        }
    }
}

/// Multi-dimension combination detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    pub min_uses: usize,
    /// Minimum `combination mean / overall mean` to report.
    pub min_lift: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            min_uses: 5,
            min_lift: 1.5,
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Column treated as the primary outcome measure
    #[serde(default)]
    pub measure: OutcomeMeasure,

    /// Dimensions the intelligence aggregator reports on
    #[serde(default = "default_tracked_dimensions")]
    pub tracked_dimensions: Vec<Dimension>,

    #[serde(default)]
    pub variance: VarianceThresholds,

    #[serde(default)]
    pub reliability: ReliabilityThresholds,

    #[serde(default)]
    pub momentum: MomentumThresholds,

    /// Account growth percent beyond which the trend is GROWING / DECLINING
    #[serde(default = "default_trend_cutoff")]
    pub trend_cutoff: f64,

    #[serde(default)]
    pub readiness: ReadinessThresholds,

    #[serde(default)]
    pub samples: SampleThresholds,

    #[serde(default)]
    pub synergy: SynergyConfig,
}

fn default_tracked_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::Topic,
        Dimension::Format,
        Dimension::Tone,
        Dimension::Generator,
    ]
}

const fn default_trend_cutoff() -> f64 {
    20.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            measure: OutcomeMeasure::default(),
            tracked_dimensions: default_tracked_dimensions(),
            variance: VarianceThresholds::default(),
            reliability: ReliabilityThresholds::default(),
            momentum: MomentumThresholds::default(),
            trend_cutoff: default_trend_cutoff(),
            readiness: ReadinessThresholds::default(),
            samples: SampleThresholds::default(),
            synergy: SynergyConfig::default(),
        }
    }
}
