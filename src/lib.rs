//! Strategist - adaptive decision core for a content-publishing bot
//!
//! Strategist decides which content strategy to use next and explains which
//! strategy dimensions actually move engagement:
//!
//! - a Thompson Sampling bandit over strategy arms, learning from measured
//!   post outcomes
//! - a factor variance analyzer ranking dimensions (topic, format, tone,
//!   generator, hook pattern) by the variance of their per-value means
//! - a temporal momentum detector classifying values as accelerating,
//!   growing, stable, declining or dead from weekly averages
//! - an intelligence aggregator composing both into one recommendation,
//!   gated by sample-size readiness
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): data model, numeric helpers and port traits
//! - **Adapters** (`adapters`): SQLite outcome store and a moka arm cache
//! - **Service Layer** (`services`): bandit, analyzers and aggregator
//! - **Application Layer** (`application`): the `DecisionCore` facade
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//!
//! # Example
//!
//! ```no_run
//! use strategist::{ConfigLoader, DecisionCore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let core = DecisionCore::bootstrap(&config).await?;
//!
//!     let arm = core.select(&["generator=a|tone=dry", "generator=b|tone=warm"]).await?;
//!     println!("next strategy: {arm}");
//!
//!     let recommendation = core.build_recommendation().await;
//!     for line in &recommendation.recommendations {
//!         println!("- {line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::DecisionCore;
pub use domain::models::{
    AccountGrowth, AccountTrend, ArmKey, ArmStats, Config, ContentEvent, Dimension, EmergingSignals, EventKind,
    FactorAggregate, FactorImportance, FactorMomentum, ImpactTier, MomentumStatus, OutcomeMeasure, OutcomeMetric,
    Readiness, Recommendation, ReliabilityTier, Synergy,
};
pub use domain::ports::{ArmRepository, OutcomeStore, PosteriorSampler};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::{LogConfig, LoggerImpl};
pub use services::{BanditSelector, IntelligenceAggregator, MomentumDetector, ThompsonSampler, VarianceAnalyzer};
