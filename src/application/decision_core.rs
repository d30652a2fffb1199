//! The decision core: every caller-facing operation behind one handle.
//!
//! Components are built once from injected ports and shared by reference;
//! there is no global state. Use [`DecisionCore::bootstrap`] for a SQLite
//! backed core, or [`DecisionCore::from_parts`] to supply your own ports.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::cache::CachedArmRepository;
use crate::adapters::sqlite::{database_url, initialize_database, PoolConfig, SqliteArmRepository, SqliteOutcomeStore};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    parse_dimensions, AccountGrowth, ArmStats, Config, ContentEvent, Dimension, EmergingSignals, EventFilter, FactorAggregate,
    FactorImportance, FactorMomentum, OutcomeMetric, Recommendation, RecentSummary, SchemaReport, Synergy,
};
use crate::domain::ports::{ArmRepository, OutcomeStore, PosteriorSampler};
use crate::services::{AppliedOutcome, BanditSelector, IntelligenceAggregator, MomentumDetector, ThompsonSampler, VarianceAnalyzer};

pub struct DecisionCore {
    store: Arc<dyn OutcomeStore>,
    bandit: BanditSelector,
    variance: VarianceAnalyzer,
    momentum: MomentumDetector,
    intelligence: IntelligenceAggregator,
}

impl DecisionCore {
    /// Open the configured database, apply migrations and wire every
    /// component.
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let url = database_url(&config.database.path);
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to initialize database at {}", config.database.path))?;

        let store: Arc<dyn OutcomeStore> = Arc::new(SqliteOutcomeStore::new(pool.clone()));
        let report = store.verify_schema().await.context("Failed to inspect outcome store schema")?;
        if !report.is_complete() {
            warn!(missing = ?report.missing_columns, "Outcome store is missing analysis columns");
        }

        let sqlite_arms = Arc::new(SqliteArmRepository::new(pool));
        let arms: Arc<dyn ArmRepository> = if config.bandit.cache_ttl_secs > 0 {
            Arc::new(CachedArmRepository::with_ttl(
                sqlite_arms,
                Duration::from_secs(config.bandit.cache_ttl_secs),
            ))
        } else {
            sqlite_arms
        };

        info!(
            database = %config.database.path,
            total_posts = report.total_posts,
            arm_cache_ttl_secs = config.bandit.cache_ttl_secs,
            "Decision core ready"
        );

        Ok(Self::from_parts(arms, store, Arc::new(ThompsonSampler::new()), config))
    }

    pub fn from_parts(
        arms: Arc<dyn ArmRepository>,
        store: Arc<dyn OutcomeStore>,
        sampler: Arc<dyn PosteriorSampler>,
        config: &Config,
    ) -> Self {
        let analysis = config.analysis.clone();
        Self {
            bandit: BanditSelector::new(arms, sampler, config.bandit.success_threshold),
            variance: VarianceAnalyzer::new(store.clone(), analysis.clone()),
            momentum: MomentumDetector::new(store.clone(), analysis.clone()),
            intelligence: IntelligenceAggregator::new(store.clone(), analysis),
            store,
        }
    }

    // Bandit

    /// Choose one of `candidates` by Thompson Sampling.
    pub async fn select<S: AsRef<str>>(&self, candidates: &[S]) -> DomainResult<String> {
        self.bandit.select(candidates).await
    }

    pub async fn record_outcome(&self, arm_key: &str, success: bool) -> DomainResult<ArmStats> {
        self.bandit.record_outcome(arm_key, success).await
    }

    pub async fn record_outcome_once(&self, arm_key: &str, success: bool, idempotency_key: &str) -> DomainResult<bool> {
        self.bandit.record_outcome_once(arm_key, success, idempotency_key).await
    }

    /// Score a measured post against the success threshold and update its
    /// arm once.
    pub async fn record_content_outcome(&self, content_id: &str) -> DomainResult<Option<AppliedOutcome>> {
        self.bandit.record_content_outcome(self.store.as_ref(), content_id).await
    }

    pub async fn reset_arm(&self, arm_key: &str) -> DomainResult<()> {
        self.bandit.reset_arm(arm_key).await
    }

    pub async fn arm_stats(&self, arm_key: &str) -> DomainResult<Option<ArmStats>> {
        self.bandit.arm_stats(arm_key).await
    }

    pub async fn list_arms(&self) -> DomainResult<Vec<ArmStats>> {
        self.bandit.list_arms().await
    }

    // Outcome store

    pub async fn record_event(&self, event: &ContentEvent) -> DomainResult<i64> {
        self.store.record_event(event).await
    }

    pub async fn record_metric(&self, metric: &OutcomeMetric) -> DomainResult<()> {
        self.store.upsert_metric(metric).await
    }

    /// Events by kind and time range, newest first.
    pub async fn list_events(&self, filter: EventFilter) -> DomainResult<Vec<ContentEvent>> {
        self.store.list_events(filter).await
    }

    pub async fn recent_summary(&self, days: u32) -> DomainResult<RecentSummary> {
        self.store.recent_summary(days).await
    }

    pub async fn verify_schema(&self) -> DomainResult<SchemaReport> {
        self.store.verify_schema().await
    }

    // Analysis

    /// Rank dimensions by name. Unknown names are rejected.
    pub async fn importance<S: AsRef<str>>(&self, dimensions: &[S]) -> DomainResult<Vec<FactorImportance>> {
        let dimensions = parse_dimensions(dimensions)?;
        Ok(self.variance.importance(&dimensions).await)
    }

    pub async fn aggregates(&self, dimension: &str) -> DomainResult<Vec<FactorAggregate>> {
        let dimension: Dimension = dimension.parse()?;
        Ok(self.variance.aggregates(dimension).await)
    }

    pub async fn synergies<S: AsRef<str>>(&self, dimensions: &[S], min_uses: Option<usize>) -> DomainResult<Vec<Synergy>> {
        let dimensions = parse_dimensions(dimensions)?;
        self.variance.synergies(&dimensions, min_uses).await
    }

    pub async fn momentum(&self, dimension: &str) -> DomainResult<Vec<FactorMomentum>> {
        let dimension: Dimension = dimension.parse()?;
        Ok(self.momentum.momentum(dimension).await)
    }

    pub async fn account_growth(&self) -> AccountGrowth {
        self.momentum.account_growth().await
    }

    pub async fn detect_emerging<S: AsRef<str>>(&self, dimensions: &[S]) -> DomainResult<EmergingSignals> {
        let dimensions = parse_dimensions(dimensions)?;
        Ok(self.momentum.detect_emerging(&dimensions).await)
    }

    pub async fn build_recommendation(&self) -> Recommendation {
        self.intelligence.build().await
    }

    /// The recommendation cached by the last [`DecisionCore::build_recommendation`].
    pub async fn cached_recommendation(&self) -> Option<Recommendation> {
        self.intelligence.cached().await
    }
}
