//! Intelligence aggregation: one recommendation from every analysis.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::models::{
    AccountGrowth, AccountTrend, AnalysisConfig, EmergingSignals, EventKind, FactorAggregate, FactorImportance,
    Readiness, Recommendation,
};
use crate::domain::ports::OutcomeStore;
use crate::domain::stats::safe_ratio;
use crate::services::momentum_detector::{classify_emerging, MomentumDetector};
use crate::services::variance_analyzer::VarianceAnalyzer;

pub const SNAPSHOT_KIND: &str = "recommendation";
pub const SNAPSHOT_KEY: &str = "latest";

pub const KEEP_COLLECTING: &str = "Keep collecting data: not enough posts to draw conclusions yet";

pub struct IntelligenceAggregator {
    store: Arc<dyn OutcomeStore>,
    variance: VarianceAnalyzer,
    momentum: MomentumDetector,
    config: AnalysisConfig,
}

impl IntelligenceAggregator {
    pub fn new(store: Arc<dyn OutcomeStore>, config: AnalysisConfig) -> Self {
        Self {
            variance: VarianceAnalyzer::new(store.clone(), config.clone()),
            momentum: MomentumDetector::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    /// Compose the current recommendation.
    ///
    /// Readiness is recomputed from the posted-event count on every call.
    /// Below the first readiness cutoff nothing else is computed. The result
    /// is cached as a snapshot; caching failures are only logged.
    pub async fn build(&self) -> Recommendation {
        let total_events = match self.store.count_events(Some(EventKind::Posted)).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "Could not count posted events, assuming none");
                0
            }
        };
        let readiness = Readiness::assess(total_events, &self.config.readiness);

        let recommendation = if readiness == Readiness::InsufficientData {
            Recommendation::collecting(total_events, readiness, vec![KEEP_COLLECTING.to_string()])
        } else {
            self.compose(total_events, readiness).await
        };

        info!(
            readiness = readiness.as_str(),
            total_events,
            recommendations = recommendation.recommendations.len(),
            "Built recommendation"
        );
        self.cache(&recommendation).await;
        recommendation
    }

    async fn compose(&self, total_events: u64, readiness: Readiness) -> Recommendation {
        let dimensions = &self.config.tracked_dimensions;

        let (importance, momentum_lists, account_growth) = futures::join!(
            self.variance.importance(dimensions),
            join_all(dimensions.iter().map(|&d| self.momentum.momentum(d))),
            self.momentum.account_growth(),
        );

        let top_dimension_aggregates = match importance.first() {
            Some(top) => self.variance.aggregates(top.dimension).await,
            None => Vec::new(),
        };

        let mut momentum: Vec<_> = momentum_lists.into_iter().flatten().collect();
        momentum.sort_by(|a, b| b.growth.total_cmp(&a.growth).then_with(|| a.value.cmp(&b.value)));
        let emerging = classify_emerging(momentum.iter().cloned(), &self.config.samples);

        let recommendations = derive_recommendations(
            readiness,
            &importance,
            &top_dimension_aggregates,
            &emerging,
            &account_growth,
        );
        debug!(
            dimensions = importance.len(),
            momentum = momentum.len(),
            "Composed analysis inputs"
        );

        Recommendation {
            readiness,
            confidence: readiness.confidence(),
            total_events,
            importance,
            top_dimension_aggregates,
            momentum,
            emerging,
            account_growth,
            recommendations,
            generated_at: Utc::now(),
        }
    }

    async fn cache(&self, recommendation: &Recommendation) {
        let payload = match serde_json::to_value(recommendation) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Failed to serialize recommendation snapshot");
                return;
            }
        };
        if let Err(err) = self.store.store_snapshot(SNAPSHOT_KIND, SNAPSHOT_KEY, &payload).await {
            warn!(error = %err, "Failed to cache recommendation snapshot");
        }
    }

    /// Last cached recommendation, if any could be read back.
    pub async fn cached(&self) -> Option<Recommendation> {
        match self.store.load_snapshot(SNAPSHOT_KIND, SNAPSHOT_KEY).await {
            Ok(Some((payload, _))) => serde_json::from_value(payload)
                .map_err(|err| warn!(error = %err, "Discarding unreadable recommendation snapshot"))
                .ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "Failed to load recommendation snapshot");
                None
            }
        }
    }
}

/// Ordered action list. Each input contributes at most one line.
pub(crate) fn derive_recommendations(
    readiness: Readiness,
    importance: &[FactorImportance],
    top_aggregates: &[FactorAggregate],
    emerging: &EmergingSignals,
    account: &AccountGrowth,
) -> Vec<String> {
    let mut out = Vec::new();

    if readiness == Readiness::PatternsEmerging {
        out.push("Patterns are emerging: treat these findings as hypotheses and keep exploring".to_string());
    }

    if let Some(top) = importance.first().filter(|t| t.variance > 0.0) {
        out.push(format!(
            "Focus on {}: it explains {:.1}% of outcome variance ({} impact)",
            top.dimension,
            top.percent_explained,
            top.impact.as_str()
        ));
    }

    if let (Some(best), Some(worst)) = (top_aggregates.first(), top_aggregates.last()) {
        if top_aggregates.len() >= 2 {
            let ratio = safe_ratio(best.avg_outcome, worst.avg_outcome);
            if ratio > 0.0 {
                out.push(format!(
                    "Prefer {}={} over {}: {:.1}x the average outcome",
                    best.dimension, best.value, worst.value, ratio
                ));
            } else {
                out.push(format!(
                    "Prefer {}={} over {}: {:.1} vs {:.1} average outcome",
                    best.dimension, best.value, worst.value, best.avg_outcome, worst.avg_outcome
                ));
            }
        }
    }

    if let Some(rising) = emerging.rising.first() {
        out.push(format!(
            "Double down on {}={}: accelerating at {:+.0}%",
            rising.dimension, rising.value, rising.growth
        ));
    }

    if let Some(fading) = emerging.fading.first() {
        out.push(format!(
            "Rework or retire {}={}: {} at {:+.0}%",
            fading.dimension,
            fading.value,
            fading.status.as_str().to_lowercase(),
            fading.growth
        ));
    }

    out.push(match account.trend {
        AccountTrend::Growing => format!(
            "Account is growing ({:+.0}%): keep the current strategy mix",
            account.growth_rate
        ),
        AccountTrend::Flat => format!(
            "Account is flat ({:+.0}%): test new strategy combinations",
            account.growth_rate
        ),
        AccountTrend::Declining => format!(
            "Account is declining ({:+.0}%): shift budget toward exploration",
            account.growth_rate
        ),
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteOutcomeStore};
    use crate::domain::models::{
        ContentEvent, Dimension, FactorMomentum, ImpactTier, MomentumStatus, OutcomeMetric, ReliabilityTier,
    };
    use chrono::{Duration, TimeZone};

    fn importance(dimension: Dimension, variance: f64, percent: f64) -> FactorImportance {
        FactorImportance {
            dimension,
            variance,
            percent_explained: percent,
            impact: ImpactTier::High,
            values: 2,
            samples: 10,
        }
    }

    fn aggregate(value: &str, avg: f64) -> FactorAggregate {
        FactorAggregate {
            dimension: Dimension::Topic,
            value: value.to_string(),
            uses: 5,
            avg_outcome: avg,
            avg_impressions: avg,
            avg_engagement_rate: 0.0,
            avg_likes: 0.0,
            avg_followers_gained: 0.0,
            distinct_topics: 1,
            distinct_formats: 1,
            distinct_tones: 0,
            distinct_generators: 0,
            std_dev: 0.0,
            reliability: ReliabilityTier::High,
        }
    }

    fn momentum(value: &str, growth: f64, status: MomentumStatus) -> FactorMomentum {
        FactorMomentum {
            dimension: Dimension::Format,
            value: value.to_string(),
            weekly: Vec::new(),
            total_uses: 20,
            growth,
            status,
        }
    }

    #[test]
    fn test_derived_recommendations_are_ordered() {
        let emerging = EmergingSignals {
            rising: vec![momentum("thread", 180.0, MomentumStatus::Accelerating)],
            fading: vec![momentum("poll", -60.0, MomentumStatus::Dead)],
            new_entrants: Vec::new(),
        };
        let account = AccountGrowth {
            weekly: Vec::new(),
            trend: AccountTrend::Declining,
            growth_rate: -25.0,
        };

        let recs = derive_recommendations(
            Readiness::ReadyForOptimization,
            &[importance(Dimension::Topic, 5_000.0, 72.5), importance(Dimension::Tone, 100.0, 27.5)],
            &[aggregate("rust", 900.0), aggregate("go", 300.0)],
            &emerging,
            &account,
        );

        assert_eq!(
            recs,
            vec![
                "Focus on topic: it explains 72.5% of outcome variance (HIGH impact)",
                "Prefer topic=rust over go: 3.0x the average outcome",
                "Double down on format=thread: accelerating at +180%",
                "Rework or retire format=poll: dead at -60%",
                "Account is declining (-25%): shift budget toward exploration",
            ]
        );
    }

    #[test]
    fn test_zero_worst_aggregate_avoids_ratio() {
        let recs = derive_recommendations(
            Readiness::PatternsEmerging,
            &[],
            &[aggregate("rust", 50.0), aggregate("go", 0.0)],
            &EmergingSignals::default(),
            &AccountGrowth::empty(),
        );
        assert!(recs[0].starts_with("Patterns are emerging"));
        assert_eq!(recs[1], "Prefer topic=rust over go: 50.0 vs 0.0 average outcome");
        assert_eq!(recs.last().unwrap(), "Account is flat (+0%): test new strategy combinations");
    }

    async fn seeded_store(posts: usize) -> Arc<SqliteOutcomeStore> {
        let store = Arc::new(SqliteOutcomeStore::new(create_migrated_test_pool().await.unwrap()));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        for i in 0..posts {
            let id = format!("post-{i}");
            let topic = if i % 2 == 0 { "rust" } else { "go" };
            let event = ContentEvent::new(EventKind::Posted, &id)
                .with_dimension(Dimension::Topic, topic)
                .with_dimension(Dimension::Format, "thread")
                .at(start + Duration::hours(i as i64 * 6));
            store.record_event(&event).await.unwrap();
            let impressions = if topic == "rust" { 1_000 + i as i64 } else { 200 };
            store.upsert_metric(&OutcomeMetric::new(&id, impressions)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insufficient_data_short_circuits() {
        let store = seeded_store(150).await;
        let aggregator = IntelligenceAggregator::new(store, AnalysisConfig::default());

        let rec = aggregator.build().await;
        assert_eq!(rec.readiness, Readiness::InsufficientData);
        assert_eq!(rec.total_events, 150);
        assert_eq!(rec.recommendations, vec![KEEP_COLLECTING.to_string()]);
        assert!(rec.importance.is_empty());
        assert!(rec.momentum.is_empty());
    }

    #[tokio::test]
    async fn test_full_recommendation_is_cached() {
        let store = seeded_store(350).await;
        let aggregator = IntelligenceAggregator::new(store, AnalysisConfig::default());

        let rec = aggregator.build().await;
        assert_eq!(rec.readiness, Readiness::PatternsEmerging);
        assert_eq!(rec.importance[0].dimension, Dimension::Topic);
        assert_eq!(rec.top_dimension_aggregates.len(), 2);
        assert_eq!(rec.top_dimension_aggregates[0].value, "rust");
        assert!(!rec.momentum.is_empty());
        assert!(rec.recommendations.iter().any(|r| r.starts_with("Focus on topic")));

        let cached = aggregator.cached().await.unwrap();
        assert_eq!(cached.readiness, rec.readiness);
        assert_eq!(cached.recommendations, rec.recommendations);
    }
}
