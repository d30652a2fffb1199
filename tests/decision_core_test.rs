//! End-to-end tests of the caller-facing decision core.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::seed_many;
use strategist::domain::models::{
    Config, ContentEvent, Dimension, EventFilter, EventKind, OutcomeFilter, OutcomeMetric, OutcomeRecord,
    Readiness, RecentSummary, SchemaReport,
};
use strategist::{ArmRepository, DecisionCore, DomainError, DomainResult, OutcomeStore, ThompsonSampler};

async fn memory_core() -> (Arc<strategist::adapters::sqlite::SqliteOutcomeStore>, DecisionCore) {
    let (store, arms) = common::memory_stores().await;
    let core = DecisionCore::from_parts(arms, store.clone(), Arc::new(ThompsonSampler::seeded(9)), &Config::default());
    (store, core)
}

/// Seed `total` posts split over four topics and two weeks.
async fn seed_posts(store: &dyn OutcomeStore, total: usize) {
    let topics = [("rust", 900), ("go", 500), ("cooking", 150), ("news", 300)];
    let per_bucket = total / (topics.len() * 2);
    for (topic, base) in topics {
        let values = [(Dimension::Topic, topic), (Dimension::Format, "thread")];
        seed_many(store, topic, &values, 0, base, per_bucket).await;
        let later = if topic == "news" { base / 4 } else { base * 3 };
        seed_many(store, topic, &values, 1, later, per_bucket).await;
    }
}

#[tokio::test]
async fn test_readiness_follows_post_count() {
    for (posts, expected) in [
        (150, Readiness::InsufficientData),
        (352, Readiness::PatternsEmerging),
        (600, Readiness::ReadyForOptimization),
    ] {
        let (store, core) = memory_core().await;
        seed_posts(store.as_ref(), posts).await;

        let rec = core.build_recommendation().await;
        assert_eq!(rec.readiness, expected, "{posts} posts");
        assert_eq!(rec.confidence, expected.confidence());
    }
}

#[tokio::test]
async fn test_recommendation_covers_every_signal() {
    common::setup_test_logging();
    let (store, core) = memory_core().await;
    seed_posts(store.as_ref(), 600).await;

    let rec = core.build_recommendation().await;
    assert_eq!(rec.readiness, Readiness::ReadyForOptimization);
    assert_eq!(rec.importance[0].dimension, Dimension::Topic);
    assert_eq!(rec.top_dimension_aggregates[0].value, "rust");
    assert_eq!(rec.top_dimension_aggregates.last().unwrap().value, "news");
    // Three topics and the single format all accelerate.
    assert_eq!(rec.emerging.rising.len(), 4);
    assert_eq!(rec.emerging.fading[0].value, "news");

    let lines = &rec.recommendations;
    assert!(lines[0].starts_with("Focus on topic"));
    assert!(lines[1].starts_with("Prefer topic=rust over news"));
    assert!(lines.iter().any(|l| l.starts_with("Double down on topic=")));
    assert!(lines.iter().any(|l| l.starts_with("Rework or retire topic=news")));
    assert!(lines.last().unwrap().starts_with("Account is growing"));

    let cached = core.cached_recommendation().await.unwrap();
    assert_eq!(cached.recommendations, rec.recommendations);
}

#[tokio::test]
async fn test_learning_loop_and_summary() {
    let (_store, core) = memory_core().await;

    let arm = core.select(&["generator=a|format=thread", "generator=b|format=thread"]).await.unwrap();
    core.record_event(&ContentEvent::new(EventKind::Posted, "c-1").with_arm_key(arm.clone()))
        .await
        .unwrap();
    core.record_metric(&OutcomeMetric::new("c-1", 2_000).with_engagement(30, 5, 5, 0))
        .await
        .unwrap();

    let applied = core.record_content_outcome("c-1").await.unwrap().unwrap();
    assert!(applied.success);
    assert!((applied.engagement_rate - 0.02).abs() < 1e-12);
    assert!(!core.record_content_outcome("c-1").await.unwrap().unwrap().applied);

    let stats = core.arm_stats(&arm).await.unwrap().unwrap();
    assert_eq!((stats.alpha, stats.beta), (2.0, 1.0));

    core.reset_arm(&arm).await.unwrap();
    assert_eq!(core.arm_stats(&arm).await.unwrap().unwrap().attempts, 0);

    let summary = core.recent_summary(365 * 100).await.unwrap();
    assert_eq!(summary.posts, 1);
    assert!((summary.avg_impressions - 2_000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_caller_errors_surface() {
    let (_store, core) = memory_core().await;

    let empty: [&str; 0] = [];
    assert!(matches!(core.select(&empty).await, Err(DomainError::EmptyCandidateSet)));
    assert!(matches!(core.select(&["=x"]).await, Err(DomainError::InvalidArmKey { .. })));
    assert!(matches!(core.detect_emerging(&["topic", "mood"]).await, Err(DomainError::UnknownDimension(_))));
    assert!(matches!(
        core.synergies(&["topic", "topic"], None).await,
        Err(DomainError::ValidationFailed(_))
    ));
}

/// Store whose every call fails, standing in for an unreachable database.
struct OfflineStore;

fn offline<T>() -> DomainResult<T> {
    Err(DomainError::DatabaseError("database is offline".into()))
}

#[async_trait]
impl OutcomeStore for OfflineStore {
    async fn record_event(&self, _: &ContentEvent) -> DomainResult<i64> {
        offline()
    }
    async fn upsert_metric(&self, _: &OutcomeMetric) -> DomainResult<()> {
        offline()
    }
    async fn get_metric(&self, _: &str) -> DomainResult<Option<OutcomeMetric>> {
        offline()
    }
    async fn find_posted_event(&self, _: &str) -> DomainResult<Option<ContentEvent>> {
        offline()
    }
    async fn list_events(&self, _: EventFilter) -> DomainResult<Vec<ContentEvent>> {
        offline()
    }
    async fn fetch_outcomes(&self, _: OutcomeFilter) -> DomainResult<Vec<OutcomeRecord>> {
        offline()
    }
    async fn count_events(&self, _: Option<EventKind>) -> DomainResult<u64> {
        offline()
    }
    async fn recent_summary(&self, _: u32) -> DomainResult<RecentSummary> {
        offline()
    }
    async fn verify_schema(&self) -> DomainResult<SchemaReport> {
        offline()
    }
    async fn store_snapshot(&self, _: &str, _: &str, _: &serde_json::Value) -> DomainResult<()> {
        offline()
    }
    async fn load_snapshot(&self, _: &str, _: &str) -> DomainResult<Option<(serde_json::Value, DateTime<Utc>)>> {
        offline()
    }
}

#[tokio::test]
async fn test_analysis_degrades_when_store_is_offline() {
    let (_store, arms) = common::memory_stores().await;
    let core = DecisionCore::from_parts(
        arms.clone() as Arc<dyn ArmRepository>,
        Arc::new(OfflineStore),
        Arc::new(ThompsonSampler::seeded(1)),
        &Config::default(),
    );

    assert!(core.importance(&["topic", "format"]).await.unwrap().is_empty());
    assert!(core.momentum("tone").await.unwrap().is_empty());
    assert_eq!(core.detect_emerging(&["topic"]).await.unwrap().rising.len(), 0);

    let rec = core.build_recommendation().await;
    assert_eq!(rec.readiness, Readiness::InsufficientData);
    assert!(core.cached_recommendation().await.is_none());

    // Arm writes still reach their own repository.
    assert!(core.record_outcome("generator=a", true).await.is_ok());
    assert!(core.record_content_outcome("c-1").await.unwrap_err().is_storage());
}
