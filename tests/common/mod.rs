//! Common test utilities for integration tests
//!
//! Provides shared fixtures for seeding the outcome store and opening
//! isolated databases.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use strategist::adapters::sqlite::{
    create_migrated_test_pool, database_url, initialize_database, SqliteArmRepository, SqliteOutcomeStore,
};
use strategist::domain::models::{ContentEvent, Dimension, EventKind, OutcomeMetric};
use strategist::OutcomeStore;

/// Create a temporary test database path.
///
/// Returns the directory guard together with the SQLite file path inside it.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Initializes a tracing subscriber writing to the test harness output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory outcome store and arm repository sharing one pool.
pub async fn memory_stores() -> (Arc<SqliteOutcomeStore>, Arc<SqliteArmRepository>) {
    let pool = create_migrated_test_pool().await.expect("failed to create test database");
    (
        Arc::new(SqliteOutcomeStore::new(pool.clone())),
        Arc::new(SqliteArmRepository::new(pool)),
    )
}

/// File-backed stores for tests that need several connections.
pub async fn file_stores(path: &std::path::Path) -> (Arc<SqliteOutcomeStore>, Arc<SqliteArmRepository>) {
    let url = database_url(path.to_str().expect("utf-8 temp path"));
    let pool = initialize_database(&url, None).await.expect("failed to open file database");
    (
        Arc::new(SqliteOutcomeStore::new(pool.clone())),
        Arc::new(SqliteArmRepository::new(pool)),
    )
}

/// A fixed Sunday, the start of week zero for seeded data.
pub fn week_zero() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap()
}

/// One seeded post: its strategy values, week offset and impressions.
pub struct SeedPost<'a> {
    pub id: String,
    pub values: &'a [(Dimension, &'a str)],
    pub week: i64,
    pub impressions: i64,
}

/// Record a posted event and its metric.
pub async fn seed_post(store: &dyn OutcomeStore, post: SeedPost<'_>) {
    let mut event = ContentEvent::new(EventKind::Posted, post.id.clone())
        .at(week_zero() + Duration::weeks(post.week) + Duration::hours(26));
    for (dimension, value) in post.values {
        event = event.with_dimension(*dimension, *value);
    }
    store.record_event(&event).await.expect("record event");
    store
        .upsert_metric(&OutcomeMetric::new(post.id, post.impressions).with_engagement(2, 1, 0, 0))
        .await
        .expect("record metric");
}

/// Seed `count` identical posts for one set of values in one week.
pub async fn seed_many(
    store: &dyn OutcomeStore,
    prefix: &str,
    values: &[(Dimension, &str)],
    week: i64,
    impressions: i64,
    count: usize,
) {
    for i in 0..count {
        seed_post(
            store,
            SeedPost {
                id: format!("{prefix}-w{week}-{i}"),
                values,
                week,
                impressions,
            },
        )
        .await;
    }
}
