//! Outcome store port: content events, measured outcomes and cached insights.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ContentEvent, EventFilter, EventKind, OutcomeFilter, OutcomeMetric, OutcomeRecord,
    RecentSummary, SchemaReport,
};

/// Read/write surface of the persistent outcome store.
///
/// Analysis only ever calls the read methods; events are written by the
/// orchestrator and metrics by whatever collects engagement.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Append a content event. Returns its row id.
    async fn record_event(&self, event: &ContentEvent) -> DomainResult<i64>;

    /// Insert or refresh the metric row for a content id.
    async fn upsert_metric(&self, metric: &OutcomeMetric) -> DomainResult<()>;

    async fn get_metric(&self, content_id: &str) -> DomainResult<Option<OutcomeMetric>>;

    /// Most recent `posted` event for a content id.
    async fn find_posted_event(&self, content_id: &str) -> DomainResult<Option<ContentEvent>>;

    /// Events by kind and time range, newest first.
    async fn list_events(&self, filter: EventFilter) -> DomainResult<Vec<ContentEvent>>;

    /// Posted events joined to their metrics, oldest first.
    async fn fetch_outcomes(&self, filter: OutcomeFilter) -> DomainResult<Vec<OutcomeRecord>>;

    /// Count events, optionally of one kind.
    async fn count_events(&self, kind: Option<EventKind>) -> DomainResult<u64>;

    /// Averages over posts from the last `days` days.
    async fn recent_summary(&self, days: u32) -> DomainResult<RecentSummary>;

    /// Check the columns analysis depends on are present.
    async fn verify_schema(&self) -> DomainResult<SchemaReport>;

    /// Upsert a cached analysis result.
    async fn store_snapshot(&self, kind: &str, key: &str, payload: &serde_json::Value) -> DomainResult<()>;

    /// Load a cached analysis result and when it was computed.
    async fn load_snapshot(&self, kind: &str, key: &str) -> DomainResult<Option<(serde_json::Value, DateTime<Utc>)>>;
}
