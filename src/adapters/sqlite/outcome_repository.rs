//! SQLite implementation of the OutcomeStore.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;

use super::{format_datetime, parse_datetime, parse_json_or_default, parse_optional_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ContentEvent, EventFilter, EventKind, OutcomeFilter, OutcomeMetric, OutcomeRecord,
    RecentSummary, SchemaReport,
};
use crate::domain::ports::OutcomeStore;

const EVENT_COLUMNS: &str = "content_id, kind, topic, format, tone, generator, hook_pattern, model, cost_usd, confidence, time_slot, arm_key, exploration, quality_scores, created_at";

/// Columns the analysis queries cannot work without, as `(table, column)`.
const ESSENTIAL_COLUMNS: &[(&str, &str)] = &[
    ("content_events", "topic"),
    ("content_events", "format"),
    ("content_events", "tone"),
    ("content_events", "generator"),
    ("content_events", "hook_pattern"),
    ("content_events", "arm_key"),
    ("content_events", "created_at"),
    ("outcome_metrics", "impressions"),
    ("outcome_metrics", "engagement_rate"),
    ("outcome_metrics", "followers_gained"),
];

/// Keeps only the latest posted event of each content id, the same row
/// `find_posted_event` returns. Expects the events table aliased as `e`.
const LATEST_POSTED: &str = "e.kind = 'posted' AND e.id = (SELECT p.id FROM content_events p WHERE p.content_id = e.content_id AND p.kind = 'posted' ORDER BY p.created_at DESC, p.id DESC LIMIT 1)";

#[derive(Clone)]
pub struct SqliteOutcomeStore {
    pool: SqlitePool,
}

impl SqliteOutcomeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_columns(&self, table: &str) -> DomainResult<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[async_trait]
impl OutcomeStore for SqliteOutcomeStore {
    async fn record_event(&self, event: &ContentEvent) -> DomainResult<i64> {
        let quality_json = serde_json::to_string(&event.quality_scores)?;

        let result = sqlx::query(&format!(
            "INSERT INTO content_events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&event.content_id)
        .bind(event.kind.as_str())
        .bind(&event.topic)
        .bind(&event.format)
        .bind(&event.tone)
        .bind(&event.generator)
        .bind(&event.hook_pattern)
        .bind(&event.model)
        .bind(event.cost_usd)
        .bind(event.confidence)
        .bind(&event.time_slot)
        .bind(&event.arm_key)
        .bind(event.exploration)
        .bind(&quality_json)
        .bind(format_datetime(&event.created_at))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn upsert_metric(&self, metric: &OutcomeMetric) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO outcome_metrics (content_id, likes, shares, replies, bookmarks, impressions,
                   followers_gained, follower_count, engagement_rate, reach_efficiency, measured_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(content_id) DO UPDATE SET
                   likes = excluded.likes,
                   shares = excluded.shares,
                   replies = excluded.replies,
                   bookmarks = excluded.bookmarks,
                   impressions = excluded.impressions,
                   followers_gained = excluded.followers_gained,
                   follower_count = excluded.follower_count,
                   engagement_rate = excluded.engagement_rate,
                   reach_efficiency = excluded.reach_efficiency,
                   measured_at = excluded.measured_at"#,
        )
        .bind(&metric.content_id)
        .bind(metric.likes)
        .bind(metric.shares)
        .bind(metric.replies)
        .bind(metric.bookmarks)
        .bind(metric.impressions)
        .bind(metric.followers_gained)
        .bind(metric.follower_count)
        .bind(metric.engagement_rate())
        .bind(metric.reach_efficiency())
        .bind(format_datetime(&metric.measured_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_metric(&self, content_id: &str) -> DomainResult<Option<OutcomeMetric>> {
        let row: Option<MetricRow> = sqlx::query_as(
            r#"SELECT content_id, likes, shares, replies, bookmarks, impressions, followers_gained,
                      follower_count, measured_at
               FROM outcome_metrics WHERE content_id = ?"#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_posted_event(&self, content_id: &str) -> DomainResult<Option<ContentEvent>> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM content_events WHERE content_id = ? AND kind = 'posted' ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_events(&self, filter: EventFilter) -> DomainResult<Vec<ContentEvent>> {
        let mut query = format!("SELECT {EVENT_COLUMNS} FROM content_events WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(kind) = filter.kind {
            query.push_str(" AND kind = ?");
            bindings.push(kind.as_str().to_string());
        }
        if let Some(since) = filter.since {
            query.push_str(" AND created_at >= ?");
            bindings.push(format_datetime(&since));
        }
        if let Some(until) = filter.until {
            query.push_str(" AND created_at < ?");
            bindings.push(format_datetime(&until));
        }

        query.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, EventRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<EventRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn fetch_outcomes(&self, filter: OutcomeFilter) -> DomainResult<Vec<OutcomeRecord>> {
        let mut query = format!(
            r#"SELECT e.content_id, e.created_at, e.topic, e.format, e.tone, e.generator, e.hook_pattern,
                      e.arm_key, m.likes, m.impressions, m.followers_gained, m.engagement_rate
               FROM content_events e
               JOIN outcome_metrics m ON m.content_id = e.content_id
               WHERE {LATEST_POSTED}"#
        );
        let mut bindings: Vec<String> = Vec::new();

        if let Some(dimension) = filter.dimension {
            // Column names come from the closed Dimension enum.
            let column = dimension.as_str();
            query.push_str(&format!(" AND e.{column} IS NOT NULL AND e.{column} != ''"));
        }
        if let Some(since) = filter.since {
            query.push_str(" AND e.created_at >= ?");
            bindings.push(format_datetime(&since));
        }
        if let Some(until) = filter.until {
            query.push_str(" AND e.created_at < ?");
            bindings.push(format_datetime(&until));
        }

        query.push_str(" ORDER BY e.created_at, e.id");

        let mut q = sqlx::query_as::<_, OutcomeRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<OutcomeRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_events(&self, kind: Option<EventKind>) -> DomainResult<u64> {
        let (count,): (i64,) = match kind {
            Some(kind) => {
                sqlx::query_as("SELECT COUNT(*) FROM content_events WHERE kind = ?")
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM content_events")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn recent_summary(&self, days: u32) -> DomainResult<RecentSummary> {
        let since = Utc::now() - Duration::days(i64::from(days));
        let (posts, avg_engagement, avg_impressions, avg_followers, most_recent): (
            i64,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<String>,
        ) = sqlx::query_as(&format!(
            r#"SELECT COUNT(*),
                      AVG(COALESCE(m.engagement_rate, 0)),
                      AVG(COALESCE(m.impressions, 0)),
                      AVG(COALESCE(m.followers_gained, 0)),
                      MAX(e.created_at)
               FROM content_events e
               LEFT JOIN outcome_metrics m ON m.content_id = e.content_id
               WHERE {LATEST_POSTED} AND e.created_at > ?"#
        ))
        .bind(format_datetime(&since))
        .fetch_one(&self.pool)
        .await?;

        Ok(RecentSummary {
            window_days: days,
            posts: u64::try_from(posts).unwrap_or(0),
            avg_engagement_rate: avg_engagement.unwrap_or(0.0),
            avg_impressions: avg_impressions.unwrap_or(0.0),
            avg_followers_gained: avg_followers.unwrap_or(0.0),
            most_recent_post: parse_optional_datetime(most_recent)?,
        })
    }

    async fn verify_schema(&self) -> DomainResult<SchemaReport> {
        let events = self.table_columns("content_events").await?;
        let metrics = self.table_columns("outcome_metrics").await?;

        let missing_columns = ESSENTIAL_COLUMNS
            .iter()
            .filter(|(table, column)| {
                let columns = if *table == "content_events" { &events } else { &metrics };
                !columns.contains(*column)
            })
            .map(|(table, column)| format!("{table}.{column}"))
            .collect();

        let total_posts = if events.is_empty() {
            0
        } else {
            self.count_events(Some(EventKind::Posted)).await?
        };

        Ok(SchemaReport {
            missing_columns,
            total_posts,
        })
    }

    async fn store_snapshot(&self, kind: &str, key: &str, payload: &serde_json::Value) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO insight_snapshots (kind, key, payload, computed_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(kind, key) DO UPDATE SET
                   payload = excluded.payload,
                   computed_at = excluded.computed_at"#,
        )
        .bind(kind)
        .bind(key)
        .bind(serde_json::to_string(payload)?)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_snapshot(&self, kind: &str, key: &str) -> DomainResult<Option<(serde_json::Value, DateTime<Utc>)>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT payload, computed_at FROM insight_snapshots WHERE kind = ? AND key = ?")
                .bind(kind)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(payload, computed_at)| -> DomainResult<_> {
            Ok((serde_json::from_str(&payload)?, parse_datetime(&computed_at)?))
        })
        .transpose()
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    content_id: String,
    kind: String,
    topic: Option<String>,
    format: Option<String>,
    tone: Option<String>,
    generator: Option<String>,
    hook_pattern: Option<String>,
    model: Option<String>,
    cost_usd: Option<f64>,
    confidence: Option<f64>,
    time_slot: Option<String>,
    arm_key: Option<String>,
    exploration: bool,
    quality_scores: Option<String>,
    created_at: String,
}

impl TryFrom<EventRow> for ContentEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = EventKind::from_str(&row.kind)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid event kind: {}", row.kind)))?;

        Ok(ContentEvent {
            kind,
            content_id: row.content_id,
            topic: row.topic,
            format: row.format,
            tone: row.tone,
            generator: row.generator,
            hook_pattern: row.hook_pattern,
            model: row.model,
            cost_usd: row.cost_usd,
            confidence: row.confidence,
            time_slot: row.time_slot,
            arm_key: row.arm_key,
            exploration: row.exploration,
            quality_scores: parse_json_or_default(row.quality_scores)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MetricRow {
    content_id: String,
    likes: i64,
    shares: i64,
    replies: i64,
    bookmarks: i64,
    impressions: Option<i64>,
    followers_gained: Option<i64>,
    follower_count: Option<i64>,
    measured_at: String,
}

impl TryFrom<MetricRow> for OutcomeMetric {
    type Error = DomainError;

    fn try_from(row: MetricRow) -> Result<Self, Self::Error> {
        Ok(OutcomeMetric {
            content_id: row.content_id,
            likes: row.likes,
            shares: row.shares,
            replies: row.replies,
            bookmarks: row.bookmarks,
            impressions: row.impressions,
            followers_gained: row.followers_gained,
            follower_count: row.follower_count,
            measured_at: parse_datetime(&row.measured_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OutcomeRow {
    content_id: String,
    created_at: String,
    topic: Option<String>,
    format: Option<String>,
    tone: Option<String>,
    generator: Option<String>,
    hook_pattern: Option<String>,
    arm_key: Option<String>,
    likes: i64,
    impressions: Option<i64>,
    followers_gained: Option<i64>,
    engagement_rate: Option<f64>,
}

impl TryFrom<OutcomeRow> for OutcomeRecord {
    type Error = DomainError;

    fn try_from(row: OutcomeRow) -> Result<Self, Self::Error> {
        Ok(OutcomeRecord {
            content_id: row.content_id,
            posted_at: parse_datetime(&row.created_at)?,
            topic: row.topic,
            format: row.format,
            tone: row.tone,
            generator: row.generator,
            hook_pattern: row.hook_pattern,
            arm_key: row.arm_key,
            likes: row.likes,
            impressions: row.impressions,
            followers_gained: row.followers_gained,
            engagement_rate: row.engagement_rate,
        })
    }
}
