//! Content events, measured outcomes and the joined rows analysis reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dimension::{Dimension, OutcomeMeasure};
use crate::domain::stats::safe_ratio;

/// What happened to a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Generated,
    Posted,
    Skipped,
    Failed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Posted => "posted",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generated" => Some(Self::Generated),
            "posted" => Some(Self::Posted),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One production or posting action. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEvent {
    pub kind: EventKind,
    pub content_id: String,
    pub topic: Option<String>,
    pub format: Option<String>,
    pub tone: Option<String>,
    pub generator: Option<String>,
    pub hook_pattern: Option<String>,
    pub model: Option<String>,
    pub cost_usd: Option<f64>,
    pub confidence: Option<f64>,
    pub time_slot: Option<String>,
    /// Links a later outcome back to the arm that produced the content.
    pub arm_key: Option<String>,
    pub exploration: bool,
    /// Quality-gate sub-scores by gate name.
    pub quality_scores: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl ContentEvent {
    pub fn new(kind: EventKind, content_id: impl Into<String>) -> Self {
        Self {
            kind,
            content_id: content_id.into(),
            topic: None,
            format: None,
            tone: None,
            generator: None,
            hook_pattern: None,
            model: None,
            cost_usd: None,
            confidence: None,
            time_slot: None,
            arm_key: None,
            exploration: false,
            quality_scores: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Set a dimension value.
    #[must_use]
    pub fn with_dimension(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match dimension {
            Dimension::Topic => self.topic = value,
            Dimension::Format => self.format = value,
            Dimension::Tone => self.tone = value,
            Dimension::Generator => self.generator = value,
            Dimension::HookPattern => self.hook_pattern = value,
        }
        self
    }

    #[must_use]
    pub fn with_arm_key(mut self, arm_key: impl Into<String>) -> Self {
        self.arm_key = Some(arm_key.into());
        self
    }

    #[must_use]
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Measured result for one content id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMetric {
    pub content_id: String,
    pub likes: i64,
    pub shares: i64,
    pub replies: i64,
    pub bookmarks: i64,
    pub impressions: Option<i64>,
    pub followers_gained: Option<i64>,
    /// Account follower count when the metric was taken.
    pub follower_count: Option<i64>,
    pub measured_at: DateTime<Utc>,
}

impl OutcomeMetric {
    pub fn new(content_id: impl Into<String>, impressions: i64) -> Self {
        Self {
            content_id: content_id.into(),
            likes: 0,
            shares: 0,
            replies: 0,
            bookmarks: 0,
            impressions: Some(impressions),
            followers_gained: None,
            follower_count: None,
            measured_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_engagement(mut self, likes: i64, shares: i64, replies: i64, bookmarks: i64) -> Self {
        self.likes = likes;
        self.shares = shares;
        self.replies = replies;
        self.bookmarks = bookmarks;
        self
    }

    pub fn engagements(&self) -> i64 {
        self.likes + self.shares + self.replies + self.bookmarks
    }

    /// Engagements per impression. Derived, never stored as an input.
    pub fn engagement_rate(&self) -> f64 {
        safe_ratio(self.engagements() as f64, self.impressions.unwrap_or(0) as f64)
    }

    /// Impressions per follower at measurement time.
    pub fn reach_efficiency(&self) -> f64 {
        safe_ratio(
            self.impressions.unwrap_or(0) as f64,
            self.follower_count.unwrap_or(0) as f64,
        )
    }
}

/// A posted event joined to its measured outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub content_id: String,
    pub posted_at: DateTime<Utc>,
    pub topic: Option<String>,
    pub format: Option<String>,
    pub tone: Option<String>,
    pub generator: Option<String>,
    pub hook_pattern: Option<String>,
    pub arm_key: Option<String>,
    pub likes: i64,
    pub impressions: Option<i64>,
    pub followers_gained: Option<i64>,
    pub engagement_rate: Option<f64>,
}

impl OutcomeRecord {
    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Topic => self.topic.as_deref(),
            Dimension::Format => self.format.as_deref(),
            Dimension::Tone => self.tone.as_deref(),
            Dimension::Generator => self.generator.as_deref(),
            Dimension::HookPattern => self.hook_pattern.as_deref(),
        }
        .filter(|v| !v.is_empty())
    }

    /// The chosen outcome measure, `None` when it was never measured.
    pub fn measure(&self, measure: OutcomeMeasure) -> Option<f64> {
        match measure {
            OutcomeMeasure::Impressions => self.impressions.map(|v| v as f64),
            OutcomeMeasure::EngagementRate => self.engagement_rate,
            OutcomeMeasure::Likes => self.impressions.map(|_| self.likes as f64),
            OutcomeMeasure::FollowersGained => self.followers_gained.map(|v| v as f64),
        }
        .filter(|v| v.is_finite())
    }
}

/// Filter for fetching content events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Filter for fetching joined outcome rows.
#[derive(Debug, Clone, Default)]
pub struct OutcomeFilter {
    /// Only rows with a non-empty value for this dimension.
    pub dimension: Option<Dimension>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OutcomeFilter {
    pub fn for_dimension(dimension: Dimension) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }
}

/// Summary statistics over posts in a recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSummary {
    pub window_days: u32,
    pub posts: u64,
    pub avg_engagement_rate: f64,
    pub avg_impressions: f64,
    pub avg_followers_gained: f64,
    pub most_recent_post: Option<DateTime<Utc>>,
}

/// Outcome of checking the store for the columns analysis depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub missing_columns: Vec<String>,
    pub total_posts: u64,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.missing_columns.is_empty()
    }
}
