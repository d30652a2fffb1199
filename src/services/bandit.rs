//! Thompson Sampling strategy bandit.
//!
//! Each strategy arm carries a Beta posterior over its success rate. The
//! flow is:
//! 1. **Selection** (`BanditSelector::select`) draws one sample per
//!    candidate and picks the highest. Storage trouble degrades to a
//!    uniform pick so content production never blocks.
//! 2. **Outcome evaluation** (`is_success`) maps a measured engagement rate
//!    to a binary reward against a fixed threshold.
//! 3. **Update** (`BanditSelector::record_outcome`) applies one atomic
//!    increment in the arm repository.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArmKey, ArmStats, SelectionDecision};
use crate::domain::ports::{ArmRepository, OutcomeStore, PosteriorSampler};

/// Whether an engagement rate counts as a success for the arm.
pub fn is_success(engagement_rate: f64, threshold: f64) -> bool {
    engagement_rate.is_finite() && engagement_rate >= threshold
}

/// Result of applying a measured outcome to its arm.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOutcome {
    pub arm_key: String,
    pub success: bool,
    pub engagement_rate: f64,
    /// False when this content id had already been applied.
    pub applied: bool,
}

pub struct BanditSelector {
    arms: Arc<dyn ArmRepository>,
    sampler: Arc<dyn PosteriorSampler>,
    success_threshold: f64,
}

impl BanditSelector {
    pub fn new(arms: Arc<dyn ArmRepository>, sampler: Arc<dyn PosteriorSampler>, success_threshold: f64) -> Self {
        Self {
            arms,
            sampler,
            success_threshold,
        }
    }

    pub fn success_threshold(&self) -> f64 {
        self.success_threshold
    }

    /// Pick the arm to use next.
    ///
    /// Malformed keys and an empty candidate set are rejected. Duplicates
    /// are collapsed, keeping the first occurrence. Any storage or sampling
    /// failure falls back to a uniform random choice.
    pub async fn select<S: AsRef<str>>(&self, candidates: &[S]) -> DomainResult<String> {
        let keys = parse_candidates(candidates)?;

        if keys.len() == 1 {
            return Ok(keys[0].to_string());
        }

        let (chosen, sample, fallback) = match self.sample_best(&keys).await {
            Ok((index, sample)) => (index, Some(sample), false),
            Err(err) => {
                warn!(error = %err, candidates = keys.len(), "Arm statistics unavailable, choosing uniformly");
                (self.sampler.pick_index(keys.len()), None, true)
            }
        };

        let decision = SelectionDecision::new(
            keys.iter().map(ToString::to_string).collect(),
            keys[chosen].to_string(),
            sample,
            fallback,
        );
        info!(
            decision_id = %decision.id,
            chosen_arm = %decision.chosen_arm,
            sample = ?decision.sample,
            fallback,
            candidates = ?decision.candidates,
            "Selected strategy arm"
        );
        if let Err(err) = self.arms.record_selection(&decision).await {
            warn!(error = %err, decision_id = %decision.id, "Failed to persist selection audit record");
        }

        Ok(decision.chosen_arm)
    }

    async fn sample_best(&self, keys: &[ArmKey]) -> DomainResult<(usize, f64)> {
        let stats = self.arms.get_or_create_many(keys).await?;

        let mut best: Option<(usize, f64)> = None;
        for (index, arm) in stats.iter().enumerate() {
            let sample = self.sampler.sample(&arm.posterior())?;
            debug!(arm_key = %arm.arm_key, alpha = arm.alpha, beta = arm.beta, sample, "Sampled posterior");
            if best.map_or(true, |(_, top)| sample > top) {
                best = Some((index, sample));
            }
        }

        best.ok_or(DomainError::EmptyCandidateSet)
    }

    /// Record a binary outcome for an arm.
    ///
    /// Storage errors are returned so the caller can retry; a retry after a
    /// timeout may count twice. Use [`BanditSelector::record_outcome_once`]
    /// when a stable idempotency key exists.
    pub async fn record_outcome(&self, arm_key: &str, success: bool) -> DomainResult<ArmStats> {
        let key = ArmKey::parse(arm_key)?;
        let stats = self.arms.increment(&key, success).await?;
        info!(
            arm_key = %key,
            success,
            attempts = stats.attempts,
            successes = stats.successes,
            "Recorded arm outcome"
        );
        Ok(stats)
    }

    /// Record an outcome at most once per `idempotency_key`.
    pub async fn record_outcome_once(&self, arm_key: &str, success: bool, idempotency_key: &str) -> DomainResult<bool> {
        let key = ArmKey::parse(arm_key)?;
        let applied = self.arms.increment_once(&key, success, idempotency_key).await?;
        if applied {
            info!(arm_key = %key, success, idempotency_key, "Recorded arm outcome");
        } else {
            debug!(arm_key = %key, idempotency_key, "Outcome already applied");
        }
        Ok(applied)
    }

    /// Apply the measured outcome of a posted content id to the arm that
    /// produced it. Returns `None` while the post has no arm, no metric, or
    /// a metric without impressions; nothing is applied in those cases.
    pub async fn record_content_outcome(
        &self,
        store: &dyn OutcomeStore,
        content_id: &str,
    ) -> DomainResult<Option<AppliedOutcome>> {
        let Some(event) = store.find_posted_event(content_id).await? else {
            return Err(DomainError::ContentNotFound(content_id.to_string()));
        };
        let Some(arm_key) = event.arm_key else {
            debug!(content_id, "Posted content has no arm key");
            return Ok(None);
        };
        let Some(metric) = store.get_metric(content_id).await? else {
            debug!(content_id, "No outcome metric yet");
            return Ok(None);
        };
        if metric.impressions.is_none() {
            debug!(content_id, "Outcome metric has no impressions yet");
            return Ok(None);
        }

        let engagement_rate = metric.engagement_rate();
        let success = is_success(engagement_rate, self.success_threshold);
        let applied = self.record_outcome_once(&arm_key, success, content_id).await?;

        Ok(Some(AppliedOutcome {
            arm_key,
            success,
            engagement_rate,
            applied,
        }))
    }

    /// Administrative reset of an arm back to the prior.
    pub async fn reset_arm(&self, arm_key: &str) -> DomainResult<()> {
        let key = ArmKey::parse(arm_key)?;
        self.arms.reset(key.as_str()).await?;
        warn!(arm_key = %key, "Arm reset to prior");
        Ok(())
    }

    pub async fn arm_stats(&self, arm_key: &str) -> DomainResult<Option<ArmStats>> {
        let key = ArmKey::parse(arm_key)?;
        self.arms.get(key.as_str()).await
    }

    pub async fn list_arms(&self) -> DomainResult<Vec<ArmStats>> {
        self.arms.list().await
    }
}

fn parse_candidates<S: AsRef<str>>(candidates: &[S]) -> DomainResult<Vec<ArmKey>> {
    let mut keys: Vec<ArmKey> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let key = ArmKey::parse(candidate.as_ref())?;
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        return Err(DomainError::EmptyCandidateSet);
    }
    Ok(keys)
}
