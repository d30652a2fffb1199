//! Cached wrapper for ArmRepository using a moka TTL cache.
//!
//! Selection reads every candidate's posterior on each call, so posteriors
//! are cached for a short TTL. Every write through this decorator
//! invalidates the affected key; writes from other processes become visible
//! once the TTL expires.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ArmKey, ArmStats, SelectionDecision};
use crate::domain::ports::ArmRepository;

/// Default TTL for cached arm statistics.
const ARM_CACHE_TTL_SECS: u64 = 5;

/// Maximum number of cached arms.
const ARM_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Read-through cache decorator over any `ArmRepository`.
pub struct CachedArmRepository<A: ArmRepository> {
    inner: Arc<A>,
    /// Cache keyed by arm key -> ArmStats.
    by_key: Cache<String, Arc<ArmStats>>,
}

impl<A: ArmRepository> CachedArmRepository<A> {
    /// Create a new cached arm repository with default TTL.
    pub fn new(inner: Arc<A>) -> Self {
        Self::with_ttl(inner, Duration::from_secs(ARM_CACHE_TTL_SECS))
    }

    /// Create with custom TTL.
    pub fn with_ttl(inner: Arc<A>, ttl: Duration) -> Self {
        let by_key = Cache::builder()
            .max_capacity(ARM_CACHE_MAX_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self { inner, by_key }
    }

    async fn invalidate(&self, arm_key: &str) {
        self.by_key.invalidate(arm_key).await;
    }
}

#[async_trait]
impl<A: ArmRepository + 'static> ArmRepository for CachedArmRepository<A> {
    async fn get(&self, arm_key: &str) -> DomainResult<Option<ArmStats>> {
        if let Some(cached) = self.by_key.get(arm_key).await {
            return Ok(Some((*cached).clone()));
        }

        let result = self.inner.get(arm_key).await?;
        if let Some(ref stats) = result {
            self.by_key.insert(arm_key.to_string(), Arc::new(stats.clone())).await;
        }
        Ok(result)
    }

    async fn get_or_create(&self, key: &ArmKey) -> DomainResult<ArmStats> {
        if let Some(cached) = self.by_key.get(key.as_str()).await {
            return Ok((*cached).clone());
        }

        let stats = self.inner.get_or_create(key).await?;
        self.by_key.insert(key.to_string(), Arc::new(stats.clone())).await;
        Ok(stats)
    }

    async fn increment(&self, key: &ArmKey, success: bool) -> DomainResult<ArmStats> {
        let result = self.inner.increment(key, success).await;
        self.invalidate(key.as_str()).await;
        result
    }

    async fn increment_once(&self, key: &ArmKey, success: bool, idempotency_key: &str) -> DomainResult<bool> {
        let result = self.inner.increment_once(key, success, idempotency_key).await;
        self.invalidate(key.as_str()).await;
        result
    }

    async fn reset(&self, arm_key: &str) -> DomainResult<()> {
        let result = self.inner.reset(arm_key).await;
        self.invalidate(arm_key).await;
        result
    }

    async fn list(&self) -> DomainResult<Vec<ArmStats>> {
        self.inner.list().await
    }

    async fn record_selection(&self, decision: &SelectionDecision) -> DomainResult<()> {
        self.inner.record_selection(decision).await
    }
}
