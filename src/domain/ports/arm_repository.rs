//! Arm statistics repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ArmKey, ArmStats, SelectionDecision};

/// Repository interface for learned arm statistics.
///
/// Implementations must make [`ArmRepository::increment`] a single atomic
/// operation at the storage layer: concurrent posts using the same arm may
/// complete at the same time and no in-process lock coordinates them.
#[async_trait]
pub trait ArmRepository: Send + Sync {
    /// Get an arm by key.
    async fn get(&self, arm_key: &str) -> DomainResult<Option<ArmStats>>;

    /// Get an arm, creating it with the `Beta(1,1)` prior when absent.
    async fn get_or_create(&self, key: &ArmKey) -> DomainResult<ArmStats>;

    /// Fetch or create every key, preserving order.
    async fn get_or_create_many(&self, keys: &[ArmKey]) -> DomainResult<Vec<ArmStats>> {
        let mut stats = Vec::with_capacity(keys.len());
        for key in keys {
            stats.push(self.get_or_create(key).await?);
        }
        Ok(stats)
    }

    /// Atomically add one attempt (and one success if `success`), creating
    /// the row with the prior when absent.
    async fn increment(&self, key: &ArmKey, success: bool) -> DomainResult<ArmStats>;

    /// Like [`ArmRepository::increment`], but applied at most once per
    /// `idempotency_key`. Returns `false` when the key was already applied.
    async fn increment_once(&self, key: &ArmKey, success: bool, idempotency_key: &str) -> DomainResult<bool>;

    /// Administrative reset back to the prior.
    async fn reset(&self, arm_key: &str) -> DomainResult<()>;

    /// All arms, best posterior mean first.
    async fn list(&self) -> DomainResult<Vec<ArmStats>>;

    /// Persist the audit record of a selection.
    async fn record_selection(&self, decision: &SelectionDecision) -> DomainResult<()>;
}
