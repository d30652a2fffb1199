//! Posterior sampling port for the bandit.

use crate::domain::errors::DomainResult;
use crate::domain::models::BetaDistribution;

/// Source of randomness for Thompson Sampling.
///
/// Kept behind a trait so selection can be driven by a seeded or scripted
/// sampler in tests.
pub trait PosteriorSampler: Send + Sync {
    /// Draw one sample from the posterior.
    fn sample(&self, posterior: &BetaDistribution) -> DomainResult<f64>;

    /// Uniform index in `0..len`. `len` is never zero.
    fn pick_index(&self, len: usize) -> usize;
}
