//! Beta posterior sampling for Thompson Sampling.
//!
//! Draws come from `statrs`'s Beta distribution, which samples two Gamma
//! variates with the Marsaglia-Tsang method and returns `x / (x + y)`.
//! That stays exact for shapes below one, where power-of-uniform shortcuts
//! are biased.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Beta;
use std::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::BetaDistribution;
use crate::domain::ports::PosteriorSampler;

/// Production sampler backed by a seedable RNG.
pub struct ThompsonSampler {
    rng: Mutex<StdRng>,
}

impl ThompsonSampler {
    /// Sampler seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampler for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned lock only means another sampler call panicked mid-draw;
        // the RNG state itself is still usable.
        let mut guard = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

impl Default for ThompsonSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PosteriorSampler for ThompsonSampler {
    fn sample(&self, posterior: &BetaDistribution) -> DomainResult<f64> {
        let beta = Beta::new(posterior.alpha, posterior.beta).map_err(|e| {
            DomainError::SamplingFailed(format!(
                "Beta({}, {}) is not a valid distribution: {e}",
                posterior.alpha, posterior.beta
            ))
        })?;
        Ok(self.with_rng(|rng| rng.sample(beta)))
    }

    fn pick_index(&self, len: usize) -> usize {
        self.with_rng(|rng| rng.gen_range(0..len.max(1)))
    }
}
