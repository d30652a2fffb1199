//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters implement:
//! - ArmRepository: learned Beta posteriors per strategy arm
//! - OutcomeStore: content events, measured outcomes and cached insights
//! - PosteriorSampler: randomness behind Thompson Sampling
//!
//! These traits keep the services independent of the storage backend.

pub mod arm_repository;
pub mod outcome_store;
pub mod posterior_sampler;

pub use arm_repository::ArmRepository;
pub use outcome_store::OutcomeStore;
pub use posterior_sampler::PosteriorSampler;
