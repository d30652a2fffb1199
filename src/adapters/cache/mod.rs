//! In-memory caching layer for hot-path repository reads.
//!
//! Uses `moka` for TTL-based concurrent caching with write-through
//! invalidation. Wraps repository traits as decorators.

pub mod cached_arm_repository;

pub use cached_arm_repository::CachedArmRepository;
