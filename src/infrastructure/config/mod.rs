//! Configuration loading.
//!
//! Defaults, then project YAML files, then `STRATEGIST_*` environment
//! variables, merged with figment and validated before use.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
