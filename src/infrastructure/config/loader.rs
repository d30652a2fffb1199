use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid success_threshold: {0}. Must be within [0, 1]")]
    InvalidSuccessThreshold(f64),

    #[error("Invalid {name} thresholds: upper ({upper}) must exceed lower ({lower})")]
    InvalidThresholdOrder { name: &'static str, upper: f64, lower: f64 },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .strategist/config.yaml
    /// 3. .strategist/local.yaml (optional local overrides)
    /// 4. Environment variables (STRATEGIST_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".strategist/config.yaml"))
            .merge(Yaml::file(".strategist/local.yaml"))
            .merge(Env::prefixed("STRATEGIST_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let threshold = config.bandit.success_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSuccessThreshold(threshold));
        }

        let analysis = &config.analysis;
        ordered("variance", analysis.variance.high, analysis.variance.medium)?;
        ordered(
            "reliability",
            analysis.reliability.medium_below,
            analysis.reliability.high_below,
        )?;
        ordered("momentum accelerating/growing", analysis.momentum.accelerating, analysis.momentum.growing)?;
        ordered("momentum growing/stable", analysis.momentum.growing, analysis.momentum.stable)?;
        ordered("momentum stable/declining", analysis.momentum.stable, analysis.momentum.declining)?;
        ordered(
            "readiness",
            analysis.readiness.ready_for_optimization as f64,
            analysis.readiness.patterns_emerging as f64,
        )?;

        if analysis.trend_cutoff < 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "trend_cutoff must not be negative, got {}",
                analysis.trend_cutoff
            )));
        }

        if analysis.tracked_dimensions.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "analysis.tracked_dimensions cannot be empty".to_string(),
            ));
        }

        if analysis.samples.momentum_min_weeks < 2 {
            return Err(ConfigError::ValidationFailed(format!(
                "momentum_min_weeks must be at least 2, got {}",
                analysis.samples.momentum_min_weeks
            )));
        }

        Ok(())
    }
}

fn ordered(name: &'static str, upper: f64, lower: f64) -> Result<(), ConfigError> {
    if upper > lower {
        Ok(())
    } else {
        Err(ConfigError::InvalidThresholdOrder { name, upper, lower })
    }
}
