//! Bandit arms: keys, learned Beta posteriors and selection decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::dimension::Dimension;
use crate::domain::errors::{DomainError, DomainResult};

/// Separator between `field=value` segments of an arm key.
pub const ARM_KEY_SEPARATOR: char = '|';

// ---------------------------------------------------------------------------
// ArmKey
// ---------------------------------------------------------------------------

/// A validated arm key such as `"generator=X|tone=Y|format=Z"`.
///
/// The textual form is kept exactly as supplied (after trimming each
/// segment), so a key handed to [`ArmKey::parse`] round-trips unchanged.
/// [`ArmKey::from_fields`] produces the canonical ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArmKey {
    raw: String,
    fields: BTreeMap<String, String>,
}

impl ArmKey {
    /// Parse and validate an arm key.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let invalid = |reason: &str| DomainError::InvalidArmKey {
            key: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("key is empty"));
        }

        let mut fields = BTreeMap::new();
        let mut segments = Vec::new();
        for segment in trimmed.split(ARM_KEY_SEPARATOR) {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (field, value) = segment
                .split_once('=')
                .ok_or_else(|| invalid("segment is not of the form field=value"))?;
            let (field, value) = (field.trim(), value.trim());
            if field.is_empty() {
                return Err(invalid("segment has an empty field name"));
            }
            if value.is_empty() {
                return Err(invalid("segment has an empty value"));
            }
            if value.contains('=') {
                return Err(invalid("value contains '='"));
            }
            if fields.insert(field.to_string(), value.to_string()).is_some() {
                return Err(invalid("duplicate field"));
            }
            segments.push(format!("{field}={value}"));
        }

        Ok(Self {
            raw: segments.join(&ARM_KEY_SEPARATOR.to_string()),
            fields,
        })
    }

    /// Build a key from strategy fields using the canonical ordering:
    /// known dimensions first (generator, tone, format, topic, hook_pattern),
    /// then any other field alphabetically.
    pub fn from_fields<I, K, V>(fields: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.into().trim().to_string(), v.into().trim().to_string()))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| {
            let rank = |f: &str| {
                f.parse::<Dimension>()
                    .map(|d| d.canonical_rank())
                    .unwrap_or(Dimension::ALL.len())
            };
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });

        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(&ARM_KEY_SEPARATOR.to_string());
        Self::parse(&encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value of a single field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Value for a strategy dimension, if the key carries it.
    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        self.field(dimension.as_str())
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Decoded fields as a JSON object, stored as the arm's `meta`.
    pub fn meta(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl fmt::Display for ArmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ArmKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArmKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArmKey> for String {
    fn from(key: ArmKey) -> Self {
        key.raw
    }
}

// ---------------------------------------------------------------------------
// BetaDistribution
// ---------------------------------------------------------------------------

/// A Beta distribution parameterised by `alpha` and `beta`, the conjugate
/// prior for each arm's Bernoulli success rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaDistribution {
    /// Pseudo-successes (shape parameter).
    pub alpha: f64,
    /// Pseudo-failures (shape parameter).
    pub beta: f64,
}

impl BetaDistribution {
    /// A uniform (uninformative) prior: Beta(1, 1).
    pub const fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Posterior after `successes` out of `attempts` under the uniform prior.
    pub fn from_counts(successes: u64, attempts: u64) -> Self {
        let failures = attempts.saturating_sub(successes);
        Self::new(1.0 + successes as f64, 1.0 + failures as f64)
    }

    /// `alpha / (alpha + beta)`; 0.5 when the parameters are degenerate.
    pub fn mean(&self) -> f64 {
        let sum = self.alpha + self.beta;
        if sum <= 0.0 || !sum.is_finite() {
            return 0.5;
        }
        self.alpha / sum
    }

    pub fn variance(&self) -> f64 {
        let sum = self.alpha + self.beta;
        if sum <= 0.0 || !sum.is_finite() {
            return 0.0;
        }
        (self.alpha * self.beta) / (sum.powi(2) * (sum + 1.0))
    }
}

impl Default for BetaDistribution {
    fn default() -> Self {
        Self::uniform()
    }
}

// ---------------------------------------------------------------------------
// ArmStats
// ---------------------------------------------------------------------------

/// Learned statistics for one arm, as stored in the arm repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub arm_key: String,
    pub alpha: f64,
    pub beta: f64,
    pub successes: u64,
    pub attempts: u64,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ArmStats {
    /// A freshly created arm carrying the uniform prior.
    pub fn with_prior(key: &ArmKey) -> Self {
        let now = Utc::now();
        Self {
            arm_key: key.as_str().to_string(),
            alpha: 1.0,
            beta: 1.0,
            successes: 0,
            attempts: 0,
            meta: key.meta(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn posterior(&self) -> BetaDistribution {
        BetaDistribution::new(self.alpha, self.beta)
    }

    pub fn failures(&self) -> u64 {
        self.attempts.saturating_sub(self.successes)
    }

    /// Observed success rate; 0 for an arm never used.
    pub fn success_rate(&self) -> f64 {
        crate::domain::stats::safe_ratio(self.successes as f64, self.attempts as f64)
    }
}

// ---------------------------------------------------------------------------
// SelectionDecision
// ---------------------------------------------------------------------------

/// Audit record of one `select` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub id: Uuid,
    pub candidates: Vec<String>,
    pub chosen_arm: String,
    /// Winning posterior sample; `None` for single-candidate or fallback picks.
    pub sample: Option<f64>,
    /// True when storage failed and the arm was chosen uniformly at random.
    pub fallback: bool,
    pub selected_at: DateTime<Utc>,
}

impl SelectionDecision {
    pub fn new(candidates: Vec<String>, chosen_arm: String, sample: Option<f64>, fallback: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidates,
            chosen_arm,
            sample,
            fallback,
            selected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_key() {
        let key = ArmKey::parse("generator=gpt| tone=witty |format=thread").unwrap();
        assert_eq!(key.as_str(), "generator=gpt|tone=witty|format=thread");
        assert_eq!(key.dimension(Dimension::Tone), Some("witty"));
        assert_eq!(key.field("format"), Some("thread"));
        assert_eq!(key.dimension(Dimension::Topic), None);
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for bad in [
            "",
            "   ",
            "generator",
            "generator=",
            "=gpt",
            "generator=gpt||tone=dry",
            "generator=gpt|generator=claude",
            "generator=a=b",
        ] {
            let err = ArmKey::parse(bad).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidArmKey { .. }),
                "expected InvalidArmKey for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_from_fields_is_canonical() {
        let a = ArmKey::from_fields([("format", "thread"), ("tone", "dry"), ("generator", "gpt")]).unwrap();
        let b = ArmKey::from_fields([("generator", "gpt"), ("format", "thread"), ("tone", "dry")]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "generator=gpt|tone=dry|format=thread");

        let extra = ArmKey::from_fields([("slot", "am"), ("topic", "rust"), ("angle", "x")]).unwrap();
        assert_eq!(extra.as_str(), "topic=rust|angle=x|slot=am");
    }

    #[test]
    fn test_meta_contains_decoded_fields() {
        let key = ArmKey::parse("generator=gpt|tone=dry").unwrap();
        let meta = key.meta();
        assert_eq!(meta["generator"], "gpt");
        assert_eq!(meta["tone"], "dry");
    }

    #[test]
    fn test_beta_distribution_uniform() {
        let d = BetaDistribution::uniform();
        assert!((d.mean() - 0.5).abs() < f64::EPSILON);
        assert!((d.variance() - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_beta_from_counts_matches_prior_invariant() {
        let d = BetaDistribution::from_counts(7, 10);
        assert!((d.alpha - 8.0).abs() < f64::EPSILON);
        assert!((d.beta - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_arm_stats_with_prior() {
        let key = ArmKey::parse("generator=gpt").unwrap();
        let stats = ArmStats::with_prior(&key);
        assert_eq!(stats.posterior(), BetaDistribution::uniform());
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.failures(), 0);
    }
}
