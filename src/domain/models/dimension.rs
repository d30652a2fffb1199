//! Strategy dimensions and outcome measures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// An attribute of a content strategy whose values are analysed for impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Generator,
    Tone,
    Format,
    Topic,
    HookPattern,
}

impl Dimension {
    /// Every dimension, in canonical arm-key order.
    pub const ALL: [Dimension; 5] = [
        Self::Generator,
        Self::Tone,
        Self::Format,
        Self::Topic,
        Self::HookPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generator => "generator",
            Self::Tone => "tone",
            Self::Format => "format",
            Self::Topic => "topic",
            Self::HookPattern => "hook_pattern",
        }
    }

    /// Position in the canonical arm-key encoding.
    pub(crate) fn canonical_rank(&self) -> usize {
        Self::ALL.iter().position(|d| d == self).unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generator" | "generator_used" => Ok(Self::Generator),
            "tone" => Ok(Self::Tone),
            "format" => Ok(Self::Format),
            "topic" => Ok(Self::Topic),
            "hook_pattern" | "hook" => Ok(Self::HookPattern),
            _ => Err(DomainError::UnknownDimension(s.to_string())),
        }
    }
}

/// Parse a list of dimension names, rejecting the first unknown one.
pub fn parse_dimensions<S: AsRef<str>>(names: &[S]) -> Result<Vec<Dimension>, DomainError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

/// The column treated as the primary outcome measure during analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeMeasure {
    #[default]
    Impressions,
    EngagementRate,
    Likes,
    FollowersGained,
}

impl OutcomeMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impressions => "impressions",
            Self::EngagementRate => "engagement_rate",
            Self::Likes => "likes",
            Self::FollowersGained => "followers_gained",
        }
    }
}

impl fmt::Display for OutcomeMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
