//! Results of the temporal momentum analysis.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::config::MomentumThresholds;
use super::dimension::Dimension;

/// Start of the calendar week containing `at`: the most recent Sunday at or
/// before it, in UTC.
pub fn week_start(at: DateTime<Utc>) -> NaiveDate {
    let date = at.date_naive();
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Direction of a value's weekly averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MomentumStatus {
    Accelerating,
    Growing,
    Stable,
    Declining,
    Dead,
}

impl MomentumStatus {
    pub fn classify(growth: f64, thresholds: &MomentumThresholds) -> Self {
        if growth > thresholds.accelerating {
            Self::Accelerating
        } else if growth > thresholds.growing {
            Self::Growing
        } else if growth > thresholds.stable {
            Self::Stable
        } else if growth > thresholds.declining {
            Self::Declining
        } else {
            Self::Dead
        }
    }

    pub fn is_fading(&self) -> bool {
        matches!(self, Self::Declining | Self::Dead)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerating => "ACCELERATING",
            Self::Growing => "GROWING",
            Self::Stable => "STABLE",
            Self::Declining => "DECLINING",
            Self::Dead => "DEAD",
        }
    }
}

/// One calendar week of outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_start: NaiveDate,
    pub uses: usize,
    pub average: f64,
}

/// Momentum of a single dimension value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorMomentum {
    pub dimension: Dimension,
    pub value: String,
    /// Ordered oldest first.
    pub weekly: Vec<WeeklyBucket>,
    pub total_uses: usize,
    pub growth: f64,
    pub status: MomentumStatus,
}

/// Direction of the whole account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTrend {
    Growing,
    Flat,
    Declining,
}

impl AccountTrend {
    pub fn classify(growth: f64, cutoff: f64) -> Self {
        if growth > cutoff {
            Self::Growing
        } else if growth < -cutoff {
            Self::Declining
        } else {
            Self::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Growing => "GROWING",
            Self::Flat => "FLAT",
            Self::Declining => "DECLINING",
        }
    }
}

/// Account-level growth over the unfiltered outcome stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountGrowth {
    pub weekly: Vec<WeeklyBucket>,
    pub trend: AccountTrend,
    pub growth_rate: f64,
}

impl AccountGrowth {
    pub fn empty() -> Self {
        Self {
            weekly: Vec::new(),
            trend: AccountTrend::Flat,
            growth_rate: 0.0,
        }
    }
}

/// Values gaining or losing momentum across several dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergingSignals {
    pub rising: Vec<FactorMomentum>,
    pub fading: Vec<FactorMomentum>,
    /// Thinly sampled values with strong growth. Flagged, not yet trusted.
    pub new_entrants: Vec<FactorMomentum>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_week_start_is_sunday() {
        // 2024-03-13 is a Wednesday; its week starts Sunday 2024-03-10.
        let wed = Utc.with_ymd_and_hms(2024, 3, 13, 15, 30, 0).unwrap();
        assert_eq!(week_start(wed), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let sunday = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let saturday = Utc.with_ymd_and_hms(2024, 3, 16, 23, 59, 59).unwrap();
        assert_eq!(week_start(saturday), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn test_status_thresholds() {
        let t = MomentumThresholds::default();
        assert_eq!(MomentumStatus::classify(150.0, &t), MomentumStatus::Accelerating);
        assert_eq!(MomentumStatus::classify(100.0, &t), MomentumStatus::Growing);
        assert_eq!(MomentumStatus::classify(20.0, &t), MomentumStatus::Stable);
        assert_eq!(MomentumStatus::classify(0.0, &t), MomentumStatus::Stable);
        assert_eq!(MomentumStatus::classify(-20.0, &t), MomentumStatus::Declining);
        assert_eq!(MomentumStatus::classify(-50.0, &t), MomentumStatus::Dead);
        assert_eq!(MomentumStatus::classify(-90.0, &t), MomentumStatus::Dead);
    }

    #[test]
    fn test_account_trend() {
        assert_eq!(AccountTrend::classify(25.0, 20.0), AccountTrend::Growing);
        assert_eq!(AccountTrend::classify(20.0, 20.0), AccountTrend::Flat);
        assert_eq!(AccountTrend::classify(-20.0, 20.0), AccountTrend::Flat);
        assert_eq!(AccountTrend::classify(-25.0, 20.0), AccountTrend::Declining);
    }
}
