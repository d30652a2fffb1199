//! Temporal momentum detection.
//!
//! Outcomes are bucketed into calendar weeks (starting Sunday, UTC). Growth
//! is the percentage change from the first weekly average to the last one;
//! weeks without posts are absent from the series.

use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::{
    week_start, AccountGrowth, AccountTrend, AnalysisConfig, Dimension, EmergingSignals, FactorMomentum,
    MomentumStatus, OutcomeFilter, OutcomeMeasure, OutcomeRecord, SampleThresholds, WeeklyBucket,
};
use crate::domain::ports::OutcomeStore;
use crate::domain::stats::{growth_percent, mean};

pub struct MomentumDetector {
    store: Arc<dyn OutcomeStore>,
    config: AnalysisConfig,
}

impl MomentumDetector {
    pub fn new(store: Arc<dyn OutcomeStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// Momentum of every sufficiently sampled value of `dimension`, fastest
    /// growing first. Storage failures yield an empty list.
    pub async fn momentum(&self, dimension: Dimension) -> Vec<FactorMomentum> {
        match self.store.fetch_outcomes(OutcomeFilter::for_dimension(dimension)).await {
            Ok(records) => {
                let momentum = compute_momentum(&records, dimension, self.config.measure, &self.config);
                debug!(%dimension, rows = records.len(), values = momentum.len(), "Computed momentum");
                momentum
            }
            Err(err) => {
                warn!(%dimension, error = %err, "Outcome store unavailable, returning empty momentum");
                Vec::new()
            }
        }
    }

    /// Weekly trend of the whole account.
    pub async fn account_growth(&self) -> AccountGrowth {
        match self.store.fetch_outcomes(OutcomeFilter::default()).await {
            Ok(records) => compute_account_growth(&records, self.config.measure, &self.config),
            Err(err) => {
                warn!(error = %err, "Outcome store unavailable, reporting flat account growth");
                AccountGrowth::empty()
            }
        }
    }

    /// Rising, fading and newly emerging values across `dimensions`.
    pub async fn detect_emerging(&self, dimensions: &[Dimension]) -> EmergingSignals {
        let per_dimension = join_all(dimensions.iter().map(|&d| self.momentum(d))).await;
        classify_emerging(per_dimension.into_iter().flatten(), &self.config.samples)
    }
}

/// Bucket `(timestamp, outcome)` pairs into weeks, oldest first.
fn weekly_series<'a>(rows: impl Iterator<Item = (&'a OutcomeRecord, f64)>) -> Vec<WeeklyBucket> {
    let mut weeks: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (record, outcome) in rows {
        weeks.entry(week_start(record.posted_at)).or_default().push(outcome);
    }
    weeks
        .into_iter()
        .map(|(week_start, values)| WeeklyBucket {
            week_start,
            uses: values.len(),
            average: mean(&values),
        })
        .collect()
}

fn series_growth(weekly: &[WeeklyBucket]) -> f64 {
    match (weekly.first(), weekly.last()) {
        (Some(first), Some(last)) if weekly.len() >= 2 => growth_percent(first.average, last.average),
        _ => 0.0,
    }
}

pub(crate) fn compute_momentum(
    records: &[OutcomeRecord],
    dimension: Dimension,
    measure: OutcomeMeasure,
    config: &AnalysisConfig,
) -> Vec<FactorMomentum> {
    let mut by_value: BTreeMap<&str, Vec<(&OutcomeRecord, f64)>> = BTreeMap::new();
    for record in records {
        if let (Some(value), Some(outcome)) = (record.dimension_value(dimension), record.measure(measure)) {
            by_value.entry(value).or_default().push((record, outcome));
        }
    }

    let mut momentum: Vec<FactorMomentum> = by_value
        .into_iter()
        .filter(|(_, rows)| rows.len() >= config.samples.momentum_min_uses)
        .filter_map(|(value, rows)| {
            let total_uses = rows.len();
            let weekly = weekly_series(rows.into_iter());
            if weekly.len() < config.samples.momentum_min_weeks {
                return None;
            }
            let growth = series_growth(&weekly);
            Some(FactorMomentum {
                dimension,
                value: value.to_string(),
                weekly,
                total_uses,
                growth,
                status: MomentumStatus::classify(growth, &config.momentum),
            })
        })
        .collect();

    momentum.sort_by(|a, b| b.growth.total_cmp(&a.growth).then_with(|| a.value.cmp(&b.value)));
    momentum
}

pub(crate) fn compute_account_growth(
    records: &[OutcomeRecord],
    measure: OutcomeMeasure,
    config: &AnalysisConfig,
) -> AccountGrowth {
    let weekly = weekly_series(records.iter().filter_map(|r| r.measure(measure).map(|o| (r, o))));
    if weekly.len() < 2 {
        return AccountGrowth {
            weekly,
            ..AccountGrowth::empty()
        };
    }
    let growth_rate = series_growth(&weekly);
    AccountGrowth {
        weekly,
        trend: AccountTrend::classify(growth_rate, config.trend_cutoff),
        growth_rate,
    }
}

pub(crate) fn classify_emerging(
    momentum: impl IntoIterator<Item = FactorMomentum>,
    samples: &SampleThresholds,
) -> EmergingSignals {
    let mut signals = EmergingSignals::default();
    for entry in momentum {
        if entry.total_uses < samples.new_entrant_max_uses && entry.growth > samples.new_entrant_min_growth {
            signals.new_entrants.push(entry.clone());
        }
        if entry.status == MomentumStatus::Accelerating {
            signals.rising.push(entry);
        } else if entry.status.is_fading() {
            signals.fading.push(entry);
        }
    }

    signals.rising.sort_by(|a, b| b.growth.total_cmp(&a.growth));
    signals.fading.sort_by(|a, b| a.growth.total_cmp(&b.growth));
    signals.new_entrants.sort_by(|a, b| b.growth.total_cmp(&a.growth));
    signals
}
