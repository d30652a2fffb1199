//! Factor variance analysis.
//!
//! Ranks strategy dimensions by how much their values move the primary
//! outcome measure: group qualifying rows by value, average each group, then
//! take the population variance of those averages. A dimension whose values
//! all perform alike explains nothing, however good they are.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AnalysisConfig, Dimension, FactorAggregate, FactorImportance, ImpactTier, OutcomeFilter, OutcomeMeasure,
    OutcomeRecord, ReliabilityTier, Synergy,
};
use crate::domain::ports::OutcomeStore;
use crate::domain::stats::{mean, percent_shares, population_variance, safe_ratio, std_dev};

pub struct VarianceAnalyzer {
    store: Arc<dyn OutcomeStore>,
    config: AnalysisConfig,
}

impl VarianceAnalyzer {
    pub fn new(store: Arc<dyn OutcomeStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// Rank `dimensions` by the variance of their per-value means.
    ///
    /// Duplicate dimensions are ignored. Storage failures yield an empty
    /// ranking.
    pub async fn importance(&self, dimensions: &[Dimension]) -> Vec<FactorImportance> {
        let Some(records) = self.load(OutcomeFilter::default(), "importance").await else {
            return Vec::new();
        };
        rank_importance(&records, dimensions, self.config.measure, &self.config)
    }

    /// Per-value aggregates of one dimension, best average first.
    pub async fn aggregates(&self, dimension: Dimension) -> Vec<FactorAggregate> {
        let Some(records) = self.load(OutcomeFilter::for_dimension(dimension), "aggregates").await else {
            return Vec::new();
        };
        aggregate_values(&records, dimension, self.config.measure, &self.config)
    }

    /// Value combinations across two or three dimensions that beat the
    /// overall average by at least the configured lift.
    pub async fn synergies(&self, dimensions: &[Dimension], min_uses: Option<usize>) -> DomainResult<Vec<Synergy>> {
        validate_synergy_dimensions(dimensions)?;
        let Some(records) = self.load(OutcomeFilter::default(), "synergies").await else {
            return Ok(Vec::new());
        };
        let min_uses = min_uses.unwrap_or(self.config.synergy.min_uses).max(1);
        Ok(find_synergies(
            &records,
            dimensions,
            self.config.measure,
            min_uses,
            self.config.synergy.min_lift,
        ))
    }

    async fn load(&self, filter: OutcomeFilter, operation: &str) -> Option<Vec<OutcomeRecord>> {
        match self.store.fetch_outcomes(filter).await {
            Ok(records) => {
                debug!(operation, rows = records.len(), "Loaded outcome rows");
                Some(records)
            }
            Err(err) => {
                warn!(operation, error = %err, "Outcome store unavailable, returning empty analysis");
                None
            }
        }
    }
}

/// `(value, measure)` pairs for rows that carry both.
fn qualifying<'a>(
    records: &'a [OutcomeRecord],
    dimension: Dimension,
    measure: OutcomeMeasure,
) -> impl Iterator<Item = (&'a str, &'a OutcomeRecord, f64)> + 'a {
    records.iter().filter_map(move |r| {
        let value = r.dimension_value(dimension)?;
        let outcome = r.measure(measure)?;
        Some((value, r, outcome))
    })
}

pub(crate) fn rank_importance(
    records: &[OutcomeRecord],
    dimensions: &[Dimension],
    measure: OutcomeMeasure,
    config: &AnalysisConfig,
) -> Vec<FactorImportance> {
    let mut seen = BTreeSet::new();
    let dimensions: Vec<Dimension> = dimensions.iter().copied().filter(|d| seen.insert(*d)).collect();

    let mut rows: Vec<(Dimension, f64, usize, usize)> = dimensions
        .iter()
        .map(|&dimension| {
            let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            let mut samples = 0;
            for (value, _, outcome) in qualifying(records, dimension, measure) {
                groups.entry(value).or_default().push(outcome);
                samples += 1;
            }
            let group_means: Vec<f64> = groups.values().map(|g| mean(g)).collect();
            (dimension, population_variance(&group_means), groups.len(), samples)
        })
        .collect();

    let variances: Vec<f64> = rows.iter().map(|(_, v, _, _)| *v).collect();
    let shares = percent_shares(&variances);

    let mut ranked: Vec<FactorImportance> = rows
        .drain(..)
        .zip(shares)
        .map(|((dimension, variance, values, samples), percent_explained)| FactorImportance {
            dimension,
            variance,
            percent_explained,
            impact: ImpactTier::classify(variance, config.variance.high, config.variance.medium),
            values,
            samples,
        })
        .collect();

    ranked.sort_by(|a, b| b.variance.total_cmp(&a.variance).then(a.dimension.cmp(&b.dimension)));
    ranked
}

pub(crate) fn aggregate_values(
    records: &[OutcomeRecord],
    dimension: Dimension,
    measure: OutcomeMeasure,
    config: &AnalysisConfig,
) -> Vec<FactorAggregate> {
    let mut groups: BTreeMap<&str, Vec<(&OutcomeRecord, f64)>> = BTreeMap::new();
    for (value, record, outcome) in qualifying(records, dimension, measure) {
        groups.entry(value).or_default().push((record, outcome));
    }

    let mut aggregates: Vec<FactorAggregate> = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() >= config.samples.aggregate_min_uses)
        .map(|(value, rows)| {
            let outcomes: Vec<f64> = rows.iter().map(|(_, o)| *o).collect();
            let impressions: Vec<f64> = rows.iter().filter_map(|(r, _)| r.impressions.map(|v| v as f64)).collect();
            let engagement: Vec<f64> = rows.iter().filter_map(|(r, _)| r.engagement_rate).collect();
            let likes: Vec<f64> = rows.iter().map(|(r, _)| r.likes as f64).collect();
            let followers: Vec<f64> = rows.iter().filter_map(|(r, _)| r.followers_gained.map(|v| v as f64)).collect();
            let distinct = |d: Dimension| {
                rows.iter()
                    .filter_map(|(r, _)| r.dimension_value(d))
                    .collect::<BTreeSet<_>>()
                    .len()
            };
            let spread = std_dev(&outcomes);

            FactorAggregate {
                dimension,
                value: value.to_string(),
                uses: rows.len(),
                avg_outcome: mean(&outcomes),
                avg_impressions: mean(&impressions),
                avg_engagement_rate: mean(&engagement),
                avg_likes: mean(&likes),
                avg_followers_gained: mean(&followers),
                distinct_topics: distinct(Dimension::Topic),
                distinct_formats: distinct(Dimension::Format),
                distinct_tones: distinct(Dimension::Tone),
                distinct_generators: distinct(Dimension::Generator),
                std_dev: spread,
                reliability: ReliabilityTier::classify(
                    spread,
                    config.reliability.high_below,
                    config.reliability.medium_below,
                ),
            }
        })
        .collect();

    aggregates.sort_by(|a, b| b.avg_outcome.total_cmp(&a.avg_outcome).then_with(|| a.value.cmp(&b.value)));
    aggregates
}

fn validate_synergy_dimensions(dimensions: &[Dimension]) -> DomainResult<()> {
    if !(2..=3).contains(&dimensions.len()) {
        return Err(DomainError::ValidationFailed(format!(
            "synergy analysis needs 2 or 3 dimensions, got {}",
            dimensions.len()
        )));
    }
    let unique: BTreeSet<_> = dimensions.iter().collect();
    if unique.len() != dimensions.len() {
        return Err(DomainError::ValidationFailed(
            "synergy dimensions must be distinct".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn find_synergies(
    records: &[OutcomeRecord],
    dimensions: &[Dimension],
    measure: OutcomeMeasure,
    min_uses: usize,
    min_lift: f64,
) -> Vec<Synergy> {
    // Baseline is every measured row, whether or not it carries all dimensions.
    let outcomes: Vec<f64> = records.iter().filter_map(|r| r.measure(measure)).collect();
    let baseline = mean(&outcomes);

    let mut combos: BTreeMap<Vec<&str>, Vec<f64>> = BTreeMap::new();
    for record in records {
        let Some(outcome) = record.measure(measure) else {
            continue;
        };
        let values: Option<Vec<&str>> = dimensions.iter().map(|&d| record.dimension_value(d)).collect();
        if let Some(values) = values {
            combos.entry(values).or_default().push(outcome);
        }
    }

    let mut synergies: Vec<Synergy> = combos
        .into_iter()
        .filter(|(_, rows)| rows.len() >= min_uses)
        .filter_map(|(values, rows)| {
            let avg_outcome = mean(&rows);
            let lift = safe_ratio(avg_outcome, baseline);
            (baseline > 0.0 && lift >= min_lift).then(|| Synergy {
                values: dimensions
                    .iter()
                    .copied()
                    .zip(values.into_iter().map(str::to_string))
                    .collect(),
                uses: rows.len(),
                avg_outcome,
                lift,
            })
        })
        .collect();

    synergies.sort_by(|a, b| b.lift.total_cmp(&a.lift).then_with(|| a.label().cmp(&b.label())));
    synergies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(topic: Option<&str>, format: Option<&str>, impressions: Option<i64>) -> OutcomeRecord {
        OutcomeRecord {
            content_id: format!("{topic:?}-{format:?}-{impressions:?}"),
            posted_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            topic: topic.map(str::to_string),
            format: format.map(str::to_string),
            tone: None,
            generator: None,
            hook_pattern: None,
            arm_key: None,
            likes: 3,
            impressions,
            followers_gained: Some(1),
            engagement_rate: Some(0.01),
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn test_importance_ranks_by_variance_of_means() {
        let records = vec![
            record(Some("rust"), Some("thread"), Some(1000)),
            record(Some("rust"), Some("single"), Some(1000)),
            record(Some("go"), Some("thread"), Some(100)),
            record(Some("go"), Some("single"), Some(100)),
        ];

        let ranked = rank_importance(&records, &[Dimension::Format, Dimension::Topic], OutcomeMeasure::Impressions, &config());

        assert_eq!(ranked[0].dimension, Dimension::Topic);
        // Group means 1000 and 100: population variance 450^2.
        assert!((ranked[0].variance - 202_500.0).abs() < 1e-6);
        assert_eq!(ranked[0].impact, ImpactTier::High);
        assert!((ranked[0].percent_explained - 100.0).abs() < 1e-9);

        assert_eq!(ranked[1].dimension, Dimension::Format);
        assert_eq!(ranked[1].variance, 0.0);
        assert_eq!(ranked[1].percent_explained, 0.0);
        assert_eq!(ranked[1].impact, ImpactTier::Low);
    }

    #[test]
    fn test_importance_percent_sums_to_hundred() {
        let records = vec![
            record(Some("a"), Some("x"), Some(100)),
            record(Some("b"), Some("y"), Some(300)),
            record(Some("a"), Some("y"), Some(200)),
            record(Some("b"), Some("x"), Some(250)),
        ];
        let ranked = rank_importance(&records, &[Dimension::Topic, Dimension::Format], OutcomeMeasure::Impressions, &config());
        let total: f64 = ranked.iter().map(|r| r.percent_explained).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_importance_without_rows_is_zero() {
        let ranked = rank_importance(&[], &[Dimension::Topic, Dimension::Tone], OutcomeMeasure::Impressions, &config());
        assert_eq!(ranked.len(), 2);
        for row in ranked {
            assert_eq!(row.variance, 0.0);
            assert_eq!(row.percent_explained, 0.0);
            assert_eq!(row.samples, 0);
        }
    }

    #[test]
    fn test_importance_skips_null_values_and_measures() {
        let records = vec![
            record(Some("rust"), None, Some(500)),
            record(None, None, Some(9_999)),
            record(Some("go"), None, None),
        ];
        let ranked = rank_importance(&records, &[Dimension::Topic, Dimension::Topic], OutcomeMeasure::Impressions, &config());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].samples, 1);
        assert_eq!(ranked[0].values, 1);
    }

    #[test]
    fn test_aggregates_require_minimum_uses() {
        let mut records: Vec<OutcomeRecord> = (0..5).map(|i| record(Some("rust"), Some("thread"), Some(100 + i * 10))).collect();
        records.extend((0..4).map(|_| record(Some("go"), Some("thread"), Some(5_000))));
        records.extend((0..6).map(|_| record(Some("zig"), Some("single"), Some(400))));

        let aggregates = aggregate_values(&records, Dimension::Topic, OutcomeMeasure::Impressions, &config());
        let values: Vec<&str> = aggregates.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["zig", "rust"]);

        let rust = &aggregates[1];
        assert_eq!(rust.uses, 5);
        assert!((rust.avg_outcome - 120.0).abs() < 1e-9);
        assert_eq!(rust.distinct_formats, 1);
        assert_eq!(rust.reliability, ReliabilityTier::High);
        assert_eq!(aggregates[0].std_dev, 0.0);
    }

    #[test]
    fn test_aggregate_reliability_from_dispersion() {
        let records: Vec<OutcomeRecord> = [0, 1000, 0, 1000, 0, 1000]
            .iter()
            .map(|&i| record(Some("viral"), None, Some(i)))
            .collect();
        let aggregates = aggregate_values(&records, Dimension::Topic, OutcomeMeasure::Impressions, &config());
        assert_eq!(aggregates[0].std_dev, 500.0);
        assert_eq!(aggregates[0].reliability, ReliabilityTier::Low);
    }

    #[test]
    fn test_synergies_report_lift_above_baseline() {
        let mut records = Vec::new();
        records.extend((0..5).map(|_| record(Some("rust"), Some("thread"), Some(1_000))));
        records.extend((0..5).map(|_| record(Some("rust"), Some("single"), Some(100))));
        records.extend((0..5).map(|_| record(Some("go"), Some("thread"), Some(100))));
        records.extend((0..2).map(|_| record(Some("go"), Some("single"), Some(10_000))));

        // Baseline: (5000 + 500 + 500 + 20000) / 17
        let synergies = find_synergies(&records, &[Dimension::Topic, Dimension::Format], OutcomeMeasure::Impressions, 5, 0.5);
        assert_eq!(synergies.len(), 1);
        assert_eq!(synergies[0].label(), "topic=rust + format=thread");
        assert_eq!(synergies[0].uses, 5);
        assert!((synergies[0].lift - 1_000.0 / (26_000.0 / 17.0)).abs() < 1e-9);
    }

    #[test]
    fn test_synergy_baseline_includes_rows_missing_a_dimension() {
        let mut records: Vec<OutcomeRecord> = (0..5).map(|_| record(Some("rust"), Some("thread"), Some(300))).collect();
        // No format: not a combination, but still part of the overall mean.
        records.extend((0..5).map(|_| record(Some("rust"), None, Some(100))));

        let synergies = find_synergies(&records, &[Dimension::Topic, Dimension::Format], OutcomeMeasure::Impressions, 5, 1.5);
        assert_eq!(synergies.len(), 1);
        assert_eq!(synergies[0].uses, 5);
        assert!((synergies[0].lift - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_synergies_zero_baseline_yields_nothing() {
        let records: Vec<OutcomeRecord> = (0..6).map(|_| record(Some("a"), Some("b"), Some(0))).collect();
        assert!(find_synergies(&records, &[Dimension::Topic, Dimension::Format], OutcomeMeasure::Impressions, 5, 0.0).is_empty());
    }

    #[test]
    fn test_synergy_dimension_validation() {
        assert!(validate_synergy_dimensions(&[Dimension::Topic]).is_err());
        assert!(validate_synergy_dimensions(&[Dimension::Topic, Dimension::Topic]).is_err());
        assert!(validate_synergy_dimensions(&Dimension::ALL[..4]).is_err());
        assert!(validate_synergy_dimensions(&[Dimension::Topic, Dimension::Tone, Dimension::Format]).is_ok());
    }
}
