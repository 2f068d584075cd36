//! Corpus-level aggregation of per-group metric results
//!
//! Aggregation is a weighted mean: sum of `weight * value` and sum of
//! weights are accumulated, and the division happens once in
//! [`Accumulator::finish`]. Undefined results, and defined results whose
//! weight is zero, are excluded and counted by
//! reason. A metric no group could support has no value at all; it is
//! never reported as `0.0`.

use crate::{
    error::DegenerateGroup,
    metrics::{MetricResult, Weighting},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated statistics of one metric over the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Metric name
    pub metric: String,
    /// Weighting rule applied
    pub weighting: Weighting,
    /// Weighted mean, `None` when no group contributed
    pub value: Option<f64>,
    /// Groups contributing a defined value
    pub groups_used: usize,
    /// Groups skipped as degenerate
    pub groups_skipped: usize,
    /// Skip reason → number of groups
    pub skip_reasons: BTreeMap<String, usize>,
    /// Sum of weights of contributing groups
    pub total_weight: f64,
    /// Substitution notes → number of groups they applied to
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, usize>,
}

impl MetricSummary {
    /// Whether the aggregate has a value
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    /// Fraction of inspected groups that contributed
    #[must_use]
    pub fn coverage(&self) -> f64 {
        let seen = self.groups_used + self.groups_skipped;
        if seen == 0 {
            0.0
        } else {
            self.groups_used as f64 / seen as f64
        }
    }
}

/// Running weighted sum for one metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    weighting: Weighting,
    weighted_sum: f64,
    total_weight: f64,
    groups_used: usize,
    groups_skipped: usize,
    skip_reasons: BTreeMap<DegenerateGroup, usize>,
    notes: BTreeMap<String, usize>,
}

impl Accumulator {
    /// Create an accumulator for a metric with the given weighting
    #[must_use]
    pub fn new(weighting: Weighting) -> Self {
        Self {
            weighting,
            ..Self::default()
        }
    }

    /// Add one per-group result
    pub fn add(&mut self, result: &MetricResult) {
        match &result.outcome {
            // a value that cannot move the mean is skipped with a reason
            Ok(_) if result.weight() <= 0.0 => {
                self.groups_skipped += 1;
                *self.skip_reasons.entry(DegenerateGroup::ZeroWeight).or_default() += 1;
            }
            Ok(value) => {
                let weight = result.weight();
                self.weighted_sum += weight * value.value;
                self.total_weight += weight;
                self.groups_used += 1;
                if let Some(note) = &value.note {
                    *self.notes.entry(note.clone()).or_default() += 1;
                }
            }
            Err(reason) => {
                self.groups_skipped += 1;
                *self.skip_reasons.entry(*reason).or_default() += 1;
            }
        }
    }

    /// Fold another accumulator for the same metric into this one
    pub fn merge(&mut self, other: &Accumulator) {
        self.weighted_sum += other.weighted_sum;
        self.total_weight += other.total_weight;
        self.groups_used += other.groups_used;
        self.groups_skipped += other.groups_skipped;
        for (reason, count) in &other.skip_reasons {
            *self.skip_reasons.entry(*reason).or_default() += count;
        }
        for (note, count) in &other.notes {
            *self.notes.entry(note.clone()).or_default() += count;
        }
    }

    /// Produce the summary
    #[must_use]
    pub fn finish(&self, metric: &str) -> MetricSummary {
        let value = (self.groups_used > 0 && self.total_weight > 0.0)
            .then(|| self.weighted_sum / self.total_weight);
        MetricSummary {
            metric: metric.to_string(),
            weighting: self.weighting,
            value,
            groups_used: self.groups_used,
            groups_skipped: self.groups_skipped,
            skip_reasons: self
                .skip_reasons
                .iter()
                .map(|(reason, count)| (reason.to_string(), *count))
                .collect(),
            total_weight: self.total_weight,
            notes: self.notes.clone(),
        }
    }
}

/// Streaming aggregator over all metrics of a run
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    accumulators: BTreeMap<String, Accumulator>,
}

impl Aggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one per-group result
    pub fn push(&mut self, result: &MetricResult) {
        self.accumulators
            .entry(result.metric.clone())
            .or_insert_with(|| Accumulator::new(result.weighting))
            .add(result);
    }

    /// Add every result of a slice
    pub fn extend<'a>(&mut self, results: impl IntoIterator<Item = &'a MetricResult>) {
        for result in results {
            self.push(result);
        }
    }

    /// Fold a partial aggregator into this one
    pub fn merge(&mut self, other: &Aggregator) {
        for (metric, accumulator) in &other.accumulators {
            self.accumulators
                .entry(metric.clone())
                .or_insert_with(|| Accumulator::new(accumulator.weighting))
                .merge(accumulator);
        }
    }

    /// Summaries keyed by metric name
    #[must_use]
    pub fn finish(&self) -> BTreeMap<String, MetricSummary> {
        self.accumulators
            .iter()
            .map(|(metric, accumulator)| (metric.clone(), accumulator.finish(metric)))
            .collect()
    }

    /// Aggregate the results of one metric.
    ///
    /// Results for other metrics are ignored. Pure: the same input always
    /// gives the same summary.
    #[must_use]
    pub fn aggregate(metric: &str, results: &[MetricResult]) -> MetricSummary {
        let mut accumulator: Option<Accumulator> = None;
        for result in results.iter().filter(|r| r.metric == metric) {
            accumulator
                .get_or_insert_with(|| Accumulator::new(result.weighting))
                .add(result);
        }
        accumulator.unwrap_or_default().finish(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValue;

    fn defined(group: &str, value: f64, pairs: usize) -> MetricResult {
        MetricResult {
            metric: "m".to_string(),
            group_id: group.to_string(),
            weighting: Weighting::Group,
            outcome: Ok(MetricValue::new(value, pairs + 1, pairs)),
        }
    }

    fn skipped(group: &str, reason: DegenerateGroup) -> MetricResult {
        MetricResult {
            metric: "m".to_string(),
            group_id: group.to_string(),
            weighting: Weighting::Group,
            outcome: Err(reason),
        }
    }

    #[test]
    fn test_aggregate_macro_average() {
        let results = vec![defined("a", 1.0, 1), defined("b", 0.0, 1)];
        let summary = Aggregator::aggregate("m", &results);

        assert_eq!(summary.value, Some(0.5));
        assert_eq!(summary.groups_used, 2);
        assert_eq!(summary.groups_skipped, 0);
    }

    #[test]
    fn test_aggregate_pair_weighting() {
        let mut results = vec![defined("a", 1.0, 3), defined("b", 0.0, 1)];
        for r in &mut results {
            r.weighting = Weighting::Pairs;
        }
        let summary = Aggregator::aggregate("m", &results);
        assert!((summary.value.unwrap() - 0.75).abs() < 1e-12);
        assert!((summary.total_weight - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_skips_are_counted() {
        let results = vec![
            defined("a", 1.0, 1),
            skipped("b", DegenerateGroup::AllGoldTied),
            skipped("c", DegenerateGroup::TooFewCandidates),
            skipped("d", DegenerateGroup::AllGoldTied),
        ];
        let summary = Aggregator::aggregate("m", &results);

        assert_eq!(summary.value, Some(1.0));
        assert_eq!(summary.groups_skipped, 3);
        assert_eq!(summary.skip_reasons["all gold ranks tied"], 2);
        assert_eq!(summary.skip_reasons["fewer than two ranked candidates"], 1);
        assert!((summary.coverage() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_all_skipped_is_undefined() {
        let results = vec![skipped("a", DegenerateGroup::AllGoldTied)];
        let summary = Aggregator::aggregate("m", &results);

        assert!(summary.value.is_none());
        assert!(!summary.is_defined());
        assert_eq!(summary.groups_used, 0);
        assert_eq!(summary.groups_skipped, 1);
    }

    #[test]
    fn test_aggregate_zero_weight_is_skipped_with_reason() {
        let mut results = vec![defined("a", 0.8, 0), defined("b", 0.4, 0)];
        for r in &mut results {
            r.weighting = Weighting::Pairs;
        }
        let summary = Aggregator::aggregate("m", &results);

        assert!(summary.value.is_none());
        assert_eq!(summary.groups_used, 0);
        assert_eq!(summary.groups_skipped, 2);
        assert_eq!(summary.skip_reasons["zero aggregation weight"], 2);
        assert!(summary.total_weight.abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_zero_weight_mixed_with_weighted() {
        let mut results = vec![defined("a", 1.0, 2), defined("b", 0.0, 0)];
        for r in &mut results {
            r.weighting = Weighting::Pairs;
        }
        let summary = Aggregator::aggregate("m", &results);

        assert_eq!(summary.value, Some(1.0));
        assert_eq!(summary.groups_used, 1);
        assert_eq!(summary.skip_reasons["zero aggregation weight"], 1);
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = Aggregator::aggregate("m", &[]);
        assert!(summary.value.is_none());
        assert!(summary.coverage().abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_idempotent() {
        let results = vec![
            defined("a", 0.3, 2),
            defined("b", 0.9, 5),
            skipped("c", DegenerateGroup::ZeroVariance),
        ];
        assert_eq!(
            Aggregator::aggregate("m", &results),
            Aggregator::aggregate("m", &results)
        );
    }

    #[test]
    fn test_aggregate_ignores_other_metrics() {
        let mut other = defined("a", 0.0, 1);
        other.metric = "other".to_string();
        let results = vec![defined("a", 1.0, 1), other];
        assert_eq!(Aggregator::aggregate("m", &results).value, Some(1.0));
    }

    #[test]
    fn test_notes_counted() {
        let mut result = defined("a", 0.2, 1);
        if let Ok(value) = &mut result.outcome {
            value.note = Some("proxy".to_string());
        }
        let summary = Aggregator::aggregate("m", &[result, defined("b", 0.4, 1)]);
        assert_eq!(summary.notes["proxy"], 1);
    }

    #[test]
    fn test_streaming_merge_matches_single_pass() {
        let results = vec![
            defined("a", 0.25, 1),
            defined("b", 0.5, 1),
            skipped("c", DegenerateGroup::AllGoldTied),
            defined("d", 1.0, 1),
        ];

        let mut whole = Aggregator::new();
        whole.extend(&results);

        let mut left = Aggregator::new();
        left.extend(&results[..2]);
        let mut right = Aggregator::new();
        right.extend(&results[2..]);
        left.merge(&right);

        assert_eq!(whole.finish(), left.finish());
        assert_eq!(whole.finish()["m"], Aggregator::aggregate("m", &results));
    }
}
