//! Corpus report: the terminal output of one evaluation run

use crate::{
    aggregate::MetricSummary,
    metrics::MetricResult,
    ties::Concordance,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything computed for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    /// Group id
    pub group_id: String,
    /// Accepted candidates
    pub size: usize,
    /// Candidates carrying a predicted rank
    pub ranked: usize,
    /// Pair statistics
    pub concordance: Concordance,
    /// Gold rank of the predicted-best candidate, if the group is usable
    pub best_pick: Option<f64>,
    /// One result per catalog metric, in catalog order
    pub results: Vec<MetricResult>,
}

impl GroupEvaluation {
    /// Whether at least two candidates carry a predicted rank
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.ranked >= 2
    }
}

/// Pooled pair statistics over the corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairCoverage {
    /// Summed pair counts
    pub concordance: Concordance,
    /// Pooled Kendall tau `Σ(c - d) / Σ(c + d)`
    pub tau: Option<f64>,
    /// Two-sided p-value of `tau` under the normal approximation
    pub tau_prob: Option<f64>,
    /// Groups with at least one predicted tie
    pub groups_with_predicted_ties: usize,
    /// Share of ranked pairs tied in prediction, in percent
    pub predicted_ties_percent: f64,
    /// Unweighted mean of the per-group taus, over groups with decisive pairs
    pub tau_avg_seg: Option<f64>,
    /// Share of usable groups with at least one predicted tie, in percent
    pub sentence_ties_percent: f64,
}

impl PairCoverage {
    /// Build from summed pair counts
    #[must_use]
    pub fn new(
        concordance: Concordance,
        penalize_predicted_ties: bool,
        groups_with_predicted_ties: usize,
    ) -> Self {
        let tau = segment_tau(&concordance, penalize_predicted_ties);
        let tau_prob = tau.and_then(|tau| {
            kendall_tau_prob(tau, concordance.valid_pairs(penalize_predicted_ties))
        });
        let ranked_pairs = concordance.ranked_pairs();
        let predicted_ties_percent = if ranked_pairs == 0 {
            0.0
        } else {
            100.0 * concordance.predicted_ties as f64 / ranked_pairs as f64
        };

        Self {
            concordance,
            tau,
            tau_prob,
            groups_with_predicted_ties,
            predicted_ties_percent,
            tau_avg_seg: None,
            sentence_ties_percent: 0.0,
        }
    }

    /// Add the per-group view: the taus of groups with decisive pairs and
    /// the number of usable groups
    #[must_use]
    pub fn with_segments(mut self, segment_taus: &[f64], groups_usable: usize) -> Self {
        self.tau_avg_seg = (!segment_taus.is_empty())
            .then(|| segment_taus.iter().sum::<f64>() / segment_taus.len() as f64);
        self.sentence_ties_percent = if groups_usable == 0 {
            0.0
        } else {
            100.0 * self.groups_with_predicted_ties as f64 / groups_usable as f64
        };
        self
    }
}

/// Kendall tau of one group, `None` without decisive pairs
#[must_use]
pub fn segment_tau(concordance: &Concordance, penalize_predicted_ties: bool) -> Option<f64> {
    let (concordant, discordant) = concordance.decisive(penalize_predicted_ties);
    let valid = concordant + discordant;
    (valid > 0).then(|| (concordant as f64 - discordant as f64) / valid as f64)
}

/// Two-sided significance of a Kendall tau over `pairs` decisive pairs.
///
/// Uses the normal approximation with variance `(4N + 10) / (9N(N - 1))`;
/// `None` for fewer than two pairs.
#[must_use]
pub fn kendall_tau_prob(tau: f64, pairs: usize) -> Option<f64> {
    if pairs < 2 {
        return None;
    }
    let n = pairs as f64;
    let variance = (4.0 * n + 10.0) / (9.0 * n * (n - 1.0));
    let z = tau / variance.sqrt();
    Some((1.0 - erf(z.abs() / std::f64::consts::SQRT_2)).clamp(0.0, 1.0))
}

/// Error function approximation (Abramowitz and Stegun 7.1.26)
fn erf(x: f64) -> f64 {
    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// One bin of the best-pick histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPickBin {
    /// Gold rank of the predicted-best candidate
    pub gold_rank: f64,
    /// Number of groups
    pub count: usize,
    /// Share of usable groups, in percent
    pub percent: f64,
}

/// How often the predicted-best candidate held each gold rank
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestPickHistogram(pub Vec<BestPickBin>);

impl BestPickHistogram {
    /// Build from per-group best-pick gold ranks; bins ascend by gold rank
    #[must_use]
    pub fn from_picks(picks: impl IntoIterator<Item = f64>) -> Self {
        let mut picks: Vec<f64> = picks.into_iter().collect();
        picks.sort_by(f64::total_cmp);
        let total = picks.len() as f64;

        let mut bins: Vec<BestPickBin> = Vec::new();
        for pick in picks {
            match bins.last_mut() {
                Some(bin) if bin.gold_rank.total_cmp(&pick).is_eq() => bin.count += 1,
                _ => bins.push(BestPickBin {
                    gold_rank: pick,
                    count: 1,
                    percent: 0.0,
                }),
            }
        }
        for bin in &mut bins {
            bin.percent = 100.0 * bin.count as f64 / total;
        }
        Self(bins)
    }

    /// Bins, best gold rank first
    #[must_use]
    pub fn bins(&self) -> &[BestPickBin] {
        &self.0
    }

    /// Check if no group was counted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Aggregated result of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusReport {
    /// Summaries keyed by metric name
    pub metrics: BTreeMap<String, MetricSummary>,
    /// Groups in the corpus
    pub groups_total: usize,
    /// Groups with at least two ranked candidates
    pub groups_usable: usize,
    /// Candidates rejected while loading
    pub candidates_rejected: usize,
    /// Pooled pair statistics
    pub coverage: PairCoverage,
    /// Gold rank of the predicted-best candidate, over usable groups
    pub best_pick: BestPickHistogram,
    /// Substitutions made during the run
    pub notes: Vec<String>,
    /// Per-group detail, when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEvaluation>,
}

impl CorpusReport {
    /// Summary of one metric
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    /// Aggregate value of one metric; `None` when unknown or undefined
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        self.metric(name).and_then(|summary| summary.value)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
