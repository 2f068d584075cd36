//! Ranking agreement metrics
//!
//! Every metric is a pure function of one [`ResolvedGroup`] returning either
//! a [`MetricValue`] or the [`DegenerateGroup`] reason it cannot be computed.
//! Metrics never fail on malformed input: that is rejected when the group is
//! built.
//!
//! | Metric | Range | Weighting |
//! |--------|-------|-----------|
//! | `pairwise_agreement` | \[0, 1\] | group |
//! | `rank_correlation` | \[-1, 1\] | group |
//! | `delta_avg` | signed | group |
//! | `kendall_tau` | \[-1, 1\] | pairs |
//! | `mrr` | (0, 1\] | group |
//! | `ndcg` | (0, 1\] | group |
//! | `err` | \[0, 1) | group |
//! | `best_pick_gold_rank` | ≥ 1, lower is better | group |

use crate::{
    config::ProxyScale,
    error::DegenerateGroup,
    ties::{tie_classes, ResolvedGroup},
};
use serde::{Deserialize, Serialize};

/// Stable metric names
pub mod names {
    /// Fraction of gold-ordered pairs the prediction orders the same way
    pub const PAIRWISE_AGREEMENT: &str = "pairwise_agreement";
    /// Spearman correlation with average-rank tie adjustment
    pub const RANK_CORRELATION: &str = "rank_correlation";
    /// DeltaAvg over predicted top-k subsets
    pub const DELTA_AVG: &str = "delta_avg";
    /// WMT12 Kendall tau
    pub const KENDALL_TAU: &str = "kendall_tau";
    /// Reciprocal rank of the gold-best candidate
    pub const MRR: &str = "mrr";
    /// Normalized discounted cumulative gain
    pub const NDCG: &str = "ndcg";
    /// Expected reciprocal rank
    pub const ERR: &str = "err";
    /// Gold rank of the candidate predicted best
    pub const BEST_PICK_GOLD_RANK: &str = "best_pick_gold_rank";
}

/// Note attached to DeltaAvg results computed from the rank proxy
pub const QUALITY_PROXY_NOTE: &str = "gold quality proxied from inverted gold rank";

/// How a metric's per-group values are weighted in the corpus aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Every group counts once (macro-average)
    #[default]
    Group,
    /// Groups weighted by ranked candidate count
    Candidates,
    /// Groups weighted by contributed pair count (micro-average over pairs)
    Pairs,
}

impl Weighting {
    /// Weight of one per-group value
    #[must_use]
    pub fn weight(self, value: &MetricValue) -> f64 {
        match self {
            Self::Group => 1.0,
            Self::Candidates => value.candidates as f64,
            Self::Pairs => value.pairs as f64,
        }
    }
}

impl std::fmt::Display for Weighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Group => "group",
            Self::Candidates => "candidates",
            Self::Pairs => "pairs",
        };
        f.write_str(label)
    }
}

/// A defined per-group metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// The scalar value
    pub value: f64,
    /// Ranked candidates that took part
    pub candidates: usize,
    /// Pairs that took part (0 for non-pairwise metrics)
    pub pairs: usize,
    /// Substitution made while computing the value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MetricValue {
    /// Create a value without a note
    #[must_use]
    pub fn new(value: f64, candidates: usize, pairs: usize) -> Self {
        Self {
            value,
            candidates,
            pairs,
            note: None,
        }
    }

    /// Attach a note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Outcome of one metric on one group
pub type MetricOutcome = std::result::Result<MetricValue, DegenerateGroup>;

/// Per-group result of one metric, as fed to the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Metric name
    pub metric: String,
    /// Group id
    pub group_id: String,
    /// Weighting rule declared for the metric
    pub weighting: Weighting,
    /// Value or skip reason
    pub outcome: MetricOutcome,
}

impl MetricResult {
    /// The value, if defined
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|v| v.value)
    }

    /// Aggregation weight; zero when undefined
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.outcome
            .as_ref()
            .map_or(0.0, |v| self.weighting.weight(v))
    }

    /// Why the group was skipped, if it was
    #[must_use]
    pub fn skip_reason(&self) -> Option<DegenerateGroup> {
        self.outcome.as_ref().err().copied()
    }

    /// Whether the metric is defined for the group
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// A per-group ranking metric
pub trait Metric: Send + Sync {
    /// Stable metric name used as report key
    fn name(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Declared weighting rule
    fn weighting(&self) -> Weighting {
        Weighting::Group
    }

    /// Compute the metric for one group
    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome;
}

fn require_ranked(group: &ResolvedGroup<'_>) -> Result<usize, DegenerateGroup> {
    match group.len() {
        n if n < 2 => Err(DegenerateGroup::TooFewCandidates),
        n => Ok(n),
    }
}

/// Concordant and discordant counts, or why there are none
fn decisive_pairs(
    group: &ResolvedGroup<'_>,
    penalize_predicted_ties: bool,
) -> Result<(usize, usize), DegenerateGroup> {
    require_ranked(group)?;
    let concordance = group.concordance();
    let (concordant, discordant) = concordance.decisive(penalize_predicted_ties);
    if concordant + discordant == 0 {
        return Err(if concordance.gold_ties == concordance.ranked_pairs() {
            DegenerateGroup::AllGoldTied
        } else {
            DegenerateGroup::ZeroVariance
        });
    }
    Ok((concordant, discordant))
}

// ============================================================================
// Pairwise agreement
// ============================================================================

/// Fraction of non-tied gold pairs whose predicted order matches.
///
/// `agreement = concordant / (concordant + discordant)`; gold ties are
/// neutral. Undefined when every pair is tied in gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairwiseAgreement {
    penalize_predicted_ties: bool,
}

impl Default for PairwiseAgreement {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PairwiseAgreement {
    /// Create the metric; see [`Concordance::decisive`](crate::ties::Concordance::decisive)
    #[must_use]
    pub fn new(penalize_predicted_ties: bool) -> Self {
        Self {
            penalize_predicted_ties,
        }
    }
}

impl Metric for PairwiseAgreement {
    fn name(&self) -> &str {
        names::PAIRWISE_AGREEMENT
    }

    fn description(&self) -> &str {
        "concordant / (concordant + discordant) over gold-ordered pairs"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let (concordant, discordant) = decisive_pairs(group, self.penalize_predicted_ties)?;
        let valid = concordant + discordant;
        Ok(MetricValue::new(
            concordant as f64 / valid as f64,
            group.len(),
            valid,
        ))
    }
}

// ============================================================================
// Kendall tau
// ============================================================================

/// Segment-level Kendall tau as used in WMT12 metric evaluation.
///
/// `tau = (concordant - discordant) / (concordant + discordant)` with gold
/// ties excluded. Weighted by pair count, so the corpus aggregate is the
/// pooled set-level tau.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KendallTau {
    penalize_predicted_ties: bool,
}

impl Default for KendallTau {
    fn default() -> Self {
        Self::new(true)
    }
}

impl KendallTau {
    /// Create the metric
    #[must_use]
    pub fn new(penalize_predicted_ties: bool) -> Self {
        Self {
            penalize_predicted_ties,
        }
    }
}

impl Metric for KendallTau {
    fn name(&self) -> &str {
        names::KENDALL_TAU
    }

    fn description(&self) -> &str {
        "(concordant - discordant) / (concordant + discordant), gold ties excluded"
    }

    fn weighting(&self) -> Weighting {
        Weighting::Pairs
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let (concordant, discordant) = decisive_pairs(group, self.penalize_predicted_ties)?;
        let valid = concordant + discordant;
        let tau = (concordant as f64 - discordant as f64) / valid as f64;
        Ok(MetricValue::new(tau, group.len(), valid))
    }
}

// ============================================================================
// Rank correlation
// ============================================================================

/// Spearman rank correlation.
///
/// Pearson correlation of the average-rank vectors, which is the
/// tie-corrected form; without ties it equals `1 - 6Σd²/(n(n²-1))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankCorrelation;

impl Metric for RankCorrelation {
    fn name(&self) -> &str {
        names::RANK_CORRELATION
    }

    fn description(&self) -> &str {
        "Spearman correlation with average-rank tie adjustment"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        // fewer than two points: reported as degenerate
        let n = require_ranked(group).map_err(|_| DegenerateGroup::ZeroVariance)?;
        let rho = pearson(group.gold_average(), group.predicted_average())
            .ok_or(DegenerateGroup::ZeroVariance)?;
        Ok(MetricValue::new(rho, n, 0))
    }
}

/// Pearson correlation; `None` when either side has zero variance
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        numerator += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((numerator / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

// ============================================================================
// DeltaAvg
// ============================================================================

/// DeltaAvg: how much the predicted top-k subsets beat the group average.
///
/// For `n` ranked candidates, average the mean gold quality of the
/// predicted top-k for `k = 1..n-1` and subtract the mean over all `n`.
/// A predicted tie block that straddles `k` contributes its mean quality,
/// the expectation under a random tie-break.
///
/// Uses the judged gold quality when every ranked candidate has one;
/// otherwise all qualities come from the inverted gold rank (see
/// [`ProxyScale`]) and the result carries [`QUALITY_PROXY_NOTE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaAvg {
    proxy: ProxyScale,
}

impl DeltaAvg {
    /// Create the metric with a proxy scale
    #[must_use]
    pub fn new(proxy: ProxyScale) -> Self {
        Self { proxy }
    }

    fn qualities(&self, group: &ResolvedGroup<'_>) -> (Vec<f64>, bool) {
        let judged: Option<Vec<f64>> = group.ranked().iter().map(|c| c.quality()).collect();
        if let Some(judged) = judged {
            return (judged, false);
        }

        let gold = group.gold_normalized();
        let n = gold.len() as f64;
        let proxied = match self.proxy {
            ProxyScale::GroupSize => gold.iter().map(|g| (n + 1.0 - g) / n).collect(),
            ProxyScale::MaxRank => {
                let max = gold.iter().copied().fold(1.0, f64::max);
                gold.iter().map(|g| (max + 1.0 - g) / max).collect()
            }
            ProxyScale::Unscaled => gold.iter().map(|g| n + 1.0 - g).collect(),
        };
        (proxied, true)
    }
}

impl Metric for DeltaAvg {
    fn name(&self) -> &str {
        names::DELTA_AVG
    }

    fn description(&self) -> &str {
        "mean gold quality of predicted top-k (k = 1..n-1) minus group mean"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let n = require_ranked(group)?;
        let (qualities, proxied) = self.qualities(group);
        let by_position = expected_by_position(&qualities, group.predicted_raw());

        let mut prefix = 0.0;
        let mut head_means = 0.0;
        for (k, quality) in by_position.iter().take(n - 1).enumerate() {
            prefix += quality;
            head_means += prefix / (k + 1) as f64;
        }
        let overall = qualities.iter().sum::<f64>() / n as f64;
        let delta = head_means / (n - 1) as f64 - overall;

        let value = MetricValue::new(delta, n, 0);
        Ok(if proxied {
            value.with_note(QUALITY_PROXY_NOTE)
        } else {
            value
        })
    }
}

/// Lay `values` out in predicted order; each predicted tie block gets its mean
fn expected_by_position(values: &[f64], predicted: &[f64]) -> Vec<f64> {
    let mut by_position = Vec::with_capacity(values.len());
    for class in tie_classes(predicted) {
        let size = class.members.len();
        let mean = class.members.iter().map(|&i| values[i]).sum::<f64>() / size as f64;
        by_position.extend(std::iter::repeat(mean).take(size));
    }
    by_position
}

// ============================================================================
// Reciprocal rank
// ============================================================================

/// Reciprocal of the best predicted rank among the gold-best candidates.
///
/// Both sides use the resolver's normalized ranks, so with the default
/// ceiling policy a tie for first place in the prediction costs rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReciprocalRank;

impl Metric for ReciprocalRank {
    fn name(&self) -> &str {
        names::MRR
    }

    fn description(&self) -> &str {
        "1 / predicted rank of the gold-best candidate"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let n = require_ranked(group)?;
        let gold = group.gold_normalized();
        let predicted = group.predicted_normalized();

        let best_gold = gold.iter().copied().fold(f64::INFINITY, f64::min);
        let best_predicted = gold
            .iter()
            .zip(predicted)
            .filter(|(g, _)| **g == best_gold)
            .map(|(_, p)| *p)
            .fold(f64::INFINITY, f64::min);

        Ok(MetricValue::new(1.0 / best_predicted, n, 0))
    }
}

// ============================================================================
// nDCG / ERR
// ============================================================================

/// Per-candidate gains: relevance `l = n - g + 1`, gain `(2^l - 1) / 2^n`
fn gains(group: &ResolvedGroup<'_>) -> Vec<f64> {
    let n = group.len() as f64;
    group
        .gold_normalized()
        .iter()
        .map(|g| {
            let relevance = n - g + 1.0;
            // (2^l - 1) / 2^n without forming 2^n
            2f64.powf(relevance - n) - 2f64.powf(-n)
        })
        .collect()
}

fn discounted(gains: &[f64], cutoff: usize) -> f64 {
    gains
        .iter()
        .take(cutoff)
        .enumerate()
        .map(|(j, g)| g / (j as f64 + 2.0).ln())
        .sum()
}

/// Normalized discounted cumulative gain of the predicted order.
///
/// Predicted tie blocks share their mean gain. Returns 1.0 when the ideal
/// DCG is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ndcg {
    cutoff: Option<usize>,
}

impl Ndcg {
    /// Create the metric with an optional cutoff
    #[must_use]
    pub fn new(cutoff: Option<usize>) -> Self {
        Self { cutoff }
    }
}

impl Metric for Ndcg {
    fn name(&self) -> &str {
        names::NDCG
    }

    fn description(&self) -> &str {
        "DCG of the predicted order / DCG of the gold order"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let n = require_ranked(group)?;
        let cutoff = self.cutoff.map_or(n, |k| k.min(n));
        let mut ideal = gains(group);
        let actual = expected_by_position(&ideal, group.predicted_raw());
        ideal.sort_by(|a, b| b.total_cmp(a));

        let ideal_dcg = discounted(&ideal, cutoff);
        let ndcg = if ideal_dcg > 0.0 {
            discounted(&actual, cutoff) / ideal_dcg
        } else {
            1.0
        };
        Ok(MetricValue::new(ndcg, n, 0))
    }
}

/// Expected reciprocal rank of the predicted order (cascade model)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectedReciprocalRank;

impl Metric for ExpectedReciprocalRank {
    fn name(&self) -> &str {
        names::ERR
    }

    fn description(&self) -> &str {
        "expected reciprocal rank under the cascade model"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let n = require_ranked(group)?;
        let by_position = expected_by_position(&gains(group), group.predicted_raw());

        let mut still_looking = 1.0;
        let mut err = 0.0;
        for (j, gain) in by_position.iter().enumerate() {
            err += still_looking * gain / (j as f64 + 1.0);
            still_looking *= 1.0 - gain;
        }
        Ok(MetricValue::new(err, n, 0))
    }
}

// ============================================================================
// Best pick
// ============================================================================

/// Gold rank of the candidate the prediction ranks first.
///
/// When several candidates share the best predicted rank the worst of
/// their gold ranks is taken. Ranks are the resolver's normalized ones.
#[must_use]
pub fn best_pick(group: &ResolvedGroup<'_>) -> Option<f64> {
    let gold = group.gold_normalized();
    let predicted = group.predicted_normalized();
    let best_predicted = predicted.iter().copied().reduce(f64::min)?;
    gold.iter()
        .zip(predicted)
        .filter(|(_, p)| **p == best_predicted)
        .map(|(g, _)| *g)
        .reduce(f64::max)
}

/// Average gold rank of the predicted-best candidate (lower is better)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BestPickGoldRank;

impl Metric for BestPickGoldRank {
    fn name(&self) -> &str {
        names::BEST_PICK_GOLD_RANK
    }

    fn description(&self) -> &str {
        "gold rank of the candidate predicted best (worst on predicted ties)"
    }

    fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
        let n = require_ranked(group)?;
        let rank = best_pick(group).ok_or(DegenerateGroup::TooFewCandidates)?;
        Ok(MetricValue::new(rank, n, 0))
    }
}
