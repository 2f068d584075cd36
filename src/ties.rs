//! Tie handling: rank comparison, tie classes and normalization
//!
//! Raw ranks follow standard competition ranking: tied candidates share a
//! rank value and gaps are allowed. [`TieResolver`] compares raw ranks as-is
//! and classifies every candidate pair once per group; metrics that need
//! positional ranks read the normalized vectors carried by [`ResolvedGroup`].

use crate::group::{Candidate, Pairs, Rank, RankGroup};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::AddAssign;

/// How tied candidates are mapped to rank positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Each distinct rank value takes one position (dense ranking)
    Minimize,
    /// Tied items reserve all their positions and take the lowest one
    Floor,
    /// Tied items reserve all their positions and take the highest one
    #[default]
    Ceiling,
    /// Tied items reserve all their positions and take their mean (fractional ranking)
    Middle,
}

/// Candidates sharing one rank value
#[derive(Debug, Clone, PartialEq)]
pub struct TieClass {
    /// The shared raw rank value
    pub rank: f64,
    /// Indices of the members, ascending
    pub members: Vec<usize>,
}

impl TieClass {
    /// Whether more than one candidate shares the rank
    #[must_use]
    pub fn is_tie(&self) -> bool {
        self.members.len() > 1
    }
}

/// Group rank values into tie classes, best (lowest) rank first
#[must_use]
pub fn tie_classes(ranks: &[f64]) -> Vec<TieClass> {
    let mut order: Vec<usize> = (0..ranks.len()).collect();
    order.sort_by(|&a, &b| ranks[a].total_cmp(&ranks[b]));

    let mut classes: Vec<TieClass> = Vec::new();
    for index in order {
        match classes.last_mut() {
            Some(class) if class.rank.total_cmp(&ranks[index]) == Ordering::Equal => {
                class.members.push(index);
            }
            _ => classes.push(TieClass {
                rank: ranks[index],
                members: vec![index],
            }),
        }
    }
    classes
}

/// Normalize a messy ranking, e.g. `[1, 3, 5, 4]` to `[1, 2, 4, 3]`.
///
/// Relative order is preserved; only positions and tie values change.
#[must_use]
pub fn normalize(ranks: &[f64], policy: TiePolicy) -> Vec<f64> {
    let mut normalized = vec![0.0; ranks.len()];
    let mut position = 0usize;

    for class in tie_classes(ranks) {
        let count = class.members.len();
        let (value, consumed) = match policy {
            TiePolicy::Minimize => ((position + 1) as f64, 1),
            TiePolicy::Floor => ((position + 1) as f64, count),
            TiePolicy::Ceiling => ((position + count) as f64, count),
            TiePolicy::Middle => (position as f64 + (count as f64 + 1.0) / 2.0, count),
        };
        for &member in &class.members {
            normalized[member] = value;
        }
        position += consumed;
    }

    normalized
}

/// Relation between the gold and predicted order of one candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairOrder {
    /// Prediction orders the pair the same way as gold
    Concordant,
    /// Prediction orders the pair the opposite way
    Discordant,
    /// Gold ties the pair; never a disagreement
    GoldTie,
    /// Gold orders the pair but the prediction ties it
    PredictedTie,
}

/// Pair statistics of one group (or summed over a corpus)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concordance {
    /// All unordered candidate pairs, ranked or not
    pub pairs: usize,
    /// Pairs involving a candidate without predicted rank
    pub unranked_pairs: usize,
    /// Pairs ordered the same way by gold and prediction
    pub concordant: usize,
    /// Pairs ordered oppositely
    pub discordant: usize,
    /// Ranked pairs tied in gold
    pub gold_ties: usize,
    /// Ranked pairs tied in prediction, whatever the gold relation
    pub predicted_ties: usize,
    /// Ranked pairs ordered by gold but tied in prediction
    pub predicted_only_ties: usize,
}

impl Concordance {
    /// Pairs where both candidates carry a predicted rank
    #[must_use]
    pub fn ranked_pairs(&self) -> usize {
        self.pairs - self.unranked_pairs
    }

    /// Concordant and discordant counts used by agreement metrics.
    ///
    /// With `penalize_predicted_ties`, a predicted tie on a gold-ordered pair
    /// counts as discordant; otherwise it is left out like a gold tie.
    #[must_use]
    pub fn decisive(&self, penalize_predicted_ties: bool) -> (usize, usize) {
        if penalize_predicted_ties {
            (self.concordant, self.discordant + self.predicted_only_ties)
        } else {
            (self.concordant, self.discordant)
        }
    }

    /// Pairs entering the denominator of agreement metrics
    #[must_use]
    pub fn valid_pairs(&self, penalize_predicted_ties: bool) -> usize {
        let (concordant, discordant) = self.decisive(penalize_predicted_ties);
        concordant + discordant
    }

    fn record(&mut self, order: PairOrder, predicted_equal: bool) {
        if predicted_equal {
            self.predicted_ties += 1;
        }
        match order {
            PairOrder::Concordant => self.concordant += 1,
            PairOrder::Discordant => self.discordant += 1,
            PairOrder::GoldTie => self.gold_ties += 1,
            PairOrder::PredictedTie => self.predicted_only_ties += 1,
        }
    }
}

impl AddAssign<&Concordance> for Concordance {
    fn add_assign(&mut self, other: &Concordance) {
        self.pairs += other.pairs;
        self.unranked_pairs += other.unranked_pairs;
        self.concordant += other.concordant;
        self.discordant += other.discordant;
        self.gold_ties += other.gold_ties;
        self.predicted_ties += other.predicted_ties;
        self.predicted_only_ties += other.predicted_only_ties;
    }
}

/// Compares ranks and resolves groups for metric evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TieResolver {
    policy: TiePolicy,
}

impl TieResolver {
    /// Create a resolver normalizing positional ranks with `policy`
    #[must_use]
    pub fn new(policy: TiePolicy) -> Self {
        Self { policy }
    }

    /// Policy used for the normalized rank vectors
    #[must_use]
    pub fn policy(&self) -> TiePolicy {
        self.policy
    }

    /// Compare two raw ranks; lower rank is better and sorts first
    #[must_use]
    pub fn compare(rank_a: Rank, rank_b: Rank) -> Ordering {
        rank_a.value().total_cmp(&rank_b.value())
    }

    /// Classify a pair from its gold and predicted ranks
    #[must_use]
    pub fn classify(gold: (Rank, Rank), predicted: (Rank, Rank)) -> PairOrder {
        let gold_order = Self::compare(gold.0, gold.1);
        let predicted_order = Self::compare(predicted.0, predicted.1);
        match (gold_order, predicted_order) {
            (Ordering::Equal, _) => PairOrder::GoldTie,
            (_, Ordering::Equal) => PairOrder::PredictedTie,
            (g, p) if g == p => PairOrder::Concordant,
            _ => PairOrder::Discordant,
        }
    }

    /// Classify all pairs of a group and precompute normalized rank vectors
    #[must_use]
    pub fn resolve<'a>(&self, group: &'a RankGroup) -> ResolvedGroup<'a> {
        let ranked: Vec<&Candidate> = group.candidates().iter().filter(|c| c.is_ranked()).collect();

        let mut concordance = Concordance {
            pairs: group.pair_count(),
            ..Concordance::default()
        };
        let mut orders = Vec::with_capacity(crate::group::pair_count(ranked.len()));
        for (i, j) in Pairs::new(ranked.len()) {
            let (a, b) = (ranked[i], ranked[j]);
            // ranked candidates always carry a prediction
            let (Some(pa), Some(pb)) = (a.predicted(), b.predicted()) else {
                continue;
            };
            let order = Self::classify((a.gold(), b.gold()), (pa, pb));
            concordance.record(order, Self::compare(pa, pb) == Ordering::Equal);
            orders.push(order);
        }
        concordance.unranked_pairs = concordance.pairs - orders.len();

        let gold_raw: Vec<f64> = ranked.iter().map(|c| c.gold().value()).collect();
        let predicted_raw: Vec<f64> = ranked
            .iter()
            .filter_map(|c| c.predicted())
            .map(Rank::value)
            .collect();

        tracing::trace!(
            group = group.id(),
            ranked = ranked.len(),
            concordant = concordance.concordant,
            discordant = concordance.discordant,
            "resolved group"
        );

        ResolvedGroup {
            group,
            gold_normalized: normalize(&gold_raw, self.policy),
            predicted_normalized: normalize(&predicted_raw, self.policy),
            gold_average: normalize(&gold_raw, TiePolicy::Middle),
            predicted_average: normalize(&predicted_raw, TiePolicy::Middle),
            gold_raw,
            predicted_raw,
            ranked,
            orders,
            concordance,
            policy: self.policy,
        }
    }
}

/// A group after tie classification, as seen by metrics.
///
/// Only candidates carrying a predicted rank take part; vectors are indexed
/// by position among those ranked candidates (document order).
#[derive(Debug, Clone)]
pub struct ResolvedGroup<'a> {
    group: &'a RankGroup,
    ranked: Vec<&'a Candidate>,
    gold_raw: Vec<f64>,
    predicted_raw: Vec<f64>,
    gold_normalized: Vec<f64>,
    predicted_normalized: Vec<f64>,
    gold_average: Vec<f64>,
    predicted_average: Vec<f64>,
    orders: Vec<PairOrder>,
    concordance: Concordance,
    policy: TiePolicy,
}

impl<'a> ResolvedGroup<'a> {
    /// The underlying group
    #[must_use]
    pub fn group(&self) -> &'a RankGroup {
        self.group
    }

    /// Group id
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.group.id()
    }

    /// Candidates carrying a predicted rank
    #[must_use]
    pub fn ranked(&self) -> &[&'a Candidate] {
        &self.ranked
    }

    /// Number of ranked candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    /// Check if no candidate carries a predicted rank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Raw gold ranks of the ranked candidates
    #[must_use]
    pub fn gold_raw(&self) -> &[f64] {
        &self.gold_raw
    }

    /// Raw predicted ranks
    #[must_use]
    pub fn predicted_raw(&self) -> &[f64] {
        &self.predicted_raw
    }

    /// Gold ranks normalized with the resolver policy
    #[must_use]
    pub fn gold_normalized(&self) -> &[f64] {
        &self.gold_normalized
    }

    /// Predicted ranks normalized with the resolver policy
    #[must_use]
    pub fn predicted_normalized(&self) -> &[f64] {
        &self.predicted_normalized
    }

    /// Gold ranks with ties replaced by their average position
    #[must_use]
    pub fn gold_average(&self) -> &[f64] {
        &self.gold_average
    }

    /// Predicted ranks with ties replaced by their average position
    #[must_use]
    pub fn predicted_average(&self) -> &[f64] {
        &self.predicted_average
    }

    /// Pair classifications over ranked candidates, in [`Pairs`] order
    #[must_use]
    pub fn pair_orders(&self) -> &[PairOrder] {
        &self.orders
    }

    /// Pair statistics
    #[must_use]
    pub fn concordance(&self) -> &Concordance {
        &self.concordance
    }

    /// Policy used for the normalized vectors
    #[must_use]
    pub fn policy(&self) -> TiePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(value: f64) -> Rank {
        Rank::new(value).unwrap()
    }

    #[test]
    fn test_normalize_messy_ranking() {
        let ranks = [1.0, 3.0, 5.0, 4.0];
        for policy in [
            TiePolicy::Minimize,
            TiePolicy::Floor,
            TiePolicy::Ceiling,
            TiePolicy::Middle,
        ] {
            assert_eq!(normalize(&ranks, policy), vec![1.0, 2.0, 4.0, 3.0]);
        }
    }

    #[test]
    fn test_normalize_ties() {
        let ranks = [1.0, 1.0, 2.0];
        assert_eq!(normalize(&ranks, TiePolicy::Minimize), vec![1.0, 1.0, 2.0]);
        assert_eq!(normalize(&ranks, TiePolicy::Floor), vec![1.0, 1.0, 3.0]);
        assert_eq!(normalize(&ranks, TiePolicy::Ceiling), vec![2.0, 2.0, 3.0]);
        assert_eq!(normalize(&ranks, TiePolicy::Middle), vec![1.5, 1.5, 3.0]);
    }

    #[test]
    fn test_normalize_fractional_input() {
        let ranks = [1.0, 3.0, 2.2, 0.1];
        assert_eq!(
            normalize(&ranks, TiePolicy::Ceiling),
            vec![2.0, 4.0, 3.0, 1.0]
        );
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize(&[], TiePolicy::Middle).is_empty());
    }

    #[test]
    fn test_tie_classes() {
        let classes = tie_classes(&[2.0, 1.0, 2.0, 3.0]);
        assert_eq!(classes.len(), 3);
        assert_eq!(classes[0].members, vec![1]);
        assert_eq!(classes[1].members, vec![0, 2]);
        assert!(classes[1].is_tie());
        assert!((classes[2].rank - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare() {
        assert_eq!(TieResolver::compare(rank(1.0), rank(2.0)), Ordering::Less);
        assert_eq!(TieResolver::compare(rank(2.0), rank(2.0)), Ordering::Equal);
        assert_eq!(TieResolver::compare(rank(5.0), rank(2.0)), Ordering::Greater);
    }

    #[test]
    fn test_classify() {
        let (one, two) = (rank(1.0), rank(2.0));
        assert_eq!(TieResolver::classify((one, two), (one, two)), PairOrder::Concordant);
        assert_eq!(TieResolver::classify((one, two), (two, one)), PairOrder::Discordant);
        assert_eq!(TieResolver::classify((one, one), (one, two)), PairOrder::GoldTie);
        assert_eq!(TieResolver::classify((one, one), (one, one)), PairOrder::GoldTie);
        assert_eq!(TieResolver::classify((one, two), (two, two)), PairOrder::PredictedTie);
    }

    #[test]
    fn test_classify_preserves_gaps() {
        // gaps are not closed before comparing
        let order = TieResolver::classify((rank(1.0), rank(5.0)), (rank(3.0), rank(4.0)));
        assert_eq!(order, PairOrder::Concordant);
    }

    #[test]
    fn test_resolve_concordance() {
        let group = RankGroup::from_ranks(
            "s1",
            &[(1.0, Some(1.0)), (2.0, Some(3.0)), (2.0, Some(2.0)), (3.0, None)],
        )
        .unwrap();
        let resolved = TieResolver::default().resolve(&group);
        let c = resolved.concordance();

        assert_eq!(resolved.len(), 3);
        assert_eq!(c.pairs, 6);
        assert_eq!(c.unranked_pairs, 3);
        assert_eq!(c.ranked_pairs(), 3);
        assert_eq!(c.concordant, 2);
        assert_eq!(c.gold_ties, 1);
        assert_eq!(c.discordant, 0);
        assert_eq!(resolved.pair_orders().len(), 3);
    }

    #[test]
    fn test_decisive_predicted_ties() {
        let group =
            RankGroup::from_ranks("s1", &[(1.0, Some(1.0)), (2.0, Some(1.0)), (3.0, Some(2.0))])
                .unwrap();
        let resolved = TieResolver::default().resolve(&group);
        let c = resolved.concordance();

        assert_eq!(c.predicted_only_ties, 1);
        assert_eq!(c.predicted_ties, 1);
        assert_eq!(c.decisive(true), (2, 1));
        assert_eq!(c.decisive(false), (2, 0));
        assert_eq!(c.valid_pairs(true), 3);
    }

    #[test]
    fn test_resolve_average_ranks() {
        let group =
            RankGroup::from_ranks("s1", &[(1.0, Some(1.0)), (1.0, Some(2.0)), (4.0, Some(3.0))])
                .unwrap();
        let resolved = TieResolver::new(TiePolicy::Ceiling).resolve(&group);
        assert_eq!(resolved.gold_average(), &[1.5, 1.5, 3.0]);
        assert_eq!(resolved.gold_normalized(), &[2.0, 2.0, 3.0]);
        assert_eq!(resolved.gold_raw(), &[1.0, 1.0, 4.0]);
        assert_eq!(resolved.predicted_normalized(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concordance_add_assign() {
        let mut total = Concordance::default();
        let part = Concordance {
            pairs: 3,
            concordant: 2,
            discordant: 1,
            ..Concordance::default()
        };
        total += &part;
        total += &part;
        assert_eq!(total.pairs, 6);
        assert_eq!(total.concordant, 4);
        assert_eq!(total.discordant, 2);
    }
}
