//! Property-based tests for rankeval

use proptest::prelude::*;
use rankeval::{
    group::pair_count,
    metrics::{names, Metric},
    ties::normalize,
    Aggregator, DeltaAvg, EvalConfig, EvaluationRunner, KendallTau, MetricCatalog, Ndcg, Pairs,
    PairwiseAgreement, RankCorrelation, RankGroup, TiePolicy, TieResolver,
};

const EPS: f64 = 1e-9;

/// A shuffled permutation of `1..=n` as ranks
fn permutation(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (2usize..max_len).prop_flat_map(|n| {
        Just((1..=n).map(|r| r as f64).collect::<Vec<f64>>()).prop_shuffle()
    })
}

/// Gold and predicted ranks of equal length, ties allowed
fn tied_rankings() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (2usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec(1u8..5, n),
            prop::collection::vec(1u8..5, n),
        )
            .prop_map(|(g, p)| {
                (
                    g.into_iter().map(f64::from).collect(),
                    p.into_iter().map(f64::from).collect(),
                )
            })
    })
}

fn group(gold: &[f64], predicted: &[f64]) -> RankGroup {
    let ranks: Vec<_> = gold.iter().zip(predicted).map(|(&g, &p)| (g, Some(p))).collect();
    RankGroup::from_ranks("g", &ranks).unwrap()
}

fn value(metric: &dyn Metric, group: &RankGroup) -> Option<f64> {
    metric
        .evaluate(&TieResolver::default().resolve(group))
        .ok()
        .map(|v| v.value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_identical_rankings_agree_fully(gold in permutation(12)) {
        let g = group(&gold, &gold);

        prop_assert!((value(&PairwiseAgreement::default(), &g).unwrap() - 1.0).abs() < EPS);
        prop_assert!((value(&RankCorrelation, &g).unwrap() - 1.0).abs() < EPS);
        prop_assert!((value(&KendallTau::default(), &g).unwrap() - 1.0).abs() < EPS);
        prop_assert!((value(&Ndcg::default(), &g).unwrap() - 1.0).abs() < EPS);
        prop_assert!(value(&DeltaAvg::default(), &g).unwrap() > 0.0);
    }

    #[test]
    fn prop_reversed_rankings_disagree_fully(gold in permutation(12)) {
        let n = gold.len() as f64;
        let reversed: Vec<f64> = gold.iter().map(|r| n + 1.0 - r).collect();
        let g = group(&gold, &reversed);

        prop_assert!(value(&PairwiseAgreement::default(), &g).unwrap().abs() < EPS);
        prop_assert!((value(&RankCorrelation, &g).unwrap() + 1.0).abs() < EPS);
        prop_assert!(value(&DeltaAvg::default(), &g).unwrap() < 0.0);
    }

    #[test]
    fn prop_metric_ranges((gold, predicted) in tied_rankings()) {
        let g = group(&gold, &predicted);

        if let Some(agreement) = value(&PairwiseAgreement::default(), &g) {
            prop_assert!((0.0..=1.0).contains(&agreement));
        }
        if let Some(rho) = value(&RankCorrelation, &g) {
            prop_assert!((-1.0..=1.0).contains(&rho));
        }
        if let Some(tau) = value(&KendallTau::default(), &g) {
            prop_assert!((-1.0..=1.0).contains(&tau));
        }
        if let Some(ndcg) = value(&Ndcg::default(), &g) {
            prop_assert!(ndcg > 0.0 && ndcg <= 1.0 + EPS);
        }
    }

    #[test]
    fn prop_tau_is_rescaled_agreement((gold, predicted) in tied_rankings()) {
        let g = group(&gold, &predicted);
        let agreement = value(&PairwiseAgreement::default(), &g);
        let tau = value(&KendallTau::default(), &g);

        prop_assert_eq!(agreement.is_some(), tau.is_some());
        if let (Some(agreement), Some(tau)) = (agreement, tau) {
            prop_assert!((tau - (2.0 * agreement - 1.0)).abs() < EPS);
        }
    }

    #[test]
    fn prop_normalize_preserves_order(
        ranks in prop::collection::vec(1u8..8, 1..15),
        policy in prop_oneof![
            Just(TiePolicy::Minimize),
            Just(TiePolicy::Floor),
            Just(TiePolicy::Ceiling),
            Just(TiePolicy::Middle),
        ]
    ) {
        let ranks: Vec<f64> = ranks.into_iter().map(f64::from).collect();
        let normalized = normalize(&ranks, policy);

        prop_assert_eq!(normalized.len(), ranks.len());
        for (i, j) in Pairs::new(ranks.len()) {
            prop_assert_eq!(
                ranks[i].partial_cmp(&ranks[j]),
                normalized[i].partial_cmp(&normalized[j])
            );
        }
        for value in &normalized {
            prop_assert!(*value >= 1.0 && *value <= ranks.len() as f64);
        }
    }

    #[test]
    fn prop_pairs_count(n in 0usize..40) {
        let pairs: Vec<_> = Pairs::new(n).collect();
        prop_assert_eq!(pairs.len(), pair_count(n));
        prop_assert!(pairs.iter().all(|&(i, j)| i < j && j < n));
    }

    #[test]
    fn prop_aggregation_idempotent(corpus in prop::collection::vec(tied_rankings(), 1..8)) {
        let groups: Vec<RankGroup> = corpus.iter().map(|(g, p)| group(g, p)).collect();
        let catalog = MetricCatalog::standard(&EvalConfig::default());
        let resolver = TieResolver::default();
        let results: Vec<_> = groups
            .iter()
            .flat_map(|g| catalog.evaluate(&resolver.resolve(g)))
            .collect();

        for name in catalog.names() {
            let first = Aggregator::aggregate(name, &results);
            let second = Aggregator::aggregate(name, &results);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.groups_used + first.groups_skipped, groups.len());
            prop_assert_eq!(first.value.is_some(), first.groups_used > 0);
        }
    }

    #[test]
    fn prop_pooled_tau_matches_pair_weighted_mean(
        corpus in prop::collection::vec(tied_rankings(), 1..8)
    ) {
        let groups: Vec<RankGroup> = corpus.iter().map(|(g, p)| group(g, p)).collect();
        let runner = EvaluationRunner::from_config(&EvalConfig::default()).unwrap();
        let report = runner.run(&groups).unwrap();

        let aggregated = report.value(names::KENDALL_TAU);
        prop_assert_eq!(aggregated.is_some(), report.coverage.tau.is_some());
        if let (Some(aggregated), Some(pooled)) = (aggregated, report.coverage.tau) {
            prop_assert!((aggregated - pooled).abs() < EPS);
        }
    }
}
