//! Evaluation runner: groups in, corpus report out
//!
//! The runner holds no state between runs. Per-group evaluation is
//! independent; with the `parallel` feature it runs on the rayon pool and
//! results are folded in input order, so both paths sum floats identically.

use crate::{
    aggregate::Aggregator,
    catalog::MetricCatalog,
    config::EvalConfig,
    group::RankGroup,
    judgments::LoadedCorpus,
    metrics::best_pick,
    report::{segment_tau, BestPickHistogram, CorpusReport, GroupEvaluation, PairCoverage},
    ties::{Concordance, TieResolver},
    Error, Result,
};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs a metric catalog over a corpus of groups
#[derive(Debug)]
pub struct EvaluationRunner {
    catalog: MetricCatalog,
    resolver: TieResolver,
    penalize_predicted_ties: bool,
    keep_group_results: bool,
}

impl EvaluationRunner {
    /// Create a runner with default tie handling
    #[must_use]
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            resolver: TieResolver::default(),
            penalize_predicted_ties: true,
            keep_group_results: false,
        }
    }

    /// Create a runner with the standard catalog configured from `config`
    pub fn from_config(config: &EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(MetricCatalog::standard(config))
            .with_resolver(TieResolver::new(config.tie_policy))
            .with_penalize_predicted_ties(config.penalize_predicted_ties))
    }

    /// Set the tie resolver
    #[must_use]
    pub fn with_resolver(mut self, resolver: TieResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set predicted-tie handling for the pooled pair statistics
    #[must_use]
    pub fn with_penalize_predicted_ties(mut self, penalize: bool) -> Self {
        self.penalize_predicted_ties = penalize;
        self
    }

    /// Keep per-group results in the report
    #[must_use]
    pub fn with_group_results(mut self, keep: bool) -> Self {
        self.keep_group_results = keep;
        self
    }

    /// The metric catalog
    #[must_use]
    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Resolve one group and run every metric on it
    #[must_use]
    pub fn evaluate_group(&self, group: &RankGroup) -> GroupEvaluation {
        let resolved = self.resolver.resolve(group);
        let results = self.catalog.evaluate(&resolved);

        for result in &results {
            if let Err(reason) = &result.outcome {
                tracing::debug!(
                    group = group.id(),
                    metric = %result.metric,
                    %reason,
                    "metric skipped"
                );
            }
        }
        tracing::debug!(
            group = group.id(),
            size = group.size(),
            ranked = resolved.len(),
            "evaluated group"
        );

        GroupEvaluation {
            group_id: group.id().to_string(),
            size: group.size(),
            ranked: resolved.len(),
            concordance: *resolved.concordance(),
            best_pick: if resolved.len() >= 2 {
                best_pick(&resolved)
            } else {
                None
            },
            results,
        }
    }

    /// Evaluate a corpus of groups.
    ///
    /// Fails with [`Error::NoValidGroups`] when no group has at least two
    /// candidates carrying a predicted rank.
    pub fn run(&self, groups: &[RankGroup]) -> Result<CorpusReport> {
        self.run_with_rejected(groups, 0)
    }

    /// Evaluate loaded judgments, reporting rejected candidates
    pub fn run_corpus(&self, corpus: &LoadedCorpus) -> Result<CorpusReport> {
        for rejected in &corpus.rejected {
            tracing::warn!(error = %rejected, "candidate rejected");
        }
        self.run_with_rejected(&corpus.groups, corpus.rejected.len())
    }

    fn run_with_rejected(
        &self,
        groups: &[RankGroup],
        candidates_rejected: usize,
    ) -> Result<CorpusReport> {
        #[cfg(feature = "parallel")]
        let evaluations: Vec<GroupEvaluation> =
            groups.par_iter().map(|g| self.evaluate_group(g)).collect();
        #[cfg(not(feature = "parallel"))]
        let evaluations: Vec<GroupEvaluation> =
            groups.iter().map(|g| self.evaluate_group(g)).collect();

        let mut aggregator = Aggregator::new();
        let mut concordance = Concordance::default();
        let mut groups_with_predicted_ties = 0;
        let mut segment_taus = Vec::new();
        let mut picks = Vec::new();
        let mut groups_usable = 0;

        for evaluation in &evaluations {
            aggregator.extend(&evaluation.results);
            concordance += &evaluation.concordance;
            if evaluation.concordance.predicted_ties > 0 {
                groups_with_predicted_ties += 1;
            }
            segment_taus.extend(segment_tau(
                &evaluation.concordance,
                self.penalize_predicted_ties,
            ));
            if evaluation.is_usable() {
                groups_usable += 1;
            }
            picks.extend(evaluation.best_pick);
        }

        if groups_usable == 0 {
            tracing::warn!(groups = groups.len(), "no usable groups");
            return Err(Error::NoValidGroups {
                groups: groups.len(),
            });
        }

        let metrics = aggregator.finish();
        let notes = metrics
            .values()
            .flat_map(|summary| {
                summary.notes.iter().map(move |(note, count)| {
                    format!("{}: {note} in {count} group(s)", summary.metric)
                })
            })
            .collect();

        tracing::info!(
            groups = groups.len(),
            usable = groups_usable,
            rejected = candidates_rejected,
            metrics = metrics.len(),
            "evaluation complete"
        );

        Ok(CorpusReport {
            metrics,
            groups_total: groups.len(),
            groups_usable,
            candidates_rejected,
            coverage: PairCoverage::new(
                concordance,
                self.penalize_predicted_ties,
                groups_with_predicted_ties,
            )
            .with_segments(&segment_taus, groups_usable),
            best_pick: BestPickHistogram::from_picks(picks),
            notes,
            groups: if self.keep_group_results {
                evaluations
            } else {
                Vec::new()
            },
        })
    }
}
