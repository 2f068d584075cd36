//! Metric catalog: the set of metrics a run computes
//!
//! Adding a metric means implementing [`Metric`] and registering it; no
//! core code changes.

use crate::{
    config::EvalConfig,
    metrics::{
        BestPickGoldRank, DeltaAvg, ExpectedReciprocalRank, KendallTau, Metric, MetricResult,
        Ndcg, PairwiseAgreement, RankCorrelation, ReciprocalRank, Weighting,
    },
    ties::ResolvedGroup,
    Error, Result,
};

/// Ordered collection of metrics with their aggregation weighting
#[derive(Default)]
pub struct MetricCatalog {
    entries: Vec<(Box<dyn Metric>, Weighting)>,
}

impl std::fmt::Debug for MetricCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|(metric, weighting)| (metric.name(), *weighting)),
            )
            .finish()
    }
}

impl MetricCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairwise agreement, rank correlation and DeltaAvg
    #[must_use]
    pub fn core(config: &EvalConfig) -> Self {
        Self::new()
            .with_metric(PairwiseAgreement::new(config.penalize_predicted_ties))
            .with_metric(RankCorrelation)
            .with_metric(DeltaAvg::new(config.quality_proxy))
    }

    /// The core metrics plus Kendall tau, reciprocal rank, nDCG, ERR and best pick
    #[must_use]
    pub fn standard(config: &EvalConfig) -> Self {
        Self::core(config)
            .with_metric(KendallTau::new(config.penalize_predicted_ties))
            .with_metric(ReciprocalRank)
            .with_metric(Ndcg::new(config.ndcg_cutoff))
            .with_metric(ExpectedReciprocalRank)
            .with_metric(BestPickGoldRank)
    }

    /// Add a metric (builder style)
    #[must_use]
    pub fn with_metric(mut self, metric: impl Metric + 'static) -> Self {
        self.register(Box::new(metric));
        self
    }

    /// Add a metric with its declared weighting, replacing one of the same name
    pub fn register(&mut self, metric: Box<dyn Metric>) {
        let weighting = metric.weighting();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name() == metric.name())
        {
            Some(entry) => *entry = (metric, weighting),
            None => self.entries.push((metric, weighting)),
        }
    }

    /// Override the aggregation weighting of a registered metric
    pub fn with_weighting(mut self, name: &str, weighting: Weighting) -> Result<Self> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(metric, _)| metric.name() == name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))?;
        entry.1 = weighting;
        Ok(self)
    }

    /// Keep only the named metrics, in the given order
    pub fn select<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if selected
                .iter()
                .any(|(metric, _): &(Box<dyn Metric>, Weighting)| metric.name() == name)
            {
                continue;
            }
            let position = self
                .entries
                .iter()
                .position(|(metric, _)| metric.name() == name)
                .ok_or_else(|| Error::UnknownMetric(name.to_string()))?;
            selected.push(self.entries.remove(position));
        }
        self.entries = selected;
        Ok(self)
    }

    /// Metric names in evaluation order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(metric, _)| metric.name()).collect()
    }

    /// Registered metrics with their weighting
    pub fn entries(&self) -> impl Iterator<Item = (&dyn Metric, Weighting)> {
        self.entries
            .iter()
            .map(|(metric, weighting)| (metric.as_ref(), *weighting))
    }

    /// Number of metrics
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog has no metrics
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every metric on one resolved group
    #[must_use]
    pub fn evaluate(&self, group: &ResolvedGroup<'_>) -> Vec<MetricResult> {
        self.entries
            .iter()
            .map(|(metric, weighting)| MetricResult {
                metric: metric.name().to_string(),
                group_id: group.id().to_string(),
                weighting: *weighting,
                outcome: metric.evaluate(group),
            })
            .collect()
    }
}
