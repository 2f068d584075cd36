//! rankeval: ranking agreement evaluation
//!
//! Scores a predicted ranking against a gold ranking over groups of
//! candidates that share one context (e.g. the translations of one source
//! sentence), then aggregates per-group scores into corpus-level metrics.
//!
//! # Quick Start
//!
//! ```rust
//! use rankeval::{EvalConfig, EvaluationRunner, RankGroup};
//!
//! let groups = vec![
//!     RankGroup::from_ranks("a", &[(1.0, Some(1.0)), (2.0, Some(2.0))]).unwrap(),
//!     RankGroup::from_ranks("b", &[(1.0, Some(2.0)), (2.0, Some(1.0))]).unwrap(),
//! ];
//!
//! let runner = EvaluationRunner::from_config(&EvalConfig::default()).unwrap();
//! let report = runner.run(&groups).unwrap();
//!
//! assert_eq!(report.value("pairwise_agreement"), Some(0.5));
//! assert_eq!(report.metric("pairwise_agreement").unwrap().groups_used, 2);
//! ```
//!
//! # Metrics
//!
//! - [`PairwiseAgreement`] - concordant share of gold-ordered pairs
//! - [`RankCorrelation`] - Spearman correlation with tie adjustment
//! - [`DeltaAvg`] - quality gain of the predicted top-k
//! - [`KendallTau`] - WMT12 segment tau, pooled over pairs
//! - [`ReciprocalRank`], [`Ndcg`], [`ExpectedReciprocalRank`] - positional
//! - [`BestPickGoldRank`] - where the predicted winner really ranks
//!
//! # Example: Custom Metric
//!
//! ```rust
//! use rankeval::{
//!     metrics::{Metric, MetricOutcome, MetricValue},
//!     EvaluationRunner, MetricCatalog, RankGroup, ResolvedGroup,
//! };
//!
//! struct RankedShare;
//!
//! impl Metric for RankedShare {
//!     fn name(&self) -> &str {
//!         "ranked_share"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "share of candidates carrying a predicted rank"
//!     }
//!
//!     fn evaluate(&self, group: &ResolvedGroup<'_>) -> MetricOutcome {
//!         let size = group.group().size();
//!         Ok(MetricValue::new(group.len() as f64 / size as f64, size, 0))
//!     }
//! }
//!
//! let group = RankGroup::from_ranks("s1", &[(1.0, Some(1.0)), (2.0, Some(2.0)), (3.0, None)])
//!     .unwrap();
//! let runner = EvaluationRunner::new(MetricCatalog::new().with_metric(RankedShare));
//! let report = runner.run(&[group]).unwrap();
//! assert!((report.value("ranked_share").unwrap() - 2.0 / 3.0).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod group;
pub mod judgments;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod ties;

pub use aggregate::{Accumulator, Aggregator, MetricSummary};
pub use catalog::MetricCatalog;
pub use config::{EvalConfig, ProxyScale, RankAttributes};
pub use error::{DegenerateGroup, Error, Result};
pub use group::{Candidate, Pairs, Rank, RankGroup};
pub use judgments::{load_groups, JudgmentDocument, LoadedCorpus};
pub use metrics::{
    BestPickGoldRank, DeltaAvg, ExpectedReciprocalRank, KendallTau, Metric, MetricResult,
    MetricValue, Ndcg, PairwiseAgreement, RankCorrelation, ReciprocalRank, Weighting,
};
pub use report::{BestPickHistogram, CorpusReport, GroupEvaluation, PairCoverage};
pub use runner::EvaluationRunner;
pub use ties::{Concordance, PairOrder, ResolvedGroup, TiePolicy, TieResolver};
