//! Ranked groups: candidates judged relative to one shared context

use crate::{Error, Result};
use serde::Serialize;
use std::iter::FusedIterator;

/// A positive, finite rank value.
///
/// Ranks are kept as `f64` so intermediate positions (e.g. `2.5`) coming
/// from score-derived rankings survive; equal values form a tie.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rank(f64);

impl Rank {
    /// Create a rank, rejecting zero, negative and non-finite values
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    /// The raw rank value
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ranked item within a group. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    gold: Rank,
    predicted: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl Candidate {
    /// Create a candidate with a gold rank and no prediction
    #[must_use]
    pub fn new(gold: Rank) -> Self {
        Self {
            gold,
            predicted: None,
            quality: None,
            score: None,
        }
    }

    /// Set the predicted rank
    #[must_use]
    pub fn with_predicted(mut self, predicted: Rank) -> Self {
        self.predicted = Some(predicted);
        self
    }

    /// Set the numeric gold quality (higher is better)
    #[must_use]
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Set the continuous score the predicted rank was derived from
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Gold (reference) rank
    #[must_use]
    pub fn gold(&self) -> Rank {
        self.gold
    }

    /// Predicted rank, if the system under evaluation ranked this candidate
    #[must_use]
    pub fn predicted(&self) -> Option<Rank> {
        self.predicted
    }

    /// Numeric gold quality, if judged
    #[must_use]
    pub fn quality(&self) -> Option<f64> {
        self.quality
    }

    /// Continuous prediction score, if any
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Whether the candidate carries a predicted rank
    #[must_use]
    pub fn is_ranked(&self) -> bool {
        self.predicted.is_some()
    }
}

/// Ordered collection of candidates sharing one context id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankGroup {
    id: String,
    candidates: Vec<Candidate>,
    #[serde(skip)]
    offered: usize,
}

impl RankGroup {
    /// Create an empty group
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidates: Vec::new(),
            offered: 0,
        }
    }

    /// Build a group from `(gold, predicted)` pairs, failing on the first malformed one
    pub fn from_ranks(id: impl Into<String>, ranks: &[(f64, Option<f64>)]) -> Result<Self> {
        let mut group = Self::new(id);
        for &(gold, predicted) in ranks {
            group.add_candidate(Some(gold), predicted)?;
        }
        Ok(group)
    }

    /// Add a candidate from raw rank values.
    ///
    /// Fails with [`Error::MalformedRank`] when the gold rank is missing or
    /// non-positive, or a present predicted rank is non-positive. A failed
    /// candidate is not added; the group stays usable.
    pub fn add_candidate(&mut self, gold: Option<f64>, predicted: Option<f64>) -> Result<()> {
        self.add_candidate_with_quality(gold, predicted, None)
    }

    /// Like [`add_candidate`](Self::add_candidate), also attaching a numeric gold quality
    pub fn add_candidate_with_quality(
        &mut self,
        gold: Option<f64>,
        predicted: Option<f64>,
        quality: Option<f64>,
    ) -> Result<()> {
        let Some(gold_value) = gold else {
            return Err(self.malformed("gold rank missing"));
        };
        let Some(gold) = Rank::new(gold_value) else {
            return Err(self.malformed(format!("gold rank {gold_value} is not positive")));
        };

        let mut candidate = Candidate::new(gold);
        if let Some(predicted_value) = predicted {
            let Some(predicted) = Rank::new(predicted_value) else {
                return Err(
                    self.malformed(format!("predicted rank {predicted_value} is not positive"))
                );
            };
            candidate = candidate.with_predicted(predicted);
        }
        if let Some(quality) = quality {
            if !quality.is_finite() {
                return Err(self.malformed(format!("gold quality {quality} is not finite")));
            }
            candidate = candidate.with_quality(quality);
        }

        self.push(candidate);
        Ok(())
    }

    /// Append an already validated candidate
    pub fn push(&mut self, candidate: Candidate) {
        self.offered += 1;
        self.candidates.push(candidate);
    }

    /// Record a rejected candidate at the current document position
    pub(crate) fn malformed(&mut self, reason: impl Into<String>) -> Error {
        let candidate = self.offered;
        self.offered += 1;
        Error::MalformedRank {
            group: self.id.clone(),
            candidate,
            reason: reason.into(),
        }
    }

    /// Context id shared by the candidates
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Accepted candidates in document order
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of accepted candidates
    #[must_use]
    pub fn size(&self) -> usize {
        self.candidates.len()
    }

    /// Check if the group has no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of candidates carrying a predicted rank
    #[must_use]
    pub fn ranked_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_ranked()).count()
    }

    /// All unordered candidate index pairs `(i, j)` with `i < j`.
    ///
    /// Calling this again restarts the sequence.
    #[must_use]
    pub fn pairs(&self) -> Pairs {
        Pairs::new(self.candidates.len())
    }

    /// `size * (size - 1) / 2`
    #[must_use]
    pub fn pair_count(&self) -> usize {
        pair_count(self.candidates.len())
    }
}

/// Number of unordered pairs among `n` items
#[must_use]
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Lazy iterator over unordered index pairs of `n` items
#[derive(Debug, Clone)]
pub struct Pairs {
    n: usize,
    i: usize,
    j: usize,
}

impl Pairs {
    /// Pairs over `n` items
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n, i: 0, j: 1 }
    }
}

impl Iterator for Pairs {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.i + 1 < self.n {
            if self.j < self.n {
                let pair = (self.i, self.j);
                self.j += 1;
                return Some(pair);
            }
            self.i += 1;
            self.j = self.i + 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.i + 1 < self.n {
            (self.n - self.j) + pair_count(self.n - self.i - 1)
        } else {
            0
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pairs {}

impl FusedIterator for Pairs {}
