//! Evaluation configuration

use crate::{ties::TiePolicy, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the candidate attributes holding the ranks.
///
/// Resolved once when the judgments are loaded, never per candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankAttributes {
    /// Attribute carrying the gold (reference) rank
    pub gold: String,
    /// Attribute carrying the predicted rank
    pub predicted: String,
    /// Attribute carrying a numeric gold quality, if the judgments have one
    #[serde(default)]
    pub quality: Option<String>,
}

impl RankAttributes {
    /// Create and validate an attribute mapping
    pub fn new(gold: impl Into<String>, predicted: impl Into<String>) -> Result<Self> {
        let attributes = Self {
            gold: gold.into(),
            predicted: predicted.into(),
            quality: None,
        };
        attributes.validate()?;
        Ok(attributes)
    }

    /// Also read a numeric gold quality from `quality`
    pub fn with_quality(mut self, quality: impl Into<String>) -> Result<Self> {
        self.quality = Some(quality.into());
        self.validate()?;
        Ok(self)
    }

    /// Check names are non-empty and distinct
    pub fn validate(&self) -> Result<()> {
        if self.gold.trim().is_empty() {
            return Err(Error::InvalidConfig("gold rank attribute name is empty".to_string()));
        }
        if self.predicted.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "predicted rank attribute name is empty".to_string(),
            ));
        }
        if self.gold == self.predicted {
            return Err(Error::InvalidConfig(format!(
                "gold and predicted ranks both read from attribute '{}'",
                self.gold
            )));
        }
        if let Some(quality) = &self.quality {
            if quality.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "quality attribute name is empty".to_string(),
                ));
            }
            if quality == &self.gold || quality == &self.predicted {
                return Err(Error::InvalidConfig(format!(
                    "quality attribute '{quality}' is already used for a rank"
                )));
            }
        }
        Ok(())
    }
}

/// Scale of the gold-quality proxy used by DeltaAvg when no numeric
/// quality is judged.
///
/// The proxy inverts the gold rank `g` as `(S + 1 - g) / S`; DeltaAvg is
/// linear in quality, so `S` only rescales the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyScale {
    /// `S` = number of ranked candidates in the group
    #[default]
    GroupSize,
    /// `S` = largest normalized gold rank in the group
    MaxRank,
    /// No division: quality = `n + 1 - g`
    Unscaled,
}

/// Metric and tie-handling options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Tie policy for positional ranks (reciprocal rank, nDCG, ERR, best pick)
    pub tie_policy: TiePolicy,
    /// Count a predicted tie on a gold-ordered pair as a disagreement
    pub penalize_predicted_ties: bool,
    /// Gold-quality proxy scale for DeltaAvg
    pub quality_proxy: ProxyScale,
    /// nDCG cutoff; `None` uses the whole group
    pub ndcg_cutoff: Option<usize>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            tie_policy: TiePolicy::Ceiling,
            penalize_predicted_ties: true,
            quality_proxy: ProxyScale::GroupSize,
            ndcg_cutoff: None,
        }
    }
}

impl EvalConfig {
    /// Check option values
    pub fn validate(&self) -> Result<()> {
        if self.ndcg_cutoff == Some(0) {
            return Err(Error::InvalidConfig("ndcg_cutoff must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_attributes_valid() {
        let attrs = RankAttributes::new("rank", "pred_rank").unwrap();
        assert_eq!(attrs.gold, "rank");
        assert_eq!(attrs.predicted, "pred_rank");
        assert!(attrs.quality.is_none());
    }

    #[test]
    fn test_rank_attributes_empty_name() {
        assert!(matches!(
            RankAttributes::new("", "pred"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(RankAttributes::new("rank", "  ").is_err());
    }

    #[test]
    fn test_rank_attributes_same_name() {
        let err = RankAttributes::new("rank", "rank").unwrap_err();
        assert!(err.to_string().contains("both read from attribute 'rank'"));
    }

    #[test]
    fn test_rank_attributes_quality() {
        let attrs = RankAttributes::new("rank", "pred")
            .unwrap()
            .with_quality("score")
            .unwrap();
        assert_eq!(attrs.quality.as_deref(), Some("score"));

        assert!(RankAttributes::new("rank", "pred")
            .unwrap()
            .with_quality("rank")
            .is_err());
    }

    #[test]
    fn test_eval_config_defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.tie_policy, TiePolicy::Ceiling);
        assert!(config.penalize_predicted_ties);
        assert_eq!(config.quality_proxy, ProxyScale::GroupSize);
        assert!(config.ndcg_cutoff.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eval_config_partial_json() {
        let config =
            EvalConfig::from_json_str(r#"{"penalize_predicted_ties": false, "tie_policy": "middle"}"#)
                .unwrap();
        assert!(!config.penalize_predicted_ties);
        assert_eq!(config.tie_policy, TiePolicy::Middle);
        assert_eq!(config.quality_proxy, ProxyScale::GroupSize);
    }

    #[test]
    fn test_eval_config_rejects_zero_cutoff() {
        let err = EvalConfig::from_json_str(r#"{"ndcg_cutoff": 0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_eval_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"quality_proxy": "max_rank", "ndcg_cutoff": 3}"#).unwrap();

        let config = EvalConfig::from_json_file(&path).unwrap();
        assert_eq!(config.quality_proxy, ProxyScale::MaxRank);
        assert_eq!(config.ndcg_cutoff, Some(3));
    }

    #[test]
    fn test_eval_config_missing_file() {
        let err = EvalConfig::from_json_file("/nonexistent/rankeval.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
