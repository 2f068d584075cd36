//! Error types for rankeval

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for rankeval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for loading and evaluating ranked groups
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate rank is missing, unparsable or non-positive
    #[error("malformed rank for candidate {candidate} in group {group}: {reason}")]
    MalformedRank {
        /// Group the candidate belongs to
        group: String,
        /// Zero-based position of the candidate in document order
        candidate: usize,
        /// What was wrong with the rank
        reason: String,
    },

    /// No group in the corpus can support any metric
    #[error("no valid groups found among {groups} group(s)")]
    NoValidGroups {
        /// Number of groups inspected
        groups: usize,
    },

    /// Metric name not present in the catalog
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Judgment document has an unexpected shape
    #[error("invalid judgment document: {0}")]
    InvalidDocument(String),

    /// Serialization error (serde_json)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason a group cannot support a particular metric.
///
/// This is not fatal: the (group, metric) pair is skipped and the reason is
/// recorded in the report. The `Display` text is the reported skip reason.
#[derive(
    Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateGroup {
    /// Fewer than two candidates carry a predicted rank
    #[error("fewer than two ranked candidates")]
    TooFewCandidates,

    /// Every pair is tied on the gold side
    #[error("all gold ranks tied")]
    AllGoldTied,

    /// Zero variance in the gold or predicted ranks, or too few
    /// candidates for a correlation
    #[error("degenerate")]
    ZeroVariance,

    /// Defined value whose aggregation weight is zero under the metric's
    /// weighting rule
    #[error("zero aggregation weight")]
    ZeroWeight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed_rank() {
        let err = Error::MalformedRank {
            group: "s1".to_string(),
            candidate: 2,
            reason: "gold rank missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed rank for candidate 2 in group s1: gold rank missing"
        );
    }

    #[test]
    fn test_error_display_no_valid_groups() {
        let err = Error::NoValidGroups { groups: 3 };
        assert_eq!(err.to_string(), "no valid groups found among 3 group(s)");
    }

    #[test]
    fn test_degenerate_reasons() {
        assert_eq!(
            DegenerateGroup::TooFewCandidates.to_string(),
            "fewer than two ranked candidates"
        );
        assert_eq!(DegenerateGroup::AllGoldTied.to_string(), "all gold ranks tied");
        assert_eq!(DegenerateGroup::ZeroVariance.to_string(), "degenerate");
        assert_eq!(DegenerateGroup::ZeroWeight.to_string(), "zero aggregation weight");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(err.to_string().starts_with("serialization error"));
    }

    #[test]
    fn test_result_type() {
        fn may_fail(succeed: bool) -> Result<i32> {
            if succeed {
                Ok(42)
            } else {
                Err(Error::InvalidConfig("test".to_string()))
            }
        }

        assert_eq!(may_fail(true).unwrap(), 42);
        assert!(may_fail(false).is_err());
    }
}
