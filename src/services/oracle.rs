use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when asking the comparison oracle about a pair
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Verdict returned by the oracle for one image pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    pub confidence: f64,
}

impl Comparison {
    /// Build a verdict, rejecting confidences that are NaN or outside [0, 1]
    pub fn new(is_match: bool, confidence: f64) -> Result<Self, OracleError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(OracleError::ConfidenceOutOfRange(confidence));
        }
        Ok(Self { is_match, confidence })
    }

    /// The verdict substituted when a pair could not be evaluated
    pub fn non_match() -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
        }
    }
}

/// External face comparison service
///
/// Implementations may be slow and may fail; callers decide how failures
/// are downgraded.
#[async_trait]
pub trait FaceComparator: Send + Sync {
    /// Decide whether two images show the same individual
    async fn compare(&self, image_a: &[u8], image_b: &[u8]) -> Result<Comparison, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_accepts_bounds() {
        assert!(Comparison::new(true, 0.0).is_ok());
        assert!(Comparison::new(true, 1.0).is_ok());
        assert!(Comparison::new(false, 0.42).is_ok());
    }

    #[test]
    fn test_comparison_rejects_out_of_range() {
        assert!(matches!(
            Comparison::new(true, 1.2),
            Err(OracleError::ConfidenceOutOfRange(_))
        ));
        assert!(Comparison::new(true, -0.01).is_err());
        assert!(Comparison::new(true, f64::NAN).is_err());
    }

    #[test]
    fn test_comparison_deserializes_camel_case() {
        let c: Comparison = serde_json::from_str(r#"{"isMatch":true,"confidence":0.91}"#).unwrap();
        assert!(c.is_match);
        assert_eq!(c.confidence, 0.91);
    }
}
