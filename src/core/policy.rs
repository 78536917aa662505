use crate::core::fanout::PairResult;
use crate::models::AcceptedMatch;
use crate::services::oracle::Comparison;

/// Confidence required before a comparison is flagged for review
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Decides which comparison verdicts become potential matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    threshold: f64,
}

impl MatchPolicy {
    pub fn new(threshold: f64) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!("confidence threshold {} outside [0, 1]", threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A verdict is accepted iff it claims a match at or above the threshold
    #[inline]
    pub fn accepts(&self, verdict: &Comparison) -> bool {
        verdict.is_match && verdict.confidence >= self.threshold
    }

    /// Keep accepted verdicts, attributed to the sighting and their photo
    ///
    /// Failed and timed-out pairs count as non-matches. Scores pass through
    /// unchanged.
    pub fn accept_all(&self, sighting_id: i64, results: &[PairResult]) -> Vec<AcceptedMatch> {
        results
            .iter()
            .filter_map(|result| {
                let verdict = result.verdict();
                self.accepts(&verdict).then(|| AcceptedMatch {
                    sighting_id,
                    photo_id: result.photo_id,
                    confidence: verdict.confidence,
                })
            })
            .collect()
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fanout::PairOutcome;

    fn compared(photo_id: i64, is_match: bool, confidence: f64) -> PairResult {
        PairResult {
            photo_id,
            outcome: PairOutcome::Compared(Comparison::new(is_match, confidence).unwrap()),
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let policy = MatchPolicy::default();

        assert!(policy.accepts(&Comparison::new(true, 0.8).unwrap()));
        assert!(!policy.accepts(&Comparison::new(true, 0.7999).unwrap()));
    }

    #[test]
    fn test_non_match_never_accepted() {
        let policy = MatchPolicy::default();
        assert!(!policy.accepts(&Comparison::new(false, 1.0).unwrap()));
    }

    #[test]
    fn test_accept_all_mixed_verdicts() {
        let policy = MatchPolicy::default();
        let results = vec![
            compared(1, true, 0.95),
            compared(2, true, 0.5),
            compared(3, false, 0.9),
        ];

        let accepted = policy.accept_all(42, &results);

        assert_eq!(accepted, vec![AcceptedMatch {
            sighting_id: 42,
            photo_id: 1,
            confidence: 0.95,
        }]);
    }

    #[test]
    fn test_failed_and_timed_out_pairs_are_non_matches() {
        let policy = MatchPolicy::new(0.0).unwrap();
        let results = vec![
            PairResult { photo_id: 1, outcome: PairOutcome::Failed("boom".to_string()) },
            PairResult { photo_id: 2, outcome: PairOutcome::TimedOut },
        ];

        assert!(policy.accept_all(1, &results).is_empty());
    }

    #[test]
    fn test_threshold_must_be_a_probability() {
        assert!(MatchPolicy::new(1.01).is_err());
        assert!(MatchPolicy::new(-0.1).is_err());
        assert!(MatchPolicy::new(f64::NAN).is_err());
        assert_eq!(MatchPolicy::new(0.9).unwrap().threshold(), 0.9);
    }
}
