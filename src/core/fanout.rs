use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn, Instrument, Span};

use crate::models::CandidatePhoto;
use crate::services::{Comparison, FaceComparator, ImageSource};

/// Bounds applied to one sighting's comparisons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanOutLimits {
    /// Comparisons allowed in flight at once
    pub max_concurrency: usize,
    /// Budget for each image fetch and each oracle call
    pub call_timeout: Duration,
    /// Budget for the whole batch
    pub deadline: Duration,
}

impl Default for FanOutLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            call_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(120),
        }
    }
}

/// How a single (sighting, candidate) pair resolved
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Compared(Comparison),
    Failed(String),
    TimedOut,
}

/// Outcome attributed to its candidate photo
#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub photo_id: i64,
    pub outcome: PairOutcome,
}

impl PairResult {
    /// The verdict to judge; pairs that could not be evaluated are non-matches
    pub fn verdict(&self) -> Comparison {
        match &self.outcome {
            PairOutcome::Compared(verdict) => *verdict,
            PairOutcome::Failed(_) | PairOutcome::TimedOut => Comparison::non_match(),
        }
    }
}

/// Runs the comparison oracle against every candidate of one sighting
///
/// Pairs are independent: a failing or slow candidate is downgraded to a
/// non-match and never holds back its siblings beyond the batch deadline.
#[derive(Clone)]
pub struct ComparisonFanOut {
    comparator: Arc<dyn FaceComparator>,
    images: Arc<dyn ImageSource>,
    limits: FanOutLimits,
}

impl ComparisonFanOut {
    pub fn new(
        comparator: Arc<dyn FaceComparator>,
        images: Arc<dyn ImageSource>,
        limits: FanOutLimits,
    ) -> Self {
        Self {
            comparator,
            images,
            limits: FanOutLimits {
                max_concurrency: limits.max_concurrency.max(1),
                ..limits
            },
        }
    }

    pub fn limits(&self) -> FanOutLimits {
        self.limits
    }

    /// Compare the sighting image with every candidate
    ///
    /// Returns one result per distinct candidate photo, in completion order.
    pub async fn run(&self, sighting_image: Arc<[u8]>, candidates: Vec<CandidatePhoto>) -> Vec<PairResult> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let deadline = Instant::now() + self.limits.deadline;
        let semaphore = Arc::new(Semaphore::new(self.limits.max_concurrency));
        let mut pending: HashSet<i64> = HashSet::with_capacity(candidates.len());
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            if !pending.insert(candidate.photo_id) {
                continue;
            }

            let semaphore = semaphore.clone();
            let comparator = self.comparator.clone();
            let images = self.images.clone();
            let sighting_image = sighting_image.clone();
            let call_timeout = self.limits.call_timeout;

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        compare_pair(
                            comparator.as_ref(),
                            images.as_ref(),
                            &sighting_image,
                            &candidate,
                            call_timeout,
                        )
                        .await
                    }
                    Err(_) => PairOutcome::Failed("comparison slots closed".to_string()),
                };

                PairResult {
                    photo_id: candidate.photo_id,
                    outcome,
                }
            }
            .instrument(Span::current()));
        }

        let mut results = Vec::with_capacity(pending.len());
        let mut deadline_hit = false;

        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    pending.remove(&result.photo_id);
                    results.push(result);
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Comparison task did not complete");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        unresolved = pending.len(),
                        deadline_ms = self.limits.deadline.as_millis() as u64,
                        "Comparison deadline reached, aborting remaining pairs"
                    );
                    tasks.abort_all();
                    deadline_hit = true;
                    break;
                }
            }
        }

        for photo_id in pending {
            let outcome = if deadline_hit {
                PairOutcome::TimedOut
            } else {
                PairOutcome::Failed("comparison task aborted".to_string())
            };
            results.push(PairResult { photo_id, outcome });
        }

        results
    }
}

async fn compare_pair(
    comparator: &dyn FaceComparator,
    images: &dyn ImageSource,
    sighting_image: &[u8],
    candidate: &CandidatePhoto,
    call_timeout: Duration,
) -> PairOutcome {
    let candidate_image = match timeout(call_timeout, images.fetch(&candidate.image_url)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            warn!(photo_id = candidate.photo_id, error = %e, "Candidate image fetch failed");
            return PairOutcome::Failed(format!("image fetch: {}", e));
        }
        Err(_) => {
            warn!(photo_id = candidate.photo_id, "Candidate image fetch timed out");
            return PairOutcome::TimedOut;
        }
    };

    match timeout(call_timeout, comparator.compare(sighting_image, &candidate_image)).await {
        Ok(Ok(verdict)) => {
            debug!(
                photo_id = candidate.photo_id,
                is_match = verdict.is_match,
                confidence = verdict.confidence,
                "Comparison finished"
            );
            PairOutcome::Compared(verdict)
        }
        Ok(Err(e)) => {
            warn!(photo_id = candidate.photo_id, error = %e, "Comparison failed");
            PairOutcome::Failed(format!("oracle: {}", e))
        }
        Err(_) => {
            warn!(photo_id = candidate.photo_id, "Comparison timed out");
            PairOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ImageFetchError, OracleError};
    use async_trait::async_trait;

    struct StaticImages;

    #[async_trait]
    impl ImageSource for StaticImages {
        async fn fetch(&self, url: &str) -> Result<Arc<[u8]>, ImageFetchError> {
            if url.contains("broken") {
                return Err(ImageFetchError::Empty(url.to_string()));
            }
            Ok(Arc::from(url.as_bytes()))
        }
    }

    /// Matches when the candidate URL mentions "same"
    struct UrlOracle;

    #[async_trait]
    impl FaceComparator for UrlOracle {
        async fn compare(&self, _a: &[u8], b: &[u8]) -> Result<Comparison, OracleError> {
            let url = String::from_utf8_lossy(b);
            if url.contains("same") {
                Comparison::new(true, 0.9)
            } else {
                Comparison::new(false, 0.1)
            }
        }
    }

    fn candidate(photo_id: i64, url: &str) -> CandidatePhoto {
        CandidatePhoto {
            photo_id,
            image_url: url.to_string(),
        }
    }

    fn fan_out() -> ComparisonFanOut {
        ComparisonFanOut::new(Arc::new(UrlOracle), Arc::new(StaticImages), FanOutLimits::default())
    }

    #[tokio::test]
    async fn test_empty_candidates_make_no_calls() {
        let results = fan_out().run(Arc::from(&b"sighting"[..]), vec![]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_attributed_to_photo() {
        let candidates = vec![
            candidate(1, "https://img.test/same.jpg"),
            candidate(2, "https://img.test/other.jpg"),
        ];

        let mut results = fan_out().run(Arc::from(&b"sighting"[..]), candidates).await;
        results.sort_by_key(|r| r.photo_id);

        assert_eq!(results.len(), 2);
        assert!(results[0].verdict().is_match);
        assert!(!results[1].verdict().is_match);
    }

    #[tokio::test]
    async fn test_image_fetch_failure_is_a_failed_pair() {
        let results = fan_out()
            .run(Arc::from(&b"sighting"[..]), vec![candidate(7, "https://img.test/broken.jpg")])
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].outcome, PairOutcome::Failed(_)));
        assert_eq!(results[0].verdict(), Comparison::non_match());
    }

    #[tokio::test]
    async fn test_duplicate_candidates_compared_once() {
        let candidates = vec![
            candidate(3, "https://img.test/same.jpg"),
            candidate(3, "https://img.test/same.jpg"),
        ];

        let results = fan_out().run(Arc::from(&b"sighting"[..]), candidates).await;
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_zero_concurrency_is_raised_to_one() {
        let fan_out = ComparisonFanOut::new(
            Arc::new(UrlOracle),
            Arc::new(StaticImages),
            FanOutLimits {
                max_concurrency: 0,
                ..FanOutLimits::default()
            },
        );
        assert_eq!(fan_out.limits().max_concurrency, 1);
    }
}
