//! Sighting intake and matching.
//!
//! # Pipeline Stages
//! 1. Decode and validate the reported image (nothing is written on failure)
//! 2. Persist the sighting so matches have an id to reference
//! 3. Retrieve candidate photos from active cases
//! 4. Fan out pairwise comparisons
//! 5. Filter by confidence and persist the accepted matches atomically

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::candidates::{select_candidates, ActiveStatuses};
use crate::core::fanout::{ComparisonFanOut, PairOutcome};
use crate::core::policy::MatchPolicy;
use crate::models::{AcceptedMatch, CreateSightingRequest, NewSighting};
use crate::services::{PostgresError, SightingStore};

/// Errors surfaced to the sighting reporter
#[derive(Debug, Error)]
pub enum SightingError {
    #[error("{0}")]
    InvalidImage(String),

    #[error("Storage error: {0}")]
    Store(#[from] PostgresError),
}

impl SightingError {
    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, SightingError::InvalidImage(_))
    }
}

/// Result of processing one sighting
#[derive(Debug, Clone)]
pub struct SightingOutcome {
    pub sighting_id: i64,
    pub matches: Vec<AcceptedMatch>,
    pub candidates_compared: usize,
    pub failed_pairs: usize,
    pub timed_out_pairs: usize,
}

impl SightingOutcome {
    pub fn matches_found(&self) -> usize {
        self.matches.len()
    }
}

/// Settings that shape sighting processing
#[derive(Debug, Clone)]
pub struct SightingOptions {
    pub policy: MatchPolicy,
    pub active_statuses: ActiveStatuses,
    /// Keep a sighting whose matching run failed, as a zero-match record
    pub retain_sighting_on_failure: bool,
    /// Stored as the sighting image URL when none is supplied
    pub placeholder_image_url: String,
}

impl Default for SightingOptions {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            active_statuses: ActiveStatuses::default(),
            retain_sighting_on_failure: true,
            placeholder_image_url: "https://via.placeholder.com/400/sighting".to_string(),
        }
    }
}

/// Handles a reported sighting from intake to persisted potential matches
#[derive(Clone)]
pub struct SightingProcessor {
    store: Arc<dyn SightingStore>,
    fan_out: ComparisonFanOut,
    options: SightingOptions,
}

impl SightingProcessor {
    pub fn new(store: Arc<dyn SightingStore>, fan_out: ComparisonFanOut, options: SightingOptions) -> Self {
        Self {
            store,
            fan_out,
            options,
        }
    }

    pub fn options(&self) -> &SightingOptions {
        &self.options
    }

    /// Record a sighting and flag candidate photos that may show the same person
    pub async fn submit(&self, request: &CreateSightingRequest) -> Result<SightingOutcome, SightingError> {
        let image = decode_image_data(request.image_data.as_deref())?;

        let new_sighting = NewSighting {
            image_url: request
                .image_url
                .clone()
                .unwrap_or_else(|| self.options.placeholder_image_url.clone()),
            location: non_blank(request.location.as_deref()),
            notes: non_blank(request.notes.as_deref()),
        };

        let sighting = self.store.insert_sighting(&new_sighting).await?;
        info!(sighting_id = sighting.id, "New sighting logged");

        match self.match_sighting(sighting.id, image).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.handle_failed_run(sighting.id).await;
                Err(e)
            }
        }
    }

    async fn match_sighting(&self, sighting_id: i64, image: Arc<[u8]>) -> Result<SightingOutcome, SightingError> {
        let rows = self
            .store
            .candidate_rows(self.options.active_statuses.as_slice())
            .await?;
        let candidates = select_candidates(rows, &self.options.active_statuses);

        info!(
            sighting_id,
            candidates = candidates.len(),
            "Comparing sighting against active case photos"
        );

        let results = self.fan_out.run(image, candidates).await;

        let failed_pairs = results
            .iter()
            .filter(|r| matches!(r.outcome, PairOutcome::Failed(_)))
            .count();
        let timed_out_pairs = results
            .iter()
            .filter(|r| matches!(r.outcome, PairOutcome::TimedOut))
            .count();

        let matches = self.options.policy.accept_all(sighting_id, &results);

        if matches.is_empty() {
            info!(sighting_id, "No strong matches found");
        } else {
            let written = self.store.insert_potential_matches(&matches).await?;
            info!(sighting_id, matches = written, "Potential matches above threshold recorded");
        }

        Ok(SightingOutcome {
            sighting_id,
            matches,
            candidates_compared: results.len(),
            failed_pairs,
            timed_out_pairs,
        })
    }

    async fn handle_failed_run(&self, sighting_id: i64) {
        if self.options.retain_sighting_on_failure {
            warn!(sighting_id, "Matching failed, keeping sighting as a zero-match record");
            return;
        }

        match self.store.delete_sighting(sighting_id).await {
            Ok(_) => warn!(sighting_id, "Matching failed, sighting removed"),
            Err(e) => error!(sighting_id, error = %e, "Failed to remove sighting after matching failure"),
        }
    }
}

/// Decode reported image data, accepting plain base64 or a base64 data URL
pub fn decode_image_data(image_data: Option<&str>) -> Result<Arc<[u8]>, SightingError> {
    let raw = image_data
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SightingError::InvalidImage("imageData is required.".to_string()))?;

    let payload = match raw.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| {
                SightingError::InvalidImage("imageData data URL must be base64 encoded.".to_string())
            })?,
        None => raw,
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| SightingError::InvalidImage(format!("imageData is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(SightingError::InvalidImage("imageData is empty.".to_string()));
    }

    Ok(Arc::from(bytes))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
