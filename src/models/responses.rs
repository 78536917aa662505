use serde::{Deserialize, Serialize};
use crate::models::domain::{Case, PotentialMatch};

/// Response for the submit sighting endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSightingResponse {
    pub message: String,
    #[serde(rename = "sightingId")]
    pub sighting_id: i64,
    #[serde(rename = "matchesFound")]
    pub matches_found: usize,
}

/// Response for the create case endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaseResponse {
    pub message: String,
    #[serde(rename = "case")]
    pub case: Case,
}

/// Potential matches recorded for one sighting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingMatchesResponse {
    #[serde(rename = "sightingId")]
    pub sighting_id: i64,
    pub matches: Vec<PotentialMatch>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub cache: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
