use async_trait::async_trait;

use crate::models::{AcceptedMatch, CaseStatus, NewSighting, PhotoCaseRow, Sighting};
use crate::services::postgres::PostgresError;

/// Persistence operations used by the sighting matching workflow
///
/// Writes are append-only apart from `delete_sighting`, which exists solely
/// as the compensating action when a sighting must not outlive a failed run.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Insert a sighting and return it with its assigned id
    async fn insert_sighting(&self, sighting: &NewSighting) -> Result<Sighting, PostgresError>;

    /// Photos joined to the status of each case of their person, restricted
    /// to the given statuses
    async fn candidate_rows(&self, statuses: &[CaseStatus]) -> Result<Vec<PhotoCaseRow>, PostgresError>;

    /// Insert all matches as pending, atomically; returns the rows written
    async fn insert_potential_matches(&self, matches: &[AcceptedMatch]) -> Result<u64, PostgresError>;

    /// Remove a sighting; returns whether a row was deleted
    async fn delete_sighting(&self, sighting_id: i64) -> Result<bool, PostgresError>;
}
