use actix_web::{web, HttpResponse, Responder};
use tracing::Instrument;
use validator::Validate;

use crate::core::{SightingError, SightingOutcome};
use crate::models::{CreateSightingRequest, CreateSightingResponse, SightingMatchesResponse};
use crate::routes::{bad_request, internal_error, not_found, AppState};
use crate::services::PostgresError;

/// Configure sighting routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/sightings", web::post().to(create_sighting))
        .route("/sightings/{id}/matches", web::get().to(get_sighting_matches));
}

/// Submit a sighting
///
/// POST /api/sightings
///
/// Request body:
/// ```json
/// {
///   "imageData": "base64 or data URL",
///   "imageUrl": "https://...",
///   "location": "string",
///   "notes": "string"
/// }
/// ```
async fn create_sighting(
    state: web::Data<AppState>,
    req: web::Json<CreateSightingRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for sighting request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    // Correlates the fan-out logs of one submission
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("sighting", %request_id);

    match state.processor.submit(&req).instrument(span).await {
        Ok(outcome) => {
            tracing::info!(
                sighting_id = outcome.sighting_id,
                matches = outcome.matches_found(),
                compared = outcome.candidates_compared,
                failed = outcome.failed_pairs,
                timed_out = outcome.timed_out_pairs,
                "Sighting processed"
            );

            HttpResponse::Created().json(created_response(&outcome))
        }
        Err(SightingError::InvalidImage(message)) => bad_request("Validation failed", message),
        Err(e) => {
            tracing::error!("Failed to process sighting: {}", e);
            internal_error("Failed to process sighting", e.to_string())
        }
    }
}

fn created_response(outcome: &SightingOutcome) -> CreateSightingResponse {
    CreateSightingResponse {
        message: "Sighting reported successfully.".to_string(),
        sighting_id: outcome.sighting_id,
        matches_found: outcome.matches_found(),
    }
}

/// Potential matches recorded for a sighting
///
/// GET /api/sightings/{id}/matches
async fn get_sighting_matches(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    let sighting_id = path.into_inner();

    if let Err(e) = state.postgres.get_sighting(sighting_id).await {
        return match e {
            PostgresError::NotFound(_) => {
                not_found("Sighting not found", format!("No sighting with id {}", sighting_id))
            }
            other => {
                tracing::error!("Failed to fetch sighting {}: {}", sighting_id, other);
                internal_error("Failed to fetch sighting", other.to_string())
            }
        };
    }

    match state.postgres.matches_for_sighting(sighting_id).await {
        Ok(matches) => HttpResponse::Ok().json(SightingMatchesResponse {
            sighting_id,
            count: matches.len(),
            matches,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch matches for sighting {}: {}", sighting_id, e);
            internal_error("Failed to fetch matches", e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcceptedMatch;

    #[test]
    fn test_created_response_body() {
        let outcome = SightingOutcome {
            sighting_id: 42,
            matches: vec![AcceptedMatch {
                sighting_id: 42,
                photo_id: 7,
                confidence: 0.91,
            }],
            candidates_compared: 3,
            failed_pairs: 1,
            timed_out_pairs: 0,
        };

        let body = serde_json::to_value(created_response(&outcome)).unwrap();
        assert_eq!(body["message"], "Sighting reported successfully.");
        assert_eq!(body["sightingId"], 42);
        assert_eq!(body["matchesFound"], 1);
    }
}
