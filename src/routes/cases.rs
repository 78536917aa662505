use actix_web::{web, HttpResponse, Responder};
use std::str::FromStr;
use validator::Validate;

use crate::models::{CaseStatus, CaseSummary, CreateCaseRequest, CreateCaseResponse, NewCase};
use crate::routes::{bad_request, internal_error, AppState};
use crate::services::CacheKey;

/// Configure case routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/cases", web::get().to(list_cases))
        .route("/cases", web::post().to(create_case));
}

/// List all cases as cards
///
/// GET /api/cases
async fn list_cases(state: web::Data<AppState>) -> impl Responder {
    let cache_key = CacheKey::case_summaries();

    if let Some(cache) = &state.cache {
        if let Ok(cached) = cache.get::<Vec<CaseSummary>>(&cache_key).await {
            tracing::debug!("Returning {} cached case summaries", cached.len());
            return HttpResponse::Ok().json(cached);
        }
    }

    let summaries = match state.postgres.list_case_summaries().await {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::error!("Failed to fetch cases: {}", e);
            return internal_error("Failed to fetch cases", e.to_string());
        }
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&cache_key, &summaries).await {
            tracing::warn!("Failed to cache case summaries: {}", e);
        }
    }

    HttpResponse::Ok().json(summaries)
}

/// Open a new case
///
/// POST /api/cases
///
/// Request body:
/// ```json
/// {
///   "name": "string",
///   "age": 12,
///   "description": "string",
///   "lastSeenLocation": "string",
///   "lastSeenDate": "string",
///   "imageUrl": "https://...",
///   "status": "New",
///   "reportedBy": "string",
///   "contactName": "string",
///   "contactRole": "string"
/// }
/// ```
async fn create_case(
    state: web::Data<AppState>,
    req: web::Json<CreateCaseRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for case request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let new_case = match new_case_from_request(req.into_inner(), &state.case_placeholder_image_url) {
        Ok(new_case) => new_case,
        Err(message) => return bad_request("Validation failed", message),
    };

    let case = match state.postgres.create_case(&new_case).await {
        Ok(case) => case,
        Err(e) => {
            tracing::error!("Failed to create case for {}: {}", new_case.name, e);
            return internal_error("Failed to create case", e.to_string());
        }
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.delete(&CacheKey::case_summaries()).await {
            tracing::warn!("Failed to invalidate case listing cache: {}", e);
        }
    }

    HttpResponse::Created().json(CreateCaseResponse {
        message: "Case created successfully.".to_string(),
        case,
    })
}

/// Turn a validated request into the rows to insert
///
/// An image is required. Image uploads are handled outside this service, so a
/// request carrying only inline image data stores the placeholder URL.
fn new_case_from_request(req: CreateCaseRequest, placeholder_image_url: &str) -> Result<NewCase, String> {
    let image_url = match (req.image_url, req.image_data.as_deref().map(str::trim)) {
        (Some(url), _) => url,
        (None, Some(data)) if !data.is_empty() => placeholder_image_url.to_string(),
        _ => return Err("imageUrl or imageData is required.".to_string()),
    };

    let status = match req.status.as_deref().map(str::trim) {
        None | Some("") => CaseStatus::New,
        Some(label) => CaseStatus::from_str(label)?,
    };

    Ok(NewCase {
        name: req.name.trim().to_string(),
        age: req.age,
        description: req.description,
        last_seen_location: req.last_seen_location,
        last_seen_date: req.last_seen_date,
        image_url,
        status,
        reported_by: req.reported_by,
        contact_name: req.contact_name,
        contact_role: req.contact_role,
    })
}
