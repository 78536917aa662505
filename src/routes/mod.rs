// Route exports
pub mod cases;
pub mod health;
pub mod reports;
pub mod sightings;

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::core::SightingProcessor;
use crate::models::ErrorResponse;
use crate::services::{CacheManager, PostgresClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    /// Absent when Redis was unreachable at startup
    pub cache: Option<Arc<CacheManager>>,
    pub processor: Arc<SightingProcessor>,
    /// Stored for cases created from inline image data only
    pub case_placeholder_image_url: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::configure)
            .configure(sightings::configure)
            .configure(cases::configure)
            .configure(reports::configure),
    );
}

pub(crate) fn bad_request(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 400,
    })
}

pub(crate) fn not_found(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 404,
    })
}

pub(crate) fn internal_error(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 500,
    })
}
