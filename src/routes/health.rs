use actix_web::{web, HttpResponse, Responder};

use crate::models::HealthResponse;
use crate::routes::AppState;

/// Configure health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database = state.postgres.health_check().await.unwrap_or(false);
    let cache = match &state.cache {
        Some(cache) => cache.ping().await,
        None => false,
    };

    HttpResponse::Ok().json(HealthResponse {
        status: health_status(database).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        cache,
        timestamp: chrono::Utc::now(),
    })
}

/// The cache is optional, so only the database decides overall health
fn health_status(database: bool) -> &'static str {
    if database { "healthy" } else { "degraded" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        assert_eq!(health_status(true), "healthy");
        assert_eq!(health_status(false), "degraded");
    }
}
