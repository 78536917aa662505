use actix_web::{web, HttpResponse, Responder};

use crate::models::Report;
use crate::routes::{internal_error, not_found, AppState};
use crate::services::{CacheKey, PostgresError};

/// Configure report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/reports", web::get().to(list_reports))
        .route("/reports/case/{case_id}", web::get().to(reports_for_case))
        .route("/reports/{id}", web::get().to(get_report));
}

/// GET /api/reports
async fn list_reports(state: web::Data<AppState>) -> impl Responder {
    match state.postgres.list_reports().await {
        Ok(reports) => HttpResponse::Ok().json(reports),
        Err(e) => {
            tracing::error!("Failed to fetch reports: {}", e);
            internal_error("Failed to fetch reports", e.to_string())
        }
    }
}

/// GET /api/reports/{id}
async fn get_report(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let report_id = path.into_inner();

    match state.postgres.get_report(report_id).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(PostgresError::NotFound(_)) => {
            not_found("Report not found", format!("No report with id {}", report_id))
        }
        Err(e) => {
            tracing::error!("Failed to fetch report {}: {}", report_id, e);
            internal_error("Failed to fetch report", e.to_string())
        }
    }
}

/// GET /api/reports/case/{case_id}
async fn reports_for_case(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let case_id = path.into_inner();
    let cache_key = CacheKey::case_reports(case_id);

    if let Some(cache) = &state.cache {
        if let Ok(cached) = cache.get::<Vec<Report>>(&cache_key).await {
            return HttpResponse::Ok().json(cached);
        }
    }

    let reports = match state.postgres.reports_for_case(case_id).await {
        Ok(reports) => reports,
        Err(e) => {
            tracing::error!("Failed to fetch reports for case {}: {}", case_id, e);
            return internal_error("Failed to fetch reports", e.to_string());
        }
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&cache_key, &reports).await {
            tracing::warn!("Failed to cache reports for case {}: {}", case_id, e);
        }
    }

    HttpResponse::Ok().json(reports)
}
