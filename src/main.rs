mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use crate::config::{LoggingSettings, Settings};
use crate::core::{ComparisonFanOut, SightingProcessor};
use crate::routes::AppState;
use crate::services::{CacheManager, GeminiClient, GeminiConfig, HttpImageFetcher, PostgresClient};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    let status_code = match err {
        error::JsonPayloadError::OverflowKnownLength { .. } | error::JsonPayloadError::Overflow { .. } => 413,
        _ => 400,
    };
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors, e.g. a non-numeric id
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path parameter: {}", err),
        status_code: 400,
    }
    .into()
}

/// Install the global subscriber; `pretty` is multi-line, anything else compact
fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration; logging settings live in it
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing(&LoggingSettings::default());
            return Err(startup_error("Configuration error", e));
        }
    };

    init_tracing(&settings.logging);

    info!("Starting FindTogether service...");

    let options = settings
        .sighting_options()
        .map_err(|e| startup_error("Configuration error", e))?;
    let limits = settings
        .matching
        .fan_out_limits()
        .map_err(|e| startup_error("Configuration error", e))?;

    info!("Configuration loaded successfully");

    // Initialize cache manager (optional - listings are served uncached without it)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(60);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(100);

    let cache = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                Some(Arc::new(c))
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), running without cache", e);
                None
            }
        },
        None => {
            info!("No Redis URL configured, running without cache");
            None
        }
    };

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("PostgreSQL connection error", e))?,
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    // Initialize the comparison oracle and candidate image fetcher
    if settings.gemini.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set, every comparison will fail and be treated as a non-match");
    }

    // All attempts of one comparison share the fan-out's per-call timeout
    let attempt_timeout = limits.call_timeout / settings.gemini.max_retries.saturating_add(1);

    let gemini = GeminiClient::new(GeminiConfig {
        endpoint: settings.gemini.endpoint.clone(),
        api_key: settings.gemini.api_key.clone(),
        model: settings.gemini.model.clone(),
        timeout: attempt_timeout,
        max_retries: settings.gemini.max_retries,
    })
    .map_err(|e| startup_error("Gemini client error", e))?;

    let images = HttpImageFetcher::new(
        limits.call_timeout,
        settings.cache.image_cache_bytes,
        settings.storage.max_image_bytes,
    )
    .map_err(|e| startup_error("Image fetcher error", e))?;

    info!(
        "Matching initialized (model: {}, attempt timeout: {:?}, threshold: {}, concurrency: {}, deadline: {:?})",
        settings.gemini.model,
        attempt_timeout,
        options.policy.threshold(),
        limits.max_concurrency,
        limits.deadline
    );

    let fan_out = ComparisonFanOut::new(Arc::new(gemini), Arc::new(images), limits);
    let processor = Arc::new(SightingProcessor::new(postgres.clone(), fan_out, options));

    // Build application state
    let app_state = AppState {
        postgres,
        cache,
        processor,
        case_placeholder_image_url: settings.storage.case_placeholder_image_url.clone(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);
    let max_payload = settings.server.max_payload_bytes;

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(
                web::JsonConfig::default()
                    .limit(max_payload)
                    .error_handler(handle_json_payload_error),
            )
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
