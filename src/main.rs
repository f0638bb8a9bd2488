use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use maid_match::config::Settings;
use maid_match::core::{EligibilityFilter, Matcher, OfferBroadcaster, ScoringEngine};
use maid_match::models::{ScoringWeights, TierThresholds};
use maid_match::routes::{self, AppState};
use maid_match::services::{MemoryStore, PostgresStore, Repositories, SettingsCache};
use std::sync::Arc;
use tracing::{info, error};
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
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
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

fn config_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("Configuration error: {}", e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Maid Match engine...");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        config_error(e)
    })?;

    info!("Configuration loaded successfully");

    // Pick the backing store
    let (repos, postgres) = if settings.database.is_memory() {
        info!("Using in-memory store");
        (Repositories::from_store(Arc::new(MemoryStore::new())), None)
    } else {
        let store = PostgresStore::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, format!("PostgreSQL connection error: {}", e))
        })?;

        let store = Arc::new(store);
        info!(
            "PostgreSQL store initialized (max: {} connections)",
            settings.database.max_connections.unwrap_or(10)
        );
        (Repositories::from_store(store.clone()), Some(store))
    };

    let settings_cache = Arc::new(SettingsCache::new(
        repos.settings.clone(),
        settings.cache.settings_ttl_secs,
        settings.fallback_app_settings(),
    ));

    info!("Settings cache initialized (TTL: {}s)", settings.cache.settings_ttl_secs);

    // Initialize matcher with configured weights
    let weights = ScoringWeights::from(&settings.scoring.weights);
    let tiers = TierThresholds::from(&settings.scoring.tiers);
    let radius = settings.matching.default_service_radius_miles;

    let filter = EligibilityFilter::new(radius, settings.matching.low_supply_threshold)
        .with_radius_step(settings.matching.radius_expansion_miles);
    let matcher = Matcher::new(filter, ScoringEngine::new(weights, tiers, radius));

    info!("Matcher initialized with weights: {:?}", weights);

    let broadcaster = OfferBroadcaster::new(repos.clone(), matcher.clone(), settings_cache.clone())
        .with_limit(settings.matching.broadcast_limit)
        .with_prefilter(settings.matching.pool_prefilter_miles);

    // Build application state
    let app_state = AppState::new(repos, settings_cache, matcher, broadcaster, postgres);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
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
