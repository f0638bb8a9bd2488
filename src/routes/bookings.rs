use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{
    BroadcastError, ClaimCoordinator, ClaimError, JobDetails, Matcher, OfferBroadcaster,
};
use crate::models::{
    AcceptRequest, AcceptResponse, Booking, CandidatesQuery, CandidatesResponse, Cleaner,
    ErrorResponse, ExplainQuery, HealthResponse, House,
};
use crate::services::{PostgresStore, Repositories, SettingsCache};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub settings: Arc<SettingsCache>,
    pub matcher: Matcher,
    pub broadcaster: OfferBroadcaster,
    pub claims: ClaimCoordinator,
    /// Present when running against PostgreSQL, used by the health check
    pub postgres: Option<Arc<PostgresStore>>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        settings: Arc<SettingsCache>,
        matcher: Matcher,
        broadcaster: OfferBroadcaster,
        postgres: Option<Arc<PostgresStore>>,
    ) -> Self {
        let claims = ClaimCoordinator::new(repos.clone(), settings.clone());
        Self {
            repos,
            settings,
            matcher,
            broadcaster,
            claims,
            postgres,
        }
    }
}

/// Configure all booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/bookings/{id}/broadcast", web::post().to(broadcast_booking))
        .route("/bookings/{id}/candidates", web::get().to(list_candidates))
        .route("/bookings/{id}/accept", web::post().to(accept_booking))
        .route("/debug/eligibility", web::get().to(explain_eligibility))
        .route("/debug/score", web::get().to(explain_score));
}

fn error_response(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn broadcast_error_response(e: BroadcastError) -> HttpResponse {
    match e {
        BroadcastError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        BroadcastError::AlreadyTaken(_) => error_response(StatusCode::CONFLICT, "already_taken", e.to_string()),
        BroadcastError::NotClaimable { .. } => error_response(StatusCode::CONFLICT, "not_claimable", e.to_string()),
        BroadcastError::Repository(_) => {
            tracing::error!("Broadcast failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "repository_error", e.to_string())
        }
    }
}

fn claim_error_response(e: ClaimError) -> HttpResponse {
    let (status, error) = match &e {
        ClaimError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        ClaimError::AlreadyTaken(_) => (StatusCode::CONFLICT, "already_taken"),
        ClaimError::AlreadyClaimed(_) => (StatusCode::CONFLICT, "already_claimed"),
        ClaimError::NotClaimable { .. } => (StatusCode::CONFLICT, "not_claimable"),
        ClaimError::SchedulingConflict { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "scheduling_conflict"),
        ClaimError::MissingSchedule(_) => (StatusCode::UNPROCESSABLE_ENTITY, "missing_schedule"),
        ClaimError::Repository(_) => {
            tracing::error!("Accept failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "repository_error")
        }
    };
    error_response(status, error, e.to_string())
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Broadcast endpoint
///
/// POST /api/v1/bookings/{id}/broadcast
async fn broadcast_booking(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let booking_id = path.into_inner();

    tracing::info!("Broadcasting booking {}", booking_id);

    match state.broadcaster.broadcast(&booking_id).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => broadcast_error_response(e),
    }
}

/// Browse ranking endpoint
///
/// GET /api/v1/bookings/{id}/candidates?limit=20
///
/// Unlike a broadcast this returns every eligible cleaner unless a limit is
/// given, and writes nothing.
async fn list_candidates(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CandidatesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let booking_id = path.into_inner();
    let ranked = match state.broadcaster.rank(&booking_id, query.limit).await {
        Ok(ranked) => ranked,
        Err(e) => return broadcast_error_response(e),
    };

    tracing::info!(
        "Returning {} candidates for booking {} (from {} eligible)",
        ranked.result.candidates.len(),
        booking_id,
        ranked.result.total_eligible
    );

    HttpResponse::Ok().json(CandidatesResponse {
        booking_id: ranked.booking.id,
        candidates: ranked.result.candidates,
        total_eligible: ranked.result.total_eligible,
        low_supply: ranked.result.low_supply,
        funnel: ranked.result.funnel,
    })
}

/// Accept endpoint
///
/// POST /api/v1/bookings/{id}/accept
///
/// Request body:
/// ```json
/// {
///   "cleanerId": "string",
///   "scheduledDate": "2025-06-01",
///   "timeSlot": "morning"
/// }
/// ```
async fn accept_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<AcceptRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for accept request: field_errors={:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let booking_id = path.into_inner();
    let details = JobDetails {
        scheduled_date: req.scheduled_date,
        time_slot: req.time_slot,
    };

    match state.claims.accept(&booking_id, &req.cleaner_id, details).await {
        Ok(outcome) => HttpResponse::Ok().json(AcceptResponse {
            success: true,
            job: outcome.job,
            offers_purged: outcome.offers_purged,
            customer_notified: outcome.customer_notified,
        }),
        Err(e) => {
            tracing::info!("Cleaner {} could not accept booking {}: {}", req.cleaner_id, booking_id, e);
            claim_error_response(e)
        }
    }
}

/// Booking, house and cleaner for the explain endpoints
async fn load_explain_inputs(
    state: &AppState,
    query: &ExplainQuery,
) -> Result<(Booking, House, Cleaner, Matcher), HttpResponse> {
    let repo_error = |e: crate::services::RepositoryError| {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "repository_error", e.to_string())
    };
    let not_found = |what: String| error_response(StatusCode::NOT_FOUND, "not_found", what);

    let booking = state
        .repos
        .bookings
        .get_booking(&query.booking_id)
        .await
        .map_err(repo_error)?
        .ok_or_else(|| not_found(format!("booking {}", query.booking_id)))?;
    let house = state
        .repos
        .houses
        .get_house(&booking.house_id)
        .await
        .map_err(repo_error)?
        .ok_or_else(|| not_found(format!("house {}", booking.house_id)))?;
    let cleaner = state
        .repos
        .cleaners
        .get_cleaner(&query.cleaner_id)
        .await
        .map_err(repo_error)?
        .ok_or_else(|| not_found(format!("cleaner {}", query.cleaner_id)))?;

    let settings = state.settings.get().await;
    let matcher = state.matcher.with_default_radius(settings.default_service_radius_miles);

    Ok((booking, house, cleaner, matcher))
}

/// Debug endpoint explaining why a cleaner is or is not eligible
///
/// GET /api/v1/debug/eligibility?bookingId=...&cleanerId=...
async fn explain_eligibility(
    state: web::Data<AppState>,
    query: web::Query<ExplainQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    match load_explain_inputs(&state, &query).await {
        Ok((booking, house, cleaner, matcher)) => {
            HttpResponse::Ok().json(matcher.explain_eligibility(&cleaner, &booking, &house))
        }
        Err(response) => response,
    }
}

/// Debug endpoint returning the score breakdown and the inputs behind it
///
/// GET /api/v1/debug/score?bookingId=...&cleanerId=...
async fn explain_score(
    state: web::Data<AppState>,
    query: web::Query<ExplainQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let (booking, house, cleaner, matcher) = match load_explain_inputs(&state, &query).await {
        Ok(inputs) => inputs,
        Err(response) => return response,
    };

    match matcher.explain_score(&cleaner, &booking, &house, chrono::Utc::now()) {
        Ok(explanation) => HttpResponse::Ok().json(explanation),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "scoring_error", e.to_string()),
    }
}
