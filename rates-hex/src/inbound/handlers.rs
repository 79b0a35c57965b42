//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use rates_types::{
    AppError, CurrencyCode, CurrencyRate, ExchangeRateCache, LatestRatesQuery, PurgeResponse,
    TrailId, TrailQuery, TrailRepository,
};

use crate::{HistoricalSyncService, LatestRateService, TrailService};

/// Application state shared across handlers.
pub struct AppState<C: ExchangeRateCache, T: TrailRepository> {
    pub latest: Arc<LatestRateService<C, T>>,
    pub history: Arc<HistoricalSyncService<C, T>>,
    pub trails: TrailService<T>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Configuration(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Management triggers
// ─────────────────────────────────────────────────────────────────────────────

/// Starts a latest-rate refresh in the background.
///
/// The outcome is only visible through the trail endpoints.
#[tracing::instrument(skip(state))]
pub async fn refresh<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
) -> StatusCode {
    let latest = state.latest.clone();
    tokio::spawn(async move {
        if let Err(e) = latest.refresh().await {
            tracing::error!("Refresh failed: {}", e);
        }
    });
    StatusCode::ACCEPTED
}

/// Starts a historical update in the background.
#[tracing::instrument(skip(state))]
pub async fn history_update<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
) -> StatusCode {
    let history = state.history.clone();
    tokio::spawn(async move {
        if let Err(e) = history.history_update().await {
            tracing::error!("Historical update failed: {}", e);
        }
    });
    StatusCode::ACCEPTED
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rates
// ─────────────────────────────────────────────────────────────────────────────

/// Latest entries, optionally limited with `?currencies=EUR,USD`.
#[tracing::instrument(skip(state))]
pub async fn list_latest<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
    Query(query): Query<LatestRatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = match query.currency_set() {
        Some(currencies) => state.latest.get_latest_for_many(&currencies).await?,
        None => state.latest.get_latest().await?,
    };
    Ok(Json(entries))
}

#[tracing::instrument(skip(state), fields(currency = %code))]
pub async fn get_latest<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = CurrencyCode::from_code(&code);
    if !currency.is_defined() {
        return Err(AppError::BadRequest(format!("Unknown currency: {}", code)).into());
    }

    let entry = state.latest.get_latest_for(currency).await?;
    Ok(Json(entry))
}

/// Manually upsert one rate.
///
/// The body must carry provider details: their key names the provider and
/// their base currency. A body without `details` answers 400 and still leaves
/// an `ERROR` trail.
#[tracing::instrument(skip(state, rate), fields(currency = %rate.currency()))]
pub async fn create_or_update<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
    Json(rate): Json<CurrencyRate>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.latest.create_or_update(rate).await?;
    Ok(Json(entry))
}

#[tracing::instrument(skip(state))]
pub async fn purge<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.latest.purge().await?;
    Ok(Json(PurgeResponse { deleted }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Trails
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn list_trails<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
    Query(query): Query<TrailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.trails.find_trails(&query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state), fields(trail_id = %id))]
pub async fn get_trail<C: ExchangeRateCache, T: TrailRepository>(
    State(state): State<Arc<AppState<C, T>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let trail_id: TrailId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid trail ID".into()))?;

    let record = state.trails.find_trail(trail_id).await?;
    Ok(Json(record))
}
