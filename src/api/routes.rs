//! API route definitions.

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::middleware::require_auth;
use crate::api::state::AppState;
use crate::detect::incident::DEFAULT_LIST_LIMIT;
use crate::detect::{Incident, Severity};
use crate::maintenance::MaintenanceState;
use crate::predict::{predict_risk, UpdateRiskRequest, UpdateRiskResponse};
use crate::simulator::MetricsReading;

pub fn api_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/incidents/create", post(create_incident))
        .route("/maintenance/enable", post(enable_maintenance))
        .route("/maintenance/disable", post(disable_maintenance))
        .route("/predict/update-risk", post(predict_update_risk))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/metrics/live", get(live_metrics))
        .route("/incidents", get(list_incidents))
        .route("/maintenance", get(maintenance_status))
        .merge(protected)
}

/// Run a storage call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(ApiError::from)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "UptimeGuard API", "status": "operational" }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let users = state.users.clone();
    let email = req.email.clone();
    let user = blocking(move || users.authenticate(&email, &req.password)).await?;

    let Some(user) = user else {
        tracing::warn!(email = %req.email, "rejected login");
        return Err(crate::auth::AuthError::InvalidCredentials.into());
    };

    let access_token = state.tokens.issue(&user.email)?;
    tracing::info!(email = %user.email, "login succeeded");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

async fn live_metrics(State(state): State<AppState>) -> Result<Json<MetricsReading>, ApiError> {
    Ok(Json(state.live.sample().await?))
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct IncidentCreate {
    pub severity: Severity,
    pub message: String,
}

async fn list_incidents(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let incidents = state.incidents.clone();
    Ok(Json(blocking(move || incidents.list_recent(limit)).await?))
}

async fn create_incident(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<IncidentCreate>,
) -> Result<Json<Value>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let incidents = state.incidents.clone();
    let incident =
        blocking(move || incidents.create_manual(req.severity, &req.message)).await?;
    tracing::info!(id = incident.id, severity = %incident.severity, "manual incident created");
    Ok(Json(json!({ "id": incident.id, "message": "Incident created" })))
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MaintenanceEnable {
    pub eta_minutes: i64,
}

async fn maintenance_status(
    State(state): State<AppState>,
) -> Result<Json<MaintenanceState>, ApiError> {
    let store = state.maintenance.clone();
    Ok(Json(blocking(move || store.get()).await?))
}

async fn enable_maintenance(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MaintenanceEnable>,
) -> Result<Json<Value>, ApiError> {
    if req.eta_minutes < 0 {
        return Err(ApiError::BadRequest("eta_minutes must not be negative".to_string()));
    }
    let store = state.maintenance.clone();
    let updated = blocking(move || store.enable(req.eta_minutes)).await?;
    Ok(Json(json!({
        "message": "Maintenance mode enabled",
        "eta_minutes": updated.eta_minutes,
    })))
}

async fn disable_maintenance(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.maintenance.clone();
    blocking(move || store.disable()).await?;
    Ok(Json(json!({ "message": "Maintenance mode disabled" })))
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

async fn predict_update_risk(
    ApiJson(req): ApiJson<UpdateRiskRequest>,
) -> Json<UpdateRiskResponse> {
    let resp = predict_risk(&req);
    tracing::info!(
        title = %req.update_title,
        score = resp.risk_score,
        level = %resp.risk_level,
        "scored deployment"
    );
    Json(resp)
}
