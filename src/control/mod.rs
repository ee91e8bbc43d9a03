//! The minimal HTTP control surface (spec §6.4): `/health`, `/metrics`, and
//! the `/maintenance/*` endpoints that invoke [`crate::flush::FlushOrchestrator`]
//! out-of-band. This is the only HTTP surface the pipeline itself owns -
//! everything upstream of it (L0-L4) speaks gRPC.

pub mod error;

use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::flush::FlushOrchestrator;
use crate::ingestion::circuit_breaker::State as BreakerState;
use crate::observability::{health, Metrics};

use error::ControlError;

/// Shared, process-wide breaker-state cell: the main ingestion loop records
/// its [`crate::ingestion::source::RawLedgerSource::breaker_state`] here
/// after every fetch so the health handler (which has no direct reference
/// to the running source) can read it back (spec §4.6 "circuit-breaker
/// state" in the health summary).
#[derive(Default)]
pub struct BreakerStateCell(AtomicU8);

impl BreakerStateCell {
    pub fn set(&self, state: BreakerState) {
        let code = match state {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        };
        self.0.store(code, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn get(&self) -> BreakerState {
        match self.0.load(std::sync::atomic::Ordering::Relaxed) {
            1 => BreakerState::Open,
            2 => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }
}

pub struct ControlState {
    pub metrics: Arc<Metrics>,
    pub breaker_state: Arc<BreakerStateCell>,
    pub flush: Arc<FlushOrchestrator>,
    pub prometheus_handle: PrometheusHandle,
    /// Guards `/maintenance/recreate`: must be set via operator configuration,
    /// never by a request body alone (spec §6.4 "guarded by an explicit
    /// confirmation flag").
    pub allow_recreate: bool,
    /// Serializes maintenance invocations triggered over HTTP so two
    /// concurrent `/maintenance/full` calls can't race each other's
    /// merge/expire/cleanup sequence (spec §4.4 "maintenance must not run
    /// concurrently with COPY on the same table" - this extends the same
    /// discipline to maintenance-vs-maintenance).
    pub maintenance_gate: Mutex<()>,
}

/// `/health` and `/maintenance/*`, bound to `control.health_port`.
pub fn router(state: Arc<ControlState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/maintenance/merge", post(merge_handler))
        .route("/maintenance/expire", post(expire_handler))
        .route("/maintenance/cleanup", post(cleanup_handler))
        .route("/maintenance/full", post(full_handler))
        .route("/maintenance/recreate", post(recreate_handler))
        .with_state(state)
}

/// `/metrics` alone, bound to its own `control.metrics_port` (spec §6.5
/// separates the two so a scraper can reach metrics without also exposing
/// the maintenance endpoints on the same listener).
pub fn metrics_router(state: Arc<ControlState>) -> Router {
    Router::new().route("/metrics", get(metrics_handler)).with_state(state)
}

async fn health_handler(State(state): State<Arc<ControlState>>) -> impl IntoResponse {
    let summary = health::summarize(&state.metrics, state.breaker_state.get());
    Json(summary)
}

async fn metrics_handler(State(state): State<Arc<ControlState>>) -> impl IntoResponse {
    state.prometheus_handle.render()
}

async fn merge_handler(State(state): State<Arc<ControlState>>) -> Result<impl IntoResponse, ControlError> {
    let _gate = state.maintenance_gate.lock().await;
    let merged = state.flush.maintain_merge().await.map_err(ControlError::from)?;
    Ok(Json(serde_json::json!({"merged_files": merged})))
}

async fn expire_handler(State(state): State<Arc<ControlState>>) -> Result<impl IntoResponse, ControlError> {
    let _gate = state.maintenance_gate.lock().await;
    let expired = state.flush.maintain_expire().await.map_err(ControlError::from)?;
    Ok(Json(serde_json::json!({"expired_snapshots": expired})))
}

async fn cleanup_handler(State(state): State<Arc<ControlState>>) -> Result<impl IntoResponse, ControlError> {
    let _gate = state.maintenance_gate.lock().await;
    let removed = state.flush.maintain_cleanup().await.map_err(ControlError::from)?;
    Ok(Json(serde_json::json!({"orphans_removed": removed})))
}

/// `POST /maintenance/full`: merge -> expire -> cleanup in sequence (spec
/// §6.4). Advisory only - the operator is responsible for pausing cold
/// writes first.
async fn full_handler(State(state): State<Arc<ControlState>>) -> Result<impl IntoResponse, ControlError> {
    let _gate = state.maintenance_gate.lock().await;
    let (merged, expired, cleaned) = state.flush.maintain_full().await.map_err(ControlError::from)?;
    Ok(Json(serde_json::json!({
        "merged_files": merged,
        "expired_snapshots": expired,
        "orphans_removed": cleaned,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RecreateRequest {
    pub table: String,
    #[serde(default)]
    pub confirm: bool,
}

/// `POST /maintenance/recreate`: destructive, drops and recreates one
/// partitioned cold table (spec §6.4). Requires both the operator-level
/// `allow_recreate` flag and an explicit `confirm: true` in the request
/// body - either alone is not enough.
async fn recreate_handler(
    State(state): State<Arc<ControlState>>,
    Json(req): Json<RecreateRequest>,
) -> Result<impl IntoResponse, ControlError> {
    if !state.allow_recreate || !req.confirm {
        return Err(ControlError::Forbidden(
            "recreate requires allow_recreate=true at startup and confirm=true in the request".to_string(),
        ));
    }
    if !crate::extract::rows::TABLE_NAMES.contains(&req.table.as_str()) {
        return Err(ControlError::BadRequest(format!("unknown table {}", req.table)));
    }
    let _gate = state.maintenance_gate.lock().await;
    let removed = state.flush.maintain_recreate(&req.table).await.map_err(ControlError::from)?;
    Ok(Json(serde_json::json!({"table": req.table, "objects_removed": removed})))
}
