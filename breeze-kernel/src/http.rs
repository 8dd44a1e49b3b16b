/**
 * REST API - HTTP surface of the kernel
 *
 * ROLE:
 * Thin adapter between the network and the core: fan units post binary
 * telemetry, the vision reporter posts detections, the dashboard reads
 * status and history.
 *
 * ROUTES:
 * - GET  /health                 liveness probe
 * - GET  /system/health          uptime, tracked domains, memory
 * - POST /detections             JSON {domain: count}, replaces occupancy
 * - POST /telemetry/{domain}     12 bytes in, 4 bytes (LE f32 fan power) out
 * - GET  /status                 JSON {domain: status}
 * - GET  /history/{domain}       ?start&end&step, newline-separated log lines
 *
 * ERRORS:
 * Validation failures are 400 with a JSON body, unreadable logs are 500.
 */

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::health::{HealthTracker, KernelHealth};
use crate::history::{HistoryEngine, HistoryQuery};
use crate::ingest::{now_ms, TelemetryIngest};
use crate::models::{parse_detections, StatusEntry};
use crate::registry::StatusRegistry;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<KernelConfig>,
    pub registry: StatusRegistry,
    pub ingest: TelemetryIngest,
    pub history: HistoryEngine,
    pub health_tracker: HealthTracker,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    start: Option<String>,
    end: Option<String>,
    step: Option<String>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/detections", post(post_detections))
        .route("/telemetry/{domain}", post(post_telemetry))
        .route("/status", get(get_status))
        .route("/history/{domain}", get(get_history))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.registry))
}

// POST /detections
async fn post_detections(
    State(app): State<AppState>,
    body: Bytes,
) -> KernelResult<Json<serde_json::Value>> {
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "detections body is not JSON");
        KernelError::Validation(format!("invalid JSON: {e}"))
    })?;
    let counts = parse_detections(&payload).inspect_err(|e| {
        warn!(error = %e, "detections rejected");
    })?;

    let domains = counts.len();
    app.registry.record_detections(counts);
    Ok(Json(serde_json::json!({ "ok": true, "domains": domains })))
}

// POST /telemetry/{domain}
async fn post_telemetry(
    State(app): State<AppState>,
    Path(domain): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> KernelResult<impl IntoResponse> {
    if let Some(ct) = headers.get(header::CONTENT_TYPE) {
        let ok = ct
            .to_str()
            .map(|v| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case(OCTET_STREAM))
            .unwrap_or(false);
        if !ok {
            return Err(KernelError::Validation(format!(
                "telemetry must be sent as {OCTET_STREAM}"
            )));
        }
    }

    let actuation = app.ingest.post(&domain, &body).await?;
    let bytes = (actuation as f32).to_le_bytes().to_vec();
    Ok(([(header::CONTENT_TYPE, OCTET_STREAM)], bytes))
}

// GET /status
async fn get_status(State(app): State<AppState>) -> Json<BTreeMap<String, StatusEntry>> {
    Json(app.registry.snapshot())
}

// GET /history/{domain}
async fn get_history(
    State(app): State<AppState>,
    Path(domain): Path<String>,
    Query(params): Query<HistoryParams>,
) -> KernelResult<impl IntoResponse> {
    let query = HistoryQuery::from_params(
        params.start.as_deref(),
        params.end.as_deref(),
        params.step.as_deref(),
        now_ms() as f64 / 1000.0,
        app.config.default_step_secs,
    )?;
    let body = app.history.query(&domain, &query).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}
