//! Breeze kernel: occupancy-driven fan control with a per-domain telemetry log.

pub mod actuation;
pub mod config;
pub mod error;
pub mod health;
pub mod history;
pub mod http;
pub mod ingest;
pub mod models;
pub mod registry;
pub mod state;
pub mod storage;
pub mod timer;

use crate::config::KernelConfig;
use crate::health::HealthTracker;
use crate::history::HistoryEngine;
use crate::http::AppState;
use crate::ingest::TelemetryIngest;
use crate::registry::StatusRegistry;
use crate::storage::TelemetryLog;
use std::sync::Arc;

/// Wires the core components around one config.
pub fn build_state(config: KernelConfig) -> AppState {
    let log = Arc::new(TelemetryLog::new(config.data_dir.clone()));
    let registry = StatusRegistry::new(config.inactivity_timeout());

    AppState {
        ingest: TelemetryIngest::new(registry.clone(), log.clone()),
        history: HistoryEngine::new(log),
        registry,
        health_tracker: HealthTracker::new(),
        config: Arc::new(config),
    }
}
