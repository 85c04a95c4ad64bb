//! REST API for the results of a run.
//!
//! Provides three GET endpoints:
//! - `/villages`: customers, populations and subscriptions per village
//! - `/state`: run config, run report, and latest village steps
//! - `/telemetry`: per-tick village records with optional timeslot range

mod handlers;
mod types;

pub use types::{ErrorResponse, StateResponse, TelemetryQuery, TelemetryRecord};

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::runner::{SimulationResult, VillageSummary};
use crate::sim::kpi::RunReport;
use crate::sim::types::SimConfig;
use crate::village::VillageStep;

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the run completes and wrapped in `Arc`; no locks
/// are needed since all data is read-only.
pub struct AppState {
    pub config: SimConfig,
    pub report: RunReport,
    pub steps: Vec<VillageStep>,
    pub villages: Vec<VillageSummary>,
}

impl From<SimulationResult> for AppState {
    fn from(result: SimulationResult) -> Self {
        Self {
            config: result.config,
            report: result.report,
            steps: result.steps,
            villages: result.villages,
        }
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/villages", get(handlers::get_villages))
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
