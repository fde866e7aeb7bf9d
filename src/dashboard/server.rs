//! Dashboard server module
//!
//! HTTP server exposing log queries for the admin dashboard. Every route is
//! wrapped by the request-logging and error-capture middleware, so dashboard
//! traffic shows up in the same partitions it reads.

use anyhow::{Context, Result};
use axum::{
    extract::{FromRef, Query, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task;
use tracing::info;

use super::middleware::{capture_errors, request_logging};
use super::{ApiError, CleanupQuery, WindowQuery};
use crate::logging::{
    CleanupReport, ErrorSummary, LogEntry, LogLevel, LogService, PerformanceMetrics,
    DEFAULT_QUERY_HOURS,
};

/// Shared state for dashboard handlers
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub service: LogService,
    /// Retention used when the cleanup endpoint is called without `days`
    pub retention_days: u32,
}

impl FromRef<DashboardState> for LogService {
    fn from_ref(state: &DashboardState) -> Self {
        state.service.clone()
    }
}

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server gracefully
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }
    }
}

/// Build the dashboard router with logging middleware applied
pub fn router(state: DashboardState) -> Router {
    let service = state.service.clone();

    Router::new()
        .route("/health", get(health))
        .route("/api/logs/recent", get(recent_logs))
        .route("/api/logs/errors", get(error_summary))
        .route("/api/logs/performance", get(performance_metrics))
        .route("/api/logs/cleanup", post(cleanup))
        .route("/api/logs/flush", post(flush))
        .with_state(state)
        .layer(from_fn_with_state(service.clone(), capture_errors))
        .layer(from_fn_with_state(service, request_logging))
}

/// Start the dashboard server
///
/// # Arguments
/// * `port` - Port to listen on (0 picks a free port)
/// * `state` - Log service and defaults for the handlers
///
/// # Returns
/// A `ServerHandle` that can be used to shut down the server
pub async fn start(port: u16, state: DashboardState) -> Result<ServerHandle> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard server to {}", addr))?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard server listening on {}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Dashboard server shutting down");
        })
        .await
        .ok();
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        addr: bound_addr,
    })
}

/// GET /health
async fn health(State(service): State<LogService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "buffered": service.buffered_len(),
    }))
}

/// GET /api/logs/recent?hours=&level=
async fn recent_logs(
    State(service): State<LogService>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let level = query
        .level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()?;
    let hours = query.hours.unwrap_or(DEFAULT_QUERY_HOURS);

    // Partition reads are blocking file IO
    let entries = task::spawn_blocking(move || service.get_recent_logs(hours, level)).await?;
    Ok(Json(entries))
}

/// GET /api/logs/errors?hours=
async fn error_summary(
    State(service): State<LogService>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ErrorSummary>, ApiError> {
    let hours = query.hours.unwrap_or(DEFAULT_QUERY_HOURS);
    let summary = task::spawn_blocking(move || service.get_error_summary(hours)).await?;
    Ok(Json(summary))
}

/// GET /api/logs/performance?hours=
async fn performance_metrics(
    State(service): State<LogService>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<PerformanceMetrics>, ApiError> {
    let hours = query.hours.unwrap_or(DEFAULT_QUERY_HOURS);
    let metrics = task::spawn_blocking(move || service.get_performance_metrics(hours)).await?;
    Ok(Json(metrics))
}

/// POST /api/logs/cleanup?days=
async fn cleanup(
    State(state): State<DashboardState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupReport>, ApiError> {
    let days = query.days.unwrap_or(state.retention_days);
    let service = state.service;
    let report = task::spawn_blocking(move || service.cleanup_old_logs(days)).await?;
    Ok(Json(report))
}

/// POST /api/logs/flush
async fn flush(State(service): State<LogService>) -> Result<Json<Value>, ApiError> {
    let flushed = task::spawn_blocking(move || service.flush_all()).await?;
    Ok(Json(json!({ "flushed": flushed })))
}
