// # Health Endpoints
//
// - `/health`, `/healthz`: liveness JSON, 503 when unhealthy
// - `/ready`, `/readiness`: 503 until the first successful sync
// - `/metrics`: Prometheus text exposition
//
// `HealthState` doubles as the engine's `HealthRecorder`. Its counters and
// gauges live in a per-instance `prometheus::Registry`.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use threat_sync_core::{HealthRecorder, Shutdown};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metric name prefix
const METRIC_PREFIX: &str = "unifi_threat_sync";

/// Prometheus metrics exposed on `/metrics`
#[derive(Debug, Clone)]
struct Metrics {
    registry: Registry,
    up: IntGauge,
    ready: IntGauge,
    sync_total: IntCounter,
    errors_total: IntCounter,
    uptime_seconds: IntGauge,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some(METRIC_PREFIX.to_string()), None)?;

        let metrics = Self {
            up: IntGauge::new("up", "Is the service up")?,
            ready: IntGauge::new("ready", "Is the service ready")?,
            sync_total: IntCounter::new("sync_total", "Total number of syncs")?,
            errors_total: IntCounter::new("errors_total", "Total number of errors")?,
            uptime_seconds: IntGauge::new("uptime_seconds", "Uptime in seconds")?,
            registry,
        };

        metrics.registry.register(Box::new(metrics.up.clone()))?;
        metrics.registry.register(Box::new(metrics.ready.clone()))?;
        metrics.registry.register(Box::new(metrics.sync_total.clone()))?;
        metrics.registry.register(Box::new(metrics.errors_total.clone()))?;
        metrics.registry.register(Box::new(metrics.uptime_seconds.clone()))?;

        Ok(metrics)
    }
}

/// Shared health state
#[derive(Debug)]
pub struct HealthState {
    version: &'static str,
    started: Instant,
    metrics: Metrics,
    last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl HealthState {
    /// Healthy but not ready until the first successful sync
    pub fn new(version: &'static str) -> prometheus::Result<Self> {
        let metrics = Metrics::new()?;
        metrics.up.set(1);

        Ok(Self {
            version,
            started: Instant::now(),
            metrics,
            last_sync: Mutex::new(None),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.metrics.up.set(i64::from(healthy));
    }

    pub fn is_healthy(&self) -> bool {
        self.metrics.up.get() == 1
    }

    pub fn is_ready(&self) -> bool {
        self.metrics.ready.get() == 1
    }

    pub fn sync_count(&self) -> u64 {
        self.metrics.sync_total.get()
    }

    pub fn error_count(&self) -> u64 {
        self.metrics.errors_total.get()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    fn status(&self) -> HealthStatus {
        let now = Utc::now();
        let last_sync = self.last_sync().map(|at| {
            let ago = (now - at).to_std().unwrap_or_default();
            format!("{} ago", format_duration(ago))
        });

        HealthStatus {
            status: if self.is_healthy() { "healthy" } else { "unhealthy" },
            version: self.version,
            uptime: format_duration(self.uptime()),
            last_sync,
            sync_count: self.sync_count(),
            error_count: self.error_count(),
            timestamp: now,
        }
    }

    /// Render the registry in the Prometheus text format
    fn encode_metrics(&self) -> Result<String, String> {
        let uptime = i64::try_from(self.uptime().as_secs()).unwrap_or(i64::MAX);
        self.metrics.uptime_seconds.set(uptime);

        let encoder = TextEncoder::new();
        let metric_families = self.metrics.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}

impl HealthRecorder for HealthState {
    fn record_sync(&self) {
        *self.last_sync.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.metrics.sync_total.inc();
        self.metrics.ready.set(1);
    }

    fn record_error(&self) {
        self.metrics.errors_total.inc();
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    uptime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sync: Option<String>,
    sync_count: u64,
    error_count: u64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ReadinessStatus {
    ready: bool,
    message: &'static str,
}

/// Build the health router
pub fn router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/healthz", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/readiness", get(handle_ready))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

async fn handle_health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let code = if state.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(state.status()))
}

async fn handle_ready(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.is_ready() {
        (
            StatusCode::OK,
            Json(ReadinessStatus {
                ready: true,
                message: "Ready to serve",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessStatus {
                ready: false,
                message: "Waiting for first successful sync",
            }),
        )
    }
}

async fn handle_metrics(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    match state.encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e,
            )
        }
    }
}

/// Bind the health listener on all interfaces
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port)).await
}

/// Serve until the shutdown signal fires
pub async fn serve(
    listener: TcpListener,
    state: Arc<HealthState>,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Health check server listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await
}

/// Render a duration as `1h2m3s`, rounded to whole seconds
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
