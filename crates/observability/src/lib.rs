//! # strangerlink-observability
//!
//! Observability-Crate fuer Strangerlink:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber (Text oder JSON)
//! - HTTP-Layer (CORS, Request-Tracing)

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, StrangerlinkMetrics};
pub use middleware::{cors_layer, request_trace_layer};

use axum::Router;

/// Router mit `GET /metrics` und `GET /health`
///
/// Wird in den Haupt-Router des Servers gemergt.
pub fn observability_router(metriken: StrangerlinkMetrics, health: HealthState) -> Router {
    Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health))
}
