//! HTTP-Layer fuer den Strangerlink-Router
//!
//! Browser-Clients werden von beliebigen Origins bedient; TLS und
//! Origin-Pruefung uebernimmt ein vorgeschalteter Reverse Proxy.

use axum::http::Method;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// CORS fuer alle Origins (`GET` und `POST`)
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
}

/// Erstellt den Tracing-Layer fuer HTTP-Anfragen (inkl. WebSocket-Upgrades)
pub fn request_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}
