//! Health-Check-Endpunkt fuer Strangerlink
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl verbundener Clients

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::StrangerlinkMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Shutdown laeuft, neue Clients sollen nicht mehr kommen
    Draining,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connected_clients: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Instant,
    metriken: StrangerlinkMetrics,
    beendet: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu(metriken: StrangerlinkMetrics) -> Self {
        Self {
            start_time: Instant::now(),
            metriken,
            beendet: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend
    pub fn shutdown_melden(&self) {
        self.beendet.store(true, Ordering::Relaxed);
    }

    pub fn status(&self) -> HealthStatus {
        if self.beendet.load(Ordering::Relaxed) {
            HealthStatus::Draining
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn antwort(&self) -> HealthResponse {
        HealthResponse {
            status: self.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            connected_clients: self.metriken.connected_clients.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();

    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Draining => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> HealthState {
        HealthState::neu(StrangerlinkMetrics::neu().unwrap())
    }

    #[test]
    fn health_state_frisch_gesund() {
        let state = state();
        assert!(state.uptime_seconds() < 5);
        assert_eq!(state.status(), HealthStatus::Healthy);
    }

    #[test]
    fn health_state_shutdown() {
        let state = state();
        let klon = state.clone();
        klon.shutdown_melden();
        assert_eq!(state.status(), HealthStatus::Draining);
    }

    #[test]
    fn antwort_liest_verbundene_clients() {
        let state = state();
        state.metriken.connected_clients.set(4);
        assert_eq!(state.antwort().connected_clients, 4);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            connected_clients: 12,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"connected_clients\":12"));
    }

    #[test]
    fn health_response_deserialisierung() {
        let json = r#"{"status":"draining","version":"0.1.0","uptime_seconds":100,"connected_clients":0}"#;
        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, HealthStatus::Draining);
        assert_eq!(response.uptime_seconds, 100);
    }
}
