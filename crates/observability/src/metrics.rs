//! Prometheus-kompatible Metriken fuer Strangerlink
//!
//! Registrierte Metriken:
//! - `strangerlink_connected_clients` – Gauge: Offene Transporte
//! - `strangerlink_waiting_clients` – Gauge: Clients in der Warteschlange
//! - `strangerlink_active_pairs` – Gauge: Aktive Paare
//! - `strangerlink_matches_total` – Counter: Gebildete Paare
//! - `strangerlink_relayed_total` – Counter: Weitergeleitete Nachrichten (kind)
//! - `strangerlink_dropped_total` – Counter: Verworfene Nachrichten (kind)
//! - `strangerlink_reports_total` – Counter: Eingegangene Meldungen
//! - `strangerlink_bans_total` – Counter: Verhaengte Bans
//! - `strangerlink_rejected_registrations_total` – Counter: Abgelehnte Registrierungen

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Nachrichtenarten, die das Relay unterscheidet
pub const RELAY_ARTEN: [&str; 4] = ["offer", "answer", "ice", "message"];

/// Alle Strangerlink-Prometheus-Metriken
#[derive(Clone)]
pub struct StrangerlinkMetrics {
    pub registry: Arc<Registry>,

    // Zustand
    pub connected_clients: IntGauge,
    pub waiting_clients: IntGauge,
    pub active_pairs: IntGauge,

    // Ereignisse
    pub matches_total: IntCounter,
    pub relayed_total: IntCounterVec,
    pub dropped_total: IntCounterVec,
    pub reports_total: IntCounter,
    pub bans_total: IntCounter,
    pub rejected_registrations_total: IntCounter,
}

impl StrangerlinkMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Zustand ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "strangerlink_connected_clients",
            "Anzahl offener Transporte",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let waiting_clients = IntGauge::with_opts(Opts::new(
            "strangerlink_waiting_clients",
            "Anzahl wartender Clients",
        ))?;
        registry.register(Box::new(waiting_clients.clone()))?;

        let active_pairs = IntGauge::with_opts(Opts::new(
            "strangerlink_active_pairs",
            "Anzahl aktiver Paare",
        ))?;
        registry.register(Box::new(active_pairs.clone()))?;

        // --- Ereignisse ---
        let matches_total = IntCounter::with_opts(Opts::new(
            "strangerlink_matches_total",
            "Gesamtanzahl gebildeter Paare",
        ))?;
        registry.register(Box::new(matches_total.clone()))?;

        let relayed_total = IntCounterVec::new(
            Opts::new(
                "strangerlink_relayed_total",
                "Weitergeleitete Nachrichten nach Art",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(relayed_total.clone()))?;

        let dropped_total = IntCounterVec::new(
            Opts::new(
                "strangerlink_dropped_total",
                "Verworfene Nachrichten nach Art",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(dropped_total.clone()))?;

        let reports_total = IntCounter::with_opts(Opts::new(
            "strangerlink_reports_total",
            "Gesamtanzahl eingegangener Meldungen",
        ))?;
        registry.register(Box::new(reports_total.clone()))?;

        let bans_total = IntCounter::with_opts(Opts::new(
            "strangerlink_bans_total",
            "Gesamtanzahl verhaengter Bans",
        ))?;
        registry.register(Box::new(bans_total.clone()))?;

        let rejected_registrations_total = IntCounter::with_opts(Opts::new(
            "strangerlink_rejected_registrations_total",
            "Abgelehnte Registrierungen und Transporte gebannter Clients",
        ))?;
        registry.register(Box::new(rejected_registrations_total.clone()))?;

        // Label-Werte vorbelegen, damit alle Arten ab Start exportiert werden
        for art in RELAY_ARTEN {
            relayed_total.with_label_values(&[art]);
            dropped_total.with_label_values(&[art]);
        }

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            waiting_clients,
            active_pairs,
            matches_total,
            relayed_total,
            dropped_total,
            reports_total,
            bans_total,
            rejected_registrations_total,
        })
    }

    /// Uebernimmt einen Schnappschuss des Sitzungszustands
    pub fn zustand_setzen(&self, verbunden: usize, wartend: usize, paare: usize) {
        self.connected_clients.set(verbunden as i64);
        self.waiting_clients.set(wartend as i64);
        self.active_pairs.set(paare as i64);
    }

    pub fn weitergeleitet(&self, art: &str) {
        self.relayed_total.with_label_values(&[art]).inc();
    }

    pub fn verworfen(&self, art: &str) {
        self.dropped_total.with_label_values(&[art]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: StrangerlinkMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<StrangerlinkMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = StrangerlinkMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zustand_setzt_alle_gauges() {
        let metriken = StrangerlinkMetrics::neu().unwrap();
        metriken.zustand_setzen(7, 1, 3);
        assert_eq!(metriken.connected_clients.get(), 7);
        assert_eq!(metriken.waiting_clients.get(), 1);
        assert_eq!(metriken.active_pairs.get(), 3);
    }

    #[test]
    fn relay_zaehler_nach_art() {
        let metriken = StrangerlinkMetrics::neu().unwrap();
        metriken.weitergeleitet("offer");
        metriken.weitergeleitet("ice");
        metriken.weitergeleitet("ice");
        metriken.verworfen("message");

        assert_eq!(metriken.relayed_total.with_label_values(&["offer"]).get(), 1);
        assert_eq!(metriken.relayed_total.with_label_values(&["ice"]).get(), 2);
        assert_eq!(metriken.relayed_total.with_label_values(&["answer"]).get(), 0);
        assert_eq!(metriken.dropped_total.with_label_values(&["message"]).get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = StrangerlinkMetrics::neu().unwrap();
        metriken.matches_total.inc();
        metriken.bans_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("strangerlink_matches_total 1"));
        assert!(output.contains("strangerlink_bans_total 1"));
        assert!(output.contains("strangerlink_relayed_total{kind=\"answer\"} 0"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn alle_metriken_in_registry_registriert() {
        let metriken = StrangerlinkMetrics::neu().unwrap();

        let families = metriken.registry.gather();
        let namen: Vec<&str> = families.iter().map(|f| f.get_name()).collect();

        for name in [
            "strangerlink_connected_clients",
            "strangerlink_waiting_clients",
            "strangerlink_active_pairs",
            "strangerlink_matches_total",
            "strangerlink_relayed_total",
            "strangerlink_dropped_total",
            "strangerlink_reports_total",
            "strangerlink_bans_total",
            "strangerlink_rejected_registrations_total",
        ] {
            assert!(namen.contains(&name), "Metrik fehlt: {name}");
        }
    }
}
