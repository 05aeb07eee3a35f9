//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SL_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `strangerlink_signaling=trace`), Standard aus der Konfiguration
//! - `SL_LOG_FORMAT`: Format (text/json), Standard aus der Konfiguration

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "SL_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "SL_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor `level` und `format`.
/// Ein ungueltiger Filter faellt auf `info` zurueck.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| format.to_string());

    match format_waehlen(&format) {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Normalisiert ein Format; Unbekanntes wird zu `text`
pub fn format_waehlen(format: &str) -> &'static str {
    if format.trim().eq_ignore_ascii_case("json") {
        "json"
    } else {
        "text"
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
