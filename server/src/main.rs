//! Strangerlink Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use strangerlink_observability::logging_initialisieren;
use strangerlink_server::config::{ServerConfig, CONFIG_ENV};
use strangerlink_server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let mut config = ServerConfig::laden(&config_pfad)?;
    config.umgebung_anwenden()?;

    logging_initialisieren(&config.logging.level, &config.logging.format);
    config.validieren()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Strangerlink Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
