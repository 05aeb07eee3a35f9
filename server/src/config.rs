//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Umgebungsvariablen ueberschreiben einzelne Werte:
//! `PORT` den HTTP/WebSocket-Port, `SL_LOG_LEVEL` und `SL_LOG_FORMAT`
//! das Logging (siehe `strangerlink_observability::logging`).

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use strangerlink_core::StrangerlinkError;
use strangerlink_moderation::{ModerationConfig, BAN_SCHWELLE};
use strangerlink_observability::logging::{log_format_gueltig, log_level_gueltig};
use strangerlink_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use strangerlink_signaling::SignalingConfig;

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
pub const CONFIG_ENV: &str = "STRANGERLINK_CONFIG";
/// Umgebungsvariable, die den HTTP/WebSocket-Port ueberschreibt
pub const PORT_ENV: &str = "PORT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Meldungen und Bans
    pub moderation: ModerationEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Strangerlink".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Listener
    pub bind_adresse: String,
    /// Port fuer HTTP/WebSocket (Metriken und Health laufen mit)
    pub port: u16,
    /// Port fuer Clients mit Frame-Protokoll (leer = kein TCP-Listener)
    pub tcp_port: Option<u16>,
    /// Maximale Frame-Groesse fuer TCP-Clients in Bytes
    pub max_frame_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3001,
            tcp_port: None,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Moderations-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationEinstellungen {
    /// Meldungsanzahl fuer einen dauerhaften Ban
    pub ban_schwelle: u32,
    /// Bans auch auf die Netzwerk-Herkunft ausdehnen
    pub herkunft_sperren: bool,
}

impl Default for ModerationEinstellungen {
    fn default() -> Self {
        Self {
            ban_schwelle: BAN_SCHWELLE,
            herkunft_sperren: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Mountet `/metrics` und `/health` auf dem Haupt-Port
    pub aktiviert: bool,
    /// Nach dem Shutdown-Signal meldet `/health` so lange 503, bevor der
    /// HTTP-Listener schliesst
    pub auslauf_ms: u64,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            auslauf_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Wendet `PORT` aus der Umgebung an
    pub fn umgebung_anwenden(&mut self) -> strangerlink_core::Result<()> {
        match std::env::var(PORT_ENV) {
            Ok(wert) => self.port_ueberschreiben(&wert),
            Err(_) => Ok(()),
        }
    }

    /// Setzt den HTTP/WebSocket-Port aus einem Textwert
    pub fn port_ueberschreiben(&mut self, wert: &str) -> strangerlink_core::Result<()> {
        let port = wert.trim().parse::<u16>().map_err(|_| {
            StrangerlinkError::Konfiguration(format!("{PORT_ENV} ist kein gueltiger Port: '{wert}'"))
        })?;
        self.netzwerk.port = port;
        Ok(())
    }

    /// Prueft die Konfiguration auf Widersprueche
    pub fn validieren(&self) -> strangerlink_core::Result<()> {
        self.bind_ip()?;

        if self.moderation.ban_schwelle == 0 {
            return Err(StrangerlinkError::Konfiguration(
                "moderation.ban_schwelle muss mindestens 1 sein".into(),
            ));
        }
        if self.netzwerk.tcp_port.is_some_and(|p| p != 0 && p == self.netzwerk.port) {
            return Err(StrangerlinkError::Konfiguration(format!(
                "netzwerk.tcp_port und netzwerk.port sind beide {}",
                self.netzwerk.port
            )));
        }
        if self.netzwerk.max_frame_groesse == 0 {
            return Err(StrangerlinkError::Konfiguration(
                "netzwerk.max_frame_groesse muss groesser als 0 sein".into(),
            ));
        }
        if !log_level_gueltig(&self.logging.level) {
            tracing::warn!(level = %self.logging.level, "Log-Level ist keine einfache Stufe, wird als Filter-Direktive verwendet");
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(StrangerlinkError::Konfiguration(format!(
                "logging.format '{}' unbekannt (text oder json)",
                self.logging.format
            )));
        }
        Ok(())
    }

    fn bind_ip(&self) -> strangerlink_core::Result<IpAddr> {
        self.netzwerk.bind_adresse.parse().map_err(|_| {
            StrangerlinkError::Konfiguration(format!(
                "netzwerk.bind_adresse ist keine IP-Adresse: '{}'",
                self.netzwerk.bind_adresse
            ))
        })
    }

    /// Bind-Adresse fuer HTTP/WebSocket
    pub fn http_bind_adresse(&self) -> strangerlink_core::Result<SocketAddr> {
        Ok(SocketAddr::new(self.bind_ip()?, self.netzwerk.port))
    }

    /// Bind-Adresse fuer den TCP-Listener, falls konfiguriert
    pub fn tcp_bind_adresse(&self) -> strangerlink_core::Result<Option<SocketAddr>> {
        match self.netzwerk.tcp_port {
            Some(port) => Ok(Some(SocketAddr::new(self.bind_ip()?, port))),
            None => Ok(None),
        }
    }

    /// Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            moderation: ModerationConfig {
                ban_schwelle: self.moderation.ban_schwelle,
                herkunft_sperren: self.moderation.herkunft_sperren,
            },
            max_frame_groesse: self.netzwerk.max_frame_groesse,
        }
    }
}
