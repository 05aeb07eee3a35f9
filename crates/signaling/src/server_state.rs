//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services als Arc-Referenz, die sicher zwischen
//! tokio-Tasks geteilt werden kann.

use std::sync::Arc;
use std::time::Instant;

use strangerlink_moderation::ModerationConfig;
use strangerlink_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::broadcast::EventBroadcaster;
use crate::session::SessionService;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Ban-Schwelle und Herkunfts-Sperre
    pub moderation: ModerationConfig,
    /// Maximale Frame-Groesse fuer TCP-Clients in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Strangerlink".to_string(),
            moderation: ModerationConfig::default(),
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    pub config: Arc<SignalingConfig>,
    /// Register, Warteschlange und Moderation
    pub sessions: SessionService,
    /// Send-Queues aller Transporte
    pub broadcaster: EventBroadcaster,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let broadcaster = EventBroadcaster::neu();
        let sessions = SessionService::neu(config.moderation.clone(), broadcaster.clone());
        Arc::new(Self {
            config: Arc::new(config),
            sessions,
            broadcaster,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
