//! strangerlink-signaling – Paarung und Relay anonymer Clients
//!
//! Dieser Crate verbindet anonyme Clients zu exklusiven Paaren und leitet
//! deren Verhandlungs- und Chat-Nachrichten weiter.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)   WebSocket (ws_router, axum)
//!          |                                |
//!          +---------------+----------------+
//!                          v
//! ClientConnection (pro Transport ein Task)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     v
//! SessionService (ein Lock)
//!     +-- Verbindungsregister  (Identitaet <-> Transport, Partner)
//!     +-- Warteschlange        (FIFO, Paarbildung)
//!     +-- relay::route         (Zustellung nur innerhalb des Paares)
//!     +-- ModerationService    (Meldungen, Bans)
//!
//! EventBroadcaster – Send-Queues aller Transporte
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod matchmaking;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod session;
pub mod tcp;
pub mod websocket;

// Bequeme Re-Exporte
pub use broadcast::{Ausgehend, EventBroadcaster, SendeQueue};
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use matchmaking::SuchErgebnis;
pub use server_state::{SignalingConfig, SignalingState};
pub use session::{SessionEreignis, SessionService, SessionStatistik, SitzungsZustand, TrennGrund};
pub use tcp::SignalingServer;
pub use websocket::ws_router;
