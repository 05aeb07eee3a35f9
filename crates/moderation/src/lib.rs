//! strangerlink-moderation – Meldungen und Bans
//!
//! Sammelt Missbrauchsmeldungen pro Identitaet (und pro Netzwerk-Herkunft)
//! und wandelt das Erreichen der Ban-Schwelle in einen dauerhaften Ban um,
//! der sowohl die Identitaet als auch ihre Herkunft sperrt.

pub mod error;
pub mod service;
pub mod types;

pub use error::{ModerationError, ModerationResult};
pub use service::{ModerationConfig, ModerationService, BAN_SCHWELLE};
pub use types::{BanRecord, MeldeErgebnis, Meldung};
