//! Fehlertypen fuer den Signaling-Service

use strangerlink_core::StrangerlinkError;
use strangerlink_moderation::ModerationError;
use strangerlink_protocol::control::{ErrorCode, ServerNachricht};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Fehler aus dem Core-Crate
    #[error(transparent)]
    Core(#[from] StrangerlinkError),

    /// Moderations-Ablehnung (Ban, Selbstmeldung)
    #[error("Moderation: {0}")]
    Moderation(#[from] ModerationError),

    /// Transportfehler (WebSocket)
    #[error("Transportfehler: {0}")]
    Transport(String),

    /// Verbindung hat keine registrierte Identitaet
    #[error("Verbindung ist nicht registriert")]
    NichtRegistriert,

    /// Ungueltige Anfrage (leere Identitaet, unlesbare Nachricht)
    #[error("Ungueltige Anfrage: {0}")]
    UngueltigeAnfrage(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Fehler fuer eine ungueltige Anfrage
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeAnfrage(msg.into())
    }

    /// Gibt true zurueck wenn der Transport nicht weiter benutzbar ist
    pub fn ist_verbindungsfehler(&self) -> bool {
        match self {
            Self::Io(_) | Self::Transport(_) => true,
            Self::Core(e) => e.ist_verbindungsfehler(),
            _ => false,
        }
    }

    /// Gibt true zurueck wenn die Verbindung nach der Antwort geschlossen wird
    pub fn beendet_verbindung(&self) -> bool {
        matches!(self, Self::Moderation(e) if e.ist_ban())
    }

    /// Client-seitige Darstellung des Fehlers
    ///
    /// Bans werden als `banned` gemeldet, alle anderen Ablehnungen als `error`.
    pub fn als_antwort(&self) -> ServerNachricht {
        match self {
            Self::Moderation(e) => match e.ban_begruendung() {
                Some((grund, meldungen)) => ServerNachricht::banned(grund, meldungen),
                None => ServerNachricht::error(ErrorCode::SelfReport, "You cannot report yourself."),
            },
            Self::NichtRegistriert => {
                ServerNachricht::error(ErrorCode::NotRegistered, "Register before using this event.")
            }
            Self::UngueltigeAnfrage(msg) | Self::Core(StrangerlinkError::UngueltigeNachricht(msg)) => {
                ServerNachricht::error(ErrorCode::InvalidRequest, msg.clone())
            }
            _ => ServerNachricht::error(ErrorCode::InternalError, "Internal server error."),
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
