//! Fehlertypen fuer die Verhandlung

use thiserror::Error;

use crate::verhandlung::VerhandlungsZustand;

/// Fehler der Verhandlungs-State-Machine
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Nachricht passt nicht zu Rolle oder Zustand; der Zustand bleibt unveraendert
    #[error("Unerwartete Nachricht '{nachricht}' im Zustand {zustand:?}")]
    UnerwarteteNachricht {
        nachricht: &'static str,
        zustand: VerhandlungsZustand,
    },

    /// Fehler der darunterliegenden Verhandlungs-Maschinerie
    #[error("Peer-Fehler: {0}")]
    Peer(String),
}

impl NegotiationError {
    /// Erstellt einen Peer-Fehler
    pub fn peer(msg: impl Into<String>) -> Self {
        Self::Peer(msg.into())
    }
}

/// Result-Typ fuer die Verhandlung
pub type NegotiationResult<T> = Result<T, NegotiationError>;
