//! Fehlertypen fuer das Moderations-Subsystem

use strangerlink_core::types::{ClientId, Herkunft};
use thiserror::Error;

/// Alle moeglichen Fehler im Moderations-Subsystem
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Ein Client versucht sich selbst zu melden
    #[error("Selbstmeldung nicht erlaubt: {0}")]
    Selbstmeldung(ClientId),

    /// Die Identitaet ist dauerhaft gebannt
    #[error("Client gebannt ({meldungen} Meldungen): {grund}")]
    ClientGebannt { grund: String, meldungen: u32 },

    /// Die Netzwerk-Herkunft ist dauerhaft gebannt
    #[error("Herkunft gebannt: {herkunft}")]
    HerkunftGebannt { herkunft: Herkunft, meldungen: u32 },
}

impl ModerationError {
    /// Begruendung fuer den Client (Text der `banned`-Nachricht)
    ///
    /// `None` fuer Fehler, die keinen Ban darstellen.
    pub fn ban_begruendung(&self) -> Option<(String, u32)> {
        match self {
            Self::ClientGebannt { meldungen, .. } => Some((
                format!(
                    "Your account has been permanently banned due to {} reports of inappropriate behavior.",
                    meldungen
                ),
                *meldungen,
            )),
            Self::HerkunftGebannt { meldungen, .. } => Some((
                "Your IP address has been banned due to multiple reports of inappropriate behavior."
                    .to_string(),
                *meldungen,
            )),
            Self::Selbstmeldung(_) => None,
        }
    }

    /// Gibt true zurueck wenn der Fehler einen Ban darstellt
    pub fn ist_ban(&self) -> bool {
        matches!(
            self,
            Self::ClientGebannt { .. } | Self::HerkunftGebannt { .. }
        )
    }
}

/// Result-Typ fuer das Moderations-Subsystem
pub type ModerationResult<T> = Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_begruendung_enthaelt_anzahl() {
        let e = ModerationError::ClientGebannt {
            grund: "x".into(),
            meldungen: 5,
        };
        let (text, anzahl) = e.ban_begruendung().unwrap();
        assert!(text.contains("5 reports"));
        assert_eq!(anzahl, 5);
        assert!(e.ist_ban());
    }

    #[test]
    fn selbstmeldung_ist_kein_ban() {
        let e = ModerationError::Selbstmeldung(ClientId::from("a"));
        assert!(e.ban_begruendung().is_none());
        assert!(!e.ist_ban());
    }
}
