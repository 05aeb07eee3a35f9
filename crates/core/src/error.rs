//! Fehlertypen fuer Strangerlink
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Untermodule definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Strangerlink
pub type Result<T> = std::result::Result<T, StrangerlinkError>;

/// Crate-uebergreifende Fehler im Strangerlink-System
#[derive(Debug, Error)]
pub enum StrangerlinkError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StrangerlinkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Verbindung betrifft
    pub fn ist_verbindungsfehler(&self) -> bool {
        matches!(self, Self::Verbindung(_) | Self::Getrennt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = StrangerlinkError::Konfiguration("Port fehlt".into());
        assert_eq!(e.to_string(), "Konfigurationsfehler: Port fehlt");
    }

    #[test]
    fn verbindungsfehler_erkennung() {
        assert!(StrangerlinkError::Getrennt("eof".into()).ist_verbindungsfehler());
        assert!(!StrangerlinkError::intern("x").ist_verbindungsfehler());
    }
}
