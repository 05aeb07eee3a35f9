//! Abstraktion der lokalen Verhandlungs-Maschinerie
//!
//! Implementierungen kapseln z.B. eine WebRTC-PeerConnection. Beschreibungen
//! und Kandidaten sind fuer diese Crate opake JSON-Werte.

use serde_json::Value;

use crate::error::NegotiationResult;

/// Lokales Verhandlungsobjekt eines Peers
///
/// `kandidat_hinzufuegen` darf nur aufgerufen werden, nachdem
/// `remote_beschreibung_setzen` erfolgreich war. `Verhandlung` garantiert das.
pub trait PeerVerbindung {
    /// Erstellt ein Angebot
    fn angebot_erstellen(&mut self) -> NegotiationResult<Value>;

    /// Erstellt eine Antwort auf die gesetzte Remote-Beschreibung
    fn antwort_erstellen(&mut self) -> NegotiationResult<Value>;

    /// Uebernimmt ein eigenes Angebot bzw. eine eigene Antwort
    fn lokale_beschreibung_setzen(&mut self, beschreibung: &Value) -> NegotiationResult<()>;

    /// Akzeptiert die Beschreibung der Gegenseite (Offer oder Answer)
    fn remote_beschreibung_setzen(&mut self, beschreibung: &Value) -> NegotiationResult<()>;

    /// Wendet einen Netzwerkpfad-Kandidaten der Gegenseite an
    fn kandidat_hinzufuegen(&mut self, kandidat: &Value) -> NegotiationResult<()>;
}
