//! Initiator-Bestimmung (Glare-Vermeidung)
//!
//! Beide Peers kennen nach `matched` dieselben zwei Identitaeten und leiten
//! daraus lokal dieselbe Rollenverteilung ab. Der Server uebertraegt kein Flag.

use strangerlink_core::types::ClientId;

/// Rolle eines Peers in der Verhandlung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rolle {
    /// Eroeffnet die Verhandlung mit einem Angebot
    Initiator,
    /// Wartet auf das Angebot und antwortet
    Responder,
}

/// Leitet die eigene Rolle aus dem Paar der Identitaeten ab
///
/// Die lexikografisch kleinere Identitaet ist Initiator.
pub fn rolle_bestimmen(eigene: &ClientId, partner: &ClientId) -> Rolle {
    if eigene < partner {
        Rolle::Initiator
    } else {
        Rolle::Responder
    }
}

/// Gibt den Initiator eines Paares zurueck (unabhaengig von der Reihenfolge)
pub fn initiator<'a>(a: &'a ClientId, b: &'a ClientId) -> &'a ClientId {
    if a < b {
        a
    } else {
        b
    }
}
