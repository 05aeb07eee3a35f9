//! Gemeinsame Identifikationstypen fuer Strangerlink
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Client-Identitaet, Transport-Handle und Netzwerk-Herkunft zur Compilezeit
//! auszuschliessen.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Vom Client gewaehlte, nicht authentifizierte Identitaet
///
/// Die Ordnung ist die lexikografische Byte-Ordnung des Tokens. Beide Peers
/// leiten daraus unabhaengig voneinander den Initiator ab.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Erstellt eine ClientId aus einem beliebigen Token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Gibt das Token als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leere Tokens werden bei der Registrierung abgelehnt
    pub fn ist_leer(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ClientId {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serverseitiges Transport-Handle (eines pro angenommener Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

/// Best-Effort Netzwerk-Herkunft eines Clients (fuer Ban-Korrelation)
///
/// IPv4-gemappte IPv6-Adressen werden auf IPv4 normalisiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Herkunft(pub IpAddr);

impl Herkunft {
    /// Erstellt eine normalisierte Herkunft
    pub fn new(ip: IpAddr) -> Self {
        Self(ip.to_canonical())
    }

    /// Gibt die IP-Adresse zurueck
    pub fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for Herkunft {
    fn from(ip: IpAddr) -> Self {
        Self::new(ip)
    }
}

impl From<std::net::SocketAddr> for Herkunft {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(addr.ip())
    }
}

impl std::fmt::Display for Herkunft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
