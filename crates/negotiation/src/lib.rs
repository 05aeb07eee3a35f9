//! strangerlink-negotiation – Clientseitige Verhandlung
//!
//! Jeder Peer eines Paares fuehrt unabhaengig eine eigene State Machine,
//! verbunden nur ueber das Relay des Servers.
//!
//! ```text
//! NichtGestartet -> AngebotGesendet (Initiator) | WartetAufAngebot (Responder)
//!                -> Ausgetauscht -> Verbunden
//! ```
//!
//! Netzwerkpfad-Kandidaten duerfen in beliebiger Reihenfolge eintreffen.
//! Vor dem Akzeptieren der Remote-Beschreibung werden sie gepuffert und
//! danach in Eingangsreihenfolge angewendet.

pub mod error;
pub mod peer;
pub mod rolle;
pub mod sitzung;
pub mod verhandlung;

pub use error::{NegotiationError, NegotiationResult};
pub use peer::PeerVerbindung;
pub use rolle::{initiator, rolle_bestimmen, Rolle};
pub use sitzung::ClientSitzung;
pub use verhandlung::{Verhandlung, VerhandlungsZustand};
