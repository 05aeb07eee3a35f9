//! strangerlink-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Strangerlink-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, StrangerlinkError};
pub use types::{ClientId, Herkunft, VerbindungsId};
