//! Datentypen des Moderations-Subsystems

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strangerlink_core::types::{ClientId, Herkunft};
use uuid::Uuid;

/// Standard-Begruendung wenn der Melder keine angibt
pub const STANDARD_GRUND: &str = "Inappropriate content";

/// Eine einzelne Missbrauchsmeldung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meldung {
    pub gemeldet: ClientId,
    pub melder: ClientId,
    pub zeitpunkt: DateTime<Utc>,
    pub grund: String,
    /// Herkunft des gemeldeten Clients zum Meldezeitpunkt (falls bekannt)
    pub herkunft: Option<Herkunft>,
}

/// Dauerhafter Ban (fuer die Lebensdauer des Prozesses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    pub id: Uuid,
    pub client_id: ClientId,
    pub herkunft: Option<Herkunft>,
    pub grund: String,
    /// Meldungsanzahl zum Zeitpunkt des Bans
    pub meldungen: u32,
    pub gebannt_am: DateTime<Utc>,
}

/// Ergebnis einer angenommenen Meldung
#[derive(Debug, Clone)]
pub enum MeldeErgebnis {
    /// Meldung gezaehlt, Schwelle noch nicht erreicht
    Gezaehlt { anzahl: u32, schwelle: u32 },
    /// Schwelle erreicht oder ueberschritten
    Gebannt {
        anzahl: u32,
        ban: BanRecord,
        /// `true` nur fuer die Meldung, die den Ban ausgeloest hat
        neu: bool,
    },
}

impl MeldeErgebnis {
    /// Kumulierte Meldungen gegen den gemeldeten Client
    pub fn anzahl(&self) -> u32 {
        match self {
            Self::Gezaehlt { anzahl, .. } | Self::Gebannt { anzahl, .. } => *anzahl,
        }
    }
}
