//! Moderations-Service – Meldungen zaehlen, Bans verhaengen und pruefen
//!
//! Der Service haelt den gesamten Moderationszustand im Speicher und ist
//! nicht intern synchronisiert. Der Signaling-Service fuehrt ihn unter
//! demselben Lock wie Register und Warteschlange; Ban und erzwungene
//! Trennung bilden so eine atomare Operation.

use std::collections::HashMap;

use chrono::Utc;
use strangerlink_core::types::{ClientId, Herkunft};
use uuid::Uuid;

use crate::error::{ModerationError, ModerationResult};
use crate::types::{BanRecord, MeldeErgebnis, Meldung, STANDARD_GRUND};

/// Meldungsanzahl, ab der eine Identitaet dauerhaft gebannt wird
pub const BAN_SCHWELLE: u32 = 5;

/// Konfiguration des Moderations-Service
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Meldungsanzahl fuer einen dauerhaften Ban
    pub ban_schwelle: u32,
    /// Bans auch auf die Netzwerk-Herkunft ausdehnen
    pub herkunft_sperren: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            ban_schwelle: BAN_SCHWELLE,
            herkunft_sperren: true,
        }
    }
}

/// Moderations-Service – Meldungen und dauerhafte Bans
#[derive(Debug, Default)]
pub struct ModerationService {
    config: ModerationConfig,
    /// Meldungen pro gemeldeter Identitaet (kein Verfall)
    meldungen: HashMap<ClientId, Vec<Meldung>>,
    meldungen_pro_herkunft: HashMap<Herkunft, u32>,
    bans: HashMap<ClientId, BanRecord>,
    /// Gesperrte Herkunft -> Identitaet, deren Ban sie gesperrt hat
    gebannte_herkuenfte: HashMap<Herkunft, ClientId>,
}

impl ModerationService {
    /// Erstellt einen neuen ModerationService
    pub fn neu(config: ModerationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Nimmt eine Meldung entgegen
    ///
    /// `herkunft` ist die aktuell bekannte Herkunft des gemeldeten Clients.
    /// Erreicht die Meldungsanzahl die Schwelle, wird genau einmal ein
    /// `BanRecord` angelegt; spaetere Meldungen liefern den bestehenden Ban.
    pub fn melden(
        &mut self,
        melder: &ClientId,
        gemeldet: &ClientId,
        grund: Option<&str>,
        herkunft: Option<Herkunft>,
    ) -> ModerationResult<MeldeErgebnis> {
        if melder == gemeldet {
            tracing::warn!(client_id = %melder, "Selbstmeldung abgelehnt");
            return Err(ModerationError::Selbstmeldung(melder.clone()));
        }

        let grund = grund
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(STANDARD_GRUND)
            .to_string();

        let liste = self.meldungen.entry(gemeldet.clone()).or_default();
        liste.push(Meldung {
            gemeldet: gemeldet.clone(),
            melder: melder.clone(),
            zeitpunkt: Utc::now(),
            grund,
            herkunft,
        });
        let anzahl = liste.len() as u32;

        if let Some(h) = herkunft {
            *self.meldungen_pro_herkunft.entry(h).or_default() += 1;
        }

        tracing::info!(
            gemeldet = %gemeldet,
            melder = %melder,
            anzahl,
            schwelle = self.config.ban_schwelle,
            "Meldung eingegangen"
        );

        if anzahl < self.config.ban_schwelle {
            return Ok(MeldeErgebnis::Gezaehlt {
                anzahl,
                schwelle: self.config.ban_schwelle,
            });
        }

        if let Some(ban) = self.bans.get(gemeldet) {
            return Ok(MeldeErgebnis::Gebannt {
                anzahl,
                ban: ban.clone(),
                neu: false,
            });
        }

        let ban = self.ban_erstellen(gemeldet, herkunft, anzahl);
        Ok(MeldeErgebnis::Gebannt {
            anzahl,
            ban,
            neu: true,
        })
    }

    fn ban_erstellen(
        &mut self,
        client_id: &ClientId,
        herkunft: Option<Herkunft>,
        anzahl: u32,
    ) -> BanRecord {
        // Ist der Client gerade offline, gilt die zuletzt gemeldete Herkunft
        let herkunft = herkunft.or_else(|| {
            self.meldungen
                .get(client_id)
                .and_then(|liste| liste.iter().rev().find_map(|m| m.herkunft))
        });

        let ban = BanRecord {
            id: Uuid::new_v4(),
            client_id: client_id.clone(),
            herkunft,
            grund: format!("Received {} reports for inappropriate behavior", anzahl),
            meldungen: anzahl,
            gebannt_am: Utc::now(),
        };

        if self.config.herkunft_sperren {
            if let Some(h) = herkunft {
                self.gebannte_herkuenfte.insert(h, client_id.clone());
            }
        }
        self.bans.insert(client_id.clone(), ban.clone());

        tracing::warn!(
            client_id = %client_id,
            herkunft = ?herkunft,
            ban_id = %ban.id,
            meldungen = anzahl,
            "Dauerhafter Ban verhaengt"
        );

        ban
    }

    /// Prueft Identitaet und Herkunft und gibt einen Fehler zurueck wenn gebannt
    pub fn ban_pruefen(
        &self,
        client_id: Option<&ClientId>,
        herkunft: Option<&Herkunft>,
    ) -> ModerationResult<()> {
        if let Some(ban) = client_id.and_then(|id| self.bans.get(id)) {
            return Err(ModerationError::ClientGebannt {
                grund: ban.grund.clone(),
                meldungen: ban.meldungen,
            });
        }

        if let Some(h) = herkunft {
            if let Some(ausloeser) = self.gebannte_herkuenfte.get(h) {
                let meldungen = self.bans.get(ausloeser).map_or(0, |b| b.meldungen);
                return Err(ModerationError::HerkunftGebannt {
                    herkunft: *h,
                    meldungen,
                });
            }
        }

        Ok(())
    }

    /// Gibt `true` zurueck wenn Identitaet oder Herkunft gebannt ist
    pub fn ist_gebannt(&self, client_id: Option<&ClientId>, herkunft: Option<&Herkunft>) -> bool {
        self.ban_pruefen(client_id, herkunft).is_err()
    }

    /// Laedt den Ban einer Identitaet
    pub fn ban_laden(&self, client_id: &ClientId) -> Option<&BanRecord> {
        self.bans.get(client_id)
    }

    /// Gibt alle Bans zurueck (aelteste zuerst)
    pub fn alle_bans(&self) -> Vec<BanRecord> {
        let mut bans: Vec<BanRecord> = self.bans.values().cloned().collect();
        bans.sort_by_key(|b| b.gebannt_am);
        bans
    }

    /// Kumulierte Meldungen gegen eine Identitaet
    pub fn meldungen_anzahl(&self, client_id: &ClientId) -> u32 {
        self.meldungen.get(client_id).map_or(0, |l| l.len() as u32)
    }

    /// Kumulierte Meldungen gegen Clients einer Herkunft
    pub fn meldungen_fuer_herkunft(&self, herkunft: &Herkunft) -> u32 {
        self.meldungen_pro_herkunft.get(herkunft).copied().unwrap_or(0)
    }

    /// Alle Meldungen gegen eine Identitaet in Eingangsreihenfolge
    pub fn meldungen(&self, client_id: &ClientId) -> &[Meldung] {
        self.meldungen
            .get(client_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Konfigurierte Ban-Schwelle
    pub fn schwelle(&self) -> u32 {
        self.config.ban_schwelle
    }
}
