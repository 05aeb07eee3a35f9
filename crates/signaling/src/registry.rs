//! Verbindungsregister – Identitaet <-> Transport und Paarungszustand
//!
//! Haelt zwei Sichten, die bei jeder Aenderung gemeinsam gepflegt werden:
//! - Identitaet -> Eintrag (Transport, Herkunft, Partner)
//! - Transport -> Identitaet (Rueckwaerts-Index, O(1) pro Nachricht)
//!
//! Zusaetzlich sind alle angenommenen Transporte mit ihrer Herkunft
//! bekannt, auch solange sie noch keine Identitaet registriert haben.
//!
//! Das Register selbst ist nicht synchronisiert; es lebt im Lock des
//! `SessionService`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use strangerlink_core::types::{ClientId, Herkunft, VerbindungsId};

/// Zustand einer registrierten Identitaet
#[derive(Debug, Clone)]
pub struct ClientEintrag {
    pub verbindung: VerbindungsId,
    pub herkunft: Herkunft,
    pub partner: Option<ClientId>,
    pub registriert_am: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Verbindungsregister {
    clients: HashMap<ClientId, ClientEintrag>,
    identitaet_pro_verbindung: HashMap<VerbindungsId, ClientId>,
    verbindungen: HashMap<VerbindungsId, Herkunft>,
}

impl Verbindungsregister {
    pub fn neu() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Transporte
    // -----------------------------------------------------------------------

    /// Nimmt einen neuen Transport auf (noch ohne Identitaet)
    pub fn verbindung_eintragen(&mut self, verbindung: VerbindungsId, herkunft: Herkunft) {
        self.verbindungen.insert(verbindung, herkunft);
    }

    /// Entfernt einen Transport; eine gebundene Identitaet bleibt unberuehrt
    pub fn verbindung_austragen(&mut self, verbindung: &VerbindungsId) -> Option<Herkunft> {
        self.verbindungen.remove(verbindung)
    }

    pub fn herkunft_von(&self, verbindung: &VerbindungsId) -> Option<Herkunft> {
        self.verbindungen.get(verbindung).copied()
    }

    pub fn verbindungs_anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    // -----------------------------------------------------------------------
    // Identitaeten
    // -----------------------------------------------------------------------

    /// Bindet eine Identitaet an einen Transport
    ///
    /// Ueberschreibt einen veralteten Eintrag derselben Identitaet. Der
    /// vorherige Transport wird zurueckgegeben und ist danach anonym.
    /// Ein bestehender Partner-Eintrag wird nicht uebernommen.
    pub fn eintragen(
        &mut self,
        client_id: ClientId,
        verbindung: VerbindungsId,
        herkunft: Herkunft,
    ) -> Option<VerbindungsId> {
        // Transport war bereits an eine andere Identitaet gebunden
        if let Some(alte_id) = self.identitaet_pro_verbindung.remove(&verbindung) {
            if alte_id != client_id {
                self.clients.remove(&alte_id);
            }
        }

        let eintrag = ClientEintrag {
            verbindung,
            herkunft,
            partner: None,
            registriert_am: Utc::now(),
        };
        let alte_verbindung = self
            .clients
            .insert(client_id.clone(), eintrag)
            .map(|alt| alt.verbindung)
            .filter(|alt| *alt != verbindung);

        if let Some(alt) = alte_verbindung {
            self.identitaet_pro_verbindung.remove(&alt);
        }
        self.identitaet_pro_verbindung.insert(verbindung, client_id);
        alte_verbindung
    }

    /// Aktueller Transport einer Identitaet
    pub fn nachschlagen(&self, client_id: &ClientId) -> Option<VerbindungsId> {
        self.clients.get(client_id).map(|e| e.verbindung)
    }

    /// Identitaet, die an einen Transport gebunden ist
    pub fn identitaet_zu_verbindung(&self, verbindung: &VerbindungsId) -> Option<&ClientId> {
        self.identitaet_pro_verbindung.get(verbindung)
    }

    /// Entfernt eine Identitaet samt Rueckwaerts-Index
    ///
    /// Der Partner wird dabei nicht angefasst, siehe `paarung_loesen`.
    pub fn entfernen(&mut self, client_id: &ClientId) -> Option<ClientEintrag> {
        let eintrag = self.clients.remove(client_id)?;
        self.identitaet_pro_verbindung.remove(&eintrag.verbindung);
        Some(eintrag)
    }

    pub fn eintrag(&self, client_id: &ClientId) -> Option<&ClientEintrag> {
        self.clients.get(client_id)
    }

    /// Alle registrierten Identitaeten
    pub fn eintraege(&self) -> impl Iterator<Item = (&ClientId, &ClientEintrag)> {
        self.clients.iter()
    }

    pub fn ist_registriert(&self, client_id: &ClientId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Registriert und ohne Partner
    pub fn ist_frei(&self, client_id: &ClientId) -> bool {
        self.clients
            .get(client_id)
            .map(|e| e.partner.is_none())
            .unwrap_or(false)
    }

    pub fn partner(&self, client_id: &ClientId) -> Option<&ClientId> {
        self.clients.get(client_id).and_then(|e| e.partner.as_ref())
    }

    pub fn anzahl(&self) -> usize {
        self.clients.len()
    }

    // -----------------------------------------------------------------------
    // Paarungen
    // -----------------------------------------------------------------------

    /// Setzt beide Partner-Eintraege in einem Schritt
    ///
    /// Gibt `false` zurueck (ohne Aenderung) wenn eine Seite nicht frei ist.
    pub fn paaren(&mut self, a: &ClientId, b: &ClientId) -> bool {
        if a == b || !self.ist_frei(a) || !self.ist_frei(b) {
            return false;
        }
        if let Some(e) = self.clients.get_mut(a) {
            e.partner = Some(b.clone());
        }
        if let Some(e) = self.clients.get_mut(b) {
            e.partner = Some(a.clone());
        }
        true
    }

    /// Loest die Paarung einer Identitaet auf beiden Seiten
    ///
    /// Gibt den bisherigen Partner zurueck.
    pub fn paarung_loesen(&mut self, client_id: &ClientId) -> Option<ClientId> {
        let partner = self.clients.get_mut(client_id)?.partner.take()?;
        if let Some(e) = self.clients.get_mut(&partner) {
            if e.partner.as_ref() == Some(client_id) {
                e.partner = None;
            }
        }
        Some(partner)
    }

    /// Anzahl aktiver Paare
    pub fn paar_anzahl(&self) -> usize {
        self.clients.values().filter(|e| e.partner.is_some()).count() / 2
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
