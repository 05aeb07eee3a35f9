//! Session-Service – Lebenszyklus von Identitaeten und Paaren
//!
//! Einziger Serialisierungspunkt des Servers: Register, Warteschlange und
//! Moderation liegen gemeinsam hinter einem `parking_lot::Mutex`. Jede
//! oeffentliche Operation nimmt den Lock genau einmal und fuehrt alle
//! Zustandsaenderungen darunter aus.
//!
//! Benachrichtigungen werden unter dem Lock nicht-blockierend in die
//! Send-Queues eingereiht. Dadurch entspricht die Reihenfolge beim Client
//! der Reihenfolge der Zustandsaenderungen.
//!
//! ## Zustaende pro Identitaet
//! ```text
//! Leerlauf --find-stranger--> Wartend --match--> Gepaart
//!    ^                                              |
//!    +---- Verlassen / Transportverlust / Ban ------+
//! ```

use parking_lot::Mutex;
use strangerlink_core::types::{ClientId, Herkunft, VerbindungsId};
use strangerlink_moderation::{
    BanRecord, MeldeErgebnis, ModerationConfig, ModerationError, ModerationService,
};
use strangerlink_protocol::control::{ReportConfirmed, ServerNachricht};
use tokio::sync::broadcast;

use crate::broadcast::{EventBroadcaster, SendeQueue};
use crate::error::{SignalingError, SignalingResult};
use crate::matchmaking::{SuchErgebnis, Warteschlange};
use crate::registry::Verbindungsregister;
use crate::relay::{self, Weiterleitung};

/// Groesse des Broadcast-Kanals fuer Session-Ereignisse
const EREIGNIS_KANAL_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// Zustaende und Ereignisse
// ---------------------------------------------------------------------------

/// Beobachtbarer Zustand einer registrierten Identitaet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitzungsZustand {
    Leerlauf,
    Wartend,
    Gepaart { partner: ClientId },
}

/// Ausloeser fuer das Ende einer Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrennGrund {
    /// `disconnect-stranger`
    Verlassen,
    /// Transport geschlossen
    VerbindungVerloren,
    /// Mitglied wurde gebannt
    Gebannt,
    /// Identitaet oder Transport wurde neu registriert
    NeuRegistriert,
}

impl TrennGrund {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Verlassen => "verlassen",
            Self::VerbindungVerloren => "verbindung_verloren",
            Self::Gebannt => "gebannt",
            Self::NeuRegistriert => "neu_registriert",
        }
    }
}

/// Ereignisse die der SessionService versendet
#[derive(Debug, Clone)]
pub enum SessionEreignis {
    /// Transport angenommen
    VerbindungAngenommen { verbindung: VerbindungsId, herkunft: Herkunft },
    /// Identitaet an Transport gebunden
    Registriert { client_id: ClientId, verbindung: VerbindungsId },
    /// Transport oder Registrierung wegen Ban abgelehnt
    Abgelehnt { client_id: Option<ClientId>, herkunft: Herkunft },
    /// Identitaet wartet auf einen Partner
    Wartend { client_id: ClientId },
    /// Paar gebildet
    Gepaart { a: ClientId, b: ClientId },
    /// Paar aufgeloest; `client_id` hat das Ende ausgeloest
    SitzungBeendet {
        client_id: ClientId,
        partner: ClientId,
        grund: TrennGrund,
    },
    /// Nachricht an den Partner zugestellt
    Weitergeleitet { art: &'static str },
    /// Nachricht verworfen (nicht gepaart, unbekannt)
    Verworfen { art: &'static str },
    /// Meldung angenommen
    Gemeldet { gemeldet: ClientId, anzahl: u32 },
    /// Dauerhafter Ban verhaengt
    Gebannt { client_id: ClientId, meldungen: u32 },
    /// Transport beendet
    Getrennt {
        verbindung: VerbindungsId,
        client_id: Option<ClientId>,
    },
}

/// Momentaufnahme fuer Metriken und Health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatistik {
    pub verbindungen: usize,
    pub clients: usize,
    pub wartend: usize,
    pub paare: usize,
}

// ---------------------------------------------------------------------------
// SessionService
// ---------------------------------------------------------------------------

struct SessionInner {
    register: Verbindungsregister,
    warteschlange: Warteschlange,
    moderation: ModerationService,
}

/// Zentraler Dienst fuer Registrierung, Matchmaking, Relay und Moderation
pub struct SessionService {
    inner: Mutex<SessionInner>,
    broadcaster: EventBroadcaster,
    ereignis_tx: broadcast::Sender<SessionEreignis>,
}

impl SessionService {
    pub fn neu(moderation: ModerationConfig, broadcaster: EventBroadcaster) -> Self {
        let (ereignis_tx, _) = broadcast::channel(EREIGNIS_KANAL_GROESSE);
        Self {
            inner: Mutex::new(SessionInner {
                register: Verbindungsregister::neu(),
                warteschlange: Warteschlange::neu(),
                moderation: ModerationService::neu(moderation),
            }),
            broadcaster,
            ereignis_tx,
        }
    }

    /// Abonniert Session-Ereignisse
    pub fn ereignisse_abonnieren(&self) -> broadcast::Receiver<SessionEreignis> {
        self.ereignis_tx.subscribe()
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    // -----------------------------------------------------------------------
    // Transporte
    // -----------------------------------------------------------------------

    /// Nimmt einen neuen Transport an
    ///
    /// Transporte aus gebannter Herkunft werden abgelehnt, bevor eine
    /// Nachricht gelesen wird.
    pub fn verbindung_annehmen(
        &self,
        herkunft: Herkunft,
    ) -> SignalingResult<(VerbindungsId, SendeQueue)> {
        let mut inner = self.inner.lock();

        if let Err(e) = inner.moderation.ban_pruefen(None, Some(&herkunft)) {
            tracing::warn!(herkunft = %herkunft, "Transport aus gebannter Herkunft abgelehnt");
            self.ereignis(SessionEreignis::Abgelehnt {
                client_id: None,
                herkunft,
            });
            return Err(e.into());
        }

        let verbindung = VerbindungsId::new();
        inner.register.verbindung_eintragen(verbindung, herkunft);
        let rx = self.broadcaster.verbindung_registrieren(verbindung);

        tracing::debug!(verbindung = %verbindung, herkunft = %herkunft, "Transport angenommen");
        self.ereignis(SessionEreignis::VerbindungAngenommen { verbindung, herkunft });
        Ok((verbindung, rx))
    }

    /// Transport wurde geschlossen
    ///
    /// Gibt die gebundene Identitaet frei (Partner wird benachrichtigt) und
    /// entfernt den Transport. Mehrfache Aufrufe sind wirkungslos.
    pub fn verbindung_getrennt(&self, verbindung: &VerbindungsId) {
        let mut inner = self.inner.lock();

        let client_id = inner.register.identitaet_zu_verbindung(verbindung).cloned();
        if let Some(ref id) = client_id {
            self.identitaet_freigeben(&mut inner, id, TrennGrund::VerbindungVerloren);
        }
        let bekannt = inner.register.verbindung_austragen(verbindung).is_some();
        self.broadcaster.verbindung_entfernen(verbindung);

        if bekannt {
            tracing::info!(verbindung = %verbindung, client_id = ?client_id, "Transport getrennt");
            self.ereignis(SessionEreignis::Getrennt {
                verbindung: *verbindung,
                client_id,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Registrierung
    // -----------------------------------------------------------------------

    /// Bindet eine Identitaet an einen Transport
    ///
    /// - Gebannte Identitaet oder Herkunft: Ablehnung, nichts wird eingetragen
    /// - Transport traegt bereits eine andere Identitaet: diese wird zuerst
    ///   freigegeben
    /// - Identitaet ist auf einem anderen Transport aktiv: ihre Sitzung wird
    ///   beendet und sie wird auf den neuen Transport umgebunden
    pub fn registrieren(&self, verbindung: &VerbindungsId, client_id: ClientId) -> SignalingResult<()> {
        if client_id.ist_leer() {
            return Err(SignalingError::ungueltig("Identity must not be empty."));
        }

        let mut inner = self.inner.lock();

        let herkunft = inner
            .register
            .herkunft_von(verbindung)
            .ok_or_else(|| SignalingError::intern("Unbekannter Transport"))?;

        if let Err(e) = inner.moderation.ban_pruefen(Some(&client_id), Some(&herkunft)) {
            tracing::warn!(client_id = %client_id, herkunft = %herkunft, "Registrierung abgelehnt (gebannt)");
            self.ereignis(SessionEreignis::Abgelehnt {
                client_id: Some(client_id),
                herkunft,
            });
            return Err(e.into());
        }

        if let Some(bisher) = inner.register.identitaet_zu_verbindung(verbindung).cloned() {
            if bisher == client_id {
                return Ok(());
            }
            self.identitaet_freigeben(&mut inner, &bisher, TrennGrund::NeuRegistriert);
        }

        if inner.register.ist_registriert(&client_id) {
            self.identitaet_freigeben(&mut inner, &client_id, TrennGrund::NeuRegistriert);
        }

        inner.register.eintragen(client_id.clone(), *verbindung, herkunft);
        tracing::info!(client_id = %client_id, verbindung = %verbindung, herkunft = %herkunft, "Client registriert");
        self.ereignis(SessionEreignis::Registriert {
            client_id,
            verbindung: *verbindung,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Matchmaking
    // -----------------------------------------------------------------------

    /// Sucht einen Partner fuer die Identitaet des Transports
    ///
    /// Stimmt `client_id` nicht mit der registrierten Identitaet ueberein,
    /// wird die Anfrage ignoriert. Bei einem Treffer erhalten beide Seiten
    /// `matched` mit der Identitaet des jeweils anderen.
    pub fn partner_suchen(&self, verbindung: &VerbindungsId, client_id: &ClientId) -> SignalingResult<SuchErgebnis> {
        let mut inner = self.inner.lock();

        let eigene = inner
            .register
            .identitaet_zu_verbindung(verbindung)
            .cloned()
            .ok_or(SignalingError::NichtRegistriert)?;

        if eigene != *client_id {
            tracing::debug!(
                client_id = %client_id,
                registriert = %eigene,
                "find-stranger mit fremder Identitaet ignoriert"
            );
            return Ok(SuchErgebnis::Ignoriert);
        }

        let herkunft = inner.register.eintrag(&eigene).map(|e| e.herkunft);
        if let Err(e) = inner.moderation.ban_pruefen(Some(&eigene), herkunft.as_ref()) {
            tracing::warn!(client_id = %eigene, "Suche abgelehnt (gebannt)");
            self.identitaet_freigeben(&mut inner, &eigene, TrennGrund::Gebannt);
            return Err(e.into());
        }

        let SessionInner {
            register,
            warteschlange,
            ..
        } = &mut *inner;
        let ergebnis = warteschlange.partner_finden(&eigene, register);

        match &ergebnis {
            SuchErgebnis::Gepaart(partner) => {
                if !register.paaren(&eigene, partner) {
                    return Err(SignalingError::intern("Paarung inkonsistent"));
                }
                if let Some(v) = register.nachschlagen(&eigene) {
                    self.broadcaster
                        .an_verbindung_senden(&v, ServerNachricht::matched(partner.clone()));
                }
                if let Some(v) = register.nachschlagen(partner) {
                    self.broadcaster
                        .an_verbindung_senden(&v, ServerNachricht::matched(eigene.clone()));
                }
                tracing::info!(client_id = %eigene, partner = %partner, "Paar gebildet");
                self.ereignis(SessionEreignis::Gepaart {
                    a: eigene.clone(),
                    b: partner.clone(),
                });
            }
            SuchErgebnis::Eingereiht => {
                tracing::debug!(client_id = %eigene, wartend = warteschlange.laenge(), "Client wartet");
                self.ereignis(SessionEreignis::Wartend { client_id: eigene.clone() });
            }
            SuchErgebnis::Ignoriert => {
                tracing::debug!(client_id = %eigene, "Doppelte Suche ignoriert");
            }
        }

        Ok(ergebnis)
    }

    // -----------------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------------

    /// Leitet eine Nachricht an den Partner weiter
    ///
    /// Gibt `true` zurueck wenn zugestellt wurde. Nicht gepaarte oder
    /// unbekannte Empfaenger werden still verworfen.
    pub fn weiterleiten(
        &self,
        verbindung: &VerbindungsId,
        weiterleitung: Weiterleitung,
        empfaenger: &ClientId,
    ) -> bool {
        let inner = self.inner.lock();
        let art = weiterleitung.art();

        match relay::route(&inner.register, verbindung, empfaenger) {
            Ok((absender, ziel)) => {
                let zugestellt = self
                    .broadcaster
                    .relay_an_verbindung(&ziel, weiterleitung.zustellung(absender));
                if zugestellt {
                    tracing::trace!(empfaenger = %empfaenger, art, "Weitergeleitet");
                    self.ereignis(SessionEreignis::Weitergeleitet { art });
                } else {
                    self.ereignis(SessionEreignis::Verworfen { art });
                }
                zugestellt
            }
            Err(grund) => {
                tracing::debug!(verbindung = %verbindung, empfaenger = %empfaenger, art, grund = ?grund, "Weiterleitung verworfen");
                self.ereignis(SessionEreignis::Verworfen { art });
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sitzungsende
    // -----------------------------------------------------------------------

    /// Beendet die Sitzung mit `partner` freiwillig
    ///
    /// Wird ignoriert, wenn `partner` nicht der eingetragene Partner ist.
    pub fn sitzung_verlassen(&self, verbindung: &VerbindungsId, partner: &ClientId) -> bool {
        let mut inner = self.inner.lock();

        let Some(eigene) = inner.register.identitaet_zu_verbindung(verbindung).cloned() else {
            return false;
        };
        if inner.register.partner(&eigene) != Some(partner) {
            tracing::debug!(client_id = %eigene, partner = %partner, "Verlassen ignoriert (kein Partner)");
            return false;
        }

        self.paarung_beenden(&mut inner, &eigene, TrennGrund::Verlassen);
        true
    }

    // -----------------------------------------------------------------------
    // Moderation
    // -----------------------------------------------------------------------

    /// Nimmt eine Meldung gegen `gemeldet` entgegen
    ///
    /// Gibt die Bestaetigung fuer den Melder zurueck. Erreicht die Meldung
    /// die Schwelle, wird der Gemeldete in derselben Operation entfernt,
    /// sein Partner benachrichtigt und sein Transport geschlossen.
    pub fn melden(
        &self,
        verbindung: &VerbindungsId,
        gemeldet: &ClientId,
        grund: Option<&str>,
    ) -> SignalingResult<ServerNachricht> {
        let mut inner = self.inner.lock();

        let melder = inner
            .register
            .identitaet_zu_verbindung(verbindung)
            .cloned()
            .ok_or(SignalingError::NichtRegistriert)?;
        let herkunft = inner.register.eintrag(gemeldet).map(|e| e.herkunft);

        let ergebnis = inner.moderation.melden(&melder, gemeldet, grund, herkunft)?;
        self.ereignis(SessionEreignis::Gemeldet {
            gemeldet: gemeldet.clone(),
            anzahl: ergebnis.anzahl(),
        });

        let bestaetigung = match ergebnis {
            MeldeErgebnis::Gezaehlt { anzahl, schwelle } => ReportConfirmed {
                message: "Report submitted successfully.".to_string(),
                count: anzahl,
                threshold: Some(schwelle),
            },
            MeldeErgebnis::Gebannt { anzahl, ban, neu } => {
                if neu {
                    self.gebannten_entfernen(&mut inner, &ban);
                }
                ReportConfirmed {
                    message: "User has been reported and permanently banned.".to_string(),
                    count: anzahl,
                    threshold: None,
                }
            }
        };

        Ok(ServerNachricht::ReportConfirmed(bestaetigung))
    }

    // -----------------------------------------------------------------------
    // Inspektion
    // -----------------------------------------------------------------------

    /// Zustand einer Identitaet (`None` wenn nicht registriert)
    pub fn zustand(&self, client_id: &ClientId) -> Option<SitzungsZustand> {
        let inner = self.inner.lock();
        let eintrag = inner.register.eintrag(client_id)?;
        Some(match &eintrag.partner {
            Some(partner) => SitzungsZustand::Gepaart {
                partner: partner.clone(),
            },
            None if inner.warteschlange.enthaelt(client_id) => SitzungsZustand::Wartend,
            None => SitzungsZustand::Leerlauf,
        })
    }

    pub fn partner_von(&self, client_id: &ClientId) -> Option<ClientId> {
        self.inner.lock().register.partner(client_id).cloned()
    }

    pub fn warteschlangen_laenge(&self) -> usize {
        self.inner.lock().warteschlange.laenge()
    }

    pub fn paar_anzahl(&self) -> usize {
        self.inner.lock().register.paar_anzahl()
    }

    pub fn client_anzahl(&self) -> usize {
        self.inner.lock().register.anzahl()
    }

    pub fn statistik(&self) -> SessionStatistik {
        let inner = self.inner.lock();
        SessionStatistik {
            verbindungen: inner.register.verbindungs_anzahl(),
            clients: inner.register.anzahl(),
            wartend: inner.warteschlange.laenge(),
            paare: inner.register.paar_anzahl(),
        }
    }

    pub fn meldungen_anzahl(&self, client_id: &ClientId) -> u32 {
        self.inner.lock().moderation.meldungen_anzahl(client_id)
    }

    pub fn ban_laden(&self, client_id: &ClientId) -> Option<BanRecord> {
        self.inner.lock().moderation.ban_laden(client_id).cloned()
    }

    pub fn alle_bans(&self) -> Vec<BanRecord> {
        self.inner.lock().moderation.alle_bans()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden (Lock wird vom Aufrufer gehalten)
    // -----------------------------------------------------------------------

    /// Loest die Paarung von `client_id` und benachrichtigt den Partner
    fn paarung_beenden(&self, inner: &mut SessionInner, client_id: &ClientId, grund: TrennGrund) {
        let Some(partner) = inner.register.paarung_loesen(client_id) else {
            return;
        };
        if let Some(v) = inner.register.nachschlagen(&partner) {
            self.broadcaster
                .an_verbindung_senden(&v, ServerNachricht::Disconnected);
        }
        tracing::info!(client_id = %client_id, partner = %partner, grund = grund.als_str(), "Sitzung beendet");
        self.ereignis(SessionEreignis::SitzungBeendet {
            client_id: client_id.clone(),
            partner,
            grund,
        });
    }

    /// Entfernt eine Identitaet vollstaendig aus Paar, Warteschlange und Register
    fn identitaet_freigeben(&self, inner: &mut SessionInner, client_id: &ClientId, grund: TrennGrund) {
        self.paarung_beenden(inner, client_id, grund);
        inner.warteschlange.entfernen(client_id);
        inner.register.entfernen(client_id);
    }

    /// Setzt einen frischen Ban durch
    fn gebannten_entfernen(&self, inner: &mut SessionInner, ban: &BanRecord) {
        let begruendung = ModerationError::ClientGebannt {
            grund: ban.grund.clone(),
            meldungen: ban.meldungen,
        }
        .ban_begruendung();

        if let Some(verbindung) = inner.register.nachschlagen(&ban.client_id) {
            self.identitaet_freigeben(inner, &ban.client_id, TrennGrund::Gebannt);
            if let Some((grund, meldungen)) = begruendung {
                self.broadcaster
                    .an_verbindung_senden(&verbindung, ServerNachricht::banned(grund, meldungen));
            }
            self.broadcaster.verbindung_schliessen(&verbindung);
        }

        self.ereignis(SessionEreignis::Gebannt {
            client_id: ban.client_id.clone(),
            meldungen: ban.meldungen,
        });
    }

    fn ereignis(&self, ereignis: SessionEreignis) {
        // Ohne Abonnenten geht das Ereignis verloren
        let _ = self.ereignis_tx.send(ereignis);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
