//! Verhandlungs-State-Machine eines Peers
//!
//! Erzwingt die Reihenfolge Offer -> Answer und puffert eingehende
//! Kandidaten, bis die Remote-Beschreibung akzeptiert ist.

use std::collections::VecDeque;

use serde_json::Value;
use strangerlink_core::types::ClientId;

use crate::error::{NegotiationError, NegotiationResult};
use crate::peer::PeerVerbindung;
use crate::rolle::{rolle_bestimmen, Rolle};

/// Zustand der Verhandlung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerhandlungsZustand {
    /// Paar gebildet, noch nichts ausgetauscht
    NichtGestartet,
    /// Initiator hat sein Angebot gesendet
    AngebotGesendet,
    /// Responder wartet auf das Angebot
    WartetAufAngebot,
    /// Beide Beschreibungen gesetzt
    Ausgetauscht,
    /// Direkter Kanal steht
    Verbunden,
    /// Paarung aufgeloest; weitere Nachrichten werden abgelehnt
    Beendet,
}

/// Verhandlung mit genau einem Partner
pub struct Verhandlung<P: PeerVerbindung> {
    partner: ClientId,
    rolle: Rolle,
    zustand: VerhandlungsZustand,
    peer: P,
    remote_gesetzt: bool,
    ausstehende_kandidaten: VecDeque<Value>,
}

impl<P: PeerVerbindung> Verhandlung<P> {
    /// Erstellt eine Verhandlung; die Rolle folgt aus den beiden Identitaeten
    pub fn neu(eigene: &ClientId, partner: ClientId, peer: P) -> Self {
        let rolle = rolle_bestimmen(eigene, &partner);
        Self {
            partner,
            rolle,
            zustand: VerhandlungsZustand::NichtGestartet,
            peer,
            remote_gesetzt: false,
            ausstehende_kandidaten: VecDeque::new(),
        }
    }

    /// Startet die Verhandlung
    ///
    /// Der Initiator erhaelt das zu sendende Angebot, der Responder `None`.
    pub fn starten(&mut self) -> NegotiationResult<Option<Value>> {
        if self.zustand != VerhandlungsZustand::NichtGestartet {
            return Err(self.unerwartet("start"));
        }

        match self.rolle {
            Rolle::Initiator => {
                let angebot = self.peer.angebot_erstellen()?;
                self.peer.lokale_beschreibung_setzen(&angebot)?;
                self.zustand = VerhandlungsZustand::AngebotGesendet;
                tracing::debug!(partner = %self.partner, "Angebot erstellt");
                Ok(Some(angebot))
            }
            Rolle::Responder => {
                self.zustand = VerhandlungsZustand::WartetAufAngebot;
                Ok(None)
            }
        }
    }

    /// Verarbeitet ein eingehendes Angebot (nur Responder)
    ///
    /// Gibt die zu sendende Antwort zurueck. Ein Angebot vor `starten`
    /// startet die Verhandlung implizit.
    pub fn angebot_empfangen(&mut self, angebot: &Value) -> NegotiationResult<Value> {
        let erlaubt = self.rolle == Rolle::Responder
            && matches!(
                self.zustand,
                VerhandlungsZustand::NichtGestartet | VerhandlungsZustand::WartetAufAngebot
            );
        if !erlaubt {
            return Err(self.unerwartet("webrtc-offer"));
        }

        self.peer.remote_beschreibung_setzen(angebot)?;
        self.remote_gesetzt = true;
        self.kandidaten_abarbeiten();

        let antwort = self.peer.antwort_erstellen()?;
        self.peer.lokale_beschreibung_setzen(&antwort)?;
        self.zustand = VerhandlungsZustand::Ausgetauscht;
        tracing::debug!(partner = %self.partner, "Angebot beantwortet");
        Ok(antwort)
    }

    /// Verarbeitet eine eingehende Antwort (nur Initiator)
    pub fn antwort_empfangen(&mut self, antwort: &Value) -> NegotiationResult<()> {
        if self.rolle != Rolle::Initiator || self.zustand != VerhandlungsZustand::AngebotGesendet {
            return Err(self.unerwartet("webrtc-answer"));
        }

        self.peer.remote_beschreibung_setzen(antwort)?;
        self.remote_gesetzt = true;
        self.kandidaten_abarbeiten();
        self.zustand = VerhandlungsZustand::Ausgetauscht;
        Ok(())
    }

    /// Verarbeitet einen eingehenden Kandidaten
    ///
    /// Vor der Remote-Beschreibung wird gepuffert, danach sofort angewendet.
    pub fn kandidat_empfangen(&mut self, kandidat: Value) -> NegotiationResult<()> {
        if self.zustand == VerhandlungsZustand::Beendet {
            return Err(self.unerwartet("webrtc-ice"));
        }
        if self.remote_gesetzt {
            self.peer.kandidat_hinzufuegen(&kandidat)
        } else {
            self.ausstehende_kandidaten.push_back(kandidat);
            Ok(())
        }
    }

    /// Meldet, dass der direkte Kanal steht
    pub fn verbindung_hergestellt(&mut self) -> NegotiationResult<()> {
        if self.zustand != VerhandlungsZustand::Ausgetauscht {
            return Err(self.unerwartet("connected"));
        }
        self.zustand = VerhandlungsZustand::Verbunden;
        Ok(())
    }

    /// Beendet die Verhandlung und verwirft gepufferte Kandidaten
    pub fn beenden(&mut self) {
        self.ausstehende_kandidaten.clear();
        self.zustand = VerhandlungsZustand::Beendet;
    }

    pub fn partner(&self) -> &ClientId {
        &self.partner
    }

    pub fn rolle(&self) -> Rolle {
        self.rolle
    }

    pub fn zustand(&self) -> VerhandlungsZustand {
        self.zustand
    }

    /// Anzahl gepufferter Kandidaten
    pub fn ausstehende_kandidaten(&self) -> usize {
        self.ausstehende_kandidaten.len()
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn peer_mut(&mut self) -> &mut P {
        &mut self.peer
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Wendet alle gepufferten Kandidaten in Eingangsreihenfolge an
    ///
    /// Ein einzelner abgelehnter Kandidat bricht die Verhandlung nicht ab.
    fn kandidaten_abarbeiten(&mut self) {
        while let Some(kandidat) = self.ausstehende_kandidaten.pop_front() {
            if let Err(e) = self.peer.kandidat_hinzufuegen(&kandidat) {
                tracing::warn!(partner = %self.partner, fehler = %e, "Gepufferter Kandidat abgelehnt");
            }
        }
    }

    fn unerwartet(&self, nachricht: &'static str) -> NegotiationError {
        NegotiationError::UnerwarteteNachricht {
            nachricht,
            zustand: self.zustand,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
