//! Client-Sitzung: Bruecke zwischen Server-Nachrichten und Verhandlung
//!
//! Uebersetzt eingehende `ServerNachricht`en in Zustandsuebergaenge und
//! liefert die daraus folgenden `ClientNachricht`en zum Senden zurueck.
//! Fuer jede neue Paarung wird ueber die Fabrik ein frischer Peer erzeugt.

use serde_json::Value;
use strangerlink_core::types::ClientId;
use strangerlink_protocol::control::{
    ChatRequest, ClientNachricht, IceRequest, LeaveRequest, RelayRequest, ReportRequest,
    ServerNachricht,
};

use crate::error::NegotiationResult;
use crate::peer::PeerVerbindung;
use crate::verhandlung::Verhandlung;

/// Zustand eines Clients ueber mehrere Paarungen hinweg
pub struct ClientSitzung<P, F>
where
    P: PeerVerbindung,
    F: FnMut() -> P,
{
    eigene: ClientId,
    fabrik: F,
    aktuell: Option<Verhandlung<P>>,
    gebannt: bool,
}

impl<P, F> ClientSitzung<P, F>
where
    P: PeerVerbindung,
    F: FnMut() -> P,
{
    pub fn neu(eigene: ClientId, fabrik: F) -> Self {
        Self {
            eigene,
            fabrik,
            aktuell: None,
            gebannt: false,
        }
    }

    pub fn eigene_id(&self) -> &ClientId {
        &self.eigene
    }

    /// Aktueller Partner (falls gepaart)
    pub fn partner(&self) -> Option<&ClientId> {
        self.aktuell.as_ref().map(Verhandlung::partner)
    }

    pub fn verhandlung(&self) -> Option<&Verhandlung<P>> {
        self.aktuell.as_ref()
    }

    pub fn verhandlung_mut(&mut self) -> Option<&mut Verhandlung<P>> {
        self.aktuell.as_mut()
    }

    pub fn ist_gebannt(&self) -> bool {
        self.gebannt
    }

    // -----------------------------------------------------------------------
    // Ausgehende Aktionen
    // -----------------------------------------------------------------------

    pub fn registrieren(&self) -> ClientNachricht {
        ClientNachricht::Register(self.eigene.clone())
    }

    pub fn partner_suchen(&self) -> ClientNachricht {
        ClientNachricht::FindStranger(self.eigene.clone())
    }

    /// Lokal gesammelter Kandidat -> an den Partner weiterleiten
    pub fn kandidat_gesammelt(&self, kandidat: Value) -> Option<ClientNachricht> {
        let partner = self.partner()?.clone();
        Some(ClientNachricht::WebrtcIce(IceRequest {
            candidate: kandidat,
            recipient: partner,
        }))
    }

    pub fn text_senden(&self, text: impl Into<String>) -> Option<ClientNachricht> {
        let partner = self.partner()?.clone();
        Some(ClientNachricht::SendMessage(ChatRequest {
            text: text.into(),
            recipient: partner,
        }))
    }

    /// Meldet den aktuellen Partner
    pub fn partner_melden(&self, grund: Option<String>) -> Option<ClientNachricht> {
        let partner = self.partner()?.clone();
        Some(ClientNachricht::ReportUser(ReportRequest {
            reported: partner,
            reason: grund,
        }))
    }

    /// Verlaesst die aktuelle Paarung und verwirft die Verhandlung
    pub fn verlassen(&mut self) -> Option<ClientNachricht> {
        let mut verhandlung = self.aktuell.take()?;
        verhandlung.beenden();
        Some(ClientNachricht::DisconnectStranger(LeaveRequest {
            partner: verhandlung.partner().clone(),
        }))
    }

    // -----------------------------------------------------------------------
    // Eingehende Nachrichten
    // -----------------------------------------------------------------------

    /// Verarbeitet eine Server-Nachricht und liefert die Antworten
    pub fn verarbeiten(&mut self, nachricht: ServerNachricht) -> NegotiationResult<Vec<ClientNachricht>> {
        match nachricht {
            ServerNachricht::Matched(event) => {
                if let Some(mut alt) = self.aktuell.take() {
                    alt.beenden();
                    tracing::debug!(alter_partner = %alt.partner(), "Vorherige Paarung verworfen");
                }

                let mut verhandlung =
                    Verhandlung::neu(&self.eigene, event.partner.clone(), (self.fabrik)());
                let angebot = verhandlung.starten()?;
                self.aktuell = Some(verhandlung);

                Ok(angebot
                    .map(|payload| {
                        ClientNachricht::WebrtcOffer(RelayRequest {
                            payload,
                            recipient: event.partner,
                        })
                    })
                    .into_iter()
                    .collect())
            }

            ServerNachricht::WebrtcOffer(delivery) => {
                let Some(verhandlung) = self.vom_partner(&delivery.sender) else {
                    return Ok(Vec::new());
                };
                let antwort = verhandlung.angebot_empfangen(&delivery.payload)?;
                Ok(vec![ClientNachricht::WebrtcAnswer(RelayRequest {
                    payload: antwort,
                    recipient: delivery.sender,
                })])
            }

            ServerNachricht::WebrtcAnswer(delivery) => {
                if let Some(verhandlung) = self.vom_partner(&delivery.sender) {
                    verhandlung.antwort_empfangen(&delivery.payload)?;
                }
                Ok(Vec::new())
            }

            ServerNachricht::WebrtcIce(delivery) => {
                if let Some(verhandlung) = self.vom_partner(&delivery.sender) {
                    verhandlung.kandidat_empfangen(delivery.candidate)?;
                }
                Ok(Vec::new())
            }

            ServerNachricht::Disconnected => {
                self.aktuell = None;
                Ok(Vec::new())
            }

            ServerNachricht::Banned(notice) => {
                tracing::warn!(grund = %notice.reason, meldungen = notice.report_count, "Gebannt");
                self.aktuell = None;
                self.gebannt = true;
                Ok(Vec::new())
            }

            // Chat, Bestaetigungen und Fehler betreffen nur die Oberflaeche
            ServerNachricht::Message(_)
            | ServerNachricht::ReportConfirmed(_)
            | ServerNachricht::Error(_) => Ok(Vec::new()),
        }
    }

    /// Verhandlung, falls `absender` der aktuelle Partner ist
    fn vom_partner(&mut self, absender: &ClientId) -> Option<&mut Verhandlung<P>> {
        match self.aktuell.as_mut() {
            Some(v) if v.partner() == absender => Some(v),
            _ => {
                tracing::debug!(absender = %absender, "Nachricht ausserhalb der Paarung ignoriert");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
