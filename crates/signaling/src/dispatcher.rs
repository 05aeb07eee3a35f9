//! Message-Dispatcher – Routet Client-Nachrichten an den SessionService
//!
//! Der Dispatcher uebersetzt jede `ClientNachricht` in genau einen Aufruf
//! des `SessionService`. Benachrichtigungen an Dritte laufen ueber den
//! Broadcaster; direkt beantwortet werden nur Bestaetigungen und
//! Policy-Ablehnungen.
//!
//! Erwartbare Races (doppelte Suche, veraltete Empfaenger) bleiben stumm.

use std::net::SocketAddr;
use std::sync::Arc;

use strangerlink_core::types::VerbindungsId;
use strangerlink_protocol::control::{ClientNachricht, ServerNachricht};

use crate::error::SignalingError;
use crate::relay::Weiterleitung;
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber den aktuellen Transport
#[derive(Debug, Clone, Copy)]
pub struct DispatcherContext {
    pub verbindung: VerbindungsId,
    pub peer_addr: SocketAddr,
}

/// Direkte Antwort an den anfragenden Transport
#[derive(Debug, Clone)]
pub struct Antwort {
    pub nachricht: ServerNachricht,
    /// Transport nach dem Senden schliessen
    pub schliessen: bool,
}

impl Antwort {
    pub fn nachricht(nachricht: ServerNachricht) -> Self {
        Self {
            nachricht,
            schliessen: false,
        }
    }

    /// Antwort aus einem Fehler; Bans schliessen den Transport
    pub fn fehler(fehler: &SignalingError) -> Self {
        Self {
            nachricht: fehler.als_antwort(),
            schliessen: fehler.beendet_verbindung(),
        }
    }
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende Nachricht
    ///
    /// Gibt `None` zurueck wenn keine direkte Antwort gesendet wird.
    pub fn dispatch(&self, nachricht: ClientNachricht, ctx: &DispatcherContext) -> Option<Antwort> {
        let sessions = &self.state.sessions;
        let verbindung = &ctx.verbindung;

        tracing::trace!(
            verbindung = %verbindung,
            peer = %ctx.peer_addr,
            event = nachricht.event_name(),
            "Nachricht empfangen"
        );

        match nachricht {
            ClientNachricht::Register(client_id) => sessions
                .registrieren(verbindung, client_id)
                .err()
                .map(|e| self.ablehnung(e, ctx)),

            ClientNachricht::FindStranger(client_id) => sessions
                .partner_suchen(verbindung, &client_id)
                .err()
                .map(|e| self.ablehnung(e, ctx)),

            ClientNachricht::WebrtcOffer(req) => {
                sessions.weiterleiten(verbindung, Weiterleitung::Angebot(req.payload), &req.recipient);
                None
            }

            ClientNachricht::WebrtcAnswer(req) => {
                sessions.weiterleiten(verbindung, Weiterleitung::Antwort(req.payload), &req.recipient);
                None
            }

            ClientNachricht::WebrtcIce(req) => {
                sessions.weiterleiten(verbindung, Weiterleitung::Kandidat(req.candidate), &req.recipient);
                None
            }

            ClientNachricht::SendMessage(req) => {
                sessions.weiterleiten(verbindung, Weiterleitung::Text(req.text), &req.recipient);
                None
            }

            ClientNachricht::DisconnectStranger(req) => {
                sessions.sitzung_verlassen(verbindung, &req.partner);
                None
            }

            ClientNachricht::ReportUser(req) => {
                match sessions.melden(verbindung, &req.reported, req.reason.as_deref()) {
                    Ok(bestaetigung) => Some(Antwort::nachricht(bestaetigung)),
                    Err(e) => Some(self.ablehnung(e, ctx)),
                }
            }
        }
    }

    fn ablehnung(&self, fehler: SignalingError, ctx: &DispatcherContext) -> Antwort {
        if fehler.beendet_verbindung() {
            tracing::warn!(verbindung = %ctx.verbindung, peer = %ctx.peer_addr, fehler = %fehler, "Anfrage abgelehnt (gebannt)");
        } else {
            tracing::debug!(verbindung = %ctx.verbindung, fehler = %fehler, "Anfrage abgelehnt");
        }
        Antwort::fehler(&fehler)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use strangerlink_core::types::{ClientId, Herkunft};
    use strangerlink_protocol::control::{ErrorCode, ReportRequest};

    fn aufbau() -> (MessageDispatcher, DispatcherContext) {
        let state = SignalingState::neu(SignalingConfig::default());
        let peer_addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let (verbindung, _rx) = state
            .sessions
            .verbindung_annehmen(Herkunft::from(peer_addr))
            .unwrap();
        (MessageDispatcher::neu(state), DispatcherContext { verbindung, peer_addr })
    }

    #[test]
    fn register_ohne_antwort() {
        let (dispatcher, ctx) = aufbau();
        assert!(dispatcher
            .dispatch(ClientNachricht::Register(ClientId::from("a")), &ctx)
            .is_none());
    }

    #[test]
    fn leere_identitaet_liefert_invalid_request() {
        let (dispatcher, ctx) = aufbau();
        let antwort = dispatcher
            .dispatch(ClientNachricht::Register(ClientId::from("")), &ctx)
            .expect("Ablehnung erwartet");
        assert!(!antwort.schliessen);
        assert!(matches!(
            antwort.nachricht,
            ServerNachricht::Error(ref e) if e.code == ErrorCode::InvalidRequest
        ));
    }

    #[test]
    fn meldung_ohne_registrierung() {
        let (dispatcher, ctx) = aufbau();
        let antwort = dispatcher
            .dispatch(
                ClientNachricht::ReportUser(ReportRequest {
                    reported: ClientId::from("b"),
                    reason: None,
                }),
                &ctx,
            )
            .expect("Ablehnung erwartet");
        assert!(matches!(
            antwort.nachricht,
            ServerNachricht::Error(ref e) if e.code == ErrorCode::NotRegistered
        ));
    }

    #[test]
    fn meldung_liefert_bestaetigung() {
        let (dispatcher, ctx) = aufbau();
        dispatcher.dispatch(ClientNachricht::Register(ClientId::from("a")), &ctx);
        let antwort = dispatcher
            .dispatch(
                ClientNachricht::ReportUser(ReportRequest {
                    reported: ClientId::from("b"),
                    reason: Some("spam".into()),
                }),
                &ctx,
            )
            .expect("Bestaetigung erwartet");
        assert!(matches!(
            antwort.nachricht,
            ServerNachricht::ReportConfirmed(ref r) if r.count == 1
        ));
    }
}
