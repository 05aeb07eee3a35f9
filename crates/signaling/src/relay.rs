//! Relay – Weiterleitung zwischen den beiden Mitgliedern eines Paares
//!
//! Inhalte sind opak. Zugestellt wird nur, wenn der Empfaenger registriert
//! ist und sein eingetragener Partner der Absender ist.

use serde_json::Value;
use strangerlink_core::types::{ClientId, VerbindungsId};
use strangerlink_protocol::control::{ChatDelivery, IceDelivery, RelayDelivery, ServerNachricht};

use crate::registry::Verbindungsregister;

/// Weiterzuleitender Inhalt
#[derive(Debug, Clone)]
pub enum Weiterleitung {
    Angebot(Value),
    Antwort(Value),
    Kandidat(Value),
    Text(String),
}

impl Weiterleitung {
    /// Art der Nachricht (Label fuer Logs und Metriken)
    pub fn art(&self) -> &'static str {
        match self {
            Self::Angebot(_) => "offer",
            Self::Antwort(_) => "answer",
            Self::Kandidat(_) => "ice",
            Self::Text(_) => "message",
        }
    }

    /// Baut die Zustellung an den Empfaenger
    pub fn zustellung(self, sender: ClientId) -> ServerNachricht {
        match self {
            Self::Angebot(payload) => ServerNachricht::WebrtcOffer(RelayDelivery { payload, sender }),
            Self::Antwort(payload) => ServerNachricht::WebrtcAnswer(RelayDelivery { payload, sender }),
            Self::Kandidat(candidate) => ServerNachricht::WebrtcIce(IceDelivery { candidate, sender }),
            Self::Text(text) => ServerNachricht::Message(ChatDelivery { text, sender }),
        }
    }
}

/// Grund, aus dem eine Weiterleitung verworfen wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerwerfGrund {
    /// Absender-Transport hat keine Identitaet
    AbsenderUnbekannt,
    /// Empfaenger ist nicht registriert
    EmpfaengerUnbekannt,
    /// Empfaenger ist nicht mit dem Absender gepaart
    NichtGepaart,
}

/// Bestimmt Absender-Identitaet und Ziel-Transport einer Weiterleitung
pub fn route(
    register: &Verbindungsregister,
    absender: &VerbindungsId,
    empfaenger: &ClientId,
) -> Result<(ClientId, VerbindungsId), VerwerfGrund> {
    let absender_id = register
        .identitaet_zu_verbindung(absender)
        .ok_or(VerwerfGrund::AbsenderUnbekannt)?;
    let eintrag = register
        .eintrag(empfaenger)
        .ok_or(VerwerfGrund::EmpfaengerUnbekannt)?;

    if eintrag.partner.as_ref() != Some(absender_id) {
        return Err(VerwerfGrund::NichtGepaart);
    }
    Ok((absender_id.clone(), eintrag.verbindung))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};
    use strangerlink_core::types::Herkunft;

    fn registrieren(register: &mut Verbindungsregister, id: &str) -> (ClientId, VerbindungsId) {
        let client_id = ClientId::from(id);
        let verbindung = VerbindungsId::new();
        let herkunft = Herkunft::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        register.eintragen(client_id.clone(), verbindung, herkunft);
        (client_id, verbindung)
    }

    #[test]
    fn zustellung_nur_an_partner() {
        let mut register = Verbindungsregister::neu();
        let (a, va) = registrieren(&mut register, "a");
        let (b, vb) = registrieren(&mut register, "b");
        let (_c, vc) = registrieren(&mut register, "c");
        register.paaren(&a, &b);

        assert_eq!(route(&register, &va, &b), Ok((a.clone(), vb)));
        assert_eq!(route(&register, &vb, &a), Ok((b, va)));
        // c ist nicht mit a gepaart
        assert_eq!(route(&register, &vc, &a), Err(VerwerfGrund::NichtGepaart));
    }

    #[test]
    fn unbekannte_seiten_werden_verworfen() {
        let mut register = Verbindungsregister::neu();
        let (a, va) = registrieren(&mut register, "a");

        assert_eq!(
            route(&register, &VerbindungsId::new(), &a),
            Err(VerwerfGrund::AbsenderUnbekannt)
        );
        assert_eq!(
            route(&register, &va, &ClientId::from("weg")),
            Err(VerwerfGrund::EmpfaengerUnbekannt)
        );
    }

    #[test]
    fn nach_trennung_keine_zustellung() {
        let mut register = Verbindungsregister::neu();
        let (a, va) = registrieren(&mut register, "a");
        let (b, _) = registrieren(&mut register, "b");
        register.paaren(&a, &b);
        register.paarung_loesen(&a);

        assert_eq!(route(&register, &va, &b), Err(VerwerfGrund::NichtGepaart));
    }

    #[test]
    fn zustellung_traegt_absender() {
        let sender = ClientId::from("a");
        let nachricht = Weiterleitung::Kandidat(json!({"candidate": "c1"})).zustellung(sender);
        match nachricht {
            ServerNachricht::WebrtcIce(d) => {
                assert_eq!(d.sender.as_str(), "a");
                assert_eq!(d.candidate["candidate"], "c1");
            }
            andere => panic!("Unerwartet: {}", andere.event_name()),
        }
        assert_eq!(Weiterleitung::Text("hi".into()).art(), "message");
    }
}
