//! Matchmaking – FIFO der wartenden Identitaeten
//!
//! Eine Identitaet steht hoechstens einmal in der Warteschlange und nie
//! gleichzeitig in der Warteschlange und in einem Paar. Veraltete Eintraege
//! (inzwischen gepaart oder getrennt) werden beim Durchlaufen verworfen.
//!
//! Neben der Reihenfolge (`VecDeque`) haelt die Warteschlange ein Set ihrer
//! Mitglieder, damit die Duplikat-Pruefung jeder Suche O(1) bleibt.

use std::collections::{HashSet, VecDeque};
use strangerlink_core::types::ClientId;

use crate::registry::Verbindungsregister;

/// Ergebnis einer Partnersuche
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuchErgebnis {
    /// Partner gefunden; das Paar muss noch im Register gesetzt werden
    Gepaart(ClientId),
    /// Kein freier Partner, Anfragender steht jetzt am Ende der Warteschlange
    Eingereiht,
    /// Nicht registriert, bereits gepaart oder bereits wartend
    Ignoriert,
}

#[derive(Debug, Default)]
pub struct Warteschlange {
    eintraege: VecDeque<ClientId>,
    mitglieder: HashSet<ClientId>,
}

impl Warteschlange {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Sucht einen Partner fuer `anfragender`
    ///
    /// Nimmt so lange den Kopf der Warteschlange, bis ein freier Partner
    /// gefunden oder die Warteschlange leer ist. Ohne Treffer wird der
    /// Anfragende hinten eingereiht.
    pub fn partner_finden(
        &mut self,
        anfragender: &ClientId,
        register: &Verbindungsregister,
    ) -> SuchErgebnis {
        if !register.ist_frei(anfragender) || self.enthaelt(anfragender) {
            return SuchErgebnis::Ignoriert;
        }

        while let Some(kopf) = self.eintraege.pop_front() {
            self.mitglieder.remove(&kopf);
            if register.ist_frei(&kopf) {
                return SuchErgebnis::Gepaart(kopf);
            }
            tracing::debug!(client_id = %kopf, "Veralteten Warteschlangen-Eintrag verworfen");
        }

        self.einreihen(anfragender.clone());
        SuchErgebnis::Eingereiht
    }

    fn einreihen(&mut self, client_id: ClientId) {
        if self.mitglieder.insert(client_id.clone()) {
            self.eintraege.push_back(client_id);
        }
    }

    /// Entfernt eine Identitaet (Trennung, Ban, Neu-Registrierung)
    pub fn entfernen(&mut self, client_id: &ClientId) -> bool {
        if !self.mitglieder.remove(client_id) {
            return false;
        }
        self.eintraege.retain(|id| id != client_id);
        true
    }

    pub fn enthaelt(&self, client_id: &ClientId) -> bool {
        self.mitglieder.contains(client_id)
    }

    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Wartende in Ankunftsreihenfolge
    pub fn wartende(&self) -> impl Iterator<Item = &ClientId> {
        self.eintraege.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use strangerlink_core::types::{Herkunft, VerbindungsId};

    fn registrieren(register: &mut Verbindungsregister, id: &str) -> ClientId {
        let client_id = ClientId::from(id);
        let herkunft = Herkunft::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        register.eintragen(client_id.clone(), VerbindungsId::new(), herkunft);
        client_id
    }

    #[test]
    fn erster_wartet_zweiter_wird_gepaart() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let x = registrieren(&mut register, "x");
        let y = registrieren(&mut register, "y");

        assert_eq!(schlange.partner_finden(&x, &register), SuchErgebnis::Eingereiht);
        assert_eq!(schlange.laenge(), 1);
        assert_eq!(schlange.partner_finden(&y, &register), SuchErgebnis::Gepaart(x));
        assert!(schlange.ist_leer());
    }

    #[test]
    fn doppelte_suche_wird_ignoriert() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let x = registrieren(&mut register, "x");

        schlange.partner_finden(&x, &register);
        assert_eq!(schlange.partner_finden(&x, &register), SuchErgebnis::Ignoriert);
        assert_eq!(schlange.laenge(), 1);
    }

    #[test]
    fn gepaarte_und_unbekannte_werden_ignoriert() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let a = registrieren(&mut register, "a");
        let b = registrieren(&mut register, "b");
        register.paaren(&a, &b);

        assert_eq!(schlange.partner_finden(&a, &register), SuchErgebnis::Ignoriert);
        assert_eq!(
            schlange.partner_finden(&ClientId::from("fremd"), &register),
            SuchErgebnis::Ignoriert
        );
        assert!(schlange.ist_leer());
    }

    #[test]
    fn veraltete_koepfe_werden_verworfen() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let a = registrieren(&mut register, "a");
        let b = registrieren(&mut register, "b");
        let c = registrieren(&mut register, "c");
        let d = registrieren(&mut register, "d");
        let e = registrieren(&mut register, "e");

        schlange.partner_finden(&a, &register);
        // Ohne Matchmaking eingereiht und danach anderweitig gepaart/getrennt
        schlange.einreihen(b.clone());
        schlange.einreihen(c.clone());
        register.entfernen(&a);
        register.paaren(&b, &d);

        // a (getrennt) und b (gepaart) sind veraltet, c ist frei
        assert_eq!(schlange.partner_finden(&e, &register), SuchErgebnis::Gepaart(c));
        assert!(schlange.ist_leer());
    }

    #[test]
    fn nur_veraltete_koepfe_fuehren_zum_einreihen() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let a = registrieren(&mut register, "a");
        let b = registrieren(&mut register, "b");

        schlange.partner_finden(&a, &register);
        register.entfernen(&a);

        assert_eq!(schlange.partner_finden(&b, &register), SuchErgebnis::Eingereiht);
        assert_eq!(schlange.wartende().collect::<Vec<_>>(), vec![&b]);
    }

    #[test]
    fn entfernen() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let a = registrieren(&mut register, "a");
        schlange.partner_finden(&a, &register);

        assert!(schlange.entfernen(&a));
        assert!(!schlange.entfernen(&a));
        assert!(!schlange.enthaelt(&a));
    }

    #[test]
    fn mitglieder_bleiben_mit_reihenfolge_synchron() {
        let mut register = Verbindungsregister::neu();
        let mut schlange = Warteschlange::neu();
        let ids: Vec<ClientId> = (0..5)
            .map(|i| registrieren(&mut register, &format!("c{}", i)))
            .collect();

        // c0 wartet, c1 paart sich mit c0, c2 wartet
        for id in &ids[..3] {
            schlange.partner_finden(id, &register);
        }
        assert!(!schlange.enthaelt(&ids[0]));
        assert!(!schlange.enthaelt(&ids[1]));
        assert!(schlange.enthaelt(&ids[2]));

        schlange.einreihen(ids[3].clone());
        schlange.einreihen(ids[3].clone());
        assert_eq!(schlange.laenge(), 2);

        assert!(schlange.entfernen(&ids[2]));
        assert!(!schlange.enthaelt(&ids[2]));
        assert_eq!(schlange.wartende().collect::<Vec<_>>(), vec![&ids[3]]);

        // Veralteter Kopf verlaesst auch das Set
        register.entfernen(&ids[3]);
        assert_eq!(schlange.partner_finden(&ids[4], &register), SuchErgebnis::Eingereiht);
        assert!(!schlange.enthaelt(&ids[3]));
        assert_eq!(schlange.laenge(), 1);
    }
}
