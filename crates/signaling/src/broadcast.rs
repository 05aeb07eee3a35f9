//! Event-Broadcaster – Ausgehende Queues aller Transporte
//!
//! Jeder angenommene Transport bekommt eine eigene Send-Queue. Der
//! `SessionService` reiht Benachrichtigungen nicht-blockierend ein, die
//! Verbindungsschleife schreibt sie in Reihenfolge auf den Transport.
//!
//! Zwei Klassen von Eintraegen teilen sich die Queue:
//! - Steuerung (`matched`, `disconnected`, `banned`, `Schliessen`) wird
//!   immer eingereiht.
//! - Relay-Verkehr zwischen Partnern ist auf `RELAY_BUDGET` ausstehende
//!   Eintraege begrenzt; darueber hinaus wird verworfen.

use dashmap::DashMap;
use strangerlink_core::types::VerbindungsId;
use strangerlink_protocol::control::ServerNachricht;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Maximal ausstehende Relay-Nachrichten pro Transport
pub const RELAY_BUDGET: usize = 64;

/// Eintrag, den die Verbindungsschleife verarbeitet
#[derive(Debug, Clone)]
pub enum Ausgehend {
    /// Nachricht an den Client schreiben
    Nachricht(ServerNachricht),
    /// Transport nach den bereits eingereihten Nachrichten schliessen
    Schliessen,
}

/// Interner Queue-Eintrag
#[derive(Debug)]
enum Eintrag {
    Steuerung(Ausgehend),
    Relay(ServerNachricht),
}

// ---------------------------------------------------------------------------
// SendeQueue (Empfangsseite)
// ---------------------------------------------------------------------------

/// Empfangsseite der Send-Queue eines Transports
#[derive(Debug)]
pub struct SendeQueue {
    rx: mpsc::UnboundedReceiver<Eintrag>,
    relay_ausstehend: Arc<AtomicUsize>,
}

impl SendeQueue {
    /// Naechster Eintrag, `None` wenn der Transport abgemeldet wurde
    pub async fn recv(&mut self) -> Option<Ausgehend> {
        let eintrag = self.rx.recv().await?;
        Some(self.auspacken(eintrag))
    }

    pub fn try_recv(&mut self) -> Result<Ausgehend, mpsc::error::TryRecvError> {
        let eintrag = self.rx.try_recv()?;
        Ok(self.auspacken(eintrag))
    }

    fn auspacken(&self, eintrag: Eintrag) -> Ausgehend {
        match eintrag {
            Eintrag::Steuerung(ausgehend) => ausgehend,
            Eintrag::Relay(nachricht) => {
                self.relay_ausstehend.fetch_sub(1, Ordering::AcqRel);
                Ausgehend::Nachricht(nachricht)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines Transports
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindung: VerbindungsId,
    tx: mpsc::UnboundedSender<Eintrag>,
    relay_ausstehend: Arc<AtomicUsize>,
}

impl ClientSender {
    /// Reiht einen Steuer-Eintrag ein
    ///
    /// Gibt `false` nur zurueck wenn der Transport bereits beendet ist.
    pub fn senden(&self, ausgehend: Ausgehend) -> bool {
        if self.tx.send(Eintrag::Steuerung(ausgehend)).is_err() {
            tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Transport beendet)");
            return false;
        }
        true
    }

    /// Reiht Relay-Verkehr ein, solange das Budget reicht
    pub fn relay_senden(&self, nachricht: ServerNachricht) -> bool {
        let reserviert = self
            .relay_ausstehend
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < RELAY_BUDGET).then_some(n + 1)
            })
            .is_ok();
        if !reserviert {
            tracing::warn!(verbindung = %self.verbindung, "Relay-Budget erschoepft – Nachricht verworfen");
            return false;
        }

        if self.tx.send(Eintrag::Relay(nachricht)).is_err() {
            self.relay_ausstehend.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Transport beendet)");
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentrale Verwaltung der Send-Queues
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    clients: DashMap<VerbindungsId, ClientSender>,
}

impl EventBroadcaster {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Transport und gibt seine Empfangs-Queue zurueck
    pub fn verbindung_registrieren(&self, verbindung: VerbindungsId) -> SendeQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay_ausstehend = Arc::new(AtomicUsize::new(0));
        let sender = ClientSender {
            verbindung,
            tx,
            relay_ausstehend: Arc::clone(&relay_ausstehend),
        };
        self.inner.clients.insert(verbindung, sender);
        tracing::debug!(verbindung = %verbindung, "Transport im Broadcaster registriert");
        SendeQueue { rx, relay_ausstehend }
    }

    pub fn verbindung_entfernen(&self, verbindung: &VerbindungsId) {
        if self.inner.clients.remove(verbindung).is_some() {
            tracing::debug!(verbindung = %verbindung, "Transport aus Broadcaster entfernt");
        }
    }

    /// Sendet eine Steuer-Nachricht an einen einzelnen Transport
    ///
    /// Gibt `true` zurueck wenn der Transport bekannt ist und die Nachricht
    /// eingereiht wurde.
    pub fn an_verbindung_senden(&self, verbindung: &VerbindungsId, nachricht: ServerNachricht) -> bool {
        match self.inner.clients.get(verbindung) {
            Some(sender) => sender.senden(Ausgehend::Nachricht(nachricht)),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannten Transport");
                false
            }
        }
    }

    /// Stellt weitergeleiteten Verkehr zu; verwirft bei erschoepftem Budget
    pub fn relay_an_verbindung(&self, verbindung: &VerbindungsId, nachricht: ServerNachricht) -> bool {
        match self.inner.clients.get(verbindung) {
            Some(sender) => sender.relay_senden(nachricht),
            None => {
                tracing::debug!(verbindung = %verbindung, "Relay an unbekannten Transport");
                false
            }
        }
    }

    /// Fordert das Schliessen eines Transports an
    pub fn verbindung_schliessen(&self, verbindung: &VerbindungsId) -> bool {
        self.inner
            .clients
            .get(verbindung)
            .map(|sender| sender.senden(Ausgehend::Schliessen))
            .unwrap_or(false)
    }

    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn ist_registriert(&self, verbindung: &VerbindungsId) -> bool {
        self.inner.clients.contains_key(verbindung)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
