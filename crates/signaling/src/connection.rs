//! Client-Connection – Verarbeitet einen einzelnen Transport
//!
//! Jeder Transport (TCP-Frames oder WebSocket) bekommt eine
//! `ClientConnection` in einem eigenen tokio-Task. Die Schleife ist generisch
//! ueber den Transport: alles, was `ClientNachricht`en liefert und
//! `ServerNachricht`en annimmt, kann bedient werden.
//!
//! ## Ablauf
//! ```text
//! annehmen (Herkunfts-Ban?) -> Schleife { eingehend | Send-Queue | Shutdown } -> aufraeumen
//! ```
//!
//! Kein Keepalive: ein Client belegt seinen Zustand, bis der Transport endet.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use strangerlink_core::types::Herkunft;
use strangerlink_protocol::control::{ClientNachricht, ErrorCode, ServerNachricht};
use tokio::sync::watch;

use crate::broadcast::Ausgehend;
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// Verarbeitet einen einzelnen Transport
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Transport geschlossen werden soll
    /// oder ein Shutdown-Signal eingeht. Danach wird die Identitaet des
    /// Transports freigegeben.
    pub async fn verarbeiten<T, E>(self, mut transport: T, mut shutdown_rx: watch::Receiver<bool>)
    where
        T: Stream<Item = Result<ClientNachricht, E>> + Sink<ServerNachricht, Error = E> + Unpin,
        E: Into<SignalingError>,
    {
        let peer_addr = self.peer_addr;
        let herkunft = Herkunft::from(peer_addr);

        let (verbindung, mut sende_rx) = match self.state.sessions.verbindung_annehmen(herkunft) {
            Ok(angenommen) => angenommen,
            Err(e) => {
                tracing::info!(peer = %peer_addr, fehler = %e, "Verbindung abgelehnt");
                let _ = transport.send(e.als_antwort()).await;
                let _ = transport.close().await;
                return;
            }
        };

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        let ctx = DispatcherContext {
            verbindung,
            peer_addr,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = transport.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            let Some(antwort) = dispatcher.dispatch(nachricht, &ctx) else {
                                continue;
                            };
                            if let Err(e) = transport.send(antwort.nachricht).await {
                                let e: SignalingError = e.into();
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                break;
                            }
                            if antwort.schliessen {
                                tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindung nach Ablehnung geschlossen");
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            let fehler: SignalingError = e.into();
                            if fehler.ist_verbindungsfehler() {
                                tracing::warn!(peer = %peer_addr, fehler = %fehler, "Lesefehler");
                                break;
                            }
                            tracing::debug!(peer = %peer_addr, fehler = %fehler, "Ungueltige Nachricht");
                            if transport.send(fehler.als_antwort()).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Benachrichtigung aus dem Broadcaster
                ausgehend = sende_rx.recv() => {
                    match ausgehend {
                        Some(Ausgehend::Nachricht(nachricht)) => {
                            if let Err(e) = transport.send(nachricht).await {
                                let e: SignalingError = e.into();
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Benachrichtigung fehlgeschlagen");
                                break;
                            }
                        }
                        Some(Ausgehend::Schliessen) | None => {
                            tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Transport wird serverseitig geschlossen");
                            break;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerNachricht::error(
                            ErrorCode::InternalError,
                            "Server is shutting down.",
                        );
                        let _ = transport.send(abschied).await;
                        break;
                    }
                }
            }
        }

        self.state.sessions.verbindung_getrennt(&verbindung);
        let _ = transport.close().await;

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}
