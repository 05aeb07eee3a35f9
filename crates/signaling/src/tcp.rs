//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection` ueber `Framed<TcpStream, ServerCodec>`.

use std::net::SocketAddr;
use std::sync::Arc;
use strangerlink_protocol::wire::ServerCodec;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server fuer Clients mit Frame-Protokoll
pub struct SignalingServer {
    state: Arc<SignalingState>,
    bind_addr: SocketAddr,
}

impl SignalingServer {
    pub fn neu(state: Arc<SignalingState>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den Socket und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.accept_loop(listener, shutdown_rx).await
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    pub async fn accept_loop(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "TCP Signaling-Server gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "TCP-Verbindung akzeptiert");

                            let codec = ServerCodec::with_max_size(self.state.config.max_frame_groesse);
                            let framed = Framed::new(stream, codec);
                            let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr);
                            let shutdown_rx_clone = shutdown_rx.clone();

                            tokio::spawn(async move {
                                verbindung.verarbeiten(framed, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("TCP Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
