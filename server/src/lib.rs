//! strangerlink-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod metriken;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use config::ServerConfig;
use strangerlink_observability::{
    cors_layer, observability_router, request_trace_layer, HealthState, StrangerlinkMetrics,
};
use strangerlink_signaling::{ws_router, SignalingServer, SignalingState};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet alle Listener und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let http_addr = self.config.http_bind_adresse()?;
        let listener = TcpListener::bind(http_addr).await?;

        let tcp_listener = match self.config.tcp_bind_adresse()? {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen, Server wird beendet"),
            }
            let _ = shutdown_tx.send(true);
        });

        self.ausfuehren(listener, tcp_listener, shutdown_rx).await
    }

    /// Betreibt den Server auf bereits gebundenen Listenern
    ///
    /// Reihenfolge:
    /// 1. Signaling-Zustand und Metriken anlegen
    /// 2. Ereignis-Task fuer Metriken starten
    /// 3. Optional den TCP-Listener (Frame-Protokoll) starten
    /// 4. HTTP/WebSocket bedienen bis `shutdown_rx` `true` meldet
    /// 5. `/health` auf Draining setzen und `auslauf_ms` lang weiter bedienen
    pub async fn ausfuehren(
        self,
        listener: TcpListener,
        tcp_listener: Option<TcpListener>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let state = SignalingState::neu(self.config.signaling_config());
        let metriken = StrangerlinkMetrics::neu()?;
        let health = HealthState::neu(metriken.clone());

        let metrik_task = tokio::spawn(metriken::verbuchen(Arc::clone(&state), metriken.clone()));

        let tcp_task = match tcp_listener {
            Some(tcp_listener) => {
                let addr = tcp_listener.local_addr()?;
                let server = SignalingServer::neu(Arc::clone(&state), addr);
                let rx = shutdown_rx.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = server.accept_loop(tcp_listener, rx).await {
                        tracing::error!(fehler = %e, "TCP Signaling-Server beendet mit Fehler");
                    }
                }))
            }
            None => None,
        };

        let mut app: Router = ws_router(Arc::clone(&state), shutdown_rx.clone());
        if self.config.observability.aktiviert {
            app = app.merge(observability_router(metriken, health.clone()));
        }
        let app = app.layer(cors_layer()).layer(request_trace_layer());

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %listener.local_addr()?,
            tcp = ?self.config.netzwerk.tcp_port,
            observability = self.config.observability.aktiviert,
            "Server laeuft"
        );

        let auslauf = Duration::from_millis(self.config.observability.auslauf_ms);
        let mut signal_rx = shutdown_rx;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_abwarten(&mut signal_rx).await;
            health.shutdown_melden();
            if !auslauf.is_zero() {
                tracing::info!(auslauf_ms = auslauf.as_millis() as u64, "Health meldet Draining, HTTP-Listener bleibt offen");
                tokio::time::sleep(auslauf).await;
            }
        })
        .await?;

        if let Some(task) = tcp_task {
            let _ = task.await;
        }
        metrik_task.abort();

        tracing::info!("Server gestoppt");
        Ok(())
    }
}

/// Wartet bis das Shutdown-Signal `true` ist oder der Sender wegfaellt
async fn shutdown_abwarten(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
