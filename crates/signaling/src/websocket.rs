//! WebSocket-Transport (axum)
//!
//! Browser-Clients senden pro Text-Frame genau eine JSON-Nachricht.
//! Binary-, Ping- und Pong-Frames werden ignoriert, ein Close-Frame beendet
//! den Transport. `WsTransport` passt den axum-WebSocket an die generische
//! Verbindungsschleife an.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use strangerlink_core::StrangerlinkError;
use strangerlink_protocol::control::{ClientNachricht, ServerNachricht};
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::error::SignalingError;
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct WsState {
    signaling: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Router mit dem WebSocket-Endpunkt unter `/` und `/ws`
///
/// Muss mit `into_make_service_with_connect_info::<SocketAddr>()` bedient
/// werden, damit die Herkunft bekannt ist.
pub fn ws_router(signaling: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(WsState {
            signaling,
            shutdown_rx,
        })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<WsState>,
) -> Response {
    tracing::debug!(peer = %peer_addr, "WebSocket-Upgrade");
    ws.on_upgrade(move |socket| async move {
        ClientConnection::neu(state.signaling, peer_addr)
            .verarbeiten(WsTransport::neu(socket), state.shutdown_rx)
            .await;
    })
}

// ---------------------------------------------------------------------------
// WsTransport
// ---------------------------------------------------------------------------

/// JSON-Nachrichten ueber einen axum-WebSocket
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn neu(socket: WebSocket) -> Self {
        Self { socket }
    }
}

fn transport_fehler(e: axum::Error) -> SignalingError {
    SignalingError::Transport(e.to_string())
}

impl Stream for WsTransport {
    type Item = Result<ClientNachricht, SignalingError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(self.socket.poll_next_unpin(cx)) {
                Some(Ok(Message::Text(text))) => {
                    let nachricht = ClientNachricht::from_json(&text).map_err(|e| {
                        SignalingError::from(StrangerlinkError::UngueltigeNachricht(e.to_string()))
                    });
                    return Poll::Ready(Some(nachricht));
                }
                Some(Ok(Message::Close(_))) | None => return Poll::Ready(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Poll::Ready(Some(Err(transport_fehler(e)))),
            }
        }
    }
}

impl Sink<ServerNachricht> for WsTransport {
    type Error = SignalingError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.socket.poll_ready_unpin(cx).map_err(transport_fehler)
    }

    fn start_send(mut self: Pin<&mut Self>, item: ServerNachricht) -> Result<(), Self::Error> {
        let json = item
            .to_json()
            .map_err(|e| SignalingError::intern(format!("JSON-Serialisierung fehlgeschlagen: {}", e)))?;
        self.socket
            .start_send_unpin(Message::Text(json))
            .map_err(transport_fehler)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.socket.poll_flush_unpin(cx).map_err(transport_fehler)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.socket.poll_close_unpin(cx).map_err(transport_fehler)
    }
}
