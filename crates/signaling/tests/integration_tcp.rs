//! Integrationstests ueber echte TCP-Verbindungen
//!
//! Jeder Test startet einen eigenen Accept-Loop auf einem freien Port und
//! spricht mit ihm ueber `Framed<TcpStream, ClientCodec>` oder ueber die
//! einzelnen Frame-Hilfen `read_frame`/`write_frame`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use strangerlink_core::types::ClientId;
use strangerlink_moderation::ModerationConfig;
use strangerlink_protocol::control::{
    ChatRequest, ClientNachricht, ErrorCode, IceRequest, LeaveRequest, RelayRequest,
    ReportRequest, ServerNachricht,
};
use strangerlink_protocol::wire::{read_frame, write_frame, ClientCodec, DEFAULT_MAX_FRAME_SIZE};
use strangerlink_signaling::{SignalingConfig, SignalingServer, SignalingState};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;

type Client = Framed<TcpStream, ClientCodec>;

const ZEITLIMIT: Duration = Duration::from_secs(5);

struct TestServer {
    state: Arc<SignalingState>,
    addr: std::net::SocketAddr,
    _shutdown_tx: watch::Sender<bool>,
}

async fn server_starten(ban_schwelle: u32) -> TestServer {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = SignalingConfig {
        moderation: ModerationConfig {
            ban_schwelle,
            // Alle Test-Clients teilen sich 127.0.0.1
            herkunft_sperren: false,
        },
        ..Default::default()
    };
    let state = SignalingState::neu(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = SignalingServer::neu(Arc::clone(&state), addr);
    tokio::spawn(async move {
        let _ = server.accept_loop(listener, shutdown_rx).await;
    });

    TestServer {
        state,
        addr,
        _shutdown_tx: shutdown_tx,
    }
}

async fn verbinden(server: &TestServer) -> Client {
    let stream = TcpStream::connect(server.addr).await.unwrap();
    Framed::new(stream, ClientCodec::new())
}

async fn empfangen(client: &mut Client) -> ServerNachricht {
    tokio::time::timeout(ZEITLIMIT, client.next())
        .await
        .expect("Zeitlimit beim Empfangen")
        .expect("Verbindung unerwartet beendet")
        .expect("Frame ungueltig")
}

/// Wartet bis die Bedingung auf dem Server-Zustand erfuellt ist
async fn warten_bis(state: &SignalingState, bedingung: impl Fn(&SignalingState) -> bool) {
    tokio::time::timeout(ZEITLIMIT, async {
        while !bedingung(state) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Zeitlimit beim Warten auf Server-Zustand");
}

async fn registrieren(client: &mut Client, name: &str) {
    client
        .send(ClientNachricht::Register(ClientId::from(name)))
        .await
        .unwrap();
}

/// Registriert zwei Clients und paart sie
async fn paar_bilden(server: &TestServer) -> (Client, Client) {
    let mut a = verbinden(server).await;
    let mut b = verbinden(server).await;
    registrieren(&mut a, "a").await;
    registrieren(&mut b, "b").await;

    a.send(ClientNachricht::FindStranger(ClientId::from("a")))
        .await
        .unwrap();
    warten_bis(&server.state, |s| s.sessions.warteschlangen_laenge() == 1).await;

    b.send(ClientNachricht::FindStranger(ClientId::from("b")))
        .await
        .unwrap();

    match empfangen(&mut a).await {
        ServerNachricht::Matched(m) => assert_eq!(m.partner, ClientId::from("b")),
        andere => panic!("matched erwartet, erhalten: {:?}", andere),
    }
    match empfangen(&mut b).await {
        ServerNachricht::Matched(m) => assert_eq!(m.partner, ClientId::from("a")),
        andere => panic!("matched erwartet, erhalten: {:?}", andere),
    }
    (a, b)
}

#[tokio::test]
async fn zwei_clients_werden_gepaart() {
    let server = server_starten(5).await;
    let (_a, _b) = paar_bilden(&server).await;

    assert_eq!(server.state.sessions.paar_anzahl(), 1);
    assert_eq!(server.state.sessions.warteschlangen_laenge(), 0);
}

#[tokio::test]
async fn verhandlung_und_chat_werden_weitergeleitet() {
    let server = server_starten(5).await;
    let (mut a, mut b) = paar_bilden(&server).await;

    a.send(ClientNachricht::WebrtcOffer(RelayRequest {
        payload: json!({"type": "offer", "sdp": "v=0"}),
        recipient: ClientId::from("b"),
    }))
    .await
    .unwrap();
    match empfangen(&mut b).await {
        ServerNachricht::WebrtcOffer(d) => {
            assert_eq!(d.sender, ClientId::from("a"));
            assert_eq!(d.payload["sdp"], "v=0");
        }
        andere => panic!("webrtc-offer erwartet, erhalten: {:?}", andere),
    }

    b.send(ClientNachricht::WebrtcAnswer(RelayRequest {
        payload: json!({"type": "answer", "sdp": "v=0"}),
        recipient: ClientId::from("a"),
    }))
    .await
    .unwrap();
    assert!(matches!(
        empfangen(&mut a).await,
        ServerNachricht::WebrtcAnswer(ref d) if d.sender == ClientId::from("b")
    ));

    b.send(ClientNachricht::WebrtcIce(IceRequest {
        candidate: json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host"}),
        recipient: ClientId::from("a"),
    }))
    .await
    .unwrap();
    assert!(matches!(empfangen(&mut a).await, ServerNachricht::WebrtcIce(_)));

    a.send(ClientNachricht::SendMessage(ChatRequest {
        text: "hallo".into(),
        recipient: ClientId::from("b"),
    }))
    .await
    .unwrap();
    match empfangen(&mut b).await {
        ServerNachricht::Message(m) => {
            assert_eq!(m.text, "hallo");
            assert_eq!(m.sender, ClientId::from("a"));
        }
        andere => panic!("message erwartet, erhalten: {:?}", andere),
    }
}

#[tokio::test]
async fn verlassen_benachrichtigt_partner() {
    let server = server_starten(5).await;
    let (mut a, mut b) = paar_bilden(&server).await;

    a.send(ClientNachricht::DisconnectStranger(LeaveRequest {
        partner: ClientId::from("b"),
    }))
    .await
    .unwrap();

    assert!(matches!(empfangen(&mut b).await, ServerNachricht::Disconnected));
    warten_bis(&server.state, |s| s.sessions.paar_anzahl() == 0).await;
}

#[tokio::test]
async fn verbindungsabbruch_benachrichtigt_partner() {
    let server = server_starten(5).await;
    let (a, mut b) = paar_bilden(&server).await;

    drop(a);

    assert!(matches!(empfangen(&mut b).await, ServerNachricht::Disconnected));
    warten_bis(&server.state, |s| s.sessions.client_anzahl() == 1).await;
}

#[tokio::test]
async fn suche_ohne_registrierung_wird_abgelehnt() {
    let server = server_starten(5).await;
    let mut a = verbinden(&server).await;

    a.send(ClientNachricht::FindStranger(ClientId::from("a")))
        .await
        .unwrap();

    match empfangen(&mut a).await {
        ServerNachricht::Error(e) => assert_eq!(e.code, ErrorCode::NotRegistered),
        andere => panic!("error erwartet, erhalten: {:?}", andere),
    }
}

#[tokio::test]
async fn meldungen_fuehren_zum_ban() {
    let server = server_starten(2).await;
    let (mut a, mut b) = paar_bilden(&server).await;

    let melden = ClientNachricht::ReportUser(ReportRequest {
        reported: ClientId::from("b"),
        reason: Some("spam".into()),
    });

    a.send(melden.clone()).await.unwrap();
    match empfangen(&mut a).await {
        ServerNachricht::ReportConfirmed(r) => {
            assert_eq!(r.count, 1);
            assert_eq!(r.threshold, Some(2));
        }
        andere => panic!("report-confirmed erwartet, erhalten: {:?}", andere),
    }

    a.send(melden).await.unwrap();

    // Der Gemeldete erhaelt den Ban und wird getrennt
    match empfangen(&mut b).await {
        ServerNachricht::Banned(n) => assert_eq!(n.report_count, 2),
        andere => panic!("banned erwartet, erhalten: {:?}", andere),
    }
    let ende = tokio::time::timeout(ZEITLIMIT, b.next())
        .await
        .expect("Zeitlimit beim Warten auf Verbindungsende");
    assert!(ende.is_none());

    // Der Melder bekommt Trennung und Bestaetigung, Reihenfolge egal
    let mut erhalten = vec![empfangen(&mut a).await, empfangen(&mut a).await];
    erhalten.sort_by_key(|n| n.event_name());
    assert!(matches!(erhalten[0], ServerNachricht::Disconnected));
    assert!(matches!(
        erhalten[1],
        ServerNachricht::ReportConfirmed(ref r) if r.threshold.is_none()
    ));

    assert!(server.state.sessions.ban_laden(&ClientId::from("b")).is_some());

    // Die gebannte Identitaet kommt nicht zurueck
    let mut c = verbinden(&server).await;
    registrieren(&mut c, "b").await;
    assert!(matches!(empfangen(&mut c).await, ServerNachricht::Banned(_)));
}

async fn roh_senden(stream: &mut TcpStream, nachricht: ClientNachricht) {
    write_frame(stream, &nachricht, DEFAULT_MAX_FRAME_SIZE)
        .await
        .unwrap();
}

async fn roh_empfangen(stream: &mut TcpStream) -> ServerNachricht {
    tokio::time::timeout(ZEITLIMIT, read_frame(stream, DEFAULT_MAX_FRAME_SIZE))
        .await
        .expect("Zeitlimit beim Empfangen")
        .expect("Frame ungueltig")
}

#[tokio::test]
async fn einzelne_frames_ohne_framed() {
    let server = server_starten(5).await;
    let mut r = TcpStream::connect(server.addr).await.unwrap();
    let mut s = TcpStream::connect(server.addr).await.unwrap();

    roh_senden(&mut r, ClientNachricht::Register(ClientId::from("r"))).await;
    roh_senden(&mut s, ClientNachricht::Register(ClientId::from("s"))).await;
    warten_bis(&server.state, |st| st.sessions.client_anzahl() == 2).await;

    roh_senden(&mut r, ClientNachricht::FindStranger(ClientId::from("r"))).await;
    warten_bis(&server.state, |st| st.sessions.warteschlangen_laenge() == 1).await;
    roh_senden(&mut s, ClientNachricht::FindStranger(ClientId::from("s"))).await;

    match roh_empfangen(&mut r).await {
        ServerNachricht::Matched(m) => assert_eq!(m.partner, ClientId::from("s")),
        andere => panic!("Unerwartet: {}", andere.event_name()),
    }
    match roh_empfangen(&mut s).await {
        ServerNachricht::Matched(m) => assert_eq!(m.partner, ClientId::from("r")),
        andere => panic!("Unerwartet: {}", andere.event_name()),
    }
}
