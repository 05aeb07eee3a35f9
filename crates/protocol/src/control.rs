//! Control-Protokoll (TCP/WebSocket)
//!
//! Definiert alle benannten Nachrichten, die ueber den Echtzeit-Kanal zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Eine Tagged Union pro Richtung (`ClientNachricht`, `ServerNachricht`)
//! - JSON-Darstellung `{"event": "<name>", "payload": {...}}`
//! - Verhandlungs-Payloads (Offer, Answer, Kandidaten) sind fuer den Server
//!   opak und werden als `serde_json::Value` transportiert

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strangerlink_core::types::ClientId;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer negative Bestaetigungen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    NotRegistered,
    SelfReport,
}

/// Negative Bestaetigung (Policy-Ablehnung)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Weiterzuleitende Verhandlungsnachricht (Offer oder Answer)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// Opake Sitzungsbeschreibung des Absenders
    pub payload: Value,
    pub recipient: ClientId,
}

/// Weiterzuleitender Netzwerkpfad-Kandidat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceRequest {
    pub candidate: Value,
    pub recipient: ClientId,
}

/// Weiterzuleitender Chat-Text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub text: String,
    pub recipient: ClientId,
}

/// Sitzung freiwillig verlassen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    /// Partner, mit dem die Sitzung beendet werden soll
    pub partner: ClientId,
}

/// Missbrauchsmeldung gegen einen anderen Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub reported: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Alle Nachrichten vom Client an den Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ClientNachricht {
    Register(ClientId),
    FindStranger(ClientId),
    WebrtcOffer(RelayRequest),
    WebrtcAnswer(RelayRequest),
    WebrtcIce(IceRequest),
    SendMessage(ChatRequest),
    DisconnectStranger(LeaveRequest),
    ReportUser(ReportRequest),
}

impl ClientNachricht {
    /// Event-Name auf dem Draht (fuer Logging)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::FindStranger(_) => "find-stranger",
            Self::WebrtcOffer(_) => "webrtc-offer",
            Self::WebrtcAnswer(_) => "webrtc-answer",
            Self::WebrtcIce(_) => "webrtc-ice",
            Self::SendMessage(_) => "send-message",
            Self::DisconnectStranger(_) => "disconnect-stranger",
            Self::ReportUser(_) => "report-user",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Paar wurde gebildet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedEvent {
    pub partner: ClientId,
}

/// Zugestellte Verhandlungsnachricht
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayDelivery {
    pub payload: Value,
    pub sender: ClientId,
}

/// Zugestellter Netzwerkpfad-Kandidat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceDelivery {
    pub candidate: Value,
    pub sender: ClientId,
}

/// Zugestellter Chat-Text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDelivery {
    pub text: String,
    pub sender: ClientId,
}

/// Bestaetigung einer Meldung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfirmed {
    pub message: String,
    /// Kumulierte Meldungen gegen den gemeldeten Client
    pub count: u32,
    /// Ban-Schwelle (nur solange die Schwelle nicht erreicht ist)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
}

/// Client oder Herkunft ist dauerhaft gebannt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedNotice {
    pub reason: String,
    pub report_count: u32,
}

/// Alle Nachrichten vom Server an den Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerNachricht {
    Matched(MatchedEvent),
    WebrtcOffer(RelayDelivery),
    WebrtcAnswer(RelayDelivery),
    WebrtcIce(IceDelivery),
    Message(ChatDelivery),
    Disconnected,
    ReportConfirmed(ReportConfirmed),
    Banned(BannedNotice),
    Error(ErrorResponse),
}

impl ServerNachricht {
    /// Erstellt eine `matched`-Benachrichtigung
    pub fn matched(partner: ClientId) -> Self {
        Self::Matched(MatchedEvent { partner })
    }

    /// Erstellt eine `banned`-Benachrichtigung
    pub fn banned(reason: impl Into<String>, report_count: u32) -> Self {
        Self::Banned(BannedNotice {
            reason: reason.into(),
            report_count,
        })
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            code,
            message: message.into(),
        })
    }

    /// Event-Name auf dem Draht (fuer Logging)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::WebrtcOffer(_) => "webrtc-offer",
            Self::WebrtcAnswer(_) => "webrtc-answer",
            Self::WebrtcIce(_) => "webrtc-ice",
            Self::Message(_) => "message",
            Self::Disconnected => "disconnected",
            Self::ReportConfirmed(_) => "report-confirmed",
            Self::Banned(_) => "banned",
            Self::Error(_) => "error",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
