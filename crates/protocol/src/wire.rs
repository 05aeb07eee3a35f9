//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 1 MB).
//!
//! Server und Client sprechen unterschiedliche Nachrichtentypen je Richtung,
//! daher ist der Codec generisch ueber den ausgehenden (`E`) und den
//! eingehenden (`D`) Typ.

use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::control::{ClientNachricht, ServerNachricht};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<E>` und `Decoder<Item = D>` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`.
///
/// # Beispiel
///
/// ```rust,no_run
/// use tokio_util::codec::Framed;
/// use strangerlink_protocol::wire::ServerCodec;
///
/// // let stream = listener.accept().await?.0;
/// // let framed = Framed::new(stream, ServerCodec::new());
/// ```
#[derive(Debug)]
pub struct FrameCodec<E, D> {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
    _typen: PhantomData<fn(E) -> D>,
}

/// Codec der Serverseite: sendet `ServerNachricht`, empfaengt `ClientNachricht`
pub type ServerCodec = FrameCodec<ServerNachricht, ClientNachricht>;

/// Codec der Clientseite: sendet `ClientNachricht`, empfaengt `ServerNachricht`
pub type ClientCodec = FrameCodec<ClientNachricht, ServerNachricht>;

impl<E, D> FrameCodec<E, D> {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _typen: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<E, D> Default for FrameCodec<E, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, D> Clone for FrameCodec<E, D> {
    fn clone(&self) -> Self {
        Self::with_max_size(self.max_frame_size)
    }
}

fn zu_gross(length: usize, max: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Frame zu gross: {} Bytes (Maximum: {} Bytes)", length, max),
    )
}

fn serialisieren<T: Serialize>(item: &T, max: usize) -> io::Result<Vec<u8>> {
    let json = serde_json::to_vec(item).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {}", e),
        )
    })?;
    if json.len() > max {
        return Err(zu_gross(json.len(), max));
    }
    Ok(json)
}

fn deserialisieren<T: DeserializeOwned>(payload: &[u8]) -> io::Result<T> {
    serde_json::from_slice(payload).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
        )
    })
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<E, D: DeserializeOwned> Decoder for FrameCodec<E, D> {
    type Item = D;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(zu_gross(length, self.max_frame_size));
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        deserialisieren(&payload).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<E: Serialize, D> Encoder<E> for FrameCodec<E, D> {
    type Error = io::Error;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serialisieren(&item, self.max_frame_size)?;

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Abschluss des Frames getrennt wird
/// - `InvalidData` bei ungueltigem JSON oder zu grossem Frame
pub async fn read_frame<T, R>(reader: &mut R, max_frame_size: usize) -> io::Result<T>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_be_bytes(len_buf) as usize;

    if length > max_frame_size {
        return Err(zu_gross(length, max_frame_size));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    deserialisieren(&payload)
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
///
/// # Fehler
/// - `InvalidData` wenn die Nachricht nicht serialisiert werden kann oder zu gross ist
/// - IO-Fehler beim Schreiben
pub async fn write_frame<T, W>(writer: &mut W, message: &T, max_frame_size: usize) -> io::Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let json = serialisieren(message, max_frame_size)?;

    let len_bytes = (json.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&json).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use strangerlink_core::ClientId;
    use tokio_util::codec::{Decoder, Encoder};

    fn find_stranger(id: &str) -> ClientNachricht {
        ClientNachricht::FindStranger(ClientId::from(id))
    }

    #[test]
    fn client_frame_wird_vom_server_codec_gelesen() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(find_stranger("a1"), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = server
            .decode(&mut buf)
            .unwrap()
            .expect("Muss eine Nachricht enthalten");
        assert!(matches!(decoded, ClientNachricht::FindStranger(ref id) if id.as_str() == "a1"));
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(find_stranger("x"), &mut buf).unwrap();

        // Nur die Haelfte der Bytes behalten
        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        assert!(server.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn frame_codec_ablehnung_zu_grosser_frame() {
        let mut codec = ServerCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode_zu_grosse_nachricht() {
        let mut codec = ServerCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        let result = codec.encode(ServerNachricht::matched(ClientId::from("partner")), &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn frame_codec_mehrere_nachrichten_im_buffer() {
        let mut server = ServerCodec::new();
        let mut client = ClientCodec::new();
        let mut buf = BytesMut::new();

        server.encode(ServerNachricht::matched(ClientId::from("b")), &mut buf).unwrap();
        server.encode(ServerNachricht::Disconnected, &mut buf).unwrap();

        let erste = client.decode(&mut buf).unwrap().expect("Nachricht erwartet");
        let zweite = client.decode(&mut buf).unwrap().expect("Nachricht erwartet");
        assert!(matches!(erste, ServerNachricht::Matched(_)));
        assert!(matches!(zweite, ServerNachricht::Disconnected));
        assert!(buf.is_empty());
    }

    #[test]
    fn ungueltiges_json_ist_fehler() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(3);
        buf.put_slice(b"{x}");
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn async_read_write_frame() {
        let mut buffer: Vec<u8> = Vec::new();
        write_frame(&mut buffer, &find_stranger("z9"), DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert!(buffer.len() > LENGTH_FIELD_SIZE);

        let mut cursor = io::Cursor::new(buffer);
        let decoded: ClientNachricht = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert_eq!(decoded.event_name(), "find-stranger");
    }

    #[tokio::test]
    async fn async_read_frame_ablehnung_zu_grosser_frame() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(&(2u32 * 1024 * 1024).to_be_bytes());

        let mut cursor = io::Cursor::new(buffer);
        let result: io::Result<ClientNachricht> =
            read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await;
        assert!(result.is_err());
    }
}
