//! strangerlink-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, die zwischen Client und
//! Server ausgetauscht werden, sowie das Frame-Format fuer TCP-Clients.

pub mod control;
pub mod wire;

pub use control::{ClientNachricht, ErrorCode, ServerNachricht};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
