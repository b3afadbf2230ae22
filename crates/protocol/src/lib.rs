//! plausch-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Client und
//! Server ausgetauscht werden, sowie den Zeilen-Codec der den rohen
//! Byte-Strom in einzelne Frames zerlegt.

pub mod message;
pub mod wire;

pub use message::{CallType, ChatModus, DecodeError, RelayMessage, ZIEL_ALLE};
pub use wire::{LineCodec, WireError, STANDARD_MAX_FRAME_GROESSE};
