//! plausch-client – Headless Client-Engine
//!
//! Dieser Crate implementiert die Client-Seite des Relay-Protokolls
//! ohne jede Oberflaeche:
//!
//! - [`engine::ClientEngine`]: Verbindung zum Server, typisierte
//!   Sende-Operationen, Lese-Task der eingehende Frames in Ereignisse
//!   uebersetzt
//! - [`call::AnrufMaschine`]: die Anruf-Signalisierungs-Zustandsmaschine
//!   (rein, ohne IO) – der Server haelt keinen Anruf-Zustand, beide
//!   Seiten koordinieren sich ausschliesslich ueber weitergeleitete
//!   Signale
//! - [`media::MedienBruecke`]: Schnittstelle zum Medien-Kollaborateur;
//!   die Engine behandelt kodierte Medienrahmen als opake Binaerdaten
//! - [`events::ClientEreignis`]: Ereignisstrom fuer den
//!   Praesentations-Kollaborateur (GUI, TUI, Tests)

pub mod call;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use call::{AnrufAktion, AnrufFehler, AnrufMaschine, AnrufRolle, AnrufZustand};
pub use engine::ClientEngine;
pub use error::ClientFehler;
pub use events::ClientEreignis;
pub use media::MedienBruecke;
