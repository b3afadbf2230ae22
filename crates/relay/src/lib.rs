//! plausch-relay – TCP Relay- und Session-Service
//!
//! Dieser Crate implementiert die Server-Seite des Relay-Protokolls:
//! Verbindungsverwaltung, Sitzungs-Registry, Gruppenverzeichnis und die
//! Weiterleitungsregeln fuer Chat, Dateien, Sprachnotizen, Live-Streams
//! und Anruf-Signalisierung. Der Server haelt keinerlei Anruf-Zustand –
//! Anruf-Signale werden ausschliesslich anhand der Ziel-Identitaet
//! weitergeleitet.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Login bindet die Identitaet, danach:
//!     v
//! RelayRouter
//!     |
//!     +-- Chat        (Public, Private, Gruppe)
//!     +-- Datei/Voice (Einzelziel, Gruppe, "All")
//!     +-- Streams     (unveraenderte Weiterleitung an ein Einzelziel)
//!     +-- Anrufe      (Request/Accept/Decline/End, zustandslos)
//!     +-- Gruppen     (Create, AddMember, Leave)
//!
//! SessionRegistry    – Identitaet -> lebende Verbindung (hoechstens eine)
//! GruppenVerzeichnis – Gruppenname -> Mitglieder + Ersteller
//! ```

pub mod connection;
pub mod error;
pub mod groups;
pub mod registry;
pub mod router;
pub mod server_state;
pub mod tcp;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use error::GruppenFehler;
pub use groups::{AustrittErgebnis, GruppenVerzeichnis};
pub use registry::{ClientSender, SessionRegistry};
pub use router::RelayRouter;
pub use server_state::{RelayKonfiguration, RelayState};
pub use tcp::RelayServer;
