//! Fehlertypen fuer die Client-Engine

use thiserror::Error;

use crate::call::AnrufFehler;

/// Fehler der Client-Engine
#[derive(Debug, Error)]
pub enum ClientFehler {
    /// TCP-Verbindung fehlgeschlagen
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Wire-Protokoll-Fehler beim Senden
    #[error("Protokollfehler: {0}")]
    Wire(#[from] plausch_protocol::WireError),

    /// Die Verbindung zum Server besteht nicht mehr
    #[error("Nicht mit dem Server verbunden")]
    Getrennt,

    /// Lokale Anruf-Operation im falschen Zustand
    #[error("Anruf-Fehler: {0}")]
    Anruf(#[from] AnrufFehler),
}
