//! Gemeinsamer Server-Zustand fuer den Relay-Service
//!
//! Haelt die beiden geteilten Strukturen (SessionRegistry,
//! GruppenVerzeichnis) und die Konfiguration als Arc-Referenz, die
//! sicher zwischen allen Verbindungs-Tasks geteilt wird.

use std::sync::Arc;

use crate::groups::GruppenVerzeichnis;
use crate::registry::SessionRegistry;

/// Konfiguration fuer den Relay-Service
#[derive(Debug, Clone)]
pub struct RelayKonfiguration {
    /// Anzeigename des Servers (nur fuer Logausgaben)
    pub server_name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
    /// Maximale Frame-Groesse in Bytes (Schutz gegen Pufferwachstum)
    pub max_frame_groesse: usize,
}

impl Default for RelayKonfiguration {
    fn default() -> Self {
        Self {
            server_name: "Plausch Server".to_string(),
            max_clients: 512,
            max_frame_groesse: plausch_protocol::STANDARD_MAX_FRAME_GROESSE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Registry und Verzeichnis sind die einzigen veraenderlichen geteilten
/// Ressourcen; beide kapseln ihre eigene Sperr-Disziplin und geben nie
/// rohe Iteration ueber die Backing-Struktur nach aussen.
pub struct RelayState {
    /// Server-Konfiguration
    pub konfiguration: RelayKonfiguration,
    /// Sitzungs-Registry (Identitaet -> Verbindung)
    pub register: SessionRegistry,
    /// Gruppenverzeichnis (Name -> Mitglieder + Ersteller)
    pub gruppen: GruppenVerzeichnis,
}

impl RelayState {
    /// Erstellt einen neuen RelayState
    pub fn neu(konfiguration: RelayKonfiguration) -> Arc<Self> {
        Arc::new(Self {
            konfiguration,
            register: SessionRegistry::neu(),
            gruppen: GruppenVerzeichnis::neu(),
        })
    }
}
