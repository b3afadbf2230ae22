//! Gemeinsame Identifikationstypen fuer Plausch
//!
//! Alle Schluessel verwenden das Newtype-Pattern um Verwechslungen
//! zwischen verschiedenen Arten zur Compilezeit auszuschliessen.
//! `Identity` und `GruppenName` sind auf dem Wire transparent (reine
//! Strings), da das Protokoll Teilnehmer und Gruppen per Namen
//! adressiert.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutiger Anzeigename – der Adressierungsschluessel des Systems
///
/// Invariante: zu jedem Zeitpunkt ist hoechstens eine lebende Verbindung
/// an eine Identity gebunden (durchgesetzt vom SessionRegistry).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Erstellt eine Identity aus einem Anzeigenamen
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Gibt den Namen als `&str` zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Eindeutiger Gruppenname
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GruppenName(pub String);

impl GruppenName {
    /// Erstellt einen GruppenNamen
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Gibt den Namen als `&str` zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GruppenName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GruppenName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GruppenName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Eindeutige Verbindungs-ID
///
/// Wird pro akzeptierter TCP-Verbindung vergeben und schuetzt das
/// Austragen aus dem Registry: eine Verbindung, die bereits durch einen
/// neuen Login verdraengt wurde, darf die neue Bindung nicht entfernen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}
