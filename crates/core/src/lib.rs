//! plausch-core – Gemeinsame Identifikationstypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plausch-Crates gemeinsam genutzt werden. Das gesamte System
//! adressiert Teilnehmer ueber ihren Anzeigenamen, daher sind die
//! Schluesseltypen String-basierte Newtypes.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ConnectionId, GruppenName, Identity};
