//! Fehlertypen fuer den Relay-Service
//!
//! Gruppenverwaltungs-Fehler werden dem anfragenden Client als
//! `ERROR`-Notiz auf demselben Kanal zugestellt; der Display-Text ist
//! deshalb der Wire-sichtbare Wortlaut.

use thiserror::Error;

/// Fehler der Gruppenverwaltung (nicht fatal, als ERROR-Notiz gemeldet)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GruppenFehler {
    /// Eine Gruppe dieses Namens existiert bereits
    #[error("Group already exists.")]
    BereitsVorhanden,

    /// Die angesprochene Gruppe existiert nicht
    #[error("Group not found.")]
    NichtGefunden,

    /// Der Benutzer ist bereits Mitglied der Gruppe
    #[error("User already in group.")]
    BereitsMitglied,

    /// Der Benutzer ist nicht verbunden – Einladungen setzen eine
    /// registrierte Sitzung voraus
    #[error("User not connected.")]
    MitgliedOffline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wortlaut_ist_wire_sichtbar() {
        assert_eq!(
            GruppenFehler::BereitsVorhanden.to_string(),
            "Group already exists."
        );
        assert_eq!(GruppenFehler::NichtGefunden.to_string(), "Group not found.");
        assert_eq!(
            GruppenFehler::BereitsMitglied.to_string(),
            "User already in group."
        );
        assert_eq!(
            GruppenFehler::MitgliedOffline.to_string(),
            "User not connected."
        );
    }
}
