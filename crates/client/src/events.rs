//! Ereignisse fuer den Praesentations-Kollaborateur
//!
//! Die Engine uebersetzt eingehende Frames in diese Ereignisse und
//! liefert sie ueber einen mpsc-Kanal aus. Eine Oberflaeche (GUI, TUI,
//! Tests) konsumiert den Strom; die Engine kennt keine Darstellung.
//! Binaerdaten sind an dieser Grenze bereits base64-dekodiert.

use chrono::{DateTime, Utc};
use plausch_core::{GruppenName, Identity};
use plausch_protocol::{CallType, ChatModus};

/// Ereignisse der Client-Engine
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEreignis {
    /// Text-Nachricht zugestellt
    Chat {
        von: Identity,
        text: String,
        modus: ChatModus,
        /// Konversations-Schluessel (Absender bei Private, Gruppenname
        /// bei Group, fehlt bei Public)
        chat_id: Option<String>,
        empfangen_um: DateTime<Utc>,
    },

    /// Datei zugestellt
    DateiEmpfangen {
        von: Identity,
        dateiname: String,
        daten: Vec<u8>,
        modus: ChatModus,
        chat_id: String,
    },

    /// Sprachnotiz zugestellt
    SprachnotizEmpfangen {
        von: Identity,
        daten: Vec<u8>,
        modus: ChatModus,
        chat_id: String,
    },

    /// Aktualisierte Liste der verbundenen Teilnehmer
    BenutzerListe { benutzer: Vec<Identity> },

    /// Aktualisierte, auf die eigene Mitgliedschaft gefilterte
    /// Gruppenliste
    GruppenListe { gruppen: Vec<GruppenName> },

    /// Informelle Server-Notiz (Willkommen, Verdraengung, ...)
    ServerNotiz { text: String },

    /// Fehler-Notiz des Servers (Gruppenverwaltung)
    FehlerNotiz { text: String },

    // --- Anruf-Zustandsuebergaenge ---
    /// Eingehender Anruf: Annehmen/Ablehnen anbieten
    AnrufEingehend { von: Identity, art: CallType },
    /// Die Gegenseite hat angenommen, der Anruf laeuft
    AnrufAngenommen { partner: Identity, art: CallType },
    /// Die Gegenseite hat abgelehnt
    AnrufAbgelehnt { von: Identity },
    /// Der Anruf ist vorbei
    AnrufBeendet { von: Identity },
    /// Anrufaufbau fehlgeschlagen, mit Begruendung
    AnrufFehlgeschlagen { grund: String },

    /// Die Verbindung zum Server ist beendet
    Getrennt,
}
