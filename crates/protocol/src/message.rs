//! Relay-Protokoll – alle Nachrichtenarten
//!
//! Definiert die geschlossene Menge der Nachrichten die ueber die
//! TCP-Verbindung zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Tagged Enum: jede Nachricht traegt ein `type`-Feld in
//!   SCREAMING_SNAKE_CASE (z.B. `PUBLIC_MSG`, `FILE_RX`)
//! - JSON-Serialisierung via serde; Binaerdaten (Dateien, Sprachnotizen,
//!   Stream-Frames) liegen base64-kodiert im `data`-Feld
//! - Die Wire-Form ist die massgebliche Repraesentation; Nachrichten
//!   sind nach der Konstruktion unveraenderlich

use plausch_core::{GruppenName, Identity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Sentinel-Ziel fuer Rundsendungen an alle verbundenen Teilnehmer
pub const ZIEL_ALLE: &str = "All";

/// Dateiname unter dem Sprachnotizen zugestellt werden
pub const SPRACHNOTIZ_DATEINAME: &str = "voice_note.wav";

// ---------------------------------------------------------------------------
// Hilfstypen
// ---------------------------------------------------------------------------

/// Art eines Anrufs (Audio oder Video)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallType {
    Video,
    Audio,
}

impl Default for CallType {
    // Fehlt das `call_type`-Feld auf dem Wire, gilt "Video"
    fn default() -> Self {
        Self::Video
    }
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "Video"),
            Self::Audio => write!(f, "Audio"),
        }
    }
}

/// Zustellmodus einer Chat-/Datei-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatModus {
    Public,
    Private,
    Group,
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Ein einzelner Frame konnte nicht dekodiert werden
///
/// Nicht fatal: der Codec verwirft den Frame und die Verbindung
/// ueberlebt.
#[derive(Debug, Error)]
#[error("Nachricht nicht dekodierbar: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

// ---------------------------------------------------------------------------
// Haupt-Enum: RelayMessage
// ---------------------------------------------------------------------------

/// Alle Nachrichten des Relay-Protokolls (typsicher via Tagged Enum)
///
/// Richtungs-Konvention: Anfragen vom Client tragen `target`,
/// Zustellungen vom Server tragen `from`. Bei Anruf-Signalen sind beide
/// Felder optional, da dieselbe Nachrichtenart in beide Richtungen
/// laeuft und der Server beim Weiterleiten das `target` durch den
/// Absender ersetzt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayMessage {
    // --- Anmeldung ---
    Login {
        name: Identity,
    },

    // --- Text-Nachrichten (Client -> Server) ---
    PublicMsg {
        msg: String,
    },
    PrivateMsg {
        target: Identity,
        msg: String,
    },
    GroupMsg {
        target: GruppenName,
        msg: String,
    },

    // --- Dateien und Sprachnotizen (Client -> Server) ---
    /// `target` ist ein Teilnehmername, ein Gruppenname (bei `is_group`)
    /// oder das Sentinel [`ZIEL_ALLE`]
    File {
        target: String,
        filename: String,
        data: String,
        #[serde(default)]
        is_group: bool,
    },
    VoiceMsg {
        target: String,
        data: String,
        #[serde(default)]
        is_group: bool,
    },

    // --- Live-Streams (beide Richtungen, Weiterleitung unveraendert) ---
    VideoStream {
        target: Identity,
        data: String,
    },
    AudioStream {
        target: Identity,
        data: String,
    },

    // --- Gruppenverwaltung (Client -> Server) ---
    CreateGroup {
        group_name: GruppenName,
    },
    AddMember {
        group_name: GruppenName,
        member_name: Identity,
    },
    LeaveGroup {
        group_name: GruppenName,
    },

    // --- Anruf-Signalisierung (beide Richtungen) ---
    VideoCallRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Identity>,
    },
    AudioCallRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Identity>,
    },
    CallAccepted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Identity>,
        #[serde(default)]
        call_type: CallType,
    },
    CallDeclined {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Identity>,
        #[serde(default)]
        call_type: CallType,
    },
    CallEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Identity>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Identity>,
        #[serde(default)]
        call_type: CallType,
    },
    CallFailed {
        msg: String,
    },

    // --- Zustellungen (Server -> Client) ---
    Chat {
        from: Identity,
        msg: String,
        mode: ChatModus,
        /// Konversations-Schluessel: Absender bei Private, Gruppenname
        /// bei Group, fehlt bei Public
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
    },
    FileRx {
        from: Identity,
        filename: String,
        data: String,
        mode: ChatModus,
        chat_id: String,
    },
    VoiceRx {
        from: Identity,
        filename: String,
        data: String,
        mode: ChatModus,
        chat_id: String,
    },
    UserList {
        users: Vec<Identity>,
    },
    GroupList {
        groups: Vec<GruppenName>,
    },
    Server {
        msg: String,
    },
    Error {
        msg: String,
    },
}

impl RelayMessage {
    /// Erstellt eine informelle Server-Notiz
    pub fn server_notiz(msg: impl Into<String>) -> Self {
        Self::Server { msg: msg.into() }
    }

    /// Erstellt eine Fehler-Notiz an den anfragenden Client
    pub fn fehler(msg: impl Into<String>) -> Self {
        Self::Error { msg: msg.into() }
    }

    /// Erstellt eine Chat-Zustellung
    pub fn chat(
        from: Identity,
        msg: impl Into<String>,
        mode: ChatModus,
        chat_id: Option<String>,
    ) -> Self {
        Self::Chat {
            from,
            msg: msg.into(),
            mode,
            chat_id,
        }
    }

    /// Erstellt eine Anruf-Fehlschlag-Meldung an den Anrufer
    pub fn anruf_fehlgeschlagen(msg: impl Into<String>) -> Self {
        Self::CallFailed { msg: msg.into() }
    }

    /// Serialisiert die Nachricht als JSON (ohne Zeilenende)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alle_nachrichtenarten() -> Vec<RelayMessage> {
        vec![
            RelayMessage::Login {
                name: "alice".into(),
            },
            RelayMessage::PublicMsg {
                msg: "hallo".into(),
            },
            RelayMessage::PrivateMsg {
                target: "bob".into(),
                msg: "psst".into(),
            },
            RelayMessage::GroupMsg {
                target: "team".into(),
                msg: "moin".into(),
            },
            RelayMessage::File {
                target: ZIEL_ALLE.into(),
                filename: "foto.png".into(),
                data: "aGFsbG8=".into(),
                is_group: false,
            },
            RelayMessage::VoiceMsg {
                target: "team".into(),
                data: "aGFsbG8=".into(),
                is_group: true,
            },
            RelayMessage::VideoStream {
                target: "bob".into(),
                data: "ZnJhbWU=".into(),
            },
            RelayMessage::AudioStream {
                target: "bob".into(),
                data: "ZnJhbWU=".into(),
            },
            RelayMessage::CreateGroup {
                group_name: "team".into(),
            },
            RelayMessage::AddMember {
                group_name: "team".into(),
                member_name: "bob".into(),
            },
            RelayMessage::LeaveGroup {
                group_name: "team".into(),
            },
            RelayMessage::VideoCallRequest {
                target: Some("bob".into()),
                from: None,
            },
            RelayMessage::AudioCallRequest {
                target: None,
                from: Some("alice".into()),
            },
            RelayMessage::CallAccepted {
                target: Some("alice".into()),
                from: None,
                call_type: CallType::Video,
            },
            RelayMessage::CallDeclined {
                target: None,
                from: Some("bob".into()),
                call_type: CallType::Audio,
            },
            RelayMessage::CallEnded {
                target: Some("bob".into()),
                from: None,
                call_type: CallType::Audio,
            },
            RelayMessage::CallFailed {
                msg: "bob is not online.".into(),
            },
            RelayMessage::chat("alice".into(), "hi", ChatModus::Public, None),
            RelayMessage::FileRx {
                from: "alice".into(),
                filename: "foto.png".into(),
                data: "aGFsbG8=".into(),
                mode: ChatModus::Private,
                chat_id: "alice".into(),
            },
            RelayMessage::VoiceRx {
                from: "alice".into(),
                filename: SPRACHNOTIZ_DATEINAME.into(),
                data: "aGFsbG8=".into(),
                mode: ChatModus::Group,
                chat_id: "team".into(),
            },
            RelayMessage::UserList {
                users: vec!["alice".into(), "bob".into()],
            },
            RelayMessage::GroupList {
                groups: vec!["team".into()],
            },
            RelayMessage::server_notiz("Welcome, alice!"),
            RelayMessage::fehler("Group already exists."),
        ]
    }

    #[test]
    fn round_trip_aller_nachrichtenarten() {
        for original in alle_nachrichtenarten() {
            let json = original.to_json().unwrap();
            let zurueck = RelayMessage::from_json(&json)
                .unwrap_or_else(|e| panic!("Dekodierung fehlgeschlagen fuer {json}: {e}"));
            assert_eq!(original, zurueck, "Round-Trip verletzt fuer {json}");
        }
    }

    #[test]
    fn wire_tags_entsprechen_dem_protokoll() {
        let faelle = [
            (
                RelayMessage::Login {
                    name: "a".into(),
                },
                "\"type\":\"LOGIN\"",
            ),
            (
                RelayMessage::PublicMsg { msg: "x".into() },
                "\"type\":\"PUBLIC_MSG\"",
            ),
            (
                RelayMessage::VideoStream {
                    target: "b".into(),
                    data: "d".into(),
                },
                "\"type\":\"VIDEO_STREAM\"",
            ),
            (
                RelayMessage::FileRx {
                    from: "a".into(),
                    filename: "f".into(),
                    data: "d".into(),
                    mode: ChatModus::Public,
                    chat_id: "Public".into(),
                },
                "\"type\":\"FILE_RX\"",
            ),
            (
                RelayMessage::CallFailed { msg: "m".into() },
                "\"type\":\"CALL_FAILED\"",
            ),
        ];
        for (nachricht, erwartet) in faelle {
            let json = nachricht.to_json().unwrap();
            assert!(json.contains(erwartet), "{json} enthaelt nicht {erwartet}");
        }
    }

    #[test]
    fn call_type_faellt_auf_video_zurueck() {
        let json = r#"{"type":"CALL_ACCEPTED","from":"bob"}"#;
        let nachricht = RelayMessage::from_json(json).unwrap();
        match nachricht {
            RelayMessage::CallAccepted {
                from, call_type, ..
            } => {
                assert_eq!(from, Some("bob".into()));
                assert_eq!(call_type, CallType::Video);
            }
            andere => panic!("Erwartet CallAccepted, erhalten {andere:?}"),
        }
    }

    #[test]
    fn is_group_faellt_auf_false_zurueck() {
        let json = r#"{"type":"FILE","target":"bob","filename":"f.txt","data":"eA=="}"#;
        match RelayMessage::from_json(json).unwrap() {
            RelayMessage::File { is_group, .. } => assert!(!is_group),
            andere => panic!("Erwartet File, erhalten {andere:?}"),
        }
    }

    #[test]
    fn public_chat_ohne_chat_id() {
        let nachricht = RelayMessage::chat("alice".into(), "hi", ChatModus::Public, None);
        let json = nachricht.to_json().unwrap();
        assert!(
            !json.contains("chat_id"),
            "Public-Chat darf kein chat_id-Feld tragen: {json}"
        );
        assert!(json.contains("\"mode\":\"Public\""));
    }

    #[test]
    fn unbekannte_nachrichtenart_ergibt_decode_error() {
        assert!(RelayMessage::from_json(r#"{"type":"TELEPORT","msg":"x"}"#).is_err());
        assert!(RelayMessage::from_json("kein json").is_err());
        assert!(RelayMessage::from_json(r#"{"msg":"ohne tag"}"#).is_err());
    }

    #[test]
    fn call_type_wire_werte() {
        assert_eq!(serde_json::to_string(&CallType::Video).unwrap(), "\"Video\"");
        assert_eq!(serde_json::to_string(&CallType::Audio).unwrap(), "\"Audio\"");
        assert_eq!(CallType::default(), CallType::Video);
    }
}
