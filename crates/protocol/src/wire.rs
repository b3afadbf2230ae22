//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilen-basiertes Protokoll: jeder Frame ist ein JSON-Objekt,
//! abgeschlossen durch ein einzelnes `\n` (0x0A).
//!
//! ## Frame-Format
//!
//! ```text
//! +----------------------------+----+
//! | JSON-Objekt (UTF-8)        | \n |
//! +----------------------------+----+
//! ```
//!
//! Das Trennzeichen kann nicht im Payload auftreten: serde_json
//! escaped Zeilenumbrueche in Strings, und Binaerdaten liegen
//! base64-kodiert vor.
//!
//! ## Fehlerverhalten
//! - Ueberschreitet der Puffer die maximale Frame-Groesse ohne
//!   Trennzeichen, ist das ein fataler [`WireError::RahmenZuGross`] –
//!   die Verbindung wird geschlossen.
//! - Ein vollstaendiger, aber nicht dekodierbarer Frame wird still
//!   verworfen; die Verbindung ueberlebt. Leere Zeilen werden
//!   uebersprungen.

use bytes::{BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::message::RelayMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (16 MB – Dateien werden base64-kodiert
/// im Frame uebertragen)
pub const STANDARD_MAX_FRAME_GROESSE: usize = 16 * 1024 * 1024;

/// Frame-Trennzeichen
const ZEILENENDE: u8 = b'\n';

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler des Zeilen-Codecs
#[derive(Debug, Error)]
pub enum WireError {
    /// Gepufferte Daten ueberschreiten das Maximum ohne Trennzeichen
    /// (Schutz gegen unbegrenztes Pufferwachstum) – verbindungsfatal
    #[error("Frame zu gross: {groesse} Bytes ohne Abschluss (Maximum: {maximum} Bytes)")]
    RahmenZuGross { groesse: usize, maximum: usize },

    /// Zu sendende Nachricht ueberschreitet die maximale Frame-Groesse
    #[error("Nachricht zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    NachrichtZuGross { groesse: usize, maximum: usize },

    /// IO-Fehler des darunterliegenden Streams
    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer das zeilen-basierte Relay-Protokoll
///
/// Implementiert `Encoder<RelayMessage>` und `Decoder` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`. Unvollstaendige Frames
/// werden ueber mehrere Reads hinweg gepuffert; ein Read kann null,
/// einen oder mehrere Frames liefern.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_groesse: usize,
}

impl LineCodec {
    /// Erstellt einen neuen `LineCodec` mit Standard-Limit
    pub fn neu() -> Self {
        Self {
            max_frame_groesse: STANDARD_MAX_FRAME_GROESSE,
        }
    }

    /// Erstellt einen `LineCodec` mit benutzerdefiniertem Limit
    pub fn mit_max_groesse(max_frame_groesse: usize) -> Self {
        Self { max_frame_groesse }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_groesse(&self) -> usize {
        self.max_frame_groesse
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for LineCodec {
    type Item = RelayMessage;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match src.iter().position(|b| *b == ZEILENENDE) {
                Some(pos) => {
                    // Zeile inkl. Trennzeichen verbrauchen
                    let zeile = src.split_to(pos + 1);
                    let daten = &zeile[..pos];

                    // Leere Zeilen ueberspringen
                    if daten.iter().all(|b| b.is_ascii_whitespace()) {
                        continue;
                    }

                    match serde_json::from_slice::<RelayMessage>(daten) {
                        Ok(nachricht) => return Ok(Some(nachricht)),
                        Err(e) => {
                            // Ein fehlerhafter Frame darf die Verbindung
                            // nicht schliessen: verwerfen und naechste
                            // Zeile pruefen
                            tracing::trace!(fehler = %e, "Undekodierbarer Frame verworfen");
                            continue;
                        }
                    }
                }
                None => {
                    if src.len() > self.max_frame_groesse {
                        return Err(WireError::RahmenZuGross {
                            groesse: src.len(),
                            maximum: self.max_frame_groesse,
                        });
                    }
                    // Auf mehr Daten warten
                    return Ok(None);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<RelayMessage> for LineCodec {
    type Error = WireError;

    fn encode(&mut self, item: RelayMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| WireError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if json.len() > self.max_frame_groesse {
            return Err(WireError::NachrichtZuGross {
                groesse: json.len(),
                maximum: self.max_frame_groesse,
            });
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(ZEILENENDE);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatModus;

    fn test_nachricht(text: &str) -> RelayMessage {
        RelayMessage::PublicMsg {
            msg: text.to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut codec = LineCodec::neu();
        let original = test_nachricht("hallo welt");

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();
        assert_eq!(buf[buf.len() - 1], b'\n');

        let dekodiert = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss eine Nachricht enthalten");
        assert_eq!(dekodiert, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn unvollstaendiger_frame_wartet_auf_mehr_daten() {
        let mut codec = LineCodec::neu();
        let mut buf = BytesMut::new();
        codec.encode(test_nachricht("abc"), &mut buf).unwrap();

        // Nur die Haelfte der Bytes behalten
        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        let result = codec.decode(&mut partial).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn mehrere_frames_in_einem_puffer() {
        let mut codec = LineCodec::neu();
        let mut buf = BytesMut::new();

        for i in 0..3 {
            codec
                .encode(test_nachricht(&format!("nachricht {i}")), &mut buf)
                .unwrap();
        }

        for i in 0..3 {
            let nachricht = codec.decode(&mut buf).unwrap().expect("Nachricht erwartet");
            assert_eq!(nachricht, test_nachricht(&format!("nachricht {i}")));
        }
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn fehlerhafter_frame_wird_verworfen_verbindung_ueberlebt() {
        let mut codec = LineCodec::neu();
        let mut buf = BytesMut::new();

        codec.encode(test_nachricht("erste"), &mut buf).unwrap();
        buf.extend_from_slice(b"{kein gueltiges json}\n");
        buf.extend_from_slice(b"{\"type\":\"WARP\",\"x\":1}\n");
        codec.encode(test_nachricht("zweite"), &mut buf).unwrap();

        // Beide gueltigen Frames kommen an, die schlechten verschwinden
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(test_nachricht("erste"))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(test_nachricht("zweite"))
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn leere_zeilen_werden_uebersprungen() {
        let mut codec = LineCodec::neu();
        let mut buf = BytesMut::from(&b"\n  \n"[..]);
        codec.encode(test_nachricht("dahinter"), &mut buf).unwrap();

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(test_nachricht("dahinter"))
        );
    }

    #[test]
    fn puffer_ohne_trennzeichen_ueber_limit_ist_fatal() {
        let mut codec = LineCodec::mit_max_groesse(64);
        let mut buf = BytesMut::from(vec![b'x'; 100].as_slice());

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(WireError::RahmenZuGross { .. })));
    }

    #[test]
    fn encode_lehnt_zu_grosse_nachricht_ab() {
        let mut codec = LineCodec::mit_max_groesse(16);
        let mut buf = BytesMut::new();

        let result = codec.encode(test_nachricht("viel zu lange nachricht"), &mut buf);
        assert!(matches!(result, Err(WireError::NachrichtZuGross { .. })));
    }

    #[test]
    fn zeilenumbruch_im_text_bleibt_ein_frame() {
        let mut codec = LineCodec::neu();
        let original = RelayMessage::chat(
            "alice".into(),
            "zeile eins\nzeile zwei",
            ChatModus::Public,
            None,
        );

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        // Genau ein Trennzeichen: das am Frame-Ende
        let anzahl = buf.iter().filter(|b| **b == b'\n').count();
        assert_eq!(anzahl, 1, "serde_json muss \\n im Text escapen");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(original));
    }

    #[test]
    fn standard_limit() {
        let codec = LineCodec::neu();
        assert_eq!(codec.max_frame_groesse(), STANDARD_MAX_FRAME_GROESSE);
    }
}
