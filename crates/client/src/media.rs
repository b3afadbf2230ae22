//! Medien-Kollaborateur – Schnittstelle fuer Capture und Wiedergabe
//!
//! Die Engine behandelt Medienrahmen als opake, bereits kodierte
//! Binaerdaten: Codec, Aufnahme und Wiedergabe liegen vollstaendig beim
//! Kollaborateur. Waehrend eines aktiven Anrufs zieht die Engine Rahmen
//! aus dem Capture-Kanal und leitet sie als Stream-Nachrichten an den
//! Partner; empfangene Rahmen gehen unveraendert an die Wiedergabe.

use plausch_protocol::CallType;
use tokio::sync::mpsc;

/// Schnittstelle zum Medien-Kollaborateur (ausserhalb des Engine-Kerns)
///
/// Implementierungen muessen `Send + Sync` sein, da die Engine sie aus
/// mehreren Tasks anspricht.
pub trait MedienBruecke: Send + Sync {
    /// Startet die Aufnahme fuer einen Anruf der gegebenen Art
    ///
    /// Der zurueckgegebene Kanal liefert fertige, kodierte Rahmen; die
    /// Engine sendet jeden Rahmen base64-kodiert an den Anrufpartner.
    /// Das Schliessen des Kanals beendet die Weiterleitung.
    fn aufnahme_starten(&self, art: CallType) -> mpsc::Receiver<Vec<u8>>;

    /// Stoppt die Aufnahme und gibt Capture-Ressourcen frei
    fn aufnahme_stoppen(&self);

    /// Spielt einen empfangenen, kodierten Rahmen ab
    ///
    /// `art` entspricht der Stream-Nachrichtenart (Video oder Audio)
    /// mit der der Rahmen ankam.
    fn rahmen_abspielen(&self, art: CallType, daten: Vec<u8>);
}
