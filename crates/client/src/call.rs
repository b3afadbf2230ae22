//! Anruf-Signalisierung – client-seitige Zustandsmaschine
//!
//! Der Anruf-Lebenszyklus existiert nur im Speicher der beiden
//! Teilnehmer; der Server leitet Signale lediglich anhand der
//! Ziel-Identitaet weiter. Diese Maschine ist rein: Methoden geben die
//! zu sendende Nachricht bzw. eine auszufuehrende Aktion zurueck,
//! IO und Medien uebernimmt die Engine.
//!
//! ## Zustaende
//! ```text
//! Leerlauf --starten--> Klingelt(Anrufer)   --Accepted--> Aktiv
//! Leerlauf --Request--> Klingelt(Angerufener) --annehmen--> Aktiv
//! Klingelt(Angerufener) --ablehnen--> Leerlauf
//! Klingelt(Anrufer) --Declined/Failed--> Leerlauf
//! Aktiv | Klingelt(Anrufer) --beenden--> Beendend --abgeschlossen--> Leerlauf
//! Aktiv --Ended empfangen--> Leerlauf
//! ```
//!
//! Eigenheiten des Protokolls: es gibt keinen Klingel-Timeout (ein
//! unbeantwortetes Klingeln bleibt bis zum Abbruch oder einer Antwort
//! bestehen), ein zweiter eingehender Anruf ersetzt den wartenden, und
//! ein streunendes `CALL_ACCEPTED` aktiviert einen Anruf aus jedem
//! Zustand – nirgends wird Kausalitaet geprueft.

use plausch_core::Identity;
use plausch_protocol::{CallType, RelayMessage};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Zustaende
// ---------------------------------------------------------------------------

/// Rolle waehrend des Klingelns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnrufRolle {
    /// Hat den Anruf initiiert, wartet auf Antwort
    Anrufer,
    /// Bekommt den Anruf angeboten (Annehmen/Ablehnen)
    Angerufener,
}

/// Zustand der Anruf-Maschine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnrufZustand {
    /// Kein Anruf
    Leerlauf,
    /// Es klingelt (abbrechbar, ohne Timeout)
    Klingelt {
        partner: Identity,
        art: CallType,
        rolle: AnrufRolle,
    },
    /// Anruf laeuft, Medien fliessen
    Aktiv { partner: Identity, art: CallType },
    /// Lokal beendet, Medien werden abgebaut
    Beendend,
}

/// Aktion die die Engine nach einem verarbeiteten Signal ausfuehrt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnrufAktion {
    /// Nichts zu tun
    Keine,
    /// Eingehender Anruf: Annehmen/Ablehnen anbieten
    Eingehend { von: Identity, art: CallType },
    /// Gegenseite hat angenommen: Medien starten
    Angenommen { partner: Identity, art: CallType },
    /// Gegenseite hat abgelehnt
    Abgelehnt { von: Identity },
    /// Anruf vorbei: Medien stoppen
    Beendet { von: Identity },
    /// Anrufaufbau fehlgeschlagen (z.B. Ziel nicht online)
    Fehlgeschlagen { grund: String },
}

/// Fehler bei lokalen Anruf-Operationen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnrufFehler {
    #[error("Es laeuft bereits ein Anruf oder es klingelt")]
    BereitsBelegt,
    #[error("Kein eingehender Anruf")]
    KeinEingehenderAnruf,
}

// ---------------------------------------------------------------------------
// AnrufMaschine
// ---------------------------------------------------------------------------

/// Client-seitige Anruf-Zustandsmaschine
#[derive(Debug)]
pub struct AnrufMaschine {
    zustand: AnrufZustand,
}

impl AnrufMaschine {
    /// Erstellt eine Maschine im Leerlauf
    pub fn neu() -> Self {
        Self {
            zustand: AnrufZustand::Leerlauf,
        }
    }

    /// Gibt den aktuellen Zustand zurueck
    pub fn zustand(&self) -> &AnrufZustand {
        &self.zustand
    }

    /// Prueft ob gerade ein Anruf laeuft
    pub fn ist_aktiv(&self) -> bool {
        matches!(self.zustand, AnrufZustand::Aktiv { .. })
    }

    /// Initiiert einen Anruf
    ///
    /// Gibt die zu sendende Anfrage zurueck; der Wartezustand ist ueber
    /// [`AnrufMaschine::beenden`] abbrechbar.
    pub fn starten(
        &mut self,
        partner: Identity,
        art: CallType,
    ) -> Result<RelayMessage, AnrufFehler> {
        if self.zustand != AnrufZustand::Leerlauf {
            return Err(AnrufFehler::BereitsBelegt);
        }

        let anfrage = match art {
            CallType::Video => RelayMessage::VideoCallRequest {
                target: Some(partner.clone()),
                from: None,
            },
            CallType::Audio => RelayMessage::AudioCallRequest {
                target: Some(partner.clone()),
                from: None,
            },
        };

        self.zustand = AnrufZustand::Klingelt {
            partner,
            art,
            rolle: AnrufRolle::Anrufer,
        };
        Ok(anfrage)
    }

    /// Nimmt den eingehenden Anruf an
    pub fn annehmen(&mut self) -> Result<RelayMessage, AnrufFehler> {
        match self.zustand.clone() {
            AnrufZustand::Klingelt {
                partner,
                art,
                rolle: AnrufRolle::Angerufener,
            } => {
                self.zustand = AnrufZustand::Aktiv {
                    partner: partner.clone(),
                    art,
                };
                Ok(RelayMessage::CallAccepted {
                    target: Some(partner),
                    from: None,
                    call_type: art,
                })
            }
            _ => Err(AnrufFehler::KeinEingehenderAnruf),
        }
    }

    /// Lehnt den eingehenden Anruf ab
    pub fn ablehnen(&mut self) -> Result<RelayMessage, AnrufFehler> {
        match self.zustand.clone() {
            AnrufZustand::Klingelt {
                partner,
                art,
                rolle: AnrufRolle::Angerufener,
            } => {
                self.zustand = AnrufZustand::Leerlauf;
                Ok(RelayMessage::CallDeclined {
                    target: Some(partner),
                    from: None,
                    call_type: art,
                })
            }
            _ => Err(AnrufFehler::KeinEingehenderAnruf),
        }
    }

    /// Beendet den laufenden Anruf oder bricht das eigene Klingeln ab
    ///
    /// Gibt `None` zurueck wenn es nichts zu beenden gibt. Nach dem
    /// Medienabbau meldet die Engine [`AnrufMaschine::abgeschlossen`].
    pub fn beenden(&mut self) -> Option<RelayMessage> {
        match self.zustand.clone() {
            AnrufZustand::Aktiv { partner, art }
            | AnrufZustand::Klingelt {
                partner,
                art,
                rolle: AnrufRolle::Anrufer,
            } => {
                self.zustand = AnrufZustand::Beendend;
                Some(RelayMessage::CallEnded {
                    target: Some(partner),
                    from: None,
                    call_type: art,
                })
            }
            _ => None,
        }
    }

    /// Meldet den abgeschlossenen Medienabbau
    pub fn abgeschlossen(&mut self) {
        if self.zustand == AnrufZustand::Beendend {
            self.zustand = AnrufZustand::Leerlauf;
        }
    }

    /// Verarbeitet ein empfangenes Anruf-Signal
    ///
    /// Nicht-Anruf-Nachrichten ergeben [`AnrufAktion::Keine`].
    pub fn nachricht_verarbeiten(&mut self, nachricht: &RelayMessage) -> AnrufAktion {
        match nachricht {
            RelayMessage::VideoCallRequest { from: Some(von), .. } => {
                self.eingehend(von.clone(), CallType::Video)
            }
            RelayMessage::AudioCallRequest { from: Some(von), .. } => {
                self.eingehend(von.clone(), CallType::Audio)
            }

            RelayMessage::CallAccepted {
                from: Some(von),
                call_type,
                ..
            } => {
                // Keine Kausalitaetspruefung: auch ein streunendes
                // Accepted aktiviert den Anruf
                self.zustand = AnrufZustand::Aktiv {
                    partner: von.clone(),
                    art: *call_type,
                };
                AnrufAktion::Angenommen {
                    partner: von.clone(),
                    art: *call_type,
                }
            }

            RelayMessage::CallDeclined { from: Some(von), .. } => {
                self.zustand = AnrufZustand::Leerlauf;
                AnrufAktion::Abgelehnt { von: von.clone() }
            }

            RelayMessage::CallEnded { from: Some(von), .. } => {
                if self.zustand == AnrufZustand::Leerlauf {
                    AnrufAktion::Keine
                } else {
                    self.zustand = AnrufZustand::Leerlauf;
                    AnrufAktion::Beendet { von: von.clone() }
                }
            }

            RelayMessage::CallFailed { msg } => {
                self.zustand = AnrufZustand::Leerlauf;
                AnrufAktion::Fehlgeschlagen { grund: msg.clone() }
            }

            _ => AnrufAktion::Keine,
        }
    }

    /// Setzt die Maschine zurueck (Verbindungsverlust)
    pub fn zuruecksetzen(&mut self) {
        self.zustand = AnrufZustand::Leerlauf;
    }

    fn eingehend(&mut self, von: Identity, art: CallType) -> AnrufAktion {
        // Ein zweiter eingehender Anruf ersetzt den wartenden
        self.zustand = AnrufZustand::Klingelt {
            partner: von.clone(),
            art,
            rolle: AnrufRolle::Angerufener,
        };
        AnrufAktion::Eingehend { von, art }
    }
}

impl Default for AnrufMaschine {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
