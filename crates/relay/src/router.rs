//! Relay-Router – Weiterleitungsregeln fuer alle Nachrichtenarten
//!
//! Berechnet fuer jede eingehende Nachricht die Zielmenge und leitet
//! den Payload unveraendert weiter. Der Router dekodiert niemals
//! Binaerdaten und haelt keinerlei Anruf-Zustand.
//!
//! ## Fehlerasymmetrie
//! - Streams, Dateien und Chat an unbekannte Ziele: stilles Verwerfen
//!   (verlusttolerant)
//! - Anruf-Anfragen und Gruppenverwaltung: explizite Rueckmeldung an
//!   den Absender (`CALL_FAILED` bzw. `ERROR`), da benutzerinitiiert
//!
//! Praesenz- und Gruppenlisten-Pushes sind Nebeneffekte von
//! Registry-/Verzeichnis-Mutationen, keine Antworten auf Anfragen.

use plausch_core::{GruppenName, Identity};
use plausch_protocol::message::SPRACHNOTIZ_DATEINAME;
use plausch_protocol::{CallType, ChatModus, RelayMessage, ZIEL_ALLE};
use std::sync::Arc;

use crate::error::GruppenFehler;
use crate::server_state::RelayState;

/// Absendername fuer Gruppen-Systemnotizen
const SYSTEM_ABSENDER: &str = "System";

/// Zentraler Relay-Router
///
/// Wird pro Verbindungs-Task erstellt; der gesamte Zustand liegt im
/// geteilten `RelayState`.
pub struct RelayRouter {
    state: Arc<RelayState>,
}

impl RelayRouter {
    /// Erstellt einen neuen Router
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine Nachricht eines angemeldeten Absenders
    ///
    /// `LOGIN` wird vom Verbindungs-Task behandelt und erreicht den
    /// Router nicht.
    pub fn verteilen(&self, absender: &Identity, nachricht: RelayMessage) {
        match nachricht {
            // -------------------------------------------------------------------
            // Text-Nachrichten
            // -------------------------------------------------------------------
            RelayMessage::PublicMsg { msg } => {
                let chat = RelayMessage::chat(absender.clone(), msg, ChatModus::Public, None);
                self.state.register.an_alle_ausser_senden(absender, chat);
            }

            RelayMessage::PrivateMsg { target, msg } => {
                let chat = RelayMessage::chat(
                    absender.clone(),
                    msg,
                    ChatModus::Private,
                    Some(absender.als_str().to_string()),
                );
                // Unbekanntes Ziel: stilles Verwerfen, keine Rueckmeldung
                self.state.register.an_identitaet_senden(&target, chat);
            }

            RelayMessage::GroupMsg { target, msg } => {
                let chat = RelayMessage::chat(
                    absender.clone(),
                    msg,
                    ChatModus::Group,
                    Some(target.als_str().to_string()),
                );
                // Unbekannte Gruppe: Mitgliedermenge ist leer, No-op
                self.an_gruppe_senden(&target, Some(absender), chat);
            }

            // -------------------------------------------------------------------
            // Dateien und Sprachnotizen
            // -------------------------------------------------------------------
            RelayMessage::File {
                target,
                filename,
                data,
                is_group,
            } => {
                self.datei_weiterleiten(absender, &target, filename, data, is_group, false);
            }

            RelayMessage::VoiceMsg {
                target,
                data,
                is_group,
            } => {
                self.datei_weiterleiten(
                    absender,
                    &target,
                    SPRACHNOTIZ_DATEINAME.to_string(),
                    data,
                    is_group,
                    true,
                );
            }

            // -------------------------------------------------------------------
            // Live-Streams: unveraenderte Weiterleitung an ein Einzelziel
            // -------------------------------------------------------------------
            RelayMessage::VideoStream { target, data } => {
                let ziel = target.clone();
                // Getrenntes Ziel: stilles Verwerfen, kein Fehler
                self.state
                    .register
                    .an_identitaet_senden(&ziel, RelayMessage::VideoStream { target, data });
            }

            RelayMessage::AudioStream { target, data } => {
                let ziel = target.clone();
                self.state
                    .register
                    .an_identitaet_senden(&ziel, RelayMessage::AudioStream { target, data });
            }

            // -------------------------------------------------------------------
            // Anruf-Signalisierung (zustandslos)
            // -------------------------------------------------------------------
            RelayMessage::VideoCallRequest { target, .. } => {
                self.anruf_anfrage(absender, target, CallType::Video);
            }

            RelayMessage::AudioCallRequest { target, .. } => {
                self.anruf_anfrage(absender, target, CallType::Audio);
            }

            RelayMessage::CallAccepted {
                target, call_type, ..
            } => {
                self.anruf_signal_weiterleiten(
                    absender,
                    target,
                    RelayMessage::CallAccepted {
                        target: None,
                        from: Some(absender.clone()),
                        call_type,
                    },
                );
            }

            RelayMessage::CallDeclined {
                target, call_type, ..
            } => {
                self.anruf_signal_weiterleiten(
                    absender,
                    target,
                    RelayMessage::CallDeclined {
                        target: None,
                        from: Some(absender.clone()),
                        call_type,
                    },
                );
            }

            RelayMessage::CallEnded {
                target, call_type, ..
            } => {
                self.anruf_signal_weiterleiten(
                    absender,
                    target,
                    RelayMessage::CallEnded {
                        target: None,
                        from: Some(absender.clone()),
                        call_type,
                    },
                );
            }

            // -------------------------------------------------------------------
            // Gruppenverwaltung
            // -------------------------------------------------------------------
            RelayMessage::CreateGroup { group_name } => {
                self.gruppe_erstellen(absender, &group_name);
            }

            RelayMessage::AddMember {
                group_name,
                member_name,
            } => {
                self.mitglied_hinzufuegen(absender, &group_name, member_name);
            }

            RelayMessage::LeaveGroup { group_name } => {
                self.gruppe_verlassen(absender, &group_name);
            }

            // -------------------------------------------------------------------
            // Server->Client-Arten vom Client: verwerfen
            // -------------------------------------------------------------------
            RelayMessage::Login { .. }
            | RelayMessage::Chat { .. }
            | RelayMessage::FileRx { .. }
            | RelayMessage::VoiceRx { .. }
            | RelayMessage::UserList { .. }
            | RelayMessage::GroupList { .. }
            | RelayMessage::Server { .. }
            | RelayMessage::Error { .. }
            | RelayMessage::CallFailed { .. } => {
                tracing::trace!(
                    benutzer = %absender,
                    "Nachricht in falscher Richtung verworfen"
                );
            }
        }
    }

    /// Sendet dem Empfaenger die auf ihn gefilterte Gruppenliste
    ///
    /// Wird nach jeder Verzeichnis-Mutation und beim Login aufgerufen.
    pub fn gruppenliste_senden(&self, identitaet: &Identity) {
        let groups = self.state.gruppen.gruppen_von(identitaet);
        self.state
            .register
            .an_identitaet_senden(identitaet, RelayMessage::GroupList { groups });
    }

    // -----------------------------------------------------------------------
    // Interne Weiterleitung
    // -----------------------------------------------------------------------

    /// Stellt eine Nachricht an alle registrierten Gruppenmitglieder zu
    fn an_gruppe_senden(
        &self,
        gruppe: &GruppenName,
        ausser: Option<&Identity>,
        nachricht: RelayMessage,
    ) -> usize {
        let mut gesendet = 0;
        for mitglied in self.state.gruppen.mitglieder_von(gruppe) {
            if ausser == Some(&mitglied) {
                continue;
            }
            // Offline-Mitglieder werden uebersprungen
            if self
                .state
                .register
                .an_identitaet_senden(&mitglied, nachricht.clone())
            {
                gesendet += 1;
            }
        }
        gesendet
    }

    /// Leitet Datei- oder Sprachnotiz-Payloads weiter
    ///
    /// Zustellung relabelt die Nachricht zu `FILE_RX` bzw. `VOICE_RX`;
    /// das base64-`data`-Feld wird unveraendert durchgereicht.
    fn datei_weiterleiten(
        &self,
        absender: &Identity,
        ziel: &str,
        filename: String,
        data: String,
        ist_gruppe: bool,
        ist_sprachnotiz: bool,
    ) {
        let zustellung = |mode: ChatModus, chat_id: String| -> RelayMessage {
            if ist_sprachnotiz {
                RelayMessage::VoiceRx {
                    from: absender.clone(),
                    filename: filename.clone(),
                    data: data.clone(),
                    mode,
                    chat_id,
                }
            } else {
                RelayMessage::FileRx {
                    from: absender.clone(),
                    filename: filename.clone(),
                    data: data.clone(),
                    mode,
                    chat_id,
                }
            }
        };

        if ist_gruppe {
            let gruppe = GruppenName::neu(ziel);
            let nachricht = zustellung(ChatModus::Group, ziel.to_string());
            self.an_gruppe_senden(&gruppe, Some(absender), nachricht);
        } else if ziel == ZIEL_ALLE {
            let nachricht = zustellung(ChatModus::Public, "Public".to_string());
            self.state.register.an_alle_ausser_senden(absender, nachricht);
        } else {
            let nachricht = zustellung(ChatModus::Private, absender.als_str().to_string());
            // Unbekanntes Ziel: stilles Verwerfen
            self.state
                .register
                .an_identitaet_senden(&Identity::neu(ziel), nachricht);
        }
    }

    /// Behandelt eine Anruf-Anfrage
    ///
    /// Registriertes Ziel: Anfrage mit Absender-Identitaet zustellen.
    /// Unbekanntes Ziel: `CALL_FAILED` an den Anrufer – Anrufaufbau ist
    /// benutzerinitiiert und braucht Rueckmeldung.
    fn anruf_anfrage(&self, absender: &Identity, ziel: Option<Identity>, art: CallType) {
        let Some(ziel) = ziel else {
            tracing::trace!(benutzer = %absender, "Anruf-Anfrage ohne Ziel verworfen");
            return;
        };

        let anfrage = match art {
            CallType::Video => RelayMessage::VideoCallRequest {
                target: None,
                from: Some(absender.clone()),
            },
            CallType::Audio => RelayMessage::AudioCallRequest {
                target: None,
                from: Some(absender.clone()),
            },
        };

        if self.state.register.an_identitaet_senden(&ziel, anfrage) {
            tracing::debug!(von = %absender, an = %ziel, art = %art, "Anruf-Anfrage weitergeleitet");
        } else {
            self.state.register.an_identitaet_senden(
                absender,
                RelayMessage::anruf_fehlgeschlagen(format!("{ziel} is not online.")),
            );
        }
    }

    /// Leitet Accept/Decline/End an das Ziel weiter
    ///
    /// Bewusst ohne Zustandspruefung: der Server fuehrt keinerlei
    /// Anruf-Buchhaltung, auch ein Signal ohne vorherige Anfrage wird
    /// weitergeleitet. Unbekanntes Ziel: stilles Verwerfen.
    fn anruf_signal_weiterleiten(
        &self,
        absender: &Identity,
        ziel: Option<Identity>,
        weitergeleitet: RelayMessage,
    ) {
        let Some(ziel) = ziel else {
            tracing::trace!(benutzer = %absender, "Anruf-Signal ohne Ziel verworfen");
            return;
        };
        self.state.register.an_identitaet_senden(&ziel, weitergeleitet);
    }

    // -----------------------------------------------------------------------
    // Gruppenverwaltung
    // -----------------------------------------------------------------------

    fn gruppe_erstellen(&self, absender: &Identity, name: &GruppenName) {
        match self.state.gruppen.erstellen(name, absender.clone()) {
            Ok(()) => {
                self.gruppenliste_senden(absender);
                self.state.register.an_identitaet_senden(
                    absender,
                    RelayMessage::server_notiz(format!("Group '{name}' created.")),
                );
            }
            Err(e) => self.fehler_an(absender, &e),
        }
    }

    fn mitglied_hinzufuegen(&self, absender: &Identity, gruppe: &GruppenName, mitglied: Identity) {
        if !self.state.gruppen.existiert(gruppe) {
            self.fehler_an(absender, &GruppenFehler::NichtGefunden);
            return;
        }

        // Einladen setzt eine registrierte Sitzung voraus –
        // keine Offline-Einladungen
        if !self.state.register.ist_online(&mitglied) {
            self.fehler_an(absender, &GruppenFehler::MitgliedOffline);
            return;
        }

        match self.state.gruppen.mitglied_hinzufuegen(gruppe, mitglied.clone()) {
            Ok(()) => {
                self.gruppenliste_senden(&mitglied);
                self.system_notiz_an_gruppe(gruppe, format!("{absender} added {mitglied}"));
                tracing::info!(gruppe = %gruppe, von = %absender, mitglied = %mitglied, "Mitglied hinzugefuegt");
            }
            Err(e) => self.fehler_an(absender, &e),
        }
    }

    fn gruppe_verlassen(&self, absender: &Identity, gruppe: &GruppenName) {
        use crate::groups::AustrittErgebnis;

        match self.state.gruppen.mitglied_entfernen(gruppe, absender) {
            AustrittErgebnis::NichtMitglied => {}
            AustrittErgebnis::Ausgetreten => {
                self.gruppenliste_senden(absender);
                self.system_notiz_an_gruppe(gruppe, format!("{absender} left the group."));
            }
            AustrittErgebnis::GruppeAufgeloest => {
                // Keine verbleibenden Mitglieder, keine Notiz
                self.gruppenliste_senden(absender);
            }
        }
    }

    /// Sendet eine Systemnotiz als Gruppen-Chat an alle Mitglieder
    fn system_notiz_an_gruppe(&self, gruppe: &GruppenName, text: String) {
        let chat = RelayMessage::chat(
            Identity::neu(SYSTEM_ABSENDER),
            text,
            ChatModus::Group,
            Some(gruppe.als_str().to_string()),
        );
        self.an_gruppe_senden(gruppe, None, chat);
    }

    /// Stellt einen Gruppenfehler als ERROR-Notiz an den Absender zu
    fn fehler_an(&self, absender: &Identity, fehler: &GruppenFehler) {
        self.state
            .register
            .an_identitaet_senden(absender, RelayMessage::fehler(fehler.to_string()));
    }
}
