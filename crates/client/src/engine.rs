//! Client-Engine – Verbindung, Befehle, Ereignisstrom
//!
//! Baut die TCP-Verbindung zum Relay-Server auf und betreibt zwei
//! Tasks: einen Schreib-Task (einziger Schreiber des Sockets, gespeist
//! aus einer Befehls-Queue) und einen Lese-Task der eingehende Frames
//! in [`ClientEreignis`]se uebersetzt und die Anruf-Maschine antreibt.
//!
//! Binaerdaten passieren die Engine-Grenze base64-kodiert Richtung
//! Server und dekodiert Richtung Kollaborateure; nicht dekodierbare
//! Payloads werden mit Warnung verworfen.

use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use plausch_core::{GruppenName, Identity};
use plausch_protocol::{CallType, LineCodec, RelayMessage};
use std::sync::Arc;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::call::{AnrufAktion, AnrufMaschine, AnrufZustand};
use crate::error::ClientFehler;
use crate::events::ClientEreignis;
use crate::media::MedienBruecke;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Befehls-Queue (Engine -> Schreib-Task)
const BEFEHL_QUEUE_GROESSE: usize = 64;

/// Groesse der Ereignis-Queue (Engine -> Praesentation)
const EREIGNIS_QUEUE_GROESSE: usize = 256;

type Schreiber = SplitSink<Framed<TcpStream, LineCodec>, RelayMessage>;
type Leser = SplitStream<Framed<TcpStream, LineCodec>>;

// ---------------------------------------------------------------------------
// ClientEngine
// ---------------------------------------------------------------------------

/// Verbindung zu einem Plausch-Relay-Server
///
/// Clone teilt den inneren Zustand; alle Sende-Operationen sind
/// nicht-blockierend (Einreihen in die Befehls-Queue).
#[derive(Clone)]
pub struct ClientEngine {
    kern: Arc<EngineKern>,
}

struct EngineKern {
    eigener_name: Identity,
    befehl_tx: mpsc::Sender<RelayMessage>,
    ereignis_tx: mpsc::Sender<ClientEreignis>,
    schliessen_tx: watch::Sender<bool>,
    medien: Arc<dyn MedienBruecke>,
    anruf: Mutex<AnrufMaschine>,
    medien_pumpe: Mutex<Option<JoinHandle<()>>>,
}

impl ClientEngine {
    /// Verbindet sich mit dem Server und meldet sich mit `name` an
    ///
    /// Gibt die Engine und den Ereignis-Empfaenger fuer den
    /// Praesentations-Kollaborateur zurueck.
    pub async fn verbinden(
        adresse: impl ToSocketAddrs,
        name: Identity,
        medien: Arc<dyn MedienBruecke>,
    ) -> Result<(Self, mpsc::Receiver<ClientEreignis>), ClientFehler> {
        let stream = TcpStream::connect(adresse).await?;
        let framed = Framed::new(stream, LineCodec::neu());
        let (mut schreiber, leser) = framed.split();

        // Anmeldung direkt senden, bevor die Tasks uebernehmen
        schreiber
            .send(RelayMessage::Login { name: name.clone() })
            .await?;

        let (befehl_tx, befehl_rx) = mpsc::channel(BEFEHL_QUEUE_GROESSE);
        let (ereignis_tx, ereignis_rx) = mpsc::channel(EREIGNIS_QUEUE_GROESSE);
        let (schliessen_tx, schliessen_rx) = watch::channel(false);

        let kern = Arc::new(EngineKern {
            eigener_name: name,
            befehl_tx,
            ereignis_tx,
            schliessen_tx,
            medien,
            anruf: Mutex::new(AnrufMaschine::neu()),
            medien_pumpe: Mutex::new(None),
        });

        tokio::spawn(schreib_schleife(schreiber, befehl_rx, schliessen_rx));
        tokio::spawn(lese_schleife(Arc::clone(&kern), leser));

        Ok((Self { kern }, ereignis_rx))
    }

    /// Gibt den eigenen Anzeigenamen zurueck
    pub fn name(&self) -> &Identity {
        &self.kern.eigener_name
    }

    /// Gibt den aktuellen Anruf-Zustand zurueck
    pub fn anruf_zustand(&self) -> AnrufZustand {
        self.kern.anruf.lock().zustand().clone()
    }

    /// Trennt die Verbindung zum Server
    pub fn trennen(&self) {
        self.kern.medien_stoppen();
        self.kern.anruf.lock().zuruecksetzen();
        let _ = self.kern.schliessen_tx.send(true);
    }

    // -----------------------------------------------------------------------
    // Text-Nachrichten
    // -----------------------------------------------------------------------

    /// Sendet eine oeffentliche Nachricht an alle Teilnehmer
    pub fn oeffentliche_nachricht(&self, text: impl Into<String>) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::PublicMsg { msg: text.into() })
    }

    /// Sendet eine private Nachricht an einen Teilnehmer
    pub fn private_nachricht(
        &self,
        ziel: Identity,
        text: impl Into<String>,
    ) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::PrivateMsg {
            target: ziel,
            msg: text.into(),
        })
    }

    /// Sendet eine Nachricht in eine Gruppe
    pub fn gruppen_nachricht(
        &self,
        gruppe: GruppenName,
        text: impl Into<String>,
    ) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::GroupMsg {
            target: gruppe,
            msg: text.into(),
        })
    }

    // -----------------------------------------------------------------------
    // Dateien und Sprachnotizen
    // -----------------------------------------------------------------------

    /// Sendet eine Datei an einen Teilnehmer, eine Gruppe oder "All"
    pub fn datei_senden(
        &self,
        ziel: &str,
        dateiname: &str,
        inhalt: &[u8],
        ist_gruppe: bool,
    ) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::File {
            target: ziel.to_string(),
            filename: dateiname.to_string(),
            data: BASE64.encode(inhalt),
            is_group: ist_gruppe,
        })
    }

    /// Sendet eine aufgenommene Sprachnotiz
    pub fn sprachnotiz_senden(
        &self,
        ziel: &str,
        inhalt: &[u8],
        ist_gruppe: bool,
    ) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::VoiceMsg {
            target: ziel.to_string(),
            data: BASE64.encode(inhalt),
            is_group: ist_gruppe,
        })
    }

    // -----------------------------------------------------------------------
    // Gruppenverwaltung
    // -----------------------------------------------------------------------

    /// Legt eine neue Gruppe an (der Ersteller ist einziges Mitglied)
    pub fn gruppe_erstellen(&self, name: GruppenName) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::CreateGroup { group_name: name })
    }

    /// Fuegt einen verbundenen Teilnehmer einer Gruppe hinzu
    pub fn mitglied_hinzufuegen(
        &self,
        gruppe: GruppenName,
        mitglied: Identity,
    ) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::AddMember {
            group_name: gruppe,
            member_name: mitglied,
        })
    }

    /// Verlaesst eine Gruppe
    pub fn gruppe_verlassen(&self, gruppe: GruppenName) -> Result<(), ClientFehler> {
        self.senden(RelayMessage::LeaveGroup { group_name: gruppe })
    }

    // -----------------------------------------------------------------------
    // Anrufe
    // -----------------------------------------------------------------------

    /// Initiiert einen Anruf; der Wartezustand ist ueber
    /// [`ClientEngine::anruf_beenden`] abbrechbar
    pub fn anruf_starten(&self, ziel: Identity, art: CallType) -> Result<(), ClientFehler> {
        let anfrage = self.kern.anruf.lock().starten(ziel, art)?;
        if let Err(e) = self.senden(anfrage) {
            self.kern.anruf.lock().zuruecksetzen();
            return Err(e);
        }
        Ok(())
    }

    /// Nimmt den eingehenden Anruf an und startet die Medien
    pub fn anruf_annehmen(&self) -> Result<(), ClientFehler> {
        let antwort = self.kern.anruf.lock().annehmen()?;

        // Die Antwort traegt Partner und Art fuer die Medien-Pumpe
        let pumpe = match &antwort {
            RelayMessage::CallAccepted {
                target: Some(partner),
                call_type,
                ..
            } => Some((partner.clone(), *call_type)),
            _ => None,
        };

        self.senden(antwort)?;
        if let Some((partner, art)) = pumpe {
            self.kern.medien_pumpe_starten(partner, art);
        }
        Ok(())
    }

    /// Lehnt den eingehenden Anruf ab
    pub fn anruf_ablehnen(&self) -> Result<(), ClientFehler> {
        let antwort = self.kern.anruf.lock().ablehnen()?;
        self.senden(antwort)
    }

    /// Beendet den laufenden Anruf oder bricht das eigene Klingeln ab
    pub fn anruf_beenden(&self) -> Result<(), ClientFehler> {
        let ende = self.kern.anruf.lock().beenden();
        if let Some(nachricht) = ende {
            self.senden(nachricht)?;
        }
        self.kern.medien_stoppen();
        self.kern.anruf.lock().abgeschlossen();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    fn senden(&self, nachricht: RelayMessage) -> Result<(), ClientFehler> {
        self.kern
            .befehl_tx
            .try_send(nachricht)
            .map_err(|_| ClientFehler::Getrennt)
    }
}

impl EngineKern {
    /// Uebersetzt einen eingehenden Frame in Ereignisse und Aktionen
    async fn eingehend(&self, nachricht: RelayMessage) {
        match nachricht {
            RelayMessage::Chat {
                from,
                msg,
                mode,
                chat_id,
            } => {
                self.ereignis(ClientEreignis::Chat {
                    von: from,
                    text: msg,
                    modus: mode,
                    chat_id,
                    empfangen_um: Utc::now(),
                })
                .await;
            }

            RelayMessage::FileRx {
                from,
                filename,
                data,
                mode,
                chat_id,
            } => match BASE64.decode(&data) {
                Ok(daten) => {
                    self.ereignis(ClientEreignis::DateiEmpfangen {
                        von: from,
                        dateiname: filename,
                        daten,
                        modus: mode,
                        chat_id,
                    })
                    .await;
                }
                Err(e) => {
                    tracing::warn!(von = %from, fehler = %e, "Undekodierbarer Datei-Payload verworfen");
                }
            },

            RelayMessage::VoiceRx {
                from,
                data,
                mode,
                chat_id,
                ..
            } => match BASE64.decode(&data) {
                Ok(daten) => {
                    self.ereignis(ClientEreignis::SprachnotizEmpfangen {
                        von: from,
                        daten,
                        modus: mode,
                        chat_id,
                    })
                    .await;
                }
                Err(e) => {
                    tracing::warn!(von = %from, fehler = %e, "Undekodierbare Sprachnotiz verworfen");
                }
            },

            RelayMessage::UserList { users } => {
                self.ereignis(ClientEreignis::BenutzerListe { benutzer: users })
                    .await;
            }

            RelayMessage::GroupList { groups } => {
                self.ereignis(ClientEreignis::GruppenListe { gruppen: groups })
                    .await;
            }

            RelayMessage::Server { msg } => {
                self.ereignis(ClientEreignis::ServerNotiz { text: msg }).await;
            }

            RelayMessage::Error { msg } => {
                self.ereignis(ClientEreignis::FehlerNotiz { text: msg }).await;
            }

            // Empfangene Medienrahmen gehen direkt an den Kollaborateur
            RelayMessage::VideoStream { data, .. } => {
                self.stream_rahmen(CallType::Video, &data);
            }
            RelayMessage::AudioStream { data, .. } => {
                self.stream_rahmen(CallType::Audio, &data);
            }

            // Anruf-Signale treiben die Zustandsmaschine
            n @ (RelayMessage::VideoCallRequest { .. }
            | RelayMessage::AudioCallRequest { .. }
            | RelayMessage::CallAccepted { .. }
            | RelayMessage::CallDeclined { .. }
            | RelayMessage::CallEnded { .. }
            | RelayMessage::CallFailed { .. }) => {
                let aktion = self.anruf.lock().nachricht_verarbeiten(&n);
                self.aktion_ausfuehren(aktion).await;
            }

            andere => {
                tracing::trace!(nachricht = ?andere, "Nachricht in falscher Richtung ignoriert");
            }
        }
    }

    async fn aktion_ausfuehren(&self, aktion: AnrufAktion) {
        match aktion {
            AnrufAktion::Keine => {}

            AnrufAktion::Eingehend { von, art } => {
                self.ereignis(ClientEreignis::AnrufEingehend { von, art }).await;
            }

            AnrufAktion::Angenommen { partner, art } => {
                self.medien_pumpe_starten(partner.clone(), art);
                self.ereignis(ClientEreignis::AnrufAngenommen { partner, art })
                    .await;
            }

            AnrufAktion::Abgelehnt { von } => {
                self.ereignis(ClientEreignis::AnrufAbgelehnt { von }).await;
            }

            AnrufAktion::Beendet { von } => {
                self.medien_stoppen();
                self.ereignis(ClientEreignis::AnrufBeendet { von }).await;
            }

            AnrufAktion::Fehlgeschlagen { grund } => {
                self.ereignis(ClientEreignis::AnrufFehlgeschlagen { grund })
                    .await;
            }
        }
    }

    /// Leitet Capture-Rahmen des Kollaborateurs als Stream-Nachrichten
    /// an den Anrufpartner
    fn medien_pumpe_starten(&self, partner: Identity, art: CallType) {
        self.medien_stoppen();

        let mut rahmen_rx = self.medien.aufnahme_starten(art);
        let befehl_tx = self.befehl_tx.clone();

        let handle = tokio::spawn(async move {
            while let Some(rahmen) = rahmen_rx.recv().await {
                let data = BASE64.encode(&rahmen);
                let nachricht = match art {
                    CallType::Video => RelayMessage::VideoStream {
                        target: partner.clone(),
                        data,
                    },
                    CallType::Audio => RelayMessage::AudioStream {
                        target: partner.clone(),
                        data,
                    },
                };
                if befehl_tx.send(nachricht).await.is_err() {
                    break;
                }
            }
        });

        *self.medien_pumpe.lock() = Some(handle);
    }

    fn medien_stoppen(&self) {
        if let Some(pumpe) = self.medien_pumpe.lock().take() {
            pumpe.abort();
        }
        self.medien.aufnahme_stoppen();
    }

    /// Empfangenen Stream-Rahmen zur Wiedergabe reichen
    ///
    /// Nur waehrend eines aktiven Anrufs; verspaetete Rahmen nach dem
    /// Anrufende werden verworfen.
    fn stream_rahmen(&self, art: CallType, data: &str) {
        if !self.anruf.lock().ist_aktiv() {
            return;
        }
        match BASE64.decode(data) {
            Ok(daten) => self.medien.rahmen_abspielen(art, daten),
            Err(e) => {
                tracing::warn!(fehler = %e, "Undekodierbarer Stream-Rahmen verworfen");
            }
        }
    }

    async fn ereignis(&self, ereignis: ClientEreignis) {
        if self.ereignis_tx.send(ereignis).await.is_err() {
            tracing::debug!("Ereignis-Empfaenger geschlossen");
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Schreib-Task: einziger Schreiber des Sockets
async fn schreib_schleife(
    mut schreiber: Schreiber,
    mut befehl_rx: mpsc::Receiver<RelayMessage>,
    mut schliessen_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            befehl = befehl_rx.recv() => match befehl {
                Some(nachricht) => {
                    if let Err(e) = schreiber.send(nachricht).await {
                        tracing::warn!(fehler = %e, "Senden an den Server fehlgeschlagen");
                        break;
                    }
                }
                None => break,
            },

            Ok(()) = schliessen_rx.changed() => {
                if *schliessen_rx.borrow() {
                    let _ = schreiber.close().await;
                    break;
                }
            }
        }
    }
    tracing::debug!("Schreib-Task beendet");
}

/// Lese-Task: uebersetzt Frames, beendet den Anruf bei
/// Verbindungsverlust
async fn lese_schleife(kern: Arc<EngineKern>, mut leser: Leser) {
    while let Some(frame) = leser.next().await {
        match frame {
            Ok(nachricht) => kern.eingehend(nachricht).await,
            Err(e) => {
                tracing::warn!(fehler = %e, "Lesefehler – Verbindung wird beendet");
                break;
            }
        }
    }

    // Verbindungsverlust: Medien stoppen, Anruf-Zustand aufgeben
    kern.medien_stoppen();
    kern.anruf.lock().zuruecksetzen();
    kern.ereignis(ClientEreignis::Getrennt).await;
    let _ = kern.schliessen_tx.send(true);
}
