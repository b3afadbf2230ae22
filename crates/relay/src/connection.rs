//! Client-Verbindung – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Dieser Task ist der einzige Schreiber des Sockets:
//! ausgehende Nachrichten anderer Tasks laufen ueber die Send-Queue und
//! werden hier serialisiert geschrieben.
//!
//! ## Lebenszyklus
//! ```text
//! Verbunden --LOGIN--> Angemeldet --(EOF | Framing-Fehler |
//!                                    Verdraengung | Shutdown)--> Ende
//! ```
//!
//! Nachrichten vor dem Login (ausser `LOGIN`) werden still ignoriert.
//! Ein fataler Framing-Fehler schliesst nur diese Verbindung; andere
//! Verbindungen laufen weiter.

use futures_util::{SinkExt, StreamExt};
use plausch_core::{ConnectionId, Identity};
use plausch_protocol::{LineCodec, RelayMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

use crate::registry::{ClientSender, SENDE_QUEUE_GROESSE};
use crate::router::RelayRouter;
use crate::server_state::RelayState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `LineCodec`, uebergibt sie nach dem Login an den
/// `RelayRouter` und schreibt ausgehende Nachrichten aus der Send-Queue.
pub struct ClientConnection {
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<RelayState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird, ein Framing-Fehler
    /// auftritt, die Sitzung verdraengt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let verbindung = ConnectionId::new();

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        let mut framed = Framed::new(
            stream,
            LineCodec::mit_max_groesse(self.state.konfiguration.max_frame_groesse),
        );

        // Ausgehende Nachrichten-Queue (Router -> TCP)
        let (sende_tx, mut sende_rx) = mpsc::channel::<RelayMessage>(SENDE_QUEUE_GROESSE);

        // Verdraengungs-Signal: ein neuer Login derselben Identitaet
        // beendet diese Verbindung asynchron
        let (schliessen_tx, mut schliessen_rx) = watch::channel(false);
        let schliessen_tx = Arc::new(schliessen_tx);

        let router = RelayRouter::neu(Arc::clone(&self.state));
        let mut identitaet: Option<Identity> = None;

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(RelayMessage::Login { name })) => {
                            // Re-Login unter neuem Namen gibt die alte
                            // Identitaet frei
                            if let Some(alte) = identitaet.take() {
                                if alte != name
                                    && self.state.register.austragen(&alte, verbindung)
                                {
                                    self.state.register.benutzerliste_verteilen();
                                }
                            }

                            let sender = ClientSender::neu(
                                name.clone(),
                                verbindung,
                                sende_tx.clone(),
                                Arc::clone(&schliessen_tx),
                            );

                            if let Some(vorherige) = self.state.register.registrieren(sender) {
                                // Nicht sich selbst verdraengen (gleicher
                                // Name auf derselben Verbindung)
                                if vorherige.verbindung() != verbindung {
                                    vorherige.senden(RelayMessage::server_notiz(
                                        "Logged in on another device. Disconnecting...",
                                    ));
                                    vorherige.schliessen();
                                    tracing::info!(
                                        benutzer = %name,
                                        "Vorherige Sitzung verdraengt"
                                    );
                                }
                            }

                            identitaet = Some(name.clone());
                            tracing::info!(peer = %peer_addr, benutzer = %name, "Angemeldet");

                            if framed
                                .send(RelayMessage::server_notiz(format!("Welcome, {name}!")))
                                .await
                                .is_err()
                            {
                                break;
                            }
                            self.state.register.benutzerliste_verteilen();
                            router.gruppenliste_senden(&name);
                        }

                        Some(Ok(nachricht)) => match &identitaet {
                            Some(absender) => router.verteilen(absender, nachricht),
                            None => {
                                tracing::trace!(
                                    peer = %peer_addr,
                                    "Nachricht vor Login ignoriert"
                                );
                            }
                        },

                        Some(Err(e)) => {
                            // Framing-Fehler sind verbindungsfatal
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler – Verbindung wird geschlossen"
                            );
                            break;
                        }

                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Verdraengung durch neuen Login
                Ok(()) = schliessen_rx.changed() => {
                    if *schliessen_rx.borrow() {
                        // Restliche Queue leeren damit die
                        // Verdraengungs-Notiz den Client noch erreicht
                        while let Ok(rest) = sende_rx.try_recv() {
                            if framed.send(rest).await.is_err() {
                                break;
                            }
                        }
                        tracing::info!(
                            peer = %peer_addr,
                            "Verbindung durch neuen Login geschlossen"
                        );
                        break;
                    }
                }

                // Server-Shutdown
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        let _ = framed
                            .send(RelayMessage::server_notiz("Server shutting down."))
                            .await;
                        tracing::info!(peer = %peer_addr, "Shutdown – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup: Bindung nur loesen wenn sie noch dieser Verbindung
        // gehoert (eine verdraengte Sitzung gehoert dem Nachfolger)
        if let Some(id) = identitaet {
            if self.state.register.austragen(&id, verbindung) {
                self.state.register.benutzerliste_verteilen();
                tracing::info!(peer = %peer_addr, benutzer = %id, "Abgemeldet");
            }
        }

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}
