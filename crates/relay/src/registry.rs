//! Sitzungs-Registry – Identitaet -> lebende Verbindung
//!
//! Verwaltet die Bindung von Anzeigenamen an Verbindungen und setzt die
//! Kern-Invariante durch: hoechstens eine lebende Verbindung pro
//! Identitaet. Ein neuer Login verdraengt die vorherige Verbindung
//! (Notiz senden, dann schliessen) – asynchron, damit eine haengende
//! alte Verbindung den neuen Login nie verzoegert.
//!
//! ## Nebenlaeufigkeit
//! Ein einzelner Mutex um eine `BTreeMap`: Mutationen und
//! `schnappschuss()` sind damit linearisierbar, und die Iteration
//! liefert eine stabil sortierte Benutzerliste.

use parking_lot::Mutex;
use plausch_core::{ConnectionId, Identity};
use plausch_protocol::RelayMessage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
pub const SENDE_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer verbundenen Identitaet
///
/// `senden` ist nicht-blockierend: eine volle Queue verwirft die
/// Nachricht, damit ein langsamer Empfaenger die Zustellung an andere
/// nie aufhaelt. `schliessen` signalisiert dem Verbindungs-Task die
/// Restqueue zu leeren und die Verbindung zu beenden (Verdraengung).
#[derive(Clone)]
pub struct ClientSender {
    identitaet: Identity,
    verbindung: ConnectionId,
    tx: mpsc::Sender<RelayMessage>,
    schliessen_tx: Arc<watch::Sender<bool>>,
}

impl ClientSender {
    /// Erstellt einen neuen ClientSender
    pub fn neu(
        identitaet: Identity,
        verbindung: ConnectionId,
        tx: mpsc::Sender<RelayMessage>,
        schliessen_tx: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            identitaet,
            verbindung,
            tx,
            schliessen_tx,
        }
    }

    /// Gibt die gebundene Identitaet zurueck
    pub fn identitaet(&self) -> &Identity {
        &self.identitaet
    }

    /// Gibt die Verbindungs-ID zurueck
    pub fn verbindung(&self) -> ConnectionId {
        self.verbindung
    }

    /// Reiht eine Nachricht nicht-blockierend in die Send-Queue ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: RelayMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    benutzer = %self.identitaet,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    benutzer = %self.identitaet,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }

    /// Signalisiert dem Verbindungs-Task die Verbindung zu beenden
    pub fn schliessen(&self) {
        let _ = self.schliessen_tx.send(true);
    }
}

impl std::fmt::Debug for ClientSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSender")
            .field("identitaet", &self.identitaet)
            .field("verbindung", &self.verbindung)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Registry aller aktiven Sitzungen (Identitaet -> ClientSender)
///
/// Thread-safe via Arc + Mutex. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<BTreeMap<Identity, ClientSender>>>,
}

impl SessionRegistry {
    /// Erstellt ein leeres Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Bindet eine Identitaet an eine Verbindung
    ///
    /// Gibt die vorherige Bindung zurueck, falls die Identitaet bereits
    /// vergeben war. Der Aufrufer stellt die Verdraengung (Notiz +
    /// Schliessen) asynchron fertig – diese Methode blockiert nie auf
    /// der alten Verbindung.
    pub fn registrieren(&self, sender: ClientSender) -> Option<ClientSender> {
        let mut karte = self.inner.lock();
        karte.insert(sender.identitaet.clone(), sender)
    }

    /// Entfernt die Bindung, aber nur wenn sie noch auf diese Verbindung
    /// zeigt
    ///
    /// Schuetzt davor, dass eine bereits verdraengte Verbindung die
    /// Bindung ihres Nachfolgers entfernt. Gibt `true` zurueck wenn
    /// tatsaechlich ausgetragen wurde.
    pub fn austragen(&self, identitaet: &Identity, verbindung: ConnectionId) -> bool {
        let mut karte = self.inner.lock();
        match karte.get(identitaet) {
            Some(sender) if sender.verbindung == verbindung => {
                karte.remove(identitaet);
                true
            }
            _ => false,
        }
    }

    /// Schlaegt die lebende Verbindung einer Identitaet nach
    pub fn nachschlagen(&self, identitaet: &Identity) -> Option<ClientSender> {
        self.inner.lock().get(identitaet).cloned()
    }

    /// Prueft ob eine Identitaet aktuell registriert ist
    pub fn ist_online(&self, identitaet: &Identity) -> bool {
        self.inner.lock().contains_key(identitaet)
    }

    /// Gibt alle registrierten Identitaeten in sortierter Reihenfolge
    /// zurueck
    pub fn schnappschuss(&self) -> Vec<Identity> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Gibt die Anzahl der registrierten Sitzungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.lock().len()
    }

    /// Sendet eine Nachricht an eine einzelne Identitaet
    ///
    /// Gibt `true` zurueck wenn das Ziel registriert war und die
    /// Nachricht eingereiht wurde.
    pub fn an_identitaet_senden(&self, identitaet: &Identity, nachricht: RelayMessage) -> bool {
        match self.nachschlagen(identitaet) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::trace!(benutzer = %identitaet, "Zustellung an unbekannte Identitaet verworfen");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle registrierten Identitaeten ausser
    /// einer
    ///
    /// Gibt die Anzahl der erfolgreichen Einreihungen zurueck.
    pub fn an_alle_ausser_senden(
        &self,
        ausgeschlossen: &Identity,
        nachricht: RelayMessage,
    ) -> usize {
        let sender: Vec<ClientSender> = {
            let karte = self.inner.lock();
            karte
                .values()
                .filter(|s| &s.identitaet != ausgeschlossen)
                .cloned()
                .collect()
        };

        let mut gesendet = 0;
        for s in sender {
            if s.senden(nachricht.clone()) {
                gesendet += 1;
            }
        }
        gesendet
    }

    /// Verteilt die aktuelle Benutzerliste an alle registrierten
    /// Verbindungen
    ///
    /// Wird nach jedem wirksamen Registrieren/Austragen aufgerufen.
    /// Liste und Empfaengermenge stammen aus demselben Lock-Abschnitt.
    pub fn benutzerliste_verteilen(&self) {
        let (benutzer, sender) = {
            let karte = self.inner.lock();
            let benutzer: Vec<Identity> = karte.keys().cloned().collect();
            let sender: Vec<ClientSender> = karte.values().cloned().collect();
            (benutzer, sender)
        };

        let nachricht = RelayMessage::UserList { users: benutzer };
        for s in sender {
            s.senden(nachricht.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
