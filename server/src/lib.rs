//! plausch-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use plausch_relay::{RelayKonfiguration, RelayServer, RelayState};
use std::net::SocketAddr;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Relay-Server und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. TCP-Listener binden
    /// 2. Ctrl-C-Handler einrichten
    /// 3. Verbindungen annehmen bis zum Signal
    pub async fn starten(self) -> Result<()> {
        let bind_addr: SocketAddr = self.config.tcp_bind_adresse().parse()?;

        let state = RelayState::neu(RelayKonfiguration {
            server_name: self.config.server.name.clone(),
            max_clients: self.config.server.max_clients,
            max_frame_groesse: self.config.protokoll.max_frame_groesse,
        });

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let relay = RelayServer::binden(state, bind_addr).await?;

        // Ctrl-C in das Shutdown-Signal uebersetzen
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        relay.starten(shutdown_rx).await?;
        Ok(())
    }
}
