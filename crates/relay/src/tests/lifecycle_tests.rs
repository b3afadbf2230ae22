//! Ende-zu-Ende-Tests ueber echte TCP-Verbindungen
//!
//! Fahren einen `RelayServer` auf Port 0 hoch und sprechen das
//! Wire-Protokoll direkt ueber `Framed<TcpStream, LineCodec>`.

use futures_util::{SinkExt, StreamExt};
use plausch_core::Identity;
use plausch_protocol::{ChatModus, LineCodec, RelayMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

use crate::server_state::{RelayKonfiguration, RelayState};
use crate::tcp::RelayServer;

type Klient = Framed<TcpStream, LineCodec>;

async fn server_starten(
    konfiguration: RelayKonfiguration,
) -> (SocketAddr, Arc<RelayState>, watch::Sender<bool>) {
    let state = RelayState::neu(konfiguration);
    let server = RelayServer::binden(Arc::clone(&state), "127.0.0.1:0".parse().unwrap())
        .await
        .expect("Server muss binden");
    let adresse = server.lokale_adresse().unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.starten(shutdown_rx));

    (adresse, state, shutdown_tx)
}

async fn verbinden(adresse: SocketAddr, name: &str) -> Klient {
    let stream = TcpStream::connect(adresse).await.expect("Verbindung muss gelingen");
    let mut framed = Framed::new(stream, LineCodec::neu());
    framed
        .send(RelayMessage::Login { name: name.into() })
        .await
        .unwrap();
    framed
}

/// Liest die naechste Nachricht mit Zeitlimit
async fn naechste(klient: &mut Klient) -> RelayMessage {
    tokio::time::timeout(Duration::from_secs(2), klient.next())
        .await
        .expect("Zeitlimit beim Warten auf eine Nachricht")
        .expect("Verbindung unerwartet beendet")
        .expect("Frame-Fehler")
}

/// Stellt sicher dass innerhalb kurzer Zeit nichts ankommt
async fn erwarte_stille(klient: &mut Klient) {
    let ergebnis = tokio::time::timeout(Duration::from_millis(200), klient.next()).await;
    assert!(ergebnis.is_err(), "Unerwartete Nachricht: {ergebnis:?}");
}

/// Wartet darauf dass die Gegenseite die Verbindung schliesst
async fn erwarte_ende(klient: &mut Klient) {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), klient.next())
            .await
            .expect("Zeitlimit beim Warten auf das Verbindungsende")
        {
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return,
        }
    }
}

#[tokio::test]
async fn login_liefert_begruessung_benutzerliste_und_gruppenliste() {
    let (adresse, _state, _shutdown) = server_starten(RelayKonfiguration::default()).await;
    let mut alice = verbinden(adresse, "alice").await;

    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::server_notiz("Welcome, alice!")
    );
    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::UserList {
            users: vec!["alice".into()],
        }
    );
    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::GroupList { groups: vec![] }
    );
}

#[tokio::test]
async fn public_chat_zwischen_zwei_klienten() {
    let (adresse, _state, _shutdown) = server_starten(RelayKonfiguration::default()).await;

    let mut alice = verbinden(adresse, "alice").await;
    // alice: Begruessung, Benutzerliste, Gruppenliste
    for _ in 0..3 {
        naechste(&mut alice).await;
    }

    let mut bob = verbinden(adresse, "bob").await;
    for _ in 0..3 {
        naechste(&mut bob).await;
    }
    // alice sieht die aktualisierte Benutzerliste nach bobs Login
    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::UserList {
            users: vec!["alice".into(), "bob".into()],
        }
    );

    alice
        .send(RelayMessage::PublicMsg { msg: "hi".into() })
        .await
        .unwrap();

    assert_eq!(
        naechste(&mut bob).await,
        RelayMessage::chat("alice".into(), "hi", ChatModus::Public, None)
    );
    // Kein Server-Echo an den Absender
    erwarte_stille(&mut alice).await;
}

#[tokio::test]
async fn neuer_login_verdraengt_vorherige_sitzung() {
    let (adresse, state, _shutdown) = server_starten(RelayKonfiguration::default()).await;

    let mut erste = verbinden(adresse, "alice").await;
    for _ in 0..3 {
        naechste(&mut erste).await;
    }

    let mut zweite = verbinden(adresse, "alice").await;

    // Die verdraengte Verbindung bekommt die Notiz und danach das Ende
    assert_eq!(
        naechste(&mut erste).await,
        RelayMessage::server_notiz("Logged in on another device. Disconnecting...")
    );
    erwarte_ende(&mut erste).await;

    // Die neue Sitzung bleibt registriert und funktionsfaehig
    assert_eq!(
        naechste(&mut zweite).await,
        RelayMessage::server_notiz("Welcome, alice!")
    );
    assert_eq!(state.register.anzahl(), 1);
    assert_eq!(
        state.register.schnappschuss(),
        vec![Identity::neu("alice")]
    );
}

#[tokio::test]
async fn nachrichten_vor_login_werden_ignoriert() {
    let (adresse, _state, _shutdown) = server_starten(RelayKonfiguration::default()).await;

    let stream = TcpStream::connect(adresse).await.unwrap();
    let mut framed = Framed::new(stream, LineCodec::neu());

    // Ohne Login: still ignoriert, Verbindung bleibt offen
    framed
        .send(RelayMessage::PublicMsg { msg: "hallo?".into() })
        .await
        .unwrap();
    erwarte_stille(&mut framed).await;

    // Login funktioniert anschliessend normal
    framed
        .send(RelayMessage::Login { name: "carol".into() })
        .await
        .unwrap();
    assert_eq!(
        naechste(&mut framed).await,
        RelayMessage::server_notiz("Welcome, carol!")
    );
}

#[tokio::test]
async fn framing_fehler_schliesst_nur_die_eigene_verbindung() {
    let konfiguration = RelayKonfiguration {
        max_frame_groesse: 256,
        ..RelayKonfiguration::default()
    };
    let (adresse, state, _shutdown) = server_starten(konfiguration).await;

    let mut alice = verbinden(adresse, "alice").await;
    for _ in 0..3 {
        naechste(&mut alice).await;
    }

    // Roh-Verbindung die das Limit ohne Trennzeichen ueberschreitet
    let mut roh = TcpStream::connect(adresse).await.unwrap();
    roh.write_all(&[b'x'; 1024]).await.unwrap();
    roh.flush().await.unwrap();

    // Der Server schliesst die fehlerhafte Verbindung...
    let mut kaputt = Framed::new(roh, LineCodec::neu());
    erwarte_ende(&mut kaputt).await;

    // ...und bedient alice weiter
    assert!(state.register.ist_online(&"alice".into()));
    alice
        .send(RelayMessage::PublicMsg { msg: "lebt noch".into() })
        .await
        .unwrap();
    erwarte_stille(&mut alice).await;
}

#[tokio::test]
async fn trennung_aktualisiert_die_benutzerliste() {
    let (adresse, state, _shutdown) = server_starten(RelayKonfiguration::default()).await;

    let mut alice = verbinden(adresse, "alice").await;
    for _ in 0..3 {
        naechste(&mut alice).await;
    }
    let mut bob = verbinden(adresse, "bob").await;
    for _ in 0..3 {
        naechste(&mut bob).await;
    }
    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::UserList {
            users: vec!["alice".into(), "bob".into()],
        }
    );

    drop(bob);

    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::UserList {
            users: vec!["alice".into()],
        }
    );
    assert_eq!(state.register.anzahl(), 1);
}

#[tokio::test]
async fn shutdown_verabschiedet_verbundene_klienten() {
    let (adresse, _state, shutdown) = server_starten(RelayKonfiguration::default()).await;

    let mut alice = verbinden(adresse, "alice").await;
    for _ in 0..3 {
        naechste(&mut alice).await;
    }

    shutdown.send(true).unwrap();

    assert_eq!(
        naechste(&mut alice).await,
        RelayMessage::server_notiz("Server shutting down.")
    );
    erwarte_ende(&mut alice).await;
}
