//! Gruppenverzeichnis – Gruppenname -> Mitglieder + Ersteller
//!
//! Gruppen existieren nur solange sie Mitglieder haben: tritt das letzte
//! Mitglied aus, verschwindet die Gruppe samt Ersteller-Eintrag in einem
//! atomaren Schritt. Mitgliedschaft ist unabhaengig von der Praesenz –
//! ein getrennter Benutzer bleibt Mitglied, Zustellungen ueberspringen
//! ihn lediglich.
//!
//! Das Verzeichnis kennt keine Verbindungen; die Online-Pruefung beim
//! Einladen uebernimmt der Router gegen das SessionRegistry.

use parking_lot::RwLock;
use plausch_core::{GruppenName, Identity};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::GruppenFehler;

// ---------------------------------------------------------------------------
// Gruppe
// ---------------------------------------------------------------------------

/// Eine Gruppe: Ersteller (impliziter Admin) + Mitgliedermenge
#[derive(Debug, Clone)]
struct Gruppe {
    ersteller: Identity,
    mitglieder: BTreeSet<Identity>,
}

/// Ergebnis eines Gruppenaustritts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AustrittErgebnis {
    /// Der Benutzer war kein Mitglied (oder die Gruppe existiert nicht)
    NichtMitglied,
    /// Der Benutzer wurde entfernt, die Gruppe besteht weiter
    Ausgetreten,
    /// Der Benutzer war das letzte Mitglied – die Gruppe wurde geloescht
    GruppeAufgeloest,
}

// ---------------------------------------------------------------------------
// GruppenVerzeichnis
// ---------------------------------------------------------------------------

/// Verzeichnis aller Gruppen
///
/// Thread-safe via Arc + RwLock. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct GruppenVerzeichnis {
    inner: Arc<RwLock<HashMap<GruppenName, Gruppe>>>,
}

impl GruppenVerzeichnis {
    /// Erstellt ein leeres Verzeichnis
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine neue Gruppe mit dem Ersteller als einzigem Mitglied an
    pub fn erstellen(
        &self,
        name: &GruppenName,
        ersteller: Identity,
    ) -> Result<(), GruppenFehler> {
        let mut karte = self.inner.write();
        if karte.contains_key(name) {
            return Err(GruppenFehler::BereitsVorhanden);
        }

        let mut mitglieder = BTreeSet::new();
        mitglieder.insert(ersteller.clone());
        karte.insert(
            name.clone(),
            Gruppe {
                ersteller: ersteller.clone(),
                mitglieder,
            },
        );

        tracing::info!(gruppe = %name, ersteller = %ersteller, "Gruppe erstellt");
        Ok(())
    }

    /// Fuegt ein Mitglied hinzu
    ///
    /// Die Online-Pruefung des neuen Mitglieds erfolgt vor diesem Aufruf
    /// im Router; hier geht es nur um die Verzeichnis-Invarianten.
    pub fn mitglied_hinzufuegen(
        &self,
        name: &GruppenName,
        mitglied: Identity,
    ) -> Result<(), GruppenFehler> {
        let mut karte = self.inner.write();
        let gruppe = karte.get_mut(name).ok_or(GruppenFehler::NichtGefunden)?;

        if !gruppe.mitglieder.insert(mitglied) {
            return Err(GruppenFehler::BereitsMitglied);
        }
        Ok(())
    }

    /// Entfernt ein Mitglied; loescht die Gruppe wenn sie leer wird
    ///
    /// Idempotent: ein bereits fehlendes Mitglied ist kein Fehler.
    pub fn mitglied_entfernen(&self, name: &GruppenName, mitglied: &Identity) -> AustrittErgebnis {
        let mut karte = self.inner.write();
        let Some(gruppe) = karte.get_mut(name) else {
            return AustrittErgebnis::NichtMitglied;
        };

        if !gruppe.mitglieder.remove(mitglied) {
            return AustrittErgebnis::NichtMitglied;
        }

        if gruppe.mitglieder.is_empty() {
            // Gruppe und Ersteller-Eintrag im selben Schreib-Abschnitt
            karte.remove(name);
            tracing::info!(gruppe = %name, "Letztes Mitglied ausgetreten – Gruppe aufgeloest");
            return AustrittErgebnis::GruppeAufgeloest;
        }

        AustrittErgebnis::Ausgetreten
    }

    /// Gibt alle Gruppen zurueck in denen die Identitaet Mitglied ist
    ///
    /// Grundlage der gefilterten Gruppenliste: Mitgliedschaft ist nur
    /// fuer Mitglieder sichtbar.
    pub fn gruppen_von(&self, identitaet: &Identity) -> Vec<GruppenName> {
        let karte = self.inner.read();
        let mut gruppen: Vec<GruppenName> = karte
            .iter()
            .filter(|(_, g)| g.mitglieder.contains(identitaet))
            .map(|(name, _)| name.clone())
            .collect();
        gruppen.sort();
        gruppen
    }

    /// Gibt die Mitglieder einer Gruppe zurueck (leer wenn unbekannt)
    pub fn mitglieder_von(&self, name: &GruppenName) -> Vec<Identity> {
        self.inner
            .read()
            .get(name)
            .map(|g| g.mitglieder.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Gibt den Ersteller einer Gruppe zurueck
    pub fn ersteller_von(&self, name: &GruppenName) -> Option<Identity> {
        self.inner.read().get(name).map(|g| g.ersteller.clone())
    }

    /// Prueft ob eine Gruppe existiert
    pub fn existiert(&self, name: &GruppenName) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Gibt die Anzahl der Gruppen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.read().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erstellen_mit_ersteller_als_einzigem_mitglied() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"team".into(), "alice".into()).unwrap();

        assert!(verzeichnis.existiert(&"team".into()));
        let erwartet: Vec<Identity> = vec!["alice".into()];
        assert_eq!(verzeichnis.mitglieder_von(&"team".into()), erwartet);
        assert_eq!(verzeichnis.ersteller_von(&"team".into()), Some("alice".into()));
    }

    #[test]
    fn doppeltes_erstellen_schlaegt_fehl() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"team".into(), "alice".into()).unwrap();

        let result = verzeichnis.erstellen(&"team".into(), "bob".into());
        assert_eq!(result, Err(GruppenFehler::BereitsVorhanden));
        // Die bestehende Gruppe bleibt unveraendert
        assert_eq!(verzeichnis.ersteller_von(&"team".into()), Some("alice".into()));
    }

    #[test]
    fn mitglied_hinzufuegen_ohne_duplikate() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"team".into(), "alice".into()).unwrap();

        verzeichnis
            .mitglied_hinzufuegen(&"team".into(), "bob".into())
            .unwrap();
        assert_eq!(
            verzeichnis.mitglied_hinzufuegen(&"team".into(), "bob".into()),
            Err(GruppenFehler::BereitsMitglied)
        );

        let mitglieder = verzeichnis.mitglieder_von(&"team".into());
        assert_eq!(mitglieder.len(), 2, "Mitgliedermenge enthaelt keine Duplikate");
    }

    #[test]
    fn hinzufuegen_zu_unbekannter_gruppe() {
        let verzeichnis = GruppenVerzeichnis::neu();
        assert_eq!(
            verzeichnis.mitglied_hinzufuegen(&"phantom".into(), "bob".into()),
            Err(GruppenFehler::NichtGefunden)
        );
    }

    #[test]
    fn letzter_austritt_loescht_gruppe_vollstaendig() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"team".into(), "alice".into()).unwrap();
        verzeichnis
            .mitglied_hinzufuegen(&"team".into(), "bob".into())
            .unwrap();

        assert_eq!(
            verzeichnis.mitglied_entfernen(&"team".into(), &"bob".into()),
            AustrittErgebnis::Ausgetreten
        );
        assert_eq!(
            verzeichnis.mitglied_entfernen(&"team".into(), &"alice".into()),
            AustrittErgebnis::GruppeAufgeloest
        );

        assert!(!verzeichnis.existiert(&"team".into()));
        assert_eq!(verzeichnis.ersteller_von(&"team".into()), None);
        assert!(verzeichnis.gruppen_von(&"alice".into()).is_empty());
        assert!(verzeichnis.mitglieder_von(&"team".into()).is_empty());
    }

    #[test]
    fn austritt_ist_idempotent() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"team".into(), "alice".into()).unwrap();

        assert_eq!(
            verzeichnis.mitglied_entfernen(&"team".into(), &"bob".into()),
            AustrittErgebnis::NichtMitglied
        );
        assert_eq!(
            verzeichnis.mitglied_entfernen(&"phantom".into(), &"bob".into()),
            AustrittErgebnis::NichtMitglied
        );
    }

    #[test]
    fn gruppen_von_filtert_nach_mitgliedschaft() {
        let verzeichnis = GruppenVerzeichnis::neu();
        verzeichnis.erstellen(&"technik".into(), "alice".into()).unwrap();
        verzeichnis.erstellen(&"alltag".into(), "bob".into()).unwrap();
        verzeichnis
            .mitglied_hinzufuegen(&"alltag".into(), "alice".into())
            .unwrap();

        let von_alice: Vec<GruppenName> = vec!["alltag".into(), "technik".into()];
        assert_eq!(verzeichnis.gruppen_von(&"alice".into()), von_alice);
        let von_bob: Vec<GruppenName> = vec!["alltag".into()];
        assert_eq!(verzeichnis.gruppen_von(&"bob".into()), von_bob);
        assert!(verzeichnis.gruppen_von(&"carol".into()).is_empty());
    }
}
