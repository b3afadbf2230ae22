//! Szenario-Tests fuer den Relay-Service
//!
//! `router_tests` prueft die Weiterleitungstabelle direkt gegen
//! Registry und Verzeichnis; `lifecycle_tests` fahren einen echten
//! TCP-Server hoch und pruefen Login, Verdraengung und Trennung
//! Ende-zu-Ende.

mod lifecycle_tests;
