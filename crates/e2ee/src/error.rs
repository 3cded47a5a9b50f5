//! Fehlertypen fuer das E2EE-Subsystem
//!
//! Nur Lebenszyklus- und Schluesselfehler sind echte Fehler. Laufzeit-
//! zustaende der Crypto-Sessions (fehlender Schluessel, Entschluesselung
//! fehlgeschlagen, ...) werden als `EncryptionHealth`-Ereignisse verteilt.

use salon_core::{SalonError, TrackId};
use thiserror::Error;

/// Fehler im E2EE-Subsystem
#[derive(Debug, Error)]
pub enum E2eeError {
    #[error("Crypto-Session fuer Track {track_id} konnte nicht erstellt werden: {grund}")]
    SessionErstellung { track_id: TrackId, grund: String },

    #[error("Key-Provider-Fehler: {0}")]
    KeyProvider(String),

    #[error("Ratchet fuer Teilnehmer {participant_id} fehlgeschlagen: {grund}")]
    Ratchet {
        participant_id: String,
        grund: String,
    },

    #[error("Unbekannter Crypto-Zustand: {0}")]
    UnbekannterZustand(i32),

    #[error("Shared-Key-Modus aktiv, aber kein Shared Key vorhanden")]
    KeinSharedKey,

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Raum(#[from] SalonError),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl E2eeError {
    /// Erstellungsfehler aus einer beliebigen Ursache
    pub fn erstellung(track_id: &TrackId, grund: impl std::fmt::Display) -> Self {
        Self::SessionErstellung {
            track_id: track_id.clone(),
            grund: grund.to_string(),
        }
    }
}

pub type E2eeResult<T> = Result<T, E2eeError>;
