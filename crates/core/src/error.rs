//! Fehlertypen fuer Salon
//!
//! Gemeinsamer Fehler-Enum fuer die Raum-Schnittstelle. Das E2EE-Crate
//! definiert eigene Fehler und konvertiert diesen via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Salon
pub type Result<T> = std::result::Result<T, SalonError>;

/// Fehler an der Grenze zur Raum-Schicht
#[derive(Debug, Error)]
pub enum SalonError {
    #[error("Ereignis-Abonnement fehlgeschlagen: {0}")]
    Abonnement(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SalonError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = SalonError::Abonnement("Raum geschlossen".into());
        assert_eq!(e.to_string(), "Ereignis-Abonnement fehlgeschlagen: Raum geschlossen");
    }

    #[test]
    fn intern_konstruktor() {
        let e = SalonError::intern("kaputt");
        assert_eq!(e.to_string(), "Interner Fehler: kaputt");
    }
}
