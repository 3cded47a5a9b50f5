//! E2EE-Konfiguration
//!
//! Wird aus einer TOML-Datei geladen. Alle Felder haben Standardwerte,
//! sodass der Koordinator auch ohne Konfigurationsdatei lauffaehig ist.

use serde::{Deserialize, Serialize};

use crate::types::E2eeAlgorithm;

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
pub const CONFIG_ENV: &str = "SALON_CONFIG";

/// Vollstaendige Konfiguration des E2EE-Subsystems
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SalonConfig {
    /// Koordinator-Einstellungen
    pub e2ee: E2eeEinstellungen,
    /// Einstellungen des Standard-Key-Providers
    pub schluessel: SchluesselEinstellungen,
    /// Einstellungen der Ereignis-Verteilung
    pub ereignisse: EreignisEinstellungen,
}

/// Koordinator-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eeEinstellungen {
    /// Anfangswert des globalen Enable-Flags
    pub aktiviert: bool,
    /// Algorithmus, mit dem neue Sessions erstellt werden
    pub algorithmus: E2eeAlgorithm,
}

impl Default for E2eeEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            algorithmus: E2eeAlgorithm::AesGcm,
        }
    }
}

/// Einstellungen des Standard-Key-Providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Base64-kodierter Shared Key (gesetzt = Shared-Key-Modus)
    pub shared_key: Option<String>,
    /// Salt fuer Ratchet-Schritte
    pub ratchet_salt: String,
    /// Laenge neu erzeugter Schluessel in Bytes
    pub schluessel_laenge: usize,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self {
            shared_key: None,
            ratchet_salt: crate::keys::ratchet::STANDARD_RATCHET_SALT.into(),
            schluessel_laenge: 32,
        }
    }
}

/// Einstellungen der Ereignis-Verteilung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EreignisEinstellungen {
    /// Kapazitaet der Queue pro Teilnehmer
    pub queue_groesse: usize,
    /// Kapazitaet des Raum-Broadcast-Kanals
    pub raum_kapazitaet: usize,
}

impl Default for EreignisEinstellungen {
    fn default() -> Self {
        Self {
            queue_groesse: 64,
            raum_kapazitaet: 256,
        }
    }
}

impl SalonConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Laedt die Konfiguration vom Pfad aus `SALON_CONFIG` (Standard: `salon.toml`)
    pub fn aus_umgebung() -> anyhow::Result<Self> {
        let pfad = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "salon.toml".into());
        Self::laden(&pfad)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.ereignisse.queue_groesse == 0 {
            anyhow::bail!("ereignisse.queue_groesse muss groesser als 0 sein");
        }
        if self.ereignisse.raum_kapazitaet == 0 {
            anyhow::bail!("ereignisse.raum_kapazitaet muss groesser als 0 sein");
        }
        if self.schluessel.schluessel_laenge == 0 {
            anyhow::bail!("schluessel.schluessel_laenge muss groesser als 0 sein");
        }
        Ok(())
    }
}
