//! Key-Provider – Schluessel-Politik der Crypto-Sessions
//!
//! Der Koordinator spricht ausschliesslich mit dem [`KeyProvider`]-Trait.
//! [`DerivedKeyProvider`] ist die Standard-Implementierung:
//! - Shared-Key-Modus: ein Schluessel fuer alle Sessions
//! - sonst: Schluessel pro Teilnehmer, Ratchet per HKDF

use std::collections::BTreeMap;

use base64::Engine as _;
use dashmap::DashMap;
use parking_lot::RwLock;
use salon_core::{ParticipantId, SessionId};

use crate::config::SchluesselEinstellungen;
use crate::error::{E2eeError, E2eeResult};
use crate::keys::ratchet;
use crate::types::KeyMaterial;

/// Schluessel-Politik, die der Koordinator bei jeder Session-Erstellung
/// und jedem globalen Enable-Wechsel befragt
pub trait KeyProvider: Send + Sync + 'static {
    /// true wenn ein einziger Schluessel fuer alle Sessions gilt
    fn is_shared_key_mode(&self) -> bool;

    /// Der Shared Key (nur im Shared-Key-Modus vorhanden)
    fn shared_key(&self) -> Option<KeyMaterial>;

    /// Setzt den Schluessel einer Session an einem Index
    fn set_key(&self, session_id: &SessionId, index: u32, key: KeyMaterial) -> E2eeResult<()>;

    /// Ratchet den Schluessel eines Teilnehmers an einem Index und gibt den
    /// neuen Schluessel zurueck
    fn ratchet_key(&self, participant_id: &ParticipantId, index: u32) -> E2eeResult<KeyMaterial>;

    /// Session wurde entsorgt; zugehoeriges Schluesselmaterial darf weg
    fn forget_session(&self, _session_id: &SessionId) {}
}

/// Schluessel pro Index
type KeyRing = BTreeMap<u32, KeyMaterial>;

/// Standard-Key-Provider mit HKDF-Ratchet
#[derive(Debug)]
pub struct DerivedKeyProvider {
    /// Shared Key (Some = Shared-Key-Modus)
    shared_key: RwLock<Option<KeyMaterial>>,
    /// Schluessel pro Session (session_id -> Index -> Schluessel)
    session_keys: DashMap<SessionId, KeyRing>,
    /// Schluessel pro Teilnehmer (participant_id -> Index -> Schluessel)
    participant_keys: DashMap<ParticipantId, KeyRing>,
    ratchet_salt: Vec<u8>,
    /// Laenge neu erzeugter Schluessel
    schluessel_laenge: usize,
}

impl DerivedKeyProvider {
    /// Provider im Teilnehmer-Modus
    pub fn neu(ratchet_salt: impl Into<Vec<u8>>) -> Self {
        Self {
            shared_key: RwLock::new(None),
            session_keys: DashMap::new(),
            participant_keys: DashMap::new(),
            ratchet_salt: ratchet_salt.into(),
            schluessel_laenge: 32,
        }
    }

    /// Provider im Shared-Key-Modus
    pub fn mit_shared_key(key: KeyMaterial, ratchet_salt: impl Into<Vec<u8>>) -> Self {
        let provider = Self::neu(ratchet_salt);
        *provider.shared_key.write() = Some(key);
        provider
    }

    /// Erstellt den Provider aus der Konfiguration
    ///
    /// Ein konfigurierter `shared_key` (Base64) aktiviert den Shared-Key-Modus.
    pub fn aus_config(config: &SchluesselEinstellungen) -> E2eeResult<Self> {
        let salt = config.ratchet_salt.as_bytes().to_vec();
        let mut provider = match &config.shared_key {
            Some(kodiert) => {
                let bytes = base64::engine::general_purpose::STANDARD.decode(kodiert)?;
                if bytes.is_empty() {
                    return Err(E2eeError::Konfiguration(
                        "shared_key darf nicht leer sein".to_string(),
                    ));
                }
                Self::mit_shared_key(KeyMaterial::new(bytes), salt)
            }
            None => Self::neu(salt),
        };
        provider.schluessel_laenge = config.schluessel_laenge;
        Ok(provider)
    }

    /// Setzt (oder ersetzt) den Shared Key und aktiviert damit den Shared-Key-Modus
    pub fn set_shared_key(&self, key: KeyMaterial) {
        *self.shared_key.write() = Some(key);
        tracing::info!("Shared Key gesetzt");
    }

    /// Erzeugt einen zufaelligen Shared Key, setzt ihn und gibt ihn zurueck
    /// (z.B. zum Verteilen an die anderen Teilnehmer)
    pub fn generate_shared_key(&self) -> KeyMaterial {
        let key = KeyMaterial::zufaellig(self.schluessel_laenge);
        self.set_shared_key(key.clone());
        key
    }

    /// Setzt den Schluessel eines Teilnehmers
    pub fn set_participant_key(&self, participant_id: &ParticipantId, index: u32, key: KeyMaterial) {
        self.participant_keys
            .entry(participant_id.clone())
            .or_default()
            .insert(index, key);
    }

    /// Gibt den Schluessel eines Teilnehmers zurueck
    pub fn participant_key(&self, participant_id: &ParticipantId, index: u32) -> Option<KeyMaterial> {
        self.participant_keys
            .get(participant_id)
            .and_then(|ring| ring.get(&index).cloned())
    }

    /// Gibt den Schluessel einer Session zurueck
    pub fn session_key(&self, session_id: &SessionId, index: u32) -> Option<KeyMaterial> {
        self.session_keys
            .get(session_id)
            .and_then(|ring| ring.get(&index).cloned())
    }

    /// Entfernt alle Schluessel eines Teilnehmers (bei Austritt)
    pub fn remove_participant(&self, participant_id: &ParticipantId) {
        self.participant_keys.remove(participant_id);
    }

    /// Anzahl der Sessions mit Schluesselmaterial
    pub fn session_anzahl(&self) -> usize {
        self.session_keys.len()
    }
}

impl KeyProvider for DerivedKeyProvider {
    fn is_shared_key_mode(&self) -> bool {
        self.shared_key.read().is_some()
    }

    fn shared_key(&self) -> Option<KeyMaterial> {
        self.shared_key.read().clone()
    }

    fn set_key(&self, session_id: &SessionId, index: u32, key: KeyMaterial) -> E2eeResult<()> {
        if key.is_empty() {
            return Err(E2eeError::KeyProvider(format!(
                "Leerer Schluessel fuer Session {session_id}"
            )));
        }
        self.session_keys
            .entry(session_id.clone())
            .or_default()
            .insert(index, key);
        Ok(())
    }

    fn ratchet_key(&self, participant_id: &ParticipantId, index: u32) -> E2eeResult<KeyMaterial> {
        // Shared-Key-Modus: der gemeinsame Schluessel wird geratchetet
        {
            let mut shared = self.shared_key.write();
            if let Some(current) = shared.as_ref() {
                let next = ratchet::ratchet(current, &self.ratchet_salt)?;
                *shared = Some(next.clone());
                return Ok(next);
            }
        }

        let mut ring = self.participant_keys.get_mut(participant_id).ok_or_else(|| {
            E2eeError::KeyProvider(format!("Kein Schluessel fuer Teilnehmer {participant_id}"))
        })?;
        let current = ring.get(&index).ok_or_else(|| {
            E2eeError::KeyProvider(format!(
                "Kein Schluessel fuer Teilnehmer {participant_id} an Index {index}"
            ))
        })?;
        let next = ratchet::ratchet(current, &self.ratchet_salt)?;
        ring.insert(index, next.clone());
        Ok(next)
    }

    fn forget_session(&self, session_id: &SessionId) {
        self.session_keys.remove(session_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
