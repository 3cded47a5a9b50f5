//! Schnittstelle zur externen Frame-Crypto-Engine
//!
//! Die eigentliche Frame-Ver-/Entschluesselung passiert ausserhalb dieses
//! Crates. Der Koordinator sieht nur eine Session pro RTP-Sender bzw.
//! -Receiver und die Fabrik, die solche Sessions erzeugt.

use std::sync::Arc;

use async_trait::async_trait;
use salon_core::{SessionId, TrackId};

use crate::keys::KeyProvider;
use crate::types::E2eeAlgorithm;

/// Callback fuer Zustandsaenderungen einer Session
///
/// Erhaelt die Track-ID und den rohen Zustandscode der Engine. Wird
/// ausserhalb der Lebenszyklus-Verarbeitung aufgerufen und darf nicht
/// blockieren.
pub type StateCallback = Box<dyn Fn(&TrackId, i32) + Send + Sync>;

/// Eine aktive Crypto-Session (ein Sender oder ein Receiver)
#[async_trait]
pub trait CryptoSession: Send + Sync + 'static {
    /// Schaltet die Ver-/Entschluesselung ein oder aus
    fn set_enabled(&self, enabled: bool);

    /// Waehlt den aktiven Schluessel-Index
    fn set_key_index(&self, index: u32);

    /// Teilt der Engine den Codec des Tracks mit
    fn update_codec(&self, codec: &str);

    /// Registriert den Zustands-Callback (ersetzt einen vorherigen)
    fn on_state_changed(&self, callback: StateCallback);

    /// Gibt die nativen Ressourcen frei
    async fn dispose(&self);
}

/// Fabrik fuer Crypto-Sessions
///
/// Jeder Session wird das Handle des Key-Providers mitgegeben, damit die
/// Engine Schluessel selbst nachschlagen kann.
#[async_trait]
pub trait CryptoSessionFactory: Send + Sync + 'static {
    /// Opake Referenz auf einen RTP-Sender
    type SenderRef: Send + 'static;
    /// Opake Referenz auf einen RTP-Receiver
    type ReceiverRef: Send + 'static;
    /// Konkreter Session-Typ
    type Session: CryptoSession;
    /// Opaker Erstellungsfehler der Engine
    type Error: std::fmt::Display + Send;

    async fn create_for_sender(
        &self,
        session_id: &SessionId,
        sender: Self::SenderRef,
        algorithm: E2eeAlgorithm,
        key_provider: Arc<dyn KeyProvider>,
    ) -> Result<Self::Session, Self::Error>;

    async fn create_for_receiver(
        &self,
        session_id: &SessionId,
        receiver: Self::ReceiverRef,
        algorithm: E2eeAlgorithm,
        key_provider: Arc<dyn KeyProvider>,
    ) -> Result<Self::Session, Self::Error>;
}
