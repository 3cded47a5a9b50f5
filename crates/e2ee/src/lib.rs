//! # salon-e2ee
//!
//! Lebenszyklus-Koordination der Ende-zu-Ende-Verschluesselung eines
//! Medienraums. Die Frame-Kryptografie selbst liegt in einer externen
//! Engine; dieses Crate haelt pro Track genau eine Crypto-Session, gleicht
//! ihre Schluessel mit dem Key-Provider ab und meldet ihren Zustand.
//!
//! ## Module
//! - `coordinator` - Der Koordinator (Anbindung, Lebenszyklus, Batch-Operationen)
//! - `registry` - Zuordnung TrackId -> Crypto-Session
//! - `state` - Abbildung der Engine-Zustaende auf `EncryptionHealth`
//! - `session` - Schnittstelle zur externen Crypto-Engine
//! - `room` - Schnittstelle zur Raum-Schicht
//! - `keys` - Key-Provider-Trait, Standard-Provider und Ratchet
//! - `broadcast` - Verteilung der Zustandsereignisse
//! - `config` - TOML-Konfiguration
//! - `types` - Schluesselmaterial und Algorithmen
//! - `error` - Fehlertypen
//!
//! ## Beispiel
//!
//! ```ignore
//! let config = SalonConfig::aus_umgebung()?;
//! let keys = Arc::new(DerivedKeyProvider::aus_config(&config.schluessel)?);
//! let events = E2eeBroadcaster::neu(&config.ereignisse);
//! let coordinator = Arc::new(E2eeCoordinator::neu(
//!     &config.e2ee,
//!     engine_factory,
//!     keys,
//!     Arc::new(events.clone()),
//! ));
//! coordinator.attach(&room).await?;
//! ```

pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod keys;
pub mod registry;
pub mod room;
pub mod session;
pub mod state;
pub mod types;

// Bequeme Re-Exports
pub use broadcast::{E2eeBroadcaster, E2eeEventSink};
pub use config::SalonConfig;
pub use coordinator::{E2eeCoordinator, LifecycleEvent, RatchetOutcome, RatchetReport};
pub use error::{E2eeError, E2eeResult};
pub use keys::{DerivedKeyProvider, KeyProvider};
pub use registry::{RegisteredSession, SessionRegistry};
pub use room::TrackEventSource;
pub use session::{CryptoSession, CryptoSessionFactory, StateCallback};
pub use state::{map_state, CryptorState};
pub use types::{E2eeAlgorithm, KeyMaterial};
