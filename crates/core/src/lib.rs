//! salon-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Raum-Schicht und
//! E2EE-Koordinator gemeinsam nutzen.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SalonError};
pub use event::{EncryptionStateChanged, TrackEvent};
pub use types::{
    EncryptionHealth, MediaKind, ParticipantId, RoomId, SessionDirection, SessionId, TrackId,
    TrackRef,
};
