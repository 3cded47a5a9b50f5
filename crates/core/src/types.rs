//! Gemeinsame Identifikations- und Zustandstypen fuer Salon
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen zwischen Track-,
//! Teilnehmer- und Session-Kennungen zur Compilezeit auszuschliessen.
//! Track- und Teilnehmer-IDs kommen opak aus der Signalisierung und sind
//! deshalb Strings; nur die Raum-ID wird lokal erzeugt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opake Teilnehmer-ID (lokal oder remote)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opake Track-ID, eindeutig fuer die Dauer einer Publikation/Subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identitaet einer Crypto-Session
///
/// Unterscheidet Richtung, Medienart, Teilnehmer und Track, damit Sender-
/// und Empfaenger-Session desselben Tracks nie kollidieren.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Baut die Session-Identitaet aus ihren Bestandteilen
    ///
    /// Format: `<richtung>-<art>-<len>:<teilnehmer>-<len>:<track>`
    ///
    /// Teilnehmer- und Track-ID sind opak und duerfen `-` enthalten. Das
    /// Laengenpraefix (in Bytes) macht die Zerlegung trotzdem eindeutig.
    pub fn zusammensetzen(
        direction: SessionDirection,
        kind: MediaKind,
        participant_id: &ParticipantId,
        track_id: &TrackId,
    ) -> Self {
        let teilnehmer = participant_id.as_str();
        let track = track_id.as_str();
        Self(format!(
            "{}-{}-{}:{}-{}:{}",
            direction.as_str(),
            kind.as_str(),
            teilnehmer.len(),
            teilnehmer,
            track.len(),
            track
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eindeutige Raum-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Erstellt eine neue zufaellige RoomId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

/// Art des Medien-Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// Richtung einer Crypto-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionDirection {
    /// Verschluesselt ausgehende Frames (lokal publizierter Track)
    Sender,
    /// Entschluesselt eingehende Frames (abonnierter Remote-Track)
    Receiver,
}

impl SessionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

/// Zuletzt gemeldeter Zustand einer Crypto-Session
///
/// Wird nicht persistiert, sondern nur als Event-Payload verteilt. Fehler-
/// zustaende sind regulaere Daten, keine Ausnahmen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionHealth {
    New,
    Ok,
    MissingKey,
    EncryptionFailed,
    DecryptionFailed,
    InternalError,
    KeyRatcheted,
}

impl EncryptionHealth {
    /// true fuer Zustaende, auf die die Anwendung reagieren sollte
    /// (z.B. erneuter Schluesselaustausch)
    pub fn ist_fehler(&self) -> bool {
        matches!(
            self,
            Self::MissingKey | Self::EncryptionFailed | Self::DecryptionFailed | Self::InternalError
        )
    }
}

/// Referenz auf die Publikation bzw. Subscription, zu der ein Zustand gehoert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    pub track_id: TrackId,
    pub direction: SessionDirection,
    pub kind: MediaKind,
}
