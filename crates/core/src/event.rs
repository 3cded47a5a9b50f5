//! Ereignis-Definitionen zwischen Raum-Schicht und E2EE-Koordinator
//!
//! Eingehend: [`TrackEvent`] – Lebenszyklus publizierter und abonnierter
//! Tracks, geliefert von der Raum-/Signalisierungsschicht.
//! Ausgehend: [`EncryptionStateChanged`] – abgeleiteter Verschluesselungs-
//! zustand, der an Teilnehmer- und Raum-Kanaele verteilt wird.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EncryptionHealth, MediaKind, ParticipantId, TrackId, TrackRef};

/// Lebenszyklus-Ereignis eines Tracks
///
/// `S` und `R` sind die opaken Sender-/Receiver-Referenzen der Media-Engine.
/// Der Koordinator verarbeitet diese Ereignisse strikt nacheinander in
/// Eingangsreihenfolge.
#[derive(Debug, Clone)]
pub enum TrackEvent<S, R> {
    /// Lokaler Track wurde publiziert
    SenderAktiviert {
        participant_id: ParticipantId,
        track_id: TrackId,
        kind: MediaKind,
        sender: S,
        codec: Option<String>,
    },
    /// Lokaler Track wurde zurueckgezogen
    SenderDeaktiviert { track_id: TrackId },
    /// Remote-Track wurde abonniert
    ReceiverAktiviert {
        participant_id: ParticipantId,
        track_id: TrackId,
        kind: MediaKind,
        receiver: R,
        codec: Option<String>,
    },
    /// Remote-Track wurde abbestellt
    ReceiverDeaktiviert { track_id: TrackId },
    /// Codec eines bestehenden Tracks hat sich geaendert
    CodecGeaendert { track_id: TrackId, codec: String },
}

impl<S, R> TrackEvent<S, R> {
    /// Track, auf den sich das Ereignis bezieht
    pub fn track_id(&self) -> &TrackId {
        match self {
            Self::SenderAktiviert { track_id, .. }
            | Self::SenderDeaktiviert { track_id }
            | Self::ReceiverAktiviert { track_id, .. }
            | Self::ReceiverDeaktiviert { track_id }
            | Self::CodecGeaendert { track_id, .. } => track_id,
        }
    }

    /// Kurzname fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SenderAktiviert { .. } => "sender_aktiviert",
            Self::SenderDeaktiviert { .. } => "sender_deaktiviert",
            Self::ReceiverAktiviert { .. } => "receiver_aktiviert",
            Self::ReceiverDeaktiviert { .. } => "receiver_deaktiviert",
            Self::CodecGeaendert { .. } => "codec_geaendert",
        }
    }
}

/// Verschluesselungszustand eines Tracks hat sich geaendert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionStateChanged {
    pub participant_id: ParticipantId,
    pub track: TrackRef,
    pub health: EncryptionHealth,
    pub zeitpunkt: DateTime<Utc>,
}

impl EncryptionStateChanged {
    pub fn neu(participant_id: ParticipantId, track: TrackRef, health: EncryptionHealth) -> Self {
        Self {
            participant_id,
            track,
            health,
            zeitpunkt: Utc::now(),
        }
    }
}
