//! Schnittstelle zur Raum-Schicht
//!
//! Der Raum liefert die Lebenszyklus-Ereignisse seiner Tracks. Ein neues
//! Abonnement beginnt mit dem naechsten Ereignis; bereits aktive Tracks
//! muss die Raum-Schicht selbst erneut melden.

use salon_core::{RoomId, TrackEvent};
use tokio::sync::mpsc;

/// Quelle fuer Track-Lebenszyklus-Ereignisse eines Raums
pub trait TrackEventSource: Send + Sync {
    type SenderRef: Send + 'static;
    type ReceiverRef: Send + 'static;

    /// Identitaet des Raums
    fn room_id(&self) -> RoomId;

    /// Abonniert den Ereignisstrom des Raums
    ///
    /// Das Abonnement endet, wenn der Empfaenger gedroppt wird.
    fn track_events(
        &self,
    ) -> salon_core::Result<mpsc::UnboundedReceiver<TrackEvent<Self::SenderRef, Self::ReceiverRef>>>;
}
