//! Verteilung der Verschluesselungszustaende
//!
//! Jede Zustandsaenderung einer Session geht an zwei Kanaele:
//! - teilnehmerbezogen: bounded mpsc-Queue pro abonniertem Teilnehmer
//! - raumbezogen: tokio broadcast an alle Raum-Abonnenten
//!
//! Senden ist nicht-blockierend. Volle oder geschlossene Queues verwerfen
//! das Ereignis, die Session wartet nie auf Zustellung.

use dashmap::DashMap;
use salon_core::{EncryptionStateChanged, ParticipantId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::config::EreignisEinstellungen;

/// Ziel der abgeleiteten Zustandsereignisse
pub trait E2eeEventSink: Send + Sync + 'static {
    /// Ereignis an die Abonnenten des betroffenen Teilnehmers
    fn an_teilnehmer(&self, event: &EncryptionStateChanged);

    /// Ereignis an alle Raum-Abonnenten
    fn an_raum(&self, event: &EncryptionStateChanged);
}

/// Standard-Verteiler fuer Zustandsereignisse
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct E2eeBroadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    /// Queues pro Teilnehmer
    teilnehmer: DashMap<ParticipantId, Vec<mpsc::Sender<EncryptionStateChanged>>>,
    raum: broadcast::Sender<EncryptionStateChanged>,
    queue_groesse: usize,
}

impl E2eeBroadcaster {
    pub fn neu(config: &EreignisEinstellungen) -> Self {
        let (raum, _) = broadcast::channel(config.raum_kapazitaet.max(1));
        Self {
            inner: Arc::new(BroadcasterInner {
                teilnehmer: DashMap::new(),
                raum,
                queue_groesse: config.queue_groesse.max(1),
            }),
        }
    }

    /// Abonniert die Zustandsereignisse eines Teilnehmers
    pub fn teilnehmer_abonnieren(
        &self,
        participant_id: &ParticipantId,
    ) -> mpsc::Receiver<EncryptionStateChanged> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .teilnehmer
            .entry(participant_id.clone())
            .or_default()
            .push(tx);
        tracing::debug!(participant_id = %participant_id, "Teilnehmer-Abonnement angelegt");
        rx
    }

    /// Abonniert alle Zustandsereignisse des Raums
    pub fn raum_abonnieren(&self) -> broadcast::Receiver<EncryptionStateChanged> {
        self.inner.raum.subscribe()
    }

    /// Entfernt alle Abonnements eines Teilnehmers
    pub fn teilnehmer_entfernen(&self, participant_id: &ParticipantId) {
        self.inner.teilnehmer.remove(participant_id);
    }

    /// Anzahl der Teilnehmer mit mindestens einem Abonnement
    pub fn teilnehmer_anzahl(&self) -> usize {
        self.inner.teilnehmer.len()
    }
}

impl E2eeEventSink for E2eeBroadcaster {
    fn an_teilnehmer(&self, event: &EncryptionStateChanged) {
        let Some(mut senders) = self.inner.teilnehmer.get_mut(&event.participant_id) else {
            return;
        };
        senders.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    participant_id = %event.participant_id,
                    "Teilnehmer-Queue voll – Zustandsereignis verworfen"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    participant_id = %event.participant_id,
                    "Teilnehmer-Queue geschlossen – Abonnement entfernt"
                );
                false
            }
        });
    }

    fn an_raum(&self, event: &EncryptionStateChanged) {
        // Fehler heisst nur: aktuell kein Raum-Abonnent
        let _ = self.inner.raum.send(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
