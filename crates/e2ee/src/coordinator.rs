//! E2EE-Koordinator – bindet Crypto-Sessions an den Track-Lebenszyklus
//!
//! Der Koordinator ist die einzige Stelle, die Crypto-Sessions erzeugt,
//! aktualisiert und entsorgt. Alle Lebenszyklus-Ereignisse laufen ueber
//! [`E2eeCoordinator::dispatch`] und werden unter einem FIFO-fairen
//! `tokio::sync::Mutex` strikt nacheinander verarbeitet. Batch-Operationen
//! (`set_global_enabled`, `ratchet_all_sender_keys`) nehmen denselben Lock
//! und sehen damit immer einen konsistenten Stand der Registry.
//!
//! ## Zustaende
//! ```text
//! Getrennt --attach(raum)--> Verbunden(raum) --teardown--> Getrennt
//!                            Verbunden(a) --attach(b)--> teardown + Verbunden(b)
//! ```
//!
//! Es gibt keine Timeouts: haengt die Session-Fabrik, staut sich die
//! Verarbeitung aller folgenden Ereignisse dieses Koordinators.

use std::sync::{Arc, Weak};

use salon_core::{
    EncryptionStateChanged, MediaKind, ParticipantId, RoomId, SessionDirection, SessionId,
    TrackEvent, TrackId, TrackRef,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::broadcast::E2eeEventSink;
use crate::config::E2eeEinstellungen;
use crate::error::{E2eeError, E2eeResult};
use crate::keys::KeyProvider;
use crate::registry::{RegisteredSession, SessionRegistry};
use crate::room::TrackEventSource;
use crate::session::{CryptoSession, CryptoSessionFactory, StateCallback};
use crate::state::map_state;
use crate::types::{E2eeAlgorithm, KeyMaterial};

/// Lebenszyklus-Ereignis mit den Referenztypen der Fabrik `F`
pub type LifecycleEvent<F> = TrackEvent<
    <F as CryptoSessionFactory>::SenderRef,
    <F as CryptoSessionFactory>::ReceiverRef,
>;

/// Key-Index, auf dem Shared Key und Ratchet arbeiten
const KEY_INDEX: u32 = 0;

// ---------------------------------------------------------------------------
// Ratchet-Ergebnis
// ---------------------------------------------------------------------------

/// Ergebnis des Ratchets einer einzelnen Sender-Session
#[derive(Debug)]
pub struct RatchetOutcome {
    pub track_id: TrackId,
    pub participant_id: ParticipantId,
    pub result: E2eeResult<()>,
}

impl RatchetOutcome {
    pub fn ist_erfolgreich(&self) -> bool {
        self.result.is_ok()
    }
}

/// Gesamtergebnis von [`E2eeCoordinator::ratchet_all_sender_keys`]
///
/// Enthaelt genau ein Ergebnis pro Sender-Session, in Registrierungsreihenfolge.
#[derive(Debug, Default)]
pub struct RatchetReport {
    pub outcomes: Vec<RatchetOutcome>,
}

impl RatchetReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn erfolgreich(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ist_erfolgreich()).count()
    }

    pub fn fehlgeschlagen(&self) -> usize {
        self.len() - self.erfolgreich()
    }

    fn eintragen<S>(&mut self, entry: &RegisteredSession<S>, result: E2eeResult<()>) {
        let result = result.map_err(|e| E2eeError::Ratchet {
            participant_id: entry.participant_id.to_string(),
            grund: e.to_string(),
        });
        match &result {
            Ok(()) => tracing::debug!(track_id = %entry.track_id(), "Sender-Schluessel geratchetet"),
            Err(e) => tracing::warn!(track_id = %entry.track_id(), fehler = %e, "Ratchet fehlgeschlagen"),
        }
        self.outcomes.push(RatchetOutcome {
            track_id: entry.track_id().clone(),
            participant_id: entry.participant_id.clone(),
            result,
        });
    }
}

// ---------------------------------------------------------------------------
// Interner Zustand
// ---------------------------------------------------------------------------

enum Anbindung {
    Getrennt,
    Verbunden { room_id: RoomId, pump: JoinHandle<()> },
}

struct CoordinatorState<S> {
    anbindung: Anbindung,
    enabled: bool,
    registry: SessionRegistry<S>,
}

/// Sender- oder Receiver-Referenz einer Aktivierung
enum Endpunkt<F: CryptoSessionFactory> {
    Sender(F::SenderRef),
    Receiver(F::ReceiverRef),
}

impl<F: CryptoSessionFactory> Endpunkt<F> {
    fn direction(&self) -> SessionDirection {
        match self {
            Self::Sender(_) => SessionDirection::Sender,
            Self::Receiver(_) => SessionDirection::Receiver,
        }
    }
}

// ---------------------------------------------------------------------------
// E2eeCoordinator
// ---------------------------------------------------------------------------

/// Koordinator fuer alle Crypto-Sessions eines Raums
pub struct E2eeCoordinator<F: CryptoSessionFactory> {
    factory: F,
    key_provider: Arc<dyn KeyProvider>,
    sink: Arc<dyn E2eeEventSink>,
    algorithm: E2eeAlgorithm,
    state: Mutex<CoordinatorState<F::Session>>,
}

impl<F: CryptoSessionFactory> E2eeCoordinator<F> {
    /// Erstellt einen neuen, nicht angebundenen Koordinator
    pub fn neu(
        config: &E2eeEinstellungen,
        factory: F,
        key_provider: Arc<dyn KeyProvider>,
        sink: Arc<dyn E2eeEventSink>,
    ) -> Self {
        Self {
            factory,
            key_provider,
            sink,
            algorithm: config.algorithmus,
            state: Mutex::new(CoordinatorState {
                anbindung: Anbindung::Getrennt,
                enabled: config.aktiviert,
                registry: SessionRegistry::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Raum-Anbindung
    // -----------------------------------------------------------------------

    /// Bindet den Koordinator an einen Raum
    ///
    /// Ist er bereits an einen anderen Raum gebunden, wird dieser vorher
    /// vollstaendig abgebaut. Erneutes Anbinden an denselben Raum ist ein
    /// No-op.
    pub async fn attach<R>(self: &Arc<Self>, room: &R) -> E2eeResult<()>
    where
        R: TrackEventSource<SenderRef = F::SenderRef, ReceiverRef = F::ReceiverRef>,
    {
        let room_id = room.room_id();
        let mut state = self.state.lock().await;

        let aktuell = match &state.anbindung {
            Anbindung::Verbunden { room_id, .. } => Some(*room_id),
            Anbindung::Getrennt => None,
        };
        match aktuell {
            Some(aktuell) if aktuell == room_id => {
                tracing::debug!(room_id = %room_id, "Bereits an diesen Raum gebunden");
                return Ok(());
            }
            Some(aktuell) => {
                tracing::info!(alt = %aktuell, neu = %room_id, "Raumwechsel – baue alten Raum ab");
                self.teardown_locked(&mut state).await;
            }
            None => {}
        }

        let events = room.track_events()?;
        let pump = tokio::spawn(event_pump(Arc::downgrade(self), events));
        state.anbindung = Anbindung::Verbunden { room_id, pump };

        tracing::info!(room_id = %room_id, "E2EE-Koordinator an Raum gebunden");
        Ok(())
    }

    /// Loest den Koordinator vom Raum und entsorgt alle Sessions
    ///
    /// Kehrt erst zurueck, wenn jede Session entsorgt ist. Ohne Anbindung
    /// gefahrlos aufrufbar.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        self.teardown_locked(&mut state).await;
    }

    async fn teardown_locked(&self, state: &mut CoordinatorState<F::Session>) {
        if let Anbindung::Verbunden { room_id, pump } =
            std::mem::replace(&mut state.anbindung, Anbindung::Getrennt)
        {
            pump.abort();
            // Cancelled ist hier der Normalfall
            let _ = pump.await;
            tracing::info!(room_id = %room_id, "Raum-Abonnement beendet");
        }

        let eintraege = state.registry.drain();
        let anzahl = eintraege.len();
        for entry in eintraege {
            self.entsorgen(entry).await;
        }
        if anzahl > 0 {
            tracing::info!(anzahl, "Alle Crypto-Sessions entsorgt");
        }
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus-Ereignisse
    // -----------------------------------------------------------------------

    /// Verarbeitet ein Lebenszyklus-Ereignis
    ///
    /// Einziger Einstiegspunkt fuer Registry-Aenderungen; die Ereignisse
    /// werden in Aufrufreihenfolge nacheinander abgearbeitet.
    pub async fn dispatch(&self, event: LifecycleEvent<F>) -> E2eeResult<()> {
        let mut state = self.state.lock().await;
        tracing::trace!(ereignis = event.name(), track_id = %event.track_id(), "Lebenszyklus-Ereignis");

        match event {
            TrackEvent::SenderAktiviert {
                participant_id,
                track_id,
                kind,
                sender,
                codec,
            } => {
                self.aktivieren(
                    &mut state,
                    participant_id,
                    track_id,
                    kind,
                    Endpunkt::Sender(sender),
                    codec,
                )
                .await
            }
            TrackEvent::ReceiverAktiviert {
                participant_id,
                track_id,
                kind,
                receiver,
                codec,
            } => {
                self.aktivieren(
                    &mut state,
                    participant_id,
                    track_id,
                    kind,
                    Endpunkt::Receiver(receiver),
                    codec,
                )
                .await
            }
            TrackEvent::SenderDeaktiviert { track_id } => {
                self.deaktivieren(&mut state, &track_id, SessionDirection::Sender)
                    .await;
                Ok(())
            }
            TrackEvent::ReceiverDeaktiviert { track_id } => {
                self.deaktivieren(&mut state, &track_id, SessionDirection::Receiver)
                    .await;
                Ok(())
            }
            TrackEvent::CodecGeaendert { track_id, codec } => {
                match state.registry.get(&track_id) {
                    Some(entry) => {
                        entry.session.update_codec(&codec);
                        tracing::debug!(track_id = %track_id, codec = %codec, "Codec aktualisiert");
                    }
                    None => {
                        tracing::debug!(track_id = %track_id, "Codec-Wechsel fuer unbekannten Track ignoriert");
                    }
                }
                Ok(())
            }
        }
    }

    /// Lokaler Track wurde publiziert
    pub async fn on_sender_track_activated(
        &self,
        participant_id: ParticipantId,
        track_id: TrackId,
        kind: MediaKind,
        sender: F::SenderRef,
        codec: Option<String>,
    ) -> E2eeResult<()> {
        self.dispatch(TrackEvent::SenderAktiviert {
            participant_id,
            track_id,
            kind,
            sender,
            codec,
        })
        .await
    }

    /// Lokaler Track wurde zurueckgezogen
    pub async fn on_sender_track_deactivated(&self, track_id: TrackId) -> E2eeResult<()> {
        self.dispatch(TrackEvent::SenderDeaktiviert { track_id }).await
    }

    /// Remote-Track wurde abonniert
    pub async fn on_receiver_track_activated(
        &self,
        participant_id: ParticipantId,
        track_id: TrackId,
        kind: MediaKind,
        receiver: F::ReceiverRef,
        codec: Option<String>,
    ) -> E2eeResult<()> {
        self.dispatch(TrackEvent::ReceiverAktiviert {
            participant_id,
            track_id,
            kind,
            receiver,
            codec,
        })
        .await
    }

    /// Remote-Track wurde abbestellt
    pub async fn on_receiver_track_deactivated(&self, track_id: TrackId) -> E2eeResult<()> {
        self.dispatch(TrackEvent::ReceiverDeaktiviert { track_id }).await
    }

    /// Reicht einen Codec-Wechsel an die Session des Tracks weiter
    pub async fn update_codec(&self, track_id: TrackId, codec: impl Into<String>) -> E2eeResult<()> {
        self.dispatch(TrackEvent::CodecGeaendert {
            track_id,
            codec: codec.into(),
        })
        .await
    }

    async fn aktivieren(
        &self,
        state: &mut CoordinatorState<F::Session>,
        participant_id: ParticipantId,
        track_id: TrackId,
        kind: MediaKind,
        endpunkt: Endpunkt<F>,
        codec: Option<String>,
    ) -> E2eeResult<()> {
        if state.registry.contains(&track_id) {
            tracing::debug!(track_id = %track_id, "Track bereits registriert – Aktivierung ignoriert");
            return Ok(());
        }

        let direction = endpunkt.direction();
        let session_id = SessionId::zusammensetzen(direction, kind, &participant_id, &track_id);
        let key_provider = Arc::clone(&self.key_provider);

        let erstellt = match endpunkt {
            Endpunkt::Sender(sender) => {
                self.factory
                    .create_for_sender(&session_id, sender, self.algorithm, key_provider)
                    .await
            }
            Endpunkt::Receiver(receiver) => {
                self.factory
                    .create_for_receiver(&session_id, receiver, self.algorithm, key_provider)
                    .await
            }
        };
        let session = match erstellt {
            Ok(session) => Arc::new(session),
            Err(e) => {
                tracing::warn!(track_id = %track_id, session_id = %session_id, fehler = %e, "Crypto-Session konnte nicht erstellt werden");
                return Err(E2eeError::erstellung(&track_id, e));
            }
        };

        let track = TrackRef {
            track_id: track_id.clone(),
            direction,
            kind,
        };
        session.on_state_changed(self.zustands_callback(participant_id.clone(), track.clone()));
        session.set_enabled(state.enabled);

        if self.key_provider.is_shared_key_mode() {
            if let Err(e) = self.shared_key_zuweisen(&session_id, session.as_ref()) {
                tracing::warn!(track_id = %track_id, fehler = %e, "Shared Key konnte nicht zugewiesen werden");
                session.dispose().await;
                self.key_provider.forget_session(&session_id);
                return Err(e);
            }
        }

        if let Some(codec) = codec.as_deref() {
            session.update_codec(codec);
        }

        let entry = RegisteredSession {
            session_id,
            participant_id,
            track,
            session,
        };
        if let Err(entry) = state.registry.insert(entry) {
            // Unter dem Lock geprueft, sollte nicht vorkommen
            tracing::warn!(track_id = %track_id, "Track beim Registrieren bereits belegt – neue Session entsorgt");
            self.entsorgen(entry).await;
            return Ok(());
        }

        tracing::info!(
            track_id = %track_id,
            richtung = direction.as_str(),
            art = kind.as_str(),
            enabled = state.enabled,
            "Crypto-Session erstellt"
        );
        Ok(())
    }

    async fn deaktivieren(
        &self,
        state: &mut CoordinatorState<F::Session>,
        track_id: &TrackId,
        direction: SessionDirection,
    ) {
        match state.registry.get(track_id) {
            None => {
                tracing::debug!(track_id = %track_id, "Deaktivierung fuer unbekannten Track ignoriert");
                return;
            }
            Some(entry) if entry.track.direction != direction => {
                tracing::warn!(
                    track_id = %track_id,
                    erwartet = direction.as_str(),
                    registriert = entry.track.direction.as_str(),
                    "Deaktivierung mit falscher Richtung ignoriert"
                );
                return;
            }
            Some(_) => {}
        }

        if let Some(entry) = state.registry.remove(track_id) {
            self.entsorgen(entry).await;
            tracing::info!(track_id = %track_id, richtung = direction.as_str(), "Crypto-Session entsorgt");
        }
    }

    async fn entsorgen(&self, entry: RegisteredSession<F::Session>) {
        entry.session.dispose().await;
        self.key_provider.forget_session(&entry.session_id);
    }

    // -----------------------------------------------------------------------
    // Batch-Operationen
    // -----------------------------------------------------------------------

    /// Setzt das globale Enable-Flag und wendet es auf jede Session an
    ///
    /// Im Shared-Key-Modus wird dabei auf jeder Session der Shared Key an
    /// Index 0 erneut gesetzt und ausgewaehlt.
    pub async fn set_global_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        state.enabled = enabled;

        let shared = self.key_provider.is_shared_key_mode();
        for entry in state.registry.iter() {
            entry.session.set_enabled(enabled);
            if shared {
                if let Err(e) = self.shared_key_zuweisen(&entry.session_id, entry.session.as_ref()) {
                    tracing::warn!(track_id = %entry.track_id(), fehler = %e, "Shared Key konnte nicht erneut gesetzt werden");
                }
            }
        }

        tracing::info!(enabled, sessions = state.registry.len(), "E2EE global umgeschaltet");
    }

    /// Ratchet den Schluessel jeder Sender-Session an Index 0
    ///
    /// Der neue Schluessel wird der Session sofort zugewiesen. Ein Fehler bei
    /// einer Session bricht den Durchlauf nicht ab.
    ///
    /// Im Shared-Key-Modus wird der Shared Key genau einmal pro Durchlauf
    /// geratchet und auf jede Session (auch Receiver) angewendet, damit alle
    /// Sessions denselben Schluessel behalten.
    pub async fn ratchet_all_sender_keys(&self) -> RatchetReport {
        let state = self.state.lock().await;
        let report = if self.key_provider.is_shared_key_mode() {
            self.shared_key_ratchet(&state)
        } else {
            self.teilnehmer_ratchet(&state)
        };

        tracing::info!(
            gesamt = report.len(),
            fehlgeschlagen = report.fehlgeschlagen(),
            "Ratchet aller Sender-Schluessel abgeschlossen"
        );
        report
    }

    fn teilnehmer_ratchet(&self, state: &CoordinatorState<F::Session>) -> RatchetReport {
        let mut report = RatchetReport::default();
        for entry in state.registry.senders() {
            let result = self
                .key_provider
                .ratchet_key(&entry.participant_id, KEY_INDEX)
                .and_then(|key| self.key_anwenden(entry, key));
            report.eintragen(entry, result);
        }
        report
    }

    fn shared_key_ratchet(&self, state: &CoordinatorState<F::Session>) -> RatchetReport {
        let mut report = RatchetReport::default();
        // Ohne Sender gibt es nichts zu ratcheten
        let Some(erster) = state.registry.senders().next() else {
            return report;
        };

        let key = match self.key_provider.ratchet_key(&erster.participant_id, KEY_INDEX) {
            Ok(key) => key,
            Err(e) => {
                let grund = e.to_string();
                for entry in state.registry.senders() {
                    report.eintragen(entry, Err(E2eeError::KeyProvider(grund.clone())));
                }
                return report;
            }
        };

        for entry in state.registry.iter().filter(|e| !e.ist_sender()) {
            if let Err(e) = self.key_anwenden(entry, key.clone()) {
                tracing::warn!(track_id = %entry.track_id(), fehler = %e, "Geratcheter Shared Key konnte nicht gesetzt werden");
            }
        }
        for entry in state.registry.senders() {
            let result = self.key_anwenden(entry, key.clone());
            report.eintragen(entry, result);
        }
        report
    }

    fn key_anwenden(
        &self,
        entry: &RegisteredSession<F::Session>,
        key: KeyMaterial,
    ) -> E2eeResult<()> {
        self.key_provider.set_key(&entry.session_id, KEY_INDEX, key)?;
        entry.session.set_key_index(KEY_INDEX);
        Ok(())
    }

    fn shared_key_zuweisen(&self, session_id: &SessionId, session: &F::Session) -> E2eeResult<()> {
        let key = self.key_provider.shared_key().ok_or(E2eeError::KeinSharedKey)?;
        self.key_provider.set_key(session_id, KEY_INDEX, key)?;
        session.set_key_index(KEY_INDEX);
        Ok(())
    }

    fn zustands_callback(&self, participant_id: ParticipantId, track: TrackRef) -> StateCallback {
        let sink = Arc::clone(&self.sink);
        Box::new(move |track_id: &TrackId, code: i32| match map_state(code) {
            Ok(health) => {
                let event = EncryptionStateChanged::neu(participant_id.clone(), track.clone(), health);
                sink.an_teilnehmer(&event);
                sink.an_raum(&event);
            }
            Err(e) => {
                tracing::error!(track_id = %track_id, code, fehler = %e, "Crypto-Zustand nicht abbildbar – Ereignis verworfen");
            }
        })
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub async fn is_attached(&self) -> bool {
        matches!(self.state.lock().await.anbindung, Anbindung::Verbunden { .. })
    }

    pub async fn attached_room(&self) -> Option<RoomId> {
        match &self.state.lock().await.anbindung {
            Anbindung::Verbunden { room_id, .. } => Some(*room_id),
            Anbindung::Getrennt => None,
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    /// Anzahl aller registrierten Sessions
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Anzahl der Sender-Sessions
    pub async fn sender_count(&self) -> usize {
        self.state.lock().await.registry.sender_count()
    }

    pub async fn contains_track(&self, track_id: &TrackId) -> bool {
        self.state.lock().await.registry.contains(track_id)
    }
}

impl<F: CryptoSessionFactory> Drop for E2eeCoordinator<F> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Anbindung::Verbunden { pump, .. } = &state.anbindung {
            pump.abort();
        }
        if !state.registry.is_empty() {
            tracing::warn!(
                anzahl = state.registry.len(),
                "E2EE-Koordinator ohne teardown verworfen – Sessions nicht entsorgt"
            );
        }
    }
}

/// Liest den Ereignisstrom eines Raums und reicht ihn an den Koordinator
///
/// Haelt nur eine schwache Referenz, damit der Koordinator nicht durch
/// seine eigene Pumpe am Leben gehalten wird.
async fn event_pump<F: CryptoSessionFactory>(
    coordinator: Weak<E2eeCoordinator<F>>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<LifecycleEvent<F>>,
) {
    while let Some(event) = events.recv().await {
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        let track_id = event.track_id().clone();
        let name = event.name();
        if let Err(e) = coordinator.dispatch(event).await {
            tracing::warn!(track_id = %track_id, ereignis = name, fehler = %e, "Lebenszyklus-Ereignis fehlgeschlagen");
        }
    }
    tracing::debug!("Raum-Ereignisstrom beendet");
}
