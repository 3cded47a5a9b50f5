//! Gemeinsame Test-Hilfen: Fake-Engine, Fake-Raum und Setup

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use salon_core::{
    MediaKind, ParticipantId, RoomId, SalonError, SessionDirection, SessionId, TrackEvent, TrackId,
};
use salon_e2ee::config::{E2eeEinstellungen, EreignisEinstellungen};
use salon_e2ee::{
    CryptoSession, CryptoSessionFactory, DerivedKeyProvider, E2eeAlgorithm, E2eeBroadcaster,
    E2eeCoordinator, KeyMaterial, KeyProvider, StateCallback, TrackEventSource,
};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Fake-Engine
// ---------------------------------------------------------------------------

/// Sender-/Receiver-Referenz der Fake-Engine
#[derive(Debug, Clone, Default)]
pub struct FakeRef {
    /// Erstellung schlaegt fehl
    pub fehlschlagen: bool,
    /// Kuenstliche Verzoegerung der Erstellung
    pub verzoegerung: Option<Duration>,
}

impl FakeRef {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn kaputt() -> Self {
        Self {
            fehlschlagen: true,
            ..Default::default()
        }
    }

    pub fn langsam(ms: u64) -> Self {
        Self {
            verzoegerung: Some(Duration::from_millis(ms)),
            ..Default::default()
        }
    }
}

/// Beobachtbarer Zustand einer Fake-Session
#[derive(Default)]
pub struct SpionZustand {
    pub enabled: Option<bool>,
    pub key_index: Option<u32>,
    pub codecs: Vec<String>,
    pub disposed: bool,
    pub callback: Option<StateCallback>,
}

pub struct Spion {
    pub session_id: SessionId,
    pub direction: SessionDirection,
    pub algorithm: E2eeAlgorithm,
    pub state: Mutex<SpionZustand>,
}

impl Spion {
    pub fn enabled(&self) -> Option<bool> {
        self.state.lock().enabled
    }

    pub fn key_index(&self) -> Option<u32> {
        self.state.lock().key_index
    }

    pub fn codecs(&self) -> Vec<String> {
        self.state.lock().codecs.clone()
    }

    pub fn disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Simuliert einen Zustandswechsel der Engine
    pub fn melden(&self, track_id: &TrackId, code: i32) {
        let state = self.state.lock();
        if let Some(callback) = state.callback.as_ref() {
            callback(track_id, code);
        }
    }

    /// Simuliert verlorene Key-Auswahl (z.B. nach Engine-Neustart)
    pub fn key_index_vergessen(&self) {
        self.state.lock().key_index = None;
    }
}

pub struct FakeSession {
    spion: Arc<Spion>,
}

#[async_trait]
impl CryptoSession for FakeSession {
    fn set_enabled(&self, enabled: bool) {
        self.spion.state.lock().enabled = Some(enabled);
    }

    fn set_key_index(&self, index: u32) {
        self.spion.state.lock().key_index = Some(index);
    }

    fn update_codec(&self, codec: &str) {
        self.spion.state.lock().codecs.push(codec.to_string());
    }

    fn on_state_changed(&self, callback: StateCallback) {
        self.spion.state.lock().callback = Some(callback);
    }

    async fn dispose(&self) {
        let mut state = self.spion.state.lock();
        assert!(!state.disposed, "Session doppelt entsorgt");
        state.disposed = true;
        state.callback = None;
    }
}

/// Fake-Fabrik, merkt sich jede erzeugte Session
#[derive(Default)]
pub struct FakeFactory {
    pub spione: Arc<Mutex<Vec<Arc<Spion>>>>,
}

impl FakeFactory {
    async fn erstellen(
        &self,
        session_id: &SessionId,
        r: FakeRef,
        direction: SessionDirection,
        algorithm: E2eeAlgorithm,
    ) -> Result<FakeSession, String> {
        if let Some(d) = r.verzoegerung {
            tokio::time::sleep(d).await;
        }
        if r.fehlschlagen {
            return Err(format!("native Allokation fuer {session_id} fehlgeschlagen"));
        }
        let spion = Arc::new(Spion {
            session_id: session_id.clone(),
            direction,
            algorithm,
            state: Mutex::new(SpionZustand::default()),
        });
        self.spione.lock().push(Arc::clone(&spion));
        Ok(FakeSession { spion })
    }
}

#[async_trait]
impl CryptoSessionFactory for FakeFactory {
    type SenderRef = FakeRef;
    type ReceiverRef = FakeRef;
    type Session = FakeSession;
    type Error = String;

    async fn create_for_sender(
        &self,
        session_id: &SessionId,
        sender: FakeRef,
        algorithm: E2eeAlgorithm,
        _key_provider: Arc<dyn KeyProvider>,
    ) -> Result<FakeSession, String> {
        self.erstellen(session_id, sender, SessionDirection::Sender, algorithm)
            .await
    }

    async fn create_for_receiver(
        &self,
        session_id: &SessionId,
        receiver: FakeRef,
        algorithm: E2eeAlgorithm,
        _key_provider: Arc<dyn KeyProvider>,
    ) -> Result<FakeSession, String> {
        self.erstellen(session_id, receiver, SessionDirection::Receiver, algorithm)
            .await
    }
}

// ---------------------------------------------------------------------------
// Fake-Raum
// ---------------------------------------------------------------------------

pub type FakeEvent = TrackEvent<FakeRef, FakeRef>;

pub struct FakeRoom {
    pub id: RoomId,
    tx: Mutex<Option<mpsc::UnboundedSender<FakeEvent>>>,
    pub abonnements: Mutex<usize>,
    /// Abonnieren schlaegt fehl
    geschlossen: bool,
}

impl FakeRoom {
    pub fn neu() -> Self {
        Self {
            id: RoomId::new(),
            tx: Mutex::new(None),
            abonnements: Mutex::new(0),
            geschlossen: false,
        }
    }

    /// Raum, dessen Ereignisstrom nicht abonniert werden kann
    pub fn geschlossen() -> Self {
        Self {
            geschlossen: true,
            ..Self::neu()
        }
    }

    /// Sendet ein Ereignis an das aktuelle Abonnement
    ///
    /// Gibt `false` zurueck wenn niemand (mehr) zuhoert.
    pub fn senden(&self, event: FakeEvent) -> bool {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn abonnements(&self) -> usize {
        *self.abonnements.lock()
    }
}

impl TrackEventSource for FakeRoom {
    type SenderRef = FakeRef;
    type ReceiverRef = FakeRef;

    fn room_id(&self) -> RoomId {
        self.id
    }

    fn track_events(&self) -> salon_core::Result<mpsc::UnboundedReceiver<FakeEvent>> {
        if self.geschlossen {
            return Err(SalonError::Abonnement(format!("{} ist geschlossen", self.id)));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.lock() = Some(tx);
        *self.abonnements.lock() += 1;
        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

pub struct Setup {
    pub coordinator: Arc<E2eeCoordinator<FakeFactory>>,
    pub spione: Arc<Mutex<Vec<Arc<Spion>>>>,
    pub keys: Arc<DerivedKeyProvider>,
    pub events: E2eeBroadcaster,
}

impl Setup {
    /// Spion der zuletzt erzeugten Session
    pub fn letzter_spion(&self) -> Arc<Spion> {
        Arc::clone(self.spione.lock().last().expect("keine Session erzeugt"))
    }

    /// Spion zur Session-ID, die `teil` enthaelt
    pub fn spion_fuer(&self, teil: &str) -> Arc<Spion> {
        let spione = self.spione.lock();
        let spion = spione
            .iter()
            .find(|p| p.session_id.as_str().contains(teil))
            .unwrap_or_else(|| panic!("keine Session fuer {teil}"));
        Arc::clone(spion)
    }

    pub fn erzeugt(&self) -> usize {
        self.spione.lock().len()
    }
}

pub fn logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn bauen(keys: DerivedKeyProvider, aktiviert: bool) -> Setup {
    logging();
    let factory = FakeFactory::default();
    let spione = Arc::clone(&factory.spione);
    let keys = Arc::new(keys);
    let events = E2eeBroadcaster::neu(&EreignisEinstellungen::default());
    let config = E2eeEinstellungen {
        aktiviert,
        ..Default::default()
    };
    let coordinator = Arc::new(E2eeCoordinator::neu(
        &config,
        factory,
        Arc::clone(&keys) as Arc<dyn KeyProvider>,
        Arc::new(events.clone()),
    ));
    Setup {
        coordinator,
        spione,
        keys,
        events,
    }
}

/// Koordinator im Shared-Key-Modus
pub fn mit_shared_key(key: &KeyMaterial) -> Setup {
    bauen(DerivedKeyProvider::mit_shared_key(key.clone(), "test-salz"), true)
}

/// Koordinator mit Schluesseln pro Teilnehmer
pub fn pro_teilnehmer() -> Setup {
    bauen(DerivedKeyProvider::neu("test-salz"), true)
}

/// Koordinator, der global deaktiviert startet
pub fn deaktiviert() -> Setup {
    bauen(DerivedKeyProvider::neu("test-salz"), false)
}

pub fn p(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

pub fn t(id: &str) -> TrackId {
    TrackId::new(id)
}

pub fn sender_event(participant: &str, track: &str, r: FakeRef) -> FakeEvent {
    TrackEvent::SenderAktiviert {
        participant_id: p(participant),
        track_id: t(track),
        kind: MediaKind::Audio,
        sender: r,
        codec: None,
    }
}

pub fn receiver_event(participant: &str, track: &str, r: FakeRef) -> FakeEvent {
    TrackEvent::ReceiverAktiviert {
        participant_id: p(participant),
        track_id: t(track),
        kind: MediaKind::Video,
        receiver: r,
        codec: None,
    }
}

/// Wartet bis die Bedingung erfuellt ist (Ereignisse laufen ueber die Pumpe)
pub async fn warten_bis<F, Fut>(mut bedingung: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if bedingung().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Bedingung nicht rechtzeitig erfuellt");
}
