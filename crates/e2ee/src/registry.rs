//! Session-Registry – reine Buchhaltung ueber aktive Crypto-Sessions
//!
//! Invarianten:
//! - hoechstens eine Session pro TrackId
//! - jede Sender-Session steht zusaetzlich in der geordneten Sender-Liste
//!   und wird aus beiden Sammlungen im selben Schritt entfernt
//!
//! Keine Krypto-Logik und keine Synchronisation: der Koordinator
//! serialisiert alle Zugriffe.

use std::collections::HashMap;
use std::sync::Arc;

use salon_core::{ParticipantId, SessionDirection, SessionId, TrackId, TrackRef};

/// Eintrag der Registry
#[derive(Debug)]
pub struct RegisteredSession<S> {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub track: TrackRef,
    pub session: Arc<S>,
}

impl<S> RegisteredSession<S> {
    pub fn track_id(&self) -> &TrackId {
        &self.track.track_id
    }

    pub fn ist_sender(&self) -> bool {
        self.track.direction == SessionDirection::Sender
    }
}

/// Zuordnung TrackId -> Crypto-Session
#[derive(Debug)]
pub struct SessionRegistry<S> {
    sessions: HashMap<TrackId, RegisteredSession<S>>,
    /// Sender-Tracks in Registrierungsreihenfolge (fuer Batch-Ratchet)
    senders: Vec<TrackId>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            senders: Vec::new(),
        }
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registriert eine Session
    ///
    /// Ist die TrackId bereits belegt, bleibt der bestehende Eintrag
    /// unveraendert und der neue wird als `Err` zurueckgegeben.
    pub fn insert(&mut self, entry: RegisteredSession<S>) -> Result<(), RegisteredSession<S>> {
        if self.sessions.contains_key(entry.track_id()) {
            return Err(entry);
        }
        if entry.ist_sender() {
            self.senders.push(entry.track_id().clone());
        }
        self.sessions.insert(entry.track_id().clone(), entry);
        Ok(())
    }

    /// Entfernt eine Session aus beiden Sammlungen
    pub fn remove(&mut self, track_id: &TrackId) -> Option<RegisteredSession<S>> {
        let entry = self.sessions.remove(track_id)?;
        if entry.ist_sender() {
            self.senders.retain(|t| t != track_id);
        }
        Some(entry)
    }

    pub fn get(&self, track_id: &TrackId) -> Option<&RegisteredSession<S>> {
        self.sessions.get(track_id)
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.sessions.contains_key(track_id)
    }

    /// Anzahl aller Sessions (beide Richtungen)
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Anzahl der Sender-Sessions
    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    /// Alle Sessions (Reihenfolge unbestimmt)
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSession<S>> {
        self.sessions.values()
    }

    /// Sender-Sessions in Registrierungsreihenfolge
    pub fn senders(&self) -> impl Iterator<Item = &RegisteredSession<S>> {
        self.senders.iter().filter_map(|t| self.sessions.get(t))
    }

    /// Leert die Registry und gibt alle Eintraege zurueck
    pub fn drain(&mut self) -> Vec<RegisteredSession<S>> {
        self.senders.clear();
        self.sessions.drain().map(|(_, entry)| entry).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use salon_core::MediaKind;

    fn eintrag(track: &str, direction: SessionDirection) -> RegisteredSession<()> {
        let participant_id = ParticipantId::new("p1");
        let track_id = TrackId::new(track);
        RegisteredSession {
            session_id: SessionId::zusammensetzen(
                direction,
                MediaKind::Audio,
                &participant_id,
                &track_id,
            ),
            participant_id,
            track: TrackRef {
                track_id,
                direction,
                kind: MediaKind::Audio,
            },
            session: Arc::new(()),
        }
    }

    #[test]
    fn einfuegen_und_finden() {
        let mut registry = SessionRegistry::new();
        registry.insert(eintrag("t1", SessionDirection::Sender)).unwrap();
        assert!(registry.contains(&TrackId::new("t1")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sender_count(), 1);
    }

    #[test]
    fn doppelte_track_id_wird_abgelehnt() {
        let mut registry = SessionRegistry::new();
        registry.insert(eintrag("t1", SessionDirection::Sender)).unwrap();
        let abgelehnt = registry.insert(eintrag("t1", SessionDirection::Receiver));
        assert!(abgelehnt.is_err());
        assert_eq!(registry.len(), 1);
        // Bestehender Eintrag bleibt unveraendert
        assert!(registry.get(&TrackId::new("t1")).unwrap().ist_sender());
        assert_eq!(registry.sender_count(), 1);
    }

    #[test]
    fn receiver_nicht_in_sender_liste() {
        let mut registry = SessionRegistry::new();
        registry.insert(eintrag("r1", SessionDirection::Receiver)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sender_count(), 0);
    }

    #[test]
    fn entfernen_aus_beiden_sammlungen() {
        let mut registry = SessionRegistry::new();
        registry.insert(eintrag("t1", SessionDirection::Sender)).unwrap();
        registry.insert(eintrag("t2", SessionDirection::Sender)).unwrap();

        let entfernt = registry.remove(&TrackId::new("t1")).unwrap();
        assert_eq!(entfernt.track_id(), &TrackId::new("t1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sender_count(), 1);
        assert!(registry.remove(&TrackId::new("t1")).is_none());
    }

    #[test]
    fn sender_reihenfolge_bleibt_erhalten() {
        let mut registry = SessionRegistry::new();
        for t in ["a", "b", "c", "d"] {
            registry.insert(eintrag(t, SessionDirection::Sender)).unwrap();
        }
        registry.insert(eintrag("r", SessionDirection::Receiver)).unwrap();
        registry.remove(&TrackId::new("b"));

        let reihenfolge: Vec<&str> = registry.senders().map(|e| e.track_id().as_str()).collect();
        assert_eq!(reihenfolge, vec!["a", "c", "d"]);
    }

    #[test]
    fn groesse_folgt_aktivierungen_minus_deaktivierungen() {
        let mut registry = SessionRegistry::new();
        let mut erwartet = 0usize;
        for i in 0..20 {
            let direction = if i % 3 == 0 {
                SessionDirection::Receiver
            } else {
                SessionDirection::Sender
            };
            registry.insert(eintrag(&format!("t{i}"), direction)).unwrap();
            erwartet += 1;
            if i % 4 == 0 {
                registry.remove(&TrackId::new(format!("t{}", i / 2)));
                erwartet -= 1;
            }
            assert_eq!(registry.len(), erwartet);
        }
    }

    #[test]
    fn drain_leert_alles() {
        let mut registry = SessionRegistry::new();
        registry.insert(eintrag("t1", SessionDirection::Sender)).unwrap();
        registry.insert(eintrag("r1", SessionDirection::Receiver)).unwrap();

        let alle = registry.drain();
        assert_eq!(alle.len(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.sender_count(), 0);
    }
}
