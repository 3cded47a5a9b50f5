//! Schluessel-Politik
//!
//! - [`provider`] – `KeyProvider`-Trait und Standard-Implementierung
//! - [`ratchet`] – HKDF-basierter Ratchet-Schritt

pub mod provider;
pub mod ratchet;

pub use provider::{DerivedKeyProvider, KeyProvider};
pub use ratchet::{hkdf_derive, ratchet};
