//! Gemeinsame Typen fuer das E2EE-Subsystem

use serde::{Deserialize, Serialize};

/// Symmetrisches Schluesselmaterial (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial([REDACTED] {} bytes)", self.0.len())
    }
}

impl KeyMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Erzeugt zufaelliges Schluesselmaterial der gegebenen Laenge
    pub fn zufaellig(len: usize) -> Self {
        use rand::rngs::OsRng;
        use rand::RngCore;

        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Frame-Verschluesselungsalgorithmus der externen Crypto-Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum E2eeAlgorithm {
    #[default]
    AesGcm,
    AesCbc,
}
