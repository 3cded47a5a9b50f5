//! Key-Ratchet via HKDF-SHA256
//!
//! Ein Ratchet-Schritt leitet aus dem bisherigen Schluessel einen neuen ab:
//!
//! ```text
//! neu = HKDF-SHA256(ikm = alt, salt = ratchet_salt, info = "salon-ratchet-v1")
//! ```
//!
//! Der alte Schluessel ist aus dem neuen nicht rekonstruierbar.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{E2eeError, E2eeResult};
use crate::types::KeyMaterial;

/// HKDF-Info fuer Ratchet-Schritte
pub const RATCHET_INFO: &[u8] = b"salon-ratchet-v1";

/// Standard-Salt, falls keiner konfiguriert ist
pub const STANDARD_RATCHET_SALT: &str = "SalonRatchetSalt";

/// Leitet `len` Bytes per HKDF-SHA256 ab
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> E2eeResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| E2eeError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Fuehrt einen Ratchet-Schritt aus; der neue Schluessel hat die Laenge des alten
pub fn ratchet(current: &KeyMaterial, salt: &[u8]) -> E2eeResult<KeyMaterial> {
    if current.is_empty() {
        return Err(E2eeError::KeyDerivation(
            "Leerer Schluessel kann nicht geratchetet werden".to_string(),
        ));
    }
    let next = hkdf_derive(current.as_bytes(), salt, RATCHET_INFO, current.len())?;
    Ok(KeyMaterial::new(next))
}
