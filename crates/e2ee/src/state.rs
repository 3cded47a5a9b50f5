//! Abbildung der Engine-Zustaende auf `EncryptionHealth`
//!
//! Die Crypto-Engine meldet ihren Zustand als rohen Code. Bekannte Codes
//! werden 1:1 abgebildet, unbekannte sind ein Vertragsbruch der Engine und
//! brechen nur den Abbildungsschritt ab.

use salon_core::EncryptionHealth;

use crate::error::{E2eeError, E2eeResult};

/// Zustaende einer Crypto-Session, wie die Engine sie kodiert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CryptorState {
    New = 0,
    Ok = 1,
    EncryptionFailed = 2,
    DecryptionFailed = 3,
    MissingKey = 4,
    KeyRatcheted = 5,
    InternalError = 6,
}

impl CryptorState {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for CryptorState {
    type Error = E2eeError;

    fn try_from(code: i32) -> E2eeResult<Self> {
        Ok(match code {
            0 => Self::New,
            1 => Self::Ok,
            2 => Self::EncryptionFailed,
            3 => Self::DecryptionFailed,
            4 => Self::MissingKey,
            5 => Self::KeyRatcheted,
            6 => Self::InternalError,
            other => return Err(E2eeError::UnbekannterZustand(other)),
        })
    }
}

impl From<CryptorState> for EncryptionHealth {
    fn from(state: CryptorState) -> Self {
        match state {
            CryptorState::New => EncryptionHealth::New,
            CryptorState::Ok => EncryptionHealth::Ok,
            CryptorState::EncryptionFailed => EncryptionHealth::EncryptionFailed,
            CryptorState::DecryptionFailed => EncryptionHealth::DecryptionFailed,
            CryptorState::MissingKey => EncryptionHealth::MissingKey,
            CryptorState::KeyRatcheted => EncryptionHealth::KeyRatcheted,
            CryptorState::InternalError => EncryptionHealth::InternalError,
        }
    }
}

/// Bildet einen rohen Engine-Code auf `EncryptionHealth` ab
pub fn map_state(code: i32) -> E2eeResult<EncryptionHealth> {
    CryptorState::try_from(code).map(EncryptionHealth::from)
}
