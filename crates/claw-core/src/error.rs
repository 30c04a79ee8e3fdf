use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure kinds callers branch on instead of matching message text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MalformedEnvelope,
    Truncated,
    AuthenticationFailed,
    UpstreamFetchFailed,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("truncated ciphertext: {len} bytes is shorter than the {nonce_len}-byte nonce")]
    Truncated { len: usize, nonce_len: usize },

    /// Wrong password and tampered ciphertext are deliberately indistinguishable.
    #[error("decryption failed (wrong password?)")]
    AuthenticationFailed,

    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("cipher failure: {0}")]
    Cipher(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

impl StoreError {
    /// Kind for the recoverable conditions; `None` for fatal environment failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StoreError::MalformedEnvelope(_) => Some(ErrorKind::MalformedEnvelope),
            StoreError::Truncated { .. } => Some(ErrorKind::Truncated),
            StoreError::AuthenticationFailed => Some(ErrorKind::AuthenticationFailed),
            StoreError::RandomUnavailable(_)
            | StoreError::Cipher(_)
            | StoreError::KeyDerivation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_recoverable_errors() {
        assert_eq!(
            StoreError::MalformedEnvelope("x".into()).kind(),
            Some(ErrorKind::MalformedEnvelope)
        );
        assert_eq!(
            StoreError::Truncated { len: 3, nonce_len: 12 }.kind(),
            Some(ErrorKind::Truncated)
        );
        assert_eq!(
            StoreError::AuthenticationFailed.kind(),
            Some(ErrorKind::AuthenticationFailed)
        );
        assert_eq!(StoreError::RandomUnavailable("gone".into()).kind(), None);
    }

    #[test]
    fn authentication_message_is_generic() {
        let text = StoreError::AuthenticationFailed.to_string();
        assert_eq!(text, "decryption failed (wrong password?)");
    }
}
