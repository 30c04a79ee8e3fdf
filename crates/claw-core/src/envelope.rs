//! Password-sealed envelope for configuration files.
//!
//! Wire format (text, one line):
//!
//! ```text
//! base64(salt:16) ":" base64(nonce:12 || ciphertext || tag:16)
//! ```
//!
//! Standard base64 with padding; `:` is outside the base64 alphabet so the
//! split is unambiguous. There is no version or magic prefix.

use base64::{engine::general_purpose, Engine as _};

use crate::crypto::{
    derive_key, generate_nonce, generate_salt, open, seal, KdfParams, NONCE_LEN, SALT_LEN,
};
use crate::error::StoreError;

pub const SEPARATOR: char = ':';

/// Parsed form of the envelope text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    /// Nonce prefix followed by ciphertext and tag.
    pub sealed: Vec<u8>,
}

impl Envelope {
    pub fn parse(data: &[u8]) -> Result<Self, StoreError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| StoreError::MalformedEnvelope("not utf-8 text".into()))?
            .trim();
        let (salt_b64, sealed_b64) = split_envelope(text)
            .ok_or_else(|| StoreError::MalformedEnvelope("expected exactly one ':' separator".into()))?;
        let salt = general_purpose::STANDARD
            .decode(salt_b64)
            .map_err(|e| StoreError::MalformedEnvelope(format!("decoding salt: {e}")))?;
        let salt: [u8; SALT_LEN] = salt.try_into().map_err(|v: Vec<u8>| {
            StoreError::MalformedEnvelope(format!("salt is {} bytes, expected {SALT_LEN}", v.len()))
        })?;
        let sealed = general_purpose::STANDARD
            .decode(sealed_b64)
            .map_err(|e| StoreError::MalformedEnvelope(format!("decoding ciphertext: {e}")))?;
        Ok(Self { salt, sealed })
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{SEPARATOR}{}",
            general_purpose::STANDARD.encode(self.salt),
            general_purpose::STANDARD.encode(&self.sealed)
        )
    }

    fn nonce_and_ciphertext(&self) -> Result<([u8; NONCE_LEN], &[u8]), StoreError> {
        if self.sealed.len() < NONCE_LEN {
            return Err(StoreError::Truncated {
                len: self.sealed.len(),
                nonce_len: NONCE_LEN,
            });
        }
        let (nonce, ciphertext) = self.sealed.split_at(NONCE_LEN);
        let mut nonce_buf = [0u8; NONCE_LEN];
        nonce_buf.copy_from_slice(nonce);
        Ok((nonce_buf, ciphertext))
    }
}

/// Encrypt/decrypt bound to a set of KDF parameters.
#[derive(Debug, Clone, Default)]
pub struct EncryptedStore {
    params: KdfParams,
}

impl EncryptedStore {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Seals `plaintext` under a key derived from `password` with a fresh salt and nonce.
    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
        let salt = generate_salt()?;
        let nonce = generate_nonce()?;
        let key = derive_key(password.as_bytes(), &salt, &self.params)?;
        let ciphertext = seal(&key, &nonce, plaintext)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(Envelope { salt, sealed }.encode().into_bytes())
    }

    /// Opens an envelope. Fails closed: no plaintext is returned unless the tag verifies.
    pub fn decrypt(&self, envelope: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
        let envelope = Envelope::parse(envelope)?;
        let (nonce, ciphertext) = envelope.nonce_and_ciphertext()?;
        let key = derive_key(password.as_bytes(), &envelope.salt, &self.params)?;
        open(&key, &nonce, ciphertext)
    }
}

/// [`EncryptedStore::encrypt`] with production KDF parameters.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
    EncryptedStore::default().encrypt(plaintext, password)
}

/// [`EncryptedStore::decrypt`] with production KDF parameters.
pub fn decrypt(envelope: &[u8], password: &str) -> Result<Vec<u8>, StoreError> {
    EncryptedStore::default().decrypt(envelope, password)
}

/// Shape probe only: one separator and two valid base64 halves.
/// Says nothing about authenticity.
pub fn looks_encrypted(data: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(data) else {
        return false;
    };
    let Some((salt_b64, sealed_b64)) = split_envelope(text.trim()) else {
        return false;
    };
    general_purpose::STANDARD.decode(salt_b64).is_ok()
        && general_purpose::STANDARD.decode(sealed_b64).is_ok()
}

fn split_envelope(text: &str) -> Option<(&str, &str)> {
    let (left, right) = text.split_once(SEPARATOR)?;
    if right.contains(SEPARATOR) {
        return None;
    }
    Some((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn store() -> EncryptedStore {
        EncryptedStore::new(KdfParams::minimum_cost_insecure())
    }

    #[test]
    fn roundtrip() {
        let plaintext = br#"{"routeros": {"host": "192.168.1.1", "password": "secret123"}}"#;
        let sealed = store().encrypt(plaintext, "my-encryption-password").unwrap();
        assert!(looks_encrypted(&sealed));
        let opened = store().decrypt(&sealed, "my-encryption-password").unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn roundtrip_empty_plaintext() {
        let sealed = store().encrypt(b"", "pw").unwrap();
        assert_eq!(store().decrypt(&sealed, "pw").unwrap(), b"");
    }

    #[test]
    fn wrong_password_fails() {
        let sealed = store().encrypt(br#"{"password": "secret"}"#, "correct-password").unwrap();
        let err = store().decrypt(&sealed, "wrong-password").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn every_encryption_uses_fresh_salt_and_nonce() {
        let a = Envelope::parse(&store().encrypt(b"same", "pw").unwrap()).unwrap();
        let b = Envelope::parse(&store().encrypt(b"same", "pw").unwrap()).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.sealed[..NONCE_LEN], b.sealed[..NONCE_LEN]);
    }

    #[test]
    fn envelope_layout() {
        let sealed = store().encrypt(b"abc", "pw").unwrap();
        let text = String::from_utf8(sealed.clone()).unwrap();
        assert_eq!(text.matches(SEPARATOR).count(), 1);
        let env = Envelope::parse(&sealed).unwrap();
        assert_eq!(env.sealed.len(), NONCE_LEN + 3 + crate::crypto::TAG_LEN);
        assert_eq!(env.encode(), text);
    }

    #[test]
    fn any_bit_flip_in_ciphertext_fails() {
        let sealed = store().encrypt(b"tamper me", "pw").unwrap();
        let env = Envelope::parse(&sealed).unwrap();
        for byte in NONCE_LEN..env.sealed.len() {
            for bit in 0..8 {
                let mut tampered = env.clone();
                tampered.sealed[byte] ^= 1 << bit;
                let err = store()
                    .decrypt(tampered.encode().as_bytes(), "pw")
                    .unwrap_err();
                assert_eq!(err.kind(), Some(ErrorKind::AuthenticationFailed));
            }
        }
    }

    #[test]
    fn missing_separator_is_malformed() {
        let err = store().decrypt(b"c2FsdA==", "pw").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let err = store().decrypt(b"not base64!:AAAA", "pw").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn short_salt_is_malformed() {
        let err = store().decrypt(b"AAAA:AAAAAAAAAAAAAAAAAAAAAAAA", "pw").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn sealed_shorter_than_nonce_is_truncated() {
        let env = Envelope {
            salt: [9u8; SALT_LEN],
            sealed: vec![0u8; NONCE_LEN - 1],
        };
        let err = store().decrypt(env.encode().as_bytes(), "pw").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Truncated));
    }

    #[test]
    fn missing_tag_is_authentication_failure() {
        let sealed = store().encrypt(b"payload", "pw").unwrap();
        let mut env = Envelope::parse(&sealed).unwrap();
        env.sealed.truncate(NONCE_LEN + 4);
        let err = store().decrypt(env.encode().as_bytes(), "pw").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn trailing_newline_tolerated() {
        let mut sealed = store().encrypt(b"x", "pw").unwrap();
        sealed.push(b'\n');
        assert!(looks_encrypted(&sealed));
        assert_eq!(store().decrypt(&sealed, "pw").unwrap(), b"x");
    }

    #[test]
    fn plaintext_json_is_not_encrypted() {
        assert!(!looks_encrypted(br#"{"host": "192.168.1.1"}"#));
        assert!(!looks_encrypted(br#"{"host":"x"}"#));
        assert!(!looks_encrypted(b"no separator"));
        assert!(!looks_encrypted(b"QUJD:QUJD:QUJD"));
        assert!(!looks_encrypted(&[0xff, 0xfe, b':', b'A']));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_plaintext_roundtrips(plaintext in vec(any::<u8>(), 0..512), password in ".{1,32}") {
            let sealed = store().encrypt(&plaintext, &password).unwrap();
            prop_assert_eq!(store().decrypt(&sealed, &password).unwrap(), plaintext);
        }

        #[test]
        fn encrypt_output_always_looks_encrypted(plaintext in vec(any::<u8>(), 0..256), password in ".{1,32}") {
            let sealed = store().encrypt(&plaintext, &password).unwrap();
            prop_assert!(looks_encrypted(&sealed));
        }

        #[test]
        fn other_password_never_opens(
            plaintext in vec(any::<u8>(), 0..256),
            password in ".{1,32}",
            other in ".{1,32}",
        ) {
            prop_assume!(password != other);
            let sealed = store().encrypt(&plaintext, &password).unwrap();
            let err = store().decrypt(&sealed, &other).unwrap_err();
            prop_assert_eq!(err.kind(), Some(ErrorKind::AuthenticationFailed));
        }
    }
}
