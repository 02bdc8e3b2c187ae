//! PKCE verifier and S256 challenge.

use crate::error::{VkontakteError, VkontakteResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;

pub const DEFAULT_VERIFIER_LENGTH: usize = 64;
pub const CHALLENGE_METHOD: &str = "S256";

/// The secret half of a PKCE pair. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Verifier(String);

impl Verifier {
    /// Wraps a verifier that was persisted by the caller.
    pub fn from_raw(verifier: impl Into<String>) -> Self {
        Self(verifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn challenge(&self) -> Challenge {
        derive_challenge(self)
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Verifier").field(&"[redacted]").finish()
    }
}

/// `base64url(sha256(verifier))` without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `length` bytes from the OS random source, hex-encoded.
pub fn generate_verifier(length: usize) -> VkontakteResult<Verifier> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| VkontakteError::EntropyUnavailable(e.to_string()))?;
    Ok(Verifier(hex::encode(bytes)))
}

pub fn derive_challenge(verifier: &Verifier) -> Challenge {
    let mut hasher = Sha256::new();
    hasher.update(verifier.0.as_bytes());
    Challenge(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}
