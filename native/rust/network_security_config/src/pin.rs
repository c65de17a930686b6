// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PolicyError;
use base64::Engine;
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Canonical name of the only supported pin digest algorithm.
pub const SHA256: &str = "SHA-256";

/// An expected digest of a certificate's public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin {
    digest_algorithm: String,
    digest: Vec<u8>,
}

impl Pin {
    /// Create a pin, validating the algorithm and digest length.
    ///
    /// Algorithm names are matched case-insensitively and stored in canonical form.
    pub fn new(digest_algorithm: &str, digest: impl Into<Vec<u8>>) -> Result<Self, PolicyError> {
        let digest = digest.into();
        let Some(expected_len) = Self::digest_length(digest_algorithm) else {
            return Err(PolicyError::InvalidPin(format!(
                "unsupported digest algorithm: {digest_algorithm}"
            )));
        };
        if digest.len() != expected_len {
            return Err(PolicyError::InvalidPin(format!(
                "{SHA256} digest must be {expected_len} bytes, got {}",
                digest.len()
            )));
        }
        Ok(Self {
            digest_algorithm: SHA256.to_string(),
            digest,
        })
    }

    /// Create a pin from a base64 (standard alphabet, padded) digest.
    pub fn from_base64(digest_algorithm: &str, encoded: &str) -> Result<Self, PolicyError> {
        let digest = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| PolicyError::InvalidPin(format!("digest is not valid base64: {e}")))?;
        Self::new(digest_algorithm, digest)
    }

    /// A SHA-256 pin. Infallible because the length is fixed by the type.
    pub fn sha256(digest: [u8; 32]) -> Self {
        Self {
            digest_algorithm: SHA256.to_string(),
            digest: digest.to_vec(),
        }
    }

    pub fn is_supported_digest_algorithm(digest_algorithm: &str) -> bool {
        Self::digest_length(digest_algorithm).is_some()
    }

    /// Digest length in bytes for a supported algorithm.
    pub fn digest_length(digest_algorithm: &str) -> Option<usize> {
        if digest_algorithm.eq_ignore_ascii_case(SHA256) {
            Some(32)
        } else {
            None
        }
    }

    pub fn digest_algorithm(&self) -> &str {
        &self.digest_algorithm
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.digest)
    }
}

/// A set of pins plus an optional expiration.
///
/// The default value is the empty pin set, which never expires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    pins: BTreeSet<Pin>,
    expiration: Option<SystemTime>,
}

impl PinSet {
    pub fn new(pins: impl IntoIterator<Item = Pin>, expiration: Option<SystemTime>) -> Self {
        Self {
            pins: pins.into_iter().collect(),
            expiration,
        }
    }

    /// The distinguished empty pin set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter()
    }

    pub fn contains(&self, pin: &Pin) -> bool {
        self.pins.contains(pin)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn expiration(&self) -> Option<SystemTime> {
        self.expiration
    }

    /// Returns `true` once `now` has reached the expiration time.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expiration.map(|e| now >= e).unwrap_or(false)
    }

    /// Distinct digest algorithms used by the pins in this set.
    pub fn pin_algorithms(&self) -> BTreeSet<&str> {
        self.pins.iter().map(|p| p.digest_algorithm()).collect()
    }
}
