// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::PolicyError;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use x509_parser::prelude::*;

/// A decoded X.509 certificate.
///
/// Only the DER encoding participates in equality and hashing; subject, issuer and fingerprint
/// are cached at decode time for diagnostics and indexing.
#[derive(Clone)]
pub struct Certificate {
    der: Arc<[u8]>,
    subject: String,
    issuer: String,
    fingerprint_sha256: [u8; 32],
}

impl Certificate {
    /// Decode a DER-encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, PolicyError> {
        let der: Vec<u8> = der.into();

        let (subject, issuer) = {
            let (rest, cert) = X509Certificate::from_der(der.as_slice()).map_err(|e| {
                PolicyError::InvalidCertificate(format!("x509 parse failed: {e:?}"))
            })?;
            // The fingerprint covers the whole input, so it must be exactly one certificate.
            if !rest.is_empty() {
                return Err(PolicyError::InvalidCertificate(format!(
                    "{} trailing bytes after certificate",
                    rest.len()
                )));
            }
            (cert.subject().to_string(), cert.issuer().to_string())
        };

        let mut hasher = Sha256::new();
        hasher.update(der.as_slice());
        let digest = hasher.finalize();
        let mut fingerprint_sha256 = [0u8; 32];
        fingerprint_sha256.copy_from_slice(&digest);

        Ok(Self {
            der: der.into(),
            subject,
            issuer,
            fingerprint_sha256,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// SHA-256 over the DER encoding.
    pub fn fingerprint_sha256(&self) -> &[u8; 32] {
        &self.fingerprint_sha256
    }

    /// Upper-case hex of [`Certificate::fingerprint_sha256`].
    pub fn fingerprint_hex(&self) -> String {
        hex::encode_upper(self.fingerprint_sha256)
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("fingerprint_sha256", &self.fingerprint_hex())
            .finish()
    }
}
