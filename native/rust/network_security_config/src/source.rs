// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate sources and the entry references that bind them into a policy.

use crate::anchor::TrustAnchor;
use crate::certificate::Certificate;
use crate::error::PolicyError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Supplies the certificates trusted by a store.
///
/// Implementations must be safe to call repeatedly and concurrently. `certificates` may perform
/// I/O; errors are surfaced to whoever asked a policy for its trust anchors.
pub trait CertificateSource: Send + Sync {
    /// Stable name used in diagnostics.
    fn name(&self) -> &str;

    /// The certificates this source currently trusts.
    fn certificates(&self) -> Result<Vec<Certificate>, PolicyError>;

    /// Called by [`crate::notifier::TrustStoreChangeNotifier`] before dependent policies are
    /// invalidated, so sources can drop their own caches.
    fn handle_trust_storage_update(&self) {}
}

/// A certificate source as referenced from a policy.
#[derive(Clone)]
pub struct CertificateEntryRef {
    source: Arc<dyn CertificateSource>,
    overrides_pins: bool,
}

impl CertificateEntryRef {
    pub fn new(source: Arc<dyn CertificateSource>, overrides_pins: bool) -> Self {
        Self {
            source,
            overrides_pins,
        }
    }

    pub fn source(&self) -> &Arc<dyn CertificateSource> {
        &self.source
    }

    /// Whether anchors from this source bypass pin checks.
    pub fn overrides_pins(&self) -> bool {
        self.overrides_pins
    }

    /// Query the source and tag every certificate with this ref's `overrides_pins` flag.
    pub fn trust_anchors(&self) -> Result<Vec<TrustAnchor>, PolicyError> {
        let certificates = self.source.certificates().map_err(|e| match e {
            e @ PolicyError::CertificateSource { .. } => e,
            other => PolicyError::CertificateSource {
                source_name: self.source.name().to_string(),
                message: other.to_string(),
            },
        })?;

        Ok(certificates
            .into_iter()
            .map(|certificate| TrustAnchor::new(certificate, self.overrides_pins))
            .collect())
    }
}

impl PartialEq for CertificateEntryRef {
    /// Two refs are equal when they point at the same source instance with the same flag.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.source), Arc::as_ptr(&other.source))
            && self.overrides_pins == other.overrides_pins
    }
}

impl Eq for CertificateEntryRef {}

impl fmt::Debug for CertificateEntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateEntryRef")
            .field("source", &self.source.name())
            .field("overrides_pins", &self.overrides_pins)
            .finish()
    }
}

/// A mutable, in-process certificate store.
///
/// Useful wherever certificates are provisioned programmatically. Mutations are visible to the
/// next anchor computation of any policy that references this source; pair them with
/// [`crate::notifier::TrustStoreChangeNotifier::notify_trust_store_changed`] to drop cached
/// anchor sets.
pub struct InMemoryCertificateSource {
    name: String,
    certificates: RwLock<Vec<Certificate>>,
}

impl InMemoryCertificateSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_certificates(name, Vec::new())
    }

    pub fn with_certificates(name: impl Into<String>, certificates: Vec<Certificate>) -> Self {
        let source = Self {
            name: name.into(),
            certificates: RwLock::new(Vec::new()),
        };
        source.replace_all(certificates);
        source
    }

    /// Add a certificate. Returns `false` if it was already present.
    pub fn add(&self, certificate: Certificate) -> bool {
        let mut certificates = self.certificates.write();
        if certificates.contains(&certificate) {
            return false;
        }
        certificates.push(certificate);
        true
    }

    /// Remove a certificate. Returns `false` if it was not present.
    pub fn remove(&self, certificate: &Certificate) -> bool {
        let mut certificates = self.certificates.write();
        let before = certificates.len();
        certificates.retain(|c| c != certificate);
        certificates.len() != before
    }

    /// Replace the whole store, dropping duplicates.
    pub fn replace_all(&self, certificates: Vec<Certificate>) {
        let mut deduped: Vec<Certificate> = Vec::with_capacity(certificates.len());
        for certificate in certificates {
            if !deduped.contains(&certificate) {
                deduped.push(certificate);
            }
        }
        *self.certificates.write() = deduped;
    }

    pub fn len(&self) -> usize {
        self.certificates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.read().is_empty()
    }
}

impl CertificateSource for InMemoryCertificateSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificates(&self) -> Result<Vec<Certificate>, PolicyError> {
        Ok(self.certificates.read().clone())
    }
}

impl fmt::Debug for InMemoryCertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCertificateSource")
            .field("name", &self.name)
            .field("certificates", &self.len())
            .finish()
    }
}
