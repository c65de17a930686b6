// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::certificate::Certificate;
use std::collections::HashMap;

/// A certificate trusted as a root of validation.
///
/// `overrides_pins` is carried from the [`crate::source::CertificateEntryRef`] that supplied the
/// certificate; it is interpreted by pin evaluation, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrustAnchor {
    pub certificate: Certificate,
    pub overrides_pins: bool,
}

impl TrustAnchor {
    pub fn new(certificate: Certificate, overrides_pins: bool) -> Self {
        Self {
            certificate,
            overrides_pins,
        }
    }
}

/// Insertion-ordered set of trust anchors, unique by certificate.
///
/// The first anchor inserted for a certificate wins; later duplicates are ignored even when
/// their `overrides_pins` flag differs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
    by_fingerprint: HashMap<[u8; 32], usize>,
}

impl TrustAnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an anchor. Returns `false` if the certificate was already present.
    pub fn insert(&mut self, anchor: TrustAnchor) -> bool {
        let key = *anchor.certificate.fingerprint_sha256();
        if self.by_fingerprint.contains_key(&key) {
            return false;
        }
        self.by_fingerprint.insert(key, self.anchors.len());
        self.anchors.push(anchor);
        true
    }

    /// Look up the anchor recorded for a certificate.
    pub fn find(&self, certificate: &Certificate) -> Option<&TrustAnchor> {
        self.by_fingerprint
            .get(certificate.fingerprint_sha256())
            .and_then(|i| self.anchors.get(*i))
    }

    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.find(certificate).is_some()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrustAnchor> {
        self.anchors.iter()
    }

    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> {
        self.anchors.iter().map(|a| &a.certificate)
    }
}

impl Extend<TrustAnchor> for TrustAnchorSet {
    fn extend<I: IntoIterator<Item = TrustAnchor>>(&mut self, iter: I) {
        for anchor in iter {
            self.insert(anchor);
        }
    }
}

impl FromIterator<TrustAnchor> for TrustAnchorSet {
    fn from_iter<I: IntoIterator<Item = TrustAnchor>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a TrustAnchorSet {
    type Item = &'a TrustAnchor;
    type IntoIter = std::slice::Iter<'a, TrustAnchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
