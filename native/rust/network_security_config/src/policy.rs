// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::anchor::TrustAnchorSet;
use crate::cache::CacheCell;
use crate::error::PolicyError;
use crate::pin::PinSet;
use crate::source::CertificateEntryRef;
use crate::trust_manager::{TrustManager, TrustManagerFactory};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Effective values computed from a builder chain at build time.
#[derive(Debug, Clone)]
pub(crate) struct EffectiveValues {
    pub cleartext_traffic_permitted: bool,
    pub hsts_enforced: bool,
    pub pins: PinSet,
    pub certificate_entry_refs: Vec<CertificateEntryRef>,
}

/// An immutable, shareable trust policy.
///
/// The configuration fields never change after construction. The aggregated trust anchors and
/// the trust manager are computed on first use, each behind its own lock, so a slow anchor
/// computation never blocks trust-manager retrieval.
pub struct ResolvedPolicy {
    cleartext_traffic_permitted: bool,
    hsts_enforced: bool,
    pins: PinSet,
    certificate_entry_refs: Vec<CertificateEntryRef>,
    trust_manager_factory: Arc<dyn TrustManagerFactory>,
    anchors: CacheCell<TrustAnchorSet>,
    trust_manager: CacheCell<dyn TrustManager>,
    this: Weak<ResolvedPolicy>,
}

impl ResolvedPolicy {
    pub(crate) fn new(
        values: EffectiveValues,
        trust_manager_factory: Arc<dyn TrustManagerFactory>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            cleartext_traffic_permitted: values.cleartext_traffic_permitted,
            hsts_enforced: values.hsts_enforced,
            pins: values.pins,
            certificate_entry_refs: values.certificate_entry_refs,
            trust_manager_factory,
            anchors: CacheCell::new(),
            trust_manager: CacheCell::new(),
            this: this.clone(),
        })
    }

    pub fn is_cleartext_traffic_permitted(&self) -> bool {
        self.cleartext_traffic_permitted
    }

    pub fn is_hsts_enforced(&self) -> bool {
        self.hsts_enforced
    }

    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    pub fn certificate_entry_refs(&self) -> &[CertificateEntryRef] {
        &self.certificate_entry_refs
    }

    /// Union of the trust anchors of every entry ref, in entry-ref order.
    ///
    /// Computed once and cached until [`ResolvedPolicy::on_trust_store_change`]. A failing
    /// certificate source fails the call and nothing is cached, so the next call retries.
    pub fn trust_anchors(&self) -> Result<Arc<TrustAnchorSet>, PolicyError> {
        self.anchors.get_or_try_init(|| {
            let mut anchors = TrustAnchorSet::new();
            for entry in &self.certificate_entry_refs {
                let found = entry.trust_anchors().map_err(|e| {
                    warn!(source = entry.source().name(), error = %e, "certificate source failed");
                    e
                })?;
                anchors.extend(found);
            }

            debug!(
                anchors = anchors.len(),
                entry_refs = self.certificate_entry_refs.len(),
                "computed trust anchor set"
            );
            Ok(Arc::new(anchors))
        })
    }

    /// Returns `true` if an anchor set is currently cached.
    pub fn has_cached_trust_anchors(&self) -> bool {
        self.anchors.is_populated()
    }

    /// The trust manager bound to this policy, created on first use.
    ///
    /// Every successful call returns the same handle. Invalidating trust anchors does not
    /// replace it.
    pub fn trust_manager(&self) -> Result<Arc<dyn TrustManager>, PolicyError> {
        self.trust_manager.get_or_try_init(|| {
            let manager = self.trust_manager_factory.create(self.this.clone())?;
            debug!("created trust manager");
            Ok(manager)
        })
    }

    /// Drop the cached trust anchors so the next [`ResolvedPolicy::trust_anchors`] recomputes
    /// them from current source state. Idempotent.
    pub fn on_trust_store_change(&self) {
        if self.anchors.invalidate() {
            debug!("invalidated cached trust anchors");
        }
    }

    /// Compares the configuration fields, ignoring cache state and the trust-manager factory.
    pub fn same_configuration(&self, other: &ResolvedPolicy) -> bool {
        self.cleartext_traffic_permitted == other.cleartext_traffic_permitted
            && self.hsts_enforced == other.hsts_enforced
            && self.pins == other.pins
            && self.certificate_entry_refs == other.certificate_entry_refs
    }
}

impl fmt::Debug for ResolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPolicy")
            .field(
                "cleartext_traffic_permitted",
                &self.cleartext_traffic_permitted,
            )
            .field("hsts_enforced", &self.hsts_enforced)
            .field("pins", &self.pins)
            .field("certificate_entry_refs", &self.certificate_entry_refs)
            .field("anchors", &self.anchors)
            .field("trust_manager", &self.trust_manager)
            .finish()
    }
}
