// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::policy::ResolvedPolicy;
use crate::source::CertificateSource;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::info;

/// Fans a trust-store change out to certificate sources and policies.
///
/// Policies are held weakly; dropping the last strong reference unregisters them on the next
/// notification.
#[derive(Default)]
pub struct TrustStoreChangeNotifier {
    sources: Mutex<Vec<Arc<dyn CertificateSource>>>,
    policies: Mutex<Vec<Weak<ResolvedPolicy>>>,
}

impl TrustStoreChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source(&self, source: Arc<dyn CertificateSource>) {
        let mut sources = self.sources.lock();
        if !sources
            .iter()
            .any(|s| std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(&source)))
        {
            sources.push(source);
        }
    }

    pub fn register_policy(&self, policy: &Arc<ResolvedPolicy>) {
        let weak = Arc::downgrade(policy);
        let mut policies = self.policies.lock();
        policies.retain(|p| p.strong_count() > 0);
        if !policies.iter().any(|p| Weak::ptr_eq(p, &weak)) {
            policies.push(weak);
        }
    }

    /// Number of policy registrations currently held, including ones whose policy has been
    /// dropped since the last prune.
    pub fn registered_policies(&self) -> usize {
        self.policies.lock().len()
    }

    /// Number of registered policies that are still alive.
    pub fn live_policies(&self) -> usize {
        self.policies
            .lock()
            .iter()
            .filter(|p| p.strong_count() > 0)
            .count()
    }

    /// Tell every registered source that storage changed, then invalidate the cached anchors of
    /// every live registered policy. Returns the number of policies invalidated.
    pub fn notify_trust_store_changed(&self) -> usize {
        let sources: Vec<_> = self.sources.lock().clone();
        for source in &sources {
            source.handle_trust_storage_update();
        }

        let live: Vec<Arc<ResolvedPolicy>> = {
            let mut policies = self.policies.lock();
            policies.retain(|p| p.strong_count() > 0);
            policies.iter().filter_map(Weak::upgrade).collect()
        };
        for policy in &live {
            policy.on_trust_store_change();
        }

        info!(
            sources = sources.len(),
            policies = live.len(),
            "trust store changed"
        );
        live.len()
    }
}
