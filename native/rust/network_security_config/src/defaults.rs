// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The default policy and its process-wide slot.

use crate::builder::{PolicyBuilder, DEFAULT_CLEARTEXT_TRAFFIC_PERMITTED, DEFAULT_HSTS_ENFORCED};
use crate::error::PolicyError;
use crate::policy::ResolvedPolicy;
use crate::source::{CertificateEntryRef, CertificateSource, InMemoryCertificateSource};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The platform certificate stores the default policy trusts.
#[derive(Clone)]
pub struct DefaultSources {
    /// Certificates shipped with the platform.
    pub system: Arc<dyn CertificateSource>,
    /// Certificates the user added.
    pub user: Arc<dyn CertificateSource>,
}

impl DefaultSources {
    pub fn new(system: Arc<dyn CertificateSource>, user: Arc<dyn CertificateSource>) -> Self {
        Self { system, user }
    }

    /// Two empty in-memory stores named `system` and `user`.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCertificateSource::new("system")),
            Arc::new(InMemoryCertificateSource::new("user")),
        )
    }
}

impl fmt::Debug for DefaultSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSources")
            .field("system", &self.system.name())
            .field("user", &self.user.name())
            .finish()
    }
}

/// A builder for the default policy:
/// - cleartext traffic is permitted
/// - HSTS is not enforced
/// - no pins
/// - the system store, then the user-added store, are trusted
pub fn default_builder(sources: &DefaultSources) -> PolicyBuilder {
    PolicyBuilder::new()
        .set_cleartext_traffic_permitted(DEFAULT_CLEARTEXT_TRAFFIC_PERMITTED)
        .set_hsts_enforced(DEFAULT_HSTS_ENFORCED)
        // System store, does not bypass static pins.
        .add_certificate_entry_ref(CertificateEntryRef::new(Arc::clone(&sources.system), false))
        // User-added store, does not bypass static pins.
        .add_certificate_entry_ref(CertificateEntryRef::new(Arc::clone(&sources.user), false))
}

static DEFAULT_POLICY: OnceCell<Arc<ResolvedPolicy>> = OnceCell::new();

/// Build the default policy and store it for the rest of the process.
///
/// Only the first call succeeds; later calls fail with
/// [`PolicyError::DefaultPolicyAlreadyInstalled`] and leave the installed policy in place.
pub fn install_default_policy(sources: &DefaultSources) -> Result<Arc<ResolvedPolicy>, PolicyError> {
    let mut installed_now = false;
    let policy = DEFAULT_POLICY.get_or_init(|| {
        installed_now = true;
        default_builder(sources).build()
    });

    if !installed_now {
        return Err(PolicyError::DefaultPolicyAlreadyInstalled);
    }

    info!(
        system = sources.system.name(),
        user = sources.user.name(),
        "installed default network security policy"
    );
    Ok(Arc::clone(policy))
}

/// The installed default policy, if any. Never torn down.
pub fn default_policy() -> Option<Arc<ResolvedPolicy>> {
    DEFAULT_POLICY.get().cloned()
}
