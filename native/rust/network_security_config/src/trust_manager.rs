// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trust-manager handles bound to a resolved policy.
//!
//! Chain verification itself lives outside this crate; a [`TrustManager`] here is the handle a
//! TLS stack is given for a policy.

use crate::certificate::Certificate;
use crate::error::PolicyError;
use crate::policy::ResolvedPolicy;
use std::sync::{Arc, Weak};

pub trait TrustManager: Send + Sync {
    /// Certificates acceptable as chain issuers.
    fn accepted_issuers(&self) -> Result<Vec<Certificate>, PolicyError>;
}

/// Creates the trust manager for a policy.
///
/// The policy is passed weakly because it owns the handle that is returned.
pub trait TrustManagerFactory: Send + Sync {
    fn create(&self, policy: Weak<ResolvedPolicy>) -> Result<Arc<dyn TrustManager>, PolicyError>;
}

/// Trust manager that accepts the policy's trust anchors as issuers.
#[derive(Debug)]
pub struct PolicyTrustManager {
    policy: Weak<ResolvedPolicy>,
}

impl PolicyTrustManager {
    pub fn new(policy: Weak<ResolvedPolicy>) -> Self {
        Self { policy }
    }

    /// The bound policy, if it is still alive.
    pub fn policy(&self) -> Option<Arc<ResolvedPolicy>> {
        self.policy.upgrade()
    }
}

impl TrustManager for PolicyTrustManager {
    fn accepted_issuers(&self) -> Result<Vec<Certificate>, PolicyError> {
        let policy = self.policy().ok_or_else(|| {
            PolicyError::TrustManager("the bound policy has been dropped".to_string())
        })?;
        let anchors = policy.trust_anchors()?;
        Ok(anchors.certificates().cloned().collect())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyTrustManagerFactory;

impl TrustManagerFactory for PolicyTrustManagerFactory {
    fn create(&self, policy: Weak<ResolvedPolicy>) -> Result<Arc<dyn TrustManager>, PolicyError> {
        Ok(Arc::new(PolicyTrustManager::new(policy)))
    }
}
