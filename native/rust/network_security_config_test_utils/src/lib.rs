// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test-only doubles for exercising policy resolution and caching.
//!
//! Kept out of `network_security_config` so the production surface stays focused.

use network_security_config::error::PolicyError;
use network_security_config::policy::ResolvedPolicy;
use network_security_config::trust_manager::{
    PolicyTrustManager, TrustManager, TrustManagerFactory,
};
use network_security_config::{Certificate, CertificateSource, Pin};
use parking_lot::Mutex;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Generate a fresh self-signed CA certificate.
pub fn generate_ca_certificate(common_name: &str) -> Certificate {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("certificate params");
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

    let key_pair = KeyPair::generate().expect("key generation");
    let cert = params.self_signed(&key_pair).expect("self-signed certificate");
    Certificate::from_der(cert.der().as_ref().to_vec()).expect("generated certificate decodes")
}

/// A SHA-256 pin whose digest is `byte` repeated.
pub fn sample_pin(byte: u8) -> Pin {
    Pin::sha256([byte; 32])
}

/// Certificate source that counts queries and can be told to fail or stall.
pub struct CountingCertificateSource {
    name: String,
    certificates: Mutex<Vec<Certificate>>,
    calls: AtomicUsize,
    storage_updates: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl CountingCertificateSource {
    pub fn new(name: &str, certificates: Vec<Certificate>) -> Self {
        Self {
            name: name.to_string(),
            certificates: Mutex::new(certificates),
            calls: AtomicUsize::new(0),
            storage_updates: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Sleep for `delay` inside every query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn storage_updates(&self) -> usize {
        self.storage_updates.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_certificates(&self, certificates: Vec<Certificate>) {
        *self.certificates.lock() = certificates;
    }
}

impl CertificateSource for CountingCertificateSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificates(&self) -> Result<Vec<Certificate>, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PolicyError::CertificateSource {
                source_name: self.name.clone(),
                message: "store unavailable".to_string(),
            });
        }
        Ok(self.certificates.lock().clone())
    }

    fn handle_trust_storage_update(&self) {
        self.storage_updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Trust-manager factory that counts constructions and can be told to fail or stall.
#[derive(Default)]
pub struct CountingTrustManagerFactory {
    creates: AtomicUsize,
    failing: AtomicBool,
    bound: Mutex<Vec<Weak<ResolvedPolicy>>>,
    delay: Option<Duration>,
}

impl CountingTrustManagerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every construction.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Policies this factory has been asked to bind, in call order.
    pub fn bound_policies(&self) -> Vec<Weak<ResolvedPolicy>> {
        self.bound.lock().clone()
    }
}

impl TrustManagerFactory for CountingTrustManagerFactory {
    fn create(&self, policy: Weak<ResolvedPolicy>) -> Result<Arc<dyn TrustManager>, PolicyError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.bound.lock().push(policy.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PolicyError::TrustManager("factory unavailable".to_string()));
        }
        Ok(Arc::new(PolicyTrustManager::new(policy)))
    }
}
