// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use network_security_config::pin::SHA256;
use network_security_config::{
    Certificate, CertificateSource, InMemoryCertificateSource, Pin, PinSet, PolicyError,
    TrustAnchor, TrustAnchorSet,
};
use network_security_config_test_utils::{generate_ca_certificate, sample_pin};
use std::time::{Duration, SystemTime};

#[test]
fn certificate_decodes_subject_and_fingerprint() {
    let cert = generate_ca_certificate("Example Root");
    assert!(cert.subject().contains("Example Root"));
    assert!(cert.is_self_issued());
    assert_eq!(64, cert.fingerprint_hex().len());

    let again = Certificate::from_der(cert.der().to_vec()).unwrap();
    assert_eq!(cert, again);
    assert_eq!(cert.fingerprint_sha256(), again.fingerprint_sha256());
}

#[test]
fn garbage_is_not_a_certificate() {
    assert!(matches!(
        Certificate::from_der(vec![0x30, 0x03, 0x02, 0x01]),
        Err(PolicyError::InvalidCertificate(_))
    ));
}

#[test]
fn pins_accept_sha256_only() {
    assert!(Pin::is_supported_digest_algorithm("sha-256"));
    assert!(!Pin::is_supported_digest_algorithm("SHA-1"));

    let pin = Pin::new("sha-256", vec![0xAB; 32]).unwrap();
    assert_eq!(SHA256, pin.digest_algorithm());
    assert_eq!(sample_pin(0xAB), pin);

    assert!(matches!(
        Pin::new("SHA-1", vec![0; 20]),
        Err(PolicyError::InvalidPin(_))
    ));
    assert!(matches!(
        Pin::new(SHA256, vec![0; 31]),
        Err(PolicyError::InvalidPin(_))
    ));
}

#[test]
fn pins_parse_base64_digests() {
    let pin = sample_pin(0x11);
    let parsed = Pin::from_base64(SHA256, &pin.to_base64()).unwrap();
    assert_eq!(pin, parsed);

    assert!(matches!(
        Pin::from_base64(SHA256, "not base64!"),
        Err(PolicyError::InvalidPin(_))
    ));
}

#[test]
fn pin_set_reports_algorithms_and_expiration() {
    let empty = PinSet::empty();
    assert!(empty.is_empty());
    assert!(empty.pin_algorithms().is_empty());
    assert!(!empty.is_expired_at(SystemTime::now() + Duration::from_secs(1 << 30)));

    let expires = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
    let set = PinSet::new([sample_pin(1), sample_pin(2), sample_pin(1)], Some(expires));
    assert_eq!(2, set.len());
    assert!(set.contains(&sample_pin(2)));
    assert_eq!(vec![SHA256], set.pin_algorithms().into_iter().collect::<Vec<_>>());
    assert!(!set.is_expired_at(SystemTime::UNIX_EPOCH));
    assert!(set.is_expired_at(expires));
}

#[test]
fn anchor_set_ignores_later_duplicates() {
    let cert = generate_ca_certificate("Root");
    let mut set = TrustAnchorSet::new();
    assert!(set.insert(TrustAnchor::new(cert.clone(), true)));
    assert!(!set.insert(TrustAnchor::new(cert.clone(), false)));
    assert_eq!(1, set.len());
    assert!(set.find(&cert).unwrap().overrides_pins);
}

#[test]
fn in_memory_source_tracks_mutations() {
    let a = generate_ca_certificate("A");
    let b = generate_ca_certificate("B");
    let source = InMemoryCertificateSource::with_certificates("mem", vec![a.clone(), a.clone()]);
    assert_eq!(1, source.len());

    assert!(source.add(b.clone()));
    assert!(!source.add(b.clone()));
    assert_eq!(vec![a.clone(), b.clone()], source.certificates().unwrap());

    assert!(source.remove(&a));
    assert!(!source.remove(&a));
    source.replace_all(vec![]);
    assert!(source.is_empty());
    assert_eq!("mem", source.name());
}

#[test]
fn trailing_bytes_after_der_are_rejected() {
    let cert = generate_ca_certificate("Padded Root");
    let mut padded = cert.der().to_vec();
    padded.extend_from_slice(&[0xde, 0xad]);

    assert!(matches!(
        Certificate::from_der(padded),
        Err(PolicyError::InvalidCertificate(_))
    ));
    // The exact encoding still decodes, so one certificate has exactly one anchor identity.
    assert!(Certificate::from_der(cert.der().to_vec()).is_ok());
}
