// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use network_security_config::{
    CertificateEntryRef, CertificateSource, PolicyBuilder, PolicyError, ResolvedPolicy,
    TrustAnchor,
};
use network_security_config_test_utils::{generate_ca_certificate, CountingCertificateSource};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn policy_over(sources: &[Arc<CountingCertificateSource>]) -> Arc<ResolvedPolicy> {
    let refs = sources
        .iter()
        .map(|s| CertificateEntryRef::new(s.clone() as Arc<dyn CertificateSource>, false));
    PolicyBuilder::new().add_certificate_entry_refs(refs).build()
}

#[test]
fn anchors_are_the_union_of_all_sources_in_order() {
    let a = generate_ca_certificate("Root A");
    let b = generate_ca_certificate("Root B");
    let c = generate_ca_certificate("Root C");
    let first = Arc::new(CountingCertificateSource::new("first", vec![a.clone(), b.clone()]));
    let second = Arc::new(CountingCertificateSource::new("second", vec![c.clone()]));

    let policy = policy_over(&[first, second]);
    let anchors = policy.trust_anchors().unwrap();

    let certs: Vec<_> = anchors.certificates().cloned().collect();
    assert_eq!(vec![a, b, c], certs);
}

#[test]
fn first_entry_ref_wins_for_duplicate_certificates() {
    let shared = generate_ca_certificate("Shared Root");
    let pinned = Arc::new(CountingCertificateSource::new("pinned", vec![shared.clone()]));
    let bypass = Arc::new(CountingCertificateSource::new("bypass", vec![shared.clone()]));

    let policy = PolicyBuilder::new()
        .add_certificate_entry_ref(CertificateEntryRef::new(pinned, false))
        .add_certificate_entry_ref(CertificateEntryRef::new(bypass, true))
        .build();

    let anchors = policy.trust_anchors().unwrap();
    assert_eq!(1, anchors.len());
    assert_eq!(
        Some(&TrustAnchor::new(shared, false)),
        anchors.iter().next()
    );
}

#[test]
fn overrides_pins_flag_is_carried_per_entry_ref() {
    let system_root = generate_ca_certificate("System Root");
    let debug_root = generate_ca_certificate("Debug Root");
    let system = Arc::new(CountingCertificateSource::new("system", vec![system_root.clone()]));
    let debug = Arc::new(CountingCertificateSource::new("debug", vec![debug_root.clone()]));

    let policy = PolicyBuilder::new()
        .add_certificate_entry_ref(CertificateEntryRef::new(system, false))
        .add_certificate_entry_ref(CertificateEntryRef::new(debug, true))
        .build();

    let anchors = policy.trust_anchors().unwrap();
    assert!(!anchors.find(&system_root).unwrap().overrides_pins);
    assert!(anchors.find(&debug_root).unwrap().overrides_pins);
}

#[test]
fn anchors_are_computed_once_and_shared() {
    let source = Arc::new(CountingCertificateSource::new(
        "store",
        vec![generate_ca_certificate("Root")],
    ));
    let policy = policy_over(&[source.clone()]);
    assert!(!policy.has_cached_trust_anchors());

    let first = policy.trust_anchors().unwrap();
    let second = policy.trust_anchors().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(1, source.calls());
    assert!(policy.has_cached_trust_anchors());
}

#[test]
fn concurrent_cold_reads_aggregate_once() {
    const THREADS: usize = 16;
    let source = Arc::new(
        CountingCertificateSource::new("slow", vec![generate_ca_certificate("Root")])
            .with_delay(Duration::from_millis(50)),
    );
    let policy = policy_over(&[source.clone()]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let policy = policy.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                policy.trust_anchors().unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(1, source.calls());
    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
    assert_eq!(1, results[0].len());
}

#[test]
fn invalidation_requeries_every_source() {
    let root_a = generate_ca_certificate("Root A");
    let root_b = generate_ca_certificate("Root B");
    let first = Arc::new(CountingCertificateSource::new("first", vec![root_a.clone()]));
    let second = Arc::new(CountingCertificateSource::new("second", vec![]));
    let policy = policy_over(&[first.clone(), second.clone()]);

    let before = policy.trust_anchors().unwrap();
    assert_eq!(1, before.len());

    second.set_certificates(vec![root_b.clone()]);
    // Still cached.
    assert_eq!(1, policy.trust_anchors().unwrap().len());

    policy.on_trust_store_change();
    assert!(!policy.has_cached_trust_anchors());

    let after = policy.trust_anchors().unwrap();
    assert_eq!(2, first.calls());
    assert_eq!(2, second.calls());
    assert!(after.contains(&root_a));
    assert!(after.contains(&root_b));
    // The previously handed-out set is unchanged.
    assert_eq!(1, before.len());
}

#[test]
fn invalidation_is_idempotent() {
    let source = Arc::new(CountingCertificateSource::new("store", vec![]));
    let policy = policy_over(&[source.clone()]);

    policy.on_trust_store_change();
    policy.trust_anchors().unwrap();
    policy.on_trust_store_change();
    policy.on_trust_store_change();
    policy.trust_anchors().unwrap();
    assert_eq!(2, source.calls());
}

#[test]
fn source_failure_propagates_and_is_not_cached() {
    let healthy = Arc::new(CountingCertificateSource::new(
        "healthy",
        vec![generate_ca_certificate("Root")],
    ));
    let flaky = Arc::new(CountingCertificateSource::new("flaky", vec![]));
    flaky.set_failing(true);
    let policy = policy_over(&[healthy.clone(), flaky.clone()]);

    let err = policy.trust_anchors().unwrap_err();
    assert!(matches!(
        err,
        PolicyError::CertificateSource { ref source_name, .. } if source_name == "flaky"
    ));
    assert!(!policy.has_cached_trust_anchors());

    flaky.set_failing(false);
    let anchors = policy.trust_anchors().unwrap();
    assert_eq!(1, anchors.len());
    assert_eq!(2, healthy.calls());
    assert_eq!(2, flaky.calls());
}

#[test]
fn policy_without_entry_refs_has_no_anchors() {
    let policy = PolicyBuilder::new().build();
    assert!(policy.trust_anchors().unwrap().is_empty());
}

#[test]
fn reads_race_with_invalidation_without_tearing() {
    let roots: Vec<_> = (0..4)
        .map(|i| generate_ca_certificate(&format!("Root {i}")))
        .collect();
    let source = Arc::new(CountingCertificateSource::new("store", roots));
    let policy = policy_over(&[source]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let policy = policy.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    assert_eq!(4, policy.trust_anchors().unwrap().len());
                }
            })
        })
        .collect();
    let invalidator = {
        let policy = policy.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                policy.on_trust_store_change();
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    invalidator.join().unwrap();
}
