// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Network security configuration resolution.
//!
//! A trust policy answers four questions for an outgoing connection: is
//! cleartext traffic permitted, is HSTS enforced, which [`pin::PinSet`] must the
//! presented chain satisfy, and which certificate sources supply trust anchors.
//!
//! Policies are assembled with [`builder::PolicyBuilder`] values. Builders can be
//! layered inside a [`builder::PolicyBuilderSet`], where any value a builder does
//! not set is inherited from its parent chain. Building freezes the effective
//! values into an immutable [`policy::ResolvedPolicy`] which is shared across
//! threads and lazily caches the aggregated trust anchors and a trust manager.

pub mod anchor;
pub mod builder;
pub mod cache;
pub mod certificate;
pub mod defaults;
pub mod error;
pub mod notifier;
pub mod pin;
pub mod policy;
pub mod source;
pub mod trust_manager;

pub use anchor::{TrustAnchor, TrustAnchorSet};
pub use builder::{
    BuilderId, PolicyBuilder, PolicyBuilderSet, DEFAULT_CLEARTEXT_TRAFFIC_PERMITTED,
    DEFAULT_HSTS_ENFORCED,
};
pub use certificate::Certificate;
pub use defaults::{default_builder, default_policy, install_default_policy, DefaultSources};
pub use error::PolicyError;
pub use notifier::TrustStoreChangeNotifier;
pub use pin::{Pin, PinSet};
pub use policy::ResolvedPolicy;
pub use source::{CertificateEntryRef, CertificateSource, InMemoryCertificateSource};
pub use trust_manager::{
    PolicyTrustManager, PolicyTrustManagerFactory, TrustManager, TrustManagerFactory,
};
