// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hierarchical policy assembly.
//!
//! A [`PolicyBuilder`] records explicit overrides only. Inside a [`PolicyBuilderSet`] each builder
//! may name a parent; a value a builder leaves unset is taken from the nearest ancestor that sets
//! it, and failing that from the hard defaults:
//!
//! | field                         | default |
//! |-------------------------------|---------|
//! | cleartext traffic permitted   | `true`  |
//! | HSTS enforced                 | `false` |
//! | pin set                       | empty   |
//! | certificate entry refs        | empty   |

use crate::error::PolicyError;
use crate::pin::PinSet;
use crate::policy::{EffectiveValues, ResolvedPolicy};
use crate::source::CertificateEntryRef;
use crate::trust_manager::{PolicyTrustManagerFactory, TrustManagerFactory};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CLEARTEXT_TRAFFIC_PERMITTED: bool = true;
pub const DEFAULT_HSTS_ENFORCED: bool = false;

/// Explicit overrides for one level of a policy hierarchy.
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    cleartext_traffic_permitted: Option<bool>,
    hsts_enforced: Option<bool>,
    pin_set: Option<PinSet>,
    certificate_entry_refs: Option<Vec<CertificateEntryRef>>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cleartext_traffic_permitted(mut self, permitted: bool) -> Self {
        self.cleartext_traffic_permitted = Some(permitted);
        self
    }

    pub fn set_hsts_enforced(mut self, enforced: bool) -> Self {
        self.hsts_enforced = Some(enforced);
        self
    }

    pub fn set_pin_set(mut self, pin_set: PinSet) -> Self {
        self.pin_set = Some(pin_set);
        self
    }

    /// Replace the entry refs at this level. An empty vector still counts as configured and
    /// shadows any inherited refs.
    pub fn set_certificate_entry_refs(mut self, refs: Vec<CertificateEntryRef>) -> Self {
        self.certificate_entry_refs = Some(refs);
        self
    }

    pub fn add_certificate_entry_ref(mut self, entry: CertificateEntryRef) -> Self {
        self.certificate_entry_refs
            .get_or_insert_with(Vec::new)
            .push(entry);
        self
    }

    pub fn add_certificate_entry_refs(
        mut self,
        refs: impl IntoIterator<Item = CertificateEntryRef>,
    ) -> Self {
        self.certificate_entry_refs
            .get_or_insert_with(Vec::new)
            .extend(refs);
        self
    }

    pub fn has_certificate_entry_refs(&self) -> bool {
        self.certificate_entry_refs.is_some()
    }

    /// The override at this level, if any.
    pub fn cleartext_traffic_permitted(&self) -> Option<bool> {
        self.cleartext_traffic_permitted
    }

    pub fn hsts_enforced(&self) -> Option<bool> {
        self.hsts_enforced
    }

    pub fn pin_set(&self) -> Option<&PinSet> {
        self.pin_set.as_ref()
    }

    pub fn certificate_entry_refs(&self) -> Option<&[CertificateEntryRef]> {
        self.certificate_entry_refs.as_deref()
    }

    pub fn effective_cleartext_traffic_permitted(&self) -> bool {
        effective_cleartext_traffic_permitted(std::iter::once(self))
    }

    pub fn effective_hsts_enforced(&self) -> bool {
        effective_hsts_enforced(std::iter::once(self))
    }

    pub fn effective_pin_set(&self) -> PinSet {
        effective_pin_set(std::iter::once(self))
    }

    pub fn effective_certificate_entry_refs(&self) -> Vec<CertificateEntryRef> {
        effective_certificate_entry_refs(std::iter::once(self))
    }

    /// Build a policy from this builder alone, falling back to hard defaults.
    pub fn build(&self) -> Arc<ResolvedPolicy> {
        self.build_with_trust_manager_factory(Arc::new(PolicyTrustManagerFactory))
    }

    pub fn build_with_trust_manager_factory(
        &self,
        factory: Arc<dyn TrustManagerFactory>,
    ) -> Arc<ResolvedPolicy> {
        build_from_chain(std::iter::once(self), factory)
    }
}

/// Handle to a builder stored in a [`PolicyBuilderSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuilderId {
    set: u64,
    index: usize,
}

impl fmt::Display for BuilderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "builder {}/{}", self.set, self.index)
    }
}

static NEXT_SET: AtomicU64 = AtomicU64::new(0);

/// Owns a family of builders and the parent links between them.
///
/// Parent links are ids, not references, and are checked for loops when assigned, so every
/// chain walk terminates.
#[derive(Debug)]
pub struct PolicyBuilderSet {
    set: u64,
    builders: Vec<PolicyBuilder>,
    parents: Vec<Option<BuilderId>>,
}

impl Default for PolicyBuilderSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyBuilderSet {
    pub fn new() -> Self {
        Self {
            set: NEXT_SET.fetch_add(1, Ordering::Relaxed),
            builders: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Add a builder with no parent.
    pub fn insert(&mut self, builder: PolicyBuilder) -> BuilderId {
        let id = BuilderId {
            set: self.set,
            index: self.builders.len(),
        };
        self.builders.push(builder);
        self.parents.push(None);
        id
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn get(&self, id: BuilderId) -> Result<&PolicyBuilder, PolicyError> {
        let index = self.index_of(id)?;
        self.builders
            .get(index)
            .ok_or(PolicyError::UnknownBuilder(id))
    }

    /// Modify a builder in place through its by-value setters.
    ///
    /// `f` works on a copy; if it panics the stored builder is unchanged.
    ///
    /// ```
    /// # use network_security_config::{PolicyBuilder, PolicyBuilderSet};
    /// let mut set = PolicyBuilderSet::new();
    /// let id = set.insert(PolicyBuilder::new());
    /// set.update(id, |b| b.set_hsts_enforced(true)).unwrap();
    /// assert!(set.effective_hsts_enforced(id).unwrap());
    /// ```
    pub fn update(
        &mut self,
        id: BuilderId,
        f: impl FnOnce(PolicyBuilder) -> PolicyBuilder,
    ) -> Result<(), PolicyError> {
        let index = self.index_of(id)?;
        let slot = self
            .builders
            .get_mut(index)
            .ok_or(PolicyError::UnknownBuilder(id))?;
        *slot = f(slot.clone());
        Ok(())
    }

    pub fn parent(&self, id: BuilderId) -> Result<Option<BuilderId>, PolicyError> {
        let index = self.index_of(id)?;
        Ok(self.parents.get(index).copied().flatten())
    }

    /// Set or clear the parent of `child`.
    ///
    /// Fails with [`PolicyError::ParentCycle`] if `child` is reachable from `parent` (including
    /// `parent == child`); the existing link is left untouched in that case.
    pub fn set_parent(
        &mut self,
        child: BuilderId,
        parent: Option<BuilderId>,
    ) -> Result<(), PolicyError> {
        let child_index = self.index_of(child)?;

        if let Some(parent) = parent {
            self.index_of(parent)?;
            let mut current = Some(parent);
            while let Some(id) = current {
                if id == child {
                    return Err(PolicyError::ParentCycle);
                }
                current = self.parents.get(id.index).copied().flatten();
            }
        }

        let slot = self
            .parents
            .get_mut(child_index)
            .ok_or(PolicyError::UnknownBuilder(child))?;
        *slot = parent;
        Ok(())
    }

    pub fn effective_cleartext_traffic_permitted(&self, id: BuilderId) -> Result<bool, PolicyError> {
        Ok(effective_cleartext_traffic_permitted(self.chain(id)?))
    }

    pub fn effective_hsts_enforced(&self, id: BuilderId) -> Result<bool, PolicyError> {
        Ok(effective_hsts_enforced(self.chain(id)?))
    }

    pub fn effective_pin_set(&self, id: BuilderId) -> Result<PinSet, PolicyError> {
        Ok(effective_pin_set(self.chain(id)?))
    }

    pub fn effective_certificate_entry_refs(
        &self,
        id: BuilderId,
    ) -> Result<Vec<CertificateEntryRef>, PolicyError> {
        Ok(effective_certificate_entry_refs(self.chain(id)?))
    }

    /// Resolve `id` against its parent chain and freeze the result.
    ///
    /// Values are copied at build time; later changes to the set do not reach the returned
    /// policy.
    pub fn build(&self, id: BuilderId) -> Result<Arc<ResolvedPolicy>, PolicyError> {
        self.build_with_trust_manager_factory(id, Arc::new(PolicyTrustManagerFactory))
    }

    pub fn build_with_trust_manager_factory(
        &self,
        id: BuilderId,
        factory: Arc<dyn TrustManagerFactory>,
    ) -> Result<Arc<ResolvedPolicy>, PolicyError> {
        Ok(build_from_chain(self.chain(id)?, factory))
    }

    fn index_of(&self, id: BuilderId) -> Result<usize, PolicyError> {
        if id.set != self.set || id.index >= self.builders.len() {
            return Err(PolicyError::UnknownBuilder(id));
        }
        Ok(id.index)
    }

    fn chain(&self, id: BuilderId) -> Result<Chain<'_>, PolicyError> {
        self.index_of(id)?;
        Ok(Chain {
            set: self,
            next: Some(id),
        })
    }
}

/// Walks from a builder to the root of its parent chain.
#[derive(Clone)]
struct Chain<'a> {
    set: &'a PolicyBuilderSet,
    next: Option<BuilderId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a PolicyBuilder;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let builder = self.set.builders.get(id.index)?;
        self.next = self.set.parents.get(id.index).copied().flatten();
        Some(builder)
    }
}

fn effective_cleartext_traffic_permitted<'a>(
    mut chain: impl Iterator<Item = &'a PolicyBuilder>,
) -> bool {
    chain
        .find_map(|b| b.cleartext_traffic_permitted)
        .unwrap_or(DEFAULT_CLEARTEXT_TRAFFIC_PERMITTED)
}

fn effective_hsts_enforced<'a>(mut chain: impl Iterator<Item = &'a PolicyBuilder>) -> bool {
    chain
        .find_map(|b| b.hsts_enforced)
        .unwrap_or(DEFAULT_HSTS_ENFORCED)
}

fn effective_pin_set<'a>(mut chain: impl Iterator<Item = &'a PolicyBuilder>) -> PinSet {
    chain
        .find_map(|b| b.pin_set.as_ref())
        .cloned()
        .unwrap_or_default()
}

fn effective_certificate_entry_refs<'a>(
    mut chain: impl Iterator<Item = &'a PolicyBuilder>,
) -> Vec<CertificateEntryRef> {
    chain
        .find_map(|b| b.certificate_entry_refs.as_ref())
        .cloned()
        .unwrap_or_default()
}

fn build_from_chain<'a, I>(chain: I, factory: Arc<dyn TrustManagerFactory>) -> Arc<ResolvedPolicy>
where
    I: Iterator<Item = &'a PolicyBuilder> + Clone,
{
    let values = EffectiveValues {
        cleartext_traffic_permitted: effective_cleartext_traffic_permitted(chain.clone()),
        hsts_enforced: effective_hsts_enforced(chain.clone()),
        pins: effective_pin_set(chain.clone()),
        certificate_entry_refs: effective_certificate_entry_refs(chain),
    };

    debug!(
        cleartext_traffic_permitted = values.cleartext_traffic_permitted,
        hsts_enforced = values.hsts_enforced,
        pins = values.pins.len(),
        entry_refs = values.certificate_entry_refs.len(),
        "built network security policy"
    );
    ResolvedPolicy::new(values, factory)
}
