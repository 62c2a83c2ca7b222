//! Weak back-references from bound resources to descriptor set slots.
//!
//! Every time a set is populated, the resources written into it record a
//! reference to the slot they occupy. When a resource is destroyed it walks
//! its own list, clears the slots that still point at it and marks the
//! owning sets invalid. This is the sole invalidation path; pools are never
//! scanned on resource destruction, so the cost is paid per destroyed
//! resource rather than per pool.

use std::num::NonZeroU64;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use super::set::{DescriptorSetRef, SetShared};

/// Stable identity of a bound resource, sampler state or sampler view.
/// Non-zero so an empty slot word is distinguishable from any binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Which slot array of a set a reference points into. Sampler slots only
/// exist on sampler-view category sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Resource,
    Sampler,
}

#[derive(Debug)]
struct DescriptorReference {
    target: Weak<SetShared>,
    kind: SlotKind,
    slot: usize,
    resource: ResourceId,
}

/// Reference list owned by one resource, growing as the resource is bound
/// into sets and discarded wholesale when the resource dies.
#[derive(Debug, Default)]
pub struct DescriptorRefs {
    refs: Vec<DescriptorReference>,
}

impl DescriptorRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `resource` in `slot` of `set` and remember the slot for later
    /// invalidation. Called for every slot written when a set is populated
    /// after a cache miss.
    pub fn add(&mut self, set: &DescriptorSetRef, kind: SlotKind, slot: usize, resource: ResourceId) {
        let Some(slots) = set.shared.slots(kind) else {
            debug_assert!(false, "sampler reference on a set without sampler slots");
            error!("descriptor reference targets a slot array the set does not have");
            return;
        };
        if slot >= slots.len() {
            debug_assert!(false, "descriptor reference slot {} out of range", slot);
            error!("descriptor reference slot {} out of range ({})", slot, slots.len());
            return;
        }
        slots[slot].store(resource.get(), Ordering::Release);
        self.refs.push(DescriptorReference {
            target: Arc::downgrade(&set.shared),
            kind,
            slot,
            resource,
        });
    }

    /// Invalidation path, called when the owning resource is destroyed.
    /// Slots that still hold `resource` are cleared and their sets marked
    /// invalid; slots since overwritten by a refresh are left alone. The
    /// reference list is discarded either way.
    pub fn clear(&mut self, resource: ResourceId) {
        for r in self.refs.drain(..) {
            if r.resource != resource {
                continue;
            }
            let Some(shared) = r.target.upgrade() else {
                // Owning pool already destroyed.
                continue;
            };
            let Some(slots) = shared.slots(r.kind) else {
                continue;
            };
            if slots[r.slot]
                .compare_exchange(resource.get(), 0, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                shared.invalid.store(true, Ordering::Release);
            }
        }
    }

    /// Number of recorded references, mainly for diagnostics.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
