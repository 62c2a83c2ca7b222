//! Descriptor set records and the shared handle type.
//!
//! Sets live in an arena owned by their pool and are addressed by stable
//! [`SetId`] indices. The parts of a set that other threads or resource
//! back-references need to observe live behind an `Arc` so batch handles stay
//! valid for the lifetime of the pool without raw back-pointers.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::SetHandle;

use super::key::DescriptorStateKey;
use super::refs::{ResourceId, SlotKind};
use super::DescriptorCategory;

/// Stable index of a set within its owning pool's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetId(pub(crate) u32);

/// Set state observable outside the recording thread.
///
/// The reference count is the only cross-thread mutation in the subsystem:
/// the recording thread increments on attach-to-batch, whichever thread
/// retires the batch decrements. `invalid` flips when a bound resource is
/// destroyed. The slot words hold the [`ResourceId`](super::refs::ResourceId)
/// bound at each index, zero meaning empty.
#[derive(Debug)]
pub(crate) struct SetShared {
    pub refcount: AtomicU32,
    pub invalid: AtomicBool,
    pub resources: Box<[AtomicU64]>,
    /// Parallel sampler state slots, sampler-view category only.
    pub samplers: Option<Box<[AtomicU64]>>,
}

impl SetShared {
    pub fn new(num_slots: usize, with_samplers: bool) -> Self {
        let make_slots = || {
            (0..num_slots)
                .map(|_| AtomicU64::new(0))
                .collect::<Box<[AtomicU64]>>()
        };
        Self {
            refcount: AtomicU32::new(1),
            invalid: AtomicBool::new(true),
            resources: make_slots(),
            samplers: with_samplers.then(make_slots),
        }
    }

    pub fn slots(&self, kind: SlotKind) -> Option<&[AtomicU64]> {
        match kind {
            SlotKind::Resource => Some(&self.resources),
            SlotKind::Sampler => self.samplers.as_deref(),
        }
    }
}

/// Pool-private per-set metadata. Mutated only by the recording thread, and
/// only while the set is not parked in a map another lookup could win.
#[derive(Debug)]
pub(crate) struct DescriptorSet {
    pub shared: Arc<SetShared>,
    pub handle: SetHandle,
    pub hash: u32,
    pub key: DescriptorStateKey,
    pub recycled: bool,
}

impl DescriptorSet {
    pub fn new(handle: SetHandle, num_slots: usize, with_samplers: bool) -> Self {
        Self {
            shared: Arc::new(SetShared::new(num_slots, with_samplers)),
            handle,
            hash: 0,
            key: DescriptorStateKey::default(),
            recycled: false,
        }
    }
}

/// Shared handle to one descriptor set, as returned by
/// [`ProgramDescriptors::get`](super::program::ProgramDescriptors::get) and
/// attached to batches.
#[derive(Debug, Clone)]
pub struct DescriptorSetRef {
    pub(crate) program: u64,
    pub(crate) owner: DescriptorCategory,
    pub(crate) id: SetId,
    pub(crate) handle: SetHandle,
    pub(crate) shared: Arc<SetShared>,
}

impl DescriptorSetRef {
    /// The native set handle, for binding in the draw path.
    pub fn handle(&self) -> SetHandle {
        self.handle
    }

    /// The category pool that owns this set. For the shared null set this is
    /// the category it was first requested for.
    pub fn owner(&self) -> DescriptorCategory {
        self.owner
    }

    /// Arena id within the owning pool.
    pub fn id(&self) -> SetId {
        self.id
    }

    /// True once any bound resource was destroyed, or before the set was
    /// first populated.
    pub fn is_invalid(&self) -> bool {
        self.shared.invalid.load(Ordering::Acquire)
    }

    /// Current reference count. A count of one means only the pool's own
    /// bookkeeping holds the set.
    pub fn references(&self) -> u32 {
        self.shared.refcount.load(Ordering::Acquire)
    }

    /// The resource currently recorded in `slot`, if any. Cleared slots and
    /// slot arrays the set does not carry both read as `None`.
    pub fn bound_resource(&self, kind: SlotKind, slot: usize) -> Option<ResourceId> {
        let slots = self.shared.slots(kind)?;
        ResourceId::new(slots.get(slot)?.load(Ordering::Acquire))
    }

    /// Two refs are handles to the same set instance.
    pub fn same_set(&self, other: &DescriptorSetRef) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn retain(&self) {
        self.shared.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one reference, returning the new count. Called by the batch
    /// tracker when a batch retires; the set becomes recyclable at count one.
    pub fn release(&self) -> u32 {
        let prev = self.shared.refcount.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 1, "released a descriptor set past its pool reference");
        prev - 1
    }
}
