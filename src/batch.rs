//! The submission/batch capability.
//!
//! A batch is a unit of recorded GPU work submitted together. The cache never
//! submits anything itself; it only attaches sets to the batch currently
//! recording, and asks for a synchronous flush when a pool runs out of
//! capacity. Reference counting is split across the boundary: the cache
//! increments a set's count on first attachment within a batch, the tracker
//! drops that reference again when the batch retires.

use anyhow::Result;

use crate::descriptor::set::DescriptorSetRef;

/// Identifies one submitted or recording batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub u64);

/// Capability trait for the batch/queue submission subsystem.
pub trait BatchTracker {
    /// The batch currently recording.
    fn current(&self) -> BatchId;

    /// Submit all outstanding work and block until it has retired.
    ///
    /// On return, the tracker must have dropped one reference per set that was
    /// attached to the flushed batches. The released refs are handed back so
    /// the caller can offer them for recycling; refs belonging to other
    /// programs are ignored by [`ProgramDescriptors::recycle`] and must be
    /// routed by the tracker itself.
    ///
    /// [`ProgramDescriptors::recycle`]: crate::ProgramDescriptors::recycle
    fn flush_and_wait(&mut self) -> Result<(BatchId, Vec<DescriptorSetRef>)>;

    /// Record `set` on the current batch. Returns `true` if this is the first
    /// attachment of this set within the batch; the cache then increments the
    /// set's reference count and reports the descriptors used.
    fn attach_set(&mut self, set: &DescriptorSetRef) -> bool;

    /// Descriptors referenced by the current batch so far. Used as the demand
    /// signal for bulk allocation growth.
    fn descriptors_used(&self) -> u32;

    /// Account for `count` additional descriptors on the current batch.
    fn note_descriptors_used(&mut self, count: u32);
}
