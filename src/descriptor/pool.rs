//! A descriptor pool owns the native descriptor storage for one
//! (program, category) pair: the native layout and pool handles, the set
//! arena, and the active/free maps the cache operates on. Sets are allocated
//! in buckets and never freed individually; they die with the pool.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;

use crate::backend::{DescriptorBackend, LayoutBinding, LayoutHandle, PoolHandle, PoolSize};
use crate::error::Error;

use super::key::DescriptorStateKey;
use super::set::{DescriptorSet, DescriptorSetRef, SetId};
use super::DescriptorCategory;

/// Tuning knobs for pool capacity and set reuse.
///
/// The defaults mirror driver heuristics with no documented derivation; they
/// are configuration, not a correctness contract.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Maximum native sets resident in one pool before a flush is forced.
    pub max_sets: u32,
    /// Geometric growth factor for bulk set allocation.
    pub bucket_factor: u32,
    /// Upper bound on a single bulk allocation.
    pub max_bucket_size: u32,
    /// Free map entries probed for an invalidated set before any uncontended
    /// entry is accepted for eviction.
    pub eviction_probe_limit: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_sets: 5000,
            bucket_factor: 10,
            max_bucket_size: 1000,
            eviction_probe_limit: 100,
        }
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct DescriptorPool {
    #[derivative(Debug = "ignore")]
    backend: Arc<dyn DescriptorBackend>,
    pub category: DescriptorCategory,
    pub layout: LayoutHandle,
    pub handle: PoolHandle,
    /// Binding slots per set. Zero for the null pool of a category unused by
    /// every bound shader stage.
    pub num_descriptors: u32,
    pub num_sets_allocated: u32,
    pub settings: PoolSettings,
    /// Set arena; `SetId` indexes into this and stays stable for the pool's
    /// lifetime.
    sets: Vec<DescriptorSet>,
    /// Sets in current use or cached, by their binding state key.
    pub active: HashMap<DescriptorStateKey, SetId>,
    /// Recycled sets, still cache-hit eligible until evicted or re-requested.
    pub free: HashMap<DescriptorStateKey, SetId>,
    /// Pre-allocated sets not yet handed out.
    pub alloc_bucket: Vec<SetId>,
}

impl DescriptorPool {
    /// Create the native layout and pool. On failure no native state is
    /// leaked.
    pub fn new(
        backend: Arc<dyn DescriptorBackend>,
        category: DescriptorCategory,
        bindings: &[LayoutBinding],
        sizes: &[PoolSize],
        num_descriptors: u32,
        settings: PoolSettings,
    ) -> Result<Self> {
        let layout = match backend.create_set_layout(bindings) {
            Ok(layout) => layout,
            Err(err) => {
                error!("descriptor set layout creation for {category:?} failed: {err}");
                return Err(Error::AllocationFailed("descriptor set layout").into());
            }
        };
        let handle = match backend.create_pool(layout, sizes, settings.max_sets) {
            Ok(handle) => handle,
            Err(err) => {
                backend.destroy_set_layout(layout);
                error!("descriptor pool creation for {category:?} failed: {err}");
                return Err(Error::AllocationFailed("descriptor pool").into());
            }
        };
        #[cfg(feature = "log-objects")]
        trace!("Created descriptor pool {handle:?} for {category:?}");
        Ok(Self {
            backend,
            category,
            layout,
            handle,
            num_descriptors,
            num_sets_allocated: 0,
            settings,
            sets: vec![],
            active: HashMap::new(),
            free: HashMap::new(),
            alloc_bucket: vec![],
        })
    }

    pub fn set(&self, id: SetId) -> &DescriptorSet {
        &self.sets[id.0 as usize]
    }

    pub fn set_mut(&mut self, id: SetId) -> &mut DescriptorSet {
        &mut self.sets[id.0 as usize]
    }

    /// Build a shareable handle for a set in this pool.
    pub fn make_ref(&self, program: u64, id: SetId) -> DescriptorSetRef {
        let set = self.set(id);
        DescriptorSetRef {
            program,
            owner: self.category,
            id,
            handle: set.handle,
            shared: set.shared.clone(),
        }
    }

    /// Allocate a bucket of native sets in one call and park all but the
    /// first in the alloc array. `demand` is the descriptor demand of the
    /// current batch; the bucket grows geometrically with it to amortize
    /// native call overhead.
    pub fn allocate_bucket(&mut self, demand: u32) -> Result<SetId> {
        let mut bucket_size = if self.num_descriptors > 0 {
            let mut size = self.settings.bucket_factor;
            let mut factor = self.settings.bucket_factor;
            while factor < demand {
                factor = factor.saturating_mul(self.settings.bucket_factor);
                size = factor;
            }
            size.min(self.settings.max_bucket_size)
        } else {
            // The null set is shared program-wide; one is all we ever need.
            1
        };
        bucket_size = bucket_size
            .min(self.settings.max_sets.saturating_sub(self.num_sets_allocated))
            .max(1);

        let handles = match self
            .backend
            .allocate_sets(self.handle, self.layout, bucket_size)
        {
            Ok(handles) => handles,
            Err(err) => {
                error!(
                    "bucket allocation of {bucket_size} sets for {:?} failed: {err}",
                    self.category
                );
                return Err(Error::AllocationFailed("descriptor set bucket").into());
            }
        };
        debug_assert_eq!(handles.len(), bucket_size as usize);

        let with_samplers = self.category == DescriptorCategory::SamplerView;
        let num_slots = self.num_descriptors as usize;
        let first = SetId(self.sets.len() as u32);
        for (i, handle) in handles.into_iter().enumerate() {
            let id = SetId(self.sets.len() as u32);
            self.sets.push(DescriptorSet::new(handle, num_slots, with_samplers));
            if i > 0 {
                self.alloc_bucket.push(id);
            }
        }
        self.num_sets_allocated += bucket_size;
        debug!(
            "allocated {bucket_size} descriptor sets for {:?}, {} resident",
            self.category, self.num_sets_allocated
        );
        Ok(first)
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        // Sets die with the pool regardless of outstanding cache references;
        // any handle still alive observes a dead set.
        for set in &self.sets {
            set.shared.invalid.store(true, Ordering::Release);
        }
        self.backend.destroy_pool(self.handle);
        self.backend.destroy_set_layout(self.layout);
        #[cfg(feature = "log-objects")]
        trace!("Destroyed descriptor pool {:?} for {:?}", self.handle, self.category);
    }
}
