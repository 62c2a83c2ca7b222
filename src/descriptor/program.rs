//! Per-program descriptor state: one pool per category, built once at
//! pipeline creation from the reflected bindings of every shader stage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::backend::{DescriptorBackend, DescriptorType, LayoutBinding, PoolSize, StageFlags};

use super::pool::{DescriptorPool, PoolSettings};
use super::set::SetId;
use super::{DescriptorCategory, ShaderStage, DESCRIPTOR_CATEGORY_COUNT};

/// One binding as reported by shader reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBinding {
    pub binding: u32,
    pub ty: DescriptorType,
    /// Array size of the binding.
    pub count: u32,
}

/// The reflected bindings of one shader stage.
#[derive(Debug, Clone)]
pub struct StageBindings {
    pub stage: ShaderStage,
    pub bindings: Vec<ShaderBinding>,
}

impl From<ShaderStage> for StageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => StageFlags::VERTEX,
            ShaderStage::Fragment => StageFlags::FRAGMENT,
            ShaderStage::Geometry => StageFlags::GEOMETRY,
            ShaderStage::TessControl => StageFlags::TESS_CONTROL,
            ShaderStage::TessEval => StageFlags::TESS_EVAL,
            ShaderStage::Compute => StageFlags::COMPUTE,
        }
    }
}

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Descriptor pools and cache state for one pipeline.
///
/// Owns one [`DescriptorPool`] per category, the per-category last-used set
/// used by the cache's quick path, and nothing else; pipeline teardown drops
/// this and with it every native object the pools created.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ProgramDescriptors {
    #[derivative(Debug = "ignore")]
    pub(crate) backend: Arc<dyn DescriptorBackend>,
    /// Distinguishes this program's set refs from those of other programs
    /// sharing a batch.
    pub(crate) id: u64,
    pub(crate) pools: [Option<DescriptorPool>; DESCRIPTOR_CATEGORY_COUNT],
    /// Last set handed out per category, `(owning category, arena id)`. The
    /// owner differs from the slot index only for the shared null set.
    pub(crate) last_set: [Option<(DescriptorCategory, SetId)>; DESCRIPTOR_CATEGORY_COUNT],
}

impl ProgramDescriptors {
    /// Aggregate the reflected bindings of all stages and build one pool per
    /// category.
    ///
    /// Categories without any bindings still get a pool when another category
    /// has some, so per-category array indexing stays uniform; such a null
    /// pool carries a single dummy uniform binding visible to every stage and
    /// reports zero descriptors. A program that binds no descriptors at all
    /// builds no pools.
    ///
    /// # Errors
    /// Fails if any native layout or pool creation fails. No partial pools
    /// survive a failure.
    pub fn new(
        backend: Arc<dyn DescriptorBackend>,
        stages: &[StageBindings],
        settings: PoolSettings,
    ) -> Result<Self> {
        let mut bindings: [Vec<LayoutBinding>; DESCRIPTOR_CATEGORY_COUNT] = Default::default();
        // Pool sizes are deduplicated by native descriptor type across all
        // stages; insertion order is kept so backend calls are deterministic.
        let mut type_order: Vec<DescriptorType> = vec![];
        let mut type_counts: HashMap<DescriptorType, u32> = HashMap::new();
        for stage in stages {
            let flags = StageFlags::from(stage.stage);
            for b in &stage.bindings {
                bindings[b.ty.category() as usize].push(LayoutBinding {
                    binding: b.binding,
                    ty: b.ty,
                    count: b.count,
                    stages: flags,
                });
                let count = type_counts.entry(b.ty).or_insert_with(|| {
                    type_order.push(b.ty);
                    0
                });
                *count += b.count;
            }
        }

        let id = NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed);
        let mut pools: [Option<DescriptorPool>; DESCRIPTOR_CATEGORY_COUNT] = Default::default();
        let total: usize = bindings.iter().map(Vec::len).sum();
        if total == 0 {
            return Ok(Self {
                backend,
                id,
                pools,
                last_set: Default::default(),
            });
        }

        for category in DescriptorCategory::all() {
            let binds = &bindings[category as usize];
            let pool = if binds.is_empty() {
                let null_binding = LayoutBinding {
                    binding: 1,
                    ty: DescriptorType::UniformBuffer,
                    count: 1,
                    stages: StageFlags::all(),
                };
                let null_size = PoolSize {
                    ty: DescriptorType::UniformBuffer,
                    count: settings.max_sets,
                };
                DescriptorPool::new(
                    backend.clone(),
                    category,
                    std::slice::from_ref(&null_binding),
                    std::slice::from_ref(&null_size),
                    0,
                    settings,
                )?
            } else {
                let sizes: Vec<PoolSize> = type_order
                    .iter()
                    .filter(|ty| ty.category() == category)
                    .map(|&ty| PoolSize {
                        ty,
                        count: type_counts[&ty].saturating_mul(settings.max_sets),
                    })
                    .collect();
                DescriptorPool::new(
                    backend.clone(),
                    category,
                    binds,
                    &sizes,
                    binds.len() as u32,
                    settings,
                )?
            };
            pools[category as usize] = Some(pool);
        }

        Ok(Self {
            backend,
            id,
            pools,
            last_set: Default::default(),
        })
    }

    /// Whether this program built a pool for `category`.
    pub fn has_pool(&self, category: DescriptorCategory) -> bool {
        self.pools[category as usize].is_some()
    }

    /// Binding slots per set of `category`. Zero marks a null pool.
    pub fn descriptor_count(&self, category: DescriptorCategory) -> Option<u32> {
        self.pools[category as usize]
            .as_ref()
            .map(|pool| pool.num_descriptors)
    }

    /// Native sets currently resident in `category`'s pool.
    pub fn allocated_sets(&self, category: DescriptorCategory) -> u32 {
        self.pools[category as usize]
            .as_ref()
            .map(|pool| pool.num_sets_allocated)
            .unwrap_or(0)
    }
}
