//! The native descriptor allocation capability.
//!
//! The cache never calls a driver API directly. The embedding layer implements
//! [`DescriptorBackend`] on top of whatever native API it drives; the cache
//! only holds the opaque handles it gets back and guarantees to pair every
//! create with exactly one destroy.

use anyhow::Result;

use bitflags::bitflags;

use crate::descriptor::DescriptorCategory;

/// Opaque native descriptor set layout handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub u64);

/// Opaque native descriptor pool handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(pub u64);

/// Opaque native descriptor set handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetHandle(pub u64);

/// Native descriptor types the cache routes into category pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    UniformBufferDynamic,
    UniformTexelBuffer,
    CombinedImageSampler,
    StorageBuffer,
    StorageTexelBuffer,
    StorageImage,
}

impl DescriptorType {
    /// The category pool a binding of this type is managed by.
    pub fn category(self) -> DescriptorCategory {
        match self {
            DescriptorType::UniformBuffer | DescriptorType::UniformBufferDynamic => {
                DescriptorCategory::Ubo
            }
            DescriptorType::UniformTexelBuffer | DescriptorType::CombinedImageSampler => {
                DescriptorCategory::SamplerView
            }
            DescriptorType::StorageBuffer => DescriptorCategory::Ssbo,
            DescriptorType::StorageTexelBuffer | DescriptorType::StorageImage => {
                DescriptorCategory::Image
            }
        }
    }
}

bitflags! {
    /// Shader stages a layout binding is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StageFlags: u32 {
        const VERTEX = 0b000001;
        const FRAGMENT = 0b000010;
        const GEOMETRY = 0b000100;
        const TESS_CONTROL = 0b001000;
        const TESS_EVAL = 0b010000;
        const COMPUTE = 0b100000;
    }
}

/// One binding slot of a native set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBinding {
    pub binding: u32,
    pub ty: DescriptorType,
    /// Array size of the binding.
    pub count: u32,
    pub stages: StageFlags,
}

/// Requested native pool capacity for one descriptor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub ty: DescriptorType,
    pub count: u32,
}

/// Capability trait for the native resource/handle allocation layer.
///
/// Implementations are expected to be cheap to call for the destroy methods;
/// the cache invokes them from `Drop`.
pub trait DescriptorBackend: Send + Sync {
    /// Create a native set layout from the given bindings.
    fn create_set_layout(&self, bindings: &[LayoutBinding]) -> Result<LayoutHandle>;
    /// Create a native pool able to hold `max_sets` concurrently resident sets.
    fn create_pool(
        &self,
        layout: LayoutHandle,
        sizes: &[PoolSize],
        max_sets: u32,
    ) -> Result<PoolHandle>;
    /// Allocate `count` sets with the same layout from `pool` in one native call.
    fn allocate_sets(
        &self,
        pool: PoolHandle,
        layout: LayoutHandle,
        count: u32,
    ) -> Result<Vec<SetHandle>>;
    /// Destroy a set layout. Must tolerate outstanding set handles; those die
    /// with their pool.
    fn destroy_set_layout(&self, layout: LayoutHandle);
    /// Destroy a pool and every set allocated from it.
    fn destroy_pool(&self, pool: PoolHandle);
}
