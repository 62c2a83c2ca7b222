//! This module handles everything related to descriptor set lifecycle.
//!
//! A [`ProgramDescriptors`](program::ProgramDescriptors) owns one
//! [`DescriptorPool`](pool::DescriptorPool) per [`DescriptorCategory`], built
//! once per pipeline from reflected shader bindings. On every draw or
//! dispatch, [`ProgramDescriptors::get`](program::ProgramDescriptors::get)
//! resolves the current binding state to a ready descriptor set, reusing a
//! cached one whenever the binding state is unchanged.
//!
//! Sets are never freed individually. A set whose reference count drops back
//! to one (held only by its pool) is recycled: parked in a free map where it
//! stays cache-hit eligible until evicted or re-requested.

use static_assertions::const_assert_eq;

pub mod cache;
pub mod key;
pub mod pool;
pub mod program;
pub mod refs;
pub mod set;

/// Shader stage slots of a binding state key, in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex = 0,
    Fragment = 1,
    Geometry = 2,
    TessControl = 3,
    TessEval = 4,
    Compute = 5,
}

/// Number of shader stage slots in a binding state key.
pub const SHADER_STAGE_COUNT: usize = 6;

/// Coarse classification of binding kinds. Each category is managed by its
/// own pool, so binding state changes in one category never thrash another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorCategory {
    /// Uniform buffers, including dynamic ones.
    Ubo = 0,
    /// Sampled images and uniform texel buffers. Sets of this category carry
    /// a parallel sampler state slot array.
    SamplerView = 1,
    /// Storage buffers.
    Ssbo = 2,
    /// Storage images and storage texel buffers.
    Image = 3,
}

/// Number of descriptor categories.
pub const DESCRIPTOR_CATEGORY_COUNT: usize = 4;

const_assert_eq!(ShaderStage::Compute as usize + 1, SHADER_STAGE_COUNT);
const_assert_eq!(
    DescriptorCategory::Image as usize + 1,
    DESCRIPTOR_CATEGORY_COUNT
);

impl DescriptorCategory {
    /// All categories in pool array order.
    pub fn all() -> [DescriptorCategory; DESCRIPTOR_CATEGORY_COUNT] {
        [
            DescriptorCategory::Ubo,
            DescriptorCategory::SamplerView,
            DescriptorCategory::Ssbo,
            DescriptorCategory::Image,
        ]
    }
}
