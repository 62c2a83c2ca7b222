pub use crate::backend::{
    DescriptorBackend, DescriptorType, LayoutBinding, LayoutHandle, PoolHandle, PoolSize,
    SetHandle, StageFlags,
};
pub use crate::batch::{BatchId, BatchTracker};
pub use crate::descriptor::key::DescriptorStateKey;
pub use crate::descriptor::pool::PoolSettings;
pub use crate::descriptor::program::{ProgramDescriptors, ShaderBinding, StageBindings};
pub use crate::descriptor::refs::{DescriptorRefs, ResourceId, SlotKind};
pub use crate::descriptor::set::{DescriptorSetRef, SetId};
pub use crate::descriptor::{
    DescriptorCategory, ShaderStage, DESCRIPTOR_CATEGORY_COUNT, SHADER_STAGE_COUNT,
};
pub use crate::error::Error;
