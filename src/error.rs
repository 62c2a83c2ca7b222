//! Exposes the crate error type

use thiserror::Error;

use crate::descriptor::DescriptorCategory;

/// Error type for all descriptor cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend failed to create a native layout, pool or set array.
    #[error("Descriptor allocation failed: {0}")]
    AllocationFailed(&'static str),
    /// A pool was still out of capacity after a synchronous flush. The caller
    /// must abort the draw or dispatch that requested the set.
    #[error("Descriptor pool for category `{0:?}` exhausted after flush")]
    PoolExhausted(DescriptorCategory),
    /// Internal set tracking violated an invariant, e.g. an invalidated set
    /// reachable through the active map.
    #[error("Descriptor state inconsistency: {0}")]
    Consistency(&'static str),
    /// A set was requested for a category the program has no pool for.
    /// Programs whose shaders declare no descriptors build no pools at all.
    #[error("No descriptor pool for category `{0:?}`")]
    NoPool(DescriptorCategory),
}
