//! Descriptor set caching and pooling for GPU command submission layers.
//!
//! When recording draws and dispatches, a driver layer has to hand the GPU a
//! descriptor set matching whatever resources are currently bound. Allocating
//! and writing a fresh set on every draw is far too expensive, so this crate
//! implements the middle layer: a content-addressed cache of descriptor sets,
//! backed by fixed-capacity pools, with recycling that is safe against sets
//! still referenced by in-flight work.
//!
//! The crate does not talk to any native API directly. Instead it is generic
//! over two capabilities supplied by the embedding driver:
//! - [`DescriptorBackend`] creates and destroys the opaque native objects
//!   (set layouts, pools, descriptor sets).
//! - [`BatchTracker`] represents the submission side: which batch is currently
//!   recording, attaching sets to it, and synchronously flushing outstanding
//!   work when a pool runs out of capacity.
//!
//! # Example
//!
//! One [`ProgramDescriptors`] is built per pipeline from the reflected
//! bindings of its shader stages:
//! ```ignore
//! use descriptor_cache::prelude::*;
//!
//! let stages = vec![
//!     StageBindings {
//!         stage: ShaderStage::Vertex,
//!         bindings: vec![ShaderBinding { binding: 0, ty: DescriptorType::UniformBuffer, count: 1 }],
//!     },
//!     StageBindings {
//!         stage: ShaderStage::Fragment,
//!         bindings: vec![ShaderBinding { binding: 0, ty: DescriptorType::CombinedImageSampler, count: 1 }],
//!     },
//! ];
//! let mut program = ProgramDescriptors::new(backend, &stages, PoolSettings::default())?;
//! ```
//! On every draw, each descriptor category is resolved against the current
//! binding state of the recording context:
//! ```ignore
//! let key = DescriptorStateKey::graphics([Some(vs_state), Some(fs_state), None, None, None, None]);
//! let (set, cache_hit) = program.get(&mut batch, &key, DescriptorCategory::Ubo, false)?;
//! if !cache_hit {
//!     // Write the set's bindings through the native API, then register them
//!     // so resource destruction invalidates the set.
//!     refs.add(&set, SlotKind::Resource, 0, buffer_id);
//! }
//! ```
//! When a batch retires, the submission layer drops one reference per
//! attached set and hands sets back to [`ProgramDescriptors::recycle`].

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod backend;
pub mod batch;
pub mod descriptor;
pub mod error;
