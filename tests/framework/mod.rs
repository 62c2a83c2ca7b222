#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use descriptor_cache::{
    BatchId, BatchTracker, DescriptorBackend, DescriptorSetRef, DescriptorStateKey,
    DescriptorType, LayoutBinding, LayoutHandle, PoolHandle, PoolSize, ProgramDescriptors,
    ResourceId, SetHandle, ShaderBinding, ShaderStage, StageBindings,
};

/// Counters recorded by the mock backend, for asserting native call traffic.
#[derive(Debug, Default)]
pub struct BackendStats {
    pub layouts_created: u32,
    pub layouts_destroyed: u32,
    pub pools_created: u32,
    pub pools_destroyed: u32,
    pub alloc_calls: u32,
    pub sets_allocated: u32,
    /// When set, `create_pool` fails once this many pools exist.
    pub pool_creation_limit: Option<u32>,
}

/// In-memory stand-in for the native descriptor allocation layer.
#[derive(Debug)]
pub struct MockBackend {
    next_handle: AtomicU64,
    pub stats: Mutex<BackendStats>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_handle: AtomicU64::new(1),
            stats: Mutex::new(BackendStats::default()),
        })
    }

    fn fresh(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub fn limit_pool_creations(&self, limit: u32) {
        self.stats.lock().unwrap().pool_creation_limit = Some(limit);
    }
}

impl DescriptorBackend for MockBackend {
    fn create_set_layout(&self, _bindings: &[LayoutBinding]) -> Result<LayoutHandle> {
        self.stats.lock().unwrap().layouts_created += 1;
        Ok(LayoutHandle(self.fresh()))
    }

    fn create_pool(
        &self,
        _layout: LayoutHandle,
        _sizes: &[PoolSize],
        _max_sets: u32,
    ) -> Result<PoolHandle> {
        let mut stats = self.stats.lock().unwrap();
        if let Some(limit) = stats.pool_creation_limit {
            if stats.pools_created >= limit {
                bail!("mock backend pool creation limit reached");
            }
        }
        stats.pools_created += 1;
        drop(stats);
        Ok(PoolHandle(self.fresh()))
    }

    fn allocate_sets(
        &self,
        _pool: PoolHandle,
        _layout: LayoutHandle,
        count: u32,
    ) -> Result<Vec<SetHandle>> {
        let mut stats = self.stats.lock().unwrap();
        stats.alloc_calls += 1;
        stats.sets_allocated += count;
        drop(stats);
        Ok((0..count).map(|_| SetHandle(self.fresh())).collect())
    }

    fn destroy_set_layout(&self, _layout: LayoutHandle) {
        self.stats.lock().unwrap().layouts_destroyed += 1;
    }

    fn destroy_pool(&self, _pool: PoolHandle) {
        self.stats.lock().unwrap().pools_destroyed += 1;
    }
}

/// Single-queue batch tracker: one recording batch at a time, retiring
/// everything on flush.
#[derive(Debug)]
pub struct MockBatch {
    current: u64,
    sets: Vec<DescriptorSetRef>,
    descs_used: u32,
    pub flushes: u32,
}

impl MockBatch {
    pub fn new() -> Self {
        Self {
            current: 1,
            sets: vec![],
            descs_used: 0,
            flushes: 0,
        }
    }

    pub fn attached_sets(&self) -> usize {
        self.sets.len()
    }
}

impl BatchTracker for MockBatch {
    fn current(&self) -> BatchId {
        BatchId(self.current)
    }

    fn flush_and_wait(&mut self) -> Result<(BatchId, Vec<DescriptorSetRef>)> {
        self.flushes += 1;
        let retired: Vec<DescriptorSetRef> = self.sets.drain(..).collect();
        for set in &retired {
            set.release();
        }
        self.descs_used = 0;
        self.current += 1;
        Ok((BatchId(self.current), retired))
    }

    fn attach_set(&mut self, set: &DescriptorSetRef) -> bool {
        if self.sets.iter().any(|s| s.same_set(set)) {
            return false;
        }
        self.sets.push(set.clone());
        true
    }

    fn descriptors_used(&self) -> u32 {
        self.descs_used
    }

    fn note_descriptors_used(&mut self, count: u32) {
        self.descs_used += count;
    }
}

/// Flush the batch and offer every retired set back to the program.
pub fn flush_and_recycle(batch: &mut MockBatch, program: &mut ProgramDescriptors) -> Result<BatchId> {
    let (id, retired) = batch.flush_and_wait()?;
    for set in &retired {
        program.recycle(set);
    }
    Ok(id)
}

/// A graphics program binding `ubo_count` uniform buffers in the vertex stage
/// and sampling one texture in the fragment stage.
pub fn graphics_stages(ubo_count: u32) -> Vec<StageBindings> {
    vec![
        StageBindings {
            stage: ShaderStage::Vertex,
            bindings: (0..ubo_count)
                .map(|i| ShaderBinding {
                    binding: i,
                    ty: DescriptorType::UniformBuffer,
                    count: 1,
                })
                .collect(),
        },
        StageBindings {
            stage: ShaderStage::Fragment,
            bindings: vec![ShaderBinding {
                binding: 0,
                ty: DescriptorType::CombinedImageSampler,
                count: 1,
            }],
        },
    ]
}

/// Binding state key for a vertex+fragment pipeline.
pub fn gfx_key(vs_state: u32, fs_state: u32) -> DescriptorStateKey {
    DescriptorStateKey::graphics([Some(vs_state), Some(fs_state), None, None, None, None])
}

pub fn resource(raw: u64) -> ResourceId {
    ResourceId::new(raw).expect("resource ids are non-zero")
}
