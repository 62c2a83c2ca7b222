//! Binding state keys.
//!
//! A key captures "what is currently bound" for one descriptor category: one
//! `(exists, state)` pair per shader stage slot, where `state` is a 32-bit
//! hash of the stage's bindings maintained by the recording context. Keys are
//! the lookup identity of the cache.

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh32::xxh32;

use super::{ShaderStage, SHADER_STAGE_COUNT};

/// Per-category binding state of a rendering context, used as the cache key.
///
/// Equality ignores `state` for stage slots that are absent on both sides;
/// two keys with differing `exists` flags are never equal.
#[derive(Debug, Clone, Default)]
pub struct DescriptorStateKey {
    exists: [bool; SHADER_STAGE_COUNT],
    state: [u32; SHADER_STAGE_COUNT],
}

impl DescriptorStateKey {
    /// Key for a compute pipeline. Only slot 0 is meaningful, and it always
    /// exists.
    pub fn compute(state: u32) -> Self {
        let mut key = Self::default();
        key.exists[0] = true;
        key.state[0] = state;
        key
    }

    /// Key for a graphics pipeline, one entry per stage slot in
    /// [`ShaderStage`] order. `None` marks a stage that is not present.
    pub fn graphics(states: [Option<u32>; SHADER_STAGE_COUNT]) -> Self {
        let mut key = Self::default();
        for (i, state) in states.iter().enumerate() {
            key.exists[i] = state.is_some();
            key.state[i] = state.unwrap_or(0);
        }
        key
    }

    /// Overwrite one stage slot.
    pub fn set_stage(&mut self, stage: ShaderStage, state: Option<u32>) {
        let i = stage as usize;
        self.exists[i] = state.is_some();
        self.state[i] = state.unwrap_or(0);
    }

    /// Whether this key describes a compute-only binding state. Graphics
    /// pipelines always have a fragment stage bound.
    pub fn is_compute(&self) -> bool {
        !self.exists[ShaderStage::Fragment as usize]
    }

    /// 32-bit content hash of the key.
    ///
    /// Compute keys hash to their single state word verbatim. Graphics keys
    /// fold every existing slot's state through xxh32, seeding each round
    /// with the running hash.
    pub fn state_hash(&self) -> u32 {
        if self.is_compute() {
            return self.state[0];
        }
        let mut hash = 0;
        for i in 0..SHADER_STAGE_COUNT {
            if self.exists[i] {
                hash = xxh32(&self.state[i].to_ne_bytes(), hash);
            }
        }
        hash
    }
}

impl PartialEq for DescriptorStateKey {
    fn eq(&self, other: &Self) -> bool {
        for i in 0..SHADER_STAGE_COUNT {
            if self.exists[i] != other.exists[i] {
                return false;
            }
            if self.exists[i] && other.exists[i] && self.state[i] != other.state[i] {
                return false;
            }
        }
        true
    }
}

impl Eq for DescriptorStateKey {}

impl Hash for DescriptorStateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal keys have equal exists arrays, so the content hash is
        // consistent with PartialEq even though absent state words are
        // skipped.
        state.write_u32(self.state_hash());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_hash_identically() {
        let a = DescriptorStateKey::graphics([Some(1), Some(2), None, None, None, None]);
        let b = DescriptorStateKey::graphics([Some(1), Some(2), None, None, None, None]);
        assert_eq!(a, b);
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn differing_state_on_existing_slot_is_unequal() {
        let a = DescriptorStateKey::graphics([Some(1), Some(2), None, None, None, None]);
        let b = DescriptorStateKey::graphics([Some(7), Some(2), None, None, None, None]);
        assert_ne!(a, b);
    }

    #[test]
    fn state_ignored_when_slot_absent() {
        let mut a = DescriptorStateKey::graphics([Some(1), Some(2), None, None, None, None]);
        let b = a.clone();
        // Garbage in an absent slot must affect neither equality nor hash.
        a.state[ShaderStage::Geometry as usize] = 3;
        assert_eq!(a, b);
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn exists_mismatch_is_unequal() {
        let a = DescriptorStateKey::graphics([Some(1), Some(2), None, None, None, None]);
        let b = DescriptorStateKey::graphics([Some(1), Some(2), Some(2), None, None, None]);
        assert_ne!(a, b);
    }

    #[test]
    fn compute_key_hashes_to_state_verbatim() {
        let key = DescriptorStateKey::compute(0xdeadbeef);
        assert!(key.is_compute());
        assert_eq!(key.state_hash(), 0xdeadbeef);
    }
}
