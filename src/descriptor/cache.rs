//! The descriptor set cache/allocator.
//!
//! [`ProgramDescriptors::get`] resolves a binding state key to a ready set,
//! trying in order: the per-category last-used set, the active and free hash
//! maps, the pre-allocated bucket remainder, a bounded eviction scan of the
//! free map, and finally bulk allocation. When the pool would exceed its
//! capacity, outstanding work is flushed synchronously and the lookup retried
//! exactly once.
//!
//! [`ProgramDescriptors::recycle`] is the other half of the lifecycle: a set
//! whose reference count dropped back to one is parked in the free map
//! (still cache-hit eligible) or, if it was invalidated, handed straight back
//! to the allocation array.

use std::sync::atomic::Ordering;

use anyhow::Result;

use crate::batch::BatchTracker;
use crate::error::Error;

use super::key::DescriptorStateKey;
use super::pool::DescriptorPool;
use super::program::ProgramDescriptors;
use super::set::{DescriptorSetRef, SetId};
use super::{DescriptorCategory, DESCRIPTOR_CATEGORY_COUNT};

/// Outcome of one selection attempt.
enum Selection {
    /// A set was chosen. `refresh` is false only for paths that guarantee the
    /// set's key and map bookkeeping are already current.
    Chosen {
        owner: DescriptorCategory,
        id: SetId,
        cache_hit: bool,
        refresh: bool,
    },
    /// Pool at capacity; flush outstanding work and retry.
    Exhausted,
}

impl ProgramDescriptors {
    /// Get a descriptor set matching `key` for one category of this program.
    ///
    /// The returned set is valid, keyed to `key`, attached to the current
    /// batch, and recorded as the category's last-used set. The flag reports
    /// whether the set's previous contents already match the requested
    /// binding state; on `false` the caller must (re)write the set's bindings
    /// through the native API and register them via
    /// [`DescriptorRefs::add`](super::refs::DescriptorRefs::add).
    ///
    /// # Errors
    /// - Fails with [`Error::NoPool`] if the program has no pool for
    ///   `category` (its shaders declare no descriptors).
    /// - Fails with [`Error::PoolExhausted`] if the pool is still out of
    ///   capacity after a synchronous flush; the draw must be aborted.
    /// - Fails with [`Error::AllocationFailed`] if the backend cannot
    ///   allocate a set bucket.
    pub fn get(
        &mut self,
        batch: &mut dyn BatchTracker,
        key: &DescriptorStateKey,
        category: DescriptorCategory,
        is_compute: bool,
    ) -> Result<(DescriptorSetRef, bool)> {
        debug_assert_eq!(is_compute, key.is_compute());
        let mut flushed = false;
        loop {
            match self.select(key, category, batch.descriptors_used())? {
                Selection::Chosen {
                    owner,
                    id,
                    cache_hit,
                    refresh,
                } => {
                    return self.commit(batch, key, category, owner, id, cache_hit, refresh);
                }
                Selection::Exhausted => {
                    if flushed {
                        // The flush released every batch reference, so a
                        // second exhaustion means set references are leaking.
                        return Err(Error::PoolExhausted(category).into());
                    }
                    debug!("descriptor pool for {category:?} exhausted, flushing");
                    let (_, retired) = batch.flush_and_wait()?;
                    for set in &retired {
                        self.recycle(set);
                    }
                    flushed = true;
                }
            }
        }
    }

    fn select(
        &mut self,
        key: &DescriptorStateKey,
        category: DescriptorCategory,
        demand: u32,
    ) -> Result<Selection> {
        let cat = category as usize;
        let num_descriptors = match self.pools[cat].as_ref() {
            Some(pool) => pool.num_descriptors,
            None => return Err(Error::NoPool(category).into()),
        };
        let hash = if num_descriptors > 0 { key.state_hash() } else { 0 };

        // Quick path: the category's last-used set, if its key still matches.
        if let Some((owner, id)) = self.last_set[cat] {
            let Some(owner_pool) = self.pools[owner as usize].as_ref() else {
                return Err(Error::Consistency("last-used set points at a missing pool").into());
            };
            let set = owner_pool.set(id);
            let matches = set.hash == hash && set.key == *key;
            let cache_hit = !set.shared.invalid.load(Ordering::Acquire);
            let recycled = set.recycled;
            if matches {
                if num_descriptors > 0 && recycled {
                    // Promote back out of the free map; the refresh below
                    // re-inserts into the active map.
                    if let Some(pool) = self.pools[cat].as_mut() {
                        pool.free.remove(key);
                    }
                }
                return Ok(Selection::Chosen {
                    owner,
                    id,
                    cache_hit,
                    refresh: true,
                });
            }
        }

        if num_descriptors == 0 {
            // Null fast path: one shared set covers every zero-binding
            // category of the program. Its stored hash is always zero, so
            // presence of a last-used set is enough.
            if let Some((owner, id)) = self.last_set[cat] {
                let Some(owner_pool) = self.pools[owner as usize].as_ref() else {
                    return Err(
                        Error::Consistency("last-used set points at a missing pool").into()
                    );
                };
                if owner_pool.set(id).hash == 0 {
                    return Ok(Selection::Chosen {
                        owner,
                        id,
                        cache_hit: true,
                        refresh: false,
                    });
                }
            }
            let Some(pool) = self.pools[cat].as_mut() else {
                return Err(Error::NoPool(category).into());
            };
            let id = pool.allocate_bucket(1)?;
            return Ok(Selection::Chosen {
                owner: category,
                id,
                cache_hit: false,
                refresh: true,
            });
        }

        let Some(pool) = self.pools[cat].as_mut() else {
            return Err(Error::NoPool(category).into());
        };

        // Active map first. A hit here must be valid; an invalidated set
        // reachable through the active map is a tracking bug.
        if let Some(&id) = pool.active.get(key) {
            if pool.set(id).shared.invalid.load(Ordering::Acquire) {
                debug_assert!(false, "invalidated descriptor set found in active map");
                error!(
                    "invalidated descriptor set in active map for {category:?}, treating as miss"
                );
            } else {
                // Already keyed correctly in the active map; nothing to
                // refresh.
                return Ok(Selection::Chosen {
                    owner: category,
                    id,
                    cache_hit: true,
                    refresh: false,
                });
            }
        }

        // Parked in the free map? Migrate it back to the active map through
        // the refresh. Still a cache hit as long as it was not invalidated.
        if let Some(id) = pool.free.remove(key) {
            let cache_hit = !pool.set(id).shared.invalid.load(Ordering::Acquire);
            return Ok(Selection::Chosen {
                owner: category,
                id,
                cache_hit,
                refresh: true,
            });
        }

        // Spare sets from a previous bulk allocation.
        if let Some(id) = pool.alloc_bucket.pop() {
            return Ok(Selection::Chosen {
                owner: category,
                id,
                cache_hit: false,
                refresh: true,
            });
        }

        if let Some(id) = Self::evict(pool) {
            return Ok(Selection::Chosen {
                owner: category,
                id,
                cache_hit: false,
                refresh: true,
            });
        }

        if pool.num_sets_allocated + pool.num_descriptors > pool.settings.max_sets {
            return Ok(Selection::Exhausted);
        }

        let id = pool.allocate_bucket(demand.max(1))?;
        Ok(Selection::Chosen {
            owner: category,
            id,
            cache_hit: false,
            refresh: true,
        })
    }

    /// Bounded eviction scan of the free map. Prefers sets that are already
    /// invalidated; past the probe limit any uncontended set is accepted to
    /// bound lookup cost.
    fn evict(pool: &mut DescriptorPool) -> Option<SetId> {
        if pool.free.is_empty() {
            return None;
        }
        let limit = pool.settings.eviction_probe_limit;
        let mut chosen: Option<DescriptorStateKey> = None;
        for (count, (key, &id)) in pool.free.iter().enumerate() {
            let shared = &pool.set(id).shared;
            let uncontended = shared.refcount.load(Ordering::Acquire) == 1;
            if uncontended && (count >= limit || shared.invalid.load(Ordering::Acquire)) {
                chosen = Some(key.clone());
                break;
            }
        }
        let key = chosen?;
        let id = pool.free.remove(&key)?;
        pool.set(id).shared.invalid.store(true, Ordering::Release);
        Some(id)
    }

    /// Unconditional tail of every selection: refresh key metadata and map
    /// bookkeeping where needed, then hand the set out.
    fn commit(
        &mut self,
        batch: &mut dyn BatchTracker,
        key: &DescriptorStateKey,
        category: DescriptorCategory,
        owner: DescriptorCategory,
        id: SetId,
        cache_hit: bool,
        refresh: bool,
    ) -> Result<(DescriptorSetRef, bool)> {
        let cat = category as usize;
        let num_descriptors = self.pools[cat]
            .as_ref()
            .map(|pool| pool.num_descriptors)
            .unwrap_or(0);

        if refresh {
            let hash = if num_descriptors > 0 { key.state_hash() } else { 0 };
            {
                let Some(pool) = self.pools[owner as usize].as_mut() else {
                    return Err(Error::Consistency("selected set points at a missing pool").into());
                };
                let set = pool.set_mut(id);
                set.hash = hash;
                set.key = key.clone();
                set.recycled = false;
                if num_descriptors > 0 {
                    pool.active.insert(key.clone(), id);
                }
            }
            if num_descriptors == 0 {
                // The null set applies to every zero-binding category of this
                // program; future requests for them take the fast path.
                for i in 0..DESCRIPTOR_CATEGORY_COUNT {
                    if self.pools[i]
                        .as_ref()
                        .is_some_and(|pool| pool.num_descriptors == 0)
                    {
                        self.last_set[i] = Some((owner, id));
                    }
                }
            }
        }

        let Some(owner_pool) = self.pools[owner as usize].as_ref() else {
            return Err(Error::Consistency("selected set points at a missing pool").into());
        };
        let set_ref = owner_pool.make_ref(self.id, id);
        set_ref.shared.invalid.store(false, Ordering::Release);
        if batch.attach_set(&set_ref) {
            set_ref.retain();
            batch.note_descriptors_used(num_descriptors);
        }
        self.last_set[cat] = Some((owner, id));
        Ok((set_ref, cache_hit))
    }

    /// Offer a set back to its pool once its reference count has dropped to
    /// one (only the pool's own bookkeeping left).
    ///
    /// Anything else is a no-op: sets still referenced by a batch, refs
    /// belonging to other programs, null sets (shared program-wide), and sets
    /// whose map entry is already gone because they were recycled through
    /// another handle. Invalidated sets skip the free map and go straight
    /// back to the allocation array; they carry no reusable cache value.
    pub fn recycle(&mut self, set: &DescriptorSetRef) {
        if set.program != self.id {
            return;
        }
        if set.references() != 1 {
            return;
        }
        let Some(pool) = self.pools[set.owner as usize].as_mut() else {
            return;
        };
        if pool.num_descriptors == 0 {
            return;
        }
        let key = pool.set(set.id).key.clone();
        match pool.active.get(&key) {
            // Sets can be used multiple times in the same batch; a later
            // recycle attempt finds the entry already gone.
            None => return,
            // The key has since been claimed by a different set; removing the
            // entry would orphan that one.
            Some(&id) if id != set.id => return,
            Some(_) => {}
        }
        pool.active.remove(&key);
        if set.is_invalid() {
            pool.alloc_bucket.push(set.id);
        } else {
            pool.set_mut(set.id).recycled = true;
            pool.free.insert(key, set.id);
        }
    }
}
