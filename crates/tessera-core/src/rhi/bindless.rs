// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Slot allocation for the global bindless descriptor table.
//!
//! Every shader-visible view and sampler owns one slot of the device's
//! descriptor arrays. Shaders reach a resource through its slot index, passed in
//! push constants, so no per-draw descriptor binding is needed.

use crate::logging::LogLayer;
use crate::rhi_fatal;
use std::fmt;

/// The sentinel returned when a pool is exhausted.
pub const INVALID_INDEX: u32 = u32::MAX;

/// Index of a view in the bindless resource array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIndex(pub u32);

/// Index of a sampler in the bindless sampler array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerIndex(pub u32);

impl fmt::Display for ResourceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Display for SamplerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A fixed-capacity pool of `u32` slots with O(1) allocate and free.
///
/// The free list is intrusive: `next[i]` holds the slot that follows `i` in the
/// free list while `i` is free. Freed slots are reused LIFO. The allocator is not
/// synchronized.
#[derive(Debug, Clone)]
pub struct FreeListAllocator {
    next: Vec<u32>,
    live: Vec<bool>,
    head: u32,
    allocated: u32,
}

impl FreeListAllocator {
    /// Creates a pool managing `[0, capacity)`.
    ///
    /// `capacity` must be below [`INVALID_INDEX`].
    pub fn new(capacity: u32) -> Self {
        if capacity == INVALID_INDEX {
            rhi_fatal!(LogLayer::Rhi, "free-list capacity {capacity} collides with the sentinel");
        }
        let next = (0..capacity)
            .map(|i| if i + 1 < capacity { i + 1 } else { INVALID_INDEX })
            .collect();
        Self {
            next,
            live: vec![false; capacity as usize],
            head: if capacity == 0 { INVALID_INDEX } else { 0 },
            allocated: 0,
        }
    }

    /// Takes a free slot, or returns [`INVALID_INDEX`] when every slot is live.
    pub fn allocate(&mut self) -> u32 {
        let index = self.head;
        if index == INVALID_INDEX {
            return INVALID_INDEX;
        }
        self.head = self.next[index as usize];
        self.live[index as usize] = true;
        self.allocated += 1;
        index
    }

    /// Returns a live slot to the pool.
    ///
    /// Freeing a slot that is out of range or not live aborts.
    pub fn free(&mut self, index: u32) {
        if index >= self.capacity() {
            rhi_fatal!(
                LogLayer::Rhi,
                "free of bindless index {index} outside of [0, {})",
                self.capacity()
            );
        }
        if !self.live[index as usize] {
            rhi_fatal!(LogLayer::Rhi, "double free of bindless index {index}");
        }
        self.live[index as usize] = false;
        self.next[index as usize] = self.head;
        self.head = index;
        self.allocated -= 1;
    }

    /// Number of slots managed.
    pub fn capacity(&self) -> u32 {
        self.next.len() as u32
    }

    /// Number of live slots.
    pub fn allocated_count(&self) -> u32 {
        self.allocated
    }

    /// Number of free slots.
    pub fn available(&self) -> u32 {
        self.capacity() - self.allocated
    }

    /// Returns `true` if `index` is currently live.
    pub fn is_allocated(&self, index: u32) -> bool {
        self.live.get(index as usize).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exhaustion_returns_the_sentinel() {
        let mut pool = FreeListAllocator::new(4);
        let indices: Vec<u32> = (0..4).map(|_| pool.allocate()).collect();
        assert!(indices.iter().all(|&i| i < 4));
        assert_eq!(pool.allocate(), INVALID_INDEX);
        assert_eq!(pool.allocate(), INVALID_INDEX);
        assert_eq!(pool.allocated_count(), 4);
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut pool = FreeListAllocator::new(2);
        let a = pool.allocate();
        let _b = pool.allocate();
        pool.free(a);
        assert!(!pool.is_allocated(a));
        assert_eq!(pool.allocate(), a);
        assert_eq!(pool.allocate(), INVALID_INDEX);
    }

    #[test]
    fn live_indices_never_collide() {
        // Deterministic pseudo-random interleaving of allocate and free.
        let mut pool = FreeListAllocator::new(64);
        let mut live: Vec<u32> = Vec::new();
        let mut seed: u32 = 0x9E37_79B9;
        for _ in 0..10_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 != 0 || live.is_empty() {
                let index = pool.allocate();
                if live.len() == 64 {
                    assert_eq!(index, INVALID_INDEX);
                } else {
                    assert_ne!(index, INVALID_INDEX);
                    live.push(index);
                }
            } else {
                let victim = live.swap_remove(seed as usize % live.len());
                pool.free(victim);
            }

            let unique: HashSet<u32> = live.iter().copied().collect();
            assert_eq!(unique.len(), live.len());
            assert_eq!(pool.allocated_count() as usize, live.len());
        }
    }

    #[test]
    fn zero_capacity_pool_is_always_exhausted() {
        let mut pool = FreeListAllocator::new(0);
        assert_eq!(pool.allocate(), INVALID_INDEX);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn double_free_is_fatal() {
        let mut pool = FreeListAllocator::new(2);
        let index = pool.allocate();
        pool.free(index);
        pool.free(index);
    }

    #[test]
    #[should_panic(expected = "outside of")]
    fn out_of_range_free_is_fatal() {
        let mut pool = FreeListAllocator::new(2);
        pool.free(7);
    }
}
