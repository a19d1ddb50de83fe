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

//! Host-memory allocations standing in for device memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{ResourceState, TextureDescriptor};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// A device memory budget.
#[derive(Debug)]
pub struct HostHeap {
    budget: u64,
    used: AtomicU64,
}

impl HostHeap {
    /// A heap of `budget` bytes.
    pub fn new(budget: u64) -> Arc<Self> {
        Arc::new(Self {
            budget,
            used: AtomicU64::new(0),
        })
    }

    /// Bytes in use.
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Total budget.
    pub fn budget(&self) -> u64 {
        self.budget
    }

    fn reserve(&self, size: u64) -> RhiResult<()> {
        self.used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                used.checked_add(size).filter(|&total| total <= self.budget)
            })
            .map(|_| ())
            .map_err(|used| RhiError::OutOfMemory {
                requested: size,
                capacity: self.budget.saturating_sub(used),
            })
    }

    fn release(&self, size: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(size))
            });
    }
}

/// What an allocation backs.
#[derive(Debug, Clone)]
pub enum AllocationShape {
    /// A linear buffer.
    Buffer,
    /// A texture stored tightly packed, layer-major then mip-major.
    Texture(TextureDescriptor<'static>),
}

impl AllocationShape {
    /// The shape of a texture, without its label.
    pub fn texture(desc: &TextureDescriptor<'_>) -> Self {
        AllocationShape::Texture(TextureDescriptor {
            label: None,
            dimension: desc.dimension,
            size: desc.size,
            mip_level_count: desc.mip_level_count,
            array_layer_count: desc.array_layer_count,
            format: desc.format,
            sample_count: desc.sample_count,
            usage: desc.usage,
            clear_value: desc.clear_value,
        })
    }
}

static NEXT_ALLOCATION: AtomicU64 = AtomicU64::new(1);

/// One block of "device" memory plus the state tracked by the substrate.
#[derive(Debug)]
pub struct Allocation {
    id: u64,
    label: String,
    shape: AllocationShape,
    bytes: Mutex<Vec<u8>>,
    state: Mutex<ResourceState>,
    heap: Arc<HostHeap>,
}

/// A shared reference to an allocation, cloned into recorded commands.
pub type AllocationRef = Arc<Allocation>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Allocation {
    /// Allocates `size` zeroed bytes from `heap`.
    pub fn new(
        heap: &Arc<HostHeap>,
        size: u64,
        shape: AllocationShape,
        label: &str,
    ) -> RhiResult<AllocationRef> {
        heap.reserve(size)?;
        let len = match usize::try_from(size) {
            Ok(len) => len,
            Err(_) => {
                heap.release(size);
                return Err(RhiError::OutOfMemory {
                    requested: size,
                    capacity: heap.budget().saturating_sub(heap.used()),
                });
            }
        };
        Ok(Arc::new(Self {
            id: NEXT_ALLOCATION.fetch_add(1, Ordering::Relaxed),
            label: label.to_owned(),
            shape,
            bytes: Mutex::new(vec![0; len]),
            state: Mutex::new(ResourceState::Undefined),
            heap: heap.clone(),
        }))
    }

    /// A process-unique id, also used to order locks.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        lock(&self.bytes).len() as u64
    }

    /// The texture layout, if this allocation backs a texture.
    pub fn texture_layout(&self) -> Option<&TextureDescriptor<'static>> {
        match &self.shape {
            AllocationShape::Texture(desc) => Some(desc),
            AllocationShape::Buffer => None,
        }
    }

    /// Locks the contents.
    pub fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        lock(&self.bytes)
    }

    /// The last state a transition moved this allocation into.
    pub fn tracked_state(&self) -> ResourceState {
        *lock(&self.state)
    }

    /// Applies a transition, warning when `before` disagrees with the tracked state.
    ///
    /// `Undefined` as `before` discards the contents and matches anything.
    pub fn transition(&self, before: ResourceState, after: ResourceState) {
        let mut state = lock(&self.state);
        if before != ResourceState::Undefined && !state.same_category(before) {
            rhi_log!(
                LogLayer::Backend,
                LogChannel::Warning,
                "'{}': barrier expects {} but the resource is in {}",
                self.label,
                before,
                *state
            );
        }
        *state = after;
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        let size = self.bytes.get_mut().map(|b| b.len()).unwrap_or(0) as u64;
        self.heap.release(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_budget_is_enforced_and_released() {
        let heap = HostHeap::new(1024);
        let a = Allocation::new(&heap, 1000, AllocationShape::Buffer, "a").unwrap();
        assert_eq!(heap.used(), 1000);

        let err = Allocation::new(&heap, 100, AllocationShape::Buffer, "b").unwrap_err();
        assert!(matches!(
            err,
            RhiError::OutOfMemory {
                requested: 100,
                capacity: 24
            }
        ));

        drop(a);
        assert_eq!(heap.used(), 0);
    }

    #[test]
    fn transitions_update_tracked_state() {
        let heap = HostHeap::new(64);
        let alloc = Allocation::new(&heap, 16, AllocationShape::Buffer, "vb").unwrap();
        assert_eq!(alloc.tracked_state(), ResourceState::Undefined);
        alloc.transition(ResourceState::Undefined, ResourceState::CopyDest);
        alloc.transition(ResourceState::CopyDest, ResourceState::VertexBuffer);
        assert_eq!(alloc.tracked_state(), ResourceState::VertexBuffer);
        assert_eq!(alloc.size(), 16);
    }
}
