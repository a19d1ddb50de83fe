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

use super::{
    BYTES_ALLOCATED_LIFETIME, BYTES_DEALLOCATED_LIFETIME, CURRENTLY_ALLOCATED_BYTES,
    LARGE_ALLOCATIONS, LARGE_ALLOCATION_THRESHOLD, PEAK_ALLOCATED_BYTES, SMALL_ALLOCATIONS,
    SMALL_ALLOCATION_THRESHOLD, TOTAL_ALLOCATIONS, TOTAL_DEALLOCATIONS, TOTAL_REALLOCATIONS,
};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::Ordering;

/// A [`GlobalAlloc`] wrapper (defaults to [`System`]) that feeds the global
/// counters of this module.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: TrackingAllocator = TrackingAllocator::new(std::alloc::System);
/// ```
///
/// The allocator itself holds no state. It must not log: logging allocates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAllocator<A = System> {
    inner: A,
}

impl<A> TrackingAllocator<A> {
    /// Creates a tracking allocator wrapping `inner`.
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

fn record_alloc(size: usize) {
    let current = CURRENTLY_ALLOCATED_BYTES
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            current.checked_add(size)
        })
        .map(|previous| previous + size)
        .unwrap_or(usize::MAX);
    PEAK_ALLOCATED_BYTES.fetch_max(current as u64, Ordering::Relaxed);
    TOTAL_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    BYTES_ALLOCATED_LIFETIME.fetch_add(size as u64, Ordering::Relaxed);

    if size >= LARGE_ALLOCATION_THRESHOLD {
        LARGE_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    } else if size < SMALL_ALLOCATION_THRESHOLD {
        SMALL_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    }
}

fn record_dealloc(size: usize) {
    // Saturates instead of wrapping if memory allocated before installation is freed.
    let _ = CURRENTLY_ALLOCATED_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(size))
    });
    TOTAL_DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    BYTES_DEALLOCATED_LIFETIME.fetch_add(size as u64, Ordering::Relaxed);
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record_dealloc(layout.size());
        unsafe { self.inner.dealloc(ptr, layout) };
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            TOTAL_REALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            let old_size = layout.size();
            match new_size.cmp(&old_size) {
                std::cmp::Ordering::Greater => {
                    let grown = new_size - old_size;
                    let current = CURRENTLY_ALLOCATED_BYTES.fetch_add(grown, Ordering::Relaxed);
                    PEAK_ALLOCATED_BYTES.fetch_max((current + grown) as u64, Ordering::Relaxed);
                    BYTES_ALLOCATED_LIFETIME.fetch_add(grown as u64, Ordering::Relaxed);
                }
                std::cmp::Ordering::Less => {
                    let shrunk = old_size - new_size;
                    let _ = CURRENTLY_ALLOCATED_BYTES.fetch_update(
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                        |current| Some(current.saturating_sub(shrunk)),
                    );
                    BYTES_DEALLOCATED_LIFETIME.fetch_add(shrunk as u64, Ordering::Relaxed);
                }
                std::cmp::Ordering::Equal => {}
            }
        }
        new_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The allocator is not installed globally in tests; it is driven directly.
    #[test]
    fn alloc_and_dealloc_update_counters() {
        let allocator = TrackingAllocator::new(System);
        let layout = Layout::from_size_align(4096, 8).unwrap();

        let before_allocs = TOTAL_ALLOCATIONS.load(Ordering::Relaxed);
        let before_deallocs = TOTAL_DEALLOCATIONS.load(Ordering::Relaxed);

        unsafe {
            let ptr = allocator.alloc(layout);
            assert!(!ptr.is_null());
            let ptr = allocator.realloc(ptr, layout, 8192);
            assert!(!ptr.is_null());
            allocator.dealloc(ptr, Layout::from_size_align(8192, 8).unwrap());
        }

        assert!(TOTAL_ALLOCATIONS.load(Ordering::Relaxed) > before_allocs);
        assert!(TOTAL_DEALLOCATIONS.load(Ordering::Relaxed) > before_deallocs);
        assert!(TOTAL_REALLOCATIONS.load(Ordering::Relaxed) >= 1);
        assert!(PEAK_ALLOCATED_BYTES.load(Ordering::Relaxed) >= 8192);
    }
}
