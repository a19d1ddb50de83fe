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

//! Allocation statistics and leak reporting.
//!
//! Two levels of tracking live here:
//!
//! - Host heap statistics: a set of global atomic counters updated by
//!   [`TrackingAllocator`] when an application installs it as its
//!   `#[global_allocator]`.
//! - RHI object allocations: an [`AllocationTracker`] owned by each device, which
//!   records every buffer and texture allocation with its call site so a leak
//!   report can be produced when the device is dropped.
//!
//! Neither is consulted for correctness; they exist for statistics and diagnostics.

mod allocator;
mod tracker;

pub use allocator::TrackingAllocator;
pub use tracker::{AllocationId, AllocationKind, AllocationRecord, AllocationTracker, LeakReport};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Allocations at or above this size are counted as "large".
pub const LARGE_ALLOCATION_THRESHOLD: usize = 1024 * 1024;

/// Allocations below this size are counted as "small".
pub const SMALL_ALLOCATION_THRESHOLD: usize = 1024;

/// Total number of bytes currently allocated by the registered global allocator.
pub static CURRENTLY_ALLOCATED_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Peak number of bytes ever allocated simultaneously.
pub static PEAK_ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Total number of allocation calls.
pub static TOTAL_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Total number of deallocation calls.
pub static TOTAL_DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Total number of reallocation calls.
pub static TOTAL_REALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Cumulative bytes ever allocated.
pub static BYTES_ALLOCATED_LIFETIME: AtomicU64 = AtomicU64::new(0);

/// Cumulative bytes ever deallocated.
pub static BYTES_DEALLOCATED_LIFETIME: AtomicU64 = AtomicU64::new(0);

/// Number of allocations at or above [`LARGE_ALLOCATION_THRESHOLD`].
pub static LARGE_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Number of allocations below [`SMALL_ALLOCATION_THRESHOLD`].
pub static SMALL_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// A snapshot of the host heap counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    /// Bytes currently in use.
    pub current_allocated_bytes: usize,
    /// Maximum bytes in use at the same time.
    pub peak_allocated_bytes: u64,
    /// Number of allocation requests.
    pub total_allocations: u64,
    /// Number of deallocation requests.
    pub total_deallocations: u64,
    /// Number of reallocation requests.
    pub total_reallocations: u64,
    /// `total_allocations - total_deallocations`.
    pub net_allocations: i64,
    /// Cumulative bytes allocated.
    pub bytes_allocated_lifetime: u64,
    /// Cumulative bytes deallocated.
    pub bytes_deallocated_lifetime: u64,
    /// Number of large allocations.
    pub large_allocations: u64,
    /// Number of small allocations.
    pub small_allocations: u64,
    /// Average allocation size in bytes.
    pub average_allocation_size: f64,
}

impl MemoryStats {
    /// Populates the derived metrics from the raw counters.
    pub fn calculate_derived_metrics(&mut self) {
        self.net_allocations = self.total_allocations as i64 - self.total_deallocations as i64;
        if self.total_allocations > 0 {
            self.average_allocation_size =
                self.bytes_allocated_lifetime as f64 / self.total_allocations as f64;
        }
    }
}

/// Takes a snapshot of all global heap counters.
pub fn memory_stats() -> MemoryStats {
    let mut stats = MemoryStats {
        current_allocated_bytes: CURRENTLY_ALLOCATED_BYTES.load(Ordering::Relaxed),
        peak_allocated_bytes: PEAK_ALLOCATED_BYTES.load(Ordering::Relaxed),
        total_allocations: TOTAL_ALLOCATIONS.load(Ordering::Relaxed),
        total_deallocations: TOTAL_DEALLOCATIONS.load(Ordering::Relaxed),
        total_reallocations: TOTAL_REALLOCATIONS.load(Ordering::Relaxed),
        bytes_allocated_lifetime: BYTES_ALLOCATED_LIFETIME.load(Ordering::Relaxed),
        bytes_deallocated_lifetime: BYTES_DEALLOCATED_LIFETIME.load(Ordering::Relaxed),
        large_allocations: LARGE_ALLOCATIONS.load(Ordering::Relaxed),
        small_allocations: SMALL_ALLOCATIONS.load(Ordering::Relaxed),
        ..Default::default()
    };
    stats.calculate_derived_metrics();
    stats
}

/// Bytes currently allocated by the global allocator.
pub fn currently_allocated_bytes() -> usize {
    CURRENTLY_ALLOCATED_BYTES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_metrics() {
        let mut stats = MemoryStats {
            total_allocations: 4,
            total_deallocations: 1,
            bytes_allocated_lifetime: 400,
            ..Default::default()
        };
        stats.calculate_derived_metrics();
        assert_eq!(stats.net_allocations, 3);
        assert!((stats.average_allocation_size - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn derived_metrics_without_allocations() {
        let mut stats = MemoryStats::default();
        stats.calculate_derived_metrics();
        assert_eq!(stats.average_allocation_size, 0.0);
    }
}
