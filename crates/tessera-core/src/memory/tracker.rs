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

use crate::logging::{LogChannel, LogLayer};
use crate::rhi_log;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Globally unique identifier of a tracked allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(pub u64);

// Shared by every tracker so ids stay unique across devices.
static NEXT_ALLOCATION_ID: AtomicU64 = AtomicU64::new(1);

impl AllocationId {
    fn next() -> Self {
        Self(NEXT_ALLOCATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What kind of object an allocation backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationKind {
    /// A buffer's memory.
    Buffer,
    /// A texture's memory.
    Texture,
    /// A staging area owned by a subsystem.
    Staging,
    /// Anything else.
    Other,
}

impl fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationKind::Buffer => write!(f, "buffer"),
            AllocationKind::Texture => write!(f, "texture"),
            AllocationKind::Staging => write!(f, "staging"),
            AllocationKind::Other => write!(f, "other"),
        }
    }
}

/// One live allocation.
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    /// The allocation's id.
    pub id: AllocationId,
    /// The kind of object.
    pub kind: AllocationKind,
    /// Size in bytes.
    pub size: u64,
    /// The object's debug label, if any.
    pub label: Option<String>,
    /// Where the allocation was requested.
    pub location: &'static Location<'static>,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: HashMap<AllocationId, AllocationRecord>,
    total_allocations: u64,
    total_frees: u64,
    current_bytes: u64,
    peak_bytes: u64,
}

/// An id-keyed table of live allocations with their call sites.
///
/// Every `register` must be balanced by an `unregister`. Whatever is still in the
/// table when [`AllocationTracker::leak_report`] is called is reported as a leak.
#[derive(Debug, Default)]
pub struct AllocationTracker {
    state: Mutex<TrackerState>,
}

/// The result of a leak check.
#[derive(Debug, Clone, Default)]
pub struct LeakReport {
    /// Allocations still live, ordered by id.
    pub leaks: Vec<AllocationRecord>,
    /// Total leaked bytes.
    pub leaked_bytes: u64,
    /// Allocations registered over the tracker's lifetime.
    pub total_allocations: u64,
    /// Allocations released over the tracker's lifetime.
    pub total_frees: u64,
    /// Maximum bytes live at the same time.
    pub peak_bytes: u64,
}

impl LeakReport {
    /// Returns `true` if nothing leaked.
    pub fn is_clean(&self) -> bool {
        self.leaks.is_empty()
    }

    /// Logs the report on the memory layer.
    pub fn log(&self) {
        if self.is_clean() {
            rhi_log!(
                LogLayer::Memory,
                LogChannel::Success,
                "no leaks ({} allocations, peak {} bytes)",
                self.total_allocations,
                self.peak_bytes
            );
            return;
        }

        rhi_log!(
            LogLayer::Memory,
            LogChannel::Warning,
            "{} allocation(s) leaked, {} bytes",
            self.leaks.len(),
            self.leaked_bytes
        );
        for record in &self.leaks {
            rhi_log!(
                LogLayer::Memory,
                LogChannel::Warning,
                "  #{} {} '{}' {} bytes, allocated at {}",
                record.id.0,
                record.kind,
                record.label.as_deref().unwrap_or("<unnamed>"),
                record.size,
                record.location
            );
        }
    }
}

impl AllocationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        // A poisoned table is still a valid table.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a new allocation made at the caller's location.
    #[track_caller]
    pub fn register(&self, kind: AllocationKind, size: u64, label: Option<&str>) -> AllocationId {
        self.register_at(kind, size, label, Location::caller())
    }

    /// Records a new allocation made at an explicit location.
    pub fn register_at(
        &self,
        kind: AllocationKind,
        size: u64,
        label: Option<&str>,
        location: &'static Location<'static>,
    ) -> AllocationId {
        let id = AllocationId::next();
        let mut state = self.lock();
        state.live.insert(
            id,
            AllocationRecord {
                id,
                kind,
                size,
                label: label.map(str::to_owned),
                location,
            },
        );
        state.total_allocations += 1;
        state.current_bytes += size;
        state.peak_bytes = state.peak_bytes.max(state.current_bytes);
        id
    }

    /// Releases a previously registered allocation.
    ///
    /// Releasing an unknown id is logged as a warning and otherwise ignored.
    pub fn unregister(&self, id: AllocationId) {
        let mut state = self.lock();
        match state.live.remove(&id) {
            Some(record) => {
                state.total_frees += 1;
                state.current_bytes -= record.size;
            }
            None => {
                drop(state);
                rhi_log!(
                    LogLayer::Memory,
                    LogChannel::Warning,
                    "release of unknown allocation #{}",
                    id.0
                );
            }
        }
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Bytes currently live.
    pub fn live_bytes(&self) -> u64 {
        self.lock().current_bytes
    }

    /// Builds a report of everything still live.
    pub fn leak_report(&self) -> LeakReport {
        let state = self.lock();
        let mut leaks: Vec<AllocationRecord> = state.live.values().cloned().collect();
        leaks.sort_by_key(|record| record.id);
        LeakReport {
            leaked_bytes: leaks.iter().map(|record| record.size).sum(),
            leaks,
            total_allocations: state.total_allocations,
            total_frees: state.total_frees,
            peak_bytes: state.peak_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_allocations_are_clean() {
        let tracker = AllocationTracker::new();
        let a = tracker.register(AllocationKind::Buffer, 256, Some("vertices"));
        let b = tracker.register(AllocationKind::Texture, 1024, None);
        assert_eq!(tracker.live_count(), 2);
        assert_eq!(tracker.live_bytes(), 1280);

        tracker.unregister(a);
        tracker.unregister(b);

        let report = tracker.leak_report();
        assert!(report.is_clean());
        assert_eq!(report.total_allocations, 2);
        assert_eq!(report.total_frees, 2);
        assert_eq!(report.peak_bytes, 1280);
    }

    #[test]
    fn leaks_keep_their_call_site() {
        let tracker = AllocationTracker::new();
        let line = line!() + 1;
        let _leaked = tracker.register(AllocationKind::Buffer, 64, Some("forgotten"));

        let report = tracker.leak_report();
        assert_eq!(report.leaks.len(), 1);
        assert_eq!(report.leaked_bytes, 64);
        let record = &report.leaks[0];
        assert_eq!(record.label.as_deref(), Some("forgotten"));
        assert_eq!(record.location.line(), line);
        assert!(record.location.file().ends_with("tracker.rs"));
    }

    #[test]
    fn ids_are_unique_across_trackers() {
        let first = AllocationTracker::new();
        let second = AllocationTracker::new();
        let a = first.register(AllocationKind::Other, 1, None);
        let b = second.register(AllocationKind::Other, 1, None);
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_release_is_ignored() {
        let tracker = AllocationTracker::new();
        tracker.unregister(AllocationId(u64::MAX));
        assert_eq!(tracker.leak_report().total_frees, 0);
    }
}
