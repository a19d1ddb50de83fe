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

//! Host synchronization primitives backing native fences and semaphores.
//!
//! [`HostEvent`] is a binary flag (Vulkan fences and binary semaphores).
//! [`HostTimeline`] is a monotonic 64-bit counter (D3D12 fences, queue progress).

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A binary signal.
#[derive(Debug, Default)]
pub struct HostEvent {
    set: Mutex<bool>,
    cond: Condvar,
}

impl HostEvent {
    /// Creates an event, optionally already set.
    pub fn new(set: bool) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(set),
            cond: Condvar::new(),
        })
    }

    /// Sets the event and wakes every waiter.
    pub fn set(&self) {
        *lock(&self.set) = true;
        self.cond.notify_all();
    }

    /// Clears the event.
    pub fn reset(&self) {
        *lock(&self.set) = false;
    }

    /// Returns `true` if set.
    pub fn is_set(&self) -> bool {
        *lock(&self.set)
    }

    /// Blocks until set.
    pub fn wait(&self) {
        let mut set = lock(&self.set);
        while !*set {
            set = self.cond.wait(set).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Blocks until set, then clears it.
    pub fn wait_and_consume(&self) {
        let mut set = lock(&self.set);
        while !*set {
            set = self.cond.wait(set).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *set = false;
    }
}

/// A monotonic counter.
#[derive(Debug, Default)]
pub struct HostTimeline {
    value: Mutex<u64>,
    cond: Condvar,
}

impl HostTimeline {
    /// Creates a timeline at `initial`.
    pub fn new(initial: u64) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(initial),
            cond: Condvar::new(),
        })
    }

    /// The completed value.
    pub fn value(&self) -> u64 {
        *lock(&self.value)
    }

    /// Raises the counter to `value`. Lower values are ignored.
    pub fn signal(&self, value: u64) {
        let mut current = lock(&self.value);
        if value > *current {
            *current = value;
            self.cond.notify_all();
        }
    }

    /// Blocks until the counter reaches `value`.
    pub fn wait_for(&self, value: u64) {
        let mut current = lock(&self.value);
        while *current < value {
            current = self
                .cond
                .wait(current)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

/// A wait performed by a queue worker before executing a job.
#[derive(Debug, Clone)]
pub enum SyncWait {
    /// Wait for a binary event and consume it.
    Event(Arc<HostEvent>),
    /// Wait for a timeline to reach a value.
    Timeline(Arc<HostTimeline>, u64),
}

impl SyncWait {
    /// Blocks the calling thread until the wait is satisfied.
    pub fn block(&self) {
        match self {
            SyncWait::Event(event) => event.wait_and_consume(),
            SyncWait::Timeline(timeline, value) => timeline.wait_for(*value),
        }
    }
}

/// A signal performed by a queue worker after executing a job.
#[derive(Debug, Clone)]
pub enum SyncSignal {
    /// Set a binary event.
    Event(Arc<HostEvent>),
    /// Raise a timeline to a value.
    Timeline(Arc<HostTimeline>, u64),
}

impl SyncSignal {
    /// Performs the signal.
    pub fn fire(&self) {
        match self {
            SyncSignal::Event(event) => event.set(),
            SyncSignal::Timeline(timeline, value) => timeline.signal(*value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn event_wakes_waiter() {
        let event = HostEvent::new(false);
        let waiter = {
            let event = event.clone();
            thread::spawn(move || event.wait())
        };
        event.set();
        waiter.join().unwrap();
        assert!(event.is_set());
    }

    #[test]
    fn consuming_wait_clears_event() {
        let event = HostEvent::new(true);
        SyncWait::Event(event.clone()).block();
        assert!(!event.is_set());
    }

    #[test]
    fn timeline_is_monotonic() {
        let timeline = HostTimeline::new(0);
        timeline.signal(3);
        timeline.signal(2);
        assert_eq!(timeline.value(), 3);
        timeline.wait_for(3);

        let waiter = {
            let timeline = timeline.clone();
            thread::spawn(move || timeline.wait_for(5))
        };
        SyncSignal::Timeline(timeline.clone(), 5).fire();
        waiter.join().unwrap();
    }
}
