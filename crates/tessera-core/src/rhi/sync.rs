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

//! Backend-independent synchronization state.
//!
//! Both backends share one fence state machine. The backend only supplies the
//! native primitive through [`FenceSignal`]; every legality check lives here.

use crate::logging::{LogChannel, LogLayer};
use crate::{rhi_fatal, rhi_log};
use std::fmt;

/// The CPU-visible state of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceState {
    /// Ready to be submitted.
    Unsignalled,
    /// Submitted, the GPU has not been observed to finish.
    InFlight,
    /// The GPU finished.
    Signalled,
}

impl fmt::Display for FenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenceState::Unsignalled => write!(f, "UNSIGNALLED"),
            FenceState::InFlight => write!(f, "IN_FLIGHT"),
            FenceState::Signalled => write!(f, "SIGNALLED"),
        }
    }
}

/// The capabilities a native fence provides to [`FenceStateMachine`].
pub trait FenceSignal {
    /// Blocks the calling thread until the GPU signals the fence.
    fn block_until_signalled(&self);
    /// Returns `true` if the GPU has signalled the fence.
    fn is_signalled(&self) -> bool;
    /// Prepares the native fence for the next submission.
    fn rearm(&self);
}

/// The three-state fence machine shared by every backend.
///
/// ```text
/// Unsignalled --submit--> InFlight --wait/poll--> Signalled --reset--> Unsignalled
/// ```
#[derive(Debug)]
pub struct FenceStateMachine<P> {
    primitive: P,
    state: FenceState,
}

impl<P: FenceSignal> FenceStateMachine<P> {
    /// Wraps a native fence. `signalled` must match the native initial state.
    pub fn new(primitive: P, signalled: bool) -> Self {
        Self {
            primitive,
            state: if signalled {
                FenceState::Signalled
            } else {
                FenceState::Unsignalled
            },
        }
    }

    /// The current state, without polling the GPU.
    pub fn state(&self) -> FenceState {
        self.state
    }

    /// The native fence.
    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Releases the native fence, for destruction.
    pub fn into_primitive(self) -> P {
        self.primitive
    }

    /// Aborts unless the fence may be attached to a submission.
    pub fn check_submittable(&self) {
        if self.state != FenceState::Unsignalled {
            rhi_fatal!(
                LogLayer::Rhi,
                "fence submitted while {}; reset it after it signals",
                self.state
            );
        }
    }

    /// Records that the fence was attached to a submission.
    pub fn mark_submitted(&mut self) {
        self.check_submittable();
        self.state = FenceState::InFlight;
    }

    /// Blocks until the fence is signalled.
    ///
    /// Waiting on a fence that was never submitted would deadlock and aborts.
    pub fn wait(&mut self) {
        match self.state {
            FenceState::Unsignalled => {
                rhi_fatal!(LogLayer::Rhi, "wait on an UNSIGNALLED fence would never return")
            }
            FenceState::InFlight => {
                self.primitive.block_until_signalled();
                self.state = FenceState::Signalled;
            }
            FenceState::Signalled => {}
        }
    }

    /// Checks for completion without blocking. Returns `true` once signalled.
    pub fn poll(&mut self) -> bool {
        if self.state == FenceState::InFlight && self.primitive.is_signalled() {
            self.state = FenceState::Signalled;
        }
        self.state == FenceState::Signalled
    }

    /// Returns the fence to `Unsignalled`. Only legal once signalled.
    pub fn reset(&mut self) {
        if self.state != FenceState::Signalled {
            rhi_fatal!(
                LogLayer::Rhi,
                "fence reset while {}; only a SIGNALLED fence can be reset",
                self.state
            );
        }
        self.primitive.rearm();
        self.state = FenceState::Unsignalled;
    }
}

/// The monotonic counter carried by every semaphore.
///
/// A binary semaphore and a timeline fence value behave the same through it:
/// each signal bumps the counter, each wait targets the latest signalled value.
#[derive(Debug, Default)]
pub struct SemaphoreCounter {
    value: u64,
}

impl SemaphoreCounter {
    /// A counter that was never signalled.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last value scheduled for signalling.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Schedules the next signal and returns its value.
    pub fn next_signal(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    /// The value a wait must target.
    ///
    /// Waiting on a semaphore that no submission will signal aborts.
    pub fn wait_target(&self) -> u64 {
        if self.value == 0 {
            rhi_fatal!(LogLayer::Rhi, "wait on a semaphore that is never signalled");
        }
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "semaphore wait at value {}",
            self.value
        );
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A native fence driven by the test.
    #[derive(Default)]
    struct MockFence {
        signalled: Cell<bool>,
        waits: Cell<u32>,
        rearms: Cell<u32>,
    }

    impl FenceSignal for MockFence {
        fn block_until_signalled(&self) {
            self.waits.set(self.waits.get() + 1);
            self.signalled.set(true);
        }

        fn is_signalled(&self) -> bool {
            self.signalled.get()
        }

        fn rearm(&self) {
            self.rearms.set(self.rearms.get() + 1);
            self.signalled.set(false);
        }
    }

    #[test]
    fn full_cycle() {
        let mut fence = FenceStateMachine::new(MockFence::default(), false);
        assert_eq!(fence.state(), FenceState::Unsignalled);

        fence.mark_submitted();
        assert_eq!(fence.state(), FenceState::InFlight);
        assert!(!fence.poll());

        fence.wait();
        assert_eq!(fence.state(), FenceState::Signalled);
        assert_eq!(fence.primitive().waits.get(), 1);

        // A second wait returns immediately.
        fence.wait();
        assert_eq!(fence.primitive().waits.get(), 1);

        fence.reset();
        assert_eq!(fence.state(), FenceState::Unsignalled);
        assert_eq!(fence.primitive().rearms.get(), 1);
    }

    #[test]
    fn poll_observes_completion() {
        let mut fence = FenceStateMachine::new(MockFence::default(), false);
        fence.mark_submitted();
        fence.primitive().signalled.set(true);
        assert!(fence.poll());
        assert_eq!(fence.state(), FenceState::Signalled);
    }

    #[test]
    fn created_signalled() {
        let fence = FenceStateMachine::new(MockFence::default(), true);
        assert_eq!(fence.state(), FenceState::Signalled);
    }

    #[test]
    #[should_panic(expected = "UNSIGNALLED fence")]
    fn reset_then_wait_is_fatal() {
        let mut fence = FenceStateMachine::new(MockFence::default(), true);
        fence.reset();
        fence.wait();
    }

    #[test]
    #[should_panic(expected = "only a SIGNALLED fence")]
    fn reset_in_flight_is_fatal() {
        let mut fence = FenceStateMachine::new(MockFence::default(), false);
        fence.mark_submitted();
        fence.reset();
    }

    #[test]
    #[should_panic(expected = "fence submitted while SIGNALLED")]
    fn resubmitting_a_signalled_fence_is_fatal() {
        let mut fence = FenceStateMachine::new(MockFence::default(), true);
        fence.mark_submitted();
    }

    #[test]
    fn semaphore_counter_is_monotonic() {
        let mut counter = SemaphoreCounter::new();
        assert_eq!(counter.next_signal(), 1);
        assert_eq!(counter.wait_target(), 1);
        assert_eq!(counter.next_signal(), 2);
        assert_eq!(counter.value(), 2);
    }

    #[test]
    #[should_panic(expected = "never signalled")]
    fn waiting_on_an_unsignalled_semaphore_is_fatal() {
        SemaphoreCounter::new().wait_target();
    }
}
