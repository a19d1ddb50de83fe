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

//! CPU-visible fences and queue-to-queue semaphores.

use crate::device::Device;
use crate::queue::SubmissionTicket;
use std::cell::RefCell;
use std::fmt;
use std::mem::ManuallyDrop;
use tessera_core::rhi::{
    FenceState, FenceStateMachine, RhiBackend, RhiResult, SemaphoreCounter, SemaphoreOp,
};

/// A GPU to CPU fence.
///
/// ```text
/// Unsignalled --submit--> InFlight --wait/poll--> Signalled --reset--> Unsignalled
/// ```
///
/// Waiting on an unsignalled fence, resetting a fence that is not signalled and
/// submitting a fence that is not unsignalled all abort.
pub struct Fence<'d, B: RhiBackend> {
    device: &'d Device<B>,
    machine: ManuallyDrop<FenceStateMachine<B::Fence>>,
    ticket: Option<SubmissionTicket>,
}

impl<B: RhiBackend> fmt::Debug for Fence<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fence").field("state", &self.state()).finish()
    }
}

impl<B: RhiBackend> Fence<'_, B> {
    /// The native fence.
    pub fn raw(&self) -> &B::Fence {
        self.machine.primitive()
    }

    /// The state last observed, without polling.
    pub fn state(&self) -> FenceState {
        self.machine.state()
    }

    /// Blocks until the fence signals. Returns at once when already signalled.
    pub fn wait(&mut self) {
        self.machine.wait();
        self.retire();
    }

    /// Checks for completion without blocking.
    pub fn poll(&mut self) -> bool {
        let signalled = self.machine.poll();
        if signalled {
            self.retire();
        }
        signalled
    }

    /// Returns a signalled fence to `Unsignalled`.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.ticket = None;
    }

    pub(crate) fn check_submittable(&self) {
        self.machine.check_submittable();
    }

    pub(crate) fn mark_submitted(&mut self, ticket: SubmissionTicket) {
        self.machine.mark_submitted();
        self.ticket = Some(ticket);
    }

    fn retire(&self) {
        if let Some(ticket) = &self.ticket {
            ticket.retire();
        }
    }
}

impl<B: RhiBackend> Drop for Fence<'_, B> {
    fn drop(&mut self) {
        if self.machine.state() == FenceState::InFlight {
            self.machine.wait();
            self.retire();
        }
        // SAFETY: `machine` is never touched again after this point.
        let machine = unsafe { ManuallyDrop::take(&mut self.machine) };
        B::destroy_fence(&self.device.ctx, machine.into_primitive());
    }
}

/// A GPU to GPU semaphore.
///
/// Every signal bumps a counter and every wait targets its latest value, so
/// a wait is always paired with the most recent signal.
pub struct Semaphore<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Semaphore>,
    counter: RefCell<SemaphoreCounter>,
}

impl<B: RhiBackend> fmt::Debug for Semaphore<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("value", &self.value())
            .finish()
    }
}

impl<B: RhiBackend> Semaphore<'_, B> {
    /// The native semaphore.
    pub fn raw(&self) -> &B::Semaphore {
        &self.raw
    }

    /// The value of the latest scheduled signal. Zero if never signalled.
    pub fn value(&self) -> u64 {
        self.counter.borrow().value()
    }

    /// A wait on the latest signal. Aborts if nothing will ever signal.
    pub(crate) fn wait_op(&self) -> SemaphoreOp<'_, B::Semaphore> {
        SemaphoreOp {
            semaphore: &self.raw,
            value: self.counter.borrow().wait_target(),
        }
    }

    /// The signal the next submission makes, before it is committed.
    pub(crate) fn pending_signal_op(&self) -> SemaphoreOp<'_, B::Semaphore> {
        SemaphoreOp {
            semaphore: &self.raw,
            value: self.value() + 1,
        }
    }

    /// Records that the pending signal was handed to the backend.
    pub(crate) fn commit_signal(&self) {
        self.counter.borrow_mut().next_signal();
    }
}

impl<B: RhiBackend> Drop for Semaphore<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_semaphore(&self.device.ctx, raw);
    }
}

impl<B: RhiBackend> Device<B> {
    /// Creates a fence, `Signalled` when `signalled` is set.
    ///
    /// # Errors
    ///
    /// Native creation failures.
    pub fn create_fence(&self, signalled: bool) -> RhiResult<Fence<'_, B>> {
        let raw = B::create_fence(&self.ctx, signalled)?;
        Ok(Fence {
            device: self,
            machine: ManuallyDrop::new(FenceStateMachine::new(raw, signalled)),
            ticket: None,
        })
    }

    /// Creates a semaphore that was never signalled.
    ///
    /// # Errors
    ///
    /// Native creation failures.
    pub fn create_semaphore(&self) -> RhiResult<Semaphore<'_, B>> {
        let raw = B::create_semaphore(&self.ctx)?;
        Ok(Semaphore {
            device: self,
            raw: ManuallyDrop::new(raw),
            counter: RefCell::new(SemaphoreCounter::new()),
        })
    }
}
