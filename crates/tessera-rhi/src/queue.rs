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

//! Submission queues and the bookkeeping that retires submitted command buffers.

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::sync::{Fence, Semaphore};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{CommandBufferState, QueueType};
use tessera_core::rhi::{QueueSubmission, RhiBackend, RhiResult};
use tessera_core::{rhi_ensure, rhi_log};

/// Serials of the submissions made on one queue and how far they are known to be retired.
///
/// A queue executes in submission order, so observing serial `n` complete
/// retires every serial up to `n`.
#[derive(Debug, Default)]
pub(crate) struct SubmissionTimeline {
    submitted: Cell<u64>,
    retired: Cell<u64>,
}

impl SubmissionTimeline {
    fn next_serial(&self) -> u64 {
        let serial = self.submitted.get() + 1;
        self.submitted.set(serial);
        serial
    }

    fn retire_through(&self, serial: u64) {
        if serial > self.retired.get() {
            self.retired.set(serial);
        }
    }

    pub(crate) fn retire_all(&self) {
        self.retired.set(self.submitted.get());
    }
}

/// One submission on one queue.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionTicket {
    timeline: Rc<SubmissionTimeline>,
    serial: u64,
}

impl SubmissionTicket {
    pub(crate) fn is_retired(&self) -> bool {
        self.timeline.retired.get() >= self.serial
    }

    pub(crate) fn retire(&self) {
        self.timeline.retire_through(self.serial);
    }
}

/// A queue of one [`QueueType`].
///
/// Submissions on one queue execute in order. Work on different queues is only
/// ordered through the semaphores passed to [`Queue::submit`].
pub struct Queue<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: B::Queue,
    queue_type: QueueType,
    timeline: Rc<SubmissionTimeline>,
}

impl<B: RhiBackend> fmt::Debug for Queue<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("queue_type", &self.queue_type)
            .field("submitted", &self.timeline.submitted.get())
            .field("retired", &self.timeline.retired.get())
            .finish()
    }
}

impl<'d, B: RhiBackend> Queue<'d, B> {
    /// The native queue.
    pub fn raw(&self) -> &B::Queue {
        &self.raw
    }

    /// The queue type.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Submits one executable command buffer.
    ///
    /// `wait` delays execution until the semaphore's latest signal; `signal`
    /// bumps the semaphore's counter once execution finishes. `fence` must be
    /// unsignalled and becomes in flight.
    ///
    /// The command buffer must come from a pool of this queue's type and be
    /// executable. Both are checked and abort on violation.
    ///
    /// # Errors
    ///
    /// Native submission failures. Nothing changes state when one is returned.
    pub fn submit(
        &self,
        command_buffer: &mut CommandBuffer<'_, B>,
        wait: Option<&Semaphore<'_, B>>,
        signal: Option<&Semaphore<'_, B>>,
        fence: Option<&mut Fence<'_, B>>,
    ) -> RhiResult<()> {
        rhi_ensure!(
            command_buffer.queue_type() == self.queue_type,
            LogLayer::Rhi,
            "{} command buffer submitted to a {} queue",
            command_buffer.queue_type(),
            self.queue_type
        );
        rhi_ensure!(
            command_buffer.state() == CommandBufferState::Executable,
            LogLayer::Rhi,
            "command buffer submitted while {:?}",
            command_buffer.state()
        );
        if let Some(fence) = fence.as_deref() {
            fence.check_submittable();
        }

        let wait_op = wait.map(Semaphore::wait_op);
        let signal_op = signal.map(Semaphore::pending_signal_op);
        B::queue_submit(
            &self.device.ctx,
            &self.raw,
            QueueSubmission {
                command_list: command_buffer.raw(),
                wait: wait_op,
                signal: signal_op,
                fence: fence.as_deref().map(Fence::raw),
            },
        )?;

        let ticket = SubmissionTicket {
            timeline: self.timeline.clone(),
            serial: self.timeline.next_serial(),
        };
        if let Some(semaphore) = signal {
            semaphore.commit_signal();
        }
        if let Some(fence) = fence {
            fence.mark_submitted(ticket.clone());
        }
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "{} submission #{}: {} command(s)",
            self.queue_type,
            ticket.serial,
            command_buffer.stats().total()
        );
        command_buffer.mark_pending(ticket);
        Ok(())
    }

    /// Blocks until every submission on the queue finished.
    pub fn wait_idle(&self) {
        B::queue_wait_idle(&self.raw);
        self.timeline.retire_all();
    }
}

impl<B: RhiBackend> Device<B> {
    /// Returns the device's queue of a type.
    ///
    /// # Errors
    ///
    /// Fails if the adapter exposes no queue of that type.
    pub fn create_queue(&self, queue_type: QueueType) -> RhiResult<Queue<'_, B>> {
        let raw = B::create_queue(&self.ctx, queue_type)?;
        Ok(Queue {
            device: self,
            raw,
            queue_type,
            timeline: self.register_timeline(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retiring_a_serial_retires_everything_before_it() {
        let timeline = Rc::new(SubmissionTimeline::default());
        let tickets: Vec<SubmissionTicket> = (0..3)
            .map(|_| SubmissionTicket {
                timeline: timeline.clone(),
                serial: timeline.next_serial(),
            })
            .collect();
        assert!(tickets.iter().all(|t| !t.is_retired()));

        tickets[1].retire();
        assert!(tickets[0].is_retired());
        assert!(tickets[1].is_retired());
        assert!(!tickets[2].is_retired());

        // An older serial never moves the mark backwards.
        tickets[0].retire();
        assert!(tickets[1].is_retired());

        timeline.retire_all();
        assert!(tickets[2].is_retired());
    }
}
