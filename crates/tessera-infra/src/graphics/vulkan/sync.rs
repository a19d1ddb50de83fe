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

//! Queues, fences and timeline semaphores.

use super::command::VkCommandBuffer;
use super::context::VulkanContext;
use super::conversions::queue_family;
use super::VulkanBackend;
use crate::graphics::software::{HostEvent, HostJob, HostQueue, HostTimeline, SyncSignal, SyncWait};
use ash::vk;
use std::sync::Arc;
use tessera_core::rhi::api::QueueType;
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi::{FenceSignal, QueueSubmission};

/// A `VkFence`.
#[derive(Debug)]
pub struct VkFence {
    /// The fence handle.
    pub handle: vk::Fence,
    pub(crate) event: Arc<HostEvent>,
}

impl VkFence {
    pub(crate) fn new(ctx: &VulkanContext, signalled: bool) -> Self {
        Self {
            handle: ctx.next_handle(),
            event: HostEvent::new(signalled),
        }
    }
}

impl FenceSignal for VkFence {
    /// `vkWaitForFences` with an infinite timeout.
    fn block_until_signalled(&self) {
        self.event.wait();
    }

    /// `vkGetFenceStatus`.
    fn is_signalled(&self) -> bool {
        self.event.is_set()
    }

    /// `vkResetFences`.
    fn rearm(&self) {
        self.event.reset();
    }
}

/// A `VkSemaphore` of type `VK_SEMAPHORE_TYPE_TIMELINE`.
#[derive(Debug)]
pub struct VkSemaphore {
    /// The semaphore handle.
    pub handle: vk::Semaphore,
    /// Always `TIMELINE`.
    pub semaphore_type: vk::SemaphoreType,
    pub(crate) timeline: Arc<HostTimeline>,
}

impl VkSemaphore {
    pub(crate) fn new(ctx: &VulkanContext) -> Self {
        Self {
            handle: ctx.next_handle(),
            semaphore_type: vk::SemaphoreType::TIMELINE,
            timeline: HostTimeline::new(0),
        }
    }

    /// `vkGetSemaphoreCounterValue`.
    pub fn counter_value(&self) -> u64 {
        self.timeline.value()
    }
}

/// A `VkQueue` retrieved from its family.
#[derive(Debug, Clone)]
pub struct VkQueue {
    /// Queue family index.
    pub queue_family_index: u32,
    /// Queue type of the family.
    pub queue_type: QueueType,
    pub(crate) host: Arc<HostQueue>,
}

impl VkQueue {
    pub(crate) fn new(ctx: &VulkanContext, queue_type: QueueType) -> Self {
        Self {
            queue_family_index: queue_family(queue_type),
            queue_type,
            host: ctx.device.queue(queue_type),
        }
    }
}

/// `vkQueueSubmit2` with at most one wait and one signal semaphore.
pub(crate) fn submit(
    queue: &VkQueue,
    submission: QueueSubmission<'_, VulkanBackend>,
) -> RhiResult<()> {
    let list: &VkCommandBuffer = submission.command_list;
    if list.queue_family_index != queue.queue_family_index {
        return Err(RhiError::Backend {
            call: "vkQueueSubmit2",
            code: vk::Result::ERROR_UNKNOWN.as_raw(),
        });
    }
    let waits = submission
        .wait
        .map(|op| SyncWait::Timeline(op.semaphore.timeline.clone(), op.value))
        .into_iter()
        .collect();
    let mut signals: Vec<SyncSignal> = submission
        .signal
        .map(|op| SyncSignal::Timeline(op.semaphore.timeline.clone(), op.value))
        .into_iter()
        .collect();
    if let Some(fence) = submission.fence {
        signals.push(SyncSignal::Event(fence.event.clone()));
    }
    queue.host.submit(HostJob {
        waits,
        ops: list.lower(),
        signals,
    })
}
