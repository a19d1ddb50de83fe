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

//! Command queues and `ID3D12Fence` objects.
//!
//! D3D12 has a single fence type with a monotonically increasing value. The
//! CPU-side fence keeps the value it expects next; the GPU-side semaphore is
//! the same object driven by explicit wait and signal values.

use super::command::D3d12GraphicsCommandList;
use super::context::D3d12Context;
use super::conversions::IntoD3d12;
use super::native::*;
use super::D3d12Backend;
use crate::graphics::software::{HostJob, HostQueue, HostTimeline, SyncSignal, SyncWait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::rhi::api::QueueType;
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi::{FenceSignal, QueueSubmission};

/// An `ID3D12Fence` paired with the value the CPU waits for.
#[derive(Debug)]
pub struct D3d12Fence {
    /// Object identity.
    pub id: u64,
    pub(crate) timeline: Arc<HostTimeline>,
    expected: AtomicU64,
}

impl D3d12Fence {
    pub(crate) fn new(ctx: &D3d12Context, signalled: bool) -> Self {
        Self {
            id: ctx.next_object(),
            timeline: HostTimeline::new(0),
            expected: AtomicU64::new(u64::from(!signalled)),
        }
    }

    /// The value the next submission signals.
    pub fn expected_value(&self) -> u64 {
        self.expected.load(Ordering::Acquire)
    }

    /// `ID3D12Fence::GetCompletedValue`.
    pub fn completed_value(&self) -> u64 {
        self.timeline.value()
    }
}

impl FenceSignal for D3d12Fence {
    /// `SetEventOnCompletion` followed by `WaitForSingleObject`.
    fn block_until_signalled(&self) {
        self.timeline.wait_for(self.expected_value());
    }

    fn is_signalled(&self) -> bool {
        self.completed_value() >= self.expected_value()
    }

    fn rearm(&self) {
        self.expected.fetch_add(1, Ordering::AcqRel);
    }
}

/// An `ID3D12Fence` used for queue-to-queue waits.
#[derive(Debug)]
pub struct D3d12Semaphore {
    /// Object identity.
    pub id: u64,
    pub(crate) timeline: Arc<HostTimeline>,
}

impl D3d12Semaphore {
    pub(crate) fn new(ctx: &D3d12Context) -> Self {
        Self {
            id: ctx.next_object(),
            timeline: HostTimeline::new(0),
        }
    }

    /// `ID3D12Fence::GetCompletedValue`.
    pub fn completed_value(&self) -> u64 {
        self.timeline.value()
    }
}

/// An `ID3D12CommandQueue`.
#[derive(Debug, Clone)]
pub struct D3d12Queue {
    /// `D3D12_COMMAND_QUEUE_DESC::Type`.
    pub list_type: D3D12_COMMAND_LIST_TYPE,
    /// The matching queue type.
    pub queue_type: QueueType,
    pub(crate) host: Arc<HostQueue>,
}

impl D3d12Queue {
    pub(crate) fn new(ctx: &D3d12Context, queue_type: QueueType) -> Self {
        Self {
            list_type: queue_type.into_d3d12(),
            queue_type,
            host: ctx.device.queue(queue_type),
        }
    }
}

/// `Wait`, `ExecuteCommandLists` and `Signal` on one queue.
pub(crate) fn submit(
    queue: &D3d12Queue,
    submission: QueueSubmission<'_, D3d12Backend>,
) -> RhiResult<()> {
    let list: &D3d12GraphicsCommandList = submission.command_list;
    if list.list_type != queue.list_type {
        return Err(RhiError::Backend {
            call: "ID3D12CommandQueue::ExecuteCommandLists",
            code: E_INVALIDARG.0,
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
        signals.push(SyncSignal::Timeline(fence.timeline.clone(), fence.expected_value()));
    }
    queue.host.submit(HostJob {
        waits,
        ops: list.lower(),
        signals,
    })
}
