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

use anyhow::{anyhow, Result};
use tessera_core::rhi::api::{
    BufferDescriptor, BufferUsage, ContextDescriptor, MemoryLocation, QueueType, ResourceState,
};
use tessera_core::rhi::{BarrierResource, FenceSignal, QueueSubmission, RhiBackend, SemaphoreOp};
use tessera_infra::graphics::d3d12::conversions::{state_from_d3d12, IntoD3d12};
use tessera_infra::graphics::d3d12::native::D3D12_RESOURCE_STATES;
use tessera_infra::graphics::vulkan::conversions::{state_from_vk, IntoVk, VkStateInfo};
use tessera_infra::{D3d12Backend, VulkanBackend};

fn context<B: RhiBackend>() -> Result<B::Context> {
    let adapter = B::enumerate_adapters()
        .into_iter()
        .last()
        .ok_or_else(|| anyhow!("no adapter"))?;
    let ctx = B::create_context(
        &adapter,
        &ContextDescriptor {
            features: adapter.features,
            max_bindless_resources: 64,
            max_bindless_samplers: 8,
            max_attachment_views: 8,
            enable_validation: false,
        },
    )?;
    Ok(ctx)
}

fn buffer_copy_reaches_readback<B: RhiBackend>() -> Result<()> {
    let ctx = context::<B>()?;
    let data: Vec<u8> = (0..64).collect();
    let upload = B::create_buffer(
        &ctx,
        &BufferDescriptor::new("upload", 64, BufferUsage::COPY_SRC)
            .with_location(MemoryLocation::CpuToGpu),
    )?;
    let device_local = B::create_buffer(
        &ctx,
        &BufferDescriptor::new("device", 64, BufferUsage::COPY_SRC | BufferUsage::COPY_DST),
    )?;
    let readback = B::create_buffer(
        &ctx,
        &BufferDescriptor::new("readback", 64, BufferUsage::COPY_DST)
            .with_location(MemoryLocation::GpuToCpu),
    )?;
    B::write_buffer(&ctx, &upload, 0, &data);

    let pool = B::create_command_pool(&ctx, QueueType::Transfer)?;
    let mut list = B::allocate_command_list(&ctx, &pool)?;
    B::begin_command_list(&mut list);
    B::cmd_transition(
        &mut list,
        BarrierResource::Buffer(&device_local),
        ResourceState::Undefined,
        ResourceState::CopyDest,
    );
    B::cmd_copy_buffer(&mut list, &upload, 0, &device_local, 0, 64);
    B::cmd_transition(
        &mut list,
        BarrierResource::Buffer(&device_local),
        ResourceState::CopyDest,
        ResourceState::CopySource,
    );
    B::cmd_copy_buffer(&mut list, &device_local, 16, &readback, 0, 48);
    B::end_command_list(&mut list)?;

    let queue = B::create_queue(&ctx, QueueType::Transfer)?;
    let fence = B::create_fence(&ctx, false)?;
    assert!(!fence.is_signalled());
    B::queue_submit(
        &ctx,
        &queue,
        QueueSubmission {
            command_list: &list,
            wait: None,
            signal: None,
            fence: Some(&fence),
        },
    )?;
    fence.block_until_signalled();
    assert!(fence.is_signalled());

    let mut out = vec![0u8; 48];
    B::read_buffer(&ctx, &readback, 0, &mut out);
    assert_eq!(out, data[16..]);

    B::free_command_list(&ctx, list);
    B::destroy_command_pool(&ctx, pool);
    B::destroy_fence(&ctx, fence);
    for buffer in [upload, device_local, readback] {
        B::destroy_buffer(&ctx, buffer);
    }
    Ok(())
}

fn semaphores_order_two_queues<B: RhiBackend>() -> Result<()> {
    let ctx = context::<B>()?;
    let transfer = B::create_queue(&ctx, QueueType::Transfer)?;
    let graphics = B::create_queue(&ctx, QueueType::Graphics)?;
    let semaphore = B::create_semaphore(&ctx)?;
    let fence = B::create_fence(&ctx, false)?;

    let transfer_pool = B::create_command_pool(&ctx, QueueType::Transfer)?;
    let graphics_pool = B::create_command_pool(&ctx, QueueType::Graphics)?;
    let mut first = B::allocate_command_list(&ctx, &transfer_pool)?;
    let mut second = B::allocate_command_list(&ctx, &graphics_pool)?;
    for list in [&mut first, &mut second] {
        B::begin_command_list(list);
        B::end_command_list(list)?;
    }

    // The graphics submission goes first and must wait for the transfer one.
    B::queue_submit(
        &ctx,
        &graphics,
        QueueSubmission {
            command_list: &second,
            wait: Some(SemaphoreOp {
                semaphore: &semaphore,
                value: 1,
            }),
            signal: None,
            fence: Some(&fence),
        },
    )?;
    assert!(!fence.is_signalled());
    B::queue_submit(
        &ctx,
        &transfer,
        QueueSubmission {
            command_list: &first,
            wait: None,
            signal: Some(SemaphoreOp {
                semaphore: &semaphore,
                value: 1,
            }),
            fence: None,
        },
    )?;
    fence.block_until_signalled();
    B::wait_idle(&ctx);
    Ok(())
}

#[test]
fn vulkan_buffer_copy() -> Result<()> {
    buffer_copy_reaches_readback::<VulkanBackend>()
}

#[test]
fn d3d12_buffer_copy() -> Result<()> {
    buffer_copy_reaches_readback::<D3d12Backend>()
}

#[test]
fn vulkan_cross_queue_wait() -> Result<()> {
    semaphores_order_two_queues::<VulkanBackend>()
}

#[test]
fn d3d12_cross_queue_wait() -> Result<()> {
    semaphores_order_two_queues::<D3d12Backend>()
}

#[test]
fn native_barriers_preserve_the_access_category() {
    for state in ResourceState::ALL {
        let vk: VkStateInfo = state.into_vk();
        let back = state_from_vk(vk.access, vk.layout);
        assert_eq!(back.category(), state.category(), "vulkan {state}");

        let dx: D3D12_RESOURCE_STATES = state.into_d3d12();
        let back = state_from_d3d12(dx);
        assert_eq!(back.category(), state.category(), "d3d12 {state}");
    }
}

#[test]
fn mismatched_queue_types_are_rejected() -> Result<()> {
    let ctx = context::<D3d12Backend>()?;
    let pool = D3d12Backend::create_command_pool(&ctx, QueueType::Compute)?;
    let mut list = D3d12Backend::allocate_command_list(&ctx, &pool)?;
    D3d12Backend::begin_command_list(&mut list);
    D3d12Backend::end_command_list(&mut list)?;
    let queue = D3d12Backend::create_queue(&ctx, QueueType::Graphics)?;
    let result = D3d12Backend::queue_submit(
        &ctx,
        &queue,
        QueueSubmission {
            command_list: &list,
            wait: None,
            signal: None,
            fence: None,
        },
    );
    assert!(result.is_err());
    Ok(())
}
