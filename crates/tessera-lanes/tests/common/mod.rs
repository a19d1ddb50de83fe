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

use anyhow::Result;
use tessera_core::rhi::api::{
    BufferDescriptor, BufferUsage, DeviceDescriptor, MemoryLocation, ResourceState,
};
use tessera_core::RhiConfig;
use tessera_rhi::{Buffer, Device, Queue, RhiBackend};

pub const STAGING_BYTES: u64 = 4096;

pub fn device<B: RhiBackend>() -> Result<Device<B>> {
    let config = RhiConfig {
        staging_buffer_size: STAGING_BYTES,
        max_bindless_resources: 64,
        max_bindless_samplers: 8,
        max_attachment_views: 16,
        ..RhiConfig::default()
    };
    Ok(Device::new(&DeviceDescriptor {
        config,
        ..DeviceDescriptor::default()
    })?)
}

/// Copies the first `size` bytes of `src`, currently in `state`, to the host.
#[allow(dead_code)]
pub fn read_back<B: RhiBackend>(
    device: &Device<B>,
    queue: &Queue<'_, B>,
    src: &Buffer<'_, B>,
    state: ResourceState,
    size: u64,
) -> Result<Vec<u8>> {
    let readback = device.create_buffer(
        &BufferDescriptor::new("readback", size, BufferUsage::COPY_DST)
            .with_location(MemoryLocation::GpuToCpu),
    )?;
    let pool = device.create_command_pool(queue.queue_type())?;
    let mut commands = pool.allocate()?;
    commands.begin();
    commands.transition_buffer(src, state, ResourceState::CopySource);
    commands.transition_buffer(&readback, ResourceState::Undefined, ResourceState::CopyDest);
    commands.copy_buffer(src, 0, &readback, 0, size);
    commands.end()?;

    let mut fence = device.create_fence(false)?;
    queue.submit(&mut commands, None, None, Some(&mut fence))?;
    fence.wait();
    let mut out = vec![0u8; size as usize];
    device.read_buffer(&readback, 0, &mut out);
    Ok(out)
}
