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

mod common;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use common::{device, read_back, STAGING_BYTES};
use tessera_core::rhi::api::{
    BufferDescriptor, BufferTextureLayout, BufferUsage, Extent3D, Format, MemoryLocation,
    Origin3D, QueueType, ResourceState, TextureDescriptor, TextureRegion, TextureUsage,
};
use tessera_core::rhi::FenceState;
use tessera_infra::{D3d12Backend, VulkanBackend};
use tessera_lanes::{Subregion, Uploader};
use tessera_rhi::RhiBackend;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment.max(1)) * alignment.max(1)
}

fn buffer_uploads_reach_their_destination<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Transfer)?;
    let usage = BufferUsage::VERTEX | BufferUsage::COPY_DST | BufferUsage::COPY_SRC;
    let bytes = device.create_buffer(&BufferDescriptor::new("bytes", 256, usage))?;
    let vertices = device.create_buffer(&BufferDescriptor::new("vertices", 64, usage))?;
    let mut uploader = Uploader::new(&device, &queue)?;
    assert_eq!(uploader.staging_capacity(), STAGING_BYTES);

    let data: Vec<u8> = (0..=255).collect();
    let triangle = [
        Vertex {
            position: [0.0, 0.5, 0.0],
            uv: [0.5, 0.0],
        },
        Vertex {
            position: [-0.5, -0.5, 0.0],
            uv: [0.0, 1.0],
        },
        Vertex {
            position: [0.5, -0.5, 0.0],
            uv: [1.0, 1.0],
        },
    ];
    uploader.enqueue_buffer_data_upload(&bytes, 0, &data, ResourceState::Undefined);
    uploader.enqueue_buffer_upload_typed(&vertices, 0, &triangle, ResourceState::Undefined);
    assert_eq!(uploader.pending_uploads(), 2);
    assert_eq!(
        uploader.subregions(),
        &[
            Subregion {
                offset: 0,
                size: 256
            },
            Subregion {
                offset: 256,
                size: 60
            },
        ]
    );
    assert_eq!(uploader.staging_offset(), 316);
    assert_eq!(uploader.remaining_capacity(), STAGING_BYTES - 316);

    assert!(uploader.flush(true, None)?);
    assert_eq!(read_back(&device, &queue, &bytes, ResourceState::CopyDest, 256)?, data);
    let staged = read_back(&device, &queue, &vertices, ResourceState::CopyDest, 60)?;
    assert_eq!(staged, bytemuck::cast_slice::<Vertex, u8>(&triangle));

    uploader.reset();
    assert_eq!(uploader.staging_offset(), 0);
    assert_eq!(uploader.pending_uploads(), 0);
    assert!(!uploader.flush(true, None)?);
    Ok(())
}

fn fenced_flush_then_reset<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Graphics)?;
    let dst = device.create_buffer(&BufferDescriptor::new(
        "constants",
        128,
        BufferUsage::UNIFORM | BufferUsage::COPY_DST,
    ))?;
    let mut uploader = Uploader::new(&device, &queue)?;
    let mut fence = device.create_fence(false)?;

    for round in 0..3u8 {
        uploader.enqueue_buffer_data_upload(&dst, 0, &[round; 128], ResourceState::ConstantBuffer);
        assert!(uploader.flush(false, Some(&mut fence))?);
        fence.wait();
        assert_eq!(fence.state(), FenceState::Signalled);
        uploader.reset();
        fence.reset();
    }
    assert_eq!(uploader.staging_offset(), 0);
    Ok(())
}

fn repeated_destinations_transition_once<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Transfer)?;
    let usage = BufferUsage::UNIFORM | BufferUsage::COPY_DST | BufferUsage::COPY_SRC;
    let constants = device.create_buffer(&BufferDescriptor::new("constants", 64, usage))?;
    let lights = device.create_buffer(&BufferDescriptor::new("lights", 16, usage))?;
    let mut uploader = Uploader::new(&device, &queue)?;

    uploader.enqueue_buffer_data_upload(&constants, 0, &[1; 32], ResourceState::ConstantBuffer);
    uploader.enqueue_buffer_data_upload(&constants, 32, &[2; 32], ResourceState::ConstantBuffer);
    uploader.enqueue_buffer_data_upload(&lights, 0, &[3; 16], ResourceState::ConstantBuffer);
    assert_eq!(uploader.recording_stats().barriers, 2);
    assert_eq!(uploader.recording_stats().copies, 3);

    assert!(uploader.flush(true, None)?);
    let mut expected = vec![1u8; 32];
    expected.extend([2u8; 32]);
    assert_eq!(read_back(&device, &queue, &constants, ResourceState::CopyDest, 64)?, expected);
    assert_eq!(read_back(&device, &queue, &lights, ResourceState::CopyDest, 16)?, [3u8; 16]);

    // The readback left `constants` in COPY_SOURCE; the next batch starts from there.
    uploader.reset();
    uploader.enqueue_buffer_data_upload(&constants, 0, &[4; 8], ResourceState::CopySource);
    uploader.enqueue_buffer_data_upload(&constants, 8, &[5; 8], ResourceState::CopySource);
    assert_eq!(uploader.recording_stats().barriers, 1);
    assert!(uploader.flush(true, None)?);
    Ok(())
}

fn texture_rows_follow_the_backend_pitch<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Transfer)?;
    let texture = device.create_texture(&TextureDescriptor::new_2d(
        "albedo",
        3,
        2,
        Format::Rgba8Unorm,
        TextureUsage::SAMPLED | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
    ))?;
    let small = device.create_buffer(&BufferDescriptor::new("small", 10, BufferUsage::COPY_DST))?;
    let mut uploader = Uploader::new(&device, &queue)?;

    let limits = *device.limits();
    let pitch = align_up(12, u64::from(limits.texture_row_pitch_alignment));
    let texels: Vec<u8> = (0..24).collect();
    uploader.enqueue_buffer_data_upload(&small, 0, &[7; 10], ResourceState::Undefined);
    uploader.enqueue_texture_data_upload(&texture, 0, 0, &texels, ResourceState::Undefined);
    let region = uploader.subregions()[1];
    assert_eq!(region.offset, align_up(10, limits.texture_placement_alignment));
    assert_eq!(region.offset % limits.texture_placement_alignment, 0);
    assert_eq!(region.size, pitch + 12);
    assert!(uploader.flush(true, None)?);

    let readback = device.create_buffer(
        &BufferDescriptor::new("texture readback", pitch + 12, BufferUsage::COPY_DST)
            .with_location(MemoryLocation::GpuToCpu),
    )?;
    let pool = device.create_command_pool(QueueType::Transfer)?;
    let mut commands = pool.allocate()?;
    commands.begin();
    commands.transition_texture(&texture, ResourceState::CopyDest, ResourceState::CopySource);
    commands.transition_buffer(&readback, ResourceState::Undefined, ResourceState::CopyDest);
    commands.copy_texture_to_buffer(
        &texture,
        &TextureRegion {
            mip_level: 0,
            array_layer: 0,
            origin: Origin3D::ZERO,
            extent: Extent3D::new_2d(3, 2),
        },
        &readback,
        &BufferTextureLayout {
            offset: 0,
            bytes_per_row: pitch as u32,
            rows_per_image: 2,
        },
    );
    commands.end()?;
    queue.submit(&mut commands, None, None, None)?;
    queue.wait_idle();

    let mut rows = vec![0u8; (pitch + 12) as usize];
    device.read_buffer(&readback, 0, &mut rows);
    assert_eq!(&rows[..12], &texels[..12]);
    assert_eq!(&rows[pitch as usize..], &texels[12..]);
    Ok(())
}

#[test]
fn vulkan_buffer_uploads() -> Result<()> {
    buffer_uploads_reach_their_destination::<VulkanBackend>()
}

#[test]
fn d3d12_buffer_uploads() -> Result<()> {
    buffer_uploads_reach_their_destination::<D3d12Backend>()
}

#[test]
fn vulkan_fenced_flushes() -> Result<()> {
    fenced_flush_then_reset::<VulkanBackend>()
}

#[test]
fn d3d12_fenced_flushes() -> Result<()> {
    fenced_flush_then_reset::<D3d12Backend>()
}

#[test]
fn vulkan_repeated_destinations() -> Result<()> {
    repeated_destinations_transition_once::<VulkanBackend>()
}

#[test]
fn d3d12_repeated_destinations() -> Result<()> {
    repeated_destinations_transition_once::<D3d12Backend>()
}

#[test]
fn vulkan_texture_upload() -> Result<()> {
    texture_rows_follow_the_backend_pitch::<VulkanBackend>()
}

#[test]
fn d3d12_texture_upload() -> Result<()> {
    texture_rows_follow_the_backend_pitch::<D3d12Backend>()
}

#[test]
fn staging_may_be_filled_exactly() -> Result<()> {
    let device = device::<VulkanBackend>()?;
    let queue = device.create_queue(QueueType::Transfer)?;
    let dst = device.create_buffer(&BufferDescriptor::new("dst", 1024, BufferUsage::COPY_DST))?;
    let mut uploader = Uploader::with_capacity(&device, &queue, 1024)?;
    uploader.enqueue_buffer_data_upload(&dst, 0, &[1; 512], ResourceState::Undefined);
    uploader.enqueue_buffer_data_upload(&dst, 512, &[2; 512], ResourceState::CopyDest);
    assert_eq!(uploader.remaining_capacity(), 0);
    assert!(uploader.flush(true, None)?);
    Ok(())
}

#[test]
#[should_panic(expected = "overflow the 1024-byte staging buffer")]
fn one_byte_past_the_staging_capacity_aborts() {
    let device = device::<VulkanBackend>().unwrap();
    let queue = device.create_queue(QueueType::Transfer).unwrap();
    let dst = device
        .create_buffer(&BufferDescriptor::new("dst", 2048, BufferUsage::COPY_DST))
        .unwrap();
    let mut uploader = Uploader::with_capacity(&device, &queue, 1024).unwrap();
    uploader.enqueue_buffer_data_upload(&dst, 0, &[1; 1024], ResourceState::Undefined);
    uploader.enqueue_buffer_data_upload(&dst, 1024, &[2; 1], ResourceState::CopyDest);
}

#[test]
#[should_panic(expected = "in flight")]
fn resetting_before_the_fence_is_observed_aborts() {
    let device = device::<D3d12Backend>().unwrap();
    let queue = device.create_queue(QueueType::Transfer).unwrap();
    let dst = device
        .create_buffer(&BufferDescriptor::new("dst", 64, BufferUsage::COPY_DST))
        .unwrap();
    let mut uploader = Uploader::new(&device, &queue).unwrap();
    let mut fence = device.create_fence(false).unwrap();
    uploader.enqueue_buffer_data_upload(&dst, 0, &[0; 64], ResourceState::Undefined);
    uploader.flush(false, Some(&mut fence)).unwrap();
    uploader.reset();
}

#[test]
#[should_panic(expected = "staged after a flush")]
fn staging_after_a_flush_aborts_until_reset() {
    let device = device::<VulkanBackend>().unwrap();
    let queue = device.create_queue(QueueType::Transfer).unwrap();
    let dst = device
        .create_buffer(&BufferDescriptor::new("dst", 64, BufferUsage::COPY_DST))
        .unwrap();
    let mut uploader = Uploader::new(&device, &queue).unwrap();
    uploader.enqueue_buffer_data_upload(&dst, 0, &[0; 32], ResourceState::Undefined);
    uploader.flush(true, None).unwrap();
    uploader.enqueue_buffer_data_upload(&dst, 32, &[0; 32], ResourceState::CopyDest);
}

#[test]
#[should_panic(expected = "lacks COPY_DST")]
fn destinations_need_copy_dst_usage() {
    let device = device::<VulkanBackend>().unwrap();
    let queue = device.create_queue(QueueType::Transfer).unwrap();
    let dst = device
        .create_buffer(&BufferDescriptor::new("vertices", 64, BufferUsage::VERTEX))
        .unwrap();
    let mut uploader = Uploader::new(&device, &queue).unwrap();
    uploader.enqueue_buffer_data_upload(&dst, 0, &[0; 64], ResourceState::Undefined);
}

#[test]
fn a_zero_capacity_staging_buffer_is_rejected() -> Result<()> {
    let device = device::<VulkanBackend>()?;
    let queue = device.create_queue(QueueType::Transfer)?;
    assert!(Uploader::with_capacity(&device, &queue, 0).is_err());
    Ok(())
}
