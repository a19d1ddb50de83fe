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
use std::fs;
use tessera_core::rhi::api::{
    BufferDescriptor, BufferUsage, BufferViewDescriptor, BufferViewKind, DeviceDescriptor,
    DeviceFeatures, Extent3D, Format, LoadOp, PresentMode, QueueType, ResourceState, ShaderStage,
    SurfaceTarget, SwapchainDescriptor,
};
use tessera_core::rhi::{FenceState, ShaderError};
use tessera_core::RhiConfig;
use tessera_infra::{D3d12Backend, VulkanBackend};
use tessera_rhi::{Device, FrameRing, RenderingInfo, RhiBackend, RhiError};

fn device<B: RhiBackend>() -> Result<Device<B>> {
    let config = RhiConfig {
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

fn uniform_views_take_unique_reusable_slots<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let buffer =
        device.create_buffer(&BufferDescriptor::new("constants", 512, BufferUsage::UNIFORM))?;
    let slots = device.available_resource_slots();
    let view_at = |offset| BufferViewDescriptor {
        label: None,
        kind: BufferViewKind::Uniform,
        offset,
        size: Some(256),
    };

    let first = device.create_buffer_view(&buffer, &view_at(0));
    let second = device.create_buffer_view(&buffer, &view_at(256));
    assert_ne!(first.index(), second.index());
    assert!(first.index().0 < 64 && second.index().0 < 64);
    assert_eq!(first.size(), 256);
    assert_eq!(device.available_resource_slots(), slots - 2);

    drop(first);
    assert_eq!(device.available_resource_slots(), slots - 1);
    let third = device.create_buffer_view(&buffer, &view_at(0));
    assert_ne!(third.index(), second.index());
    drop((second, third));
    assert_eq!(device.available_resource_slots(), slots);
    Ok(())
}

fn fence_follows_its_submission<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Graphics)?;
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = pool.allocate()?;
    let mut fence = device.create_fence(false)?;
    assert_eq!(fence.state(), FenceState::Unsignalled);

    commands.begin();
    commands.end()?;
    queue.submit(&mut commands, None, None, Some(&mut fence))?;
    assert_eq!(fence.state(), FenceState::InFlight);

    fence.wait();
    assert_eq!(fence.state(), FenceState::Signalled);
    assert!(!commands.is_pending());

    fence.reset();
    assert_eq!(fence.state(), FenceState::Unsignalled);

    // The retired buffer records again.
    commands.begin();
    commands.end()?;
    queue.submit(&mut commands, None, None, Some(&mut fence))?;
    queue.wait_idle();
    assert!(!commands.is_pending());
    assert!(fence.poll());
    Ok(())
}

fn missing_features_are_reported<B: RhiBackend>() {
    let result = Device::<B>::new(&DeviceDescriptor {
        extra_features: DeviceFeatures::TEXTURE_COMPRESSION_BC,
        ..DeviceDescriptor::default()
    });
    match result {
        Err(RhiError::FeatureNotSupported { required, .. }) => {
            assert!(required.contains(DeviceFeatures::TEXTURE_COMPRESSION_BC));
        }
        other => panic!("expected FeatureNotSupported, got {:?}", other.map(|_| ())),
    }
    // The default log configuration escalates ERROR messages; the mismatch
    // still comes back as a value.
    assert!(tessera_core::logging::errors_escalate());
}

fn shaders_load_by_stage_suffix<B: RhiBackend>(bytecode: &[u8]) -> Result<()> {
    let device = device::<B>()?;
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("triangle");
    fs::write(
        dir.path().join(format!("triangle.vert.{}", B::SHADER_EXTENSION)),
        bytecode,
    )?;

    let shader = device.load_shader(&base, ShaderStage::Vertex)?;
    assert_eq!(shader.stage(), ShaderStage::Vertex);

    match device.load_shader(&base, ShaderStage::Fragment) {
        Err(RhiError::Shader(ShaderError::LoadError { path, .. })) => {
            assert!(path.ends_with(&format!("triangle.frag.{}", B::SHADER_EXTENSION)));
        }
        other => panic!("expected LoadError, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

fn headless_swapchain_presents_a_cleared_frame<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let extent = Extent3D::new_2d(64, 48);
    let surface = device.create_surface(&SurfaceTarget::Headless { extent })?;
    let queue = device.create_queue(QueueType::Graphics)?;
    let desc = SwapchainDescriptor {
        extent,
        format: Format::Bgra8Unorm,
        image_count: 2,
        present_mode: PresentMode::Fifo,
    };

    let too_many = SwapchainDescriptor {
        image_count: 4,
        ..desc
    };
    assert!(matches!(
        device.create_swapchain(&surface, &queue, &too_many),
        Err(RhiError::InvalidDescriptor(_))
    ));

    let mut swapchain = device.create_swapchain(&surface, &queue, &desc)?;
    assert_eq!(swapchain.image_count(), 2);
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = pool.allocate()?;
    let mut fence = device.create_fence(false)?;

    let index = swapchain.acquire_next_image(None)?;
    assert_eq!(swapchain.current_image(), Some(index));
    let back_buffer = swapchain.back_buffer(index);
    commands.begin();
    commands.transition_texture(back_buffer, ResourceState::Undefined, ResourceState::RenderTarget);
    commands.begin_rendering(&RenderingInfo::single(
        swapchain.back_buffer_view(index),
        LoadOp::Clear([0.1, 0.2, 0.3, 1.0]),
    ));
    commands.end_rendering();
    commands.transition_texture(back_buffer, ResourceState::RenderTarget, ResourceState::Present);
    commands.end()?;
    assert_eq!(commands.stats().render_passes, 1);
    assert_eq!(commands.stats().barriers, 2);

    queue.submit(&mut commands, None, None, Some(&mut fence))?;
    fence.wait();
    swapchain.present(&queue, None)?;
    assert_eq!(swapchain.current_image(), None);

    swapchain.resize(Extent3D::new_2d(32, 32))?;
    assert_eq!(swapchain.extent(), Extent3D::new_2d(32, 32));
    assert_eq!(swapchain.back_buffer_view(1).extent(), Extent3D::new_2d(32, 32));
    Ok(())
}

fn frame_ring_cycles_fences<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let queue = device.create_queue(QueueType::Graphics)?;
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let frames = device.config().frames_in_flight;
    let mut ring = FrameRing::new(frames, |_| -> Result<_> {
        Ok((device.create_fence(true)?, pool.allocate()?))
    })?;

    for frame in 0..5u64 {
        assert_eq!(ring.slot_index(), (frame % u64::from(frames)) as usize);
        let (fence, commands) = ring.current_mut();
        fence.wait();
        assert!(!commands.is_pending());
        fence.reset();

        commands.begin();
        commands.end()?;
        queue.submit(commands, None, None, Some(&mut *fence))?;
        assert_eq!(fence.state(), FenceState::InFlight);
        ring.advance();
    }
    assert_eq!(ring.frame_index(), 5);
    assert_eq!(ring.len(), frames as usize);

    queue.wait_idle();
    for (fence, _) in ring.iter_mut() {
        assert!(fence.poll());
    }
    Ok(())
}

fn default_root_signature_follows_the_config<B: RhiBackend>() -> Result<()> {
    let device = Device::<B>::new(&DeviceDescriptor {
        config: RhiConfig {
            max_bindless_resources: 64,
            max_bindless_samplers: 8,
            push_constant_bytes: 190,
            ..RhiConfig::default()
        },
        ..DeviceDescriptor::default()
    })?;
    let root = device.create_default_root_signature()?;
    assert_eq!(root.push_constant_bytes(), 192);
    assert_eq!(root.layout().max_bindless_resources, 64);

    let small = self::device::<B>()?;
    assert_eq!(small.create_default_root_signature()?.push_constant_bytes(), 128);
    Ok(())
}

fn dropped_queues_stop_being_tracked<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let graphics = device.create_queue(QueueType::Graphics)?;
    for _ in 0..3 {
        let transfer = device.create_queue(QueueType::Transfer)?;
        drop(transfer);
    }
    assert!(device.tracked_timelines() <= 2);
    device.wait_idle();
    assert_eq!(device.tracked_timelines(), 1);
    drop(graphics);
    device.wait_idle();
    assert_eq!(device.tracked_timelines(), 0);
    Ok(())
}

fn spirv_module() -> Vec<u8> {
    [0x0723_0203u32, 0x0001_0500, 0, 8, 0]
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect()
}

fn dxbc_container() -> Vec<u8> {
    let mut bytes = vec![0u8; 48];
    bytes[..4].copy_from_slice(b"DXBC");
    bytes[24..28].copy_from_slice(&48u32.to_le_bytes());
    bytes
}

#[test]
fn vulkan_uniform_views() -> Result<()> {
    uniform_views_take_unique_reusable_slots::<VulkanBackend>()
}

#[test]
fn d3d12_uniform_views() -> Result<()> {
    uniform_views_take_unique_reusable_slots::<D3d12Backend>()
}

#[test]
fn vulkan_fence_cycle() -> Result<()> {
    fence_follows_its_submission::<VulkanBackend>()
}

#[test]
fn d3d12_fence_cycle() -> Result<()> {
    fence_follows_its_submission::<D3d12Backend>()
}

#[test]
#[should_panic(expected = "would never return")]
fn waiting_on_a_reset_fence_aborts() {
    let device = device::<VulkanBackend>().unwrap();
    let mut fence = device.create_fence(true).unwrap();
    fence.reset();
    fence.wait();
}

#[test]
#[should_panic(expected = "only a SIGNALLED fence can be reset")]
fn resetting_an_unsubmitted_fence_aborts() {
    let device = device::<D3d12Backend>().unwrap();
    let mut fence = device.create_fence(false).unwrap();
    fence.reset();
}

#[test]
fn vulkan_missing_features() {
    missing_features_are_reported::<VulkanBackend>();
}

#[test]
fn d3d12_missing_features() {
    missing_features_are_reported::<D3d12Backend>();
}

#[test]
fn vulkan_default_root_signature() -> Result<()> {
    default_root_signature_follows_the_config::<VulkanBackend>()
}

#[test]
fn d3d12_default_root_signature() -> Result<()> {
    default_root_signature_follows_the_config::<D3d12Backend>()
}

#[test]
fn vulkan_dropped_queues() -> Result<()> {
    dropped_queues_stop_being_tracked::<VulkanBackend>()
}

#[test]
fn d3d12_dropped_queues() -> Result<()> {
    dropped_queues_stop_being_tracked::<D3d12Backend>()
}

#[test]
fn vulkan_loads_spirv() -> Result<()> {
    shaders_load_by_stage_suffix::<VulkanBackend>(&spirv_module())
}

#[test]
fn d3d12_loads_dxil() -> Result<()> {
    shaders_load_by_stage_suffix::<D3d12Backend>(&dxbc_container())
}

#[test]
fn vulkan_headless_swapchain() -> Result<()> {
    headless_swapchain_presents_a_cleared_frame::<VulkanBackend>()
}

#[test]
fn d3d12_headless_swapchain() -> Result<()> {
    headless_swapchain_presents_a_cleared_frame::<D3d12Backend>()
}

#[test]
fn vulkan_frame_ring() -> Result<()> {
    frame_ring_cycles_fences::<VulkanBackend>()
}

#[test]
#[should_panic(expected = "cannot be mapped")]
fn mapping_device_local_memory_aborts() {
    let device = device::<VulkanBackend>().unwrap();
    let buffer = device
        .create_buffer(&BufferDescriptor::new("vertices", 64, BufferUsage::VERTEX))
        .unwrap();
    device.write_buffer(&buffer, 0, &[0; 16]);
}
