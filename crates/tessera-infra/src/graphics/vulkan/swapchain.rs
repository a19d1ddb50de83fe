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

use super::context::{create_image, VkImage, VulkanContext};
use super::conversions::IntoVk;
use super::sync::{VkQueue, VkSemaphore};
use crate::graphics::software::{HostJob, HostOp, HostQueue, SyncWait};
use ash::vk;
use raw_window_handle::RawWindowHandle;
use std::sync::Arc;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    Extent3D, Format, PresentMode, SurfaceCapabilities, SurfaceTarget, SwapchainDescriptor,
    TextureDescriptor, TextureUsage,
};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi::SemaphoreOp;
use tessera_core::rhi_log;

/// A `VkSurfaceKHR`.
#[derive(Debug)]
pub struct VkSurface {
    /// The surface handle.
    pub handle: vk::SurfaceKHR,
    /// The platform extension the surface was created through.
    pub extension: &'static str,
    /// Current extent of the target.
    pub extent: Extent3D,
}

pub(crate) fn create_surface(ctx: &VulkanContext, target: &SurfaceTarget) -> RhiResult<VkSurface> {
    let extension = match target {
        SurfaceTarget::Headless { .. } => "VK_EXT_headless_surface",
        SurfaceTarget::Window { window, .. } => match window {
            RawWindowHandle::Win32(_) => "VK_KHR_win32_surface",
            RawWindowHandle::Xlib(_) => "VK_KHR_xlib_surface",
            RawWindowHandle::Xcb(_) => "VK_KHR_xcb_surface",
            RawWindowHandle::Wayland(_) => "VK_KHR_wayland_surface",
            RawWindowHandle::AppKit(_) | RawWindowHandle::UiKit(_) => "VK_EXT_metal_surface",
            RawWindowHandle::AndroidNdk(_) => "VK_KHR_android_surface",
            other => {
                return Err(RhiError::Surface(format!(
                    "no Vulkan surface extension for {other:?}"
                )))
            }
        },
    };
    if !ctx.device.adapter().supports_present {
        return Err(RhiError::Surface(format!(
            "'{}' cannot present",
            ctx.device.adapter().name
        )));
    }
    Ok(VkSurface {
        handle: ctx.next_handle(),
        extension,
        extent: target.extent(),
    })
}

pub(crate) fn surface_capabilities() -> SurfaceCapabilities {
    SurfaceCapabilities {
        formats: vec![
            Format::Bgra8UnormSrgb,
            Format::Bgra8Unorm,
            Format::Rgba8UnormSrgb,
            Format::Rgba8Unorm,
        ],
        present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate],
        min_image_count: SwapchainDescriptor::MIN_IMAGES,
        max_image_count: SwapchainDescriptor::MAX_IMAGES,
    }
}

/// A `VkSwapchainKHR` and its images.
#[derive(Debug)]
pub struct VkSwapchain {
    /// The swapchain handle.
    pub handle: vk::SwapchainKHR,
    /// `imageFormat`.
    pub format: Format,
    /// `presentMode`.
    pub present_mode: vk::PresentModeKHR,
    /// `imageExtent`.
    pub extent: Extent3D,
    pub(crate) images: Vec<VkImage>,
    pub(crate) next_image: u32,
    pub(crate) queue: Arc<HostQueue>,
}

fn back_buffers(
    ctx: &VulkanContext,
    format: Format,
    extent: Extent3D,
    count: u32,
) -> RhiResult<Vec<VkImage>> {
    (0..count)
        .map(|i| {
            let desc = TextureDescriptor::new_2d(
                format!("swapchain image {i}"),
                extent.width,
                extent.height,
                format,
                TextureUsage::RENDER_TARGET | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
            );
            create_image(ctx, &desc)
        })
        .collect()
}

fn check_extent(extent: Extent3D) -> RhiResult<()> {
    if extent.width == 0 || extent.height == 0 {
        return Err(RhiError::Surface(format!(
            "swapchain extent {}x{} is empty",
            extent.width, extent.height
        )));
    }
    Ok(())
}

pub(crate) fn create_swapchain(
    ctx: &VulkanContext,
    surface: &VkSurface,
    queue: &VkQueue,
    desc: &SwapchainDescriptor,
) -> RhiResult<VkSwapchain> {
    let caps = surface_capabilities();
    if !caps.formats.contains(&desc.format) {
        return Err(RhiError::Surface(format!(
            "{:?} is not a presentable format of this surface",
            desc.format
        )));
    }
    check_extent(desc.extent)?;
    let images = back_buffers(ctx, desc.format, desc.extent, desc.image_count)?;
    rhi_log!(
        LogLayer::Backend,
        LogChannel::Info,
        "vkCreateSwapchainKHR through {}: {} images of {}x{}",
        surface.extension,
        images.len(),
        desc.extent.width,
        desc.extent.height
    );
    Ok(VkSwapchain {
        handle: ctx.next_handle(),
        format: desc.format,
        present_mode: desc.present_mode.into_vk(),
        extent: desc.extent,
        images,
        next_image: 0,
        queue: queue.host.clone(),
    })
}

/// `vkAcquireNextImageKHR`. The semaphore is signalled as soon as the image is free.
pub(crate) fn acquire_next_image(
    swapchain: &mut VkSwapchain,
    signal: Option<SemaphoreOp<'_, VkSemaphore>>,
) -> RhiResult<u32> {
    let count = swapchain.images.len() as u32;
    if count == 0 {
        return Err(RhiError::Surface("swapchain has no images".to_owned()));
    }
    let index = swapchain.next_image;
    swapchain.next_image = (index + 1) % count;
    if let Some(op) = signal {
        op.semaphore.timeline.signal(op.value);
    }
    Ok(index)
}

/// `vkQueuePresentKHR`.
pub(crate) fn present(
    swapchain: &VkSwapchain,
    queue: &VkQueue,
    image_index: u32,
    wait: Option<SemaphoreOp<'_, VkSemaphore>>,
) -> RhiResult<()> {
    let image = swapchain
        .images
        .get(image_index as usize)
        .ok_or(RhiError::Backend {
            call: "vkQueuePresentKHR",
            code: vk::Result::ERROR_OUT_OF_DATE_KHR.as_raw(),
        })?;
    queue.host.submit(HostJob {
        waits: wait
            .map(|op| SyncWait::Timeline(op.semaphore.timeline.clone(), op.value))
            .into_iter()
            .collect(),
        ops: vec![HostOp::Present {
            target: image.memory.clone(),
        }],
        signals: Vec::new(),
    })
}

pub(crate) fn resize(
    ctx: &VulkanContext,
    swapchain: &mut VkSwapchain,
    extent: Extent3D,
) -> RhiResult<()> {
    check_extent(extent)?;
    swapchain.queue.wait_idle();
    let count = swapchain.images.len() as u32;
    swapchain.images = back_buffers(ctx, swapchain.format, extent, count)?;
    swapchain.extent = extent;
    swapchain.next_image = 0;
    swapchain.handle = ctx.next_handle();
    Ok(())
}
