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

//! DXGI flip-model swapchains.

use super::context::{create_texture, D3d12Context, D3d12Texture};
use super::native::*;
use super::sync::{D3d12Queue, D3d12Semaphore};
use crate::graphics::software::{HostJob, HostOp, HostQueue, SyncWait};
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

/// The window a swapchain is created for.
#[derive(Debug)]
pub struct D3d12Surface {
    /// The `HWND`, or zero for an off-screen target.
    pub hwnd: isize,
    /// Current extent of the target.
    pub extent: Extent3D,
}

pub(crate) fn create_surface(
    ctx: &D3d12Context,
    target: &SurfaceTarget,
) -> RhiResult<D3d12Surface> {
    let hwnd = match target {
        SurfaceTarget::Headless { .. } => 0,
        SurfaceTarget::Window {
            window: RawWindowHandle::Win32(handle),
            ..
        } => handle.hwnd.get(),
        SurfaceTarget::Window { window, .. } => {
            return Err(RhiError::Surface(format!(
                "DXGI swapchains need a Win32 window, got {window:?}"
            )))
        }
    };
    if !ctx.device.adapter().supports_present {
        return Err(RhiError::Surface(format!(
            "'{}' has no output",
            ctx.device.adapter().name
        )));
    }
    Ok(D3d12Surface {
        hwnd,
        extent: target.extent(),
    })
}

/// Flip-model swapchains take no sRGB back buffers; sRGB goes through the RTV.
pub(crate) fn surface_capabilities() -> SurfaceCapabilities {
    SurfaceCapabilities {
        formats: vec![Format::Bgra8Unorm, Format::Rgba8Unorm, Format::Rgba16Float],
        present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate],
        min_image_count: SwapchainDescriptor::MIN_IMAGES,
        max_image_count: SwapchainDescriptor::MAX_IMAGES,
    }
}

/// `SyncInterval` and `Flags` passed to `IDXGISwapChain::Present`.
pub fn present_parameters(mode: PresentMode) -> (u32, u32) {
    match mode {
        PresentMode::Fifo => (1, 0),
        PresentMode::Mailbox => (0, 0),
        PresentMode::Immediate => (0, DXGI_PRESENT_ALLOW_TEARING),
    }
}

/// An `IDXGISwapChain3` and its back buffers.
#[derive(Debug)]
pub struct D3d12Swapchain {
    /// Object identity.
    pub id: u64,
    /// `DXGI_SWAP_CHAIN_DESC1::Format`.
    pub format: Format,
    /// `DXGI_SWAP_CHAIN_DESC1::SwapEffect`.
    pub swap_effect: u32,
    /// The present mode.
    pub present_mode: PresentMode,
    /// Back-buffer size.
    pub extent: Extent3D,
    pub(crate) buffers: Vec<D3d12Texture>,
    pub(crate) current_back_buffer: u32,
    pub(crate) queue: Arc<HostQueue>,
}

impl D3d12Swapchain {
    /// `GetCurrentBackBufferIndex`.
    pub fn current_back_buffer_index(&self) -> u32 {
        self.current_back_buffer
    }
}

fn back_buffers(
    ctx: &D3d12Context,
    format: Format,
    extent: Extent3D,
    count: u32,
) -> RhiResult<Vec<D3d12Texture>> {
    (0..count)
        .map(|i| {
            let desc = TextureDescriptor::new_2d(
                format!("back buffer {i}"),
                extent.width,
                extent.height,
                format,
                TextureUsage::RENDER_TARGET | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
            );
            create_texture(ctx, &desc)
        })
        .collect()
}

fn check_extent(extent: Extent3D) -> RhiResult<()> {
    if extent.width == 0 || extent.height == 0 {
        return Err(RhiError::Backend {
            call: "IDXGISwapChain::ResizeBuffers",
            code: DXGI_ERROR_INVALID_CALL.0,
        });
    }
    Ok(())
}

pub(crate) fn create_swapchain(
    ctx: &D3d12Context,
    surface: &D3d12Surface,
    queue: &D3d12Queue,
    desc: &SwapchainDescriptor,
) -> RhiResult<D3d12Swapchain> {
    if !surface_capabilities().formats.contains(&desc.format) {
        return Err(RhiError::Surface(format!(
            "{:?} is not a flip-model back-buffer format",
            desc.format
        )));
    }
    check_extent(desc.extent)?;
    let buffers = back_buffers(ctx, desc.format, desc.extent, desc.image_count)?;
    rhi_log!(
        LogLayer::Backend,
        LogChannel::Info,
        "CreateSwapChainForHwnd({:#x}): {} buffers of {}x{}",
        surface.hwnd,
        buffers.len(),
        desc.extent.width,
        desc.extent.height
    );
    Ok(D3d12Swapchain {
        id: ctx.next_object(),
        format: desc.format,
        swap_effect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
        present_mode: desc.present_mode,
        extent: desc.extent,
        buffers,
        current_back_buffer: 0,
        queue: queue.host.clone(),
    })
}

/// The back buffer index is known up front; the semaphore is signalled at once.
pub(crate) fn acquire_next_image(
    swapchain: &mut D3d12Swapchain,
    signal: Option<SemaphoreOp<'_, D3d12Semaphore>>,
) -> RhiResult<u32> {
    if swapchain.buffers.is_empty() {
        return Err(RhiError::Surface("swapchain has no buffers".to_owned()));
    }
    if let Some(op) = signal {
        op.semaphore.timeline.signal(op.value);
    }
    Ok(swapchain.current_back_buffer)
}

/// `Wait` on the queue then `IDXGISwapChain::Present`, which advances the back buffer.
pub(crate) fn present(
    swapchain: &mut D3d12Swapchain,
    queue: &D3d12Queue,
    image_index: u32,
    wait: Option<SemaphoreOp<'_, D3d12Semaphore>>,
) -> RhiResult<()> {
    if image_index != swapchain.current_back_buffer {
        return Err(RhiError::Backend {
            call: "IDXGISwapChain::Present",
            code: DXGI_ERROR_INVALID_CALL.0,
        });
    }
    let buffer = swapchain
        .buffers
        .get(image_index as usize)
        .ok_or(RhiError::Backend {
            call: "IDXGISwapChain::Present",
            code: DXGI_ERROR_INVALID_CALL.0,
        })?;
    queue.host.submit(HostJob {
        waits: wait
            .map(|op| SyncWait::Timeline(op.semaphore.timeline.clone(), op.value))
            .into_iter()
            .collect(),
        ops: vec![HostOp::Present {
            target: buffer.memory.clone(),
        }],
        signals: Vec::new(),
    })?;
    let count = swapchain.buffers.len() as u32;
    swapchain.current_back_buffer = (image_index + 1) % count;
    Ok(())
}

pub(crate) fn resize(
    ctx: &D3d12Context,
    swapchain: &mut D3d12Swapchain,
    extent: Extent3D,
) -> RhiResult<()> {
    check_extent(extent)?;
    swapchain.queue.wait_idle();
    let count = swapchain.buffers.len() as u32;
    swapchain.buffers = back_buffers(ctx, swapchain.format, extent, count)?;
    swapchain.extent = extent;
    swapchain.current_back_buffer = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_modes_map_to_sync_intervals() {
        assert_eq!(present_parameters(PresentMode::Fifo), (1, 0));
        assert_eq!(present_parameters(PresentMode::Mailbox), (0, 0));
        assert_eq!(
            present_parameters(PresentMode::Immediate),
            (0, DXGI_PRESENT_ALLOW_TEARING)
        );
    }

    #[test]
    fn flip_model_has_no_srgb_back_buffers() {
        let caps = surface_capabilities();
        assert!(caps.formats.iter().all(|f| !matches!(
            f,
            Format::Bgra8UnormSrgb | Format::Rgba8UnormSrgb
        )));
    }
}
