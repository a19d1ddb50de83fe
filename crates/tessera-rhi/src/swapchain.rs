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

//! Presentation surfaces and swapchains.

use crate::device::Device;
use crate::queue::Queue;
use crate::resource::Texture;
use crate::sync::Semaphore;
use crate::view::TextureView;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::fmt;
use std::mem::ManuallyDrop;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    Extent3D, Format, QueueType, SurfaceCapabilities, SurfaceTarget, SwapchainDescriptor,
    TextureDescriptor, TextureUsage, TextureViewDescriptor, TextureViewKind,
};
use tessera_core::rhi::{RhiBackend, RhiError, RhiResult};
use tessera_core::{rhi_ensure, rhi_fatal, rhi_log};

/// A window or off-screen target that can be presented to.
pub struct Surface<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Surface>,
    extent: Extent3D,
}

impl<B: RhiBackend> fmt::Debug for Surface<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("extent", &self.extent)
            .finish()
    }
}

impl<B: RhiBackend> Surface<'_, B> {
    /// The native surface.
    pub fn raw(&self) -> &B::Surface {
        &self.raw
    }

    /// The size of the target when the surface was created.
    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    /// Formats, present modes and image counts the surface supports.
    pub fn capabilities(&self) -> SurfaceCapabilities {
        B::surface_capabilities(&self.device.ctx, &self.raw)
    }
}

impl<B: RhiBackend> Drop for Surface<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_surface(&self.device.ctx, raw);
    }
}

/// Back buffers presented to a surface.
///
/// The swapchain owns non-owning [`Texture`] handles to its back buffers and
/// one render-target view per back buffer.
pub struct Swapchain<'d, B: RhiBackend> {
    device: &'d Device<B>,
    views: Vec<TextureView<'d, B>>,
    images: Vec<Texture<'d, B>>,
    raw: ManuallyDrop<B::Swapchain>,
    desc: SwapchainDescriptor,
    current: Option<u32>,
}

impl<B: RhiBackend> fmt::Debug for Swapchain<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Swapchain")
            .field("desc", &self.desc)
            .field("current", &self.current)
            .finish()
    }
}

impl<'d, B: RhiBackend> Swapchain<'d, B> {
    fn wrap_images(&mut self) -> RhiResult<()> {
        let images: Vec<Texture<'d, B>> = B::swapchain_images(&self.raw)
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let desc = TextureDescriptor::new_2d(
                    format!("back buffer {i}"),
                    self.desc.extent.width,
                    self.desc.extent.height,
                    self.desc.format,
                    TextureUsage::RENDER_TARGET | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
                );
                Texture::borrowed(self.device, raw, desc)
            })
            .collect();
        let views = images
            .iter()
            .map(|image| {
                let desc = TextureViewDescriptor::whole(TextureViewKind::RenderTarget);
                self.device.texture_view(image, &desc)
            })
            .collect::<RhiResult<Vec<_>>>()?;
        self.views = views;
        self.images = images;
        Ok(())
    }

    /// Acquires the next back buffer and returns its index.
    ///
    /// `signal` is signalled once the image may be rendered to.
    ///
    /// # Errors
    ///
    /// Native failures, such as an out-of-date surface.
    pub fn acquire_next_image(&mut self, signal: Option<&Semaphore<'_, B>>) -> RhiResult<u32> {
        rhi_ensure!(
            self.current.is_none(),
            LogLayer::Rhi,
            "back buffer {:?} acquired twice without a present",
            self.current
        );
        let index = B::acquire_next_image(
            &self.device.ctx,
            &mut self.raw,
            signal.map(Semaphore::pending_signal_op),
        )?;
        if let Some(semaphore) = signal {
            semaphore.commit_signal();
        }
        self.current = Some(index);
        Ok(index)
    }

    /// Presents the acquired back buffer on `queue` after `wait` signals.
    ///
    /// # Errors
    ///
    /// Native presentation failures.
    pub fn present(
        &mut self,
        queue: &Queue<'_, B>,
        wait: Option<&Semaphore<'_, B>>,
    ) -> RhiResult<()> {
        let Some(index) = self.current else {
            rhi_fatal!(LogLayer::Rhi, "present without an acquired back buffer");
        };
        B::present(
            &self.device.ctx,
            &mut self.raw,
            queue.raw(),
            index,
            wait.map(Semaphore::wait_op),
        )?;
        self.current = None;
        Ok(())
    }

    /// Waits for the device and recreates the back buffers at `extent`.
    ///
    /// # Errors
    ///
    /// Native failures, including a zero-sized extent.
    pub fn resize(&mut self, extent: Extent3D) -> RhiResult<()> {
        self.device.wait_idle();
        self.views.clear();
        self.images.clear();
        B::resize_swapchain(&self.device.ctx, &mut self.raw, extent)?;
        self.desc.extent = extent;
        self.current = None;
        self.wrap_images()?;
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::Info,
            "swapchain resized to {}x{}",
            extent.width,
            extent.height
        );
        Ok(())
    }

    /// Back buffer `index`.
    pub fn back_buffer(&self, index: u32) -> &Texture<'d, B> {
        self.images.get(index as usize).unwrap_or_else(|| {
            rhi_fatal!(LogLayer::Rhi, "back buffer {} of {}", index, self.images.len())
        })
    }

    /// The render-target view of back buffer `index`.
    pub fn back_buffer_view(&self, index: u32) -> &TextureView<'d, B> {
        self.views.get(index as usize).unwrap_or_else(|| {
            rhi_fatal!(LogLayer::Rhi, "back buffer view {} of {}", index, self.views.len())
        })
    }

    /// Number of back buffers.
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// The acquired back buffer, if any.
    pub fn current_image(&self) -> Option<u32> {
        self.current
    }

    /// Back-buffer size.
    pub fn extent(&self) -> Extent3D {
        self.desc.extent
    }

    /// Back-buffer format.
    pub fn format(&self) -> Format {
        self.desc.format
    }
}

impl<B: RhiBackend> Drop for Swapchain<'_, B> {
    fn drop(&mut self) {
        self.device.wait_idle();
        self.views.clear();
        self.images.clear();
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_swapchain(&self.device.ctx, raw);
    }
}

impl<B: RhiBackend> Device<B> {
    /// Creates a surface for a window or a headless target.
    ///
    /// # Errors
    ///
    /// [`RhiError::Surface`] when the backend cannot present to the target.
    pub fn create_surface(&self, target: &SurfaceTarget) -> RhiResult<Surface<'_, B>> {
        let raw = B::create_surface(&self.ctx, target)?;
        Ok(Surface {
            device: self,
            raw: ManuallyDrop::new(raw),
            extent: target.extent(),
        })
    }

    /// Creates a surface for a window of `width x height` pixels.
    ///
    /// # Errors
    ///
    /// [`RhiError::Surface`] when the window handles are unavailable or the
    /// backend cannot present to them.
    pub fn create_window_surface<W>(
        &self,
        window: &W,
        width: u32,
        height: u32,
    ) -> RhiResult<Surface<'_, B>>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let window_handle = window
            .window_handle()
            .map_err(|err| RhiError::Surface(err.to_string()))?;
        let display_handle = window
            .display_handle()
            .map_err(|err| RhiError::Surface(err.to_string()))?;
        self.create_surface(&SurfaceTarget::Window {
            window: window_handle.as_raw(),
            display: display_handle.as_raw(),
            extent: Extent3D::new_2d(width, height),
        })
    }

    /// Creates a swapchain presenting through a graphics `queue`.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidDescriptor`] for an image count outside `2..=3`,
    /// [`RhiError::Surface`] for a format or present mode the surface does not
    /// support, and native failures.
    pub fn create_swapchain<'d>(
        &'d self,
        surface: &Surface<'d, B>,
        queue: &Queue<'d, B>,
        desc: &SwapchainDescriptor,
    ) -> RhiResult<Swapchain<'d, B>> {
        rhi_ensure!(
            queue.queue_type() == QueueType::Graphics,
            LogLayer::Rhi,
            "swapchains present through a graphics queue, got {}",
            queue.queue_type()
        );
        if !(SwapchainDescriptor::MIN_IMAGES..=SwapchainDescriptor::MAX_IMAGES)
            .contains(&desc.image_count)
        {
            return Err(RhiError::InvalidDescriptor(format!(
                "swapchain image count {} is outside {}..={}",
                desc.image_count,
                SwapchainDescriptor::MIN_IMAGES,
                SwapchainDescriptor::MAX_IMAGES
            )));
        }
        let caps = surface.capabilities();
        if !caps.formats.contains(&desc.format)
            || !caps.present_modes.contains(&desc.present_mode)
        {
            return Err(RhiError::Surface(format!(
                "surface does not support {:?} with {:?}",
                desc.format, desc.present_mode
            )));
        }

        let raw = B::create_swapchain(&self.ctx, surface.raw(), queue.raw(), desc)?;
        let mut swapchain = Swapchain {
            device: self,
            views: Vec::new(),
            images: Vec::new(),
            raw: ManuallyDrop::new(raw),
            desc: *desc,
            current: None,
        };
        swapchain.wrap_images()?;
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::Info,
            "swapchain: {} x {:?} {}x{}, {:?}",
            swapchain.image_count(),
            desc.format,
            desc.extent.width,
            desc.extent.height,
            desc.present_mode
        );
        Ok(swapchain)
    }
}
