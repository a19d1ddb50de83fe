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

//! Buffers and textures.

use crate::device::Device;
use std::borrow::Cow;
use std::fmt;
use std::mem::ManuallyDrop;
use std::panic::Location;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::memory::{AllocationId, AllocationKind};
use tessera_core::rhi::api::{
    BufferDescriptor, BufferUsage, Extent3D, Format, MemoryLocation, TextureDescriptor,
    TextureUsage,
};
use tessera_core::rhi::{RhiBackend, RhiError, RhiResult};
use tessera_core::rhi_log;

fn owned_label(label: &Option<Cow<'_, str>>) -> Option<Cow<'static, str>> {
    label.as_deref().map(|label| Cow::Owned(label.to_owned()))
}

pub(crate) fn owned_buffer_descriptor(desc: &BufferDescriptor<'_>) -> BufferDescriptor<'static> {
    BufferDescriptor {
        label: owned_label(&desc.label),
        size: desc.size,
        usage: desc.usage,
        location: desc.location,
    }
}

pub(crate) fn owned_texture_descriptor(desc: &TextureDescriptor<'_>) -> TextureDescriptor<'static> {
    TextureDescriptor {
        label: owned_label(&desc.label),
        dimension: desc.dimension,
        size: desc.size,
        mip_level_count: desc.mip_level_count,
        array_layer_count: desc.array_layer_count,
        format: desc.format,
        sample_count: desc.sample_count,
        usage: desc.usage,
        clear_value: desc.clear_value,
    }
}

/// A buffer and the memory backing it.
pub struct Buffer<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Buffer>,
    desc: BufferDescriptor<'static>,
    allocation: AllocationId,
    id: u64,
}

impl<B: RhiBackend> fmt::Debug for Buffer<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label())
            .field("size", &self.desc.size)
            .field("usage", &self.desc.usage)
            .field("location", &self.desc.location)
            .finish()
    }
}

impl<'d, B: RhiBackend> Buffer<'d, B> {
    /// Identity of this buffer among the objects of its device.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The native buffer.
    pub fn raw(&self) -> &B::Buffer {
        &self.raw
    }

    /// The device that created the buffer.
    pub fn device(&self) -> &'d Device<B> {
        self.device
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.desc.size
    }

    /// Usage flags, fixed at creation.
    pub fn usage(&self) -> BufferUsage {
        self.desc.usage
    }

    /// Where the memory lives.
    pub fn location(&self) -> MemoryLocation {
        self.desc.location
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        self.desc.label_or_default()
    }

    /// The descriptor the buffer was created with.
    pub fn descriptor(&self) -> &BufferDescriptor<'static> {
        &self.desc
    }
}

impl<B: RhiBackend> Drop for Buffer<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_buffer(&self.device.ctx, raw);
        self.device.tracker.unregister(self.allocation);
        log::debug!(target: LogLayer::Rhi.target(), "destroyed buffer '{}'", self.label());
    }
}

/// A texture and its memory, or a swapchain back buffer it does not own.
pub struct Texture<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Texture>,
    desc: TextureDescriptor<'static>,
    allocation: Option<AllocationId>,
    id: u64,
}

impl<B: RhiBackend> fmt::Debug for Texture<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label())
            .field("size", &self.desc.size)
            .field("format", &self.desc.format)
            .field("usage", &self.desc.usage)
            .field("owned", &self.is_owned())
            .finish()
    }
}

impl<'d, B: RhiBackend> Texture<'d, B> {
    /// Wraps an image owned by someone else, such as a swapchain.
    pub(crate) fn borrowed(
        device: &'d Device<B>,
        raw: B::Texture,
        desc: TextureDescriptor<'static>,
    ) -> Self {
        Self {
            device,
            raw: ManuallyDrop::new(raw),
            desc,
            allocation: None,
            id: device.next_object_id(),
        }
    }

    /// Identity of this texture among the objects of its device.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The native texture.
    pub fn raw(&self) -> &B::Texture {
        &self.raw
    }

    /// The device that created the texture.
    pub fn device(&self) -> &'d Device<B> {
        self.device
    }

    /// The descriptor the texture was created with.
    pub fn descriptor(&self) -> &TextureDescriptor<'static> {
        &self.desc
    }

    /// Size of mip level 0.
    pub fn size(&self) -> Extent3D {
        self.desc.size
    }

    /// Texel format.
    pub fn format(&self) -> Format {
        self.desc.format
    }

    /// Usage flags, fixed at creation.
    pub fn usage(&self) -> TextureUsage {
        self.desc.usage
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        self.desc.label_or_default()
    }

    /// `false` for swapchain back buffers, whose image is never destroyed here.
    pub fn is_owned(&self) -> bool {
        self.allocation.is_some()
    }
}

impl<B: RhiBackend> Drop for Texture<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        if let Some(allocation) = self.allocation {
            B::destroy_texture(&self.device.ctx, raw);
            self.device.tracker.unregister(allocation);
            log::debug!(target: LogLayer::Rhi.target(), "destroyed texture '{}'", self.label());
        }
    }
}

/// A buffer or texture, as named by a transition barrier.
pub enum ResourceRef<'a, B: RhiBackend> {
    /// A buffer.
    Buffer(&'a Buffer<'a, B>),
    /// Every subresource of a texture.
    Texture(&'a Texture<'a, B>),
}

impl<B: RhiBackend> Clone for ResourceRef<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: RhiBackend> Copy for ResourceRef<'_, B> {}

impl<B: RhiBackend> ResourceRef<'_, B> {
    /// The label of the referenced resource.
    pub fn label(&self) -> &str {
        match self {
            ResourceRef::Buffer(buffer) => buffer.label(),
            ResourceRef::Texture(texture) => texture.label(),
        }
    }
}

impl<B: RhiBackend> Device<B> {
    /// Creates a buffer and registers its memory with the allocation tracker.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidDescriptor`] for an empty buffer or an empty usage
    /// set, or the native allocation failure.
    #[track_caller]
    pub fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> RhiResult<Buffer<'_, B>> {
        if desc.size == 0 || desc.usage.is_empty() {
            return Err(RhiError::InvalidDescriptor(format!(
                "buffer '{}' needs a size and at least one usage",
                desc.label_or_default()
            )));
        }
        let location = Location::caller();
        let raw = B::create_buffer(&self.ctx, desc)?;
        let allocation = self.tracker.register_at(
            AllocationKind::Buffer,
            desc.size,
            desc.label.as_deref(),
            location,
        );
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "buffer '{}': {} bytes, {:?}, {:?}",
            desc.label_or_default(),
            desc.size,
            desc.usage,
            desc.location
        );
        Ok(Buffer {
            device: self,
            raw: ManuallyDrop::new(raw),
            desc: owned_buffer_descriptor(desc),
            allocation,
            id: self.next_object_id(),
        })
    }

    /// Creates a texture and registers its memory with the allocation tracker.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidDescriptor`] for zero-sized extents, mips or layers,
    /// or the native allocation failure.
    #[track_caller]
    pub fn create_texture(&self, desc: &TextureDescriptor<'_>) -> RhiResult<Texture<'_, B>> {
        let size = desc.size;
        if size.width == 0
            || size.height == 0
            || size.depth == 0
            || desc.mip_level_count == 0
            || desc.array_layer_count == 0
            || desc.usage.is_empty()
        {
            return Err(RhiError::InvalidDescriptor(format!(
                "texture '{}' has an empty extent, mip chain, layer range or usage",
                desc.label_or_default()
            )));
        }
        let max_dimension = self.limits().max_texture_dimension_2d;
        if size.width > max_dimension || size.height > max_dimension {
            return Err(RhiError::InvalidDescriptor(format!(
                "texture '{}' is {}x{}, the adapter allows {}",
                desc.label_or_default(),
                size.width,
                size.height,
                max_dimension
            )));
        }
        let location = Location::caller();
        let raw = B::create_texture(&self.ctx, desc)?;
        let allocation = self.tracker.register_at(
            AllocationKind::Texture,
            desc.total_size(),
            desc.label.as_deref(),
            location,
        );
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "texture '{}': {}x{} {:?}, {} mip(s)",
            desc.label_or_default(),
            size.width,
            size.height,
            desc.format,
            desc.mip_level_count
        );
        Ok(Texture {
            device: self,
            raw: ManuallyDrop::new(raw),
            desc: owned_texture_descriptor(desc),
            allocation: Some(allocation),
            id: self.next_object_id(),
        })
    }
}
