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

//! Shader-visible views, attachment views and samplers.
//!
//! Buffer views, sampled and storage texture views and samplers each own one
//! slot of the bindless table. Render-target and depth-stencil views live in
//! the backend's attachment descriptor area instead and never take a slot.

use crate::device::Device;
use crate::resource::{Buffer, Texture};
use std::fmt;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    align_uniform_size, BufferUsage, BufferViewDescriptor, BufferViewKind, Extent3D, Format,
    ResolvedTextureView, SamplerDescriptor, TextureUsage, TextureViewDescriptor, TextureViewKind,
    UNIFORM_VIEW_ALIGNMENT,
};
use tessera_core::rhi::{ResourceIndex, RhiBackend, RhiResult, SamplerIndex, INVALID_INDEX};
use tessera_core::{rhi_ensure, rhi_fatal, rhi_log};

/// A range of a buffer exposed to shaders through a bindless slot.
pub struct BufferView<'a, B: RhiBackend> {
    device: &'a Device<B>,
    kind: BufferViewKind,
    offset: u64,
    size: u64,
    index: ResourceIndex,
}

impl<B: RhiBackend> fmt::Debug for BufferView<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("kind", &self.kind)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("index", &self.index)
            .finish()
    }
}

impl<B: RhiBackend> BufferView<'_, B> {
    /// The slot shaders index the resource array with.
    pub fn index(&self) -> ResourceIndex {
        self.index
    }

    /// The kind of view.
    pub fn kind(&self) -> BufferViewKind {
        self.kind
    }

    /// Start of the viewed range.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the viewed range, after uniform rounding.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl<B: RhiBackend> Drop for BufferView<'_, B> {
    fn drop(&mut self) {
        B::clear_resource_descriptor(&self.device.ctx, self.index);
        self.device.resource_slots.borrow_mut().free(self.index.0);
    }
}

enum ViewSlot<B: RhiBackend> {
    Bindless(ResourceIndex),
    Attachment(B::AttachmentView),
}

/// A view of a texture's subresources.
///
/// Sampled and storage views hold a bindless slot; render-target and
/// depth-stencil views hold a native attachment descriptor.
pub struct TextureView<'a, B: RhiBackend> {
    device: &'a Device<B>,
    resolved: ResolvedTextureView,
    extent: Extent3D,
    slot: Option<ViewSlot<B>>,
}

impl<B: RhiBackend> fmt::Debug for TextureView<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureView")
            .field("kind", &self.resolved.kind)
            .field("format", &self.resolved.format)
            .field("index", &self.index())
            .finish()
    }
}

impl<B: RhiBackend> TextureView<'_, B> {
    /// The kind of view.
    pub fn kind(&self) -> TextureViewKind {
        self.resolved.kind
    }

    /// The view format.
    pub fn format(&self) -> Format {
        self.resolved.format
    }

    /// Every field of the view, resolved against its texture.
    pub fn resolved(&self) -> &ResolvedTextureView {
        &self.resolved
    }

    /// Size of the view's first mip level.
    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    /// The bindless slot of a sampled or storage view.
    pub fn index(&self) -> Option<ResourceIndex> {
        match &self.slot {
            Some(ViewSlot::Bindless(index)) => Some(*index),
            _ => None,
        }
    }

    /// The native attachment descriptor. Aborts for shader-visible views.
    pub fn attachment(&self) -> &B::AttachmentView {
        match &self.slot {
            Some(ViewSlot::Attachment(view)) => view,
            _ => rhi_fatal!(
                LogLayer::Rhi,
                "{:?} view used as a render attachment",
                self.resolved.kind
            ),
        }
    }
}

impl<B: RhiBackend> Drop for TextureView<'_, B> {
    fn drop(&mut self) {
        match self.slot.take() {
            Some(ViewSlot::Bindless(index)) => {
                B::clear_resource_descriptor(&self.device.ctx, index);
                self.device.resource_slots.borrow_mut().free(index.0);
            }
            Some(ViewSlot::Attachment(view)) => {
                B::destroy_attachment_view(&self.device.ctx, view);
            }
            None => {}
        }
    }
}

/// A sampler in the bindless sampler array.
pub struct Sampler<'d, B: RhiBackend> {
    device: &'d Device<B>,
    index: SamplerIndex,
}

impl<B: RhiBackend> fmt::Debug for Sampler<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler").field("index", &self.index).finish()
    }
}

impl<B: RhiBackend> Sampler<'_, B> {
    /// The slot shaders index the sampler array with.
    pub fn index(&self) -> SamplerIndex {
        self.index
    }
}

impl<B: RhiBackend> Drop for Sampler<'_, B> {
    fn drop(&mut self) {
        B::clear_sampler_descriptor(&self.device.ctx, self.index);
        self.device.sampler_slots.borrow_mut().free(self.index.0);
    }
}

fn required_texture_usage(kind: TextureViewKind) -> TextureUsage {
    match kind {
        TextureViewKind::Sampled => TextureUsage::SAMPLED,
        TextureViewKind::Storage => TextureUsage::STORAGE,
        TextureViewKind::RenderTarget => TextureUsage::RENDER_TARGET,
        TextureViewKind::DepthStencil => TextureUsage::DEPTH_STENCIL,
    }
}

impl<B: RhiBackend> Device<B> {
    fn allocate_resource_slot(&self, what: &str) -> ResourceIndex {
        let index = self.resource_slots.borrow_mut().allocate();
        if index == INVALID_INDEX {
            rhi_fatal!(
                LogLayer::Rhi,
                "bindless resource array exhausted ({} slots) creating {}",
                self.config().max_bindless_resources,
                what
            );
        }
        ResourceIndex(index)
    }

    /// Exposes a range of `buffer` to shaders and writes its descriptor.
    ///
    /// Uniform views round their size up to 256 bytes and need a 256-byte
    /// aligned offset. The rounded range must fit in the buffer, and the buffer
    /// must carry `UNIFORM` or `STORAGE` usage to match the view kind.
    pub fn create_buffer_view<'a>(
        &'a self,
        buffer: &'a Buffer<'a, B>,
        desc: &BufferViewDescriptor<'_>,
    ) -> BufferView<'a, B> {
        let (usage, size) = match desc.kind {
            BufferViewKind::Uniform => {
                rhi_ensure!(
                    desc.offset % UNIFORM_VIEW_ALIGNMENT == 0,
                    LogLayer::Rhi,
                    "uniform view of '{}' at offset {} is not {}-byte aligned",
                    buffer.label(),
                    desc.offset,
                    UNIFORM_VIEW_ALIGNMENT
                );
                let size = desc
                    .size
                    .unwrap_or_else(|| buffer.size().saturating_sub(desc.offset));
                (BufferUsage::UNIFORM, align_uniform_size(size))
            }
            BufferViewKind::Storage | BufferViewKind::StorageReadWrite => {
                let size = desc
                    .size
                    .unwrap_or_else(|| buffer.size().saturating_sub(desc.offset));
                (BufferUsage::STORAGE, size)
            }
        };
        rhi_ensure!(
            buffer.usage().contains(usage),
            LogLayer::Rhi,
            "{:?} view of '{}' needs {:?} usage, the buffer has {:?}",
            desc.kind,
            buffer.label(),
            usage,
            buffer.usage()
        );
        rhi_ensure!(
            size > 0
                && desc
                    .offset
                    .checked_add(size)
                    .is_some_and(|end| end <= buffer.size()),
            LogLayer::Rhi,
            "{:?} view [{}, +{}) does not fit in '{}' of {} bytes",
            desc.kind,
            desc.offset,
            size,
            buffer.label(),
            buffer.size()
        );

        let index = self.allocate_resource_slot(buffer.label());
        B::write_buffer_descriptor(&self.ctx, index, buffer.raw(), desc.kind, desc.offset, size);
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "{:?} view of '{}' at {}",
            desc.kind,
            buffer.label(),
            index
        );
        BufferView {
            device: self,
            kind: desc.kind,
            offset: desc.offset,
            size,
            index,
        }
    }

    /// Creates a view of `texture`.
    ///
    /// Sampled and storage views take a bindless slot. Render-target and
    /// depth-stencil views are written to the attachment descriptor area.
    ///
    /// # Errors
    ///
    /// Fails when the attachment descriptor area is full.
    pub fn create_texture_view<'a>(
        &'a self,
        texture: &'a Texture<'a, B>,
        desc: &TextureViewDescriptor<'_>,
    ) -> RhiResult<TextureView<'a, B>> {
        self.texture_view(texture, desc)
    }

    /// Creates a view without tying it to the texture borrow. Swapchains keep
    /// their back buffers and views side by side and drop the views first.
    pub(crate) fn texture_view<'d>(
        &'d self,
        texture: &Texture<'_, B>,
        desc: &TextureViewDescriptor<'_>,
    ) -> RhiResult<TextureView<'d, B>> {
        let tex = texture.descriptor();
        let resolved = desc.resolve(tex);
        let usage = required_texture_usage(resolved.kind);
        rhi_ensure!(
            tex.usage.contains(usage),
            LogLayer::Rhi,
            "{:?} view of '{}' needs {:?} usage, the texture has {:?}",
            resolved.kind,
            texture.label(),
            usage,
            tex.usage
        );
        rhi_ensure!(
            resolved.mip_level_count > 0
                && resolved.base_mip_level + resolved.mip_level_count <= tex.mip_level_count
                && resolved.array_layer_count > 0
                && resolved.base_array_layer + resolved.array_layer_count
                    <= tex.array_layer_count,
            LogLayer::Rhi,
            "view of mips {}+{} layers {}+{} is outside '{}'",
            resolved.base_mip_level,
            resolved.mip_level_count,
            resolved.base_array_layer,
            resolved.array_layer_count,
            texture.label()
        );
        rhi_ensure!(
            resolved.format.bytes_per_texel() == tex.format.bytes_per_texel()
                && resolved.format.is_depth() == tex.format.is_depth(),
            LogLayer::Rhi,
            "{:?} cannot view '{}' of format {:?}",
            resolved.format,
            texture.label(),
            tex.format
        );
        let format_fits_kind = match resolved.kind {
            TextureViewKind::RenderTarget => !resolved.format.is_depth(),
            TextureViewKind::DepthStencil => resolved.format.is_depth(),
            TextureViewKind::Sampled | TextureViewKind::Storage => true,
        };
        rhi_ensure!(
            format_fits_kind,
            LogLayer::Rhi,
            "{:?} view with format {:?}",
            resolved.kind,
            resolved.format
        );

        let slot = if resolved.kind.is_shader_visible() {
            let index = self.allocate_resource_slot(texture.label());
            B::write_texture_descriptor(&self.ctx, index, texture.raw(), &resolved);
            ViewSlot::Bindless(index)
        } else {
            ViewSlot::Attachment(B::create_attachment_view(&self.ctx, texture.raw(), &resolved)?)
        };
        Ok(TextureView {
            device: self,
            extent: tex.size.mip_level_size(resolved.base_mip_level),
            resolved,
            slot: Some(slot),
        })
    }

    /// Writes a sampler into the sampler array.
    ///
    /// Anisotropy above the adapter's limit is clamped with a warning.
    pub fn create_sampler(&self, desc: &SamplerDescriptor<'_>) -> Sampler<'_, B> {
        let mut desc = desc.clone();
        let max_anisotropy = self.limits().max_sampler_anisotropy;
        if desc.anisotropy_clamp > max_anisotropy {
            rhi_log!(
                LogLayer::Rhi,
                LogChannel::Warning,
                "sampler '{}': anisotropy {} clamped to {}",
                desc.label.as_deref().unwrap_or("<unnamed sampler>"),
                desc.anisotropy_clamp,
                max_anisotropy
            );
            desc.anisotropy_clamp = max_anisotropy;
        }
        let index = self.sampler_slots.borrow_mut().allocate();
        if index == INVALID_INDEX {
            rhi_fatal!(
                LogLayer::Rhi,
                "bindless sampler array exhausted ({} slots)",
                self.config().max_bindless_samplers
            );
        }
        let index = SamplerIndex(index);
        B::write_sampler_descriptor(&self.ctx, index, &desc);
        Sampler {
            device: self,
            index,
        }
    }
}
