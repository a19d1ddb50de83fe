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

//! Descriptors of buffer and texture views.

use super::format::Format;
use super::texture::{TextureDescriptor, TextureDimension};
use std::borrow::Cow;

/// Alignment every uniform view is rounded to, on every backend.
///
/// D3D12 requires 256-byte constant buffer views; Vulkan adapters typically
/// accept less. Using the stricter value keeps shader offset math portable.
pub const UNIFORM_VIEW_ALIGNMENT: u64 = 256;

/// Rounds `size` up to [`UNIFORM_VIEW_ALIGNMENT`].
pub const fn align_uniform_size(size: u64) -> u64 {
    align_up(size, UNIFORM_VIEW_ALIGNMENT)
}

/// Rounds `value` up to a multiple of `alignment` (a power of two, or 1).
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// How a buffer view is exposed to shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferViewKind {
    /// A uniform (constant) buffer.
    Uniform,
    /// A read-only storage buffer.
    Storage,
    /// A read/write storage buffer.
    StorageReadWrite,
}

/// A descriptor used to create a buffer view.
#[derive(Debug, Clone)]
pub struct BufferViewDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The kind of view.
    pub kind: BufferViewKind,
    /// Start of the viewed range in bytes.
    pub offset: u64,
    /// Size of the viewed range in bytes. `None` covers the rest of the buffer.
    pub size: Option<u64>,
}

impl BufferViewDescriptor<'_> {
    /// A view of the whole buffer.
    pub fn whole(kind: BufferViewKind) -> Self {
        Self {
            label: None,
            kind,
            offset: 0,
            size: None,
        }
    }
}

/// How a texture view is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewKind {
    /// Sampled from shaders. Takes a bindless slot.
    Sampled,
    /// Read/written as a storage image. Takes a bindless slot.
    Storage,
    /// Colour attachment. Never shader visible.
    RenderTarget,
    /// Depth/stencil attachment. Never shader visible.
    DepthStencil,
}

impl TextureViewKind {
    /// Returns `true` if the view is written into the bindless table.
    pub const fn is_shader_visible(self) -> bool {
        matches!(self, TextureViewKind::Sampled | TextureViewKind::Storage)
    }
}

/// The dimensionality of a texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    /// 1D.
    D1,
    /// 2D.
    D2,
    /// Array of 2D layers.
    D2Array,
    /// Cube map (6 layers).
    Cube,
    /// 3D.
    D3,
}

/// A descriptor used to create a texture view.
#[derive(Debug, Clone)]
pub struct TextureViewDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The kind of view.
    pub kind: TextureViewKind,
    /// The view format. `None` uses the texture's format.
    pub format: Option<Format>,
    /// The view dimension. `None` derives it from the texture.
    pub dimension: Option<TextureViewDimension>,
    /// First mip level.
    pub base_mip_level: u32,
    /// Number of mip levels. `None` covers the remaining levels.
    pub mip_level_count: Option<u32>,
    /// First array layer.
    pub base_array_layer: u32,
    /// Number of layers. `None` covers the remaining layers.
    pub array_layer_count: Option<u32>,
}

impl TextureViewDescriptor<'_> {
    /// A view of every subresource.
    pub fn whole(kind: TextureViewKind) -> Self {
        Self {
            label: None,
            kind,
            format: None,
            dimension: None,
            base_mip_level: 0,
            mip_level_count: None,
            base_array_layer: 0,
            array_layer_count: None,
        }
    }

    /// Fills every `None` from the texture.
    pub fn resolve(&self, texture: &TextureDescriptor<'_>) -> ResolvedTextureView {
        let mip_level_count = self
            .mip_level_count
            .unwrap_or(texture.mip_level_count.saturating_sub(self.base_mip_level));
        let array_layer_count = self
            .array_layer_count
            .unwrap_or(texture.array_layer_count.saturating_sub(self.base_array_layer));
        let dimension = self.dimension.unwrap_or(match texture.dimension {
            TextureDimension::D1 => TextureViewDimension::D1,
            TextureDimension::D3 => TextureViewDimension::D3,
            TextureDimension::D2 if texture.array_layer_count > 1 => TextureViewDimension::D2Array,
            TextureDimension::D2 => TextureViewDimension::D2,
        });
        ResolvedTextureView {
            kind: self.kind,
            format: self.format.unwrap_or(texture.format),
            dimension,
            base_mip_level: self.base_mip_level,
            mip_level_count,
            base_array_layer: self.base_array_layer,
            array_layer_count,
        }
    }
}

/// A texture view with every field resolved. This is what backends consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedTextureView {
    /// The kind of view.
    pub kind: TextureViewKind,
    /// The view format.
    pub format: Format,
    /// The view dimension.
    pub dimension: TextureViewDimension,
    /// First mip level.
    pub base_mip_level: u32,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// First array layer.
    pub base_array_layer: u32,
    /// Number of layers.
    pub array_layer_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::api::TextureUsage;

    #[test]
    fn uniform_sizes_round_to_256() {
        assert_eq!(align_uniform_size(1), 256);
        assert_eq!(align_uniform_size(256), 256);
        assert_eq!(align_uniform_size(257), 512);
        assert_eq!(align_uniform_size(0), 0);
        assert_eq!(align_up(13, 1), 13);
        assert_eq!(align_up(13, 4), 16);
    }

    #[test]
    fn resolve_fills_defaults_from_texture() {
        let mut texture = TextureDescriptor::new_2d(
            "layers",
            8,
            8,
            Format::Rgba8Unorm,
            TextureUsage::SAMPLED,
        );
        texture.mip_level_count = 4;
        texture.array_layer_count = 3;

        let mut desc = TextureViewDescriptor::whole(TextureViewKind::Sampled);
        desc.base_mip_level = 1;
        let resolved = desc.resolve(&texture);
        assert_eq!(resolved.format, Format::Rgba8Unorm);
        assert_eq!(resolved.dimension, TextureViewDimension::D2Array);
        assert_eq!(resolved.mip_level_count, 3);
        assert_eq!(resolved.array_layer_count, 3);
    }

    #[test]
    fn only_sampled_and_storage_are_shader_visible() {
        assert!(TextureViewKind::Sampled.is_shader_visible());
        assert!(TextureViewKind::Storage.is_shader_visible());
        assert!(!TextureViewKind::RenderTarget.is_shader_visible());
        assert!(!TextureViewKind::DepthStencil.is_shader_visible());
    }
}
