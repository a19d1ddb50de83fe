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

//! Defines data structures related to GPU texture resources.

use super::format::Format;
use crate::tessera_bitflags;
use std::borrow::Cow;

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// A one-dimensional texture.
    D1,
    /// A two-dimensional texture.
    #[default]
    D2,
    /// A three-dimensional texture.
    D3,
}

tessera_bitflags! {
    /// A set of flags describing the allowed usages of a texture.
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// The texture can be the destination of a copy.
        const COPY_DST = 1 << 1;
        /// The texture can be viewed as a sampled image.
        const SAMPLED = 1 << 2;
        /// The texture can be viewed as a storage image.
        const STORAGE = 1 << 3;
        /// The texture can be used as a colour attachment.
        const RENDER_TARGET = 1 << 4;
        /// The texture can be used as a depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 5;
    }
}

/// The size of a texture or copy region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (1 for 1D/2D textures).
    pub depth: u32,
}

impl Extent3D {
    /// A 2D extent.
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// The extent of mip level `mip`, never smaller than one texel.
    pub const fn mip_level_size(self, mip: u32) -> Self {
        Self {
            width: shrink(self.width, mip),
            height: shrink(self.height, mip),
            depth: shrink(self.depth, mip),
        }
    }

    /// Total number of texels.
    pub const fn texel_count(self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }
}

const fn shrink(value: u32, mip: u32) -> u32 {
    let shrunk = match value.checked_shr(mip) {
        Some(v) => v,
        None => 0,
    };
    if shrunk == 0 {
        1
    } else {
        shrunk
    }
}

/// A texel offset inside a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// X offset.
    pub x: u32,
    /// Y offset.
    pub y: u32,
    /// Z offset.
    pub z: u32,
}

impl Origin3D {
    /// The origin.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };
}

/// The optimized clear value of a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// A colour clear value.
    Color([f32; 4]),
    /// A depth/stencil clear value.
    DepthStencil {
        /// Depth.
        depth: f32,
        /// Stencil.
        stencil: u8,
    },
}

/// A descriptor used to create a texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensionality.
    pub dimension: TextureDimension,
    /// The size of mip level 0.
    pub size: Extent3D,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// Number of array layers.
    pub array_layer_count: u32,
    /// The texel format.
    pub format: Format,
    /// Samples per texel (1 for non-multisampled).
    pub sample_count: u32,
    /// How the texture will be used.
    pub usage: TextureUsage,
    /// The clear value the driver may optimize for.
    pub clear_value: Option<ClearValue>,
}

impl<'a> TextureDescriptor<'a> {
    /// A single-mip, single-layer 2D texture.
    pub fn new_2d(
        label: impl Into<Cow<'a, str>>,
        width: u32,
        height: u32,
        format: Format,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: Some(label.into()),
            dimension: TextureDimension::D2,
            size: Extent3D::new_2d(width, height),
            mip_level_count: 1,
            array_layer_count: 1,
            format,
            sample_count: 1,
            usage,
            clear_value: None,
        }
    }

    /// The label, or a placeholder.
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed texture>")
    }

    /// Tightly packed size of one subresource in bytes.
    pub fn subresource_size(&self, mip: u32) -> u64 {
        self.size.mip_level_size(mip).texel_count() * u64::from(self.format.bytes_per_texel())
    }

    /// Tightly packed size of every subresource in bytes.
    pub fn total_size(&self) -> u64 {
        let per_layer: u64 = (0..self.mip_level_count)
            .map(|mip| self.subresource_size(mip))
            .sum();
        per_layer * u64::from(self.array_layer_count)
    }

    /// Byte offset of `(mip, layer)` in a tightly packed layer-major layout.
    pub fn subresource_offset(&self, mip: u32, layer: u32) -> u64 {
        let per_layer: u64 = (0..self.mip_level_count)
            .map(|m| self.subresource_size(m))
            .sum();
        let before_mip: u64 = (0..mip).map(|m| self.subresource_size(m)).sum();
        per_layer * u64::from(layer) + before_mip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_sizes_never_reach_zero() {
        let extent = Extent3D::new_2d(16, 4);
        assert_eq!(extent.mip_level_size(1), Extent3D::new_2d(8, 2));
        assert_eq!(extent.mip_level_size(3), Extent3D::new_2d(2, 1));
        assert_eq!(extent.mip_level_size(8), Extent3D::new_2d(1, 1));
    }

    #[test]
    fn packed_layout() {
        let mut desc = TextureDescriptor::new_2d(
            "atlas",
            4,
            4,
            Format::Rgba8Unorm,
            TextureUsage::SAMPLED,
        );
        desc.mip_level_count = 3;
        desc.array_layer_count = 2;

        // 64 + 16 + 4 bytes per layer.
        assert_eq!(desc.subresource_size(0), 64);
        assert_eq!(desc.subresource_size(2), 4);
        assert_eq!(desc.total_size(), 168);
        assert_eq!(desc.subresource_offset(1, 0), 64);
        assert_eq!(desc.subresource_offset(0, 1), 84);
        assert_eq!(desc.subresource_offset(2, 1), 84 + 80);
    }
}
