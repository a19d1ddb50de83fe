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

//! Texel, vertex and index formats.

use serde::{Deserialize, Serialize};

/// The memory layout of one texel.
///
/// Each backend translates these into its own enum (`VkFormat`, `DXGI_FORMAT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// One 8-bit normalized channel.
    R8Unorm,
    /// Two 8-bit normalized channels.
    Rg8Unorm,
    /// Four 8-bit normalized channels.
    Rgba8Unorm,
    /// Four 8-bit normalized channels, sRGB encoded.
    Rgba8UnormSrgb,
    /// Four 8-bit normalized channels in BGRA order.
    Bgra8Unorm,
    /// Four 8-bit normalized channels in BGRA order, sRGB encoded.
    Bgra8UnormSrgb,
    /// One 16-bit float channel.
    R16Float,
    /// Two 16-bit float channels.
    Rg16Float,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// One 32-bit float channel.
    R32Float,
    /// Two 32-bit float channels.
    Rg32Float,
    /// Three 32-bit float channels.
    Rgb32Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// One 32-bit unsigned integer channel.
    R32Uint,
    /// Four 32-bit unsigned integer channels.
    Rgba32Uint,
    /// 16-bit normalized depth.
    Depth16Unorm,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit normalized depth and 8-bit stencil.
    Depth24UnormStencil8,
}

impl Format {
    /// Size of one texel in bytes.
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            Format::R8Unorm => 1,
            Format::Rg8Unorm | Format::R16Float | Format::Depth16Unorm => 2,
            Format::Rgba8Unorm
            | Format::Rgba8UnormSrgb
            | Format::Bgra8Unorm
            | Format::Bgra8UnormSrgb
            | Format::Rg16Float
            | Format::R32Float
            | Format::R32Uint
            | Format::Depth32Float
            | Format::Depth24UnormStencil8 => 4,
            Format::Rgba16Float | Format::Rg32Float => 8,
            Format::Rgb32Float => 12,
            Format::Rgba32Float | Format::Rgba32Uint => 16,
        }
    }

    /// Returns `true` for depth and depth/stencil formats.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            Format::Depth16Unorm | Format::Depth32Float | Format::Depth24UnormStencil8
        )
    }

    /// Returns `true` if the format carries a stencil aspect.
    pub const fn has_stencil(self) -> bool {
        matches!(self, Format::Depth24UnormStencil8)
    }

    /// Returns `true` for sRGB encoded formats.
    pub const fn is_srgb(self) -> bool {
        matches!(self, Format::Rgba8UnormSrgb | Format::Bgra8UnormSrgb)
    }

    /// Packs a clear value into the bytes of one texel.
    ///
    /// Returns `None` for formats whose clear value cannot be expressed on the host
    /// (half floats).
    pub fn pack_clear(self, color: [f32; 4], depth: f32, stencil: u8) -> Option<Vec<u8>> {
        let unorm8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        let texel = match self {
            Format::R8Unorm => vec![unorm8(color[0])],
            Format::Rg8Unorm => vec![unorm8(color[0]), unorm8(color[1])],
            Format::Rgba8Unorm | Format::Rgba8UnormSrgb => color.map(unorm8).to_vec(),
            Format::Bgra8Unorm | Format::Bgra8UnormSrgb => {
                vec![
                    unorm8(color[2]),
                    unorm8(color[1]),
                    unorm8(color[0]),
                    unorm8(color[3]),
                ]
            }
            Format::R32Float => color[0].to_le_bytes().to_vec(),
            Format::Rg32Float => bytemuck::cast_slice(&color[..2]).to_vec(),
            Format::Rgb32Float => bytemuck::cast_slice(&color[..3]).to_vec(),
            Format::Rgba32Float => bytemuck::cast_slice(&color).to_vec(),
            Format::R32Uint => (color[0] as u32).to_le_bytes().to_vec(),
            Format::Rgba32Uint => {
                let ints = color.map(|v| v as u32);
                bytemuck::cast_slice(&ints).to_vec()
            }
            Format::Depth16Unorm => {
                (((depth.clamp(0.0, 1.0) * 65535.0) + 0.5) as u16).to_le_bytes().to_vec()
            }
            Format::Depth32Float => depth.to_le_bytes().to_vec(),
            Format::Depth24UnormStencil8 => {
                let d = ((depth.clamp(0.0, 1.0) * 16_777_215.0) + 0.5) as u32;
                (d | (u32::from(stencil) << 24)).to_le_bytes().to_vec()
            }
            Format::R16Float | Format::Rg16Float | Format::Rgba16Float => return None,
        };
        Some(texel)
    }
}

/// The width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// The format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
    /// Four 8-bit unsigned normalized values.
    Unorm8x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub const fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Unorm8x4 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_sizes() {
        assert_eq!(Format::R8Unorm.bytes_per_texel(), 1);
        assert_eq!(Format::Rgba8Unorm.bytes_per_texel(), 4);
        assert_eq!(Format::Rgba16Float.bytes_per_texel(), 8);
        assert_eq!(Format::Rgba32Float.bytes_per_texel(), 16);
        assert_eq!(Format::Depth24UnormStencil8.bytes_per_texel(), 4);
    }

    #[test]
    fn depth_classification() {
        assert!(Format::Depth32Float.is_depth());
        assert!(!Format::Depth32Float.has_stencil());
        assert!(Format::Depth24UnormStencil8.has_stencil());
        assert!(!Format::Bgra8UnormSrgb.is_depth());
        assert!(Format::Bgra8UnormSrgb.is_srgb());
    }

    #[test]
    fn clear_values_pack_into_one_texel() {
        let red = [1.0, 0.0, 0.0, 1.0];
        assert_eq!(
            Format::Rgba8Unorm.pack_clear(red, 0.0, 0),
            Some(vec![255, 0, 0, 255])
        );
        assert_eq!(
            Format::Bgra8Unorm.pack_clear(red, 0.0, 0),
            Some(vec![0, 0, 255, 255])
        );
        assert_eq!(
            Format::Depth32Float.pack_clear(red, 1.0, 0),
            Some(1.0f32.to_le_bytes().to_vec())
        );
        assert_eq!(Format::Rgba16Float.pack_clear(red, 0.0, 0), None);

        for format in [Format::R8Unorm, Format::Rgb32Float, Format::Depth24UnormStencil8] {
            let texel = format.pack_clear(red, 0.5, 3).unwrap();
            assert_eq!(texel.len() as u32, format.bytes_per_texel());
        }
    }
}
