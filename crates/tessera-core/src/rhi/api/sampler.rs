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

use std::borrow::Cow;

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    #[default]
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Filtering between mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapFilterMode {
    /// Nearest level.
    #[default]
    Nearest,
    /// Linear interpolation between levels.
    Linear,
}

/// Behaviour outside `[0, 1]` texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Repeat.
    Repeat,
    /// Repeat, mirroring every other tile.
    MirrorRepeat,
    /// Use the border colour.
    ClampToBorder,
}

/// A comparison function for depth tests and comparison samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if `new < old`.
    Less,
    /// Passes if `new == old`.
    Equal,
    /// Passes if `new <= old`.
    LessEqual,
    /// Passes if `new > old`.
    Greater,
    /// Passes if `new != old`.
    NotEqual,
    /// Passes if `new >= old`.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// The colour used by [`AddressMode::ClampToBorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    /// `(0, 0, 0, 0)`.
    #[default]
    TransparentBlack,
    /// `(0, 0, 0, 1)`.
    OpaqueBlack,
    /// `(1, 1, 1, 1)`.
    OpaqueWhite,
}

/// A descriptor used to create a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mip filter.
    pub mipmap_filter: MipmapFilterMode,
    /// Addressing along U.
    pub address_mode_u: AddressMode,
    /// Addressing along V.
    pub address_mode_v: AddressMode,
    /// Addressing along W.
    pub address_mode_w: AddressMode,
    /// Maximum anisotropy, 1 disables anisotropic filtering.
    pub anisotropy_clamp: u16,
    /// Turns the sampler into a comparison sampler.
    pub compare: Option<CompareFunction>,
    /// Minimum LOD.
    pub lod_min_clamp: f32,
    /// Maximum LOD.
    pub lod_max_clamp: f32,
    /// Border colour.
    pub border_color: BorderColor,
}

impl Default for SamplerDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: MipmapFilterMode::Nearest,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            anisotropy_clamp: 1,
            compare: None,
            lod_min_clamp: 0.0,
            lod_max_clamp: 1000.0,
            border_color: BorderColor::TransparentBlack,
        }
    }
}

impl SamplerDescriptor<'_> {
    /// Trilinear filtering with repeat addressing.
    pub fn linear_repeat() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: MipmapFilterMode::Linear,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            ..Default::default()
        }
    }

    /// Returns `true` if anisotropic filtering is requested.
    pub fn is_anisotropic(&self) -> bool {
        self.anisotropy_clamp > 1
    }
}
