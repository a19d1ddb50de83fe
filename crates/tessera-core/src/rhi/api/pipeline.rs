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

//! Root signatures, shader stages and pipeline state.

use super::format::{Format, VertexFormat};
use super::sampler::CompareFunction;
use crate::tessera_bitflags;
use std::borrow::Cow;

/// Smallest push-constant block a root signature may have.
pub const MIN_PUSH_CONSTANT_BYTES: u32 = 128;

/// Rounds a requested push-constant size to the size actually reserved.
///
/// Requests below [`MIN_PUSH_CONSTANT_BYTES`] get the minimum; larger requests
/// are rounded up to a whole number of 32-bit values.
pub const fn push_constant_capacity(requested: u32) -> u32 {
    if requested <= MIN_PUSH_CONSTANT_BYTES {
        MIN_PUSH_CONSTANT_BYTES
    } else {
        requested.div_ceil(4) * 4
    }
}

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment (pixel) shader.
    Fragment,
    /// Compute shader.
    Compute,
}

impl ShaderStage {
    /// The suffix used by the shader file naming convention.
    pub const fn file_suffix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
        }
    }
}

tessera_bitflags! {
    /// A set of shader stages.
    pub struct ShaderStages: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
        /// Every stage.
        const ALL = 0b111;
    }
}

/// A descriptor used to create a root signature.
///
/// The bindless table layout is fixed by the device; only the push-constant
/// block is configurable.
#[derive(Debug, Clone)]
pub struct RootSignatureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Requested push-constant bytes, rounded by [`push_constant_capacity`].
    pub push_constant_bytes: u32,
}

/// The resolved layout handed to backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootLayout {
    /// Push-constant bytes actually reserved.
    pub push_constant_bytes: u32,
    /// Capacity of the resource array (binding 0).
    pub max_bindless_resources: u32,
    /// Capacity of the sampler array (binding 1).
    pub max_bindless_samplers: u32,
}

/// Whether vertex data advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Per vertex.
    #[default]
    Vertex,
    /// Per instance.
    Instance,
}

/// One attribute inside a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The attribute's format.
    pub format: VertexFormat,
    /// Offset inside the vertex.
    pub offset: u32,
    /// The shader input location.
    pub location: u32,
}

/// The layout of one vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// Bytes between consecutive elements.
    pub stride: u32,
    /// Per vertex or per instance.
    pub step_mode: VertexStepMode,
    /// Attributes read from this slot.
    pub attributes: Vec<VertexAttribute>,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Points.
    PointList,
    /// Independent lines.
    LineList,
    /// Connected lines.
    LineStrip,
    /// Independent triangles.
    #[default]
    TriangleList,
    /// Connected triangles.
    TriangleStrip,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    #[default]
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// Winding of front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    /// Filled.
    #[default]
    Fill,
    /// Edges only.
    Line,
}

/// Rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerState {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Front face winding.
    pub front_face: FrontFace,
    /// Fill mode.
    pub polygon_mode: PolygonMode,
    /// Constant depth bias.
    pub depth_bias: i32,
    /// Slope-scaled depth bias.
    pub depth_bias_slope_scale: f32,
}

/// Depth/stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// Depth attachment format.
    pub format: Format,
    /// Whether depth is written.
    pub depth_write_enabled: bool,
    /// The depth test.
    pub depth_compare: CompareFunction,
}

/// A blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    One,
    /// Source colour.
    Src,
    /// 1 - source colour.
    OneMinusSrc,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    OneMinusSrcAlpha,
    /// Destination colour.
    Dst,
    /// 1 - destination colour.
    OneMinusDst,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    OneMinusDstAlpha,
}

/// A blend equation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `src + dst`.
    Add,
    /// `src - dst`.
    Subtract,
    /// `dst - src`.
    ReverseSubtract,
    /// `min(src, dst)`.
    Min,
    /// `max(src, dst)`.
    Max,
}

/// One blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Source factor.
    pub src_factor: BlendFactor,
    /// Destination factor.
    pub dst_factor: BlendFactor,
    /// Operator.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// Writes the source unchanged.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    /// Standard alpha blending.
    pub const OVER: Self = Self {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
}

/// Colour and alpha blend equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Colour equation.
    pub color: BlendComponent,
    /// Alpha equation.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// Alpha blending.
    pub const ALPHA_BLENDING: Self = Self {
        color: BlendComponent::OVER,
        alpha: BlendComponent::OVER,
    };
}

tessera_bitflags! {
    /// Which colour channels a target writes.
    pub struct ColorWrites: u32 {
        /// Red.
        const RED = 1 << 0;
        /// Green.
        const GREEN = 1 << 1;
        /// Blue.
        const BLUE = 1 << 2;
        /// Alpha.
        const ALPHA = 1 << 3;
        /// Every channel.
        const ALL = 0b1111;
    }
}

/// Per colour-target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// Target format.
    pub format: Format,
    /// Blending, or `None` to replace.
    pub blend: Option<BlendState>,
    /// Written channels.
    pub write_mask: ColorWrites,
}

impl ColorTargetState {
    /// An opaque target writing every channel.
    pub const fn opaque(format: Format) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }
    }
}

/// Fixed-function state of a graphics pipeline.
///
/// Shaders and the root signature are passed separately as backend objects.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Vertex buffer slots.
    pub vertex_buffers: Vec<VertexBufferLayout>,
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
    /// Rasterizer state.
    pub rasterizer: RasterizerState,
    /// Depth/stencil state, if a depth attachment is used.
    pub depth_stencil: Option<DepthStencilState>,
    /// Colour targets used with dynamic rendering.
    pub color_targets: Vec<ColorTargetState>,
    /// Samples per pixel.
    pub sample_count: u32,
}

impl Default for GraphicsPipelineDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            vertex_buffers: Vec::new(),
            topology: PrimitiveTopology::TriangleList,
            rasterizer: RasterizerState::default(),
            depth_stencil: None,
            color_targets: Vec::new(),
            sample_count: 1,
        }
    }
}

/// State of a compute pipeline.
#[derive(Debug, Clone, Default)]
pub struct ComputePipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constants_round_to_minimum_then_to_words() {
        assert_eq!(push_constant_capacity(0), 128);
        assert_eq!(push_constant_capacity(64), 128);
        assert_eq!(push_constant_capacity(128), 128);
        assert_eq!(push_constant_capacity(129), 132);
        assert_eq!(push_constant_capacity(256), 256);
    }

    #[test]
    fn shader_file_suffixes() {
        assert_eq!(ShaderStage::Vertex.file_suffix(), "vert");
        assert_eq!(ShaderStage::Fragment.file_suffix(), "frag");
        assert_eq!(ShaderStage::Compute.file_suffix(), "comp");
    }
}
