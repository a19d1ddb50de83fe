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

use ash::vk;

use tessera_core::rhi::api::{
    AddressMode, BlendFactor, BlendOperation, BorderColor, BufferUsage, BufferViewKind,
    ColorWrites, CompareFunction, CullMode, Extent3D, FilterMode, Format, FrontFace, IndexFormat,
    MipmapFilterMode, Origin3D, PolygonMode, PresentMode, PrimitiveTopology, QueueType,
    ResourceState, ShaderStage, StoreOp, TextureUsage, TextureViewDimension, VertexFormat,
    VertexStepMode,
};

/// A local extension trait to convert RHI types into Vulkan types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_vk()` syntax.
pub trait IntoVk<T> {
    /// Consumes self and converts it into a Vulkan type.
    fn into_vk(self) -> T;
}

// --- Resource states ---

/// The sync2 vocabulary of one resource state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkStateInfo {
    /// Memory accesses performed in the state.
    pub access: vk::AccessFlags2,
    /// Pipeline stages performing them.
    pub stage: vk::PipelineStageFlags2,
    /// Image layout. `UNDEFINED` for buffer-only states.
    pub layout: vk::ImageLayout,
}

fn all_shaders() -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::VERTEX_SHADER
        | vk::PipelineStageFlags2::FRAGMENT_SHADER
        | vk::PipelineStageFlags2::COMPUTE_SHADER
}

impl IntoVk<VkStateInfo> for ResourceState {
    fn into_vk(self) -> VkStateInfo {
        use vk::AccessFlags2 as A;
        use vk::ImageLayout as L;
        use vk::PipelineStageFlags2 as S;
        let (access, stage, layout) = match self {
            ResourceState::Undefined => (A::NONE, S::TOP_OF_PIPE, L::UNDEFINED),
            ResourceState::Common => {
                (A::MEMORY_READ | A::MEMORY_WRITE, S::ALL_COMMANDS, L::GENERAL)
            }
            ResourceState::VertexBuffer => {
                (A::VERTEX_ATTRIBUTE_READ, S::VERTEX_ATTRIBUTE_INPUT, L::UNDEFINED)
            }
            ResourceState::IndexBuffer => (A::INDEX_READ, S::INDEX_INPUT, L::UNDEFINED),
            ResourceState::ConstantBuffer => (A::UNIFORM_READ, all_shaders(), L::UNDEFINED),
            ResourceState::ShaderResource => {
                (A::SHADER_READ, all_shaders(), L::SHADER_READ_ONLY_OPTIMAL)
            }
            ResourceState::UnorderedAccess => {
                (A::SHADER_READ | A::SHADER_WRITE, all_shaders(), L::GENERAL)
            }
            ResourceState::RenderTarget => (
                A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE,
                S::COLOR_ATTACHMENT_OUTPUT,
                L::COLOR_ATTACHMENT_OPTIMAL,
            ),
            ResourceState::DepthRead => (
                A::DEPTH_STENCIL_ATTACHMENT_READ,
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                L::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            ),
            ResourceState::DepthWrite => (
                A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ),
            ResourceState::CopySource => (A::TRANSFER_READ, S::COPY, L::TRANSFER_SRC_OPTIMAL),
            ResourceState::CopyDest => (A::TRANSFER_WRITE, S::COPY, L::TRANSFER_DST_OPTIMAL),
            ResourceState::IndirectArgument => {
                (A::INDIRECT_COMMAND_READ, S::DRAW_INDIRECT, L::UNDEFINED)
            }
            ResourceState::Present => (A::NONE, S::BOTTOM_OF_PIPE, L::PRESENT_SRC_KHR),
        };
        VkStateInfo {
            access,
            stage,
            layout,
        }
    }
}

/// Recovers the resource state a recorded barrier half describes.
///
/// Access masks identify the state; the layout only separates `Undefined` from
/// `Present`, which both perform no access.
pub fn state_from_vk(access: vk::AccessFlags2, layout: vk::ImageLayout) -> ResourceState {
    use vk::AccessFlags2 as A;
    if access == A::NONE {
        return if layout == vk::ImageLayout::PRESENT_SRC_KHR {
            ResourceState::Present
        } else {
            ResourceState::Undefined
        };
    }
    let table = [
        (A::VERTEX_ATTRIBUTE_READ, ResourceState::VertexBuffer),
        (A::INDEX_READ, ResourceState::IndexBuffer),
        (A::UNIFORM_READ, ResourceState::ConstantBuffer),
        (A::SHADER_READ, ResourceState::ShaderResource),
        (A::SHADER_READ | A::SHADER_WRITE, ResourceState::UnorderedAccess),
        (
            A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE,
            ResourceState::RenderTarget,
        ),
        (A::DEPTH_STENCIL_ATTACHMENT_READ, ResourceState::DepthRead),
        (
            A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ResourceState::DepthWrite,
        ),
        (A::TRANSFER_READ, ResourceState::CopySource),
        (A::TRANSFER_WRITE, ResourceState::CopyDest),
        (A::INDIRECT_COMMAND_READ, ResourceState::IndirectArgument),
    ];
    table
        .iter()
        .find(|(mask, _)| *mask == access)
        .map(|(_, state)| *state)
        .unwrap_or(ResourceState::Common)
}

// --- Formats ---

impl IntoVk<vk::Format> for Format {
    fn into_vk(self) -> vk::Format {
        match self {
            Format::R8Unorm => vk::Format::R8_UNORM,
            Format::Rg8Unorm => vk::Format::R8G8_UNORM,
            Format::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            Format::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
            Format::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Format::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
            Format::R16Float => vk::Format::R16_SFLOAT,
            Format::Rg16Float => vk::Format::R16G16_SFLOAT,
            Format::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
            Format::R32Float => vk::Format::R32_SFLOAT,
            Format::Rg32Float => vk::Format::R32G32_SFLOAT,
            Format::Rgb32Float => vk::Format::R32G32B32_SFLOAT,
            Format::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
            Format::R32Uint => vk::Format::R32_UINT,
            Format::Rgba32Uint => vk::Format::R32G32B32A32_UINT,
            Format::Depth16Unorm => vk::Format::D16_UNORM,
            Format::Depth32Float => vk::Format::D32_SFLOAT,
            Format::Depth24UnormStencil8 => vk::Format::D24_UNORM_S8_UINT,
        }
    }
}

impl IntoVk<vk::Format> for VertexFormat {
    fn into_vk(self) -> vk::Format {
        match self {
            VertexFormat::Float32 => vk::Format::R32_SFLOAT,
            VertexFormat::Float32x2 => vk::Format::R32G32_SFLOAT,
            VertexFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
            VertexFormat::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
            VertexFormat::Uint32 => vk::Format::R32_UINT,
            VertexFormat::Unorm8x4 => vk::Format::R8G8B8A8_UNORM,
        }
    }
}

impl IntoVk<vk::IndexType> for IndexFormat {
    fn into_vk(self) -> vk::IndexType {
        match self {
            IndexFormat::Uint16 => vk::IndexType::UINT16,
            IndexFormat::Uint32 => vk::IndexType::UINT32,
        }
    }
}

/// The aspects of a format.
pub fn aspect_of(format: Format) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

// --- Usages ---

impl IntoVk<vk::BufferUsageFlags> for BufferUsage {
    fn into_vk(self) -> vk::BufferUsageFlags {
        let mut flags = vk::BufferUsageFlags::empty();
        if self.contains(BufferUsage::COPY_SRC) {
            flags |= vk::BufferUsageFlags::TRANSFER_SRC;
        }
        if self.contains(BufferUsage::COPY_DST) {
            flags |= vk::BufferUsageFlags::TRANSFER_DST;
        }
        if self.contains(BufferUsage::VERTEX) {
            flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if self.contains(BufferUsage::INDEX) {
            flags |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        if self.contains(BufferUsage::UNIFORM) {
            flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
        }
        if self.contains(BufferUsage::STORAGE) {
            flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
        }
        if self.contains(BufferUsage::INDIRECT) {
            flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
        }
        flags
    }
}

impl IntoVk<vk::ImageUsageFlags> for TextureUsage {
    fn into_vk(self) -> vk::ImageUsageFlags {
        let mut flags = vk::ImageUsageFlags::empty();
        if self.contains(TextureUsage::COPY_SRC) {
            flags |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if self.contains(TextureUsage::COPY_DST) {
            flags |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if self.contains(TextureUsage::SAMPLED) {
            flags |= vk::ImageUsageFlags::SAMPLED;
        }
        if self.contains(TextureUsage::STORAGE) {
            flags |= vk::ImageUsageFlags::STORAGE;
        }
        if self.contains(TextureUsage::RENDER_TARGET) {
            flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
        if self.contains(TextureUsage::DEPTH_STENCIL) {
            flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        flags
    }
}

impl IntoVk<vk::DescriptorType> for BufferViewKind {
    fn into_vk(self) -> vk::DescriptorType {
        match self {
            BufferViewKind::Uniform => vk::DescriptorType::UNIFORM_BUFFER,
            BufferViewKind::Storage | BufferViewKind::StorageReadWrite => {
                vk::DescriptorType::STORAGE_BUFFER
            }
        }
    }
}

impl IntoVk<vk::ImageViewType> for TextureViewDimension {
    fn into_vk(self) -> vk::ImageViewType {
        match self {
            TextureViewDimension::D1 => vk::ImageViewType::TYPE_1D,
            TextureViewDimension::D2 => vk::ImageViewType::TYPE_2D,
            TextureViewDimension::D2Array => vk::ImageViewType::TYPE_2D_ARRAY,
            TextureViewDimension::Cube => vk::ImageViewType::CUBE,
            TextureViewDimension::D3 => vk::ImageViewType::TYPE_3D,
        }
    }
}

// --- Geometry ---

impl IntoVk<vk::Extent3D> for Extent3D {
    fn into_vk(self) -> vk::Extent3D {
        vk::Extent3D {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

impl IntoVk<vk::Offset3D> for Origin3D {
    fn into_vk(self) -> vk::Offset3D {
        vk::Offset3D {
            x: self.x as i32,
            y: self.y as i32,
            z: self.z as i32,
        }
    }
}

/// Converts back to RHI coordinates when lowering.
pub fn origin_from_vk(offset: vk::Offset3D) -> Origin3D {
    Origin3D {
        x: offset.x.max(0) as u32,
        y: offset.y.max(0) as u32,
        z: offset.z.max(0) as u32,
    }
}

/// Converts back to RHI extents when lowering.
pub fn extent_from_vk(extent: vk::Extent3D) -> Extent3D {
    Extent3D {
        width: extent.width,
        height: extent.height,
        depth: extent.depth,
    }
}

// --- Sampler ---

impl IntoVk<vk::Filter> for FilterMode {
    fn into_vk(self) -> vk::Filter {
        match self {
            FilterMode::Nearest => vk::Filter::NEAREST,
            FilterMode::Linear => vk::Filter::LINEAR,
        }
    }
}

impl IntoVk<vk::SamplerMipmapMode> for MipmapFilterMode {
    fn into_vk(self) -> vk::SamplerMipmapMode {
        match self {
            MipmapFilterMode::Nearest => vk::SamplerMipmapMode::NEAREST,
            MipmapFilterMode::Linear => vk::SamplerMipmapMode::LINEAR,
        }
    }
}

impl IntoVk<vk::SamplerAddressMode> for AddressMode {
    fn into_vk(self) -> vk::SamplerAddressMode {
        match self {
            AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
            AddressMode::MirrorRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

impl IntoVk<vk::CompareOp> for CompareFunction {
    fn into_vk(self) -> vk::CompareOp {
        match self {
            CompareFunction::Never => vk::CompareOp::NEVER,
            CompareFunction::Less => vk::CompareOp::LESS,
            CompareFunction::Equal => vk::CompareOp::EQUAL,
            CompareFunction::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
            CompareFunction::Greater => vk::CompareOp::GREATER,
            CompareFunction::NotEqual => vk::CompareOp::NOT_EQUAL,
            CompareFunction::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
            CompareFunction::Always => vk::CompareOp::ALWAYS,
        }
    }
}

impl IntoVk<vk::BorderColor> for BorderColor {
    fn into_vk(self) -> vk::BorderColor {
        match self {
            BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
            BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
            BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        }
    }
}

// --- Pipeline ---

impl IntoVk<vk::ShaderStageFlags> for ShaderStage {
    fn into_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }
}

impl IntoVk<vk::PrimitiveTopology> for PrimitiveTopology {
    fn into_vk(self) -> vk::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
            PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
            PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
            PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
            PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        }
    }
}

impl IntoVk<vk::CullModeFlags> for CullMode {
    fn into_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

impl IntoVk<vk::FrontFace> for FrontFace {
    fn into_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::Ccw => vk::FrontFace::COUNTER_CLOCKWISE,
            FrontFace::Cw => vk::FrontFace::CLOCKWISE,
        }
    }
}

impl IntoVk<vk::PolygonMode> for PolygonMode {
    fn into_vk(self) -> vk::PolygonMode {
        match self {
            PolygonMode::Fill => vk::PolygonMode::FILL,
            PolygonMode::Line => vk::PolygonMode::LINE,
        }
    }
}

impl IntoVk<vk::VertexInputRate> for VertexStepMode {
    fn into_vk(self) -> vk::VertexInputRate {
        match self {
            VertexStepMode::Vertex => vk::VertexInputRate::VERTEX,
            VertexStepMode::Instance => vk::VertexInputRate::INSTANCE,
        }
    }
}

impl IntoVk<vk::BlendFactor> for BlendFactor {
    fn into_vk(self) -> vk::BlendFactor {
        match self {
            BlendFactor::Zero => vk::BlendFactor::ZERO,
            BlendFactor::One => vk::BlendFactor::ONE,
            BlendFactor::Src => vk::BlendFactor::SRC_COLOR,
            BlendFactor::OneMinusSrc => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            BlendFactor::Dst => vk::BlendFactor::DST_COLOR,
            BlendFactor::OneMinusDst => vk::BlendFactor::ONE_MINUS_DST_COLOR,
            BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl IntoVk<vk::BlendOp> for BlendOperation {
    fn into_vk(self) -> vk::BlendOp {
        match self {
            BlendOperation::Add => vk::BlendOp::ADD,
            BlendOperation::Subtract => vk::BlendOp::SUBTRACT,
            BlendOperation::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
            BlendOperation::Min => vk::BlendOp::MIN,
            BlendOperation::Max => vk::BlendOp::MAX,
        }
    }
}

impl IntoVk<vk::ColorComponentFlags> for ColorWrites {
    fn into_vk(self) -> vk::ColorComponentFlags {
        let mut flags = vk::ColorComponentFlags::empty();
        if self.contains(ColorWrites::RED) {
            flags |= vk::ColorComponentFlags::R;
        }
        if self.contains(ColorWrites::GREEN) {
            flags |= vk::ColorComponentFlags::G;
        }
        if self.contains(ColorWrites::BLUE) {
            flags |= vk::ColorComponentFlags::B;
        }
        if self.contains(ColorWrites::ALPHA) {
            flags |= vk::ColorComponentFlags::A;
        }
        flags
    }
}

impl IntoVk<vk::AttachmentStoreOp> for StoreOp {
    fn into_vk(self) -> vk::AttachmentStoreOp {
        match self {
            StoreOp::Store => vk::AttachmentStoreOp::STORE,
            StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}

// --- Presentation and queues ---

impl IntoVk<vk::PresentModeKHR> for PresentMode {
    fn into_vk(self) -> vk::PresentModeKHR {
        match self {
            PresentMode::Fifo => vk::PresentModeKHR::FIFO,
            PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        }
    }
}

impl IntoVk<vk::QueueFlags> for QueueType {
    fn into_vk(self) -> vk::QueueFlags {
        match self {
            QueueType::Graphics => {
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER
            }
            QueueType::Compute => vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            QueueType::Transfer => vk::QueueFlags::TRANSFER,
        }
    }
}

/// The queue family index used for a queue type.
pub fn queue_family(queue_type: QueueType) -> u32 {
    match queue_type {
        QueueType::Graphics => 0,
        QueueType::Compute => 1,
        QueueType::Transfer => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_survives_the_inverse_mapping() {
        for state in ResourceState::ALL {
            let info: VkStateInfo = state.into_vk();
            let back = state_from_vk(info.access, info.layout);
            assert!(
                back.same_category(state),
                "{state} came back as {back}"
            );
        }
    }

    #[test]
    fn shader_resource_and_present_layouts() {
        let srv: VkStateInfo = ResourceState::ShaderResource.into_vk();
        assert_eq!(srv.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let present: VkStateInfo = ResourceState::Present.into_vk();
        assert_eq!(present.layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(present.stage, vk::PipelineStageFlags2::BOTTOM_OF_PIPE);
        assert_eq!(
            state_from_vk(vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR),
            ResourceState::Present
        );
    }

    #[test]
    fn common_and_unordered_access_are_told_apart() {
        let common: VkStateInfo = ResourceState::Common.into_vk();
        let uav: VkStateInfo = ResourceState::UnorderedAccess.into_vk();
        assert_eq!(common.layout, uav.layout);
        assert_eq!(state_from_vk(common.access, common.layout), ResourceState::Common);
        assert_eq!(
            state_from_vk(uav.access, uav.layout),
            ResourceState::UnorderedAccess
        );
    }

    #[test]
    fn depth_stencil_aspects() {
        assert_eq!(aspect_of(Format::Rgba8Unorm), vk::ImageAspectFlags::COLOR);
        assert_eq!(aspect_of(Format::Depth32Float), vk::ImageAspectFlags::DEPTH);
        assert!(aspect_of(Format::Depth24UnormStencil8).contains(vk::ImageAspectFlags::STENCIL));
    }
}
