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

use super::native::*;

use tessera_core::rhi::api::{
    AddressMode, BlendFactor, BlendOperation, BorderColor, BufferUsage, CompareFunction, CullMode,
    FilterMode, Format, IndexFormat, MemoryLocation, MipmapFilterMode, PolygonMode,
    PrimitiveTopology, QueueType, ResourceState, SamplerDescriptor, TextureUsage,
    TextureViewDimension, VertexFormat,
};

/// A local extension trait to convert RHI types into D3D12 types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_d3d12()` syntax.
pub trait IntoD3d12<T> {
    /// Consumes self and converts it into a D3D12 type.
    fn into_d3d12(self) -> T;
}

// --- Resource states ---

impl IntoD3d12<D3D12_RESOURCE_STATES> for ResourceState {
    fn into_d3d12(self) -> D3D12_RESOURCE_STATES {
        use D3D12_RESOURCE_STATES as S;
        match self {
            // D3D12 has no undefined state; fresh resources start in COMMON.
            ResourceState::Undefined | ResourceState::Common => S::COMMON,
            ResourceState::VertexBuffer | ResourceState::ConstantBuffer => {
                S::VERTEX_AND_CONSTANT_BUFFER
            }
            ResourceState::IndexBuffer => S::INDEX_BUFFER,
            ResourceState::ShaderResource => {
                S::NON_PIXEL_SHADER_RESOURCE | S::PIXEL_SHADER_RESOURCE
            }
            ResourceState::UnorderedAccess => S::UNORDERED_ACCESS,
            ResourceState::RenderTarget => S::RENDER_TARGET,
            ResourceState::DepthRead => S::DEPTH_READ,
            ResourceState::DepthWrite => S::DEPTH_WRITE,
            ResourceState::CopySource => S::COPY_SOURCE,
            ResourceState::CopyDest => S::COPY_DEST,
            ResourceState::IndirectArgument => S::INDIRECT_ARGUMENT,
            ResourceState::Present => S::PRESENT,
        }
    }
}

/// Recovers the resource state a recorded `D3D12_RESOURCE_BARRIER` half describes.
///
/// Several RHI states share a native state (`VertexBuffer` and `ConstantBuffer`,
/// `Common` and `Present`); the result is always in the same access category
/// as the state that was recorded.
pub fn state_from_d3d12(state: D3D12_RESOURCE_STATES) -> ResourceState {
    use D3D12_RESOURCE_STATES as S;
    if state.is_empty() {
        return ResourceState::Common;
    }
    let table = [
        (S::VERTEX_AND_CONSTANT_BUFFER, ResourceState::VertexBuffer),
        (S::INDEX_BUFFER, ResourceState::IndexBuffer),
        (
            S::NON_PIXEL_SHADER_RESOURCE | S::PIXEL_SHADER_RESOURCE,
            ResourceState::ShaderResource,
        ),
        (S::NON_PIXEL_SHADER_RESOURCE, ResourceState::ShaderResource),
        (S::PIXEL_SHADER_RESOURCE, ResourceState::ShaderResource),
        (S::UNORDERED_ACCESS, ResourceState::UnorderedAccess),
        (S::RENDER_TARGET, ResourceState::RenderTarget),
        (S::DEPTH_READ, ResourceState::DepthRead),
        (S::DEPTH_WRITE, ResourceState::DepthWrite),
        (S::COPY_SOURCE, ResourceState::CopySource),
        (S::COPY_DEST, ResourceState::CopyDest),
        (S::INDIRECT_ARGUMENT, ResourceState::IndirectArgument),
    ];
    table
        .iter()
        .find(|(native, _)| *native == state)
        .map(|(_, rhi)| *rhi)
        .unwrap_or(ResourceState::Common)
}

// --- Formats ---

impl IntoD3d12<DXGI_FORMAT> for Format {
    fn into_d3d12(self) -> DXGI_FORMAT {
        match self {
            Format::R8Unorm => DXGI_FORMAT_R8_UNORM,
            Format::Rg8Unorm => DXGI_FORMAT_R8G8_UNORM,
            Format::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
            Format::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
            Format::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
            Format::Bgra8UnormSrgb => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
            Format::R16Float => DXGI_FORMAT_R16_FLOAT,
            Format::Rg16Float => DXGI_FORMAT_R16G16_FLOAT,
            Format::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
            Format::R32Float => DXGI_FORMAT_R32_FLOAT,
            Format::Rg32Float => DXGI_FORMAT_R32G32_FLOAT,
            Format::Rgb32Float => DXGI_FORMAT_R32G32B32_FLOAT,
            Format::Rgba32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
            Format::R32Uint => DXGI_FORMAT_R32_UINT,
            Format::Rgba32Uint => DXGI_FORMAT_R32G32B32A32_UINT,
            Format::Depth16Unorm => DXGI_FORMAT_D16_UNORM,
            Format::Depth32Float => DXGI_FORMAT_D32_FLOAT,
            Format::Depth24UnormStencil8 => DXGI_FORMAT_D24_UNORM_S8_UINT,
        }
    }
}

impl IntoD3d12<DXGI_FORMAT> for VertexFormat {
    fn into_d3d12(self) -> DXGI_FORMAT {
        match self {
            VertexFormat::Float32 => DXGI_FORMAT_R32_FLOAT,
            VertexFormat::Float32x2 => DXGI_FORMAT_R32G32_FLOAT,
            VertexFormat::Float32x3 => DXGI_FORMAT_R32G32B32_FLOAT,
            VertexFormat::Float32x4 => DXGI_FORMAT_R32G32B32A32_FLOAT,
            VertexFormat::Uint32 => DXGI_FORMAT_R32_UINT,
            VertexFormat::Unorm8x4 => DXGI_FORMAT_R8G8B8A8_UNORM,
        }
    }
}

impl IntoD3d12<DXGI_FORMAT> for IndexFormat {
    fn into_d3d12(self) -> DXGI_FORMAT {
        match self {
            IndexFormat::Uint16 => DXGI_FORMAT_R16_UINT,
            IndexFormat::Uint32 => DXGI_FORMAT_R32_UINT,
        }
    }
}

// --- Memory ---

impl IntoD3d12<D3D12_HEAP_TYPE> for MemoryLocation {
    fn into_d3d12(self) -> D3D12_HEAP_TYPE {
        match self {
            MemoryLocation::GpuOnly => D3D12_HEAP_TYPE_DEFAULT,
            MemoryLocation::CpuToGpu => D3D12_HEAP_TYPE_UPLOAD,
            MemoryLocation::GpuToCpu => D3D12_HEAP_TYPE_READBACK,
        }
    }
}

/// The state a committed resource must be created in on its heap.
pub fn initial_state(heap: D3D12_HEAP_TYPE) -> D3D12_RESOURCE_STATES {
    match heap {
        D3D12_HEAP_TYPE_UPLOAD => D3D12_RESOURCE_STATES::GENERIC_READ,
        D3D12_HEAP_TYPE_READBACK => D3D12_RESOURCE_STATES::COPY_DEST,
        _ => D3D12_RESOURCE_STATES::COMMON,
    }
}

impl IntoD3d12<D3D12_RESOURCE_FLAGS> for BufferUsage {
    fn into_d3d12(self) -> D3D12_RESOURCE_FLAGS {
        if self.contains(BufferUsage::STORAGE) {
            D3D12_RESOURCE_FLAGS::ALLOW_UNORDERED_ACCESS
        } else {
            D3D12_RESOURCE_FLAGS::NONE
        }
    }
}

impl IntoD3d12<D3D12_RESOURCE_FLAGS> for TextureUsage {
    fn into_d3d12(self) -> D3D12_RESOURCE_FLAGS {
        let mut flags = D3D12_RESOURCE_FLAGS::NONE;
        if self.contains(TextureUsage::RENDER_TARGET) {
            flags |= D3D12_RESOURCE_FLAGS::ALLOW_RENDER_TARGET;
        }
        if self.contains(TextureUsage::DEPTH_STENCIL) {
            flags |= D3D12_RESOURCE_FLAGS::ALLOW_DEPTH_STENCIL;
            if !self.contains(TextureUsage::SAMPLED) {
                flags |= D3D12_RESOURCE_FLAGS::DENY_SHADER_RESOURCE;
            }
        }
        if self.contains(TextureUsage::STORAGE) {
            flags |= D3D12_RESOURCE_FLAGS::ALLOW_UNORDERED_ACCESS;
        }
        flags
    }
}

impl IntoD3d12<D3D12_SRV_DIMENSION> for TextureViewDimension {
    fn into_d3d12(self) -> D3D12_SRV_DIMENSION {
        match self {
            TextureViewDimension::D1 => D3D12_SRV_DIMENSION_TEXTURE1D,
            TextureViewDimension::D2 => D3D12_SRV_DIMENSION_TEXTURE2D,
            TextureViewDimension::D2Array => D3D12_SRV_DIMENSION_TEXTURE2DARRAY,
            TextureViewDimension::Cube => D3D12_SRV_DIMENSION_TEXTURECUBE,
            TextureViewDimension::D3 => D3D12_SRV_DIMENSION_TEXTURE3D,
        }
    }
}

// --- Queues ---

impl IntoD3d12<D3D12_COMMAND_LIST_TYPE> for QueueType {
    fn into_d3d12(self) -> D3D12_COMMAND_LIST_TYPE {
        match self {
            QueueType::Graphics => D3D12_COMMAND_LIST_TYPE_DIRECT,
            QueueType::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
            QueueType::Transfer => D3D12_COMMAND_LIST_TYPE_COPY,
        }
    }
}

// --- Sampler ---

fn filter_bit(filter: FilterMode) -> u32 {
    match filter {
        FilterMode::Nearest => 0,
        FilterMode::Linear => 1,
    }
}

impl IntoD3d12<D3D12_FILTER> for &SamplerDescriptor<'_> {
    fn into_d3d12(self) -> D3D12_FILTER {
        let reduction = if self.compare.is_some() {
            D3D12_FILTER_REDUCTION_TYPE_COMPARISON
        } else {
            0
        };
        if self.is_anisotropic() {
            return if reduction == 0 {
                D3D12_FILTER_ANISOTROPIC
            } else {
                D3D12_FILTER_COMPARISON_ANISOTROPIC
            };
        }
        let mip = match self.mipmap_filter {
            MipmapFilterMode::Nearest => 0,
            MipmapFilterMode::Linear => 1,
        };
        encode_basic_filter(
            filter_bit(self.min_filter),
            filter_bit(self.mag_filter),
            mip,
            reduction,
        )
    }
}

impl IntoD3d12<D3D12_TEXTURE_ADDRESS_MODE> for AddressMode {
    fn into_d3d12(self) -> D3D12_TEXTURE_ADDRESS_MODE {
        match self {
            AddressMode::ClampToEdge => D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
            AddressMode::Repeat => D3D12_TEXTURE_ADDRESS_MODE_WRAP,
            AddressMode::MirrorRepeat => D3D12_TEXTURE_ADDRESS_MODE_MIRROR,
            AddressMode::ClampToBorder => D3D12_TEXTURE_ADDRESS_MODE_BORDER,
        }
    }
}

impl IntoD3d12<D3D12_COMPARISON_FUNC> for CompareFunction {
    fn into_d3d12(self) -> D3D12_COMPARISON_FUNC {
        match self {
            CompareFunction::Never => D3D12_COMPARISON_FUNC_NEVER,
            CompareFunction::Less => D3D12_COMPARISON_FUNC_LESS,
            CompareFunction::Equal => D3D12_COMPARISON_FUNC_EQUAL,
            CompareFunction::LessEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
            CompareFunction::Greater => D3D12_COMPARISON_FUNC_GREATER,
            CompareFunction::NotEqual => D3D12_COMPARISON_FUNC_NOT_EQUAL,
            CompareFunction::GreaterEqual => D3D12_COMPARISON_FUNC_GREATER_EQUAL,
            CompareFunction::Always => D3D12_COMPARISON_FUNC_ALWAYS,
        }
    }
}

impl IntoD3d12<[f32; 4]> for BorderColor {
    fn into_d3d12(self) -> [f32; 4] {
        match self {
            BorderColor::TransparentBlack => [0.0; 4],
            BorderColor::OpaqueBlack => [0.0, 0.0, 0.0, 1.0],
            BorderColor::OpaqueWhite => [1.0; 4],
        }
    }
}

// --- Pipeline ---

impl IntoD3d12<D3D_PRIMITIVE_TOPOLOGY> for PrimitiveTopology {
    fn into_d3d12(self) -> D3D_PRIMITIVE_TOPOLOGY {
        match self {
            PrimitiveTopology::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
            PrimitiveTopology::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
            PrimitiveTopology::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
            PrimitiveTopology::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
            PrimitiveTopology::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
        }
    }
}

impl IntoD3d12<D3D12_CULL_MODE> for CullMode {
    fn into_d3d12(self) -> D3D12_CULL_MODE {
        match self {
            CullMode::None => D3D12_CULL_MODE_NONE,
            CullMode::Front => D3D12_CULL_MODE_FRONT,
            CullMode::Back => D3D12_CULL_MODE_BACK,
        }
    }
}

impl IntoD3d12<D3D12_FILL_MODE> for PolygonMode {
    fn into_d3d12(self) -> D3D12_FILL_MODE {
        match self {
            PolygonMode::Fill => D3D12_FILL_MODE_SOLID,
            PolygonMode::Line => D3D12_FILL_MODE_WIREFRAME,
        }
    }
}

impl IntoD3d12<D3D12_BLEND> for BlendFactor {
    fn into_d3d12(self) -> D3D12_BLEND {
        match self {
            BlendFactor::Zero => D3D12_BLEND_ZERO,
            BlendFactor::One => D3D12_BLEND_ONE,
            BlendFactor::Src => D3D12_BLEND_SRC_COLOR,
            BlendFactor::OneMinusSrc => D3D12_BLEND_INV_SRC_COLOR,
            BlendFactor::SrcAlpha => D3D12_BLEND_SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => D3D12_BLEND_INV_SRC_ALPHA,
            BlendFactor::Dst => D3D12_BLEND_DEST_COLOR,
            BlendFactor::OneMinusDst => D3D12_BLEND_INV_DEST_COLOR,
            BlendFactor::DstAlpha => D3D12_BLEND_DEST_ALPHA,
            BlendFactor::OneMinusDstAlpha => D3D12_BLEND_INV_DEST_ALPHA,
        }
    }
}

impl IntoD3d12<D3D12_BLEND_OP> for BlendOperation {
    fn into_d3d12(self) -> D3D12_BLEND_OP {
        match self {
            BlendOperation::Add => D3D12_BLEND_OP_ADD,
            BlendOperation::Subtract => D3D12_BLEND_OP_SUBTRACT,
            BlendOperation::ReverseSubtract => D3D12_BLEND_OP_REV_SUBTRACT,
            BlendOperation::Min => D3D12_BLEND_OP_MIN,
            BlendOperation::Max => D3D12_BLEND_OP_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_survives_the_inverse_mapping() {
        for state in ResourceState::ALL {
            let native: D3D12_RESOURCE_STATES = state.into_d3d12();
            let back = state_from_d3d12(native);
            assert!(back.same_category(state), "{state} came back as {back}");
        }
    }

    #[test]
    fn aliased_states_share_a_native_state() {
        let vb: D3D12_RESOURCE_STATES = ResourceState::VertexBuffer.into_d3d12();
        let cb: D3D12_RESOURCE_STATES = ResourceState::ConstantBuffer.into_d3d12();
        assert_eq!(vb, cb);
        let present: D3D12_RESOURCE_STATES = ResourceState::Present.into_d3d12();
        assert_eq!(present, D3D12_RESOURCE_STATES::COMMON);
    }

    #[test]
    fn upload_heaps_start_in_generic_read() {
        let heap: D3D12_HEAP_TYPE = MemoryLocation::CpuToGpu.into_d3d12();
        assert_eq!(initial_state(heap), D3D12_RESOURCE_STATES::GENERIC_READ);
        let heap: D3D12_HEAP_TYPE = MemoryLocation::GpuToCpu.into_d3d12();
        assert_eq!(initial_state(heap), D3D12_RESOURCE_STATES::COPY_DEST);
    }

    #[test]
    fn depth_only_textures_deny_shader_access() {
        let flags: D3D12_RESOURCE_FLAGS = TextureUsage::DEPTH_STENCIL.into_d3d12();
        assert!(flags.contains(D3D12_RESOURCE_FLAGS::DENY_SHADER_RESOURCE));
        let flags: D3D12_RESOURCE_FLAGS =
            (TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED).into_d3d12();
        assert!(!flags.contains(D3D12_RESOURCE_FLAGS::DENY_SHADER_RESOURCE));
    }

    #[test]
    fn comparison_samplers_use_the_comparison_reduction() {
        let desc = SamplerDescriptor {
            compare: Some(CompareFunction::LessEqual),
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            ..Default::default()
        };
        let filter: D3D12_FILTER = (&desc).into_d3d12();
        assert_eq!(filter.0 >> 7, D3D12_FILTER_REDUCTION_TYPE_COMPARISON);
    }
}
