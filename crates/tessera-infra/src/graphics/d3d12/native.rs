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

//! The subset of the D3D12 and DXGI vocabulary the backend records.
//!
//! Names and values follow `d3d12.h` / `dxgiformat.h` so recorded command
//! lists read like the native API.

#![allow(non_camel_case_types, non_snake_case)]

use tessera_core::tessera_bitflags;

tessera_bitflags! {
    /// `D3D12_RESOURCE_STATES`.
    pub struct D3D12_RESOURCE_STATES: u32 {
        /// `D3D12_RESOURCE_STATE_COMMON`.
        const COMMON = 0;
        /// `D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER`.
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        /// `D3D12_RESOURCE_STATE_INDEX_BUFFER`.
        const INDEX_BUFFER = 0x2;
        /// `D3D12_RESOURCE_STATE_RENDER_TARGET`.
        const RENDER_TARGET = 0x4;
        /// `D3D12_RESOURCE_STATE_UNORDERED_ACCESS`.
        const UNORDERED_ACCESS = 0x8;
        /// `D3D12_RESOURCE_STATE_DEPTH_WRITE`.
        const DEPTH_WRITE = 0x10;
        /// `D3D12_RESOURCE_STATE_DEPTH_READ`.
        const DEPTH_READ = 0x20;
        /// `D3D12_RESOURCE_STATE_NON_PIXEL_SHADER_RESOURCE`.
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        /// `D3D12_RESOURCE_STATE_PIXEL_SHADER_RESOURCE`.
        const PIXEL_SHADER_RESOURCE = 0x80;
        /// `D3D12_RESOURCE_STATE_INDIRECT_ARGUMENT`.
        const INDIRECT_ARGUMENT = 0x200;
        /// `D3D12_RESOURCE_STATE_COPY_DEST`.
        const COPY_DEST = 0x400;
        /// `D3D12_RESOURCE_STATE_COPY_SOURCE`.
        const COPY_SOURCE = 0x800;
        /// `D3D12_RESOURCE_STATE_GENERIC_READ`, the required state of upload heaps.
        const GENERIC_READ = 0xAC3;
        /// `D3D12_RESOURCE_STATE_PRESENT`, an alias of `COMMON`.
        const PRESENT = 0;
    }
}

tessera_bitflags! {
    /// `D3D12_RESOURCE_FLAGS`.
    pub struct D3D12_RESOURCE_FLAGS: u32 {
        /// `D3D12_RESOURCE_FLAG_NONE`.
        const NONE = 0;
        /// `D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET`.
        const ALLOW_RENDER_TARGET = 0x1;
        /// `D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL`.
        const ALLOW_DEPTH_STENCIL = 0x2;
        /// `D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS`.
        const ALLOW_UNORDERED_ACCESS = 0x4;
        /// `D3D12_RESOURCE_FLAG_DENY_SHADER_RESOURCE`.
        const DENY_SHADER_RESOURCE = 0x8;
    }
}

/// `DXGI_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DXGI_FORMAT(pub u32);

pub const DXGI_FORMAT_UNKNOWN: DXGI_FORMAT = DXGI_FORMAT(0);
pub const DXGI_FORMAT_R32G32B32A32_FLOAT: DXGI_FORMAT = DXGI_FORMAT(2);
pub const DXGI_FORMAT_R32G32B32A32_UINT: DXGI_FORMAT = DXGI_FORMAT(3);
pub const DXGI_FORMAT_R32G32B32_FLOAT: DXGI_FORMAT = DXGI_FORMAT(6);
pub const DXGI_FORMAT_R16G16B16A16_FLOAT: DXGI_FORMAT = DXGI_FORMAT(10);
pub const DXGI_FORMAT_R32G32_FLOAT: DXGI_FORMAT = DXGI_FORMAT(16);
pub const DXGI_FORMAT_R8G8B8A8_UNORM: DXGI_FORMAT = DXGI_FORMAT(28);
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: DXGI_FORMAT = DXGI_FORMAT(29);
pub const DXGI_FORMAT_R16G16_FLOAT: DXGI_FORMAT = DXGI_FORMAT(34);
pub const DXGI_FORMAT_D32_FLOAT: DXGI_FORMAT = DXGI_FORMAT(40);
pub const DXGI_FORMAT_R32_FLOAT: DXGI_FORMAT = DXGI_FORMAT(41);
pub const DXGI_FORMAT_R32_UINT: DXGI_FORMAT = DXGI_FORMAT(42);
pub const DXGI_FORMAT_D24_UNORM_S8_UINT: DXGI_FORMAT = DXGI_FORMAT(45);
pub const DXGI_FORMAT_R8G8_UNORM: DXGI_FORMAT = DXGI_FORMAT(49);
pub const DXGI_FORMAT_R16_FLOAT: DXGI_FORMAT = DXGI_FORMAT(54);
pub const DXGI_FORMAT_D16_UNORM: DXGI_FORMAT = DXGI_FORMAT(55);
pub const DXGI_FORMAT_R16_UINT: DXGI_FORMAT = DXGI_FORMAT(57);
pub const DXGI_FORMAT_R8_UNORM: DXGI_FORMAT = DXGI_FORMAT(61);
pub const DXGI_FORMAT_B8G8R8A8_UNORM: DXGI_FORMAT = DXGI_FORMAT(87);
pub const DXGI_FORMAT_B8G8R8A8_UNORM_SRGB: DXGI_FORMAT = DXGI_FORMAT(91);

/// `D3D12_HEAP_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_HEAP_TYPE(pub i32);

pub const D3D12_HEAP_TYPE_DEFAULT: D3D12_HEAP_TYPE = D3D12_HEAP_TYPE(1);
pub const D3D12_HEAP_TYPE_UPLOAD: D3D12_HEAP_TYPE = D3D12_HEAP_TYPE(2);
pub const D3D12_HEAP_TYPE_READBACK: D3D12_HEAP_TYPE = D3D12_HEAP_TYPE(3);

/// `D3D12_COMMAND_LIST_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_COMMAND_LIST_TYPE(pub i32);

pub const D3D12_COMMAND_LIST_TYPE_DIRECT: D3D12_COMMAND_LIST_TYPE = D3D12_COMMAND_LIST_TYPE(0);
pub const D3D12_COMMAND_LIST_TYPE_COMPUTE: D3D12_COMMAND_LIST_TYPE = D3D12_COMMAND_LIST_TYPE(2);
pub const D3D12_COMMAND_LIST_TYPE_COPY: D3D12_COMMAND_LIST_TYPE = D3D12_COMMAND_LIST_TYPE(3);

/// `D3D12_DESCRIPTOR_HEAP_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_DESCRIPTOR_HEAP_TYPE(pub i32);

pub const D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV: D3D12_DESCRIPTOR_HEAP_TYPE =
    D3D12_DESCRIPTOR_HEAP_TYPE(0);
pub const D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER: D3D12_DESCRIPTOR_HEAP_TYPE =
    D3D12_DESCRIPTOR_HEAP_TYPE(1);
pub const D3D12_DESCRIPTOR_HEAP_TYPE_RTV: D3D12_DESCRIPTOR_HEAP_TYPE =
    D3D12_DESCRIPTOR_HEAP_TYPE(2);
pub const D3D12_DESCRIPTOR_HEAP_TYPE_DSV: D3D12_DESCRIPTOR_HEAP_TYPE =
    D3D12_DESCRIPTOR_HEAP_TYPE(3);

/// `D3D12_PRIMITIVE_TOPOLOGY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D_PRIMITIVE_TOPOLOGY(pub i32);

pub const D3D_PRIMITIVE_TOPOLOGY_POINTLIST: D3D_PRIMITIVE_TOPOLOGY = D3D_PRIMITIVE_TOPOLOGY(1);
pub const D3D_PRIMITIVE_TOPOLOGY_LINELIST: D3D_PRIMITIVE_TOPOLOGY = D3D_PRIMITIVE_TOPOLOGY(2);
pub const D3D_PRIMITIVE_TOPOLOGY_LINESTRIP: D3D_PRIMITIVE_TOPOLOGY = D3D_PRIMITIVE_TOPOLOGY(3);
pub const D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST: D3D_PRIMITIVE_TOPOLOGY = D3D_PRIMITIVE_TOPOLOGY(4);
pub const D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP: D3D_PRIMITIVE_TOPOLOGY =
    D3D_PRIMITIVE_TOPOLOGY(5);

/// `D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE(pub i32);

type BeginningAccess = D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE;

pub const D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_DISCARD: BeginningAccess =
    D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE(0);
pub const D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_PRESERVE: BeginningAccess =
    D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE(1);
pub const D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_CLEAR: BeginningAccess =
    D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE(2);

/// `D3D12_RENDER_PASS_ENDING_ACCESS_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_RENDER_PASS_ENDING_ACCESS_TYPE(pub i32);

pub const D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_DISCARD: D3D12_RENDER_PASS_ENDING_ACCESS_TYPE =
    D3D12_RENDER_PASS_ENDING_ACCESS_TYPE(0);
pub const D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_PRESERVE: D3D12_RENDER_PASS_ENDING_ACCESS_TYPE =
    D3D12_RENDER_PASS_ENDING_ACCESS_TYPE(1);

/// `D3D12_FILTER`, built with [`encode_basic_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_FILTER(pub u32);

pub const D3D12_FILTER_ANISOTROPIC: D3D12_FILTER = D3D12_FILTER(0x55);
pub const D3D12_FILTER_COMPARISON_ANISOTROPIC: D3D12_FILTER = D3D12_FILTER(0xD5);

/// `D3D12_FILTER_REDUCTION_TYPE_COMPARISON`.
pub const D3D12_FILTER_REDUCTION_TYPE_COMPARISON: u32 = 1;

/// `D3D12_ENCODE_BASIC_FILTER`. Each filter argument is 0 (point) or 1 (linear).
pub const fn encode_basic_filter(min: u32, mag: u32, mip: u32, reduction: u32) -> D3D12_FILTER {
    D3D12_FILTER(((min & 1) << 4) | ((mag & 1) << 2) | (mip & 1) | ((reduction & 3) << 7))
}

/// `D3D12_TEXTURE_ADDRESS_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_TEXTURE_ADDRESS_MODE(pub i32);

pub const D3D12_TEXTURE_ADDRESS_MODE_WRAP: D3D12_TEXTURE_ADDRESS_MODE =
    D3D12_TEXTURE_ADDRESS_MODE(1);
pub const D3D12_TEXTURE_ADDRESS_MODE_MIRROR: D3D12_TEXTURE_ADDRESS_MODE =
    D3D12_TEXTURE_ADDRESS_MODE(2);
pub const D3D12_TEXTURE_ADDRESS_MODE_CLAMP: D3D12_TEXTURE_ADDRESS_MODE =
    D3D12_TEXTURE_ADDRESS_MODE(3);
pub const D3D12_TEXTURE_ADDRESS_MODE_BORDER: D3D12_TEXTURE_ADDRESS_MODE =
    D3D12_TEXTURE_ADDRESS_MODE(4);

/// `D3D12_COMPARISON_FUNC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_COMPARISON_FUNC(pub i32);

pub const D3D12_COMPARISON_FUNC_NEVER: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(1);
pub const D3D12_COMPARISON_FUNC_LESS: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(2);
pub const D3D12_COMPARISON_FUNC_EQUAL: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(3);
pub const D3D12_COMPARISON_FUNC_LESS_EQUAL: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(4);
pub const D3D12_COMPARISON_FUNC_GREATER: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(5);
pub const D3D12_COMPARISON_FUNC_NOT_EQUAL: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(6);
pub const D3D12_COMPARISON_FUNC_GREATER_EQUAL: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(7);
pub const D3D12_COMPARISON_FUNC_ALWAYS: D3D12_COMPARISON_FUNC = D3D12_COMPARISON_FUNC(8);

/// `D3D12_CULL_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_CULL_MODE(pub i32);

pub const D3D12_CULL_MODE_NONE: D3D12_CULL_MODE = D3D12_CULL_MODE(1);
pub const D3D12_CULL_MODE_FRONT: D3D12_CULL_MODE = D3D12_CULL_MODE(2);
pub const D3D12_CULL_MODE_BACK: D3D12_CULL_MODE = D3D12_CULL_MODE(3);

/// `D3D12_FILL_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_FILL_MODE(pub i32);

pub const D3D12_FILL_MODE_WIREFRAME: D3D12_FILL_MODE = D3D12_FILL_MODE(2);
pub const D3D12_FILL_MODE_SOLID: D3D12_FILL_MODE = D3D12_FILL_MODE(3);

/// `D3D12_BLEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_BLEND(pub i32);

pub const D3D12_BLEND_ZERO: D3D12_BLEND = D3D12_BLEND(1);
pub const D3D12_BLEND_ONE: D3D12_BLEND = D3D12_BLEND(2);
pub const D3D12_BLEND_SRC_COLOR: D3D12_BLEND = D3D12_BLEND(3);
pub const D3D12_BLEND_INV_SRC_COLOR: D3D12_BLEND = D3D12_BLEND(4);
pub const D3D12_BLEND_SRC_ALPHA: D3D12_BLEND = D3D12_BLEND(5);
pub const D3D12_BLEND_INV_SRC_ALPHA: D3D12_BLEND = D3D12_BLEND(6);
pub const D3D12_BLEND_DEST_ALPHA: D3D12_BLEND = D3D12_BLEND(7);
pub const D3D12_BLEND_INV_DEST_ALPHA: D3D12_BLEND = D3D12_BLEND(8);
pub const D3D12_BLEND_DEST_COLOR: D3D12_BLEND = D3D12_BLEND(9);
pub const D3D12_BLEND_INV_DEST_COLOR: D3D12_BLEND = D3D12_BLEND(10);

/// `D3D12_BLEND_OP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_BLEND_OP(pub i32);

pub const D3D12_BLEND_OP_ADD: D3D12_BLEND_OP = D3D12_BLEND_OP(1);
pub const D3D12_BLEND_OP_SUBTRACT: D3D12_BLEND_OP = D3D12_BLEND_OP(2);
pub const D3D12_BLEND_OP_REV_SUBTRACT: D3D12_BLEND_OP = D3D12_BLEND_OP(3);
pub const D3D12_BLEND_OP_MIN: D3D12_BLEND_OP = D3D12_BLEND_OP(4);
pub const D3D12_BLEND_OP_MAX: D3D12_BLEND_OP = D3D12_BLEND_OP(5);

/// `D3D12_SRV_DIMENSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12_SRV_DIMENSION(pub i32);

pub const D3D12_SRV_DIMENSION_BUFFER: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(1);
pub const D3D12_SRV_DIMENSION_TEXTURE1D: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(2);
pub const D3D12_SRV_DIMENSION_TEXTURE2D: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(4);
pub const D3D12_SRV_DIMENSION_TEXTURE2DARRAY: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(5);
pub const D3D12_SRV_DIMENSION_TEXTURE3D: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(8);
pub const D3D12_SRV_DIMENSION_TEXTURECUBE: D3D12_SRV_DIMENSION = D3D12_SRV_DIMENSION(9);

/// `D3D12_SAMPLER_DESC`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct D3D12_SAMPLER_DESC {
    pub Filter: D3D12_FILTER,
    pub AddressU: D3D12_TEXTURE_ADDRESS_MODE,
    pub AddressV: D3D12_TEXTURE_ADDRESS_MODE,
    pub AddressW: D3D12_TEXTURE_ADDRESS_MODE,
    pub MipLODBias: f32,
    pub MaxAnisotropy: u32,
    pub ComparisonFunc: D3D12_COMPARISON_FUNC,
    pub BorderColor: [f32; 4],
    pub MinLOD: f32,
    pub MaxLOD: f32,
}

/// `D3D12_CPU_DESCRIPTOR_HANDLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct D3D12_CPU_DESCRIPTOR_HANDLE {
    pub ptr: usize,
}

/// `HRESULT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HRESULT(pub i32);

pub const E_FAIL: HRESULT = HRESULT(0x8000_4005_u32 as i32);
pub const E_OUTOFMEMORY: HRESULT = HRESULT(0x8007_000E_u32 as i32);
pub const E_INVALIDARG: HRESULT = HRESULT(0x8007_0057_u32 as i32);
pub const DXGI_ERROR_INVALID_CALL: HRESULT = HRESULT(0x887A_0001_u32 as i32);
pub const DXGI_ERROR_DEVICE_REMOVED: HRESULT = HRESULT(0x887A_0005_u32 as i32);

/// `DXGI_SWAP_EFFECT_FLIP_DISCARD`.
pub const DXGI_SWAP_EFFECT_FLIP_DISCARD: u32 = 4;
/// `DXGI_PRESENT_ALLOW_TEARING`.
pub const DXGI_PRESENT_ALLOW_TEARING: u32 = 0x200;

/// `D3D12_TEXTURE_DATA_PITCH_ALIGNMENT`.
pub const D3D12_TEXTURE_DATA_PITCH_ALIGNMENT: u32 = 256;
/// `D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT`.
pub const D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT: u64 = 512;
/// `D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT`.
pub const D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT: u64 = 256;
/// `D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT`.
pub const D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;
/// A root signature holds at most 64 DWORDs.
pub const D3D12_MAX_ROOT_COST: u32 = 64;
/// `D3D12_REQ_TEXTURE2D_U_OR_V_DIMENSION`.
pub const D3D12_REQ_TEXTURE2D_U_OR_V_DIMENSION: u32 = 16384;
/// `D3D12_SIMULTANEOUS_RENDER_TARGET_COUNT`.
pub const D3D12_SIMULTANEOUS_RENDER_TARGET_COUNT: u32 = 8;
/// `D3D12_MAX_MAXANISOTROPY`.
pub const D3D12_MAX_MAXANISOTROPY: u16 = 16;
/// Shader-visible sampler heaps hold at most 2048 samplers.
pub const D3D12_MAX_SHADER_VISIBLE_SAMPLER_HEAP_SIZE: u32 = 2048;
/// Resource binding tier 3 descriptor heap size.
pub const D3D12_MAX_SHADER_VISIBLE_DESCRIPTOR_HEAP_SIZE_TIER_3: u32 = 1_000_000;

/// `D3D12_GPU_VIRTUAL_ADDRESS`.
pub type D3D12_GPU_VIRTUAL_ADDRESS = u64;

/// `D3D12CalcSubresource`.
pub const fn calc_subresource(mip_slice: u32, array_slice: u32, mip_levels: u32) -> u32 {
    mip_slice + array_slice * mip_levels
}

/// Inverse of [`calc_subresource`]: `(mip_slice, array_slice)`.
pub const fn split_subresource(subresource: u32, mip_levels: u32) -> (u32, u32) {
    let mip_levels = if mip_levels == 0 { 1 } else { mip_levels };
    (subresource % mip_levels, subresource / mip_levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_read_is_the_union_of_read_states() {
        let reads = D3D12_RESOURCE_STATES::VERTEX_AND_CONSTANT_BUFFER
            | D3D12_RESOURCE_STATES::INDEX_BUFFER
            | D3D12_RESOURCE_STATES::NON_PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATES::PIXEL_SHADER_RESOURCE
            | D3D12_RESOURCE_STATES::INDIRECT_ARGUMENT
            | D3D12_RESOURCE_STATES::COPY_SOURCE;
        assert_eq!(reads, D3D12_RESOURCE_STATES::GENERIC_READ);
        assert_eq!(D3D12_RESOURCE_STATES::PRESENT, D3D12_RESOURCE_STATES::COMMON);
    }

    #[test]
    fn basic_filters_match_the_header() {
        // D3D12_FILTER_MIN_MAG_MIP_LINEAR
        assert_eq!(encode_basic_filter(1, 1, 1, 0), D3D12_FILTER(0x15));
        // D3D12_FILTER_MIN_MAG_MIP_POINT
        assert_eq!(encode_basic_filter(0, 0, 0, 0), D3D12_FILTER(0));
        // D3D12_FILTER_COMPARISON_MIN_MAG_MIP_LINEAR
        assert_eq!(
            encode_basic_filter(1, 1, 1, D3D12_FILTER_REDUCTION_TYPE_COMPARISON),
            D3D12_FILTER(0x95)
        );
    }

    #[test]
    fn subresource_indices_round_trip() {
        let index = calc_subresource(2, 3, 5);
        assert_eq!(index, 17);
        assert_eq!(split_subresource(index, 5), (2, 3));
    }
}
