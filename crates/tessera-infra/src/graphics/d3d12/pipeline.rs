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

//! DXIL shader blobs, the bindless root signature and pipeline state objects.

use super::context::{D3d12Context, RESOURCE_TABLE_PARAMETER, SAMPLER_TABLE_PARAMETER};
use super::conversions::IntoD3d12;
use super::native::*;
use crate::graphics::validate;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    ComputePipelineDescriptor, GraphicsPipelineDescriptor, RootLayout, ShaderStage,
};
use tessera_core::rhi::error::{PipelineError, RhiResult, ShaderError};
use tessera_core::rhi_log;

/// The four-character code opening every DXBC container.
pub const DXBC_FOURCC: [u8; 4] = *b"DXBC";
/// Bytes in a container header: fourcc, digest, version, size, part count.
const DXBC_HEADER_BYTES: usize = 32;
/// Offset of the total container size inside the header.
const DXBC_SIZE_OFFSET: usize = 24;

/// A compiled DXIL shader blob.
#[derive(Debug)]
pub struct D3d12Shader {
    /// Object identity.
    pub id: u64,
    /// The stage the blob was loaded for.
    pub stage: ShaderStage,
    /// The container bytes.
    pub bytecode: Vec<u8>,
}

/// Checks the DXBC container header of a DXIL blob.
pub fn parse_dxbc(bytes: &[u8], stage: ShaderStage, label: &str) -> Result<(), ShaderError> {
    let invalid = |details: String| ShaderError::InvalidBytecode {
        label: label.to_owned(),
        stage,
        details,
    };
    if bytes.len() < DXBC_HEADER_BYTES {
        return Err(invalid(format!(
            "{} bytes is shorter than a DXBC header",
            bytes.len()
        )));
    }
    if bytes[..4] != DXBC_FOURCC {
        return Err(invalid(format!(
            "bad container fourcc {:02x?}",
            &bytes[..4]
        )));
    }
    let declared = u32::from_le_bytes([
        bytes[DXBC_SIZE_OFFSET],
        bytes[DXBC_SIZE_OFFSET + 1],
        bytes[DXBC_SIZE_OFFSET + 2],
        bytes[DXBC_SIZE_OFFSET + 3],
    ]) as usize;
    if declared != bytes.len() {
        return Err(invalid(format!(
            "container declares {} bytes, blob has {}",
            declared,
            bytes.len()
        )));
    }
    Ok(())
}

pub(crate) fn create_shader(
    ctx: &D3d12Context,
    stage: ShaderStage,
    bytecode: &[u8],
    label: &str,
) -> RhiResult<D3d12Shader> {
    parse_dxbc(bytecode, stage, label)?;
    Ok(D3d12Shader {
        id: ctx.next_object(),
        stage,
        bytecode: bytecode.to_vec(),
    })
}

/// One root parameter of the bindless root signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum D3d12RootParameter {
    /// `D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS`.
    Constants {
        /// `Num32BitValues`.
        num_32bit_values: u32,
    },
    /// `D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE` with one unbounded range.
    DescriptorTable {
        /// The heap the range points into.
        heap_type: D3D12_DESCRIPTOR_HEAP_TYPE,
        /// `NumDescriptors`.
        num_descriptors: u32,
    },
}

impl D3d12RootParameter {
    /// DWORDs the parameter takes out of the 64-DWORD root budget.
    pub fn cost(&self) -> u32 {
        match self {
            Self::Constants { num_32bit_values } => *num_32bit_values,
            Self::DescriptorTable { .. } => 1,
        }
    }
}

/// An `ID3D12RootSignature`: root constants then the two bindless tables.
#[derive(Debug)]
pub struct D3d12RootSignature {
    /// Object identity.
    pub id: u64,
    /// The root parameters, in slot order.
    pub parameters: Vec<D3d12RootParameter>,
}

impl D3d12RootSignature {
    /// Total DWORD cost of the root parameters.
    pub fn cost(&self) -> u32 {
        self.parameters.iter().map(D3d12RootParameter::cost).sum()
    }
}

pub(crate) fn create_root_signature(
    ctx: &D3d12Context,
    layout: &RootLayout,
    label: &str,
) -> RhiResult<D3d12RootSignature> {
    let constants = layout.push_constant_bytes.div_ceil(4);
    let mut parameters = vec![D3d12RootParameter::Constants {
        num_32bit_values: constants,
    }];
    parameters.resize(
        SAMPLER_TABLE_PARAMETER as usize + 1,
        D3d12RootParameter::Constants { num_32bit_values: 0 },
    );
    parameters[RESOURCE_TABLE_PARAMETER as usize] = D3d12RootParameter::DescriptorTable {
        heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
        num_descriptors: layout.max_bindless_resources,
    };
    parameters[SAMPLER_TABLE_PARAMETER as usize] = D3d12RootParameter::DescriptorTable {
        heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
        num_descriptors: layout.max_bindless_samplers,
    };
    let signature = D3d12RootSignature {
        id: ctx.next_object(),
        parameters,
    };
    if signature.cost() > D3D12_MAX_ROOT_COST {
        return Err(PipelineError::LayoutCreationFailed(format!(
            "'{}' costs {} DWORDs, a root signature holds {}",
            label,
            signature.cost(),
            D3D12_MAX_ROOT_COST
        ))
        .into());
    }
    if layout.max_bindless_resources != ctx.resources.capacity()
        || layout.max_bindless_samplers != ctx.samplers.capacity()
    {
        return Err(PipelineError::LayoutCreationFailed(format!(
            "'{}' does not match the shader-visible heaps ({} resources, {} samplers)",
            label,
            ctx.resources.capacity(),
            ctx.samplers.capacity()
        ))
        .into());
    }
    Ok(signature)
}

/// An `ID3D12PipelineState`.
#[derive(Debug)]
pub struct D3d12Pipeline {
    /// Object identity.
    pub id: u64,
    /// Built with `CreateComputePipelineState`.
    pub compute: bool,
    /// The root signature it was built against.
    pub root_signature: u64,
    /// Topology set with `IASetPrimitiveTopology` when bound.
    pub topology: D3D_PRIMITIVE_TOPOLOGY,
    /// Per-slot vertex strides, used by `IASetVertexBuffers`.
    pub vertex_strides: Vec<u32>,
    /// `RTVFormats`.
    pub rtv_formats: Vec<DXGI_FORMAT>,
    /// `DSVFormat`.
    pub dsv_format: DXGI_FORMAT,
    /// `RasterizerState.FillMode`.
    pub fill_mode: D3D12_FILL_MODE,
    /// `RasterizerState.CullMode`.
    pub cull_mode: D3D12_CULL_MODE,
}

pub(crate) fn create_graphics_pipeline(
    ctx: &D3d12Context,
    root_signature: &D3d12RootSignature,
    vertex: &D3d12Shader,
    pixel: Option<&D3d12Shader>,
    desc: &GraphicsPipelineDescriptor<'_>,
) -> RhiResult<D3d12Pipeline> {
    validate::graphics_pipeline(
        &ctx.limits,
        ctx.device.features(),
        vertex.stage,
        pixel.map(|p| p.stage),
        desc,
    )?;
    if ctx.validation {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "CreateGraphicsPipelineState '{}': {} RTV(s), DSV {}",
            desc.label.as_deref().unwrap_or("<unnamed pipeline>"),
            desc.color_targets.len(),
            desc.depth_stencil.is_some()
        );
    }
    Ok(D3d12Pipeline {
        id: ctx.next_object(),
        compute: false,
        root_signature: root_signature.id,
        topology: desc.topology.into_d3d12(),
        vertex_strides: desc.vertex_buffers.iter().map(|b| b.stride).collect(),
        rtv_formats: desc
            .color_targets
            .iter()
            .map(|t| t.format.into_d3d12())
            .collect(),
        dsv_format: desc
            .depth_stencil
            .map(|d| d.format.into_d3d12())
            .unwrap_or(DXGI_FORMAT_UNKNOWN),
        fill_mode: desc.rasterizer.polygon_mode.into_d3d12(),
        cull_mode: desc.rasterizer.cull_mode.into_d3d12(),
    })
}

pub(crate) fn create_compute_pipeline(
    ctx: &D3d12Context,
    root_signature: &D3d12RootSignature,
    shader: &D3d12Shader,
    _desc: &ComputePipelineDescriptor<'_>,
) -> RhiResult<D3d12Pipeline> {
    validate::expect_stage(ShaderStage::Compute, shader.stage)?;
    Ok(D3d12Pipeline {
        id: ctx.next_object(),
        compute: true,
        root_signature: root_signature.id,
        topology: D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        vertex_strides: Vec::new(),
        rtv_formats: Vec::new(),
        dsv_format: DXGI_FORMAT_UNKNOWN,
        fill_mode: D3D12_FILL_MODE_SOLID,
        cull_mode: D3D12_CULL_MODE_NONE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[..4].copy_from_slice(&DXBC_FOURCC);
        bytes[DXBC_SIZE_OFFSET..DXBC_SIZE_OFFSET + 4].copy_from_slice(&(len as u32).to_le_bytes());
        bytes
    }

    #[test]
    fn accepts_a_well_formed_container() {
        assert!(parse_dxbc(&container(48), ShaderStage::Vertex, "vs").is_ok());
    }

    #[test]
    fn rejects_spirv_and_short_blobs() {
        let spirv: Vec<u8> = [0x0723_0203u32, 0x0001_0500, 0, 8, 0, 0, 0, 0]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect();
        let err = parse_dxbc(&spirv, ShaderStage::Fragment, "ps").unwrap_err();
        assert!(err.to_string().contains("fourcc"));

        let err = parse_dxbc(b"DXBC", ShaderStage::Compute, "cs").unwrap_err();
        assert!(err.to_string().contains("shorter"));
    }

    #[test]
    fn size_field_must_match() {
        let mut bytes = container(40);
        bytes.push(0);
        assert!(parse_dxbc(&bytes, ShaderStage::Vertex, "vs").is_err());
    }

    #[test]
    fn root_cost_counts_tables_as_one_dword() {
        let signature = D3d12RootSignature {
            id: 1,
            parameters: vec![
                D3d12RootParameter::Constants { num_32bit_values: 4 },
                D3d12RootParameter::DescriptorTable {
                    heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
                    num_descriptors: 1024,
                },
                D3d12RootParameter::DescriptorTable {
                    heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
                    num_descriptors: 16,
                },
            ],
        };
        assert_eq!(signature.cost(), 6);
    }
}
