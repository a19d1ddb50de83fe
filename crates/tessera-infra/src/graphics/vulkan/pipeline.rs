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

//! Shader modules, the bindless pipeline layout and pipeline objects.

use super::context::VulkanContext;
use super::conversions::IntoVk;
use crate::graphics::validate;
use ash::vk;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    ComputePipelineDescriptor, GraphicsPipelineDescriptor, RootLayout, ShaderStage,
};
use tessera_core::rhi::error::{PipelineError, RhiResult, ShaderError};
use tessera_core::rhi_log;

/// The first word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;
/// Words in a SPIR-V header.
const SPIRV_HEADER_WORDS: usize = 5;

/// A `VkShaderModule`.
#[derive(Debug)]
pub struct VkShaderModule {
    /// The module handle.
    pub handle: vk::ShaderModule,
    /// The stage the module was loaded for.
    pub stage: ShaderStage,
    /// The SPIR-V words.
    pub code: Vec<u32>,
}

/// Checks that `bytes` is a little-endian SPIR-V module and returns its words.
pub fn parse_spirv(bytes: &[u8], stage: ShaderStage, label: &str) -> Result<Vec<u32>, ShaderError> {
    let invalid = |details: String| ShaderError::InvalidBytecode {
        label: label.to_owned(),
        stage,
        details,
    };
    if bytes.len() % 4 != 0 {
        return Err(invalid(format!(
            "{} bytes is not a whole number of SPIR-V words",
            bytes.len()
        )));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();
    if words.len() < SPIRV_HEADER_WORDS {
        return Err(invalid(format!(
            "{} words is shorter than a SPIR-V header",
            words.len()
        )));
    }
    match words[0] {
        SPIRV_MAGIC => Ok(words),
        magic if magic.swap_bytes() == SPIRV_MAGIC => {
            Err(invalid("big-endian SPIR-V is not supported".to_owned()))
        }
        magic => Err(invalid(format!("bad magic number {magic:#010x}"))),
    }
}

pub(crate) fn create_shader_module(
    ctx: &VulkanContext,
    stage: ShaderStage,
    bytecode: &[u8],
    label: &str,
) -> RhiResult<VkShaderModule> {
    let code = parse_spirv(bytecode, stage, label)?;
    Ok(VkShaderModule {
        handle: ctx.next_handle(),
        stage,
        code,
    })
}

/// A `VkPipelineLayout` over the two bindless descriptor sets.
#[derive(Debug)]
pub struct VkPipelineLayout {
    /// The layout handle.
    pub handle: vk::PipelineLayout,
    /// Resource set layout then sampler set layout.
    pub set_layouts: [vk::DescriptorSetLayout; 2],
    /// The bindless descriptor sets.
    pub descriptor_sets: [vk::DescriptorSet; 2],
    /// The single push-constant range, visible to every stage.
    pub push_constant_range: vk::PushConstantRange,
}

pub(crate) fn create_pipeline_layout(
    ctx: &VulkanContext,
    layout: &RootLayout,
    label: &str,
) -> RhiResult<VkPipelineLayout> {
    if layout.push_constant_bytes > ctx.limits.max_push_constant_bytes {
        return Err(PipelineError::LayoutCreationFailed(format!(
            "'{}' asks for {} push-constant bytes, maxPushConstantsSize is {}",
            label, layout.push_constant_bytes, ctx.limits.max_push_constant_bytes
        ))
        .into());
    }
    if layout.max_bindless_resources != ctx.resources.capacity()
        || layout.max_bindless_samplers != ctx.samplers.capacity()
    {
        return Err(PipelineError::LayoutCreationFailed(format!(
            "'{}' does not match the device's descriptor arrays ({} resources, {} samplers)",
            label,
            ctx.resources.capacity(),
            ctx.samplers.capacity()
        ))
        .into());
    }
    Ok(VkPipelineLayout {
        handle: ctx.next_handle(),
        set_layouts: [ctx.next_handle(), ctx.next_handle()],
        descriptor_sets: [ctx.next_handle(), ctx.next_handle()],
        push_constant_range: vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::ALL,
            offset: 0,
            size: layout.push_constant_bytes,
        },
    })
}

/// A `VkPipeline`.
#[derive(Debug)]
pub struct VkPipeline {
    /// The pipeline handle.
    pub handle: vk::Pipeline,
    /// Graphics or compute.
    pub bind_point: vk::PipelineBindPoint,
    /// The layout it was built against.
    pub layout: vk::PipelineLayout,
    /// Input assembly topology, for graphics pipelines.
    pub topology: vk::PrimitiveTopology,
    /// `VkPipelineRenderingCreateInfo::pColorAttachmentFormats`.
    pub color_attachment_formats: Vec<vk::Format>,
    /// `VkPipelineRenderingCreateInfo::depthAttachmentFormat`.
    pub depth_attachment_format: vk::Format,
}

pub(crate) fn create_graphics_pipeline(
    ctx: &VulkanContext,
    layout: &VkPipelineLayout,
    vertex: &VkShaderModule,
    fragment: Option<&VkShaderModule>,
    desc: &GraphicsPipelineDescriptor<'_>,
) -> RhiResult<VkPipeline> {
    validate::graphics_pipeline(
        &ctx.limits,
        ctx.device.features(),
        vertex.stage,
        fragment.map(|f| f.stage),
        desc,
    )?;
    if ctx.validation {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "vkCreateGraphicsPipelines '{}': {} colour target(s), depth {}",
            desc.label.as_deref().unwrap_or("<unnamed pipeline>"),
            desc.color_targets.len(),
            desc.depth_stencil.is_some()
        );
    }
    Ok(VkPipeline {
        handle: ctx.next_handle(),
        bind_point: vk::PipelineBindPoint::GRAPHICS,
        layout: layout.handle,
        topology: desc.topology.into_vk(),
        color_attachment_formats: desc
            .color_targets
            .iter()
            .map(|t| t.format.into_vk())
            .collect(),
        depth_attachment_format: desc
            .depth_stencil
            .map(|d| d.format.into_vk())
            .unwrap_or(vk::Format::UNDEFINED),
    })
}

pub(crate) fn create_compute_pipeline(
    ctx: &VulkanContext,
    layout: &VkPipelineLayout,
    shader: &VkShaderModule,
    _desc: &ComputePipelineDescriptor<'_>,
) -> RhiResult<VkPipeline> {
    validate::expect_stage(ShaderStage::Compute, shader.stage)?;
    Ok(VkPipeline {
        handle: ctx.next_handle(),
        bind_point: vk::PipelineBindPoint::COMPUTE,
        layout: layout.handle,
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        color_attachment_formats: Vec::new(),
        depth_attachment_format: vk::Format::UNDEFINED,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn accepts_a_spirv_header() {
        let bytes = module(&[SPIRV_MAGIC, 0x0001_0500, 0, 8, 0]);
        let words = parse_spirv(&bytes, ShaderStage::Vertex, "tri").unwrap();
        assert_eq!(words.len(), 5);
    }

    #[test]
    fn rejects_dxil_and_truncated_blobs() {
        let err = parse_spirv(b"DXBC\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0", ShaderStage::Fragment, "ps")
            .unwrap_err();
        assert!(matches!(err, ShaderError::InvalidBytecode { .. }));

        let err = parse_spirv(&[0x03, 0x02, 0x23], ShaderStage::Compute, "cs").unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }

    #[test]
    fn flags_byte_swapped_modules() {
        let bytes = module(&[SPIRV_MAGIC.swap_bytes(), 0, 0, 0, 0]);
        let err = parse_spirv(&bytes, ShaderStage::Vertex, "be").unwrap_err();
        assert!(err.to_string().contains("big-endian"));
    }
}
