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

//! Pipeline state checks every backend performs before building a PSO.

use tessera_core::rhi::api::{
    DeviceFeatures, DeviceLimits, GraphicsPipelineDescriptor, PolygonMode, ShaderStage,
};
use tessera_core::rhi::error::{PipelineError, RhiError, RhiResult, ShaderError};

/// Fails with [`ShaderError::StageMismatch`] unless `found == expected`.
pub fn expect_stage(expected: ShaderStage, found: ShaderStage) -> RhiResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ShaderError::StageMismatch { expected, found }.into())
    }
}

/// Validates a graphics pipeline description against the device.
pub fn graphics_pipeline(
    limits: &DeviceLimits,
    features: DeviceFeatures,
    vertex: ShaderStage,
    fragment: Option<ShaderStage>,
    desc: &GraphicsPipelineDescriptor<'_>,
) -> RhiResult<()> {
    let label = desc.label.as_deref().map(str::to_owned);
    expect_stage(ShaderStage::Vertex, vertex)?;
    if let Some(fragment) = fragment {
        expect_stage(ShaderStage::Fragment, fragment)?;
    }
    if desc.color_targets.is_empty() && desc.depth_stencil.is_none() {
        return Err(PipelineError::NoRenderTargets { label }.into());
    }
    if desc.color_targets.len() as u32 > limits.max_color_attachments {
        return Err(PipelineError::CompilationFailed {
            label,
            details: format!(
                "{} colour targets, the device supports {}",
                desc.color_targets.len(),
                limits.max_color_attachments
            ),
        }
        .into());
    }
    if let Some(target) = desc.color_targets.iter().find(|t| t.format.is_depth()) {
        return Err(PipelineError::CompilationFailed {
            label,
            details: format!("{:?} cannot be a colour target", target.format),
        }
        .into());
    }
    if let Some(depth) = &desc.depth_stencil {
        if !depth.format.is_depth() {
            return Err(PipelineError::IncompatibleDepthStencilFormat(format!(
                "{:?} has no depth aspect",
                depth.format
            ))
            .into());
        }
    }
    if desc.rasterizer.polygon_mode == PolygonMode::Line
        && !features.contains(DeviceFeatures::FILL_MODE_NON_SOLID)
    {
        return Err(RhiError::FeatureNotSupported {
            required: DeviceFeatures::FILL_MODE_NON_SOLID,
            best_available: features,
        });
    }
    for (slot, buffer) in desc.vertex_buffers.iter().enumerate() {
        for attribute in &buffer.attributes {
            if attribute.offset + attribute.format.size() > buffer.stride {
                return Err(PipelineError::CompilationFailed {
                    label,
                    details: format!(
                        "attribute at location {} overruns the {}-byte stride of slot {}",
                        attribute.location, buffer.stride, slot
                    ),
                }
                .into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::rhi::api::{
        ColorTargetState, CompareFunction, DepthStencilState, Format, VertexAttribute,
        VertexBufferLayout, VertexFormat, VertexStepMode,
    };

    fn limits() -> DeviceLimits {
        DeviceLimits {
            max_bindless_resources: 16,
            max_bindless_samplers: 4,
            max_push_constant_bytes: 128,
            max_texture_dimension_2d: 1024,
            max_color_attachments: 2,
            texture_row_pitch_alignment: 1,
            texture_placement_alignment: 1,
            min_uniform_buffer_offset_alignment: 256,
            max_sampler_anisotropy: 16,
        }
    }

    fn check(desc: &GraphicsPipelineDescriptor<'_>) -> RhiResult<()> {
        graphics_pipeline(
            &limits(),
            DeviceFeatures::REQUIRED,
            ShaderStage::Vertex,
            Some(ShaderStage::Fragment),
            desc,
        )
    }

    #[test]
    fn a_pipeline_needs_a_target() {
        let desc = GraphicsPipelineDescriptor::default();
        assert!(matches!(
            check(&desc),
            Err(RhiError::Pipeline(PipelineError::NoRenderTargets { .. }))
        ));
    }

    #[test]
    fn depth_only_pipelines_are_valid() {
        let desc = GraphicsPipelineDescriptor {
            depth_stencil: Some(DepthStencilState {
                format: Format::Depth32Float,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            ..Default::default()
        };
        assert!(check(&desc).is_ok());
    }

    #[test]
    fn colour_depth_format_is_rejected() {
        let desc = GraphicsPipelineDescriptor {
            depth_stencil: Some(DepthStencilState {
                format: Format::Rgba8Unorm,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            ..Default::default()
        };
        assert!(matches!(
            check(&desc),
            Err(RhiError::Pipeline(PipelineError::IncompatibleDepthStencilFormat(_)))
        ));
    }

    #[test]
    fn wireframe_needs_the_feature() {
        let mut desc = GraphicsPipelineDescriptor {
            color_targets: vec![ColorTargetState::opaque(Format::Rgba8Unorm)],
            ..Default::default()
        };
        desc.rasterizer.polygon_mode = PolygonMode::Line;
        assert!(matches!(
            check(&desc),
            Err(RhiError::FeatureNotSupported { .. })
        ));
    }

    #[test]
    fn attributes_must_fit_the_stride() {
        let desc = GraphicsPipelineDescriptor {
            color_targets: vec![ColorTargetState::opaque(Format::Rgba8Unorm)],
            vertex_buffers: vec![VertexBufferLayout {
                stride: 12,
                step_mode: VertexStepMode::Vertex,
                attributes: vec![VertexAttribute {
                    format: VertexFormat::Float32x2,
                    offset: 8,
                    location: 1,
                }],
            }],
            ..Default::default()
        };
        assert!(matches!(
            check(&desc),
            Err(RhiError::Pipeline(PipelineError::CompilationFailed { .. }))
        ));
    }

    #[test]
    fn stages_are_checked() {
        let err = expect_stage(ShaderStage::Vertex, ShaderStage::Compute).unwrap_err();
        assert!(matches!(
            err,
            RhiError::Shader(ShaderError::StageMismatch {
                expected: ShaderStage::Vertex,
                found: ShaderStage::Compute
            })
        ));
    }
}
