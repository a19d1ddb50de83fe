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

//! Root signatures, shader blobs and pipeline state objects.

use crate::device::Device;
use std::fmt;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    push_constant_capacity, ComputePipelineDescriptor, GraphicsPipelineDescriptor, RootLayout,
    RootSignatureDescriptor, ShaderStage,
};
use tessera_core::rhi::{RhiBackend, RhiResult, ShaderError};
use tessera_core::rhi_log;

/// The bindless table layout plus a push-constant block.
pub struct RootSignature<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::RootSignature>,
    layout: RootLayout,
    id: u64,
}

impl<B: RhiBackend> fmt::Debug for RootSignature<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootSignature")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<B: RhiBackend> RootSignature<'_, B> {
    /// The native root signature.
    pub fn raw(&self) -> &B::RootSignature {
        &self.raw
    }

    /// The resolved layout.
    pub fn layout(&self) -> &RootLayout {
        &self.layout
    }

    /// Push-constant bytes reserved, at least 128.
    pub fn push_constant_bytes(&self) -> u32 {
        self.layout.push_constant_bytes
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<B: RhiBackend> Drop for RootSignature<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_root_signature(&self.device.ctx, raw);
    }
}

/// One validated bytecode blob for one stage.
pub struct Shader<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Shader>,
    stage: ShaderStage,
    label: String,
}

impl<B: RhiBackend> fmt::Debug for Shader<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("stage", &self.stage)
            .finish()
    }
}

impl<B: RhiBackend> Shader<'_, B> {
    /// The native shader.
    pub fn raw(&self) -> &B::Shader {
        &self.raw
    }

    /// The stage the blob was created for.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// The entry point the backend calls.
    pub fn entry_point(&self) -> &'static str {
        B::entry_point(self.stage)
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<B: RhiBackend> Drop for Shader<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_shader(&self.device.ctx, raw);
    }
}

/// A graphics or compute pipeline state object.
pub struct Pipeline<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::Pipeline>,
    compute: bool,
    root_signature: u64,
    label: String,
}

impl<B: RhiBackend> fmt::Debug for Pipeline<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("label", &self.label)
            .field("compute", &self.compute)
            .finish()
    }
}

impl<B: RhiBackend> Pipeline<'_, B> {
    /// The native pipeline.
    pub fn raw(&self) -> &B::Pipeline {
        &self.raw
    }

    /// `true` for compute pipelines.
    pub fn is_compute(&self) -> bool {
        self.compute
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn root_signature_id(&self) -> u64 {
        self.root_signature
    }
}

impl<B: RhiBackend> Drop for Pipeline<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_pipeline(&self.device.ctx, raw);
    }
}

/// `<base>.<vert|frag|comp>.<extension>`.
pub fn shader_path(base: &Path, stage: ShaderStage, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}.{}", stage.file_suffix(), extension));
    PathBuf::from(name)
}

impl<B: RhiBackend> Device<B> {
    /// Creates a root signature over the device's bindless table.
    ///
    /// The push-constant block is at least 128 bytes; larger requests are
    /// rounded up to a multiple of 4.
    ///
    /// # Errors
    ///
    /// [`tessera_core::rhi::PipelineError::LayoutCreationFailed`] when the
    /// block exceeds what the backend can hold.
    pub fn create_root_signature(
        &self,
        desc: &RootSignatureDescriptor<'_>,
    ) -> RhiResult<RootSignature<'_, B>> {
        let layout = RootLayout {
            push_constant_bytes: push_constant_capacity(desc.push_constant_bytes),
            max_bindless_resources: self.config().max_bindless_resources,
            max_bindless_samplers: self.config().max_bindless_samplers,
        };
        let label = desc.label.as_deref().unwrap_or("<unnamed root signature>");
        let raw = B::create_root_signature(&self.ctx, &layout, label)?;
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "root signature '{}': {} push-constant bytes",
            label,
            layout.push_constant_bytes
        );
        Ok(RootSignature {
            device: self,
            raw: ManuallyDrop::new(raw),
            layout,
            id: self.next_object_id(),
        })
    }

    /// Creates a root signature with the configured `push_constant_bytes`.
    ///
    /// # Errors
    ///
    /// As [`create_root_signature`](Self::create_root_signature).
    pub fn create_default_root_signature(&self) -> RhiResult<RootSignature<'_, B>> {
        self.create_root_signature(&RootSignatureDescriptor {
            label: Some("default root signature".into()),
            push_constant_bytes: self.config().push_constant_bytes,
        })
    }

    /// Validates a bytecode blob for `stage`.
    ///
    /// # Errors
    ///
    /// [`ShaderError::InvalidBytecode`] when the blob is not in the backend's
    /// container format.
    pub fn create_shader(
        &self,
        stage: ShaderStage,
        bytecode: &[u8],
        label: &str,
    ) -> RhiResult<Shader<'_, B>> {
        let raw = B::create_shader(&self.ctx, stage, bytecode, label)?;
        Ok(Shader {
            device: self,
            raw: ManuallyDrop::new(raw),
            stage,
            label: label.to_owned(),
        })
    }

    /// Reads `<base>.<vert|frag|comp>.<spv|dxil>` and validates it.
    ///
    /// # Errors
    ///
    /// [`ShaderError::LoadError`] when the file cannot be read, and the errors
    /// of [`Device::create_shader`].
    pub fn load_shader(
        &self,
        base_path: impl AsRef<Path>,
        stage: ShaderStage,
    ) -> RhiResult<Shader<'_, B>> {
        let path = shader_path(base_path.as_ref(), stage, B::SHADER_EXTENSION);
        let bytecode = std::fs::read(&path).map_err(|err| ShaderError::LoadError {
            path: path.display().to_string(),
            source_error: err.to_string(),
        })?;
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::Info,
            "loaded {:?} shader '{}' ({} bytes)",
            stage,
            path.display(),
            bytecode.len()
        );
        self.create_shader(stage, &bytecode, &path.display().to_string())
    }

    /// Builds a graphics pipeline against `root_signature`.
    ///
    /// # Errors
    ///
    /// Stage mismatches, unsupported state and native compilation failures.
    pub fn create_graphics_pipeline(
        &self,
        root_signature: &RootSignature<'_, B>,
        vertex: &Shader<'_, B>,
        fragment: Option<&Shader<'_, B>>,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> RhiResult<Pipeline<'_, B>> {
        let raw = B::create_graphics_pipeline(
            &self.ctx,
            root_signature.raw(),
            vertex.raw(),
            fragment.map(Shader::raw),
            desc,
        )?;
        Ok(Pipeline {
            device: self,
            raw: ManuallyDrop::new(raw),
            compute: false,
            root_signature: root_signature.id(),
            label: desc
                .label
                .as_deref()
                .unwrap_or("<unnamed pipeline>")
                .to_owned(),
        })
    }

    /// Builds a compute pipeline against `root_signature`.
    ///
    /// # Errors
    ///
    /// A non-compute shader, or native compilation failures.
    pub fn create_compute_pipeline(
        &self,
        root_signature: &RootSignature<'_, B>,
        shader: &Shader<'_, B>,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> RhiResult<Pipeline<'_, B>> {
        let raw =
            B::create_compute_pipeline(&self.ctx, root_signature.raw(), shader.raw(), desc)?;
        Ok(Pipeline {
            device: self,
            raw: ManuallyDrop::new(raw),
            compute: true,
            root_signature: root_signature.id(),
            label: desc
                .label
                .as_deref()
                .unwrap_or("<unnamed pipeline>")
                .to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_paths_follow_the_naming_convention() {
        let base = Path::new("shaders/blit");
        assert_eq!(
            shader_path(base, ShaderStage::Vertex, "spv"),
            PathBuf::from("shaders/blit.vert.spv")
        );
        assert_eq!(
            shader_path(base, ShaderStage::Compute, "dxil"),
            PathBuf::from("shaders/blit.comp.dxil")
        );
    }
}
