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

//! Defines the hierarchy of error types for the RHI.
//!
//! Only environment and backend failures are reported as errors. Precondition
//! violations (wrong usage flags, illegal fence transitions, double frees) are
//! programming errors and abort through [`crate::rhi_fatal!`].

use crate::rhi::api::ShaderStage;
use crate::rhi::api::DeviceFeatures;
use std::fmt;

/// An error related to the loading or validation of a shader blob.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader file could not be read.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error.
        source_error: String,
    },
    /// The blob does not carry the bytecode container the backend expects.
    InvalidBytecode {
        /// A descriptive label for the shader.
        label: String,
        /// The stage the blob was meant for.
        stage: ShaderStage,
        /// What was wrong with the blob.
        details: String,
    },
    /// A pipeline was given a shader of the wrong stage.
    StageMismatch {
        /// The stage the pipeline slot expects.
        expected: ShaderStage,
        /// The stage of the supplied shader.
        found: ShaderStage,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(f, "Failed to load shader from '{path}': {source_error}")
            }
            ShaderError::InvalidBytecode {
                label,
                stage,
                details,
            } => {
                write!(f, "Invalid {stage:?} bytecode for '{label}': {details}")
            }
            ShaderError::StageMismatch { expected, found } => {
                write!(f, "Expected a {expected:?} shader, got a {found:?} shader")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a root signature or pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The root signature or pipeline layout could not be created.
    LayoutCreationFailed(String),
    /// The backend failed to build the pipeline state object.
    CompilationFailed {
        /// A descriptive label for the pipeline, if available.
        label: Option<String>,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// A graphics pipeline declared no colour target and no depth target.
    NoRenderTargets {
        /// The label of the pipeline being created.
        label: Option<String>,
    },
    /// A depth/stencil format was requested that is not a depth format.
    IncompatibleDepthStencilFormat(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutCreationFailed(msg) => {
                write!(f, "Pipeline layout creation failed: {msg}")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(
                    f,
                    "Pipeline compilation failed for '{}': {}",
                    label.as_deref().unwrap_or("Unknown"),
                    details
                )
            }
            PipelineError::NoRenderTargets { label } => {
                write!(
                    f,
                    "Graphics pipeline '{}' declares no colour or depth target",
                    label.as_deref().unwrap_or("Unknown")
                )
            }
            PipelineError::IncompatibleDepthStencilFormat(msg) => {
                write!(f, "Incompatible depth/stencil format: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// The top-level RHI error.
#[derive(Debug)]
pub enum RhiError {
    /// No adapter satisfies the required feature set.
    FeatureNotSupported {
        /// The features that were required.
        required: DeviceFeatures,
        /// The best feature set any adapter offered.
        best_available: DeviceFeatures,
    },
    /// The backend exposes no adapter at all.
    AdapterNotFound,
    /// A native call returned a non-success code.
    Backend {
        /// The native entry point that failed.
        call: &'static str,
        /// The native result code.
        code: i32,
    },
    /// A shader could not be loaded or validated.
    Shader(ShaderError),
    /// A root signature or pipeline could not be built.
    Pipeline(PipelineError),
    /// Surface or swapchain creation failed.
    Surface(String),
    /// An allocation request exceeded the memory the adapter can give.
    OutOfMemory {
        /// The requested size in bytes.
        requested: u64,
        /// The remaining capacity in bytes.
        capacity: u64,
    },
    /// A descriptor or configuration value was rejected.
    InvalidDescriptor(String),
}

impl fmt::Display for RhiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhiError::FeatureNotSupported {
                required,
                best_available,
            } => write!(
                f,
                "No adapter supports the required features {required:?} \
                 (best available: {best_available:?})"
            ),
            RhiError::AdapterNotFound => write!(f, "No graphics adapter found"),
            RhiError::Backend { call, code } => {
                write!(f, "Native call {call} failed with code {code:#x}")
            }
            RhiError::Shader(err) => write!(f, "Shader error: {err}"),
            RhiError::Pipeline(err) => write!(f, "Pipeline error: {err}"),
            RhiError::Surface(msg) => write!(f, "Surface error: {msg}"),
            RhiError::OutOfMemory {
                requested,
                capacity,
            } => write!(
                f,
                "Out of device memory: requested {requested} bytes, {capacity} available"
            ),
            RhiError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {msg}"),
        }
    }
}

impl std::error::Error for RhiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RhiError::Shader(err) => Some(err),
            RhiError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for RhiError {
    fn from(err: ShaderError) -> Self {
        RhiError::Shader(err)
    }
}

impl From<PipelineError> for RhiError {
    fn from(err: PipelineError) -> Self {
        RhiError::Pipeline(err)
    }
}

/// Result alias used across the RHI.
pub type RhiResult<T> = Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::LoadError {
            path: "shaders/blit.vert.spv".to_string(),
            source_error: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load shader from 'shaders/blit.vert.spv': not found"
        );

        let err = ShaderError::InvalidBytecode {
            label: "blit".to_string(),
            stage: ShaderStage::Vertex,
            details: "bad magic".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid Vertex bytecode for 'blit': bad magic");
    }

    #[test]
    fn backend_error_prints_hex_code() {
        let err = RhiError::Backend {
            call: "vkQueueSubmit",
            code: -4,
        };
        assert_eq!(
            err.to_string(),
            "Native call vkQueueSubmit failed with code 0xfffffffc"
        );
    }

    #[test]
    fn nested_errors_convert_and_chain() {
        let err: RhiError = PipelineError::LayoutCreationFailed("too many".to_string()).into();
        assert!(matches!(err, RhiError::Pipeline(_)));
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "Pipeline error: Pipeline layout creation failed: too many"
        );
    }
}
