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

//! Adapter, feature and limit descriptions.

use crate::config::RhiConfig;
use crate::tessera_bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The native API family a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// A Vulkan-model backend.
    Vulkan,
    /// A Direct3D 12-model backend.
    D3d12,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Vulkan => write!(f, "Vulkan"),
            BackendKind::D3d12 => write!(f, "Direct3D 12"),
        }
    }
}

tessera_bitflags! {
    /// Optional device capabilities.
    pub struct DeviceFeatures: u32 {
        /// Partially bound, update-after-bind descriptor arrays.
        const DESCRIPTOR_INDEXING = 1 << 0;
        /// Render passes without render-pass objects.
        const DYNAMIC_RENDERING = 1 << 1;
        /// Anisotropic filtering.
        const SAMPLER_ANISOTROPY = 1 << 2;
        /// Timeline semaphores / monotonic fence values.
        const TIMELINE_SEMAPHORE = 1 << 3;
        /// Block-compressed texture formats.
        const TEXTURE_COMPRESSION_BC = 1 << 4;
        /// Multi-draw indirect.
        const MULTI_DRAW_INDIRECT = 1 << 5;
        /// Wireframe rasterization.
        const FILL_MODE_NON_SOLID = 1 << 6;
    }
}

impl DeviceFeatures {
    /// The features every device must expose.
    pub const REQUIRED: Self = Self {
        bits: Self::DESCRIPTOR_INDEXING.bits
            | Self::DYNAMIC_RENDERING.bits
            | Self::SAMPLER_ANISOTROPY.bits,
    };

    /// Parses a feature name as written in configuration files, e.g.
    /// `"texture_compression_bc"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_flag_name(name)
    }
}

/// The type of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterType {
    /// A discrete GPU.
    DiscreteGpu,
    /// A GPU integrated with the CPU.
    IntegratedGpu,
    /// A software rasterizer.
    Cpu,
}

/// Static description of an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter name.
    pub name: String,
    /// Vendor identifier.
    pub vendor_id: u32,
    /// Device identifier.
    pub device_id: u32,
    /// Adapter type.
    pub adapter_type: AdapterType,
    /// The backend exposing the adapter.
    pub backend: BackendKind,
    /// Supported optional features.
    pub features: DeviceFeatures,
    /// Device-local memory in bytes.
    pub dedicated_memory: u64,
    /// Whether a graphics queue of this adapter can present.
    pub supports_present: bool,
}

/// Device limits relevant to the RHI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Capacity of the bindless resource array.
    pub max_bindless_resources: u32,
    /// Capacity of the bindless sampler array.
    pub max_bindless_samplers: u32,
    /// Largest push-constant block.
    pub max_push_constant_bytes: u32,
    /// Largest 2D texture dimension.
    pub max_texture_dimension_2d: u32,
    /// Most colour attachments in one pass.
    pub max_color_attachments: u32,
    /// Alignment of a row in buffer/texture copies.
    pub texture_row_pitch_alignment: u32,
    /// Alignment of a texture subresource inside a staging buffer.
    pub texture_placement_alignment: u64,
    /// Native minimum uniform buffer offset alignment.
    pub min_uniform_buffer_offset_alignment: u64,
    /// Largest anisotropy.
    pub max_sampler_anisotropy: u16,
}

/// A descriptor used to create a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceDescriptor {
    /// Runtime configuration.
    pub config: RhiConfig,
    /// Features required in addition to [`DeviceFeatures::REQUIRED`].
    pub extra_features: DeviceFeatures,
    /// Optional adapter name filter (substring match).
    pub adapter_name: Option<String>,
}

/// The parameters a backend receives when creating its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDescriptor {
    /// The features to enable.
    pub features: DeviceFeatures,
    /// Capacity of the bindless resource array.
    pub max_bindless_resources: u32,
    /// Capacity of the bindless sampler array.
    pub max_bindless_samplers: u32,
    /// Capacity of the attachment descriptor area.
    pub max_attachment_views: u32,
    /// Whether native validation is enabled.
    pub enable_validation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_features_are_the_fixed_contract() {
        assert!(DeviceFeatures::REQUIRED.contains(DeviceFeatures::DESCRIPTOR_INDEXING));
        assert!(DeviceFeatures::REQUIRED.contains(DeviceFeatures::DYNAMIC_RENDERING));
        assert!(DeviceFeatures::REQUIRED.contains(DeviceFeatures::SAMPLER_ANISOTROPY));
        assert!(!DeviceFeatures::REQUIRED.contains(DeviceFeatures::TIMELINE_SEMAPHORE));
    }

    #[test]
    fn feature_names() {
        assert_eq!(
            DeviceFeatures::from_name("timeline_semaphore"),
            Some(DeviceFeatures::TIMELINE_SEMAPHORE)
        );
        assert_eq!(DeviceFeatures::from_name("ray_tracing"), None);
    }
}
