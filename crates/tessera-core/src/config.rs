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

//! Runtime configuration of the RHI and its subsystems.

use crate::logging::{LogChannel, LogConfig, LogLayer};
use crate::rhi::api::DeviceFeatures;
use crate::rhi::error::{RhiError, RhiResult};
use crate::rhi_log;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The default number of frames the CPU may record ahead of the GPU.
pub const DEFAULT_FRAMES_IN_FLIGHT: u32 = 2;

/// The most frames that may be in flight.
pub const MAX_FRAMES_IN_FLIGHT: u32 = 3;

/// The default capacity of the uploader's staging buffer (512 MiB).
pub const DEFAULT_STAGING_BUFFER_SIZE: u64 = 512 * 1024 * 1024;

/// Configuration of a device and the subsystems built on it.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhiConfig {
    /// Frames recorded ahead of the GPU, `1..=3`.
    pub frames_in_flight: u32,
    /// Capacity of the uploader's staging buffer in bytes.
    pub staging_buffer_size: u64,
    /// Slots in the bindless resource array.
    pub max_bindless_resources: u32,
    /// Slots in the bindless sampler array.
    pub max_bindless_samplers: u32,
    /// Push-constant bytes of the root signature built by
    /// `Device::create_default_root_signature`.
    pub push_constant_bytes: u32,
    /// Slots in the render-target / depth-stencil descriptor area.
    pub max_attachment_views: u32,
    /// Enables native validation.
    pub enable_validation: bool,
    /// Features required on top of the fixed contract, by name.
    pub required_features: Vec<String>,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for RhiConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            staging_buffer_size: DEFAULT_STAGING_BUFFER_SIZE,
            max_bindless_resources: 65_536,
            max_bindless_samplers: 2_048,
            push_constant_bytes: 128,
            max_attachment_views: 64,
            enable_validation: true,
            required_features: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl RhiConfig {
    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> RhiResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RhiError::InvalidDescriptor(format!("invalid RHI configuration: {e}")))
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> RhiResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RhiError::InvalidDescriptor(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Serializes the configuration to pretty JSON.
    pub fn to_json_string(&self) -> String {
        // A struct of plain data always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Clamps out-of-range values and rejects unusable ones.
    ///
    /// `frames_in_flight` is clamped into `1..=3` with a warning. Zero capacities
    /// and unknown feature names are errors.
    pub fn validated(mut self) -> RhiResult<Self> {
        let clamped = self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT);
        if clamped != self.frames_in_flight {
            rhi_log!(
                LogLayer::Rhi,
                LogChannel::Warning,
                "frames_in_flight {} clamped to {}",
                self.frames_in_flight,
                clamped
            );
            self.frames_in_flight = clamped;
        }

        let capacities = [
            ("staging_buffer_size", self.staging_buffer_size),
            ("max_bindless_resources", u64::from(self.max_bindless_resources)),
            ("max_bindless_samplers", u64::from(self.max_bindless_samplers)),
            ("max_attachment_views", u64::from(self.max_attachment_views)),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, value)| *value == 0) {
            return Err(RhiError::InvalidDescriptor(format!("{name} must be non-zero")));
        }

        self.required_device_features()?;
        Ok(self)
    }

    /// The extra features named in `required_features`.
    pub fn required_device_features(&self) -> RhiResult<DeviceFeatures> {
        self.required_features
            .iter()
            .try_fold(DeviceFeatures::EMPTY, |acc, name| {
                DeviceFeatures::from_name(name)
                    .map(|feature| acc | feature)
                    .ok_or_else(|| RhiError::InvalidDescriptor(format!("unknown feature '{name}'")))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RhiConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.staging_buffer_size, 512 * 1024 * 1024);
        assert_eq!(config.max_bindless_resources, 65_536);
        assert_eq!(config.push_constant_bytes, 128);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RhiConfig::from_json_str(
            r#"{ "staging_buffer_size": 4096, "required_features": ["timeline_semaphore"] }"#,
        )
        .unwrap();
        assert_eq!(config.staging_buffer_size, 4096);
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(
            config.required_device_features().unwrap(),
            DeviceFeatures::TIMELINE_SEMAPHORE
        );
    }

    #[test]
    fn json_round_trip() {
        let mut config = RhiConfig::default();
        config.frames_in_flight = 3;
        let parsed = RhiConfig::from_json_str(&config.to_json_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validation_clamps_frames_in_flight() {
        let config = RhiConfig {
            frames_in_flight: 9,
            ..RhiConfig::default()
        };
        assert_eq!(config.validated().unwrap().frames_in_flight, 3);

        let config = RhiConfig {
            frames_in_flight: 0,
            ..RhiConfig::default()
        };
        assert_eq!(config.validated().unwrap().frames_in_flight, 1);
    }

    #[test]
    fn validation_rejects_zero_capacity_and_unknown_features() {
        let config = RhiConfig {
            staging_buffer_size: 0,
            ..RhiConfig::default()
        };
        assert!(matches!(config.validated(), Err(RhiError::InvalidDescriptor(_))));

        let config = RhiConfig {
            required_features: vec!["mesh_shading".into()],
            ..RhiConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RhiConfig::from_json_str("{ frames_in_flight: }").is_err());
    }
}
