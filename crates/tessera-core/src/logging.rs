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

//! Structured `(channel, layer, message)` logging on top of the `log` crate.
//!
//! Every architectural layer logs to its own `log` target (`tessera::<layer>`), and
//! each layer carries an independent mask of enabled [`LogChannel`]s. A message on a
//! disabled channel is dropped before it reaches the `log` facade.
//!
//! An [`LogChannel::Error`] message on a layer whose error channel is enabled is
//! escalated to a panic when escalation is on (the default). [`rhi_fatal!`] always
//! panics: it is used for precondition violations that must never be ignored.
//!
//! The actual sink (formatting, output) is installed by the infrastructure crate.

use crate::tessera_bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// The architectural layer a log message originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLayer {
    /// Device, resources, command recording and submission.
    Rhi,
    /// Backend translation and the native execution layer.
    Backend,
    /// The GPU uploader.
    Uploader,
    /// The render graph.
    RenderGraph,
    /// Allocation tracking.
    Memory,
}

impl LogLayer {
    /// Every layer, in declaration order.
    pub const ALL: [LogLayer; 5] = [
        LogLayer::Rhi,
        LogLayer::Backend,
        LogLayer::Uploader,
        LogLayer::RenderGraph,
        LogLayer::Memory,
    ];

    /// The `log` target used for this layer.
    pub const fn target(self) -> &'static str {
        match self {
            LogLayer::Rhi => "tessera::rhi",
            LogLayer::Backend => "tessera::backend",
            LogLayer::Uploader => "tessera::uploader",
            LogLayer::RenderGraph => "tessera::render_graph",
            LogLayer::Memory => "tessera::memory",
        }
    }

    /// A short, human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            LogLayer::Rhi => "RHI",
            LogLayer::Backend => "BACKEND",
            LogLayer::Uploader => "UPLOADER",
            LogLayer::RenderGraph => "RENDER_GRAPH",
            LogLayer::Memory => "MEMORY",
        }
    }

    /// Maps a `log` target back to its layer.
    pub fn from_target(target: &str) -> Option<LogLayer> {
        LogLayer::ALL.into_iter().find(|layer| layer.target() == target)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// The channel of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogChannel {
    /// Plain text without decoration.
    None,
    /// A section heading.
    Heading,
    /// Informational message.
    Info,
    /// Something unexpected that does not stop execution.
    Warning,
    /// An error. Escalated to a panic when escalation is enabled.
    Error,
    /// A completed milestone.
    Success,
}

impl LogChannel {
    /// The `log` level used to emit this channel.
    pub const fn level(self) -> log::Level {
        match self {
            LogChannel::None | LogChannel::Heading | LogChannel::Info | LogChannel::Success => {
                log::Level::Info
            }
            LogChannel::Warning => log::Level::Warn,
            LogChannel::Error => log::Level::Error,
        }
    }

    /// The mask bit of this channel.
    pub const fn mask(self) -> LogChannels {
        match self {
            LogChannel::None => LogChannels::NONE,
            LogChannel::Heading => LogChannels::HEADING,
            LogChannel::Info => LogChannels::INFO,
            LogChannel::Warning => LogChannels::WARNING,
            LogChannel::Error => LogChannels::ERROR,
            LogChannel::Success => LogChannels::SUCCESS,
        }
    }
}

tessera_bitflags! {
    /// A set of enabled log channels.
    pub struct LogChannels: u8 {
        /// Plain messages.
        const NONE = 1 << 0;
        /// Headings.
        const HEADING = 1 << 1;
        /// Informational messages.
        const INFO = 1 << 2;
        /// Warnings.
        const WARNING = 1 << 3;
        /// Errors.
        const ERROR = 1 << 4;
        /// Success messages.
        const SUCCESS = 1 << 5;
        /// Every channel.
        const ALL = 0b0011_1111;
    }
}

impl LogChannels {
    /// Builds a mask from a list of channels.
    pub fn from_channels(channels: &[LogChannel]) -> Self {
        channels
            .iter()
            .fold(LogChannels::EMPTY, |mask, channel| mask | channel.mask())
    }
}

/// Serializable logging configuration.
///
/// Layers absent from `layers` keep every channel enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Enabled channels, per layer.
    pub layers: BTreeMap<LogLayer, Vec<LogChannel>>,
    /// Whether an enabled ERROR message aborts.
    pub escalate_errors: bool,
    /// Maximum `log` level handed to the sink (`"trace"` .. `"error"`, or `"off"`).
    pub max_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            layers: BTreeMap::new(),
            escalate_errors: true,
            max_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// The channel mask this configuration assigns to `layer`.
    pub fn channels_for(&self, layer: LogLayer) -> LogChannels {
        self.layers
            .get(&layer)
            .map(|channels| LogChannels::from_channels(channels))
            .unwrap_or(LogChannels::ALL)
    }

    /// The configured `log::LevelFilter`, defaulting to `Info` when unparsable.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.max_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

// One mask per layer, indexed by `LogLayer::slot`.
static LAYER_MASKS: [AtomicU8; 5] = [
    AtomicU8::new(LogChannels::ALL.bits),
    AtomicU8::new(LogChannels::ALL.bits),
    AtomicU8::new(LogChannels::ALL.bits),
    AtomicU8::new(LogChannels::ALL.bits),
    AtomicU8::new(LogChannels::ALL.bits),
];

static ESCALATE_ERRORS: AtomicBool = AtomicBool::new(true);

/// Applies a configuration to the process-wide channel filter.
pub fn apply_config(config: &LogConfig) {
    for layer in LogLayer::ALL {
        set_layer_channels(layer, config.channels_for(layer));
    }
    ESCALATE_ERRORS.store(config.escalate_errors, Ordering::Relaxed);
}

/// Replaces the enabled channels of one layer.
pub fn set_layer_channels(layer: LogLayer, channels: LogChannels) {
    LAYER_MASKS[layer.slot()].store(channels.bits(), Ordering::Relaxed);
}

/// Returns the enabled channels of one layer.
pub fn layer_channels(layer: LogLayer) -> LogChannels {
    LogChannels::from_bits_truncate(LAYER_MASKS[layer.slot()].load(Ordering::Relaxed))
}

/// Returns `true` if `channel` is enabled on `layer`.
pub fn channel_enabled(layer: LogLayer, channel: LogChannel) -> bool {
    layer_channels(layer).contains(channel.mask())
}

/// Returns `true` if enabled ERROR messages abort.
pub fn errors_escalate() -> bool {
    ESCALATE_ERRORS.load(Ordering::Relaxed)
}

/// Emits one message. Prefer the [`rhi_log!`] macro.
pub fn emit(layer: LogLayer, channel: LogChannel, args: fmt::Arguments<'_>) {
    if !channel_enabled(layer, channel) {
        return;
    }

    let target = layer.target();
    match channel {
        LogChannel::Heading => log::log!(target: target, channel.level(), "==== {args} ===="),
        LogChannel::Success => log::log!(target: target, channel.level(), "[ok] {args}"),
        _ => log::log!(target: target, channel.level(), "{args}"),
    }

    if channel == LogChannel::Error && errors_escalate() {
        panic!("[{}] {}", layer.name(), args);
    }
}

/// Logs an error and aborts. Prefer the [`rhi_fatal!`] macro.
#[cold]
#[track_caller]
pub fn fatal(layer: LogLayer, args: fmt::Arguments<'_>) -> ! {
    if channel_enabled(layer, LogChannel::Error) {
        log::error!(target: layer.target(), "{args}");
    }
    panic!("[{}] {}", layer.name(), args);
}

/// Logs a message on a layer and channel.
///
/// ```ignore
/// rhi_log!(LogLayer::Rhi, LogChannel::Info, "created buffer '{}'", label);
/// ```
#[macro_export]
macro_rules! rhi_log {
    ($layer:expr, $channel:expr, $($arg:tt)+) => {
        $crate::logging::emit($layer, $channel, format_args!($($arg)+))
    };
}

/// Logs an error on a layer and panics. Used for precondition violations.
#[macro_export]
macro_rules! rhi_fatal {
    ($layer:expr, $($arg:tt)+) => {
        $crate::logging::fatal($layer, format_args!($($arg)+))
    };
}

/// Panics through [`rhi_fatal!`] when a precondition does not hold.
#[macro_export]
macro_rules! rhi_ensure {
    ($cond:expr, $layer:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::rhi_fatal!($layer, $($arg)+);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_round_trip() {
        for layer in LogLayer::ALL {
            assert_eq!(LogLayer::from_target(layer.target()), Some(layer));
        }
        assert_eq!(LogLayer::from_target("wgpu_core"), None);
    }

    #[test]
    fn config_masks_default_to_all() {
        let mut config = LogConfig::default();
        config
            .layers
            .insert(LogLayer::Memory, vec![LogChannel::Warning, LogChannel::Error]);

        assert_eq!(config.channels_for(LogLayer::Rhi), LogChannels::ALL);
        let memory = config.channels_for(LogLayer::Memory);
        assert!(memory.contains(LogChannels::WARNING | LogChannels::ERROR));
        assert!(!memory.contains(LogChannels::INFO));
    }

    #[test]
    fn config_deserializes_from_json() {
        let json = r#"{
            "layers": { "render_graph": ["info", "success"] },
            "escalate_errors": false
        }"#;
        let config: LogConfig = serde_json::from_str(json).unwrap();
        assert!(!config.escalate_errors);
        assert_eq!(config.max_level, "info");
        assert_eq!(
            config.channels_for(LogLayer::RenderGraph),
            LogChannels::INFO | LogChannels::SUCCESS
        );
    }

    #[test]
    fn level_filter_falls_back_to_info() {
        let config = LogConfig {
            max_level: "chatty".into(),
            ..LogConfig::default()
        };
        assert_eq!(config.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    #[should_panic(expected = "[UPLOADER] staging exhausted")]
    fn fatal_always_panics() {
        rhi_fatal!(LogLayer::Uploader, "staging exhausted");
    }
}
