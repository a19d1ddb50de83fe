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

//! The `env_logger` sink behind [`tessera_core::logging`].

use env_logger::{Builder, Env};
use std::io::Write;
use tessera_core::logging::{apply_config, LogConfig, LogLayer};

/// Formats the layer column of a record: the layer name for Tessera targets,
/// the raw target otherwise.
pub fn layer_column(target: &str) -> String {
    LogLayer::from_target(target)
        .map(|layer| layer.name().to_owned())
        .unwrap_or_else(|| target.to_owned())
}

/// Applies `config` to the channel filter and installs the `env_logger` sink.
///
/// `RUST_LOG` overrides the configured level. Returns `false` when a logger
/// was already installed; the channel masks are applied either way.
pub fn init(config: &LogConfig) -> bool {
    apply_config(config);
    let default_level = config.level_filter().to_string().to_lowercase();
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:<5}] [{}] {}",
                record.level(),
                layer_column(record.target()),
                record.args()
            )
        })
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_names_replace_tessera_targets() {
        assert_eq!(layer_column("tessera::render_graph"), "RENDER_GRAPH");
        assert_eq!(layer_column("flume"), "flume");
    }

    #[test]
    fn init_twice_keeps_the_first_sink() {
        let config = LogConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
