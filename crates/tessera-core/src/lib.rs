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

//! Foundational crate of Tessera: the contracts of the Render Hardware Interface.
//!
//! This crate holds everything that does not depend on a native graphics API:
//! descriptors and flags, the abstract resource states, the backend trait, the
//! bindless slot allocator, the shared fence state machine, error types,
//! configuration, the logging contract and allocation tracking.

#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod memory;
pub mod rhi;
pub mod utils;

pub use config::RhiConfig;
pub use logging::{LogChannel, LogConfig, LogLayer};
