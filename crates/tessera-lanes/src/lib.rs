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

//! Frame-level execution on top of the RHI.
//!
//! - [`uploader`] stages CPU data in one host-visible buffer and records the
//!   copies into device-local buffers and textures as a single submission.
//! - [`render_graph`] runs named passes in declaration order and records the
//!   resource-state transitions each pass needs.

#![warn(missing_docs)]

pub mod render_graph;
pub mod uploader;

pub use render_graph::{
    GraphBindings, GraphError, GraphExecutionReport, GraphTransition, PassResources, RenderGraph,
};
pub use uploader::{Subregion, UploadError, Uploader};
