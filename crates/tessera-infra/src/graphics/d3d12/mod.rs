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

//! Direct3D 12-model backend.
//!
//! Native objects use the `d3d12.h` vocabulary (resource states, root
//! parameters, placed footprints with 256-byte row pitches). Closed command
//! lists run on the host execution substrate.

mod backend;
pub mod command;
pub mod context;
pub mod conversions;
pub mod native;
pub mod pipeline;
pub mod swapchain;
pub mod sync;

pub use backend::D3d12Backend;
pub use command::{D3d12Cmd, D3d12CommandAllocator, D3d12GraphicsCommandList};
pub use context::{D3d12AttachmentView, D3d12Buffer, D3d12Context, D3d12ShaderView, D3d12Texture};
pub use pipeline::{D3d12Pipeline, D3d12RootSignature, D3d12Shader, DXBC_FOURCC};
pub use swapchain::{D3d12Surface, D3d12Swapchain};
pub use sync::{D3d12Fence, D3d12Queue, D3d12Semaphore};
