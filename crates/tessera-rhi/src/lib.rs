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

//! The RHI object model.
//!
//! Every object here is an owning handle around a native object of a backend
//! `B: RhiBackend`. Handles borrow the [`Device`] that created them, so the
//! device always outlives its resources, and release their native object and
//! bindless slot on drop.
//!
//! The device is single-threaded: it keeps its slot allocators behind
//! `RefCell`, which makes it `!Sync`.

#![warn(missing_docs)]

pub mod command;
pub mod device;
pub mod frame;
pub mod pipeline;
pub mod queue;
pub mod resource;
pub mod swapchain;
pub mod sync;
pub mod view;

pub use command::{ColorAttachment, CommandBuffer, CommandPool, DepthAttachment, RenderingInfo};
pub use device::Device;
pub use frame::FrameRing;
pub use pipeline::{Pipeline, RootSignature, Shader};
pub use queue::Queue;
pub use resource::{Buffer, ResourceRef, Texture};
pub use swapchain::{Surface, Swapchain};
pub use sync::{Fence, Semaphore};
pub use view::{BufferView, Sampler, TextureView};

pub use tessera_core::rhi::{RhiBackend, RhiError, RhiResult};
