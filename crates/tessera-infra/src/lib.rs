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

//! Concrete backends of the Tessera RHI and the logging sink.
//!
//! Both backends speak their native API vocabulary and execute on a software
//! adapter: host memory plus one worker thread per queue.

pub mod graphics;
pub mod logging;

pub use graphics::d3d12::D3d12Backend;
pub use graphics::vulkan::VulkanBackend;

/// The backend selected at compile time.
#[cfg(not(feature = "backend-d3d12"))]
pub type DefaultBackend = VulkanBackend;

/// The backend selected at compile time.
#[cfg(feature = "backend-d3d12")]
pub type DefaultBackend = D3d12Backend;
