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

//! Vulkan-model backend.
//!
//! Native objects and barriers use the `ash` vocabulary (sync2 stage and access
//! masks, image layouts, `VkBufferImageCopy` row lengths in texels). Recorded
//! command buffers run on the host execution substrate.

mod backend;
pub mod command;
pub mod context;
pub mod conversions;
pub mod pipeline;
pub mod swapchain;
pub mod sync;

pub use backend::VulkanBackend;
pub use command::{VkCmd, VkCommandBuffer, VkCommandPool};
pub use context::{VkBuffer, VkDescriptor, VkImage, VkImageView, VkSamplerState, VulkanContext};
pub use pipeline::{VkPipeline, VkPipelineLayout, VkShaderModule, SPIRV_MAGIC};
pub use swapchain::{VkSurface, VkSwapchain};
pub use sync::{VkFence, VkQueue, VkSemaphore};
