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

//! Abstract resource states and their access categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The usage mode a buffer or texture is currently in.
///
/// Moving a resource between states requires an explicit transition barrier.
/// Backends translate each state into their native barrier vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// Contents are undefined. Only valid as the source of a transition.
    Undefined,
    /// Generic state usable by every queue.
    Common,
    /// Read as vertex input.
    VertexBuffer,
    /// Read as index input.
    IndexBuffer,
    /// Read as a uniform/constant buffer.
    ConstantBuffer,
    /// Read from shaders (sampled image, read-only storage).
    ShaderResource,
    /// Read and written from shaders.
    UnorderedAccess,
    /// Written as a colour attachment.
    RenderTarget,
    /// Read-only depth/stencil attachment.
    DepthRead,
    /// Writable depth/stencil attachment.
    DepthWrite,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDest,
    /// Read as indirect draw/dispatch arguments.
    IndirectArgument,
    /// Ready to be presented.
    Present,
}

/// The semantic category of access a state grants.
///
/// Two states in the same category are interchangeable from the point of view of
/// a native barrier; some backends alias them (D3D12 has one bit for vertex and
/// constant buffers, and `COMMON == PRESENT == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCategory {
    /// No pending access.
    Idle,
    /// Fixed-function vertex or constant-buffer read.
    VertexOrConstantRead,
    /// Fixed-function index read.
    IndexRead,
    /// Shader read.
    ShaderRead,
    /// Shader read/write.
    ShaderWrite,
    /// Colour attachment output.
    ColorAttachment,
    /// Depth test without writes.
    DepthRead,
    /// Depth test with writes.
    DepthWrite,
    /// Transfer read.
    TransferRead,
    /// Transfer write.
    TransferWrite,
    /// Indirect argument fetch.
    IndirectRead,
}

impl ResourceState {
    /// Every state, in declaration order.
    pub const ALL: [ResourceState; 14] = [
        ResourceState::Undefined,
        ResourceState::Common,
        ResourceState::VertexBuffer,
        ResourceState::IndexBuffer,
        ResourceState::ConstantBuffer,
        ResourceState::ShaderResource,
        ResourceState::UnorderedAccess,
        ResourceState::RenderTarget,
        ResourceState::DepthRead,
        ResourceState::DepthWrite,
        ResourceState::CopySource,
        ResourceState::CopyDest,
        ResourceState::IndirectArgument,
        ResourceState::Present,
    ];

    /// The access category of this state.
    pub const fn category(self) -> AccessCategory {
        match self {
            ResourceState::Undefined | ResourceState::Common | ResourceState::Present => {
                AccessCategory::Idle
            }
            ResourceState::VertexBuffer | ResourceState::ConstantBuffer => {
                AccessCategory::VertexOrConstantRead
            }
            ResourceState::IndexBuffer => AccessCategory::IndexRead,
            ResourceState::ShaderResource => AccessCategory::ShaderRead,
            ResourceState::UnorderedAccess => AccessCategory::ShaderWrite,
            ResourceState::RenderTarget => AccessCategory::ColorAttachment,
            ResourceState::DepthRead => AccessCategory::DepthRead,
            ResourceState::DepthWrite => AccessCategory::DepthWrite,
            ResourceState::CopySource => AccessCategory::TransferRead,
            ResourceState::CopyDest => AccessCategory::TransferWrite,
            ResourceState::IndirectArgument => AccessCategory::IndirectRead,
        }
    }

    /// Returns `true` if the state allows GPU writes.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            ResourceState::UnorderedAccess
                | ResourceState::RenderTarget
                | ResourceState::DepthWrite
                | ResourceState::CopyDest
                | ResourceState::Common
        )
    }

    /// Returns `true` if the state only makes sense for textures.
    pub const fn is_texture_only(self) -> bool {
        matches!(
            self,
            ResourceState::RenderTarget
                | ResourceState::DepthRead
                | ResourceState::DepthWrite
                | ResourceState::Present
        )
    }

    /// Returns `true` if the state only makes sense for buffers.
    pub const fn is_buffer_only(self) -> bool {
        matches!(
            self,
            ResourceState::VertexBuffer
                | ResourceState::IndexBuffer
                | ResourceState::ConstantBuffer
                | ResourceState::IndirectArgument
        )
    }

    /// Returns `true` if `self` and `other` are in the same access category.
    pub const fn same_category(self, other: ResourceState) -> bool {
        self.category() as u8 == other.category() as u8
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::Undefined => "UNDEFINED",
            ResourceState::Common => "COMMON",
            ResourceState::VertexBuffer => "VERTEX_BUFFER",
            ResourceState::IndexBuffer => "INDEX_BUFFER",
            ResourceState::ConstantBuffer => "CONSTANT_BUFFER",
            ResourceState::ShaderResource => "SHADER_RESOURCE",
            ResourceState::UnorderedAccess => "UNORDERED_ACCESS",
            ResourceState::RenderTarget => "RENDER_TARGET",
            ResourceState::DepthRead => "DEPTH_READ",
            ResourceState::DepthWrite => "DEPTH_WRITE",
            ResourceState::CopySource => "COPY_SOURCE",
            ResourceState::CopyDest => "COPY_DEST",
            ResourceState::IndirectArgument => "INDIRECT_ARGUMENT",
            ResourceState::Present => "PRESENT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliased_states_share_a_category() {
        assert!(ResourceState::Common.same_category(ResourceState::Present));
        assert!(ResourceState::Undefined.same_category(ResourceState::Common));
        assert!(ResourceState::VertexBuffer.same_category(ResourceState::ConstantBuffer));
        assert!(!ResourceState::RenderTarget.same_category(ResourceState::ShaderResource));
        assert!(!ResourceState::CopySource.same_category(ResourceState::CopyDest));
    }

    #[test]
    fn buffer_and_texture_only_states_are_disjoint() {
        for state in ResourceState::ALL {
            assert!(!(state.is_buffer_only() && state.is_texture_only()), "{state}");
        }
    }

    #[test]
    fn display_uses_upper_snake_case() {
        assert_eq!(ResourceState::ShaderResource.to_string(), "SHADER_RESOURCE");
        assert_eq!(ResourceState::CopyDest.to_string(), "COPY_DEST");
    }
}
