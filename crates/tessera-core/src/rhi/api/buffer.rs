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

//! Defines data structures related to GPU buffer resources.

use crate::tessera_bitflags;
use std::borrow::Cow;

tessera_bitflags! {
    /// A set of flags describing the allowed usages of a buffer.
    ///
    /// Usage flags are fixed at creation. Every operation that consumes a buffer
    /// checks the matching bit and aborts when it is missing.
    pub struct BufferUsage: u32 {
        /// The buffer can be used as the source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// The buffer can be used as the destination of a copy operation.
        const COPY_DST = 1 << 1;
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 2;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 3;
        /// The buffer can be viewed as a uniform buffer.
        const UNIFORM = 1 << 4;
        /// The buffer can be viewed as a storage buffer.
        const STORAGE = 1 << 5;
        /// The buffer can be used for indirect draw or dispatch arguments.
        const INDIRECT = 1 << 6;
    }
}

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryLocation {
    /// Device-local memory, not host visible.
    #[default]
    GpuOnly,
    /// Host-visible memory written by the CPU (upload heap).
    CpuToGpu,
    /// Host-visible memory read by the CPU (readback heap).
    GpuToCpu,
}

impl MemoryLocation {
    /// Returns `true` if the CPU can map this memory.
    pub const fn is_host_visible(self) -> bool {
        !matches!(self, MemoryLocation::GpuOnly)
    }
}

/// A descriptor used to create a buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be used.
    pub usage: BufferUsage,
    /// Where the memory lives.
    pub location: MemoryLocation,
}

impl<'a> BufferDescriptor<'a> {
    /// A device-local buffer.
    pub fn new(label: impl Into<Cow<'a, str>>, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(label.into()),
            size,
            usage,
            location: MemoryLocation::GpuOnly,
        }
    }

    /// Replaces the memory location.
    #[must_use]
    pub fn with_location(mut self, location: MemoryLocation) -> Self {
        self.location = location;
        self
    }

    /// The label, or a placeholder.
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed buffer>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_location() {
        let desc = BufferDescriptor::new("staging", 1024, BufferUsage::COPY_SRC)
            .with_location(MemoryLocation::CpuToGpu);
        assert_eq!(desc.location, MemoryLocation::CpuToGpu);
        assert!(desc.location.is_host_visible());
        assert_eq!(desc.label_or_default(), "staging");
        assert!(!MemoryLocation::GpuOnly.is_host_visible());
    }
}
