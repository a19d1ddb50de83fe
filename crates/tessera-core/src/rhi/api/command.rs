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

//! Data structures used while recording and submitting commands.

use super::texture::{Extent3D, Origin3D};
use std::fmt;

/// The kind of queue a command pool, command buffer or queue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Graphics, compute and transfer.
    Graphics,
    /// Compute and transfer.
    Compute,
    /// Transfer only.
    Transfer,
}

impl QueueType {
    /// Returns `true` if draws and render passes may be recorded.
    pub const fn supports_graphics(self) -> bool {
        matches!(self, QueueType::Graphics)
    }

    /// Returns `true` if dispatches may be recorded.
    pub const fn supports_compute(self) -> bool {
        matches!(self, QueueType::Graphics | QueueType::Compute)
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueType::Graphics => write!(f, "graphics"),
            QueueType::Compute => write!(f, "compute"),
            QueueType::Transfer => write!(f, "transfer"),
        }
    }
}

/// The lifecycle state of a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferState {
    /// Freshly allocated or reset.
    Initial,
    /// Between `begin` and `end`.
    Recording,
    /// Ended and ready for submission.
    Executable,
    /// Submitted and not yet known to be retired.
    Pending,
}

/// What happens to an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<V> {
    /// Keep the existing contents.
    Load,
    /// Clear to a value.
    Clear(V),
    /// Contents are undefined.
    DontCare,
}

/// What happens to an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Keep the rendered contents.
    Store,
    /// Contents may be discarded.
    DontCare,
}

/// A colour attachment as seen by a backend.
#[derive(Debug, Clone, Copy)]
pub struct ColorAttachmentDesc<'a, V> {
    /// The native attachment view.
    pub view: &'a V,
    /// Load operation with its clear colour.
    pub load_op: LoadOp<[f32; 4]>,
    /// Store operation.
    pub store_op: StoreOp,
}

/// A depth/stencil attachment as seen by a backend.
#[derive(Debug, Clone, Copy)]
pub struct DepthAttachmentDesc<'a, V> {
    /// The native attachment view.
    pub view: &'a V,
    /// Depth load operation with its clear depth.
    pub depth_load_op: LoadOp<f32>,
    /// Depth store operation.
    pub depth_store_op: StoreOp,
    /// Stencil load operation with its clear value.
    pub stencil_load_op: LoadOp<u8>,
    /// Stencil store operation.
    pub stencil_store_op: StoreOp,
}

/// A dynamic rendering pass as seen by a backend.
#[derive(Debug, Clone)]
pub struct RenderingDesc<'a, V> {
    /// The rendered area.
    pub render_area: Extent3D,
    /// Colour attachments in slot order.
    pub color_attachments: Vec<ColorAttachmentDesc<'a, V>>,
    /// Optional depth/stencil attachment.
    pub depth_attachment: Option<DepthAttachmentDesc<'a, V>>,
}

/// A viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Near depth.
    pub min_depth: f32,
    /// Far depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `width x height` with the full depth range.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// The layout of texel data inside a buffer for buffer/texture copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferTextureLayout {
    /// Offset of the first texel in the buffer.
    pub offset: u64,
    /// Bytes between the starts of consecutive rows.
    pub bytes_per_row: u32,
    /// Rows between the starts of consecutive depth slices.
    pub rows_per_image: u32,
}

/// A region of one texture subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRegion {
    /// Mip level.
    pub mip_level: u32,
    /// Array layer.
    pub array_layer: u32,
    /// First texel.
    pub origin: Origin3D,
    /// Size in texels.
    pub extent: Extent3D,
}

/// Counters of the commands recorded since the last `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingStats {
    /// Transition barriers recorded.
    pub barriers: u32,
    /// Draw calls recorded.
    pub draws: u32,
    /// Dispatches recorded.
    pub dispatches: u32,
    /// Copies recorded.
    pub copies: u32,
    /// Render passes begun.
    pub render_passes: u32,
    /// Push-constant uploads.
    pub push_constant_uploads: u32,
}

impl RecordingStats {
    /// Total number of recorded commands counted here.
    pub fn total(&self) -> u32 {
        self.barriers
            + self.draws
            + self.dispatches
            + self.copies
            + self.render_passes
            + self.push_constant_uploads
    }
}
