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

use super::format::Format;
use super::texture::Extent3D;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// How presented images are queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// Wait for vertical blank, never tear.
    #[default]
    Fifo,
    /// Replace the queued image, never tear.
    Mailbox,
    /// Present immediately, may tear.
    Immediate,
}

/// What a surface presents to.
#[derive(Debug, Clone, Copy)]
pub enum SurfaceTarget {
    /// A native window.
    Window {
        /// The window handle.
        window: RawWindowHandle,
        /// The display connection.
        display: RawDisplayHandle,
        /// The window's inner size in pixels.
        extent: Extent3D,
    },
    /// An offscreen target of a fixed size.
    Headless {
        /// The target size in pixels.
        extent: Extent3D,
    },
}

impl SurfaceTarget {
    /// The initial size of the target.
    pub fn extent(&self) -> Extent3D {
        match self {
            SurfaceTarget::Window { extent, .. } | SurfaceTarget::Headless { extent } => *extent,
        }
    }
}

/// Surface capabilities reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// Supported back-buffer formats, preferred first.
    pub formats: Vec<Format>,
    /// Supported present modes.
    pub present_modes: Vec<PresentMode>,
    /// Fewest back buffers.
    pub min_image_count: u32,
    /// Most back buffers.
    pub max_image_count: u32,
}

/// A descriptor used to create a swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDescriptor {
    /// Back-buffer size.
    pub extent: Extent3D,
    /// Back-buffer format.
    pub format: Format,
    /// Number of back buffers (2 or 3).
    pub image_count: u32,
    /// Present mode.
    pub present_mode: PresentMode,
}

impl SwapchainDescriptor {
    /// Smallest supported back-buffer count.
    pub const MIN_IMAGES: u32 = 2;
    /// Largest supported back-buffer count.
    pub const MAX_IMAGES: u32 = 3;
}
