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

//! Execution of lowered commands on host memory.

use super::memory::{Allocation, AllocationRef};
use std::ops::Range;
use std::sync::Arc;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{BufferTextureLayout, ResourceState, TextureRegion};
use tessera_core::rhi_log;

/// A backend-independent operation the queue worker executes.
///
/// Backends lower their native command lists into these at submission time.
#[derive(Debug, Clone)]
pub enum HostOp {
    /// Byte copy between buffers.
    CopyBuffer {
        /// Source.
        src: AllocationRef,
        /// Source offset.
        src_offset: u64,
        /// Destination.
        dst: AllocationRef,
        /// Destination offset.
        dst_offset: u64,
        /// Byte count.
        size: u64,
    },
    /// Buffer rows into a texture region.
    CopyBufferToTexture {
        /// Source buffer.
        src: AllocationRef,
        /// Row layout in the buffer.
        layout: BufferTextureLayout,
        /// Destination texture.
        dst: AllocationRef,
        /// Destination region.
        region: TextureRegion,
    },
    /// A texture region into buffer rows.
    CopyTextureToBuffer {
        /// Source texture.
        src: AllocationRef,
        /// Source region.
        region: TextureRegion,
        /// Destination buffer.
        dst: AllocationRef,
        /// Row layout in the buffer.
        layout: BufferTextureLayout,
    },
    /// Texture region to texture region.
    CopyTexture {
        /// Source texture.
        src: AllocationRef,
        /// Source region, also giving the extent.
        src_region: TextureRegion,
        /// Destination texture.
        dst: AllocationRef,
        /// Destination region.
        dst_region: TextureRegion,
    },
    /// Fills one subresource with a repeated texel (attachment clears).
    Fill {
        /// The texture.
        target: AllocationRef,
        /// Mip level.
        mip_level: u32,
        /// Array layer.
        array_layer: u32,
        /// The packed texel.
        texel: Vec<u8>,
    },
    /// A state transition, expressed through the backend's inverse mapping.
    Transition {
        /// The resource.
        target: AllocationRef,
        /// State before.
        before: ResourceState,
        /// State after.
        after: ResourceState,
    },
    /// A draw. Only counted.
    Draw {
        /// Vertices or indices per instance.
        elements: u32,
        /// Instances.
        instances: u32,
    },
    /// A dispatch. Only counted.
    Dispatch {
        /// Total workgroups.
        groups: u64,
    },
    /// Hands a back buffer to the presentation engine.
    Present {
        /// The swapchain image.
        target: AllocationRef,
    },
}

/// Counters of executed work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Copies executed.
    pub copies: u64,
    /// Bytes moved by copies.
    pub bytes_copied: u64,
    /// Transitions applied.
    pub transitions: u64,
    /// Draws executed.
    pub draws: u64,
    /// Dispatches executed.
    pub dispatches: u64,
    /// Subresources filled.
    pub fills: u64,
    /// Images presented.
    pub presents: u64,
}

/// Executes `op`, updating `stats`.
pub fn execute(op: &HostOp, stats: &mut ExecutionStats) {
    match op {
        HostOp::CopyBuffer {
            src,
            src_offset,
            dst,
            dst_offset,
            size,
        } => {
            let src_range = byte_range(*src_offset, *size);
            let dst_range = byte_range(*dst_offset, *size);
            with_pair(src, dst, |s, d| match d {
                Some(d) => copy_checked(s, src_range.clone(), d, dst_range.clone()),
                None => {
                    if check_range(s.len(), &src_range) && check_range(s.len(), &dst_range) {
                        s.copy_within(src_range.clone(), dst_range.start);
                    }
                }
            });
            stats.copies += 1;
            stats.bytes_copied += size;
        }
        HostOp::CopyBufferToTexture {
            src,
            layout,
            dst,
            region,
        } => {
            let rows = texture_rows(dst, region);
            with_pair(src, dst, |s, d| {
                let Some(d) = d else { return };
                for row in &rows {
                    copy_checked(
                        s,
                        byte_range(row.buffer_offset(layout), row.len()),
                        d,
                        row.texture_range.clone(),
                    );
                }
            });
            stats.copies += 1;
            stats.bytes_copied += rows.iter().map(TextureRow::len).sum::<u64>();
        }
        HostOp::CopyTextureToBuffer {
            src,
            region,
            dst,
            layout,
        } => {
            let rows = texture_rows(src, region);
            with_pair(src, dst, |s, d| {
                let Some(d) = d else { return };
                for row in &rows {
                    copy_checked(
                        s,
                        row.texture_range.clone(),
                        d,
                        byte_range(row.buffer_offset(layout), row.len()),
                    );
                }
            });
            stats.copies += 1;
            stats.bytes_copied += rows.iter().map(TextureRow::len).sum::<u64>();
        }
        HostOp::CopyTexture {
            src,
            src_region,
            dst,
            dst_region,
        } => {
            let src_rows = texture_rows(src, src_region);
            let dst_region = TextureRegion {
                extent: src_region.extent,
                ..*dst_region
            };
            let dst_rows = texture_rows(dst, &dst_region);
            with_pair(src, dst, |s, d| match d {
                Some(d) => {
                    for (from, to) in src_rows.iter().zip(&dst_rows) {
                        copy_checked(s, from.texture_range.clone(), d, to.texture_range.clone());
                    }
                }
                None => {
                    for (from, to) in src_rows.iter().zip(&dst_rows) {
                        if check_range(s.len(), &from.texture_range)
                            && check_range(s.len(), &to.texture_range)
                        {
                            s.copy_within(from.texture_range.clone(), to.texture_range.start);
                        }
                    }
                }
            });
            stats.copies += 1;
        }
        HostOp::Fill {
            target,
            mip_level,
            array_layer,
            texel,
        } => {
            if let Some(desc) = target.texture_layout() {
                let start = desc.subresource_offset(*mip_level, *array_layer);
                let range = byte_range(start, desc.subresource_size(*mip_level));
                let mut bytes = target.bytes();
                if check_range(bytes.len(), &range) && !texel.is_empty() {
                    for chunk in bytes[range].chunks_exact_mut(texel.len()) {
                        chunk.copy_from_slice(texel);
                    }
                }
            }
            stats.fills += 1;
        }
        HostOp::Transition {
            target,
            before,
            after,
        } => {
            target.transition(*before, *after);
            stats.transitions += 1;
        }
        HostOp::Draw { .. } => stats.draws += 1,
        HostOp::Dispatch { .. } => stats.dispatches += 1,
        HostOp::Present { target } => {
            let state = target.tracked_state();
            if !matches!(state, ResourceState::Present | ResourceState::Common) {
                rhi_log!(
                    LogLayer::Backend,
                    LogChannel::Warning,
                    "'{}' presented while in {}",
                    target.label(),
                    state
                );
            }
            stats.presents += 1;
        }
    }
}

fn byte_range(offset: u64, size: u64) -> Range<usize> {
    offset as usize..(offset + size) as usize
}

fn check_range(len: usize, range: &Range<usize>) -> bool {
    let ok = range.start <= range.end && range.end <= len;
    if !ok {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "copy range {:?} outside of a {} byte allocation, skipped",
            range,
            len
        );
    }
    ok
}

fn copy_checked(src: &[u8], src_range: Range<usize>, dst: &mut [u8], dst_range: Range<usize>) {
    if check_range(src.len(), &src_range) && check_range(dst.len(), &dst_range) {
        dst[dst_range].copy_from_slice(&src[src_range]);
    }
}

/// Locks two allocations in id order and runs `f` on their contents.
///
/// When both are the same allocation, `f` receives it once as `src` and `None`.
fn with_pair(
    src: &Arc<Allocation>,
    dst: &Arc<Allocation>,
    f: impl FnOnce(&mut [u8], Option<&mut [u8]>),
) {
    if Arc::ptr_eq(src, dst) {
        let mut bytes = src.bytes();
        f(&mut bytes, None);
        return;
    }
    if src.id() < dst.id() {
        let mut s = src.bytes();
        let mut d = dst.bytes();
        f(&mut s, Some(&mut d));
    } else {
        let mut d = dst.bytes();
        let mut s = src.bytes();
        f(&mut s, Some(&mut d));
    }
}

/// One row of texels inside a texture subresource.
struct TextureRow {
    slice: u32,
    row: u32,
    texture_range: Range<usize>,
}

impl TextureRow {
    fn len(&self) -> u64 {
        self.texture_range.len() as u64
    }

    /// Offset of this row in a linear buffer laid out by `layout`.
    fn buffer_offset(&self, layout: &BufferTextureLayout) -> u64 {
        let row_pitch = u64::from(layout.bytes_per_row);
        layout.offset
            + u64::from(self.slice) * u64::from(layout.rows_per_image) * row_pitch
            + u64::from(self.row) * row_pitch
    }
}

fn texture_rows(texture: &Allocation, region: &TextureRegion) -> Vec<TextureRow> {
    let Some(desc) = texture.texture_layout() else {
        return Vec::new();
    };
    let texel = u64::from(desc.format.bytes_per_texel());
    let mip_size = desc.size.mip_level_size(region.mip_level);
    let base = desc.subresource_offset(region.mip_level, region.array_layer);
    let row_pitch = u64::from(mip_size.width) * texel;
    let slice_pitch = row_pitch * u64::from(mip_size.height);
    let row_bytes = u64::from(region.extent.width) * texel;

    let mut rows = Vec::with_capacity((region.extent.height * region.extent.depth) as usize);
    for slice in 0..region.extent.depth {
        for row in 0..region.extent.height {
            let start = base
                + u64::from(region.origin.z + slice) * slice_pitch
                + u64::from(region.origin.y + row) * row_pitch
                + u64::from(region.origin.x) * texel;
            rows.push(TextureRow {
                slice,
                row,
                texture_range: byte_range(start, row_bytes),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::super::memory::{AllocationShape, HostHeap};
    use super::*;
    use tessera_core::rhi::api::{Extent3D, Format, Origin3D, TextureUsage};
    use tessera_core::rhi::api::TextureDescriptor;

    fn buffer(heap: &Arc<HostHeap>, size: u64) -> AllocationRef {
        Allocation::new(heap, size, AllocationShape::Buffer, "buffer").unwrap()
    }

    fn texture(heap: &Arc<HostHeap>, width: u32, height: u32) -> AllocationRef {
        let usage = TextureUsage::COPY_DST | TextureUsage::COPY_SRC;
        let desc = TextureDescriptor::new_2d("tex", width, height, Format::Rgba8Unorm, usage);
        Allocation::new(heap, desc.total_size(), AllocationShape::texture(&desc), "tex").unwrap()
    }

    #[test]
    fn buffer_copy_moves_bytes() {
        let heap = HostHeap::new(1 << 20);
        let src = buffer(&heap, 16);
        let dst = buffer(&heap, 16);
        src.bytes().copy_from_slice(&[7; 16]);

        let mut stats = ExecutionStats::default();
        execute(
            &HostOp::CopyBuffer {
                src: src.clone(),
                src_offset: 4,
                dst: dst.clone(),
                dst_offset: 8,
                size: 8,
            },
            &mut stats,
        );
        assert_eq!(&dst.bytes()[..], &[0, 0, 0, 0, 0, 0, 0, 0, 7, 7, 7, 7, 7, 7, 7, 7]);
        assert_eq!(stats.bytes_copied, 8);
    }

    #[test]
    fn padded_rows_land_tightly_in_the_texture() {
        let heap = HostHeap::new(1 << 20);
        let staging = buffer(&heap, 512);
        let tex = texture(&heap, 2, 2);
        {
            let mut bytes = staging.bytes();
            bytes[0..8].copy_from_slice(&[1; 8]);
            // Second row starts at the 256-byte pitch.
            bytes[256..264].copy_from_slice(&[2; 8]);
        }

        let mut stats = ExecutionStats::default();
        execute(
            &HostOp::CopyBufferToTexture {
                src: staging.clone(),
                layout: BufferTextureLayout {
                    offset: 0,
                    bytes_per_row: 256,
                    rows_per_image: 2,
                },
                dst: tex.clone(),
                region: TextureRegion {
                    mip_level: 0,
                    array_layer: 0,
                    origin: Origin3D::ZERO,
                    extent: Extent3D::new_2d(2, 2),
                },
            },
            &mut stats,
        );
        assert_eq!(&tex.bytes()[..], &[1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2]);
        assert_eq!(stats.bytes_copied, 16);
    }

    #[test]
    fn readback_rows_follow_the_buffer_layout() {
        let heap = HostHeap::new(1 << 20);
        let tex = texture(&heap, 1, 2);
        tex.bytes().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let readback = buffer(&heap, 64);

        let mut stats = ExecutionStats::default();
        execute(
            &HostOp::CopyTextureToBuffer {
                src: tex.clone(),
                region: TextureRegion {
                    mip_level: 0,
                    array_layer: 0,
                    origin: Origin3D::ZERO,
                    extent: Extent3D::new_2d(1, 2),
                },
                dst: readback.clone(),
                layout: BufferTextureLayout {
                    offset: 16,
                    bytes_per_row: 32,
                    rows_per_image: 2,
                },
            },
            &mut stats,
        );
        let bytes = readback.bytes();
        assert_eq!(&bytes[16..20], &[1, 2, 3, 4]);
        assert_eq!(&bytes[48..52], &[5, 6, 7, 8]);
        assert!(bytes[20..48].iter().all(|&b| b == 0));
        assert_eq!(stats.bytes_copied, 8);
    }

    #[test]
    fn fill_repeats_the_texel() {
        let heap = HostHeap::new(1 << 20);
        let tex = texture(&heap, 2, 1);
        let mut stats = ExecutionStats::default();
        execute(
            &HostOp::Fill {
                target: tex.clone(),
                mip_level: 0,
                array_layer: 0,
                texel: vec![9, 8, 7, 6],
            },
            &mut stats,
        );
        assert_eq!(&tex.bytes()[..], &[9, 8, 7, 6, 9, 8, 7, 6]);
    }

    #[test]
    fn out_of_range_copy_is_skipped() {
        let heap = HostHeap::new(1 << 20);
        let src = buffer(&heap, 4);
        let dst = buffer(&heap, 4);
        let mut stats = ExecutionStats::default();
        execute(
            &HostOp::CopyBuffer {
                src,
                src_offset: 0,
                dst: dst.clone(),
                dst_offset: 2,
                size: 4,
            },
            &mut stats,
        );
        assert_eq!(&dst.bytes()[..], &[0, 0, 0, 0]);
    }
}
