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

//! Command allocators, graphics command lists and the calls they record.

use super::context::{D3d12AttachmentView, D3d12Context};
use super::conversions::state_from_d3d12;
use super::native::*;
use crate::graphics::software::{AllocationRef, HostOp};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    BufferTextureLayout, Extent3D, Origin3D, QueueType, TextureRegion,
};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// `D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES`.
pub const ALL_SUBRESOURCES: u32 = 0xFFFF_FFFF;

/// An `ID3D12CommandAllocator`.
#[derive(Debug)]
pub struct D3d12CommandAllocator {
    /// Object identity.
    pub id: u64,
    /// The list type it allocates for.
    pub list_type: D3D12_COMMAND_LIST_TYPE,
    /// The matching queue type.
    pub queue_type: QueueType,
}

/// A transition `D3D12_RESOURCE_BARRIER`.
#[derive(Debug, Clone)]
pub struct D3d12Barrier {
    /// `pResource`.
    pub resource: AllocationRef,
    /// `Subresource`.
    pub subresource: u32,
    /// `StateBefore`.
    pub state_before: D3D12_RESOURCE_STATES,
    /// `StateAfter`.
    pub state_after: D3D12_RESOURCE_STATES,
}

/// The clear value of a render pass target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum D3d12ClearValue {
    /// `Color`.
    Color([f32; 4]),
    /// `DepthStencil`.
    DepthStencil {
        /// Depth.
        depth: f32,
        /// Stencil.
        stencil: u8,
    },
}

/// A `D3D12_RENDER_PASS_RENDER_TARGET_DESC` or `D3D12_RENDER_PASS_DEPTH_STENCIL_DESC`.
#[derive(Debug, Clone)]
pub struct D3d12RenderPassTarget {
    /// The RTV or DSV.
    pub view: D3d12AttachmentView,
    /// `BeginningAccess.Type`.
    pub beginning_access: D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE,
    /// `BeginningAccess.Clear.ClearValue`.
    pub clear_value: D3d12ClearValue,
    /// `EndingAccess.Type`.
    pub ending_access: D3D12_RENDER_PASS_ENDING_ACCESS_TYPE,
}

/// `D3D12_SUBRESOURCE_FOOTPRINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3d12Footprint {
    /// `Format`.
    pub format: DXGI_FORMAT,
    /// `Width`.
    pub width: u32,
    /// `Height`.
    pub height: u32,
    /// `Depth`.
    pub depth: u32,
    /// `RowPitch`, a multiple of 256.
    pub row_pitch: u32,
}

/// `D3D12_TEXTURE_COPY_LOCATION`.
#[derive(Debug, Clone)]
pub enum D3d12CopyLocation {
    /// `D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX`.
    SubresourceIndex {
        /// The texture.
        resource: AllocationRef,
        /// `D3D12CalcSubresource(mip, layer, mip_levels)`.
        subresource: u32,
        /// Mip count of the texture, to split the index back.
        mip_levels: u32,
    },
    /// `D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT`.
    PlacedFootprint {
        /// The buffer.
        resource: AllocationRef,
        /// `Offset`, a multiple of 512.
        offset: u64,
        /// `Footprint`.
        footprint: D3d12Footprint,
    },
}

/// `D3D12_BOX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3d12Box {
    /// Left.
    pub left: u32,
    /// Top.
    pub top: u32,
    /// Front.
    pub front: u32,
    /// Right, exclusive.
    pub right: u32,
    /// Bottom, exclusive.
    pub bottom: u32,
    /// Back, exclusive.
    pub back: u32,
}

impl D3d12Box {
    /// The box covering `extent` texels from `origin`.
    pub fn new(origin: Origin3D, extent: Extent3D) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            front: origin.z,
            right: origin.x + extent.width,
            bottom: origin.y + extent.height,
            back: origin.z + extent.depth,
        }
    }

    fn origin(&self) -> Origin3D {
        Origin3D {
            x: self.left,
            y: self.top,
            z: self.front,
        }
    }

    fn extent(&self) -> Extent3D {
        Extent3D {
            width: self.right.saturating_sub(self.left),
            height: self.bottom.saturating_sub(self.top),
            depth: self.back.saturating_sub(self.front),
        }
    }
}

/// A recorded `ID3D12GraphicsCommandList` call.
#[derive(Debug, Clone)]
pub enum D3d12Cmd {
    /// `ResourceBarrier` with one transition.
    ResourceBarrier(D3d12Barrier),
    /// `BeginRenderPass`.
    BeginRenderPass {
        /// Render targets.
        render_targets: Vec<D3d12RenderPassTarget>,
        /// Depth/stencil target.
        depth_stencil: Option<D3d12RenderPassTarget>,
    },
    /// `EndRenderPass`.
    EndRenderPass,
    /// `SetPipelineState`.
    SetPipelineState(u64),
    /// `IASetPrimitiveTopology`.
    IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY),
    /// `SetDescriptorHeaps` with the CBV/SRV/UAV and sampler heaps.
    SetDescriptorHeaps,
    /// `SetGraphicsRootSignature` or `SetComputeRootSignature`.
    SetRootSignature {
        /// Compute or graphics slot.
        compute: bool,
        /// The root signature.
        root_signature: u64,
    },
    /// `SetGraphicsRootDescriptorTable` or `SetComputeRootDescriptorTable`.
    SetRootDescriptorTable {
        /// Compute or graphics slot.
        compute: bool,
        /// `RootParameterIndex`.
        root_parameter_index: u32,
        /// The heap the table starts in.
        heap_type: D3D12_DESCRIPTOR_HEAP_TYPE,
    },
    /// `SetGraphicsRoot32BitConstants` or `SetComputeRoot32BitConstants`.
    SetRoot32BitConstants {
        /// Compute or graphics slot.
        compute: bool,
        /// `RootParameterIndex`.
        root_parameter_index: u32,
        /// `pSrcData`.
        values: Vec<u32>,
        /// `DestOffsetIn32BitValues`.
        dest_offset: u32,
    },
    /// `IASetVertexBuffers` with one view.
    IASetVertexBuffers {
        /// `StartSlot`.
        slot: u32,
        /// `BufferLocation`.
        buffer_location: D3D12_GPU_VIRTUAL_ADDRESS,
        /// `SizeInBytes`.
        size_in_bytes: u32,
        /// `StrideInBytes`, taken from the bound pipeline.
        stride_in_bytes: u32,
    },
    /// `IASetIndexBuffer`.
    IASetIndexBuffer {
        /// `BufferLocation`.
        buffer_location: D3D12_GPU_VIRTUAL_ADDRESS,
        /// `SizeInBytes`.
        size_in_bytes: u32,
        /// `Format`.
        format: DXGI_FORMAT,
    },
    /// `RSSetViewports` with one viewport.
    RSSetViewports {
        /// `TopLeftX`, `TopLeftY`, `Width`, `Height`.
        rect: [f32; 4],
        /// `MinDepth`, `MaxDepth`.
        depth: [f32; 2],
    },
    /// `RSSetScissorRects` with one rectangle (`left`, `top`, `right`, `bottom`).
    RSSetScissorRects([i32; 4]),
    /// `DrawInstanced`.
    DrawInstanced {
        /// `VertexCountPerInstance`.
        vertex_count_per_instance: u32,
        /// `InstanceCount`.
        instance_count: u32,
        /// `StartVertexLocation`.
        start_vertex_location: u32,
        /// `StartInstanceLocation`.
        start_instance_location: u32,
    },
    /// `DrawIndexedInstanced`.
    DrawIndexedInstanced {
        /// `IndexCountPerInstance`.
        index_count_per_instance: u32,
        /// `InstanceCount`.
        instance_count: u32,
        /// `StartIndexLocation`.
        start_index_location: u32,
        /// `BaseVertexLocation`.
        base_vertex_location: i32,
        /// `StartInstanceLocation`.
        start_instance_location: u32,
    },
    /// `Dispatch`.
    Dispatch([u32; 3]),
    /// `CopyBufferRegion`.
    CopyBufferRegion {
        /// `pDstBuffer`.
        dst: AllocationRef,
        /// `DstOffset`.
        dst_offset: u64,
        /// `pSrcBuffer`.
        src: AllocationRef,
        /// `SrcOffset`.
        src_offset: u64,
        /// `NumBytes`.
        num_bytes: u64,
    },
    /// `CopyTextureRegion`.
    CopyTextureRegion {
        /// `pDst`.
        dst: D3d12CopyLocation,
        /// `DstX`, `DstY`, `DstZ`.
        dst_origin: Origin3D,
        /// `pSrc`.
        src: D3d12CopyLocation,
        /// `pSrcBox`.
        src_box: D3d12Box,
    },
}

/// An `ID3D12GraphicsCommandList`.
#[derive(Debug)]
pub struct D3d12GraphicsCommandList {
    /// Object identity.
    pub id: u64,
    /// `D3D12_COMMAND_LIST_TYPE`.
    pub list_type: D3D12_COMMAND_LIST_TYPE,
    /// The matching queue type.
    pub queue_type: QueueType,
    pub(crate) commands: Vec<D3d12Cmd>,
    pub(crate) open: bool,
    pub(crate) in_render_pass: bool,
    pub(crate) vertex_strides: Vec<u32>,
}

impl D3d12GraphicsCommandList {
    /// Created through `CreateCommandList` and closed right away.
    pub(crate) fn new(ctx: &D3d12Context, allocator: &D3d12CommandAllocator) -> Self {
        Self {
            id: ctx.next_object(),
            list_type: allocator.list_type,
            queue_type: allocator.queue_type,
            commands: Vec::new(),
            open: false,
            in_render_pass: false,
            vertex_strides: Vec::new(),
        }
    }

    /// The recorded calls.
    pub fn commands(&self) -> &[D3d12Cmd] {
        &self.commands
    }

    pub(crate) fn record(&mut self, cmd: D3d12Cmd) {
        if !self.open {
            rhi_log!(
                LogLayer::Backend,
                LogChannel::Warning,
                "call on a closed command list, ignored"
            );
            return;
        }
        match &cmd {
            D3d12Cmd::BeginRenderPass { .. } => self.in_render_pass = true,
            D3d12Cmd::EndRenderPass => self.in_render_pass = false,
            _ => {}
        }
        self.commands.push(cmd);
    }

    /// `ID3D12GraphicsCommandList::Reset`.
    pub(crate) fn reset(&mut self) {
        self.commands.clear();
        self.vertex_strides.clear();
        self.open = true;
        self.in_render_pass = false;
    }

    /// `ID3D12GraphicsCommandList::Close`.
    pub(crate) fn close(&mut self) -> RhiResult<()> {
        self.open = false;
        if self.in_render_pass {
            return Err(RhiError::Backend {
                call: "ID3D12GraphicsCommandList::Close",
                code: E_FAIL.0,
            });
        }
        Ok(())
    }

    /// Drops the recorded calls and leaves the list closed.
    pub(crate) fn discard(&mut self) {
        self.commands.clear();
        self.vertex_strides.clear();
        self.open = false;
        self.in_render_pass = false;
    }

    /// The stride the bound pipeline declares for a vertex buffer slot.
    pub(crate) fn vertex_stride(&self, slot: u32) -> u32 {
        self.vertex_strides.get(slot as usize).copied().unwrap_or(0)
    }

    /// Translates the recorded calls into host operations.
    pub fn lower(&self) -> Vec<HostOp> {
        let mut ops = Vec::with_capacity(self.commands.len());
        for cmd in &self.commands {
            match cmd {
                D3d12Cmd::ResourceBarrier(barrier) => ops.push(HostOp::Transition {
                    target: barrier.resource.clone(),
                    before: state_from_d3d12(barrier.state_before),
                    after: state_from_d3d12(barrier.state_after),
                }),
                D3d12Cmd::BeginRenderPass {
                    render_targets,
                    depth_stencil,
                } => {
                    for target in render_targets.iter().chain(depth_stencil) {
                        if target.beginning_access
                            == D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_CLEAR
                        {
                            lower_clear(target, &mut ops);
                        }
                    }
                }
                D3d12Cmd::DrawInstanced {
                    vertex_count_per_instance,
                    instance_count,
                    ..
                } => ops.push(HostOp::Draw {
                    elements: *vertex_count_per_instance,
                    instances: *instance_count,
                }),
                D3d12Cmd::DrawIndexedInstanced {
                    index_count_per_instance,
                    instance_count,
                    ..
                } => ops.push(HostOp::Draw {
                    elements: *index_count_per_instance,
                    instances: *instance_count,
                }),
                D3d12Cmd::Dispatch(groups) => ops.push(HostOp::Dispatch {
                    groups: groups.iter().map(|&g| u64::from(g)).product(),
                }),
                D3d12Cmd::CopyBufferRegion {
                    dst,
                    dst_offset,
                    src,
                    src_offset,
                    num_bytes,
                } => ops.push(HostOp::CopyBuffer {
                    src: src.clone(),
                    src_offset: *src_offset,
                    dst: dst.clone(),
                    dst_offset: *dst_offset,
                    size: *num_bytes,
                }),
                D3d12Cmd::CopyTextureRegion {
                    dst,
                    dst_origin,
                    src,
                    src_box,
                } => lower_texture_copy(dst, *dst_origin, src, src_box, &mut ops),
                D3d12Cmd::EndRenderPass
                | D3d12Cmd::SetPipelineState(_)
                | D3d12Cmd::IASetPrimitiveTopology(_)
                | D3d12Cmd::SetDescriptorHeaps
                | D3d12Cmd::SetRootSignature { .. }
                | D3d12Cmd::SetRootDescriptorTable { .. }
                | D3d12Cmd::SetRoot32BitConstants { .. }
                | D3d12Cmd::IASetVertexBuffers { .. }
                | D3d12Cmd::IASetIndexBuffer { .. }
                | D3d12Cmd::RSSetViewports { .. }
                | D3d12Cmd::RSSetScissorRects(_) => {}
            }
        }
        ops
    }
}

fn lower_clear(target: &D3d12RenderPassTarget, ops: &mut Vec<HostOp>) {
    let view = &target.view;
    let texel = match target.clear_value {
        D3d12ClearValue::Color(color) => view.format.pack_clear(color, 0.0, 0),
        D3d12ClearValue::DepthStencil { depth, stencil } => {
            view.format.pack_clear([0.0; 4], depth, stencil)
        }
    };
    match texel {
        Some(texel) => ops.push(HostOp::Fill {
            target: view.memory.clone(),
            mip_level: view.mip_slice,
            array_layer: view.array_slice,
            texel,
        }),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "clear of a {:?} target is not resolved on the host",
            view.format
        ),
    }
}

fn subresource_region(
    subresource: u32,
    mip_levels: u32,
    origin: Origin3D,
    extent: Extent3D,
) -> TextureRegion {
    let (mip_level, array_layer) = split_subresource(subresource, mip_levels);
    TextureRegion {
        mip_level,
        array_layer,
        origin,
        extent,
    }
}

fn footprint_layout(offset: u64, footprint: &D3d12Footprint) -> BufferTextureLayout {
    BufferTextureLayout {
        offset,
        bytes_per_row: footprint.row_pitch,
        rows_per_image: footprint.height,
    }
}

fn lower_texture_copy(
    dst: &D3d12CopyLocation,
    dst_origin: Origin3D,
    src: &D3d12CopyLocation,
    src_box: &D3d12Box,
    ops: &mut Vec<HostOp>,
) {
    use D3d12CopyLocation::{PlacedFootprint, SubresourceIndex};
    let extent = src_box.extent();
    match (dst, src) {
        (
            SubresourceIndex {
                resource: texture,
                subresource,
                mip_levels,
            },
            PlacedFootprint {
                resource: buffer,
                offset,
                footprint,
            },
        ) => ops.push(HostOp::CopyBufferToTexture {
            src: buffer.clone(),
            layout: footprint_layout(*offset, footprint),
            dst: texture.clone(),
            region: subresource_region(*subresource, *mip_levels, dst_origin, extent),
        }),
        (
            PlacedFootprint {
                resource: buffer,
                offset,
                footprint,
            },
            SubresourceIndex {
                resource: texture,
                subresource,
                mip_levels,
            },
        ) => ops.push(HostOp::CopyTextureToBuffer {
            src: texture.clone(),
            region: subresource_region(*subresource, *mip_levels, src_box.origin(), extent),
            dst: buffer.clone(),
            layout: footprint_layout(*offset, footprint),
        }),
        (
            SubresourceIndex {
                resource: dst_texture,
                subresource: dst_subresource,
                mip_levels: dst_mips,
            },
            SubresourceIndex {
                resource: src_texture,
                subresource: src_subresource,
                mip_levels: src_mips,
            },
        ) => ops.push(HostOp::CopyTexture {
            src: src_texture.clone(),
            src_region: subresource_region(*src_subresource, *src_mips, src_box.origin(), extent),
            dst: dst_texture.clone(),
            dst_region: subresource_region(*dst_subresource, *dst_mips, dst_origin, extent),
        }),
        (PlacedFootprint { .. }, PlacedFootprint { .. }) => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "CopyTextureRegion between two placed footprints is invalid, skipped"
        ),
    }
}

/// Builds the placed footprint of a buffer side of a texture copy.
///
/// Warns when the layout breaks the pitch or placement alignment.
pub(crate) fn placed_footprint(
    layout: &BufferTextureLayout,
    region: &TextureRegion,
    format: DXGI_FORMAT,
) -> D3d12Footprint {
    if layout.bytes_per_row % D3D12_TEXTURE_DATA_PITCH_ALIGNMENT != 0
        || layout.offset % D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT != 0
    {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "CopyTextureRegion footprint (offset {}, row pitch {}) is not {}/{}-byte aligned",
            layout.offset,
            layout.bytes_per_row,
            D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT,
            D3D12_TEXTURE_DATA_PITCH_ALIGNMENT
        );
    }
    D3d12Footprint {
        format,
        width: region.extent.width,
        height: layout.rows_per_image.max(region.extent.height),
        depth: region.extent.depth,
        row_pitch: layout.bytes_per_row,
    }
}

/// Packs push-constant bytes into 32-bit root constants, zero-padding the tail.
pub(crate) fn root_constants(data: &[u8]) -> Vec<u32> {
    data.chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_constants_pad_the_last_word() {
        assert_eq!(root_constants(&[1, 0, 0, 0, 2]), vec![1, 2]);
        assert!(root_constants(&[]).is_empty());
    }

    #[test]
    fn footprints_keep_the_row_pitch() {
        let layout = BufferTextureLayout {
            offset: 512,
            bytes_per_row: 256,
            rows_per_image: 8,
        };
        let region = TextureRegion {
            mip_level: 0,
            array_layer: 0,
            origin: Origin3D::ZERO,
            extent: Extent3D::new_2d(3, 4),
        };
        let footprint = placed_footprint(&layout, &region, DXGI_FORMAT_R8G8B8A8_UNORM);
        assert_eq!(footprint.row_pitch, 256);
        assert_eq!(footprint.height, 8);
        assert_eq!(footprint_layout(512, &footprint), layout);
    }

    #[test]
    fn boxes_carry_origin_and_extent() {
        let origin = Origin3D { x: 2, y: 3, z: 0 };
        let extent = Extent3D::new_2d(5, 6);
        let region = D3d12Box::new(origin, extent);
        assert_eq!(region.origin(), origin);
        assert_eq!(region.extent(), extent);
    }
}
