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

//! Command pools, command buffers and the commands they record.

use super::context::{VkImageView, VulkanContext};
use super::conversions::{extent_from_vk, origin_from_vk, state_from_vk};
use crate::graphics::software::{AllocationRef, HostOp};
use ash::vk;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{BufferTextureLayout, Format, QueueType, TextureRegion};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// A `VkCommandPool` for one queue family.
#[derive(Debug)]
pub struct VkCommandPool {
    /// The pool handle.
    pub handle: vk::CommandPool,
    /// The queue family the pool allocates for.
    pub queue_family_index: u32,
    /// The queue type of that family.
    pub queue_type: QueueType,
}

/// A `VkImageMemoryBarrier2` or `VkBufferMemoryBarrier2`.
#[derive(Debug, Clone)]
pub struct VkBarrier {
    /// The resource memory.
    pub target: AllocationRef,
    /// Source stages.
    pub src_stage_mask: vk::PipelineStageFlags2,
    /// Source accesses.
    pub src_access_mask: vk::AccessFlags2,
    /// Destination stages.
    pub dst_stage_mask: vk::PipelineStageFlags2,
    /// Destination accesses.
    pub dst_access_mask: vk::AccessFlags2,
    /// Old layout. `UNDEFINED` for buffers.
    pub old_layout: vk::ImageLayout,
    /// New layout. `UNDEFINED` for buffers.
    pub new_layout: vk::ImageLayout,
    /// Aspects for images, empty for buffers.
    pub aspect_mask: vk::ImageAspectFlags,
}

/// The clear value of an attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VkClear {
    /// `VkClearColorValue::float32`.
    Color([f32; 4]),
    /// `VkClearDepthStencilValue`.
    DepthStencil {
        /// Depth.
        depth: f32,
        /// Stencil.
        stencil: u8,
    },
}

/// A `VkRenderingAttachmentInfo`.
#[derive(Debug, Clone)]
pub struct VkAttachment {
    /// The attachment view.
    pub view: VkImageView,
    /// Load operation.
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation.
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value, used with `LOAD_OP_CLEAR`.
    pub clear: VkClear,
}

/// A recorded `vkCmd*` call.
#[derive(Debug, Clone)]
pub enum VkCmd {
    /// `vkCmdPipelineBarrier2`.
    PipelineBarrier(VkBarrier),
    /// `vkCmdBeginRendering`.
    BeginRendering {
        /// Render area.
        render_area: vk::Rect2D,
        /// Colour attachments.
        color_attachments: Vec<VkAttachment>,
        /// Depth attachment.
        depth_attachment: Option<VkAttachment>,
    },
    /// `vkCmdEndRendering`.
    EndRendering,
    /// `vkCmdBindPipeline`.
    BindPipeline {
        /// Bind point.
        bind_point: vk::PipelineBindPoint,
        /// Pipeline.
        pipeline: vk::Pipeline,
    },
    /// `vkCmdBindDescriptorSets` for the bindless sets.
    BindDescriptorSets {
        /// Bind point.
        bind_point: vk::PipelineBindPoint,
        /// Layout.
        layout: vk::PipelineLayout,
        /// Resource set then sampler set.
        sets: [vk::DescriptorSet; 2],
    },
    /// `vkCmdPushConstants`.
    PushConstants {
        /// Layout.
        layout: vk::PipelineLayout,
        /// Stage flags of the range.
        stage_flags: vk::ShaderStageFlags,
        /// Byte offset.
        offset: u32,
        /// Values.
        values: Vec<u8>,
    },
    /// `vkCmdBindVertexBuffers`.
    BindVertexBuffer {
        /// Binding.
        binding: u32,
        /// Buffer.
        buffer: vk::Buffer,
        /// Offset.
        offset: u64,
    },
    /// `vkCmdBindIndexBuffer`.
    BindIndexBuffer {
        /// Buffer.
        buffer: vk::Buffer,
        /// Offset.
        offset: u64,
        /// Index type.
        index_type: vk::IndexType,
    },
    /// `vkCmdSetViewport`.
    SetViewport(vk::Viewport),
    /// `vkCmdSetScissor`.
    SetScissor(vk::Rect2D),
    /// `vkCmdDraw`.
    Draw {
        /// Vertex count.
        vertex_count: u32,
        /// Instance count.
        instance_count: u32,
        /// First vertex.
        first_vertex: u32,
        /// First instance.
        first_instance: u32,
    },
    /// `vkCmdDrawIndexed`.
    DrawIndexed {
        /// Index count.
        index_count: u32,
        /// Instance count.
        instance_count: u32,
        /// First index.
        first_index: u32,
        /// Vertex offset.
        vertex_offset: i32,
        /// First instance.
        first_instance: u32,
    },
    /// `vkCmdDispatch`.
    Dispatch {
        /// Group counts.
        group_count: [u32; 3],
    },
    /// `vkCmdCopyBuffer`.
    CopyBuffer {
        /// Source.
        src: AllocationRef,
        /// Destination.
        dst: AllocationRef,
        /// Region.
        region: vk::BufferCopy,
    },
    /// `vkCmdCopyBufferToImage`.
    CopyBufferToImage {
        /// Source.
        src: AllocationRef,
        /// Destination.
        dst: AllocationRef,
        /// Texel size of the destination format.
        texel_size: u32,
        /// Region.
        region: vk::BufferImageCopy,
    },
    /// `vkCmdCopyImageToBuffer`.
    CopyImageToBuffer {
        /// Source.
        src: AllocationRef,
        /// Destination.
        dst: AllocationRef,
        /// Texel size of the source format.
        texel_size: u32,
        /// Region.
        region: vk::BufferImageCopy,
    },
    /// `vkCmdCopyImage`.
    CopyImage {
        /// Source.
        src: AllocationRef,
        /// Destination.
        dst: AllocationRef,
        /// Region.
        region: vk::ImageCopy,
    },
}

/// A primary `VkCommandBuffer`.
#[derive(Debug)]
pub struct VkCommandBuffer {
    /// The command buffer handle.
    pub handle: vk::CommandBuffer,
    /// The queue family it records for.
    pub queue_family_index: u32,
    /// The queue type of that family.
    pub queue_type: QueueType,
    pub(crate) commands: Vec<VkCmd>,
    pub(crate) recording: bool,
    pub(crate) rendering: bool,
}

impl VkCommandBuffer {
    pub(crate) fn new(ctx: &VulkanContext, pool: &VkCommandPool) -> Self {
        Self {
            handle: ctx.next_handle(),
            queue_family_index: pool.queue_family_index,
            queue_type: pool.queue_type,
            commands: Vec::new(),
            recording: false,
            rendering: false,
        }
    }

    /// The recorded commands.
    pub fn commands(&self) -> &[VkCmd] {
        &self.commands
    }

    pub(crate) fn record(&mut self, cmd: VkCmd) {
        if !self.recording {
            rhi_log!(
                LogLayer::Backend,
                LogChannel::Warning,
                "vkCmd* on a command buffer that is not recording, ignored"
            );
            return;
        }
        match &cmd {
            VkCmd::BeginRendering { .. } => self.rendering = true,
            VkCmd::EndRendering => self.rendering = false,
            _ => {}
        }
        self.commands.push(cmd);
    }

    pub(crate) fn begin(&mut self) {
        self.commands.clear();
        self.recording = true;
        self.rendering = false;
    }

    pub(crate) fn end(&mut self) -> RhiResult<()> {
        self.recording = false;
        if self.rendering {
            return Err(RhiError::Backend {
                call: "vkEndCommandBuffer",
                code: vk::Result::ERROR_UNKNOWN.as_raw(),
            });
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.commands.clear();
        self.recording = false;
        self.rendering = false;
    }

    /// Translates the recorded commands into host operations.
    pub fn lower(&self) -> Vec<HostOp> {
        let mut ops = Vec::with_capacity(self.commands.len());
        for cmd in &self.commands {
            match cmd {
                VkCmd::PipelineBarrier(barrier) => ops.push(HostOp::Transition {
                    target: barrier.target.clone(),
                    before: state_from_vk(barrier.src_access_mask, barrier.old_layout),
                    after: state_from_vk(barrier.dst_access_mask, barrier.new_layout),
                }),
                VkCmd::BeginRendering {
                    color_attachments,
                    depth_attachment,
                    ..
                } => {
                    for attachment in color_attachments.iter().chain(depth_attachment) {
                        if attachment.load_op == vk::AttachmentLoadOp::CLEAR {
                            lower_clear(attachment, &mut ops);
                        }
                    }
                }
                VkCmd::Draw {
                    vertex_count,
                    instance_count,
                    ..
                } => ops.push(HostOp::Draw {
                    elements: *vertex_count,
                    instances: *instance_count,
                }),
                VkCmd::DrawIndexed {
                    index_count,
                    instance_count,
                    ..
                } => ops.push(HostOp::Draw {
                    elements: *index_count,
                    instances: *instance_count,
                }),
                VkCmd::Dispatch { group_count } => ops.push(HostOp::Dispatch {
                    groups: group_count.iter().map(|&g| u64::from(g)).product(),
                }),
                VkCmd::CopyBuffer { src, dst, region } => ops.push(HostOp::CopyBuffer {
                    src: src.clone(),
                    src_offset: region.src_offset,
                    dst: dst.clone(),
                    dst_offset: region.dst_offset,
                    size: region.size,
                }),
                VkCmd::CopyBufferToImage {
                    src,
                    dst,
                    texel_size,
                    region,
                } => {
                    let (layout, texture_region) = split_buffer_image_copy(region, *texel_size);
                    ops.push(HostOp::CopyBufferToTexture {
                        src: src.clone(),
                        layout,
                        dst: dst.clone(),
                        region: texture_region,
                    });
                }
                VkCmd::CopyImageToBuffer {
                    src,
                    dst,
                    texel_size,
                    region,
                } => {
                    let (layout, texture_region) = split_buffer_image_copy(region, *texel_size);
                    ops.push(HostOp::CopyTextureToBuffer {
                        src: src.clone(),
                        region: texture_region,
                        dst: dst.clone(),
                        layout,
                    });
                }
                VkCmd::CopyImage { src, dst, region } => ops.push(HostOp::CopyTexture {
                    src: src.clone(),
                    src_region: TextureRegion {
                        mip_level: region.src_subresource.mip_level,
                        array_layer: region.src_subresource.base_array_layer,
                        origin: origin_from_vk(region.src_offset),
                        extent: extent_from_vk(region.extent),
                    },
                    dst: dst.clone(),
                    dst_region: TextureRegion {
                        mip_level: region.dst_subresource.mip_level,
                        array_layer: region.dst_subresource.base_array_layer,
                        origin: origin_from_vk(region.dst_offset),
                        extent: extent_from_vk(region.extent),
                    },
                }),
                VkCmd::EndRendering
                | VkCmd::BindPipeline { .. }
                | VkCmd::BindDescriptorSets { .. }
                | VkCmd::PushConstants { .. }
                | VkCmd::BindVertexBuffer { .. }
                | VkCmd::BindIndexBuffer { .. }
                | VkCmd::SetViewport(_)
                | VkCmd::SetScissor(_) => {}
            }
        }
        ops
    }
}

fn lower_clear(attachment: &VkAttachment, ops: &mut Vec<HostOp>) {
    let view = &attachment.view;
    let texel = match attachment.clear {
        VkClear::Color(color) => view.format.pack_clear(color, 0.0, 0),
        VkClear::DepthStencil { depth, stencil } => {
            view.format.pack_clear([0.0; 4], depth, stencil)
        }
    };
    match texel {
        Some(texel) => ops.push(HostOp::Fill {
            target: view.memory.clone(),
            mip_level: view.mip_level,
            array_layer: view.array_layer,
            texel,
        }),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "clear of a {:?} attachment is not resolved on the host",
            view.format
        ),
    }
}

/// Builds a `VkBufferImageCopy`. Row lengths are expressed in texels.
pub(crate) fn buffer_image_copy(
    layout: &BufferTextureLayout,
    region: &TextureRegion,
    format: Format,
    aspect_mask: vk::ImageAspectFlags,
) -> vk::BufferImageCopy {
    let texel = format.bytes_per_texel().max(1);
    vk::BufferImageCopy {
        buffer_offset: layout.offset,
        buffer_row_length: layout.bytes_per_row / texel,
        buffer_image_height: layout.rows_per_image,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask,
            mip_level: region.mip_level,
            base_array_layer: region.array_layer,
            layer_count: 1,
        },
        image_offset: vk::Offset3D {
            x: region.origin.x as i32,
            y: region.origin.y as i32,
            z: region.origin.z as i32,
        },
        image_extent: vk::Extent3D {
            width: region.extent.width,
            height: region.extent.height,
            depth: region.extent.depth,
        },
    }
}

fn split_buffer_image_copy(
    copy: &vk::BufferImageCopy,
    texel_size: u32,
) -> (BufferTextureLayout, TextureRegion) {
    // Zero means tightly packed.
    let row_length = if copy.buffer_row_length == 0 {
        copy.image_extent.width
    } else {
        copy.buffer_row_length
    };
    let image_height = if copy.buffer_image_height == 0 {
        copy.image_extent.height
    } else {
        copy.buffer_image_height
    };
    (
        BufferTextureLayout {
            offset: copy.buffer_offset,
            bytes_per_row: row_length * texel_size,
            rows_per_image: image_height,
        },
        TextureRegion {
            mip_level: copy.image_subresource.mip_level,
            array_layer: copy.image_subresource.base_array_layer,
            origin: origin_from_vk(copy.image_offset),
            extent: extent_from_vk(copy.image_extent),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::rhi::api::{Extent3D, Origin3D};

    #[test]
    fn buffer_image_copy_rows_are_in_texels() {
        let layout = BufferTextureLayout {
            offset: 64,
            bytes_per_row: 32,
            rows_per_image: 4,
        };
        let region = TextureRegion {
            mip_level: 1,
            array_layer: 2,
            origin: Origin3D { x: 1, y: 0, z: 0 },
            extent: Extent3D::new_2d(8, 4),
        };
        let copy = buffer_image_copy(
            &layout,
            &region,
            Format::Rgba8Unorm,
            vk::ImageAspectFlags::COLOR,
        );
        assert_eq!(copy.buffer_row_length, 8);
        let (back_layout, back_region) = split_buffer_image_copy(&copy, 4);
        assert_eq!(back_layout, layout);
        assert_eq!(back_region, region);
    }

    #[test]
    fn zero_row_length_means_tight() {
        let copy = vk::BufferImageCopy {
            image_extent: vk::Extent3D {
                width: 5,
                height: 3,
                depth: 1,
            },
            ..Default::default()
        };
        let (layout, _) = split_buffer_image_copy(&copy, 2);
        assert_eq!(layout.bytes_per_row, 10);
        assert_eq!(layout.rows_per_image, 3);
    }
}
