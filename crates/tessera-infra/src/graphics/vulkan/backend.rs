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

use super::command::{
    buffer_image_copy, VkAttachment, VkBarrier, VkClear, VkCmd, VkCommandBuffer, VkCommandPool,
};
use super::context::{self, VkBuffer, VkImage, VkImageView, VulkanContext};
use super::conversions::{queue_family, IntoVk, VkStateInfo};
use super::pipeline::{self, VkPipeline, VkPipelineLayout, VkShaderModule};
use super::swapchain::{self, VkSurface, VkSwapchain};
use super::sync::{self, VkFence, VkQueue, VkSemaphore};
use ash::vk;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    AdapterInfo, BackendKind, BufferDescriptor, BufferTextureLayout, BufferViewKind,
    ComputePipelineDescriptor, ContextDescriptor, DeviceLimits, Extent3D,
    GraphicsPipelineDescriptor, IndexFormat, LoadOp, QueueType, RenderingDesc,
    ResolvedTextureView, ResourceState, RootLayout, SamplerDescriptor, ScissorRect, ShaderStage,
    SurfaceCapabilities, SurfaceTarget, SwapchainDescriptor, TextureDescriptor, TextureRegion,
    Viewport,
};
use tessera_core::rhi::bindless::{ResourceIndex, SamplerIndex};
use tessera_core::rhi::error::RhiResult;
use tessera_core::rhi::{BarrierResource, QueueSubmission, RhiBackend, SemaphoreOp};
use tessera_core::rhi_log;

/// The Vulkan 1.3 backend: dynamic rendering, synchronization2, descriptor
/// indexing and timeline semaphores.
#[derive(Debug, Clone, Copy, Default)]
pub struct VulkanBackend;

fn load_op<V: Copy>(op: LoadOp<V>) -> (vk::AttachmentLoadOp, Option<V>) {
    match op {
        LoadOp::Load => (vk::AttachmentLoadOp::LOAD, None),
        LoadOp::Clear(value) => (vk::AttachmentLoadOp::CLEAR, Some(value)),
        LoadOp::DontCare => (vk::AttachmentLoadOp::DONT_CARE, None),
    }
}

impl RhiBackend for VulkanBackend {
    const KIND: BackendKind = BackendKind::Vulkan;
    const SHADER_EXTENSION: &'static str = "spv";

    type Context = VulkanContext;
    type Buffer = VkBuffer;
    type Texture = VkImage;
    type AttachmentView = VkImageView;
    type CommandPool = VkCommandPool;
    type CommandList = VkCommandBuffer;
    type Queue = VkQueue;
    type Fence = VkFence;
    type Semaphore = VkSemaphore;
    type Shader = VkShaderModule;
    type RootSignature = VkPipelineLayout;
    type Pipeline = VkPipeline;
    type Surface = VkSurface;
    type Swapchain = VkSwapchain;

    fn enumerate_adapters() -> Vec<AdapterInfo> {
        context::enumerate()
    }

    fn create_context(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<VulkanContext> {
        VulkanContext::new(adapter, desc)
    }

    fn limits(ctx: &VulkanContext) -> DeviceLimits {
        ctx.limits
    }

    fn wait_idle(ctx: &VulkanContext) {
        ctx.device.wait_idle();
    }

    // --- Memory ---

    fn create_buffer(ctx: &VulkanContext, desc: &BufferDescriptor<'_>) -> RhiResult<VkBuffer> {
        context::create_buffer(ctx, desc)
    }

    fn destroy_buffer(_ctx: &VulkanContext, buffer: VkBuffer) {
        drop(buffer);
    }

    fn write_buffer(_ctx: &VulkanContext, buffer: &VkBuffer, offset: u64, data: &[u8]) {
        context::write_bytes(buffer, offset, data);
    }

    fn read_buffer(_ctx: &VulkanContext, buffer: &VkBuffer, offset: u64, out: &mut [u8]) {
        context::read_bytes(buffer, offset, out);
    }

    fn create_texture(ctx: &VulkanContext, desc: &TextureDescriptor<'_>) -> RhiResult<VkImage> {
        context::create_image(ctx, desc)
    }

    fn destroy_texture(_ctx: &VulkanContext, texture: VkImage) {
        drop(texture);
    }

    // --- Bindless descriptors ---

    fn write_buffer_descriptor(
        ctx: &VulkanContext,
        index: ResourceIndex,
        buffer: &VkBuffer,
        kind: BufferViewKind,
        offset: u64,
        size: u64,
    ) {
        ctx.resources
            .write(index.0, context::buffer_descriptor(buffer, kind, offset, size));
    }

    fn write_texture_descriptor(
        ctx: &VulkanContext,
        index: ResourceIndex,
        texture: &VkImage,
        view: &ResolvedTextureView,
    ) {
        ctx.resources
            .write(index.0, context::image_descriptor(texture, view));
    }

    fn clear_resource_descriptor(ctx: &VulkanContext, index: ResourceIndex) {
        ctx.resources.clear(index.0);
    }

    fn write_sampler_descriptor(
        ctx: &VulkanContext,
        index: SamplerIndex,
        desc: &SamplerDescriptor<'_>,
    ) {
        ctx.samplers
            .write(index.0, context::sampler_state(ctx, desc));
    }

    fn clear_sampler_descriptor(ctx: &VulkanContext, index: SamplerIndex) {
        ctx.samplers.clear(index.0);
    }

    fn create_attachment_view(
        ctx: &VulkanContext,
        texture: &VkImage,
        view: &ResolvedTextureView,
    ) -> RhiResult<VkImageView> {
        Ok(context::attachment_view(ctx, texture, view))
    }

    fn destroy_attachment_view(_ctx: &VulkanContext, view: VkImageView) {
        drop(view);
    }

    // --- Command recording ---

    fn create_command_pool(ctx: &VulkanContext, queue_type: QueueType) -> RhiResult<VkCommandPool> {
        Ok(VkCommandPool {
            handle: ctx.next_handle(),
            queue_family_index: queue_family(queue_type),
            queue_type,
        })
    }

    fn destroy_command_pool(_ctx: &VulkanContext, _pool: VkCommandPool) {}

    fn allocate_command_list(
        ctx: &VulkanContext,
        pool: &VkCommandPool,
    ) -> RhiResult<VkCommandBuffer> {
        Ok(VkCommandBuffer::new(ctx, pool))
    }

    fn free_command_list(_ctx: &VulkanContext, list: VkCommandBuffer) {
        drop(list);
    }

    fn begin_command_list(list: &mut VkCommandBuffer) {
        list.begin();
    }

    fn end_command_list(list: &mut VkCommandBuffer) -> RhiResult<()> {
        list.end()
    }

    fn reset_command_list(list: &mut VkCommandBuffer) {
        list.reset();
    }

    fn cmd_transition(
        list: &mut VkCommandBuffer,
        resource: BarrierResource<'_, Self>,
        before: ResourceState,
        after: ResourceState,
    ) {
        let src: VkStateInfo = before.into_vk();
        let dst: VkStateInfo = after.into_vk();
        let (target, aspect_mask, old_layout, new_layout) = match resource {
            BarrierResource::Buffer(buffer) => (
                buffer.memory.clone(),
                vk::ImageAspectFlags::empty(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::UNDEFINED,
            ),
            BarrierResource::Texture(image) => {
                (image.memory.clone(), image.aspect, src.layout, dst.layout)
            }
        };
        list.record(VkCmd::PipelineBarrier(VkBarrier {
            target,
            src_stage_mask: src.stage,
            src_access_mask: src.access,
            dst_stage_mask: dst.stage,
            dst_access_mask: dst.access,
            old_layout,
            new_layout,
            aspect_mask,
        }));
    }

    fn cmd_begin_rendering(list: &mut VkCommandBuffer, desc: &RenderingDesc<'_, VkImageView>) {
        let color_attachments = desc
            .color_attachments
            .iter()
            .map(|attachment| {
                let (load_op, clear) = load_op(attachment.load_op);
                VkAttachment {
                    view: attachment.view.clone(),
                    load_op,
                    store_op: attachment.store_op.into_vk(),
                    clear: VkClear::Color(clear.unwrap_or([0.0; 4])),
                }
            })
            .collect();
        let depth_attachment = desc.depth_attachment.as_ref().map(|attachment| {
            let (depth_load, depth) = load_op(attachment.depth_load_op);
            let (stencil_load, stencil) = load_op(attachment.stencil_load_op);
            let load_op = if depth_load == vk::AttachmentLoadOp::CLEAR
                || stencil_load == vk::AttachmentLoadOp::CLEAR
            {
                vk::AttachmentLoadOp::CLEAR
            } else {
                depth_load
            };
            VkAttachment {
                view: attachment.view.clone(),
                load_op,
                store_op: attachment.depth_store_op.into_vk(),
                clear: VkClear::DepthStencil {
                    depth: depth.unwrap_or(1.0),
                    stencil: stencil.unwrap_or(0),
                },
            }
        });
        list.record(VkCmd::BeginRendering {
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: desc.render_area.width,
                    height: desc.render_area.height,
                },
            },
            color_attachments,
            depth_attachment,
        });
    }

    fn cmd_end_rendering(list: &mut VkCommandBuffer) {
        list.record(VkCmd::EndRendering);
    }

    fn cmd_set_pipeline(list: &mut VkCommandBuffer, pipeline: &VkPipeline) {
        list.record(VkCmd::BindPipeline {
            bind_point: pipeline.bind_point,
            pipeline: pipeline.handle,
        });
    }

    fn cmd_set_root_signature(list: &mut VkCommandBuffer, root: &VkPipelineLayout) {
        for bind_point in [vk::PipelineBindPoint::GRAPHICS, vk::PipelineBindPoint::COMPUTE] {
            list.record(VkCmd::BindDescriptorSets {
                bind_point,
                layout: root.handle,
                sets: root.descriptor_sets,
            });
        }
    }

    fn cmd_push_constants(
        list: &mut VkCommandBuffer,
        root: &VkPipelineLayout,
        offset: u32,
        data: &[u8],
    ) {
        list.record(VkCmd::PushConstants {
            layout: root.handle,
            stage_flags: root.push_constant_range.stage_flags,
            offset,
            values: data.to_vec(),
        });
    }

    fn cmd_set_vertex_buffer(
        list: &mut VkCommandBuffer,
        slot: u32,
        buffer: &VkBuffer,
        offset: u64,
    ) {
        list.record(VkCmd::BindVertexBuffer {
            binding: slot,
            buffer: buffer.handle,
            offset,
        });
    }

    fn cmd_set_index_buffer(
        list: &mut VkCommandBuffer,
        buffer: &VkBuffer,
        offset: u64,
        format: IndexFormat,
    ) {
        list.record(VkCmd::BindIndexBuffer {
            buffer: buffer.handle,
            offset,
            index_type: format.into_vk(),
        });
    }

    fn cmd_set_viewport(list: &mut VkCommandBuffer, viewport: &Viewport) {
        list.record(VkCmd::SetViewport(vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        }));
    }

    fn cmd_set_scissor(list: &mut VkCommandBuffer, scissor: &ScissorRect) {
        list.record(VkCmd::SetScissor(vk::Rect2D {
            offset: vk::Offset2D {
                x: scissor.x,
                y: scissor.y,
            },
            extent: vk::Extent2D {
                width: scissor.width,
                height: scissor.height,
            },
        }));
    }

    fn cmd_draw(
        list: &mut VkCommandBuffer,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        list.record(VkCmd::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn cmd_draw_indexed(
        list: &mut VkCommandBuffer,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        list.record(VkCmd::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn cmd_dispatch(list: &mut VkCommandBuffer, x: u32, y: u32, z: u32) {
        list.record(VkCmd::Dispatch {
            group_count: [x, y, z],
        });
    }

    fn cmd_copy_buffer(
        list: &mut VkCommandBuffer,
        src: &VkBuffer,
        src_offset: u64,
        dst: &VkBuffer,
        dst_offset: u64,
        size: u64,
    ) {
        list.record(VkCmd::CopyBuffer {
            src: src.memory.clone(),
            dst: dst.memory.clone(),
            region: vk::BufferCopy {
                src_offset,
                dst_offset,
                size,
            },
        });
    }

    fn cmd_copy_buffer_to_texture(
        list: &mut VkCommandBuffer,
        src: &VkBuffer,
        layout: &BufferTextureLayout,
        dst: &VkImage,
        region: &TextureRegion,
    ) {
        list.record(VkCmd::CopyBufferToImage {
            src: src.memory.clone(),
            dst: dst.memory.clone(),
            texel_size: dst.format.bytes_per_texel(),
            region: buffer_image_copy(layout, region, dst.format, dst.aspect),
        });
    }

    fn cmd_copy_texture_to_buffer(
        list: &mut VkCommandBuffer,
        src: &VkImage,
        region: &TextureRegion,
        dst: &VkBuffer,
        layout: &BufferTextureLayout,
    ) {
        list.record(VkCmd::CopyImageToBuffer {
            src: src.memory.clone(),
            dst: dst.memory.clone(),
            texel_size: src.format.bytes_per_texel(),
            region: buffer_image_copy(layout, region, src.format, src.aspect),
        });
    }

    fn cmd_copy_texture(
        list: &mut VkCommandBuffer,
        src: &VkImage,
        src_region: &TextureRegion,
        dst: &VkImage,
        dst_region: &TextureRegion,
    ) {
        let subresource = |image: &VkImage, region: &TextureRegion| vk::ImageSubresourceLayers {
            aspect_mask: image.aspect,
            mip_level: region.mip_level,
            base_array_layer: region.array_layer,
            layer_count: 1,
        };
        list.record(VkCmd::CopyImage {
            src: src.memory.clone(),
            dst: dst.memory.clone(),
            region: vk::ImageCopy {
                src_subresource: subresource(src, src_region),
                src_offset: src_region.origin.into_vk(),
                dst_subresource: subresource(dst, dst_region),
                dst_offset: dst_region.origin.into_vk(),
                extent: src_region.extent.into_vk(),
            },
        });
    }

    // --- Submission and synchronization ---

    fn create_queue(ctx: &VulkanContext, queue_type: QueueType) -> RhiResult<VkQueue> {
        Ok(VkQueue::new(ctx, queue_type))
    }

    fn queue_submit(
        _ctx: &VulkanContext,
        queue: &VkQueue,
        submission: QueueSubmission<'_, Self>,
    ) -> RhiResult<()> {
        sync::submit(queue, submission)
    }

    fn queue_wait_idle(queue: &VkQueue) {
        queue.host.wait_idle();
    }

    fn create_fence(ctx: &VulkanContext, signalled: bool) -> RhiResult<VkFence> {
        Ok(VkFence::new(ctx, signalled))
    }

    fn destroy_fence(_ctx: &VulkanContext, fence: VkFence) {
        drop(fence);
    }

    fn create_semaphore(ctx: &VulkanContext) -> RhiResult<VkSemaphore> {
        Ok(VkSemaphore::new(ctx))
    }

    fn destroy_semaphore(_ctx: &VulkanContext, semaphore: VkSemaphore) {
        drop(semaphore);
    }

    // --- Shaders and pipelines ---

    fn entry_point(_stage: ShaderStage) -> &'static str {
        "main"
    }

    fn create_shader(
        ctx: &VulkanContext,
        stage: ShaderStage,
        bytecode: &[u8],
        label: &str,
    ) -> RhiResult<VkShaderModule> {
        pipeline::create_shader_module(ctx, stage, bytecode, label)
    }

    fn destroy_shader(_ctx: &VulkanContext, shader: VkShaderModule) {
        drop(shader);
    }

    fn create_root_signature(
        ctx: &VulkanContext,
        layout: &RootLayout,
        label: &str,
    ) -> RhiResult<VkPipelineLayout> {
        pipeline::create_pipeline_layout(ctx, layout, label)
    }

    fn destroy_root_signature(_ctx: &VulkanContext, _root: VkPipelineLayout) {}

    fn create_graphics_pipeline(
        ctx: &VulkanContext,
        root: &VkPipelineLayout,
        vertex: &VkShaderModule,
        fragment: Option<&VkShaderModule>,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> RhiResult<VkPipeline> {
        pipeline::create_graphics_pipeline(ctx, root, vertex, fragment, desc)
    }

    fn create_compute_pipeline(
        ctx: &VulkanContext,
        root: &VkPipelineLayout,
        shader: &VkShaderModule,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> RhiResult<VkPipeline> {
        pipeline::create_compute_pipeline(ctx, root, shader, desc)
    }

    fn destroy_pipeline(_ctx: &VulkanContext, pipeline: VkPipeline) {
        drop(pipeline);
    }

    // --- Presentation ---

    fn create_surface(ctx: &VulkanContext, target: &SurfaceTarget) -> RhiResult<VkSurface> {
        swapchain::create_surface(ctx, target)
    }

    fn surface_capabilities(_ctx: &VulkanContext, _surface: &VkSurface) -> SurfaceCapabilities {
        swapchain::surface_capabilities()
    }

    fn destroy_surface(_ctx: &VulkanContext, _surface: VkSurface) {}

    fn create_swapchain(
        ctx: &VulkanContext,
        surface: &VkSurface,
        queue: &VkQueue,
        desc: &SwapchainDescriptor,
    ) -> RhiResult<VkSwapchain> {
        swapchain::create_swapchain(ctx, surface, queue, desc)
    }

    fn swapchain_images(swapchain: &VkSwapchain) -> Vec<VkImage> {
        swapchain.images.clone()
    }

    fn acquire_next_image(
        _ctx: &VulkanContext,
        swapchain: &mut VkSwapchain,
        signal: Option<SemaphoreOp<'_, VkSemaphore>>,
    ) -> RhiResult<u32> {
        swapchain::acquire_next_image(swapchain, signal)
    }

    fn present(
        _ctx: &VulkanContext,
        swapchain: &mut VkSwapchain,
        queue: &VkQueue,
        image_index: u32,
        wait: Option<SemaphoreOp<'_, VkSemaphore>>,
    ) -> RhiResult<()> {
        swapchain::present(swapchain, queue, image_index, wait)
    }

    fn resize_swapchain(
        ctx: &VulkanContext,
        swapchain: &mut VkSwapchain,
        extent: Extent3D,
    ) -> RhiResult<()> {
        swapchain::resize(ctx, swapchain, extent)
    }

    fn destroy_swapchain(_ctx: &VulkanContext, swapchain: VkSwapchain) {
        swapchain.queue.wait_idle();
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "vkDestroySwapchainKHR ({} images)",
            swapchain.images.len()
        );
    }
}
