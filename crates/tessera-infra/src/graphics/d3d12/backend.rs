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
    placed_footprint, root_constants, D3d12Barrier, D3d12Box, D3d12ClearValue, D3d12Cmd,
    D3d12CommandAllocator, D3d12CopyLocation, D3d12GraphicsCommandList, D3d12RenderPassTarget,
    ALL_SUBRESOURCES,
};
use super::context::{
    self, D3d12AttachmentView, D3d12Buffer, D3d12Context, D3d12Texture, RESOURCE_TABLE_PARAMETER,
    ROOT_CONSTANTS_PARAMETER, SAMPLER_TABLE_PARAMETER,
};
use super::conversions::IntoD3d12;
use super::native::*;
use super::pipeline::{self, D3d12Pipeline, D3d12RootSignature, D3d12Shader};
use super::swapchain::{self, D3d12Surface, D3d12Swapchain};
use super::sync::{self, D3d12Fence, D3d12Queue, D3d12Semaphore};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    AdapterInfo, BackendKind, BufferDescriptor, BufferTextureLayout, BufferViewKind,
    ComputePipelineDescriptor, ContextDescriptor, DeviceLimits, Extent3D,
    GraphicsPipelineDescriptor, IndexFormat, LoadOp, Origin3D, QueueType, RenderingDesc,
    ResolvedTextureView, ResourceState, RootLayout, SamplerDescriptor, ScissorRect, ShaderStage,
    StoreOp, SurfaceCapabilities, SurfaceTarget, SwapchainDescriptor, TextureDescriptor,
    TextureRegion, Viewport,
};
use tessera_core::rhi::bindless::{ResourceIndex, SamplerIndex};
use tessera_core::rhi::error::RhiResult;
use tessera_core::rhi::{BarrierResource, QueueSubmission, RhiBackend, SemaphoreOp};
use tessera_core::rhi_log;

/// The Direct3D 12 backend: enhanced barriers off, render passes, one
/// shader-visible heap per descriptor type, root constants for push data.
#[derive(Debug, Clone, Copy, Default)]
pub struct D3d12Backend;

fn beginning_access<V>(op: LoadOp<V>) -> D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE {
    match op {
        LoadOp::Load => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_PRESERVE,
        LoadOp::Clear(_) => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_CLEAR,
        LoadOp::DontCare => D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_DISCARD,
    }
}

fn ending_access(op: StoreOp) -> D3D12_RENDER_PASS_ENDING_ACCESS_TYPE {
    match op {
        StoreOp::Store => D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_PRESERVE,
        StoreOp::DontCare => D3D12_RENDER_PASS_ENDING_ACCESS_TYPE_DISCARD,
    }
}

fn texture_location(texture: &D3d12Texture, region: &TextureRegion) -> D3d12CopyLocation {
    D3d12CopyLocation::SubresourceIndex {
        resource: texture.memory.clone(),
        subresource: calc_subresource(region.mip_level, region.array_layer, texture.mip_levels),
        mip_levels: texture.mip_levels,
    }
}

fn buffer_location(
    buffer: &D3d12Buffer,
    layout: &BufferTextureLayout,
    region: &TextureRegion,
    format: DXGI_FORMAT,
) -> D3d12CopyLocation {
    D3d12CopyLocation::PlacedFootprint {
        resource: buffer.memory.clone(),
        offset: layout.offset,
        footprint: placed_footprint(layout, region, format),
    }
}

impl RhiBackend for D3d12Backend {
    const KIND: BackendKind = BackendKind::D3d12;
    const SHADER_EXTENSION: &'static str = "dxil";

    type Context = D3d12Context;
    type Buffer = D3d12Buffer;
    type Texture = D3d12Texture;
    type AttachmentView = D3d12AttachmentView;
    type CommandPool = D3d12CommandAllocator;
    type CommandList = D3d12GraphicsCommandList;
    type Queue = D3d12Queue;
    type Fence = D3d12Fence;
    type Semaphore = D3d12Semaphore;
    type Shader = D3d12Shader;
    type RootSignature = D3d12RootSignature;
    type Pipeline = D3d12Pipeline;
    type Surface = D3d12Surface;
    type Swapchain = D3d12Swapchain;

    fn enumerate_adapters() -> Vec<AdapterInfo> {
        context::enumerate()
    }

    fn create_context(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<D3d12Context> {
        D3d12Context::new(adapter, desc)
    }

    fn limits(ctx: &D3d12Context) -> DeviceLimits {
        ctx.limits
    }

    fn wait_idle(ctx: &D3d12Context) {
        ctx.device.wait_idle();
    }

    // --- Memory ---

    fn create_buffer(ctx: &D3d12Context, desc: &BufferDescriptor<'_>) -> RhiResult<D3d12Buffer> {
        context::create_buffer(ctx, desc)
    }

    fn destroy_buffer(_ctx: &D3d12Context, buffer: D3d12Buffer) {
        drop(buffer);
    }

    fn write_buffer(_ctx: &D3d12Context, buffer: &D3d12Buffer, offset: u64, data: &[u8]) {
        context::write_bytes(buffer, offset, data);
    }

    fn read_buffer(_ctx: &D3d12Context, buffer: &D3d12Buffer, offset: u64, out: &mut [u8]) {
        context::read_bytes(buffer, offset, out);
    }

    fn create_texture(ctx: &D3d12Context, desc: &TextureDescriptor<'_>) -> RhiResult<D3d12Texture> {
        context::create_texture(ctx, desc)
    }

    fn destroy_texture(_ctx: &D3d12Context, texture: D3d12Texture) {
        drop(texture);
    }

    // --- Bindless descriptors ---

    fn write_buffer_descriptor(
        ctx: &D3d12Context,
        index: ResourceIndex,
        buffer: &D3d12Buffer,
        kind: BufferViewKind,
        offset: u64,
        size: u64,
    ) {
        ctx.resources
            .write(index.0, context::buffer_view(buffer, kind, offset, size));
    }

    fn write_texture_descriptor(
        ctx: &D3d12Context,
        index: ResourceIndex,
        texture: &D3d12Texture,
        view: &ResolvedTextureView,
    ) {
        ctx.resources.write(index.0, context::texture_view(texture, view));
    }

    fn clear_resource_descriptor(ctx: &D3d12Context, index: ResourceIndex) {
        ctx.resources.clear(index.0);
    }

    fn write_sampler_descriptor(
        ctx: &D3d12Context,
        index: SamplerIndex,
        desc: &SamplerDescriptor<'_>,
    ) {
        ctx.samplers.write(index.0, context::sampler_desc(ctx, desc));
    }

    fn clear_sampler_descriptor(ctx: &D3d12Context, index: SamplerIndex) {
        ctx.samplers.clear(index.0);
    }

    fn create_attachment_view(
        ctx: &D3d12Context,
        texture: &D3d12Texture,
        view: &ResolvedTextureView,
    ) -> RhiResult<D3d12AttachmentView> {
        context::create_attachment_view(ctx, texture, view)
    }

    fn destroy_attachment_view(ctx: &D3d12Context, view: D3d12AttachmentView) {
        context::destroy_attachment_view(ctx, view);
    }

    // --- Command recording ---

    fn create_command_pool(
        ctx: &D3d12Context,
        queue_type: QueueType,
    ) -> RhiResult<D3d12CommandAllocator> {
        Ok(D3d12CommandAllocator {
            id: ctx.next_object(),
            list_type: queue_type.into_d3d12(),
            queue_type,
        })
    }

    fn destroy_command_pool(_ctx: &D3d12Context, _pool: D3d12CommandAllocator) {}

    fn allocate_command_list(
        ctx: &D3d12Context,
        pool: &D3d12CommandAllocator,
    ) -> RhiResult<D3d12GraphicsCommandList> {
        Ok(D3d12GraphicsCommandList::new(ctx, pool))
    }

    fn free_command_list(_ctx: &D3d12Context, list: D3d12GraphicsCommandList) {
        drop(list);
    }

    fn begin_command_list(list: &mut D3d12GraphicsCommandList) {
        list.reset();
    }

    fn end_command_list(list: &mut D3d12GraphicsCommandList) -> RhiResult<()> {
        list.close()
    }

    fn reset_command_list(list: &mut D3d12GraphicsCommandList) {
        list.discard();
    }

    fn cmd_transition(
        list: &mut D3d12GraphicsCommandList,
        resource: BarrierResource<'_, Self>,
        before: ResourceState,
        after: ResourceState,
    ) {
        let state_before: D3D12_RESOURCE_STATES = before.into_d3d12();
        let state_after: D3D12_RESOURCE_STATES = after.into_d3d12();
        // Several RHI states share one D3D12 state.
        if state_before == state_after {
            return;
        }
        let resource = match resource {
            BarrierResource::Buffer(buffer) => buffer.memory.clone(),
            BarrierResource::Texture(texture) => texture.memory.clone(),
        };
        list.record(D3d12Cmd::ResourceBarrier(D3d12Barrier {
            resource,
            subresource: ALL_SUBRESOURCES,
            state_before,
            state_after,
        }));
    }

    fn cmd_begin_rendering(
        list: &mut D3d12GraphicsCommandList,
        desc: &RenderingDesc<'_, D3d12AttachmentView>,
    ) {
        let render_targets = desc
            .color_attachments
            .iter()
            .map(|attachment| D3d12RenderPassTarget {
                view: attachment.view.clone(),
                beginning_access: beginning_access(attachment.load_op),
                clear_value: D3d12ClearValue::Color(match attachment.load_op {
                    LoadOp::Clear(color) => color,
                    _ => [0.0; 4],
                }),
                ending_access: ending_access(attachment.store_op),
            })
            .collect();
        let depth_stencil = desc.depth_attachment.as_ref().map(|attachment| {
            let depth_access = beginning_access(attachment.depth_load_op);
            let stencil_access = beginning_access(attachment.stencil_load_op);
            let stencil_clears = stencil_access == D3D12_RENDER_PASS_BEGINNING_ACCESS_TYPE_CLEAR;
            let beginning_access = if stencil_clears {
                stencil_access
            } else {
                depth_access
            };
            D3d12RenderPassTarget {
                view: attachment.view.clone(),
                beginning_access,
                clear_value: D3d12ClearValue::DepthStencil {
                    depth: match attachment.depth_load_op {
                        LoadOp::Clear(depth) => depth,
                        _ => 1.0,
                    },
                    stencil: match attachment.stencil_load_op {
                        LoadOp::Clear(stencil) => stencil,
                        _ => 0,
                    },
                },
                ending_access: ending_access(attachment.depth_store_op),
            }
        });
        list.record(D3d12Cmd::BeginRenderPass {
            render_targets,
            depth_stencil,
        });
        list.record(D3d12Cmd::RSSetScissorRects([
            0,
            0,
            desc.render_area.width as i32,
            desc.render_area.height as i32,
        ]));
    }

    fn cmd_end_rendering(list: &mut D3d12GraphicsCommandList) {
        list.record(D3d12Cmd::EndRenderPass);
    }

    fn cmd_set_pipeline(list: &mut D3d12GraphicsCommandList, pipeline: &D3d12Pipeline) {
        list.record(D3d12Cmd::SetPipelineState(pipeline.id));
        if !pipeline.compute {
            list.record(D3d12Cmd::IASetPrimitiveTopology(pipeline.topology));
            list.vertex_strides.clone_from(&pipeline.vertex_strides);
        }
    }

    fn cmd_set_root_signature(list: &mut D3d12GraphicsCommandList, root: &D3d12RootSignature) {
        list.record(D3d12Cmd::SetDescriptorHeaps);
        for compute in [false, true] {
            list.record(D3d12Cmd::SetRootSignature {
                compute,
                root_signature: root.id,
            });
            list.record(D3d12Cmd::SetRootDescriptorTable {
                compute,
                root_parameter_index: RESOURCE_TABLE_PARAMETER,
                heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
            });
            list.record(D3d12Cmd::SetRootDescriptorTable {
                compute,
                root_parameter_index: SAMPLER_TABLE_PARAMETER,
                heap_type: D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER,
            });
        }
    }

    fn cmd_push_constants(
        list: &mut D3d12GraphicsCommandList,
        _root: &D3d12RootSignature,
        offset: u32,
        data: &[u8],
    ) {
        let values = root_constants(data);
        for compute in [false, true] {
            list.record(D3d12Cmd::SetRoot32BitConstants {
                compute,
                root_parameter_index: ROOT_CONSTANTS_PARAMETER,
                values: values.clone(),
                dest_offset: offset / 4,
            });
        }
    }

    fn cmd_set_vertex_buffer(
        list: &mut D3d12GraphicsCommandList,
        slot: u32,
        buffer: &D3d12Buffer,
        offset: u64,
    ) {
        let stride_in_bytes = list.vertex_stride(slot);
        list.record(D3d12Cmd::IASetVertexBuffers {
            slot,
            buffer_location: buffer.gpu_virtual_address + offset,
            size_in_bytes: buffer.size.saturating_sub(offset) as u32,
            stride_in_bytes,
        });
    }

    fn cmd_set_index_buffer(
        list: &mut D3d12GraphicsCommandList,
        buffer: &D3d12Buffer,
        offset: u64,
        format: IndexFormat,
    ) {
        list.record(D3d12Cmd::IASetIndexBuffer {
            buffer_location: buffer.gpu_virtual_address + offset,
            size_in_bytes: buffer.size.saturating_sub(offset) as u32,
            format: format.into_d3d12(),
        });
    }

    fn cmd_set_viewport(list: &mut D3d12GraphicsCommandList, viewport: &Viewport) {
        list.record(D3d12Cmd::RSSetViewports {
            rect: [viewport.x, viewport.y, viewport.width, viewport.height],
            depth: [viewport.min_depth, viewport.max_depth],
        });
    }

    fn cmd_set_scissor(list: &mut D3d12GraphicsCommandList, scissor: &ScissorRect) {
        list.record(D3d12Cmd::RSSetScissorRects([
            scissor.x,
            scissor.y,
            scissor.x + scissor.width as i32,
            scissor.y + scissor.height as i32,
        ]));
    }

    fn cmd_draw(
        list: &mut D3d12GraphicsCommandList,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        list.record(D3d12Cmd::DrawInstanced {
            vertex_count_per_instance: vertex_count,
            instance_count,
            start_vertex_location: first_vertex,
            start_instance_location: first_instance,
        });
    }

    fn cmd_draw_indexed(
        list: &mut D3d12GraphicsCommandList,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        list.record(D3d12Cmd::DrawIndexedInstanced {
            index_count_per_instance: index_count,
            instance_count,
            start_index_location: first_index,
            base_vertex_location: vertex_offset,
            start_instance_location: first_instance,
        });
    }

    fn cmd_dispatch(list: &mut D3d12GraphicsCommandList, x: u32, y: u32, z: u32) {
        list.record(D3d12Cmd::Dispatch([x, y, z]));
    }

    fn cmd_copy_buffer(
        list: &mut D3d12GraphicsCommandList,
        src: &D3d12Buffer,
        src_offset: u64,
        dst: &D3d12Buffer,
        dst_offset: u64,
        size: u64,
    ) {
        list.record(D3d12Cmd::CopyBufferRegion {
            dst: dst.memory.clone(),
            dst_offset,
            src: src.memory.clone(),
            src_offset,
            num_bytes: size,
        });
    }

    fn cmd_copy_buffer_to_texture(
        list: &mut D3d12GraphicsCommandList,
        src: &D3d12Buffer,
        layout: &BufferTextureLayout,
        dst: &D3d12Texture,
        region: &TextureRegion,
    ) {
        list.record(D3d12Cmd::CopyTextureRegion {
            dst: texture_location(dst, region),
            dst_origin: region.origin,
            src: buffer_location(src, layout, region, dst.dxgi_format),
            src_box: D3d12Box::new(Origin3D::ZERO, region.extent),
        });
    }

    fn cmd_copy_texture_to_buffer(
        list: &mut D3d12GraphicsCommandList,
        src: &D3d12Texture,
        region: &TextureRegion,
        dst: &D3d12Buffer,
        layout: &BufferTextureLayout,
    ) {
        list.record(D3d12Cmd::CopyTextureRegion {
            dst: buffer_location(dst, layout, region, src.dxgi_format),
            dst_origin: Origin3D::ZERO,
            src: texture_location(src, region),
            src_box: D3d12Box::new(region.origin, region.extent),
        });
    }

    fn cmd_copy_texture(
        list: &mut D3d12GraphicsCommandList,
        src: &D3d12Texture,
        src_region: &TextureRegion,
        dst: &D3d12Texture,
        dst_region: &TextureRegion,
    ) {
        list.record(D3d12Cmd::CopyTextureRegion {
            dst: texture_location(dst, dst_region),
            dst_origin: dst_region.origin,
            src: texture_location(src, src_region),
            src_box: D3d12Box::new(src_region.origin, src_region.extent),
        });
    }

    // --- Submission and synchronization ---

    fn create_queue(ctx: &D3d12Context, queue_type: QueueType) -> RhiResult<D3d12Queue> {
        Ok(D3d12Queue::new(ctx, queue_type))
    }

    fn queue_submit(
        _ctx: &D3d12Context,
        queue: &D3d12Queue,
        submission: QueueSubmission<'_, Self>,
    ) -> RhiResult<()> {
        sync::submit(queue, submission)
    }

    fn queue_wait_idle(queue: &D3d12Queue) {
        queue.host.wait_idle();
    }

    fn create_fence(ctx: &D3d12Context, signalled: bool) -> RhiResult<D3d12Fence> {
        Ok(D3d12Fence::new(ctx, signalled))
    }

    fn destroy_fence(_ctx: &D3d12Context, fence: D3d12Fence) {
        drop(fence);
    }

    fn create_semaphore(ctx: &D3d12Context) -> RhiResult<D3d12Semaphore> {
        Ok(D3d12Semaphore::new(ctx))
    }

    fn destroy_semaphore(_ctx: &D3d12Context, semaphore: D3d12Semaphore) {
        drop(semaphore);
    }

    // --- Shaders and pipelines ---

    fn entry_point(stage: ShaderStage) -> &'static str {
        match stage {
            ShaderStage::Vertex => "VSMain",
            ShaderStage::Fragment => "PSMain",
            ShaderStage::Compute => "CSMain",
        }
    }

    fn create_shader(
        ctx: &D3d12Context,
        stage: ShaderStage,
        bytecode: &[u8],
        label: &str,
    ) -> RhiResult<D3d12Shader> {
        pipeline::create_shader(ctx, stage, bytecode, label)
    }

    fn destroy_shader(_ctx: &D3d12Context, shader: D3d12Shader) {
        drop(shader);
    }

    fn create_root_signature(
        ctx: &D3d12Context,
        layout: &RootLayout,
        label: &str,
    ) -> RhiResult<D3d12RootSignature> {
        pipeline::create_root_signature(ctx, layout, label)
    }

    fn destroy_root_signature(_ctx: &D3d12Context, root: D3d12RootSignature) {
        drop(root);
    }

    fn create_graphics_pipeline(
        ctx: &D3d12Context,
        root: &D3d12RootSignature,
        vertex: &D3d12Shader,
        fragment: Option<&D3d12Shader>,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> RhiResult<D3d12Pipeline> {
        pipeline::create_graphics_pipeline(ctx, root, vertex, fragment, desc)
    }

    fn create_compute_pipeline(
        ctx: &D3d12Context,
        root: &D3d12RootSignature,
        shader: &D3d12Shader,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> RhiResult<D3d12Pipeline> {
        pipeline::create_compute_pipeline(ctx, root, shader, desc)
    }

    fn destroy_pipeline(_ctx: &D3d12Context, pipeline: D3d12Pipeline) {
        drop(pipeline);
    }

    // --- Presentation ---

    fn create_surface(ctx: &D3d12Context, target: &SurfaceTarget) -> RhiResult<D3d12Surface> {
        swapchain::create_surface(ctx, target)
    }

    fn surface_capabilities(_ctx: &D3d12Context, _surface: &D3d12Surface) -> SurfaceCapabilities {
        swapchain::surface_capabilities()
    }

    fn destroy_surface(_ctx: &D3d12Context, _surface: D3d12Surface) {}

    fn create_swapchain(
        ctx: &D3d12Context,
        surface: &D3d12Surface,
        queue: &D3d12Queue,
        desc: &SwapchainDescriptor,
    ) -> RhiResult<D3d12Swapchain> {
        swapchain::create_swapchain(ctx, surface, queue, desc)
    }

    fn swapchain_images(swapchain: &D3d12Swapchain) -> Vec<D3d12Texture> {
        swapchain.buffers.clone()
    }

    fn acquire_next_image(
        _ctx: &D3d12Context,
        swapchain: &mut D3d12Swapchain,
        signal: Option<SemaphoreOp<'_, D3d12Semaphore>>,
    ) -> RhiResult<u32> {
        swapchain::acquire_next_image(swapchain, signal)
    }

    fn present(
        _ctx: &D3d12Context,
        swapchain: &mut D3d12Swapchain,
        queue: &D3d12Queue,
        image_index: u32,
        wait: Option<SemaphoreOp<'_, D3d12Semaphore>>,
    ) -> RhiResult<()> {
        swapchain::present(swapchain, queue, image_index, wait)
    }

    fn resize_swapchain(
        ctx: &D3d12Context,
        swapchain: &mut D3d12Swapchain,
        extent: Extent3D,
    ) -> RhiResult<()> {
        swapchain::resize(ctx, swapchain, extent)
    }

    fn destroy_swapchain(_ctx: &D3d12Context, swapchain: D3d12Swapchain) {
        swapchain.queue.wait_idle();
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "IDXGISwapChain::Release ({} buffers)",
            swapchain.buffers.len()
        );
    }
}
