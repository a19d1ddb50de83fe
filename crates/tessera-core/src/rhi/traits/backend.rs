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

//! Defines the `RhiBackend` trait, the contract every native backend implements.

use crate::rhi::api::{
    AdapterInfo, BackendKind, BufferDescriptor, BufferTextureLayout, BufferViewKind,
    ComputePipelineDescriptor, ContextDescriptor, DeviceLimits, Extent3D,
    GraphicsPipelineDescriptor, IndexFormat, QueueType, RenderingDesc, ResolvedTextureView,
    ResourceState, RootLayout, SamplerDescriptor, ScissorRect, ShaderStage, SurfaceCapabilities,
    SurfaceTarget, SwapchainDescriptor, TextureDescriptor, TextureRegion, Viewport,
};
use crate::rhi::bindless::{ResourceIndex, SamplerIndex};
use crate::rhi::error::RhiResult;
use crate::rhi::sync::FenceSignal;

/// The resource a transition barrier applies to.
pub enum BarrierResource<'a, B: RhiBackend> {
    /// A buffer.
    Buffer(&'a B::Buffer),
    /// Every subresource of a texture.
    Texture(&'a B::Texture),
}

/// A semaphore and the counter value a submission waits on or signals.
pub struct SemaphoreOp<'a, S> {
    /// The native semaphore.
    pub semaphore: &'a S,
    /// The counter value.
    pub value: u64,
}

/// Everything a backend needs to submit one command list.
pub struct QueueSubmission<'a, B: RhiBackend> {
    /// The command list, in the executable state.
    pub command_list: &'a B::CommandList,
    /// Waited before execution starts.
    pub wait: Option<SemaphoreOp<'a, B::Semaphore>>,
    /// Signalled once execution finishes.
    pub signal: Option<SemaphoreOp<'a, B::Semaphore>>,
    /// Signalled once execution finishes, observed by the CPU.
    pub fence: Option<&'a B::Fence>,
}

/// The capability set a native backend provides: create, bind, submit and transition.
///
/// Each associated type is the backend's native object; the RHI wraps them in
/// owning handles that call the matching `destroy_*` function on drop. Every
/// function is called from the single thread driving the device.
///
/// Fallible functions report native failures as [`crate::rhi::error::RhiError`].
/// Callers validate usage flags, ranges and lifecycles before calling in.
pub trait RhiBackend: Sized + 'static {
    /// The native API family.
    const KIND: BackendKind;
    /// Extension of compiled shader files (`spv`, `dxil`).
    const SHADER_EXTENSION: &'static str;

    /// Instance, adapter, logical device and the bindless descriptor tables.
    type Context;
    /// A buffer and its memory.
    type Buffer;
    /// A texture and its memory, or a borrowed swapchain image.
    type Texture;
    /// A render-target or depth-stencil descriptor.
    type AttachmentView;
    /// A command allocator for one queue type.
    type CommandPool;
    /// A command list.
    type CommandList;
    /// A submission queue.
    type Queue;
    /// A GPU to CPU fence.
    type Fence: FenceSignal;
    /// A GPU to GPU semaphore.
    type Semaphore;
    /// A validated bytecode blob.
    type Shader;
    /// A root signature / pipeline layout.
    type RootSignature;
    /// A pipeline state object.
    type Pipeline;
    /// A presentation surface.
    type Surface;
    /// A swapchain.
    type Swapchain;

    // --- Adapters and context ---

    /// Lists the adapters this backend can drive.
    fn enumerate_adapters() -> Vec<AdapterInfo>;
    /// Creates the context on one adapter.
    fn create_context(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<Self::Context>;
    /// The limits of the context's adapter.
    fn limits(ctx: &Self::Context) -> DeviceLimits;
    /// Blocks until every queue of the context is idle.
    fn wait_idle(ctx: &Self::Context);

    // --- Memory ---

    /// Creates a buffer.
    fn create_buffer(ctx: &Self::Context, desc: &BufferDescriptor<'_>) -> RhiResult<Self::Buffer>;
    /// Destroys a buffer.
    fn destroy_buffer(ctx: &Self::Context, buffer: Self::Buffer);
    /// Copies `data` into a host-visible buffer.
    fn write_buffer(ctx: &Self::Context, buffer: &Self::Buffer, offset: u64, data: &[u8]);
    /// Copies bytes out of a host-visible buffer.
    fn read_buffer(ctx: &Self::Context, buffer: &Self::Buffer, offset: u64, out: &mut [u8]);
    /// Creates a texture.
    fn create_texture(
        ctx: &Self::Context,
        desc: &TextureDescriptor<'_>,
    ) -> RhiResult<Self::Texture>;
    /// Destroys a texture.
    fn destroy_texture(ctx: &Self::Context, texture: Self::Texture);

    // --- Bindless descriptors ---

    /// Writes a buffer descriptor into the resource array.
    fn write_buffer_descriptor(
        ctx: &Self::Context,
        index: ResourceIndex,
        buffer: &Self::Buffer,
        kind: BufferViewKind,
        offset: u64,
        size: u64,
    );
    /// Writes a texture descriptor into the resource array.
    fn write_texture_descriptor(
        ctx: &Self::Context,
        index: ResourceIndex,
        texture: &Self::Texture,
        view: &ResolvedTextureView,
    );
    /// Clears one slot of the resource array.
    fn clear_resource_descriptor(ctx: &Self::Context, index: ResourceIndex);
    /// Writes a sampler into the sampler array.
    fn write_sampler_descriptor(
        ctx: &Self::Context,
        index: SamplerIndex,
        desc: &SamplerDescriptor<'_>,
    );
    /// Clears one slot of the sampler array.
    fn clear_sampler_descriptor(ctx: &Self::Context, index: SamplerIndex);
    /// Creates a render-target or depth-stencil descriptor. Never shader visible.
    fn create_attachment_view(
        ctx: &Self::Context,
        texture: &Self::Texture,
        view: &ResolvedTextureView,
    ) -> RhiResult<Self::AttachmentView>;
    /// Releases an attachment descriptor.
    fn destroy_attachment_view(ctx: &Self::Context, view: Self::AttachmentView);

    // --- Command recording ---

    /// Creates a command pool.
    fn create_command_pool(
        ctx: &Self::Context,
        queue_type: QueueType,
    ) -> RhiResult<Self::CommandPool>;
    /// Destroys a command pool.
    fn destroy_command_pool(ctx: &Self::Context, pool: Self::CommandPool);
    /// Allocates a command list from a pool.
    fn allocate_command_list(
        ctx: &Self::Context,
        pool: &Self::CommandPool,
    ) -> RhiResult<Self::CommandList>;
    /// Frees a command list.
    fn free_command_list(ctx: &Self::Context, list: Self::CommandList);
    /// Opens a command list for recording.
    fn begin_command_list(list: &mut Self::CommandList);
    /// Closes a command list.
    fn end_command_list(list: &mut Self::CommandList) -> RhiResult<()>;
    /// Discards the recorded commands.
    fn reset_command_list(list: &mut Self::CommandList);

    /// Records a state transition. Never called with `before == after`.
    fn cmd_transition(
        list: &mut Self::CommandList,
        resource: BarrierResource<'_, Self>,
        before: ResourceState,
        after: ResourceState,
    );
    /// Begins a dynamic rendering pass.
    fn cmd_begin_rendering(
        list: &mut Self::CommandList,
        desc: &RenderingDesc<'_, Self::AttachmentView>,
    );
    /// Ends the current rendering pass.
    fn cmd_end_rendering(list: &mut Self::CommandList);
    /// Binds a pipeline.
    fn cmd_set_pipeline(list: &mut Self::CommandList, pipeline: &Self::Pipeline);
    /// Binds a root signature and the bindless tables for graphics and compute.
    fn cmd_set_root_signature(list: &mut Self::CommandList, root: &Self::RootSignature);
    /// Uploads push constants.
    fn cmd_push_constants(
        list: &mut Self::CommandList,
        root: &Self::RootSignature,
        offset: u32,
        data: &[u8],
    );
    /// Binds a vertex buffer to a slot.
    fn cmd_set_vertex_buffer(
        list: &mut Self::CommandList,
        slot: u32,
        buffer: &Self::Buffer,
        offset: u64,
    );
    /// Binds the index buffer.
    fn cmd_set_index_buffer(
        list: &mut Self::CommandList,
        buffer: &Self::Buffer,
        offset: u64,
        format: IndexFormat,
    );
    /// Sets the viewport.
    fn cmd_set_viewport(list: &mut Self::CommandList, viewport: &Viewport);
    /// Sets the scissor rectangle.
    fn cmd_set_scissor(list: &mut Self::CommandList, scissor: &ScissorRect);
    /// Records a non-indexed draw.
    fn cmd_draw(
        list: &mut Self::CommandList,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
    /// Records an indexed draw.
    fn cmd_draw_indexed(
        list: &mut Self::CommandList,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    /// Records a compute dispatch.
    fn cmd_dispatch(list: &mut Self::CommandList, x: u32, y: u32, z: u32);
    /// Copies between buffers.
    fn cmd_copy_buffer(
        list: &mut Self::CommandList,
        src: &Self::Buffer,
        src_offset: u64,
        dst: &Self::Buffer,
        dst_offset: u64,
        size: u64,
    );
    /// Copies buffer rows into a texture region.
    fn cmd_copy_buffer_to_texture(
        list: &mut Self::CommandList,
        src: &Self::Buffer,
        layout: &BufferTextureLayout,
        dst: &Self::Texture,
        region: &TextureRegion,
    );
    /// Copies a texture region into buffer rows.
    fn cmd_copy_texture_to_buffer(
        list: &mut Self::CommandList,
        src: &Self::Texture,
        region: &TextureRegion,
        dst: &Self::Buffer,
        layout: &BufferTextureLayout,
    );
    /// Copies between textures. The extent comes from `src_region`.
    fn cmd_copy_texture(
        list: &mut Self::CommandList,
        src: &Self::Texture,
        src_region: &TextureRegion,
        dst: &Self::Texture,
        dst_region: &TextureRegion,
    );

    // --- Submission and synchronization ---

    /// Returns the context's queue of a type.
    fn create_queue(ctx: &Self::Context, queue_type: QueueType) -> RhiResult<Self::Queue>;
    /// Submits one command list.
    fn queue_submit(
        ctx: &Self::Context,
        queue: &Self::Queue,
        submission: QueueSubmission<'_, Self>,
    ) -> RhiResult<()>;
    /// Blocks until the queue is idle.
    fn queue_wait_idle(queue: &Self::Queue);
    /// Creates a fence, optionally in the signalled state.
    fn create_fence(ctx: &Self::Context, signalled: bool) -> RhiResult<Self::Fence>;
    /// Destroys a fence.
    fn destroy_fence(ctx: &Self::Context, fence: Self::Fence);
    /// Creates a semaphore.
    fn create_semaphore(ctx: &Self::Context) -> RhiResult<Self::Semaphore>;
    /// Destroys a semaphore.
    fn destroy_semaphore(ctx: &Self::Context, semaphore: Self::Semaphore);

    // --- Shaders and pipelines ---

    /// The conventional entry point of a stage.
    fn entry_point(stage: ShaderStage) -> &'static str;
    /// Validates a bytecode blob and wraps it.
    fn create_shader(
        ctx: &Self::Context,
        stage: ShaderStage,
        bytecode: &[u8],
        label: &str,
    ) -> RhiResult<Self::Shader>;
    /// Destroys a shader.
    fn destroy_shader(ctx: &Self::Context, shader: Self::Shader);
    /// Creates a root signature.
    fn create_root_signature(
        ctx: &Self::Context,
        layout: &RootLayout,
        label: &str,
    ) -> RhiResult<Self::RootSignature>;
    /// Destroys a root signature.
    fn destroy_root_signature(ctx: &Self::Context, root: Self::RootSignature);
    /// Builds a graphics pipeline.
    fn create_graphics_pipeline(
        ctx: &Self::Context,
        root: &Self::RootSignature,
        vertex: &Self::Shader,
        fragment: Option<&Self::Shader>,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> RhiResult<Self::Pipeline>;
    /// Builds a compute pipeline.
    fn create_compute_pipeline(
        ctx: &Self::Context,
        root: &Self::RootSignature,
        shader: &Self::Shader,
        desc: &ComputePipelineDescriptor<'_>,
    ) -> RhiResult<Self::Pipeline>;
    /// Destroys a pipeline.
    fn destroy_pipeline(ctx: &Self::Context, pipeline: Self::Pipeline);

    // --- Presentation ---

    /// Creates a surface.
    fn create_surface(ctx: &Self::Context, target: &SurfaceTarget) -> RhiResult<Self::Surface>;
    /// Reports what a surface supports.
    fn surface_capabilities(ctx: &Self::Context, surface: &Self::Surface) -> SurfaceCapabilities;
    /// Destroys a surface.
    fn destroy_surface(ctx: &Self::Context, surface: Self::Surface);
    /// Creates a swapchain presenting through `queue`.
    fn create_swapchain(
        ctx: &Self::Context,
        surface: &Self::Surface,
        queue: &Self::Queue,
        desc: &SwapchainDescriptor,
    ) -> RhiResult<Self::Swapchain>;
    /// Non-owning handles to the back buffers.
    fn swapchain_images(swapchain: &Self::Swapchain) -> Vec<Self::Texture>;
    /// Acquires the next back buffer.
    fn acquire_next_image(
        ctx: &Self::Context,
        swapchain: &mut Self::Swapchain,
        signal: Option<SemaphoreOp<'_, Self::Semaphore>>,
    ) -> RhiResult<u32>;
    /// Presents a back buffer.
    fn present(
        ctx: &Self::Context,
        swapchain: &mut Self::Swapchain,
        queue: &Self::Queue,
        image_index: u32,
        wait: Option<SemaphoreOp<'_, Self::Semaphore>>,
    ) -> RhiResult<()>;
    /// Recreates the back buffers at a new size.
    fn resize_swapchain(
        ctx: &Self::Context,
        swapchain: &mut Self::Swapchain,
        extent: Extent3D,
    ) -> RhiResult<()>;
    /// Destroys a swapchain and its images.
    fn destroy_swapchain(ctx: &Self::Context, swapchain: Self::Swapchain);
}
