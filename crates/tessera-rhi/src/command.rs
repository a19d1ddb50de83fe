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

//! Command pools and command buffers.
//!
//! A command buffer checks every recording precondition before the native
//! call: usage flags, copy ranges, render-pass nesting and its own lifecycle.
//! Violations are programming errors and abort through `rhi_fatal!`.

use crate::device::Device;
use crate::pipeline::{Pipeline, RootSignature};
use crate::queue::SubmissionTicket;
use crate::resource::{Buffer, ResourceRef, Texture};
use crate::view::TextureView;
use std::fmt;
use std::mem::ManuallyDrop;
use std::rc::Rc;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    BufferTextureLayout, BufferUsage, ColorAttachmentDesc, CommandBufferState,
    DepthAttachmentDesc, Extent3D, Format, IndexFormat, LoadOp, QueueType, RecordingStats,
    RenderingDesc, ResourceState, ScissorRect, StoreOp, TextureRegion, TextureUsage,
    TextureViewKind, Viewport,
};
use tessera_core::rhi::{BarrierResource, RhiBackend, RhiResult};
use tessera_core::{rhi_ensure, rhi_fatal, rhi_log};

struct PoolShared<'d, B: RhiBackend> {
    device: &'d Device<B>,
    raw: ManuallyDrop<B::CommandPool>,
    queue_type: QueueType,
}

impl<B: RhiBackend> Drop for PoolShared<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::destroy_command_pool(&self.device.ctx, raw);
    }
}

/// Allocates command buffers for one queue type.
///
/// The native pool lives until the pool and every buffer allocated from it
/// are dropped.
pub struct CommandPool<'d, B: RhiBackend> {
    shared: Rc<PoolShared<'d, B>>,
}

impl<B: RhiBackend> fmt::Debug for CommandPool<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPool")
            .field("queue_type", &self.shared.queue_type)
            .finish()
    }
}

impl<'d, B: RhiBackend> CommandPool<'d, B> {
    /// The queue type of the buffers this pool allocates.
    pub fn queue_type(&self) -> QueueType {
        self.shared.queue_type
    }

    /// Allocates a command buffer in the `Initial` state.
    ///
    /// # Errors
    ///
    /// Native allocation failures.
    pub fn allocate(&self) -> RhiResult<CommandBuffer<'d, B>> {
        let raw = B::allocate_command_list(&self.shared.device.ctx, &self.shared.raw)?;
        Ok(CommandBuffer {
            pool: self.shared.clone(),
            raw: ManuallyDrop::new(raw),
            state: CommandBufferState::Initial,
            stats: RecordingStats::default(),
            in_rendering: false,
            bound_root: None,
            bound_pipeline: None,
            ticket: None,
        })
    }
}

impl<B: RhiBackend> Device<B> {
    /// Creates a command pool for `queue_type`.
    ///
    /// # Errors
    ///
    /// Native creation failures.
    pub fn create_command_pool(&self, queue_type: QueueType) -> RhiResult<CommandPool<'_, B>> {
        let raw = B::create_command_pool(&self.ctx, queue_type)?;
        Ok(CommandPool {
            shared: Rc::new(PoolShared {
                device: self,
                raw: ManuallyDrop::new(raw),
                queue_type,
            }),
        })
    }
}

/// A colour attachment of a rendering pass.
pub struct ColorAttachment<'a, B: RhiBackend> {
    /// A render-target view.
    pub view: &'a TextureView<'a, B>,
    /// Load operation with its clear colour.
    pub load_op: LoadOp<[f32; 4]>,
    /// Store operation.
    pub store_op: StoreOp,
}

/// The depth/stencil attachment of a rendering pass.
pub struct DepthAttachment<'a, B: RhiBackend> {
    /// A depth-stencil view.
    pub view: &'a TextureView<'a, B>,
    /// Depth load operation with its clear depth.
    pub depth_load_op: LoadOp<f32>,
    /// Depth store operation.
    pub depth_store_op: StoreOp,
    /// Stencil load operation with its clear value.
    pub stencil_load_op: LoadOp<u8>,
    /// Stencil store operation.
    pub stencil_store_op: StoreOp,
}

/// The attachments of a dynamic rendering pass.
pub struct RenderingInfo<'a, B: RhiBackend> {
    /// The rendered area. Must fit in every attachment.
    pub render_area: Extent3D,
    /// Colour attachments in slot order.
    pub color_attachments: Vec<ColorAttachment<'a, B>>,
    /// Optional depth/stencil attachment.
    pub depth_attachment: Option<DepthAttachment<'a, B>>,
}

impl<'a, B: RhiBackend> RenderingInfo<'a, B> {
    /// One colour attachment covering the whole view.
    pub fn single(view: &'a TextureView<'a, B>, load_op: LoadOp<[f32; 4]>) -> Self {
        Self {
            render_area: view.extent(),
            color_attachments: vec![ColorAttachment {
                view,
                load_op,
                store_op: StoreOp::Store,
            }],
            depth_attachment: None,
        }
    }
}

/// A command list and its recording lifecycle.
///
/// ```text
/// Initial --begin--> Recording --end--> Executable --submit--> Pending --retired--> Executable
/// ```
///
/// A pending buffer retires once a fence covering its submission was
/// observed signalled, or its queue or device went idle.
pub struct CommandBuffer<'d, B: RhiBackend> {
    pool: Rc<PoolShared<'d, B>>,
    raw: ManuallyDrop<B::CommandList>,
    state: CommandBufferState,
    stats: RecordingStats,
    in_rendering: bool,
    bound_root: Option<(u64, u32)>,
    bound_pipeline: Option<bool>,
    ticket: Option<SubmissionTicket>,
}

impl<B: RhiBackend> fmt::Debug for CommandBuffer<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("queue_type", &self.pool.queue_type)
            .field("state", &self.state())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Byte just past the last texel a buffer/texture copy touches in the buffer.
fn buffer_footprint_end(
    layout: &BufferTextureLayout,
    region: &TextureRegion,
    format: Format,
) -> u64 {
    let extent = region.extent;
    let row_bytes = u64::from(extent.width) * u64::from(format.bytes_per_texel());
    let bytes_per_row = u64::from(layout.bytes_per_row);
    let rows_per_image = if layout.rows_per_image == 0 {
        u64::from(extent.height)
    } else {
        u64::from(layout.rows_per_image)
    };
    layout.offset
        + bytes_per_row * rows_per_image * u64::from(extent.depth.saturating_sub(1))
        + bytes_per_row * u64::from(extent.height.saturating_sub(1))
        + row_bytes
}

fn region_fits(texture: &Texture<'_, impl RhiBackend>, region: &TextureRegion) -> bool {
    let desc = texture.descriptor();
    if region.mip_level >= desc.mip_level_count || region.array_layer >= desc.array_layer_count {
        return false;
    }
    let mip = desc.size.mip_level_size(region.mip_level);
    let fits = |origin: u32, size: u32, limit: u32| {
        u64::from(origin) + u64::from(size) <= u64::from(limit)
    };
    fits(region.origin.x, region.extent.width, mip.width)
        && fits(region.origin.y, region.extent.height, mip.height)
        && fits(region.origin.z, region.extent.depth, mip.depth)
}

impl<'d, B: RhiBackend> CommandBuffer<'d, B> {
    /// The native command list.
    pub fn raw(&self) -> &B::CommandList {
        &self.raw
    }

    /// The device the buffer records for.
    pub fn device(&self) -> &'d Device<B> {
        self.pool.device
    }

    /// The queue type of the pool the buffer came from.
    pub fn queue_type(&self) -> QueueType {
        self.pool.queue_type
    }

    /// The lifecycle state. A pending buffer whose submission retired reads as executable.
    pub fn state(&self) -> CommandBufferState {
        match (&self.state, &self.ticket) {
            (CommandBufferState::Pending, Some(ticket)) if ticket.is_retired() => {
                CommandBufferState::Executable
            }
            (state, _) => *state,
        }
    }

    /// `true` while the last submission may still execute.
    pub fn is_pending(&self) -> bool {
        self.state() == CommandBufferState::Pending
    }

    /// Counters of the current recording.
    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }

    pub(crate) fn mark_pending(&mut self, ticket: SubmissionTicket) {
        self.state = CommandBufferState::Pending;
        self.ticket = Some(ticket);
    }

    fn refresh(&mut self) {
        self.state = self.state();
        if self.state != CommandBufferState::Pending {
            self.ticket = None;
        }
    }

    fn clear_recording(&mut self) {
        self.stats = RecordingStats::default();
        self.in_rendering = false;
        self.bound_root = None;
        self.bound_pipeline = None;
    }

    /// Opens the buffer for recording.
    ///
    /// An executable buffer is reset first. Beginning while recording or
    /// pending aborts.
    pub fn begin(&mut self) {
        self.refresh();
        match self.state {
            CommandBufferState::Initial => {}
            CommandBufferState::Executable => B::reset_command_list(&mut self.raw),
            state => rhi_fatal!(LogLayer::Rhi, "begin on a {:?} command buffer", state),
        }
        self.clear_recording();
        B::begin_command_list(&mut self.raw);
        self.state = CommandBufferState::Recording;
    }

    /// Closes the buffer. It becomes executable.
    ///
    /// # Errors
    ///
    /// Native failures while closing the list.
    pub fn end(&mut self) -> RhiResult<()> {
        self.ensure_recording("end");
        rhi_ensure!(
            !self.in_rendering,
            LogLayer::Rhi,
            "command buffer ended inside a rendering pass"
        );
        B::end_command_list(&mut self.raw)?;
        self.state = CommandBufferState::Executable;
        Ok(())
    }

    /// Discards the recorded commands. Resetting a pending buffer aborts.
    pub fn reset(&mut self) {
        self.refresh();
        rhi_ensure!(
            self.state != CommandBufferState::Pending,
            LogLayer::Rhi,
            "command buffer reset while its submission is in flight"
        );
        B::reset_command_list(&mut self.raw);
        self.clear_recording();
        self.state = CommandBufferState::Initial;
    }

    fn ensure_recording(&self, what: &str) {
        if self.state != CommandBufferState::Recording {
            rhi_fatal!(
                LogLayer::Rhi,
                "{} recorded on a {:?} command buffer",
                what,
                self.state
            );
        }
    }

    fn ensure_outside_rendering(&self, what: &str) {
        rhi_ensure!(
            !self.in_rendering,
            LogLayer::Rhi,
            "{} recorded inside a rendering pass",
            what
        );
    }

    // --- Barriers ---

    /// Transitions a resource from `old` to `new`. Records nothing when they are equal.
    pub fn transition_barrier(
        &mut self,
        resource: ResourceRef<'_, B>,
        old: ResourceState,
        new: ResourceState,
    ) {
        self.ensure_recording("transition");
        self.ensure_outside_rendering("transition");
        if old == new {
            return;
        }
        let barrier = match resource {
            ResourceRef::Buffer(buffer) => {
                rhi_ensure!(
                    !old.is_texture_only() && !new.is_texture_only(),
                    LogLayer::Rhi,
                    "buffer '{}' cannot be in {} or {}",
                    buffer.label(),
                    old,
                    new
                );
                BarrierResource::Buffer(buffer.raw())
            }
            ResourceRef::Texture(texture) => {
                rhi_ensure!(
                    !old.is_buffer_only() && !new.is_buffer_only(),
                    LogLayer::Rhi,
                    "texture '{}' cannot be in {} or {}",
                    texture.label(),
                    old,
                    new
                );
                BarrierResource::Texture(texture.raw())
            }
        };
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::None,
            "barrier '{}': {} -> {}",
            resource.label(),
            old,
            new
        );
        B::cmd_transition(&mut self.raw, barrier, old, new);
        self.stats.barriers += 1;
    }

    /// Transitions a buffer.
    pub fn transition_buffer(
        &mut self,
        buffer: &Buffer<'_, B>,
        old: ResourceState,
        new: ResourceState,
    ) {
        self.transition_barrier(ResourceRef::Buffer(buffer), old, new);
    }

    /// Transitions every subresource of a texture.
    pub fn transition_texture(
        &mut self,
        texture: &Texture<'_, B>,
        old: ResourceState,
        new: ResourceState,
    ) {
        self.transition_barrier(ResourceRef::Texture(texture), old, new);
    }

    // --- Rendering ---

    /// Begins a dynamic rendering pass. Passes do not nest.
    pub fn begin_rendering(&mut self, info: &RenderingInfo<'_, B>) {
        self.ensure_recording("begin_rendering");
        rhi_ensure!(
            self.pool.queue_type.supports_graphics(),
            LogLayer::Rhi,
            "rendering recorded on a {} command buffer",
            self.pool.queue_type
        );
        rhi_ensure!(
            !self.in_rendering,
            LogLayer::Rhi,
            "begin_rendering inside another rendering pass"
        );
        let max_color = self.device().limits().max_color_attachments as usize;
        rhi_ensure!(
            info.color_attachments.len() <= max_color,
            LogLayer::Rhi,
            "{} colour attachments, the adapter allows {}",
            info.color_attachments.len(),
            max_color
        );
        rhi_ensure!(
            !info.color_attachments.is_empty() || info.depth_attachment.is_some(),
            LogLayer::Rhi,
            "rendering pass without attachments"
        );

        let area = info.render_area;
        let covers = |view: &TextureView<'_, B>| {
            let extent = view.extent();
            area.width <= extent.width && area.height <= extent.height
        };
        let mut color_attachments = Vec::with_capacity(info.color_attachments.len());
        for attachment in &info.color_attachments {
            rhi_ensure!(
                attachment.view.kind() == TextureViewKind::RenderTarget && covers(attachment.view),
                LogLayer::Rhi,
                "colour attachment must be a render-target view covering {}x{}",
                area.width,
                area.height
            );
            color_attachments.push(ColorAttachmentDesc {
                view: attachment.view.attachment(),
                load_op: attachment.load_op,
                store_op: attachment.store_op,
            });
        }
        let depth_attachment = info.depth_attachment.as_ref().map(|depth| {
            rhi_ensure!(
                depth.view.kind() == TextureViewKind::DepthStencil && covers(depth.view),
                LogLayer::Rhi,
                "depth attachment must be a depth-stencil view covering {}x{}",
                area.width,
                area.height
            );
            DepthAttachmentDesc {
                view: depth.view.attachment(),
                depth_load_op: depth.depth_load_op,
                depth_store_op: depth.depth_store_op,
                stencil_load_op: depth.stencil_load_op,
                stencil_store_op: depth.stencil_store_op,
            }
        });

        B::cmd_begin_rendering(
            &mut self.raw,
            &RenderingDesc {
                render_area: area,
                color_attachments,
                depth_attachment,
            },
        );
        self.in_rendering = true;
        self.stats.render_passes += 1;
    }

    /// Ends the current rendering pass.
    pub fn end_rendering(&mut self) {
        self.ensure_recording("end_rendering");
        rhi_ensure!(
            self.in_rendering,
            LogLayer::Rhi,
            "end_rendering without begin_rendering"
        );
        B::cmd_end_rendering(&mut self.raw);
        self.in_rendering = false;
    }

    // --- State ---

    /// Binds a graphics or compute pipeline.
    pub fn set_pipeline(&mut self, pipeline: &Pipeline<'_, B>) {
        self.ensure_recording("set_pipeline");
        let supported = if pipeline.is_compute() {
            self.pool.queue_type.supports_compute()
        } else {
            self.pool.queue_type.supports_graphics()
        };
        rhi_ensure!(
            supported,
            LogLayer::Rhi,
            "pipeline '{}' bound on a {} command buffer",
            pipeline.label(),
            self.pool.queue_type
        );
        if let Some((root, _)) = self.bound_root {
            if root != pipeline.root_signature_id() {
                rhi_log!(
                    LogLayer::Rhi,
                    LogChannel::Warning,
                    "pipeline '{}' was built against another root signature",
                    pipeline.label()
                );
            }
        }
        B::cmd_set_pipeline(&mut self.raw, pipeline.raw());
        self.bound_pipeline = Some(pipeline.is_compute());
    }

    /// Binds a root signature and the bindless tables.
    pub fn set_root_signature(&mut self, root: &RootSignature<'_, B>) {
        self.ensure_recording("set_root_signature");
        B::cmd_set_root_signature(&mut self.raw, root.raw());
        self.bound_root = Some((root.id(), root.push_constant_bytes()));
    }

    /// Writes `data` into the push-constant block at `offset`.
    ///
    /// `root` must be the bound root signature and the range must fit in its
    /// push-constant capacity.
    pub fn push_constants(&mut self, root: &RootSignature<'_, B>, offset: u32, data: &[u8]) {
        self.ensure_recording("push_constants");
        let Some((bound, capacity)) = self.bound_root else {
            rhi_fatal!(LogLayer::Rhi, "push constants without a bound root signature");
        };
        rhi_ensure!(
            bound == root.id(),
            LogLayer::Rhi,
            "push constants through a root signature that is not bound"
        );
        rhi_ensure!(
            offset % 4 == 0 && data.len() % 4 == 0,
            LogLayer::Rhi,
            "push constants must be whole 32-bit values (offset {}, {} bytes)",
            offset,
            data.len()
        );
        rhi_ensure!(
            u64::from(offset) + data.len() as u64 <= u64::from(capacity),
            LogLayer::Rhi,
            "push constants [{}, +{}) exceed the {}-byte block",
            offset,
            data.len(),
            capacity
        );
        B::cmd_push_constants(&mut self.raw, root.raw(), offset, data);
        self.stats.push_constant_uploads += 1;
    }

    /// Binds a vertex buffer to `slot`. The buffer needs `VERTEX` usage.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &Buffer<'_, B>, offset: u64) {
        self.ensure_recording("set_vertex_buffer");
        rhi_ensure!(
            buffer.usage().contains(BufferUsage::VERTEX),
            LogLayer::Rhi,
            "'{}' bound as a vertex buffer without VERTEX usage",
            buffer.label()
        );
        rhi_ensure!(
            offset < buffer.size(),
            LogLayer::Rhi,
            "vertex buffer offset {} is past the end of '{}'",
            offset,
            buffer.label()
        );
        B::cmd_set_vertex_buffer(&mut self.raw, slot, buffer.raw(), offset);
    }

    /// Binds the index buffer. The buffer needs `INDEX` usage.
    pub fn set_index_buffer(&mut self, buffer: &Buffer<'_, B>, offset: u64, format: IndexFormat) {
        self.ensure_recording("set_index_buffer");
        rhi_ensure!(
            buffer.usage().contains(BufferUsage::INDEX),
            LogLayer::Rhi,
            "'{}' bound as an index buffer without INDEX usage",
            buffer.label()
        );
        rhi_ensure!(
            offset < buffer.size() && offset % format.size() == 0,
            LogLayer::Rhi,
            "index buffer offset {} is out of range or misaligned in '{}'",
            offset,
            buffer.label()
        );
        B::cmd_set_index_buffer(&mut self.raw, buffer.raw(), offset, format);
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.ensure_recording("set_viewport");
        B::cmd_set_viewport(&mut self.raw, viewport);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor(&mut self, scissor: &ScissorRect) {
        self.ensure_recording("set_scissor");
        B::cmd_set_scissor(&mut self.raw, scissor);
    }

    // --- Work ---

    fn ensure_draw(&self) {
        self.ensure_recording("draw");
        rhi_ensure!(
            self.in_rendering,
            LogLayer::Rhi,
            "draw recorded outside a rendering pass"
        );
        rhi_ensure!(
            self.bound_pipeline == Some(false),
            LogLayer::Rhi,
            "draw recorded without a graphics pipeline"
        );
    }

    /// Records a non-indexed draw.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.ensure_draw();
        B::cmd_draw(
            &mut self.raw,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        );
        self.stats.draws += 1;
    }

    /// Records an indexed draw.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.ensure_draw();
        B::cmd_draw_indexed(
            &mut self.raw,
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
        self.stats.draws += 1;
    }

    /// Records a compute dispatch of `x * y * z` groups.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.ensure_recording("dispatch");
        self.ensure_outside_rendering("dispatch");
        rhi_ensure!(
            self.pool.queue_type.supports_compute(),
            LogLayer::Rhi,
            "dispatch recorded on a {} command buffer",
            self.pool.queue_type
        );
        rhi_ensure!(
            self.bound_pipeline == Some(true),
            LogLayer::Rhi,
            "dispatch recorded without a compute pipeline"
        );
        B::cmd_dispatch(&mut self.raw, x, y, z);
        self.stats.dispatches += 1;
    }

    // --- Copies ---

    fn ensure_copy(&self, src_ok: bool, src: &str, dst_ok: bool, dst: &str) {
        self.ensure_recording("copy");
        self.ensure_outside_rendering("copy");
        rhi_ensure!(src_ok, LogLayer::Rhi, "copy source '{}' lacks COPY_SRC usage", src);
        rhi_ensure!(dst_ok, LogLayer::Rhi, "copy destination '{}' lacks COPY_DST usage", dst);
    }

    /// Copies `size` bytes between buffers.
    pub fn copy_buffer(
        &mut self,
        src: &Buffer<'_, B>,
        src_offset: u64,
        dst: &Buffer<'_, B>,
        dst_offset: u64,
        size: u64,
    ) {
        self.ensure_copy(
            src.usage().contains(BufferUsage::COPY_SRC),
            src.label(),
            dst.usage().contains(BufferUsage::COPY_DST),
            dst.label(),
        );
        let in_bounds = |offset: u64, buffer: &Buffer<'_, B>| {
            offset.checked_add(size).is_some_and(|end| end <= buffer.size())
        };
        rhi_ensure!(
            in_bounds(src_offset, src) && in_bounds(dst_offset, dst),
            LogLayer::Rhi,
            "copy of {} bytes from '{}'+{} to '{}'+{} is out of bounds",
            size,
            src.label(),
            src_offset,
            dst.label(),
            dst_offset
        );
        if size == 0 {
            return;
        }
        B::cmd_copy_buffer(&mut self.raw, src.raw(), src_offset, dst.raw(), dst_offset, size);
        self.stats.copies += 1;
    }

    fn ensure_buffer_layout(
        &self,
        buffer: &Buffer<'_, B>,
        layout: &BufferTextureLayout,
        texture: &Texture<'_, B>,
        region: &TextureRegion,
    ) {
        rhi_ensure!(
            region_fits(texture, region),
            LogLayer::Rhi,
            "region {:?} is outside '{}'",
            region,
            texture.label()
        );
        let format = texture.format();
        let row_bytes = u64::from(region.extent.width) * u64::from(format.bytes_per_texel());
        rhi_ensure!(
            u64::from(layout.bytes_per_row) >= row_bytes,
            LogLayer::Rhi,
            "rows of {} bytes cannot hold {} bytes of '{}'",
            layout.bytes_per_row,
            row_bytes,
            texture.label()
        );
        let end = buffer_footprint_end(layout, region, format);
        rhi_ensure!(
            end <= buffer.size(),
            LogLayer::Rhi,
            "copy needs {} bytes of '{}', it has {}",
            end,
            buffer.label(),
            buffer.size()
        );
    }

    /// Copies buffer rows into a texture region.
    pub fn copy_buffer_to_texture(
        &mut self,
        src: &Buffer<'_, B>,
        layout: &BufferTextureLayout,
        dst: &Texture<'_, B>,
        region: &TextureRegion,
    ) {
        self.ensure_copy(
            src.usage().contains(BufferUsage::COPY_SRC),
            src.label(),
            dst.usage().contains(TextureUsage::COPY_DST),
            dst.label(),
        );
        self.ensure_buffer_layout(src, layout, dst, region);
        B::cmd_copy_buffer_to_texture(&mut self.raw, src.raw(), layout, dst.raw(), region);
        self.stats.copies += 1;
    }

    /// Copies a texture region into buffer rows.
    pub fn copy_texture_to_buffer(
        &mut self,
        src: &Texture<'_, B>,
        region: &TextureRegion,
        dst: &Buffer<'_, B>,
        layout: &BufferTextureLayout,
    ) {
        self.ensure_copy(
            src.usage().contains(TextureUsage::COPY_SRC),
            src.label(),
            dst.usage().contains(BufferUsage::COPY_DST),
            dst.label(),
        );
        self.ensure_buffer_layout(dst, layout, src, region);
        B::cmd_copy_texture_to_buffer(&mut self.raw, src.raw(), region, dst.raw(), layout);
        self.stats.copies += 1;
    }

    /// Copies between textures. The copied extent is `src_region.extent`.
    pub fn copy_texture(
        &mut self,
        src: &Texture<'_, B>,
        src_region: &TextureRegion,
        dst: &Texture<'_, B>,
        dst_region: &TextureRegion,
    ) {
        self.ensure_copy(
            src.usage().contains(TextureUsage::COPY_SRC),
            src.label(),
            dst.usage().contains(TextureUsage::COPY_DST),
            dst.label(),
        );
        let dst_region = TextureRegion {
            extent: src_region.extent,
            ..*dst_region
        };
        rhi_ensure!(
            region_fits(src, src_region) && region_fits(dst, &dst_region),
            LogLayer::Rhi,
            "texture copy from '{}' to '{}' is out of bounds",
            src.label(),
            dst.label()
        );
        rhi_ensure!(
            src.format().bytes_per_texel() == dst.format().bytes_per_texel(),
            LogLayer::Rhi,
            "texture copy between {:?} and {:?}",
            src.format(),
            dst.format()
        );
        B::cmd_copy_texture(&mut self.raw, src.raw(), src_region, dst.raw(), &dst_region);
        self.stats.copies += 1;
    }
}

impl<B: RhiBackend> Drop for CommandBuffer<'_, B> {
    fn drop(&mut self) {
        if self.is_pending() {
            rhi_log!(
                LogLayer::Rhi,
                LogChannel::Warning,
                "{} command buffer dropped while pending; waiting for the device",
                self.pool.queue_type
            );
            self.pool.device.wait_idle();
        }
        // SAFETY: `raw` is never touched again after this point.
        let raw = unsafe { ManuallyDrop::take(&mut self.raw) };
        B::free_command_list(&self.pool.device.ctx, raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::rhi::api::Origin3D;

    #[test]
    fn footprint_covers_the_last_row_only_up_to_its_texels() {
        let layout = BufferTextureLayout {
            offset: 512,
            bytes_per_row: 256,
            rows_per_image: 0,
        };
        let region = TextureRegion {
            mip_level: 0,
            array_layer: 0,
            origin: Origin3D::ZERO,
            extent: Extent3D::new_2d(4, 3),
        };
        // Two padded rows, then 4 texels of 4 bytes.
        assert_eq!(
            buffer_footprint_end(&layout, &region, Format::Rgba8Unorm),
            512 + 2 * 256 + 16
        );
    }
}
