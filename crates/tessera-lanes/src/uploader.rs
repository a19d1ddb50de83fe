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

//! Staged uploads from CPU memory into device-local resources.
//!
//! ```text
//! enqueue --> [staging buffer: | region 0 | region 1 | ... | free ]
//!               + recorded: transition(dst -> COPY_DEST) once per destination,
//!                 copy(region -> dst)
//! flush   --> end + one submission
//! reset   --> offset = 0, regions cleared, command buffer reset
//! ```
//!
//! Staged bytes are never reclaimed before [`Uploader::reset`], so a batch can
//! hold at most [`Uploader::staging_capacity`] bytes.

use ahash::AHashSet;
use bytemuck::Pod;
use std::fmt;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    BufferDescriptor, BufferTextureLayout, BufferUsage, MemoryLocation, Origin3D, RecordingStats,
    ResourceState, TextureRegion, TextureUsage,
};
use tessera_core::rhi::RhiError;
use tessera_core::{rhi_ensure, rhi_fatal, rhi_log};
use tessera_rhi::{Buffer, CommandBuffer, CommandPool, Device, Fence, Queue, RhiBackend, Texture};
use thiserror::Error;

/// Errors raised while setting up or submitting an upload batch.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The staging buffer, command pool or command buffer could not be created.
    #[error("failed to create the upload resources: {0}")]
    Setup(#[source] RhiError),
    /// Ending or submitting the batch failed.
    #[error("failed to submit the upload batch: {0}")]
    Submit(#[source] RhiError),
}

/// One staged range of the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subregion {
    /// Offset of the range in the staging buffer.
    pub offset: u64,
    /// Bytes the range occupies.
    pub size: u64,
}

impl Subregion {
    /// One past the last byte of the range.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Row layout of one texture subresource in the staging buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedRows {
    row_bytes: u64,
    row_pitch: u64,
    rows: u64,
}

impl StagedRows {
    fn new(row_bytes: u64, rows: u64, pitch_alignment: u64) -> Self {
        Self {
            row_bytes,
            row_pitch: align_up(row_bytes, pitch_alignment),
            rows,
        }
    }

    /// The last row only needs its texels.
    fn footprint(&self) -> u64 {
        self.row_pitch * self.rows.saturating_sub(1) + self.row_bytes
    }

    fn is_tight(&self) -> bool {
        self.row_pitch == self.row_bytes
    }

    /// Spreads tightly packed rows out to the row pitch.
    fn pad(&self, data: &[u8]) -> Vec<u8> {
        let mut staged = vec![0u8; self.footprint() as usize];
        for (row, texels) in data.chunks_exact(self.row_bytes as usize).enumerate() {
            let start = row * self.row_pitch as usize;
            staged[start..start + texels.len()].copy_from_slice(texels);
        }
        staged
    }
}

/// Where the current batch is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Batch {
    /// Nothing recorded since the last reset.
    Idle,
    /// The command buffer is open.
    Recording,
    /// The command buffer is closed but not submitted yet.
    Ended,
    /// Submitted; only a reset starts the next batch.
    Submitted,
}

impl Batch {
    fn accepts_uploads(self) -> bool {
        matches!(self, Batch::Idle | Batch::Recording)
    }

    fn needs_end(self) -> bool {
        self == Batch::Recording
    }
}

/// Batches CPU-to-GPU copies through one host-visible staging buffer.
///
/// Each enqueue writes its bytes at the next free offset of the staging
/// buffer and records the destination's transition into `COPY_DEST` followed
/// by the copy. A destination staged more than once in a batch is
/// transitioned only the first time. [`flush`](Uploader::flush) submits
/// everything as a single submission; destinations are left in `COPY_DEST`.
pub struct Uploader<'a, B: RhiBackend> {
    device: &'a Device<B>,
    queue: &'a Queue<'a, B>,
    staging: Buffer<'a, B>,
    commands: CommandBuffer<'a, B>,
    _pool: CommandPool<'a, B>,
    subregions: Vec<Subregion>,
    offset: u64,
    batch: Batch,
    // Ids of the buffers and textures already moved to COPY_DEST in this batch.
    in_copy_dest: AHashSet<u64>,
}

impl<B: RhiBackend> fmt::Debug for Uploader<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploader")
            .field("queue", &self.queue.queue_type())
            .field("capacity", &self.staging.size())
            .field("offset", &self.offset)
            .field("subregions", &self.subregions.len())
            .field("batch", &self.batch)
            .finish()
    }
}

impl<'a, B: RhiBackend> Uploader<'a, B> {
    /// An uploader whose staging buffer holds `staging_buffer_size` bytes from
    /// the device configuration.
    ///
    /// # Errors
    ///
    /// [`UploadError::Setup`] if a staging resource cannot be created.
    pub fn new(device: &'a Device<B>, queue: &'a Queue<'a, B>) -> Result<Self, UploadError> {
        Self::with_capacity(device, queue, device.config().staging_buffer_size)
    }

    /// An uploader with an explicit staging capacity in bytes.
    ///
    /// # Errors
    ///
    /// [`UploadError::Setup`] if a staging resource cannot be created,
    /// including for a zero capacity.
    pub fn with_capacity(
        device: &'a Device<B>,
        queue: &'a Queue<'a, B>,
        capacity: u64,
    ) -> Result<Self, UploadError> {
        let staging = device
            .create_buffer(
                &BufferDescriptor::new("upload staging", capacity, BufferUsage::COPY_SRC)
                    .with_location(MemoryLocation::CpuToGpu),
            )
            .map_err(UploadError::Setup)?;
        let pool = device
            .create_command_pool(queue.queue_type())
            .map_err(UploadError::Setup)?;
        let commands = pool.allocate().map_err(UploadError::Setup)?;
        rhi_log!(
            LogLayer::Uploader,
            LogChannel::Info,
            "{} bytes of staging memory on the {} queue",
            capacity,
            queue.queue_type()
        );
        Ok(Self {
            device,
            queue,
            staging,
            commands,
            _pool: pool,
            subregions: Vec::new(),
            offset: 0,
            batch: Batch::Idle,
            in_copy_dest: AHashSet::new(),
        })
    }

    /// Reserves `size` bytes starting at an `alignment` boundary.
    fn reserve(&mut self, size: u64, alignment: u64, target: &str) -> Subregion {
        if !self.batch.accepts_uploads() {
            let after = match self.batch {
                Batch::Submitted => "a flush; reset the uploader first",
                _ => "a failed submission; flush again or reset",
            };
            rhi_fatal!(
                LogLayer::Uploader,
                "upload to '{}' staged after {}",
                target,
                after
            );
        }
        let offset = align_up(self.offset, alignment);
        let capacity = self.staging.size();
        match offset.checked_add(size) {
            Some(end) if end <= capacity => {}
            _ => rhi_fatal!(
                LogLayer::Uploader,
                "{} bytes for '{}' at staging offset {} overflow the {}-byte staging buffer",
                size,
                target,
                offset,
                capacity
            ),
        }
        let region = Subregion { offset, size };
        self.offset = region.end();
        self.subregions.push(region);
        if self.batch == Batch::Idle {
            self.commands.begin();
            self.batch = Batch::Recording;
        }
        region
    }

    /// Stages `data` and records its copy into `dst` at `dst_offset`.
    ///
    /// `dst_current_state` is the state `dst` is in when the batch executes.
    pub fn enqueue_buffer_data_upload(
        &mut self,
        dst: &Buffer<'_, B>,
        dst_offset: u64,
        data: &[u8],
        dst_current_state: ResourceState,
    ) {
        rhi_ensure!(
            dst.usage().contains(BufferUsage::COPY_DST),
            LogLayer::Uploader,
            "upload destination '{}' lacks COPY_DST usage",
            dst.label()
        );
        rhi_ensure!(
            !data.is_empty(),
            LogLayer::Uploader,
            "empty upload to '{}'",
            dst.label()
        );
        rhi_ensure!(
            dst_offset
                .checked_add(data.len() as u64)
                .is_some_and(|end| end <= dst.size()),
            LogLayer::Uploader,
            "upload of {} bytes at {} overflows '{}' of {} bytes",
            data.len(),
            dst_offset,
            dst.label(),
            dst.size()
        );

        let region = self.reserve(data.len() as u64, 1, dst.label());
        self.device.write_buffer(&self.staging, region.offset, data);
        if self.in_copy_dest.insert(dst.id()) {
            self.commands
                .transition_buffer(dst, dst_current_state, ResourceState::CopyDest);
        }
        self.commands
            .copy_buffer(&self.staging, region.offset, dst, dst_offset, region.size);
    }

    /// [`enqueue_buffer_data_upload`](Self::enqueue_buffer_data_upload) for a
    /// slice of plain-old-data values.
    pub fn enqueue_buffer_upload_typed<T: Pod>(
        &mut self,
        dst: &Buffer<'_, B>,
        dst_offset: u64,
        data: &[T],
        dst_current_state: ResourceState,
    ) {
        self.enqueue_buffer_data_upload(
            dst,
            dst_offset,
            bytemuck::cast_slice(data),
            dst_current_state,
        );
    }

    /// Stages one whole subresource of `dst` and records its copy.
    ///
    /// `data` holds the subresource tightly packed, row after row. It is
    /// staged with the backend's row pitch, starting at the backend's texture
    /// placement alignment.
    pub fn enqueue_texture_data_upload(
        &mut self,
        dst: &Texture<'_, B>,
        mip_level: u32,
        array_layer: u32,
        data: &[u8],
        dst_current_state: ResourceState,
    ) {
        let desc = dst.descriptor();
        rhi_ensure!(
            desc.usage.contains(TextureUsage::COPY_DST),
            LogLayer::Uploader,
            "upload destination '{}' lacks COPY_DST usage",
            dst.label()
        );
        rhi_ensure!(
            mip_level < desc.mip_level_count && array_layer < desc.array_layer_count,
            LogLayer::Uploader,
            "'{}' has no subresource (mip {}, layer {})",
            dst.label(),
            mip_level,
            array_layer
        );
        rhi_ensure!(
            data.len() as u64 == desc.subresource_size(mip_level),
            LogLayer::Uploader,
            "'{}' mip {} takes {} bytes, got {}",
            dst.label(),
            mip_level,
            desc.subresource_size(mip_level),
            data.len()
        );

        let extent = desc.size.mip_level_size(mip_level);
        let device = self.device;
        let limits = device.limits();
        let rows = StagedRows::new(
            u64::from(extent.width) * u64::from(desc.format.bytes_per_texel()),
            u64::from(extent.height) * u64::from(extent.depth),
            u64::from(limits.texture_row_pitch_alignment),
        );
        let region = self.reserve(
            rows.footprint(),
            limits.texture_placement_alignment,
            dst.label(),
        );
        if rows.is_tight() {
            self.device.write_buffer(&self.staging, region.offset, data);
        } else {
            self.device
                .write_buffer(&self.staging, region.offset, &rows.pad(data));
        }

        if self.in_copy_dest.insert(dst.id()) {
            self.commands
                .transition_texture(dst, dst_current_state, ResourceState::CopyDest);
        }
        self.commands.copy_buffer_to_texture(
            &self.staging,
            &BufferTextureLayout {
                offset: region.offset,
                bytes_per_row: rows.row_pitch as u32,
                rows_per_image: extent.height,
            },
            dst,
            &TextureRegion {
                mip_level,
                array_layer,
                origin: Origin3D::ZERO,
                extent,
            },
        );
    }

    /// Ends the batch and submits it.
    ///
    /// With `wait_idle` the call returns once the queue is idle; otherwise it
    /// returns right away and `fence` signals completion. Returns `false`
    /// without submitting when nothing is staged.
    ///
    /// # Errors
    ///
    /// [`UploadError::Submit`] if ending or submitting the command buffer fails.
    /// After a failed submission the batch stays closed and intact: `flush`
    /// may be called again, or [`reset`](Self::reset) drops it.
    pub fn flush(
        &mut self,
        wait_idle: bool,
        fence: Option<&mut Fence<'_, B>>,
    ) -> Result<bool, UploadError> {
        if self.subregions.is_empty() {
            return Ok(false);
        }
        rhi_ensure!(
            self.batch != Batch::Submitted,
            LogLayer::Uploader,
            "batch flushed twice; reset the uploader first"
        );
        if !wait_idle && fence.is_none() {
            rhi_log!(
                LogLayer::Uploader,
                LogChannel::Warning,
                "asynchronous flush without a fence; only a device wait can retire it"
            );
        }

        if self.batch.needs_end() {
            self.commands.end().map_err(UploadError::Submit)?;
            self.batch = Batch::Ended;
        }
        self.queue
            .submit(&mut self.commands, None, None, fence)
            .map_err(UploadError::Submit)?;
        self.batch = Batch::Submitted;
        if wait_idle {
            self.queue.wait_idle();
        }
        rhi_log!(
            LogLayer::Uploader,
            LogChannel::Info,
            "flushed {} upload(s), {} staged bytes",
            self.subregions.len(),
            self.offset
        );
        Ok(true)
    }

    /// Starts a new batch. Only legal once the last flush retired.
    pub fn reset(&mut self) {
        rhi_ensure!(
            !self.commands.is_pending(),
            LogLayer::Uploader,
            "uploader reset while its submission is in flight"
        );
        self.commands.reset();
        self.subregions.clear();
        self.in_copy_dest.clear();
        self.offset = 0;
        self.batch = Batch::Idle;
    }

    /// Commands recorded into the current batch.
    pub fn recording_stats(&self) -> &RecordingStats {
        self.commands.stats()
    }

    /// Uploads staged since the last reset.
    pub fn pending_uploads(&self) -> usize {
        self.subregions.len()
    }

    /// The staged ranges, in enqueue order.
    pub fn subregions(&self) -> &[Subregion] {
        &self.subregions
    }

    /// The next free byte of the staging buffer.
    pub fn staging_offset(&self) -> u64 {
        self.offset
    }

    /// Size of the staging buffer.
    pub fn staging_capacity(&self) -> u64 {
        self.staging.size()
    }

    /// Bytes left before the staging buffer is full.
    pub fn remaining_capacity(&self) -> u64 {
        self.staging.size() - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_closed_batch_is_resubmitted_without_reopening() {
        assert!(Batch::Idle.accepts_uploads());
        assert!(Batch::Recording.accepts_uploads());
        assert!(!Batch::Ended.accepts_uploads());
        assert!(!Batch::Submitted.accepts_uploads());

        assert!(Batch::Recording.needs_end());
        assert!(!Batch::Ended.needs_end());
        assert!(!Batch::Submitted.needs_end());
    }

    #[test]
    fn alignment_rounds_up_to_the_next_multiple() {
        assert_eq!(align_up(0, 512), 0);
        assert_eq!(align_up(1, 512), 512);
        assert_eq!(align_up(512, 512), 512);
        assert_eq!(align_up(13, 1), 13);
        assert_eq!(align_up(13, 0), 13);
    }

    #[test]
    fn pitched_rows_pad_every_row_but_the_last() {
        let rows = StagedRows::new(12, 2, 256);
        assert_eq!(rows.row_pitch, 256);
        assert_eq!(rows.footprint(), 268);
        assert!(!rows.is_tight());

        let data: Vec<u8> = (0..24).collect();
        let staged = rows.pad(&data);
        assert_eq!(&staged[..12], &data[..12]);
        assert!(staged[12..256].iter().all(|&b| b == 0));
        assert_eq!(&staged[256..], &data[12..]);
    }

    #[test]
    fn unit_alignment_keeps_rows_tight() {
        let rows = StagedRows::new(12, 4, 1);
        assert!(rows.is_tight());
        assert_eq!(rows.footprint(), 48);
    }
}
