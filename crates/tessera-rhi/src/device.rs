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

//! The device: adapter selection, the bindless slot pools and allocation tracking.

use crate::queue::SubmissionTimeline;
use crate::resource::Buffer;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tessera_core::logging::{self, LogChannel, LogLayer};
use tessera_core::memory::AllocationTracker;
use tessera_core::rhi::api::{
    AdapterInfo, BackendKind, ContextDescriptor, DeviceDescriptor, DeviceFeatures, DeviceLimits,
};
use tessera_core::rhi::{FreeListAllocator, RhiBackend, RhiError, RhiResult};
use tessera_core::{rhi_ensure, rhi_log, RhiConfig};

/// A logical device on one adapter of backend `B`.
///
/// The device owns the native context, the global bindless descriptor table
/// (binding 0 holds views, binding 1 holds samplers) and the slot allocators
/// for both arrays. Every object it creates borrows it.
pub struct Device<B: RhiBackend> {
    pub(crate) ctx: B::Context,
    adapter: AdapterInfo,
    limits: DeviceLimits,
    config: RhiConfig,
    features: DeviceFeatures,
    pub(crate) resource_slots: RefCell<FreeListAllocator>,
    pub(crate) sampler_slots: RefCell<FreeListAllocator>,
    pub(crate) tracker: AllocationTracker,
    pub(crate) timelines: RefCell<Vec<Weak<SubmissionTimeline>>>,
    next_object: Cell<u64>,
}

impl<B: RhiBackend> fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("backend", &B::KIND)
            .field("adapter", &self.adapter.name)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

/// Picks the first adapter that carries `required` and matches the name filter.
fn select_adapter(
    adapters: &[AdapterInfo],
    required: DeviceFeatures,
    name_filter: Option<&str>,
) -> RhiResult<AdapterInfo> {
    let candidates: Vec<&AdapterInfo> = adapters
        .iter()
        .filter(|adapter| name_filter.map_or(true, |name| adapter.name.contains(name)))
        .collect();
    if candidates.is_empty() {
        return Err(RhiError::AdapterNotFound);
    }

    if let Some(adapter) = candidates
        .iter()
        .find(|adapter| adapter.features.contains(required))
    {
        return Ok((*adapter).clone());
    }

    let best_available = candidates
        .iter()
        .map(|adapter| adapter.features)
        .max_by_key(|features| (*features & required).bits().count_ones())
        .unwrap_or(DeviceFeatures::EMPTY);
    Err(RhiError::FeatureNotSupported {
        required,
        best_available,
    })
}

impl<B: RhiBackend> Device<B> {
    /// Creates a device on the first adapter that supports the fixed feature
    /// contract plus the features the descriptor and its configuration request.
    ///
    /// # Errors
    ///
    /// [`RhiError::FeatureNotSupported`] if no adapter qualifies,
    /// [`RhiError::AdapterNotFound`] if the backend exposes none, and any
    /// configuration or native error raised while opening the context.
    pub fn new(desc: &DeviceDescriptor) -> RhiResult<Self> {
        let config = desc.config.clone().validated()?;
        logging::apply_config(&config.log);

        let required =
            DeviceFeatures::REQUIRED | desc.extra_features | config.required_device_features()?;
        let adapters = B::enumerate_adapters();
        let adapter = match select_adapter(&adapters, required, desc.adapter_name.as_deref()) {
            Ok(adapter) => adapter,
            Err(err) => {
                // Returned to the caller, so the error is logged without escalation.
                log::error!(target: LogLayer::Rhi.target(), "{} device: {}", B::KIND, err);
                return Err(err);
            }
        };

        let ctx = B::create_context(
            &adapter,
            &ContextDescriptor {
                features: required,
                max_bindless_resources: config.max_bindless_resources,
                max_bindless_samplers: config.max_bindless_samplers,
                max_attachment_views: config.max_attachment_views,
                enable_validation: config.enable_validation,
            },
        )?;
        let limits = B::limits(&ctx);

        rhi_log!(LogLayer::Rhi, LogChannel::Heading, "{} device", B::KIND);
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::Info,
            "adapter '{}' ({:?}), {} resource slots, {} sampler slots",
            adapter.name,
            adapter.adapter_type,
            config.max_bindless_resources,
            config.max_bindless_samplers
        );

        Ok(Self {
            ctx,
            limits,
            features: required,
            resource_slots: RefCell::new(FreeListAllocator::new(config.max_bindless_resources)),
            sampler_slots: RefCell::new(FreeListAllocator::new(config.max_bindless_samplers)),
            tracker: AllocationTracker::new(),
            timelines: RefCell::new(Vec::new()),
            next_object: Cell::new(1),
            adapter,
            config,
        })
    }

    /// Blocks until every queue is idle. Every submission counts as retired afterwards.
    pub fn wait_idle(&self) {
        B::wait_idle(&self.ctx);
        // Timelines of dropped queues are pruned here.
        self.timelines.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(timeline) => {
                timeline.retire_all();
                true
            }
            None => false,
        });
    }

    /// Submission timelines of the queues still alive, as of the last
    /// [`wait_idle`](Self::wait_idle) or queue creation.
    pub fn tracked_timelines(&self) -> usize {
        self.timelines.borrow().len()
    }

    /// The adapter the device runs on.
    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// The adapter's limits.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// The native API family.
    pub fn backend_kind(&self) -> BackendKind {
        B::KIND
    }

    /// The features enabled on the context.
    pub fn features(&self) -> DeviceFeatures {
        self.features
    }

    /// The validated configuration the device was created with.
    pub fn config(&self) -> &RhiConfig {
        &self.config
    }

    /// The table of live buffer and texture allocations.
    pub fn allocation_tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// Free slots left in the bindless resource array.
    pub fn available_resource_slots(&self) -> u32 {
        self.resource_slots.borrow().available()
    }

    /// Free slots left in the bindless sampler array.
    pub fn available_sampler_slots(&self) -> u32 {
        self.sampler_slots.borrow().available()
    }

    /// The native context, for code that talks to the backend directly.
    pub fn raw(&self) -> &B::Context {
        &self.ctx
    }

    /// Copies `data` into a host-visible buffer at `offset`.
    pub fn write_buffer(&self, buffer: &Buffer<'_, B>, offset: u64, data: &[u8]) {
        Self::check_mapping(buffer, offset, data.len() as u64);
        B::write_buffer(&self.ctx, buffer.raw(), offset, data);
    }

    /// Fills `out` with bytes from a host-visible buffer at `offset`.
    pub fn read_buffer(&self, buffer: &Buffer<'_, B>, offset: u64, out: &mut [u8]) {
        Self::check_mapping(buffer, offset, out.len() as u64);
        B::read_buffer(&self.ctx, buffer.raw(), offset, out);
    }

    fn check_mapping(buffer: &Buffer<'_, B>, offset: u64, len: u64) {
        rhi_ensure!(
            buffer.location().is_host_visible(),
            LogLayer::Rhi,
            "buffer '{}' is {:?} and cannot be mapped",
            buffer.label(),
            buffer.location()
        );
        rhi_ensure!(
            offset.checked_add(len).is_some_and(|end| end <= buffer.size()),
            LogLayer::Rhi,
            "mapping [{}, {}) is outside buffer '{}' of {} bytes",
            offset,
            offset.saturating_add(len),
            buffer.label(),
            buffer.size()
        );
    }

    pub(crate) fn next_object_id(&self) -> u64 {
        let id = self.next_object.get();
        self.next_object.set(id + 1);
        id
    }

    pub(crate) fn register_timeline(&self) -> Rc<SubmissionTimeline> {
        let timeline = Rc::new(SubmissionTimeline::default());
        let mut timelines = self.timelines.borrow_mut();
        timelines.retain(|weak| weak.strong_count() > 0);
        timelines.push(Rc::downgrade(&timeline));
        drop(timelines);
        timeline
    }
}

impl<B: RhiBackend> Drop for Device<B> {
    fn drop(&mut self) {
        B::wait_idle(&self.ctx);
        let report = self.tracker.leak_report();
        report.log();
        rhi_log!(
            LogLayer::Rhi,
            LogChannel::Info,
            "{} device on '{}' destroyed",
            B::KIND,
            self.adapter.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::rhi::api::AdapterType;

    fn adapter(name: &str, features: DeviceFeatures) -> AdapterInfo {
        AdapterInfo {
            name: name.to_owned(),
            vendor_id: 0,
            device_id: 0,
            adapter_type: AdapterType::DiscreteGpu,
            backend: BackendKind::Vulkan,
            features,
            dedicated_memory: 0,
            supports_present: true,
        }
    }

    #[test]
    fn first_qualifying_adapter_wins() {
        let adapters = [
            adapter("old", DeviceFeatures::DESCRIPTOR_INDEXING),
            adapter("a", DeviceFeatures::REQUIRED),
            adapter("b", DeviceFeatures::REQUIRED | DeviceFeatures::TIMELINE_SEMAPHORE),
        ];
        let picked = select_adapter(&adapters, DeviceFeatures::REQUIRED, None).unwrap();
        assert_eq!(picked.name, "a");

        let required = DeviceFeatures::REQUIRED | DeviceFeatures::TIMELINE_SEMAPHORE;
        let picked = select_adapter(&adapters, required, None).unwrap();
        assert_eq!(picked.name, "b");
    }

    #[test]
    fn missing_features_report_the_best_candidate() {
        let adapters = [
            adapter("weak", DeviceFeatures::DESCRIPTOR_INDEXING),
            adapter("strong", DeviceFeatures::REQUIRED),
        ];
        let required = DeviceFeatures::REQUIRED | DeviceFeatures::TEXTURE_COMPRESSION_BC;
        match select_adapter(&adapters, required, None) {
            Err(RhiError::FeatureNotSupported {
                required: r,
                best_available,
            }) => {
                assert_eq!(r, required);
                assert_eq!(best_available, DeviceFeatures::REQUIRED);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn name_filter_without_match_finds_no_adapter() {
        let adapters = [adapter("a", DeviceFeatures::REQUIRED)];
        assert!(matches!(
            select_adapter(&adapters, DeviceFeatures::REQUIRED, Some("missing")),
            Err(RhiError::AdapterNotFound)
        ));
    }
}
