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

//! The host device shared by the native backends: adapters, heap, queues and
//! bindless descriptor tables.

use super::memory::HostHeap;
use super::queue::HostQueue;
use std::sync::{Arc, Mutex, MutexGuard};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    AdapterInfo, AdapterType, BackendKind, ContextDescriptor, DeviceFeatures, QueueType,
};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// Device memory exposed by the host adapters.
pub const HOST_DEVICE_MEMORY: u64 = 4 << 30;

/// The adapters a backend reports, in enumeration order.
///
/// The first one predates dynamic rendering and is never selected.
pub fn host_adapters(backend: BackendKind, vendor_id: u32) -> Vec<AdapterInfo> {
    vec![
        AdapterInfo {
            name: format!("Tessera Legacy Host Adapter ({backend})"),
            vendor_id,
            device_id: 0x0001,
            adapter_type: AdapterType::IntegratedGpu,
            backend,
            features: DeviceFeatures::DESCRIPTOR_INDEXING | DeviceFeatures::SAMPLER_ANISOTROPY,
            dedicated_memory: HOST_DEVICE_MEMORY / 4,
            supports_present: true,
        },
        AdapterInfo {
            name: format!("Tessera Host Adapter ({backend})"),
            vendor_id,
            device_id: 0x0002,
            adapter_type: AdapterType::DiscreteGpu,
            backend,
            features: DeviceFeatures::REQUIRED
                | DeviceFeatures::TIMELINE_SEMAPHORE
                | DeviceFeatures::MULTI_DRAW_INDIRECT
                | DeviceFeatures::FILL_MODE_NON_SOLID,
            dedicated_memory: HOST_DEVICE_MEMORY,
            supports_present: true,
        },
    ]
}

/// A fixed-size descriptor array indexed by bindless slot.
#[derive(Debug)]
pub struct DescriptorTable<T> {
    slots: Mutex<Vec<Option<T>>>,
}

impl<T: Clone> DescriptorTable<T> {
    /// A table of `capacity` empty slots.
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: Mutex::new(vec![None; capacity as usize]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<T>>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Number of slots.
    pub fn capacity(&self) -> u32 {
        self.lock().len() as u32
    }

    /// Writes a descriptor, replacing the previous one.
    pub fn write(&self, index: u32, descriptor: T) {
        match self.lock().get_mut(index as usize) {
            Some(slot) => *slot = Some(descriptor),
            None => rhi_log!(
                LogLayer::Backend,
                LogChannel::Warning,
                "descriptor write to slot {} outside of the table",
                index
            ),
        }
    }

    /// Empties a slot.
    pub fn clear(&self, index: u32) {
        if let Some(slot) = self.lock().get_mut(index as usize) {
            *slot = None;
        }
    }

    /// The descriptor in a slot.
    pub fn get(&self, index: u32) -> Option<T> {
        self.lock().get(index as usize).cloned().flatten()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.lock().iter().filter(|slot| slot.is_some()).count()
    }
}

/// A logical device on a host adapter.
#[derive(Debug)]
pub struct HostDevice {
    adapter: AdapterInfo,
    features: DeviceFeatures,
    heap: Arc<HostHeap>,
    graphics: Arc<HostQueue>,
    compute: Arc<HostQueue>,
    transfer: Arc<HostQueue>,
}

impl HostDevice {
    /// Opens `adapter` with the requested features and spawns its queues.
    pub fn open(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<Self> {
        if !adapter.features.contains(desc.features) {
            return Err(RhiError::FeatureNotSupported {
                required: desc.features,
                best_available: adapter.features,
            });
        }
        let name = adapter.backend.to_string().to_lowercase();
        Ok(Self {
            adapter: adapter.clone(),
            features: desc.features,
            heap: HostHeap::new(adapter.dedicated_memory),
            graphics: HostQueue::spawn(QueueType::Graphics, &name)?,
            compute: HostQueue::spawn(QueueType::Compute, &name)?,
            transfer: HostQueue::spawn(QueueType::Transfer, &name)?,
        })
    }

    /// The adapter this device runs on.
    pub fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// Features enabled at creation.
    pub fn features(&self) -> DeviceFeatures {
        self.features
    }

    /// The memory heap.
    pub fn heap(&self) -> &Arc<HostHeap> {
        &self.heap
    }

    /// The queue of a type.
    pub fn queue(&self, queue_type: QueueType) -> Arc<HostQueue> {
        match queue_type {
            QueueType::Graphics => self.graphics.clone(),
            QueueType::Compute => self.compute.clone(),
            QueueType::Transfer => self.transfer.clone(),
        }
    }

    /// Blocks until every queue is idle.
    pub fn wait_idle(&self) {
        self.graphics.wait_idle();
        self.compute.wait_idle();
        self.transfer.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_adapter_is_listed_first_and_lacks_dynamic_rendering() {
        let adapters = host_adapters(BackendKind::Vulkan, 0x10005);
        assert_eq!(adapters.len(), 2);
        assert!(!adapters[0].features.contains(DeviceFeatures::DYNAMIC_RENDERING));
        assert!(adapters[1].features.contains(DeviceFeatures::REQUIRED));
        assert!(!adapters[1]
            .features
            .contains(DeviceFeatures::TEXTURE_COMPRESSION_BC));
    }

    #[test]
    fn opening_with_missing_features_fails() {
        let adapter = &host_adapters(BackendKind::D3d12, 0x1414)[1];
        let desc = ContextDescriptor {
            features: DeviceFeatures::REQUIRED | DeviceFeatures::TEXTURE_COMPRESSION_BC,
            max_bindless_resources: 16,
            max_bindless_samplers: 4,
            max_attachment_views: 4,
            enable_validation: false,
        };
        let err = HostDevice::open(adapter, &desc).unwrap_err();
        assert!(matches!(err, RhiError::FeatureNotSupported { .. }));
    }

    #[test]
    fn descriptor_table_slots() {
        let table = DescriptorTable::<u32>::new(4);
        table.write(2, 7);
        assert_eq!(table.get(2), Some(7));
        assert_eq!(table.occupied(), 1);
        table.clear(2);
        assert_eq!(table.get(2), None);
        table.write(9, 1);
        assert_eq!(table.occupied(), 0);
    }
}
