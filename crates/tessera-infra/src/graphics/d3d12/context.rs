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

//! The D3D12 device, its committed resources and its descriptor heaps.
//!
//! Bindless slots live in one shader-visible CBV/SRV/UAV heap and one sampler
//! heap. Render-target and depth-stencil descriptors live in CPU-only heaps
//! whose slots are handed out by a [`FreeListAllocator`].

use super::conversions::{initial_state, IntoD3d12};
use super::native::*;
use crate::graphics::software::{
    host_adapters, Allocation, AllocationRef, AllocationShape, DescriptorTable, HostDevice,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    AdapterInfo, BackendKind, BufferDescriptor, BufferViewKind, ContextDescriptor, DeviceLimits,
    Extent3D, Format, ResolvedTextureView, SamplerDescriptor, TextureDescriptor, TextureViewKind,
};
use tessera_core::rhi::bindless::{FreeListAllocator, ResourceIndex, SamplerIndex, INVALID_INDEX};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// PCI vendor id reported by the WARP adapter.
pub const VENDOR_ID: u32 = 0x1414;

/// Root parameter holding the push constants.
pub const ROOT_CONSTANTS_PARAMETER: u32 = 0;
/// Root parameter holding the CBV/SRV/UAV table.
pub const RESOURCE_TABLE_PARAMETER: u32 = 1;
/// Root parameter holding the sampler table.
pub const SAMPLER_TABLE_PARAMETER: u32 = 2;

const RTV_DESCRIPTOR_SIZE: usize = 32;
const DSV_DESCRIPTOR_SIZE: usize = 8;
const RTV_HEAP_START: usize = 0x0001_0000;
const DSV_HEAP_START: usize = 0x0100_0000;

/// Limits of the D3D12 adapters (feature level 12_0, resource binding tier 3).
pub fn d3d12_limits() -> DeviceLimits {
    DeviceLimits {
        max_bindless_resources: D3D12_MAX_SHADER_VISIBLE_DESCRIPTOR_HEAP_SIZE_TIER_3,
        max_bindless_samplers: D3D12_MAX_SHADER_VISIBLE_SAMPLER_HEAP_SIZE,
        // Two descriptor tables cost one DWORD each.
        max_push_constant_bytes: (D3D12_MAX_ROOT_COST - 2) * 4,
        max_texture_dimension_2d: D3D12_REQ_TEXTURE2D_U_OR_V_DIMENSION,
        max_color_attachments: D3D12_SIMULTANEOUS_RENDER_TARGET_COUNT,
        texture_row_pitch_alignment: D3D12_TEXTURE_DATA_PITCH_ALIGNMENT,
        texture_placement_alignment: D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT,
        min_uniform_buffer_offset_alignment: D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT,
        max_sampler_anisotropy: D3D12_MAX_MAXANISOTROPY,
    }
}

/// Lists the DXGI adapters.
pub fn enumerate() -> Vec<AdapterInfo> {
    host_adapters(BackendKind::D3d12, VENDOR_ID)
}

/// One descriptor of the CBV/SRV/UAV heap.
#[derive(Debug, Clone, PartialEq)]
pub enum D3d12ShaderView {
    /// `CreateConstantBufferView`.
    Cbv {
        /// `BufferLocation`.
        buffer_location: D3D12_GPU_VIRTUAL_ADDRESS,
        /// `SizeInBytes`, a multiple of 256.
        size_in_bytes: u32,
    },
    /// A raw (`ByteAddressBuffer`) SRV or UAV over a buffer.
    RawBuffer {
        /// The viewed resource.
        resource: u64,
        /// First 32-bit element.
        first_element: u64,
        /// 32-bit element count.
        num_elements: u32,
        /// `true` for a UAV.
        writable: bool,
    },
    /// A texture SRV.
    TextureSrv {
        /// The viewed resource.
        resource: u64,
        /// View format.
        format: DXGI_FORMAT,
        /// View dimension.
        view_dimension: D3D12_SRV_DIMENSION,
        /// `MostDetailedMip`.
        most_detailed_mip: u32,
        /// `MipLevels`.
        mip_levels: u32,
        /// `FirstArraySlice`.
        first_array_slice: u32,
        /// `ArraySize`.
        array_size: u32,
    },
    /// A texture UAV over one mip.
    TextureUav {
        /// The viewed resource.
        resource: u64,
        /// View format.
        format: DXGI_FORMAT,
        /// `MipSlice`.
        mip_slice: u32,
        /// `FirstArraySlice`.
        first_array_slice: u32,
        /// `ArraySize`.
        array_size: u32,
    },
}

/// The D3D12 device context.
#[derive(Debug)]
pub struct D3d12Context {
    pub(crate) device: HostDevice,
    pub(crate) limits: DeviceLimits,
    pub(crate) resources: DescriptorTable<D3d12ShaderView>,
    pub(crate) samplers: DescriptorTable<D3D12_SAMPLER_DESC>,
    rtv_heap: Mutex<FreeListAllocator>,
    dsv_heap: Mutex<FreeListAllocator>,
    pub(crate) validation: bool,
    next_object: AtomicU64,
    next_address: AtomicU64,
}

impl D3d12Context {
    pub(crate) fn new(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<Self> {
        let limits = d3d12_limits();
        if desc.max_bindless_resources > limits.max_bindless_resources
            || desc.max_bindless_samplers > limits.max_bindless_samplers
        {
            return Err(RhiError::InvalidDescriptor(format!(
                "shader-visible heaps hold {} resources and {} samplers, {} and {} requested",
                limits.max_bindless_resources,
                limits.max_bindless_samplers,
                desc.max_bindless_resources,
                desc.max_bindless_samplers
            )));
        }
        let device = HostDevice::open(adapter, desc)?;
        if desc.enable_validation {
            rhi_log!(
                LogLayer::Backend,
                LogChannel::Info,
                "ID3D12Debug::EnableDebugLayer"
            );
        }
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "D3D12CreateDevice on '{}' ({} CBV/SRV/UAV, {} samplers, {} RTV/DSV)",
            adapter.name,
            desc.max_bindless_resources,
            desc.max_bindless_samplers,
            desc.max_attachment_views
        );
        Ok(Self {
            device,
            limits,
            resources: DescriptorTable::new(desc.max_bindless_resources),
            samplers: DescriptorTable::new(desc.max_bindless_samplers),
            rtv_heap: Mutex::new(FreeListAllocator::new(desc.max_attachment_views)),
            dsv_heap: Mutex::new(FreeListAllocator::new(desc.max_attachment_views)),
            validation: desc.enable_validation,
            next_object: AtomicU64::new(1),
            next_address: AtomicU64::new(D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT),
        })
    }

    /// The host device.
    pub fn device(&self) -> &HostDevice {
        &self.device
    }

    /// The descriptor written at a resource index.
    pub fn resource_descriptor(&self, index: ResourceIndex) -> Option<D3d12ShaderView> {
        self.resources.get(index.0)
    }

    /// The sampler written at a sampler index.
    pub fn sampler_descriptor(&self, index: SamplerIndex) -> Option<D3D12_SAMPLER_DESC> {
        self.samplers.get(index.0)
    }

    /// Occupied RTV and DSV slots.
    pub fn attachment_descriptors_in_use(&self) -> (u32, u32) {
        let count = |heap: &Mutex<FreeListAllocator>| {
            heap.lock().map(|h| h.allocated_count()).unwrap_or(0)
        };
        (count(&self.rtv_heap), count(&self.dsv_heap))
    }

    pub(crate) fn next_object(&self) -> u64 {
        self.next_object.fetch_add(1, Ordering::Relaxed)
    }

    fn reserve_address(&self, size: u64) -> D3D12_GPU_VIRTUAL_ADDRESS {
        let span = size
            .max(1)
            .div_ceil(D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT)
            * D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT;
        self.next_address.fetch_add(span, Ordering::Relaxed)
    }
}

/// A committed buffer resource.
#[derive(Debug)]
pub struct D3d12Buffer {
    /// Object identity.
    pub id: u64,
    /// `GetGPUVirtualAddress`.
    pub gpu_virtual_address: D3D12_GPU_VIRTUAL_ADDRESS,
    /// The heap it was committed on.
    pub heap_type: D3D12_HEAP_TYPE,
    /// Resource flags.
    pub flags: D3D12_RESOURCE_FLAGS,
    /// Width in bytes.
    pub size: u64,
    pub(crate) memory: AllocationRef,
}

impl D3d12Buffer {
    /// The backing memory.
    pub fn allocation(&self) -> &AllocationRef {
        &self.memory
    }
}

/// A committed texture resource, or a swapchain back buffer.
#[derive(Debug, Clone)]
pub struct D3d12Texture {
    /// Object identity.
    pub id: u64,
    /// The RHI format.
    pub format: Format,
    /// The DXGI format.
    pub dxgi_format: DXGI_FORMAT,
    /// Resource flags.
    pub flags: D3D12_RESOURCE_FLAGS,
    /// Size of mip 0.
    pub extent: Extent3D,
    /// `MipLevels`.
    pub mip_levels: u32,
    /// `DepthOrArraySize` for array textures.
    pub array_size: u32,
    pub(crate) memory: AllocationRef,
}

impl D3d12Texture {
    /// The backing memory.
    pub fn allocation(&self) -> &AllocationRef {
        &self.memory
    }
}

/// An RTV or DSV in a CPU-only descriptor heap.
#[derive(Debug, Clone)]
pub struct D3d12AttachmentView {
    /// RTV or DSV heap.
    pub heap_type: D3D12_DESCRIPTOR_HEAP_TYPE,
    /// Slot inside the heap.
    pub heap_index: u32,
    /// The CPU descriptor handle.
    pub handle: D3D12_CPU_DESCRIPTOR_HANDLE,
    /// The RHI format, used to pack clear values.
    pub format: Format,
    /// `MipSlice`.
    pub mip_slice: u32,
    /// `FirstArraySlice`.
    pub array_slice: u32,
    pub(crate) memory: AllocationRef,
}

pub(crate) fn create_buffer(
    ctx: &D3d12Context,
    desc: &BufferDescriptor<'_>,
) -> RhiResult<D3d12Buffer> {
    let heap_type: D3D12_HEAP_TYPE = desc.location.into_d3d12();
    let memory = Allocation::new(
        ctx.device.heap(),
        desc.size,
        AllocationShape::Buffer,
        desc.label_or_default(),
    )?;
    if ctx.validation {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::None,
            "CreateCommittedResource '{}': {} bytes on heap {:?} in {:?}",
            desc.label_or_default(),
            desc.size,
            heap_type,
            initial_state(heap_type)
        );
    }
    Ok(D3d12Buffer {
        id: ctx.next_object(),
        gpu_virtual_address: ctx.reserve_address(desc.size),
        heap_type,
        flags: desc.usage.into_d3d12(),
        size: desc.size,
        memory,
    })
}

pub(crate) fn create_texture(
    ctx: &D3d12Context,
    desc: &TextureDescriptor<'_>,
) -> RhiResult<D3d12Texture> {
    let largest = desc.size.width.max(desc.size.height);
    if largest > ctx.limits.max_texture_dimension_2d {
        return Err(RhiError::Backend {
            call: "CreateCommittedResource",
            code: E_INVALIDARG.0,
        });
    }
    let memory = Allocation::new(
        ctx.device.heap(),
        desc.total_size(),
        AllocationShape::texture(desc),
        desc.label_or_default(),
    )?;
    Ok(D3d12Texture {
        id: ctx.next_object(),
        format: desc.format,
        dxgi_format: desc.format.into_d3d12(),
        flags: desc.usage.into_d3d12(),
        extent: desc.size,
        mip_levels: desc.mip_level_count,
        array_size: desc.array_layer_count,
        memory,
    })
}

fn check_mappable(buffer: &D3d12Buffer) -> bool {
    if buffer.heap_type == D3D12_HEAP_TYPE_DEFAULT {
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "ID3D12Resource::Map on '{}', a DEFAULT heap resource",
            buffer.memory.label()
        );
        return false;
    }
    true
}

pub(crate) fn write_bytes(buffer: &D3d12Buffer, offset: u64, data: &[u8]) {
    if !check_mappable(buffer) {
        return;
    }
    let mut bytes = buffer.memory.bytes();
    let start = offset as usize;
    match bytes.get_mut(start..start + data.len()) {
        Some(range) => range.copy_from_slice(data),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "Map write of {} bytes at {} overruns '{}'",
            data.len(),
            offset,
            buffer.memory.label()
        ),
    }
}

pub(crate) fn read_bytes(buffer: &D3d12Buffer, offset: u64, out: &mut [u8]) {
    if !check_mappable(buffer) {
        return;
    }
    let bytes = buffer.memory.bytes();
    let start = offset as usize;
    match bytes.get(start..start + out.len()) {
        Some(range) => out.copy_from_slice(range),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "Map read of {} bytes at {} overruns '{}'",
            out.len(),
            offset,
            buffer.memory.label()
        ),
    }
}

pub(crate) fn buffer_view(
    buffer: &D3d12Buffer,
    kind: BufferViewKind,
    offset: u64,
    size: u64,
) -> D3d12ShaderView {
    match kind {
        BufferViewKind::Uniform => D3d12ShaderView::Cbv {
            buffer_location: buffer.gpu_virtual_address + offset,
            size_in_bytes: size.div_ceil(D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT) as u32
                * D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT as u32,
        },
        BufferViewKind::Storage | BufferViewKind::StorageReadWrite => {
            D3d12ShaderView::RawBuffer {
                resource: buffer.id,
                first_element: offset / 4,
                num_elements: (size / 4) as u32,
                writable: kind == BufferViewKind::StorageReadWrite,
            }
        }
    }
}

pub(crate) fn texture_view(texture: &D3d12Texture, view: &ResolvedTextureView) -> D3d12ShaderView {
    match view.kind {
        TextureViewKind::Storage => D3d12ShaderView::TextureUav {
            resource: texture.id,
            format: view.format.into_d3d12(),
            mip_slice: view.base_mip_level,
            first_array_slice: view.base_array_layer,
            array_size: view.array_layer_count,
        },
        _ => D3d12ShaderView::TextureSrv {
            resource: texture.id,
            format: view.format.into_d3d12(),
            view_dimension: view.dimension.into_d3d12(),
            most_detailed_mip: view.base_mip_level,
            mip_levels: view.mip_level_count,
            first_array_slice: view.base_array_layer,
            array_size: view.array_layer_count,
        },
    }
}

pub(crate) fn sampler_desc(ctx: &D3d12Context, desc: &SamplerDescriptor<'_>) -> D3D12_SAMPLER_DESC {
    D3D12_SAMPLER_DESC {
        Filter: desc.into_d3d12(),
        AddressU: desc.address_mode_u.into_d3d12(),
        AddressV: desc.address_mode_v.into_d3d12(),
        AddressW: desc.address_mode_w.into_d3d12(),
        MipLODBias: 0.0,
        MaxAnisotropy: u32::from(desc.anisotropy_clamp.min(ctx.limits.max_sampler_anisotropy)),
        ComparisonFunc: desc
            .compare
            .map(IntoD3d12::into_d3d12)
            .unwrap_or(D3D12_COMPARISON_FUNC_NEVER),
        BorderColor: desc.border_color.into_d3d12(),
        MinLOD: desc.lod_min_clamp,
        MaxLOD: desc.lod_max_clamp,
    }
}

pub(crate) fn create_attachment_view(
    ctx: &D3d12Context,
    texture: &D3d12Texture,
    view: &ResolvedTextureView,
) -> RhiResult<D3d12AttachmentView> {
    let (heap_type, heap, start, stride, call) = if view.format.is_depth() {
        (
            D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
            &ctx.dsv_heap,
            DSV_HEAP_START,
            DSV_DESCRIPTOR_SIZE,
            "CreateDepthStencilView",
        )
    } else {
        (
            D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            &ctx.rtv_heap,
            RTV_HEAP_START,
            RTV_DESCRIPTOR_SIZE,
            "CreateRenderTargetView",
        )
    };
    let heap_index = heap
        .lock()
        .map(|mut heap| heap.allocate())
        .unwrap_or(INVALID_INDEX);
    if heap_index == INVALID_INDEX {
        return Err(RhiError::Backend {
            call,
            code: E_OUTOFMEMORY.0,
        });
    }
    Ok(D3d12AttachmentView {
        heap_type,
        heap_index,
        handle: D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: start + heap_index as usize * stride,
        },
        format: view.format,
        mip_slice: view.base_mip_level,
        array_slice: view.base_array_layer,
        memory: texture.memory.clone(),
    })
}

pub(crate) fn destroy_attachment_view(ctx: &D3d12Context, view: D3d12AttachmentView) {
    let heap = if view.heap_type == D3D12_DESCRIPTOR_HEAP_TYPE_DSV {
        &ctx.dsv_heap
    } else {
        &ctx.rtv_heap
    };
    if let Ok(mut heap) = heap.lock() {
        heap.free(view.heap_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::rhi::api::{
        BufferUsage, DeviceFeatures, MemoryLocation, TextureUsage, TextureViewDimension,
    };

    fn context(attachments: u32) -> D3d12Context {
        let adapter = enumerate()
            .into_iter()
            .find(|a| a.features.contains(DeviceFeatures::REQUIRED))
            .unwrap();
        let desc = ContextDescriptor {
            features: DeviceFeatures::REQUIRED,
            max_bindless_resources: 64,
            max_bindless_samplers: 8,
            max_attachment_views: attachments,
            enable_validation: false,
        };
        D3d12Context::new(&adapter, &desc).unwrap()
    }

    fn rtv(format: Format) -> ResolvedTextureView {
        ResolvedTextureView {
            kind: TextureViewKind::RenderTarget,
            format,
            dimension: TextureViewDimension::D2,
            base_mip_level: 0,
            mip_level_count: 1,
            base_array_layer: 0,
            array_layer_count: 1,
        }
    }

    #[test]
    fn constant_buffer_views_are_256_aligned() {
        let ctx = context(4);
        let mut desc = BufferDescriptor::new("cb", 1024, BufferUsage::UNIFORM);
        desc.location = MemoryLocation::CpuToGpu;
        let buffer = create_buffer(&ctx, &desc).unwrap();
        match buffer_view(&buffer, BufferViewKind::Uniform, 256, 100) {
            D3d12ShaderView::Cbv {
                buffer_location,
                size_in_bytes,
            } => {
                assert_eq!(buffer_location, buffer.gpu_virtual_address + 256);
                assert_eq!(size_in_bytes, 256);
            }
            other => panic!("expected a CBV, got {other:?}"),
        }
    }

    #[test]
    fn attachment_heaps_are_recycled() {
        let ctx = context(1);
        let texture = create_texture(
            &ctx,
            &TextureDescriptor::new_2d("rt", 4, 4, Format::Rgba8Unorm, TextureUsage::RENDER_TARGET),
        )
        .unwrap();
        let first = create_attachment_view(&ctx, &texture, &rtv(Format::Rgba8Unorm)).unwrap();
        assert!(matches!(
            create_attachment_view(&ctx, &texture, &rtv(Format::Rgba8Unorm)),
            Err(RhiError::Backend {
                call: "CreateRenderTargetView",
                ..
            })
        ));
        assert_eq!(ctx.attachment_descriptors_in_use(), (1, 0));
        let slot = first.heap_index;
        destroy_attachment_view(&ctx, first);
        let again = create_attachment_view(&ctx, &texture, &rtv(Format::Rgba8Unorm)).unwrap();
        assert_eq!(again.heap_index, slot);
    }

    #[test]
    fn depth_views_come_from_the_dsv_heap() {
        let ctx = context(2);
        let texture = create_texture(
            &ctx,
            &TextureDescriptor::new_2d(
                "depth",
                4,
                4,
                Format::Depth32Float,
                TextureUsage::DEPTH_STENCIL,
            ),
        )
        .unwrap();
        let view = create_attachment_view(&ctx, &texture, &rtv(Format::Depth32Float)).unwrap();
        assert_eq!(view.heap_type, D3D12_DESCRIPTOR_HEAP_TYPE_DSV);
        assert_eq!(ctx.attachment_descriptors_in_use(), (0, 1));
    }

    #[test]
    fn buffers_get_distinct_virtual_addresses() {
        let ctx = context(1);
        let a = create_buffer(&ctx, &BufferDescriptor::new("a", 16, BufferUsage::VERTEX)).unwrap();
        let b = create_buffer(&ctx, &BufferDescriptor::new("b", 16, BufferUsage::VERTEX)).unwrap();
        assert!(b.gpu_virtual_address >= a.gpu_virtual_address + 16);
        assert_eq!(a.gpu_virtual_address % D3D12_DEFAULT_RESOURCE_PLACEMENT_ALIGNMENT, 0);
    }
}
