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

//! The Vulkan logical device, its memory objects and its bindless descriptor set.

use super::conversions::{aspect_of, IntoVk};
use crate::graphics::software::{
    host_adapters, Allocation, AllocationRef, AllocationShape, DescriptorTable, HostDevice,
};
use ash::vk;
use ash::vk::Handle;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::{
    AdapterInfo, BackendKind, BufferDescriptor, BufferViewKind, ContextDescriptor, DeviceLimits,
    Extent3D, Format, ResolvedTextureView, SamplerDescriptor, TextureDescriptor,
};
use tessera_core::rhi::bindless::{ResourceIndex, SamplerIndex};
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// `VK_VENDOR_ID_MESA`.
pub const VENDOR_ID: u32 = 0x10005;

/// Descriptor set holding the resource array.
pub const RESOURCE_SET: u32 = 0;
/// Descriptor set holding the sampler array.
pub const SAMPLER_SET: u32 = 1;

/// Limits of the Vulkan adapters.
pub fn vulkan_limits() -> DeviceLimits {
    DeviceLimits {
        max_bindless_resources: 1 << 20,
        max_bindless_samplers: 4000,
        max_push_constant_bytes: 256,
        max_texture_dimension_2d: 16384,
        max_color_attachments: 8,
        texture_row_pitch_alignment: 1,
        texture_placement_alignment: 16,
        min_uniform_buffer_offset_alignment: 256,
        max_sampler_anisotropy: 16,
    }
}

/// Lists the Vulkan physical devices.
pub fn enumerate() -> Vec<AdapterInfo> {
    host_adapters(BackendKind::Vulkan, VENDOR_ID)
}

/// One write into the resource array.
#[derive(Debug, Clone)]
pub enum VkDescriptor {
    /// `UNIFORM_BUFFER` or `STORAGE_BUFFER`.
    Buffer {
        /// Descriptor type.
        descriptor_type: vk::DescriptorType,
        /// The buffer.
        buffer: vk::Buffer,
        /// Byte offset.
        offset: u64,
        /// Byte range.
        range: u64,
    },
    /// `SAMPLED_IMAGE` or `STORAGE_IMAGE`.
    Image {
        /// Descriptor type.
        descriptor_type: vk::DescriptorType,
        /// The image.
        image: vk::Image,
        /// View type.
        view_type: vk::ImageViewType,
        /// View format.
        format: vk::Format,
        /// Layout the shader expects.
        layout: vk::ImageLayout,
        /// Viewed subresources.
        subresource_range: vk::ImageSubresourceRange,
    },
}

/// One write into the sampler array, mirroring `VkSamplerCreateInfo`.
#[derive(Debug, Clone, Copy)]
pub struct VkSamplerState {
    /// The sampler object.
    pub sampler: vk::Sampler,
    /// Magnification filter.
    pub mag_filter: vk::Filter,
    /// Minification filter.
    pub min_filter: vk::Filter,
    /// Mip filter.
    pub mipmap_mode: vk::SamplerMipmapMode,
    /// Addressing per axis.
    pub address_modes: [vk::SamplerAddressMode; 3],
    /// Whether anisotropy is enabled.
    pub anisotropy_enable: bool,
    /// Maximum anisotropy.
    pub max_anisotropy: f32,
    /// Depth comparison, if any.
    pub compare_op: Option<vk::CompareOp>,
    /// Minimum LOD.
    pub min_lod: f32,
    /// Maximum LOD.
    pub max_lod: f32,
    /// Border colour.
    pub border_color: vk::BorderColor,
}

/// The Vulkan device context.
#[derive(Debug)]
pub struct VulkanContext {
    pub(crate) device: HostDevice,
    pub(crate) limits: DeviceLimits,
    pub(crate) resources: DescriptorTable<VkDescriptor>,
    pub(crate) samplers: DescriptorTable<VkSamplerState>,
    pub(crate) validation: bool,
    next_handle: AtomicU64,
}

impl VulkanContext {
    pub(crate) fn new(adapter: &AdapterInfo, desc: &ContextDescriptor) -> RhiResult<Self> {
        let limits = vulkan_limits();
        if desc.max_bindless_resources > limits.max_bindless_resources
            || desc.max_bindless_samplers > limits.max_bindless_samplers
        {
            return Err(RhiError::InvalidDescriptor(format!(
                "descriptor indexing supports {} resources and {} samplers, {} and {} requested",
                limits.max_bindless_resources,
                limits.max_bindless_samplers,
                desc.max_bindless_resources,
                desc.max_bindless_samplers
            )));
        }
        let device = HostDevice::open(adapter, desc)?;
        rhi_log!(
            LogLayer::Backend,
            LogChannel::Info,
            "vkCreateDevice on '{}' ({} resource descriptors, {} samplers, validation {})",
            adapter.name,
            desc.max_bindless_resources,
            desc.max_bindless_samplers,
            if desc.enable_validation { "on" } else { "off" }
        );
        Ok(Self {
            device,
            limits,
            resources: DescriptorTable::new(desc.max_bindless_resources),
            samplers: DescriptorTable::new(desc.max_bindless_samplers),
            validation: desc.enable_validation,
            next_handle: AtomicU64::new(0x1000),
        })
    }

    /// The host device.
    pub fn device(&self) -> &HostDevice {
        &self.device
    }

    /// The descriptor written at a resource index.
    pub fn resource_descriptor(&self, index: ResourceIndex) -> Option<VkDescriptor> {
        self.resources.get(index.0)
    }

    /// The sampler written at a sampler index.
    pub fn sampler_descriptor(&self, index: SamplerIndex) -> Option<VkSamplerState> {
        self.samplers.get(index.0)
    }

    pub(crate) fn next_handle<H: Handle>(&self) -> H {
        H::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

/// A `VkBuffer` bound to its memory.
#[derive(Debug)]
pub struct VkBuffer {
    /// The buffer handle.
    pub handle: vk::Buffer,
    /// Usage flags.
    pub usage: vk::BufferUsageFlags,
    /// Whether the memory is `HOST_VISIBLE`.
    pub host_visible: bool,
    pub(crate) memory: AllocationRef,
}

impl VkBuffer {
    /// The backing memory.
    pub fn allocation(&self) -> &AllocationRef {
        &self.memory
    }
}

/// A `VkImage` bound to its memory.
#[derive(Debug, Clone)]
pub struct VkImage {
    /// The image handle.
    pub handle: vk::Image,
    /// The RHI format.
    pub format: Format,
    /// The Vulkan format.
    pub vk_format: vk::Format,
    /// Usage flags.
    pub usage: vk::ImageUsageFlags,
    /// Aspects of the format.
    pub aspect: vk::ImageAspectFlags,
    /// Size of mip 0.
    pub extent: Extent3D,
    pub(crate) memory: AllocationRef,
}

impl VkImage {
    /// The backing memory.
    pub fn allocation(&self) -> &AllocationRef {
        &self.memory
    }
}

/// A `VkImageView` used as a rendering attachment.
#[derive(Debug, Clone)]
pub struct VkImageView {
    /// The view handle.
    pub handle: vk::ImageView,
    /// The viewed image.
    pub image: vk::Image,
    /// The RHI format, used to pack clear values.
    pub format: Format,
    /// Aspects.
    pub aspect: vk::ImageAspectFlags,
    /// Mip level rendered to.
    pub mip_level: u32,
    /// Array layer rendered to.
    pub array_layer: u32,
    pub(crate) memory: AllocationRef,
}

pub(crate) fn create_buffer(
    ctx: &VulkanContext,
    desc: &BufferDescriptor<'_>,
) -> RhiResult<VkBuffer> {
    let memory = Allocation::new(
        ctx.device.heap(),
        desc.size,
        AllocationShape::Buffer,
        desc.label_or_default(),
    )?;
    Ok(VkBuffer {
        handle: ctx.next_handle(),
        usage: desc.usage.into_vk(),
        host_visible: desc.location.is_host_visible(),
        memory,
    })
}

pub(crate) fn create_image(
    ctx: &VulkanContext,
    desc: &TextureDescriptor<'_>,
) -> RhiResult<VkImage> {
    let largest = desc.size.width.max(desc.size.height);
    if largest > ctx.limits.max_texture_dimension_2d {
        return Err(RhiError::InvalidDescriptor(format!(
            "'{}' is {} texels wide, maxImageDimension2D is {}",
            desc.label_or_default(),
            largest,
            ctx.limits.max_texture_dimension_2d
        )));
    }
    let memory = Allocation::new(
        ctx.device.heap(),
        desc.total_size(),
        AllocationShape::texture(desc),
        desc.label_or_default(),
    )?;
    Ok(VkImage {
        handle: ctx.next_handle(),
        format: desc.format,
        vk_format: desc.format.into_vk(),
        usage: desc.usage.into_vk(),
        aspect: aspect_of(desc.format),
        extent: desc.size,
        memory,
    })
}

pub(crate) fn write_bytes(buffer: &VkBuffer, offset: u64, data: &[u8]) {
    let mut bytes = buffer.memory.bytes();
    let start = offset as usize;
    match bytes.get_mut(start..start + data.len()) {
        Some(range) => range.copy_from_slice(data),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "vkMapMemory: write of {} bytes at {} is outside of '{}'",
            data.len(),
            offset,
            buffer.memory.label()
        ),
    }
}

pub(crate) fn read_bytes(buffer: &VkBuffer, offset: u64, out: &mut [u8]) {
    let bytes = buffer.memory.bytes();
    let start = offset as usize;
    match bytes.get(start..start + out.len()) {
        Some(range) => out.copy_from_slice(range),
        None => rhi_log!(
            LogLayer::Backend,
            LogChannel::Warning,
            "vkMapMemory: read of {} bytes at {} is outside of '{}'",
            out.len(),
            offset,
            buffer.memory.label()
        ),
    }
}

pub(crate) fn buffer_descriptor(
    buffer: &VkBuffer,
    kind: BufferViewKind,
    offset: u64,
    range: u64,
) -> VkDescriptor {
    VkDescriptor::Buffer {
        descriptor_type: kind.into_vk(),
        buffer: buffer.handle,
        offset,
        range,
    }
}

pub(crate) fn image_descriptor(image: &VkImage, view: &ResolvedTextureView) -> VkDescriptor {
    use tessera_core::rhi::api::TextureViewKind;
    let (descriptor_type, layout) = match view.kind {
        TextureViewKind::Storage => (vk::DescriptorType::STORAGE_IMAGE, vk::ImageLayout::GENERAL),
        _ => (
            vk::DescriptorType::SAMPLED_IMAGE,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ),
    };
    VkDescriptor::Image {
        descriptor_type,
        image: image.handle,
        view_type: view.dimension.into_vk(),
        format: view.format.into_vk(),
        layout,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: aspect_of(view.format),
            base_mip_level: view.base_mip_level,
            level_count: view.mip_level_count,
            base_array_layer: view.base_array_layer,
            layer_count: view.array_layer_count,
        },
    }
}

pub(crate) fn sampler_state(ctx: &VulkanContext, desc: &SamplerDescriptor<'_>) -> VkSamplerState {
    let anisotropy_enable = desc.is_anisotropic();
    VkSamplerState {
        sampler: ctx.next_handle(),
        mag_filter: desc.mag_filter.into_vk(),
        min_filter: desc.min_filter.into_vk(),
        mipmap_mode: desc.mipmap_filter.into_vk(),
        address_modes: [
            desc.address_mode_u.into_vk(),
            desc.address_mode_v.into_vk(),
            desc.address_mode_w.into_vk(),
        ],
        anisotropy_enable,
        max_anisotropy: f32::from(desc.anisotropy_clamp.min(ctx.limits.max_sampler_anisotropy)),
        compare_op: desc.compare.map(IntoVk::into_vk),
        min_lod: desc.lod_min_clamp,
        max_lod: desc.lod_max_clamp,
        border_color: desc.border_color.into_vk(),
    }
}

pub(crate) fn attachment_view(
    ctx: &VulkanContext,
    image: &VkImage,
    view: &ResolvedTextureView,
) -> VkImageView {
    VkImageView {
        handle: ctx.next_handle(),
        image: image.handle,
        format: view.format,
        aspect: aspect_of(view.format),
        mip_level: view.base_mip_level,
        array_layer: view.base_array_layer,
        memory: image.memory.clone(),
    }
}
