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

mod common;

use anyhow::Result;
use common::device;
use std::cell::RefCell;
use tessera_core::rhi::api::{
    BufferDescriptor, BufferUsage, Format, LoadOp, QueueType, ResourceState, SamplerDescriptor,
    TextureDescriptor, TextureUsage, TextureViewDescriptor, TextureViewKind,
};
use tessera_infra::{D3d12Backend, VulkanBackend};
use tessera_lanes::{GraphBindings, GraphError, RenderGraph};
use tessera_rhi::{RenderingInfo, RhiBackend};

fn hdr_descriptor() -> TextureDescriptor<'static> {
    TextureDescriptor::new_2d(
        "hdr",
        16,
        16,
        Format::Rgba8Unorm,
        TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED,
    )
}

fn one_barrier_between_writer_and_reader<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let hdr = device.create_texture(&hdr_descriptor())?;
    let target = device
        .create_texture_view(&hdr, &TextureViewDescriptor::whole(TextureViewKind::RenderTarget))?;
    let sampled =
        device.create_texture_view(&hdr, &TextureViewDescriptor::whole(TextureViewKind::Sampled))?;
    let sampler = device.create_sampler(&SamplerDescriptor::linear_repeat());
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = pool.allocate()?;

    let order = RefCell::new(Vec::new());
    let mut graph = RenderGraph::<B>::new();
    graph
        .add_node("scene", &[("hdr", ResourceState::RenderTarget)], |cmd, res| {
            order.borrow_mut().push(res.node().to_owned());
            cmd.begin_rendering(&RenderingInfo::single(
                res.texture_view("hdr_target"),
                LoadOp::Clear([0.0, 0.0, 0.0, 1.0]),
            ));
            cmd.end_rendering();
        })
        .add_node("tonemap", &[("hdr", ResourceState::ShaderResource)], |_, res| {
            order.borrow_mut().push(res.node().to_owned());
            assert!(res.texture_view("hdr_sampled").index().is_some());
            assert_eq!(res.sampler("linear").index().0, sampler.index().0);
        })
        .add_node("bloom", &[("hdr", ResourceState::ShaderResource)], |_, res| {
            order.borrow_mut().push(res.node().to_owned());
        });

    let mut bindings = GraphBindings::new();
    bindings
        .add_texture("hdr", &hdr, ResourceState::Undefined)
        .add_texture_view("hdr_target", &target)
        .add_texture_view("hdr_sampled", &sampled)
        .add_sampler("linear", &sampler);

    commands.begin();
    let report = graph.execute(&bindings, std::slice::from_mut(&mut commands))?;
    commands.end()?;

    assert_eq!(report.transitions.len(), 2);
    assert_eq!(report.transitions_of("tonemap").count(), 1);
    assert_eq!(report.transitions_of("bloom").count(), 0);
    let tonemap = &report.transitions[1];
    assert_eq!(
        (tonemap.from, tonemap.to),
        (ResourceState::RenderTarget, ResourceState::ShaderResource)
    );
    assert_eq!(report.final_state("hdr"), Some(ResourceState::ShaderResource));
    assert_eq!(commands.stats().barriers, 2);
    assert_eq!(commands.stats().render_passes, 1);
    assert_eq!(*order.borrow(), ["scene", "tonemap", "bloom"]);
    Ok(())
}

fn unchanged_states_record_nothing<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let hdr = device.create_texture(&hdr_descriptor())?;
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = pool.allocate()?;

    let mut graph = RenderGraph::<B>::new();
    graph
        .add_transition_node("opaque", &[("hdr", ResourceState::RenderTarget)])
        .add_transition_node("transparent", &[("hdr", ResourceState::RenderTarget)]);
    let mut bindings = GraphBindings::new();
    bindings.add_texture("hdr", &hdr, ResourceState::RenderTarget);

    commands.begin();
    let report = graph.execute(&bindings, std::slice::from_mut(&mut commands))?;
    commands.end()?;
    assert!(report.transitions.is_empty());
    assert_eq!(commands.stats().barriers, 0);
    assert_eq!(report.final_state("hdr"), Some(ResourceState::RenderTarget));
    Ok(())
}

fn nodes_record_into_their_command_buffer<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let back_buffer = device.create_texture(&TextureDescriptor::new_2d(
        "back buffer",
        8,
        8,
        Format::Bgra8Unorm,
        TextureUsage::RENDER_TARGET,
    ))?;
    let particles = device.create_buffer(&BufferDescriptor::new(
        "particles",
        1024,
        BufferUsage::STORAGE | BufferUsage::VERTEX,
    ))?;
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = vec![pool.allocate()?, pool.allocate()?];

    let mut graph = RenderGraph::<B>::new();
    graph
        .add_transition_node("simulate", &[("particles", ResourceState::UnorderedAccess)])
        .add_node_on(
            "draw",
            1,
            &[
                ("particles", ResourceState::VertexBuffer),
                ("back_buffer", ResourceState::RenderTarget),
            ],
            |_, res| assert_eq!(res.buffer("particles").size(), 1024),
        )
        .add_transition_node_on("present", 1, &[("back_buffer", ResourceState::Present)]);
    let mut bindings = GraphBindings::new();
    bindings
        .add_buffer("particles", &particles, ResourceState::Common)
        .add_texture("back_buffer", &back_buffer, ResourceState::Present);

    for cmd in &mut commands {
        cmd.begin();
    }
    let report = graph.execute(&bindings, &mut commands)?;
    for cmd in &mut commands {
        cmd.end()?;
    }

    assert_eq!(commands[0].stats().barriers, 1);
    assert_eq!(commands[1].stats().barriers, 3);
    assert_eq!(report.final_state("particles"), Some(ResourceState::VertexBuffer));
    assert_eq!(report.final_state("back_buffer"), Some(ResourceState::Present));
    Ok(())
}

fn invalid_graphs_record_nothing<B: RhiBackend>() -> Result<()> {
    let device = device::<B>()?;
    let hdr = device.create_texture(&hdr_descriptor())?;
    let buffer =
        device.create_buffer(&BufferDescriptor::new("constants", 256, BufferUsage::UNIFORM))?;
    let pool = device.create_command_pool(QueueType::Graphics)?;
    let mut commands = pool.allocate()?;
    let mut bindings = GraphBindings::new();
    bindings
        .add_texture("hdr", &hdr, ResourceState::Undefined)
        .add_buffer("constants", &buffer, ResourceState::Common);
    commands.begin();

    let mut unknown = RenderGraph::<B>::new();
    unknown
        .add_transition_node("scene", &[("hdr", ResourceState::RenderTarget)])
        .add_transition_node("lighting", &[("gbuffer", ResourceState::ShaderResource)]);
    assert_eq!(
        unknown
            .execute(&bindings, std::slice::from_mut(&mut commands))
            .unwrap_err(),
        GraphError::UnknownResource {
            node: "lighting".to_owned(),
            resource: "gbuffer".to_owned(),
        }
    );

    let mut out_of_range = RenderGraph::<B>::new();
    out_of_range.add_transition_node_on("ui", 2, &[("hdr", ResourceState::RenderTarget)]);
    assert!(matches!(
        out_of_range.execute(&bindings, std::slice::from_mut(&mut commands)),
        Err(GraphError::CommandBufferOutOfRange {
            index: 2,
            available: 1,
            ..
        })
    ));

    let mut incompatible = RenderGraph::<B>::new();
    incompatible.add_transition_node("misuse", &[("constants", ResourceState::RenderTarget)]);
    assert!(matches!(
        incompatible.execute(&bindings, std::slice::from_mut(&mut commands)),
        Err(GraphError::IncompatibleState { .. })
    ));

    assert_eq!(commands.stats().barriers, 0);
    commands.end()?;
    Ok(())
}

#[test]
fn vulkan_single_barrier_between_passes() -> Result<()> {
    one_barrier_between_writer_and_reader::<VulkanBackend>()
}

#[test]
fn d3d12_single_barrier_between_passes() -> Result<()> {
    one_barrier_between_writer_and_reader::<D3d12Backend>()
}

#[test]
fn vulkan_unchanged_states() -> Result<()> {
    unchanged_states_record_nothing::<VulkanBackend>()
}

#[test]
fn d3d12_unchanged_states() -> Result<()> {
    unchanged_states_record_nothing::<D3d12Backend>()
}

#[test]
fn vulkan_multiple_command_buffers() -> Result<()> {
    nodes_record_into_their_command_buffer::<VulkanBackend>()
}

#[test]
fn d3d12_invalid_graphs() -> Result<()> {
    invalid_graphs_record_nothing::<D3d12Backend>()
}

#[test]
#[should_panic(expected = "declared twice")]
fn node_names_are_unique() {
    let mut graph = RenderGraph::<VulkanBackend>::new();
    graph
        .add_transition_node("present", &[])
        .add_transition_node("present", &[]);
}

#[test]
#[should_panic(expected = "bound twice")]
fn resource_names_are_unique() {
    let device = device::<VulkanBackend>().unwrap();
    let texture = device.create_texture(&hdr_descriptor()).unwrap();
    let buffer = device
        .create_buffer(&BufferDescriptor::new("hdr", 64, BufferUsage::STORAGE))
        .unwrap();
    let mut bindings = GraphBindings::new();
    bindings
        .add_texture("hdr", &texture, ResourceState::Undefined)
        .add_buffer("hdr", &buffer, ResourceState::Common);
}

#[test]
#[should_panic(expected = "looked up texture view 'shadow_map', which is not bound")]
fn missing_lookups_abort() {
    let device = device::<VulkanBackend>().unwrap();
    let pool = device.create_command_pool(QueueType::Graphics).unwrap();
    let mut commands = pool.allocate().unwrap();
    let mut graph = RenderGraph::<VulkanBackend>::new();
    graph.add_node("lighting", &[], |_, res| {
        res.texture_view("shadow_map");
    });
    commands.begin();
    let _ = graph.execute(&GraphBindings::new(), std::slice::from_mut(&mut commands));
}
