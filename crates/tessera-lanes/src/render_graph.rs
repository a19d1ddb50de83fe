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

//! Named passes with declared resource states.
//!
//! Each node lists the states it needs its resources in. Executing the graph
//! walks the nodes in declaration order, records a transition barrier for
//! every resource whose tracked state differs from the requirement, then runs
//! the node's callback:
//!
//! ```text
//! "gbuffer"  hdr: RENDER_TARGET      Undefined     -> RenderTarget   (1 barrier)
//! "lighting" hdr: SHADER_RESOURCE    RenderTarget  -> ShaderResource (1 barrier)
//! "tonemap"  hdr: SHADER_RESOURCE    unchanged                       (0 barriers)
//! ```
//!
//! There is no reordering, culling or aliasing. Bindings are rebuilt every
//! frame and execution is single-threaded, so a run is deterministic.

use ahash::{AHashMap, AHashSet};
use std::fmt;
use tessera_core::logging::LogLayer;
use tessera_core::rhi::api::ResourceState;
use tessera_core::{rhi_ensure, rhi_fatal};
use tessera_rhi::{Buffer, BufferView, CommandBuffer, RhiBackend, Sampler, Texture, TextureView};
use thiserror::Error;

/// Errors detected before a graph records anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A node requires a buffer or texture that is not bound.
    #[error("node '{node}' requires '{resource}', which is not bound")]
    UnknownResource {
        /// The node.
        node: String,
        /// The missing resource.
        resource: String,
    },
    /// A node targets a command buffer that was not supplied.
    #[error("node '{node}' records into command buffer {index}, {available} supplied")]
    CommandBufferOutOfRange {
        /// The node.
        node: String,
        /// The requested command buffer.
        index: usize,
        /// Command buffers passed to the execution.
        available: usize,
    },
    /// A node requires a state the resource kind cannot be in.
    #[error("node '{node}' requires '{resource}' in {state}, which it cannot enter")]
    IncompatibleState {
        /// The node.
        node: String,
        /// The resource.
        resource: String,
        /// The required state.
        state: ResourceState,
    },
}

/// The resources of one frame, by name, with the state they start in.
pub struct GraphBindings<'a, B: RhiBackend> {
    buffers: AHashMap<String, (&'a Buffer<'a, B>, ResourceState)>,
    textures: AHashMap<String, (&'a Texture<'a, B>, ResourceState)>,
    buffer_views: AHashMap<String, &'a BufferView<'a, B>>,
    texture_views: AHashMap<String, &'a TextureView<'a, B>>,
    samplers: AHashMap<String, &'a Sampler<'a, B>>,
}

impl<B: RhiBackend> fmt::Debug for GraphBindings<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBindings")
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("buffer_views", &self.buffer_views.len())
            .field("texture_views", &self.texture_views.len())
            .field("samplers", &self.samplers.len())
            .finish()
    }
}

impl<B: RhiBackend> Default for GraphBindings<'_, B> {
    fn default() -> Self {
        Self {
            buffers: AHashMap::new(),
            textures: AHashMap::new(),
            buffer_views: AHashMap::new(),
            texture_views: AHashMap::new(),
            samplers: AHashMap::new(),
        }
    }
}

impl<'a, B: RhiBackend> GraphBindings<'a, B> {
    /// No bindings.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_unused_resource_name(&self, name: &str) {
        rhi_ensure!(
            !self.buffers.contains_key(name) && !self.textures.contains_key(name),
            LogLayer::RenderGraph,
            "resource '{}' bound twice",
            name
        );
    }

    /// Binds a buffer whose tracked state starts at `state`.
    pub fn add_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: &'a Buffer<'a, B>,
        state: ResourceState,
    ) -> &mut Self {
        let name = name.into();
        self.ensure_unused_resource_name(&name);
        self.buffers.insert(name, (buffer, state));
        self
    }

    /// Binds a texture whose tracked state starts at `state`.
    pub fn add_texture(
        &mut self,
        name: impl Into<String>,
        texture: &'a Texture<'a, B>,
        state: ResourceState,
    ) -> &mut Self {
        let name = name.into();
        self.ensure_unused_resource_name(&name);
        self.textures.insert(name, (texture, state));
        self
    }

    /// Binds a buffer view for pass callbacks.
    pub fn add_buffer_view(
        &mut self,
        name: impl Into<String>,
        view: &'a BufferView<'a, B>,
    ) -> &mut Self {
        insert_unique(&mut self.buffer_views, name.into(), view, "buffer view");
        self
    }

    /// Binds a texture view for pass callbacks.
    pub fn add_texture_view(
        &mut self,
        name: impl Into<String>,
        view: &'a TextureView<'a, B>,
    ) -> &mut Self {
        insert_unique(&mut self.texture_views, name.into(), view, "texture view");
        self
    }

    /// Binds a sampler for pass callbacks.
    pub fn add_sampler(
        &mut self,
        name: impl Into<String>,
        sampler: &'a Sampler<'a, B>,
    ) -> &mut Self {
        insert_unique(&mut self.samplers, name.into(), sampler, "sampler");
        self
    }

    /// The state `name` starts the frame in.
    pub fn initial_state(&self, name: &str) -> Option<ResourceState> {
        self.buffers
            .get(name)
            .map(|(_, state)| *state)
            .or_else(|| self.textures.get(name).map(|(_, state)| *state))
    }
}

fn insert_unique<V>(map: &mut AHashMap<String, V>, name: String, value: V, kind: &str) {
    rhi_ensure!(
        !map.contains_key(&name),
        LogLayer::RenderGraph,
        "{} '{}' bound twice",
        kind,
        name
    );
    map.insert(name, value);
}

/// Read-only lookups into the bindings, handed to pass callbacks.
///
/// Looking up a name that is not bound aborts.
pub struct PassResources<'r, B: RhiBackend> {
    bindings: &'r GraphBindings<'r, B>,
    node: &'r str,
}

impl<'r, B: RhiBackend> PassResources<'r, B> {
    /// The node being executed.
    pub fn node(&self) -> &str {
        self.node
    }

    fn missing(&self, kind: &str, name: &str) -> ! {
        rhi_fatal!(
            LogLayer::RenderGraph,
            "node '{}' looked up {} '{}', which is not bound",
            self.node,
            kind,
            name
        )
    }

    /// A bound buffer.
    pub fn buffer(&self, name: &str) -> &'r Buffer<'r, B> {
        match self.bindings.buffers.get(name) {
            Some(&(buffer, _)) => buffer,
            None => self.missing("buffer", name),
        }
    }

    /// A bound texture.
    pub fn texture(&self, name: &str) -> &'r Texture<'r, B> {
        match self.bindings.textures.get(name) {
            Some(&(texture, _)) => texture,
            None => self.missing("texture", name),
        }
    }

    /// A bound buffer view.
    pub fn buffer_view(&self, name: &str) -> &'r BufferView<'r, B> {
        match self.bindings.buffer_views.get(name) {
            Some(&view) => view,
            None => self.missing("buffer view", name),
        }
    }

    /// A bound texture view.
    pub fn texture_view(&self, name: &str) -> &'r TextureView<'r, B> {
        match self.bindings.texture_views.get(name) {
            Some(&view) => view,
            None => self.missing("texture view", name),
        }
    }

    /// A bound sampler.
    pub fn sampler(&self, name: &str) -> &'r Sampler<'r, B> {
        match self.bindings.samplers.get(name) {
            Some(&sampler) => sampler,
            None => self.missing("sampler", name),
        }
    }
}

/// The work a node records after its transitions.
pub type PassCallback<'g, B> =
    Box<dyn for<'r, 'd> FnMut(&mut CommandBuffer<'d, B>, &PassResources<'r, B>) + 'g>;

struct GraphNode<'g, B: RhiBackend> {
    name: String,
    command_buffer: usize,
    requirements: Vec<(String, ResourceState)>,
    callback: Option<PassCallback<'g, B>>,
}

/// One barrier recorded by an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTransition {
    /// The node that required the new state.
    pub node: String,
    /// The resource.
    pub resource: String,
    /// The tracked state before the barrier.
    pub from: ResourceState,
    /// The required state.
    pub to: ResourceState,
}

/// What an execution recorded.
#[derive(Debug, Clone, Default)]
pub struct GraphExecutionReport {
    /// Every barrier, in recording order.
    pub transitions: Vec<GraphTransition>,
    /// The state every bound buffer and texture ends the frame in.
    pub final_states: AHashMap<String, ResourceState>,
}

impl GraphExecutionReport {
    /// The state `resource` ends the frame in.
    pub fn final_state(&self, resource: &str) -> Option<ResourceState> {
        self.final_states.get(resource).copied()
    }

    /// Barriers recorded for `node`.
    pub fn transitions_of<'s>(
        &'s self,
        node: &'s str,
    ) -> impl Iterator<Item = &'s GraphTransition> {
        self.transitions.iter().filter(move |t| t.node == node)
    }
}

/// Passes executed in declaration order.
pub struct RenderGraph<'g, B: RhiBackend> {
    nodes: Vec<GraphNode<'g, B>>,
    names: AHashSet<String>,
}

impl<B: RhiBackend> fmt::Debug for RenderGraph<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|node| &node.name))
            .finish()
    }
}

impl<B: RhiBackend> Default for RenderGraph<'_, B> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            names: AHashSet::new(),
        }
    }
}

impl<'g, B: RhiBackend> RenderGraph<'g, B> {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        name: String,
        command_buffer: usize,
        requirements: &[(&str, ResourceState)],
        callback: Option<PassCallback<'g, B>>,
    ) -> &mut Self {
        rhi_ensure!(
            self.names.insert(name.clone()),
            LogLayer::RenderGraph,
            "node '{}' declared twice",
            name
        );
        self.nodes.push(GraphNode {
            name,
            command_buffer,
            requirements: requirements
                .iter()
                .map(|(resource, state)| ((*resource).to_owned(), *state))
                .collect(),
            callback,
        });
        self
    }

    /// Adds a pass recording into the first command buffer.
    pub fn add_node<F>(
        &mut self,
        name: impl Into<String>,
        requirements: &[(&str, ResourceState)],
        callback: F,
    ) -> &mut Self
    where
        F: for<'r, 'd> FnMut(&mut CommandBuffer<'d, B>, &PassResources<'r, B>) + 'g,
    {
        self.push(name.into(), 0, requirements, Some(Box::new(callback)))
    }

    /// Adds a pass recording into command buffer `command_buffer`.
    pub fn add_node_on<F>(
        &mut self,
        name: impl Into<String>,
        command_buffer: usize,
        requirements: &[(&str, ResourceState)],
        callback: F,
    ) -> &mut Self
    where
        F: for<'r, 'd> FnMut(&mut CommandBuffer<'d, B>, &PassResources<'r, B>) + 'g,
    {
        self.push(name.into(), command_buffer, requirements, Some(Box::new(callback)))
    }

    /// Adds a node that only moves resources into the listed states, such as
    /// the back buffer into `PRESENT`.
    pub fn add_transition_node(
        &mut self,
        name: impl Into<String>,
        requirements: &[(&str, ResourceState)],
    ) -> &mut Self {
        self.push(name.into(), 0, requirements, None)
    }

    /// [`add_transition_node`](Self::add_transition_node) on command buffer
    /// `command_buffer`.
    pub fn add_transition_node_on(
        &mut self,
        name: impl Into<String>,
        command_buffer: usize,
        requirements: &[(&str, ResourceState)],
    ) -> &mut Self {
        self.push(name.into(), command_buffer, requirements, None)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node names in execution order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    fn validate(
        &self,
        bindings: &GraphBindings<'_, B>,
        available: usize,
    ) -> Result<(), GraphError> {
        for node in &self.nodes {
            if node.command_buffer >= available {
                return Err(GraphError::CommandBufferOutOfRange {
                    node: node.name.clone(),
                    index: node.command_buffer,
                    available,
                });
            }
            for (resource, state) in &node.requirements {
                let compatible = if bindings.buffers.contains_key(resource) {
                    !state.is_texture_only()
                } else if bindings.textures.contains_key(resource) {
                    !state.is_buffer_only()
                } else {
                    return Err(GraphError::UnknownResource {
                        node: node.name.clone(),
                        resource: resource.clone(),
                    });
                };
                if !compatible || *state == ResourceState::Undefined {
                    return Err(GraphError::IncompatibleState {
                        node: node.name.clone(),
                        resource: resource.clone(),
                        state: *state,
                    });
                }
            }
        }
        Ok(())
    }

    /// Records every node into `command_buffers`, which must be recording.
    ///
    /// # Errors
    ///
    /// Every node is checked against `bindings` before anything is recorded:
    /// [`GraphError::UnknownResource`], [`GraphError::IncompatibleState`] and
    /// [`GraphError::CommandBufferOutOfRange`].
    pub fn execute(
        &mut self,
        bindings: &GraphBindings<'_, B>,
        command_buffers: &mut [CommandBuffer<'_, B>],
    ) -> Result<GraphExecutionReport, GraphError> {
        self.validate(bindings, command_buffers.len())?;

        let mut states: AHashMap<&str, ResourceState> = bindings
            .buffers
            .iter()
            .map(|(name, (_, state))| (name.as_str(), *state))
            .chain(
                bindings
                    .textures
                    .iter()
                    .map(|(name, (_, state))| (name.as_str(), *state)),
            )
            .collect();
        let mut transitions = Vec::new();

        for node in &mut self.nodes {
            let commands = &mut command_buffers[node.command_buffer];
            for (resource, required) in &node.requirements {
                let Some(current) = states.get_mut(resource.as_str()) else {
                    continue;
                };
                if *current == *required {
                    continue;
                }
                if let Some((buffer, _)) = bindings.buffers.get(resource) {
                    commands.transition_buffer(buffer, *current, *required);
                } else if let Some((texture, _)) = bindings.textures.get(resource) {
                    commands.transition_texture(texture, *current, *required);
                }
                log::trace!(
                    target: LogLayer::RenderGraph.target(),
                    "'{}': '{}' {} -> {}",
                    node.name,
                    resource,
                    current,
                    required
                );
                transitions.push(GraphTransition {
                    node: node.name.clone(),
                    resource: resource.clone(),
                    from: *current,
                    to: *required,
                });
                *current = *required;
            }

            if let Some(callback) = node.callback.as_mut() {
                let resources = PassResources {
                    bindings,
                    node: &node.name,
                };
                callback(commands, &resources);
            }
        }

        Ok(GraphExecutionReport {
            transitions,
            final_states: states
                .into_iter()
                .map(|(name, state)| (name.to_owned(), state))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_node_and_resource() {
        let err = GraphError::UnknownResource {
            node: "lighting".to_owned(),
            resource: "gbuffer".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "node 'lighting' requires 'gbuffer', which is not bound"
        );
        let err = GraphError::CommandBufferOutOfRange {
            node: "ui".to_owned(),
            index: 2,
            available: 1,
        };
        assert!(err.to_string().contains("command buffer 2, 1 supplied"));
    }
}
