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

//! Recorded commands and the arena they are recorded into.

use super::pipeline::{BlendState, DepthStencilState, InputLayout, PrimitiveTopology, RasterizerState};
use super::resource::{DescriptorSetHandle, NativeHandle, ResourceId, ResourceView};
use super::util::{IndexFormat, ShaderStage, TextureLayout};
use crate::math::{Extent2D, LinearRgba, Rect, Viewport};
use std::sync::Arc;

/// The value an attachment is cleared to when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Clear a color attachment.
    Color(LinearRgba),
    /// Clear a depth-stencil attachment.
    DepthStencil {
        /// Depth clear value, `None` to preserve.
        depth: Option<f32>,
        /// Stencil clear value, `None` to preserve.
        stencil: Option<u32>,
    },
}

/// Parameters of a render pass begin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPassBegin {
    /// The native render pass of the bound pipeline.
    pub render_pass: NativeHandle,
    /// Color attachments, in slot order.
    pub color_attachments: Vec<ResourceView>,
    /// Depth-stencil attachment.
    pub depth_attachment: Option<ResourceView>,
    /// One entry per cleared color attachment (in slot order), then the depth-stencil clear.
    pub clear_values: Vec<ClearValue>,
    /// The render area.
    pub extent: Extent2D,
}

/// A recorded operation.
///
/// The command list records every native call into its [`CommandPool`] and forwards the
/// same value to the backend through [`RhiDevice::record`](crate::renderer::traits::RhiDevice::record).
#[derive(Debug, Clone, Default)]
pub enum Command {
    /// A reset slot.
    #[default]
    Unknown,
    /// Opens a named debug region.
    BeginMarker {
        /// Region name.
        name: String,
    },
    /// Closes the innermost debug region.
    EndMarker,
    /// Begins a render pass, clearing attachments as requested.
    BeginRenderPass(RenderPassBegin),
    /// Ends the current render pass.
    EndRenderPass,
    /// Binds a compiled pipeline.
    BindPipeline {
        /// Native pipeline object.
        pipeline: NativeHandle,
    },
    /// Binds a descriptor set.
    BindDescriptorSet {
        /// Pipeline layout the set was created against.
        layout: NativeHandle,
        /// The set.
        set: DescriptorSetHandle,
    },
    /// Sets the viewport.
    SetViewport(Viewport),
    /// Sets the scissor rectangle.
    SetScissorRectangle(Rect),
    /// Binds a vertex buffer.
    SetVertexBuffer {
        /// The buffer.
        buffer: ResourceView,
        /// Byte offset into the buffer.
        offset: u64,
        /// Byte stride of one vertex.
        stride: u32,
    },
    /// Binds an index buffer.
    SetIndexBuffer {
        /// The buffer.
        buffer: ResourceView,
        /// Byte offset into the buffer.
        offset: u64,
        /// Index width.
        format: IndexFormat,
    },
    /// A non-indexed draw.
    Draw {
        /// Number of vertices.
        vertex_count: u32,
        /// First vertex.
        vertex_offset: u32,
        /// Number of instances.
        instance_count: u32,
        /// First instance.
        first_instance: u32,
    },
    /// An indexed draw.
    DrawIndexed {
        /// Number of indices.
        index_count: u32,
        /// First index.
        index_offset: u32,
        /// Value added to each index.
        vertex_offset: i32,
        /// Number of instances.
        instance_count: u32,
        /// First instance.
        first_instance: u32,
    },
    /// An image layout transition.
    TransitionLayout {
        /// The texture being transitioned.
        texture: ResourceId,
        /// Layout before the barrier.
        from: TextureLayout,
        /// Layout after the barrier.
        to: TextureLayout,
    },
    /// A shader was set on the in-progress state.
    SetShader {
        /// Stage of the shader.
        stage: ShaderStage,
        /// Identity of the shader, [`ResourceId::NONE`] when cleared.
        shader: ResourceId,
    },
    /// The primitive topology was set on the in-progress state.
    SetPrimitiveTopology(PrimitiveTopology),
    /// The input layout was set on the in-progress state.
    SetInputLayout(Arc<InputLayout>),
    /// The rasterizer state was set on the in-progress state.
    SetRasterizerState(Arc<RasterizerState>),
    /// The blend state was set on the in-progress state.
    SetBlendState(Arc<BlendState>),
    /// The depth-stencil state was set on the in-progress state.
    SetDepthStencilState(Arc<DepthStencilState>),
    /// Render targets were set on the in-progress state.
    SetRenderTargets {
        /// Identities of the color targets.
        colors: Vec<ResourceId>,
        /// Identity of the depth target.
        depth: Option<ResourceId>,
    },
}

impl Command {
    /// A short name for logs and statistics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Unknown => "Unknown",
            Command::BeginMarker { .. } => "BeginMarker",
            Command::EndMarker => "EndMarker",
            Command::BeginRenderPass(_) => "BeginRenderPass",
            Command::EndRenderPass => "EndRenderPass",
            Command::BindPipeline { .. } => "BindPipeline",
            Command::BindDescriptorSet { .. } => "BindDescriptorSet",
            Command::SetViewport(_) => "SetViewport",
            Command::SetScissorRectangle(_) => "SetScissorRectangle",
            Command::SetVertexBuffer { .. } => "SetVertexBuffer",
            Command::SetIndexBuffer { .. } => "SetIndexBuffer",
            Command::Draw { .. } => "Draw",
            Command::DrawIndexed { .. } => "DrawIndexed",
            Command::TransitionLayout { .. } => "TransitionLayout",
            Command::SetShader { .. } => "SetShader",
            Command::SetPrimitiveTopology(_) => "SetPrimitiveTopology",
            Command::SetInputLayout(_) => "SetInputLayout",
            Command::SetRasterizerState(_) => "SetRasterizerState",
            Command::SetBlendState(_) => "SetBlendState",
            Command::SetDepthStencilState(_) => "SetDepthStencilState",
            Command::SetRenderTargets { .. } => "SetRenderTargets",
        }
    }

    /// Returns `true` for draw commands.
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::Draw { .. } | Command::DrawIndexed { .. })
    }
}

/// A growth-on-demand arena of reusable command records.
///
/// Slots are cleared and overwritten, never freed: [`CommandPool::reset`] only rewinds
/// the count, so a command list that records a similar frame every frame stops
/// allocating after the first one.
#[derive(Debug, Default)]
pub struct CommandPool {
    commands: Vec<Command>,
    count: usize,
}

impl CommandPool {
    /// Creates a pool with room for `capacity` commands.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    /// Returns the next slot, reset to [`Command::Unknown`].
    pub fn acquire(&mut self) -> &mut Command {
        let index = self.count;
        self.count += 1;
        if index < self.commands.len() {
            let slot = &mut self.commands[index];
            *slot = Command::Unknown;
            slot
        } else {
            self.commands.push(Command::Unknown);
            &mut self.commands[index]
        }
    }

    /// Records `command` into the next slot.
    pub fn push(&mut self, command: Command) {
        *self.acquire() = command;
    }

    /// Rewinds the pool. Slots stay allocated for reuse.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Number of commands recorded since the last reset.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing was recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots ever allocated.
    pub fn allocated(&self) -> usize {
        self.commands.len()
    }

    /// The commands recorded since the last reset, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands[..self.count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_grows_then_reuses_slots() {
        let mut pool = CommandPool::with_capacity(2);
        pool.push(Command::EndRenderPass);
        pool.push(Command::EndMarker);
        pool.push(Command::Draw {
            vertex_count: 3,
            vertex_offset: 0,
            instance_count: 1,
            first_instance: 0,
        });
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.allocated(), 3);

        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.allocated(), 3);

        let slot = pool.acquire();
        assert!(matches!(slot, Command::Unknown));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.allocated(), 3);
    }

    #[test]
    fn commands_only_exposes_the_current_recording() {
        let mut pool = CommandPool::default();
        pool.push(Command::BeginMarker { name: "a".into() });
        pool.push(Command::EndMarker);
        pool.reset();
        pool.push(Command::EndRenderPass);
        let names: Vec<_> = pool.commands().iter().map(Command::name).collect();
        assert_eq!(names, ["EndRenderPass"]);
    }

    #[test]
    fn draws_are_detected() {
        assert!(Command::DrawIndexed {
            index_count: 6,
            index_offset: 0,
            vertex_offset: 0,
            instance_count: 1,
            first_instance: 0,
        }
        .is_draw());
        assert!(!Command::EndMarker.is_draw());
    }
}
