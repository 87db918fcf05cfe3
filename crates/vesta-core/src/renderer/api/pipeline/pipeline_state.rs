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

//! The declarative description of one draw configuration.

use super::enums::PrimitiveTopology;
use super::state::{BlendState, DepthStencilState, InputLayout, RasterizerState};
use crate::math::{Extent2D, LinearRgba, Viewport};
use crate::renderer::api::util::TextureFormat;
use crate::renderer::settings::MAX_RENDER_TARGETS;
use crate::renderer::traits::{Shader, SwapChain, Texture};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Everything a draw needs: shaders, fixed-function state, vertex layout, render
/// targets and how they are cleared, viewport and topology.
///
/// A render pass fills one in through the command list before beginning the pass.
/// [`PipelineState::pipeline_hash`] is the key the pipeline cache resolves it by.
///
/// Clear values are `Option`s: `None` preserves the target's contents, `Some` clears
/// it at the start of the pass.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Vertex shader. Mandatory.
    pub shader_vertex: Option<Arc<dyn Shader>>,
    /// Pixel shader.
    pub shader_pixel: Option<Arc<dyn Shader>>,
    /// Compute shader.
    pub shader_compute: Option<Arc<dyn Shader>>,
    /// Vertex input layout. Falls back to the vertex shader's own layout when `None`.
    pub input_layout: Option<Arc<InputLayout>>,
    /// Rasterizer state.
    pub rasterizer_state: Option<Arc<RasterizerState>>,
    /// Blend state.
    pub blend_state: Option<Arc<BlendState>>,
    /// Depth-stencil state.
    pub depth_stencil_state: Option<Arc<DepthStencilState>>,
    /// Primitive topology.
    pub primitive_topology: PrimitiveTopology,
    /// Byte stride of the bound vertex buffer.
    pub vertex_buffer_stride: u32,
    /// Color render targets.
    pub render_target_color_textures: [Option<Arc<dyn Texture>>; MAX_RENDER_TARGETS],
    /// Per-target clear color, `None` to preserve.
    pub clear_color: [Option<LinearRgba>; MAX_RENDER_TARGETS],
    /// Depth-stencil target.
    pub render_target_depth_texture: Option<Arc<dyn Texture>>,
    /// Array slice of the depth-stencil target to render into.
    pub render_target_depth_array_index: u32,
    /// Depth clear value, `None` to preserve.
    pub clear_depth: Option<f32>,
    /// Stencil clear value, `None` to preserve.
    pub clear_stencil: Option<u32>,
    /// Render into the swap chain's current image instead of color textures.
    pub render_target_swapchain: Option<Arc<dyn SwapChain>>,
    /// Viewport. [`Viewport::UNDEFINED`] covers the whole render area.
    pub viewport: Viewport,
    /// If `true`, the scissor is left to explicit `set_scissor_rectangle` calls.
    pub dynamic_scissor: bool,
}

impl PipelineState {
    /// Returns `true` if the state can produce a graphics pipeline: a vertex shader and at
    /// least one render target, depth target or swap chain.
    pub fn is_valid(&self) -> bool {
        self.shader_vertex.is_some() && self.has_render_target()
    }

    /// Returns `true` if any color target, depth target or swap chain is set.
    pub fn has_render_target(&self) -> bool {
        self.render_target_color_textures.iter().any(Option::is_some)
            || self.render_target_depth_texture.is_some()
            || self.render_target_swapchain.is_some()
    }

    /// Returns the number of leading color targets that are set.
    pub fn color_target_count(&self) -> usize {
        self.render_target_color_textures
            .iter()
            .take_while(|t| t.is_some())
            .count()
    }

    /// Returns `true` if the pass must clear any attachment.
    pub fn clears_anything(&self) -> bool {
        self.clear_color.iter().any(Option::is_some)
            || self.clear_depth.is_some()
            || self.clear_stencil.is_some()
    }

    /// The size of the render area: the first color target, else the depth target,
    /// else the swap chain.
    pub fn extent(&self) -> Extent2D {
        if let Some(texture) = self.render_target_color_textures.iter().flatten().next() {
            return Extent2D::new(texture.width(), texture.height());
        }
        if let Some(depth) = &self.render_target_depth_texture {
            return Extent2D::new(depth.width(), depth.height());
        }
        if let Some(swapchain) = &self.render_target_swapchain {
            return swapchain.extent();
        }
        Extent2D::default()
    }

    /// The viewport a pass begins with.
    pub fn effective_viewport(&self) -> Viewport {
        if self.viewport.is_undefined() {
            Viewport::from_extent(self.extent())
        } else {
            self.viewport
        }
    }

    /// Color formats of the render targets, in slot order.
    pub fn color_formats(&self) -> Vec<TextureFormat> {
        if let Some(swapchain) = &self.render_target_swapchain {
            return vec![swapchain.format()];
        }
        self.render_target_color_textures
            .iter()
            .flatten()
            .map(|t| t.format())
            .collect()
    }

    /// The content hash that identifies the compiled pipeline this state needs.
    ///
    /// Shader identities, fixed-function state contents, input layout, topology,
    /// vertex stride, render target formats and count, depth format and whether each
    /// attachment is cleared participate. Clear values, attachment identities and the
    /// viewport do not.
    pub fn pipeline_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.hash_pipeline(&mut hasher);
        hasher.finish()
    }

    fn hash_pipeline<H: Hasher>(&self, state: &mut H) {
        for shader in [&self.shader_vertex, &self.shader_pixel, &self.shader_compute] {
            shader.as_ref().map(|s| s.id()).hash(state);
        }
        match (&self.input_layout, &self.shader_vertex) {
            (Some(layout), _) => Some(layout.as_ref()).hash(state),
            (None, Some(vs)) => vs.input_layout().as_deref().hash(state),
            (None, None) => None::<&InputLayout>.hash(state),
        }
        self.rasterizer_state.as_deref().hash(state);
        self.blend_state.as_deref().hash(state);
        self.depth_stencil_state.as_deref().hash(state);
        self.primitive_topology.hash(state);
        self.vertex_buffer_stride.hash(state);

        for (index, (texture, clear)) in self
            .render_target_color_textures
            .iter()
            .zip(self.clear_color.iter())
            .enumerate()
        {
            // The swap chain image takes the first color slot.
            let targeted =
                texture.is_some() || (index == 0 && self.render_target_swapchain.is_some());
            texture.as_ref().map(|t| t.format()).hash(state);
            (targeted && clear.is_some()).hash(state);
        }
        self.render_target_depth_texture
            .as_ref()
            .map(|t| t.format())
            .hash(state);
        self.clear_depth.is_some().hash(state);
        self.clear_stencil.is_some().hash(state);
        self.render_target_swapchain
            .as_ref()
            .map(|s| s.format())
            .hash(state);
        self.dynamic_scissor.hash(state);
    }
}
