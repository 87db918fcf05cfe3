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

//! A compiled pipeline and the descriptor sets realised for it.

use ahash::AHashMap;
use std::sync::Arc;
use vesta_core::renderer::{
    blueprint_hash, Buffer, CompilationState, Descriptor, DescriptorKind, DescriptorSetHandle,
    NativePipeline, PipelineDescription, PipelineError, PipelineState, ResourceId, RhiDevice,
    RhiError, Sampler, Shader, ShaderError, ShaderShift, Texture, TextureLayout,
};

/// What a binding call did to the descriptor blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindResult {
    /// The slot now references a different binding; the descriptor state is dirty.
    Changed,
    /// The same binding was already in place.
    Unchanged,
    /// No descriptor of that kind exists at the slot.
    SlotNotFound,
    /// The texture cannot be sampled in its current layout; the previous binding stays.
    Rejected,
}

/// A texture layout change the command list must record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    /// The texture.
    pub texture: ResourceId,
    /// Layout before the barrier.
    pub from: TextureLayout,
    /// Layout after the barrier.
    pub to: TextureLayout,
}

/// The realised form of one [`PipelineState`].
///
/// Holds the native pipeline objects, the descriptor blueprint merged from the
/// shaders, and every descriptor set created for a distinct blueprint content.
/// Sets are never evicted while the pipeline lives.
pub struct Pipeline {
    device: Arc<dyn RhiDevice>,
    hash: u64,
    native: NativePipeline,
    shift: ShaderShift,
    descriptors: Vec<Descriptor>,
    descriptor_sets: AHashMap<u64, DescriptorSetHandle>,
    dirty: bool,
    pending_transitions: Vec<LayoutTransition>,
    // textures displaced from a slot while a layout revert was still owed
    displaced_reverts: Vec<(Arc<dyn Texture>, TextureLayout)>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("native", &self.native)
            .field("descriptors", &self.descriptors.len())
            .field("descriptor_sets", &self.descriptor_sets.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Pipeline {
    /// Builds the pipeline for `state`.
    ///
    /// Blocks until every shader of the state has finished compiling, merges their
    /// descriptors and asks the device for the native objects.
    ///
    /// ## Errors
    /// * `PipelineError::MissingVertexShader` / `MissingRenderTarget` - If `state` is invalid.
    /// * `PipelineError::Shader` - If a shader failed to compile.
    /// * `PipelineError::CreationFailed` - If the device rejected the pipeline.
    pub fn new(
        device: Arc<dyn RhiDevice>,
        state: &PipelineState,
        shift: ShaderShift,
    ) -> Result<Self, PipelineError> {
        if state.shader_vertex.is_none() {
            return Err(PipelineError::MissingVertexShader);
        }
        if !state.has_render_target() {
            return Err(PipelineError::MissingRenderTarget);
        }

        let hash = state.pipeline_hash();
        let descriptors = reflect_shaders(state)?;
        let native = device
            .create_pipeline(&PipelineDescription {
                hash,
                state,
                descriptors: &descriptors,
            })
            .map_err(|e| PipelineError::CreationFailed {
                hash,
                details: e.to_string(),
            })?;

        log::debug!(
            "Created pipeline {hash:#018x} with {} descriptors.",
            descriptors.len()
        );

        Ok(Self {
            device,
            hash,
            native,
            shift,
            descriptors,
            descriptor_sets: AHashMap::new(),
            dirty: true,
            pending_transitions: Vec::new(),
            displaced_reverts: Vec::new(),
        })
    }

    /// The hash of the state this pipeline was built for.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The native pipeline, layout and render pass.
    pub fn native(&self) -> NativePipeline {
        self.native
    }

    /// The descriptor blueprint, in reflection order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Returns `true` if the next draw must rebind its descriptor set.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of distinct descriptor sets created so far.
    pub fn descriptor_set_count(&self) -> usize {
        self.descriptor_sets.len()
    }

    /// Binds a constant buffer at the unshifted `slot`.
    pub fn set_constant_buffer(&mut self, slot: u32, buffer: &dyn Buffer) -> BindResult {
        let Some(slot) = slot.checked_add(self.shift.buffer) else {
            return BindResult::SlotNotFound;
        };
        self.bind(DescriptorKind::ConstantBuffer, slot, |d| {
            d.id = buffer.id();
            d.resource = Some(buffer.resource());
            d.size = buffer.size();
        })
    }

    /// Binds a sampler at the unshifted `slot`.
    pub fn set_sampler(&mut self, slot: u32, sampler: &dyn Sampler) -> BindResult {
        let Some(slot) = slot.checked_add(self.shift.sampler) else {
            return BindResult::SlotNotFound;
        };
        self.bind(DescriptorKind::Sampler, slot, |d| {
            d.id = sampler.id();
            d.resource = Some(sampler.resource());
        })
    }

    /// Binds a texture at the unshifted `slot`.
    ///
    /// A texture in the `General` layout is moved to `ShaderReadOnly` for the rest of the
    /// pass; the transition is queued for [`Pipeline::take_layout_transitions`] and undone
    /// by [`Pipeline::revert_texture_layouts`].
    pub fn set_texture(&mut self, slot: u32, texture: &Arc<dyn Texture>) -> BindResult {
        if !texture.is_sampled() {
            log::warn!(
                "Texture '{}' can't be sampled in layout {:?}, binding rejected.",
                texture.name(),
                texture.layout()
            );
            return BindResult::Rejected;
        }

        let Some(slot) = slot.checked_add(self.shift.texture) else {
            return BindResult::SlotNotFound;
        };
        let Some(index) = self
            .descriptors
            .iter()
            .position(|d| d.matches(DescriptorKind::Texture, slot))
        else {
            return BindResult::SlotNotFound;
        };

        let current = texture.layout();
        let layout = if current == TextureLayout::General {
            TextureLayout::ShaderReadOnly
        } else {
            current
        };

        let descriptor = &mut self.descriptors[index];
        if descriptor.id != texture.id() {
            if let (Some(previous), Some(revert)) =
                (descriptor.texture.take(), descriptor.revert_layout.take())
            {
                self.displaced_reverts.push((previous, revert));
            }
        }

        if layout != current {
            texture.set_layout(layout);
            self.pending_transitions.push(LayoutTransition {
                texture: texture.id(),
                from: current,
                to: layout,
            });
            descriptor.texture = Some(Arc::clone(texture));
            descriptor.revert_layout = Some(current);
        }

        let changed = descriptor.id != texture.id() || descriptor.layout != layout;
        descriptor.id = texture.id();
        descriptor.resource = texture.shader_view();
        descriptor.layout = layout;
        if changed {
            self.dirty = true;
            BindResult::Changed
        } else {
            BindResult::Unchanged
        }
    }

    fn bind(
        &mut self,
        kind: DescriptorKind,
        slot: u32,
        apply: impl FnOnce(&mut Descriptor),
    ) -> BindResult {
        let Some(descriptor) = self.descriptors.iter_mut().find(|d| d.matches(kind, slot)) else {
            return BindResult::SlotNotFound;
        };
        let before = (descriptor.id, descriptor.size);
        apply(descriptor);
        if (descriptor.id, descriptor.size) != before {
            self.dirty = true;
            BindResult::Changed
        } else {
            BindResult::Unchanged
        }
    }

    /// Resolves the descriptor set for the current blueprint.
    ///
    /// Returns `None` when the set already bound is still valid, so the caller can skip
    /// rebinding. Otherwise returns the cached set for this content, creating it if the
    /// content was never seen.
    ///
    /// ## Errors
    /// * `RhiError` - If the device fails to create a new set.
    pub fn descriptor_set(&mut self) -> Result<Option<DescriptorSetHandle>, RhiError> {
        let hash = blueprint_hash(&self.descriptors);
        if let Some(set) = self.descriptor_sets.get(&hash) {
            if !self.dirty {
                return Ok(None);
            }
            self.dirty = false;
            return Ok(Some(*set));
        }

        let set = self
            .device
            .create_descriptor_set(self.native.layout, &self.descriptors)?;
        self.descriptor_sets.insert(hash, set);
        self.dirty = false;
        log::debug!(
            "Created descriptor set {set:?} for blueprint {hash:#018x} (pipeline {:#018x}).",
            self.hash
        );
        Ok(Some(set))
    }

    /// Layout transitions queued by binding calls since the last call.
    pub fn take_layout_transitions(&mut self) -> Vec<LayoutTransition> {
        std::mem::take(&mut self.pending_transitions)
    }

    /// Restores every texture moved to a sampling layout during the pass and returns
    /// the transitions to record.
    pub fn revert_texture_layouts(&mut self) -> Vec<LayoutTransition> {
        let mut owed = std::mem::take(&mut self.displaced_reverts);
        for descriptor in &mut self.descriptors {
            if let (Some(texture), Some(revert)) =
                (descriptor.texture.take(), descriptor.revert_layout.take())
            {
                owed.push((texture, revert));
            }
        }

        owed.into_iter()
            .filter_map(|(texture, layout)| {
                let from = texture.layout();
                if from == layout {
                    return None;
                }
                texture.set_layout(layout);
                Some(LayoutTransition {
                    texture: texture.id(),
                    from,
                    to: layout,
                })
            })
            .collect()
    }

    /// Called when a command buffer this pipeline was bound in has been consumed, and
    /// whenever it is bound into a new recording. Bound descriptor sets do not survive
    /// a command buffer, so the next draw rebinds.
    pub fn on_command_list_consumed(&mut self) {
        self.dirty = true;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.device.destroy_pipeline(&self.native);
        log::trace!("Destroyed pipeline {:#018x}.", self.hash);
    }
}

fn wait_until_compiled(shader: &dyn Shader) -> Result<(), ShaderError> {
    match shader.wait_for_compilation() {
        CompilationState::Succeeded => Ok(()),
        CompilationState::Failed(details) => Err(ShaderError::CompilationFailed {
            name: shader.name().to_string(),
            details,
        }),
        CompilationState::Idle | CompilationState::Compiling => Err(ShaderError::NotCompiled {
            name: shader.name().to_string(),
        }),
    }
}

/// Merges the descriptors of the vertex and pixel shaders into one blueprint.
///
/// A descriptor is identified by `(kind, slot)`; when both stages declare it, the
/// stage masks are combined instead of duplicating the entry.
fn reflect_shaders(state: &PipelineState) -> Result<Vec<Descriptor>, PipelineError> {
    let mut blueprint: Vec<Descriptor> = Vec::new();
    let stages = [&state.shader_vertex, &state.shader_pixel];
    for shader in stages.into_iter().flatten() {
        wait_until_compiled(shader.as_ref())?;
        for descriptor in shader.descriptors() {
            match blueprint
                .iter_mut()
                .find(|d| d.matches(descriptor.kind, descriptor.slot))
            {
                Some(existing) => existing.stage = existing.stage | descriptor.stage,
                None => blueprint.push(descriptor),
            }
        }
    }
    if let Some(compute) = &state.shader_compute {
        wait_until_compiled(compute.as_ref())?;
    }
    Ok(blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::renderer::{BackendConfig, ShaderStage, ShaderStageFlags, TextureFormat};
    use vesta_infra::headless::{
        BufferKind, HeadlessBuffer, HeadlessSampler, HeadlessShader, HeadlessTexture,
        ShaderBinding, ShaderDescriptor, TextureDescriptor,
    };
    use vesta_infra::HeadlessDevice;

    fn device() -> Arc<dyn RhiDevice> {
        Arc::new(HeadlessDevice::new(&BackendConfig::default()))
    }

    fn sampled(name: &str) -> Arc<dyn Texture> {
        HeadlessTexture::new(TextureDescriptor::sampled(
            name,
            TextureFormat::Rgba8Unorm,
            4,
            4,
        ))
        .unwrap()
    }

    fn state() -> PipelineState {
        let shift = ShaderShift::default();
        let vs = HeadlessShader::compile(
            ShaderDescriptor::new(
                "mesh.vs",
                ShaderStage::Vertex,
                vec![
                    ShaderBinding::constant_buffer("frame", 0, 64),
                    ShaderBinding::texture("height", 1),
                ],
            ),
            shift,
        );
        let ps = HeadlessShader::compile(
            ShaderDescriptor::new(
                "mesh.ps",
                ShaderStage::Pixel,
                vec![
                    ShaderBinding::constant_buffer("frame", 0, 64),
                    ShaderBinding::texture("albedo", 0),
                    ShaderBinding::sampler("linear", 0),
                ],
            ),
            shift,
        );
        let target: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
            "color",
            TextureFormat::Rgba8Unorm,
            8,
            8,
        ))
        .unwrap();
        let mut state = PipelineState {
            shader_vertex: Some(vs),
            shader_pixel: Some(ps),
            ..Default::default()
        };
        state.render_target_color_textures[0] = Some(target);
        state
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(device(), &state(), ShaderShift::default()).unwrap()
    }

    #[test]
    fn reflection_merges_stages() {
        let pipeline = pipeline();
        let descriptors = pipeline.descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[0].slot, 100);
        assert_eq!(descriptors[0].stage, ShaderStageFlags::VERTEX_PIXEL);
        assert_eq!(descriptors[1].slot, 201);
        assert_eq!(descriptors[1].stage, ShaderStageFlags::VERTEX);
        assert_eq!(descriptors[2].slot, 200);
        assert_eq!(descriptors[2].stage, ShaderStageFlags::PIXEL);
    }

    #[test]
    fn invalid_states_are_rejected() {
        let mut no_vs = state();
        no_vs.shader_vertex = None;
        assert_eq!(
            Pipeline::new(device(), &no_vs, ShaderShift::default()).unwrap_err(),
            PipelineError::MissingVertexShader
        );

        let mut no_target = state();
        no_target.render_target_color_textures[0] = None;
        assert_eq!(
            Pipeline::new(device(), &no_target, ShaderShift::default()).unwrap_err(),
            PipelineError::MissingRenderTarget
        );
    }

    #[test]
    fn failed_compilation_is_a_shader_error() {
        let mut desc = ShaderDescriptor::new("broken.ps", ShaderStage::Pixel, Vec::new());
        desc.compile_error = Some("syntax error".to_string());
        let mut state = state();
        state.shader_pixel = Some(HeadlessShader::compile(desc, ShaderShift::default()));
        let err = Pipeline::new(device(), &state, ShaderShift::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Shader(ShaderError::CompilationFailed {
                name: "broken.ps".to_string(),
                details: "syntax error".to_string()
            })
        );
    }

    #[test]
    fn rebinding_the_same_resource_is_not_dirty() {
        let mut pipeline = pipeline();
        let texture = sampled("albedo");
        assert_eq!(pipeline.set_texture(0, &texture), BindResult::Changed);
        assert!(pipeline.descriptor_set().unwrap().is_some());
        assert!(!pipeline.is_dirty());

        assert_eq!(pipeline.set_texture(0, &texture), BindResult::Unchanged);
        assert!(!pipeline.is_dirty());
        assert_eq!(pipeline.descriptor_set().unwrap(), None);

        assert_eq!(pipeline.set_texture(0, &sampled("other")), BindResult::Changed);
        assert!(pipeline.is_dirty());
    }

    #[test]
    fn descriptor_sets_are_cached_by_content() {
        let mut pipeline = pipeline();
        let a = sampled("a");
        let b = sampled("b");

        pipeline.set_texture(0, &a);
        let set_a = pipeline.descriptor_set().unwrap().unwrap();
        pipeline.set_texture(0, &b);
        let set_b = pipeline.descriptor_set().unwrap().unwrap();
        assert_ne!(set_a, set_b);

        pipeline.set_texture(0, &a);
        assert_eq!(pipeline.descriptor_set().unwrap(), Some(set_a));
        assert_eq!(pipeline.descriptor_set_count(), 2);
    }

    #[test]
    fn consumed_pipeline_rebinds_cached_set() {
        let mut pipeline = pipeline();
        let set = pipeline.descriptor_set().unwrap();
        assert!(set.is_some());
        assert_eq!(pipeline.descriptor_set().unwrap(), None);

        pipeline.on_command_list_consumed();
        assert_eq!(pipeline.descriptor_set().unwrap(), set);
    }

    #[test]
    fn unsampleable_texture_keeps_previous_binding() {
        let mut pipeline = pipeline();
        let good = sampled("good");
        pipeline.set_texture(0, &good);

        let target: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
            "in-flight",
            TextureFormat::Rgba16Float,
            4,
            4,
        ))
        .unwrap();
        target.set_layout(TextureLayout::ColorAttachment);
        assert_eq!(pipeline.set_texture(0, &target), BindResult::Rejected);
        assert_eq!(pipeline.descriptors()[2].id, good.id());
    }

    #[test]
    fn general_layout_is_transitioned_and_reverted() {
        let mut pipeline = pipeline();
        let storage: Arc<dyn Texture> = {
            let mut desc = TextureDescriptor::sampled("ssao", TextureFormat::R8Unorm, 4, 4);
            desc.initial_layout = TextureLayout::General;
            HeadlessTexture::new(desc).unwrap()
        };

        pipeline.set_texture(0, &storage);
        assert_eq!(storage.layout(), TextureLayout::ShaderReadOnly);
        assert_eq!(
            pipeline.take_layout_transitions(),
            vec![LayoutTransition {
                texture: storage.id(),
                from: TextureLayout::General,
                to: TextureLayout::ShaderReadOnly,
            }]
        );
        assert!(pipeline.take_layout_transitions().is_empty());

        let reverted = pipeline.revert_texture_layouts();
        assert_eq!(reverted.len(), 1);
        assert_eq!(reverted[0].to, TextureLayout::General);
        assert_eq!(storage.layout(), TextureLayout::General);
        assert!(pipeline.revert_texture_layouts().is_empty());
    }

    #[test]
    fn displaced_texture_is_still_reverted() {
        let mut pipeline = pipeline();
        let mut desc = TextureDescriptor::sampled("ssr", TextureFormat::Rgba16Float, 4, 4);
        desc.initial_layout = TextureLayout::General;
        let storage: Arc<dyn Texture> = HeadlessTexture::new(desc).unwrap();

        pipeline.set_texture(0, &storage);
        pipeline.set_texture(0, &sampled("replacement"));
        let reverted = pipeline.revert_texture_layouts();
        assert_eq!(reverted.len(), 1);
        assert_eq!(storage.layout(), TextureLayout::General);
    }

    #[test]
    fn constant_buffers_and_samplers_bind_by_shifted_slot() {
        let mut pipeline = pipeline();
        let buffer = HeadlessBuffer::new("frame", BufferKind::Constant, 64, 1);
        let sampler = HeadlessSampler::new("linear");
        assert_eq!(pipeline.set_constant_buffer(0, &*buffer), BindResult::Changed);
        assert_eq!(pipeline.set_sampler(0, &*sampler), BindResult::Changed);
        assert_eq!(pipeline.set_sampler(4, &*sampler), BindResult::SlotNotFound);
        assert_eq!(pipeline.descriptors()[0].size, 64);
    }

    #[test]
    fn slots_past_the_shifted_range_are_not_found() {
        let mut pipeline = pipeline();
        let buffer = HeadlessBuffer::new("frame", BufferKind::Constant, 64, 1);
        let sampler = HeadlessSampler::new("linear");
        let albedo = sampled("albedo");
        assert_eq!(
            pipeline.set_constant_buffer(u32::MAX, &*buffer),
            BindResult::SlotNotFound
        );
        assert_eq!(pipeline.set_sampler(u32::MAX - 1, &*sampler), BindResult::SlotNotFound);
        assert_eq!(pipeline.set_texture(u32::MAX, &albedo), BindResult::SlotNotFound);
    }

    #[test]
    fn dropping_destroys_native_objects() {
        let device = device();
        let pipeline = Pipeline::new(Arc::clone(&device), &state(), ShaderShift::default()).unwrap();
        assert_eq!(device.stats().pipelines_created, 1);
        drop(pipeline);
        assert_eq!(device.stats().pipelines_destroyed, 1);
    }
}
