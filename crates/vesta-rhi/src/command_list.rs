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

//! The command list: the state machine render passes record through.

use crate::error::CommandListError;
use crate::frame_bindings::FrameBindings;
use crate::marker::{MarkerStack, Scope, ScopeKind};
use crate::pipeline::{LayoutTransition, Pipeline};
use crate::pipeline_cache::{PipelineCache, SharedPipeline};
use crate::stats::CommandListStats;
use std::sync::Arc;
use vesta_core::math::{Rect, Viewport};
use vesta_core::renderer::{
    BlendState, Buffer, ClearValue, Command, CommandBufferHandle, CommandPool, DepthStencilState,
    FenceHandle, InputLayout, NativeHandle, PipelineError, PipelineState, PrimitiveTopology,
    Profiler, RasterizerState, RenderPassBegin, ResourceId, RhiDevice, RhiError, RhiSettings,
    Sampler, SemaphoreHandle, Shader, ShaderStage, SubmitInfo, Texture, TextureLayout,
    MAX_RENDER_TARGETS,
};

/// Where a command list is in its record / submit / reuse cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandListState {
    /// Ready to record.
    #[default]
    Idle,
    /// Between a pass begin and its end.
    Recording,
    /// Closed, awaiting submission.
    Ended,
    /// Submitted; the fence must be waited on before recording again.
    IdleSyncCpuToGpu,
}

/// Records GPU work for one logical pass and submits it, reusing its native command
/// buffer and fence across frames.
///
/// The typical cycle is:
/// 1. populate [`CommandList::pipeline_state_mut`],
/// 2. [`CommandList::begin_pass`] resolves the pipeline and starts recording,
/// 3. bind resources and draw,
/// 4. [`CommandList::end`] and [`CommandList::submit`].
///
/// Submission does not block. The next `begin_pass` waits on the fence armed by the
/// previous submission, so the command buffer is never rewritten while the GPU reads it.
///
/// Recording-only calls made outside of a recording are logged and dropped, which lets a
/// pass whose pipeline could not be resolved degrade to nothing instead of failing the frame.
pub struct CommandList {
    name: String,
    device: Arc<dyn RhiDevice>,
    cache: Arc<PipelineCache>,
    black_texture: Arc<dyn Texture>,
    profiler: Option<Arc<dyn Profiler>>,
    settings: RhiSettings,
    state: CommandListState,
    pipeline_state: PipelineState,
    pipeline: Option<SharedPipeline>,
    // render targets of the current pass, moved to a sampling layout at the end
    attachments: Vec<Arc<dyn Texture>>,
    command_buffer: CommandBufferHandle,
    fence: FenceHandle,
    commands: CommandPool,
    markers: MarkerStack,
    frame_bindings: FrameBindings,
    wait_semaphores: Vec<SemaphoreHandle>,
    stats: CommandListStats,
}

impl std::fmt::Debug for CommandList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandList")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("command_buffer", &self.command_buffer)
            .field("fence", &self.fence)
            .field("recorded", &self.commands.len())
            .field("markers", &self.markers.path())
            .finish_non_exhaustive()
    }
}

impl CommandList {
    /// Creates a command list with its own native command buffer and fence.
    ///
    /// ## Arguments
    /// * `black_texture` - Bound in place of a missing texture.
    ///
    /// ## Errors
    /// * `RhiError` - If the device can't create the command buffer or the fence.
    pub fn new(
        name: impl Into<String>,
        device: Arc<dyn RhiDevice>,
        cache: Arc<PipelineCache>,
        black_texture: Arc<dyn Texture>,
        settings: &RhiSettings,
    ) -> Result<Self, RhiError> {
        let name = name.into();
        let command_buffer = device.create_command_buffer(&name)?;
        let fence = match device.create_fence() {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_command_buffer(command_buffer);
                return Err(e);
            }
        };
        log::debug!("Command list '{name}' created.");

        Ok(Self {
            name,
            device,
            cache,
            black_texture,
            profiler: None,
            settings: settings.clone(),
            state: CommandListState::Idle,
            pipeline_state: PipelineState::default(),
            pipeline: None,
            attachments: Vec::new(),
            command_buffer,
            fence,
            commands: CommandPool::with_capacity(settings.initial_command_capacity),
            markers: MarkerStack::default(),
            frame_bindings: FrameBindings::default(),
            wait_semaphores: Vec::new(),
            stats: CommandListStats::default(),
        })
    }

    /// Reports marker scopes to `profiler`.
    pub fn with_profiler(mut self, profiler: Arc<dyn Profiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    pub fn stats(&self) -> CommandListStats {
        self.stats
    }

    /// The commands recorded since the last pass begin.
    pub fn recorded_commands(&self) -> &[Command] {
        self.commands.commands()
    }

    /// The pipeline bound by the current (or last, until its fence is waited) pass.
    pub fn active_pipeline(&self) -> Option<&SharedPipeline> {
        self.pipeline.as_ref()
    }

    /// The open marker scopes joined with `/`.
    pub fn marker_path(&self) -> String {
        self.markers.path()
    }

    pub fn marker_depth(&self) -> usize {
        self.markers.depth()
    }

    /// The native command buffer.
    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    /// The in-progress pipeline state.
    pub fn pipeline_state(&self) -> &PipelineState {
        &self.pipeline_state
    }

    /// The in-progress pipeline state, for the caller to populate before a pass begin.
    pub fn pipeline_state_mut(&mut self) -> &mut PipelineState {
        &mut self.pipeline_state
    }

    /// Clears the in-progress pipeline state and returns it for population.
    pub fn reset_pipeline_state(&mut self) -> &mut PipelineState {
        self.pipeline_state = PipelineState::default();
        &mut self.pipeline_state
    }

    /// Registers resources applied to every pipeline this list begins.
    pub fn set_frame_bindings(&mut self, bindings: FrameBindings) {
        self.frame_bindings = bindings;
    }

    fn record(&mut self, command: Command) {
        self.device.record(self.command_buffer, &command);
        self.commands.push(command);
    }

    fn ensure_recording(&mut self, operation: &'static str) -> bool {
        if self.state == CommandListState::Recording {
            return true;
        }
        log::warn!(
            "'{}': {operation} ignored, the command list is {:?}.",
            self.name,
            self.state
        );
        self.stats.dropped_calls += 1;
        false
    }

    fn with_pipeline<R>(&self, f: impl FnOnce(&mut Pipeline) -> R) -> Option<R> {
        let pipeline = self.pipeline.clone()?;
        let mut guard = match pipeline.lock() {
            Ok(guard) => guard,
            Err(e) => {
                log::error!("'{}': Mutex poisoned (pipeline): {e}", self.name);
                return None;
            }
        };
        Some(f(&mut guard))
    }

    fn start_profiling(&self, name: &str) -> bool {
        match &self.profiler {
            Some(profiler) if self.settings.profile_passes => {
                profiler.time_block_start(name);
                true
            }
            _ => false,
        }
    }

    fn stop_profiling(&self, scope: &Scope) {
        if !scope.profiled {
            return;
        }
        if let Some(profiler) = &self.profiler {
            if !profiler.time_block_end() {
                log::warn!("'{}': no open time block for '{}'.", self.name, scope.name);
            }
        }
    }

    fn native_markers(&self) -> bool {
        self.settings.debug_markers && self.device.supports_debug_markers()
    }

    fn record_transition(&mut self, transition: LayoutTransition) {
        self.record(Command::TransitionLayout {
            texture: transition.texture,
            from: transition.from,
            to: transition.to,
        });
    }

    fn transition(&mut self, texture: &Arc<dyn Texture>, to: TextureLayout) {
        let from = texture.layout();
        if from == to {
            return;
        }
        texture.set_layout(to);
        self.record_transition(LayoutTransition {
            texture: texture.id(),
            from,
            to,
        });
    }

    /// Opens a named annotation scope.
    ///
    /// While recording, a native debug marker is recorded too; otherwise the scope only
    /// exists on the CPU (profiler and scope stack).
    ///
    /// ## Errors
    /// * `CommandListError::InvalidState` - If the recording was ended but not submitted.
    pub fn begin_marker(&mut self, name: &str) -> Result<(), CommandListError> {
        if self.state == CommandListState::Ended {
            log::error!(
                "'{}': can't open marker '{name}' on an ended recording.",
                self.name
            );
            return Err(CommandListError::InvalidState {
                operation: "begin_marker",
                state: self.state,
            });
        }

        let native = self.state == CommandListState::Recording && self.native_markers();
        if native {
            self.record(Command::BeginMarker {
                name: name.to_string(),
            });
        }
        let profiled = self.start_profiling(name);
        self.markers.push(Scope {
            name: name.to_string(),
            kind: ScopeKind::Marker,
            native,
            profiled,
        });
        Ok(())
    }

    /// Replaces the in-progress state with `state` and begins a pass with it.
    pub fn begin_with_state(
        &mut self,
        name: &str,
        state: PipelineState,
    ) -> Result<(), CommandListError> {
        self.pipeline_state = state;
        self.begin_pass(name)
    }

    /// Begins a pass with the in-progress pipeline state.
    ///
    /// Waits for the previous submission first if needed, resolves the pipeline through
    /// the cache, acquires a swap chain image when rendering to the swap chain, then
    /// begins the render pass (clearing what the state asks to clear), binds the pipeline,
    /// sets the viewport and scissor and applies the frame bindings.
    ///
    /// ## Errors
    /// * `CommandListError::CommandListInUse` - If the previous recording was not submitted.
    /// * `CommandListError::PipelineUnavailable` - If the pipeline can't be resolved.
    /// * `CommandListError::ImageAcquisition` - If no swap chain image is available.
    /// * `CommandListError::Native` - If waiting or beginning the command buffer failed.
    ///
    /// The state is unchanged on error, apart from a completed fence wait.
    pub fn begin_pass(&mut self, name: &str) -> Result<(), CommandListError> {
        if self.state == CommandListState::IdleSyncCpuToGpu {
            self.flush()?;
        }
        if self.state != CommandListState::Idle {
            log::error!(
                "'{}': can't begin pass '{name}', previous command list still in use ({:?}).",
                self.name,
                self.state
            );
            return Err(CommandListError::CommandListInUse);
        }

        let pipeline = self
            .cache
            .get_pipeline(&self.pipeline_state)
            .map_err(|e| {
                log::error!("'{}': skipping pass '{name}': {e}", self.name);
                CommandListError::PipelineUnavailable(e)
            })?;
        let native = {
            let mut guard = pipeline.lock().map_err(|e| {
                CommandListError::PipelineUnavailable(PipelineError::CacheUnavailable(format!(
                    "Mutex poisoned (pipeline): {e}"
                )))
            })?;
            guard.on_command_list_consumed();
            guard.native()
        };

        if let Some(swapchain) = self.pipeline_state.render_target_swapchain.clone() {
            swapchain.acquire_next_image().map_err(|e| {
                log::error!("'{}': {e}", self.name);
                CommandListError::ImageAcquisition(e)
            })?;
            if let Some(semaphore) = swapchain.image_acquired_semaphore() {
                self.wait_semaphores.push(semaphore);
            }
        }

        self.device
            .begin_command_buffer(self.command_buffer)
            .map_err(|e| {
                log::error!("'{}': {e}", self.name);
                CommandListError::Native(e)
            })?;
        self.commands.reset();
        self.state = CommandListState::Recording;

        let native_marker = self.native_markers();
        if native_marker {
            self.record(Command::BeginMarker {
                name: name.to_string(),
            });
        }
        let profiled = self.start_profiling(name);
        self.markers.push(Scope {
            name: name.to_string(),
            kind: ScopeKind::Pass,
            native: native_marker,
            profiled,
        });

        self.transition_attachments_for_rendering();
        let begin = self.render_pass_begin(native.render_pass);
        self.record(Command::BeginRenderPass(begin));
        self.record(Command::BindPipeline {
            pipeline: native.pipeline,
        });
        let viewport = self.pipeline_state.effective_viewport();
        self.record(Command::SetViewport(viewport));
        if !self.pipeline_state.dynamic_scissor {
            let scissor = Rect::from_extent(self.pipeline_state.extent());
            self.record(Command::SetScissorRectangle(scissor));
        }

        self.pipeline = Some(pipeline);
        self.apply_frame_bindings();
        self.stats.passes += 1;
        log::trace!("'{}': pass '{}' begun.", self.name, self.markers.path());
        Ok(())
    }

    fn transition_attachments_for_rendering(&mut self) {
        let state = &self.pipeline_state;
        let targets: Vec<(Arc<dyn Texture>, TextureLayout)> = state
            .render_target_color_textures
            .iter()
            .flatten()
            .map(|t| (Arc::clone(t), TextureLayout::ColorAttachment))
            .chain(
                state
                    .render_target_depth_texture
                    .iter()
                    .map(|t| (Arc::clone(t), TextureLayout::DepthStencilAttachment)),
            )
            .collect();

        self.attachments.clear();
        for (texture, layout) in targets {
            self.transition(&texture, layout);
            self.attachments.push(texture);
        }
    }

    fn finalize_attachments(&mut self) {
        for texture in std::mem::take(&mut self.attachments) {
            if texture.shader_view().is_none() {
                continue;
            }
            let layout = if texture.format().is_depth() {
                TextureLayout::DepthStencilReadOnly
            } else {
                TextureLayout::ShaderReadOnly
            };
            self.transition(&texture, layout);
        }
    }

    fn render_pass_begin(&self, render_pass: NativeHandle) -> RenderPassBegin {
        let state = &self.pipeline_state;
        let mut color_attachments = Vec::new();
        let mut clear_values = Vec::new();

        if let Some(swapchain) = &state.render_target_swapchain {
            color_attachments.push(swapchain.render_target_view());
            if let Some(color) = state.clear_color[0] {
                clear_values.push(ClearValue::Color(color));
            }
        } else {
            for (texture, clear) in state
                .render_target_color_textures
                .iter()
                .zip(state.clear_color.iter())
            {
                let Some(texture) = texture else {
                    continue;
                };
                match texture.render_target_view() {
                    Some(view) => color_attachments.push(view),
                    None => log::warn!(
                        "'{}': texture '{}' has no render target view.",
                        self.name,
                        texture.name()
                    ),
                }
                if let Some(color) = clear {
                    clear_values.push(ClearValue::Color(*color));
                }
            }
        }

        let depth_attachment = state
            .render_target_depth_texture
            .as_ref()
            .and_then(|depth| depth.depth_stencil_view(state.render_target_depth_array_index));
        if depth_attachment.is_some() && (state.clear_depth.is_some() || state.clear_stencil.is_some())
        {
            clear_values.push(ClearValue::DepthStencil {
                depth: state.clear_depth,
                stencil: state.clear_stencil,
            });
        }

        RenderPassBegin {
            render_pass,
            color_attachments,
            depth_attachment,
            clear_values,
            extent: state.extent(),
        }
    }

    fn apply_frame_bindings(&mut self) {
        if self.frame_bindings.is_empty() {
            return;
        }
        let bindings = self.frame_bindings.clone();
        self.with_pipeline(|pipeline| {
            for (slot, buffer) in bindings.constant_buffers() {
                pipeline.set_constant_buffer(*slot, buffer.as_ref());
            }
            for (slot, sampler) in bindings.samplers() {
                pipeline.set_sampler(*slot, sampler.as_ref());
            }
        });
    }

    /// Closes the innermost scope.
    ///
    /// Closing a marker pops it (and its native marker, if one was recorded). Closing a
    /// pass ends the render pass, reverts deferred layout transitions, finalizes the
    /// command buffer and moves to [`CommandListState::Ended`]. Scopes opened before the
    /// pass can still be closed after it, whatever the recording state.
    ///
    /// ## Errors
    /// * `CommandListError::InvalidState` - If no scope is open.
    /// * `CommandListError::Native` - If the command buffer can't be finalized.
    pub fn end(&mut self) -> Result<(), CommandListError> {
        let Some(kind) = self.markers.top().map(|s| s.kind) else {
            log::warn!("'{}': end called with no open scope.", self.name);
            return Err(CommandListError::InvalidState {
                operation: "end",
                state: self.state,
            });
        };

        match kind {
            ScopeKind::Marker => {
                if let Some(scope) = self.markers.pop() {
                    if scope.native && self.state == CommandListState::Recording {
                        self.record(Command::EndMarker);
                    }
                    self.stop_profiling(&scope);
                }
                Ok(())
            }
            ScopeKind::Pass => self.end_pass(),
        }
    }

    fn end_pass(&mut self) -> Result<(), CommandListError> {
        if self.state != CommandListState::Recording {
            return Err(CommandListError::InvalidState {
                operation: "end",
                state: self.state,
            });
        }

        self.record(Command::EndRenderPass);
        let reverted = self
            .with_pipeline(|p| p.revert_texture_layouts())
            .unwrap_or_default();
        for transition in reverted {
            self.record_transition(transition);
        }
        self.finalize_attachments();

        let native_marker = self.markers.top().is_some_and(|s| s.native);
        if native_marker {
            self.record(Command::EndMarker);
        }
        self.device
            .end_command_buffer(self.command_buffer)
            .map_err(|e| {
                log::error!("'{}': {e}", self.name);
                CommandListError::Native(e)
            })?;

        if let Some(scope) = self.markers.pop() {
            self.stop_profiling(&scope);
        }
        self.state = CommandListState::Ended;
        Ok(())
    }

    /// Enqueues the ended recording on the graphics queue and arms the fence.
    ///
    /// Waits on the swap chain's image-acquired semaphore if the pass rendered to it.
    /// Does not block; the next pass begin waits on the fence.
    ///
    /// ## Errors
    /// * `CommandListError::InvalidState` - If the recording was not ended.
    /// * `CommandListError::Native` - If the queue rejected the submission.
    pub fn submit(&mut self) -> Result<(), CommandListError> {
        if self.state != CommandListState::Ended {
            log::error!(
                "'{}': submit called while {:?}, the recording must be ended first.",
                self.name,
                self.state
            );
            return Err(CommandListError::InvalidState {
                operation: "submit",
                state: self.state,
            });
        }

        self.device
            .submit(&SubmitInfo {
                command_buffer: self.command_buffer,
                wait_semaphores: &self.wait_semaphores,
                signal_semaphores: &[],
                fence: Some(self.fence),
            })
            .map_err(|e| {
                log::error!("'{}': {e}", self.name);
                CommandListError::Native(e)
            })?;

        self.wait_semaphores.clear();
        self.state = CommandListState::IdleSyncCpuToGpu;
        self.stats.submissions += 1;
        Ok(())
    }

    /// Blocks until the last submission has executed, then resets the fence.
    ///
    /// Does nothing unless a submission is pending.
    ///
    /// ## Errors
    /// * `CommandListError::Native` - If the wait timed out or the device was lost.
    pub fn flush(&mut self) -> Result<(), CommandListError> {
        if self.state != CommandListState::IdleSyncCpuToGpu {
            return Ok(());
        }

        self.device
            .wait_fence(self.fence, self.settings.fence_timeout())
            .map_err(|e| {
                log::error!("'{}': {e}", self.name);
                CommandListError::Native(e)
            })?;
        self.device.reset_fence(self.fence)?;
        self.stats.fence_waits += 1;
        self.state = CommandListState::Idle;

        self.with_pipeline(|p| p.on_command_list_consumed());
        self.pipeline = None;
        Ok(())
    }

    fn bind_descriptor_set(&mut self) -> bool {
        let resolved = self.with_pipeline(|p| {
            let before = p.descriptor_set_count();
            let set = p.descriptor_set();
            (set, p.native().layout, p.descriptor_set_count() > before)
        });
        let Some((set, layout, created)) = resolved else {
            return false;
        };

        match set {
            Ok(Some(set)) => {
                self.record(Command::BindDescriptorSet { layout, set });
                self.stats.descriptor_set_binds += 1;
                if created {
                    self.stats.descriptor_sets_created += 1;
                }
                true
            }
            Ok(None) => true,
            Err(e) => {
                log::error!("'{}': failed to resolve a descriptor set: {e}", self.name);
                false
            }
        }
    }

    /// Draws `vertex_count` vertices starting at `vertex_offset`.
    pub fn draw(&mut self, vertex_count: u32, vertex_offset: u32) {
        if !self.ensure_recording("draw") || !self.bind_descriptor_set() {
            return;
        }
        self.record(Command::Draw {
            vertex_count,
            vertex_offset,
            instance_count: 1,
            first_instance: 0,
        });
        self.stats.draws += 1;
    }

    /// Draws `index_count` indices of the bound index buffer.
    pub fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: i32) {
        if !self.ensure_recording("draw_indexed") || !self.bind_descriptor_set() {
            return;
        }
        self.record(Command::DrawIndexed {
            index_count,
            index_offset,
            vertex_offset,
            instance_count: 1,
            first_instance: 0,
        });
        self.stats.draws += 1;
    }

    /// Binds `texture` at `slot`.
    ///
    /// `None` and textures without a shader view bind the black placeholder instead.
    pub fn set_texture(&mut self, slot: u32, texture: Option<&Arc<dyn Texture>>) {
        if !self.ensure_recording("set_texture") {
            return;
        }
        let texture = match texture {
            Some(texture) if texture.shader_view().is_some() => Arc::clone(texture),
            Some(texture) => {
                log::debug!(
                    "Texture '{}' has no shader view, binding the black texture at slot {slot}.",
                    texture.name()
                );
                Arc::clone(&self.black_texture)
            }
            None => Arc::clone(&self.black_texture),
        };
        let transitions = self
            .with_pipeline(|p| {
                p.set_texture(slot, &texture);
                p.take_layout_transitions()
            })
            .unwrap_or_default();
        for transition in transitions {
            self.record_transition(transition);
        }
    }

    pub fn set_sampler(&mut self, slot: u32, sampler: &dyn Sampler) {
        if self.ensure_recording("set_sampler") {
            self.with_pipeline(|p| p.set_sampler(slot, sampler));
        }
    }

    pub fn set_constant_buffer(&mut self, slot: u32, buffer: &dyn Buffer) {
        if self.ensure_recording("set_constant_buffer") {
            self.with_pipeline(|p| p.set_constant_buffer(slot, buffer));
        }
    }

    /// Binds a vertex buffer at offset zero.
    pub fn set_buffer_vertex(&mut self, buffer: &dyn Buffer) {
        if self.ensure_recording("set_buffer_vertex") {
            self.record(Command::SetVertexBuffer {
                buffer: buffer.resource(),
                offset: 0,
                stride: buffer.stride(),
            });
        }
    }

    /// Binds an index buffer; its stride selects 16 or 32-bit indices.
    pub fn set_buffer_index(&mut self, buffer: &dyn Buffer) {
        if self.ensure_recording("set_buffer_index") {
            self.record(Command::SetIndexBuffer {
                buffer: buffer.resource(),
                offset: 0,
                format: buffer.index_format(),
            });
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.ensure_recording("set_viewport") {
            self.record(Command::SetViewport(viewport));
        }
    }

    pub fn set_scissor_rectangle(&mut self, rectangle: Rect) {
        if self.ensure_recording("set_scissor_rectangle") {
            self.record(Command::SetScissorRectangle(rectangle));
        }
    }

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<Arc<dyn Shader>>) {
        if !self.ensure_recording("set_shader") {
            return;
        }
        let id = shader.as_ref().map_or(ResourceId::NONE, |s| s.id());
        let slot = match stage {
            ShaderStage::Vertex => &mut self.pipeline_state.shader_vertex,
            ShaderStage::Pixel => &mut self.pipeline_state.shader_pixel,
            ShaderStage::Compute => &mut self.pipeline_state.shader_compute,
        };
        *slot = shader;
        self.record(Command::SetShader { stage, shader: id });
    }

    /// Sets the vertex shader of the in-progress state, used from the next pass begin.
    pub fn set_shader_vertex(&mut self, shader: Option<Arc<dyn Shader>>) {
        self.set_shader(ShaderStage::Vertex, shader);
    }

    /// Sets the pixel shader of the in-progress state, used from the next pass begin.
    pub fn set_shader_pixel(&mut self, shader: Option<Arc<dyn Shader>>) {
        self.set_shader(ShaderStage::Pixel, shader);
    }

    /// Sets the compute shader of the in-progress state, used from the next pass begin.
    pub fn set_shader_compute(&mut self, shader: Option<Arc<dyn Shader>>) {
        self.set_shader(ShaderStage::Compute, shader);
    }

    pub fn set_input_layout(&mut self, layout: Arc<InputLayout>) {
        if self.ensure_recording("set_input_layout") {
            self.pipeline_state.input_layout = Some(Arc::clone(&layout));
            self.record(Command::SetInputLayout(layout));
        }
    }

    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        if self.ensure_recording("set_primitive_topology") {
            self.pipeline_state.primitive_topology = topology;
            self.record(Command::SetPrimitiveTopology(topology));
        }
    }

    pub fn set_rasterizer_state(&mut self, state: Arc<RasterizerState>) {
        if self.ensure_recording("set_rasterizer_state") {
            self.pipeline_state.rasterizer_state = Some(Arc::clone(&state));
            self.record(Command::SetRasterizerState(state));
        }
    }

    pub fn set_blend_state(&mut self, state: Arc<BlendState>) {
        if self.ensure_recording("set_blend_state") {
            self.pipeline_state.blend_state = Some(Arc::clone(&state));
            self.record(Command::SetBlendState(state));
        }
    }

    pub fn set_depth_stencil_state(&mut self, state: Arc<DepthStencilState>) {
        if self.ensure_recording("set_depth_stencil_state") {
            self.pipeline_state.depth_stencil_state = Some(Arc::clone(&state));
            self.record(Command::SetDepthStencilState(state));
        }
    }

    /// Sets a single color target.
    pub fn set_render_target(&mut self, texture: Arc<dyn Texture>) {
        self.set_render_targets(&[texture], None);
    }

    /// Replaces the render targets of the in-progress state, used from the next pass begin.
    pub fn set_render_targets(
        &mut self,
        colors: &[Arc<dyn Texture>],
        depth: Option<Arc<dyn Texture>>,
    ) {
        if !self.ensure_recording("set_render_targets") {
            return;
        }
        if colors.len() > MAX_RENDER_TARGETS {
            log::warn!(
                "'{}': {} render targets requested, only {MAX_RENDER_TARGETS} are bound.",
                self.name,
                colors.len()
            );
        }

        let state = &mut self.pipeline_state;
        state.render_target_color_textures = Default::default();
        for (slot, texture) in state
            .render_target_color_textures
            .iter_mut()
            .zip(colors.iter())
        {
            *slot = Some(Arc::clone(texture));
        }
        state.render_target_depth_texture = depth;

        let command = Command::SetRenderTargets {
            colors: colors
                .iter()
                .take(MAX_RENDER_TARGETS)
                .map(|t| t.id())
                .collect(),
            depth: state.render_target_depth_texture.as_ref().map(|t| t.id()),
        };
        self.record(command);
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        match self.state {
            CommandListState::IdleSyncCpuToGpu => {
                if let Err(e) = self
                    .device
                    .wait_fence(self.fence, self.settings.fence_timeout())
                {
                    log::error!("'{}': fence wait failed on drop: {e}", self.name);
                }
            }
            CommandListState::Recording => {
                log::warn!("'{}': dropped while recording.", self.name);
            }
            CommandListState::Idle | CommandListState::Ended => {}
        }
        while let Some(scope) = self.markers.pop() {
            self.stop_profiling(&scope);
        }
        self.device.destroy_fence(self.fence);
        self.device.destroy_command_buffer(self.command_buffer);
        log::debug!("Command list '{}' destroyed.", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vesta_core::renderer::{ShaderShift, TextureFormat};
    use vesta_infra::headless::{HeadlessShader, HeadlessTexture, ShaderDescriptor, TextureDescriptor};
    use vesta_infra::NullDevice;

    #[derive(Default)]
    struct RecordingProfiler {
        events: Mutex<Vec<String>>,
    }

    impl Profiler for RecordingProfiler {
        fn time_block_start(&self, name: &str) {
            self.events.lock().unwrap().push(format!("+{name}"));
        }

        fn time_block_end(&self) -> bool {
            self.events.lock().unwrap().push("-".to_string());
            true
        }
    }

    fn command_list(profiler: Arc<RecordingProfiler>) -> CommandList {
        let device: Arc<dyn RhiDevice> = Arc::new(NullDevice::new());
        let cache = Arc::new(PipelineCache::new(Arc::clone(&device), ShaderShift::default()));
        let black = HeadlessTexture::new(TextureDescriptor::sampled(
            "black",
            TextureFormat::Rgba8Unorm,
            1,
            1,
        ))
        .unwrap();
        let mut list = CommandList::new("test", device, cache, black, &RhiSettings::default())
            .unwrap()
            .with_profiler(profiler);

        let state = list.pipeline_state_mut();
        state.shader_vertex = Some(HeadlessShader::compile(
            ShaderDescriptor::new("fullscreen.vs", ShaderStage::Vertex, Vec::new()),
            ShaderShift::default(),
        ));
        state.render_target_color_textures[0] = Some(
            HeadlessTexture::new(TextureDescriptor::render_target(
                "color",
                TextureFormat::Rgba8Unorm,
                4,
                4,
            ))
            .unwrap(),
        );
        list
    }

    #[test]
    fn markers_nest_around_a_pass() {
        let profiler = Arc::new(RecordingProfiler::default());
        let mut list = command_list(Arc::clone(&profiler));

        list.begin_marker("frame").unwrap();
        list.begin_pass("tonemap").unwrap();
        assert_eq!(list.marker_path(), "frame/tonemap");
        list.draw(3, 0);
        list.end().unwrap();
        assert_eq!(list.state(), CommandListState::Ended);

        list.submit().unwrap();
        list.end().unwrap();
        assert_eq!(list.marker_depth(), 0);
        assert_eq!(
            *profiler.events.lock().unwrap(),
            vec!["+frame", "+tonemap", "-", "-"]
        );
    }

    #[test]
    fn marker_on_an_ended_recording_is_rejected() {
        let mut list = command_list(Arc::new(RecordingProfiler::default()));
        list.begin_pass("pass").unwrap();
        list.end().unwrap();
        assert_eq!(
            list.begin_marker("late"),
            Err(CommandListError::InvalidState {
                operation: "begin_marker",
                state: CommandListState::Ended
            })
        );
    }

    #[test]
    fn end_without_scope_is_invalid() {
        let mut list = command_list(Arc::new(RecordingProfiler::default()));
        assert!(matches!(
            list.end(),
            Err(CommandListError::InvalidState { operation: "end", .. })
        ));
    }

    #[test]
    fn reset_pipeline_state_clears_it() {
        let mut list = command_list(Arc::new(RecordingProfiler::default()));
        assert!(list.pipeline_state().shader_vertex.is_some());
        let state = list.reset_pipeline_state();
        assert!(state.shader_vertex.is_none());
        assert!(!state.has_render_target());
    }

    #[test]
    fn null_device_markers_stay_on_the_cpu() {
        let mut list = command_list(Arc::new(RecordingProfiler::default()));
        list.begin_pass("pass").unwrap();
        assert!(!list
            .recorded_commands()
            .iter()
            .any(|c| matches!(c, Command::BeginMarker { .. })));
    }
}
