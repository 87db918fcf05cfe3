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

use std::sync::Arc;
use std::time::Duration;
use vesta_core::math::{Extent2D, LinearRgba};
use vesta_core::renderer::{
    BackendConfig, ClearValue, Command, PipelineError, PipelineState, RhiDevice, RhiError,
    RhiSettings, Shader, ShaderError, ShaderStage, SwapChain, Texture, TextureFormat,
    TextureLayout, TextureUsage,
};
use vesta_infra::headless::{
    BufferKind, CommandBufferState, HeadlessBuffer, HeadlessSampler, HeadlessShader,
    HeadlessSwapChain, HeadlessTexture, ShaderBinding, ShaderDescriptor, TextureDescriptor,
};
use vesta_infra::HeadlessDevice;
use vesta_rhi::{CommandList, CommandListError, CommandListState, FrameBindings, PipelineCache};

struct Fixture {
    device: Arc<HeadlessDevice>,
    cache: Arc<PipelineCache>,
    black: Arc<dyn Texture>,
    settings: RhiSettings,
    vertex: Arc<dyn Shader>,
    pixel: Arc<dyn Shader>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_settings(RhiSettings::default())
    }

    fn with_settings(settings: RhiSettings) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let device = Arc::new(HeadlessDevice::new(&settings.backend));
        let dyn_device: Arc<dyn RhiDevice> = device.clone();
        let cache = Arc::new(PipelineCache::new(dyn_device, settings.shader_shift));
        let black = HeadlessTexture::new(TextureDescriptor::sampled(
            "black",
            TextureFormat::Rgba8Unorm,
            1,
            1,
        ))
        .unwrap();
        let vertex = HeadlessShader::compile(
            ShaderDescriptor::new(
                "gbuffer.vs",
                ShaderStage::Vertex,
                vec![ShaderBinding::constant_buffer("frame", 0, 256)],
            ),
            settings.shader_shift,
        );
        let pixel = HeadlessShader::compile(
            ShaderDescriptor::new(
                "gbuffer.ps",
                ShaderStage::Pixel,
                vec![
                    ShaderBinding::constant_buffer("frame", 0, 256),
                    ShaderBinding::texture("albedo", 0),
                    ShaderBinding::texture("normal", 5),
                    ShaderBinding::sampler("anisotropic", 0),
                ],
            ),
            settings.shader_shift,
        );
        Self {
            device,
            cache,
            black,
            settings,
            vertex,
            pixel,
        }
    }

    fn command_list(&self, name: &str) -> CommandList {
        CommandList::new(
            name,
            self.device.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.black),
            &self.settings,
        )
        .unwrap()
    }

    fn state(&self) -> PipelineState {
        let color: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
            "albedo_rt",
            TextureFormat::Rgba8Unorm,
            64,
            64,
        ))
        .unwrap();
        let depth: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
            "depth",
            TextureFormat::Depth32Float,
            64,
            64,
        ))
        .unwrap();
        let mut state = PipelineState {
            shader_vertex: Some(Arc::clone(&self.vertex)),
            shader_pixel: Some(Arc::clone(&self.pixel)),
            render_target_depth_texture: Some(depth),
            clear_depth: Some(0.0),
            ..Default::default()
        };
        state.render_target_color_textures[0] = Some(color);
        state.clear_color[0] = Some(LinearRgba::BLACK);
        state
    }
}

fn sampled(name: &str) -> Arc<dyn Texture> {
    HeadlessTexture::new(TextureDescriptor::sampled(
        name,
        TextureFormat::Rgba8Unorm,
        16,
        16,
    ))
    .unwrap()
}

fn bound_texture(list: &CommandList, slot: u32) -> vesta_core::renderer::ResourceId {
    let pipeline = list.active_pipeline().unwrap().lock().unwrap();
    pipeline
        .descriptors()
        .iter()
        .find(|d| d.slot == slot)
        .map(|d| d.id)
        .unwrap()
}

fn count(list: &CommandList, predicate: impl Fn(&Command) -> bool) -> usize {
    list.recorded_commands().iter().filter(|c| predicate(c)).count()
}

#[test]
fn full_lifecycle_waits_on_the_fence_before_reuse() {
    let mut settings = RhiSettings::default();
    settings.backend = BackendConfig {
        simulated_gpu_latency_us: 20_000,
        ..Default::default()
    };
    let fixture = Fixture::with_settings(settings);
    let mut list = fixture.command_list("gbuffer");
    let state_a = fixture.state();
    assert_eq!(list.state(), CommandListState::Idle);

    list.begin_with_state("gbuffer", state_a.clone()).unwrap();
    assert_eq!(list.state(), CommandListState::Recording);

    let texture = sampled("texA");
    list.set_texture(0, Some(&texture));
    assert!(list.active_pipeline().unwrap().lock().unwrap().is_dirty());

    list.draw_indexed(6, 0, 0);
    assert!(!list.active_pipeline().unwrap().lock().unwrap().is_dirty());
    assert_eq!(list.stats().descriptor_sets_created, 1);
    assert_eq!(count(&list, |c| matches!(c, Command::BindDescriptorSet { .. })), 1);

    list.end().unwrap();
    assert_eq!(list.state(), CommandListState::Ended);
    list.submit().unwrap();
    assert_eq!(list.state(), CommandListState::IdleSyncCpuToGpu);

    list.begin_with_state("gbuffer", state_a).unwrap();
    assert_eq!(list.state(), CommandListState::Recording);
    assert_eq!(list.stats().fence_waits, 1);
    assert_eq!(
        fixture.device.command_buffer_state(list.command_buffer()),
        Some(CommandBufferState::Recording)
    );

    fixture.device.queue_wait_idle().unwrap();
    assert_eq!(fixture.device.stats().submissions_executed, 1);
    assert_eq!(fixture.device.stats().draws_executed, 1);
}

#[test]
fn submit_before_end_fails_and_leaves_state() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("pass");
    list.begin_with_state("pass", fixture.state()).unwrap();

    let err = list.submit().unwrap_err();
    assert_eq!(
        err,
        CommandListError::InvalidState {
            operation: "submit",
            state: CommandListState::Recording
        }
    );
    assert!(err.is_recoverable());
    assert_eq!(list.state(), CommandListState::Recording);
}

#[test]
fn begin_while_in_use_is_rejected() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("pass");
    list.begin_with_state("first", fixture.state()).unwrap();
    assert_eq!(
        list.begin_pass("second"),
        Err(CommandListError::CommandListInUse)
    );
    assert_eq!(list.state(), CommandListState::Recording);

    list.end().unwrap();
    assert_eq!(
        list.begin_pass("third"),
        Err(CommandListError::CommandListInUse)
    );
    assert_eq!(list.state(), CommandListState::Ended);
}

#[test]
fn null_texture_binds_the_black_placeholder() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("lighting");
    list.begin_with_state("lighting", fixture.state()).unwrap();

    list.set_texture(5, None);
    assert_eq!(bound_texture(&list, 205), fixture.black.id());
}

#[test]
fn unsampleable_texture_keeps_previous_binding() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("composition");
    list.begin_with_state("composition", fixture.state()).unwrap();

    let previous = sampled("previous");
    list.set_texture(0, Some(&previous));

    let in_flight: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
        "ssao",
        TextureFormat::R8Unorm,
        16,
        16,
    ))
    .unwrap();
    in_flight.set_layout(TextureLayout::ColorAttachment);
    list.set_texture(0, Some(&in_flight));
    assert_eq!(bound_texture(&list, 200), previous.id());
}

#[test]
fn texture_without_shader_view_binds_the_black_placeholder() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("composition");
    list.begin_with_state("composition", fixture.state()).unwrap();

    let previous = sampled("previous");
    list.set_texture(0, Some(&previous));
    assert_eq!(bound_texture(&list, 200), previous.id());

    let target_only: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor {
        usage: TextureUsage::RENDER_TARGET,
        initial_layout: TextureLayout::ShaderReadOnly,
        ..TextureDescriptor::render_target("bloom", TextureFormat::Rgba16Float, 16, 16)
    })
    .unwrap();
    assert!(target_only.shader_view().is_none());
    list.set_texture(0, Some(&target_only));
    assert_eq!(bound_texture(&list, 200), fixture.black.id());
}

#[test]
fn repeated_draws_do_not_rebind() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("shadows");
    list.begin_with_state("shadows", fixture.state()).unwrap();

    let texture = sampled("atlas");
    for _ in 0..3 {
        list.set_texture(0, Some(&texture));
        list.draw(3, 0);
    }
    assert_eq!(list.stats().draws, 3);
    assert_eq!(list.stats().descriptor_set_binds, 1);

    list.set_texture(0, Some(&sampled("other")));
    list.draw(3, 0);
    assert_eq!(list.stats().descriptor_set_binds, 2);
    assert_eq!(list.stats().descriptor_sets_created, 2);
}

#[test]
fn descriptor_set_is_rebound_after_the_buffer_is_consumed() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("frame");
    let state = fixture.state();
    let texture = sampled("albedo");

    for _ in 0..2 {
        list.begin_with_state("frame", state.clone()).unwrap();
        list.set_texture(0, Some(&texture));
        list.draw(3, 0);
        assert_eq!(count(&list, |c| matches!(c, Command::BindDescriptorSet { .. })), 1);
        list.end().unwrap();
        list.submit().unwrap();
    }
    assert_eq!(list.stats().descriptor_sets_created, 1);
    assert_eq!(list.stats().descriptor_set_binds, 2);
}

#[test]
fn identical_states_resolve_to_one_pipeline() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("post");
    let state = fixture.state();

    list.begin_with_state("a", state.clone()).unwrap();
    let first = Arc::clone(list.active_pipeline().unwrap());
    list.end().unwrap();
    list.submit().unwrap();

    let mut recolored = state;
    recolored.clear_color[0] = Some(LinearRgba::RED);
    list.begin_with_state("b", recolored).unwrap();
    assert!(Arc::ptr_eq(&first, list.active_pipeline().unwrap()));
    assert_eq!(fixture.cache.len(), 1);
    assert_eq!(fixture.device.stats().pipelines_created, 1);
}

#[test]
fn recording_calls_outside_a_pass_are_dropped() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("idle");
    let buffer = HeadlessBuffer::new("vb", BufferKind::Vertex, 32, 3);

    list.set_buffer_vertex(&*buffer);
    list.set_texture(0, None);
    list.draw(3, 0);
    assert_eq!(list.stats().dropped_calls, 3);
    assert_eq!(list.stats().draws, 0);
    assert!(list.recorded_commands().is_empty());
}

#[test]
fn invalid_state_skips_the_pass() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("ssr");
    let mut state = fixture.state();
    state.shader_vertex = None;

    let err = list.begin_with_state("ssr", state).unwrap_err();
    assert_eq!(
        err,
        CommandListError::PipelineUnavailable(PipelineError::MissingVertexShader)
    );
    assert!(err.is_recoverable());
    assert_eq!(list.state(), CommandListState::Idle);
    assert_eq!(list.marker_depth(), 0);

    list.draw(3, 0);
    assert_eq!(list.stats().draws, 0);
}

#[test]
fn failed_shader_skips_the_pass() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("bloom");
    let mut desc = ShaderDescriptor::new("bloom.ps", ShaderStage::Pixel, Vec::new());
    desc.compile_error = Some("undeclared identifier".to_string());
    let mut state = fixture.state();
    state.shader_pixel = Some(HeadlessShader::compile(desc, fixture.settings.shader_shift));

    assert!(matches!(
        list.begin_with_state("bloom", state),
        Err(CommandListError::PipelineUnavailable(PipelineError::Shader(
            ShaderError::CompilationFailed { .. }
        )))
    ));
    assert!(fixture.cache.is_empty());
}

#[test]
fn begin_waits_for_asynchronous_compilation() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("taa");
    let mut desc = ShaderDescriptor::new("taa.ps", ShaderStage::Pixel, Vec::new());
    desc.compile_time = Duration::from_millis(30);
    let pixel = HeadlessShader::compile(desc, fixture.settings.shader_shift);
    let mut state = fixture.state();
    state.shader_pixel = Some(pixel.clone());

    list.begin_with_state("taa", state).unwrap();
    assert!(pixel.is_compiled());
}

#[test]
fn render_pass_clears_and_transitions_attachments() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("depth_prepass");
    let state = fixture.state();
    let color = state.render_target_color_textures[0].clone().unwrap();
    let depth = state.render_target_depth_texture.clone().unwrap();

    list.begin_with_state("depth_prepass", state).unwrap();
    assert_eq!(color.layout(), TextureLayout::ColorAttachment);
    assert_eq!(depth.layout(), TextureLayout::DepthStencilAttachment);

    let begin = list
        .recorded_commands()
        .iter()
        .find_map(|c| match c {
            Command::BeginRenderPass(begin) => Some(begin.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(begin.color_attachments.len(), 1);
    assert!(begin.depth_attachment.is_some());
    assert_eq!(
        begin.clear_values,
        vec![
            ClearValue::Color(LinearRgba::BLACK),
            ClearValue::DepthStencil {
                depth: Some(0.0),
                stencil: None
            }
        ]
    );
    assert_eq!(begin.extent, Extent2D::new(64, 64));

    list.end().unwrap();
    assert_eq!(color.layout(), TextureLayout::ShaderReadOnly);
    assert_eq!(depth.layout(), TextureLayout::DepthStencilReadOnly);
    assert!(color.is_sampled());
}

#[test]
fn general_textures_are_reverted_at_end() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("ssao");
    list.begin_with_state("ssao", fixture.state()).unwrap();

    let mut desc = TextureDescriptor::sampled("ssao_noise", TextureFormat::R8Unorm, 4, 4);
    desc.initial_layout = TextureLayout::General;
    let storage: Arc<dyn Texture> = HeadlessTexture::new(desc).unwrap();
    list.set_texture(0, Some(&storage));
    assert_eq!(storage.layout(), TextureLayout::ShaderReadOnly);

    list.end().unwrap();
    assert_eq!(storage.layout(), TextureLayout::General);
    let transitions = count(&list, |c| {
        matches!(c, Command::TransitionLayout { texture, .. } if *texture == storage.id())
    });
    assert_eq!(transitions, 2);
}

#[test]
fn frame_bindings_apply_to_every_pass() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("frame");
    let frame = HeadlessBuffer::new("frame", BufferKind::Constant, 256, 1);
    let sampler = HeadlessSampler::new("anisotropic");
    list.set_frame_bindings(
        FrameBindings::new()
            .with_constant_buffer(0, frame.clone())
            .with_sampler(0, sampler.clone()),
    );

    list.begin_with_state("gbuffer", fixture.state()).unwrap();
    let pipeline = list.active_pipeline().unwrap().lock().unwrap();
    let ids: Vec<_> = pipeline
        .descriptors()
        .iter()
        .filter(|d| d.slot == 100 || d.slot == 300)
        .map(|d| d.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| !id.is_none()));
}

#[test]
fn swapchain_pass_acquires_and_waits_on_the_image() {
    let fixture = Fixture::new();
    let swapchain = HeadlessSwapChain::new(
        fixture.device.clone(),
        TextureFormat::Bgra8UnormSrgb,
        Extent2D::new(128, 72),
        2,
    )
    .unwrap();
    let mut list = fixture.command_list("present");

    for frame in 0..3u32 {
        let state = list.reset_pipeline_state();
        state.shader_vertex = Some(Arc::clone(&fixture.vertex));
        state.render_target_swapchain = Some(swapchain.clone());
        state.clear_color[0] = Some(LinearRgba::BLUE);

        list.begin_pass("composition").unwrap();
        assert_eq!(swapchain.image_index(), frame % 2);
        let begin = list
            .recorded_commands()
            .iter()
            .find_map(|c| match c {
                Command::BeginRenderPass(begin) => Some(begin.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(begin.color_attachments, vec![swapchain.render_target_view()]);
        assert_eq!(begin.extent, Extent2D::new(128, 72));

        list.draw(3, 0);
        list.end().unwrap();
        list.submit().unwrap();
    }
    list.flush().unwrap();
    assert_eq!(list.state(), CommandListState::Idle);
    fixture.device.queue_wait_idle().unwrap();
    assert_eq!(fixture.device.stats().submissions_executed, 3);
}

#[test]
fn fence_timeout_is_a_native_failure() {
    let mut settings = RhiSettings::default();
    settings.fence_timeout_ms = Some(1);
    settings.backend.simulated_gpu_latency_us = 200_000;
    let fixture = Fixture::with_settings(settings);
    let mut list = fixture.command_list("slow");

    list.begin_with_state("slow", fixture.state()).unwrap();
    list.end().unwrap();
    list.submit().unwrap();

    let err = list.begin_pass("slow").unwrap_err();
    assert_eq!(err, CommandListError::Native(RhiError::FenceTimeout { timeout_ms: 1 }));
    assert!(!err.is_recoverable());
    assert_eq!(list.state(), CommandListState::IdleSyncCpuToGpu);
}

#[test]
fn drop_releases_native_objects() {
    let fixture = Fixture::new();
    {
        let mut list = fixture.command_list("transient");
        list.begin_with_state("transient", fixture.state()).unwrap();
        list.end().unwrap();
        list.submit().unwrap();
        assert_eq!(fixture.device.live_objects(), (1, 1));
    }
    assert_eq!(fixture.device.live_objects(), (0, 0));
}

#[test]
fn setters_update_the_next_pass_state() {
    let fixture = Fixture::new();
    let mut list = fixture.command_list("debug");
    list.begin_with_state("gizmos", fixture.state()).unwrap();

    let target = sampled("unused");
    list.set_shader_pixel(None);
    list.set_render_target(target.clone());
    assert!(list.pipeline_state().shader_pixel.is_none());
    assert_eq!(list.pipeline_state().color_target_count(), 1);
    assert!(list.pipeline_state().render_target_depth_texture.is_none());
    assert_eq!(count(&list, |c| matches!(c, Command::SetShader { .. })), 1);
    assert_eq!(count(&list, |c| matches!(c, Command::SetRenderTargets { .. })), 1);
}
