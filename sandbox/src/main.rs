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

// Vesta Sandbox
// Renders a deferred frame on the headless backend for a few frames and reports statistics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use vesta_core::math::{Extent2D, LinearRgba};
use vesta_core::renderer::{
    BackendType, BlendState, DepthStencilState, InputLayout, PrimitiveTopology, RasterizerState,
    RhiDevice, RhiSettings, Shader, ShaderShift, ShaderStage, Texture, TextureFormat,
    TextureLayout, VertexFormat,
};
use vesta_infra::headless::{
    BufferKind, HeadlessBuffer, HeadlessSampler, HeadlessShader, HeadlessSwapChain,
    HeadlessTexture, ShaderBinding, ShaderDescriptor, TextureDescriptor,
};
use vesta_infra::HeadlessDevice;
use vesta_rhi::{CommandList, FrameBindings, PipelineCache};
use vesta_telemetry::{init_logging, FrameProfiler, LogConfig};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameData {
    resolution: [f32; 2],
    time: f32,
    frame: u32,
}

const QUAD: &[Vertex] = &[
    Vertex {
        position: [-1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        position: [1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [-1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [0.0, 0.0],
    },
];

const QUAD_INDICES: &[u16] = &[0, 1, 2, 2, 3, 0];

const DEFAULT_FRAMES: u32 = 6;

struct Shaders {
    depth_vs: Arc<dyn Shader>,
    gbuffer_vs: Arc<dyn Shader>,
    gbuffer_ps: Arc<dyn Shader>,
    fullscreen_vs: Arc<dyn Shader>,
    ssao_ps: Arc<dyn Shader>,
    light_ps: Arc<dyn Shader>,
    compose_ps: Arc<dyn Shader>,
    lines_vs: Arc<dyn Shader>,
    lines_ps: Arc<dyn Shader>,
}

impl Shaders {
    fn compile(shift: ShaderShift) -> Self {
        let mesh_layout = InputLayout::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
        ]);
        let vertex = |name: &str, bindings: Vec<ShaderBinding>| -> Arc<dyn Shader> {
            let mut desc = ShaderDescriptor::new(name, ShaderStage::Vertex, bindings);
            desc.input_layout = Some(mesh_layout.clone());
            desc.compile_time = Duration::from_millis(4);
            let shader: Arc<dyn Shader> = HeadlessShader::compile(desc, shift);
            shader
        };
        let pixel = |name: &str, bindings: Vec<ShaderBinding>| -> Arc<dyn Shader> {
            let mut desc = ShaderDescriptor::new(name, ShaderStage::Pixel, bindings);
            desc.compile_time = Duration::from_millis(4);
            let shader: Arc<dyn Shader> = HeadlessShader::compile(desc, shift);
            shader
        };
        let frame_size = std::mem::size_of::<FrameData>() as u64;
        let frame = || ShaderBinding::constant_buffer("frame", 0, frame_size);
        let textures = |names: &[&str]| -> Vec<ShaderBinding> {
            let mut bindings: Vec<ShaderBinding> = names
                .iter()
                .enumerate()
                .map(|(register, name)| ShaderBinding::texture(*name, register as u32))
                .collect();
            bindings.push(ShaderBinding::sampler("linear", 0));
            bindings.push(frame());
            bindings
        };

        Self {
            depth_vs: vertex("depth_prepass.vs", vec![frame()]),
            gbuffer_vs: vertex("gbuffer.vs", vec![frame()]),
            gbuffer_ps: pixel("gbuffer.ps", textures(&["albedo", "normal"])),
            fullscreen_vs: vertex("fullscreen.vs", Vec::new()),
            ssao_ps: pixel("ssao.ps", textures(&["depth", "normal", "noise"])),
            light_ps: pixel("light.ps", textures(&["albedo", "normal", "ssao", "depth"])),
            compose_ps: pixel("compose.ps", textures(&["light"])),
            lines_vs: vertex("lines.vs", vec![frame()]),
            lines_ps: pixel("lines.ps", Vec::new()),
        }
    }
}

struct Targets {
    depth: Arc<dyn Texture>,
    albedo: Arc<dyn Texture>,
    normal: Arc<dyn Texture>,
    ssao: Arc<dyn Texture>,
    light: Arc<dyn Texture>,
}

impl Targets {
    fn new(extent: Extent2D) -> Result<Self> {
        let target = |name: &str, format: TextureFormat| -> Result<Arc<dyn Texture>> {
            let texture: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::render_target(
                name,
                format,
                extent.width,
                extent.height,
            ))?;
            Ok(texture)
        };
        Ok(Self {
            depth: target("depth", TextureFormat::Depth32Float)?,
            albedo: target("gbuffer_albedo", TextureFormat::Rgba8Unorm)?,
            normal: target("gbuffer_normal", TextureFormat::Rgba16Float)?,
            ssao: target("ssao", TextureFormat::R8Unorm)?,
            light: target("light", TextureFormat::Rgba16Float)?,
        })
    }
}

struct Scene {
    vertices: Arc<HeadlessBuffer>,
    indices: Arc<HeadlessBuffer>,
    frame: Arc<HeadlessBuffer>,
    materials: Vec<Arc<dyn Texture>>,
    noise: Arc<dyn Texture>,
}

impl Scene {
    fn new() -> Result<Self> {
        let materials = ["bricks", "marble", "wood"]
            .iter()
            .map(|name| -> Result<Arc<dyn Texture>> {
                let texture: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::sampled(
                    *name,
                    TextureFormat::Rgba8Unorm,
                    512,
                    512,
                ))?;
                Ok(texture)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut noise = TextureDescriptor::sampled("ssao_noise", TextureFormat::Rg16Float, 4, 4);
        noise.initial_layout = TextureLayout::General;

        Ok(Self {
            vertices: HeadlessBuffer::with_data("quad_vertices", BufferKind::Vertex, QUAD),
            indices: HeadlessBuffer::with_data("quad_indices", BufferKind::Index, QUAD_INDICES),
            frame: HeadlessBuffer::constant::<FrameData>("frame"),
            materials,
            noise: HeadlessTexture::new(noise)?,
        })
    }
}

/// Begins `name`, lets `record` fill it in, then ends and submits it.
///
/// A pass whose pipeline isn't available is skipped with a warning.
fn run_pass(
    list: &mut CommandList,
    name: &str,
    record: impl FnOnce(&mut CommandList),
) -> Result<()> {
    match list.begin_pass(name) {
        Ok(()) => {}
        Err(e) if e.is_recoverable() => {
            log::warn!("Skipping pass '{name}': {e}");
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to begin pass '{name}'")),
    }
    record(list);
    list.end()?;
    list.submit()?;
    Ok(())
}

struct Renderer {
    device: Arc<HeadlessDevice>,
    cache: Arc<PipelineCache>,
    list: CommandList,
    shaders: Shaders,
    targets: Targets,
    scene: Scene,
    swapchain: Arc<HeadlessSwapChain>,
    extent: Extent2D,
}

impl Renderer {
    fn new(
        device: Arc<HeadlessDevice>,
        settings: &RhiSettings,
        profiler: Arc<FrameProfiler>,
        extent: Extent2D,
    ) -> Result<Self> {
        let dyn_device: Arc<dyn RhiDevice> = device.clone();
        let cache = Arc::new(PipelineCache::new(dyn_device.clone(), settings.shader_shift));
        let black: Arc<dyn Texture> = HeadlessTexture::new(TextureDescriptor::sampled(
            "black",
            TextureFormat::Rgba8Unorm,
            1,
            1,
        ))?;
        let scene = Scene::new()?;

        let mut list = CommandList::new("main", dyn_device, Arc::clone(&cache), black, settings)?
            .with_profiler(profiler);
        list.set_frame_bindings(
            FrameBindings::new()
                .with_constant_buffer(0, scene.frame.clone())
                .with_sampler(0, HeadlessSampler::new("linear")),
        );

        Ok(Self {
            swapchain: HeadlessSwapChain::new(
                device.clone(),
                TextureFormat::Bgra8UnormSrgb,
                extent,
                2,
            )?,
            device,
            cache,
            list,
            shaders: Shaders::compile(settings.shader_shift),
            targets: Targets::new(extent)?,
            scene,
            extent,
        })
    }

    /// Rebuilds every size-dependent object. Cached pipelines reference the old
    /// attachments, so the cache is dropped as well.
    fn resize(&mut self, extent: Extent2D) -> Result<()> {
        log::info!(
            "Resizing {}x{} -> {}x{}",
            self.extent.width,
            self.extent.height,
            extent.width,
            extent.height
        );
        self.list.flush()?;
        self.cache.clear()?;
        self.targets = Targets::new(extent)?;
        self.swapchain = HeadlessSwapChain::new(
            self.device.clone(),
            TextureFormat::Bgra8UnormSrgb,
            extent,
            2,
        )?;
        self.extent = extent;
        Ok(())
    }

    fn render_frame(&mut self, index: u32) -> Result<()> {
        self.scene.frame.update(&FrameData {
            resolution: [self.extent.width as f32, self.extent.height as f32],
            time: index as f32 / 60.0,
            frame: index,
        })?;

        self.list.begin_marker("frame")?;
        self.depth_prepass()?;
        self.gbuffer()?;
        self.ssao()?;
        self.lighting()?;
        self.debug()?;
        self.composition()?;
        self.list.end()?;
        Ok(())
    }

    fn draw_scene(list: &mut CommandList, scene: &Scene, textured: bool) {
        list.set_buffer_vertex(&*scene.vertices);
        list.set_buffer_index(&*scene.indices);
        for material in &scene.materials {
            if textured {
                list.set_texture(0, Some(material));
                list.set_texture(1, None);
            }
            list.draw_indexed(QUAD_INDICES.len() as u32, 0, 0);
        }
    }

    fn depth_prepass(&mut self) -> Result<()> {
        let state = self.list.reset_pipeline_state();
        state.shader_vertex = Some(self.shaders.depth_vs.clone());
        state.rasterizer_state = Some(Arc::new(RasterizerState::CULL_BACK_SOLID));
        state.depth_stencil_state = Some(Arc::new(DepthStencilState::READ_WRITE));
        state.render_target_depth_texture = Some(self.targets.depth.clone());
        state.clear_depth = Some(0.0);

        let scene = &self.scene;
        run_pass(&mut self.list, "depth_prepass", |list| {
            Self::draw_scene(list, scene, false)
        })
    }

    fn gbuffer(&mut self) -> Result<()> {
        let state = self.list.reset_pipeline_state();
        state.shader_vertex = Some(self.shaders.gbuffer_vs.clone());
        state.shader_pixel = Some(self.shaders.gbuffer_ps.clone());
        state.rasterizer_state = Some(Arc::new(RasterizerState::CULL_BACK_SOLID));
        state.depth_stencil_state = Some(Arc::new(DepthStencilState::READ));
        state.render_target_color_textures[0] = Some(self.targets.albedo.clone());
        state.render_target_color_textures[1] = Some(self.targets.normal.clone());
        state.clear_color[0] = Some(LinearRgba::BLACK);
        state.clear_color[1] = Some(LinearRgba::BLACK);
        state.render_target_depth_texture = Some(self.targets.depth.clone());

        let scene = &self.scene;
        run_pass(&mut self.list, "gbuffer", |list| {
            Self::draw_scene(list, scene, true)
        })
    }

    fn ssao(&mut self) -> Result<()> {
        let state = self.list.reset_pipeline_state();
        state.shader_vertex = Some(self.shaders.fullscreen_vs.clone());
        state.shader_pixel = Some(self.shaders.ssao_ps.clone());
        state.render_target_color_textures[0] = Some(self.targets.ssao.clone());
        state.clear_color[0] = Some(LinearRgba::WHITE);

        let (targets, noise) = (&self.targets, &self.scene.noise);
        run_pass(&mut self.list, "ssao", |list| {
            list.set_texture(0, Some(&targets.depth));
            list.set_texture(1, Some(&targets.normal));
            list.set_texture(2, Some(noise));
            list.draw(3, 0);
        })
    }

    fn lighting(&mut self) -> Result<()> {
        let state = self.list.reset_pipeline_state();
        state.shader_vertex = Some(self.shaders.fullscreen_vs.clone());
        state.shader_pixel = Some(self.shaders.light_ps.clone());
        state.blend_state = Some(Arc::new(BlendState::ADDITIVE));
        state.render_target_color_textures[0] = Some(self.targets.light.clone());
        state.clear_color[0] = Some(LinearRgba::BLACK);

        let targets = &self.targets;
        run_pass(&mut self.list, "light", |list| {
            list.set_texture(0, Some(&targets.albedo));
            list.set_texture(1, Some(&targets.normal));
            list.set_texture(2, Some(&targets.ssao));
            list.set_texture(3, Some(&targets.depth));
            list.draw(3, 0);
        })
    }

    fn debug(&mut self) -> Result<()> {
        self.list.begin_marker("debug")?;

        let lines = |list: &mut CommandList, light: &Arc<dyn Texture>, shaders: &Shaders| {
            let state = list.reset_pipeline_state();
            state.shader_vertex = Some(shaders.lines_vs.clone());
            state.shader_pixel = Some(shaders.lines_ps.clone());
            state.primitive_topology = PrimitiveTopology::LineList;
            state.blend_state = Some(Arc::new(BlendState::ALPHA));
            state.render_target_color_textures[0] = Some(light.clone());
        };

        lines(&mut self.list, &self.targets.light, &self.shaders);
        run_pass(&mut self.list, "lines", |list| list.draw(24, 0))?;

        self.list.begin_marker("gizmos")?;
        lines(&mut self.list, &self.targets.light, &self.shaders);
        self.list.pipeline_state_mut().rasterizer_state =
            Some(Arc::new(RasterizerState::CULL_NONE_WIREFRAME));
        run_pass(&mut self.list, "transform_handles", |list| list.draw(6, 0))?;
        self.list.end()?;

        self.list.end()?;
        Ok(())
    }

    fn composition(&mut self) -> Result<()> {
        let state = self.list.reset_pipeline_state();
        state.shader_vertex = Some(self.shaders.fullscreen_vs.clone());
        state.shader_pixel = Some(self.shaders.compose_ps.clone());
        state.render_target_swapchain = Some(self.swapchain.clone());
        state.clear_color[0] = Some(LinearRgba::BLACK);

        let light = &self.targets.light;
        run_pass(&mut self.list, "composition", |list| {
            list.set_texture(0, Some(light));
            list.draw(3, 0);
        })
    }
}

fn main() -> Result<()> {
    init_logging(&LogConfig::default().with_module_level("vesta_infra", "info"));

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => RhiSettings::from_ron_file(&path)
            .with_context(|| format!("Failed to load settings from '{path}'"))?,
        None => RhiSettings::default(),
    };
    let frames = match args.next() {
        Some(count) => count
            .parse::<u32>()
            .with_context(|| format!("Invalid frame count '{count}'"))?,
        None => DEFAULT_FRAMES,
    };
    if settings.backend.backend != BackendType::Headless {
        log::warn!(
            "The sandbox presents to a headless swap chain, ignoring backend {:?}.",
            settings.backend.backend
        );
    }

    let device = Arc::new(HeadlessDevice::new(&settings.backend));
    let profiler = Arc::new(FrameProfiler::new());
    let mut renderer = Renderer::new(
        device.clone(),
        &settings,
        profiler.clone(),
        Extent2D::new(1280, 720),
    )?;

    for index in 0..frames {
        if index == frames / 2 {
            renderer.resize(Extent2D::new(1920, 1080))?;
        }
        renderer.render_frame(index)?;
        let blocks = profiler.end_frame();
        log::debug!("Frame {index}: {} time blocks", blocks.len());
    }
    renderer.list.flush()?;
    device.queue_wait_idle()?;

    let stats = renderer.list.stats();
    log::info!(
        "{} passes, {} draws, {} descriptor set binds ({} created), {} submissions, {} fence waits",
        stats.passes,
        stats.draws,
        stats.descriptor_set_binds,
        stats.descriptor_sets_created,
        stats.submissions,
        stats.fence_waits
    );
    let device_stats = device.stats();
    log::info!(
        "Device: {} pipelines created, {} destroyed, {} submissions executed, {} draws executed",
        device_stats.pipelines_created,
        device_stats.pipelines_destroyed,
        device_stats.submissions_executed,
        device_stats.draws_executed
    );
    for (path, block) in profiler.report() {
        log::info!(
            "{path:<40} x{:<4} avg {:?} max {:?}",
            block.count,
            block.average(),
            block.max
        );
    }
    Ok(())
}
