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

//! In-memory resource objects usable with any backend in this crate.

use super::device::{allocate_handle, HeadlessDevice};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use vesta_core::math::Extent2D;
use vesta_core::renderer::{
    Buffer, CompilationSignal, CompilationState, Descriptor, DescriptorKind, InputLayout,
    NativeHandle, ResourceError, ResourceId, ResourceView, RhiError, Sampler, SemaphoreHandle,
    Shader, ShaderShift, ShaderStage, ShaderStageFlags, SwapChain, Texture, TextureFormat,
    TextureLayout, TextureUsage,
};

/// Creation parameters of a [`HeadlessTexture`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Debug name.
    pub name: String,
    /// Pixel format.
    pub format: TextureFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of array slices.
    pub array_size: u32,
    /// What the texture can be used for.
    pub usage: TextureUsage,
    /// Layout the texture starts in.
    pub initial_layout: TextureLayout,
}

impl TextureDescriptor {
    /// A sampled-only texture whose contents were already uploaded.
    pub fn sampled(name: impl Into<String>, format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            format,
            width,
            height,
            array_size: 1,
            usage: TextureUsage::SAMPLED,
            initial_layout: TextureLayout::ShaderReadOnly,
        }
    }

    /// A render target (color or depth, depending on the format) that can also be sampled.
    pub fn render_target(
        name: impl Into<String>,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let target = if format.is_depth() {
            TextureUsage::DEPTH_STENCIL
        } else {
            TextureUsage::RENDER_TARGET
        };
        Self {
            name: name.into(),
            format,
            width,
            height,
            array_size: 1,
            usage: TextureUsage::SAMPLED | target,
            initial_layout: TextureLayout::Undefined,
        }
    }
}

/// A texture with no backing memory. It tracks identity, views and layout.
#[derive(Debug)]
pub struct HeadlessTexture {
    id: ResourceId,
    name: String,
    format: TextureFormat,
    width: u32,
    height: u32,
    array_size: u32,
    usage: TextureUsage,
    layout: Mutex<TextureLayout>,
    srv: NativeHandle,
    rtv: NativeHandle,
    dsv: Vec<NativeHandle>,
}

impl HeadlessTexture {
    /// Creates a texture.
    ///
    /// ## Errors
    /// * `ResourceError::InvalidDimensions` - If any dimension is zero.
    pub fn new(descriptor: TextureDescriptor) -> Result<Arc<Self>, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.array_size == 0 {
            return Err(ResourceError::InvalidDimensions {
                width: descriptor.width,
                height: descriptor.height,
            });
        }
        let usage = descriptor.usage;
        let handle_if = |flag: TextureUsage| {
            if usage.contains(flag) {
                allocate_handle()
            } else {
                NativeHandle::NULL
            }
        };
        let srv = handle_if(TextureUsage::SAMPLED);
        let rtv = handle_if(TextureUsage::RENDER_TARGET);
        let dsv = if usage.contains(TextureUsage::DEPTH_STENCIL) {
            (0..descriptor.array_size).map(|_| allocate_handle()).collect()
        } else {
            Vec::new()
        };
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            name: descriptor.name,
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
            array_size: descriptor.array_size,
            usage,
            layout: Mutex::new(descriptor.initial_layout),
            srv,
            rtv,
            dsv,
        }))
    }

    /// The texture's usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Number of array slices.
    pub fn array_size(&self) -> u32 {
        self.array_size
    }
}

impl Texture for HeadlessTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layout(&self) -> TextureLayout {
        match self.layout.lock() {
            Ok(layout) => *layout,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_layout(&self, layout: TextureLayout) {
        match self.layout.lock() {
            Ok(mut current) => *current = layout,
            Err(poisoned) => *poisoned.into_inner() = layout,
        }
    }

    fn is_sampled(&self) -> bool {
        self.usage.contains(TextureUsage::SAMPLED) && self.layout().is_sampleable()
    }

    fn shader_view(&self) -> Option<ResourceView> {
        (!self.srv.is_null()).then_some(ResourceView::ShaderResource(self.srv))
    }

    fn render_target_view(&self) -> Option<ResourceView> {
        (!self.rtv.is_null()).then_some(ResourceView::RenderTarget(self.rtv))
    }

    fn depth_stencil_view(&self, array_index: u32) -> Option<ResourceView> {
        self.dsv
            .get(array_index as usize)
            .map(|handle| ResourceView::DepthStencil {
                handle: *handle,
                array_index,
            })
    }
}

/// What a [`HeadlessBuffer`] is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex data.
    Vertex,
    /// Index data.
    Index,
    /// Shader constants.
    Constant,
}

/// A buffer backed by CPU memory.
#[derive(Debug)]
pub struct HeadlessBuffer {
    id: ResourceId,
    name: String,
    kind: BufferKind,
    handle: NativeHandle,
    stride: u32,
    count: u32,
    data: Mutex<Vec<u8>>,
}

impl HeadlessBuffer {
    /// Creates a zero-filled buffer of `count` elements of `stride` bytes.
    pub fn new(name: impl Into<String>, kind: BufferKind, stride: u32, count: u32) -> Arc<Self> {
        Arc::new(Self {
            id: ResourceId::next(),
            name: name.into(),
            kind,
            handle: allocate_handle(),
            stride,
            count,
            data: Mutex::new(vec![0; stride as usize * count as usize]),
        })
    }

    /// Creates a constant buffer sized for one `T`.
    pub fn constant<T: bytemuck::Pod>(name: impl Into<String>) -> Arc<Self> {
        Self::new(name, BufferKind::Constant, std::mem::size_of::<T>() as u32, 1)
    }

    /// Creates a buffer holding `elements`.
    pub fn with_data<T: bytemuck::Pod>(
        name: impl Into<String>,
        kind: BufferKind,
        elements: &[T],
    ) -> Arc<Self> {
        let buffer = Self::new(
            name,
            kind,
            std::mem::size_of::<T>() as u32,
            elements.len() as u32,
        );
        if let Ok(mut data) = buffer.data.lock() {
            data.copy_from_slice(bytemuck::cast_slice(elements));
        }
        buffer
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the buffer is bound as.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Copies `bytes` into the buffer at `offset`.
    ///
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write does not fit.
    pub fn write(&self, offset: u64, bytes: &[u8]) -> Result<(), ResourceError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({}): {e}", self.name)))?;
        let size = data.len() as u64;
        let end = offset + bytes.len() as u64;
        if end > size {
            return Err(ResourceError::OutOfBounds { end, size });
        }
        data[offset as usize..end as usize].copy_from_slice(bytes);
        Ok(())
    }

    /// Uploads a single plain-old-data value at the start of the buffer.
    pub fn update<T: bytemuck::Pod>(&self, value: &T) -> Result<(), ResourceError> {
        self.write(0, bytemuck::bytes_of(value))
    }

    /// Returns a copy of the buffer contents.
    pub fn contents(&self) -> Vec<u8> {
        match self.data.lock() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Buffer for HeadlessBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn resource(&self) -> ResourceView {
        ResourceView::Buffer(self.handle)
    }

    fn size(&self) -> u64 {
        self.stride as u64 * self.count as u64
    }

    fn stride(&self) -> u32 {
        self.stride
    }

    fn count(&self) -> u32 {
        self.count
    }
}

/// A sampler object.
#[derive(Debug)]
pub struct HeadlessSampler {
    id: ResourceId,
    name: String,
    handle: NativeHandle,
}

impl HeadlessSampler {
    /// Creates a sampler.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ResourceId::next(),
            name: name.into(),
            handle: allocate_handle(),
        })
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Sampler for HeadlessSampler {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn resource(&self) -> ResourceView {
        ResourceView::Sampler(self.handle)
    }
}

/// One binding a shader declares, in its unshifted register space.
#[derive(Debug, Clone)]
pub struct ShaderBinding {
    /// Reflection name.
    pub name: String,
    /// Kind of resource.
    pub kind: DescriptorKind,
    /// Register index before shifting.
    pub register: u32,
    /// Size in bytes, for constant buffers.
    pub size: u64,
}

impl ShaderBinding {
    /// A constant buffer binding.
    pub fn constant_buffer(name: impl Into<String>, register: u32, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::ConstantBuffer,
            register,
            size,
        }
    }

    /// A texture binding.
    pub fn texture(name: impl Into<String>, register: u32) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Texture,
            register,
            size: 0,
        }
    }

    /// A sampler binding.
    pub fn sampler(name: impl Into<String>, register: u32) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Sampler,
            register,
            size: 0,
        }
    }
}

/// Creation parameters of a [`HeadlessShader`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    /// Debug name.
    pub name: String,
    /// Pipeline stage.
    pub stage: ShaderStage,
    /// Declared bindings.
    pub bindings: Vec<ShaderBinding>,
    /// Vertex input layout, for vertex shaders.
    pub input_layout: Option<InputLayout>,
    /// How long the background compile takes.
    pub compile_time: Duration,
    /// If set, compilation fails with this message.
    pub compile_error: Option<String>,
}

impl ShaderDescriptor {
    /// A shader that compiles instantly.
    pub fn new(name: impl Into<String>, stage: ShaderStage, bindings: Vec<ShaderBinding>) -> Self {
        Self {
            name: name.into(),
            stage,
            bindings,
            input_layout: None,
            compile_time: Duration::ZERO,
            compile_error: None,
        }
    }
}

/// A shader compiled asynchronously on a background thread.
#[derive(Debug)]
pub struct HeadlessShader {
    id: ResourceId,
    name: String,
    stage: ShaderStage,
    descriptors: Vec<Descriptor>,
    input_layout: Option<Arc<InputLayout>>,
    signal: Arc<CompilationSignal>,
}

impl HeadlessShader {
    /// Starts compiling `descriptor`. Binding registers are moved into their reserved
    /// ranges using `shift`.
    pub fn compile(descriptor: ShaderDescriptor, shift: ShaderShift) -> Arc<Self> {
        let stage_flags = ShaderStageFlags::from_stage(descriptor.stage);
        let descriptors = descriptor
            .bindings
            .iter()
            .map(|binding| {
                let slot = binding.register
                    + match binding.kind {
                        DescriptorKind::ConstantBuffer => shift.buffer,
                        DescriptorKind::Texture => shift.texture,
                        DescriptorKind::Sampler => shift.sampler,
                    };
                let mut d = Descriptor::new(binding.name.clone(), binding.kind, slot, stage_flags);
                d.size = binding.size;
                d
            })
            .collect();

        let signal = Arc::new(CompilationSignal::new(CompilationState::Compiling));
        let outcome = match descriptor.compile_error {
            Some(details) => CompilationState::Failed(details),
            None => CompilationState::Succeeded,
        };
        let compile_time = descriptor.compile_time;
        if compile_time.is_zero() {
            signal.set(outcome);
        } else {
            let task_signal = Arc::clone(&signal);
            let name = descriptor.name.clone();
            let spawned = thread::Builder::new()
                .name(format!("compile:{name}"))
                .spawn(move || {
                    thread::sleep(compile_time);
                    log::debug!("Shader '{name}' finished compiling: {outcome:?}");
                    task_signal.set(outcome);
                });
            if let Err(e) = spawned {
                signal.set(CompilationState::Failed(format!(
                    "Failed to spawn compile task: {e}"
                )));
            }
        }

        Arc::new(Self {
            id: ResourceId::next(),
            name: descriptor.name,
            stage: descriptor.stage,
            descriptors,
            input_layout: descriptor.input_layout.map(Arc::new),
            signal,
        })
    }
}

impl Shader for HeadlessShader {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn compilation_state(&self) -> CompilationState {
        self.signal.get()
    }

    fn wait_for_compilation(&self) -> CompilationState {
        self.signal.wait()
    }

    fn descriptors(&self) -> Vec<Descriptor> {
        self.descriptors.clone()
    }

    fn input_layout(&self) -> Option<Arc<InputLayout>> {
        self.input_layout.clone()
    }
}

/// A swap chain of image views whose acquisition signals a real semaphore.
#[derive(Debug)]
pub struct HeadlessSwapChain {
    id: ResourceId,
    device: Arc<HeadlessDevice>,
    format: TextureFormat,
    extent: Extent2D,
    views: Vec<NativeHandle>,
    image_index: AtomicU32,
    acquired: SemaphoreHandle,
}

impl HeadlessSwapChain {
    /// Creates a swap chain with `buffer_count` images.
    ///
    /// ## Errors
    /// * `RhiError::Resource` - If the extent is empty or `buffer_count` is zero.
    pub fn new(
        device: Arc<HeadlessDevice>,
        format: TextureFormat,
        extent: Extent2D,
        buffer_count: u32,
    ) -> Result<Arc<Self>, RhiError> {
        if extent.is_empty() || buffer_count == 0 {
            return Err(ResourceError::InvalidDimensions {
                width: extent.width,
                height: extent.height,
            }
            .into());
        }
        let acquired = device.create_semaphore()?;
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            device,
            format,
            extent,
            views: (0..buffer_count).map(|_| allocate_handle()).collect(),
            image_index: AtomicU32::new(buffer_count - 1),
            acquired,
        }))
    }

    /// The index of the last acquired image.
    pub fn image_index(&self) -> u32 {
        self.image_index.load(Ordering::Acquire)
    }
}

impl SwapChain for HeadlessSwapChain {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn acquire_next_image(&self) -> Result<u32, RhiError> {
        let count = self.views.len() as u32;
        let next = (self.image_index() + 1) % count;
        self.device
            .signal_semaphore(self.acquired)
            .map_err(|e| RhiError::ImageAcquisition(e.to_string()))?;
        self.image_index.store(next, Ordering::Release);
        Ok(next)
    }

    fn image_acquired_semaphore(&self) -> Option<SemaphoreHandle> {
        Some(self.acquired)
    }

    fn render_target_view(&self) -> ResourceView {
        ResourceView::RenderTarget(self.views[self.image_index() as usize])
    }
}

impl Drop for HeadlessSwapChain {
    fn drop(&mut self) {
        self.device.destroy_semaphore(self.acquired);
    }
}
