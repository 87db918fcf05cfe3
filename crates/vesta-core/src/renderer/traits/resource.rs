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

//! The interfaces the command list consumes from shader, texture, buffer, sampler and
//! swap chain objects.

use crate::math::{Extent2D, Viewport};
use crate::renderer::api::*;
use crate::renderer::error::RhiError;
use std::fmt::Debug;
use std::sync::Arc;

/// A shader object, possibly still compiling in the background.
pub trait Shader: Send + Sync + Debug {
    /// Stable identity.
    fn id(&self) -> ResourceId;

    /// Name, for diagnostics.
    fn name(&self) -> &str;

    /// The stage this shader runs in.
    fn stage(&self) -> ShaderStage;

    /// The current compilation state, without blocking.
    fn compilation_state(&self) -> CompilationState;

    /// Blocks until compilation is no longer in progress and returns the final state.
    fn wait_for_compilation(&self) -> CompilationState;

    /// Returns `true` if the shader compiled successfully.
    fn is_compiled(&self) -> bool {
        self.compilation_state() == CompilationState::Succeeded
    }

    /// The resource bindings the shader declares, with slots already shifted into
    /// their reserved ranges and stage flags set to this shader's stage.
    fn descriptors(&self) -> Vec<Descriptor>;

    /// The vertex input layout, for vertex shaders.
    fn input_layout(&self) -> Option<Arc<InputLayout>>;
}

/// A texture object.
///
/// The layout is interior-mutable: the command list transitions textures it samples and
/// reverts them when the pass ends.
pub trait Texture: Send + Sync + Debug {
    /// Stable identity.
    fn id(&self) -> ResourceId;

    /// Name, for diagnostics.
    fn name(&self) -> &str;

    /// Pixel format.
    fn format(&self) -> TextureFormat;

    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// The current image layout.
    fn layout(&self) -> TextureLayout;

    /// Records a new image layout after a transition.
    fn set_layout(&self, layout: TextureLayout);

    /// Returns `true` if the texture can be bound for sampling right now.
    fn is_sampled(&self) -> bool;

    /// The shader-resource view, if the texture was created for sampling.
    fn shader_view(&self) -> Option<ResourceView>;

    /// The render-target view, if the texture was created as a color target.
    fn render_target_view(&self) -> Option<ResourceView>;

    /// The depth-stencil view of one array slice, if the texture was created as a depth target.
    fn depth_stencil_view(&self, array_index: u32) -> Option<ResourceView>;

    /// A viewport covering the whole texture.
    fn viewport(&self) -> Viewport {
        Viewport::from_extent(Extent2D::new(self.width(), self.height()))
    }
}

/// A vertex, index or constant buffer.
pub trait Buffer: Send + Sync + Debug {
    /// Stable identity.
    fn id(&self) -> ResourceId;

    /// The native buffer view.
    fn resource(&self) -> ResourceView;

    /// Size in bytes.
    fn size(&self) -> u64;

    /// Size in bytes of one element.
    fn stride(&self) -> u32;

    /// Number of elements.
    fn count(&self) -> u32;

    /// Index width when used as an index buffer.
    fn index_format(&self) -> IndexFormat {
        if self.stride() == 2 {
            IndexFormat::Uint16
        } else {
            IndexFormat::Uint32
        }
    }
}

/// A sampler object.
pub trait Sampler: Send + Sync + Debug {
    /// Stable identity.
    fn id(&self) -> ResourceId;

    /// The native sampler view.
    fn resource(&self) -> ResourceView;
}

/// A presentable chain of images.
pub trait SwapChain: Send + Sync + Debug {
    /// Stable identity.
    fn id(&self) -> ResourceId;

    /// Image format.
    fn format(&self) -> TextureFormat;

    /// Image size.
    fn extent(&self) -> Extent2D;

    /// Acquires the next image to render into and returns its index.
    ///
    /// ## Errors
    /// * `RhiError::ImageAcquisition` - If no image could be acquired.
    fn acquire_next_image(&self) -> Result<u32, RhiError>;

    /// The semaphore signalled when the last acquired image is ready to be written.
    fn image_acquired_semaphore(&self) -> Option<SemaphoreHandle>;

    /// The render-target view of the last acquired image.
    fn render_target_view(&self) -> ResourceView;
}
