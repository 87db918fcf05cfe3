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

//! Generic rendering enums.

/// Specifies the data type of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    Uint16,
    /// Indices are 32-bit unsigned integers.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Returns the size in bytes of a single index.
    pub const fn size(&self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Defines the programmable stage a shader object is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex shader stage.
    Vertex,
    /// The pixel (fragment) shader stage.
    Pixel,
    /// The compute shader stage.
    Compute,
}

/// Defines the memory format of pixels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit unsigned normalized component.
    R8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (BGRA) in the sRGB color space. This is a common swapchain format.
    Bgra8UnormSrgb,
    /// One 16-bit float component.
    R16Float,
    /// Two 16-bit float components.
    Rg16Float,
    /// Four 16-bit float components.
    Rgba16Float,
    /// Four 32-bit float components.
    Rgba32Float,
    /// A 32-bit float depth format.
    Depth32Float,
    /// A 32-bit float depth format with an 8-bit stencil component.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns `true` for depth (and depth-stencil) formats.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth32FloatStencil8
        )
    }

    /// Returns `true` if the format carries a stencil component.
    pub const fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth32FloatStencil8)
    }

    /// Returns the size in bytes of a single pixel for this format.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Bgra8UnormSrgb => 4,
            TextureFormat::R16Float => 2,
            TextureFormat::Rg16Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth32Float => 4,
            TextureFormat::Depth32FloatStencil8 => 5,
        }
    }
}

/// The memory layout an image is currently in.
///
/// Layouts gate what an image may be used for: a texture can only be sampled while it
/// is in a layout compatible with sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    /// Contents are undefined; the image was just created or discarded.
    #[default]
    Undefined,
    /// Usable for anything, optimal for nothing (e.g. compute writes).
    General,
    /// Written as a color render target.
    ColorAttachment,
    /// Written as a depth-stencil target.
    DepthStencilAttachment,
    /// Read-only depth, still sampleable.
    DepthStencilReadOnly,
    /// Optimal for sampling in shaders.
    ShaderReadOnly,
    /// Destination of a copy.
    TransferDst,
    /// Ready to be presented by the swap chain.
    Present,
}

impl TextureLayout {
    /// Returns `true` if a shader may sample an image in this layout.
    pub const fn is_sampleable(&self) -> bool {
        matches!(
            self,
            TextureLayout::General
                | TextureLayout::DepthStencilReadOnly
                | TextureLayout::ShaderReadOnly
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_read_layouts_are_sampleable() {
        assert!(TextureLayout::ShaderReadOnly.is_sampleable());
        assert!(TextureLayout::General.is_sampleable());
        assert!(!TextureLayout::ColorAttachment.is_sampleable());
        assert!(!TextureLayout::Undefined.is_sampleable());
    }

    #[test]
    fn depth_formats_are_detected() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth32FloatStencil8.has_stencil());
        assert!(!TextureFormat::Rgba16Float.is_depth());
        assert_eq!(IndexFormat::Uint16.size(), 2);
    }
}
