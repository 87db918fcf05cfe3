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

//! Bit flag sets: shader-stage visibility and texture usage.

use super::enums::ShaderStage;
use crate::vesta_bitflags;

vesta_bitflags! {
    /// Flags representing which shader stages can access a resource binding.
    ///
    /// When the descriptor lists of several shader stages are merged, a binding that
    /// appears in more than one stage keeps a single descriptor whose flags are OR-ed.
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Pixel shader stage.
        const PIXEL = 1 << 1;
        /// Compute shader stage.
        const COMPUTE = 1 << 2;
        /// All graphics stages (vertex + pixel).
        const VERTEX_PIXEL = Self::VERTEX.bits() | Self::PIXEL.bits();
    }
}

impl ShaderStageFlags {
    /// Creates flags from a single shader stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Pixel => Self::PIXEL,
            ShaderStage::Compute => Self::COMPUTE,
        }
    }

    /// Checks if these flags contain a specific stage.
    pub const fn has_stage(&self, stage: ShaderStage) -> bool {
        self.contains(Self::from_stage(stage))
    }
}

vesta_bitflags! {
    /// How a texture may be used.
    pub struct TextureUsage: u32 {
        /// The texture can be sampled from shaders.
        const SAMPLED = 1 << 0;
        /// The texture can be a color render target.
        const RENDER_TARGET = 1 << 1;
        /// The texture can be a depth-stencil target.
        const DEPTH_STENCIL = 1 << 2;
        /// The texture can be written from compute shaders.
        const STORAGE = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_flags_merge() {
        let mut flags = ShaderStageFlags::VERTEX;
        assert!(flags.has_stage(ShaderStage::Vertex));
        assert!(!flags.has_stage(ShaderStage::Pixel));

        flags |= ShaderStageFlags::from_stage(ShaderStage::Pixel);
        assert_eq!(flags, ShaderStageFlags::VERTEX_PIXEL);
        assert!(!flags.has_stage(ShaderStage::Compute));
        assert!(ShaderStageFlags::EMPTY.is_empty());
        assert_eq!(format!("{flags:?}"), "ShaderStageFlags { VERTEX | PIXEL }");
    }

    #[test]
    fn texture_usage_contains() {
        let usage = TextureUsage::SAMPLED | TextureUsage::RENDER_TARGET;
        assert!(usage.contains(TextureUsage::SAMPLED));
        assert!(!usage.contains(TextureUsage::DEPTH_STENCIL));
        assert!(!usage.contains(TextureUsage::SAMPLED | TextureUsage::STORAGE));
    }
}
