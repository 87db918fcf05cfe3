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

//! Fixed-function state descriptions.
//!
//! These are shared through `Arc` by pipeline states. They hash by content, so two
//! separately built but identical states resolve to the same cached pipeline.

use super::enums::*;
use crate::vesta_bitflags;
use std::hash::{Hash, Hasher};

/// Describes a single vertex attribute within the vertex layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The input location of this attribute in the vertex shader.
    pub shader_location: u32,
    /// The format of the attribute's data.
    pub format: VertexFormat,
    /// The byte offset of this attribute from the start of the vertex.
    pub offset: u32,
}

/// The vertex input layout a vertex shader expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InputLayout {
    /// Attributes, in location order.
    pub attributes: Vec<VertexAttribute>,
}

impl InputLayout {
    /// Builds a tightly packed layout from a list of formats, assigning locations in order.
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(location, format)| {
                let attribute = VertexAttribute {
                    shader_location: location as u32,
                    format: *format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self { attributes }
    }

    /// Returns the size in bytes of one vertex.
    pub fn stride(&self) -> u32 {
        self.attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0)
    }
}

/// Describes depth biasing, used to prevent z-fighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBiasState {
    /// A constant value added to the depth of each fragment.
    pub constant: i32,
    /// A factor that scales with the fragment's depth slope.
    pub slope_scale: f32,
    /// The maximum bias that can be applied.
    pub clamp: f32,
}

impl Hash for DepthBiasState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.constant.hash(state);
        self.slope_scale.to_bits().hash(state);
        self.clamp.to_bits().hash(state);
    }
}

/// Describes primitive rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerState {
    /// The face culling mode.
    pub cull_mode: CullMode,
    /// The vertex winding order that determines the "front" face of a triangle.
    pub front_face: FrontFace,
    /// The rasterization mode for polygons.
    pub polygon_mode: PolygonMode,
    /// If `false`, fragments outside the depth range are not clipped.
    pub depth_clip: bool,
    /// Depth bias applied to every fragment.
    pub depth_bias: DepthBiasState,
    /// Line width for line topologies.
    pub line_width: f32,
}

impl RasterizerState {
    /// Solid fill with back-face culling.
    pub const CULL_BACK_SOLID: Self = Self::new(CullMode::Back, PolygonMode::Fill);
    /// Solid fill without culling.
    pub const CULL_NONE_SOLID: Self = Self::new(CullMode::None, PolygonMode::Fill);
    /// Wireframe without culling.
    pub const CULL_NONE_WIREFRAME: Self = Self::new(CullMode::None, PolygonMode::Line);

    /// Creates a rasterizer state with clockwise front faces and no depth bias.
    pub const fn new(cull_mode: CullMode, polygon_mode: PolygonMode) -> Self {
        Self {
            cull_mode,
            front_face: FrontFace::Cw,
            polygon_mode,
            depth_clip: true,
            depth_bias: DepthBiasState {
                constant: 0,
                slope_scale: 0.0,
                clamp: 0.0,
            },
            line_width: 1.0,
        }
    }
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self::CULL_BACK_SOLID
    }
}

impl Hash for RasterizerState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.polygon_mode.hash(state);
        self.depth_clip.hash(state);
        self.depth_bias.hash(state);
        self.line_width.to_bits().hash(state);
    }
}

/// Describes the stencil test and operations for a single face of a primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// The comparison function used for the stencil test.
    pub compare: CompareFunction,
    /// The operation to perform if the stencil test fails.
    pub fail_op: StencilOperation,
    /// The operation to perform if the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// The operation to perform if both the stencil and depth tests pass.
    pub depth_pass_op: StencilOperation,
}

/// Describes the state for depth and stencil testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// If `true`, the depth test runs.
    pub depth_test_enabled: bool,
    /// If `true`, depth values will be written to the depth buffer.
    pub depth_write_enabled: bool,
    /// The comparison function used for the depth test.
    pub depth_compare: CompareFunction,
    /// If `true`, the stencil test runs.
    pub stencil_enabled: bool,
    /// The stencil state for front-facing primitives.
    pub stencil_front: StencilFaceState,
    /// The stencil state for back-facing primitives.
    pub stencil_back: StencilFaceState,
    /// A bitmask for reading from the stencil buffer.
    pub stencil_read_mask: u8,
    /// A bitmask for writing to the stencil buffer.
    pub stencil_write_mask: u8,
}

impl DepthStencilState {
    /// No depth or stencil testing.
    pub const DISABLED: Self = Self::depth(false, false, CompareFunction::Always);
    /// Depth test and write with a reverse-z comparison.
    pub const READ_WRITE: Self = Self::depth(true, true, CompareFunction::GreaterEqual);
    /// Depth test without writes.
    pub const READ: Self = Self::depth(true, false, CompareFunction::GreaterEqual);

    /// Creates a depth-only state (stencil disabled).
    pub const fn depth(test: bool, write: bool, compare: CompareFunction) -> Self {
        let face = StencilFaceState {
            compare: CompareFunction::Always,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            depth_pass_op: StencilOperation::Keep,
        };
        Self {
            depth_test_enabled: test,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil_enabled: false,
            stencil_front: face,
            stencil_back: face,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        }
    }
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Describes a complete blend equation for a single color component (RGB or A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// The blend factor for the source color (from the pixel shader).
    pub src_factor: BlendFactor,
    /// The blend factor for the destination color (already in the render target).
    pub dst_factor: BlendFactor,
    /// The operation to combine the source and destination factors.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// `src * 1 + dst * 0`.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };
    /// `src * src.a + dst * (1 - src.a)`.
    pub const ALPHA: Self = Self {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
    /// `src + dst`.
    pub const ADDITIVE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    };
}

vesta_bitflags! {
    /// A bitmask to enable or disable writes to individual color channels.
    pub struct ColorWrites: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

/// Describes color blending for every render target of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    /// If `false`, the source color replaces the destination.
    pub enabled: bool,
    /// The blend equation for the RGB color components.
    pub color: BlendComponent,
    /// The blend equation for the alpha component.
    pub alpha: BlendComponent,
    /// Which color channels are written.
    pub write_mask: ColorWrites,
    /// Constant blend factor.
    pub blend_factor: f32,
}

impl BlendState {
    /// Blending disabled.
    pub const DISABLED: Self = Self::new(false, BlendComponent::REPLACE);
    /// Standard alpha blending.
    pub const ALPHA: Self = Self::new(true, BlendComponent::ALPHA);
    /// Additive blending.
    pub const ADDITIVE: Self = Self::new(true, BlendComponent::ADDITIVE);

    /// Creates a blend state using the same equation for color and alpha.
    pub const fn new(enabled: bool, component: BlendComponent) -> Self {
        Self {
            enabled,
            color: component,
            alpha: component,
            write_mask: ColorWrites::ALL,
            blend_factor: 0.0,
        }
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl Hash for BlendState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.enabled.hash(state);
        self.color.hash(state);
        self.alpha.hash(state);
        self.write_mask.hash(state);
        self.blend_factor.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = ahash::AHasher::default();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn packed_layout_offsets_and_stride() {
        let layout = InputLayout::packed(&[
            VertexFormat::Float32x3,
            VertexFormat::Float32x2,
            VertexFormat::Float32x4,
        ]);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].shader_location, 2);
        assert_eq!(layout.stride(), 36);
        assert_eq!(InputLayout::default().stride(), 0);
    }

    #[test]
    fn float_fields_participate_in_hash() {
        let a = RasterizerState::CULL_BACK_SOLID;
        let mut b = a;
        assert_eq!(hash_of(&a), hash_of(&b));
        b.depth_bias.slope_scale = 1.5;
        assert_ne!(hash_of(&a), hash_of(&b));
        assert_ne!(hash_of(&BlendState::ALPHA), hash_of(&BlendState::DISABLED));
    }

    #[test]
    fn depth_presets() {
        assert!(!DepthStencilState::DISABLED.depth_test_enabled);
        assert!(DepthStencilState::READ_WRITE.depth_write_enabled);
        assert!(!DepthStencilState::READ.depth_write_enabled);
        assert_eq!(BlendState::default().write_mask, ColorWrites::ALL);
    }

    #[test]
    fn color_writes_combine() {
        let rg = ColorWrites::R | ColorWrites::G;
        assert!(ColorWrites::ALL.contains(rg));
        assert!(!rg.contains(ColorWrites::B));
        assert_eq!(rg.union(ColorWrites::B | ColorWrites::A), ColorWrites::ALL);
        assert!(ColorWrites::default().is_empty());
    }
}
