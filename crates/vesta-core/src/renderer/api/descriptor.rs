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

//! Shader-visible resource bindings and the blueprint hash used to cache descriptor sets.

use super::resource::{ResourceId, ResourceView};
use super::util::{ShaderStageFlags, TextureLayout};
use crate::renderer::traits::Texture;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The kind of resource a descriptor binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// A constant (uniform) buffer.
    ConstantBuffer,
    /// A sampler object.
    Sampler,
    /// A sampled texture.
    Texture,
}

/// One shader-bindable resource slot.
///
/// Shaders report their descriptors with an empty binding ([`ResourceId::NONE`]);
/// a pipeline fills the identity, view, size and layout in as resources are bound.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Reflection name, for diagnostics only.
    pub name: String,
    /// Slot index, already shifted into its reserved range.
    pub slot: u32,
    /// Stages that can see this binding.
    pub stage: ShaderStageFlags,
    /// What kind of resource is bound.
    pub kind: DescriptorKind,
    /// Identity of the bound object, used for change detection.
    pub id: ResourceId,
    /// Native view of the bound object.
    pub resource: Option<ResourceView>,
    /// Size in bytes, for constant buffers.
    pub size: u64,
    /// Layout the texture is sampled in.
    pub layout: TextureLayout,
    /// The bound texture, kept so a deferred layout transition can be reverted.
    pub texture: Option<Arc<dyn Texture>>,
    /// Layout to restore on the bound texture when the pass ends.
    pub revert_layout: Option<TextureLayout>,
}

impl Descriptor {
    /// Creates an unbound descriptor as reported by shader reflection.
    pub fn new(name: impl Into<String>, kind: DescriptorKind, slot: u32, stage: ShaderStageFlags) -> Self {
        Self {
            name: name.into(),
            slot,
            stage,
            kind,
            id: ResourceId::NONE,
            resource: None,
            size: 0,
            layout: TextureLayout::Undefined,
            texture: None,
            revert_layout: None,
        }
    }

    /// Returns `true` if this descriptor occupies `(kind, slot)`.
    pub fn matches(&self, kind: DescriptorKind, slot: u32) -> bool {
        self.kind == kind && self.slot == slot
    }

    /// Returns `true` once a resource has been bound.
    pub fn is_bound(&self) -> bool {
        !self.id.is_none()
    }

    /// Feeds the binding-relevant fields into `state`.
    ///
    /// Only `(slot, stage, identity, size, kind, layout)` participate; names and
    /// native views do not.
    pub fn hash_binding<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.stage.hash(state);
        self.id.hash(state);
        self.size.hash(state);
        self.kind.hash(state);
        self.layout.hash(state);
    }
}

/// Computes the content hash of a descriptor blueprint, in blueprint order.
pub fn blueprint_hash(descriptors: &[Descriptor]) -> u64 {
    let mut hasher = ahash::AHasher::default();
    descriptors.len().hash(&mut hasher);
    for descriptor in descriptors {
        descriptor.hash_binding(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint() -> Vec<Descriptor> {
        vec![
            Descriptor::new("frame", DescriptorKind::ConstantBuffer, 100, ShaderStageFlags::VERTEX),
            Descriptor::new("albedo", DescriptorKind::Texture, 200, ShaderStageFlags::PIXEL),
            Descriptor::new("linear", DescriptorKind::Sampler, 302, ShaderStageFlags::PIXEL),
        ]
    }

    #[test]
    fn hash_is_deterministic() {
        let a = blueprint();
        let b = blueprint();
        assert_eq!(blueprint_hash(&a), blueprint_hash(&a));
        assert_eq!(blueprint_hash(&a), blueprint_hash(&b));
    }

    #[test]
    fn hash_changes_with_identity() {
        let mut bp = blueprint();
        let before = blueprint_hash(&bp);
        bp[1].id = ResourceId::next();
        assert_ne!(before, blueprint_hash(&bp));
    }

    #[test]
    fn hash_changes_with_layout_and_order() {
        let mut bp = blueprint();
        let before = blueprint_hash(&bp);
        bp[1].layout = TextureLayout::ShaderReadOnly;
        assert_ne!(before, blueprint_hash(&bp));

        let mut reordered = blueprint();
        reordered.swap(0, 2);
        assert_ne!(blueprint_hash(&blueprint()), blueprint_hash(&reordered));
    }

    #[test]
    fn hash_ignores_names() {
        let mut bp = blueprint();
        let before = blueprint_hash(&bp);
        bp[0].name = "renamed".to_string();
        assert_eq!(before, blueprint_hash(&bp));
    }

    #[test]
    fn matches_kind_and_slot() {
        let d = Descriptor::new("albedo", DescriptorKind::Texture, 200, ShaderStageFlags::PIXEL);
        assert!(d.matches(DescriptorKind::Texture, 200));
        assert!(!d.matches(DescriptorKind::Sampler, 200));
        assert!(!d.is_bound());
    }
}
