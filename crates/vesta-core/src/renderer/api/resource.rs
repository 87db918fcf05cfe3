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

//! Resource identities, opaque native handles and tagged resource views.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// A stable, process-unique identity of an RHI object (texture, buffer, sampler, shader...).
///
/// Descriptors compare identities, never native handles, to detect binding changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// The identity of "nothing bound".
    pub const NONE: Self = Self(0);

    /// Allocates a fresh identity from the process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns `true` if this is [`ResourceId::NONE`].
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opaque handle to a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Returns `true` if this is [`NativeHandle::NULL`].
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A native resource handle tagged with the form it is used in.
///
/// Commands and descriptors carry this instead of untyped pointers, so a backend
/// never has to guess what a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceView {
    /// A color render target view.
    RenderTarget(NativeHandle),
    /// A depth-stencil view of one array slice.
    DepthStencil {
        /// The native view.
        handle: NativeHandle,
        /// The array slice the view covers.
        array_index: u32,
    },
    /// A view a shader can sample from.
    ShaderResource(NativeHandle),
    /// A buffer.
    Buffer(NativeHandle),
    /// A sampler object.
    Sampler(NativeHandle),
}

impl ResourceView {
    /// Returns the underlying native handle regardless of kind.
    pub const fn handle(&self) -> NativeHandle {
        match *self {
            ResourceView::RenderTarget(h)
            | ResourceView::ShaderResource(h)
            | ResourceView::Buffer(h)
            | ResourceView::Sampler(h) => h,
            ResourceView::DepthStencil { handle, .. } => handle,
        }
    }
}

macro_rules! native_handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub NativeHandle);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(NativeHandle::NULL);

            /// Returns `true` if the handle is null.
            pub const fn is_null(&self) -> bool {
                self.0.is_null()
            }
        }
    };
}

native_handle_type!(
    /// A native command buffer.
    CommandBufferHandle
);
native_handle_type!(
    /// A CPU-waitable fence signalled by the GPU when submitted work completes.
    FenceHandle
);
native_handle_type!(
    /// A GPU-to-GPU semaphore.
    SemaphoreHandle
);
native_handle_type!(
    /// A realised descriptor set.
    DescriptorSetHandle
);

/// The native objects backing one compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativePipeline {
    /// The pipeline object itself.
    pub pipeline: NativeHandle,
    /// The pipeline layout descriptor sets are created against.
    pub layout: NativeHandle,
    /// The render pass the pipeline was built for.
    pub render_pass: NativeHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ids_are_unique_and_never_none() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
        assert!(!a.is_none());
        assert!(ResourceId::NONE.is_none());
    }

    #[test]
    fn view_handle_ignores_kind() {
        let h = NativeHandle(7);
        assert_eq!(ResourceView::RenderTarget(h).handle(), h);
        assert_eq!(
            ResourceView::DepthStencil {
                handle: h,
                array_index: 2
            }
            .handle(),
            h
        );
        assert_ne!(ResourceView::ShaderResource(h), ResourceView::Buffer(h));
    }
}
