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

//! Resources bound to every pipeline a command list begins.

use std::sync::Arc;
use vesta_core::renderer::{Buffer, Sampler};

/// Constant buffers and samplers shared by every pass of a frame, such as the frame
/// constants and the engine's fixed sampler set.
///
/// Registered once on a command list, they are re-applied after each successful pass
/// begin. Slots are unshifted, like any other binding call.
#[derive(Debug, Clone, Default)]
pub struct FrameBindings {
    constant_buffers: Vec<(u32, Arc<dyn Buffer>)>,
    samplers: Vec<(u32, Arc<dyn Sampler>)>,
}

impl FrameBindings {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant buffer at `slot`, replacing any previous one.
    pub fn with_constant_buffer(mut self, slot: u32, buffer: Arc<dyn Buffer>) -> Self {
        self.constant_buffers.retain(|(s, _)| *s != slot);
        self.constant_buffers.push((slot, buffer));
        self
    }

    /// Adds a sampler at `slot`, replacing any previous one.
    pub fn with_sampler(mut self, slot: u32, sampler: Arc<dyn Sampler>) -> Self {
        self.samplers.retain(|(s, _)| *s != slot);
        self.samplers.push((slot, sampler));
        self
    }

    pub fn constant_buffers(&self) -> &[(u32, Arc<dyn Buffer>)] {
        &self.constant_buffers
    }

    pub fn samplers(&self) -> &[(u32, Arc<dyn Sampler>)] {
        &self.samplers
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constant_buffers.is_empty() && self.samplers.is_empty()
    }
}
