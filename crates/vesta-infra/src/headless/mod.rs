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

//! A backend that executes submissions on a CPU worker thread.
//!
//! Every synchronization primitive is real: fences block until the queue thread
//! reaches them, semaphores order submissions against swap chain acquisition, and
//! command buffers go through the same lifecycle a driver validates.

pub mod device;
mod queue;
pub mod resources;
mod sync;

pub use self::device::{CommandBufferState, HeadlessDevice};
pub use self::resources::{
    BufferKind, HeadlessBuffer, HeadlessSampler, HeadlessShader, HeadlessSwapChain,
    HeadlessTexture, ShaderBinding, ShaderDescriptor, TextureDescriptor,
};
