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

//! Pipeline state descriptions and the request a backend compiles pipelines from.

pub mod enums;
pub mod pipeline_state;
pub mod state;

pub use self::enums::*;
pub use self::pipeline_state::PipelineState;
pub use self::state::*;

use super::descriptor::Descriptor;

/// What a backend needs to build the native objects of one pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescription<'a> {
    /// The content hash of `state`, usable as a debug label.
    pub hash: u64,
    /// The state the pipeline is compiled for.
    pub state: &'a PipelineState,
    /// The merged descriptor blueprint, which determines the pipeline layout.
    pub descriptors: &'a [Descriptor],
}
