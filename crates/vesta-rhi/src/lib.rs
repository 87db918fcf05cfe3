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

//! # Vesta RHI
//!
//! The command recording engine: the [`CommandList`] state machine, pipeline
//! resolution through the [`PipelineCache`], and descriptor-set caching per
//! [`Pipeline`]. Everything here is backend independent and talks to the GPU only
//! through [`vesta_core::renderer::RhiDevice`].

pub mod command_list;
pub mod error;
pub mod frame_bindings;
pub mod marker;
pub mod pipeline;
pub mod pipeline_cache;
pub mod stats;

pub use command_list::{CommandList, CommandListState};
pub use error::CommandListError;
pub use frame_bindings::FrameBindings;
pub use pipeline::{BindResult, LayoutTransition, Pipeline};
pub use pipeline_cache::{PipelineCache, SharedPipeline};
pub use stats::CommandListStats;
