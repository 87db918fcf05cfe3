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

//! Provides the public, backend-agnostic RHI contracts.
//!
//! This module defines the "common language" shared by the command list engine in
//! `vesta-rhi` and the concrete backends in `vesta-infra`: resource identities and
//! tagged views, descriptors, pipeline state, recorded commands, the traits a
//! backend and its resource objects implement, configuration and errors.

pub mod api;
pub mod backend;
pub mod error;
pub mod settings;
pub mod traits;

pub use self::api::*;
pub use self::backend::{BackendConfig, BackendType};
pub use self::error::{PipelineError, ResourceError, RhiError, SettingsError, ShaderError};
pub use self::settings::{RhiSettings, ShaderShift, MAX_RENDER_TARGETS};
pub use self::traits::{
    Buffer, DeviceStats, Profiler, RhiDevice, Sampler, Shader, SubmitInfo, SwapChain, Texture,
};
