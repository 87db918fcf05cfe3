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

//! Global settings for the RHI layer.

use crate::renderer::backend::BackendConfig;
use crate::renderer::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// The maximum number of simultaneously bound color render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Offsets separating the binding ranges of each resource kind.
///
/// Shaders declare `register(b0)`, `register(t0)` and `register(s0)` independently; the
/// shifts move each kind into its own range so they never collide in a single
/// descriptor space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderShift {
    /// Shift applied to constant buffer slots.
    pub buffer: u32,
    /// Shift applied to texture slots.
    pub texture: u32,
    /// Shift applied to sampler slots.
    pub sampler: u32,
}

impl Default for ShaderShift {
    fn default() -> Self {
        Self {
            buffer: 100,
            texture: 200,
            sampler: 300,
        }
    }
}

/// A collection of settings that tune command recording and synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhiSettings {
    /// Command slots each command list reserves up front.
    pub initial_command_capacity: usize,
    /// Reserved binding ranges.
    pub shader_shift: ShaderShift,
    /// How long a fence wait may block before failing. `None` waits forever.
    pub fence_timeout_ms: Option<u64>,
    /// If `true`, marker scopes are recorded into native command buffers.
    pub debug_markers: bool,
    /// If `true`, marker scopes open profiler time blocks.
    pub profile_passes: bool,
    /// Backend to build.
    pub backend: BackendConfig,
}

impl Default for RhiSettings {
    fn default() -> Self {
        Self {
            initial_command_capacity: 10_000,
            shader_shift: ShaderShift::default(),
            fence_timeout_ms: None,
            debug_markers: true,
            profile_passes: true,
            backend: BackendConfig::default(),
        }
    }
}

impl RhiSettings {
    /// Parses settings from RON text. Missing fields take their default value.
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        ron::de::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Reads and parses a RON settings file.
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_ron_str(&text)?;
        log::debug!("Loaded RHI settings from '{}'.", path.display());
        Ok(settings)
    }

    /// The fence timeout as a [`Duration`].
    pub fn fence_timeout(&self) -> Option<Duration> {
        self.fence_timeout_ms.map(Duration::from_millis)
    }
}
