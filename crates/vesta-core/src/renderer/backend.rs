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

//! Backend selection.

use serde::{Deserialize, Serialize};

/// The concrete backends `vesta-infra` can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendType {
    /// A simulated GPU queue executing on a worker thread, with real fences and semaphores.
    #[default]
    Headless,
    /// Does nothing; fences are always signalled.
    Null,
}

/// Configuration for building a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which backend to build.
    pub backend: BackendType,
    /// Artificial time the headless queue spends on each submission, in microseconds.
    pub simulated_gpu_latency_us: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Headless,
            simulated_gpu_latency_us: 0,
        }
    }
}
