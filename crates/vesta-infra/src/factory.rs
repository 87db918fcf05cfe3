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

//! Builds the device selected by configuration.

use crate::headless::HeadlessDevice;
use crate::null::NullDevice;
use std::sync::Arc;
use vesta_core::renderer::{BackendConfig, BackendType, RhiDevice};

/// Creates the device `config` selects.
pub fn create_device(config: &BackendConfig) -> Arc<dyn RhiDevice> {
    log::info!("Creating {:?} RHI device.", config.backend);
    match config.backend {
        BackendType::Headless => Arc::new(HeadlessDevice::new(config)),
        BackendType::Null => Arc::new(NullDevice::new()),
    }
}
