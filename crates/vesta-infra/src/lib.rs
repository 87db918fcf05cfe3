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

//! # Vesta Infra
//!
//! Concrete implementations of the `vesta-core` device contracts.
//!
//! - [`headless`]: a device with a simulated queue thread and real fences.
//! - [`null`]: a device that accepts everything and executes nothing.

pub mod factory;
pub mod headless;
pub mod null;

pub use factory::create_device;
pub use headless::HeadlessDevice;
pub use null::NullDevice;
