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

//! Logging and profiling for Vesta.
//!
//! [`init_logging`] installs the process logger behind the `log` facade used by every
//! crate in the workspace. [`FrameProfiler`] receives the time blocks a command list
//! opens for its markers and passes.

pub mod logging;
pub mod profiler;

pub use logging::{init_logging, LogConfig};
pub use profiler::{BlockStats, FrameProfiler, TimeBlock};
