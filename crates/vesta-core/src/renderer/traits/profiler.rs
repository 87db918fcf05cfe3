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

/// A CPU/GPU time-block profiler the command list reports marker scopes to.
///
/// Blocks nest: every `time_block_start` is matched by one `time_block_end`, which
/// closes the innermost open block.
pub trait Profiler: Send + Sync {
    /// Opens a named time block.
    fn time_block_start(&self, name: &str);

    /// Closes the innermost open block. Returns `false` if none was open.
    fn time_block_end(&self) -> bool;
}
