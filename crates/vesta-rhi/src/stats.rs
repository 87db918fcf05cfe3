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

//! Per-command-list counters.

/// What one command list has done since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandListStats {
    /// Pipeline passes begun.
    pub passes: u64,
    /// Draw calls issued.
    pub draws: u64,
    /// Descriptor sets bound before a draw.
    pub descriptor_set_binds: u64,
    /// Descriptor sets created because their content was unseen.
    pub descriptor_sets_created: u64,
    /// Recordings submitted to the queue.
    pub submissions: u64,
    /// Fence waits performed before reuse.
    pub fence_waits: u64,
    /// Calls dropped because the command list was not recording.
    pub dropped_calls: u64,
}
