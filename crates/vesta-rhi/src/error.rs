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

//! Errors returned by the command list API.

use crate::command_list::CommandListState;
use thiserror::Error;
use vesta_core::renderer::{PipelineError, RhiError};

/// An error returned by a [`CommandList`](crate::CommandList) operation.
///
/// Misuse and resources that are not ready yet leave the command list untouched, so
/// the caller can skip the pass and carry on with the frame. Native failures mean the
/// backend refused work and the current pass is lost.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandListError {
    /// The operation is not permitted in the command list's current state.
    #[error("'{operation}' is not valid while the command list is {state:?}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the command list was in.
        state: CommandListState,
    },
    /// A pass was begun before the previous recording was ended and submitted.
    #[error("Previous command list still in use")]
    CommandListInUse,
    /// The pipeline for the in-progress state could not be resolved.
    #[error("Pipeline unavailable: {0}")]
    PipelineUnavailable(#[from] PipelineError),
    /// The swap chain could not provide an image to render into.
    #[error("Failed to acquire the next swap chain image: {0}")]
    ImageAcquisition(RhiError),
    /// A native command buffer, queue or fence call failed.
    #[error(transparent)]
    Native(#[from] RhiError),
}

impl CommandListError {
    /// Returns `true` if the command list is unchanged and the frame can carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CommandListError::InvalidState { .. }
                | CommandListError::CommandListInUse
                | CommandListError::PipelineUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::renderer::ShaderError;

    #[test]
    fn display_messages() {
        let err = CommandListError::InvalidState {
            operation: "submit",
            state: CommandListState::Recording,
        };
        assert_eq!(
            format!("{err}"),
            "'submit' is not valid while the command list is Recording"
        );

        let err = CommandListError::Native(RhiError::DeviceLost);
        assert_eq!(format!("{err}"), format!("{}", RhiError::DeviceLost));
    }

    #[test]
    fn recoverability_follows_the_failure_category() {
        assert!(CommandListError::CommandListInUse.is_recoverable());
        assert!(CommandListError::from(PipelineError::Shader(ShaderError::NotCompiled {
            name: "gbuffer.vs".to_string()
        }))
        .is_recoverable());
        assert!(!CommandListError::from(RhiError::DeviceLost).is_recoverable());
        assert!(!CommandListError::ImageAcquisition(RhiError::DeviceLost).is_recoverable());
    }
}
