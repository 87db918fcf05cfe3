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

use crate::renderer::api::*;
use crate::renderer::backend::BackendType;
use crate::renderer::error::RhiError;
use std::fmt::Debug;
use std::time::Duration;

/// One submission to the graphics queue.
#[derive(Debug, Clone, Copy)]
pub struct SubmitInfo<'a> {
    /// The finalized command buffer to execute.
    pub command_buffer: CommandBufferHandle,
    /// Semaphores the GPU waits on before executing.
    pub wait_semaphores: &'a [SemaphoreHandle],
    /// Semaphores signalled once execution completes.
    pub signal_semaphores: &'a [SemaphoreHandle],
    /// Fence signalled once execution completes.
    pub fence: Option<FenceHandle>,
}

/// Counters a backend keeps about the work it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Native pipelines created.
    pub pipelines_created: u64,
    /// Native pipelines destroyed.
    pub pipelines_destroyed: u64,
    /// Descriptor sets realised.
    pub descriptor_sets_created: u64,
    /// Submissions the queue finished executing.
    pub submissions_executed: u64,
    /// Draw commands the queue finished executing.
    pub draws_executed: u64,
    /// Commands recorded into any command buffer.
    pub commands_recorded: u64,
}

/// The backend abstraction the command list engine drives.
///
/// Everything API specific sits behind this trait: command buffer and fence lifetime,
/// recording, submission, pipeline creation and descriptor-set realisation. The state
/// machine and caching logic never look past it.
pub trait RhiDevice: Send + Sync + Debug {
    /// Which backend this is.
    fn backend_type(&self) -> BackendType;

    /// Creates a native command buffer.
    /// ## Arguments
    /// * `name` - A debug name for the command buffer.
    /// ## Errors
    /// * `RhiError::Backend` - If the command buffer cannot be allocated.
    fn create_command_buffer(&self, name: &str) -> Result<CommandBufferHandle, RhiError>;

    /// Destroys a native command buffer. Unknown handles are ignored.
    fn destroy_command_buffer(&self, cmd: CommandBufferHandle);

    /// Begins recording into `cmd`, discarding anything it previously held.
    /// ## Errors
    /// * `RhiError::CommandBufferBegin` - If the buffer is pending execution or unknown.
    fn begin_command_buffer(&self, cmd: CommandBufferHandle) -> Result<(), RhiError>;

    /// Finalizes `cmd` so it can be submitted.
    /// ## Errors
    /// * `RhiError::CommandBufferEnd` - If the buffer is not recording.
    fn end_command_buffer(&self, cmd: CommandBufferHandle) -> Result<(), RhiError>;

    /// Records one command into `cmd`.
    fn record(&self, cmd: CommandBufferHandle, command: &Command);

    /// Creates an unsignalled fence.
    /// ## Errors
    /// * `RhiError::Backend` - If the fence cannot be created.
    fn create_fence(&self) -> Result<FenceHandle, RhiError>;

    /// Destroys a fence. Unknown handles are ignored.
    fn destroy_fence(&self, fence: FenceHandle);

    /// Blocks until `fence` is signalled or `timeout` elapses (`None` waits forever).
    /// ## Errors
    /// * `RhiError::FenceTimeout` - If the timeout elapsed first.
    /// * `RhiError::FenceWait` - If the fence is unknown.
    /// * `RhiError::DeviceLost` - If the device stopped executing work.
    fn wait_fence(&self, fence: FenceHandle, timeout: Option<Duration>) -> Result<(), RhiError>;

    /// Returns `fence` to the unsignalled state.
    /// ## Errors
    /// * `RhiError::FenceWait` - If the fence is unknown.
    fn reset_fence(&self, fence: FenceHandle) -> Result<(), RhiError>;

    /// Returns `true` if `fence` is signalled. Unknown fences read as unsignalled.
    fn is_fence_signaled(&self, fence: FenceHandle) -> bool;

    /// Enqueues a finalized command buffer on the graphics queue.
    /// ## Errors
    /// * `RhiError::QueueSubmit` - If the buffer is not executable or the queue is gone.
    fn submit(&self, info: &SubmitInfo<'_>) -> Result<(), RhiError>;

    /// Blocks until every submission so far has executed.
    /// ## Errors
    /// * `RhiError::DeviceLost` - If the queue stopped executing work.
    fn queue_wait_idle(&self) -> Result<(), RhiError>;

    /// Builds the native pipeline, layout and render pass for a pipeline state.
    /// ## Errors
    /// * `RhiError::Backend` - If the backend rejects the description.
    fn create_pipeline(
        &self,
        description: &PipelineDescription<'_>,
    ) -> Result<NativePipeline, RhiError>;

    /// Destroys the native objects of a pipeline.
    fn destroy_pipeline(&self, pipeline: &NativePipeline);

    /// Realises a descriptor set for `descriptors` against pipeline `layout`.
    /// ## Errors
    /// * `RhiError::Backend` - If the layout is unknown or the pool is exhausted.
    fn create_descriptor_set(
        &self,
        layout: NativeHandle,
        descriptors: &[Descriptor],
    ) -> Result<DescriptorSetHandle, RhiError>;

    /// Returns `true` if debug markers reach the native command buffer.
    fn supports_debug_markers(&self) -> bool {
        true
    }

    /// A snapshot of the backend's counters.
    fn stats(&self) -> DeviceStats;
}
