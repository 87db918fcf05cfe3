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

//! A device that accepts all work and executes none of it.

use crate::headless::device::allocate_handle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use vesta_core::renderer::{
    BackendType, Command, CommandBufferHandle, Descriptor, DescriptorSetHandle, DeviceStats,
    FenceHandle, NativeHandle, NativePipeline, PipelineDescription, RhiDevice, RhiError,
    SubmitInfo,
};

/// Useful for measuring the CPU cost of recording in isolation. Every fence reads as
/// signalled, so nothing ever blocks.
#[derive(Debug, Default)]
pub struct NullDevice {
    pipelines_created: AtomicU64,
    pipelines_destroyed: AtomicU64,
    descriptor_sets_created: AtomicU64,
    submissions_executed: AtomicU64,
    draws_executed: AtomicU64,
    commands_recorded: AtomicU64,
}

impl NullDevice {
    /// Creates a null device.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RhiDevice for NullDevice {
    fn backend_type(&self) -> BackendType {
        BackendType::Null
    }

    fn create_command_buffer(&self, _name: &str) -> Result<CommandBufferHandle, RhiError> {
        Ok(CommandBufferHandle(allocate_handle()))
    }

    fn destroy_command_buffer(&self, _cmd: CommandBufferHandle) {}

    fn begin_command_buffer(&self, _cmd: CommandBufferHandle) -> Result<(), RhiError> {
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: CommandBufferHandle) -> Result<(), RhiError> {
        Ok(())
    }

    fn record(&self, _cmd: CommandBufferHandle, command: &Command) {
        self.commands_recorded.fetch_add(1, Ordering::Relaxed);
        if command.is_draw() {
            self.draws_executed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn create_fence(&self) -> Result<FenceHandle, RhiError> {
        Ok(FenceHandle(allocate_handle()))
    }

    fn destroy_fence(&self, _fence: FenceHandle) {}

    fn wait_fence(&self, _fence: FenceHandle, _timeout: Option<Duration>) -> Result<(), RhiError> {
        Ok(())
    }

    fn reset_fence(&self, _fence: FenceHandle) -> Result<(), RhiError> {
        Ok(())
    }

    fn is_fence_signaled(&self, _fence: FenceHandle) -> bool {
        true
    }

    fn submit(&self, _info: &SubmitInfo<'_>) -> Result<(), RhiError> {
        self.submissions_executed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<(), RhiError> {
        Ok(())
    }

    fn create_pipeline(
        &self,
        _description: &PipelineDescription<'_>,
    ) -> Result<NativePipeline, RhiError> {
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
        Ok(NativePipeline {
            pipeline: allocate_handle(),
            layout: allocate_handle(),
            render_pass: allocate_handle(),
        })
    }

    fn destroy_pipeline(&self, _pipeline: &NativePipeline) {
        self.pipelines_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn create_descriptor_set(
        &self,
        _layout: NativeHandle,
        _descriptors: &[Descriptor],
    ) -> Result<DescriptorSetHandle, RhiError> {
        self.descriptor_sets_created.fetch_add(1, Ordering::Relaxed);
        Ok(DescriptorSetHandle(allocate_handle()))
    }

    fn supports_debug_markers(&self) -> bool {
        false
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            pipelines_created: self.pipelines_created.load(Ordering::Relaxed),
            pipelines_destroyed: self.pipelines_destroyed.load(Ordering::Relaxed),
            descriptor_sets_created: self.descriptor_sets_created.load(Ordering::Relaxed),
            submissions_executed: self.submissions_executed.load(Ordering::Relaxed),
            draws_executed: self.draws_executed.load(Ordering::Relaxed),
            commands_recorded: self.commands_recorded.load(Ordering::Relaxed),
        }
    }
}
