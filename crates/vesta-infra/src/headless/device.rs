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

//! The headless [`RhiDevice`]: real CPU-side synchronization over a simulated queue.

use super::queue::{Queue, Submission};
use super::sync::SyncPrimitive;
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use vesta_core::renderer::{
    BackendConfig, BackendType, Command, CommandBufferHandle, Descriptor, DescriptorSetHandle,
    DeviceStats, FenceHandle, NativeHandle, NativePipeline, PipelineDescription, RhiDevice,
    RhiError, SemaphoreHandle, SubmitInfo,
};

static NEXT_NATIVE_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique native handle.
pub(crate) fn allocate_handle() -> NativeHandle {
    NativeHandle(NEXT_NATIVE_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// Lifecycle of a native command buffer, as a real driver would validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    /// Allocated, never recorded.
    Initial,
    /// Between begin and end.
    Recording,
    /// Finalized and ready to submit.
    Executable,
    /// Submitted and not yet executed.
    Pending,
}

#[derive(Debug)]
struct CommandBufferRecord {
    name: String,
    state: CommandBufferState,
    command_count: u64,
    draw_count: u64,
}

#[derive(Debug, Default)]
struct Registry {
    command_buffers: AHashMap<CommandBufferHandle, CommandBufferRecord>,
    fences: AHashMap<FenceHandle, Arc<SyncPrimitive>>,
    semaphores: AHashMap<SemaphoreHandle, Arc<SyncPrimitive>>,
    // layout handle -> descriptor count of the pipeline
    layouts: AHashMap<NativeHandle, usize>,
}

#[derive(Debug, Default)]
struct Counters {
    pipelines_created: AtomicU64,
    pipelines_destroyed: AtomicU64,
    descriptor_sets_created: AtomicU64,
    commands_recorded: AtomicU64,
}

/// A device whose queue runs on a worker thread.
///
/// Command buffers are validated through the same state transitions a native driver
/// enforces, fences and semaphores block for real, and submissions execute in order
/// after an optional simulated latency. Nothing is rasterized.
pub struct HeadlessDevice {
    registry: Arc<Mutex<Registry>>,
    counters: Counters,
    queue: Queue,
}

impl std::fmt::Debug for HeadlessDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessDevice")
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> Result<MutexGuard<'_, Registry>, RhiError> {
    registry
        .lock()
        .map_err(|e| RhiError::Backend(format!("Mutex poisoned (headless registry): {e}")))
}

impl HeadlessDevice {
    /// Creates a headless device and starts its queue thread.
    pub fn new(config: &BackendConfig) -> Self {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let completion_registry = Arc::clone(&registry);
        let queue = Queue::spawn(
            Duration::from_micros(config.simulated_gpu_latency_us),
            move |cmd| match completion_registry.lock() {
                Ok(mut registry) => {
                    if let Some(record) = registry.command_buffers.get_mut(&cmd) {
                        if record.state == CommandBufferState::Pending {
                            record.state = CommandBufferState::Executable;
                        }
                    }
                }
                Err(e) => log::error!("Mutex poisoned (headless registry): {e}"),
            },
        );
        log::info!(
            "Headless device created (simulated GPU latency: {} us).",
            config.simulated_gpu_latency_us
        );
        Self {
            registry,
            counters: Counters::default(),
            queue,
        }
    }

    /// Creates an unsignalled counting semaphore.
    pub fn create_semaphore(&self) -> Result<SemaphoreHandle, RhiError> {
        let handle = SemaphoreHandle(allocate_handle());
        lock_registry(&self.registry)?
            .semaphores
            .insert(handle, Arc::new(SyncPrimitive::new(0)));
        Ok(handle)
    }

    /// Destroys a semaphore. Unknown handles are ignored.
    pub fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        if let Ok(mut registry) = lock_registry(&self.registry) {
            registry.semaphores.remove(&semaphore);
        }
    }

    /// Signals `semaphore` from the CPU, as a presentation engine does on image acquisition.
    pub fn signal_semaphore(&self, semaphore: SemaphoreHandle) -> Result<(), RhiError> {
        let registry = lock_registry(&self.registry)?;
        let primitive = registry.semaphores.get(&semaphore).ok_or_else(|| {
            RhiError::Backend(format!("Unknown semaphore {semaphore:?}"))
        })?;
        primitive.increment();
        Ok(())
    }

    /// The state of a command buffer, if it exists.
    pub fn command_buffer_state(&self, cmd: CommandBufferHandle) -> Option<CommandBufferState> {
        lock_registry(&self.registry)
            .ok()?
            .command_buffers
            .get(&cmd)
            .map(|r| r.state)
    }

    /// The number of commands recorded into `cmd` since its last begin.
    pub fn recorded_command_count(&self, cmd: CommandBufferHandle) -> Option<u64> {
        lock_registry(&self.registry)
            .ok()?
            .command_buffers
            .get(&cmd)
            .map(|r| r.command_count)
    }

    /// The number of live command buffers and fences.
    pub fn live_objects(&self) -> (usize, usize) {
        match lock_registry(&self.registry) {
            Ok(r) => (r.command_buffers.len(), r.fences.len()),
            Err(_) => (0, 0),
        }
    }

    fn fence(&self, fence: FenceHandle) -> Result<Arc<SyncPrimitive>, RhiError> {
        lock_registry(&self.registry)?
            .fences
            .get(&fence)
            .cloned()
            .ok_or_else(|| RhiError::FenceWait(format!("Unknown fence {fence:?}")))
    }
}

impl RhiDevice for HeadlessDevice {
    fn backend_type(&self) -> BackendType {
        BackendType::Headless
    }

    fn create_command_buffer(&self, name: &str) -> Result<CommandBufferHandle, RhiError> {
        let handle = CommandBufferHandle(allocate_handle());
        lock_registry(&self.registry)?.command_buffers.insert(
            handle,
            CommandBufferRecord {
                name: name.to_string(),
                state: CommandBufferState::Initial,
                command_count: 0,
                draw_count: 0,
            },
        );
        log::debug!("Created command buffer '{name}' ({handle:?}).");
        Ok(handle)
    }

    fn destroy_command_buffer(&self, cmd: CommandBufferHandle) {
        if let Ok(mut registry) = lock_registry(&self.registry) {
            if let Some(record) = registry.command_buffers.remove(&cmd) {
                if record.state == CommandBufferState::Pending {
                    log::warn!("Destroying command buffer '{}' while pending.", record.name);
                }
            }
        }
    }

    fn begin_command_buffer(&self, cmd: CommandBufferHandle) -> Result<(), RhiError> {
        let mut registry = lock_registry(&self.registry)?;
        let record = registry
            .command_buffers
            .get_mut(&cmd)
            .ok_or_else(|| RhiError::CommandBufferBegin(format!("Unknown command buffer {cmd:?}")))?;
        match record.state {
            CommandBufferState::Pending => Err(RhiError::CommandBufferBegin(format!(
                "Command buffer '{}' is still pending execution",
                record.name
            ))),
            CommandBufferState::Recording => Err(RhiError::CommandBufferBegin(format!(
                "Command buffer '{}' is already recording",
                record.name
            ))),
            CommandBufferState::Initial | CommandBufferState::Executable => {
                record.state = CommandBufferState::Recording;
                record.command_count = 0;
                record.draw_count = 0;
                Ok(())
            }
        }
    }

    fn end_command_buffer(&self, cmd: CommandBufferHandle) -> Result<(), RhiError> {
        let mut registry = lock_registry(&self.registry)?;
        let record = registry
            .command_buffers
            .get_mut(&cmd)
            .ok_or_else(|| RhiError::CommandBufferEnd(format!("Unknown command buffer {cmd:?}")))?;
        if record.state != CommandBufferState::Recording {
            return Err(RhiError::CommandBufferEnd(format!(
                "Command buffer '{}' is not recording ({:?})",
                record.name, record.state
            )));
        }
        record.state = CommandBufferState::Executable;
        Ok(())
    }

    fn record(&self, cmd: CommandBufferHandle, command: &Command) {
        let mut registry = match lock_registry(&self.registry) {
            Ok(registry) => registry,
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        match registry.command_buffers.get_mut(&cmd) {
            Some(record) if record.state == CommandBufferState::Recording => {
                record.command_count += 1;
                if command.is_draw() {
                    record.draw_count += 1;
                }
                self.counters.commands_recorded.fetch_add(1, Ordering::Relaxed);
            }
            Some(record) => log::warn!(
                "Dropping {} recorded into '{}' outside of recording ({:?}).",
                command.name(),
                record.name,
                record.state
            ),
            None => log::warn!("Dropping {} recorded into unknown {cmd:?}.", command.name()),
        }
    }

    fn create_fence(&self) -> Result<FenceHandle, RhiError> {
        let handle = FenceHandle(allocate_handle());
        lock_registry(&self.registry)?
            .fences
            .insert(handle, Arc::new(SyncPrimitive::new(0)));
        Ok(handle)
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        if let Ok(mut registry) = lock_registry(&self.registry) {
            registry.fences.remove(&fence);
        }
    }

    fn wait_fence(&self, fence: FenceHandle, timeout: Option<Duration>) -> Result<(), RhiError> {
        let primitive = self.fence(fence)?;
        if primitive.value() == 0 && self.queue.progress().lost.load(Ordering::Acquire) {
            return Err(RhiError::DeviceLost);
        }
        if primitive.wait(timeout) {
            Ok(())
        } else {
            Err(RhiError::FenceTimeout {
                timeout_ms: timeout.map_or(0, |t| t.as_millis() as u64),
            })
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<(), RhiError> {
        self.fence(fence)?.clear();
        Ok(())
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> bool {
        self.fence(fence).map(|f| f.value() > 0).unwrap_or(false)
    }

    fn submit(&self, info: &SubmitInfo<'_>) -> Result<(), RhiError> {
        let submission = {
            let mut registry = lock_registry(&self.registry)?;
            let lookup = |map: &AHashMap<SemaphoreHandle, Arc<SyncPrimitive>>,
                          handles: &[SemaphoreHandle]| {
                handles
                    .iter()
                    .map(|h| {
                        map.get(h).cloned().ok_or_else(|| {
                            RhiError::QueueSubmit(format!("Unknown semaphore {h:?}"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            };
            let wait = lookup(&registry.semaphores, info.wait_semaphores)?;
            let signal = lookup(&registry.semaphores, info.signal_semaphores)?;
            let fence = match info.fence {
                Some(handle) => Some(registry.fences.get(&handle).cloned().ok_or_else(|| {
                    RhiError::QueueSubmit(format!("Unknown fence {handle:?}"))
                })?),
                None => None,
            };
            if let Some(fence) = &fence {
                if fence.value() > 0 {
                    return Err(RhiError::QueueSubmit(
                        "Fence must be reset before it is submitted".to_string(),
                    ));
                }
            }

            let record = registry
                .command_buffers
                .get_mut(&info.command_buffer)
                .ok_or_else(|| {
                    RhiError::QueueSubmit(format!(
                        "Unknown command buffer {:?}",
                        info.command_buffer
                    ))
                })?;
            if record.state != CommandBufferState::Executable {
                return Err(RhiError::QueueSubmit(format!(
                    "Command buffer '{}' is not executable ({:?})",
                    record.name, record.state
                )));
            }
            record.state = CommandBufferState::Pending;

            Submission {
                command_buffer: info.command_buffer,
                draw_count: record.draw_count,
                wait,
                signal,
                fence,
            }
        };

        if self.queue.push(submission) {
            Ok(())
        } else {
            Err(RhiError::DeviceLost)
        }
    }

    fn queue_wait_idle(&self) -> Result<(), RhiError> {
        if self.queue.progress().wait_idle() {
            Ok(())
        } else {
            Err(RhiError::DeviceLost)
        }
    }

    fn create_pipeline(
        &self,
        description: &PipelineDescription<'_>,
    ) -> Result<NativePipeline, RhiError> {
        let color_formats = description.state.color_formats();
        if color_formats.iter().any(|f| f.is_depth()) {
            return Err(RhiError::Backend(
                "Depth format bound as a color target".to_string(),
            ));
        }
        if let Some(depth) = &description.state.render_target_depth_texture {
            if !depth.format().is_depth() {
                return Err(RhiError::Backend(format!(
                    "Texture '{}' is not a depth format",
                    depth.name()
                )));
            }
        }

        let pipeline = NativePipeline {
            pipeline: allocate_handle(),
            layout: allocate_handle(),
            render_pass: allocate_handle(),
        };
        lock_registry(&self.registry)?
            .layouts
            .insert(pipeline.layout, description.descriptors.len());
        self.counters.pipelines_created.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Created native pipeline {:?} for state {:#018x} ({} color targets, {} descriptors).",
            pipeline.pipeline,
            description.hash,
            color_formats.len(),
            description.descriptors.len()
        );
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: &NativePipeline) {
        if let Ok(mut registry) = lock_registry(&self.registry) {
            if registry.layouts.remove(&pipeline.layout).is_some() {
                self.counters
                    .pipelines_destroyed
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn create_descriptor_set(
        &self,
        layout: NativeHandle,
        descriptors: &[Descriptor],
    ) -> Result<DescriptorSetHandle, RhiError> {
        let registry = lock_registry(&self.registry)?;
        let expected = registry
            .layouts
            .get(&layout)
            .ok_or_else(|| RhiError::Backend(format!("Unknown pipeline layout {layout:?}")))?;
        if *expected != descriptors.len() {
            return Err(RhiError::Backend(format!(
                "Descriptor count mismatch: layout expects {expected}, got {}",
                descriptors.len()
            )));
        }
        self.counters
            .descriptor_sets_created
            .fetch_add(1, Ordering::Relaxed);
        Ok(DescriptorSetHandle(allocate_handle()))
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            pipelines_created: self.counters.pipelines_created.load(Ordering::Relaxed),
            pipelines_destroyed: self.counters.pipelines_destroyed.load(Ordering::Relaxed),
            descriptor_sets_created: self
                .counters
                .descriptor_sets_created
                .load(Ordering::Relaxed),
            submissions_executed: self.queue.progress().executed(),
            draws_executed: self
                .queue
                .progress()
                .draws_executed
                .load(Ordering::Relaxed),
            commands_recorded: self.counters.commands_recorded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> HeadlessDevice {
        HeadlessDevice::new(&BackendConfig::default())
    }

    fn executable_buffer(device: &HeadlessDevice) -> CommandBufferHandle {
        let cmd = device.create_command_buffer("test").unwrap();
        device.begin_command_buffer(cmd).unwrap();
        device.record(
            cmd,
            &Command::Draw {
                vertex_count: 3,
                vertex_offset: 0,
                instance_count: 1,
                first_instance: 0,
            },
        );
        device.end_command_buffer(cmd).unwrap();
        cmd
    }

    #[test]
    fn command_buffer_state_transitions() {
        let device = device();
        let cmd = device.create_command_buffer("cmd").unwrap();
        assert_eq!(device.command_buffer_state(cmd), Some(CommandBufferState::Initial));

        assert!(matches!(
            device.end_command_buffer(cmd),
            Err(RhiError::CommandBufferEnd(_))
        ));
        device.begin_command_buffer(cmd).unwrap();
        assert!(matches!(
            device.begin_command_buffer(cmd),
            Err(RhiError::CommandBufferBegin(_))
        ));
        device.end_command_buffer(cmd).unwrap();
        assert_eq!(
            device.command_buffer_state(cmd),
            Some(CommandBufferState::Executable)
        );
    }

    #[test]
    fn submit_signals_fence_and_counts_draws() {
        let device = device();
        let cmd = executable_buffer(&device);
        let fence = device.create_fence().unwrap();

        device
            .submit(&SubmitInfo {
                command_buffer: cmd,
                wait_semaphores: &[],
                signal_semaphores: &[],
                fence: Some(fence),
            })
            .unwrap();
        device.wait_fence(fence, None).unwrap();
        assert!(device.is_fence_signaled(fence));

        device.queue_wait_idle().unwrap();
        let stats = device.stats();
        assert_eq!(stats.submissions_executed, 1);
        assert_eq!(stats.draws_executed, 1);
        assert_eq!(
            device.command_buffer_state(cmd),
            Some(CommandBufferState::Executable)
        );

        device.reset_fence(fence).unwrap();
        assert!(!device.is_fence_signaled(fence));
    }

    #[test]
    fn submitting_a_recording_buffer_fails() {
        let device = device();
        let cmd = device.create_command_buffer("cmd").unwrap();
        device.begin_command_buffer(cmd).unwrap();
        let err = device
            .submit(&SubmitInfo {
                command_buffer: cmd,
                wait_semaphores: &[],
                signal_semaphores: &[],
                fence: None,
            })
            .unwrap_err();
        assert!(matches!(err, RhiError::QueueSubmit(_)));
    }

    #[test]
    fn submission_waits_for_semaphore() {
        let device = HeadlessDevice::new(&BackendConfig::default());
        let cmd = executable_buffer(&device);
        let fence = device.create_fence().unwrap();
        let acquired = device.create_semaphore().unwrap();

        device
            .submit(&SubmitInfo {
                command_buffer: cmd,
                wait_semaphores: &[acquired],
                signal_semaphores: &[],
                fence: Some(fence),
            })
            .unwrap();
        assert!(matches!(
            device.wait_fence(fence, Some(Duration::from_millis(20))),
            Err(RhiError::FenceTimeout { timeout_ms: 20 })
        ));

        device.signal_semaphore(acquired).unwrap();
        device.wait_fence(fence, Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn descriptor_sets_require_a_known_layout() {
        let device = device();
        assert!(device
            .create_descriptor_set(NativeHandle(u64::MAX), &[])
            .is_err());
    }

    #[test]
    fn unknown_fence_is_a_wait_error() {
        let device = device();
        assert!(matches!(
            device.wait_fence(FenceHandle(NativeHandle(u64::MAX)), None),
            Err(RhiError::FenceWait(_))
        ));
    }
}
