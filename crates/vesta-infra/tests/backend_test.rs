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

use std::sync::Arc;
use std::time::Duration;
use vesta_core::math::Extent2D;
use vesta_core::renderer::{
    BackendConfig, BackendType, Command, FenceHandle, RhiDevice, SemaphoreHandle, SubmitInfo,
    SwapChain, TextureFormat,
};
use vesta_infra::headless::{CommandBufferState, HeadlessSwapChain};
use vesta_infra::{create_device, HeadlessDevice};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn draw() -> Command {
    Command::Draw {
        vertex_count: 3,
        vertex_offset: 0,
        instance_count: 1,
        first_instance: 0,
    }
}

/// Records `draws` draws into a fresh buffer, submits it and returns its fence.
fn submit_frame(device: &dyn RhiDevice, draws: usize, wait: &[SemaphoreHandle]) -> FenceHandle {
    let cmd = device.create_command_buffer("frame").unwrap();
    let fence = device.create_fence().unwrap();
    device.begin_command_buffer(cmd).unwrap();
    for _ in 0..draws {
        device.record(cmd, &draw());
    }
    device.end_command_buffer(cmd).unwrap();
    device
        .submit(&SubmitInfo {
            command_buffer: cmd,
            wait_semaphores: wait,
            signal_semaphores: &[],
            fence: Some(fence),
        })
        .unwrap();
    fence
}

#[test]
fn both_backends_count_the_same_work() {
    init_logging();
    for backend in [BackendType::Headless, BackendType::Null] {
        let device = create_device(&BackendConfig {
            backend,
            ..Default::default()
        });
        for draws in 1..=3 {
            let fence = submit_frame(device.as_ref(), draws, &[]);
            device.wait_fence(fence, None).unwrap();
        }
        device.queue_wait_idle().unwrap();

        let stats = device.stats();
        assert_eq!(stats.submissions_executed, 3, "{backend:?}");
        assert_eq!(stats.draws_executed, 6, "{backend:?}");
    }
}

#[test]
fn submissions_complete_in_order() {
    init_logging();
    let device = HeadlessDevice::new(&BackendConfig {
        simulated_gpu_latency_us: 5_000,
        ..Default::default()
    });
    let fences: Vec<_> = (0..4).map(|_| submit_frame(&device, 1, &[])).collect();

    device.wait_fence(fences[3], None).unwrap();
    assert!(fences.iter().all(|f| device.is_fence_signaled(*f)));
}

#[test]
fn signalled_semaphore_chains_submissions() {
    init_logging();
    let device = HeadlessDevice::new(&BackendConfig::default());
    let shadow_done = device.create_semaphore().unwrap();

    let shadow = device.create_command_buffer("shadow").unwrap();
    let shadow_fence = device.create_fence().unwrap();
    device.begin_command_buffer(shadow).unwrap();
    device.end_command_buffer(shadow).unwrap();
    device
        .submit(&SubmitInfo {
            command_buffer: shadow,
            wait_semaphores: &[],
            signal_semaphores: &[shadow_done],
            fence: Some(shadow_fence),
        })
        .unwrap();

    let lighting_fence = submit_frame(&device, 2, &[shadow_done]);
    device
        .wait_fence(lighting_fence, Some(Duration::from_secs(5)))
        .unwrap();
    assert!(device.is_fence_signaled(shadow_fence));
    assert_eq!(
        device.command_buffer_state(shadow),
        Some(CommandBufferState::Executable)
    );
}

#[test]
fn presentation_waits_for_the_acquired_image() {
    init_logging();
    let device = Arc::new(HeadlessDevice::new(&BackendConfig::default()));
    let swapchain = HeadlessSwapChain::new(
        Arc::clone(&device),
        TextureFormat::Bgra8UnormSrgb,
        Extent2D::new(320, 180),
        3,
    )
    .unwrap();
    let acquired = swapchain.image_acquired_semaphore().unwrap();

    let mut images = Vec::new();
    for _ in 0..4 {
        images.push(swapchain.acquire_next_image().unwrap());
        let fence = submit_frame(device.as_ref(), 1, &[acquired]);
        device.wait_fence(fence, Some(Duration::from_secs(5))).unwrap();
    }
    assert_eq!(images, vec![0, 1, 2, 0]);
}

#[test]
fn unsignalled_wait_blocks_until_signal() {
    init_logging();
    let device = HeadlessDevice::new(&BackendConfig::default());
    let upload_done = device.create_semaphore().unwrap();
    let fence = submit_frame(&device, 1, &[upload_done]);

    assert!(device
        .wait_fence(fence, Some(Duration::from_millis(20)))
        .is_err());
    device.signal_semaphore(upload_done).unwrap();
    device.wait_fence(fence, Some(Duration::from_secs(5))).unwrap();
}
