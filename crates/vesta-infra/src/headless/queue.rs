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

//! The simulated graphics queue: a worker thread executing submissions in order.

use super::sync::SyncPrimitive;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use vesta_core::renderer::CommandBufferHandle;

/// Work handed to the queue thread.
pub(crate) struct Submission {
    pub command_buffer: CommandBufferHandle,
    pub draw_count: u64,
    pub wait: Vec<Arc<SyncPrimitive>>,
    pub signal: Vec<Arc<SyncPrimitive>>,
    pub fence: Option<Arc<SyncPrimitive>>,
}

pub(crate) enum QueueMessage {
    Execute(Submission),
    Shutdown,
}

/// Submission and completion counters, shared with the queue thread.
#[derive(Debug, Default)]
pub(crate) struct QueueProgress {
    counts: Mutex<(u64, u64)>,
    idle: Condvar,
    pub draws_executed: AtomicU64,
    pub lost: AtomicBool,
}

impl QueueProgress {
    pub fn submitted(&self) {
        match self.counts.lock() {
            Ok(mut c) => c.0 += 1,
            Err(poisoned) => poisoned.into_inner().0 += 1,
        }
    }

    fn completed(&self) {
        match self.counts.lock() {
            Ok(mut c) => c.1 += 1,
            Err(poisoned) => poisoned.into_inner().1 += 1,
        }
        self.idle.notify_all();
    }

    pub fn executed(&self) -> u64 {
        match self.counts.lock() {
            Ok(c) => c.1,
            Err(poisoned) => poisoned.into_inner().1,
        }
    }

    /// Blocks until every submission so far has completed. Returns `false` if the
    /// queue was lost before it drained.
    pub fn wait_idle(&self) -> bool {
        let guard = match self.counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let guard = match self.idle.wait_while(guard, |(submitted, completed)| {
            completed < submitted && !self.lost.load(Ordering::Acquire)
        }) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.1 >= guard.0
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
        self.idle.notify_all();
    }
}

/// Owns the queue thread. Dropping it drains the queue and joins the thread.
pub(crate) struct Queue {
    sender: Sender<QueueMessage>,
    progress: Arc<QueueProgress>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Queue {
    pub fn spawn(
        latency: Duration,
        on_complete: impl Fn(CommandBufferHandle) + Send + 'static,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let progress = Arc::new(QueueProgress::default());
        let worker_progress = Arc::clone(&progress);
        let handle = thread::Builder::new()
            .name("vesta-headless-queue".to_string())
            .spawn(move || run(receiver, worker_progress, latency, on_complete));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn the headless queue thread: {e}");
                progress.mark_lost();
                None
            }
        };

        Self {
            sender,
            progress,
            handle,
        }
    }

    pub fn progress(&self) -> &Arc<QueueProgress> {
        &self.progress
    }

    /// Enqueues a submission. Returns `false` if the queue thread is gone.
    pub fn push(&self, submission: Submission) -> bool {
        if self.progress.lost.load(Ordering::Acquire) {
            return false;
        }
        self.progress.submitted();
        if self.sender.send(QueueMessage::Execute(submission)).is_err() {
            self.progress.mark_lost();
            return false;
        }
        true
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let _ = self.sender.send(QueueMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Headless queue thread panicked.");
            }
        }
    }
}

fn run(
    receiver: Receiver<QueueMessage>,
    progress: Arc<QueueProgress>,
    latency: Duration,
    on_complete: impl Fn(CommandBufferHandle),
) {
    log::debug!("Headless queue thread started.");
    while let Ok(message) = receiver.recv() {
        let submission = match message {
            QueueMessage::Execute(submission) => submission,
            QueueMessage::Shutdown => break,
        };

        for semaphore in &submission.wait {
            semaphore.wait_and_decrement(None);
        }
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        progress
            .draws_executed
            .fetch_add(submission.draw_count, Ordering::Relaxed);
        on_complete(submission.command_buffer);

        for semaphore in &submission.signal {
            semaphore.increment();
        }
        if let Some(fence) = &submission.fence {
            fence.set();
        }
        progress.completed();
        log::trace!(
            "Executed {:?} ({} draws)",
            submission.command_buffer,
            submission.draw_count
        );
    }
    progress.mark_lost();
    log::debug!("Headless queue thread stopped.");
}
