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

//! CPU-side fences and semaphores for the simulated queue.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// A counter guarded by a mutex and a condition variable.
///
/// Fences use it as a flag (signal sets it to one, reset to zero, waits do not consume);
/// semaphores use it as a count (signal increments, waits consume one).
#[derive(Debug, Default)]
pub(crate) struct SyncPrimitive {
    value: Mutex<u64>,
    changed: Condvar,
}

impl SyncPrimitive {
    pub fn new(value: u64) -> Self {
        Self {
            value: Mutex::new(value),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn value(&self) -> u64 {
        *self.lock()
    }

    /// Fence signal.
    pub fn set(&self) {
        *self.lock() = 1;
        self.changed.notify_all();
    }

    /// Fence reset.
    pub fn clear(&self) {
        *self.lock() = 0;
    }

    /// Semaphore signal.
    pub fn increment(&self) {
        *self.lock() += 1;
        self.changed.notify_all();
    }

    /// Waits until the value is non-zero. Returns `false` on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        self.wait_then(timeout, |_| {})
    }

    /// Waits until the value is non-zero, then consumes one unit. Returns `false` on timeout.
    pub fn wait_and_decrement(&self, timeout: Option<Duration>) -> bool {
        self.wait_then(timeout, |v| *v -= 1)
    }

    fn wait_then(&self, timeout: Option<Duration>, on_ready: impl FnOnce(&mut u64)) -> bool {
        let guard = self.lock();
        let mut guard = match timeout {
            None => match self.changed.wait_while(guard, |v| *v == 0) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            },
            Some(timeout) => {
                let (guard, result) =
                    match self.changed.wait_timeout_while(guard, timeout, |v| *v == 0) {
                        Ok(r) => r,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                if result.timed_out() && *guard == 0 {
                    return false;
                }
                guard
            }
        };
        on_ready(&mut guard);
        true
    }
}
