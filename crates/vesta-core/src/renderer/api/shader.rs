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

//! Shader compilation state and the completion signal reflection waits on.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// The compilation state of a shader object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompilationState {
    /// Not submitted for compilation yet.
    #[default]
    Idle,
    /// Compilation is running, possibly on another thread.
    Compiling,
    /// Compilation finished and the shader is usable.
    Succeeded,
    /// Compilation finished with errors.
    Failed(String),
}

impl CompilationState {
    /// Returns `true` once compilation is over, whatever its outcome.
    pub fn is_finished(&self) -> bool {
        matches!(self, CompilationState::Succeeded | CompilationState::Failed(_))
    }
}

/// A blocking completion signal tied to an asynchronous compile task.
///
/// The compile task calls [`CompilationSignal::set`]; readers call
/// [`CompilationSignal::wait`], which sleeps on a condition variable until the
/// state leaves [`CompilationState::Compiling`].
#[derive(Debug, Default)]
pub struct CompilationSignal {
    state: Mutex<CompilationState>,
    changed: Condvar,
}

impl CompilationSignal {
    /// Creates a signal in the given state.
    pub fn new(state: CompilationState) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    /// Returns the current state.
    pub fn get(&self) -> CompilationState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Publishes a new state and wakes every waiter.
    pub fn set(&self, state: CompilationState) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = state;
        self.changed.notify_all();
    }

    /// Blocks until the state is no longer [`CompilationState::Compiling`] and returns it.
    pub fn wait(&self) -> CompilationState {
        let guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let guard = match self
            .changed
            .wait_while(guard, |s| *s == CompilationState::Compiling)
        {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    /// Like [`CompilationSignal::wait`] but gives up after `timeout`.
    ///
    /// Returns the state observed when the wait ended, which may still be `Compiling`.
    pub fn wait_timeout(&self, timeout: Duration) -> CompilationState {
        let guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (guard, _) = match self.changed.wait_timeout_while(guard, timeout, |s| {
            *s == CompilationState::Compiling
        }) {
            Ok(result) => result,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_returns_immediately_when_not_compiling() {
        let signal = CompilationSignal::new(CompilationState::Succeeded);
        assert_eq!(signal.wait(), CompilationState::Succeeded);
        assert!(signal.get().is_finished());
    }

    #[test]
    fn wait_blocks_until_compile_task_publishes() {
        let signal = Arc::new(CompilationSignal::new(CompilationState::Compiling));
        let task = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.set(CompilationState::Failed("syntax error".into()));
            })
        };
        assert_eq!(signal.wait(), CompilationState::Failed("syntax error".into()));
        task.join().unwrap();
    }

    #[test]
    fn wait_timeout_reports_still_compiling() {
        let signal = CompilationSignal::new(CompilationState::Compiling);
        assert_eq!(
            signal.wait_timeout(Duration::from_millis(5)),
            CompilationState::Compiling
        );
    }
}
