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

//! The stack of named scopes opened by `begin_marker` and `begin_pass`.

/// What opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// An annotation only.
    Marker,
    /// A pipeline pass; closing it finalizes the recording.
    Pass,
}

/// One open scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Name shown in captures and profiles.
    pub name: String,
    /// What opened the scope.
    pub kind: ScopeKind,
    /// A native debug marker was recorded and must be closed.
    pub native: bool,
    /// A profiler time block was opened and must be closed.
    pub profiled: bool,
}

/// Nested marker scopes, independent of the recording state.
#[derive(Debug, Default)]
pub struct MarkerStack {
    scopes: Vec<Scope>,
}

impl MarkerStack {
    /// Opens a scope.
    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Closes the innermost scope.
    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// The innermost scope.
    pub fn top(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns `true` if a pass scope is open at any depth.
    pub fn in_pass(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Pass)
    }

    /// The open scope names joined with `/`, outermost first.
    pub fn path(&self) -> String {
        self.scopes
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}
