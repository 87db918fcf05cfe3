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

//! A CPU profiler for the time blocks opened by command list markers.

use ahash::AHashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use vesta_core::renderer::Profiler;

/// A closed time block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBlock {
    /// Names of the enclosing blocks and this one, joined with `/`.
    pub path: String,
    /// Nesting depth, 0 for top-level blocks.
    pub depth: usize,
    pub duration: Duration,
}

/// Accumulated timings of one block path across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl BlockStats {
    /// Mean duration, zero if the block never closed.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total / self.count as u32
    }

    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.max = self.max.max(duration);
    }
}

#[derive(Debug)]
struct OpenBlock {
    path: String,
    started: Instant,
}

#[derive(Debug, Default)]
struct State {
    open: Vec<OpenBlock>,
    closed: Vec<TimeBlock>,
    totals: AHashMap<String, BlockStats>,
    frames: u64,
}

/// Measures nested time blocks on the CPU.
///
/// Blocks are grouped into frames by [`FrameProfiler::end_frame`]; totals keep
/// accumulating across frames until [`FrameProfiler::reset`].
#[derive(Debug, Default)]
pub struct FrameProfiler {
    state: Mutex<State>,
}

impl FrameProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Profiler mutex poisoned, recovering.");
            poisoned.into_inner()
        })
    }

    /// Closes the current frame and returns its blocks in the order they were closed.
    ///
    /// Blocks still open stay open and are reported by the frame that closes them.
    pub fn end_frame(&self) -> Vec<TimeBlock> {
        let mut state = self.lock();
        if !state.open.is_empty() {
            log::warn!(
                "Frame ended with {} open time block(s): {}",
                state.open.len(),
                state.open.last().map_or("", |b| b.path.as_str())
            );
        }
        state.frames += 1;
        std::mem::take(&mut state.closed)
    }

    /// Number of blocks currently open.
    pub fn open_depth(&self) -> usize {
        self.lock().open.len()
    }

    /// Number of frames ended so far.
    pub fn frames(&self) -> u64 {
        self.lock().frames
    }

    /// Accumulated timings for `path`.
    pub fn stats(&self, path: &str) -> Option<BlockStats> {
        self.lock().totals.get(path).copied()
    }

    /// All accumulated timings, most expensive first.
    pub fn report(&self) -> Vec<(String, BlockStats)> {
        let mut report: Vec<_> = self
            .lock()
            .totals
            .iter()
            .map(|(path, stats)| (path.clone(), *stats))
            .collect();
        report.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(&b.0)));
        report
    }

    /// Drops every timing, open blocks included.
    pub fn reset(&self) {
        *self.lock() = State::default();
    }
}

impl Profiler for FrameProfiler {
    fn time_block_start(&self, name: &str) {
        let mut state = self.lock();
        let path = match state.open.last() {
            Some(parent) => format!("{}/{name}", parent.path),
            None => name.to_string(),
        };
        state.open.push(OpenBlock {
            path,
            started: Instant::now(),
        });
    }

    fn time_block_end(&self) -> bool {
        let mut state = self.lock();
        let Some(block) = state.open.pop() else {
            return false;
        };
        let duration = block.started.elapsed();
        let depth = state.open.len();
        state
            .totals
            .entry(block.path.clone())
            .or_default()
            .record(duration);
        state.closed.push(TimeBlock {
            path: block.path,
            depth,
            duration,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_build_paths() {
        let profiler = FrameProfiler::new();
        profiler.time_block_start("frame");
        profiler.time_block_start("gbuffer");
        assert_eq!(profiler.open_depth(), 2);
        assert!(profiler.time_block_end());
        profiler.time_block_start("lighting");
        assert!(profiler.time_block_end());
        assert!(profiler.time_block_end());

        let blocks = profiler.end_frame();
        let paths: Vec<_> = blocks.iter().map(|b| (b.path.as_str(), b.depth)).collect();
        assert_eq!(
            paths,
            vec![("frame/gbuffer", 1), ("frame/lighting", 1), ("frame", 0)]
        );
        assert!(blocks[2].duration >= blocks[0].duration);
    }

    #[test]
    fn unmatched_end_is_reported() {
        let profiler = FrameProfiler::new();
        assert!(!profiler.time_block_end());
    }

    #[test]
    fn totals_accumulate_across_frames() {
        let profiler = FrameProfiler::new();
        for _ in 0..3 {
            profiler.time_block_start("ssao");
            profiler.time_block_end();
            profiler.end_frame();
        }
        let stats = profiler.stats("ssao").unwrap();
        assert_eq!(stats.count, 3);
        assert!(stats.max <= stats.total);
        assert_eq!(profiler.frames(), 3);
        assert_eq!(profiler.report().len(), 1);

        profiler.reset();
        assert!(profiler.stats("ssao").is_none());
    }

    #[test]
    fn open_blocks_carry_over() {
        let profiler = FrameProfiler::new();
        profiler.time_block_start("upload");
        assert!(profiler.end_frame().is_empty());
        profiler.time_block_end();
        assert_eq!(profiler.end_frame().len(), 1);
    }
}
