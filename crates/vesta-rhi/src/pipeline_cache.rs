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

//! Pipelines keyed by the content hash of their state.

use crate::pipeline::Pipeline;
use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use vesta_core::renderer::{PipelineError, PipelineState, RhiDevice, RhiError, ShaderShift};

/// A pipeline shared between the cache and the command lists that bind it.
pub type SharedPipeline = Arc<Mutex<Pipeline>>;

/// Creates each distinct pipeline once and hands the same instance out afterwards.
///
/// Entries are never evicted; [`PipelineCache::clear`] drops all of them at once when
/// the render targets they were built for go away (resize, device loss).
pub struct PipelineCache {
    device: Arc<dyn RhiDevice>,
    shift: ShaderShift,
    pipelines: Mutex<AHashMap<u64, SharedPipeline>>,
}

impl std::fmt::Debug for PipelineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCache")
            .field("pipelines", &self.len())
            .finish_non_exhaustive()
    }
}

impl PipelineCache {
    /// Creates an empty cache building pipelines on `device`.
    pub fn new(device: Arc<dyn RhiDevice>, shift: ShaderShift) -> Self {
        Self {
            device,
            shift,
            pipelines: Mutex::new(AHashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, AHashMap<u64, SharedPipeline>>, PipelineError> {
        self.pipelines
            .lock()
            .map_err(|e| PipelineError::CacheUnavailable(format!("Mutex poisoned: {e}")))
    }

    /// Returns the pipeline for `state`, creating it on first request.
    ///
    /// ## Errors
    /// * `PipelineError` - If the state is invalid or the pipeline can't be built. Nothing
    ///   is cached in that case, so a later request retries.
    pub fn get_pipeline(&self, state: &PipelineState) -> Result<SharedPipeline, PipelineError> {
        let hash = state.pipeline_hash();
        let mut pipelines = self.lock()?;
        if let Some(pipeline) = pipelines.get(&hash) {
            return Ok(Arc::clone(pipeline));
        }

        log::debug!("Pipeline cache miss for {hash:#018x}.");
        let pipeline = Arc::new(Mutex::new(Pipeline::new(
            Arc::clone(&self.device),
            state,
            self.shift,
        )?));
        pipelines.insert(hash, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Returns `true` if a pipeline for `hash` exists.
    pub fn contains(&self, hash: u64) -> bool {
        self.lock().map(|p| p.contains_key(&hash)).unwrap_or(false)
    }

    /// Number of cached pipelines.
    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for the queue to go idle and drops every pipeline.
    ///
    /// Pipelines still bound by a command list are destroyed when that list releases them.
    pub fn clear(&self) -> Result<(), RhiError> {
        self.device.queue_wait_idle()?;
        let mut pipelines = self
            .pipelines
            .lock()
            .map_err(|e| RhiError::Backend(format!("Mutex poisoned (pipeline cache): {e}")))?;
        let count = pipelines.len();
        pipelines.clear();
        log::info!("Pipeline cache cleared ({count} pipelines).");
        Ok(())
    }
}
