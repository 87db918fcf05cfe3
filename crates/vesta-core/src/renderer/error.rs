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

//! Defines the hierarchy of error types for the render hardware interface.

use crate::renderer::api::ResourceId;
use std::fmt;

/// An error related to the compilation state of a shader object.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// The shader source failed to compile into a backend-specific module.
    CompilationFailed {
        /// The name of the shader.
        name: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// The shader was never submitted for compilation.
    NotCompiled {
        /// The name of the shader.
        name: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailed { name, details } => {
                write!(f, "Shader compilation failed for '{name}': {details}")
            }
            ShaderError::NotCompiled { name } => {
                write!(f, "Shader '{name}' has not been compiled")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the resolution or creation of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The pipeline state has no vertex shader.
    MissingVertexShader,
    /// The pipeline state references neither a color target, a depth target nor a swap chain.
    MissingRenderTarget,
    /// One of the pipeline's shaders is not usable.
    Shader(ShaderError),
    /// The backend refused to create the native pipeline object.
    CreationFailed {
        /// The hash of the pipeline state that failed.
        hash: u64,
        /// Detailed error messages from the backend.
        details: String,
    },
    /// The pipeline cache could not be accessed.
    CacheUnavailable(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingVertexShader => {
                write!(f, "Pipeline state is missing a vertex shader")
            }
            PipelineError::MissingRenderTarget => {
                write!(f, "Pipeline state has no render target")
            }
            PipelineError::Shader(err) => write!(f, "Pipeline shader error: {err}"),
            PipelineError::CreationFailed { hash, details } => {
                write!(f, "Pipeline creation failed for state {hash:#018x}: {details}")
            }
            PipelineError::CacheUnavailable(msg) => {
                write!(f, "Pipeline cache unavailable: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for PipelineError {
    fn from(err: ShaderError) -> Self {
        PipelineError::Shader(err)
    }
}

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The resource could not be found.
    NotFound(ResourceId),
    /// A texture or swap chain was created with a zero-sized dimension.
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// An attempt was made to access a resource out of its bounds (e.g., in a buffer).
    OutOfBounds {
        /// Offset plus length of the access.
        end: u64,
        /// Size of the resource.
        size: u64,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(id) => write!(f, "Resource not found with ID {id}."),
            ResourceError::InvalidDimensions { width, height } => {
                write!(f, "Invalid resource dimensions {width}x{height}.")
            }
            ResourceError::OutOfBounds { end, size } => {
                write!(f, "Resource access out of bounds ({end} > {size}).")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A failure reported by the native graphics backend.
///
/// These are the only failures the command list escalates to its caller as hard errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RhiError {
    /// The native command buffer could not begin recording.
    CommandBufferBegin(String),
    /// The native command buffer could not be finalized.
    CommandBufferEnd(String),
    /// The graphics queue rejected a submission.
    QueueSubmit(String),
    /// The next swap chain image could not be acquired.
    ImageAcquisition(String),
    /// Waiting on or resetting a fence failed.
    FenceWait(String),
    /// A fence did not signal within the configured timeout.
    FenceTimeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// The graphics device was lost.
    DeviceLost,
    /// A resource-level failure.
    Resource(ResourceError),
    /// Any other backend-specific failure.
    Backend(String),
}

impl fmt::Display for RhiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhiError::CommandBufferBegin(msg) => {
                write!(f, "Failed to begin command buffer: {msg}")
            }
            RhiError::CommandBufferEnd(msg) => write!(f, "Failed to end command buffer: {msg}"),
            RhiError::QueueSubmit(msg) => write!(f, "Queue submission failed: {msg}"),
            RhiError::ImageAcquisition(msg) => {
                write!(f, "Failed to acquire swap chain image: {msg}")
            }
            RhiError::FenceWait(msg) => write!(f, "Fence wait failed: {msg}"),
            RhiError::FenceTimeout { timeout_ms } => {
                write!(f, "Fence was not signaled within {timeout_ms} ms")
            }
            RhiError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RhiError::Resource(err) => write!(f, "Graphics resource operation failed: {err}"),
            RhiError::Backend(msg) => write!(f, "Backend error: {msg}"),
        }
    }
}

impl std::error::Error for RhiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RhiError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RhiError {
    fn from(err: ResourceError) -> Self {
        RhiError::Resource(err)
    }
}

/// An error raised while loading [`RhiSettings`](crate::RhiSettings).
#[derive(Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    Io {
        /// The path that failed to load.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The settings text is not valid RON for the settings schema.
    Parse(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "Failed to read settings from '{path}': {source}")
            }
            SettingsError::Parse(msg) => write!(f, "Failed to parse settings: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io { source, .. } => Some(source),
            SettingsError::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationFailed {
            name: "gbuffer.vs".to_string(),
            details: "unexpected token".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for 'gbuffer.vs': unexpected token"
        );
    }

    #[test]
    fn pipeline_error_display_wrapping_shader_error() {
        let err: PipelineError = ShaderError::NotCompiled {
            name: "ssao.ps".to_string(),
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "Pipeline shader error: Shader 'ssao.ps' has not been compiled"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn pipeline_creation_error_formats_hash_as_hex() {
        let err = PipelineError::CreationFailed {
            hash: 0xff,
            details: "out of memory".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Pipeline creation failed for state 0x00000000000000ff: out of memory"
        );
    }

    #[test]
    fn rhi_error_display_wrapping_resource_error() {
        let err: RhiError = ResourceError::OutOfBounds { end: 96, size: 64 }.into();
        assert_eq!(
            format!("{err}"),
            "Graphics resource operation failed: Resource access out of bounds (96 > 64)."
        );
        assert!(err.source().is_some());
        assert_eq!(
            format!("{}", RhiError::FenceTimeout { timeout_ms: 16 }),
            "Fence was not signaled within 16 ms"
        );
    }
}
