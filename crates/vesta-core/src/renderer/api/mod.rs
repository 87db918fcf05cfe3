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

//! Data types exchanged between the command list engine and the backends.

pub mod command;
pub mod descriptor;
pub mod pipeline;
pub mod resource;
pub mod shader;
pub mod util;

pub use self::command::*;
pub use self::descriptor::*;
pub use self::pipeline::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, ColorWrites, CompareFunction,
    CullMode, DepthBiasState, DepthStencilState, FrontFace, InputLayout, PipelineDescription,
    PipelineState, PolygonMode, PrimitiveTopology, RasterizerState, StencilFaceState,
    StencilOperation, VertexAttribute, VertexFormat,
};
pub use self::resource::*;
pub use self::shader::*;
pub use self::util::{
    IndexFormat, ShaderStage, ShaderStageFlags, TextureFormat, TextureLayout, TextureUsage,
};
