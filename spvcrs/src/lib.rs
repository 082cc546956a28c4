//! SPIR-V reflection and cross-compilation
//!
//! This crate parses SPIR-V into an editable module, answers reflection
//! queries about it (resources, decorations, types, entry points,
//! specialization constants) and re-emits it as GLSL, HLSL or MSL through
//! naga's backends.
//!
//! # Example
//!
//! ```no_run
//! use spvcrs::{Compiler, GlslCompiler};
//!
//! # fn load() -> Vec<u32> { Vec::new() }
//! let words: Vec<u32> = load();
//!
//! // Reflect on the shader
//! let compiler = Compiler::new(&words).unwrap();
//! for buffer in compiler.get_shader_resources().unwrap().uniform_buffers {
//!     println!("{} (id {})", buffer.name, buffer.id);
//! }
//!
//! // Emit GLSL for its first entry point
//! let mut glsl = GlslCompiler::new(&words).unwrap();
//! println!("{}", glsl.compile().unwrap());
//! ```

mod compiler;
mod error;
pub mod ir;
mod lower;

#[cfg(feature = "glsl")]
mod glsl;
#[cfg(feature = "hlsl")]
mod hlsl;
#[cfg(feature = "msl")]
mod msl;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use compiler::{
    BaseType, BufferRange, CombinedImageSampler, Compiler, EntryPoint, ImageInfo, Resource,
    ShaderResources, SpecializationConstant, TypeInfo, WorkgroupSize,
};
pub use compiler::{COUNTER_BUFFER, USER_SEMANTIC, USER_TYPE};
pub use error::{Error, Result};
#[cfg(feature = "glsl")]
pub use glsl::{GlslCompiler, GlslFragmentOptions, GlslOptions, GlslVertexOptions, Precision};
#[cfg(feature = "hlsl")]
pub use hlsl::{HlslCompiler, HlslOptions, RootConstant};
#[cfg(feature = "msl")]
pub use msl::{MslCompiler, MslOptions, MslResourceBinding, MslVertexAttr};

pub use spirv;
