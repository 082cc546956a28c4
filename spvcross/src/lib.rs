//! C ABI for the spvcrs SPIR-V cross-compiler
//!
//! Every export takes an opaque [`ScCompiler`] handle and reports through an
//! [`ScResult`] code plus an optional error string. Strings and arrays
//! handed back to the caller are allocated with the caller's own allocator
//! callback ([`ScGcCallbacks`]), so a host with a garbage collector owns
//! them from the moment they are returned. Compiler objects stay on the
//! Rust heap until `sc_compiler_delete`.

#![allow(clippy::missing_safety_doc)]
#![allow(unsafe_op_in_unsafe_fn)]

mod alloc;
mod array;
mod exports;
mod handle;
mod options;
mod records;
mod result;

pub use alloc::ScGcCallbacks;
pub use array::{ScArray, ScString};
pub use exports::*;
pub use handle::{Dialect, ScCompiler};
pub use options::*;
pub use records::*;
pub use result::{Error, Result, ScResult};
