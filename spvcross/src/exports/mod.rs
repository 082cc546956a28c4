//! The exported `sc_*` functions
//!
//! Every fallible export ends in an `error: *mut ScString` parameter and
//! returns an [`ScResult`]. On success `*error` is cleared to `{0, null}`;
//! on failure it holds a message allocated with the handle's allocator.

use crate::array::ScString;
use crate::handle::ScCompiler;
use crate::result::guard;
use crate::{Error, Result, ScResult};
use spvcrs::spirv::ExecutionModel;

mod compiler;
mod decorations;
mod entry_points;
mod resources;
mod state;
mod types;

#[cfg(feature = "glsl")]
mod glsl;
#[cfg(feature = "hlsl")]
mod hlsl;
#[cfg(feature = "msl")]
mod msl;

pub use compiler::*;
pub use decorations::*;
pub use entry_points::*;
pub use resources::*;
pub use state::*;
pub use types::*;

#[cfg(feature = "glsl")]
pub use glsl::*;
#[cfg(feature = "hlsl")]
pub use hlsl::*;
#[cfg(feature = "msl")]
pub use msl::*;

pub(crate) fn execution_model(code: u32) -> Result<ExecutionModel> {
    ExecutionModel::from_u32(code).ok_or(Error::InvalidCode {
        kind: "execution model",
        code,
    })
}

/// Stores `value` through an out-pointer.
pub(crate) unsafe fn write<T>(out: *mut T, value: T) -> Result<()> {
    if out.is_null() {
        return Err(Error::NullPointer("result"));
    }
    out.write(value);
    Ok(())
}

/// Runs `body` on the handle behind `compiler`.
pub(crate) unsafe fn with_compiler<F>(
    compiler: *const ScCompiler,
    error: *mut ScString,
    body: F,
) -> ScResult
where
    F: FnOnce(&ScCompiler) -> Result<()>,
{
    guard(ScCompiler::allocator_of(compiler), error, || {
        body(ScCompiler::from_ptr(compiler)?)
    })
}

pub(crate) unsafe fn with_compiler_mut<F>(
    compiler: *mut ScCompiler,
    error: *mut ScString,
    body: F,
) -> ScResult
where
    F: FnOnce(&mut ScCompiler) -> Result<()>,
{
    guard(ScCompiler::allocator_of(compiler), error, || {
        body(ScCompiler::from_mut_ptr(compiler)?)
    })
}

/// Defines `sc_compiler_<name>`, which evaluates `$body` against the shared
/// compiler and stores the value in `*result`. The two-binding form also
/// gets the handle's allocator for values that need host memory.
macro_rules! getter {
    ($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*) -> $out:ty, |$c:ident| $body:expr) => {
        paste::paste! {
            $(#[$meta])*
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<sc_compiler_ $name>](
                compiler: *const ScCompiler,
                $($arg: $ty,)*
                result: *mut $out,
                error: *mut ScString,
            ) -> ScResult {
                $crate::exports::with_compiler(compiler, error, |handle| {
                    let $c = handle.base();
                    let value: $out = $body;
                    $crate::exports::write(result, value)
                })
            }
        }
    };
    ($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*) -> $out:ty, |$c:ident, $alloc:ident| $body:expr) => {
        paste::paste! {
            $(#[$meta])*
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<sc_compiler_ $name>](
                compiler: *const ScCompiler,
                $($arg: $ty,)*
                result: *mut $out,
                error: *mut ScString,
            ) -> ScResult {
                $crate::exports::with_compiler(compiler, error, |handle| {
                    let $c = handle.base();
                    let $alloc = handle.allocator();
                    let value: $out = $body;
                    $crate::exports::write(result, value)
                })
            }
        }
    };
}

/// Defines `sc_compiler_<name>`, which runs `$body` against the shared
/// compiler for its side effect.
macro_rules! setter {
    ($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*), |$c:ident| $body:expr) => {
        paste::paste! {
            $(#[$meta])*
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn [<sc_compiler_ $name>](
                compiler: *mut ScCompiler,
                $($arg: $ty,)*
                error: *mut ScString,
            ) -> ScResult {
                $crate::exports::with_compiler_mut(compiler, error, |handle| {
                    let $c = handle.base_mut();
                    let () = $body;
                    Ok(())
                })
            }
        }
    };
}

pub(crate) use {getter, setter};
