//! Construction, destruction and emission

use super::{getter, with_compiler_mut, write};
use crate::alloc::{Allocator, ScGcCallbacks};
use crate::array::{ScArray, ScString};
use crate::handle::{Compiler, ScCompiler};
use crate::result::guard;
use crate::{Error, ScResult};

/// Builds a handle from `ir` with `build` and stores it in `*result`. The
/// out-pointer is left alone on failure.
unsafe fn new_handle<F>(
    ir: ScArray<u32>,
    callbacks: ScGcCallbacks,
    result: *mut *mut ScCompiler,
    error: *mut ScString,
    build: F,
) -> ScResult
where
    F: FnOnce(&[u32]) -> spvcrs::Result<Compiler>,
{
    guard(Allocator::new(&callbacks).ok(), error, || {
        let alloc = Allocator::new(&callbacks)?;
        if result.is_null() {
            return Err(Error::NullPointer("result"));
        }
        let words = ir.as_slice("ir")?;
        let compiler = build(words)?;
        let handle = ScCompiler::new(compiler, alloc);
        log::debug!(
            "created {} compiler from {} words",
            handle.dialect(),
            words.len()
        );
        *result = Box::into_raw(Box::new(handle));
        Ok(())
    })
}

/// Creates a compiler that only reflects on and edits the module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_new(
    ir: ScArray<u32>,
    callbacks: ScGcCallbacks,
    result: *mut *mut ScCompiler,
    error: *mut ScString,
) -> ScResult {
    new_handle(ir, callbacks, result, error, |words| {
        Ok(Compiler::Reflection(spvcrs::Compiler::new(words)?))
    })
}

#[cfg(feature = "glsl")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_new(
    ir: ScArray<u32>,
    callbacks: ScGcCallbacks,
    result: *mut *mut ScCompiler,
    error: *mut ScString,
) -> ScResult {
    new_handle(ir, callbacks, result, error, |words| {
        Ok(Compiler::Glsl(spvcrs::GlslCompiler::new(words)?))
    })
}

#[cfg(feature = "hlsl")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_hlsl_new(
    ir: ScArray<u32>,
    callbacks: ScGcCallbacks,
    result: *mut *mut ScCompiler,
    error: *mut ScString,
) -> ScResult {
    new_handle(ir, callbacks, result, error, |words| {
        Ok(Compiler::Hlsl(spvcrs::HlslCompiler::new(words)?))
    })
}

#[cfg(feature = "msl")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_msl_new(
    ir: ScArray<u32>,
    callbacks: ScGcCallbacks,
    result: *mut *mut ScCompiler,
    error: *mut ScString,
) -> ScResult {
    new_handle(ir, callbacks, result, error, |words| {
        Ok(Compiler::Msl(spvcrs::MslCompiler::new(words)?))
    })
}

/// Frees a handle. Null is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_delete(compiler: *mut ScCompiler) {
    if compiler.is_null() {
        return;
    }
    let handle = Box::from_raw(compiler);
    log::debug!("deleting {} compiler", handle.dialect());
    drop(handle);
}

/// Emits the handle's target: dialect source, or the edited module as
/// little-endian SPIR-V bytes for a reflection handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_compile(
    compiler: *mut ScCompiler,
    result: *mut ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let alloc = handle.allocator();
        let bytes: Vec<u8> = match handle.compiler_mut() {
            Compiler::Reflection(compiler) => compiler
                .compile()
                .iter()
                .flat_map(|word| word.to_le_bytes())
                .collect(),
            #[cfg(feature = "glsl")]
            Compiler::Glsl(compiler) => compiler.compile()?.into_bytes(),
            #[cfg(feature = "hlsl")]
            Compiler::Hlsl(compiler) => compiler.compile()?.into_bytes(),
            #[cfg(feature = "msl")]
            Compiler::Msl(compiler) => compiler.compile()?.into_bytes(),
        };
        write(result, alloc.array(&bytes)?)
    })
}

getter!(get_current_id_bound() -> u32, |c| c.current_id_bound());

getter!(
    /// `Capability` codes in declaration order.
    get_declared_capabilities() -> ScArray<u32>,
    |c, alloc| alloc.array(c.declared_capabilities())?
);

getter!(
    get_declared_extensions() -> ScArray<ScString>,
    |c, alloc| alloc.collect(c.declared_extensions(), |name| alloc.string(name))?
);
