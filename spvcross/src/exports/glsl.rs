//! GLSL handle options and source extras

use super::{with_compiler, with_compiler_mut, write};
use crate::array::ScString;
use crate::handle::ScCompiler;
use crate::options::ScOptionsGlsl;
use crate::{Error, ScResult};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_get_options(
    compiler: *const ScCompiler,
    result: *mut ScOptionsGlsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        write(result, ScOptionsGlsl::from(handle.glsl()?.options()))
    })
}

/// Replaces the mirrored options. Options the mirror does not carry keep
/// their current values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_set_options(
    compiler: *mut ScCompiler,
    options: *const ScOptionsGlsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let options = options.as_ref().ok_or(Error::NullPointer("options"))?;
        let glsl = handle.glsl_mut()?;
        let mut native = glsl.options().clone();
        options.apply(&mut native)?;
        glsl.set_options(native);
        Ok(())
    })
}

/// The source written by the last successful compile, empty before one.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_get_partial_source(
    compiler: *const ScCompiler,
    result: *mut ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        let source = handle.allocator().string(handle.glsl()?.get_partial_source())?;
        write(result, source)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_add_header_line(
    compiler: *mut ScCompiler,
    line: ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let line = line.as_str("line")?;
        handle.glsl_mut()?.add_header_line(line);
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_glsl_require_extension(
    compiler: *mut ScCompiler,
    name: ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let name = name.as_str("name")?;
        handle.glsl_mut()?.require_extension(name);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::exports::sc_compiler_compile;
    use crate::handle::Compiler;
    use crate::options::SC_PRECISION_LOWP;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use std::ptr;

    fn glsl() -> ScCompiler {
        let compiler = spvcrs::GlslCompiler::new(&fixtures::compute_shader()).unwrap();
        ScCompiler::new(Compiler::Glsl(compiler), allocator())
    }

    unsafe fn string(value: ScString) -> String {
        if value.length == 0 {
            return String::new();
        }
        String::from_utf8(std::slice::from_raw_parts(value.ptr, value.length).to_vec()).unwrap()
    }

    #[test]
    fn test_options_round_trip() {
        let mut handle = glsl();
        let mut options = ScOptionsGlsl::default();
        unsafe {
            let code = sc_compiler_glsl_get_options(&handle, &mut options, ptr::null_mut());
            assert_eq!(code, ScResult::Success);
            assert_eq!(options.version, 450);

            options.version = 310;
            options.es = true;
            options.fragment.default_float_precision = SC_PRECISION_LOWP;
            let code = sc_compiler_glsl_set_options(&mut handle, &options, ptr::null_mut());
            assert_eq!(code, ScResult::Success);

            let mut read_back = ScOptionsGlsl::default();
            sc_compiler_glsl_get_options(&handle, &mut read_back, ptr::null_mut());
            assert_eq!(read_back, options);
        }
    }

    #[test]
    fn test_invalid_precision_keeps_options() {
        let mut handle = glsl();
        let mut options = ScOptionsGlsl::default();
        let mut error = ScString::empty();
        unsafe {
            sc_compiler_glsl_get_options(&handle, &mut options, ptr::null_mut());
            let before = options;
            options.version = 100;
            options.fragment.default_int_precision = 42;
            let code = sc_compiler_glsl_set_options(&mut handle, &options, &mut error);
            assert_eq!(code, ScResult::Error);
            assert!(!error.is_empty());

            let mut read_back = ScOptionsGlsl::default();
            sc_compiler_glsl_get_options(&handle, &mut read_back, ptr::null_mut());
            assert_eq!(read_back, before);
        }
    }

    #[test]
    fn test_partial_source_follows_compile() {
        let mut handle = glsl();
        let mut partial = ScString::empty();
        let mut output = ScString::empty();
        unsafe {
            sc_compiler_glsl_get_partial_source(&handle, &mut partial, ptr::null_mut());
            assert!(partial.ptr.is_null());

            let extension = allocator().string("GL_EXT_example").unwrap();
            sc_compiler_glsl_require_extension(&mut handle, extension, ptr::null_mut());
            let line = allocator().string("// generated").unwrap();
            sc_compiler_glsl_add_header_line(&mut handle, line, ptr::null_mut());
            let code = sc_compiler_compile(&mut handle, &mut output, ptr::null_mut());
            assert_eq!(code, ScResult::Success);

            sc_compiler_glsl_get_partial_source(&handle, &mut partial, ptr::null_mut());
            let source = string(output);
            assert_eq!(string(partial), source);
            assert!(source.contains("#extension GL_EXT_example : require"));
            assert!(source.contains("// generated"));
        }
    }

    #[test]
    fn test_wrong_dialect() {
        let compiler = spvcrs::Compiler::new(&fixtures::compute_shader()).unwrap();
        let handle = ScCompiler::new(Compiler::Reflection(compiler), allocator());
        let mut options = ScOptionsGlsl::default();
        let mut error = ScString::empty();
        unsafe {
            let code = sc_compiler_glsl_get_options(&handle, &mut options, &mut error);
            assert_eq!(code, ScResult::Error);
            assert!(string(error).contains("GLSL"));
        }
    }
}
