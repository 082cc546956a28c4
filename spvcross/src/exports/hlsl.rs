//! HLSL handle options and root constants

use super::{with_compiler, with_compiler_mut, write};
use crate::array::{ScArray, ScString};
use crate::handle::ScCompiler;
use crate::options::{ScHlslRootConstant, ScOptionsHlsl};
use crate::{Error, ScResult};

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_hlsl_get_options(
    compiler: *const ScCompiler,
    result: *mut ScOptionsHlsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        write(result, ScOptionsHlsl::from(handle.hlsl()?.options()))
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_hlsl_set_options(
    compiler: *mut ScCompiler,
    options: *const ScOptionsHlsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let options = options.as_ref().ok_or(Error::NullPointer("options"))?;
        let hlsl = handle.hlsl_mut()?;
        let mut native = hlsl.options().clone();
        options.apply(&mut native);
        hlsl.set_options(native);
        Ok(())
    })
}

/// Places the push constant block. An empty layout restores the default
/// register.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_hlsl_set_root_constant_layout(
    compiler: *mut ScCompiler,
    constants: ScArray<ScHlslRootConstant>,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let layout = constants
            .as_slice("constants")?
            .iter()
            .map(Into::into)
            .collect();
        handle.hlsl_mut()?.set_root_constant_layout(layout);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::exports::sc_compiler_compile;
    use crate::handle::Compiler;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use std::ptr;

    fn hlsl(words: &[u32]) -> ScCompiler {
        let compiler = spvcrs::HlslCompiler::new(words).unwrap();
        ScCompiler::new(Compiler::Hlsl(compiler), allocator())
    }

    unsafe fn source(handle: &mut ScCompiler) -> String {
        let mut output = ScString::empty();
        let code = sc_compiler_compile(handle, &mut output, ptr::null_mut());
        assert_eq!(code, ScResult::Success);
        String::from_utf8(std::slice::from_raw_parts(output.ptr, output.length).to_vec()).unwrap()
    }

    #[test]
    fn test_options_round_trip() {
        let mut handle = hlsl(&fixtures::compute_shader());
        let mut options = ScOptionsHlsl::default();
        unsafe {
            sc_compiler_hlsl_get_options(&handle, &mut options, ptr::null_mut());
            assert_eq!(options.shader_model, 50);
            options.shader_model = 60;
            options.vertex_invert_y = true;
            let code = sc_compiler_hlsl_set_options(&mut handle, &options, ptr::null_mut());
            assert_eq!(code, ScResult::Success);
            let mut read_back = ScOptionsHlsl::default();
            sc_compiler_hlsl_get_options(&handle, &mut read_back, ptr::null_mut());
            assert_eq!(read_back, options);
        }
    }

    #[test]
    fn test_root_constant_layout() {
        let mut handle = hlsl(&fixtures::fragment_shader());
        let mut layout = [ScHlslRootConstant {
            start: 0,
            end: 4,
            binding: 5,
            space: 2,
        }];
        let constants = ScArray {
            length: layout.len(),
            ptr: layout.as_mut_ptr(),
        };
        unsafe {
            assert!(source(&mut handle).contains("register(b1)"));
            let code =
                sc_compiler_hlsl_set_root_constant_layout(&mut handle, constants, ptr::null_mut());
            assert_eq!(code, ScResult::Success);
            assert!(source(&mut handle).contains("register(b5"));
        }
    }

    #[test]
    fn test_null_options() {
        let mut handle = hlsl(&fixtures::compute_shader());
        let mut error = ScString::empty();
        let code = unsafe { sc_compiler_hlsl_set_options(&mut handle, ptr::null(), &mut error) };
        assert_eq!(code, ScResult::Error);
        assert!(!error.is_empty());
    }
}
