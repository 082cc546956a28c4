//! MSL handle options and compilation with explicit bindings

use super::{with_compiler, with_compiler_mut, write};
use crate::array::{ScArray, ScString};
use crate::handle::ScCompiler;
use crate::options::{ScMslResourceBinding, ScMslVertexAttr, ScOptionsMsl};
use crate::{Error, Result, ScResult};
use spvcrs::MslVertexAttr;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_msl_get_options(
    compiler: *const ScCompiler,
    result: *mut ScOptionsMsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        write(result, ScOptionsMsl::from(handle.msl()?.options()))
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_msl_set_options(
    compiler: *mut ScCompiler,
    options: *const ScOptionsMsl,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let options = options.as_ref().ok_or(Error::NullPointer("options"))?;
        let msl = handle.msl_mut()?;
        let mut native = msl.options().clone();
        options.apply(&mut native);
        msl.set_options(native);
        Ok(())
    })
}

/// Compiles with host-provided vertex attributes and resource slots. On
/// success the `used_by_shader` flags of both arrays are written back in
/// place; on failure the arrays are left untouched.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_msl_compile(
    compiler: *mut ScCompiler,
    vertex_attrs: ScArray<ScMslVertexAttr>,
    resource_bindings: ScArray<ScMslResourceBinding>,
    result: *mut ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        if result.is_null() {
            return Err(Error::NullPointer("result"));
        }
        let host_attrs = vertex_attrs.as_mut_slice("vertex_attrs")?;
        let host_bindings = resource_bindings.as_mut_slice("resource_bindings")?;
        let mut attrs: Vec<MslVertexAttr> = host_attrs.iter().map(Into::into).collect();
        let mut bindings = host_bindings
            .iter()
            .map(ScMslResourceBinding::to_native)
            .collect::<Result<Vec<_>>>()?;

        let alloc = handle.allocator();
        let source = handle.msl_mut()?.compile_with(&mut attrs, &mut bindings)?;
        let source = alloc.string(&source)?;

        for (host, native) in host_attrs.iter_mut().zip(&attrs) {
            host.used_by_shader = native.used_by_shader;
        }
        for (host, native) in host_bindings.iter_mut().zip(&bindings) {
            host.used_by_shader = native.used_by_shader;
        }
        write(result, source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::handle::Compiler;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use spvcrs::spirv::ExecutionModel;
    use std::ptr;

    fn msl() -> ScCompiler {
        let compiler = spvcrs::MslCompiler::new(&fixtures::fragment_shader()).unwrap();
        ScCompiler::new(Compiler::Msl(compiler), allocator())
    }

    fn binding(desc_set: u32, binding: u32, slot: u32) -> ScMslResourceBinding {
        ScMslResourceBinding {
            stage: ExecutionModel::Fragment as u32,
            desc_set,
            binding,
            msl_buffer: slot,
            msl_texture: slot,
            msl_sampler: slot,
            used_by_shader: false,
        }
    }

    fn array<T>(items: &mut [T]) -> ScArray<T> {
        ScArray {
            length: items.len(),
            ptr: items.as_mut_ptr(),
        }
    }

    #[test]
    fn test_options_round_trip() {
        let mut handle = msl();
        let mut options = ScOptionsMsl::default();
        unsafe {
            sc_compiler_msl_get_options(&handle, &mut options, ptr::null_mut());
            assert_eq!((options.version_major, options.version_minor), (1, 2));
            options.version_major = 2;
            options.vertex_invert_y = true;
            sc_compiler_msl_set_options(&mut handle, &options, ptr::null_mut());
            let mut read_back = ScOptionsMsl::default();
            sc_compiler_msl_get_options(&handle, &mut read_back, ptr::null_mut());
            assert_eq!(read_back, options);
        }
    }

    #[test]
    fn test_used_by_shader_written_back() {
        let mut handle = msl();
        let mut bindings = [binding(0, 1, 3), binding(0, 3, 4), binding(1, 0, 5)];
        let mut attrs = [ScMslVertexAttr {
            location: 1,
            msl_stride: 8,
            used_by_shader: true,
            ..Default::default()
        }];
        let mut output = ScString::empty();
        unsafe {
            let code = sc_compiler_msl_compile(
                &mut handle,
                array(&mut attrs),
                array(&mut bindings),
                &mut output,
                ptr::null_mut(),
            );
            assert_eq!(code, ScResult::Success);
            let source = std::slice::from_raw_parts(output.ptr, output.length);
            assert!(String::from_utf8_lossy(source).contains("[[texture(3)]]"));
        }
        let used: Vec<bool> = bindings.iter().map(|b| b.used_by_shader).collect();
        assert_eq!(used, vec![true, false, false]);
        assert!(!attrs[0].used_by_shader);
    }

    #[test]
    fn test_failed_compile_leaves_bindings() {
        let mut handle = msl();
        let mut bindings = [binding(0, 1, 300)];
        let mut output = ScString::empty();
        let mut error = ScString::empty();
        let code = unsafe {
            sc_compiler_msl_compile(
                &mut handle,
                ScArray::empty(),
                array(&mut bindings),
                &mut output,
                &mut error,
            )
        };
        assert_eq!(code, ScResult::CompilationError);
        assert!(!error.is_empty());
        assert!(output.ptr.is_null());
        assert!(!bindings[0].used_by_shader);
    }

    #[test]
    fn test_invalid_stage() {
        let mut handle = msl();
        let mut bindings = [ScMslResourceBinding {
            stage: 1234,
            ..binding(0, 1, 0)
        }];
        let mut output = ScString::empty();
        let code = unsafe {
            sc_compiler_msl_compile(
                &mut handle,
                ScArray::empty(),
                array(&mut bindings),
                &mut output,
                ptr::null_mut(),
            )
        };
        assert_eq!(code, ScResult::Error);
    }
}
