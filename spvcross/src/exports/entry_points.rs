//! Entry points and execution modes

use super::{execution_model, getter, setter, with_compiler, write};
use crate::array::{ScArray, ScString};
use crate::handle::ScCompiler;
use crate::records::{ScEntryPoint, ScSpecializationConstant};
use crate::ScResult;

getter!(
    /// Entry points in declaration order
    get_entry_points() -> ScArray<ScEntryPoint>,
    |c, alloc| alloc.collect(&c.get_entry_points()?, |entry| ScEntryPoint::new(&alloc, entry))?
);

setter!(
    set_entry_point(name: ScString, model: u32),
    |c| c.set_entry_point(name.as_str("name")?, execution_model(model)?)?
);

setter!(
    rename_entry_point(old_name: ScString, new_name: ScString, model: u32),
    |c| c.rename_entry_point(
        old_name.as_str("old_name")?,
        new_name.as_str("new_name")?,
        execution_model(model)?,
    )?
);

getter!(
    /// The name the last compile gave the entry point, else its own name
    get_cleansed_entry_point_name(name: ScString, model: u32) -> ScString,
    |c, alloc| {
        let cleansed = c.get_cleansed_entry_point_name(name.as_str("name")?, execution_model(model)?)?;
        alloc.string(&cleansed)?
    }
);

getter!(get_execution_model() -> u32, |c| c.execution_model()? as u32);

setter!(
    set_execution_mode(mode: u32, arg0: u32, arg1: u32, arg2: u32),
    |c| c.set_execution_mode(mode, [arg0, arg1, arg2])?
);

setter!(unset_execution_mode(mode: u32), |c| c.unset_execution_mode(mode)?);

getter!(
    get_execution_mode_argument(mode: u32, index: u32) -> u32,
    |c| c.get_execution_mode_argument(mode, index)?
);

/// The specialization constants behind each workgroup dimension, with
/// `{0, 0}` for a literal one. `*result` is the id of the `WorkgroupSize`
/// built-in, or 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_get_work_group_size_specialization_constants(
    compiler: *const ScCompiler,
    x: *mut ScSpecializationConstant,
    y: *mut ScSpecializationConstant,
    z: *mut ScSpecializationConstant,
    result: *mut u32,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        let ([sx, sy, sz], builtin) = handle
            .base()
            .get_work_group_size_specialization_constants()?;
        write(x, sx.into())?;
        write(y, sy.into())?;
        write(z, sz.into())?;
        write(result, builtin)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::handle::Compiler;
    use crate::records::ScWorkgroupSize;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use spvcrs::spirv::{ExecutionMode, ExecutionModel};
    use std::ptr;

    fn handle(words: &[u32]) -> ScCompiler {
        let compiler = spvcrs::Compiler::new(words).unwrap();
        ScCompiler::new(Compiler::Reflection(compiler), allocator())
    }

    fn input(value: &str) -> ScString {
        allocator().string(value).unwrap()
    }

    unsafe fn string(value: ScString) -> String {
        String::from_utf8(std::slice::from_raw_parts(value.ptr, value.length).to_vec()).unwrap()
    }

    #[test]
    fn test_compute_entry_point() {
        let handle = handle(&fixtures::compute_shader());
        let mut entries = ScArray::empty();
        unsafe {
            let code = sc_compiler_get_entry_points(&handle, &mut entries, ptr::null_mut());
            assert_eq!(code, ScResult::Success);
            assert_eq!(entries.length, 1);
            let entry = *entries.ptr;
            assert_eq!(string(entry.name), "main");
            assert_eq!(entry.execution_model, ExecutionModel::GLCompute as u32);
            assert_eq!(entry.workgroup_size, ScWorkgroupSize { x: 8, y: 4, z: 1 });
        }
    }

    #[test]
    fn test_rename_and_select() {
        let mut handle = handle(&fixtures::compute_shader());
        let model = ExecutionModel::GLCompute as u32;
        let mut error = ScString::empty();
        unsafe {
            let code = sc_compiler_rename_entry_point(
                &mut handle,
                input("main"),
                input("kernel_main"),
                model,
                &mut error,
            );
            assert_eq!(code, ScResult::Success);
            let code = sc_compiler_set_entry_point(&mut handle, input("main"), model, &mut error);
            assert_eq!(code, ScResult::CompilationError);
            assert_eq!(string(error), "Entry point does not exist.");
            let code =
                sc_compiler_set_entry_point(&mut handle, input("kernel_main"), model, &mut error);
            assert_eq!(code, ScResult::Success);
            assert!(error.ptr.is_null());
        }
    }

    #[test]
    fn test_invalid_execution_model() {
        let mut handle = handle(&fixtures::compute_shader());
        let code = unsafe {
            sc_compiler_set_entry_point(&mut handle, input("main"), 999, ptr::null_mut())
        };
        assert_eq!(code, ScResult::Error);
    }

    #[test]
    fn test_execution_modes() {
        let mut handle = handle(&fixtures::compute_shader());
        let local_size = ExecutionMode::LocalSize as u32;
        let mut value = 0;
        unsafe {
            sc_compiler_get_execution_mode_argument(&handle, local_size, 1, &mut value, ptr::null_mut());
            assert_eq!(value, 4);
            sc_compiler_set_execution_mode(&mut handle, local_size, 16, 16, 1, ptr::null_mut());
            sc_compiler_get_execution_mode_argument(&handle, local_size, 0, &mut value, ptr::null_mut());
            assert_eq!(value, 16);
            sc_compiler_get_execution_model(&handle, &mut value, ptr::null_mut());
            assert_eq!(value, ExecutionModel::GLCompute as u32);
        }
    }

    #[test]
    fn test_work_group_size_constants() {
        let handle = handle(&fixtures::workgroup_builtin_shader());
        let mut x = ScSpecializationConstant::default();
        let mut y = ScSpecializationConstant::default();
        let mut z = ScSpecializationConstant::default();
        let mut builtin = 0;
        let code = unsafe {
            sc_compiler_get_work_group_size_specialization_constants(
                &handle,
                &mut x,
                &mut y,
                &mut z,
                &mut builtin,
                ptr::null_mut(),
            )
        };
        assert_eq!(code, ScResult::Success);
        assert_eq!(x, ScSpecializationConstant { id: 5, constant_id: 0 });
        assert_eq!(y, ScSpecializationConstant { id: 6, constant_id: 1 });
        assert_eq!(z, ScSpecializationConstant::default());
        assert_eq!(builtin, 8);
    }
}
