//! Types and struct layout

use super::getter;
use crate::array::ScString;
use crate::handle::ScCompiler;
use crate::records::ScType;
use crate::ScResult;

getter!(get_type(id: u32) -> ScType, |c, alloc| ScType::new(&alloc, &c.get_type(id)?)?);

getter!(
    get_type_from_variable(id: u32) -> ScType,
    |c, alloc| ScType::new(&alloc, &c.get_type_from_variable(id)?)?
);

getter!(
    get_non_pointer_type_id(type_id: u32) -> u32,
    |c| c.get_non_pointer_type_id(type_id)?
);

getter!(
    get_non_pointer_type(type_id: u32) -> ScType,
    |c, alloc| ScType::new(&alloc, &c.get_non_pointer_type(type_id)?)?
);

getter!(
    /// `StorageClass` code of variable `id`, `Generic` (8) for other ids
    get_storage_class(id: u32) -> u32,
    |c| c.get_storage_class(id) as u32
);

getter!(
    get_declared_struct_size(type_id: u32) -> usize,
    |c| c.get_declared_struct_size(type_id)?
);

getter!(
    /// Size of struct `type_id` with its trailing runtime array holding
    /// `array_size` elements
    get_declared_struct_size_runtime_array(type_id: u32, array_size: usize) -> usize,
    |c| c.get_declared_struct_size_runtime_array(type_id, array_size)?
);

getter!(
    get_declared_struct_member_size(type_id: u32, index: u32) -> usize,
    |c| c.get_declared_struct_member_size(type_id, index)?
);

getter!(
    type_struct_member_offset(type_id: u32, index: u32) -> u32,
    |c| c.type_struct_member_offset(type_id, index)?
);

getter!(
    type_struct_member_array_stride(type_id: u32, index: u32) -> u32,
    |c| c.type_struct_member_array_stride(type_id, index)?
);

getter!(
    type_struct_member_matrix_stride(type_id: u32, index: u32) -> u32,
    |c| c.type_struct_member_matrix_stride(type_id, index)?
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::handle::Compiler;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use std::ptr;

    fn fragment() -> ScCompiler {
        let compiler = spvcrs::Compiler::new(&fixtures::fragment_shader()).unwrap();
        ScCompiler::new(Compiler::Reflection(compiler), allocator())
    }

    #[test]
    fn test_storage_class() {
        let handle = fragment();
        let mut storage = 0;
        unsafe {
            sc_compiler_get_storage_class(&handle, fixtures::FRAGMENT_UBO, &mut storage, ptr::null_mut());
            assert_eq!(storage, 2);
            sc_compiler_get_storage_class(&handle, 4, &mut storage, ptr::null_mut());
            assert_eq!(storage, 8);
        }
    }

    #[test]
    fn test_struct_layout() {
        let handle = fragment();
        let mut size = 0usize;
        let mut offset = 0u32;
        let mut stride = 0u32;
        unsafe {
            sc_compiler_get_declared_struct_size(
                &handle,
                fixtures::FRAGMENT_UBO_BLOCK,
                &mut size,
                ptr::null_mut(),
            );
            sc_compiler_type_struct_member_offset(
                &handle,
                fixtures::FRAGMENT_UBO_BLOCK,
                2,
                &mut offset,
                ptr::null_mut(),
            );
            sc_compiler_type_struct_member_matrix_stride(
                &handle,
                fixtures::FRAGMENT_UBO_BLOCK,
                1,
                &mut stride,
                ptr::null_mut(),
            );
        }
        assert_eq!(size, 144);
        assert_eq!(offset, 80);
        assert_eq!(stride, 16);
    }

    #[test]
    fn test_missing_layout_is_a_compilation_error() {
        let handle = fragment();
        let mut stride = 0u32;
        let mut error = ScString::empty();
        let code = unsafe {
            sc_compiler_type_struct_member_array_stride(
                &handle,
                fixtures::FRAGMENT_UBO_BLOCK,
                0,
                &mut stride,
                &mut error,
            )
        };
        assert_eq!(code, ScResult::CompilationError);
        assert!(!error.is_empty());
    }

    #[test]
    fn test_oversized_runtime_array_is_a_compilation_error() {
        let compiler = spvcrs::Compiler::new(&fixtures::compute_shader()).unwrap();
        let handle = ScCompiler::new(Compiler::Reflection(compiler), allocator());
        let mut size = 0usize;
        let mut error = ScString::empty();
        let code = unsafe {
            sc_compiler_get_declared_struct_size_runtime_array(
                &handle,
                fixtures::COMPUTE_BLOCK,
                usize::MAX,
                &mut size,
                &mut error,
            )
        };
        assert_eq!(code, ScResult::CompilationError);
        assert!(!error.is_empty());
        assert_eq!(size, 0);
    }

    #[test]
    fn test_get_type() {
        let handle = fragment();
        let mut record = std::mem::MaybeUninit::<ScType>::uninit();
        let code = unsafe {
            sc_compiler_get_type_from_variable(
                &handle,
                fixtures::FRAGMENT_UBO,
                record.as_mut_ptr(),
                ptr::null_mut(),
            )
        };
        assert_eq!(code, ScResult::Success);
        let record = unsafe { record.assume_init() };
        assert!(record.pointer);
        assert_eq!(record.storage, 2);
        assert_eq!(record.self_id, fixtures::FRAGMENT_UBO_BLOCK);
        assert_eq!(record.member_types.length, 3);
    }
}
