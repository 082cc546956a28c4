//! Bulk reflection over the shader interface

use super::{getter, setter};
use crate::array::{ScArray, ScString};
use crate::handle::ScCompiler;
use crate::records::{
    ScBufferRange, ScCombinedImageSampler, ScShaderResources, ScSpecializationConstant,
};
use crate::ScResult;
use std::collections::HashSet;

getter!(
    get_shader_resources() -> ScShaderResources,
    |c, alloc| ScShaderResources::new(&alloc, &c.get_shader_resources()?)?
);

getter!(
    /// Resources restricted to the variables in `active`
    get_shader_resources_for_vars(active: ScArray<u32>) -> ScShaderResources,
    |c, alloc| {
        let active: HashSet<u32> = active.as_slice("active")?.iter().copied().collect();
        ScShaderResources::new(&alloc, &c.get_shader_resources_for_vars(&active)?)?
    }
);

getter!(
    /// Ids of the variables the entry point touches. The order is not
    /// stable between calls.
    get_active_interface_variables() -> ScArray<u32>,
    |c, alloc| {
        let active: Vec<u32> = c.get_active_interface_variables()?.into_iter().collect();
        alloc.array(&active)?
    }
);

setter!(
    set_enabled_interface_variables(variables: ScArray<u32>),
    |c| {
        let variables = variables.as_slice("variables")?.iter().copied().collect();
        c.set_enabled_interface_variables(variables)
    }
);

getter!(
    get_active_buffer_ranges(id: u32) -> ScArray<ScBufferRange>,
    |c, alloc| alloc.collect(&c.get_active_buffer_ranges(id)?, |range| Ok(range.into()))?
);

getter!(
    get_combined_image_samplers() -> ScArray<ScCombinedImageSampler>,
    |c, alloc| alloc.collect(c.get_combined_image_samplers(), |pair| Ok(pair.into()))?
);

getter!(
    get_specialization_constants() -> ScArray<ScSpecializationConstant>,
    |c, alloc| alloc.collect(c.get_specialization_constants(), |constant| Ok(constant.into()))?
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use crate::handle::Compiler;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;
    use std::ptr;

    fn handle(words: &[u32]) -> ScCompiler {
        let compiler = spvcrs::Compiler::new(words).unwrap();
        ScCompiler::new(Compiler::Reflection(compiler), allocator())
    }

    unsafe fn items<T: Copy>(array: ScArray<T>) -> Vec<T> {
        if array.length == 0 {
            assert!(array.ptr.is_null());
            return Vec::new();
        }
        std::slice::from_raw_parts(array.ptr, array.length).to_vec()
    }

    #[test]
    fn test_buffer_ranges() {
        let handle = handle(&fixtures::fragment_shader());
        let mut ranges = ScArray::empty();
        let code = unsafe {
            sc_compiler_get_active_buffer_ranges(
                &handle,
                fixtures::FRAGMENT_UBO,
                &mut ranges,
                ptr::null_mut(),
            )
        };
        assert_eq!(code, ScResult::Success);
        assert_eq!(
            unsafe { items(ranges) },
            vec![
                ScBufferRange {
                    index: 0,
                    offset: 0,
                    range: 16
                },
                ScBufferRange {
                    index: 2,
                    offset: 80,
                    range: 64
                },
            ]
        );
    }

    #[test]
    fn test_specialization_constants() {
        let handle = handle(&fixtures::fragment_shader());
        let mut constants = ScArray::empty();
        unsafe {
            sc_compiler_get_specialization_constants(&handle, &mut constants, ptr::null_mut());
            assert_eq!(
                items(constants),
                vec![ScSpecializationConstant {
                    id: fixtures::FRAGMENT_SPEC_CONSTANT,
                    constant_id: 7
                }]
            );
        }
    }

    #[test]
    fn test_resources_for_vars() {
        let handle = handle(&fixtures::fragment_shader());
        let mut active = [fixtures::FRAGMENT_IMAGE];
        let array = ScArray {
            length: active.len(),
            ptr: active.as_mut_ptr(),
        };
        let mut resources = ScShaderResources::default();
        unsafe {
            let code =
                sc_compiler_get_shader_resources_for_vars(&handle, array, &mut resources, ptr::null_mut());
            assert_eq!(code, ScResult::Success);
            let images = items(resources.separate_images);
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].id, fixtures::FRAGMENT_IMAGE);
            assert!(items(resources.uniform_buffers).is_empty());
            assert!(items(resources.stage_inputs).is_empty());
        }
    }

    #[test]
    fn test_no_combined_samplers_before_build() {
        let handle = handle(&fixtures::fragment_shader());
        let mut pairs = ScArray::empty();
        unsafe {
            sc_compiler_get_combined_image_samplers(&handle, &mut pairs, ptr::null_mut());
        }
        assert_eq!(pairs.length, 0);
        assert!(pairs.ptr.is_null());
    }

    #[test]
    fn test_active_interface_variables() {
        let handle = handle(&fixtures::fragment_shader());
        let mut active = ScArray::empty();
        unsafe {
            sc_compiler_get_active_interface_variables(&handle, &mut active, ptr::null_mut());
            let mut ids = items(active);
            ids.sort_unstable();
            assert_eq!(ids, vec![12, 18, 21, 25, 27]);
        }
    }
}
