//! Integration tests for the spvcross C ABI
//!
//! These drive the exported functions the way a host would: through raw
//! pointers, with every output buffer coming from the host allocator.

#![allow(unsafe_op_in_unsafe_fn)]

use spvcross::*;
use spvcrs::fixtures;
use std::alloc::{Layout, alloc};
use std::ffi::c_void;
use std::ptr;

/// Stands in for the host collector. Allocations are never freed.
unsafe extern "C" fn host_alloc(len: usize) -> *mut c_void {
    alloc(Layout::from_size_align(len, 16).unwrap()).cast()
}

fn callbacks() -> ScGcCallbacks {
    ScGcCallbacks {
        alloc: Some(host_alloc),
    }
}

fn ir(words: &mut [u32]) -> ScArray<u32> {
    ScArray {
        length: words.len(),
        ptr: words.as_mut_ptr(),
    }
}

/// Helper to read a returned string
unsafe fn read_string(value: ScString) -> String {
    if value.length == 0 {
        assert!(value.ptr.is_null(), "empty output should be {{0, null}}");
        return String::new();
    }
    String::from_utf8(std::slice::from_raw_parts(value.ptr, value.length).to_vec()).unwrap()
}

/// Helper to copy a returned array
unsafe fn read_array<T: Copy>(value: ScArray<T>) -> Vec<T> {
    if value.length == 0 {
        assert!(value.ptr.is_null(), "empty output should be {{0, null}}");
        return Vec::new();
    }
    std::slice::from_raw_parts(value.ptr, value.length).to_vec()
}

type NewFn = unsafe extern "C" fn(
    ScArray<u32>,
    ScGcCallbacks,
    *mut *mut ScCompiler,
    *mut ScString,
) -> ScResult;

/// Helper to create a handle, panicking with the returned message on failure
unsafe fn create(new: NewFn, mut words: Vec<u32>) -> *mut ScCompiler {
    let mut handle = ptr::null_mut();
    let mut error = ScString::empty();
    let result = new(ir(&mut words), callbacks(), &mut handle, &mut error);
    if result != ScResult::Success {
        panic!("Handle creation failed: {}", read_string(error));
    }
    assert!(error.ptr.is_null());
    handle
}

/// Helper to compile and return the output bytes
unsafe fn compile(handle: *mut ScCompiler) -> Vec<u8> {
    let mut output = ScString::empty();
    let mut error = ScString::empty();
    let result = sc_compiler_compile(handle, &mut output, &mut error);
    if result != ScResult::Success {
        panic!("Compilation failed: {}", read_string(error));
    }
    read_array(output)
}

#[test]
fn test_create_and_delete_every_dialect() {
    unsafe {
        let constructors: [NewFn; 4] = [
            sc_compiler_new,
            sc_compiler_glsl_new,
            sc_compiler_hlsl_new,
            sc_compiler_msl_new,
        ];
        for new in constructors {
            let handle = create(new, fixtures::compute_shader());
            let mut bound = 0;
            let result = sc_compiler_get_current_id_bound(handle, &mut bound, ptr::null_mut());
            assert_eq!(result, ScResult::Success);
            assert_eq!(bound, 23);
            sc_compiler_delete(handle);
        }
    }
}

#[test]
fn test_bad_module_is_a_compilation_error() {
    unsafe {
        let inputs = [
            Vec::new(),
            fixtures::compute_shader()[..20].to_vec(),
            vec![0xdead_beef; 8],
        ];
        for mut words in inputs {
            let mut handle = ptr::null_mut();
            let mut error = ScString::empty();
            let result = sc_compiler_glsl_new(ir(&mut words), callbacks(), &mut handle, &mut error);
            assert_eq!(result, ScResult::CompilationError);
            assert!(handle.is_null(), "handle should be left untouched");
            assert!(read_string(error).starts_with("Invalid SPIR-V"));
        }
    }
}

#[test]
fn test_glsl_compile_is_repeatable() {
    unsafe {
        let handle = create(sc_compiler_glsl_new, fixtures::fragment_shader());
        let first = compile(handle);
        let second = compile(handle);
        assert_eq!(first, second);
        let source = String::from_utf8(first).unwrap();
        assert!(source.starts_with("#version 450"));
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_hlsl_compile() {
    unsafe {
        let handle = create(sc_compiler_hlsl_new, fixtures::compute_shader());
        let source = String::from_utf8(compile(handle)).unwrap();
        assert!(source.contains("numthreads(8, 4, 1)"));
        assert_eq!(compile(handle), source.into_bytes());

        let mut name = ScString::empty();
        let result = sc_compiler_get_cleansed_entry_point_name(
            handle,
            ScString {
                length: 4,
                ptr: b"main".as_ptr().cast_mut(),
            },
            5, // GLCompute
            &mut name,
            ptr::null_mut(),
        );
        assert_eq!(result, ScResult::Success);
        assert!(!read_string(name).is_empty());
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_msl_compile() {
    unsafe {
        let handle = create(sc_compiler_msl_new, fixtures::compute_shader());
        let source = String::from_utf8(compile(handle)).unwrap();
        assert!(source.contains("#include <metal_stdlib>"));
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_error_is_cleared_after_success() {
    unsafe {
        let handle = create(sc_compiler_new, fixtures::fragment_shader());
        let mut error = ScString::empty();
        let mut size = 0usize;

        let result = sc_compiler_get_declared_struct_size(handle, 4, &mut size, &mut error);
        assert_eq!(result, ScResult::CompilationError);
        assert!(!read_string(error).is_empty());

        let result = sc_compiler_get_declared_struct_size(
            handle,
            fixtures::FRAGMENT_UBO_BLOCK,
            &mut size,
            &mut error,
        );
        assert_eq!(result, ScResult::Success);
        assert_eq!(size, 144);
        assert_eq!(error.length, 0);
        assert!(error.ptr.is_null());
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_empty_collections() {
    unsafe {
        let handle = create(sc_compiler_new, fixtures::compute_shader());
        let mut resources = ScShaderResources::default();
        let result = sc_compiler_get_shader_resources(handle, &mut resources, ptr::null_mut());
        assert_eq!(result, ScResult::Success);
        assert_eq!(read_array(resources.storage_buffers).len(), 1);
        assert!(read_array(resources.uniform_buffers).is_empty());
        assert!(read_array(resources.sampled_images).is_empty());
        assert!(read_array(resources.push_constant_buffers).is_empty());

        let mut constants = ScArray::empty();
        sc_compiler_get_specialization_constants(handle, &mut constants, ptr::null_mut());
        assert!(read_array(constants).is_empty());

        let mut name = ScString::empty();
        sc_compiler_get_name(handle, 1000, &mut name, ptr::null_mut());
        assert_eq!(read_string(name), "");
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_compute_workgroup_size() {
    unsafe {
        let handle = create(sc_compiler_new, fixtures::compute_shader());
        let mut entries = ScArray::empty();
        let result = sc_compiler_get_entry_points(handle, &mut entries, ptr::null_mut());
        assert_eq!(result, ScResult::Success);
        let entries = read_array(entries);
        assert_eq!(entries.len(), 1);
        assert_eq!(read_string(entries[0].name), "main");
        assert_eq!(
            entries[0].workgroup_size,
            ScWorkgroupSize { x: 8, y: 4, z: 1 }
        );
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_unset_decoration_reads_zero() {
    unsafe {
        let handle = create(sc_compiler_new, fixtures::compute_shader());
        let mut value = u32::MAX;
        let result = sc_compiler_get_decoration(
            handle,
            fixtures::COMPUTE_BUFFER,
            30, // Location
            &mut value,
            ptr::null_mut(),
        );
        assert_eq!(result, ScResult::Success);
        assert_eq!(value, 0);
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_glsl_options_round_trip() {
    unsafe {
        let handle = create(sc_compiler_glsl_new, fixtures::compute_shader());
        let mut options = ScOptionsGlsl::default();
        sc_compiler_glsl_get_options(handle, &mut options, ptr::null_mut());
        options.version = 310;
        options.es = true;
        let result = sc_compiler_glsl_set_options(handle, &options, ptr::null_mut());
        assert_eq!(result, ScResult::Success);

        let mut read_back = ScOptionsGlsl::default();
        sc_compiler_glsl_get_options(handle, &mut read_back, ptr::null_mut());
        assert_eq!(read_back, options);

        let source = String::from_utf8(compile(handle)).unwrap();
        assert!(source.starts_with("#version 310 es"));
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_wrong_dialect_is_an_error() {
    unsafe {
        let handle = create(sc_compiler_hlsl_new, fixtures::compute_shader());
        let mut options = ScOptionsMsl::default();
        let mut error = ScString::empty();
        let result = sc_compiler_msl_get_options(handle, &mut options, &mut error);
        assert_eq!(result, ScResult::Error);
        assert_eq!(
            read_string(error),
            "Operation needs a MSL compiler, handle holds a HLSL compiler"
        );
        sc_compiler_delete(handle);
    }
}

#[test]
fn test_null_handle_is_an_error() {
    unsafe {
        let mut bound = 0;
        let mut error = ScString::empty();
        let result = sc_compiler_get_current_id_bound(ptr::null(), &mut bound, &mut error);
        assert_eq!(result, ScResult::Error);
        // No handle means no allocator for the message
        assert!(error.ptr.is_null());
    }
}
