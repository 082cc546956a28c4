//! The host allocator every returned buffer is carved from

use crate::array::{ScArray, ScString};
use crate::{Error, Result};
use std::ffi::c_void;
use std::mem;
use std::ptr;

/// Callbacks into the host's memory manager.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScGcCallbacks {
    /// Returns `len` bytes owned by the host, aligned for any element type
    /// the API hands back
    pub alloc: Option<unsafe extern "C" fn(len: usize) -> *mut c_void>,
}

/// The allocator captured by a handle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Allocator {
    alloc: unsafe extern "C" fn(usize) -> *mut c_void,
}

impl Allocator {
    pub fn new(callbacks: &ScGcCallbacks) -> Result<Self> {
        callbacks
            .alloc
            .map(|alloc| Allocator { alloc })
            .ok_or(Error::NoAllocator)
    }

    /// Copies `items` into a fresh host allocation.
    pub fn array<T: Copy>(&self, items: &[T]) -> Result<ScArray<T>> {
        if items.is_empty() {
            return Ok(ScArray::empty());
        }
        let len = mem::size_of::<T>()
            .checked_mul(items.len())
            .ok_or(Error::Allocation(usize::MAX))?;
        let ptr = unsafe { (self.alloc)(len) }.cast::<T>();
        if ptr.is_null() || !ptr.is_aligned() {
            return Err(Error::Allocation(len));
        }
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len()) };
        Ok(ScArray {
            length: items.len(),
            ptr,
        })
    }

    pub fn string(&self, value: &str) -> Result<ScString> {
        self.array(value.as_bytes())
    }

    /// Converts each item and copies the results into a host allocation.
    pub fn collect<I, T, F>(&self, items: I, mut convert: F) -> Result<ScArray<T>>
    where
        I: IntoIterator,
        T: Copy,
        F: FnMut(I::Item) -> Result<T>,
    {
        let converted = items
            .into_iter()
            .map(&mut convert)
            .collect::<Result<Vec<T>>>()?;
        self.array(&converted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::alloc::{Layout, alloc};

    pub(crate) unsafe extern "C" fn test_alloc(len: usize) -> *mut c_void {
        // Leaked on purpose, the host collector would own it
        alloc(Layout::from_size_align(len, 16).unwrap()).cast()
    }

    unsafe extern "C" fn failing_alloc(_len: usize) -> *mut c_void {
        ptr::null_mut()
    }

    pub(crate) fn allocator() -> Allocator {
        Allocator::new(&ScGcCallbacks {
            alloc: Some(test_alloc),
        })
        .unwrap()
    }

    #[test]
    fn test_empty_array_is_not_allocated() {
        let allocator = Allocator::new(&ScGcCallbacks {
            alloc: Some(failing_alloc),
        })
        .unwrap();
        let array = allocator.array::<u32>(&[]).unwrap();
        assert_eq!(array.length, 0);
        assert!(array.ptr.is_null());
    }

    #[test]
    fn test_copy_string() {
        let string = allocator().string("main").unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(string.ptr, string.length) };
        assert_eq!(bytes, b"main");
    }

    #[test]
    fn test_failed_allocation() {
        let allocator = Allocator::new(&ScGcCallbacks {
            alloc: Some(failing_alloc),
        })
        .unwrap();
        assert!(matches!(
            allocator.array(&[1u32, 2]),
            Err(Error::Allocation(8))
        ));
    }

    #[test]
    fn test_missing_callback() {
        assert!(matches!(
            Allocator::new(&ScGcCallbacks::default()),
            Err(Error::NoAllocator)
        ));
    }
}
