//! Length-prefixed buffers shared with the host

use crate::{Error, Result};
use std::ptr;
use std::slice;

/// A buffer as `{ length, ptr }`.
///
/// Outputs are either `{0, null}` or a fresh allocation from the handle's
/// allocator holding exactly `length` elements.
#[repr(C)]
#[derive(Debug)]
pub struct ScArray<T> {
    pub length: usize,
    pub ptr: *mut T,
}

/// UTF-8 bytes, not NUL-terminated.
pub type ScString = ScArray<u8>;

impl<T> Clone for ScArray<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScArray<T> {}

impl<T> Default for ScArray<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> ScArray<T> {
    pub const fn empty() -> Self {
        ScArray {
            length: 0,
            ptr: ptr::null_mut(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Borrows an input buffer. A zero length reads as empty whatever `ptr`
    /// holds.
    pub(crate) unsafe fn as_slice<'a>(&self, what: &'static str) -> Result<&'a [T]> {
        if self.length == 0 {
            return Ok(&[]);
        }
        if self.ptr.is_null() {
            return Err(Error::NullPointer(what));
        }
        if !self.ptr.is_aligned() {
            return Err(Error::Misaligned(what));
        }
        Ok(slice::from_raw_parts(self.ptr, self.length))
    }

    /// Borrows an input buffer for in-place updates.
    pub(crate) unsafe fn as_mut_slice<'a>(&self, what: &'static str) -> Result<&'a mut [T]> {
        if self.length == 0 {
            return Ok(&mut []);
        }
        if self.ptr.is_null() {
            return Err(Error::NullPointer(what));
        }
        if !self.ptr.is_aligned() {
            return Err(Error::Misaligned(what));
        }
        Ok(slice::from_raw_parts_mut(self.ptr, self.length))
    }
}

impl ScString {
    /// Reads an input string.
    pub(crate) unsafe fn as_str<'a>(&self, what: &'static str) -> Result<&'a str> {
        Ok(std::str::from_utf8(self.as_slice(what)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_length_ignores_pointer() {
        let array = ScArray::<u32> {
            length: 0,
            ptr: 0x10 as *mut u32,
        };
        assert_eq!(unsafe { array.as_slice("ir") }.unwrap(), &[] as &[u32]);
    }

    #[test]
    fn test_null_with_length_is_rejected() {
        let array = ScArray::<u32> {
            length: 3,
            ptr: ptr::null_mut(),
        };
        assert!(matches!(
            unsafe { array.as_slice("ir") },
            Err(Error::NullPointer("ir"))
        ));
    }

    #[test]
    fn test_read_string() {
        let mut bytes = *b"main";
        let string = ScString {
            length: bytes.len(),
            ptr: bytes.as_mut_ptr(),
        };
        assert_eq!(unsafe { string.as_str("name") }.unwrap(), "main");

        let mut invalid = [0xffu8, 0xfe];
        let string = ScString {
            length: invalid.len(),
            ptr: invalid.as_mut_ptr(),
        };
        assert!(matches!(
            unsafe { string.as_str("name") },
            Err(Error::Utf8(_))
        ));
    }
}
