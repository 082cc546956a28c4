//! Result codes and the failure-catching scope around every export

use crate::alloc::Allocator;
use crate::array::ScString;
use crate::handle::Dialect;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Outcome of an export.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScResult {
    Success = 0,
    /// The shader or the request about it was rejected
    CompilationError = 1,
    /// Any other recognized failure
    Error = 2,
    /// A panic or a failed host allocation; the error string is empty
    Unhandled = 3,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compiler(#[from] spvcrs::Error),
    #[error("Null pointer passed for {0}")]
    NullPointer(&'static str),
    #[error("Misaligned pointer passed for {0}")]
    Misaligned(&'static str),
    #[error("String is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Operation needs a {expected} compiler, handle holds a {actual} compiler")]
    WrongDialect { expected: Dialect, actual: Dialect },
    #[error("Host allocator failed to provide {0} bytes")]
    Allocation(usize),
    #[error("No allocator callback was supplied")]
    NoAllocator,
    #[error("Invalid {kind} code {code}")]
    InvalidCode { kind: &'static str, code: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The code the host sees for this failure.
    pub fn result_code(&self) -> ScResult {
        match self {
            Error::Compiler(err) if err.is_compilation() => ScResult::CompilationError,
            Error::Allocation(_) => ScResult::Unhandled,
            _ => ScResult::Error,
        }
    }

    /// Whether the failure carries a message for the host.
    fn has_message(&self) -> bool {
        !matches!(self, Error::Allocation(_) | Error::NoAllocator)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Runs `body` and maps its outcome to a result code.
///
/// Failures are described in `*error` with a string from `alloc`; a
/// success clears it to `{0, null}`. `error` may be null.
pub(crate) unsafe fn guard<F>(alloc: Option<Allocator>, error: *mut ScString, body: F) -> ScResult
where
    F: FnOnce() -> Result<()>,
{
    let (code, message) = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => (ScResult::Success, None),
        Ok(Err(err)) => {
            log::debug!("{err}");
            let message = err.has_message().then(|| err.to_string());
            (err.result_code(), message)
        }
        Err(payload) => {
            log::warn!("panic caught at the C boundary: {}", panic_message(&*payload));
            (ScResult::Unhandled, None)
        }
    };
    if error.is_null() {
        return code;
    }
    match (message, alloc) {
        (Some(message), Some(alloc)) => match alloc.string(&message) {
            Ok(string) => *error = string,
            Err(_) => {
                *error = ScString::empty();
                return ScResult::Unhandled;
            }
        },
        _ => *error = ScString::empty(),
    }
    code
}
