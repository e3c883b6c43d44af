use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use devbuf_registry::{ErrorCode, RegistryError};

use crate::types::DevbufResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> DevbufResult {
    set_error_message(message);
    DevbufResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_registry_error(err: &RegistryError) -> DevbufResult {
    set_error_message(err.to_string());
    match err.code() {
        ErrorCode::OutOfMemory => DevbufResult::OutOfMemory,
        ErrorCode::OutOfSpace => DevbufResult::OutOfSpace,
        ErrorCode::InvalidArgument => DevbufResult::InvalidArgument,
        ErrorCode::UnsupportedOperation => DevbufResult::UnsupportedOperation,
    }
}

/// Negative errno a character driver would return for `result`.
pub(crate) fn errno_for(result: DevbufResult) -> i32 {
    match result {
        DevbufResult::Ok => 0,
        DevbufResult::OutOfMemory | DevbufResult::OutOfSpace => -libc::ENOMEM,
        DevbufResult::InvalidArgument => -libc::EINVAL,
        DevbufResult::UnsupportedOperation => -libc::ENOTTY,
        DevbufResult::Internal => -libc::EIO,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
