//! devbuf-ffi: C-ABI exports for the devbuf registry.
//!
//! This is the integration boundary a host driver shim calls into. Every
//! entry point returns a [`DevbufResult`]; [`devbuf_result_errno`] turns it
//! into the negative errno a character driver hands back to userspace.

mod device;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use device::{
    devbuf_control, devbuf_ioctl, devbuf_open, devbuf_read, devbuf_registry_free,
    devbuf_registry_new, devbuf_release, devbuf_write,
};
pub use types::{
    DevbufRegistryHandle, DevbufResult, DEVBUF_CMD_RESET, DEVBUF_CMD_RESTART,
    DEVBUF_ERR_INTERNAL, DEVBUF_ERR_INVALID_ARGUMENT, DEVBUF_ERR_OUT_OF_MEMORY,
    DEVBUF_ERR_OUT_OF_SPACE, DEVBUF_ERR_UNSUPPORTED_OPERATION, DEVBUF_IOCTL_RESET,
    DEVBUF_IOCTL_RESTART, DEVBUF_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Negative errno for a result code: `-ENOMEM`, `-EINVAL`, `-ENOTTY`, or 0.
#[no_mangle]
pub extern "C" fn devbuf_result_errno(result: i32) -> i32 {
    ffi_boundary(-libc::EIO, || {
        error::errno_for(DevbufResult::from_raw(result))
    })
}

#[no_mangle]
pub extern "C" fn devbuf_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[no_mangle]
pub extern "C" fn devbuf_clear_error() {
    ffi_boundary((), error::clear_error_state);
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_starts_empty() {
        devbuf_clear_error();
        let ptr = devbuf_last_error();
        assert!(!ptr.is_null());

        // SAFETY: devbuf_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn errno_mapping_matches_driver_conventions() {
        assert_eq!(devbuf_result_errno(DevbufResult::Ok as i32), 0);
        assert_eq!(
            devbuf_result_errno(DevbufResult::OutOfMemory as i32),
            -libc::ENOMEM
        );
        assert_eq!(
            devbuf_result_errno(DevbufResult::OutOfSpace as i32),
            -libc::ENOMEM
        );
        assert_eq!(
            devbuf_result_errno(DevbufResult::InvalidArgument as i32),
            -libc::EINVAL
        );
        assert_eq!(
            devbuf_result_errno(DevbufResult::UnsupportedOperation as i32),
            -libc::ENOTTY
        );
        assert_eq!(devbuf_result_errno(12345), -libc::EIO);
    }

    #[test]
    fn panics_are_contained() {
        let value = ffi_boundary(7, || -> i32 { panic!("boom") });
        assert_eq!(value, 7);

        // SAFETY: devbuf_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(devbuf_last_error()) };
        assert_eq!(text.to_str().unwrap(), "panic across FFI boundary");
    }
}
