use devbuf_registry::{DeviceRegistry, RegistryConfig, RegistryError};

use crate::error;
use crate::types::{DevbufRegistryHandle, DevbufResult, RegistryHandle};

fn with_registry<T>(
    handle: DevbufRegistryHandle,
    on_error: T,
    f: impl FnOnce(&DeviceRegistry) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("registry handle cannot be null");
        return on_error;
    }

    let registry_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *const RegistryHandle) }
    };

    f(&registry_handle.registry)
}

fn write_len_out(out_len: *mut usize, len: usize) {
    if !out_len.is_null() {
        // SAFETY: Non-null `out_len` is a writable `usize` per the caller contract.
        unsafe {
            *out_len = len;
        }
    }
}

// A null data pointer is a copy fault, reported after the minor is validated.
fn null_buffer(registry: &DeviceRegistry, minor: u32, len: usize) -> DevbufResult {
    let err = registry
        .open(minor)
        .err()
        .unwrap_or(RegistryError::BadAddress { minor, len });
    error::map_registry_error(&err)
}

fn relay(result: devbuf_registry::Result<()>) -> DevbufResult {
    match result {
        Ok(()) => DevbufResult::Ok,
        Err(err) => error::map_registry_error(&err),
    }
}

/// Create a registry with `max_minors` slots of `capacity` bytes.
///
/// Passing 0 for either argument selects the default (4096 bytes, 256 minors).
/// Returns null on failure; see `devbuf_last_error`.
#[no_mangle]
pub extern "C" fn devbuf_registry_new(capacity: usize, max_minors: u32) -> DevbufRegistryHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let defaults = RegistryConfig::default();
        let config = RegistryConfig {
            capacity: if capacity == 0 {
                defaults.capacity
            } else {
                capacity
            },
            max_minors: if max_minors == 0 {
                defaults.max_minors
            } else {
                max_minors
            },
        };

        match DeviceRegistry::with_config(config) {
            Ok(registry) => {
                let handle = RegistryHandle { registry };
                Box::into_raw(Box::new(handle)) as DevbufRegistryHandle
            }
            Err(err) => {
                let _ = error::map_registry_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Release a registry and every slot buffer it owns.
///
/// # Safety
/// `handle` must be null or a handle returned by `devbuf_registry_new` that has
/// not been freed.
#[no_mangle]
pub unsafe extern "C" fn devbuf_registry_free(handle: DevbufRegistryHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }

        // SAFETY: Pointer validity and unique ownership are guaranteed by the caller.
        let boxed = unsafe { Box::from_raw(handle as *mut RegistryHandle) };
        boxed.registry.teardown();
    });
}

/// Validate an open of `minor`.
///
/// # Safety
/// `handle` must be a valid registry handle.
#[no_mangle]
pub unsafe extern "C" fn devbuf_open(handle: DevbufRegistryHandle, minor: u32) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            relay(registry.open(minor))
        })
    })
}

/// Validate a release of `minor`.
///
/// # Safety
/// `handle` must be a valid registry handle.
#[no_mangle]
pub unsafe extern "C" fn devbuf_release(handle: DevbufRegistryHandle, minor: u32) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            relay(registry.close(minor))
        })
    })
}

/// Drain up to `count` bytes from `minor` into `buf`.
///
/// The number of bytes copied is stored in `out_len` (if non-null).
///
/// # Safety
/// `handle` must be a valid registry handle. If `count > 0`, `buf` must be null
/// or writable for `count` bytes. A null `buf` with non-zero `count` is
/// reported as `OutOfMemory` and consumes nothing.
#[no_mangle]
pub unsafe extern "C" fn devbuf_read(
    handle: DevbufRegistryHandle,
    minor: u32,
    buf: *mut u8,
    count: usize,
    out_len: *mut usize,
) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        write_len_out(out_len, 0);

        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            let out: &mut [u8] = if count == 0 {
                &mut []
            } else if buf.is_null() {
                return null_buffer(registry, minor, count);
            } else {
                // SAFETY: The caller guarantees `buf` is writable for `count` bytes.
                unsafe { std::slice::from_raw_parts_mut(buf, count) }
            };

            match registry.read(minor, out) {
                Ok(read) => {
                    write_len_out(out_len, read);
                    DevbufResult::Ok
                }
                Err(err) => error::map_registry_error(&err),
            }
        })
    })
}

/// Append `count` bytes from `buf` to `minor`, all or nothing.
///
/// The number of bytes stored is written to `out_len` (if non-null).
///
/// # Safety
/// `handle` must be a valid registry handle. If `count > 0`, `buf` must be null
/// or readable for `count` bytes. A null `buf` with non-zero `count` is
/// reported as `OutOfMemory` and stores nothing.
#[no_mangle]
pub unsafe extern "C" fn devbuf_write(
    handle: DevbufRegistryHandle,
    minor: u32,
    buf: *const u8,
    count: usize,
    out_len: *mut usize,
) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        write_len_out(out_len, 0);

        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            let data: &[u8] = if count == 0 {
                &[]
            } else if buf.is_null() {
                return null_buffer(registry, minor, count);
            } else {
                // SAFETY: The caller guarantees `buf` is readable for `count` bytes.
                unsafe { std::slice::from_raw_parts(buf, count) }
            };

            match registry.write(minor, data) {
                Ok(written) => {
                    write_len_out(out_len, written);
                    DevbufResult::Ok
                }
                Err(err) => error::map_registry_error(&err),
            }
        })
    })
}

/// Run an encoded ioctl request (`DEVBUF_IOCTL_RESET`, `DEVBUF_IOCTL_RESTART`).
///
/// # Safety
/// `handle` must be a valid registry handle.
#[no_mangle]
pub unsafe extern "C" fn devbuf_ioctl(
    handle: DevbufRegistryHandle,
    minor: u32,
    request: u32,
    arg: u64,
) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            relay(registry.ioctl(minor, request, arg))
        })
    })
}

/// Run a raw control command (`DEVBUF_CMD_RESET`, `DEVBUF_CMD_RESTART`).
///
/// # Safety
/// `handle` must be a valid registry handle.
#[no_mangle]
pub unsafe extern "C" fn devbuf_control(
    handle: DevbufRegistryHandle,
    minor: u32,
    command: u32,
    arg: u64,
) -> DevbufResult {
    crate::ffi_boundary(DevbufResult::Internal, || {
        error::clear_error_state();
        with_registry(handle, DevbufResult::InvalidArgument, |registry| {
            relay(registry.dispatch(minor, command, arg))
        })
    })
}
