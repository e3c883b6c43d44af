use std::ffi::c_void;

use devbuf_registry::DeviceRegistry;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevbufResult {
    Ok = 0,
    OutOfMemory = 1,
    OutOfSpace = 2,
    InvalidArgument = 3,
    UnsupportedOperation = 4,
    Internal = 99,
}

impl DevbufResult {
    /// Interpret a code received from C. Unknown values map to `Internal`.
    pub(crate) fn from_raw(code: i32) -> Self {
        match code {
            0 => DevbufResult::Ok,
            1 => DevbufResult::OutOfMemory,
            2 => DevbufResult::OutOfSpace,
            3 => DevbufResult::InvalidArgument,
            4 => DevbufResult::UnsupportedOperation,
            _ => DevbufResult::Internal,
        }
    }
}

#[allow(dead_code)]
pub const DEVBUF_OK: DevbufResult = DevbufResult::Ok;
#[allow(dead_code)]
pub const DEVBUF_ERR_OUT_OF_MEMORY: DevbufResult = DevbufResult::OutOfMemory;
#[allow(dead_code)]
pub const DEVBUF_ERR_OUT_OF_SPACE: DevbufResult = DevbufResult::OutOfSpace;
#[allow(dead_code)]
pub const DEVBUF_ERR_INVALID_ARGUMENT: DevbufResult = DevbufResult::InvalidArgument;
#[allow(dead_code)]
pub const DEVBUF_ERR_UNSUPPORTED_OPERATION: DevbufResult = DevbufResult::UnsupportedOperation;
#[allow(dead_code)]
pub const DEVBUF_ERR_INTERNAL: DevbufResult = DevbufResult::Internal;

#[allow(dead_code)]
pub const DEVBUF_CMD_RESET: u32 = devbuf_registry::RESET;
#[allow(dead_code)]
pub const DEVBUF_CMD_RESTART: u32 = devbuf_registry::RESTART;
#[allow(dead_code)]
pub const DEVBUF_IOCTL_RESET: u32 = devbuf_registry::RESET_REQUEST;
#[allow(dead_code)]
pub const DEVBUF_IOCTL_RESTART: u32 = devbuf_registry::RESTART_REQUEST;

pub type DevbufRegistryHandle = *mut c_void;

pub(crate) struct RegistryHandle {
    pub(crate) registry: DeviceRegistry,
}
