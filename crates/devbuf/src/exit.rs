use std::fmt;
use std::io;

use devbuf_registry::{ErrorCode, RegistryError};

use crate::script::ScriptError;

// Process exit codes (DDR-0002 numbering).
pub const SUCCESS: i32 = 0;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Exit code for a registry result code.
pub fn code_for(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidArgument | ErrorCode::UnsupportedOperation => USAGE,
        ErrorCode::OutOfSpace => DATA_INVALID,
        ErrorCode::OutOfMemory => INTERNAL,
    }
}

pub fn registry_error(context: &str, err: &RegistryError) -> CliError {
    CliError::new(code_for(err.code()), format!("{context}: {err}"))
}

pub fn script_error(err: ScriptError) -> CliError {
    CliError::new(USAGE, format!("invalid script: {err}"))
}
