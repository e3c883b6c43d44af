use std::fmt;

/// Result code surfaced to the integration layer for every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Buffer allocation failed or a copy to/from the caller faulted.
    OutOfMemory,
    /// The write would run past the slot capacity.
    OutOfSpace,
    /// Minor id out of range or otherwise malformed argument.
    InvalidArgument,
    /// Unrecognized control command.
    UnsupportedOperation,
}

impl ErrorCode {
    /// Stable upper-case name, as used in result records.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
            ErrorCode::OutOfSpace => "OUT_OF_SPACE",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The minor id does not address a configured slot.
    #[error("minor {minor} out of range (max {max_minors} devices)")]
    InvalidMinor { minor: u32, max_minors: u32 },

    /// The registry configuration cannot be used.
    #[error("invalid registry config: {0}")]
    InvalidConfig(String),

    /// The slot buffer or slot table could not be allocated.
    #[error("failed to allocate {size} bytes{}", minor_suffix(.minor))]
    AllocationFailed { minor: Option<u32>, size: usize },

    /// Copying bytes across the caller boundary failed.
    #[error("bad address while copying {len} bytes for minor {minor}")]
    BadAddress { minor: u32, len: usize },

    /// The write does not fit in the remaining capacity.
    #[error("no space on minor {minor} ({requested} bytes requested, {remaining} remaining)")]
    OutOfSpace {
        minor: u32,
        requested: usize,
        remaining: usize,
    },

    /// The control command code is not recognized.
    #[error("unsupported control command {0:#x}")]
    UnsupportedCommand(u32),
}

impl RegistryError {
    /// The result code the integration layer relays for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::InvalidMinor { .. } | RegistryError::InvalidConfig(_) => {
                ErrorCode::InvalidArgument
            }
            RegistryError::AllocationFailed { .. } | RegistryError::BadAddress { .. } => {
                ErrorCode::OutOfMemory
            }
            RegistryError::OutOfSpace { .. } => ErrorCode::OutOfSpace,
            RegistryError::UnsupportedCommand(_) => ErrorCode::UnsupportedOperation,
        }
    }
}

fn minor_suffix(minor: &Option<u32>) -> String {
    match *minor {
        Some(minor) => format!(" for minor {minor}"),
        None => " for slot table".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
