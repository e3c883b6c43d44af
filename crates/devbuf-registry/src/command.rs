//! Control channel commands.
//!
//! Command code 0 clears a stream, code 1 rewinds its read position.
//! Encoded ioctl request numbers (see [`crate::ioctl`]) map onto the same
//! two commands.

use std::fmt;

use crate::error::{RegistryError, Result};
use crate::ioctl::{IoctlRequest, DEVBUF_MAGIC, RESET_REQUEST, RESTART_REQUEST};

/// Raw command code for [`ControlCommand::Reset`].
pub const RESET: u32 = 0;

/// Raw command code for [`ControlCommand::Restart`].
pub const RESTART: u32 = 1;

/// A control operation on a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Zero both cursors.
    Reset,
    /// Zero the read cursor only.
    Restart,
}

impl ControlCommand {
    /// Map a raw command code.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            RESET => Ok(ControlCommand::Reset),
            RESTART => Ok(ControlCommand::Restart),
            other => Err(RegistryError::UnsupportedCommand(other)),
        }
    }

    /// Map an encoded ioctl request number.
    ///
    /// Only the exact `_IOW('r', nr, int)` numbers are accepted.
    pub fn from_request(request: u32) -> Result<Self> {
        match request {
            RESET_REQUEST => Ok(ControlCommand::Reset),
            RESTART_REQUEST => Ok(ControlCommand::Restart),
            other => Err(RegistryError::UnsupportedCommand(other)),
        }
    }

    /// Raw command code.
    pub fn code(self) -> u32 {
        match self {
            ControlCommand::Reset => RESET,
            ControlCommand::Restart => RESTART,
        }
    }

    /// Encoded ioctl request number.
    pub fn request(self) -> u32 {
        match self {
            ControlCommand::Reset => RESET_REQUEST,
            ControlCommand::Restart => RESTART_REQUEST,
        }
    }

    /// Lower-case command name.
    pub fn name(self) -> &'static str {
        match self {
            ControlCommand::Reset => "reset",
            ControlCommand::Restart => "restart",
        }
    }

    /// All commands, in code order.
    pub fn all() -> [ControlCommand; 2] {
        [ControlCommand::Reset, ControlCommand::Restart]
    }
}

impl TryFrom<IoctlRequest> for ControlCommand {
    type Error = RegistryError;

    fn try_from(request: IoctlRequest) -> Result<Self> {
        if request.magic != DEVBUF_MAGIC {
            return Err(RegistryError::UnsupportedCommand(request.encode()));
        }
        Self::from_request(request.encode())
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn raw_codes_map_to_commands() {
        assert_eq!(ControlCommand::from_code(0).unwrap(), ControlCommand::Reset);
        assert_eq!(
            ControlCommand::from_code(1).unwrap(),
            ControlCommand::Restart
        );
    }

    #[test]
    fn unknown_code_is_unsupported() {
        let err = ControlCommand::from_code(2).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedCommand(2)));
        assert_eq!(err.code(), ErrorCode::UnsupportedOperation);
    }

    #[test]
    fn request_numbers_map_to_commands() {
        assert_eq!(
            ControlCommand::from_request(RESET_REQUEST).unwrap(),
            ControlCommand::Reset
        );
        assert_eq!(ControlCommand::Restart.request(), RESTART_REQUEST);
    }

    #[test]
    fn invalid_request_number_is_unsupported() {
        // _IOW('r', 128, int)
        let invalid = IoctlRequest::write(DEVBUF_MAGIC, 128, 4);
        assert!(matches!(
            ControlCommand::try_from(invalid),
            Err(RegistryError::UnsupportedCommand(_))
        ));

        // Raw code 0 is not a valid request number.
        assert!(ControlCommand::from_request(0).is_err());
    }

    #[test]
    fn foreign_magic_is_unsupported() {
        let foreign = IoctlRequest::write(b'T', 0, 4);
        assert!(ControlCommand::try_from(foreign).is_err());
        assert_eq!(
            ControlCommand::try_from(IoctlRequest::write(DEVBUF_MAGIC, 1, 4)).unwrap(),
            ControlCommand::Restart
        );
    }
}
