//! Per-minor byte-stream buffers with lazy allocation and bounded append.
//!
//! This is the core of devbuf. A [`DeviceRegistry`] owns one slot per minor
//! id. Each slot holds:
//! - A fixed-capacity buffer, allocated on first read or write
//! - A write cursor advanced by appends
//! - A read cursor advanced by sequential drains
//!
//! Control commands rewind ([`ControlCommand::Restart`]) or clear
//! ([`ControlCommand::Reset`]) a stream. Every failure carries an
//! [`ErrorCode`] the integration layer relays to its caller.

pub mod command;
pub mod config;
pub mod error;
pub mod ioctl;
pub mod registry;
pub mod slot;

pub use command::{ControlCommand, RESET, RESTART};
pub use config::{RegistryConfig, DEFAULT_CAPACITY, MAX_MINORS};
pub use error::{ErrorCode, RegistryError, Result};
pub use ioctl::{IoctlRequest, DEVBUF_MAGIC, RESET_REQUEST, RESTART_REQUEST};
pub use registry::{DeviceRegistry, SlotStat};
pub use slot::DeviceSlot;
