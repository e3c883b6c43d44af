//! In-memory byte-stream devices, one per minor id.
//!
//! devbuf backs each minor with a fixed-capacity buffer: writes append,
//! reads drain sequentially, and two control commands rewind or clear the
//! stream.
//!
//! # Crate Structure
//!
//! - [`registry`] — The device buffer registry, control commands and ioctl numbers
//! - [`ffi`] — C-ABI entry points for a host driver shim (behind `ffi` feature)

/// Re-export registry types.
pub mod registry {
    pub use devbuf_registry::*;
}

/// Re-export C-ABI entry points (requires `ffi` feature).
#[cfg(feature = "ffi")]
pub mod ffi {
    pub use devbuf_ffi::*;
}
