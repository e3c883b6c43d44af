use tracing::{debug, trace, warn};

use crate::error::{RegistryError, Result};

/// A minor id's buffer plus its read and write cursors.
///
/// Holds `read_cursor <= write_cursor <= capacity` after every call,
/// including failed ones.
#[derive(Debug)]
pub struct DeviceSlot {
    minor: u32,
    capacity: usize,
    buffer: Option<Box<[u8]>>,
    read_cursor: usize,
    write_cursor: usize,
}

impl DeviceSlot {
    /// Create an unallocated slot.
    pub fn new(minor: u32, capacity: usize) -> Self {
        Self {
            minor,
            capacity,
            buffer: None,
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    /// Append `data` at the write cursor.
    ///
    /// Either the whole slice is stored or nothing is.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let minor = self.minor;
        let start = self.write_cursor;
        let remaining = self.remaining();
        let buffer = self.ensure_allocated()?;
        let end = match start.checked_add(data.len()) {
            Some(end) if end <= buffer.len() => end,
            _ => {
                warn!(
                    minor,
                    requested = data.len(),
                    remaining,
                    "write exceeds slot capacity"
                );
                return Err(RegistryError::OutOfSpace {
                    minor,
                    requested: data.len(),
                    remaining,
                });
            }
        };

        buffer[start..end].copy_from_slice(data);
        self.write_cursor = end;
        trace!(minor, len = data.len(), "write");
        Ok(data.len())
    }

    /// Copy up to `out.len()` unread bytes into `out`.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let start = self.read_cursor;
        let len = out.len().min(self.available());
        let buffer = self.ensure_allocated()?;
        if len == 0 {
            return Ok(0);
        }

        out[..len].copy_from_slice(&buffer[start..start + len]);
        self.read_cursor += len;
        trace!(minor = self.minor, len, "read");
        Ok(len)
    }

    /// Clear the stream.
    pub fn reset(&mut self) {
        self.read_cursor = 0;
        self.write_cursor = 0;
        debug!(minor = self.minor, "slot reset");
    }

    /// Rewind the read position to the start of the stream.
    pub fn restart(&mut self) {
        self.read_cursor = 0;
        debug!(minor = self.minor, "slot restarted");
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Bytes written but not yet read.
    pub fn available(&self) -> usize {
        self.write_cursor - self.read_cursor
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.capacity - self.write_cursor
    }

    /// Drop the buffer. Returns true if one was held.
    pub(crate) fn release(&mut self) -> bool {
        self.read_cursor = 0;
        self.write_cursor = 0;
        self.buffer.take().is_some()
    }

    fn ensure_allocated(&mut self) -> Result<&mut [u8]> {
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => {
                let buffer = allocate_zeroed(self.capacity).ok_or(
                    RegistryError::AllocationFailed {
                        minor: Some(self.minor),
                        size: self.capacity,
                    },
                )?;
                debug!(minor = self.minor, capacity = self.capacity, "allocated slot buffer");
                buffer
            }
        };
        Ok(&mut self.buffer.insert(buffer)[..])
    }
}

/// Allocate a zeroed block, reporting failure instead of aborting.
fn allocate_zeroed(size: usize) -> Option<Box<[u8]>> {
    let mut block = Vec::new();
    block.try_reserve_exact(size).ok()?;
    block.resize(size, 0u8);
    Some(block.into_boxed_slice())
}
