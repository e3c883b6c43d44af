//! Linux ioctl request numbers for the control channel.
//!
//! Request layout (32 bits):
//! ```text
//! ┌──────────┬──────────────┬──────────┬──────────┐
//! │ dir (2b) │ size (14b)   │ type (8b)│ nr (8b)  │
//! │ 31..30   │ 29..16       │ 15..8    │ 7..0     │
//! └──────────┴──────────────┴──────────┴──────────┘
//! ```

const NR_BITS: u32 = 8;
const TYPE_BITS: u32 = 8;
const SIZE_BITS: u32 = 14;
const DIR_BITS: u32 = 2;

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = NR_SHIFT + NR_BITS;
const SIZE_SHIFT: u32 = TYPE_SHIFT + TYPE_BITS;
const DIR_SHIFT: u32 = SIZE_SHIFT + SIZE_BITS;

const NR_MASK: u32 = (1 << NR_BITS) - 1;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;
const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
const DIR_MASK: u32 = (1 << DIR_BITS) - 1;

/// No data transfer.
pub const IOC_NONE: u8 = 0;
/// Userspace writes the argument.
pub const IOC_WRITE: u8 = 1;
/// Userspace reads the argument.
pub const IOC_READ: u8 = 2;

/// Magic (type) byte shared by all devbuf requests.
pub const DEVBUF_MAGIC: u8 = b'r';

/// `_IOW('r', 0, int)`: clear the stream.
pub const RESET_REQUEST: u32 = IoctlRequest::write(DEVBUF_MAGIC, 0, INT_SIZE).encode();

/// `_IOW('r', 1, int)`: rewind the read cursor.
pub const RESTART_REQUEST: u32 = IoctlRequest::write(DEVBUF_MAGIC, 1, INT_SIZE).encode();

const INT_SIZE: u16 = std::mem::size_of::<i32>() as u16;

/// A decoded ioctl request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoctlRequest {
    pub dir: u8,
    pub magic: u8,
    pub nr: u8,
    pub size: u16,
}

impl IoctlRequest {
    /// `_IO(magic, nr)`.
    pub const fn none(magic: u8, nr: u8) -> Self {
        Self {
            dir: IOC_NONE,
            magic,
            nr,
            size: 0,
        }
    }

    /// `_IOW(magic, nr, size)`.
    pub const fn write(magic: u8, nr: u8, size: u16) -> Self {
        Self {
            dir: IOC_WRITE,
            magic,
            nr,
            size,
        }
    }

    /// `_IOR(magic, nr, size)`.
    pub const fn read(magic: u8, nr: u8, size: u16) -> Self {
        Self {
            dir: IOC_READ,
            magic,
            nr,
            size,
        }
    }

    /// Pack into the 32-bit request number. Out-of-range fields are masked.
    pub const fn encode(self) -> u32 {
        ((self.dir as u32 & DIR_MASK) << DIR_SHIFT)
            | ((self.size as u32 & SIZE_MASK) << SIZE_SHIFT)
            | ((self.magic as u32 & TYPE_MASK) << TYPE_SHIFT)
            | ((self.nr as u32 & NR_MASK) << NR_SHIFT)
    }

    /// Split a 32-bit request number into its fields.
    pub const fn decode(request: u32) -> Self {
        Self {
            dir: ((request >> DIR_SHIFT) & DIR_MASK) as u8,
            magic: ((request >> TYPE_SHIFT) & TYPE_MASK) as u8,
            nr: ((request >> NR_SHIFT) & NR_MASK) as u8,
            size: ((request >> SIZE_SHIFT) & SIZE_MASK) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_numbers_match_linux_encoding() {
        // _IOW('r', 0, int) and _IOW('r', 1, int) with a 4-byte int.
        assert_eq!(RESET_REQUEST, 0x4004_7200);
        assert_eq!(RESTART_REQUEST, 0x4004_7201);
    }

    #[test]
    fn decode_splits_fields() {
        let req = IoctlRequest::decode(RESTART_REQUEST);
        assert_eq!(req.dir, IOC_WRITE);
        assert_eq!(req.magic, b'r');
        assert_eq!(req.nr, 1);
        assert_eq!(req.size, 4);
    }

    #[test]
    fn none_and_read_directions() {
        assert_eq!(IoctlRequest::none(b'r', 2).encode(), 0x0000_7202);
        let read = IoctlRequest::read(b'T', 0x13, 8);
        assert_eq!(IoctlRequest::decode(read.encode()), read);
        assert_eq!(read.encode() >> 30, IOC_READ as u32);
    }

    #[test]
    fn oversized_size_is_masked() {
        let req = IoctlRequest::write(b'r', 0, u16::MAX);
        assert_eq!(IoctlRequest::decode(req.encode()).size, 0x3FFF);
    }
}
