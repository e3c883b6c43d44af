use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::command::ControlCommand;
use crate::config::{RegistryConfig, MAX_MINORS};
use crate::error::{RegistryError, Result};
use crate::slot::DeviceSlot;

/// Point-in-time view of one slot's cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStat {
    pub minor: u32,
    pub allocated: bool,
    pub capacity: usize,
    pub read_cursor: usize,
    pub write_cursor: usize,
    /// Bytes written but not yet read.
    pub available: usize,
    /// Bytes that can still be appended.
    pub remaining: usize,
}

/// Minor-indexed table of independent byte-stream slots.
///
/// Every operation locks only the addressed slot, so callers on different
/// minors never contend. All open handles on one minor share its cursors.
pub struct DeviceRegistry {
    slots: Vec<Mutex<DeviceSlot>>,
    config: RegistryConfig,
}

impl DeviceRegistry {
    /// Create a registry with the default config (256 slots of 4096 bytes).
    pub fn new() -> Self {
        let config = RegistryConfig::default();
        let slots = (0..config.max_minors)
            .map(|minor| Mutex::new(DeviceSlot::new(minor, config.capacity)))
            .collect();
        Self { slots, config }
    }

    /// Create a registry with explicit config.
    ///
    /// Fails if the config is unusable or the slot table cannot be allocated.
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(RegistryError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if config.max_minors == 0 || config.max_minors > MAX_MINORS {
            return Err(RegistryError::InvalidConfig(format!(
                "max_minors must be in 1..={MAX_MINORS}, got {}",
                config.max_minors
            )));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(config.max_minors as usize)
            .map_err(|_| RegistryError::AllocationFailed {
                minor: None,
                size: config.max_minors as usize * std::mem::size_of::<Mutex<DeviceSlot>>(),
            })?;
        slots.extend(
            (0..config.max_minors).map(|minor| Mutex::new(DeviceSlot::new(minor, config.capacity))),
        );

        info!(
            capacity = config.capacity,
            max_minors = config.max_minors,
            "device registry initialized"
        );
        Ok(Self { slots, config })
    }

    /// Validate that `minor` addresses a slot. No state changes.
    pub fn open(&self, minor: u32) -> Result<()> {
        self.check_minor(minor)
    }

    /// Validate that `minor` addresses a slot. No state changes.
    pub fn close(&self, minor: u32) -> Result<()> {
        self.check_minor(minor)
    }

    /// Append `data` to the slot, all or nothing. Returns `data.len()`.
    pub fn write(&self, minor: u32, data: &[u8]) -> Result<usize> {
        self.lock(minor)?.write(data)
    }

    /// Drain up to `out.len()` unread bytes into `out`.
    pub fn read(&self, minor: u32, out: &mut [u8]) -> Result<usize> {
        self.lock(minor)?.read(out)
    }

    /// Drain up to `max_len` unread bytes into a fresh buffer.
    pub fn read_to_bytes(&self, minor: u32, max_len: usize) -> Result<Bytes> {
        let mut slot = self.lock(minor)?;
        let mut out = vec![0u8; max_len.min(slot.available())];
        let read = slot.read(&mut out)?;
        out.truncate(read);
        Ok(Bytes::from(out))
    }

    /// Clear the stream on `minor`.
    pub fn reset(&self, minor: u32) -> Result<()> {
        self.lock(minor)?.reset();
        Ok(())
    }

    /// Rewind the read position on `minor`, keeping written bytes.
    pub fn restart(&self, minor: u32) -> Result<()> {
        self.lock(minor)?.restart();
        Ok(())
    }

    /// Run a control command against `minor`.
    pub fn control(&self, minor: u32, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Reset => self.reset(minor),
            ControlCommand::Restart => self.restart(minor),
        }
    }

    /// Dispatch a raw command code (0 = reset, 1 = restart).
    ///
    /// `_arg` is accepted for interface compatibility and ignored.
    pub fn dispatch(&self, minor: u32, code: u32, _arg: u64) -> Result<()> {
        self.check_minor(minor)?;
        let command = ControlCommand::from_code(code).inspect_err(|_| {
            warn!(minor, code, "unsupported control command");
        })?;
        self.control(minor, command)
    }

    /// Dispatch an encoded ioctl request number.
    ///
    /// `_arg` is accepted for interface compatibility and ignored.
    pub fn ioctl(&self, minor: u32, request: u32, _arg: u64) -> Result<()> {
        self.check_minor(minor)?;
        let command = ControlCommand::from_request(request).inspect_err(|_| {
            warn!(minor, request, "unsupported ioctl request");
        })?;
        self.control(minor, command)
    }

    /// Snapshot the cursors of `minor`.
    pub fn stat(&self, minor: u32) -> Result<SlotStat> {
        let slot = self.lock(minor)?;
        Ok(SlotStat {
            minor,
            allocated: slot.is_allocated(),
            capacity: slot.capacity(),
            read_cursor: slot.read_cursor(),
            write_cursor: slot.write_cursor(),
            available: slot.available(),
            remaining: slot.remaining(),
        })
    }

    /// Minors whose buffers have been allocated, in ascending order.
    pub fn allocated_minors(&self) -> Vec<u32> {
        self.slots
            .iter()
            .map(lock_slot)
            .filter(|slot| slot.is_allocated())
            .map(|slot| slot.minor())
            .collect()
    }

    /// Number of allocated slots.
    pub fn allocated_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| lock_slot(slot).is_allocated())
            .count()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Release every slot buffer and return how many were held.
    pub fn teardown(mut self) -> usize {
        let released = self.release_all();
        info!(released, "device registry torn down");
        released
    }

    fn release_all(&mut self) -> usize {
        self.slots
            .iter_mut()
            .map(|slot| {
                slot.get_mut()
                    .unwrap_or_else(PoisonError::into_inner)
                    .release()
            })
            .filter(|released| *released)
            .count()
    }

    fn check_minor(&self, minor: u32) -> Result<()> {
        if (minor as usize) < self.slots.len() {
            Ok(())
        } else {
            Err(RegistryError::InvalidMinor {
                minor,
                max_minors: self.config.max_minors,
            })
        }
    }

    fn lock(&self, minor: u32) -> Result<MutexGuard<'_, DeviceSlot>> {
        self.slots
            .get(minor as usize)
            .map(lock_slot)
            .ok_or(RegistryError::InvalidMinor {
                minor,
                max_minors: self.config.max_minors,
            })
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!(released, "released slot buffers on drop");
        }
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("config", &self.config)
            .field("slots", &self.slots.len())
            .finish()
    }
}

// Slot state is only mutated after every fallible step succeeds, so a
// panic while holding the lock cannot leave broken cursors behind.
fn lock_slot(slot: &Mutex<DeviceSlot>) -> MutexGuard<'_, DeviceSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::{RESET, RESTART};
    use crate::error::ErrorCode;
    use crate::ioctl::{IoctlRequest, DEVBUF_MAGIC, RESET_REQUEST, RESTART_REQUEST};

    fn read_all(registry: &DeviceRegistry, minor: u32, max_len: usize) -> Vec<u8> {
        registry.read_to_bytes(minor, max_len).unwrap().to_vec()
    }

    #[test]
    fn write_then_read_returns_same_bytes() {
        let registry = DeviceRegistry::new();
        let payload: Vec<u8> = (0..=255u8).collect();

        assert_eq!(registry.write(0, &payload).unwrap(), 256);
        assert_eq!(read_all(&registry, 0, 1000), payload);
    }

    #[test]
    fn hello_scenario() {
        let registry = DeviceRegistry::new();

        assert_eq!(registry.write(3, b"HELLO").unwrap(), 5);
        assert_eq!(read_all(&registry, 3, 5), b"HELLO");
        assert!(read_all(&registry, 3, 1).is_empty());

        registry.restart(3).unwrap();
        assert_eq!(read_all(&registry, 3, 5), b"HELLO");

        registry.reset(3).unwrap();
        assert!(read_all(&registry, 3, 5).is_empty());
    }

    #[test]
    fn fills_exactly_to_capacity() {
        let registry = DeviceRegistry::new();
        registry.write(7, &[b'a'; 4090]).unwrap();

        let err = registry.write(7, &[b'b'; 10]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfSpace);
        assert_eq!(registry.stat(7).unwrap().write_cursor, 4090);

        assert_eq!(registry.write(7, &[b'c'; 6]).unwrap(), 6);
        let stat = registry.stat(7).unwrap();
        assert_eq!(stat.write_cursor, 4096);
        assert_eq!(stat.remaining, 0);
    }

    #[test]
    fn byte_at_a_time_until_full() {
        let registry = DeviceRegistry::new();
        for _ in 0..4096 {
            registry.write(0, b"a").unwrap();
        }
        assert!(matches!(
            registry.write(0, b"a"),
            Err(RegistryError::OutOfSpace { remaining: 0, .. })
        ));
        assert_eq!(read_all(&registry, 0, 100_000), vec![b'a'; 4096]);
    }

    #[test]
    fn oversized_write_keeps_earlier_bytes() {
        let registry = DeviceRegistry::new();
        registry.write(0, b"hiush").unwrap();
        assert!(registry.write(0, &[b'a'; 4096]).is_err());
        assert_eq!(read_all(&registry, 0, 100_000), b"hiush");
    }

    #[test]
    fn reset_then_read_is_empty() {
        let registry = DeviceRegistry::new();
        registry.write(1, b"lolz").unwrap();
        registry.reset(1).unwrap();

        let mut out = [0u8; 16];
        assert_eq!(registry.read(1, &mut out).unwrap(), 0);

        registry.write(1, b"lolz").unwrap();
        assert_eq!(read_all(&registry, 1, 4096), b"lolz");
        assert!(read_all(&registry, 1, 4096).is_empty());
    }

    #[test]
    fn restart_after_partial_drain_replays_from_start() {
        let registry = DeviceRegistry::new();
        registry.write(2, b"abcdef").unwrap();
        assert_eq!(read_all(&registry, 2, 2), b"ab");

        registry.restart(2).unwrap();
        registry.write(2, b"gh").unwrap();
        assert_eq!(read_all(&registry, 2, 100), b"abcdefgh");
    }

    #[test]
    fn read_on_fresh_minor_allocates() {
        let registry = DeviceRegistry::new();
        assert!(registry.allocated_minors().is_empty());

        let mut out = [0u8; 10];
        assert_eq!(registry.read(9, &mut out).unwrap(), 0);
        assert_eq!(registry.allocated_minors(), vec![9]);
    }

    #[test]
    fn reset_does_not_allocate() {
        let registry = DeviceRegistry::new();
        registry.reset(4).unwrap();
        registry.restart(4).unwrap();
        assert!(!registry.stat(4).unwrap().allocated);
    }

    #[test]
    fn minors_are_independent() {
        let registry = DeviceRegistry::new();
        for minor in 0..10u32 {
            let text = format!("minor {minor}");
            registry.write(minor, text.as_bytes()).unwrap();
            assert_eq!(read_all(&registry, minor, 4096), text.as_bytes());
            registry.restart(minor).unwrap();
        }
        for minor in 0..10u32 {
            let text = format!("minor {minor}");
            assert_eq!(read_all(&registry, minor, 4096), text.as_bytes());
        }

        registry.reset(0).unwrap();
        assert_eq!(registry.stat(1).unwrap().write_cursor, "minor 1".len());
    }

    #[test]
    fn out_of_range_minor_is_invalid() {
        let registry = DeviceRegistry::new();
        let mut out = [0u8; 4];

        assert_eq!(registry.open(255).ok(), Some(()));
        for err in [
            registry.open(256).unwrap_err(),
            registry.close(1000).unwrap_err(),
            registry.write(256, b"x").unwrap_err(),
            registry.read(256, &mut out).unwrap_err(),
            registry.reset(256).unwrap_err(),
            registry.dispatch(256, RESET, 0).unwrap_err(),
        ] {
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }
    }

    #[test]
    fn raw_command_codes_dispatch() {
        let registry = DeviceRegistry::new();
        registry.write(0, b"xyz").unwrap();
        read_all(&registry, 0, 3);

        registry.dispatch(0, RESTART, 0).unwrap();
        assert_eq!(registry.stat(0).unwrap().available, 3);

        registry.dispatch(0, RESET, 42).unwrap();
        assert_eq!(registry.stat(0).unwrap().write_cursor, 0);

        let err = registry.dispatch(0, 5, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedOperation);
    }

    #[test]
    fn ioctl_requests_dispatch() {
        let registry = DeviceRegistry::new();
        registry.write(0, b"xyz").unwrap();
        read_all(&registry, 0, 3);

        registry.ioctl(0, RESTART_REQUEST, 0).unwrap();
        assert_eq!(read_all(&registry, 0, 10), b"xyz");

        registry.ioctl(0, RESET_REQUEST, 0).unwrap();
        assert_eq!(registry.stat(0).unwrap().write_cursor, 0);

        let invalid = IoctlRequest::write(DEVBUF_MAGIC, 128, 4).encode();
        assert!(matches!(
            registry.ioctl(0, invalid, 0),
            Err(RegistryError::UnsupportedCommand(_))
        ));
    }

    #[test]
    fn config_is_validated() {
        let zero_capacity = RegistryConfig {
            capacity: 0,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            DeviceRegistry::with_config(zero_capacity),
            Err(RegistryError::InvalidConfig(_))
        ));

        let too_many = RegistryConfig {
            max_minors: 257,
            ..RegistryConfig::default()
        };
        assert!(DeviceRegistry::with_config(too_many).is_err());

        let small = RegistryConfig {
            capacity: 8,
            max_minors: 2,
        };
        let registry = DeviceRegistry::with_config(small).unwrap();
        assert!(registry.open(1).is_ok());
        assert!(registry.open(2).is_err());
        assert!(registry.write(0, b"123456789").is_err());
    }

    #[test]
    fn teardown_releases_allocated_slots() {
        let registry = DeviceRegistry::new();
        registry.write(0, b"a").unwrap();
        registry.write(200, b"b").unwrap();
        let mut out = [0u8; 1];
        registry.read(17, &mut out).unwrap();

        assert_eq!(registry.allocated_count(), 3);
        assert_eq!(registry.teardown(), 3);
    }

    #[test]
    fn shared_handles_see_one_cursor() {
        let registry = Arc::new(DeviceRegistry::new());
        let writer = Arc::clone(&registry);
        let reader = Arc::clone(&registry);

        writer.write(5, b"lolz").unwrap();
        assert_eq!(read_all(&reader, 5, 4096), b"lolz");
        assert!(read_all(&writer, 5, 4096).is_empty());
    }

    #[test]
    fn concurrent_writers_never_overflow() {
        let registry = DeviceRegistry::new();
        let accepted = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        if registry.write(0, &[0xAB; 7]).is_ok() {
                            accepted.fetch_add(7, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let stat = registry.stat(0).unwrap();
        assert_eq!(
            stat.write_cursor,
            accepted.load(std::sync::atomic::Ordering::Relaxed)
        );
        assert!(stat.write_cursor <= 4096);
        assert!(stat.remaining < 7);
    }

    #[test]
    fn concurrent_minors_stay_isolated() {
        let registry = DeviceRegistry::new();

        std::thread::scope(|scope| {
            for minor in 0..16u32 {
                let registry = &registry;
                scope.spawn(move || {
                    let byte = minor as u8;
                    for _ in 0..64 {
                        registry.write(minor, &[byte; 4]).unwrap();
                    }
                });
            }
        });

        for minor in 0..16u32 {
            let bytes = read_all(&registry, minor, 4096);
            assert_eq!(bytes.len(), 256);
            assert!(bytes.iter().all(|b| *b == minor as u8));
        }
    }

    #[test]
    fn debug_does_not_lock_slots() {
        let registry = DeviceRegistry::new();
        let _guard = registry.lock(0).unwrap();
        let text = format!("{registry:?}");
        assert!(text.contains("slots: 256"));
    }

    #[test]
    fn failed_allocation_leaves_slot_unallocated() {
        let registry = DeviceRegistry::with_config(RegistryConfig {
            capacity: usize::MAX,
            max_minors: 2,
        })
        .unwrap();

        let err = registry.write(1, b"x").unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfMemory);
        assert!(registry.read(1, &mut [0u8; 4]).is_err());

        let stat = registry.stat(1).unwrap();
        assert!(!stat.allocated);
        assert_eq!(stat.write_cursor, 0);
        assert_eq!(registry.allocated_count(), 0);
    }
}
