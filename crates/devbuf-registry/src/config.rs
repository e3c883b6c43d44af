/// Default per-slot buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Largest number of minor ids a registry can address.
pub const MAX_MINORS: u32 = 256;

/// Controls registry sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Fixed capacity of every slot buffer.
    pub capacity: usize,
    /// Number of slots; valid minors are `0..max_minors`.
    pub max_minors: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_minors: MAX_MINORS,
        }
    }
}
