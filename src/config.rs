/// Open-time parameters for an [`crate::Inbox`].
///
/// Mirrors the original queue sizing formula: `capacity = msg_count *
/// (header_size + max_payload)`. All participants in a group must open with
/// identical values — the window layout is the wire format, there is no
/// negotiation.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Largest payload a single message may carry.
    pub max_payload: usize,
    /// Number of in-flight messages a single buffer can hold at capacity.
    pub msg_count: usize,
    /// Size in bytes of each peer's send-side staging buffer.
    pub cache_size: usize,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `max_payload` or `msg_count` is zero, or if `cache_size` is
    /// smaller than a single header (a cache that can never hold one record
    /// is never useful).
    pub const fn new(max_payload: usize, msg_count: usize, cache_size: usize) -> Self {
        assert!(max_payload > 0, "max_payload must be greater than 0");
        assert!(msg_count > 0, "msg_count must be greater than 0");
        assert!(
            cache_size >= crate::header::HEADER_SIZE,
            "cache_size must hold at least one header"
        );

        Self {
            max_payload,
            msg_count,
            cache_size,
        }
    }

    /// Returns the capacity of a single buffer, in bytes.
    #[inline]
    pub const fn buffer_capacity(&self) -> usize {
        self.msg_count * (crate::header::HEADER_SIZE + self.max_payload)
    }
}

impl Default for Config {
    fn default() -> Self {
        // MSGCACHE_SIZE from the original: 4 KiB per-peer staging buffer.
        Self::new(256, 64, 4 * 1024)
    }
}

/// Preset tuned for many small messages and frequent drains.
pub const LOW_LATENCY_CONFIG: Config = Config::new(64, 128, 2 * 1024);

/// Preset tuned for fewer, larger messages with infrequent drains.
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(4096, 256, 16 * 1024);
