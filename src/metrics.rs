use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one inbox. Cheap enough to update unconditionally
/// on the hot path; reading them is an independent relaxed load per counter
/// so a snapshot is not atomic across fields, only eventually consistent.
#[derive(Debug, Default)]
pub struct Metrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    send_retries: AtomicU64,
    drains: AtomicU64,
    reserve_spins: AtomicU64,
    cache_flushes: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, n: u64) {
        self.messages_received.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.send_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spin(&self) {
        self.reserve_spins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_flush(&self) {
        self.cache_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            send_retries: self.send_retries.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            reserve_spins: self.reserve_spins.load(Ordering::Relaxed),
            cache_flushes: self.cache_flushes.load(Ordering::Relaxed),
        }
    }
}

/// An immutable point-in-time copy of [`Metrics`], cheap to pass around and
/// compare in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub send_retries: u64,
    pub drains: u64,
    pub reserve_spins: u64,
    pub cache_flushes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = Metrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.record_sent();
        m.record_sent();
        m.record_received(3);
        m.record_retry();
        let snap = m.snapshot();
        assert_eq!(snap.messages_sent, 2);
        assert_eq!(snap.messages_received, 3);
        assert_eq!(snap.send_retries, 1);
    }
}
