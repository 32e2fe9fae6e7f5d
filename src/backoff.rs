use std::hint;
use std::thread;

/// Adaptive backoff for the spin loops in the writer and reader protocols.
///
/// Progressively widens the wait between polls: tight `PAUSE` spins first,
/// then yields to the OS scheduler. Used by the reader's writer-drain and
/// drain-barrier waits (§4.3 steps 3 and 7) and by callers retrying a
/// `TryAgain` from `send_raw`, so a busy peer doesn't starve other threads
/// on the same core.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;

    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Tight spin with `PAUSE` hints, no OS involvement.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Spin, then fall back to yielding the thread once spinning has been
    /// tried enough times. Call this in a loop until the awaited condition
    /// holds; it never blocks indefinitely on its own.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= Self::YIELD_LIMIT {
                self.step += 1;
            }
        }
    }

    /// Resets the escalation, as if this `Backoff` were newly created.
    /// Callers that wait on more than one condition in sequence (the reader
    /// waits out writers in step 3, then waits for `ready` to converge in
    /// step 7) call this between waits so the second wait starts from a
    /// tight spin instead of inheriting the first wait's escalation.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_escalates_then_resets() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.spin();
        assert!(b.step > 0);

        for _ in 0..(Backoff::YIELD_LIMIT + 1) {
            b.snooze();
        }
        assert!(b.step > Backoff::SPIN_LIMIT);

        b.reset();
        assert_eq!(b.step, 0);
    }
}
