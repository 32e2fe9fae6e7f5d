//! The reader protocol (§4.3): select the active buffer, swap roles, wait
//! out in-flight writers, and invoke handlers in deposit order. Never more
//! than one thread per inbox runs this at a time — enforced by the caller
//! holding the processing mutex.

use crate::backoff::Backoff;
use crate::header::MessageHeader;
use crate::logger::{LogLevel, Logger};
use crate::metrics::Metrics;
use crate::registry::HandlerRegistry;
use crate::window::{Field, RmaWindow};

const FREEZE_OFFSET: i64 = i32::MAX as i64 + 1; // 2^31, per spec's "≤ -2^31" frozen threshold

/// Tracks, across drain cycles, the tailpos the previous drain of each
/// buffer settled on — what the *next* drain's writer-drain wait (step 3)
/// looks for before it may reuse that buffer.
#[derive(Debug, Default)]
pub(crate) struct DrainState {
    prev_tail: [i64; 2],
}

impl DrainState {
    pub(crate) fn new() -> Self {
        Self { prev_tail: [0, 0] }
    }
}

/// Runs one non-blocking pass (`blocking = false`) or repeats until a pass
/// finds nothing to drain (`blocking = true`). Returns the number of
/// messages invoked.
pub(crate) fn drain_once(
    window: &dyn RmaWindow,
    state: &mut DrainState,
    registry: &dyn HandlerRegistry,
    logger: &dyn Logger,
    metrics: &Metrics,
) -> usize {
    // Step 1: active lives in this participant's own window memory; for a
    // window backed by real RMA memory this would be a plain local read, but
    // the no-op fetch is observationally identical and keeps the reader
    // uniform across every window it might run against.
    let active = window.fetch_read(Field::Active);
    debug_assert!(active == 0 || active == 1, "active must be 0 or 1");
    let active = active as u8;

    // Step 2: anything to drain at all?
    let tail = window.fetch_read(Field::Tail(active));
    if tail <= 0 {
        return 0;
    }

    let other = 1 - active;

    // Step 3: wait out writers still reserving space on `other` from the
    // interval between its previous swap and now.
    let mut backoff = Backoff::new();
    loop {
        let t = window.fetch_read(Field::Tail(other));
        if t == state.prev_tail[other as usize] {
            break;
        }
        metrics.record_spin();
        backoff.snooze();
    }

    // Step 4: the other buffer is now safe to reopen.
    window.fetch_replace(Field::Tail(other), 0);
    window.flush_remote();

    // Step 5: swap active. The delta direction depends on which buffer was
    // active; the fetched prior value must match what we observed in step 1
    // or something else illegally mutated `active`.
    let delta = if active == 0 { 1 } else { -1 };
    let prior = window.fetch_add(Field::Active, delta);
    assert_eq!(
        prior, active as i64,
        "active was mutated by someone other than the owner"
    );
    window.flush_remote();

    // Step 6: freeze the old (just-deactivated) buffer by pushing its tail
    // deep negative. Any writer racing this sees a negative reservation and
    // retracts via the same overflow path as "full".
    let sub = -tail - FREEZE_OFFSET;
    let tail_raw = window.fetch_add(Field::Tail(active), sub);
    // Deferred flush: the drain-barrier loop below will force visibility.

    // Step 7: wait for `ready` to converge on the last non-retracted
    // reservation. A fresh wait on a different condition than step 3's, so
    // it starts from a tight spin rather than inheriting step 3's escalation.
    backoff.reset();
    // Writers may still be retracting after observing the freeze, so
    // re-read `tail` each iteration and undo the freeze offset.
    let mut tail_effective;
    loop {
        let ready = window.fetch_read(Field::Ready(active));
        let current_tail = window.fetch_read(Field::Tail(active));
        tail_effective = current_tail - sub;
        debug_assert!(ready <= tail_effective, "ready must never exceed tail");
        if ready == tail_effective {
            break;
        }
        metrics.record_spin();
        backoff.snooze();
    }
    state.prev_tail[active as usize] = tail_effective + sub;

    // Step 8: reset ready — safe, the buffer is frozen and no writer can be
    // depositing into it.
    window.fetch_replace(Field::Ready(active), 0);
    window.flush_remote();

    logger.log(
        LogLevel::Debug,
        &format!("draining buffer {active}: {tail_effective} bytes, prior raw tail {tail_raw}"),
    );

    // Step 9: decode and dispatch messages in deposit order.
    let bytes = window.read(active, 0, tail_effective as usize);
    let mut pos = 0usize;
    let mut count = 0usize;
    while pos < bytes.len() {
        let remaining = bytes.len() - pos;
        assert!(
            remaining >= crate::header::HEADER_SIZE,
            "truncated header: protocol violation"
        );
        let header = MessageHeader::decode_from(&bytes[pos..]);
        pos += crate::header::HEADER_SIZE;
        let payload_size = header.payload_size as usize;
        assert!(
            pos + payload_size <= bytes.len(),
            "declared payload_size would read past the frozen buffer: protocol violation"
        );
        let payload = &bytes[pos..pos + payload_size];
        registry.invoke(header.handler_id, header.sender_id, payload);
        pos += payload_size;
        count += 1;
    }

    metrics.record_drain();
    metrics.record_received(count as u64);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header;
    use crate::logger::NoopLogger;
    use crate::window::InboxState;
    use std::sync::Mutex;

    struct CollectingRegistry {
        received: Mutex<Vec<(u64, u32, Vec<u8>)>>,
    }

    impl HandlerRegistry for CollectingRegistry {
        fn invoke(&self, handler_id: u64, sender_id: u32, payload: &[u8]) {
            self.received
                .lock()
                .unwrap()
                .push((handler_id, sender_id, payload.to_vec()));
        }
    }

    #[test]
    fn drains_a_single_message_in_order() {
        let window = InboxState::new(1024);
        let mut buf = vec![0u8; header::HEADER_SIZE + 5];
        header::encode_record(&mut buf, 7, 1, b"hello");
        crate::writer::send_raw(&window, &buf, buf.len(), &NoopLogger, &Metrics::new()).unwrap();

        let registry = CollectingRegistry {
            received: Mutex::new(Vec::new()),
        };
        let logger = NoopLogger;
        let metrics = Metrics::new();
        let mut state = DrainState::new();

        let n = drain_once(&window, &mut state, &registry, &logger, &metrics);
        assert_eq!(n, 1);
        assert_eq!(registry.received.lock().unwrap()[0].0, 7);
        assert_eq!(registry.received.lock().unwrap()[0].2, b"hello");

        // Buffer 0 (just drained) is frozen: tail pushed deep negative,
        // ready reset to 0. Buffer 1 (the new active buffer) has tail reset
        // to 0 by step 4 of the swap.
        assert!(window.fetch_read(Field::Tail(0)) <= -(1i64 << 31));
        assert_eq!(window.fetch_read(Field::Ready(0)), 0);
        assert_eq!(window.fetch_read(Field::Tail(1)), 0);
        assert_eq!(window.fetch_read(Field::Active), 1);
    }

    #[test]
    fn empty_buffer_drains_nothing() {
        let window = InboxState::new(1024);
        let registry = CollectingRegistry {
            received: Mutex::new(Vec::new()),
        };
        let logger = NoopLogger;
        let metrics = Metrics::new();
        let mut state = DrainState::new();

        let n = drain_once(&window, &mut state, &registry, &logger, &metrics);
        assert_eq!(n, 0);
    }

    #[test]
    fn preserves_deposit_order_within_a_buffer() {
        let window = InboxState::new(4096);
        for i in 0..32u8 {
            let mut buf = vec![0u8; header::HEADER_SIZE + 1];
            header::encode_record(&mut buf, i as u64, 0, &[i]);
            crate::writer::send_raw(&window, &buf, buf.len(), &NoopLogger, &Metrics::new()).unwrap();
        }

        let registry = CollectingRegistry {
            received: Mutex::new(Vec::new()),
        };
        let logger = NoopLogger;
        let metrics = Metrics::new();
        let mut state = DrainState::new();
        let n = drain_once(&window, &mut state, &registry, &logger, &metrics);
        assert_eq!(n, 32);
        let received = registry.received.lock().unwrap();
        for (i, (handler_id, _, payload)) in received.iter().enumerate() {
            assert_eq!(*handler_id, i as u64);
            assert_eq!(payload[0], i as u8);
        }
    }
}
