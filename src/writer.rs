//! The writer protocol (§4.2): reservation, payload deposit, completion
//! signalling, and the buffer-full/being-drained recovery path. Runs on the
//! sender; the substrate serializes atomics per target, so no sender-side
//! lock is needed here.

use crate::error::{AmqError, AmqResult};
use crate::header::{self, HandlerId, HEADER_SIZE};
use crate::logger::{LogLevel, Logger};
use crate::metrics::Metrics;
use crate::window::{Field, RmaWindow};

/// Sends `len` already-encoded bytes of `bytes` to `target`'s active buffer.
///
/// `bytes` is treated as opaque: callers that want header framing build it
/// themselves (see [`try_send`]) or hand over a cache's raw staging buffer.
pub(crate) fn send_raw(
    target: &dyn RmaWindow,
    bytes: &[u8],
    len: usize,
    logger: &dyn Logger,
    metrics: &Metrics,
) -> AmqResult<()> {
    debug_assert!(len <= bytes.len());
    let capacity = target.capacity();
    if len > capacity {
        return Err(AmqError::InvalidArg {
            reason: format!("message of {len} bytes exceeds buffer capacity {capacity}"),
        });
    }

    // Step 1: which buffer is currently open for writes.
    let active = target.fetch_read(Field::Active);
    debug_assert!(active == 0 || active == 1, "active must be 0 or 1");
    let active = active as u8;

    // Step 2: reserve space by fetch-and-add; the substrate serializes this
    // against every other writer targeting the same field.
    let offset = target.fetch_add(Field::Tail(active), len as i64);
    target.flush_local();

    if offset >= 0 && offset as usize + len <= capacity {
        // Step 4: deposit the payload into the reserved range.
        target.put(active, offset as usize, &bytes[..len]);
        target.flush_remote();

        // Step 5: publish completion.
        target.fetch_add(Field::Ready(active), len as i64);
        target.flush_remote();

        logger.log(
            LogLevel::Trace,
            &format!("deposited {len} bytes into buffer {active} at offset {offset}"),
        );
        metrics.record_sent();
        Ok(())
    } else {
        // Step 3 (overflow branch): retract. This also fires when the owner
        // has frozen the buffer — tail went large-negative — so "full" and
        // "being drained" share one recovery path.
        target.fetch_add(Field::Tail(active), -(len as i64));
        target.flush_remote();
        logger.log(
            LogLevel::Trace,
            &format!("reservation on buffer {active} failed at offset {offset}, retracting"),
        );
        metrics.record_retry();
        Err(AmqError::TryAgain)
    }
}

/// Encodes `handler_id` + `payload` as a single message and sends it via
/// [`send_raw`]. This is the synchronous, uncached path exposed as
/// `try_send` on [`crate::Inbox`].
pub(crate) fn try_send(
    target: &dyn RmaWindow,
    handler_id: HandlerId,
    sender_id: u32,
    payload: &[u8],
    logger: &dyn Logger,
    metrics: &Metrics,
) -> AmqResult<()> {
    let total = HEADER_SIZE + payload.len();
    if total > target.capacity() {
        return Err(AmqError::InvalidArg {
            reason: format!(
                "payload of {} bytes exceeds max message size {}",
                payload.len(),
                target.capacity().saturating_sub(HEADER_SIZE)
            ),
        });
    }

    let mut buf = vec![0u8; total];
    header::encode_record(&mut buf, handler_id, sender_id, payload);
    send_raw(target, &buf, total, logger, metrics)
}
