//! The per-peer send cache (§4.4): a client-side coalescing buffer that
//! batches many small messages into one remote transfer.

use crate::error::AmqResult;
use crate::header::{self, HandlerId};
use crate::logger::Logger;
use crate::metrics::Metrics;
use crate::window::RmaWindow;
use std::sync::Mutex;

/// One peer's staging buffer. Created lazily on first use, lives as long as
/// the owning inbox.
pub(crate) struct SendCache {
    pos: usize,
    buffer: Box<[u8]>,
}

impl SendCache {
    fn new(capacity: usize) -> Self {
        Self {
            pos: 0,
            buffer: vec![0u8; capacity].into_boxed_slice(),
        }
    }
}

/// A lazily-created, mutex-protected cache slot for one peer. `Inbox` holds
/// one of these per peer; the mutex is never held across a substrate flush
/// longer than a single `send_raw` call.
pub(crate) struct CacheSlot {
    inner: Mutex<Option<SendCache>>,
    capacity: usize,
}

impl CacheSlot {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(None),
            capacity,
        }
    }

    /// Appends a header+payload record, flushing first if it wouldn't fit.
    /// `local_drain` is invoked between flush attempts that return
    /// `TryAgain`, so the caller doesn't deadlock waiting on a peer whose
    /// own cache is also full (§4.4's "run one non-blocking drain").
    pub(crate) fn push<F>(
        &self,
        target: &dyn RmaWindow,
        handler_id: HandlerId,
        sender_id: u32,
        payload: &[u8],
        logger: &dyn Logger,
        metrics: &Metrics,
        mut local_drain: F,
    ) -> AmqResult<()>
    where
        F: FnMut(),
    {
        let mut guard = self.inner.lock().unwrap();
        let cache = guard.get_or_insert_with(|| SendCache::new(self.capacity));

        let record_size = header::HEADER_SIZE + payload.len();
        if cache.pos + record_size > self.capacity {
            flush_locked(cache, target, logger, metrics, &mut local_drain)?;
        }

        if record_size > self.capacity {
            // Never fits in the staging buffer at all (S5): prior contents
            // are already flushed above, send this one directly instead of
            // trying to append it.
            let mut record = vec![0u8; record_size];
            header::encode_record(&mut record, handler_id, sender_id, payload);
            loop {
                match crate::writer::send_raw(target, &record, record_size, logger, metrics) {
                    Ok(()) => return Ok(()),
                    Err(crate::error::AmqError::TryAgain) => local_drain(),
                    Err(e) => return Err(e),
                }
            }
        }

        let cache = guard.as_mut().unwrap();
        let written =
            header::encode_record(&mut cache.buffer[cache.pos..], handler_id, sender_id, payload);
        cache.pos += written;
        Ok(())
    }

    /// Flushes this peer's cache if it holds anything, using the same
    /// retry-with-local-drain policy as [`CacheSlot::push`].
    pub(crate) fn flush<F>(
        &self,
        target: &dyn RmaWindow,
        logger: &dyn Logger,
        metrics: &Metrics,
        mut local_drain: F,
    ) -> AmqResult<()>
    where
        F: FnMut(),
    {
        let mut guard = self.inner.lock().unwrap();
        let Some(cache) = guard.as_mut() else {
            return Ok(());
        };
        if cache.pos == 0 {
            return Ok(());
        }
        flush_locked(cache, target, logger, metrics, &mut local_drain)
    }
}

fn flush_locked<F>(
    cache: &mut SendCache,
    target: &dyn RmaWindow,
    logger: &dyn Logger,
    metrics: &Metrics,
    local_drain: &mut F,
) -> AmqResult<()>
where
    F: FnMut(),
{
    loop {
        match crate::writer::send_raw(target, &cache.buffer, cache.pos, logger, metrics) {
            Ok(()) => {
                cache.pos = 0;
                metrics.record_cache_flush();
                return Ok(());
            }
            Err(crate::error::AmqError::TryAgain) => {
                local_drain();
            }
            Err(e) => return Err(e),
        }
    }
}
