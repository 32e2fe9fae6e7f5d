//! Lifecycle and public operations (§4.6, §6): `open_inbox`, `close_inbox`,
//! `try_send`, `buffered_send`, `flush`, `process`, `process_blocking`.

use crate::cache::CacheSlot;
use crate::config::Config;
use crate::error::{AmqError, AmqResult};
use crate::group::Group;
use crate::header::HandlerId;
use crate::logger::{LogLevel, Logger};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::quiesce;
use crate::reader::{self, DrainState};
use crate::registry::HandlerRegistry;
use crate::window::{Field, RmaWindow};
use crate::writer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct InboxInner {
    config: Config,
    group: Arc<dyn Group>,
    own_window: Arc<dyn RmaWindow>,
    caches: Vec<CacheSlot>,
    processing_mutex: Mutex<()>,
    drain_state: Mutex<DrainState>,
    registry: Arc<dyn HandlerRegistry>,
    logger: Arc<dyn Logger>,
    metrics: Metrics,
    closed: AtomicBool,
}

/// A double-buffered active-message inbox for one participant of a [`Group`].
///
/// Cheap to clone — internally `Arc`-backed, so every clone shares the same
/// window, caches, and processing mutex, the way [`crate`]'s teacher crate
/// shares a channel's inner state across `Producer` handles.
#[derive(Clone)]
pub struct Inbox {
    inner: Arc<InboxInner>,
}

impl Inbox {
    /// Opens an inbox for this participant. Collective: every member of
    /// `group` must call this before any of them sends or processes.
    pub fn open(
        config: Config,
        group: Arc<dyn Group>,
        registry: Arc<dyn HandlerRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let own_window = group.window(group.rank());
        let caches = (0..group.size())
            .map(|_| CacheSlot::new(config.cache_size))
            .collect();

        let inbox = Self {
            inner: Arc::new(InboxInner {
                config,
                group: Arc::clone(&group),
                own_window,
                caches,
                processing_mutex: Mutex::new(()),
                drain_state: Mutex::new(DrainState::new()),
                registry,
                logger,
                metrics: Metrics::new(),
                closed: AtomicBool::new(false),
            }),
        };

        // Readiness barrier: every participant's window is zeroed and
        // reachable before anyone may send to it.
        group.barrier();
        inbox
    }

    /// This participant's rank within the group it opened with.
    pub fn rank(&self) -> usize {
        self.inner.group.rank()
    }

    pub fn config(&self) -> Config {
        self.inner.config
    }

    /// A snapshot of this inbox's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn check_open(&self) -> AmqResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(AmqError::Closed);
        }
        Ok(())
    }

    fn resolve_target(&self, target: usize) -> AmqResult<Arc<dyn RmaWindow>> {
        if target >= self.inner.group.size() {
            return Err(AmqError::InvalidArg {
                reason: format!(
                    "target {target} is out of range for a group of size {}",
                    self.inner.group.size()
                ),
            });
        }
        Ok(self.inner.group.window(target))
    }

    /// The synchronous, uncached send path (§4.2 + §6 `try_send`).
    pub fn try_send(&self, target: usize, handler_id: HandlerId, payload: &[u8]) -> AmqResult<()> {
        self.check_open()?;
        let window = self.resolve_target(target)?;
        writer::try_send(
            window.as_ref(),
            handler_id,
            self.rank() as u32,
            payload,
            self.inner.logger.as_ref(),
            &self.inner.metrics,
        )
    }

    /// The cached, batching send path (§4.4 + §6 `buffered_send`).
    ///
    /// Progress note: the internal retry loop on `TryAgain` runs one
    /// non-blocking local drain between attempts, which avoids deadlock when
    /// both peers' caches are full. If neither peer ever calls
    /// [`Inbox::process_blocking`] while both are chronically full, this
    /// call can spin indefinitely — that is a documented limitation, not a
    /// bug (see SPEC_FULL.md §9 Open Questions).
    pub fn buffered_send(
        &self,
        target: usize,
        handler_id: HandlerId,
        payload: &[u8],
    ) -> AmqResult<()> {
        self.check_open()?;
        let window = self.resolve_target(target)?;
        let sender_id = self.rank() as u32;
        self.inner.caches[target].push(
            window.as_ref(),
            handler_id,
            sender_id,
            payload,
            self.inner.logger.as_ref(),
            &self.inner.metrics,
            || {
                let _ = self.drain(false);
            },
        )
    }

    /// Flushes every peer's cache (§4.4, §6 `flush`).
    pub fn flush(&self) -> AmqResult<()> {
        self.check_open()?;
        for peer in 0..self.inner.group.size() {
            self.flush_one(peer)?;
        }
        Ok(())
    }

    pub(crate) fn flush_one(&self, peer: usize) -> AmqResult<()> {
        let window = self.inner.group.window(peer);
        self.inner.caches[peer].flush(
            window.as_ref(),
            self.inner.logger.as_ref(),
            &self.inner.metrics,
            || {
                let _ = self.drain(false);
            },
        )
    }

    /// One non-blocking drain pass (§4.3, §6 `process`).
    pub fn process(&self) -> AmqResult<()> {
        self.check_open()?;
        self.drain(false)
    }

    /// Quiescence (§4.5, §6 `process_blocking`): flush every cache, then
    /// alternate local blocking drains with polling a non-blocking group
    /// barrier, one more drain, then a final synchronous barrier.
    pub fn process_blocking(&self) -> AmqResult<()> {
        self.check_open()?;
        quiesce::process_blocking(self, self.inner.group.as_ref())
    }

    /// Closes the inbox. Warns (never blocks, never drains) if messages are
    /// still queued and unprocessed — "refuse to run unscheduled handlers".
    pub fn close(&self) -> AmqResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let active = self.inner.own_window.fetch_read(Field::Active);
        let active = if active == 0 { 0 } else { 1 };
        let tail = self.inner.own_window.fetch_read(Field::Tail(active));
        if tail > 0 {
            self.inner.logger.log(
                LogLevel::Warn,
                &format!(
                    "closing inbox with {tail} undelivered bytes queued; refusing to run them"
                ),
            );
        }
        Ok(())
    }

    pub(crate) fn group(&self) -> &Arc<dyn Group> {
        &self.inner.group
    }

    /// Runs the reader protocol once (`blocking = false`) or repeatedly
    /// until a pass finds the buffer empty (`blocking = true`).
    pub(crate) fn drain(&self, blocking: bool) -> AmqResult<()> {
        let _guard = if blocking {
            self.inner.processing_mutex.lock().unwrap()
        } else {
            match self.inner.processing_mutex.try_lock() {
                Ok(g) => g,
                Err(_) => return Err(AmqError::TryAgain),
            }
        };

        let mut state = self.inner.drain_state.lock().unwrap();
        loop {
            let n = reader::drain_once(
                self.inner.own_window.as_ref(),
                &mut state,
                self.inner.registry.as_ref(),
                self.inner.logger.as_ref(),
                &self.inner.metrics,
            );
            if !blocking || n == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Invoked by [`quiesce::process_blocking`]: a blocking drain that never
    /// surfaces `TryAgain` (the processing mutex is always acquirable in
    /// blocking mode — it can only ever be held by this same call chain).
    pub(crate) fn process_blocking_local(&self) {
        let _ = self.drain(true);
    }
}
