//! In-process reference implementations of the substrate traits, used only
//! by this crate's own integration tests. A production host wires
//! [`amsgq::Group`] and [`amsgq::RmaWindow`] to a real RMA substrate instead.

use amsgq::{Group, HandlerRegistry, LogLevel, Logger, NonBlockingBarrier, RmaWindow};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

/// A fixed-membership group backed by in-process [`amsgq::InboxState`]
/// windows, one per rank, all visible to every other rank — standing in for
/// a real RMA substrate where "remote" access is just another thread
/// touching the same allocation.
pub struct LocalGroup {
    rank: usize,
    windows: Vec<Arc<dyn RmaWindow>>,
    barrier: Arc<Barrier>,
    ibarrier_seen: Arc<AtomicUsize>,
}

impl LocalGroup {
    /// Builds one [`LocalGroup`] handle per rank, all sharing the same set
    /// of windows and a synchronous `std::sync::Barrier`. The non-blocking
    /// barrier counter is also shared across ranks so a `process_blocking`
    /// call on one rank actually observes the others entering — callers in
    /// these tests only call `process_blocking` once per team, since the
    /// counter is never reset between calls.
    pub fn new_team(size: usize, capacity: usize) -> Vec<Arc<LocalGroup>> {
        let windows: Vec<Arc<dyn RmaWindow>> = (0..size)
            .map(|_| Arc::new(amsgq::InboxState::new(capacity)) as Arc<dyn RmaWindow>)
            .collect();
        let barrier = Arc::new(Barrier::new(size));
        let ibarrier_seen = Arc::new(AtomicUsize::new(0));
        (0..size)
            .map(|rank| {
                Arc::new(LocalGroup {
                    rank,
                    windows: windows.clone(),
                    barrier: Arc::clone(&barrier),
                    ibarrier_seen: Arc::clone(&ibarrier_seen),
                })
            })
            .collect()
    }
}

impl Group for LocalGroup {
    fn size(&self) -> usize {
        self.windows.len()
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn window(&self, peer: usize) -> Arc<dyn RmaWindow> {
        Arc::clone(&self.windows[peer])
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn ibarrier(&self) -> Box<dyn NonBlockingBarrier> {
        Box::new(CountingBarrier {
            seen: Arc::clone(&self.ibarrier_seen),
            size: self.size(),
            entered: false,
        })
    }
}

/// A reference non-blocking barrier. Not a faithful simulation of a
/// real progress-engine-driven ibarrier (every rank here must eventually
/// call `poll` for the count to reach `size`), but enough to exercise
/// `process_blocking`'s control flow in-process.
struct CountingBarrier {
    seen: Arc<AtomicUsize>,
    size: usize,
    entered: bool,
}

impl NonBlockingBarrier for CountingBarrier {
    fn poll(&mut self) -> bool {
        if !self.entered {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.entered = true;
        }
        self.seen.load(Ordering::SeqCst) >= self.size
    }
}

/// Collects every invocation it receives, in order, behind a mutex — handy
/// for asserting on delivery order and contents from a test's main thread.
#[derive(Default)]
pub struct CollectingRegistry {
    received: Mutex<Vec<(u64, u32, Vec<u8>)>>,
}

impl CollectingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(u64, u32, Vec<u8>)> {
        self.received.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

impl HandlerRegistry for CollectingRegistry {
    fn invoke(&self, handler_id: u64, sender_id: u32, payload: &[u8]) {
        self.received
            .lock()
            .unwrap()
            .push((handler_id, sender_id, payload.to_vec()));
    }
}

/// Collects every log record behind a mutex, for tests that assert on what
/// was logged (e.g. the undelivered-message warning on close).
#[derive(Default)]
pub struct CollectingLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().unwrap().clone()
    }

    pub fn has_level(&self, level: LogLevel) -> bool {
        self.records.lock().unwrap().iter().any(|(l, _)| *l == level)
    }
}

impl Logger for CollectingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().unwrap().push((level, message.to_string()));
    }
}
