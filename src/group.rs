//! Group/rank lookup and the collective barrier, modeled as traits the core
//! consumes. A host wires these to whatever process-group abstraction its
//! RMA substrate already provides (an MPI communicator, a UPC++ team, ...).

use crate::window::RmaWindow;
use std::sync::Arc;

/// A process group: fixed membership, every member reachable by a dense
/// `0..size()` rank, every member's window reachable by rank.
pub trait Group: Send + Sync {
    /// Number of participants in the group.
    fn size(&self) -> usize;

    /// This participant's own rank within the group.
    fn rank(&self) -> usize;

    /// Returns the window exposed by `peer`. Panics if `peer >= size()` —
    /// an out-of-range peer is a caller bug, checked by `Inbox` before this
    /// is ever called so it surfaces as `AmqError::InvalidArg` instead.
    fn window(&self, peer: usize) -> Arc<dyn RmaWindow>;

    /// Blocks until every member of the group has called `barrier`.
    fn barrier(&self);

    /// Starts a non-blocking, group-wide barrier. Polled via the returned
    /// handle until every member has entered it.
    fn ibarrier(&self) -> Box<dyn NonBlockingBarrier>;
}

/// A barrier entered by every member of a group without blocking the caller.
/// `process_blocking` interleaves polling this with local drains so the
/// participant keeps servicing its own inbox while waiting for peers.
pub trait NonBlockingBarrier: Send {
    /// Returns `true` once every member has entered the barrier.
    fn poll(&mut self) -> bool;
}
