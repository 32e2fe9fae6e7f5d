//! The inbox window: the remotely-addressable memory region hosting the
//! double-buffered queue, its control fields, and the trait a host's RMA
//! substrate must implement to expose that region to the group.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI64, Ordering};

/// Selects one of the five atomically-addressed control fields of a window.
/// The spec addresses these by byte offset inside a single MPI-style window;
/// a typed field selector is the idiomatic Rust equivalent of the same
/// contract — see [`InboxLayout`] for the byte-offset arithmetic this maps
/// to when a window is backed by real RMA memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Selects which of the two buffers is currently accepting writes.
    Active,
    /// `tail[b]`, the next-free-byte counter of buffer `b` (0 or 1).
    Tail(u8),
    /// `ready[b]`, the completed-deposit counter of buffer `b` (0 or 1).
    Ready(u8),
}

/// The operations a target's window must offer to remote writers and to its
/// own owner. The owner addresses its own window through the same trait so
/// the writer and reader protocols don't need to special-case "self".
///
/// A production implementation backs this by a real one-sided RMA substrate
/// (e.g. MPI windows, OpenSHMEM, or a UPC++-style PGAS runtime); this crate
/// never implements one itself — see `tests/support` for an in-process
/// reference used by this crate's own tests.
pub trait RmaWindow: Send + Sync {
    /// Atomically adds `delta` to `field` and returns the value *before* the
    /// add (the reservation/retraction primitive of §4.2 and §4.3).
    fn fetch_add(&self, field: Field, delta: i64) -> i64;

    /// Atomically replaces `field` with `value` and returns the prior value.
    fn fetch_replace(&self, field: Field, value: i64) -> i64;

    /// A no-op fetch: atomically reads `field` without modifying it.
    fn fetch_read(&self, field: Field) -> i64;

    /// Writes `bytes` into buffer `buffer` (0 or 1) of `data` at `offset`.
    /// Callers must own a disjoint `[offset, offset + bytes.len())` range
    /// (established by a prior successful reservation) — the window does
    /// not itself serialize concurrent puts.
    fn put(&self, buffer: u8, offset: usize, bytes: &[u8]);

    /// Reads `len` bytes out of buffer `buffer` at `offset`. Only the owner
    /// calls this, and only after freezing the buffer (§4.3 step 9).
    fn read(&self, buffer: u8, offset: usize, len: usize) -> Vec<u8>;

    /// Acknowledges that all operations this caller has issued against this
    /// window are visible to *this* caller (origin-local completion).
    fn flush_local(&self);

    /// Acknowledges that all operations this caller has issued against this
    /// window are visible to anyone who subsequently operates on the same
    /// window — establishes happens-before with the target's next op.
    fn flush_remote(&self);

    /// Per-buffer capacity in bytes (`msg_count * (header_size + max_payload)`).
    fn capacity(&self) -> usize;
}

/// The concrete double-buffered window memory described in §3: one `active`
/// selector plus two `(tail, ready, data)` triples.
///
/// `data` is accessed through `UnsafeCell` because writers deposit into
/// disjoint byte ranges established by their `tail` reservation — there is
/// no way to express "this slice is exclusively mine" through a shared
/// reference without that unsafety, exactly as the teacher's ring buffer
/// holds its slot storage behind an `UnsafeCell` for the same reason.
pub struct InboxState {
    active: AtomicI64,
    tail: [AtomicI64; 2],
    ready: [AtomicI64; 2],
    data: [UnsafeCell<Box<[u8]>>; 2],
    capacity: usize,
}

// Safety: all mutation of `data` is through disjoint, reservation-owned byte
// ranges (writers) or happens only after a buffer has been frozen and no
// writer can be depositing into it (reader). No two callers ever alias the
// same byte.
unsafe impl Send for InboxState {}
unsafe impl Sync for InboxState {}

impl InboxState {
    /// Allocates a zeroed window for the given per-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            active: AtomicI64::new(0),
            tail: [AtomicI64::new(0), AtomicI64::new(0)],
            ready: [AtomicI64::new(0), AtomicI64::new(0)],
            data: [
                UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
                UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            ],
            capacity,
        }
    }

}

impl RmaWindow for InboxState {
    fn fetch_add(&self, field: Field, delta: i64) -> i64 {
        let cell = match field {
            Field::Active => &self.active,
            Field::Tail(b) => &self.tail[b as usize],
            Field::Ready(b) => &self.ready[b as usize],
        };
        cell.fetch_add(delta, Ordering::SeqCst)
    }

    fn fetch_replace(&self, field: Field, value: i64) -> i64 {
        let cell = match field {
            Field::Active => &self.active,
            Field::Tail(b) => &self.tail[b as usize],
            Field::Ready(b) => &self.ready[b as usize],
        };
        cell.swap(value, Ordering::SeqCst)
    }

    fn fetch_read(&self, field: Field) -> i64 {
        let cell = match field {
            Field::Active => &self.active,
            Field::Tail(b) => &self.tail[b as usize],
            Field::Ready(b) => &self.ready[b as usize],
        };
        cell.load(Ordering::SeqCst)
    }

    fn put(&self, buffer: u8, offset: usize, bytes: &[u8]) {
        debug_assert!(offset + bytes.len() <= self.capacity, "put out of bounds");
        // Safety: caller owns the disjoint [offset, offset+len) range.
        let slice = unsafe { &mut *self.data[buffer as usize].get() };
        slice[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn read(&self, buffer: u8, offset: usize, len: usize) -> Vec<u8> {
        debug_assert!(offset + len <= self.capacity, "read out of bounds");
        // Safety: only called by the owner after freezing the buffer, when
        // no writer can still be depositing into it.
        let slice = unsafe { &*self.data[buffer as usize].get() };
        slice[offset..offset + len].to_vec()
    }

    fn flush_local(&self) {
        // Real atomics already provide the ordering a production substrate
        // would need an explicit local flush for.
    }

    fn flush_remote(&self) {
        // Same as above: SeqCst atomics already establish happens-before
        // with any later operation any other thread issues on this window.
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Pure byte-offset arithmetic for a window backed by a single contiguous
/// RMA allocation, following the original layout exactly so an
/// implementation that *does* allocate one contiguous region stays wire
/// compatible: `active` (8B), `tail[0]`, `ready[0]`, `tail[1]`, `ready[1]`,
/// `data[0]` (`capacity` B), `data[1]` (`capacity` B).
#[derive(Debug, Clone, Copy)]
pub struct InboxLayout {
    pub capacity: usize,
}

impl InboxLayout {
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub const fn offset_active() -> usize {
        0
    }

    pub const fn offset_tail(buffer: u8) -> usize {
        8 + buffer as usize * 16
    }

    pub const fn offset_ready(buffer: u8) -> usize {
        Self::offset_tail(buffer) + 8
    }

    pub const fn offset_data(&self, buffer: u8) -> usize {
        Self::offset_ready(1) + 8 + buffer as usize * self.capacity
    }

    /// Total bytes a single contiguous allocation would need to host both
    /// buffers and their control fields.
    pub const fn window_size(&self) -> usize {
        2 * (self.capacity + 2 * 8) + 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets_match_original_arithmetic() {
        let layout = InboxLayout::new(1024);
        assert_eq!(InboxLayout::offset_active(), 0);
        assert_eq!(InboxLayout::offset_tail(0), 8);
        assert_eq!(InboxLayout::offset_ready(0), 16);
        assert_eq!(InboxLayout::offset_tail(1), 24);
        assert_eq!(InboxLayout::offset_ready(1), 32);
        assert_eq!(layout.offset_data(0), 40);
        assert_eq!(layout.offset_data(1), 40 + 1024);
        assert_eq!(layout.window_size(), 2 * (1024 + 16) + 8);
    }

    #[test]
    fn fetch_add_returns_prior_value() {
        let state = InboxState::new(1024);
        let prev = state.fetch_add(Field::Tail(0), 10);
        assert_eq!(prev, 0);
        assert_eq!(state.fetch_read(Field::Tail(0)), 10);
    }

    #[test]
    fn put_then_read_round_trips() {
        let state = InboxState::new(1024);
        state.put(0, 0, &[1, 2, 3]);
        assert_eq!(state.read(0, 0, 3), vec![1, 2, 3]);
    }

    #[test]
    fn active_starts_zero() {
        let state = InboxState::new(1024);
        assert_eq!(state.fetch_read(Field::Active), 0);
    }
}
