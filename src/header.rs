//! Wire format of a single message inside an inbox buffer.
//!
//! `{ handler_id: u64, sender_id: u32, payload_size: u32, [msg_id: u32] }`
//! followed immediately by `payload_size` bytes. No versioning: peers must
//! agree on this layout out of band, same as the rest of the window.

use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(debug_assertions)]
const DEBUG_FIELD: usize = 4;
#[cfg(not(debug_assertions))]
const DEBUG_FIELD: usize = 0;

/// Size in bytes of the fixed header prefix of every message.
pub const HEADER_SIZE: usize = 8 + 4 + 4 + DEBUG_FIELD;

#[cfg(debug_assertions)]
static MSG_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Allocates the next debug message id. Exists purely for log correlation;
/// protocol logic never reads it back. A no-op outside debug builds.
#[cfg(debug_assertions)]
pub(crate) fn next_msg_id() -> u32 {
    MSG_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(not(debug_assertions))]
pub(crate) fn next_msg_id() -> u32 {
    0
}

/// An opaque identifier for a registered handler. The core never interprets
/// or validates this value — it is looked up by a [`crate::HandlerRegistry`]
/// the host supplies.
pub type HandlerId = u64;

/// Decoded view of a message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub handler_id: HandlerId,
    pub sender_id: u32,
    pub payload_size: u32,
    #[cfg(debug_assertions)]
    pub msg_id: u32,
}

impl MessageHeader {
    pub(crate) fn new(handler_id: HandlerId, sender_id: u32, payload_size: u32) -> Self {
        Self {
            handler_id,
            sender_id,
            payload_size,
            #[cfg(debug_assertions)]
            msg_id: next_msg_id(),
        }
    }

    /// Writes this header into `buf[0..HEADER_SIZE]`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`HEADER_SIZE`].
    pub(crate) fn encode_into(&self, buf: &mut [u8]) {
        assert!(buf.len() >= HEADER_SIZE, "buffer too small for header");
        buf[0..8].copy_from_slice(&self.handler_id.to_le_bytes());
        buf[8..12].copy_from_slice(&self.sender_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        #[cfg(debug_assertions)]
        buf[16..20].copy_from_slice(&self.msg_id.to_le_bytes());
    }

    /// Reads a header from `buf[0..HEADER_SIZE]`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`HEADER_SIZE`] — a short read here is
    /// a protocol violation, not a recoverable error.
    pub(crate) fn decode_from(buf: &[u8]) -> Self {
        assert!(buf.len() >= HEADER_SIZE, "buffer too small for header");
        let handler_id = HandlerId::from_le_bytes(buf[0..8].try_into().unwrap());
        let sender_id = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let payload_size = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        #[cfg(debug_assertions)]
        let msg_id = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        Self {
            handler_id,
            sender_id,
            payload_size,
            #[cfg(debug_assertions)]
            msg_id,
        }
    }
}

/// Encodes a header + payload record into `buf`, returning the total number
/// of bytes written (`HEADER_SIZE + payload.len()`).
///
/// # Panics
/// Panics if `buf` is too small to hold the record.
pub(crate) fn encode_record(
    buf: &mut [u8],
    handler_id: HandlerId,
    sender_id: u32,
    payload: &[u8],
) -> usize {
    let total = HEADER_SIZE + payload.len();
    assert!(buf.len() >= total, "buffer too small for record");
    let header = MessageHeader::new(handler_id, sender_id, payload.len() as u32);
    header.encode_into(buf);
    buf[HEADER_SIZE..total].copy_from_slice(payload);
    total
}
