//! A one-sided, double-buffered active-message inbox.
//!
//! Each participant owns an inbox: a pair of byte buffers reachable by
//! remote one-sided put, plus a handful of atomically-addressed control
//! fields (`active`, `tail[0..2]`, `ready[0..2]`). Senders reserve space with
//! a fetch-and-add, deposit their payload, then signal completion with a
//! second fetch-and-add — no compare-and-swap, no sender-side lock, and no
//! coordination between senders beyond what the atomics themselves give.
//! The owner periodically swaps which buffer is accepting writes, waits for
//! in-flight writers on the old buffer to finish retracting or completing,
//! and then replays it in deposit order.
//!
//! The substrate this runs over — one-sided RMA put/fetch-and-op, process
//! group membership, and a mutual-exclusion primitive around draining — is
//! modeled as traits ([`RmaWindow`], [`Group`]) rather than shipped as a
//! concrete backend. Wire this crate to MPI, OpenSHMEM, or any other PGAS
//! runtime by implementing them.
//!
//! ```no_run
//! use amsgq::{Config, Inbox, HandlerRegistry, NoopLogger};
//! # use std::sync::Arc;
//! # struct MyGroup;
//! # impl amsgq::Group for MyGroup {
//! #     fn size(&self) -> usize { 1 }
//! #     fn rank(&self) -> usize { 0 }
//! #     fn window(&self, _peer: usize) -> Arc<dyn amsgq::RmaWindow> { unimplemented!() }
//! #     fn barrier(&self) {}
//! #     fn ibarrier(&self) -> Box<dyn amsgq::NonBlockingBarrier> { unimplemented!() }
//! # }
//! struct PrintRegistry;
//! impl HandlerRegistry for PrintRegistry {
//!     fn invoke(&self, handler_id: u64, sender_id: u32, payload: &[u8]) {
//!         println!("handler {handler_id} from {sender_id}: {} bytes", payload.len());
//!     }
//! }
//!
//! let group = Arc::new(MyGroup);
//! let inbox = Inbox::open(
//!     Config::default(),
//!     group,
//!     Arc::new(PrintRegistry),
//!     Arc::new(NoopLogger),
//! );
//! inbox.try_send(0, 1, b"hello").unwrap();
//! inbox.process().unwrap();
//! inbox.close().unwrap();
//! ```

mod backoff;
mod cache;
mod config;
mod error;
mod group;
mod header;
mod inbox;
mod logger;
mod metrics;
mod quiesce;
mod reader;
mod registry;
mod window;
mod writer;

pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{AmqError, AmqResult};
pub use group::{Group, NonBlockingBarrier};
pub use header::HandlerId;
pub use inbox::Inbox;
pub use logger::{EprintLogger, LogLevel, Logger, NoopLogger};
pub use metrics::MetricsSnapshot;
pub use registry::HandlerRegistry;
pub use window::{Field, InboxLayout, InboxState, RmaWindow};
