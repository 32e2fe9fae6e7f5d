use thiserror::Error;

/// Error type for inbox operations.
///
/// `TryAgain` is the expected, recoverable outcome of backpressure (buffer
/// full or being drained). The other variants are caller bugs or substrate
/// failures; callers are not expected to retry on them.
#[derive(Debug, Clone, Error)]
pub enum AmqError {
    /// The target buffer could not accept the reservation right now — it was
    /// full or the owner is mid-drain. Retry later, or let `buffered_send`'s
    /// internal retry loop handle it.
    #[error("target inbox is full or draining, try again")]
    TryAgain,

    /// A caller-supplied argument is invalid: unknown group member, a
    /// negative size, or a payload larger than a single buffer can ever hold.
    #[error("invalid argument: {reason}")]
    InvalidArg {
        /// Human-readable description of what was invalid.
        reason: String,
    },

    /// The underlying RMA substrate reported a failure. The inbox should be
    /// treated as being in an indeterminate state and closed.
    #[error("substrate error: {0}")]
    Substrate(String),

    /// The inbox has already been closed.
    #[error("inbox is closed")]
    Closed,
}

/// Result alias used throughout the crate.
pub type AmqResult<T> = Result<T, AmqError>;
