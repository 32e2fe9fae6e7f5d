//! The handler registry: an external collaborator that resolves an opaque
//! `handler_id` to code to run. The core neither interprets nor validates
//! the identifier — see the original's dynamic function-pointer dispatch,
//! replaced here with an indirection table per §9's design note for target
//! languages where dereferencing arbitrary integers isn't permissible.

use crate::header::HandlerId;

/// Invoked once per drained message, synchronously, on the draining thread.
pub trait HandlerRegistry: Send + Sync {
    /// Runs the handler named by `handler_id` against `payload`. `sender_id`
    /// is the rank that originally enqueued the message. Implementations
    /// decide what an unregistered `handler_id` means (panic, log-and-drop,
    /// ...); the core does not prescribe a policy.
    fn invoke(&self, handler_id: HandlerId, sender_id: u32, payload: &[u8]);
}
