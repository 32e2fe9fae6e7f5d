//! Quiescence (§4.5): flush every cache, then alternate between draining
//! locally and polling a non-blocking group barrier until every participant
//! has caught up, then one more drain and a final synchronous barrier.

use crate::error::AmqResult;
use crate::group::Group;
use crate::inbox::Inbox;

/// Flushes every peer's cache whose contents haven't been sent yet.
pub(crate) fn flush_all_caches(inbox: &Inbox) -> AmqResult<()> {
    for peer in 0..inbox.group().size() {
        inbox.flush_one(peer)?;
    }
    Ok(())
}

/// Runs the full quiescence sequence described in §4.5.
pub(crate) fn process_blocking(inbox: &Inbox, group: &dyn Group) -> AmqResult<()> {
    flush_all_caches(inbox)?;

    let mut barrier = group.ibarrier();
    loop {
        inbox.process_blocking_local();
        if barrier.poll() {
            break;
        }
    }
    // Absorb anything deposited between the last drain and the barrier's
    // completion.
    inbox.process_blocking_local();
    group.barrier();
    Ok(())
}
