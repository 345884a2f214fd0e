use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use crate::desktop::Desktop;
use crate::events::LoopEvent;
use crate::permissions::{Elevator, GrantProbe};
use crate::process::BackendSpawner;

use super::RUNTIME_TARGET;
use super::coordinator::{Coordinator, ExitReason};

/// Feeds events and timer deadlines to `coordinator` until it asks to exit.
///
/// Blocks on the queue until the earliest timer is due, so the loop is idle
/// between events when no animation or restart is pending.
pub fn run_loop<S, D, E, P>(
    coordinator: &mut Coordinator<S, D, E, P>,
    events: &Receiver<LoopEvent>,
) -> ExitReason
where
    S: BackendSpawner,
    D: Desktop,
    E: Elevator,
    P: GrantProbe,
{
    loop {
        if let Some(reason) = coordinator.exit_reason() {
            return reason;
        }
        let received = match coordinator.next_deadline() {
            Some(deadline) => events.recv_deadline(deadline),
            None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let now = Instant::now();
        match received {
            Ok(event) => {
                debug!(target: RUNTIME_TARGET, %event, "loop event");
                coordinator.handle(event, now);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return ExitReason::ChannelClosed,
        }
        coordinator.on_deadline(now);
    }
}
