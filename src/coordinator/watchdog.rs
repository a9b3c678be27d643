//! Session lifetime watchdog
//!
//! Bounds how long a call can stay live regardless of provider behavior.
//! If the budget elapses first, the call is forced to `TimedOut` through
//! the coordinator's guarded terminate, which also stops the poller.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::call::{CallId, CallState, TerminalReason};

use super::manager::SessionCoordinator;

/// Arm the timeout watchdog for a call. The returned sender disarms it; so
/// does dropping it.
pub(crate) fn spawn_timeout_guard(
    coordinator: Arc<SessionCoordinator>,
    call_id: CallId,
) -> oneshot::Sender<()> {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let budget = coordinator.config.max_call_duration;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(budget) => {
                let won = coordinator
                    .terminate(&call_id, CallState::TimedOut, TerminalReason::TimedOut)
                    .await;
                if won {
                    warn!(call_id = %call_id, budget_secs = budget.as_secs(),
                          "session lifetime budget elapsed, call timed out");
                } else {
                    debug!(call_id = %call_id, "watchdog fired after call already settled");
                }
            }
            _ = &mut stop_rx => {
                debug!(call_id = %call_id, "timeout watchdog disarmed");
            }
        }
    });

    stop_tx
}
