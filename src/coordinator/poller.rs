//! Recurring status poller
//!
//! One task per active call. Each tick checks that the call is still the
//! live occupant of the slot, fetches the provider status without holding
//! any lock, then applies the result under the lock. A single fetch is in
//! flight at a time: the next tick is not taken until the current
//! fetch-and-apply finishes, and missed ticks are delayed rather than
//! bursted.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::call::{map_provider_status, CallId};
use crate::events::DialerEvent;

use super::manager::{PollApply, SessionCoordinator};

/// Spawn the poller for a call. The returned sender stops the task; so does
/// dropping it.
pub(crate) fn spawn_status_poller(
    coordinator: Arc<SessionCoordinator>,
    call_id: CallId,
    provider_call_id: String,
) -> oneshot::Sender<()> {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let interval = coordinator.config.poll_interval;
    let threshold = coordinator.config.poll_failure_warning_threshold;

    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately; consume it
        // so the first fetch happens one full period after call creation.
        ticks.tick().await;

        let mut consecutive_failures: u32 = 0;
        let mut degraded_reported = false;

        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                _ = &mut stop_rx => break,
            }

            if !coordinator.poll_gate(&call_id).await {
                debug!(call_id = %call_id, "call no longer live, poller stopping");
                break;
            }

            let fetch = coordinator
                .provider
                .call_status(&provider_call_id, &coordinator.config.owner_id);
            let status = tokio::select! {
                result = fetch => result,
                _ = &mut stop_rx => break,
            };

            let raw = match status {
                Ok(raw) => raw,
                Err(e) => {
                    poll_failure(
                        &coordinator,
                        &call_id,
                        e.to_string(),
                        &mut consecutive_failures,
                        &mut degraded_reported,
                        threshold,
                    );
                    continue;
                }
            };

            let Some(mapped) = map_provider_status(&raw) else {
                // Outside the known vocabulary; never a silent state change.
                poll_failure(
                    &coordinator,
                    &call_id,
                    format!("unrecognized provider status '{raw}'"),
                    &mut consecutive_failures,
                    &mut degraded_reported,
                    threshold,
                );
                continue;
            };
            consecutive_failures = 0;
            degraded_reported = false;

            match coordinator.apply_poll_result(&call_id, &raw, mapped).await {
                PollApply::Continue => {}
                PollApply::Finished | PollApply::Stale => break,
            }
        }

        debug!(call_id = %call_id, "status poller stopped");
    });

    stop_tx
}

/// Best-effort failure bookkeeping: log, count, warn once per degraded
/// episode, keep the session untouched.
fn poll_failure(
    coordinator: &SessionCoordinator,
    call_id: &CallId,
    reason: String,
    consecutive_failures: &mut u32,
    degraded_reported: &mut bool,
    threshold: u32,
) {
    *consecutive_failures += 1;
    debug!(call_id = %call_id, failures = *consecutive_failures, reason = %reason,
           "status fetch failed, retrying on next tick");

    if *consecutive_failures >= threshold && !*degraded_reported {
        *degraded_reported = true;
        warn!(call_id = %call_id, failures = *consecutive_failures, reason = %reason,
              "status polling degraded");
        coordinator.emit(DialerEvent::PollDegraded {
            call_id: *call_id,
            consecutive_failures: *consecutive_failures,
            last_error: reason,
        });
    }
}
