//! Call placement and hangup operations
//!
//! These are the two user-facing entry points of the coordinator. Placement
//! holds the slot lock across the guard check, the provider request, and
//! slot installation so two racing requests can never both become active.
//! Hangup deliberately does provider I/O outside the lock, then settles the
//! race through the coordinator's guarded terminate.

use tracing::{info, warn};

use crate::call::{CallId, CallSession, CallState, TerminalReason};
use crate::error::{DialerError, DialerResult};
use crate::provider::CreateCallRequest;

use super::manager::{ActiveCall, SessionCoordinator};
use super::poller::spawn_status_poller;
use super::timers::SessionTimers;
use super::watchdog::spawn_timeout_guard;

/// Normalize and validate a destination number.
///
/// Permissive E.164 shape: separators (spaces, dashes, dots, parentheses)
/// are stripped, one optional leading `+` is kept, and what remains must be
/// 2 to 15 digits.
pub(crate) fn validate_destination(raw: &str) -> DialerResult<String> {
    let trimmed = raw.trim();
    let (mut normalized, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (String::from("+"), rest),
        None => (String::new(), trimmed),
    };

    let mut digits = 0usize;
    for ch in rest.chars() {
        match ch {
            '0'..='9' => {
                normalized.push(ch);
                digits += 1;
            }
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(DialerError::invalid_destination(
                    raw,
                    format!("unexpected character '{ch}'"),
                ));
            }
        }
    }

    if !(2..=15).contains(&digits) {
        return Err(DialerError::invalid_destination(
            raw,
            format!("expected 2 to 15 digits, got {digits}"),
        ));
    }
    Ok(normalized)
}

impl SessionCoordinator {
    /// Place an outbound call.
    ///
    /// Validates the destination locally, rejects if a call is already in
    /// progress, then issues a single create request to the provider. On
    /// success the new session starts in `Initiating` with its status
    /// poller and timeout watchdog running.
    pub async fn place_call(
        self: &std::sync::Arc<Self>,
        request: CreateCallRequest,
    ) -> DialerResult<CallId> {
        let to_number = validate_destination(&request.to_number)?;
        if request.from_number.trim().is_empty() {
            return Err(DialerError::invalid_destination(
                &request.from_number,
                "caller number is empty",
            ));
        }
        if request.assistant_id.trim().is_empty() {
            return Err(DialerError::MissingAssistant {
                from_number: request.from_number.clone(),
            });
        }

        // Hold the slot lock from the duplicate check through installation
        // so concurrent placements cannot both pass the guard. Checking the
        // running flag under the same lock serializes against shutdown.
        let mut active = self.active.lock().await;
        if !self.is_running() {
            return Err(DialerError::Shutdown);
        }
        if let Some(call) = active.as_ref() {
            if call.session.state.is_in_progress() {
                return Err(DialerError::CallAlreadyActive {
                    call_id: call.session.call_id,
                });
            }
        }

        let provider_request = CreateCallRequest {
            from_number: request.from_number.clone(),
            to_number: to_number.clone(),
            assistant_id: request.assistant_id.clone(),
        };
        let handle = self
            .provider
            .create_call(&provider_request)
            .await
            .map_err(|e| {
                warn!(to_number = %to_number, error = %e, "provider refused call creation");
                DialerError::provider_rejected("create_call", &e)
            })?;

        let session = CallSession::new(
            handle.call_id,
            request.from_number,
            to_number,
            request.assistant_id,
        );
        let call_id = session.call_id;

        let poller_stop = spawn_status_poller(
            self.clone(),
            call_id,
            session.provider_call_id.clone(),
        );
        let watchdog_stop = spawn_timeout_guard(self.clone(), call_id);

        // A terminal previous occupant is evicted here; dropping its
        // ActiveCall re-cancels timers that are already stopped.
        *active = Some(ActiveCall {
            session: session.clone(),
            timers: SessionTimers::new(poller_stop, watchdog_stop),
        });
        drop(active);

        self.history.insert(call_id, session.clone());
        info!(call_id = %call_id, provider_call_id = %session.provider_call_id,
              to_number = %session.to_number, "outbound call created");
        self.emit_state_change(&session, None, Some("created".to_string()));

        Ok(call_id)
    }

    /// Hang up the given call.
    ///
    /// Sends the provider terminate request first; only a provider success
    /// mutates local state. The terminate below is synchronous with respect
    /// to this future: when `hangup_call` returns Ok, the session is
    /// terminal and both tasks are cancelled, so no later poll tick can
    /// apply a different status.
    pub async fn hangup_call(&self, call_id: &CallId) -> DialerResult<()> {
        let provider_call_id = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(call)
                    if call.session.call_id == *call_id
                        && call.session.state.is_in_progress() =>
                {
                    call.session.provider_call_id.clone()
                }
                Some(call) if call.session.call_id == *call_id => {
                    // Already settled; hanging up a finished call is not an
                    // error worth surfacing to the user.
                    return Ok(());
                }
                _ => return Err(DialerError::NoActiveCall),
            }
        };

        // Provider I/O happens without the slot lock so an in-flight poll
        // apply or the watchdog is never blocked behind this request.
        self.provider
            .hangup(&provider_call_id, &self.config.owner_id)
            .await
            .map_err(|e| {
                warn!(call_id = %call_id, error = %e, "provider refused hangup");
                DialerError::provider_rejected("hangup", &e)
            })?;

        let won = self
            .terminate(call_id, CallState::Ended, TerminalReason::Hangup)
            .await;
        if !won {
            // A polled terminal status or the watchdog got there first; the
            // call is over either way.
            info!(call_id = %call_id, "hangup raced another terminal transition");
        }
        Ok(())
    }
}
