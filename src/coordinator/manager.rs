//! The session coordinator
//!
//! Owns the single active-call slot, the timer handles attached to it, and
//! the event channel. Every mutation of an active session funnels through
//! this type under one lock, which is what makes the hangup/poll/timeout
//! race resolution single-winner: whoever takes the lock first and finds the
//! session non-terminal applies its transition, everyone else observes a
//! terminal session and discards their result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::call::{CallId, CallSession, CallState, StatusOutcome, TerminalReason};
use crate::config::DialerConfig;
use crate::error::{DialerError, DialerResult};
use crate::events::{CallStatusInfo, DialerEvent};
use crate::provider::TelephonyProvider;

use super::timers::SessionTimers;

/// The active slot: one session plus the stop handles of its two tasks
pub(crate) struct ActiveCall {
    pub(crate) session: CallSession,
    pub(crate) timers: SessionTimers,
}

/// What the poller should do after an apply attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollApply {
    /// Session still live, keep polling
    Continue,
    /// This apply made the session terminal, stop polling
    Finished,
    /// Session already terminal or gone, stop without applying anything
    Stale,
}

/// Coordinates the lifecycle of outbound calls for one account.
///
/// At most one non-terminal call exists at a time; a finished call stays in
/// the slot until observed via [`take_finished`](Self::take_finished) or
/// replaced by the next [`place_call`](Self::place_call).
pub struct SessionCoordinator {
    pub(crate) provider: Arc<dyn TelephonyProvider>,
    pub(crate) config: DialerConfig,
    pub(crate) active: Mutex<Option<ActiveCall>>,
    pub(crate) history: DashMap<CallId, CallSession>,
    pub(crate) event_tx: broadcast::Sender<DialerEvent>,
    running: AtomicBool,
}

impl SessionCoordinator {
    /// Create a coordinator over the given provider
    pub fn new(provider: Arc<dyn TelephonyProvider>, config: DialerConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Arc::new(Self {
            provider,
            config,
            active: Mutex::new(None),
            history: DashMap::new(),
            event_tx,
            running: AtomicBool::new(true),
        })
    }

    /// Subscribe to dialer events
    pub fn subscribe_events(&self) -> broadcast::Receiver<DialerEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the coordinator accepts new calls
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the call currently occupying the slot, terminal or not
    pub async fn active_call(&self) -> Option<CallSession> {
        let active = self.active.lock().await;
        active.as_ref().map(|call| call.session.clone())
    }

    /// Whether a non-terminal call is in flight
    pub async fn is_call_active(&self) -> bool {
        let active = self.active.lock().await;
        matches!(active.as_ref(), Some(call) if call.session.state.is_in_progress())
    }

    /// Look up any call this coordinator has placed, including finished ones
    pub fn get_call(&self, call_id: &CallId) -> DialerResult<CallSession> {
        self.history
            .get(call_id)
            .map(|entry| entry.value().clone())
            .ok_or(DialerError::CallNotFound { call_id: *call_id })
    }

    /// All call records, most recent first
    pub fn call_history(&self) -> Vec<CallSession> {
        let mut calls: Vec<CallSession> = self
            .history
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        calls.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        calls
    }

    /// Clear the slot if its occupant is terminal, handing the outcome to
    /// the caller. Returns `None` while a call is still live.
    pub async fn take_finished(&self) -> Option<CallSession> {
        let mut active = self.active.lock().await;
        if matches!(active.as_ref(), Some(call) if call.session.state.is_terminal()) {
            // Timers are already cancelled at this point; dropping the
            // ActiveCall would cancel them again, harmlessly.
            return active.take().map(|call| call.session);
        }
        None
    }

    /// Stop accepting calls and cancel the tasks of any call in the slot.
    ///
    /// The session record is left in the history as-is; the provider is not
    /// contacted. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut active = self.active.lock().await;
        if let Some(mut call) = active.take() {
            call.timers.cancel();
            info!(call_id = %call.session.call_id, state = ?call.session.state,
                  "coordinator shut down with call in slot");
        }
    }

    /// The single terminal-transition entry point for hangup and the
    /// timeout watchdog. Only the first caller to find the session
    /// non-terminal wins; everyone else gets `false` and must treat the
    /// session as already settled.
    pub(crate) async fn terminate(
        &self,
        call_id: &CallId,
        state: CallState,
        reason: TerminalReason,
    ) -> bool {
        let mut active = self.active.lock().await;
        let Some(call) = active.as_mut() else {
            return false;
        };
        if call.session.call_id != *call_id {
            return false;
        }
        let Some(previous) = call.session.force_terminal(state, reason) else {
            return false;
        };
        // Cancel both tasks before any observable effect of this
        // transition leaves the lock.
        call.timers.cancel();
        let snapshot = call.session.clone();
        drop(active);

        self.history.insert(snapshot.call_id, snapshot.clone());
        info!(call_id = %snapshot.call_id, state = ?snapshot.state, reason = %reason,
              "call terminated");
        self.emit_state_change(&snapshot, Some(previous), Some(reason.as_str().to_string()));
        self.emit(DialerEvent::CallLogRefreshRequested {
            call_id: snapshot.call_id,
            reason,
            timestamp: Utc::now(),
        });
        true
    }

    /// Poller tick gate: keep going only while this call is still the live
    /// occupant of the slot
    pub(crate) async fn poll_gate(&self, call_id: &CallId) -> bool {
        let active = self.active.lock().await;
        matches!(active.as_ref(),
            Some(call) if call.session.call_id == *call_id && call.session.state.is_in_progress())
    }

    /// Apply a fetched provider status under the slot lock.
    ///
    /// The terminality re-check here is what discards a poll result whose
    /// fetch was already in flight when a hangup or timeout landed.
    pub(crate) async fn apply_poll_result(
        &self,
        call_id: &CallId,
        raw: &str,
        mapped: CallState,
    ) -> PollApply {
        let mut active = self.active.lock().await;
        let Some(call) = active.as_mut() else {
            return PollApply::Stale;
        };
        if call.session.call_id != *call_id {
            return PollApply::Stale;
        }
        if call.session.state.is_terminal() {
            debug!(call_id = %call_id, status = raw,
                   "discarding poll result for terminal call");
            return PollApply::Stale;
        }

        match call.session.apply_status(raw, mapped) {
            StatusOutcome::AlreadyApplied => PollApply::Continue,
            StatusOutcome::Ignored => {
                debug!(call_id = %call_id, status = raw, state = ?call.session.state,
                       "discarding non-forward status report");
                PollApply::Continue
            }
            StatusOutcome::Applied { previous } => {
                let terminal = call.session.state.is_terminal();
                if terminal {
                    call.timers.cancel();
                }
                let snapshot = call.session.clone();
                drop(active);

                self.history.insert(snapshot.call_id, snapshot.clone());
                self.emit_state_change(&snapshot, Some(previous), Some(raw.to_string()));
                if terminal {
                    info!(call_id = %snapshot.call_id, state = ?snapshot.state,
                          "call reached terminal state via polling");
                    if let Some(reason) = snapshot.terminal_reason {
                        self.emit(DialerEvent::CallLogRefreshRequested {
                            call_id: snapshot.call_id,
                            reason,
                            timestamp: Utc::now(),
                        });
                    }
                    PollApply::Finished
                } else {
                    debug!(call_id = %snapshot.call_id, state = ?snapshot.state,
                           "call state advanced");
                    PollApply::Continue
                }
            }
        }
    }

    pub(crate) fn emit_state_change(
        &self,
        session: &CallSession,
        previous: Option<CallState>,
        reason: Option<String>,
    ) {
        self.emit(DialerEvent::CallStateChanged {
            info: CallStatusInfo {
                call_id: session.call_id,
                new_state: session.state.clone(),
                previous_state: previous,
                reason,
                timestamp: Utc::now(),
            },
        });
    }

    pub(crate) fn emit(&self, event: DialerEvent) {
        // Nobody listening is fine; the channel exists for whoever does.
        let _ = self.event_tx.send(event);
    }
}
