//! Event surface for dialer operations
//!
//! The coordinator publishes events on a broadcast channel so UI layers can
//! track call progress without polling local state. Subscribe with
//! [`SessionCoordinator::subscribe_events`](crate::SessionCoordinator::subscribe_events).

use chrono::{DateTime, Utc};

use crate::call::{CallId, CallState, TerminalReason};

/// Information about a call state change
#[derive(Debug, Clone)]
pub struct CallStatusInfo {
    /// Call that changed state
    pub call_id: CallId,
    /// New call state
    pub new_state: CallState,
    /// Previous call state, `None` for the initial transition into
    /// `Initiating`
    pub previous_state: Option<CallState>,
    /// Reason for the change (provider status or terminal reason label)
    pub reason: Option<String>,
    /// When the state change occurred
    pub timestamp: DateTime<Utc>,
}

/// Events published by the session coordinator
#[derive(Debug, Clone)]
pub enum DialerEvent {
    /// A call changed state
    CallStateChanged { info: CallStatusInfo },

    /// A call reached a terminal state; the call log should be refetched.
    /// Emitted exactly once per call.
    CallLogRefreshRequested {
        call_id: CallId,
        reason: TerminalReason,
        timestamp: DateTime<Utc>,
    },

    /// Status polling has failed several ticks in a row. The session is
    /// unchanged and polling continues; this is a warning, not a failure.
    PollDegraded {
        call_id: CallId,
        consecutive_failures: u32,
        last_error: String,
    },
}

impl DialerEvent {
    /// Call this event relates to
    pub fn call_id(&self) -> CallId {
        match self {
            DialerEvent::CallStateChanged { info } => info.call_id,
            DialerEvent::CallLogRefreshRequested { call_id, .. } => *call_id,
            DialerEvent::PollDegraded { call_id, .. } => *call_id,
        }
    }
}
