//! Outbound call tracking for the dialer
//!
//! This module provides the call record and its state machine. All provider
//! I/O is delegated to the coordinator; everything here is pure state so the
//! transition rules can be tested without a runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique local identifier for a call attempt
pub type CallId = Uuid;

/// Current state of an outbound call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Create request accepted by the provider, not yet ringing
    Initiating,
    /// Provider reports the destination is ringing
    Ringing,
    /// Call is connected and the assistant is on the line
    InProgress,
    /// Call ran to completion
    Completed,
    /// Call failed to establish (includes busy and no-answer)
    Failed,
    /// Call was canceled before connecting
    Canceled,
    /// Session lifetime budget elapsed before the provider reported an end
    TimedOut,
    /// Call was ended locally by the user
    Ended,
}

impl CallState {
    /// Check if no further transition is possible out of this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed
                | CallState::Failed
                | CallState::Canceled
                | CallState::TimedOut
                | CallState::Ended
        )
    }

    /// Check if the call is still live
    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal()
    }

    /// Ordering rank for poll-applied transitions. Poll results may only
    /// move forward through this ordering; `TimedOut` and `Ended` are not
    /// poll-reachable and have no rank.
    fn poll_rank(&self) -> Option<u8> {
        match self {
            CallState::Initiating => Some(0),
            CallState::Ringing => Some(1),
            CallState::InProgress => Some(2),
            CallState::Completed | CallState::Failed | CallState::Canceled => Some(3),
            CallState::TimedOut | CallState::Ended => None,
        }
    }
}

/// Why a call reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    Completed,
    Failed,
    Canceled,
    Hangup,
    TimedOut,
}

impl TerminalReason {
    /// Stable lowercase label used in events and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReason::Completed => "completed",
            TerminalReason::Failed => "failed",
            TerminalReason::Canceled => "canceled",
            TerminalReason::Hangup => "hangup",
            TerminalReason::TimedOut => "timed-out",
        }
    }
}

impl std::fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a provider status string onto the local state vocabulary.
///
/// The table is closed: anything outside it returns `None` and the caller
/// treats the fetch as failed rather than inventing a state.
pub fn map_provider_status(raw: &str) -> Option<CallState> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "queued" | "initiated" => Some(CallState::Initiating),
        "ringing" => Some(CallState::Ringing),
        "in-progress" => Some(CallState::InProgress),
        "completed" => Some(CallState::Completed),
        "failed" | "busy" | "no-answer" => Some(CallState::Failed),
        "canceled" => Some(CallState::Canceled),
        _ => None,
    }
}

/// Outcome of applying a polled provider status to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// State advanced; `previous` is the state before the transition
    Applied { previous: CallState },
    /// Status was already applied earlier, nothing changed
    AlreadyApplied,
    /// Status was discarded (session terminal, or a backward report)
    Ignored,
}

/// The authoritative record of one outbound call attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    /// Local identifier for this attempt
    pub call_id: CallId,
    /// Identifier the provider returned at creation
    pub provider_call_id: String,
    /// Caller number, immutable after creation
    pub from_number: String,
    /// Destination number, immutable after creation
    pub to_number: String,
    /// Assistant connected to the call, immutable after creation
    pub assistant_id: String,
    /// Current state
    pub state: CallState,
    /// When the call attempt was created
    pub started_at: DateTime<Utc>,
    /// When the call reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,
    /// Last provider status string successfully applied
    pub last_applied_status: Option<String>,
    /// Set exactly when `state` becomes terminal
    pub terminal_reason: Option<TerminalReason>,
}

impl CallSession {
    /// Create a fresh session in `Initiating`
    pub fn new(
        provider_call_id: impl Into<String>,
        from_number: impl Into<String>,
        to_number: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            call_id: CallId::new_v4(),
            provider_call_id: provider_call_id.into(),
            from_number: from_number.into(),
            to_number: to_number.into(),
            assistant_id: assistant_id.into(),
            state: CallState::Initiating,
            started_at: Utc::now(),
            ended_at: None,
            last_applied_status: None,
            terminal_reason: None,
        }
    }

    /// Apply a polled provider status.
    ///
    /// Terminal sessions ignore everything. Re-applying the status that is
    /// already recorded is a no-op. Reports that do not move forward through
    /// the transition ordering are discarded, so a stale `ringing` arriving
    /// after `in-progress` cannot rewind the call.
    pub fn apply_status(&mut self, raw: &str, mapped: CallState) -> StatusOutcome {
        if self.state.is_terminal() {
            return StatusOutcome::Ignored;
        }
        if self.last_applied_status.as_deref() == Some(raw) {
            return StatusOutcome::AlreadyApplied;
        }
        if mapped == self.state {
            // Different provider spelling for the state we are already in.
            self.last_applied_status = Some(raw.to_string());
            return StatusOutcome::AlreadyApplied;
        }

        let (current, next) = match (self.state.poll_rank(), mapped.poll_rank()) {
            (Some(current), Some(next)) => (current, next),
            _ => return StatusOutcome::Ignored,
        };
        if next <= current {
            return StatusOutcome::Ignored;
        }

        let previous = self.state.clone();
        self.last_applied_status = Some(raw.to_string());
        self.state = mapped.clone();
        if mapped.is_terminal() {
            self.ended_at = Some(Utc::now());
            self.terminal_reason = Some(match mapped {
                CallState::Completed => TerminalReason::Completed,
                CallState::Canceled => TerminalReason::Canceled,
                _ => TerminalReason::Failed,
            });
        }
        StatusOutcome::Applied { previous }
    }

    /// Force the session into a terminal state, used by hangup and the
    /// timeout watchdog. Returns the previous state when this call won the
    /// transition, `None` if the session was already terminal.
    pub fn force_terminal(
        &mut self,
        state: CallState,
        reason: TerminalReason,
    ) -> Option<CallState> {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return None;
        }
        let previous = std::mem::replace(&mut self.state, state);
        self.ended_at = Some(Utc::now());
        self.terminal_reason = Some(reason);
        Some(previous)
    }
}
