//! Error types and handling for the dialer-core library
//!
//! Errors are categorized to help callers pick a recovery strategy:
//!
//! - **Validation errors** - rejected locally, fix the input and retry
//! - **Session state errors** - invalid operation for the current call state
//! - **Provider errors** - the telephony provider refused an operation;
//!   surfaced synchronously, never retried automatically
//! - **Poll errors** - a single status fetch failed; absorbed by the poller
//!   and retried on the next tick, never fatal

use thiserror::Error;

use crate::call::CallId;

/// Result type alias for dialer-core operations
pub type DialerResult<T> = Result<T, DialerError>;

/// Error surfaced by a telephony provider adapter.
///
/// Adapters map their transport failures (HTTP status, RPC error, timeout)
/// into this shape; the coordinator translates it into [`DialerError`] at
/// the call site so the operation context is preserved.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    /// Provider-side status code, when the transport has one
    pub code: Option<u16>,
    /// Human-readable description from the provider
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self { code: Some(code), message: message.into() }
    }
}

/// Errors for outbound call operations
#[derive(Error, Debug, Clone)]
pub enum DialerError {
    /// Destination number failed local validation; no network call was made
    #[error("invalid destination number '{number}': {reason}")]
    InvalidDestination { number: String, reason: String },

    /// The caller number has no assistant assigned to take the call
    #[error("no assistant assigned for caller number '{from_number}'")]
    MissingAssistant { from_number: String },

    /// A call is already in progress for this coordinator
    #[error("call already in progress: {call_id}")]
    CallAlreadyActive { call_id: CallId },

    /// No active call to operate on
    #[error("no active call")]
    NoActiveCall,

    /// Call id is not known to this coordinator
    #[error("call not found: {call_id}")]
    CallNotFound { call_id: CallId },

    /// The provider refused a create or hangup request
    #[error("provider rejected {operation}: {reason}")]
    ProviderRejected { operation: String, reason: String },

    /// A single status fetch failed; the poller retries on the next tick
    #[error("status fetch failed: {reason}")]
    StatusFetchFailed { reason: String },

    /// The provider reported a status string outside the known vocabulary
    #[error("unrecognized provider status: '{status}'")]
    UnrecognizedStatus { status: String },

    /// The coordinator has been shut down
    #[error("coordinator is shut down")]
    Shutdown,
}

impl DialerError {
    /// Create an invalid destination error
    pub fn invalid_destination(number: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination { number: number.into(), reason: reason.into() }
    }

    /// Create a provider rejection error for the given operation
    pub fn provider_rejected(operation: impl Into<String>, source: &ProviderError) -> Self {
        let reason = match source.code {
            Some(code) => format!("{} (status {})", source.message, code),
            None => source.message.clone(),
        };
        Self::ProviderRejected { operation: operation.into(), reason }
    }

    /// Create a status fetch failure
    pub fn status_fetch_failed(reason: impl Into<String>) -> Self {
        Self::StatusFetchFailed { reason: reason.into() }
    }

    /// Check if this error is worth retrying without user intervention
    pub fn is_recoverable(&self) -> bool {
        match self {
            DialerError::StatusFetchFailed { .. } | DialerError::UnrecognizedStatus { .. } => true,

            DialerError::InvalidDestination { .. }
            | DialerError::MissingAssistant { .. }
            | DialerError::CallAlreadyActive { .. }
            | DialerError::NoActiveCall
            | DialerError::CallNotFound { .. }
            | DialerError::ProviderRejected { .. }
            | DialerError::Shutdown => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            DialerError::InvalidDestination { .. }
            | DialerError::MissingAssistant { .. } => "validation",

            DialerError::CallAlreadyActive { .. }
            | DialerError::NoActiveCall
            | DialerError::CallNotFound { .. } => "session",

            DialerError::ProviderRejected { .. } => "provider",

            DialerError::StatusFetchFailed { .. }
            | DialerError::UnrecognizedStatus { .. } => "poll",

            DialerError::Shutdown => "system",
        }
    }
}
