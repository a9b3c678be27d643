//! Dialer-core: outbound call session coordination layer
//!
//! This crate tracks outbound calls placed through an external telephony
//! provider for a voice-assistant dashboard. The provider places the call
//! and reports on it asynchronously; dialer-core owns the local source of
//! truth:
//!
//! - a single active [`CallSession`] per coordinator, with a monotonic
//!   state machine whose terminal states are absorbing
//! - a recurring status poller reconciling provider-reported status into
//!   local state
//! - a lifetime watchdog that forces `TimedOut` if the provider never
//!   reports an end
//! - user-initiated hangup that pre-empts any in-flight poll result
//!
//! All provider I/O goes through the [`TelephonyProvider`] trait; transport
//! details live in the adapter, not here.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use dialer_core::{SessionCoordinator, DialerConfig, CreateCallRequest, TelephonyProvider};
//! # async fn example(provider: Arc<dyn TelephonyProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = SessionCoordinator::new(provider, DialerConfig::new("account-1"));
//! let mut events = coordinator.subscribe_events();
//!
//! let call_id = coordinator.place_call(CreateCallRequest {
//!     from_number: "+15550001111".into(),
//!     to_number: "+14155551234".into(),
//!     assistant_id: "assistant-1".into(),
//! }).await?;
//!
//! // ... later, end the call early:
//! coordinator.hangup_call(&call_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod call;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod provider;

pub use call::{map_provider_status, CallId, CallSession, CallState, StatusOutcome, TerminalReason};
pub use config::DialerConfig;
pub use coordinator::SessionCoordinator;
pub use error::{DialerError, DialerResult, ProviderError};
pub use events::{CallStatusInfo, DialerEvent};
pub use provider::{CreateCallRequest, ProviderCallHandle, TelephonyProvider};

/// Dialer-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
