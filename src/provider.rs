//! Telephony provider seam
//!
//! The coordinator never talks to a wire protocol directly; it consumes the
//! three operations below through this trait. Production code implements it
//! over the provider's REST API, tests implement it over scripted responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Request to place an outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallRequest {
    /// Caller number, one of the account's provisioned numbers
    pub from_number: String,
    /// Destination number in E.164-style form
    pub to_number: String,
    /// Assistant to connect once the call is answered
    pub assistant_id: String,
}

/// Handle returned by the provider for a created call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallHandle {
    /// Provider-side call identifier, used for status and hangup requests
    pub call_id: String,
}

/// Operations the dialer needs from the external telephony provider.
///
/// Status strings are returned raw; the caller maps them through the closed
/// vocabulary table in [`crate::call::map_provider_status`].
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Ask the provider to place an outbound call
    async fn create_call(
        &self,
        request: &CreateCallRequest,
    ) -> Result<ProviderCallHandle, ProviderError>;

    /// Fetch the provider's current status string for a call
    async fn call_status(&self, call_id: &str, owner_id: &str) -> Result<String, ProviderError>;

    /// Ask the provider to terminate a call
    async fn hangup(&self, call_id: &str, owner_id: &str) -> Result<(), ProviderError>;
}
