use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the session coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerConfig {
    /// Account the calls are placed on behalf of; sent with every status
    /// and hangup request
    pub owner_id: String,

    /// Cadence of the status poller
    pub poll_interval: Duration,

    /// Hard upper bound on a session's lifetime. When it elapses the call
    /// is forced to `TimedOut` regardless of what the provider reports.
    pub max_call_duration: Duration,

    /// Consecutive status-fetch failures tolerated before a degraded-poll
    /// warning is emitted
    pub poll_failure_warning_threshold: u32,

    /// Capacity of the broadcast event channel
    pub event_channel_capacity: usize,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            poll_interval: Duration::from_secs(2),
            max_call_duration: Duration::from_secs(300),
            poll_failure_warning_threshold: 3,
            event_channel_capacity: 64,
        }
    }
}

impl DialerConfig {
    /// Create a config for the given owner with default timings
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ..Default::default()
        }
    }

    /// Set the status poll cadence
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the session lifetime budget
    pub fn with_max_call_duration(mut self, budget: Duration) -> Self {
        self.max_call_duration = budget;
        self
    }

    /// Set the consecutive-failure threshold for the degraded-poll warning
    pub fn with_poll_failure_warning_threshold(mut self, threshold: u32) -> Self {
        self.poll_failure_warning_threshold = threshold;
        self
    }
}
