//! Shared test fixtures: a scripted telephony provider and wait helpers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use dialer_core::{
    CallState, CreateCallRequest, DialerConfig, ProviderCallHandle, ProviderError,
    SessionCoordinator, TelephonyProvider,
};

/// Telephony provider driven by a script of canned responses.
///
/// `call_status` pops from the script queue; when the queue is empty it
/// serves the configured fallback status, so a test can hold a call in
/// `ringing` for as long as it needs.
pub struct MockProvider {
    statuses: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback_status: Mutex<Option<String>>,
    status_delay: Mutex<Duration>,
    fail_next_create: Mutex<Option<ProviderError>>,
    fail_hangup: Mutex<Option<ProviderError>>,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub hangup_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: Mutex::new(None),
            status_delay: Mutex::new(Duration::ZERO),
            fail_next_create: Mutex::new(None),
            fail_hangup: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            hangup_calls: AtomicUsize::new(0),
        })
    }

    pub fn script_statuses(&self, statuses: &[&str]) {
        let mut queue = self.statuses.lock().unwrap();
        for status in statuses {
            queue.push_back(Ok(status.to_string()));
        }
    }

    pub fn script_status_error(&self, message: &str) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Err(ProviderError::new(message)));
    }

    pub fn set_fallback_status(&self, status: &str) {
        *self.fallback_status.lock().unwrap() = Some(status.to_string());
    }

    /// Add latency to every status fetch, to widen race windows
    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn fail_next_create(&self, message: &str) {
        *self.fail_next_create.lock().unwrap() = Some(ProviderError::with_code(400, message));
    }

    pub fn fail_hangup(&self, message: &str) {
        *self.fail_hangup.lock().unwrap() = Some(ProviderError::with_code(409, message));
    }

    pub fn status_fetches(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelephonyProvider for MockProvider {
    async fn create_call(
        &self,
        _request: &CreateCallRequest,
    ) -> Result<ProviderCallHandle, ProviderError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.fail_next_create.lock().unwrap().take() {
            return Err(error);
        }
        Ok(ProviderCallHandle { call_id: format!("prov-call-{n}") })
    }

    async fn call_status(&self, _call_id: &str, _owner_id: &str) -> Result<String, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.statuses.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => match self.fallback_status.lock().unwrap().clone() {
                Some(status) => Ok(status),
                None => Err(ProviderError::new("no scripted status")),
            },
        }
    }

    async fn hangup(&self, _call_id: &str, _owner_id: &str) -> Result<(), ProviderError> {
        self.hangup_calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_hangup.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Millisecond-scale timings so lifecycle tests finish quickly
pub fn test_config() -> DialerConfig {
    DialerConfig::new("owner-test")
        .with_poll_interval(Duration::from_millis(20))
        .with_max_call_duration(Duration::from_secs(5))
        .with_poll_failure_warning_threshold(3)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dialer_core=debug")
        .with_test_writer()
        .try_init();
}

pub fn call_request() -> CreateCallRequest {
    CreateCallRequest {
        from_number: "+15550001111".into(),
        to_number: "+14155551234".into(),
        assistant_id: "assistant-1".into(),
    }
}

/// Poll the active slot until it reaches the wanted state
pub async fn wait_for_state(coordinator: &Arc<SessionCoordinator>, want: CallState) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(session) = coordinator.active_call().await {
            if session.state == want {
                return;
            }
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for call state {want:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Give event emission a moment to catch up with the state change that a
/// wait observed, so draining with `try_recv` sees everything.
pub async fn let_events_settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Assert the poller has gone quiet: after letting any in-flight fetch
/// land, the fetch count must not move for several poll periods.
pub async fn assert_polling_stopped(provider: &MockProvider) {
    tokio::time::sleep(Duration::from_millis(60)).await;
    let before = provider.status_fetches();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        before,
        provider.status_fetches(),
        "status fetches continued after the call settled"
    );
}
