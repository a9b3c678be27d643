//! Integration tests for hangup, timeout, and cleanup convergence

mod common;

use std::time::Duration;

use tokio_test::assert_ok;

use dialer_core::{
    CallState, DialerError, DialerEvent, SessionCoordinator, TerminalReason,
};

use common::{
    assert_polling_stopped, call_request, init_tracing, let_events_settle, test_config,
    wait_for_state, MockProvider,
};

#[tokio::test]
async fn hangup_ends_the_call_and_stops_both_tasks() {
    init_tracing();
    let provider = MockProvider::new();
    provider.set_fallback_status("ringing");
    let coordinator = SessionCoordinator::new(provider.clone(), test_config());
    let mut events = coordinator.subscribe_events();

    let call_id = assert_ok!(coordinator.place_call(call_request()).await);
    wait_for_state(&coordinator, CallState::Ringing).await;

    assert_ok!(coordinator.hangup_call(&call_id).await);

    // The transition is synchronous with hangup success: no waiting needed.
    let session = coordinator.active_call().await.expect("call in slot");
    assert_eq!(session.state, CallState::Ended);
    assert_eq!(session.terminal_reason, Some(TerminalReason::Hangup));
    assert_eq!(provider.hangup_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let_events_settle().await;
    let mut refreshes = 0;
    while let Ok(event) = events.try_recv() {
        if let DialerEvent::CallLogRefreshRequested { reason, .. } = event {
            refreshes += 1;
            assert_eq!(reason, TerminalReason::Hangup);
        }
    }
    assert_eq!(refreshes, 1);

    assert_polling_stopped(&provider).await;
}

#[tokio::test]
async fn hangup_beats_a_status_fetch_already_in_flight() {
    init_tracing();
    let provider = MockProvider::new();
    provider.set_fallback_status("in-progress");
    // Every fetch takes longer than a poll period, so a fetch is nearly
    // always in flight when the hangup lands.
    provider.set_status_delay(Duration::from_millis(100));
    let coordinator = SessionCoordinator::new(provider.clone(), test_config());
    let mut events = coordinator.subscribe_events();

    let call_id = assert_ok!(coordinator.place_call(call_request()).await);

    // Let the poller enter its first fetch, then hang up mid-flight.
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(provider.status_fetches() >= 1, "a fetch should be in flight");
    assert_ok!(coordinator.hangup_call(&call_id).await);

    let session = coordinator.active_call().await.expect("call in slot");
    assert_eq!(session.state, CallState::Ended);

    // Wait out the in-flight fetch; its result must be discarded.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let session = coordinator.active_call().await.expect("call in slot");
    assert_eq!(session.state, CallState::Ended);
    assert_eq!(session.terminal_reason, Some(TerminalReason::Hangup));

    let mut refreshes = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            DialerEvent::CallStateChanged { info } => {
                assert_ne!(
                    info.new_state,
                    CallState::InProgress,
                    "stale poll result must not be applied after hangup"
                );
            }
            DialerEvent::CallLogRefreshRequested { .. } => refreshes += 1,
            DialerEvent::PollDegraded { .. } => {}
        }
    }
    assert_eq!(refreshes, 1);
}

#[tokio::test]
async fn rejected_hangup_leaves_the_call_running() {
    init_tracing();
    let provider = MockProvider::new();
    provider.set_fallback_status("in-progress");
    provider.fail_hangup("call not found upstream");
    let coordinator = SessionCoordinator::new(provider.clone(), test_config());

    let call_id = assert_ok!(coordinator.place_call(call_request()).await);
    wait_for_state(&coordinator, CallState::InProgress).await;

    let err = coordinator.hangup_call(&call_id).await.unwrap_err();
    assert!(matches!(err, DialerError::ProviderRejected { .. }));

    // Session untouched, polling still running so the user can retry.
    assert!(coordinator.is_call_active().await);
    let before = provider.status_fetches();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(provider.status_fetches() > before, "poller should keep running");

    // The retry succeeds once the provider cooperates.
    assert_ok!(coordinator.hangup_call(&call_id).await);
    assert!(!coordinator.is_call_active().await);
    coordinator.shutdown().await;
}

#[tokio::test]
async fn stuck_call_is_forced_to_timed_out_within_budget() {
    init_tracing();
    let provider = MockProvider::new();
    provider.set_fallback_status("ringing");
    let config = test_config().with_max_call_duration(Duration::from_millis(150));
    let coordinator = SessionCoordinator::new(provider.clone(), config);
    let mut events = coordinator.subscribe_events();

    assert_ok!(coordinator.place_call(call_request()).await);
    wait_for_state(&coordinator, CallState::TimedOut).await;

    let session = coordinator.active_call().await.expect("call in slot");
    assert_eq!(session.terminal_reason, Some(TerminalReason::TimedOut));

    let_events_settle().await;
    let mut refreshes = 0;
    while let Ok(event) = events.try_recv() {
        if let DialerEvent::CallLogRefreshRequested { reason, .. } = event {
            refreshes += 1;
            assert_eq!(reason, TerminalReason::TimedOut);
        }
    }
    assert_eq!(refreshes, 1);

    // No poll tick survives the watchdog.
    assert_polling_stopped(&provider).await;
}

#[tokio::test]
async fn hangup_after_the_call_settled_is_a_quiet_success() {
    init_tracing();
    let provider = MockProvider::new();
    provider.script_statuses(&["completed"]);
    let coordinator = SessionCoordinator::new(provider.clone(), test_config());

    let call_id = assert_ok!(coordinator.place_call(call_request()).await);
    wait_for_state(&coordinator, CallState::Completed).await;

    // The provider already ended the call; no terminate request goes out.
    assert_ok!(coordinator.hangup_call(&call_id).await);
    assert_eq!(provider.hangup_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    let session = coordinator.active_call().await.expect("call in slot");
    assert_eq!(session.state, CallState::Completed);
    assert_eq!(session.terminal_reason, Some(TerminalReason::Completed));
}

#[tokio::test]
async fn hangup_without_a_call_is_an_error() {
    let provider = MockProvider::new();
    let coordinator = SessionCoordinator::new(provider, test_config());
    let missing = dialer_core::CallId::new_v4();
    assert!(matches!(
        coordinator.hangup_call(&missing).await,
        Err(DialerError::NoActiveCall)
    ));
}

#[tokio::test]
async fn shutdown_cancels_tasks_and_refuses_new_calls() {
    init_tracing();
    let provider = MockProvider::new();
    provider.set_fallback_status("ringing");
    let coordinator = SessionCoordinator::new(provider.clone(), test_config());

    assert_ok!(coordinator.place_call(call_request()).await);
    wait_for_state(&coordinator, CallState::Ringing).await;

    coordinator.shutdown().await;
    assert!(!coordinator.is_running());
    assert_polling_stopped(&provider).await;

    // Shutting down again is a no-op, not a panic.
    coordinator.shutdown().await;

    assert!(matches!(
        coordinator.place_call(call_request()).await,
        Err(DialerError::Shutdown)
    ));
}
