//! Each operation end to end against the fake controller.

use std::time::Duration;

use chrono::{Datelike, Timelike};
use screenlogic_adapter::{ControllerState, Error, ProtocolError};

use crate::harness::{adapter_for, test_options, FakeController, FakeState, VERSION};

const IDLE: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_time_and_version() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    let t = adapter.get_time().await.unwrap();
    assert_eq!((t.year(), t.month(), t.day()), (2024, 7, 14));
    assert_eq!((t.hour(), t.minute(), t.second()), (9, 30, 5));
    assert_eq!(adapter.get_version().await.unwrap(), VERSION);

    assert_eq!(fake.connections(), 1);
    assert_eq!(fake.logins(), 1);
    assert_eq!(fake.requests_on(1), vec![(1, 27), (2, 8110), (3, 8120)]);
}

#[tokio::test]
async fn test_config_lists_circuits() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    let cfg = adapter.get_config().await.unwrap();
    assert_eq!(cfg.model, "EasyTouch2 8");
    assert!(!cfg.celsius);
    assert_eq!(cfg.circuits.len(), 4);
    assert_eq!(cfg.circuit_name(510), Some("Pool Light"));
    assert_eq!(cfg.circuit_by_name("Spa").map(|c| c.id), Some(500));
    assert!(cfg.circuit_by_id(999).is_none());
    assert_eq!(cfg.colors.len(), 1);
    assert!(cfg.intelliflo.is_empty());
}

#[tokio::test]
async fn test_status_tracks_circuit_changes() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    let status = adapter.get_status().await.unwrap();
    assert_eq!(status.state, ControllerState::Ready);
    assert_eq!(status.status_for_id(505), Some(false));
    assert_eq!(status.status_for_id(515), Some(true));
    assert_eq!(status.status_for_id(999), None);

    adapter.set_circuit(505, true).await.unwrap();
    assert_eq!(fake.circuit_on(505), Some(true));
    assert_eq!(adapter.get_status().await.unwrap().status_for_id(505), Some(true));

    // Idempotent.
    adapter.set_circuit(505, true).await.unwrap();
    assert_eq!(fake.circuit_on(505), Some(true));

    adapter.set_circuit(505, false).await.unwrap();
    assert_eq!(adapter.get_status().await.unwrap().status_for_id(505), Some(false));
    assert_eq!(fake.connections(), 1);
}

#[tokio::test]
async fn test_toggle_circuit() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    assert!(adapter.toggle_circuit(510).await.unwrap());
    assert_eq!(fake.circuit_on(510), Some(true));
    assert!(!adapter.toggle_circuit(510).await.unwrap());
    assert_eq!(fake.circuit_on(510), Some(false));
}

#[tokio::test]
async fn test_unknown_circuit_is_bad_parameter() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    let err = adapter.set_circuit(999, true).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::BadParameter)));

    // The stream stayed in sync; the same connection carries on.
    assert_eq!(adapter.get_version().await.unwrap(), VERSION);
    assert_eq!(fake.connections(), 1);
    let codes: Vec<u16> = fake.requests_on(1).iter().map(|r| r.1).collect();
    assert_eq!(codes, vec![27, 12530, 8120]);
}

#[tokio::test]
async fn test_bad_login() {
    let fake = FakeController::start_with(FakeState {
        reject_login: true,
        ..Default::default()
    })
    .await;
    let adapter = adapter_for(&fake, test_options(IDLE));

    let err = adapter.get_version().await.unwrap_err();
    assert!(matches!(err, Error::Connect(_)));
    assert!(matches!(err.protocol(), Some(ProtocolError::BadLogin)));
    assert_eq!(fake.logins(), 0);
    assert!(!adapter.manager().is_connected().await);
}

#[tokio::test]
async fn test_stale_responses_are_skipped() {
    let fake = FakeController::start().await;
    let adapter = adapter_for(&fake, test_options(IDLE));
    adapter.get_version().await.unwrap();
    fake.with_state(|s| s.stale_first = true);
    // Stale id arrives first and is discarded; the real reply is accepted.
    assert_eq!(adapter.get_version().await.unwrap(), VERSION);
    let status = adapter.get_status().await.unwrap();
    assert_eq!(status.circuits.len(), 4);
}

#[tokio::test]
async fn test_fixed_reply_id_needs_relaxed_matching() {
    let state = || FakeState {
        fixed_reply_id: Some(0),
        ..Default::default()
    };

    let fake = FakeController::start_with(state()).await;
    let strict = adapter_for(&fake, test_options(IDLE));
    let err = strict.get_version().await.unwrap_err();
    assert!(matches!(
        err.protocol(),
        Some(ProtocolError::UnexpectedResponseId { expected: 1, got: 0 })
    ));

    let fake = FakeController::start_with(state()).await;
    let mut opts = test_options(IDLE);
    opts.match_response_ids = false;
    let relaxed = adapter_for(&fake, opts);
    assert_eq!(relaxed.get_version().await.unwrap(), VERSION);
    relaxed.set_circuit(500, true).await.unwrap();
    assert_eq!(fake.circuit_on(500), Some(true));
}
