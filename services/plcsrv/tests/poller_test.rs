//! Poll scheduler tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use plc_link::{DriverManager, PlcValue, ReadResponse, ResponseCode, SimulatedDriver};
use plcsrv::config::connection_url;
use plcsrv::mapping::build_fields;
use plcsrv::{
    ConnectionError, FieldValue, PlcSrvError, PollTarget, Poller, Schema, Session, SessionState,
};
use tokio_util::sync::CancellationToken;

use common::{mock_session, target, unit_metric, MockState, RecordingSink, Step};

const INTERVAL: Duration = Duration::from_secs(10);

fn poller_with_mock(timeout: Duration) -> (Poller, Arc<MockState>, RecordingSink) {
    let (session, state) = mock_session(&[unit_metric(&[("temp", "x")])], timeout);
    state.set_response(ReadResponse::new().with("temp", ResponseCode::Ok, PlcValue::Float32(21.5)));
    let sink = RecordingSink::default();
    (
        Poller::new(session, Box::new(sink.clone()), INTERVAL),
        state,
        sink,
    )
}

fn cancel_after(after: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        trigger.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_poll_once_emits_cycle_metrics() {
    let (mut poller, _state, sink) = poller_with_mock(Duration::from_secs(1));
    poller.start().await.unwrap();

    assert_eq!(poller.poll_once().await.unwrap(), 1);

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].field("temp"), Some(&FieldValue::Float32(21.5)));
}

#[tokio::test]
async fn test_start_fails_without_driver() {
    let session = Session::new(
        DriverManager::new(),
        target(&[unit_metric(&[("temp", "x")])], Duration::from_secs(1)),
    );
    let mut poller = Poller::new(session, Box::new(RecordingSink::default()), INTERVAL);

    let err = poller.start().await.unwrap_err();
    assert!(matches!(
        err,
        PlcSrvError::Connection(ConnectionError::ConnectFailed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_run_ticks_until_cancelled() {
    let (mut poller, state, sink) = poller_with_mock(Duration::from_secs(1));
    poller.start().await.unwrap();

    // ticks at 0s, 10s and 20s
    poller.run(cancel_after(Duration::from_secs(25))).await.unwrap();

    assert_eq!(sink.batches().len(), 3);
    assert_eq!(poller.session().state(), SessionState::Terminal);
    assert_eq!(MockState::count(&state.closes), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_survives_timeouts_and_transport_errors() {
    let (mut poller, state, sink) = poller_with_mock(Duration::from_secs(1));
    poller.start().await.unwrap();
    state.script([Step::Hang, Step::Fail("reset"), Step::Fail("reset")]);

    // 0s: timeout, 10s: failed retry, 20s: success
    poller.run(cancel_after(Duration::from_secs(25))).await.unwrap();

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(MockState::count(&state.executes), 4);
}

#[tokio::test]
async fn test_run_stops_on_fatal_error() {
    let (mut poller, _state, sink) = poller_with_mock(Duration::from_secs(1));
    poller.start().await.unwrap();
    poller.shutdown().await;

    let err = poller.run(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, PlcSrvError::Connection(ConnectionError::Closed));
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_simulated_end_to_end() {
    let mut manager = DriverManager::new();
    manager.register(Arc::new(SimulatedDriver::default()));

    let target = PollTarget {
        schema: Schema::Simulated,
        url: connection_url(Schema::Simulated, "bench", &[]),
        timeout: Duration::from_secs(1),
        fields: build_fields(&[unit_metric(&[
            ("temp", "REAL:21.5"),
            ("speed", "UINT:1450"),
            ("fault", "ERROR:REMOTE_BUSY"),
        ])])
        .unwrap(),
    };

    let sink = RecordingSink::default();
    let mut poller = Poller::new(Session::new(manager, target), Box::new(sink.clone()), INTERVAL);
    poller.start().await.unwrap();
    poller.poll_once().await.unwrap();
    poller.shutdown().await;

    let metric = &sink.batches()[0][0];
    assert_eq!(metric.measurement, "m");
    assert_eq!(metric.field("temp"), Some(&FieldValue::Float32(21.5)));
    assert_eq!(metric.field("speed"), Some(&FieldValue::Uint16(1450)));
    assert_eq!(metric.field("fault"), None);
}
