//! Integration tests for the stream session lifecycle, driven by the
//! simulated engine.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gaze_stream_client::{GazeError, GazePoint, SessionState, SimulatedEngine, StreamSession};

fn script(n: usize) -> Vec<GazePoint> {
    (0..n)
        .map(|i| GazePoint::valid(i as i64 * 1_000, i as f32 / n as f32, 0.5))
        .collect()
}

/// Spin until `condition` holds or a 5 s deadline passes.
fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn latest_is_none_before_first_sample() {
    let session = StreamSession::new(Box::new(SimulatedEngine::with_script(script(4))));
    assert_eq!(session.latest_gaze_point(), None);
}

#[test]
fn delivers_samples_in_order_and_tracks_latest() {
    let samples = script(16);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let engine = SimulatedEngine::with_script(samples.clone());
    let mut session = StreamSession::with_callback(Box::new(engine), move |point| {
        sink.lock().unwrap().push(point);
    });

    session.start_stream().unwrap();
    assert!(wait_for(|| seen.lock().unwrap().len() == samples.len()));
    session.stop_stream().unwrap();

    assert_eq!(*seen.lock().unwrap(), samples);
    assert_eq!(session.latest_gaze_point(), samples.last().copied());
    assert_eq!(session.stats().samples_delivered, samples.len() as u64);
}

#[test]
fn start_while_streaming_is_rejected() {
    let mut session = StreamSession::new(Box::new(SimulatedEngine::with_script(Vec::new())));
    session.start_stream().unwrap();
    assert!(matches!(
        session.start_stream(),
        Err(GazeError::AlreadyStreaming)
    ));
    session.stop_stream().unwrap();
}

#[test]
fn stop_on_idle_is_a_noop_for_any_history() {
    let mut session = StreamSession::new(Box::new(SimulatedEngine::with_script(script(2))));
    assert!(session.stop_stream().is_ok());

    session.start_stream().unwrap();
    session.stop_stream().unwrap();
    assert!(session.stop_stream().is_ok());
    assert!(session.stop_stream().is_ok());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn offline_engine_reports_device_unavailable() {
    let mut session = StreamSession::new(Box::new(SimulatedEngine::offline()));
    assert!(matches!(
        session.start_stream(),
        Err(GazeError::DeviceUnavailable)
    ));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn device_released_exactly_once_with_explicit_stop() {
    let engine = SimulatedEngine::with_script(script(4));
    let probe = engine.probe();

    let mut session = StreamSession::new(Box::new(engine));
    session.start_stream().unwrap();
    session.stop_stream().unwrap();
    drop(session);

    assert_eq!(probe.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn device_released_exactly_once_without_stop() {
    let engine = SimulatedEngine::with_script(script(4));
    let probe = engine.probe();

    let mut session = StreamSession::new(Box::new(engine));
    session.start_stream().unwrap();
    drop(session);

    assert_eq!(probe.releases.load(Ordering::SeqCst), 1);
    assert_eq!(probe.live_subscriptions(), 0);
}

#[test]
fn never_more_than_one_live_subscription() {
    let engine = SimulatedEngine::with_script(script(2));
    let probe = engine.probe();

    let mut session = StreamSession::new(Box::new(engine));
    for _ in 0..5 {
        session.start_stream().unwrap();
        assert_eq!(probe.live_subscriptions(), 1);

        // A rejected start must not subscribe a second time.
        let _ = session.start_stream();
        assert_eq!(probe.live_subscriptions(), 1);

        session.stop_stream().unwrap();
        assert_eq!(probe.live_subscriptions(), 0);
    }
    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 5);
}

#[test]
fn no_callback_fires_after_stop_returns() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = calls.clone();

    let engine =
        SimulatedEngine::with_script(script(1_000)).with_cadence(Duration::from_millis(1));
    let mut session = StreamSession::with_callback(Box::new(engine), move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    session.start_stream().unwrap();
    assert!(wait_for(|| calls.load(Ordering::SeqCst) >= 5));
    session.stop_stream().unwrap();

    let after_stop = calls.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}

#[test]
fn stream_restarts_after_stop() {
    let samples = script(6);
    let engine = SimulatedEngine::with_script(samples.clone());
    let probe = engine.probe();

    let calls = Arc::new(AtomicUsize::new(0));
    let sink = calls.clone();
    let mut session = StreamSession::with_callback(Box::new(engine), move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    session.start_stream().unwrap();
    assert!(wait_for(|| calls.load(Ordering::SeqCst) == 6));
    session.stop_stream().unwrap();

    session.start_stream().unwrap();
    assert!(wait_for(|| calls.load(Ordering::SeqCst) == 12));
    session.stop_stream().unwrap();

    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 2);
    assert_eq!(session.latest_gaze_point(), samples.last().copied());
}

#[test]
fn guard_stops_stream_when_scope_panics() {
    let engine = SimulatedEngine::with_script(script(4));
    let probe = engine.probe();
    let mut session = StreamSession::new(Box::new(engine));

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _stream = session.stream().unwrap();
        panic!("scope failed");
    }));

    assert!(outcome.is_err());
    assert!(!session.is_streaming());
    assert_eq!(probe.live_subscriptions(), 0);
}

#[test]
fn guard_stops_stream_on_normal_exit() {
    let engine = SimulatedEngine::with_script(script(4));
    let probe = engine.probe();
    let mut session = StreamSession::new(Box::new(engine));

    {
        let stream = session.stream().unwrap();
        let _ = stream.latest_gaze_point();
    }

    assert!(!session.is_streaming());
    assert_eq!(probe.live_subscriptions(), 0);
}

#[test]
fn panicking_callback_does_not_kill_delivery() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = calls.clone();

    let engine = SimulatedEngine::with_script(script(8));
    let mut session = StreamSession::with_callback(Box::new(engine), move |_| {
        if sink.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first sample rejected");
        }
    });

    session.start_stream().unwrap();
    assert!(wait_for(|| calls.load(Ordering::SeqCst) == 8));
    session.stop_stream().unwrap();

    assert_eq!(session.stats().samples_delivered, 8);
}

#[test]
fn invalid_samples_are_delivered_and_counted() {
    let samples = vec![
        GazePoint::valid(1_000, 0.1, 0.1),
        GazePoint::invalid(2_000),
        GazePoint::valid(3_000, 0.3, 0.3),
    ];
    let engine = SimulatedEngine::with_script(samples.clone());
    let mut session = StreamSession::new(Box::new(engine));

    session.start_stream().unwrap();
    assert!(wait_for(|| session.stats().samples_delivered == 3));
    session.stop_stream().unwrap();

    assert_eq!(session.latest_gaze_point(), Some(samples[2]));
    assert_eq!(session.stats().invalid_samples, 1);
}
