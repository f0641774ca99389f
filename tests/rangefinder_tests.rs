//! # HC-SR04 Rangefinder Tests
//!
//! The echo line is scripted on the mock board; distances come from a queued
//! conversion so the averaging logic can be checked with exact values.

use rpi_components::cancel::{CancelSource, CancelToken};
use rpi_components::hal::mock::{MockBoard, MockDelay, MockEvent, MockInput, MockOutput};
use rpi_components::hal::{Level, Pull};
use rpi_components::rangefinder::{centimeters, HcSr04, SAMPLE_INTERVAL};
use rpi_components::ComponentError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TRIGGER: u8 = 23;
const ECHO: u8 = 24;

type Sensor = HcSr04<MockOutput, MockInput, MockDelay>;

fn sensor(board: &MockBoard) -> Sensor {
    HcSr04::new(
        board.output(TRIGGER).unwrap(),
        board.input(ECHO, Pull::Down).unwrap(),
        board.delay(),
    )
    .unwrap()
}

/// One echo pulse per sample
fn script_echoes(board: &MockBoard, samples: usize) {
    for _ in 0..samples {
        board.script_input(ECHO, &[Level::Low, Level::High, Level::Low]);
    }
}

fn queued(readings: &[f64]) -> impl Fn(Duration) -> f64 + Send + 'static {
    let queue = Mutex::new(readings.iter().copied().collect::<VecDeque<f64>>());
    move |_echo| queue.lock().unwrap().pop_front().unwrap_or(f64::NAN)
}

#[test]
fn test_trigger_pulse() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board);
    board.take_events();
    script_echoes(&board, 1);

    sensor.measure_echo().unwrap();

    assert_eq!(
        board.events(),
        vec![
            MockEvent::Level { pin: TRIGGER, level: Level::Low },
            MockEvent::Level { pin: TRIGGER, level: Level::High },
            MockEvent::Delay(Duration::from_micros(10)),
            MockEvent::Level { pin: TRIGGER, level: Level::Low },
        ]
    );
}

#[test]
fn test_sample_applies_conversion() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_conversion(|_echo| 42.5);
    script_echoes(&board, 1);
    assert_eq!(sensor.sample().unwrap(), 42.5);
}

#[test]
fn test_default_conversion_is_inches() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board);
    script_echoes(&board, 1);
    let distance = sensor.sample().unwrap();
    assert!(distance >= 0.0 && distance < 300.0);
    assert!((centimeters(Duration::from_millis(2)) - 34.3).abs() < 1e-9);
}

#[test]
fn test_approximate_distance_discards_outliers() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_conversion(queued(&[10.0, 10.2, 50.0, 10.1, 10.0]));
    script_echoes(&board, 5);

    let distance = sensor
        .approximate_distance(5, 5.0, &CancelToken::never())
        .unwrap();
    assert!((distance - 10.05).abs() < 1e-9, "got {distance}");
    assert_eq!(
        board.total_delay(),
        (SAMPLE_INTERVAL + Duration::from_micros(10)) * 5
    );
}

#[test]
fn test_approximate_distance_all_discarded() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_conversion(queued(&[10.0, 20.0, 40.0]));
    script_echoes(&board, 3);

    assert!(matches!(
        sensor.approximate_distance(3, 5.0, &CancelToken::never()),
        Err(ComponentError::EmptyResult(_))
    ));
}

#[test]
fn test_approximate_distance_needs_two_samples() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_conversion(|_echo| 12.0);
    script_echoes(&board, 1);

    assert!(matches!(
        sensor.approximate_distance(1, 5.0, &CancelToken::never()),
        Err(ComponentError::EmptyResult(_))
    ));
}

#[test]
fn test_approximate_distance_rejects_bad_tolerance() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board);
    board.take_events();

    for tolerance in [-1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            sensor.approximate_distance(5, tolerance, &CancelToken::never()),
            Err(ComponentError::InvalidArgument(_))
        ));
    }
    assert!(board.events().is_empty());
}

#[test]
fn test_cancelled_before_first_sample() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board);
    board.take_events();
    let source = CancelSource::new();
    source.cancel();

    assert!(matches!(
        sensor.approximate_distance(10, 5.0, &source.token()),
        Err(ComponentError::Cancelled)
    ));
    assert!(board.events().is_empty());
}

#[test]
fn test_cancelled_between_samples() {
    let board = MockBoard::new();
    let source = Arc::new(CancelSource::new());
    let token = source.token();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut sensor = sensor(&board).with_conversion(move |_echo| {
        if counter.fetch_add(1, Ordering::SeqCst) == 1 {
            source.cancel();
        }
        10.0
    });
    script_echoes(&board, 10);

    assert!(matches!(
        sensor.approximate_distance(10, 5.0, &token),
        Err(ComponentError::Cancelled)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_no_echo_times_out() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_echo_timeout(Duration::from_millis(5));

    assert!(matches!(
        sensor.measure_echo(),
        Err(ComponentError::Timeout(_))
    ));
}

#[test]
fn test_stuck_echo_times_out() {
    let board = MockBoard::new();
    let mut sensor = sensor(&board).with_echo_timeout(Duration::from_millis(5));
    board.set_input(ECHO, Level::High);

    assert!(matches!(
        sensor.measure_echo(),
        Err(ComponentError::Timeout(_))
    ));
}
