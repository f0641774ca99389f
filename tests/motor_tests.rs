//! # Motor Driver Tests
//!
//! L293D basic and variable-speed motors and the bipolar stepper, driven on
//! the mock board.

use rpi_components::hal::mock::{MockBoard, MockDelay, MockEvent, MockOutput};
use rpi_components::hal::{HalError, Level};
use rpi_components::motor::{
    BasicMotor, BipolarStepper, Direction, VariableSpeedMotor, FULL_STEP_SEQUENCE,
};
use rpi_components::ComponentError;
use std::time::Duration;

const ENABLE: u8 = 17;
const FORWARD: u8 = 27;
const REVERSE: u8 = 22;

fn level_changes(events: &[MockEvent]) -> Vec<(u8, Level)> {
    events
        .iter()
        .filter_map(|e| match *e {
            MockEvent::Level { pin, level } => Some((pin, level)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_basic_motor_forward_then_stop() {
    let board = MockBoard::new();
    let mut motor = BasicMotor::new(
        board.output(ENABLE).unwrap(),
        board.output(FORWARD).unwrap(),
        board.output(REVERSE).unwrap(),
    );
    assert_eq!(motor.direction(), Direction::Stopped);

    motor.enable().unwrap();
    assert!(motor.is_enabled().unwrap());
    board.take_events();

    motor.forward().unwrap();
    assert_eq!(
        level_changes(&board.take_events()),
        vec![(REVERSE, Level::Low), (FORWARD, Level::High)]
    );
    assert_eq!(motor.direction(), Direction::Forward);

    motor.stop().unwrap();
    assert_eq!(board.level(FORWARD), Level::Low);
    assert_eq!(board.level(REVERSE), Level::Low);
    assert_eq!(motor.direction(), Direction::Stopped);
}

#[test]
fn test_basic_motor_reverse_clears_forward_first() {
    let board = MockBoard::new();
    let mut motor = BasicMotor::new(
        board.output(ENABLE).unwrap(),
        board.output(FORWARD).unwrap(),
        board.output(REVERSE).unwrap(),
    );
    motor.enable().unwrap();
    motor.forward().unwrap();
    board.take_events();

    motor.reverse().unwrap();
    assert_eq!(
        level_changes(&board.take_events()),
        vec![(FORWARD, Level::Low), (REVERSE, Level::High)]
    );
    assert_eq!(motor.direction(), Direction::Reverse);
}

#[test]
fn test_basic_motor_runs_while_disabled() {
    let board = MockBoard::new();
    let mut motor = BasicMotor::new(
        board.output(ENABLE).unwrap(),
        board.output(FORWARD).unwrap(),
        board.output(REVERSE).unwrap(),
    );
    assert!(!motor.is_enabled().unwrap());
    motor.forward().unwrap();
    assert_eq!(board.level(FORWARD), Level::High);
    assert_eq!(motor.direction(), Direction::Forward);
}

#[test]
fn test_basic_motor_surfaces_transport_errors() {
    let board = MockBoard::new();
    let mut motor = BasicMotor::new(
        board.output(ENABLE).unwrap(),
        board.output(FORWARD).unwrap(),
        board.output(REVERSE).unwrap(),
    );
    board.fail_next(HalError::Gpio("line lost".into()));
    assert!(matches!(motor.enable(), Err(ComponentError::Transport(_))));
}

fn variable_motor(board: &MockBoard) -> VariableSpeedMotor<MockOutput, MockOutput> {
    let mut motor = VariableSpeedMotor::new(
        board.output(ENABLE).unwrap(),
        board.output(FORWARD).unwrap(),
        board.output(REVERSE).unwrap(),
    )
    .unwrap();
    motor.enable().unwrap();
    motor
}

#[test]
fn test_variable_motor_starts_idle() {
    let board = MockBoard::new();
    let motor = variable_motor(&board);
    assert_eq!(board.pwm(FORWARD), Some((100.0, 0.0)));
    assert_eq!(board.pwm(REVERSE), Some((100.0, 0.0)));
    assert_eq!(motor.speed(), 0.0);
    assert_eq!(motor.direction(), Direction::Stopped);
}

#[test]
fn test_variable_motor_directions() {
    let board = MockBoard::new();
    let mut motor = variable_motor(&board);

    motor.forward(Some(60.0)).unwrap();
    assert_eq!(motor.duty_cycles(), (60.0, 0.0));
    assert_eq!(board.pwm(FORWARD), Some((100.0, 60.0)));

    motor.reverse(None).unwrap();
    assert_eq!(motor.duty_cycles(), (0.0, 60.0));
    assert_eq!(motor.direction(), Direction::Reverse);

    motor.set_speed(25.0).unwrap();
    assert_eq!(motor.duty_cycles(), (0.0, 25.0));

    motor.stop().unwrap();
    assert_eq!(motor.duty_cycles(), (0.0, 0.0));
    assert_eq!(motor.direction(), Direction::Stopped);
    assert_eq!(motor.speed(), 25.0);

    motor.forward(None).unwrap();
    assert_eq!(motor.duty_cycles(), (25.0, 0.0));
}

#[test]
fn test_variable_motor_invalid_speed_keeps_state() {
    let board = MockBoard::new();
    let mut motor = variable_motor(&board);
    motor.forward(Some(40.0)).unwrap();
    board.take_events();

    for bad in [-0.1, 100.5, f64::NAN] {
        assert!(matches!(
            motor.set_speed(bad),
            Err(ComponentError::InvalidArgument(_))
        ));
        assert!(motor.forward(Some(bad)).is_err());
    }
    assert_eq!(motor.speed(), 40.0);
    assert_eq!(motor.duty_cycles(), (40.0, 0.0));
    assert!(board.take_events().is_empty());
}

#[test]
fn test_set_speed_while_stopped_applies_on_next_run() {
    let board = MockBoard::new();
    let mut motor = variable_motor(&board);
    motor.set_speed(80.0).unwrap();
    assert_eq!(motor.duty_cycles(), (0.0, 0.0));
    motor.reverse(None).unwrap();
    assert_eq!(motor.duty_cycles(), (0.0, 80.0));
}

const COILS: [u8; 4] = [5, 6, 13, 19];

fn stepper(board: &MockBoard) -> BipolarStepper<MockOutput, MockDelay> {
    BipolarStepper::new(COILS.map(|pin| board.output(pin).unwrap()), board.delay())
}

/// Coil pattern after each phase delay
fn phases(events: &[MockEvent]) -> Vec<[bool; 4]> {
    let mut coils = [false; 4];
    let mut seen = Vec::new();
    for event in events {
        match *event {
            MockEvent::Level { pin, level } => {
                if let Some(i) = COILS.iter().position(|&c| c == pin) {
                    coils[i] = level.is_high();
                }
            }
            MockEvent::Delay(_) => seen.push(coils),
            _ => {}
        }
    }
    seen
}

#[test]
fn test_stepper_forward_sequence() {
    let board = MockBoard::new();
    let mut motor = stepper(&board);

    motor.step(Direction::Forward, 2).unwrap();

    let expected: Vec<[bool; 4]> = FULL_STEP_SEQUENCE
        .iter()
        .chain(FULL_STEP_SEQUENCE.iter())
        .copied()
        .collect();
    assert_eq!(phases(&board.events()), expected);
    assert_eq!(board.total_delay(), Duration::from_micros(500) * 8);
}

#[test]
fn test_stepper_reverse_sequence() {
    let board = MockBoard::new();
    let mut motor = stepper(&board);
    motor.set_phase_delay(Duration::from_millis(2));

    motor.step(Direction::Reverse, 1).unwrap();

    let expected: Vec<[bool; 4]> = FULL_STEP_SEQUENCE.iter().rev().copied().collect();
    assert_eq!(phases(&board.events()), expected);
    assert_eq!(board.total_delay(), Duration::from_millis(8));
}

#[test]
fn test_stepper_stopped_and_release() {
    let board = MockBoard::new();
    let mut motor = stepper(&board);

    motor.step(Direction::Stopped, 10).unwrap();
    assert!(board.events().is_empty());

    motor.step(Direction::Forward, 1).unwrap();
    motor.release().unwrap();
    for pin in COILS {
        assert_eq!(board.level(pin), Level::Low);
    }
}
