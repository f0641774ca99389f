//! # Motor Drivers
//!
//! - [`BasicMotor`] - L293D half-bridge pair with enable, forward and reverse lines
//! - [`VariableSpeedMotor`] - the same wiring with PWM on both polarity lines
//! - [`BipolarStepper`] - two full H-bridges driven through a 4-phase sequence
//!
//! Direction commands on a disabled L293D are carried out anyway and logged
//! as a warning.

pub mod l293d;
pub mod stepper;

pub use l293d::{BasicMotor, VariableSpeedMotor};
pub use stepper::{BipolarStepper, FULL_STEP_SEQUENCE};

use std::fmt;

/// Rotation direction, mirrored in driver memory after every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    #[default]
    Stopped,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "FORWARD"),
            Direction::Stopped => write!(f, "STOPPED"),
            Direction::Reverse => write!(f, "REVERSE"),
        }
    }
}
