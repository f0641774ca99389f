//! # Hardware Abstraction Layer for Peripheral Buses
//!
//! This module defines the bus primitives every driver in this crate is written
//! against: single GPIO lines (output, input, bidirectional, PWM, edge-triggered
//! input), an SPI
//! full-duplex transfer, an I2C byte/block primitive and a blocking delay.
//!
//! Drivers own the line and bus handles they are constructed with. Nothing is
//! shared between drivers; the pin numbering scheme is a property of the board
//! handle that hands the lines out, not of the process.
//!
//! ## Implementations
//!
//! - [`mock::MockBoard`] - in-memory board used by tests and dry runs
//! - `raspberry_pi::RaspberryPiBoard` - `rppal`-backed hardware access
//!   (feature `raspberry-pi`)
//!
//! ## Usage
//!
//! ```rust
//! use rpi_components::hal::mock::MockBoard;
//! use rpi_components::hal::{Level, OutputLine};
//!
//! let board = MockBoard::new();
//! let mut line = board.output(17).unwrap();
//! line.set_level(Level::High).unwrap();
//! assert_eq!(board.level(17), Level::High);
//! ```

use std::fmt;
use std::thread;
use std::time::Duration;
use thiserror::Error;

pub mod mock;
pub mod numbering;

#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

pub use numbering::{Numbering, Pin};

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{RaspberryPiBoard, RpiI2c, RpiInput, RpiIo, RpiOutput, RpiSpi};

/// Errors that can occur during bus and pin operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HalError {
    #[error("GPIO operation failed: {0}")]
    Gpio(String),

    #[error("PWM operation failed: {0}")]
    Pwm(String),

    #[error("SPI transfer failed: {0}")]
    Spi(String),

    #[error("I2C transaction failed: {0}")]
    I2c(String),

    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("Invalid pin {pin} under {numbering} numbering")]
    InvalidPin { pin: u8, numbering: Numbering },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "LOW"),
            Level::High => write!(f, "HIGH"),
        }
    }
}

/// Input bias resistor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pull {
    /// No software bias, an external resistor is expected
    #[default]
    None,
    Up,
    Down,
}

/// Edge selection for interrupt-driven inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Trigger on rising edge (low to high)
    Rising,
    /// Trigger on falling edge (high to low)
    Falling,
    /// Trigger on both edges
    Both,
}

impl Edge {
    /// Whether a transition that ended at `level` matches this edge selection
    pub fn matches(self, level: Level) -> bool {
        match self {
            Edge::Rising => level.is_high(),
            Edge::Falling => level.is_low(),
            Edge::Both => true,
        }
    }
}

/// Handler invoked by the platform when a watched edge occurs.
///
/// The argument is the line level right after the transition. The handler
/// runs on whatever thread the platform delivers interrupts on.
pub type EdgeHandler = Box<dyn FnMut(Level) + Send + 'static>;

/// A GPIO line configured as an output
pub trait OutputLine {
    /// Drive the line to `level`
    fn set_level(&mut self, level: Level) -> Result<(), HalError>;

    /// Read back the level currently driven on the line
    fn level(&self) -> Result<Level, HalError>;

    fn set_high(&mut self) -> Result<(), HalError> {
        self.set_level(Level::High)
    }

    fn set_low(&mut self) -> Result<(), HalError> {
        self.set_level(Level::Low)
    }
}

/// A GPIO line configured as an input
pub trait InputLine {
    /// Sample the current line level
    fn read(&mut self) -> Result<Level, HalError>;
}

/// An output line that can additionally be driven by a (software) PWM channel
pub trait PwmLine: OutputLine {
    /// Start or update PWM output. `duty_percent` is in [0, 100].
    fn set_pwm(&mut self, frequency_hz: f64, duty_percent: f64) -> Result<(), HalError>;

    /// Stop PWM output, leaving the line low
    fn clear_pwm(&mut self) -> Result<(), HalError>;
}

/// An input line that can deliver edge notifications
pub trait EdgeLine: InputLine {
    /// Register `handler` for `edge` transitions, replacing any previous one
    fn set_edge_handler(&mut self, edge: Edge, handler: EdgeHandler) -> Result<(), HalError>;

    /// Remove a registered handler, if any
    fn clear_edge_handler(&mut self) -> Result<(), HalError>;
}

/// Direction of a bidirectional line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Output,
    Input(Pull),
}

/// A GPIO line whose direction can change after it was claimed
pub trait IoLine {
    fn set_mode(&mut self, mode: IoMode) -> Result<(), HalError>;

    fn mode(&self) -> IoMode;

    /// Drive the line; fails unless the line is in output mode
    fn write(&mut self, level: Level) -> Result<(), HalError>;

    /// Sample the line in either mode
    fn read(&mut self) -> Result<Level, HalError>;
}

/// Full-duplex SPI transfer primitive bound to one bus and chip select
pub trait SpiBus {
    /// Clock `write` out and return the bytes clocked in; both have equal length
    fn transfer(&mut self, write: &[u8]) -> Result<Vec<u8>, HalError>;
}

/// I2C primitive bound to one bus; the target address is given per call
pub trait I2cBus {
    /// Write a single byte to the device at `address`
    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), HalError>;

    /// Write `register` followed by `payload` in one transaction
    fn write_block(&mut self, address: u8, register: u8, payload: &[u8]) -> Result<(), HalError>;

    /// Read a single byte from the device at `address`
    fn read_byte(&mut self, address: u8) -> Result<u8, HalError>;
}

/// Blocking delay primitive
pub trait Delay {
    fn delay(&mut self, duration: Duration);

    fn delay_s(&mut self, s: u64) {
        self.delay(Duration::from_secs(s));
    }

    fn delay_ms(&mut self, ms: u64) {
        self.delay(Duration::from_millis(ms));
    }

    fn delay_us(&mut self, us: u64) {
        self.delay(Duration::from_micros(us));
    }

    fn delay_ns(&mut self, ns: u64) {
        self.delay(Duration::from_nanos(ns));
    }
}

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration);
    }
}

/// Send a transfer and verify the reply length matches
pub(crate) fn transfer_exact<S: SpiBus + ?Sized>(
    spi: &mut S,
    write: &[u8],
) -> Result<Vec<u8>, HalError> {
    let reply = spi.transfer(write)?;
    if reply.len() != write.len() {
        return Err(HalError::ShortTransfer {
            expected: write.len(),
            actual: reply.len(),
        });
    }
    log::trace!(
        "SPI tx [{}] rx [{}]",
        crate::util::hex::format_hex_compact(write),
        crate::util::hex::format_hex_compact(&reply)
    );
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert!(bool::from(Level::High));
        assert_eq!(!Level::High, Level::Low);
        assert_eq!(Level::default(), Level::Low);
    }

    #[test]
    fn test_edge_matching() {
        assert!(Edge::Rising.matches(Level::High));
        assert!(!Edge::Rising.matches(Level::Low));
        assert!(Edge::Falling.matches(Level::Low));
        assert!(Edge::Both.matches(Level::High));
        assert!(Edge::Both.matches(Level::Low));
    }

    #[test]
    fn test_hal_error_display() {
        let err = HalError::ShortTransfer {
            expected: 3,
            actual: 1,
        };
        assert_eq!(err.to_string(), "Short transfer: expected 3 bytes, got 1");
    }
}
