//! # Basic Logic Wrappers
//!
//! Thin wrappers that give single GPIO lines a component-style API. Device
//! drivers compose these rather than talking to lines directly.
//!
//! - [`ToggleOutput`] - drive a line high or low
//! - [`ToggleInput`] - sample a line
//! - [`BidirectionalToggle`] - one line switched between driving and sampling
//! - [`SoftPwm`] - PWM channel whose frequency and duty cycle stay in step with
//!   the hardware
//! - [`EdgeInput`] - debounced edge callback
//!
//! ```rust
//! use rpi_components::hal::mock::MockBoard;
//! use rpi_components::hal::Level;
//! use rpi_components::logic::ToggleOutput;
//!
//! let board = MockBoard::new();
//! let mut out = ToggleOutput::new(board.output(17).unwrap());
//! out.hi().unwrap();
//! assert_eq!(out.value().unwrap(), Level::High);
//! ```

use crate::error::{ComponentError, Result};
use crate::hal::{Edge, EdgeLine, InputLine, IoLine, IoMode, Level, OutputLine, PwmLine, Pull};
use std::time::{Duration, Instant};

/// Something that can be switched on and off
pub trait Switchable {
    fn turn_on(&mut self) -> Result<()>;
    fn turn_off(&mut self) -> Result<()>;
    fn is_on(&self) -> Result<bool>;
}

/// A GPIO output that is either high or low
pub struct ToggleOutput<O: OutputLine> {
    line: O,
}

impl<O: OutputLine> ToggleOutput<O> {
    pub fn new(line: O) -> Self {
        Self { line }
    }

    pub fn high(&mut self) -> Result<()> {
        Ok(self.line.set_high()?)
    }

    pub fn low(&mut self) -> Result<()> {
        Ok(self.line.set_low()?)
    }

    /// Alias of [`high`](Self::high)
    pub fn hi(&mut self) -> Result<()> {
        self.high()
    }

    /// Alias of [`low`](Self::low)
    pub fn lo(&mut self) -> Result<()> {
        self.low()
    }

    /// Drive the line to `level`
    pub fn set(&mut self, level: Level) -> Result<()> {
        Ok(self.line.set_level(level)?)
    }

    /// Invert the driven level and return the new one
    pub fn toggle(&mut self) -> Result<Level> {
        let next = !self.line.level()?;
        self.line.set_level(next)?;
        Ok(next)
    }

    /// Level currently driven on the line
    pub fn value(&self) -> Result<Level> {
        Ok(self.line.level()?)
    }

    pub fn into_inner(self) -> O {
        self.line
    }
}

impl<O: OutputLine> Switchable for ToggleOutput<O> {
    fn turn_on(&mut self) -> Result<()> {
        self.high()
    }

    fn turn_off(&mut self) -> Result<()> {
        self.low()
    }

    fn is_on(&self) -> Result<bool> {
        Ok(self.value()?.is_high())
    }
}

/// A GPIO input sampled on demand
pub struct ToggleInput<I: InputLine> {
    line: I,
}

impl<I: InputLine> ToggleInput<I> {
    pub fn new(line: I) -> Self {
        Self { line }
    }

    pub fn sample(&mut self) -> Result<Level> {
        Ok(self.line.read()?)
    }

    pub fn into_inner(self) -> I {
        self.line
    }
}

/// A GPIO line that is driven in output mode and sampled in input mode
pub struct BidirectionalToggle<L: IoLine> {
    line: L,
}

impl<L: IoLine> BidirectionalToggle<L> {
    pub fn new(line: L) -> Self {
        Self { line }
    }

    pub fn set_output(&mut self) -> Result<()> {
        Ok(self.line.set_mode(IoMode::Output)?)
    }

    pub fn set_input(&mut self, pull: Pull) -> Result<()> {
        Ok(self.line.set_mode(IoMode::Input(pull))?)
    }

    pub fn is_output(&self) -> bool {
        self.line.mode() == IoMode::Output
    }

    /// Drive the line to `level`; the line must be in output mode
    pub fn set(&mut self, level: Level) -> Result<()> {
        if !self.is_output() {
            return Err(ComponentError::invalid(
                "cannot drive a bidirectional line while it is an input",
            ));
        }
        Ok(self.line.write(level)?)
    }

    pub fn high(&mut self) -> Result<()> {
        self.set(Level::High)
    }

    pub fn low(&mut self) -> Result<()> {
        self.set(Level::Low)
    }

    /// Sample the line in either mode
    pub fn sample(&mut self) -> Result<Level> {
        Ok(self.line.read()?)
    }

    pub fn into_inner(self) -> L {
        self.line
    }
}

fn check_duty(duty_cycle: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&duty_cycle) {
        return Err(ComponentError::invalid(format!(
            "duty cycle {duty_cycle} outside [0, 100]"
        )));
    }
    Ok(())
}

fn check_frequency(frequency_hz: f64) -> Result<()> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(ComponentError::invalid(format!(
            "PWM frequency {frequency_hz} must be a positive number of Hz"
        )));
    }
    Ok(())
}

/// Software PWM channel.
///
/// Frequency and duty cycle are only recorded after the line accepted them, so
/// the getters always describe what the hardware is doing. Changes made while
/// stopped are remembered and applied by [`start`](Self::start).
pub struct SoftPwm<P: PwmLine> {
    line: P,
    frequency_hz: f64,
    duty_cycle: f64,
    running: bool,
}

impl<P: PwmLine> SoftPwm<P> {
    pub const DEFAULT_FREQUENCY_HZ: f64 = 100.0;

    /// Prepare a stopped channel at the default frequency
    pub fn new(line: P, duty_cycle: f64) -> Result<Self> {
        Self::with_frequency(line, duty_cycle, Self::DEFAULT_FREQUENCY_HZ)
    }

    pub fn with_frequency(line: P, duty_cycle: f64, frequency_hz: f64) -> Result<Self> {
        check_duty(duty_cycle)?;
        check_frequency(frequency_hz)?;
        Ok(Self {
            line,
            frequency_hz,
            duty_cycle,
            running: false,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.line.set_pwm(self.frequency_hz, self.duty_cycle)?;
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.line.clear_pwm()?;
        self.running = false;
        Ok(())
    }

    pub fn set_duty_cycle(&mut self, duty_cycle: f64) -> Result<()> {
        check_duty(duty_cycle)?;
        if self.running {
            self.line.set_pwm(self.frequency_hz, duty_cycle)?;
        }
        self.duty_cycle = duty_cycle;
        Ok(())
    }

    pub fn set_frequency(&mut self, frequency_hz: f64) -> Result<()> {
        check_frequency(frequency_hz)?;
        if self.running {
            self.line.set_pwm(frequency_hz, self.duty_cycle)?;
        }
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    pub fn frequency(&self) -> f64 {
        self.frequency_hz
    }

    pub fn duty_cycle(&self) -> f64 {
        self.duty_cycle
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Input that invokes a callback on debounced edges.
///
/// An edge is honoured only if at least `debounce` has passed since the last
/// honoured edge. The callback runs on the platform's interrupt thread and is
/// removed when this value is dropped.
pub struct EdgeInput<I: EdgeLine> {
    line: I,
    edge: Edge,
    debounce: Duration,
}

impl<I: EdgeLine> EdgeInput<I> {
    pub fn new<F>(mut line: I, edge: Edge, debounce: Duration, mut callback: F) -> Result<Self>
    where
        F: FnMut(Level) + Send + 'static,
    {
        let mut last_honoured: Option<Instant> = None;
        line.set_edge_handler(
            edge,
            Box::new(move |level| {
                let now = Instant::now();
                if let Some(last) = last_honoured {
                    if now.duration_since(last) < debounce {
                        log::trace!("edge to {level} ignored during debounce");
                        return;
                    }
                }
                last_honoured = Some(now);
                callback(level);
            }),
        )?;
        Ok(Self {
            line,
            edge,
            debounce,
        })
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Sample the line directly
    pub fn sample(&mut self) -> Result<Level> {
        Ok(self.line.read()?)
    }
}

impl<I: EdgeLine> Drop for EdgeInput<I> {
    fn drop(&mut self) {
        if let Err(e) = self.line.clear_edge_handler() {
            log::warn!("Failed to remove edge handler: {e}");
        }
    }
}
