//! L293D H-bridge motor drivers.

use super::Direction;
use crate::error::{ComponentError, Result};
use crate::hal::{OutputLine, PwmLine};
use crate::logging::log_warn;
use crate::logic::{SoftPwm, ToggleOutput};

fn warn_if_disabled<O: OutputLine>(enable: &ToggleOutput<O>, action: &str) -> Result<()> {
    if !enable.value()?.is_high() {
        log_warn(&format!("Motor is not enabled, {action} applied anyway"));
    }
    Ok(())
}

fn check_speed(speed: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&speed) {
        return Err(ComponentError::invalid(format!(
            "speed {speed} outside [0, 100]"
        )));
    }
    Ok(())
}

/// On/off motor on one L293D channel pair
pub struct BasicMotor<O: OutputLine> {
    enable: ToggleOutput<O>,
    forward: ToggleOutput<O>,
    reverse: ToggleOutput<O>,
    direction: Direction,
}

impl<O: OutputLine> BasicMotor<O> {
    pub fn new(enable: O, forward: O, reverse: O) -> Self {
        Self {
            enable: ToggleOutput::new(enable),
            forward: ToggleOutput::new(forward),
            reverse: ToggleOutput::new(reverse),
            direction: Direction::Stopped,
        }
    }

    pub fn enable(&mut self) -> Result<()> {
        self.enable.high()
    }

    pub fn disable(&mut self) -> Result<()> {
        self.enable.low()
    }

    /// Reads the enable line back
    pub fn is_enabled(&self) -> Result<bool> {
        Ok(self.enable.value()?.is_high())
    }

    pub fn forward(&mut self) -> Result<()> {
        warn_if_disabled(&self.enable, "forward")?;
        self.reverse.low()?;
        self.forward.high()?;
        self.direction = Direction::Forward;
        Ok(())
    }

    pub fn reverse(&mut self) -> Result<()> {
        warn_if_disabled(&self.enable, "reverse")?;
        self.forward.low()?;
        self.reverse.high()?;
        self.direction = Direction::Reverse;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        warn_if_disabled(&self.enable, "stop")?;
        self.forward.low()?;
        self.reverse.low()?;
        self.direction = Direction::Stopped;
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// PWM speed-controlled motor on one L293D channel pair.
///
/// Both polarity lines run PWM at 100 Hz from construction, starting at 0%.
/// The active direction's line carries the speed, the other stays at 0%.
pub struct VariableSpeedMotor<O: OutputLine, P: PwmLine> {
    enable: ToggleOutput<O>,
    forward: SoftPwm<P>,
    reverse: SoftPwm<P>,
    speed: f64,
    direction: Direction,
}

impl<O: OutputLine, P: PwmLine> VariableSpeedMotor<O, P> {
    pub fn new(enable: O, forward: P, reverse: P) -> Result<Self> {
        let mut forward = SoftPwm::new(forward, 0.0)?;
        let mut reverse = SoftPwm::new(reverse, 0.0)?;
        forward.start()?;
        reverse.start()?;
        Ok(Self {
            enable: ToggleOutput::new(enable),
            forward,
            reverse,
            speed: 0.0,
            direction: Direction::Stopped,
        })
    }

    pub fn enable(&mut self) -> Result<()> {
        self.enable.high()
    }

    pub fn disable(&mut self) -> Result<()> {
        self.enable.low()
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(self.enable.value()?.is_high())
    }

    fn apply(&mut self, direction: Direction, speed: f64) -> Result<()> {
        match direction {
            Direction::Forward => {
                self.forward.set_duty_cycle(speed)?;
                self.reverse.set_duty_cycle(0.0)?;
            }
            Direction::Reverse => {
                self.reverse.set_duty_cycle(speed)?;
                self.forward.set_duty_cycle(0.0)?;
            }
            Direction::Stopped => {
                self.forward.set_duty_cycle(0.0)?;
                self.reverse.set_duty_cycle(0.0)?;
            }
        }
        Ok(())
    }

    /// Set speed in percent of maximum; re-applied immediately when running
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        check_speed(speed)?;
        if self.direction != Direction::Stopped {
            self.apply(self.direction, speed)?;
        }
        self.speed = speed;
        Ok(())
    }

    /// Run forward, optionally changing speed in the same step
    pub fn forward(&mut self, speed: Option<f64>) -> Result<()> {
        self.run(Direction::Forward, speed)
    }

    /// Run in reverse, optionally changing speed in the same step
    pub fn reverse(&mut self, speed: Option<f64>) -> Result<()> {
        self.run(Direction::Reverse, speed)
    }

    fn run(&mut self, direction: Direction, speed: Option<f64>) -> Result<()> {
        let speed = speed.unwrap_or(self.speed);
        check_speed(speed)?;
        warn_if_disabled(&self.enable, &direction.to_string().to_lowercase())?;
        self.apply(direction, speed)?;
        self.speed = speed;
        self.direction = direction;
        Ok(())
    }

    /// Zero both channels; the configured speed is kept for the next run
    pub fn stop(&mut self) -> Result<()> {
        warn_if_disabled(&self.enable, "stop")?;
        self.apply(Direction::Stopped, 0.0)?;
        self.direction = Direction::Stopped;
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Duty cycles currently applied as `(forward, reverse)`
    pub fn duty_cycles(&self) -> (f64, f64) {
        (self.forward.duty_cycle(), self.reverse.duty_cycle())
    }
}
