//! LED drivers: plain on/off and PWM-faded.

use crate::error::{ComponentError, Result};
use crate::hal::{OutputLine, PwmLine};
use crate::logic::{SoftPwm, Switchable, ToggleOutput};

/// LED on a plain output line
pub struct Led<O: OutputLine> {
    output: ToggleOutput<O>,
}

impl<O: OutputLine> Led<O> {
    pub fn new(line: O) -> Self {
        Self {
            output: ToggleOutput::new(line),
        }
    }

    pub fn on(&mut self) -> Result<()> {
        self.output.high()
    }

    pub fn off(&mut self) -> Result<()> {
        self.output.low()
    }

    pub fn is_on(&self) -> Result<bool> {
        self.output.is_on()
    }
}

impl<O: OutputLine> Switchable for Led<O> {
    fn turn_on(&mut self) -> Result<()> {
        self.on()
    }

    fn turn_off(&mut self) -> Result<()> {
        self.off()
    }

    fn is_on(&self) -> Result<bool> {
        Led::is_on(self)
    }
}

/// LED whose brightness is set through PWM duty cycle.
///
/// PWM starts at construction with the initial brightness.
pub struct FadableLed<P: PwmLine> {
    pwm: SoftPwm<P>,
}

impl<P: PwmLine> FadableLed<P> {
    pub fn new(line: P, initial_brightness: f64) -> Result<Self> {
        let mut pwm = SoftPwm::new(line, initial_brightness)?;
        pwm.start()?;
        Ok(Self { pwm })
    }

    /// Set brightness in percent, [0, 100]
    pub fn set_brightness(&mut self, brightness: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&brightness) {
            return Err(ComponentError::invalid(format!(
                "brightness {brightness} outside [0, 100]"
            )));
        }
        self.pwm.set_duty_cycle(brightness)
    }

    pub fn brightness(&self) -> f64 {
        self.pwm.duty_cycle()
    }

    /// Full brightness
    pub fn on(&mut self) -> Result<()> {
        self.set_brightness(100.0)
    }

    pub fn off(&mut self) -> Result<()> {
        self.set_brightness(0.0)
    }
}

impl<P: PwmLine> Switchable for FadableLed<P> {
    fn turn_on(&mut self) -> Result<()> {
        self.on()
    }

    fn turn_off(&mut self) -> Result<()> {
        self.off()
    }

    fn is_on(&self) -> Result<bool> {
        Ok(self.brightness() > 0.0)
    }
}
