//! # HC-SR04 Ultrasonic Rangefinder
//!
//! A measurement is a 10 µs trigger pulse followed by timing the echo line's
//! high pulse with busy polling. The pulse width is turned into a distance by
//! a pluggable conversion function.
//!
//! The sensor holds echo high for about 38 ms when nothing reflects, so the
//! default echo timeout is 38 ms and is reported as
//! [`ComponentError::Timeout`].

use crate::cancel::CancelToken;
use crate::error::{ComponentError, Result};
use crate::hal::{Delay, InputLine, Level, OutputLine};
use crate::logic::{ToggleInput, ToggleOutput};
use crate::util::tolerance::consensus_average;
use std::time::{Duration, Instant};

/// Echo pulse width to distance
pub type Conversion = Box<dyn Fn(Duration) -> f64 + Send>;

pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_millis(38);
pub const DEFAULT_SAMPLES: usize = 10;
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 5.0;
/// Gap between samples, long enough for the previous echo to die out
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(60);

const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Round-trip echo time to inches
pub fn inches(echo: Duration) -> f64 {
    echo.as_secs_f64() * 6751.968
}

/// Round-trip echo time to centimetres
pub fn centimeters(echo: Duration) -> f64 {
    echo.as_secs_f64() * 17150.0
}

pub struct HcSr04<O: OutputLine, I: InputLine, D: Delay> {
    trigger: ToggleOutput<O>,
    echo: ToggleInput<I>,
    delay: D,
    convert: Conversion,
    echo_timeout: Duration,
}

impl<O: OutputLine, I: InputLine, D: Delay> HcSr04<O, I, D> {
    /// Converts to inches until [`with_conversion`](Self::with_conversion) says otherwise
    pub fn new(trigger: O, echo: I, delay: D) -> Result<Self> {
        let mut trigger = ToggleOutput::new(trigger);
        trigger.lo()?;
        Ok(Self {
            trigger,
            echo: ToggleInput::new(echo),
            delay,
            convert: Box::new(inches),
            echo_timeout: DEFAULT_ECHO_TIMEOUT,
        })
    }

    pub fn with_conversion<F>(mut self, convert: F) -> Self
    where
        F: Fn(Duration) -> f64 + Send + 'static,
    {
        self.convert = Box::new(convert);
        self
    }

    pub fn with_echo_timeout(mut self, timeout: Duration) -> Self {
        self.echo_timeout = timeout;
        self
    }

    fn wait_for(&mut self, level: Level, since: Instant) -> Result<Instant> {
        loop {
            if self.echo.sample()? == level {
                return Ok(Instant::now());
            }
            if since.elapsed() > self.echo_timeout {
                return Err(ComponentError::Timeout(format!(
                    "echo did not go {level} within {:?}",
                    self.echo_timeout
                )));
            }
        }
    }

    /// Fire one ping and return the echo pulse width
    pub fn measure_echo(&mut self) -> Result<Duration> {
        self.trigger.lo()?;
        self.trigger.hi()?;
        self.delay.delay(TRIGGER_PULSE);
        self.trigger.lo()?;

        let triggered = Instant::now();
        let start = self.wait_for(Level::High, triggered)?;
        let end = self.wait_for(Level::Low, start)?;
        Ok(end.duration_since(start))
    }

    /// One converted distance reading
    pub fn sample(&mut self) -> Result<f64> {
        let echo = self.measure_echo()?;
        let distance = (self.convert)(echo);
        log::trace!("HC-SR04 echo {echo:?} -> {distance:.2}");
        Ok(distance)
    }

    /// Average of `samples` readings taken 60 ms apart, with outliers removed.
    ///
    /// A reading is kept when the next one lies within `tolerance_percent`
    /// of it. Fails with [`ComponentError::EmptyResult`] when no reading
    /// survives and with [`ComponentError::Cancelled`] if `cancel` fires
    /// between samples.
    pub fn approximate_distance(
        &mut self,
        samples: usize,
        tolerance_percent: f64,
        cancel: &CancelToken,
    ) -> Result<f64> {
        if !tolerance_percent.is_finite() || tolerance_percent < 0.0 {
            return Err(ComponentError::invalid(format!(
                "tolerance {tolerance_percent}% must be a non-negative number"
            )));
        }

        let mut points = Vec::with_capacity(samples);
        for _ in 0..samples {
            if cancel.is_cancelled() {
                return Err(ComponentError::Cancelled);
            }
            points.push(self.sample()?);
            self.delay.delay(SAMPLE_INTERVAL);
        }

        consensus_average(&points, tolerance_percent).ok_or_else(|| {
            ComponentError::EmptyResult(format!(
                "no consecutive readings agreed within {tolerance_percent}% across {} samples",
                points.len()
            ))
        })
    }
}
