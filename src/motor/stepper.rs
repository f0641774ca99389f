//! Bipolar stepper motor on two H-bridges.

use super::Direction;
use crate::error::Result;
use crate::hal::{Delay, Level, OutputLine};
use crate::logic::ToggleOutput;
use std::time::Duration;

/// Full-step commutation table, coil order `[A1, A2, B1, B2]`
pub const FULL_STEP_SEQUENCE: [[bool; 4]; 4] = [
    [true, false, true, false],
    [false, true, true, false],
    [false, true, false, true],
    [true, false, false, true],
];

pub const DEFAULT_PHASE_DELAY: Duration = Duration::from_micros(500);

pub struct BipolarStepper<O: OutputLine, D: Delay> {
    coils: [ToggleOutput<O>; 4],
    delay: D,
    phase_delay: Duration,
}

impl<O: OutputLine, D: Delay> BipolarStepper<O, D> {
    /// `coils` are wired as `[A1, A2, B1, B2]`
    pub fn new(coils: [O; 4], delay: D) -> Self {
        Self {
            coils: coils.map(ToggleOutput::new),
            delay,
            phase_delay: DEFAULT_PHASE_DELAY,
        }
    }

    pub fn set_phase_delay(&mut self, phase_delay: Duration) {
        self.phase_delay = phase_delay;
    }

    pub fn phase_delay(&self) -> Duration {
        self.phase_delay
    }

    fn apply_phase(&mut self, phase: &[bool; 4]) -> Result<()> {
        for (coil, &on) in self.coils.iter_mut().zip(phase.iter()) {
            coil.set(Level::from(on))?;
        }
        self.delay.delay(self.phase_delay);
        Ok(())
    }

    /// Advance `steps` full sequences in `direction`.
    ///
    /// Each step walks all four phases, in table order for forward and in
    /// reverse order for reverse. `Stopped` does nothing.
    pub fn step(&mut self, direction: Direction, steps: u32) -> Result<()> {
        for _ in 0..steps {
            match direction {
                Direction::Forward => {
                    for phase in FULL_STEP_SEQUENCE.iter() {
                        self.apply_phase(phase)?;
                    }
                }
                Direction::Reverse => {
                    for phase in FULL_STEP_SEQUENCE.iter().rev() {
                        self.apply_phase(phase)?;
                    }
                }
                Direction::Stopped => return Ok(()),
            }
        }
        Ok(())
    }

    /// De-energise every coil
    pub fn release(&mut self) -> Result<()> {
        for coil in self.coils.iter_mut() {
            coil.low()?;
        }
        Ok(())
    }
}
