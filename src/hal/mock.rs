//! In-memory board implementation for testing
//!
//! [`MockBoard`] hands out lines and buses that operate on shared, inspectable
//! state instead of hardware. Every side effect is appended to an ordered event
//! log so tests can assert on exact pin and bus sequences, and inputs can be
//! driven or scripted from the test body.
//!
//! Lines claim their pin while alive and release it on drop, mirroring the way
//! the hardware implementation holds pins for the lifetime of a driver.

use super::{
    Delay, Edge, EdgeHandler, EdgeLine, HalError, I2cBus, InputLine, IoLine, IoMode, Level,
    Numbering, OutputLine, Pin, Pull, PwmLine, SpiBus,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One recorded side effect on the mock board
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    /// An output line was driven (BCM pin number)
    Level { pin: u8, level: Level },
    /// PWM started or changed on a line
    Pwm {
        pin: u8,
        frequency_hz: f64,
        duty_percent: f64,
    },
    /// PWM stopped on a line
    PwmCleared { pin: u8 },
    /// One SPI transfer with the bytes sent and received
    SpiTransfer { write: Vec<u8>, read: Vec<u8> },
    /// One I2C write transaction
    I2cWrite { address: u8, bytes: Vec<u8> },
    /// One I2C single-byte read
    I2cRead { address: u8, value: u8 },
    /// A blocking delay requested through [`MockDelay`]
    Delay(Duration),
}

/// Simulated I2C target device
pub trait I2cTarget: Send {
    /// Handle a write transaction addressed to `address`
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), HalError>;

    /// Handle a single-byte read addressed to `address`
    fn read(&mut self, address: u8) -> Result<u8, HalError>;
}

/// SPI responder: receives the bytes sent, returns the bytes clocked back
pub type SpiResponder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

struct BoardState {
    numbering: Numbering,
    levels: HashMap<u8, Level>,
    pwm: HashMap<u8, (f64, f64)>,
    scripts: HashMap<u8, VecDeque<Level>>,
    handlers: HashMap<u8, (Edge, EdgeHandler)>,
    claimed: HashSet<u8>,
    events: Vec<MockEvent>,
    fail_next: Option<HalError>,
    total_delay: Duration,
}

/// Shared in-memory board
#[derive(Clone)]
pub struct MockBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBoard {
    /// Create a board addressed with BCM numbering
    pub fn new() -> Self {
        Self::with_numbering(Numbering::Bcm)
    }

    /// Create a board whose pin arguments use `numbering`
    pub fn with_numbering(numbering: Numbering) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BoardState {
                numbering,
                levels: HashMap::new(),
                pwm: HashMap::new(),
                scripts: HashMap::new(),
                handlers: HashMap::new(),
                claimed: HashSet::new(),
                events: Vec::new(),
                fail_next: None,
                total_delay: Duration::ZERO,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn numbering(&self) -> Numbering {
        self.state().numbering
    }

    fn resolve(&self, pin: u8) -> Result<u8, HalError> {
        Pin::new(pin, self.numbering()).to_bcm()
    }

    fn claim(&self, pin: u8) -> Result<u8, HalError> {
        let bcm = self.resolve(pin)?;
        let mut state = self.state();
        if !state.claimed.insert(bcm) {
            return Err(HalError::Gpio(format!("GPIO {bcm} already in use")));
        }
        Ok(bcm)
    }

    /// Claim `pin` as an output, initially low
    pub fn output(&self, pin: u8) -> Result<MockOutput, HalError> {
        let bcm = self.claim(pin)?;
        self.state().levels.insert(bcm, Level::Low);
        Ok(MockOutput {
            board: self.clone(),
            pin: bcm,
        })
    }

    /// Claim `pin` as an input; a pull resistor sets the idle level
    pub fn input(&self, pin: u8, pull: Pull) -> Result<MockInput, HalError> {
        let bcm = self.claim(pin)?;
        Self::apply_pull(&mut self.state(), bcm, pull);
        Ok(MockInput {
            board: self.clone(),
            pin: bcm,
        })
    }

    /// Claim `pin` as a bidirectional line starting in `mode`
    pub fn io(&self, pin: u8, mode: IoMode) -> Result<MockIo, HalError> {
        let bcm = self.claim(pin)?;
        let mut state = self.state();
        match mode {
            IoMode::Output => {
                state.levels.insert(bcm, Level::Low);
            }
            IoMode::Input(pull) => Self::apply_pull(&mut state, bcm, pull),
        }
        Ok(MockIo {
            board: self.clone(),
            pin: bcm,
            mode,
        })
    }

    fn apply_pull(state: &mut BoardState, bcm: u8, pull: Pull) {
        match pull {
            Pull::Up => {
                state.levels.insert(bcm, Level::High);
            }
            Pull::Down => {
                state.levels.insert(bcm, Level::Low);
            }
            Pull::None => {
                state.levels.entry(bcm).or_insert(Level::Low);
            }
        }
    }

    /// SPI bus whose replies are produced by `responder`
    pub fn spi(&self, responder: SpiResponder) -> MockSpi {
        MockSpi {
            board: self.clone(),
            responder,
        }
    }

    /// SPI bus that answers every transfer with zero bytes
    pub fn spi_zeros(&self) -> MockSpi {
        self.spi(Box::new(|write: &[u8]| vec![0u8; write.len()]))
    }

    /// I2C bus with `target` attached
    pub fn i2c(&self, target: Box<dyn I2cTarget>) -> MockI2c {
        MockI2c {
            board: self.clone(),
            target,
        }
    }

    /// Delay that records instead of sleeping
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            board: self.clone(),
        }
    }

    /// Drive an input pin to `level` without firing edge handlers
    pub fn set_input(&self, pin: u8, level: Level) {
        if let Ok(bcm) = self.resolve(pin) {
            self.state().levels.insert(bcm, level);
        }
    }

    /// Queue levels returned by successive reads of `pin`
    pub fn script_input(&self, pin: u8, levels: &[Level]) {
        if let Ok(bcm) = self.resolve(pin) {
            self.state()
                .scripts
                .entry(bcm)
                .or_default()
                .extend(levels.iter().copied());
        }
    }

    /// Drive `pin` to `level` and deliver the edge to a registered handler.
    ///
    /// Returns whether a handler was invoked.
    pub fn fire_edge(&self, pin: u8, level: Level) -> bool {
        let Ok(bcm) = self.resolve(pin) else {
            return false;
        };
        let taken = {
            let mut state = self.state();
            let previous = state.levels.insert(bcm, level).unwrap_or_default();
            if previous == level {
                None
            } else {
                state.handlers.remove(&bcm)
            }
        };
        match taken {
            Some((edge, mut handler)) => {
                let fired = edge.matches(level);
                if fired {
                    handler(level);
                }
                self.state().handlers.entry(bcm).or_insert((edge, handler));
                fired
            }
            None => false,
        }
    }

    /// Current level of `pin` (driven or simulated)
    pub fn level(&self, pin: u8) -> Level {
        self.resolve(pin)
            .ok()
            .and_then(|bcm| self.state().levels.get(&bcm).copied())
            .unwrap_or_default()
    }

    /// Active PWM `(frequency_hz, duty_percent)` on `pin`
    pub fn pwm(&self, pin: u8) -> Option<(f64, f64)> {
        let bcm = self.resolve(pin).ok()?;
        self.state().pwm.get(&bcm).copied()
    }

    /// Whether an edge handler is registered on `pin`
    pub fn has_edge_handler(&self, pin: u8) -> bool {
        self.resolve(pin)
            .map(|bcm| self.state().handlers.contains_key(&bcm))
            .unwrap_or(false)
    }

    /// Whether `pin` is currently claimed by a live line
    pub fn is_claimed(&self, pin: u8) -> bool {
        self.resolve(pin)
            .map(|bcm| self.state().claimed.contains(&bcm))
            .unwrap_or(false)
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    /// Drain the event log
    pub fn take_events(&self) -> Vec<MockEvent> {
        std::mem::take(&mut self.state().events)
    }

    /// SPI transfers recorded so far, as `(write, read)` pairs
    pub fn spi_transfers(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::SpiTransfer { write, read } => Some((write.clone(), read.clone())),
                _ => None,
            })
            .collect()
    }

    /// Sum of all recorded delays
    pub fn total_delay(&self) -> Duration {
        self.state().total_delay
    }

    /// Make the next line or bus operation fail with `error`
    pub fn fail_next(&self, error: HalError) {
        self.state().fail_next = Some(error);
    }

    fn check_failure(state: &mut BoardState) -> Result<(), HalError> {
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Output line on a [`MockBoard`]
pub struct MockOutput {
    board: MockBoard,
    pin: u8,
}

impl MockOutput {
    /// BCM number of the claimed pin
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl OutputLine for MockOutput {
    fn set_level(&mut self, level: Level) -> Result<(), HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        state.levels.insert(self.pin, level);
        state.events.push(MockEvent::Level {
            pin: self.pin,
            level,
        });
        Ok(())
    }

    fn level(&self) -> Result<Level, HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        Ok(state.levels.get(&self.pin).copied().unwrap_or_default())
    }
}

impl PwmLine for MockOutput {
    fn set_pwm(&mut self, frequency_hz: f64, duty_percent: f64) -> Result<(), HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        state.pwm.insert(self.pin, (frequency_hz, duty_percent));
        state.events.push(MockEvent::Pwm {
            pin: self.pin,
            frequency_hz,
            duty_percent,
        });
        Ok(())
    }

    fn clear_pwm(&mut self) -> Result<(), HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        state.pwm.remove(&self.pin);
        state.levels.insert(self.pin, Level::Low);
        state.events.push(MockEvent::PwmCleared { pin: self.pin });
        Ok(())
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        let mut state = self.board.state();
        state.claimed.remove(&self.pin);
        state.pwm.remove(&self.pin);
    }
}

/// Input line on a [`MockBoard`]
pub struct MockInput {
    board: MockBoard,
    pin: u8,
}

impl MockInput {
    /// BCM number of the claimed pin
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl InputLine for MockInput {
    fn read(&mut self) -> Result<Level, HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        let scripted = state.scripts.get_mut(&self.pin).and_then(VecDeque::pop_front);
        if let Some(level) = scripted {
            state.levels.insert(self.pin, level);
            return Ok(level);
        }
        Ok(state.levels.get(&self.pin).copied().unwrap_or_default())
    }
}

impl EdgeLine for MockInput {
    fn set_edge_handler(&mut self, edge: Edge, handler: EdgeHandler) -> Result<(), HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        state.handlers.insert(self.pin, (edge, handler));
        Ok(())
    }

    fn clear_edge_handler(&mut self) -> Result<(), HalError> {
        self.board.state().handlers.remove(&self.pin);
        Ok(())
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        let mut state = self.board.state();
        state.claimed.remove(&self.pin);
        state.handlers.remove(&self.pin);
    }
}

/// Bidirectional line on a [`MockBoard`]
pub struct MockIo {
    board: MockBoard,
    pin: u8,
    mode: IoMode,
}

impl MockIo {
    /// BCM number of the claimed pin
    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl IoLine for MockIo {
    fn set_mode(&mut self, mode: IoMode) -> Result<(), HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        if let IoMode::Input(pull) = mode {
            MockBoard::apply_pull(&mut state, self.pin, pull);
        }
        self.mode = mode;
        Ok(())
    }

    fn mode(&self) -> IoMode {
        self.mode
    }

    fn write(&mut self, level: Level) -> Result<(), HalError> {
        if self.mode != IoMode::Output {
            return Err(HalError::Gpio(format!(
                "GPIO {} is configured as an input",
                self.pin
            )));
        }
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        state.levels.insert(self.pin, level);
        state.events.push(MockEvent::Level {
            pin: self.pin,
            level,
        });
        Ok(())
    }

    fn read(&mut self) -> Result<Level, HalError> {
        let mut state = self.board.state();
        MockBoard::check_failure(&mut state)?;
        let scripted = match self.mode {
            IoMode::Input(_) => state.scripts.get_mut(&self.pin).and_then(VecDeque::pop_front),
            IoMode::Output => None,
        };
        if let Some(level) = scripted {
            state.levels.insert(self.pin, level);
            return Ok(level);
        }
        Ok(state.levels.get(&self.pin).copied().unwrap_or_default())
    }
}

impl Drop for MockIo {
    fn drop(&mut self) {
        self.board.state().claimed.remove(&self.pin);
    }
}

/// SPI bus on a [`MockBoard`]
pub struct MockSpi {
    board: MockBoard,
    responder: SpiResponder,
}

impl SpiBus for MockSpi {
    fn transfer(&mut self, write: &[u8]) -> Result<Vec<u8>, HalError> {
        MockBoard::check_failure(&mut self.board.state())?;
        let read = (self.responder)(write);
        self.board.state().events.push(MockEvent::SpiTransfer {
            write: write.to_vec(),
            read: read.clone(),
        });
        Ok(read)
    }
}

/// I2C bus on a [`MockBoard`]
pub struct MockI2c {
    board: MockBoard,
    target: Box<dyn I2cTarget>,
}

impl MockI2c {
    fn record_write(&mut self, address: u8, bytes: Vec<u8>) -> Result<(), HalError> {
        MockBoard::check_failure(&mut self.board.state())?;
        self.target.write(address, &bytes)?;
        self.board
            .state()
            .events
            .push(MockEvent::I2cWrite { address, bytes });
        Ok(())
    }
}

impl I2cBus for MockI2c {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), HalError> {
        self.record_write(address, vec![value])
    }

    fn write_block(&mut self, address: u8, register: u8, payload: &[u8]) -> Result<(), HalError> {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(register);
        bytes.extend_from_slice(payload);
        self.record_write(address, bytes)
    }

    fn read_byte(&mut self, address: u8) -> Result<u8, HalError> {
        MockBoard::check_failure(&mut self.board.state())?;
        let value = self.target.read(address)?;
        self.board
            .state()
            .events
            .push(MockEvent::I2cRead { address, value });
        Ok(value)
    }
}

/// Delay on a [`MockBoard`] that records the requested duration
#[derive(Clone)]
pub struct MockDelay {
    board: MockBoard,
}

impl Delay for MockDelay {
    fn delay(&mut self, duration: Duration) {
        let mut state = self.board.state();
        state.total_delay += duration;
        state.events.push(MockEvent::Delay(duration));
    }
}
