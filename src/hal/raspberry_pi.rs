//! # Raspberry Pi Board Implementation
//!
//! `rppal`-backed implementation of the line and bus traits for Raspberry Pi
//! boards with the 40-pin header.
//!
//! ## Hardware Setup
//!
//! - SPI must be enabled (`dtparam=spi=on` in `/boot/config.txt`); the ADC and
//!   radio drivers use `/dev/spidev<bus>.<cs>`.
//! - I2C must be enabled (`dtparam=i2c_arm=on`); the EEPROM driver uses
//!   `/dev/i2c-<bus>`, normally bus 1.
//! - GPIO access goes through `/dev/gpiomem`, so no root privileges are needed
//!   when the user is in the `gpio` group.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rpi_components::hal::raspberry_pi::RaspberryPiBoard;
//! use rpi_components::hal::{Numbering, OutputLine};
//!
//! let board = RaspberryPiBoard::new(Numbering::Board)?;
//! let mut led = board.output(11)?; // header pin 11, GPIO 17
//! led.set_high()?;
//! # Ok::<(), rpi_components::hal::HalError>(())
//! ```
//!
//! Lines and buses are released when the returned handles are dropped; `rppal`
//! restores each pin to its previous mode on drop.

use super::{
    Edge, EdgeHandler, EdgeLine, HalError, I2cBus, InputLine, IoLine, IoMode, Level, Numbering,
    OutputLine, Pin, Pull, PwmLine, SpiBus, ThreadDelay,
};
use rppal::gpio::{self, Bias, Gpio, InputPin, IoPin, OutputPin, Trigger};
use rppal::i2c::I2c;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

fn gpio_err(e: rppal::gpio::Error) -> HalError {
    HalError::Gpio(e.to_string())
}

fn from_rppal_level(level: gpio::Level) -> Level {
    match level {
        gpio::Level::High => Level::High,
        gpio::Level::Low => Level::Low,
    }
}

/// Entry point for hardware lines and buses
pub struct RaspberryPiBoard {
    gpio: Gpio,
    numbering: Numbering,
}

impl RaspberryPiBoard {
    /// Open the GPIO controller; pin arguments are interpreted under `numbering`
    pub fn new(numbering: Numbering) -> Result<Self, HalError> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        log::info!("Raspberry Pi board opened with {numbering} numbering");
        Ok(Self { gpio, numbering })
    }

    pub fn numbering(&self) -> Numbering {
        self.numbering
    }

    fn resolve(&self, pin: u8) -> Result<u8, HalError> {
        Pin::new(pin, self.numbering).to_bcm()
    }

    /// Claim `pin` as an output driven low
    pub fn output(&self, pin: u8) -> Result<RpiOutput, HalError> {
        let bcm = self.resolve(pin)?;
        let line = self.gpio.get(bcm).map_err(gpio_err)?.into_output_low();
        log::debug!("GPIO {bcm} configured as output");
        Ok(RpiOutput { pin: line, bcm })
    }

    /// Claim `pin` as an input with the given bias
    pub fn input(&self, pin: u8, pull: Pull) -> Result<RpiInput, HalError> {
        let bcm = self.resolve(pin)?;
        let raw = self.gpio.get(bcm).map_err(gpio_err)?;
        let line = match pull {
            Pull::None => raw.into_input(),
            Pull::Up => raw.into_input_pullup(),
            Pull::Down => raw.into_input_pulldown(),
        };
        log::debug!("GPIO {bcm} configured as input ({pull:?})");
        Ok(RpiInput { pin: line, bcm })
    }

    /// Claim `pin` as a bidirectional line starting in `mode`
    pub fn io(&self, pin: u8, mode: IoMode) -> Result<RpiIo, HalError> {
        let bcm = self.resolve(pin)?;
        let raw = self.gpio.get(bcm).map_err(gpio_err)?;
        let mut line = RpiIo {
            pin: raw.into_io(gpio::Mode::Input),
            bcm,
            mode,
        };
        line.set_mode(mode)?;
        log::debug!("GPIO {bcm} configured as bidirectional ({mode:?})");
        Ok(line)
    }

    /// Open `/dev/spidev<bus>.<chip_select>` in SPI mode 0
    pub fn spi(&self, bus: u8, chip_select: u8, speed_hz: u32) -> Result<RpiSpi, HalError> {
        let spi_bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            _ => {
                return Err(HalError::InvalidConfig(format!(
                    "Invalid SPI bus {bus}, only 0-2 are supported"
                )))
            }
        };
        let slave_select = match chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            _ => {
                return Err(HalError::InvalidConfig(format!(
                    "Invalid chip select {chip_select}, only 0-2 are supported"
                )))
            }
        };
        let spi = Spi::new(spi_bus, slave_select, speed_hz, Mode::Mode0)
            .map_err(|e| HalError::Spi(e.to_string()))?;
        log::info!("SPI{bus}.{chip_select} opened at {speed_hz} Hz");
        Ok(RpiSpi { spi })
    }

    /// Open `/dev/i2c-<bus>`
    pub fn i2c(&self, bus: u8) -> Result<RpiI2c, HalError> {
        let i2c = I2c::with_bus(bus).map_err(|e| HalError::I2c(e.to_string()))?;
        log::info!("I2C bus {bus} opened");
        Ok(RpiI2c {
            i2c,
            selected: None,
        })
    }

    pub fn delay(&self) -> ThreadDelay {
        ThreadDelay
    }
}

/// Hardware output line
pub struct RpiOutput {
    pin: OutputPin,
    bcm: u8,
}

impl RpiOutput {
    pub fn bcm(&self) -> u8 {
        self.bcm
    }
}

impl OutputLine for RpiOutput {
    fn set_level(&mut self, level: Level) -> Result<(), HalError> {
        match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        }
        Ok(())
    }

    fn level(&self) -> Result<Level, HalError> {
        Ok(Level::from(self.pin.is_set_high()))
    }
}

impl PwmLine for RpiOutput {
    fn set_pwm(&mut self, frequency_hz: f64, duty_percent: f64) -> Result<(), HalError> {
        self.pin
            .set_pwm_frequency(frequency_hz, duty_percent / 100.0)
            .map_err(|e| HalError::Pwm(e.to_string()))
    }

    fn clear_pwm(&mut self) -> Result<(), HalError> {
        self.pin
            .clear_pwm()
            .map_err(|e| HalError::Pwm(e.to_string()))?;
        self.pin.set_low();
        Ok(())
    }
}

/// Hardware input line
pub struct RpiInput {
    pin: InputPin,
    bcm: u8,
}

impl RpiInput {
    pub fn bcm(&self) -> u8 {
        self.bcm
    }
}

impl InputLine for RpiInput {
    fn read(&mut self) -> Result<Level, HalError> {
        Ok(Level::from(self.pin.is_high()))
    }
}

impl EdgeLine for RpiInput {
    fn set_edge_handler(&mut self, edge: Edge, mut handler: EdgeHandler) -> Result<(), HalError> {
        let trigger = match edge {
            Edge::Rising => Trigger::RisingEdge,
            Edge::Falling => Trigger::FallingEdge,
            Edge::Both => Trigger::Both,
        };
        self.pin
            .set_async_interrupt(trigger, move |level: gpio::Level| {
                handler(from_rppal_level(level));
            })
            .map_err(gpio_err)?;
        log::debug!("GPIO {} edge handler installed ({edge:?})", self.bcm);
        Ok(())
    }

    fn clear_edge_handler(&mut self) -> Result<(), HalError> {
        self.pin.clear_async_interrupt().map_err(gpio_err)
    }
}

/// Hardware bidirectional line
pub struct RpiIo {
    pin: IoPin,
    bcm: u8,
    mode: IoMode,
}

impl RpiIo {
    pub fn bcm(&self) -> u8 {
        self.bcm
    }
}

impl IoLine for RpiIo {
    fn set_mode(&mut self, mode: IoMode) -> Result<(), HalError> {
        match mode {
            IoMode::Output => self.pin.set_mode(gpio::Mode::Output),
            IoMode::Input(pull) => {
                self.pin.set_mode(gpio::Mode::Input);
                self.pin.set_bias(match pull {
                    Pull::None => Bias::Off,
                    Pull::Up => Bias::PullUp,
                    Pull::Down => Bias::PullDown,
                });
            }
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
                self.bcm
            )));
        }
        match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Level, HalError> {
        Ok(Level::from(self.pin.is_high()))
    }
}

/// Hardware SPI device
pub struct RpiSpi {
    spi: Spi,
}

impl SpiBus for RpiSpi {
    fn transfer(&mut self, write: &[u8]) -> Result<Vec<u8>, HalError> {
        let mut read = vec![0u8; write.len()];
        let n = self
            .spi
            .transfer(&mut read, write)
            .map_err(|e| HalError::Spi(e.to_string()))?;
        read.truncate(n);
        Ok(read)
    }
}

/// Hardware I2C bus
pub struct RpiI2c {
    i2c: I2c,
    selected: Option<u8>,
}

impl RpiI2c {
    fn select(&mut self, address: u8) -> Result<(), HalError> {
        if self.selected != Some(address) {
            self.i2c
                .set_slave_address(u16::from(address))
                .map_err(|e| HalError::I2c(e.to_string()))?;
            self.selected = Some(address);
        }
        Ok(())
    }

    fn write_all(&mut self, address: u8, bytes: &[u8]) -> Result<(), HalError> {
        self.select(address)?;
        let n = self
            .i2c
            .write(bytes)
            .map_err(|e| HalError::I2c(e.to_string()))?;
        if n != bytes.len() {
            return Err(HalError::ShortTransfer {
                expected: bytes.len(),
                actual: n,
            });
        }
        log::trace!(
            "I2C 0x{address:02x} write [{}]",
            crate::util::hex::format_hex_compact(bytes)
        );
        Ok(())
    }
}

impl I2cBus for RpiI2c {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<(), HalError> {
        self.write_all(address, &[value])
    }

    fn write_block(&mut self, address: u8, register: u8, payload: &[u8]) -> Result<(), HalError> {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(register);
        bytes.extend_from_slice(payload);
        self.write_all(address, &bytes)
    }

    fn read_byte(&mut self, address: u8) -> Result<u8, HalError> {
        self.select(address)?;
        let mut buf = [0u8; 1];
        let n = self
            .i2c
            .read(&mut buf)
            .map_err(|e| HalError::I2c(e.to_string()))?;
        if n != 1 {
            return Err(HalError::ShortTransfer {
                expected: 1,
                actual: n,
            });
        }
        log::trace!("I2C 0x{address:02x} read {:02x}", buf[0]);
        Ok(buf[0])
    }
}
