//! # rpi-components - Drivers for Common Raspberry Pi Peripherals
//!
//! The rpi-components crate wraps the GPIO, PWM, SPI and I2C primitives of a
//! Raspberry Pi into device-level drivers for parts commonly found in hobby
//! kits and small automation projects.
//!
//! ## Features
//!
//! - Digital output toggles, sampled and bidirectional lines, software PWM and
//!   edge callbacks
//! - LEDs (on/off and PWM-dimmed)
//! - L293D DC motor bridges (basic and variable speed) and bipolar steppers
//! - MCP3008 10-bit ADC over SPI
//! - 24Cxx EEPROMs over I2C, in 8-bit and 16-bit address modes
//! - HD44780 1602 character LCDs on a 4-bit bus, with a cancellable marquee
//! - HC-SR04 ultrasonic rangefinders with outlier rejection
//! - Polling switch readers running on a background task
//! - nRF24L01+ 2.4 GHz transceivers
//! - BCM or physical-header (BOARD) pin numbering, chosen per board handle
//!
//! Drivers are generic over the bus traits in [`hal`]. The `raspberry-pi`
//! feature provides an `rppal`-backed board; [`hal::mock::MockBoard`] provides
//! an in-memory one for tests and dry runs.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! rpi-components = { version = "1.0", features = ["raspberry-pi"] }
//! ```
//!
//! ```rust
//! use rpi_components::hal::mock::MockBoard;
//! use rpi_components::{Led, Switchable};
//!
//! let board = MockBoard::new();
//! let mut led = Led::new(board.output(17).unwrap());
//! led.turn_on().unwrap();
//! assert!(led.is_on().unwrap());
//! ```

pub mod adc;
pub mod cancel;
pub mod config;
pub mod eeprom;
pub mod error;
pub mod hal;
pub mod lcd;
pub mod led;
pub mod logging;
pub mod logic;
pub mod motor;
pub mod radio;
pub mod rangefinder;
pub mod switch;
pub mod util;

pub use crate::error::{ComponentError, Result};
pub use crate::logging::{init_logger, log_info};

// Board plumbing
pub use cancel::{CancelSource, CancelToken};
pub use config::BoardConfig;
pub use hal::{Delay, Edge, HalError, IoMode, Level, Numbering, Pin, Pull};

// Building blocks
pub use logic::{
    BidirectionalToggle, EdgeInput, SoftPwm, Switchable, ToggleInput, ToggleOutput,
};

// Devices
pub use adc::{Channel, Mcp3008};
pub use eeprom::{AddressMode, Eeprom};
pub use lcd::{Lcd1602, MarqueeDirection, MarqueeOptions, MarqueeOutcome};
pub use led::{FadableLed, Led};
pub use motor::{BasicMotor, BipolarStepper, Direction, VariableSpeedMotor};
pub use radio::{Nrf24, RadioState};
pub use rangefinder::HcSr04;
pub use switch::{PollingSwitch, SwitchEvent};
