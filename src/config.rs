//! # Board Configuration
//!
//! Describes how peripherals are wired to a board: which numbering scheme pin
//! numbers use, which SPI and I2C buses devices sit on, and device settings.
//! Configurations are plain JSON:
//!
//! ```json
//! {
//!   "numbering": "board",
//!   "lcd": { "enable": 15, "read_write": 7, "register_select": 13, "data": [22, 18, 16, 12] },
//!   "radio": { "ce": 11, "irq": 36, "channel": 76 }
//! }
//! ```
//!
//! Missing sections and fields fall back to their defaults.

use crate::eeprom::{AddressMode, DEFAULT_BASE_ADDRESS};
use crate::error::{ComponentError, Result};
use crate::hal::{Numbering, Pin, Pull};
use crate::radio::{MAX_CHANNEL, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    pub spi_bus: u8,
    pub chip_select: u8,
    pub speed_hz: u32,
    /// Reference voltage for voltage readings
    pub vref: f64,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 0,
            speed_hz: crate::adc::DEFAULT_SPEED_HZ,
            vref: 3.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EepromConfig {
    pub i2c_bus: u8,
    pub base_address: u8,
    pub address_mode: AddressMode,
    /// Device size in bytes
    pub capacity: usize,
}

impl Default for EepromConfig {
    /// A 24C32 on I2C bus 1
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            base_address: DEFAULT_BASE_ADDRESS,
            address_mode: AddressMode::SixteenBit,
            capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcdConfig {
    pub enable: u8,
    pub read_write: u8,
    pub register_select: u8,
    /// D4..D7
    pub data: [u8; 4],
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            enable: 22,
            read_write: 4,
            register_select: 27,
            data: [25, 24, 23, 18],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub spi_bus: u8,
    pub chip_select: u8,
    pub speed_hz: u32,
    /// Chip-enable pin
    pub ce: u8,
    /// Active-low interrupt pin, if wired
    pub irq: Option<u8>,
    pub channel: u8,
    pub payload_size: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 1,
            speed_hz: crate::radio::nrf24::DEFAULT_SPI_SPEED_HZ,
            ce: 17,
            irq: Some(16),
            channel: crate::radio::nrf24::BASIC_CHANNEL,
            payload_size: MAX_PAYLOAD_SIZE as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub pin: u8,
    pub pull: Pull,
    /// Fire on the transition to high rather than to low
    pub positive_trigger: bool,
    pub poll_interval_ms: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            pin: 21,
            pull: Pull::Down,
            positive_trigger: true,
            poll_interval_ms: crate::switch::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangefinderConfig {
    pub trigger: u8,
    pub echo: u8,
    /// Report centimetres instead of inches
    pub metric: bool,
    pub samples: usize,
    pub tolerance_percent: f64,
}

impl Default for RangefinderConfig {
    fn default() -> Self {
        Self {
            trigger: 5,
            echo: 6,
            metric: false,
            samples: crate::rangefinder::DEFAULT_SAMPLES,
            tolerance_percent: crate::rangefinder::DEFAULT_TOLERANCE_PERCENT,
        }
    }
}

/// Wiring and settings for every peripheral on one board
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub numbering: Numbering,
    pub adc: AdcConfig,
    pub eeprom: EepromConfig,
    pub lcd: LcdConfig,
    pub radio: RadioConfig,
    pub switch: SwitchConfig,
    pub rangefinder: RangefinderConfig,
}

impl BoardConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BoardConfig = serde_json::from_str(json)
            .map_err(|e| ComponentError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ComponentError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded board configuration from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ComponentError::Config(e.to_string()))
    }

    /// Every GPIO assignment as `(role, pin number)` under [`Self::numbering`]
    pub fn gpio_assignments(&self) -> Vec<(&'static str, u8)> {
        let mut pins = vec![
            ("lcd.enable", self.lcd.enable),
            ("lcd.read_write", self.lcd.read_write),
            ("lcd.register_select", self.lcd.register_select),
            ("lcd.data[0]", self.lcd.data[0]),
            ("lcd.data[1]", self.lcd.data[1]),
            ("lcd.data[2]", self.lcd.data[2]),
            ("lcd.data[3]", self.lcd.data[3]),
            ("radio.ce", self.radio.ce),
            ("switch.pin", self.switch.pin),
            ("rangefinder.trigger", self.rangefinder.trigger),
            ("rangefinder.echo", self.rangefinder.echo),
        ];
        if let Some(irq) = self.radio.irq {
            pins.push(("radio.irq", irq));
        }
        pins
    }

    /// Check pin numbers, duplicate assignments and device limits
    pub fn validate(&self) -> Result<()> {
        let mut used: HashMap<u8, &'static str> = HashMap::new();
        for (role, number) in self.gpio_assignments() {
            let bcm = Pin::new(number, self.numbering)
                .to_bcm()
                .map_err(|e| ComponentError::Config(format!("{role}: {e}")))?;
            if let Some(other) = used.insert(bcm, role) {
                return Err(ComponentError::Config(format!(
                    "{role} and {other} both use GPIO {bcm}"
                )));
            }
        }

        if self.radio.channel > MAX_CHANNEL {
            return Err(ComponentError::Config(format!(
                "radio.channel {} exceeds {MAX_CHANNEL}",
                self.radio.channel
            )));
        }
        if self.radio.payload_size as usize > MAX_PAYLOAD_SIZE {
            return Err(ComponentError::Config(format!(
                "radio.payload_size {} exceeds {MAX_PAYLOAD_SIZE}",
                self.radio.payload_size
            )));
        }

        let max = self.eeprom.address_mode.max_capacity();
        if self.eeprom.capacity == 0 || self.eeprom.capacity > max {
            return Err(ComponentError::Config(format!(
                "eeprom.capacity {} must be 1..={max} for {:?} addressing",
                self.eeprom.capacity, self.eeprom.address_mode
            )));
        }
        if self.eeprom.base_address > 0x7F {
            return Err(ComponentError::Config(format!(
                "eeprom.base_address 0x{:02X} is not a 7-bit address",
                self.eeprom.base_address
            )));
        }
        let mask = self
            .eeprom
            .address_mode
            .block_select_mask(self.eeprom.capacity);
        if self.eeprom.base_address & mask != 0 {
            return Err(ComponentError::Config(format!(
                "eeprom.base_address 0x{:02X} overlaps block-select bits 0x{mask:02X}",
                self.eeprom.base_address
            )));
        }

        if self.switch.poll_interval_ms == 0 {
            return Err(ComponentError::Config(
                "switch.poll_interval_ms must be positive".into(),
            ));
        }
        if !self.adc.vref.is_finite() || self.adc.vref <= 0.0 {
            return Err(ComponentError::Config(format!(
                "adc.vref {} must be a positive voltage",
                self.adc.vref
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BoardConfig::default();
        assert_eq!(config.numbering, Numbering::Bcm);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = BoardConfig::from_json_str(r#"{ "radio": { "channel": 76 } }"#).unwrap();
        assert_eq!(config.radio.channel, 76);
        assert_eq!(config.radio.payload_size, 32);
        assert_eq!(config.lcd, LcdConfig::default());
    }

    #[test]
    fn test_board_numbering_translates_pins() {
        let json = r#"{
            "numbering": "board",
            "lcd": { "enable": 15, "read_write": 7, "register_select": 13, "data": [22, 18, 16, 12] },
            "radio": { "ce": 11, "irq": 36 },
            "switch": { "pin": 40 },
            "rangefinder": { "trigger": 29, "echo": 31 }
        }"#;
        let config = BoardConfig::from_json_str(json).unwrap();
        assert_eq!(config.numbering, Numbering::Board);
    }

    #[test]
    fn test_power_pin_rejected_under_board_numbering() {
        let mut config = BoardConfig {
            numbering: Numbering::Board,
            ..Default::default()
        };
        config.lcd = LcdConfig {
            enable: 15,
            read_write: 7,
            register_select: 13,
            data: [22, 18, 16, 12],
        };
        config.radio.ce = 11;
        config.radio.irq = None;
        config.switch.pin = 40;
        config.rangefinder.trigger = 29;
        config.rangefinder.echo = 6; // GND
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ComponentError::Config(ref msg) if msg.contains("rangefinder.echo")));
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let mut config = BoardConfig::default();
        config.switch.pin = config.lcd.enable;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ComponentError::Config(ref msg) if msg.contains("GPIO 22")));
    }

    #[test]
    fn test_device_limits() {
        let mut config = BoardConfig::default();
        config.radio.channel = 126;
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.radio.payload_size = 33;
        assert!(config.validate().is_err());

        let mut config = BoardConfig::default();
        config.eeprom.address_mode = AddressMode::EightBit;
        config.eeprom.capacity = 4096;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_eeprom_base_address_must_leave_block_bits_clear() {
        let mut config = BoardConfig::default();
        config.eeprom.address_mode = AddressMode::EightBit;
        config.eeprom.capacity = 1024;
        config.eeprom.base_address = 0x51;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ComponentError::Config(ref msg) if msg.contains("block-select")));

        config.eeprom.base_address = 0x54;
        config.validate().unwrap();
        config.eeprom.capacity = 256;
        config.eeprom.base_address = 0x51;
        config.validate().unwrap();
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            BoardConfig::from_json_str("{ not json"),
            Err(ComponentError::Config(_))
        ));
    }
}
