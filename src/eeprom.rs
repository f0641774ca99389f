//! # 24Cxx I2C EEPROM
//!
//! Byte-at-a-time access to 24Cxx serial EEPROMs. Every single-byte
//! transaction, read or write, is followed by the 10 ms internal write cycle.
//! Multi-byte helpers loop over single-byte operations and pay that delay per
//! byte.
//!
//! ## Addressing
//!
//! | Mode | Word address | Device address | Largest part |
//! |------|--------------|----------------|--------------|
//! | [`AddressMode::EightBit`] | `addr & 0xFF` | `base \| (addr >> 8) & 0x07` | 24C16, 2 KiB |
//! | [`AddressMode::SixteenBit`] | `addr >> 8`, `addr & 0xFF` | `base` | 24C512, 64 KiB |
//!
//! Small 8-bit parts (24C01/24C02) never see block bits because their whole
//! range is below 256.

use crate::error::{ComponentError, Result};
use crate::hal::{Delay, I2cBus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default 7-bit device address of a 24Cxx with A0-A2 tied low
pub const DEFAULT_BASE_ADDRESS: u8 = 0x50;

/// Internal write cycle time, waited after every transaction
pub const WRITE_CYCLE: Duration = Duration::from_millis(10);

const READ_SETTLE: Duration = Duration::from_micros(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// One word-address byte, block bits in the device address
    EightBit,
    /// Two word-address bytes, high byte first
    SixteenBit,
}

impl AddressMode {
    /// Largest device this mode can address
    pub fn max_capacity(self) -> usize {
        match self {
            AddressMode::EightBit => 2048,
            AddressMode::SixteenBit => 65536,
        }
    }

    /// Device-address bits taken by block selection for a part of `capacity` bytes
    pub fn block_select_mask(self, capacity: usize) -> u8 {
        match self {
            AddressMode::EightBit => {
                let top_block = (capacity.saturating_sub(1) >> 8).min(0x07) as u8;
                u8::MAX.checked_shr(top_block.leading_zeros()).unwrap_or(0)
            }
            AddressMode::SixteenBit => 0,
        }
    }
}

pub struct Eeprom<B: I2cBus, D: Delay> {
    bus: B,
    delay: D,
    base_address: u8,
    mode: AddressMode,
    capacity: usize,
}

impl<B: I2cBus, D: Delay> Eeprom<B, D> {
    /// `capacity` is the device size in bytes and bounds every address
    pub fn new(
        bus: B,
        delay: D,
        base_address: u8,
        mode: AddressMode,
        capacity: usize,
    ) -> Result<Self> {
        if capacity == 0 || capacity > mode.max_capacity() {
            return Err(ComponentError::invalid(format!(
                "capacity {capacity} not addressable in {mode:?} mode (max {})",
                mode.max_capacity()
            )));
        }
        if base_address > 0x7F {
            return Err(ComponentError::invalid(format!(
                "I2C address 0x{base_address:02x} is not a 7-bit address"
            )));
        }
        let mask = mode.block_select_mask(capacity);
        if base_address & mask != 0 {
            return Err(ComponentError::invalid(format!(
                "I2C address 0x{base_address:02x} overlaps block-select bits 0x{mask:02x} \
                 of a {capacity}-byte device"
            )));
        }
        Ok(Self {
            bus,
            delay,
            base_address,
            mode,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mode(&self) -> AddressMode {
        self.mode
    }

    pub fn base_address(&self) -> u8 {
        self.base_address
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        match start.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(ComponentError::invalid(format!(
                "range {start}+{len} exceeds EEPROM capacity {}",
                self.capacity
            ))),
        }
    }

    fn device_address(&self, addr: usize) -> u8 {
        match self.mode {
            AddressMode::EightBit => self.base_address | ((addr >> 8) as u8 & 0x07),
            AddressMode::SixteenBit => self.base_address,
        }
    }

    pub fn write_byte(&mut self, addr: usize, value: u8) -> Result<()> {
        self.check_range(addr, 1)?;
        let device = self.device_address(addr);
        let low = (addr & 0xFF) as u8;
        let result = match self.mode {
            AddressMode::EightBit => self.bus.write_block(device, low, &[value]),
            AddressMode::SixteenBit => {
                let high = ((addr >> 8) & 0xFF) as u8;
                self.bus.write_block(device, high, &[low, value])
            }
        };
        self.delay.delay(WRITE_CYCLE);
        result?;
        log::trace!("EEPROM write 0x{addr:04x} = 0x{value:02x}");
        Ok(())
    }

    pub fn read_byte(&mut self, addr: usize) -> Result<u8> {
        self.check_range(addr, 1)?;
        let device = self.device_address(addr);
        let low = (addr & 0xFF) as u8;
        let result = match self.mode {
            AddressMode::EightBit => self.bus.write_byte(device, low),
            AddressMode::SixteenBit => {
                let high = ((addr >> 8) & 0xFF) as u8;
                self.bus.write_block(device, high, &[low])
            }
        };
        self.delay.delay(WRITE_CYCLE);
        result?;
        self.delay.delay(READ_SETTLE);
        let value = self.bus.read_byte(device)?;
        log::trace!("EEPROM read 0x{addr:04x} = 0x{value:02x}");
        Ok(value)
    }

    /// Write `bytes` to consecutive addresses starting at `start`
    pub fn write_bytes(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        self.check_range(start, bytes.len())?;
        for (offset, &value) in bytes.iter().enumerate() {
            self.write_byte(start + offset, value)?;
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, start: usize, len: usize) -> Result<Vec<u8>> {
        self.check_range(start, len)?;
        (start..start + len).map(|addr| self.read_byte(addr)).collect()
    }

    /// Store an ASCII string; non-ASCII text is rejected before any write
    pub fn write_string(&mut self, start: usize, text: &str) -> Result<()> {
        if !text.is_ascii() {
            return Err(ComponentError::invalid(
                "EEPROM strings must be ASCII".to_string(),
            ));
        }
        self.write_bytes(start, text.as_bytes())
    }

    /// Read `len` bytes as characters, one char per byte
    pub fn read_string(&mut self, start: usize, len: usize) -> Result<String> {
        let bytes = self.read_bytes(start, len)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    /// Write `value` to every address in `[start, end)`
    pub fn fill_space(&mut self, start: usize, end: usize, value: u8) -> Result<()> {
        if end < start {
            return Err(ComponentError::invalid(format!(
                "fill range end {end} precedes start {start}"
            )));
        }
        self.check_range(start, end - start)?;
        log::debug!("EEPROM fill [{start}, {end}) with 0x{value:02x}");
        for addr in start..end {
            self.write_byte(addr, value)?;
        }
        Ok(())
    }

    /// Clear `[start, end)` to zero
    pub fn erase(&mut self, start: usize, end: usize) -> Result<()> {
        self.fill_space(start, end, 0)
    }

    pub fn into_inner(self) -> (B, D) {
        (self.bus, self.delay)
    }
}
