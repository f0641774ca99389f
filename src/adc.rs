//! # MCP3008 10-bit SPI ADC
//!
//! Each conversion is one 3-byte full-duplex transfer:
//!
//! ```text
//! TX: 0000_0001  SDDD_0000  xxxx_xxxx     S = single-ended, DDD = channel
//! RX: xxxx_xxxx  xxxx_x0BB  BBBB_BBBB     10-bit result, MSB first
//! ```
//!
//! Selectors 0-7 are single-ended channels; 8-15 are the differential pairs
//! in datasheet order (`CH0+/CH1-`, `CH1+/CH0-`, ...).

use crate::error::{ComponentError, Result};
use crate::hal::{transfer_exact, HalError, SpiBus};
use std::fmt;

/// Input selection, single-ended or a differential pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
    Ch0PosCh1Neg = 8,
    Ch1PosCh0Neg = 9,
    Ch2PosCh3Neg = 10,
    Ch3PosCh2Neg = 11,
    Ch4PosCh5Neg = 12,
    Ch5PosCh4Neg = 13,
    Ch6PosCh7Neg = 14,
    Ch7PosCh6Neg = 15,
}

impl Channel {
    pub const ALL: [Channel; 16] = [
        Channel::Ch0,
        Channel::Ch1,
        Channel::Ch2,
        Channel::Ch3,
        Channel::Ch4,
        Channel::Ch5,
        Channel::Ch6,
        Channel::Ch7,
        Channel::Ch0PosCh1Neg,
        Channel::Ch1PosCh0Neg,
        Channel::Ch2PosCh3Neg,
        Channel::Ch3PosCh2Neg,
        Channel::Ch4PosCh5Neg,
        Channel::Ch5PosCh4Neg,
        Channel::Ch6PosCh7Neg,
        Channel::Ch7PosCh6Neg,
    ];

    pub fn from_selector(selector: u8) -> Option<Channel> {
        Self::ALL.get(selector as usize).copied()
    }

    pub fn selector(self) -> u8 {
        self as u8
    }

    pub fn is_differential(self) -> bool {
        self.selector() >= 8
    }

    /// The 3-byte command frame that starts a conversion on this input
    pub fn command_frame(self) -> [u8; 3] {
        let mode_and_channel = if self.is_differential() {
            self.selector() - 8
        } else {
            8 + self.selector()
        };
        [0x01, mode_and_channel << 4, 0x00]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sel = self.selector();
        if self.is_differential() {
            let pos = sel - 8;
            write!(f, "CH{}+/CH{}-", pos, pos ^ 1)
        } else {
            write!(f, "CH{sel}")
        }
    }
}

/// Clock rate used when opening the bus, 500 kHz
pub const DEFAULT_SPEED_HZ: u32 = 500_000;
/// Largest conversion result
pub const MAX_VALUE: u16 = 1023;

/// Extract the 10-bit conversion result from a reply frame
pub fn decode_reply(reply: &[u8; 3]) -> u16 {
    (u16::from(reply[1] & 0x03) << 8) | u16::from(reply[2])
}

pub struct Mcp3008<S: SpiBus> {
    spi: S,
}

impl<S: SpiBus> Mcp3008<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Convert one input, result in [0, 1023]
    pub fn read(&mut self, channel: Channel) -> Result<u16> {
        let reply = transfer_exact(&mut self.spi, &channel.command_frame())?;
        let frame: [u8; 3] = reply.as_slice().try_into().map_err(|_| HalError::ShortTransfer {
            expected: 3,
            actual: reply.len(),
        })?;
        let value = decode_reply(&frame);
        log::debug!("MCP3008 {channel} = {value}");
        Ok(value)
    }

    /// Convert by raw selector; out-of-range selectors are rejected before any transfer
    pub fn read_selector(&mut self, selector: u8) -> Result<u16> {
        let channel = Channel::from_selector(selector).ok_or_else(|| {
            ComponentError::invalid(format!("unknown channel selector {selector}"))
        })?;
        self.read(channel)
    }

    /// Convert and scale against the reference voltage
    pub fn read_voltage(&mut self, channel: Channel, vref: f64) -> Result<f64> {
        if !vref.is_finite() || vref <= 0.0 {
            return Err(ComponentError::invalid(format!(
                "reference voltage {vref} must be positive"
            )));
        }
        let raw = self.read(channel)?;
        Ok(f64::from(raw) * vref / f64::from(MAX_VALUE))
    }

    pub fn into_inner(self) -> S {
        self.spi
    }
}
