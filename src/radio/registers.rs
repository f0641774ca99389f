//! # nRF24L01+ Command and Register Definitions
//!
//! SPI commands, register addresses and named register bits for the Nordic
//! nRF24L01+ 2.4 GHz transceiver, following the product specification v1.0.
//!
//! ## Command framing
//!
//! Every SPI transaction starts with a command byte. Register access embeds the
//! 5-bit register address in the command:
//!
//! ```text
//! R_REGISTER  000A_AAAA
//! W_REGISTER  001A_AAAA
//! ```
//!
//! The first byte clocked back in every transaction is the STATUS register.

use bitflags::bitflags;
use std::fmt;

/// Largest static payload, in bytes
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Highest RF channel (2400 + 125 MHz)
pub const MAX_CHANNEL: u8 = 125;

/// Number of receive pipes
pub const PIPE_COUNT: u8 = 6;

/// Mask for the register address embedded in register commands
const REGISTER_MASK: u8 = 0x1F;

/// SPI command opcodes
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Read a register; OR with the register address
    RRegister = 0x00,
    /// Write a register; OR with the register address. Only in power-down or standby.
    WRegister = 0x20,
    /// Read the width of the top RX FIFO payload
    RRxPlWid = 0x60,
    /// Read one RX payload, 1-32 bytes
    RRxPayload = 0x61,
    /// Write one TX payload, 1-32 bytes
    WTxPayload = 0xA0,
    /// Write a TX payload with auto-acknowledge disabled
    WTxPayloadNoAck = 0xB0,
    /// Flush the TX FIFO
    FlushTx = 0xE1,
    /// Flush the RX FIFO
    FlushRx = 0xE2,
    /// Reuse the last transmitted payload
    ReuseTxPl = 0xE3,
    /// No operation; used to read STATUS
    Nop = 0xFF,
}

impl Command {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Command byte for a register read or write
    pub fn for_register(self, register: Register) -> u8 {
        self.opcode() | (register.addr() & REGISTER_MASK)
    }
}

/// Register map
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Config = 0x00,
    EnAa = 0x01,
    EnRxAddr = 0x02,
    SetupAw = 0x03,
    SetupRetr = 0x04,
    RfCh = 0x05,
    RfSetup = 0x06,
    Status = 0x07,
    ObserveTx = 0x08,
    Rpd = 0x09,
    RxAddrP0 = 0x0A,
    RxAddrP1 = 0x0B,
    RxAddrP2 = 0x0C,
    RxAddrP3 = 0x0D,
    RxAddrP4 = 0x0E,
    RxAddrP5 = 0x0F,
    TxAddr = 0x10,
    RxPwP0 = 0x11,
    RxPwP1 = 0x12,
    RxPwP2 = 0x13,
    RxPwP3 = 0x14,
    RxPwP4 = 0x15,
    RxPwP5 = 0x16,
    FifoStatus = 0x17,
    Dynpd = 0x1C,
    Feature = 0x1D,
}

impl Register {
    pub fn addr(self) -> u8 {
        self as u8
    }

    /// RX_PW_Px for `pipe`
    pub fn rx_payload_width(pipe: u8) -> Option<Register> {
        const WIDTHS: [Register; 6] = [
            Register::RxPwP0,
            Register::RxPwP1,
            Register::RxPwP2,
            Register::RxPwP3,
            Register::RxPwP4,
            Register::RxPwP5,
        ];
        WIDTHS.get(pipe as usize).copied()
    }

    /// RX_ADDR_Px for `pipe`
    pub fn rx_address(pipe: u8) -> Option<Register> {
        const ADDRS: [Register; 6] = [
            Register::RxAddrP0,
            Register::RxAddrP1,
            Register::RxAddrP2,
            Register::RxAddrP3,
            Register::RxAddrP4,
            Register::RxAddrP5,
        ];
        ADDRS.get(pipe as usize).copied()
    }

    /// Datasheet mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Register::Config => "CONFIG",
            Register::EnAa => "EN_AA",
            Register::EnRxAddr => "EN_RXADDR",
            Register::SetupAw => "SETUP_AW",
            Register::SetupRetr => "SETUP_RETR",
            Register::RfCh => "RF_CH",
            Register::RfSetup => "RF_SETUP",
            Register::Status => "STATUS",
            Register::ObserveTx => "OBSERVE_TX",
            Register::Rpd => "RPD",
            Register::RxAddrP0 => "RX_ADDR_P0",
            Register::RxAddrP1 => "RX_ADDR_P1",
            Register::RxAddrP2 => "RX_ADDR_P2",
            Register::RxAddrP3 => "RX_ADDR_P3",
            Register::RxAddrP4 => "RX_ADDR_P4",
            Register::RxAddrP5 => "RX_ADDR_P5",
            Register::TxAddr => "TX_ADDR",
            Register::RxPwP0 => "RX_PW_P0",
            Register::RxPwP1 => "RX_PW_P1",
            Register::RxPwP2 => "RX_PW_P2",
            Register::RxPwP3 => "RX_PW_P3",
            Register::RxPwP4 => "RX_PW_P4",
            Register::RxPwP5 => "RX_PW_P5",
            Register::FifoStatus => "FIFO_STATUS",
            Register::Dynpd => "DYNPD",
            Register::Feature => "FEATURE",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.addr())
    }
}

bitflags! {
    /// CONFIG register bits
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ConfigFlags: u8 {
        /// Hide RX_DR from the IRQ pin
        const MASK_RX_DR  = 1 << 6;
        /// Hide TX_DS from the IRQ pin
        const MASK_TX_DS  = 1 << 5;
        /// Hide MAX_RT from the IRQ pin
        const MASK_MAX_RT = 1 << 4;
        /// Enable CRC
        const EN_CRC      = 1 << 3;
        /// CRC encoding scheme, set for 2 bytes
        const CRCO        = 1 << 2;
        const PWR_UP      = 1 << 1;
        /// Set for primary receiver, clear for primary transmitter
        const PRIM_RX     = 1 << 0;
    }
}

bitflags! {
    /// STATUS register bits
    ///
    /// RX_DR, TX_DS and MAX_RT are cleared by writing 1 to them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Data ready in RX FIFO
        const RX_DR   = 1 << 6;
        /// Data sent (acknowledged when auto-ack is on)
        const TX_DS   = 1 << 5;
        /// Maximum retransmits reached
        const MAX_RT  = 1 << 4;
        /// Pipe number of the payload at the head of the RX FIFO; 7 when empty
        const RX_P_NO = 0b0000_1110;
        const TX_FULL = 1 << 0;
    }
}

impl StatusFlags {
    /// Pipe holding the next RX payload, `None` when the RX FIFO is empty
    pub fn rx_pipe(self) -> Option<u8> {
        match (self.bits() & Self::RX_P_NO.bits()) >> 1 {
            pipe @ 0..=5 => Some(pipe),
            _ => None,
        }
    }
}

bitflags! {
    /// FIFO_STATUS register bits
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FifoFlags: u8 {
        const TX_REUSE = 1 << 6;
        const TX_FULL  = 1 << 5;
        const TX_EMPTY = 1 << 4;
        const RX_FULL  = 1 << 1;
        const RX_EMPTY = 1 << 0;
    }
}

bitflags! {
    /// Interrupt causes, bit-compatible with the STATUS flags they mirror
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IrqEvents: u8 {
        const DATA_READY  = 1 << 6;
        const DATA_SENT   = 1 << 5;
        const MAX_RETRIES = 1 << 4;
    }
}

impl IrqEvents {
    pub fn from_status(status: StatusFlags) -> Self {
        IrqEvents::from_bits_truncate(status.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_commands() {
        assert_eq!(Command::RRegister.for_register(Register::Status), 0x07);
        assert_eq!(Command::WRegister.for_register(Register::Config), 0x20);
        assert_eq!(Command::WRegister.for_register(Register::FifoStatus), 0x37);
        assert_eq!(Command::WRegister.for_register(Register::Feature), 0x3D);
    }

    #[test]
    fn test_flush_opcodes() {
        assert_eq!(Command::FlushTx.opcode(), 0xE1);
        assert_eq!(Command::FlushRx.opcode(), 0xE2);
        assert_eq!(Command::ReuseTxPl.opcode(), 0xE3);
    }

    #[test]
    fn test_pipe_registers() {
        assert_eq!(Register::rx_payload_width(0), Some(Register::RxPwP0));
        assert_eq!(Register::rx_payload_width(5), Some(Register::RxPwP5));
        assert_eq!(Register::rx_payload_width(6), None);
        assert_eq!(Register::rx_address(3), Some(Register::RxAddrP3));
    }

    #[test]
    fn test_status_rx_pipe() {
        assert_eq!(StatusFlags::from_bits_retain(0x0E).rx_pipe(), None);
        assert_eq!(StatusFlags::from_bits_retain(0x40).rx_pipe(), Some(0));
        assert_eq!(StatusFlags::from_bits_retain(0x44).rx_pipe(), Some(2));
    }

    #[test]
    fn test_irq_events_from_status() {
        let status = StatusFlags::RX_DR | StatusFlags::MAX_RT | StatusFlags::TX_FULL;
        let events = IrqEvents::from_status(status);
        assert_eq!(events, IrqEvents::DATA_READY | IrqEvents::MAX_RETRIES);
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register::FifoStatus.to_string(), "FIFO_STATUS (0x17)");
    }
}
