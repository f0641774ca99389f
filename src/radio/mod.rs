//! # nRF24L01+ 2.4 GHz Transceiver
//!
//! - [`registers`] - command opcodes, register map and named bits
//! - [`nrf24`] - the driver, state model and interrupt servicing

pub mod nrf24;
pub mod registers;

pub use nrf24::{attach_interrupt, IrqListener, Nrf24, RadioState, RadioSummary};
pub use registers::{
    Command, ConfigFlags, FifoFlags, IrqEvents, Register, StatusFlags, MAX_CHANNEL,
    MAX_PAYLOAD_SIZE,
};
