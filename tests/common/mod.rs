//! Simulated peripherals shared by the integration tests.
//!
//! Each simulator sits behind a [`MockBoard`] bus and keeps its own state in an
//! `Arc<Mutex<_>>` so tests can inspect it after driving the real driver.

#![allow(dead_code)]

use rpi_components::hal::mock::{I2cTarget, MockBoard, MockI2c, MockSpi};
use rpi_components::hal::HalError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// nRF24L01+ register file and FIFOs
pub struct Nrf24Sim {
    pub registers: [u8; 0x20],
    pub tx_address: Vec<u8>,
    pub rx_address_p0: Vec<u8>,
    pub rx_address_p1: Vec<u8>,
    pub tx_fifo: Vec<Vec<u8>>,
    pub rx_fifo: VecDeque<Vec<u8>>,
    /// Raise TX_DS as soon as a payload is loaded
    pub auto_ack: bool,
}

const STATUS: usize = 0x07;
const FIFO_STATUS: usize = 0x17;
const RX_DR: u8 = 1 << 6;
const TX_DS: u8 = 1 << 5;
const RX_P_NO_EMPTY: u8 = 0b0000_1110;

impl Default for Nrf24Sim {
    /// Power-on reset values
    fn default() -> Self {
        let mut registers = [0u8; 0x20];
        registers[0x00] = 0x08;
        registers[0x01] = 0x3F;
        registers[0x02] = 0x03;
        registers[0x03] = 0x03;
        registers[0x04] = 0x03;
        registers[0x05] = 0x02;
        registers[0x06] = 0x0E;
        registers[STATUS] = RX_P_NO_EMPTY;
        registers[0x0C] = 0xC3;
        registers[0x0D] = 0xC4;
        registers[0x0E] = 0xC5;
        registers[0x0F] = 0xC6;
        Self {
            registers,
            tx_address: vec![0xE7; 5],
            rx_address_p0: vec![0xE7; 5],
            rx_address_p1: vec![0xC2; 5],
            tx_fifo: Vec::new(),
            rx_fifo: VecDeque::new(),
            auto_ack: false,
        }
    }
}

impl Nrf24Sim {
    pub fn status(&self) -> u8 {
        self.registers[STATUS]
    }

    pub fn config(&self) -> u8 {
        self.registers[0x00]
    }

    /// Deliver a payload over the air
    pub fn receive(&mut self, payload: &[u8]) {
        self.rx_fifo.push_back(payload.to_vec());
        self.registers[STATUS] = (self.registers[STATUS] & !RX_P_NO_EMPTY) | RX_DR;
    }

    fn fifo_status(&self) -> u8 {
        let mut value = 0;
        if self.rx_fifo.is_empty() {
            value |= 1 << 0;
        }
        if self.tx_fifo.is_empty() {
            value |= 1 << 4;
        }
        if self.tx_fifo.len() >= 3 {
            value |= 1 << 5;
        }
        value
    }

    fn read_register(&self, register: usize, len: usize) -> Vec<u8> {
        let wide = match register {
            0x0A => Some(&self.rx_address_p0),
            0x0B => Some(&self.rx_address_p1),
            0x10 => Some(&self.tx_address),
            _ => None,
        };
        let mut bytes = match wide {
            Some(address) => address.clone(),
            None if register == FIFO_STATUS => vec![self.fifo_status()],
            None => vec![self.registers[register]],
        };
        bytes.resize(len, 0);
        bytes
    }

    fn write_register(&mut self, register: usize, bytes: &[u8]) {
        match register {
            STATUS => {
                let clear = bytes[0] & 0x70;
                self.registers[STATUS] &= !clear;
            }
            0x0A => self.rx_address_p0 = bytes.to_vec(),
            0x0B => self.rx_address_p1 = bytes.to_vec(),
            0x10 => self.tx_address = bytes.to_vec(),
            _ => self.registers[register] = bytes[0],
        }
    }

    /// One full-duplex SPI transaction
    pub fn transfer(&mut self, write: &[u8]) -> Vec<u8> {
        let status = self.status();
        let command = write[0];
        let mut reply = vec![status];
        match command {
            0x00..=0x1F => {
                reply.extend(self.read_register(usize::from(command & 0x1F), write.len() - 1));
            }
            0x20..=0x3F => {
                self.write_register(usize::from(command & 0x1F), &write[1..]);
                reply.resize(write.len(), 0);
            }
            0x60 => {
                let width = self.rx_fifo.front().map_or(0, |p| p.len() as u8);
                reply.push(width);
            }
            0x61 => {
                let mut payload = self.rx_fifo.pop_front().unwrap_or_default();
                payload.resize(write.len() - 1, 0);
                reply.extend(payload);
                if self.rx_fifo.is_empty() {
                    self.registers[STATUS] |= RX_P_NO_EMPTY;
                }
            }
            0xA0 | 0xB0 => {
                self.tx_fifo.push(write[1..].to_vec());
                if self.auto_ack {
                    self.registers[STATUS] |= TX_DS;
                }
                reply.resize(write.len(), 0);
            }
            0xE1 => self.tx_fifo.clear(),
            0xE2 => self.rx_fifo.clear(),
            _ => reply.resize(write.len(), 0),
        }
        reply.resize(write.len(), 0);
        reply
    }
}

pub fn lock<T>(shared: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    shared.lock().unwrap()
}

/// SPI bus wired to a fresh nRF24 simulator
pub fn nrf24_bus(board: &MockBoard) -> (MockSpi, Arc<Mutex<Nrf24Sim>>) {
    let sim = Arc::new(Mutex::new(Nrf24Sim::default()));
    let shared = Arc::clone(&sim);
    let spi = board.spi(Box::new(move |write: &[u8]| {
        shared.lock().unwrap().transfer(write)
    }));
    (spi, sim)
}

/// MCP3008 holding a fixed 10-bit value per selector
pub struct Mcp3008Sim {
    pub values: [u16; 16],
}

impl Mcp3008Sim {
    pub fn transfer(&self, write: &[u8]) -> Vec<u8> {
        let selector = if write[1] & 0x80 != 0 {
            (write[1] >> 4) & 0x07
        } else {
            8 + ((write[1] >> 4) & 0x07)
        };
        let value = self.values[usize::from(selector)];
        vec![0x00, (value >> 8) as u8 & 0x03, (value & 0xFF) as u8]
    }
}

/// SPI bus wired to an MCP3008 with the given readings
pub fn mcp3008_bus(board: &MockBoard, values: [u16; 16]) -> MockSpi {
    let sim = Mcp3008Sim { values };
    board.spi(Box::new(move |write: &[u8]| sim.transfer(write)))
}

/// 24Cxx EEPROM with an internal address pointer
pub struct EepromSim {
    pub memory: Vec<u8>,
    pub base_address: u8,
    pub sixteen_bit: bool,
    pointer: usize,
}

impl EepromSim {
    pub fn new(capacity: usize, base_address: u8, sixteen_bit: bool) -> Self {
        Self {
            memory: vec![0xFF; capacity],
            base_address,
            sixteen_bit,
            pointer: 0,
        }
    }

    fn block(&self, address: u8) -> Result<usize, HalError> {
        if address & 0x78 != self.base_address & 0x78 {
            return Err(HalError::I2c(format!("no ACK from 0x{address:02X}")));
        }
        if self.sixteen_bit {
            Ok(0)
        } else {
            Ok(usize::from(address & 0x07))
        }
    }
}

/// Shared handle so the test keeps access after the bus takes ownership
pub struct SharedEeprom(pub Arc<Mutex<EepromSim>>);

impl I2cTarget for SharedEeprom {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), HalError> {
        let mut sim = self.0.lock().unwrap();
        let block = sim.block(address)?;
        let (pointer, data) = if sim.sixteen_bit {
            (usize::from(bytes[0]) << 8 | usize::from(bytes[1]), &bytes[2..])
        } else {
            (block << 8 | usize::from(bytes[0]), &bytes[1..])
        };
        let capacity = sim.memory.len();
        sim.pointer = pointer % capacity;
        for &value in data {
            let at = sim.pointer;
            sim.memory[at] = value;
            sim.pointer = (at + 1) % capacity;
        }
        Ok(())
    }

    fn read(&mut self, address: u8) -> Result<u8, HalError> {
        let mut sim = self.0.lock().unwrap();
        sim.block(address)?;
        let at = sim.pointer;
        let value = sim.memory[at];
        sim.pointer = (at + 1) % sim.memory.len();
        Ok(value)
    }
}

/// I2C bus with a simulated EEPROM attached
pub fn eeprom_bus(
    board: &MockBoard,
    capacity: usize,
    base_address: u8,
    sixteen_bit: bool,
) -> (MockI2c, Arc<Mutex<EepromSim>>) {
    let sim = Arc::new(Mutex::new(EepromSim::new(capacity, base_address, sixteen_bit)));
    let bus = board.i2c(Box::new(SharedEeprom(Arc::clone(&sim))));
    (bus, sim)
}
