//! # 24Cxx EEPROM Driver Tests
//!
//! Exercises both addressing modes against a simulated device that keeps an
//! internal address pointer the way real parts do.

mod common;

use common::{eeprom_bus, lock, EepromSim};
use proptest::prelude::*;
use rpi_components::eeprom::{AddressMode, Eeprom, DEFAULT_BASE_ADDRESS, WRITE_CYCLE};
use rpi_components::hal::mock::{MockBoard, MockDelay, MockEvent, MockI2c};
use rpi_components::ComponentError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Device = Eeprom<MockI2c, MockDelay>;

fn eeprom(board: &MockBoard, mode: AddressMode, capacity: usize) -> (Device, Arc<Mutex<EepromSim>>) {
    let (bus, sim) = eeprom_bus(
        board,
        capacity,
        DEFAULT_BASE_ADDRESS,
        mode == AddressMode::SixteenBit,
    );
    let device = Eeprom::new(bus, board.delay(), DEFAULT_BASE_ADDRESS, mode, capacity).unwrap();
    (device, sim)
}

#[test]
fn test_eight_bit_write_frame() {
    let board = MockBoard::new();
    let (mut device, sim) = eeprom(&board, AddressMode::EightBit, 256);

    device.write_byte(0x12, 0xAB).unwrap();

    assert_eq!(
        board.events(),
        vec![
            MockEvent::I2cWrite {
                address: 0x50,
                bytes: vec![0x12, 0xAB]
            },
            MockEvent::Delay(WRITE_CYCLE),
        ]
    );
    assert_eq!(lock(&sim).memory[0x12], 0xAB);
}

#[test]
fn test_eight_bit_block_select() {
    let board = MockBoard::new();
    let (mut device, sim) = eeprom(&board, AddressMode::EightBit, 2048);

    device.write_byte(0x3A5, 0x5A).unwrap();
    assert_eq!(
        board.events()[0],
        MockEvent::I2cWrite {
            address: 0x53,
            bytes: vec![0xA5, 0x5A]
        }
    );
    assert_eq!(lock(&sim).memory[0x3A5], 0x5A);
    assert_eq!(device.read_byte(0x3A5).unwrap(), 0x5A);
}

#[test]
fn test_sixteen_bit_frames() {
    let board = MockBoard::new();
    let (mut device, _sim) = eeprom(&board, AddressMode::SixteenBit, 4096);

    device.write_byte(0x0ABC, 0x42).unwrap();
    board.take_events();
    assert_eq!(device.read_byte(0x0ABC).unwrap(), 0x42);

    assert_eq!(
        board.events(),
        vec![
            MockEvent::I2cWrite {
                address: 0x50,
                bytes: vec![0x0A, 0xBC]
            },
            MockEvent::Delay(Duration::from_millis(10)),
            MockEvent::Delay(Duration::from_micros(10)),
            MockEvent::I2cRead {
                address: 0x50,
                value: 0x42
            },
        ]
    );
}

#[test]
fn test_capacity_checks() {
    let board = MockBoard::new();
    let (mut device, _sim) = eeprom(&board, AddressMode::SixteenBit, 4096);

    assert!(matches!(
        device.write_byte(4096, 0),
        Err(ComponentError::InvalidArgument(_))
    ));
    assert!(device.read_bytes(4090, 10).is_err());
    assert!(device.write_bytes(4095, &[1, 2]).is_err());
    assert!(board.events().is_empty());

    let (bus, _sim) = eeprom_bus(&board, 16, 0x50, false);
    assert!(Eeprom::new(bus, board.delay(), 0x50, AddressMode::EightBit, 4096).is_err());
    let (bus, _sim) = eeprom_bus(&board, 16, 0x50, false);
    assert!(Eeprom::new(bus, board.delay(), 0x80, AddressMode::EightBit, 256).is_err());
}

#[test]
fn test_block_bits_in_base_address_rejected() {
    assert_eq!(AddressMode::EightBit.block_select_mask(256), 0x00);
    assert_eq!(AddressMode::EightBit.block_select_mask(512), 0x01);
    assert_eq!(AddressMode::EightBit.block_select_mask(768), 0x03);
    assert_eq!(AddressMode::EightBit.block_select_mask(2048), 0x07);
    assert_eq!(AddressMode::SixteenBit.block_select_mask(65536), 0x00);

    let board = MockBoard::new();
    let (bus, _sim) = eeprom_bus(&board, 2048, 0x51, false);
    assert!(matches!(
        Eeprom::new(bus, board.delay(), 0x51, AddressMode::EightBit, 2048),
        Err(ComponentError::InvalidArgument(_))
    ));
    let (bus, _sim) = eeprom_bus(&board, 512, 0x52, false);
    assert!(Eeprom::new(bus, board.delay(), 0x52, AddressMode::EightBit, 512).is_ok());
    let (bus, _sim) = eeprom_bus(&board, 4096, 0x51, true);
    assert!(Eeprom::new(bus, board.delay(), 0x51, AddressMode::SixteenBit, 4096).is_ok());
}

#[test]
fn test_strings() {
    let board = MockBoard::new();
    let (mut device, _sim) = eeprom(&board, AddressMode::SixteenBit, 4096);

    device.write_string(100, "Hello, Pi").unwrap();
    assert_eq!(device.read_string(100, 9).unwrap(), "Hello, Pi");

    board.take_events();
    assert!(matches!(
        device.write_string(0, "héllo"),
        Err(ComponentError::InvalidArgument(_))
    ));
    assert!(board.events().is_empty());
}

#[test]
fn test_fill_space_and_erase() {
    let board = MockBoard::new();
    let (mut device, sim) = eeprom(&board, AddressMode::EightBit, 256);

    device.fill_space(10, 20, 0x7E).unwrap();
    {
        let sim = lock(&sim);
        assert!(sim.memory[10..20].iter().all(|&b| b == 0x7E));
        assert_eq!(sim.memory[9], 0xFF);
        assert_eq!(sim.memory[20], 0xFF);
    }
    assert_eq!(board.total_delay(), WRITE_CYCLE * 10);

    device.erase(12, 14).unwrap();
    assert_eq!(device.read_bytes(11, 4).unwrap(), vec![0x7E, 0, 0, 0x7E]);

    assert!(device.fill_space(20, 10, 0).is_err());
    device.fill_space(5, 5, 1).unwrap();
}

#[test]
fn test_missing_device_is_transport_error() {
    let board = MockBoard::new();
    let (bus, _sim) = eeprom_bus(&board, 256, 0x68, false);
    let mut device = Eeprom::new(bus, board.delay(), 0x50, AddressMode::EightBit, 256).unwrap();
    assert!(matches!(
        device.read_byte(0),
        Err(ComponentError::Transport(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_read_back_eight_bit(addr in 0usize..2048, value in any::<u8>()) {
        let board = MockBoard::new();
        let (mut device, _sim) = eeprom(&board, AddressMode::EightBit, 2048);
        device.write_byte(addr, value).unwrap();
        prop_assert_eq!(device.read_byte(addr).unwrap(), value);
    }

    #[test]
    fn prop_read_back_sixteen_bit(
        start in 0usize..65000,
        data in proptest::collection::vec(any::<u8>(), 1..16),
    ) {
        let board = MockBoard::new();
        let (mut device, _sim) = eeprom(&board, AddressMode::SixteenBit, 65536);
        device.write_bytes(start, &data).unwrap();
        prop_assert_eq!(device.read_bytes(start, data.len()).unwrap(), data);
    }
}
