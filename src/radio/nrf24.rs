//! # nRF24L01+ Driver
//!
//! Register-level driver for the nRF24L01+ over SPI plus the CE (chip enable)
//! line. No register contents are cached: every query reads the device.
//!
//! ## State model
//!
//! ```text
//!               power_up()            start_rx()/start_tx()
//! PoweredDown ─────────────> Standby ──────────────────────> Rx | Tx
//!      ^                        ^         CE low, flip PRIM_RX, CE high
//!      └──── power_down() ──────┴──────────────────────────────┘
//! ```
//!
//! Mode changes always lower CE, rewrite CONFIG and raise CE again, in that
//! order.
//!
//! ## Interrupts
//!
//! The IRQ pin is active low. [`attach_interrupt`] turns falling edges into a
//! stream of notifications; the owner of the radio then calls
//! [`Nrf24::service_interrupt`] to decode and acknowledge the cause.

use super::registers::{
    Command, ConfigFlags, FifoFlags, IrqEvents, Register, StatusFlags, MAX_CHANNEL,
    MAX_PAYLOAD_SIZE,
};
use crate::error::{ComponentError, Result};
use crate::hal::{transfer_exact, Delay, Edge, EdgeLine, OutputLine, SpiBus};
use crate::logging::log_warn;
use crate::logic::{EdgeInput, ToggleOutput};
use crate::util::logging::log_payload_hex;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Channel used by [`Nrf24::setup_basic`]
pub const BASIC_CHANNEL: u8 = 104;

/// Crystal start-up time after PWR_UP, datasheet Tpd2stby
pub const POWER_UP_DELAY: Duration = Duration::from_micros(1500);

/// Default SPI clock for the transceiver
pub const DEFAULT_SPI_SPEED_HZ: u32 = 8_000_000;

/// Operating state derived from CONFIG and the CE line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    PoweredDown,
    Standby,
    Rx,
    Tx,
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioState::PoweredDown => write!(f, "powered down"),
            RadioState::Standby => write!(f, "standby"),
            RadioState::Rx => write!(f, "RX"),
            RadioState::Tx => write!(f, "TX"),
        }
    }
}

/// Snapshot of STATUS, CONFIG and FIFO_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioSummary {
    pub status: StatusFlags,
    pub config: ConfigFlags,
    pub fifo: FifoFlags,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl fmt::Display for RadioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.status;
        let c = self.config;
        let q = self.fifo;
        writeln!(f, "----------------STATUS----------------")?;
        writeln!(f, "{:<20} {}", "Data Ready", yes_no(s.contains(StatusFlags::RX_DR)))?;
        writeln!(f, "{:<20} {}", "Data Sent", yes_no(s.contains(StatusFlags::TX_DS)))?;
        writeln!(f, "{:<20} {}", "Max Retries", yes_no(s.contains(StatusFlags::MAX_RT)))?;
        match s.rx_pipe() {
            Some(pipe) => writeln!(f, "{:<20} {}", format!("Pipe {pipe}"), "Data Ready")?,
            None => writeln!(f, "{:<20} {}", "RX FIFOs Empty", "Yes")?,
        }
        writeln!(f, "{:<20} {}", "Tx FIFO Full", yes_no(s.contains(StatusFlags::TX_FULL)))?;
        writeln!(f, "{:<20} {}", "Tx Reuse", yes_no(q.contains(FifoFlags::TX_REUSE)))?;
        writeln!(f, "{:<20} {}", "Tx Full", yes_no(q.contains(FifoFlags::TX_FULL)))?;
        writeln!(f, "{:<20} {}", "Tx Empty", yes_no(q.contains(FifoFlags::TX_EMPTY)))?;
        writeln!(f, "{:<20} {}", "Rx Full", yes_no(q.contains(FifoFlags::RX_FULL)))?;
        writeln!(f, "{:<20} {}", "Rx Empty", yes_no(q.contains(FifoFlags::RX_EMPTY)))?;
        writeln!(f, "--------------END STATUS--------------")?;
        writeln!(f, "----------------CONFIG----------------")?;
        writeln!(f, "{:<20} {}", "RX DR on IRQ", yes_no(!c.contains(ConfigFlags::MASK_RX_DR)))?;
        writeln!(f, "{:<20} {}", "TX DS on IRQ", yes_no(!c.contains(ConfigFlags::MASK_TX_DS)))?;
        writeln!(f, "{:<20} {}", "MAX RT on IRQ", yes_no(!c.contains(ConfigFlags::MASK_MAX_RT)))?;
        writeln!(f, "{:<20} {}", "CRC Enabled", yes_no(c.contains(ConfigFlags::EN_CRC)))?;
        writeln!(
            f,
            "{:<20} {}",
            "CRC Encoding",
            if c.contains(ConfigFlags::CRCO) { "2 Bytes" } else { "1 Byte" }
        )?;
        writeln!(
            f,
            "{:<20} {}",
            "Power Status",
            if c.contains(ConfigFlags::PWR_UP) { "Powered Up" } else { "Powered Down" }
        )?;
        writeln!(
            f,
            "{:<20} {}",
            "Mode",
            if c.contains(ConfigFlags::PRIM_RX) { "RX" } else { "TX" }
        )?;
        write!(f, "--------------END CONFIG--------------")
    }
}

/// nRF24L01+ transceiver on an SPI device and a CE output
pub struct Nrf24<S: SpiBus, O: OutputLine, D: Delay> {
    spi: S,
    ce: ToggleOutput<O>,
    delay: D,
}

impl<S: SpiBus, O: OutputLine, D: Delay> Nrf24<S, O, D> {
    /// Take ownership of the bus and CE line; CE is driven low
    pub fn new(spi: S, ce: O, delay: D) -> Result<Self> {
        let mut ce = ToggleOutput::new(ce);
        ce.lo()?;
        Ok(Self { spi, ce, delay })
    }

    fn command(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        Ok(transfer_exact(&mut self.spi, frame)?)
    }

    pub fn read_register(&mut self, register: Register) -> Result<u8> {
        let reply = self.command(&[
            Command::RRegister.for_register(register),
            Command::Nop.opcode(),
        ])?;
        Ok(reply[1])
    }

    pub fn write_register(&mut self, register: Register, value: u8) -> Result<()> {
        log::trace!("nRF24 {register} <- 0x{value:02X}");
        self.command(&[Command::WRegister.for_register(register), value])?;
        Ok(())
    }

    /// Multi-byte register read (address registers), LSB first
    pub fn read_register_bytes(&mut self, register: Register, len: usize) -> Result<Vec<u8>> {
        let mut frame = vec![Command::Nop.opcode(); len + 1];
        frame[0] = Command::RRegister.for_register(register);
        let reply = self.command(&frame)?;
        Ok(reply[1..].to_vec())
    }

    pub fn write_register_bytes(&mut self, register: Register, bytes: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(Command::WRegister.for_register(register));
        frame.extend_from_slice(bytes);
        self.command(&frame)?;
        Ok(())
    }

    /// STATUS, read with a single NOP
    pub fn read_status(&mut self) -> Result<StatusFlags> {
        let reply = self.command(&[Command::Nop.opcode()])?;
        Ok(StatusFlags::from_bits_retain(reply[0]))
    }

    pub fn read_config(&mut self) -> Result<ConfigFlags> {
        Ok(ConfigFlags::from_bits_retain(
            self.read_register(Register::Config)?,
        ))
    }

    pub fn fifo_status(&mut self) -> Result<FifoFlags> {
        Ok(FifoFlags::from_bits_retain(
            self.read_register(Register::FifoStatus)?,
        ))
    }

    /// Read-modify-write of CONFIG
    pub fn write_config_bit(&mut self, flag: ConfigFlags, on: bool) -> Result<()> {
        let mut config = self.read_config()?;
        config.set(flag, on);
        self.write_register(Register::Config, config.bits())
    }

    pub fn power_up(&mut self) -> Result<()> {
        self.write_config_bit(ConfigFlags::PWR_UP, true)
    }

    pub fn power_down(&mut self) -> Result<()> {
        self.ce.lo()?;
        self.write_config_bit(ConfigFlags::PWR_UP, false)
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<()> {
        if channel > MAX_CHANNEL {
            return Err(ComponentError::invalid(format!(
                "channel {channel} above {MAX_CHANNEL}"
            )));
        }
        self.write_register(Register::RfCh, channel)
    }

    pub fn channel(&mut self) -> Result<u8> {
        self.read_register(Register::RfCh)
    }

    /// Static payload width for `pipe`, [0, 32]
    pub fn set_payload_size(&mut self, size: u8, pipe: u8) -> Result<()> {
        if usize::from(size) > MAX_PAYLOAD_SIZE {
            return Err(ComponentError::invalid(format!(
                "payload size {size} above {MAX_PAYLOAD_SIZE}"
            )));
        }
        let register = Register::rx_payload_width(pipe)
            .ok_or_else(|| ComponentError::invalid(format!("pipe {pipe} out of range")))?;
        self.write_register(register, size)
    }

    pub fn payload_size(&mut self, pipe: u8) -> Result<u8> {
        let register = Register::rx_payload_width(pipe)
            .ok_or_else(|| ComponentError::invalid(format!("pipe {pipe} out of range")))?;
        self.read_register(register)
    }

    fn switch_mode(&mut self, rx: bool) -> Result<()> {
        self.ce.lo()?;
        self.write_config_bit(ConfigFlags::PRIM_RX, rx)?;
        self.ce.hi()
    }

    /// Enter receive mode
    pub fn start_rx(&mut self) -> Result<()> {
        log::debug!("nRF24 entering RX");
        self.switch_mode(true)
    }

    /// Enter transmit mode
    pub fn start_tx(&mut self) -> Result<()> {
        log::debug!("nRF24 entering TX");
        self.switch_mode(false)
    }

    pub fn flush_rx(&mut self) -> Result<()> {
        self.command(&[Command::FlushRx.opcode()])?;
        Ok(())
    }

    pub fn flush_tx(&mut self) -> Result<()> {
        self.command(&[Command::FlushTx.opcode()])?;
        Ok(())
    }

    pub fn flush_all(&mut self) -> Result<()> {
        self.flush_rx()?;
        self.flush_tx()
    }

    /// Retransmit the last payload on the next CE pulse
    pub fn reuse_tx_payload(&mut self) -> Result<()> {
        self.command(&[Command::ReuseTxPl.opcode()])?;
        Ok(())
    }

    /// Width of the payload at the head of the RX FIFO
    pub fn payload_width(&mut self) -> Result<u8> {
        let reply = self.command(&[Command::RRxPlWid.opcode(), Command::Nop.opcode()])?;
        Ok(reply[1])
    }

    fn check_payload(payload: &[u8]) -> Result<()> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ComponentError::invalid(format!(
                "payload of {} bytes, expected 1-{MAX_PAYLOAD_SIZE}",
                payload.len()
            )));
        }
        Ok(())
    }

    fn load_payload(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        Self::check_payload(payload)?;
        self.flush_tx()?;
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(command.opcode());
        frame.extend_from_slice(payload);
        log_payload_hex("nRF24 TX payload", payload);
        self.command(&frame)?;
        Ok(())
    }

    /// Flush the TX FIFO, then load `payload` (1-32 bytes)
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.load_payload(Command::WTxPayload, payload)
    }

    /// As [`write_payload`](Self::write_payload) without requesting an acknowledgement
    pub fn write_payload_no_ack(&mut self, payload: &[u8]) -> Result<()> {
        self.load_payload(Command::WTxPayloadNoAck, payload)
    }

    /// Read `len` bytes from the RX FIFO and clear RX_DR
    pub fn read_data(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > MAX_PAYLOAD_SIZE {
            return Err(ComponentError::invalid(format!(
                "read of {len} bytes above {MAX_PAYLOAD_SIZE}"
            )));
        }
        let mut frame = vec![0u8; len + 1];
        frame[0] = Command::RRxPayload.opcode();
        let reply = self.command(&frame)?;
        self.write_register(Register::Status, StatusFlags::RX_DR.bits())?;
        let data = reply[1..].to_vec();
        log_payload_hex("nRF24 RX payload", &data);
        Ok(data)
    }

    pub fn is_data_ready(&mut self) -> Result<bool> {
        Ok(self.read_status()?.contains(StatusFlags::RX_DR))
    }

    /// Whether the radio is configured as primary transmitter
    pub fn is_txing(&mut self) -> Result<bool> {
        Ok(!self.read_config()?.contains(ConfigFlags::PRIM_RX))
    }

    pub fn state(&mut self) -> Result<RadioState> {
        let config = self.read_config()?;
        if !config.contains(ConfigFlags::PWR_UP) {
            return Ok(RadioState::PoweredDown);
        }
        if self.ce.value()?.is_low() {
            return Ok(RadioState::Standby);
        }
        Ok(if config.contains(ConfigFlags::PRIM_RX) {
            RadioState::Rx
        } else {
            RadioState::Tx
        })
    }

    /// Bring-up: power up, wait for the oscillator, channel 104, 32-byte
    /// payloads on pipe 0, empty FIFOs, then listen
    pub fn setup_basic(&mut self) -> Result<()> {
        self.power_up()?;
        self.delay.delay(POWER_UP_DELAY);
        self.set_channel(BASIC_CHANNEL)?;
        self.set_payload_size(MAX_PAYLOAD_SIZE as u8, 0)?;
        self.flush_all()?;
        self.start_rx()?;
        log::info!("nRF24 ready on channel {BASIC_CHANNEL}");
        Ok(())
    }

    /// Send text as one 32-byte frame, NUL padded or truncated, then enter TX
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        let mut frame = [0u8; MAX_PAYLOAD_SIZE];
        let bytes = text.as_bytes();
        let n = bytes.len().min(MAX_PAYLOAD_SIZE);
        frame[..n].copy_from_slice(&bytes[..n]);
        self.write_payload(&frame)?;
        self.start_tx()
    }

    /// Receive one 32-byte frame as text with NUL bytes dropped.
    ///
    /// Returns an empty string when no data is ready.
    pub fn read_str(&mut self) -> Result<String> {
        if !self.is_data_ready()? {
            return Ok(String::new());
        }
        let data = self.read_data(MAX_PAYLOAD_SIZE)?;
        Ok(data
            .into_iter()
            .filter(|&b| b != 0)
            .map(char::from)
            .collect())
    }

    /// Configured address width in bytes (3-5)
    pub fn address_width(&mut self) -> Result<usize> {
        match self.read_register(Register::SetupAw)? & 0x03 {
            1 => Ok(3),
            2 => Ok(4),
            _ => Ok(5),
        }
    }

    fn check_address(&mut self, address: &[u8]) -> Result<()> {
        let width = self.address_width()?;
        if address.len() != width {
            return Err(ComponentError::invalid(format!(
                "address of {} bytes, radio is set to {width}",
                address.len()
            )));
        }
        Ok(())
    }

    /// Set TX_ADDR; the slice is LSB first and must match the address width
    pub fn set_tx_address(&mut self, address: &[u8]) -> Result<()> {
        self.check_address(address)?;
        self.write_register_bytes(Register::TxAddr, address)
    }

    pub fn tx_address(&mut self) -> Result<Vec<u8>> {
        let width = self.address_width()?;
        self.read_register_bytes(Register::TxAddr, width)
    }

    /// Set a receive pipe address.
    ///
    /// Pipes 0 and 1 take a full address. Pipes 2-5 share the upper bytes of
    /// pipe 1 and take only their least significant byte.
    pub fn set_rx_address(&mut self, pipe: u8, address: &[u8]) -> Result<()> {
        let register = Register::rx_address(pipe)
            .ok_or_else(|| ComponentError::invalid(format!("pipe {pipe} out of range")))?;
        if pipe < 2 {
            self.check_address(address)?;
            self.write_register_bytes(register, address)
        } else {
            match address {
                [lsb] => self.write_register(register, *lsb),
                _ => Err(ComponentError::invalid(format!(
                    "pipe {pipe} takes a 1-byte address, got {}",
                    address.len()
                ))),
            }
        }
    }

    pub fn rx_address(&mut self, pipe: u8) -> Result<Vec<u8>> {
        let register = Register::rx_address(pipe)
            .ok_or_else(|| ComponentError::invalid(format!("pipe {pipe} out of range")))?;
        if pipe < 2 {
            let width = self.address_width()?;
            self.read_register_bytes(register, width)
        } else {
            Ok(vec![self.read_register(register)?])
        }
    }

    pub fn summary(&mut self) -> Result<RadioSummary> {
        Ok(RadioSummary {
            status: self.read_status()?,
            config: self.read_config()?,
            fifo: self.fifo_status()?,
        })
    }

    /// Decode the cause of an interrupt and acknowledge TX-side flags.
    ///
    /// TX_DS and MAX_RT are cleared here. RX_DR stays set until the payload is
    /// read with [`read_data`](Self::read_data).
    pub fn service_interrupt(&mut self) -> Result<IrqEvents> {
        let events = IrqEvents::from_status(self.read_status()?);
        let tx_side = events & (IrqEvents::DATA_SENT | IrqEvents::MAX_RETRIES);
        if !tx_side.is_empty() {
            self.write_register(Register::Status, tx_side.bits())?;
        }
        if events.contains(IrqEvents::DATA_READY) {
            log::debug!("nRF24 interrupt: data ready");
        }
        if events.contains(IrqEvents::DATA_SENT) {
            log::debug!("nRF24 interrupt: data sent");
        }
        if events.contains(IrqEvents::MAX_RETRIES) {
            log_warn("nRF24 interrupt: maximum retransmits reached");
        }
        Ok(events)
    }

    pub fn into_inner(self) -> (S, O, D) {
        (self.spi, self.ce.into_inner(), self.delay)
    }
}

/// Falling-edge notifications from the IRQ pin.
///
/// The edge handler stays installed for as long as this value lives.
pub struct IrqListener<I: EdgeLine> {
    _input: EdgeInput<I>,
    events: mpsc::UnboundedReceiver<Instant>,
}

impl<I: EdgeLine> IrqListener<I> {
    /// Wait for the next interrupt; `None` once the handler is gone
    pub async fn next(&mut self) -> Option<Instant> {
        self.events.recv().await
    }

    /// Interrupt already delivered, if any
    pub fn try_next(&mut self) -> Option<Instant> {
        self.events.try_recv().ok()
    }
}

/// Watch the active-low IRQ line
pub fn attach_interrupt<I: EdgeLine>(irq: I) -> Result<IrqListener<I>> {
    let (tx, events) = mpsc::unbounded_channel();
    let input = EdgeInput::new(irq, Edge::Falling, Duration::ZERO, move |_level| {
        let _ = tx.send(Instant::now());
    })?;
    Ok(IrqListener {
        _input: input,
        events,
    })
}
