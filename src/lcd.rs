//! # 1602 Character LCD (4-bit interface)
//!
//! Driver for HD44780-compatible 16x2 displays wired with enable, read/write,
//! register-select and four data lines (D4-D7).
//!
//! ## Write cycle
//!
//! ```text
//! settle 10 ms
//! RS = character ? 1 : 0
//! D4..D7 = high nibble, EN 1 -> 0
//! D4..D7 = low nibble,  EN 1 -> 0
//! ```
//!
//! `data[i]` carries bit `i` of the nibble, so `data[0]` is wired to D4.
//!
//! ## Usage
//!
//! ```rust
//! use rpi_components::hal::mock::MockBoard;
//! use rpi_components::lcd::Lcd1602;
//!
//! let board = MockBoard::new();
//! let data = [
//!     board.output(25).unwrap(),
//!     board.output(24).unwrap(),
//!     board.output(23).unwrap(),
//!     board.output(18).unwrap(),
//! ];
//! let mut lcd = Lcd1602::new(
//!     board.output(22).unwrap(),
//!     board.output(4).unwrap(),
//!     board.output(27).unwrap(),
//!     data,
//!     board.delay(),
//! )
//! .unwrap();
//! lcd.write_str("Hello\nworld", false).unwrap();
//! ```

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::hal::{Delay, Level, OutputLine};
use crate::logic::ToggleOutput;
use std::time::Duration;

/// Characters per line
pub const COLUMNS: usize = 16;
/// Display lines
pub const ROWS: usize = 2;

/// Move the cursor to the start of the second line
pub const CMD_SECOND_LINE: u8 = 0xC0;

/// Reset sequence: 4-bit mode, two lines, display on, entry mode, clear
pub const INIT_SEQUENCE: [u8; 6] = [0x33, 0x32, 0x28, 0x0C, 0x06, 0x01];

const SETTLE: Duration = Duration::from_millis(10);

/// Scroll direction for [`Lcd1602::marquee`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarqueeDirection {
    #[default]
    Left,
    Right,
}

/// How a marquee run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarqueeOutcome {
    /// The text rotated back to its starting position
    Completed,
    /// The cancellation token fired
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct MarqueeOptions {
    /// Time between redraws
    pub interval: Duration,
    pub direction: MarqueeDirection,
    /// Keep scrolling until cancelled instead of stopping after one full rotation
    pub repeat: bool,
}

impl Default for MarqueeOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            direction: MarqueeDirection::Left,
            repeat: true,
        }
    }
}

pub struct Lcd1602<O: OutputLine, D: Delay> {
    enable: ToggleOutput<O>,
    read_write: ToggleOutput<O>,
    register_select: ToggleOutput<O>,
    data: [ToggleOutput<O>; 4],
    delay: D,
}

impl<O: OutputLine, D: Delay> Lcd1602<O, D> {
    /// Drive every line low and run the reset sequence
    pub fn new(enable: O, read_write: O, register_select: O, data: [O; 4], delay: D) -> Result<Self> {
        let mut lcd = Self {
            enable: ToggleOutput::new(enable),
            read_write: ToggleOutput::new(read_write),
            register_select: ToggleOutput::new(register_select),
            data: data.map(ToggleOutput::new),
            delay,
        };
        lcd.enable.lo()?;
        lcd.read_write.lo()?;
        lcd.register_select.lo()?;
        for line in lcd.data.iter_mut() {
            line.lo()?;
        }
        lcd.clear()?;
        Ok(lcd)
    }

    fn put_nibble(&mut self, nibble: u8) -> Result<()> {
        for (bit, line) in self.data.iter_mut().enumerate() {
            line.set(Level::from((nibble >> bit) & 1 == 1))?;
        }
        self.enable.hi()?;
        self.enable.lo()
    }

    /// Send one byte as a command (`is_char == false`) or character
    pub fn write(&mut self, byte: u8, is_char: bool) -> Result<()> {
        self.delay.delay(SETTLE);
        self.register_select.set(Level::from(is_char))?;
        self.put_nibble(byte >> 4)?;
        self.put_nibble(byte & 0x0F)
    }

    pub fn write_command(&mut self, command: u8) -> Result<()> {
        self.write(command, false)
    }

    /// Display one character; anything outside Latin-1 shows as `?`
    pub fn write_char(&mut self, c: char) -> Result<()> {
        let byte = u8::try_from(u32::from(c)).unwrap_or(b'?');
        self.write(byte, true)
    }

    /// Reset the controller and clear the screen
    pub fn clear(&mut self) -> Result<()> {
        for command in INIT_SEQUENCE {
            self.write_command(command)?;
        }
        Ok(())
    }

    /// Write up to 32 characters.
    ///
    /// A `'\n'` moves to the second line. With `wrap`, the cursor also moves to
    /// the second line after the 16th character.
    pub fn write_str(&mut self, text: &str, wrap: bool) -> Result<()> {
        for (count, c) in text.chars().take(COLUMNS * ROWS).enumerate() {
            if c == '\n' {
                self.write_command(CMD_SECOND_LINE)?;
            } else {
                self.write_char(c)?;
            }
            if wrap && count + 1 == COLUMNS {
                self.write_command(CMD_SECOND_LINE)?;
            }
        }
        Ok(())
    }

    /// Scroll `text` across the first line.
    ///
    /// Text shorter than 16 characters is padded with spaces. Each frame clears
    /// the display, draws the current rotation and waits `interval`. Without
    /// `repeat` the loop ends, leaving the display cleared, once the text is
    /// back at its starting rotation. Cancellation is honoured between frames
    /// and during the wait.
    pub async fn marquee(
        &mut self,
        text: &str,
        options: MarqueeOptions,
        mut cancel: CancelToken,
    ) -> Result<MarqueeOutcome> {
        let mut line: Vec<char> = text.chars().collect();
        if line.len() < COLUMNS {
            line.resize(COLUMNS, ' ');
        }
        let original = line.clone();

        loop {
            if cancel.is_cancelled() {
                log::info!("Marquee cancelled");
                return Ok(MarqueeOutcome::Cancelled);
            }

            self.clear()?;
            let frame: String = line.iter().collect();
            self.write_str(&frame, false)?;

            match options.direction {
                MarqueeDirection::Left => line.rotate_left(1),
                MarqueeDirection::Right => line.rotate_right(1),
            }

            tokio::select! {
                _ = tokio::time::sleep(options.interval) => {}
                _ = cancel.cancelled() => {
                    log::info!("Marquee cancelled");
                    return Ok(MarqueeOutcome::Cancelled);
                }
            }

            if !options.repeat && line == original {
                self.clear()?;
                return Ok(MarqueeOutcome::Completed);
            }
        }
    }
}
