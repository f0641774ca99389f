//! # Hex Helpers
//!
//! Formatting and parsing helpers for bus traffic: SPI frames in trace logs,
//! radio payloads and EEPROM dumps on the command line.
//!
//! ```rust
//! use rpi_components::util::hex::{decode_hex, format_hex_compact};
//!
//! let bytes = decode_hex("0a 60 00").unwrap();
//! assert_eq!(bytes, vec![0x0a, 0x60, 0x00]);
//! assert_eq!(format_hex_compact(&bytes), "0a 60 00");
//! ```

use thiserror::Error;

/// Errors raised while parsing hex text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Lowercase hex without separators
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex text, ignoring whitespace between digits
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Space separated byte list, e.g. `"a0 01 ff"`
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Offset-prefixed dump with an ASCII column.
///
/// `base` is the address printed for the first byte, so EEPROM dumps show
/// device addresses rather than buffer offsets.
pub fn pretty_hex(data: &[u8], base: usize, bytes_per_line: usize) -> String {
    let width = bytes_per_line.max(1);
    data.chunks(width)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{:04x}: {:<pad$} |{}|",
                base + i * width,
                hex.join(" "),
                ascii,
                pad = width * 3 - 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
