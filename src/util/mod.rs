//! # Utility Modules
//!
//! Small helpers shared by the drivers: tolerance-window averaging for the
//! rangefinder, hex formatting for bus traces and log rate limiting for
//! background loops.

pub mod hex;
pub mod logging;
pub mod tolerance;

pub use hex::{decode_hex, encode_hex, format_hex_compact, pretty_hex, HexError};
pub use logging::{log_payload_hex, LogThrottle};
pub use tolerance::{consensus_average, is_within_tolerance};
