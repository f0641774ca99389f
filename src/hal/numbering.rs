//! Pin numbering schemes.
//!
//! Pins can be addressed by their physical position on the 40-pin header
//! (BOARD numbering) or by the SoC GPIO number (BCM numbering). Every platform
//! implementation works in BCM numbers internally; [`Pin::to_bcm`] performs the
//! translation.

use super::HalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header position to BCM GPIO number, indexed by physical pin number.
/// `None` marks power and ground pins.
const BOARD_TO_BCM: [Option<u8>; 41] = [
    None,     // 0 (unused)
    None,     // 1  3V3
    None,     // 2  5V
    Some(2),  // 3
    None,     // 4  5V
    Some(3),  // 5
    None,     // 6  GND
    Some(4),  // 7
    Some(14), // 8
    None,     // 9  GND
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14 GND
    Some(22), // 15
    Some(23), // 16
    None,     // 17 3V3
    Some(24), // 18
    Some(10), // 19
    None,     // 20 GND
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25 GND
    Some(7),  // 26
    Some(0),  // 27 ID_SD
    Some(1),  // 28 ID_SC
    Some(5),  // 29
    None,     // 30 GND
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34 GND
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39 GND
    Some(21), // 40
];

/// Highest BCM GPIO number exposed on the 40-pin header
pub const MAX_BCM_GPIO: u8 = 27;

/// Pin numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    /// SoC-native GPIO numbers
    #[default]
    Bcm,
    /// Physical position on the 40-pin header
    Board,
}

impl fmt::Display for Numbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numbering::Bcm => write!(f, "BCM"),
            Numbering::Board => write!(f, "BOARD"),
        }
    }
}

/// A logical pin address under a numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    pub number: u8,
    pub numbering: Numbering,
}

impl Pin {
    pub fn new(number: u8, numbering: Numbering) -> Self {
        Self { number, numbering }
    }

    pub fn bcm(number: u8) -> Self {
        Self::new(number, Numbering::Bcm)
    }

    pub fn board(number: u8) -> Self {
        Self::new(number, Numbering::Board)
    }

    /// Resolve to the BCM GPIO number, rejecting non-GPIO positions
    pub fn to_bcm(self) -> Result<u8, HalError> {
        let invalid = HalError::InvalidPin {
            pin: self.number,
            numbering: self.numbering,
        };
        match self.numbering {
            Numbering::Bcm if self.number <= MAX_BCM_GPIO => Ok(self.number),
            Numbering::Bcm => Err(invalid),
            Numbering::Board => BOARD_TO_BCM
                .get(self.number as usize)
                .copied()
                .flatten()
                .ok_or(invalid),
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.numbering, self.number)
    }
}
