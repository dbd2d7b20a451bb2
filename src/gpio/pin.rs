use serde::Deserialize;
use std::fmt;

/// Hardware pin number as printed on the board.
pub type PinId = u8;

/// Whether a pin is sampled from hardware or driven by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// A single configured digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub id: PinId,
    pub direction: Direction,
    /// Logical level, always 0 or 1
    pub value: u8,
}

impl Pin {
    pub fn new(id: PinId, direction: Direction, value: u8) -> Self {
        Self {
            id,
            direction,
            value: normalize(value),
        }
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn reading(&self) -> PinReading {
        PinReading {
            id: self.id,
            value: self.value,
        }
    }
}

/// One entry of a registry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinReading {
    pub id: PinId,
    pub value: u8,
}

/// Misuse of the registry API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// No pin with this id was configured
    NotFound(PinId),
    /// The operation does not match the pin's direction
    InvalidDirection(PinId),
    /// The hardware rejected a write
    Driver(PinId),
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::NotFound(id) => write!(f, "pin {} is not configured", id),
            PinError::InvalidDirection(id) => {
                write!(f, "pin {} does not support this operation in its direction", id)
            }
            PinError::Driver(id) => write!(f, "pin {} could not be written", id),
        }
    }
}

impl std::error::Error for PinError {}

/// Any non-zero level reads as high.
pub(crate) fn normalize(value: u8) -> u8 {
    if value == 0 { 0 } else { 1 }
}
