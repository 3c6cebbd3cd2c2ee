//! Actuator positions and execution states
//!
//! Positions are 16-bit main parameter values. `0x0000..=0xC800` is an
//! absolute position (0 % to 100 %), `0xC900..=0xD0D0` a relative move around
//! `0xCCE8`, and a handful of values above that are instructions such as
//! "keep the current position".

use serde::{Deserialize, Serialize};

/// Fully open / 0 %
pub const POSITION_MIN: u16 = 0x0000;
/// Fully closed / 100 %
pub const POSITION_MAX: u16 = 0xC800;
/// Centre of the relative range
pub const POSITION_RELATIVE_ORIGIN: u16 = 0xCCE8;
/// Half width of the relative range
pub const POSITION_RELATIVE_RANGE: u16 = 1000;
/// Move to the target position
pub const POSITION_TARGET: u16 = 0xD100;
/// Keep the current position
pub const POSITION_CURRENT: u16 = 0xD200;
/// Move to the default position
pub const POSITION_DEFAULT: u16 = 0xD300;
/// Leave the parameter alone
pub const POSITION_IGNORE: u16 = 0xD400;
/// Position not known
pub const POSITION_UNKNOWN: u16 = 0xF7FF;

/// A raw main parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActuatorPosition(pub u16);

impl ActuatorPosition {
    pub const UNKNOWN: Self = Self(POSITION_UNKNOWN);

    /// Position for `percent` (clamped to 100), optionally inverted
    pub fn from_percent(percent: u8, inverted: bool) -> Self {
        let percent = u32::from(percent.min(100));
        let percent = if inverted { 100 - percent } else { percent };
        Self((percent * u32::from(POSITION_MAX) / 100) as u16)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_absolute(self) -> bool {
        (POSITION_MIN..=POSITION_MAX).contains(&self.0)
    }

    pub fn is_relative(self) -> bool {
        let low = POSITION_RELATIVE_ORIGIN - POSITION_RELATIVE_RANGE;
        let high = POSITION_RELATIVE_ORIGIN + POSITION_RELATIVE_RANGE;
        (low..=high).contains(&self.0)
    }

    pub fn is_valid(self) -> bool {
        self.is_absolute() || self.is_relative()
    }

    /// Percentage for an absolute position
    pub fn percent(self, inverted: bool) -> Option<u8> {
        if !self.is_absolute() {
            return None;
        }
        let percent = (u32::from(self.0) * 100 + u32::from(POSITION_MAX) / 2) / u32::from(POSITION_MAX);
        let percent = percent as u8;
        Some(if inverted { 100 - percent } else { percent })
    }
}

impl Default for ActuatorPosition {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl std::fmt::Display for ActuatorPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            POSITION_TARGET => write!(f, "target"),
            POSITION_CURRENT => write!(f, "current"),
            POSITION_DEFAULT => write!(f, "default"),
            POSITION_IGNORE => write!(f, "ignore"),
            POSITION_UNKNOWN => write!(f, "unknown"),
            _ => match self.percent(false) {
                Some(percent) => write!(f, "{}%", percent),
                None => write!(f, "{:#06x}", self.0),
            },
        }
    }
}

/// Execution state of an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductState {
    NonExecuting,
    Error,
    NotUsed,
    WaitingForPower,
    Executing,
    Done,
    /// Operated by hand or by a local control
    Manual,
    Unknown,
}

impl ProductState {
    pub fn from_u8(value: u8) -> Self {
        if value == 0xFF {
            return Self::Unknown;
        }
        if value & 0x80 != 0 {
            return Self::Manual;
        }
        // Vendor specific states keep the standard state in the low bits
        match value & 0x07 {
            0 => Self::NonExecuting,
            1 => Self::Error,
            2 => Self::NotUsed,
            3 => Self::WaitingForPower,
            4 => Self::Executing,
            5 => Self::Done,
            _ => Self::Unknown,
        }
    }

    /// Whether the actuator is currently moving
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Executing)
    }
}
