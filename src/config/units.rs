//! Microstep resolution.

use core::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// Finest resolution a driver can be asked for.
const MAX_MICROSTEPS: u16 = 256;

/// Microsteps per full step: a power of two from 1 to 256.
///
/// Drivers encode this as a shift (`MRES` on Trinamic chips), so any other
/// value is rejected when the table is loaded rather than rounded later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Microsteps(u16);

impl Microsteps {
    /// Full step.
    pub const FULL: Self = Self(1);
    /// 1/2 step.
    pub const HALF: Self = Self(2);
    /// 1/4 step.
    pub const QUARTER: Self = Self(4);
    /// 1/8 step.
    pub const EIGHTH: Self = Self(8);
    /// 1/16 step, the usual printer setting.
    pub const SIXTEENTH: Self = Self(16);
    /// 1/32 step.
    pub const THIRTY_SECOND: Self = Self(32);
    /// 1/64 step.
    pub const SIXTY_FOURTH: Self = Self(64);
    /// 1/128 step.
    pub const ONE_TWENTY_EIGHTH: Self = Self(128);
    /// 1/256 step.
    pub const TWO_FIFTY_SIXTH: Self = Self(256);

    /// Checked constructor.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMicrosteps` unless `value` is a power of two up to 256.
    pub fn new(value: u16) -> Result<Self, ConfigError> {
        if Self::is_valid(value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMicrosteps(value))
        }
    }

    /// Microsteps per full step.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Whether `value` is an accepted resolution.
    #[inline]
    pub fn is_valid(value: u16) -> bool {
        value.is_power_of_two() && value <= MAX_MICROSTEPS
    }

    /// Shift below full resolution: 0 for 1/256 up to 8 for full step.
    #[inline]
    pub fn shift(self) -> u8 {
        (MAX_MICROSTEPS.ilog2() - self.0.ilog2()) as u8
    }
}

impl Default for Microsteps {
    fn default() -> Self {
        Self::SIXTEENTH
    }
}

impl fmt::Display for Microsteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.0)
    }
}

impl TryFrom<u16> for Microsteps {
    type Error = ConfigError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Microsteps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u16::deserialize(deserializer)?;
        Microsteps::new(value).map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Unsigned(value.into()), &"1, 2, 4 ... 256")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powers_of_two_accepted() {
        let mut value = 1;
        while value <= 256 {
            assert_eq!(Microsteps::new(value).map(Microsteps::value), Ok(value));
            value *= 2;
        }
    }

    #[test]
    fn test_other_values_rejected() {
        for value in [0, 3, 12, 17, 512] {
            assert_eq!(Microsteps::new(value), Err(ConfigError::InvalidMicrosteps(value)));
        }
    }

    #[test]
    fn test_shift_matches_mres_encoding() {
        assert_eq!(Microsteps::TWO_FIFTY_SIXTH.shift(), 0);
        assert_eq!(Microsteps::SIXTEENTH.shift(), 4);
        assert_eq!(Microsteps::FULL.shift(), 8);
    }

    #[test]
    fn test_default_and_display() {
        assert_eq!(Microsteps::default(), Microsteps::SIXTEENTH);
        assert_eq!(Microsteps::THIRTY_SECOND.to_string(), "1/32");
    }
}
