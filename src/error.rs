//! Error types for printer-io.
//!
//! Provides unified error handling across device composition, driver bring-up
//! and board resource acquisition.

use core::fmt;

use heapless::String;

use crate::config::{DeviceKind, DeviceRole};
use crate::driver::DriverState;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all printer-io operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Device table parsing, validation or composition error
    Config(ConfigError),
    /// Stepper driver or peripheral operation error
    Driver(DriverError),
    /// The board could not hand out a requested resource
    Board(String<64>),
}

/// Device table errors. All of these are raised while composing, never while running.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse the TOML device table
    ParseError(String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Device name longer than 32 characters or empty
    InvalidName(String<64>),
    /// Two entries share a name
    DuplicateDevice(String<32>),
    /// An entry references a name that is never defined
    UnknownDevice {
        /// Entry holding the reference
        device: String<32>,
        /// Referenced name
        reference: String<32>,
    },
    /// An entry references a name that is only defined later in the table
    ForwardReference {
        /// Entry holding the reference
        device: String<32>,
        /// Referenced name
        reference: String<32>,
    },
    /// An entry references a device of the wrong kind
    WrongDeviceKind {
        /// Entry holding the reference
        device: String<32>,
        /// Referenced name
        reference: String<32>,
        /// Role the referenced entry must play
        expected: DeviceRole,
        /// Kind the referenced entry actually has
        found: DeviceKind,
    },
    /// An exclusively owned resource (pin, pwm, sensor, heater) is used twice
    DeviceAlreadyClaimed {
        /// Entry attempting the second claim
        device: String<32>,
        /// Resource already owned by an earlier entry
        reference: String<32>,
    },
    /// Temperature table has fewer than two points or is not sorted by raw value
    InvalidTemperatureTable(String<32>),
    /// A fixed-capacity collection is full
    CapacityExceeded(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(String<128>),
}

/// Driver and peripheral errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// GPIO pin operation failed
    Pin,
    /// PWM output rejected a duty cycle
    Pwm,
    /// Analog sample failed
    Analog,
    /// SPI transaction failed
    Spi,
    /// Chip connection test returned a non-zero code (1 = bus reads all ones, 2 = all zeros)
    ConnectionFailed {
        /// Raw connection test result
        code: u8,
    },
    /// Chip did not report standstill within the configured timeout
    StandstillTimeout,
    /// Operation requires a `Ready` driver
    NotReady(DriverState),
    /// One or more drivers failed their startup initialization
    InitFailed {
        /// Number of drivers that failed
        count: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Driver(e) => write!(f, "Driver error: {}", e),
            Error::Board(msg) => write!(f, "Board error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidName(name) => write!(f, "Invalid device name: '{}'", name),
            ConfigError::DuplicateDevice(name) => write!(f, "Duplicate device name: '{}'", name),
            ConfigError::UnknownDevice { device, reference } => {
                write!(f, "Device '{}' references unknown device '{}'", device, reference)
            }
            ConfigError::ForwardReference { device, reference } => {
                write!(f, "Device '{}' references '{}' before it is defined", device, reference)
            }
            ConfigError::WrongDeviceKind { device, reference, expected, found } => write!(
                f,
                "Device '{}' expects '{}' to be {}, found {}",
                device, reference, expected, found
            ),
            ConfigError::DeviceAlreadyClaimed { device, reference } => {
                write!(f, "Device '{}' cannot use '{}': already owned by another device", device, reference)
            }
            ConfigError::InvalidTemperatureTable(name) => {
                write!(f, "Temperature table '{}' needs at least two points sorted by raw value", name)
            }
            ConfigError::CapacityExceeded(what) => write!(f, "Too many {}", what),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Pin => write!(f, "GPIO pin operation failed"),
            DriverError::Pwm => write!(f, "PWM duty update failed"),
            DriverError::Analog => write!(f, "Analog sample failed"),
            DriverError::Spi => write!(f, "SPI transaction failed"),
            DriverError::ConnectionFailed { code } => {
                write!(f, "SPI connection test failed with code {}", code)
            }
            DriverError::StandstillTimeout => write!(f, "Timed out waiting for motor standstill"),
            DriverError::NotReady(state) => write!(f, "Driver not ready (state {})", state),
            DriverError::InitFailed { count } => {
                write!(f, "{} driver(s) failed startup initialization", count)
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}

/// Copy as many whole characters of `text` as fit in `N` bytes.
pub(crate) fn truncate<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Truncate a name into the fixed-size string used in error payloads.
pub(crate) fn short_name(name: &str) -> String<32> {
    truncate(name)
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}
