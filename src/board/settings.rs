//! Persisted driver settings.
//!
//! The persistence medium (EEPROM, flash page, file) is outside this crate;
//! [`SettingsStore`] is the seam it plugs into.

use heapless::{FnvIndexMap, String};

use crate::config::units::Microsteps;
use crate::error::{short_name, ConfigError};

/// Run-time adjustable settings of one stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverSettings {
    /// RMS motor current in mA.
    pub current_ma: u16,
    /// Microsteps per full step.
    pub microsteps: Microsteps,
}

/// Storage for driver settings, keyed by driver name.
pub trait SettingsStore {
    /// Persisted settings for `name`, if any.
    fn load(&self, name: &str) -> Option<DriverSettings>;

    /// Persist settings for `name`.
    fn save(&mut self, name: &str, settings: &DriverSettings) -> Result<(), ConfigError>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for &mut T {
    fn load(&self, name: &str) -> Option<DriverSettings> {
        T::load(self, name)
    }

    fn save(&mut self, name: &str, settings: &DriverSettings) -> Result<(), ConfigError> {
        T::save(self, name, settings)
    }
}

/// Maximum number of drivers a [`MemorySettings`] store holds.
pub const MAX_STORED_SETTINGS: usize = 8;

/// Fixed-capacity in-memory settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    entries: FnvIndexMap<String<32>, DriverSettings, MAX_STORED_SETTINGS>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self { entries: FnvIndexMap::new() }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self, name: &str) -> Option<DriverSettings> {
        // keys are stored truncated, so look them up the same way
        self.entries.get(&short_name(name)).copied()
    }

    fn save(&mut self, name: &str, settings: &DriverSettings) -> Result<(), ConfigError> {
        self.entries
            .insert(short_name(name), *settings)
            .map(|_| ())
            .map_err(|_| ConfigError::CapacityExceeded("stored settings"))
    }
}
