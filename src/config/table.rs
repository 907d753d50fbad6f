//! Device table - root configuration structure.

use heapless::Vec;
#[cfg(any(feature = "std", feature = "alloc"))]
use serde::Deserialize;

use crate::error::ConfigError;

use super::devices::DeviceEntry;

/// Maximum number of entries in a device table.
pub const MAX_DEVICES: usize = 64;

/// Ordered list of device entries describing one board.
///
/// Order matters: an entry may only reference entries listed before it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct DeviceTable {
    /// Entries in definition order.
    pub devices: Vec<DeviceEntry, MAX_DEVICES>,
}

impl DeviceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { devices: Vec::new() }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CapacityExceeded` when the table is full.
    pub fn push(&mut self, entry: DeviceEntry) -> Result<(), ConfigError> {
        self.devices
            .push(entry)
            .map_err(|_| ConfigError::CapacityExceeded("devices"))
    }

    /// Builder-style [`push`](DeviceTable::push).
    pub fn with(mut self, entry: DeviceEntry) -> Result<Self, ConfigError> {
        self.push(entry)?;
        Ok(self)
    }

    /// Entries in definition order.
    pub fn entries(&self) -> &[DeviceEntry] {
        &self.devices
    }

    /// Iterate entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices.iter()
    }

    /// Get an entry by name.
    pub fn get(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|d| d.name() == name)
    }

    /// Position of an entry by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.name() == name)
    }

    /// Entry holding an exclusive claim on `name`, if any.
    pub fn claimant(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices
            .iter()
            .find(|d| d.references().iter().any(|r| r.claims && r.name == name))
    }

    /// List all entry names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
