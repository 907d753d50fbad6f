//! Device table validation.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::error::{short_name, ConfigError, Error, Result};
use crate::io::temperature::is_valid_table;

use super::devices::DeviceEntry;
use super::table::{DeviceTable, MAX_DEVICES};

/// Validate a device table.
///
/// Checks, entry by entry in definition order:
/// - Names are non-empty and unique
/// - Every reference names an entry defined earlier, of an accepted kind
/// - Exclusively owned entries and board pins are claimed at most once
/// - Temperature tables have at least two points sorted by raw count
pub fn validate_table(table: &DeviceTable) -> Result<()> {
    let entries = table.entries();
    let mut claimed: Vec<&str, MAX_DEVICES> = Vec::new();
    let mut pins: Vec<u8, MAX_DEVICES> = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let name = entry.name();
        if name.is_empty() {
            return Err(Error::Config(ConfigError::InvalidName(String::new())));
        }
        if entries[..index].iter().any(|e| e.name() == name) {
            return Err(Error::Config(ConfigError::DuplicateDevice(short_name(name))));
        }

        for reference in entry.references() {
            let target = match entries[..index].iter().find(|e| e.name() == reference.name) {
                Some(target) => target,
                None if entries[index..].iter().any(|e| e.name() == reference.name) => {
                    return Err(Error::Config(ConfigError::ForwardReference {
                        device: short_name(name),
                        reference: short_name(reference.name),
                    }));
                }
                None => {
                    return Err(Error::Config(ConfigError::UnknownDevice {
                        device: short_name(name),
                        reference: short_name(reference.name),
                    }));
                }
            };

            if !reference.role.accepts(target.kind()) {
                return Err(Error::Config(ConfigError::WrongDeviceKind {
                    device: short_name(name),
                    reference: short_name(reference.name),
                    expected: reference.role,
                    found: target.kind(),
                }));
            }

            if reference.claims {
                if claimed.contains(&reference.name) {
                    return Err(Error::Config(ConfigError::DeviceAlreadyClaimed {
                        device: short_name(name),
                        reference: short_name(reference.name),
                    }));
                }
                claimed
                    .push(reference.name)
                    .map_err(|_| Error::Config(ConfigError::CapacityExceeded("claims")))?;
            }
        }

        if let Some(pin) = entry.hardware_pin() {
            if pins.contains(&pin) {
                let mut label = String::new();
                let _ = write!(label, "pin {}", pin);
                return Err(Error::Config(ConfigError::DeviceAlreadyClaimed {
                    device: short_name(name),
                    reference: label,
                }));
            }
            pins.push(pin)
                .map_err(|_| Error::Config(ConfigError::CapacityExceeded("pins")))?;
        }

        validate_entry(entry)?;
    }

    Ok(())
}

fn validate_entry(entry: &DeviceEntry) -> Result<()> {
    if let DeviceEntry::TemperatureTable(table) = entry {
        if !is_valid_table(&table.points) {
            return Err(Error::Config(ConfigError::InvalidTemperatureTable(table.name.clone())));
        }
    }
    Ok(())
}
