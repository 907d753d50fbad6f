//! Device table loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{truncate, ConfigError, Error, Result};

use super::DeviceTable;

/// Load a device table from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use printer_io::load_table;
///
/// let table = load_table("board.toml")?;
/// ```
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<DeviceTable> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::Config(ConfigError::IoError(truncate(&e.to_string())))
    })?;

    parse_table(&content)
}

/// Parse a device table from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_table(content: &str) -> Result<DeviceTable> {
    let table = decode_table(content)?;

    super::validation::validate_table(&table)?;
    info!("device table: {} entries", table.len());

    Ok(table)
}

/// Deserialize a device table without validating it.
pub(crate) fn decode_table(content: &str) -> Result<DeviceTable> {
    toml::from_str(content).map_err(|e| Error::Config(ConfigError::ParseError(truncate(e.message()))))
}
