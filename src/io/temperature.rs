//! Temperature channels: oversampled analog input plus a conversion table.

use heapless::Vec;
use serde::Deserialize;

use crate::error::DriverError;

use super::pin::AnalogInput;

/// Maximum number of points in a conversion table.
pub const MAX_TABLE_POINTS: usize = 16;

/// One point of a raw-count to temperature table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TablePoint {
    /// Raw ADC count.
    pub raw: u16,
    /// Temperature at that count in °C.
    pub celsius: f32,
}

/// Piecewise-linear conversion table, sorted by ascending raw value.
pub type TemperatureTable = Vec<TablePoint, MAX_TABLE_POINTS>;

/// Interpolate a raw count on a table, clamping to the table ends.
///
/// Returns `None` for an empty table.
pub fn interpolate(table: &[TablePoint], raw: u16) -> Option<f32> {
    let first = table.first()?;
    if raw <= first.raw {
        return Some(first.celsius);
    }
    for pair in table.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if raw <= hi.raw {
            let span = f32::from(hi.raw - lo.raw);
            if span == 0.0 {
                return Some(hi.celsius);
            }
            let t = f32::from(raw - lo.raw) / span;
            return Some(lo.celsius + (hi.celsius - lo.celsius) * t);
        }
    }
    table.last().map(|p| p.celsius)
}

/// Check a table is usable: at least two points, strictly ascending raw values.
pub fn is_valid_table(table: &[TablePoint]) -> bool {
    table.len() >= 2 && table.windows(2).all(|p| p[0].raw < p[1].raw)
}

/// A temperature sensor channel.
#[derive(Debug)]
pub struct TemperatureChannel<A> {
    input: A,
    oversample: u8,
    table: TemperatureTable,
    last_raw: u16,
}

impl<A: AnalogInput> TemperatureChannel<A> {
    /// Create a channel averaging `oversample` samples per reading (at least one).
    pub fn new(input: A, oversample: u8, table: TemperatureTable) -> Self {
        Self {
            input,
            oversample: oversample.max(1),
            table,
            last_raw: 0,
        }
    }

    /// Sample the input and return the averaged raw count.
    pub fn read_raw(&mut self) -> Result<u16, DriverError> {
        let mut sum: u32 = 0;
        for _ in 0..self.oversample {
            sum += u32::from(self.input.sample().map_err(|_| DriverError::Analog)?);
        }
        self.last_raw = (sum / u32::from(self.oversample)) as u16;
        Ok(self.last_raw)
    }

    /// Sample and convert to °C.
    pub fn read_celsius(&mut self) -> Result<f32, DriverError> {
        let raw = self.read_raw()?;
        interpolate(&self.table, raw).ok_or(DriverError::Analog)
    }

    /// Raw value of the last reading.
    pub fn last_raw(&self) -> u16 {
        self.last_raw
    }
}
