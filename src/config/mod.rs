//! Device table configuration.
//!
//! A board is described by one ordered [`DeviceTable`], loaded from TOML
//! (with `std` feature) or built in code, and checked once by
//! [`validate_table`] before anything is instantiated.

pub mod devices;
mod table;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use devices::{
    AnalogInputConfig, DeviceEntry, DeviceKind, DeviceName, DeviceRole, EndstopMergeConfig, EndstopNoneConfig,
    EndstopSwitchConfig, HeatManagerConfig, InputConfig, OutputConfig, PwmHardwareConfig, PwmKickstartConfig,
    PwmSoftwareConfig, Reference, StepperSimpleConfig, StepperTmc2130Config, TemperatureConfig,
    TemperatureTableConfig, ToolExtruderConfig,
};
pub use table::{DeviceTable, MAX_DEVICES};
pub use validation::validate_table;

#[cfg(feature = "std")]
pub use loader::{load_table, parse_table};
#[cfg(feature = "std")]
pub(crate) use loader::decode_table;

pub use units::Microsteps;
