//! # printer-io
//!
//! Table-driven hardware composition, endstops and stepper drivers for 3D-printer
//! controllers, on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Table-driven**: describe a board once as an ordered device table (TOML or code)
//! - **Phased composition**: declare, define, startup-init, settings-sync, settings-update
//! - **Endstops**: none, hardware switch, logical OR of two endstops
//! - **Stepper drivers**: plain step/dir/enable and TMC2130 over SPI with stall detection
//! - **no_std compatible**: fixed-capacity containers, no heap allocation during composition
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use printer_io::{Composition, MemorySettings, StepperDriver};
//!
//! let composition = Composition::from_toml(BOARD_TOML)?;
//! let endstops = composition.define_endstops(&mut board)?;
//! let mut peripherals = composition.define_peripherals(&mut board)?;
//! let mut machine = composition.define_machine(&mut board, &endstops)?;
//!
//! machine.startup_init()?;
//! machine.sync_settings(&mut MemorySettings::new())?;
//! machine.apply_update()?;
//!
//! let x = machine.stepper_mut("x_motor").unwrap();
//! x.dir(true)?;
//! if !x.step_cond()? {
//!     x.unstep()?;
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `alloc`: Enables device table deserialization for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets (instead of `log`)

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Logging shims must come first so every module sees the macros
#[macro_use]
mod fmt;

// Core modules
pub mod board;
pub mod config;
pub mod driver;
pub mod endstop;
pub mod error;
pub mod io;

// Re-exports for ergonomic API
pub use board::{
    AxisDriver, Board, Composition, Declaration, DriverSettings, Machine, MemorySettings, Peripherals,
    SettingsStore,
};
pub use config::{validate_table, DeviceEntry, DeviceKind, DeviceTable, Microsteps};
pub use driver::{
    DriverState, DriverStatus, SimpleStepperDriver, SmartChip, SmartDriverConfig, SmartStepperDriver,
    StepperDriver, Tmc2130,
};
pub use endstop::{Axis, Endstop, EndstopBank, MergedEndstop, NoEndstop, SwitchEndstop};
pub use error::{ConfigError, DriverError, Error, Result};

// Device table loading (std only)
#[cfg(feature = "std")]
pub use config::{load_table, parse_table};
