//! Stepper drivers.
//!
//! [`StepperDriver`] is the contract the motion scheduler drives every axis
//! through. Step-path methods (`step_cond`, `step`, `unstep`, `dir`) only touch
//! GPIO; configuration methods may talk SPI and wait for standstill and belong
//! in the command/homing context.

mod chip;
mod simple;
mod smart;
mod state;
pub mod tmc2130;

use heapless::String;

use crate::config::units::Microsteps;
use crate::endstop::Endstop;
use crate::error::DriverError;

pub use chip::{DriveStatus, SmartChip};
pub use simple::{SimpleStepperDriver, StepperPins};
pub use smart::{SmartDriverConfig, SmartStepperDriver, STANDSTILL_POLL_US};
pub use state::{DriverState, HomingBackup};
pub use tmc2130::Tmc2130;

/// Result of a driver operation.
pub type DriverResult<T> = core::result::Result<T, DriverError>;

/// Diagnostics record filled by [`StepperDriver::status`].
///
/// Field layout is relied upon by report formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverStatus {
    /// Driver label.
    pub label: String<32>,
    /// Chip version.
    pub version: u8,
    /// Connection test result (0 = ok).
    pub connection_test: u8,
    /// RMS motor current in mA.
    pub current_ma: u16,
    /// Microsteps per full step.
    pub microsteps: u16,
    /// Stallguard threshold.
    pub stallguard_threshold: i8,
    /// Live stallguard value.
    pub stallguard_result: u16,
    /// Over-temperature shutdown flag.
    pub over_temperature: bool,
    /// Over-temperature prewarning flag.
    pub over_temperature_prewarning: bool,
    /// Chip is actively driving coil current.
    pub cs_active: bool,
}

/// Capability set shared by all stepper driver variants.
pub trait StepperDriver {
    /// Endstop reference type held by the driver.
    type Endstop: Endstop;

    /// Human-readable label.
    fn label(&self) -> &str;

    /// Current direction, `true` = toward max.
    fn direction(&self) -> bool;

    /// Endstop on the min side.
    fn min_endstop(&self) -> &Self::Endstop;

    /// Endstop on the max side.
    fn max_endstop(&self) -> &Self::Endstop;

    /// Endstop gating the current direction.
    fn gating_endstop(&self) -> &Self::Endstop {
        if self.direction() {
            self.max_endstop()
        } else {
            self.min_endstop()
        }
    }

    /// One-time hardware bring-up.
    fn init(&mut self) -> DriverResult<()> {
        Ok(())
    }

    /// Step unless the gating endstop is triggered.
    ///
    /// Returns `true` when the step was **blocked**; callers must not advance
    /// their position in that case.
    fn step_cond(&mut self) -> DriverResult<bool>;

    /// Raise the step signal unconditionally.
    fn step(&mut self) -> DriverResult<()>;

    /// Lower the step signal.
    fn unstep(&mut self) -> DriverResult<()>;

    /// Set direction, `true` = toward max.
    fn dir(&mut self, d: bool) -> DriverResult<()>;

    /// Enable the motor driver.
    fn enable(&mut self) -> DriverResult<()>;

    /// Disable the motor driver.
    fn disable(&mut self) -> DriverResult<()>;

    /// Whether [`set_microsteps`](StepperDriver::set_microsteps) has an effect.
    fn implements_set_microsteps(&self) -> bool {
        false
    }

    /// Whether [`set_motor_current`](StepperDriver::set_motor_current) has an effect.
    fn implements_set_max_current(&self) -> bool {
        false
    }

    /// Set microstep resolution. No-op unless supported.
    fn set_microsteps(&mut self, _microsteps: Microsteps) -> DriverResult<()> {
        Ok(())
    }

    /// Set RMS motor current in mA. No-op unless supported.
    fn set_motor_current(&mut self, _milliamps: u16) -> DriverResult<()> {
        Ok(())
    }

    /// Set motor current as a percentage of the configured maximum. No-op unless supported.
    fn set_motor_current_percent(&mut self, _percent: u8) -> DriverResult<()> {
        Ok(())
    }

    /// Prepare for a homing move. Must be paired with [`after_homing`](StepperDriver::after_homing).
    fn before_homing(&mut self) -> DriverResult<()> {
        Ok(())
    }

    /// Undo [`before_homing`](StepperDriver::before_homing), also after an aborted homing move.
    fn after_homing(&mut self) -> DriverResult<()> {
        Ok(())
    }

    /// Fill `out` with diagnostics. `None` is a no-op.
    fn status(&mut self, out: Option<&mut DriverStatus>) -> DriverResult<()> {
        if out.is_some() {
            debug!("{}: status not implemented", self.label());
        }
        Ok(())
    }
}
