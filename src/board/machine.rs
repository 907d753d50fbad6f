//! The composed set of stepper drivers and tools.

use heapless::Vec;

use crate::config::units::Microsteps;
use crate::config::{DeviceName, ToolExtruderConfig};
use crate::driver::{DriverResult, DriverStatus, StepperDriver};
use crate::error::{ConfigError, Result};

use super::settings::{DriverSettings, SettingsStore};
use super::{Board, BoardEndstop, BoardSimpleDriver, BoardSmartDriver};

/// Maximum number of stepper drivers on one machine.
pub const MAX_AXES: usize = 8;
/// Maximum number of tools on one machine.
pub const MAX_TOOLS: usize = 4;

/// A stepper driver of any supported variant.
///
/// The motion loop drives every axis through [`StepperDriver`]; dispatch is a
/// `match`, so no driver is boxed.
pub enum AxisDriver<'a, B: Board> {
    /// Step/dir/enable driver
    Simple(BoardSimpleDriver<'a, B>),
    /// TMC2130 driver
    Smart(BoardSmartDriver<'a, B>),
}

macro_rules! dispatch {
    ($driver:expr, $d:ident => $body:expr) => {
        match $driver {
            AxisDriver::Simple($d) => $body,
            AxisDriver::Smart($d) => $body,
        }
    };
}

impl<'a, B: Board> AxisDriver<'a, B> {
    /// Whether this is a register-programmable driver.
    pub fn is_smart(&self) -> bool {
        matches!(self, AxisDriver::Smart(_))
    }

    /// The TMC2130 driver, if this is one.
    pub fn as_smart(&self) -> Option<&BoardSmartDriver<'a, B>> {
        match self {
            AxisDriver::Smart(d) => Some(d),
            AxisDriver::Simple(_) => None,
        }
    }

    /// Mutable TMC2130 driver, if this is one.
    pub fn as_smart_mut(&mut self) -> Option<&mut BoardSmartDriver<'a, B>> {
        match self {
            AxisDriver::Smart(d) => Some(d),
            AxisDriver::Simple(_) => None,
        }
    }
}

impl<'a, B: Board> StepperDriver for AxisDriver<'a, B> {
    type Endstop = BoardEndstop<'a, B>;

    #[inline]
    fn label(&self) -> &str {
        dispatch!(self, d => d.label())
    }

    #[inline]
    fn direction(&self) -> bool {
        dispatch!(self, d => d.direction())
    }

    #[inline]
    fn min_endstop(&self) -> &Self::Endstop {
        dispatch!(self, d => d.min_endstop())
    }

    #[inline]
    fn max_endstop(&self) -> &Self::Endstop {
        dispatch!(self, d => d.max_endstop())
    }

    fn init(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.init())
    }

    #[inline]
    fn step_cond(&mut self) -> DriverResult<bool> {
        dispatch!(self, d => d.step_cond())
    }

    #[inline]
    fn step(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.step())
    }

    #[inline]
    fn unstep(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.unstep())
    }

    #[inline]
    fn dir(&mut self, direction: bool) -> DriverResult<()> {
        dispatch!(self, d => d.dir(direction))
    }

    #[inline]
    fn enable(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.enable())
    }

    #[inline]
    fn disable(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.disable())
    }

    fn implements_set_microsteps(&self) -> bool {
        dispatch!(self, d => d.implements_set_microsteps())
    }

    fn implements_set_max_current(&self) -> bool {
        dispatch!(self, d => d.implements_set_max_current())
    }

    fn set_microsteps(&mut self, microsteps: Microsteps) -> DriverResult<()> {
        dispatch!(self, d => d.set_microsteps(microsteps))
    }

    fn set_motor_current(&mut self, milliamps: u16) -> DriverResult<()> {
        dispatch!(self, d => d.set_motor_current(milliamps))
    }

    fn set_motor_current_percent(&mut self, percent: u8) -> DriverResult<()> {
        dispatch!(self, d => d.set_motor_current_percent(percent))
    }

    fn before_homing(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.before_homing())
    }

    fn after_homing(&mut self) -> DriverResult<()> {
        dispatch!(self, d => d.after_homing())
    }

    fn status(&mut self, out: Option<&mut DriverStatus>) -> DriverResult<()> {
        dispatch!(self, d => d.status(out))
    }
}

/// One named driver of the machine plus its adjustable settings.
pub struct MachineAxis<'a, B: Board> {
    name: DeviceName,
    driver: AxisDriver<'a, B>,
    settings: DriverSettings,
}

impl<'a, B: Board> MachineAxis<'a, B> {
    pub(crate) fn new(name: DeviceName, driver: AxisDriver<'a, B>, settings: DriverSettings) -> Self {
        Self { name, driver, settings }
    }

    /// Device table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The driver.
    pub fn driver(&self) -> &AxisDriver<'a, B> {
        &self.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut AxisDriver<'a, B> {
        &mut self.driver
    }

    /// Settings applied by [`Machine::apply_update`].
    pub fn settings(&self) -> DriverSettings {
        self.settings
    }

    /// Change the settings. Takes effect on the next [`Machine::apply_update`].
    pub fn set_settings(&mut self, settings: DriverSettings) {
        self.settings = settings;
    }

    /// Whether the driver has run-time adjustable settings.
    pub fn supports_settings(&self) -> bool {
        self.driver.implements_set_max_current() || self.driver.implements_set_microsteps()
    }

    fn apply_settings(&mut self) -> DriverResult<()> {
        if self.driver.implements_set_max_current() {
            self.driver.set_motor_current(self.settings.current_ma)?;
        }
        if self.driver.implements_set_microsteps() {
            self.driver.set_microsteps(self.settings.microsteps)?;
        }
        Ok(())
    }
}

/// Resolved wiring of an extruder tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolWiring {
    /// Tool parameters.
    pub config: ToolExtruderConfig,
}

impl ToolWiring {
    /// Tool name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Heat manager feeding the nozzle.
    pub fn heater(&self) -> &str {
        &self.config.heater
    }

    /// Stepper feeding filament.
    pub fn stepper(&self) -> &str {
        &self.config.stepper
    }
}

/// All stepper drivers and tools of a board.
///
/// Drivers hold [`EndstopHandle`](crate::endstop::EndstopHandle)s, so a machine
/// borrows the endstop bank it was defined from.
pub struct Machine<'a, B: Board> {
    axes: Vec<MachineAxis<'a, B>, MAX_AXES>,
    tools: Vec<ToolWiring, MAX_TOOLS>,
}

impl<'a, B: Board> Default for Machine<'a, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, B: Board> Machine<'a, B> {
    /// Create an empty machine.
    pub fn new() -> Self {
        Self { axes: Vec::new(), tools: Vec::new() }
    }

    pub(crate) fn push_axis(&mut self, axis: MachineAxis<'a, B>) -> core::result::Result<(), ConfigError> {
        self.axes
            .push(axis)
            .map_err(|_| ConfigError::CapacityExceeded("steppers"))
    }

    pub(crate) fn push_tool(&mut self, tool: ToolWiring) -> core::result::Result<(), ConfigError> {
        self.tools
            .push(tool)
            .map_err(|_| ConfigError::CapacityExceeded("tools"))
    }

    /// Get a driver by name.
    pub fn stepper(&self, name: &str) -> Option<&AxisDriver<'a, B>> {
        self.axis(name).map(|a| &a.driver)
    }

    /// Get a driver by name, mutably.
    pub fn stepper_mut(&mut self, name: &str) -> Option<&mut AxisDriver<'a, B>> {
        self.axis_mut(name).map(|a| &mut a.driver)
    }

    /// Get an axis record by name.
    pub fn axis(&self, name: &str) -> Option<&MachineAxis<'a, B>> {
        self.axes.iter().find(|a| a.name.as_str() == name)
    }

    /// Get an axis record by name, mutably.
    pub fn axis_mut(&mut self, name: &str) -> Option<&mut MachineAxis<'a, B>> {
        self.axes.iter_mut().find(|a| a.name.as_str() == name)
    }

    /// Axis records in definition order.
    pub fn axes(&self) -> impl Iterator<Item = &MachineAxis<'a, B>> {
        self.axes.iter()
    }

    /// Axis records in definition order, mutably.
    pub fn axes_mut(&mut self) -> impl Iterator<Item = &mut MachineAxis<'a, B>> {
        self.axes.iter_mut()
    }

    /// List all driver names.
    pub fn stepper_names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|a| a.name.as_str())
    }

    /// Number of drivers.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// Whether the machine has no drivers.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Tools in definition order.
    pub fn tools(&self) -> &[ToolWiring] {
        &self.tools
    }

    /// Get a tool by name.
    pub fn tool(&self, name: &str) -> Option<&ToolWiring> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Driver feeding a tool.
    pub fn tool_stepper_mut(&mut self, tool: &str) -> Option<&mut AxisDriver<'a, B>> {
        let stepper = self.tool(tool)?.config.stepper.clone();
        self.stepper_mut(&stepper)
    }

    /// Run `init()` on every driver.
    ///
    /// Every driver is tried even after a failure; each failure is logged
    /// with its name.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::InitFailed` with the number of failed drivers.
    pub fn startup_init(&mut self) -> DriverResult<()> {
        let mut failed = 0;
        for axis in self.axes.iter_mut() {
            if let Err(e) = axis.driver.init() {
                error!("{}: initialization failed: {}", axis.name.as_str(), e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(crate::error::DriverError::InitFailed { count: failed });
        }
        info!("{} stepper driver(s) initialized", self.axes.len());
        Ok(())
    }

    /// Pull persisted settings into every driver that has any; seed the store
    /// with the configured values for drivers it does not know yet.
    ///
    /// Drivers without adjustable settings are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot save a seeded entry.
    pub fn sync_settings<S: SettingsStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        for axis in self.axes.iter_mut() {
            if !axis.supports_settings() {
                continue;
            }
            match store.load(&axis.name) {
                Some(saved) => {
                    debug!("{}: loaded stored settings", axis.name.as_str());
                    axis.settings = saved;
                }
                None => store.save(&axis.name, &axis.settings)?,
            }
        }
        Ok(())
    }

    /// Write every driver's settings to the hardware.
    ///
    /// All drivers are updated even after a failure.
    ///
    /// # Errors
    ///
    /// Returns the first driver error encountered.
    pub fn apply_update(&mut self) -> DriverResult<()> {
        let mut first = None;
        for axis in self.axes.iter_mut() {
            if let Err(e) = axis.apply_settings() {
                warn!("{}: settings update failed: {}", axis.name.as_str(), e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}
