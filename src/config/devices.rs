//! Device table entries.
//!
//! One entry per physical or logical device, in definition order. Entries
//! refer to other entries by name; [`DeviceEntry::references`] lists those
//! references together with the role the target must play and whether the
//! target becomes exclusively owned.

use core::fmt;

use heapless::{String, Vec};
#[cfg(any(feature = "std", feature = "alloc"))]
use serde::Deserialize;

use crate::driver::SmartDriverConfig;
use crate::endstop::Axis;
use crate::io::TemperatureTable;

use super::units::Microsteps;

/// Name of a device entry.
pub type DeviceName = String<32>;

/// Maximum number of references a single entry can hold.
pub const MAX_REFERENCES: usize = 6;

/// Kind tag of a device entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    /// Digital output pin
    Output,
    /// Digital input pin
    Input,
    /// Analog input pin
    AnalogInput,
    /// Endstop that never triggers
    EndstopNone,
    /// Endstop on a digital input
    EndstopSwitch,
    /// Logical OR of two endstops
    EndstopMerge,
    /// Software PWM on a digital output
    PwmSoftware,
    /// Hardware PWM channel
    PwmHardware,
    /// Kickstart wrapper around a PWM channel
    PwmKickstart,
    /// Raw-count to temperature table
    TemperatureTable,
    /// Temperature sensor
    Temperature,
    /// Step/dir/enable stepper driver
    StepperSimple,
    /// TMC2130 SPI stepper driver
    StepperTmc2130,
    /// Heater wiring (sensor plus PWM output)
    HeatManager,
    /// Extruder tool
    ToolExtruder,
}

impl DeviceKind {
    /// Tag used in the device table.
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Output => "output",
            DeviceKind::Input => "input",
            DeviceKind::AnalogInput => "analog_input",
            DeviceKind::EndstopNone => "endstop_none",
            DeviceKind::EndstopSwitch => "endstop_switch",
            DeviceKind::EndstopMerge => "endstop_merge",
            DeviceKind::PwmSoftware => "pwm_software",
            DeviceKind::PwmHardware => "pwm_hardware",
            DeviceKind::PwmKickstart => "pwm_kickstart",
            DeviceKind::TemperatureTable => "temperature_table",
            DeviceKind::Temperature => "temperature",
            DeviceKind::StepperSimple => "stepper_simple",
            DeviceKind::StepperTmc2130 => "stepper_tmc2130",
            DeviceKind::HeatManager => "heat_manager",
            DeviceKind::ToolExtruder => "tool_extruder",
        }
    }

    /// Whether this kind is an endstop.
    pub fn is_endstop(self) -> bool {
        matches!(
            self,
            DeviceKind::EndstopNone | DeviceKind::EndstopSwitch | DeviceKind::EndstopMerge
        )
    }

    /// Whether this kind is a PWM channel.
    pub fn is_pwm(self) -> bool {
        matches!(
            self,
            DeviceKind::PwmSoftware | DeviceKind::PwmHardware | DeviceKind::PwmKickstart
        )
    }

    /// Whether this kind is a stepper driver.
    pub fn is_stepper(self) -> bool {
        matches!(self, DeviceKind::StepperSimple | DeviceKind::StepperTmc2130)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role a referenced entry must play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceRole {
    /// `output`
    Output,
    /// `input`
    Input,
    /// `analog_input`
    AnalogInput,
    /// any endstop
    Endstop,
    /// `pwm_software` or `pwm_hardware`
    BasePwm,
    /// any PWM channel
    Pwm,
    /// `temperature_table`
    TemperatureTable,
    /// `temperature`
    Temperature,
    /// any stepper driver
    Stepper,
    /// `heat_manager`
    HeatManager,
}

impl DeviceRole {
    /// Whether an entry of `kind` can fill this role.
    pub fn accepts(self, kind: DeviceKind) -> bool {
        match self {
            DeviceRole::Output => kind == DeviceKind::Output,
            DeviceRole::Input => kind == DeviceKind::Input,
            DeviceRole::AnalogInput => kind == DeviceKind::AnalogInput,
            DeviceRole::Endstop => kind.is_endstop(),
            DeviceRole::BasePwm => matches!(kind, DeviceKind::PwmSoftware | DeviceKind::PwmHardware),
            DeviceRole::Pwm => kind.is_pwm(),
            DeviceRole::TemperatureTable => kind == DeviceKind::TemperatureTable,
            DeviceRole::Temperature => kind == DeviceKind::Temperature,
            DeviceRole::Stepper => kind.is_stepper(),
            DeviceRole::HeatManager => kind == DeviceKind::HeatManager,
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeviceRole::Output => "an output",
            DeviceRole::Input => "an input",
            DeviceRole::AnalogInput => "an analog input",
            DeviceRole::Endstop => "an endstop",
            DeviceRole::BasePwm => "a software or hardware pwm",
            DeviceRole::Pwm => "a pwm",
            DeviceRole::TemperatureTable => "a temperature table",
            DeviceRole::Temperature => "a temperature sensor",
            DeviceRole::Stepper => "a stepper",
            DeviceRole::HeatManager => "a heat manager",
        };
        f.write_str(text)
    }
}

/// A by-name reference from one entry to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Referenced name.
    pub name: &'a str,
    /// Role the target must play.
    pub role: DeviceRole,
    /// The target becomes exclusively owned by the referencing entry.
    pub claims: bool,
}

impl<'a> Reference<'a> {
    fn owned(name: &'a DeviceName, role: DeviceRole) -> Self {
        Self { name: name.as_str(), role, claims: true }
    }

    fn shared(name: &'a DeviceName, role: DeviceRole) -> Self {
        Self { name: name.as_str(), role, claims: false }
    }
}

#[cfg(any(feature = "std", feature = "alloc"))]
mod defaults {
    use super::Microsteps;

    pub(super) fn oversample() -> u8 {
        1
    }

    pub(super) fn frequency() -> u32 {
        1000
    }

    pub(super) fn coolstep_speed() -> u32 {
        300
    }

    pub(super) fn current() -> u16 {
        800
    }

    pub(super) fn max_current() -> u16 {
        1500
    }

    pub(super) fn microsteps() -> Microsteps {
        Microsteps::SIXTEENTH
    }

    pub(super) fn rsense() -> f32 {
        0.11
    }

    pub(super) fn standstill_timeout() -> u32 {
        1000
    }

    pub(super) fn full_duty() -> u8 {
        255
    }

    pub(super) fn max_temperature() -> f32 {
        275.0
    }

    pub(super) fn decouple_period() -> u32 {
        30_000
    }
}

/// Digital output pin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct OutputConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Board pin number.
    pub pin: u8,
    /// Pin is active low.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub inverted: bool,
}

/// Digital input pin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct InputConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Board pin number.
    pub pin: u8,
    /// Pin is active low.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub inverted: bool,
}

/// Analog input pin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct AnalogInputConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Board pin number.
    pub pin: u8,
    /// Samples averaged per reading.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::oversample"))]
    pub oversample: u8,
}

/// Endstop that never triggers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct EndstopNoneConfig {
    /// Entry name.
    pub name: DeviceName,
}

/// Endstop on a digital input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct EndstopSwitchConfig {
    /// Entry name.
    pub name: DeviceName,
    /// `input` entry read by the switch.
    pub input: DeviceName,
    /// Axis the switch limits.
    pub axis: Axis,
}

/// Logical OR of two endstops.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct EndstopMergeConfig {
    /// Entry name.
    pub name: DeviceName,
    /// First source endstop.
    pub first: DeviceName,
    /// Second source endstop.
    pub second: DeviceName,
}

/// Software PWM on a digital output.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct PwmSoftwareConfig {
    /// Entry name.
    pub name: DeviceName,
    /// `output` entry toggled by the channel.
    pub output: DeviceName,
}

/// Hardware PWM channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct PwmHardwareConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Board pin number.
    pub pin: u8,
    /// PWM frequency.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::frequency"))]
    pub frequency_hz: u32,
}

/// Kickstart wrapper: full power for `kick_ms` when starting from zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct PwmKickstartConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Wrapped software or hardware channel.
    pub pwm: DeviceName,
    /// Kick duration.
    pub kick_ms: u32,
}

/// Raw-count to temperature table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct TemperatureTableConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Points sorted by ascending raw count.
    pub points: TemperatureTable,
}

/// Temperature sensor on an analog input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct TemperatureConfig {
    /// Entry name.
    pub name: DeviceName,
    /// `analog_input` entry sampled by the sensor.
    pub input: DeviceName,
    /// `temperature_table` used for conversion.
    pub table: DeviceName,
}

/// Step/dir/enable stepper driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct StepperSimpleConfig {
    /// Entry name.
    pub name: DeviceName,
    /// STEP `output`.
    pub step: DeviceName,
    /// DIR `output`.
    pub dir: DeviceName,
    /// ENABLE `output`.
    pub enable: DeviceName,
    /// Endstop gating motion toward min.
    pub min_endstop: DeviceName,
    /// Endstop gating motion toward max.
    pub max_endstop: DeviceName,
}

/// TMC2130 stepper driver on SPI.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct StepperTmc2130Config {
    /// Entry name.
    pub name: DeviceName,
    /// STEP `output`.
    pub step: DeviceName,
    /// DIR `output`.
    pub dir: DeviceName,
    /// ENABLE `output`.
    pub enable: DeviceName,
    /// Endstop gating motion toward min.
    pub min_endstop: DeviceName,
    /// Endstop gating motion toward max.
    pub max_endstop: DeviceName,
    /// Chip-select pin.
    pub cs_pin: u8,
    /// Coolstep speed during homing.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::coolstep_speed"))]
    pub homing_coolstep_speed: u32,
    /// Coolstep speed during normal operation.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::coolstep_speed"))]
    pub coolstep_speed: u32,
    /// Upper speed for stealth mode.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub stealth_max_speed: u32,
    /// Enable stealth mode.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub stealth: bool,
    /// RMS current after bring-up, in mA.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::current"))]
    pub current_ma: u16,
    /// Current corresponding to 100 %.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::max_current"))]
    pub max_current_ma: u16,
    /// Microsteps after bring-up.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::microsteps"))]
    pub microsteps: Microsteps,
    /// Sense resistor.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::rsense"))]
    pub rsense_ohms: f32,
    /// Upper bound for standstill waits.
    #[cfg_attr(
        any(feature = "std", feature = "alloc"),
        serde(default = "defaults::standstill_timeout")
    )]
    pub standstill_timeout_ms: u32,
}

impl StepperTmc2130Config {
    /// Driver-level configuration.
    pub fn driver_config(&self) -> SmartDriverConfig {
        SmartDriverConfig {
            coolstep_speed: self.coolstep_speed,
            homing_coolstep_speed: self.homing_coolstep_speed,
            stealth_max_speed: self.stealth_max_speed,
            stealth: self.stealth,
            current_ma: self.current_ma,
            max_current_ma: self.max_current_ma,
            microsteps: self.microsteps,
            standstill_timeout_ms: self.standstill_timeout_ms,
        }
    }
}

/// Heater wiring: a temperature sensor and the PWM output heating it.
///
/// The control law lives outside this crate; these are its parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct HeatManagerConfig {
    /// Entry name.
    pub name: DeviceName,
    /// Single-character identifier used in reports.
    pub symbol: char,
    /// `temperature` entry.
    pub sensor: DeviceName,
    /// PWM entry driving the heater.
    pub output: DeviceName,
    /// Temperature above which the heater is shut down.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::max_temperature"))]
    pub max_temperature: f32,
    /// Highest duty the heat loop may request.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::full_duty"))]
    pub max_pwm: u8,
    /// Allowed deviation before a decoupled sensor is reported.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub decouple_variance: f32,
    /// Window for sensor decoupling detection.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::decouple_period"))]
    pub decouple_period_ms: u32,
    /// Proportional gain.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub p: f32,
    /// Integral gain.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub i: f32,
    /// Derivative gain.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub d: f32,
    /// Lower drive clamp.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub drive_min: u8,
    /// Upper drive clamp.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default = "defaults::full_duty"))]
    pub drive_max: u8,
}

/// Extruder tool: a heater plus the stepper feeding filament.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "std", feature = "alloc"), derive(Deserialize))]
pub struct ToolExtruderConfig {
    /// Entry name.
    pub name: DeviceName,
    /// `heat_manager` entry.
    pub heater: DeviceName,
    /// Stepper entry.
    pub stepper: DeviceName,
    /// Nozzle offset from the reference tool (x, y, z) in mm.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub offset: [f32; 3],
    /// Filament diameter in mm.
    pub diameter: f32,
    /// Steps per mm of filament.
    pub resolution: f32,
    /// Instant speed change in mm/s.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub yank: f32,
    /// Maximum feed speed in mm/s.
    pub max_speed: f32,
    /// Acceleration in mm/s².
    pub acceleration: f32,
    /// Pressure advance factor.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub advance: f32,
    /// G-code run when the tool is selected.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub start_script: String<64>,
    /// G-code run when the tool is deselected.
    #[cfg_attr(any(feature = "std", feature = "alloc"), serde(default))]
    pub end_script: String<64>,
}

/// One entry of the device table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    any(feature = "std", feature = "alloc"),
    derive(Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum DeviceEntry {
    /// Digital output pin
    Output(OutputConfig),
    /// Digital input pin
    Input(InputConfig),
    /// Analog input pin
    AnalogInput(AnalogInputConfig),
    /// Endstop that never triggers
    EndstopNone(EndstopNoneConfig),
    /// Endstop on a digital input
    EndstopSwitch(EndstopSwitchConfig),
    /// Logical OR of two endstops
    EndstopMerge(EndstopMergeConfig),
    /// Software PWM
    PwmSoftware(PwmSoftwareConfig),
    /// Hardware PWM
    PwmHardware(PwmHardwareConfig),
    /// Kickstart wrapper
    PwmKickstart(PwmKickstartConfig),
    /// Temperature conversion table
    TemperatureTable(TemperatureTableConfig),
    /// Temperature sensor
    Temperature(TemperatureConfig),
    /// Simple stepper driver
    StepperSimple(StepperSimpleConfig),
    /// TMC2130 stepper driver
    StepperTmc2130(StepperTmc2130Config),
    /// Heater wiring
    HeatManager(HeatManagerConfig),
    /// Extruder tool
    ToolExtruder(ToolExtruderConfig),
}

impl DeviceEntry {
    /// Entry name.
    pub fn name(&self) -> &str {
        match self {
            DeviceEntry::Output(c) => &c.name,
            DeviceEntry::Input(c) => &c.name,
            DeviceEntry::AnalogInput(c) => &c.name,
            DeviceEntry::EndstopNone(c) => &c.name,
            DeviceEntry::EndstopSwitch(c) => &c.name,
            DeviceEntry::EndstopMerge(c) => &c.name,
            DeviceEntry::PwmSoftware(c) => &c.name,
            DeviceEntry::PwmHardware(c) => &c.name,
            DeviceEntry::PwmKickstart(c) => &c.name,
            DeviceEntry::TemperatureTable(c) => &c.name,
            DeviceEntry::Temperature(c) => &c.name,
            DeviceEntry::StepperSimple(c) => &c.name,
            DeviceEntry::StepperTmc2130(c) => &c.name,
            DeviceEntry::HeatManager(c) => &c.name,
            DeviceEntry::ToolExtruder(c) => &c.name,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceEntry::Output(_) => DeviceKind::Output,
            DeviceEntry::Input(_) => DeviceKind::Input,
            DeviceEntry::AnalogInput(_) => DeviceKind::AnalogInput,
            DeviceEntry::EndstopNone(_) => DeviceKind::EndstopNone,
            DeviceEntry::EndstopSwitch(_) => DeviceKind::EndstopSwitch,
            DeviceEntry::EndstopMerge(_) => DeviceKind::EndstopMerge,
            DeviceEntry::PwmSoftware(_) => DeviceKind::PwmSoftware,
            DeviceEntry::PwmHardware(_) => DeviceKind::PwmHardware,
            DeviceEntry::PwmKickstart(_) => DeviceKind::PwmKickstart,
            DeviceEntry::TemperatureTable(_) => DeviceKind::TemperatureTable,
            DeviceEntry::Temperature(_) => DeviceKind::Temperature,
            DeviceEntry::StepperSimple(_) => DeviceKind::StepperSimple,
            DeviceEntry::StepperTmc2130(_) => DeviceKind::StepperTmc2130,
            DeviceEntry::HeatManager(_) => DeviceKind::HeatManager,
            DeviceEntry::ToolExtruder(_) => DeviceKind::ToolExtruder,
        }
    }

    /// Board pin owned directly by this entry, if any.
    pub fn hardware_pin(&self) -> Option<u8> {
        match self {
            DeviceEntry::Output(c) => Some(c.pin),
            DeviceEntry::Input(c) => Some(c.pin),
            DeviceEntry::AnalogInput(c) => Some(c.pin),
            DeviceEntry::PwmHardware(c) => Some(c.pin),
            DeviceEntry::StepperTmc2130(c) => Some(c.cs_pin),
            _ => None,
        }
    }

    /// References to other entries, in field order.
    pub fn references(&self) -> Vec<Reference<'_>, MAX_REFERENCES> {
        use DeviceRole as R;
        match self {
            DeviceEntry::EndstopSwitch(c) => list(&[Reference::owned(&c.input, R::Input)]),
            DeviceEntry::EndstopMerge(c) => list(&[
                Reference::shared(&c.first, R::Endstop),
                Reference::shared(&c.second, R::Endstop),
            ]),
            DeviceEntry::PwmSoftware(c) => list(&[Reference::owned(&c.output, R::Output)]),
            DeviceEntry::PwmKickstart(c) => list(&[Reference::owned(&c.pwm, R::BasePwm)]),
            DeviceEntry::Temperature(c) => list(&[
                Reference::owned(&c.input, R::AnalogInput),
                Reference::shared(&c.table, R::TemperatureTable),
            ]),
            DeviceEntry::StepperSimple(c) => list(&[
                Reference::owned(&c.step, R::Output),
                Reference::owned(&c.dir, R::Output),
                Reference::owned(&c.enable, R::Output),
                Reference::shared(&c.min_endstop, R::Endstop),
                Reference::shared(&c.max_endstop, R::Endstop),
            ]),
            DeviceEntry::StepperTmc2130(c) => list(&[
                Reference::owned(&c.step, R::Output),
                Reference::owned(&c.dir, R::Output),
                Reference::owned(&c.enable, R::Output),
                Reference::shared(&c.min_endstop, R::Endstop),
                Reference::shared(&c.max_endstop, R::Endstop),
            ]),
            DeviceEntry::HeatManager(c) => list(&[
                Reference::owned(&c.sensor, R::Temperature),
                Reference::owned(&c.output, R::Pwm),
            ]),
            DeviceEntry::ToolExtruder(c) => list(&[
                Reference::owned(&c.heater, R::HeatManager),
                Reference::shared(&c.stepper, R::Stepper),
            ]),
            _ => Vec::new(),
        }
    }
}

fn list<'a>(refs: &[Reference<'a>]) -> Vec<Reference<'a>, MAX_REFERENCES> {
    refs.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> DeviceName {
        DeviceName::try_from(s).unwrap()
    }

    #[test]
    fn test_role_accepts_kinds() {
        assert!(DeviceRole::Endstop.accepts(DeviceKind::EndstopMerge));
        assert!(DeviceRole::Pwm.accepts(DeviceKind::PwmKickstart));
        assert!(!DeviceRole::BasePwm.accepts(DeviceKind::PwmKickstart));
        assert!(DeviceRole::Stepper.accepts(DeviceKind::StepperTmc2130));
        assert!(!DeviceRole::Output.accepts(DeviceKind::Input));
    }

    #[test]
    fn test_stepper_references() {
        let entry = DeviceEntry::StepperSimple(StepperSimpleConfig {
            name: name("x_motor"),
            step: name("x_step"),
            dir: name("x_dir"),
            enable: name("x_enable"),
            min_endstop: name("x_min"),
            max_endstop: name("x_max"),
        });
        let refs = entry.references();
        assert_eq!(refs.len(), 5);
        assert!(refs[..3].iter().all(|r| r.claims && r.role == DeviceRole::Output));
        assert!(refs[3..].iter().all(|r| !r.claims && r.role == DeviceRole::Endstop));
        assert_eq!(entry.kind().to_string(), "stepper_simple");
        assert_eq!(entry.hardware_pin(), None);
    }
}
