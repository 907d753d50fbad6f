//! Device table expansion into typed objects.

use heapless::Vec;

use crate::config::{
    validate_table, AnalogInputConfig, DeviceEntry, DeviceKind, DeviceName, DeviceTable, HeatManagerConfig,
    InputConfig, OutputConfig,
};
use crate::driver::{SimpleStepperDriver, SmartStepperDriver, StepperPins, Tmc2130};
use crate::endstop::SwitchEndstop;
use crate::error::{short_name, ConfigError, DriverError, Error, Result};
use crate::io::{LogicalInput, LogicalOutput, PwmChannel, TemperatureChannel};

use super::machine::{AxisDriver, Machine, MachineAxis, ToolWiring};
use super::settings::DriverSettings;
use super::{board_error, Board, BoardEndstop, BoardEndstops, BoardInput, BoardOutput, BoardPwm, BoardTemperature};

/// Maximum number of free digital pins kept in [`Peripherals`].
pub const MAX_FREE_PINS: usize = 16;
/// Maximum number of PWM channels.
pub const MAX_PWM: usize = 8;
/// Maximum number of temperature channels.
pub const MAX_TEMPERATURES: usize = 8;
/// Maximum number of heat managers.
pub const MAX_HEATERS: usize = 4;

/// One declared device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration<'t> {
    /// Device name.
    pub name: &'t str,
    /// Device kind.
    pub kind: DeviceKind,
}

/// Resolved wiring of a heater: sensor and PWM output, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatManagerWiring {
    /// Heater parameters.
    pub config: HeatManagerConfig,
}

impl HeatManagerWiring {
    /// Heater name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Temperature channel name.
    pub fn sensor(&self) -> &str {
        &self.config.sensor
    }

    /// PWM channel name.
    pub fn output(&self) -> &str {
        &self.config.output
    }
}

/// Pins, PWM channels, temperature channels and heaters of a board.
///
/// Pins claimed by another device (a stepper's step line, a switch's input)
/// are not listed here; they live inside their owner.
pub struct Peripherals<B: Board> {
    outputs: Vec<(DeviceName, BoardOutput<B>), MAX_FREE_PINS>,
    inputs: Vec<(DeviceName, BoardInput<B>), MAX_FREE_PINS>,
    analog: Vec<(DeviceName, B::Analog), MAX_TEMPERATURES>,
    pwm: Vec<(DeviceName, BoardPwm<B>), MAX_PWM>,
    temperatures: Vec<(DeviceName, BoardTemperature<B>), MAX_TEMPERATURES>,
    heaters: Vec<HeatManagerWiring, MAX_HEATERS>,
}

fn find<'v, T>(items: &'v [(DeviceName, T)], name: &str) -> Option<&'v T> {
    items.iter().find(|(n, _)| n.as_str() == name).map(|(_, v)| v)
}

fn find_mut<'v, T>(items: &'v mut [(DeviceName, T)], name: &str) -> Option<&'v mut T> {
    items.iter_mut().find(|(n, _)| n.as_str() == name).map(|(_, v)| v)
}

fn push<T, const N: usize>(items: &mut Vec<T, N>, item: T, what: &'static str) -> Result<()> {
    items
        .push(item)
        .map_err(|_| Error::Config(ConfigError::CapacityExceeded(what)))
}

impl<B: Board> Peripherals<B> {
    fn new() -> Self {
        Self {
            outputs: Vec::new(),
            inputs: Vec::new(),
            analog: Vec::new(),
            pwm: Vec::new(),
            temperatures: Vec::new(),
            heaters: Vec::new(),
        }
    }

    /// Unclaimed digital output.
    pub fn output_mut(&mut self, name: &str) -> Option<&mut BoardOutput<B>> {
        find_mut(&mut self.outputs, name)
    }

    /// Unclaimed digital input.
    pub fn input_mut(&mut self, name: &str) -> Option<&mut BoardInput<B>> {
        find_mut(&mut self.inputs, name)
    }

    /// Unclaimed analog input.
    pub fn analog_mut(&mut self, name: &str) -> Option<&mut B::Analog> {
        find_mut(&mut self.analog, name)
    }

    /// PWM channel by name.
    pub fn pwm(&self, name: &str) -> Option<&BoardPwm<B>> {
        find(&self.pwm, name)
    }

    /// PWM channel by name, mutably.
    pub fn pwm_mut(&mut self, name: &str) -> Option<&mut BoardPwm<B>> {
        find_mut(&mut self.pwm, name)
    }

    /// List all PWM channel names.
    pub fn pwm_names(&self) -> impl Iterator<Item = &str> {
        self.pwm.iter().map(|(n, _)| n.as_str())
    }

    /// Temperature channel by name.
    pub fn temperature_mut(&mut self, name: &str) -> Option<&mut BoardTemperature<B>> {
        find_mut(&mut self.temperatures, name)
    }

    /// Heaters in definition order.
    pub fn heaters(&self) -> &[HeatManagerWiring] {
        &self.heaters
    }

    /// Heater by name.
    pub fn heater(&self, name: &str) -> Option<&HeatManagerWiring> {
        self.heaters.iter().find(|h| h.name() == name)
    }

    /// Sensor and output channel of a heater.
    pub fn heater_channels_mut(&mut self, heater: &str) -> Option<(&mut BoardTemperature<B>, &mut BoardPwm<B>)> {
        let wiring = self.heaters.iter().find(|h| h.name() == heater)?;
        let sensor = find_mut(&mut self.temperatures, wiring.sensor())?;
        let output = find_mut(&mut self.pwm, wiring.output())?;
        Some((sensor, output))
    }

    /// Advance every PWM channel by `elapsed_ms`.
    ///
    /// # Errors
    ///
    /// Returns the first channel error; later channels are still ticked.
    pub fn tick(&mut self, elapsed_ms: u32) -> core::result::Result<(), DriverError> {
        let mut first = None;
        for (_, channel) in self.pwm.iter_mut() {
            if let Err(e) = channel.tick(elapsed_ms) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// A validated device table, ready to be expanded phase by phase.
///
/// Every reference has been checked at construction, so the phases below
/// fail only when the board refuses a resource or a capacity is exceeded.
#[derive(Debug, Clone)]
pub struct Composition {
    table: DeviceTable,
}

impl Composition {
    /// Validate `table` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, see [`validate_table`].
    pub fn new(table: DeviceTable) -> Result<Self> {
        validate_table(&table)?;
        info!("composition: {} devices", table.len());
        Ok(Self { table })
    }

    /// Parse a TOML device table, then validate and wrap it like [`Composition::new`].
    #[cfg(feature = "std")]
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::new(crate::config::decode_table(content)?)
    }

    /// The underlying table.
    pub fn table(&self) -> &DeviceTable {
        &self.table
    }

    /// Declare phase: every device with its kind, in definition order.
    pub fn declare(&self) -> impl Iterator<Item = Declaration<'_>> {
        self.table.iter().map(|e| Declaration { name: e.name(), kind: e.kind() })
    }

    /// Define phase, endstops.
    ///
    /// # Errors
    ///
    /// Returns an error if the board refuses an input pin.
    pub fn define_endstops<B: Board>(&self, board: &mut B) -> Result<BoardEndstops<B>> {
        let mut bank = BoardEndstops::<B>::new();
        for entry in self.table.iter() {
            match entry {
                DeviceEntry::EndstopNone(c) => {
                    bank.push_none(&c.name)?;
                }
                DeviceEntry::EndstopSwitch(c) => {
                    let pin = self.input_pin(board, &c.name, &c.input)?;
                    bank.push_switch(&c.name, SwitchEndstop::new(pin, c.axis))?;
                }
                DeviceEntry::EndstopMerge(c) => {
                    let first = bank.id(&c.first).ok_or_else(|| unknown(&c.name, &c.first))?;
                    let second = bank.id(&c.second).ok_or_else(|| unknown(&c.name, &c.second))?;
                    bank.push_merged(&c.name, first, second)?;
                }
                _ => {}
            }
        }
        debug!("defined {} endstop(s)", bank.len());
        Ok(bank)
    }

    /// Define phase, free pins, PWM channels, temperature channels and heaters.
    ///
    /// # Errors
    ///
    /// Returns an error if the board refuses a resource.
    pub fn define_peripherals<B: Board>(&self, board: &mut B) -> Result<Peripherals<B>> {
        let mut p = Peripherals::<B>::new();
        for entry in self.table.iter() {
            let claimed = self.table.claimant(entry.name()).is_some();
            match entry {
                DeviceEntry::Output(c) if !claimed => {
                    let pin = output_pin(board, c)?;
                    push(&mut p.outputs, (c.name.clone(), pin), "free outputs")?;
                }
                DeviceEntry::Input(c) if !claimed => {
                    let pin = input_pin(board, c)?;
                    push(&mut p.inputs, (c.name.clone(), pin), "free inputs")?;
                }
                DeviceEntry::AnalogInput(c) if !claimed => {
                    let adc = board.analog(c.pin).map_err(|e| board_error("analog", c.pin, e))?;
                    push(&mut p.analog, (c.name.clone(), adc), "analog inputs")?;
                }
                DeviceEntry::PwmSoftware(c) => {
                    let pin = self.output_pin(board, &c.name, &c.output)?;
                    push(&mut p.pwm, (c.name.clone(), PwmChannel::software(pin)), "pwm channels")?;
                }
                DeviceEntry::PwmHardware(c) => {
                    let pwm = board
                        .pwm(c.pin, c.frequency_hz)
                        .map_err(|e| board_error("pwm", c.pin, e))?;
                    push(&mut p.pwm, (c.name.clone(), PwmChannel::hardware(pwm)), "pwm channels")?;
                }
                DeviceEntry::PwmKickstart(c) => {
                    let slot = p
                        .pwm
                        .iter_mut()
                        .find(|(n, _)| n.as_str() == c.pwm.as_str())
                        .ok_or_else(|| unknown(&c.name, &c.pwm))?;
                    slot.0 = c.name.clone();
                    slot.1.set_kickstart(c.kick_ms);
                }
                DeviceEntry::Temperature(c) => {
                    let analog = self.analog_config(&c.name, &c.input)?;
                    let adc = board
                        .analog(analog.pin)
                        .map_err(|e| board_error("analog", analog.pin, e))?;
                    let points = match self.table.get(&c.table) {
                        Some(DeviceEntry::TemperatureTable(t)) => t.points.clone(),
                        _ => return Err(unknown(&c.name, &c.table)),
                    };
                    let channel = TemperatureChannel::new(adc, analog.oversample, points);
                    push(&mut p.temperatures, (c.name.clone(), channel), "temperature channels")?;
                }
                DeviceEntry::HeatManager(c) => {
                    push(&mut p.heaters, HeatManagerWiring { config: c.clone() }, "heat managers")?;
                }
                _ => {}
            }
        }
        debug!(
            "defined {} pwm channel(s), {} temperature channel(s), {} heater(s)",
            p.pwm.len(),
            p.temperatures.len(),
            p.heaters.len()
        );
        Ok(p)
    }

    /// Define phase, stepper drivers and tools.
    ///
    /// Drivers hold handles into `endstops`, which must come from
    /// [`define_endstops`](Composition::define_endstops) on this composition.
    ///
    /// # Errors
    ///
    /// Returns an error if the board refuses a pin or SPI device.
    pub fn define_machine<'e, B: Board>(
        &self,
        board: &mut B,
        endstops: &'e BoardEndstops<B>,
    ) -> Result<Machine<'e, B>> {
        let mut machine = Machine::new();
        for entry in self.table.iter() {
            match entry {
                DeviceEntry::StepperSimple(c) => {
                    let pins = self.stepper_pins(board, &c.name, &c.step, &c.dir, &c.enable)?;
                    let min = handle::<B>(endstops, &c.name, &c.min_endstop)?;
                    let max = handle::<B>(endstops, &c.name, &c.max_endstop)?;
                    let driver = SimpleStepperDriver::new(&c.name, pins, min, max);
                    let axis = MachineAxis::new(c.name.clone(), AxisDriver::Simple(driver), DriverSettings::default());
                    machine.push_axis(axis)?;
                }
                DeviceEntry::StepperTmc2130(c) => {
                    let pins = self.stepper_pins(board, &c.name, &c.step, &c.dir, &c.enable)?;
                    let min = handle::<B>(endstops, &c.name, &c.min_endstop)?;
                    let max = handle::<B>(endstops, &c.name, &c.max_endstop)?;
                    let spi = board.spi(c.cs_pin).map_err(|e| board_error("spi cs", c.cs_pin, e))?;
                    let chip = Tmc2130::new(spi, c.rsense_ohms);
                    let delay = board.delay();
                    let driver = SmartStepperDriver::new(&c.name, pins, min, max, chip, delay, c.driver_config());
                    let settings = DriverSettings { current_ma: c.current_ma, microsteps: c.microsteps };
                    let axis = MachineAxis::new(c.name.clone(), AxisDriver::Smart(driver), settings);
                    machine.push_axis(axis)?;
                }
                DeviceEntry::ToolExtruder(c) => {
                    machine.push_tool(ToolWiring { config: c.clone() })?;
                }
                _ => {}
            }
        }
        info!("defined {} stepper driver(s), {} tool(s)", machine.len(), machine.tools().len());
        Ok(machine)
    }

    fn output_config(&self, device: &str, name: &str) -> Result<&OutputConfig> {
        match self.table.get(name) {
            Some(DeviceEntry::Output(c)) => Ok(c),
            _ => Err(unknown(device, name)),
        }
    }

    fn analog_config(&self, device: &str, name: &str) -> Result<&AnalogInputConfig> {
        match self.table.get(name) {
            Some(DeviceEntry::AnalogInput(c)) => Ok(c),
            _ => Err(unknown(device, name)),
        }
    }

    fn output_pin<B: Board>(&self, board: &mut B, device: &str, name: &str) -> Result<BoardOutput<B>> {
        output_pin(board, self.output_config(device, name)?)
    }

    fn input_pin<B: Board>(&self, board: &mut B, device: &str, name: &str) -> Result<BoardInput<B>> {
        match self.table.get(name) {
            Some(DeviceEntry::Input(c)) => input_pin(board, c),
            _ => Err(unknown(device, name)),
        }
    }

    fn stepper_pins<B: Board>(
        &self,
        board: &mut B,
        device: &str,
        step: &str,
        dir: &str,
        enable: &str,
    ) -> Result<StepperPins<BoardOutput<B>, BoardOutput<B>, BoardOutput<B>>> {
        Ok(StepperPins {
            step: self.output_pin(board, device, step)?,
            dir: self.output_pin(board, device, dir)?,
            enable: self.output_pin(board, device, enable)?,
        })
    }
}

fn output_pin<B: Board>(board: &mut B, c: &OutputConfig) -> Result<BoardOutput<B>> {
    let pin = board.output(c.pin).map_err(|e| board_error("output", c.pin, e))?;
    Ok(LogicalOutput::new(pin, c.inverted))
}

fn input_pin<B: Board>(board: &mut B, c: &InputConfig) -> Result<BoardInput<B>> {
    let pin = board.input(c.pin).map_err(|e| board_error("input", c.pin, e))?;
    Ok(LogicalInput::new(pin, c.inverted))
}

fn handle<'e, B: Board>(endstops: &'e BoardEndstops<B>, device: &str, name: &str) -> Result<BoardEndstop<'e, B>> {
    endstops.handle(name).ok_or_else(|| unknown(device, name))
}

fn unknown(device: &str, reference: &str) -> Error {
    Error::Config(ConfigError::UnknownDevice {
        device: short_name(device),
        reference: short_name(reference),
    })
}
