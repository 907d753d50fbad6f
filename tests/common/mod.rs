//! Fake board shared by the integration tests.
//!
//! Every resource handed out shares its state with the board through `Rc`, so
//! a test can drive inputs and inspect outputs after composition has moved
//! the pins into drivers.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as DigitalErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use embedded_hal::spi::{ErrorType as SpiErrorType, Operation, SpiDevice};
use printer_io::board::Board;
use printer_io::driver::tmc2130::reg;
use printer_io::io::AnalogInput;

/// Line state shared between the board and a pin.
#[derive(Debug, Default)]
pub struct Line {
    pub level: Cell<bool>,
    pub rises: Cell<u32>,
}

pub struct FakeOutput(Rc<Line>);

impl DigitalErrorType for FakeOutput {
    type Error = Infallible;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.0.level.get() {
            self.0.rises.set(self.0.rises.get() + 1);
        }
        self.0.level.set(true);
        Ok(())
    }
}

pub struct FakeInput(Rc<Line>);

impl DigitalErrorType for FakeInput {
    type Error = Infallible;
}

impl InputPin for FakeInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.level.get())
    }
}

pub struct FakeAdc(Rc<Cell<u16>>);

impl AnalogInput for FakeAdc {
    type Error = Infallible;

    fn sample(&mut self) -> Result<u16, Infallible> {
        Ok(self.0.get())
    }
}

pub struct FakePwm(Rc<Cell<u16>>);

impl PwmErrorType for FakePwm {
    type Error = Infallible;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.0.set(duty);
        Ok(())
    }
}

/// Register model of a TMC2130 with pipelined replies.
pub struct TmcModel {
    pub regs: [u32; 0x80],
    pub alive: bool,
    pending: u32,
    pub writes: Vec<(u8, u32)>,
}

impl TmcModel {
    fn new() -> Self {
        let mut regs = [0; 0x80];
        regs[usize::from(reg::IOIN)] = 0x1100_0000;
        regs[usize::from(reg::DRV_STATUS)] = reg::DRV_STATUS_STST | (12 << reg::DRV_STATUS_CS_ACTUAL_SHIFT);
        Self { regs, alive: true, pending: 0, writes: Vec::new() }
    }

    pub fn reg(&self, address: u8) -> u32 {
        self.regs[usize::from(address)]
    }

    /// Microsteps encoded in the last written CHOPCONF.
    pub fn microsteps(&self) -> u16 {
        256 >> ((self.reg(reg::CHOPCONF) >> reg::CHOPCONF_MRES_SHIFT) & 0xF)
    }
}

pub struct FakeSpi(Rc<RefCell<TmcModel>>);

impl SpiErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut model = self.0.borrow_mut();
        for op in operations.iter_mut() {
            if let Operation::TransferInPlace(buf) = op {
                let address = buf[0];
                let data = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
                let reply = if model.alive { model.pending } else { 0 };
                buf[0] = 0;
                buf[1..5].copy_from_slice(&reply.to_be_bytes());
                let index = usize::from(address & 0x7F);
                if address & reg::WRITE != 0 {
                    model.regs[index] = data;
                    model.writes.push((address & 0x7F, data));
                } else {
                    model.pending = model.regs[index];
                }
            }
        }
        Ok(())
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refused(pub u8);

#[derive(Default)]
pub struct FakeBoard {
    lines: HashMap<u8, Rc<Line>>,
    adcs: HashMap<u8, Rc<Cell<u16>>>,
    pwms: HashMap<u8, Rc<Cell<u16>>>,
    chips: HashMap<u8, Rc<RefCell<TmcModel>>>,
    refused: Vec<u8>,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&mut self, pin: u8) {
        self.refused.push(pin);
    }

    pub fn line(&mut self, pin: u8) -> Rc<Line> {
        self.lines.entry(pin).or_default().clone()
    }

    pub fn set_input(&mut self, pin: u8, level: bool) {
        self.line(pin).level.set(level);
    }

    pub fn level(&mut self, pin: u8) -> bool {
        self.line(pin).level.get()
    }

    pub fn rises(&mut self, pin: u8) -> u32 {
        self.line(pin).rises.get()
    }

    pub fn adc(&mut self, pin: u8) -> Rc<Cell<u16>> {
        self.adcs.entry(pin).or_default().clone()
    }

    pub fn pwm_duty(&mut self, pin: u8) -> u16 {
        self.pwms.entry(pin).or_default().get()
    }

    pub fn chip(&mut self, cs_pin: u8) -> Rc<RefCell<TmcModel>> {
        self.chips
            .entry(cs_pin)
            .or_insert_with(|| Rc::new(RefCell::new(TmcModel::new())))
            .clone()
    }

    fn check(&self, pin: u8) -> Result<(), Refused> {
        if self.refused.contains(&pin) {
            Err(Refused(pin))
        } else {
            Ok(())
        }
    }
}

impl Board for FakeBoard {
    type Error = Refused;
    type Output = FakeOutput;
    type Input = FakeInput;
    type Analog = FakeAdc;
    type Pwm = FakePwm;
    type Spi = FakeSpi;
    type Delay = NoDelay;

    fn output(&mut self, pin: u8) -> Result<FakeOutput, Refused> {
        self.check(pin)?;
        Ok(FakeOutput(self.line(pin)))
    }

    fn input(&mut self, pin: u8) -> Result<FakeInput, Refused> {
        self.check(pin)?;
        Ok(FakeInput(self.line(pin)))
    }

    fn analog(&mut self, pin: u8) -> Result<FakeAdc, Refused> {
        self.check(pin)?;
        Ok(FakeAdc(self.adc(pin)))
    }

    fn pwm(&mut self, pin: u8, _frequency_hz: u32) -> Result<FakePwm, Refused> {
        self.check(pin)?;
        Ok(FakePwm(self.pwms.entry(pin).or_default().clone()))
    }

    fn spi(&mut self, cs_pin: u8) -> Result<FakeSpi, Refused> {
        self.check(cs_pin)?;
        Ok(FakeSpi(self.chip(cs_pin)))
    }

    fn delay(&mut self) -> NoDelay {
        NoDelay
    }
}

/// Board with X on a TMC2130, Y gated by a merged endstop, an extruder tool,
/// a kickstarted fan and a heated hotend.
pub const BOARD_TOML: &str = r#"
[[devices]]
kind = "output"
name = "x_step"
pin = 54

[[devices]]
kind = "output"
name = "x_dir"
pin = 55

[[devices]]
kind = "output"
name = "x_enable"
pin = 38
inverted = true

[[devices]]
kind = "input"
name = "x_min_pin"
pin = 3

[[devices]]
kind = "input"
name = "y_min_pin"
pin = 14

[[devices]]
kind = "input"
name = "z_probe_pin"
pin = 18
inverted = true

[[devices]]
kind = "endstop_switch"
name = "x_min"
input = "x_min_pin"
axis = "x"

[[devices]]
kind = "endstop_switch"
name = "y_min"
input = "y_min_pin"
axis = "y"

[[devices]]
kind = "endstop_switch"
name = "z_probe"
input = "z_probe_pin"
axis = "z"

[[devices]]
kind = "endstop_none"
name = "no_endstop"

[[devices]]
kind = "endstop_merge"
name = "y_any"
first = "y_min"
second = "z_probe"

[[devices]]
kind = "output"
name = "y_step"
pin = 60

[[devices]]
kind = "output"
name = "y_dir"
pin = 61

[[devices]]
kind = "output"
name = "y_enable"
pin = 56
inverted = true

[[devices]]
kind = "stepper_tmc2130"
name = "x_motor"
step = "x_step"
dir = "x_dir"
enable = "x_enable"
min_endstop = "x_min"
max_endstop = "no_endstop"
cs_pin = 40
current_ma = 700
homing_coolstep_speed = 1200
microsteps = 16

[[devices]]
kind = "stepper_simple"
name = "y_motor"
step = "y_step"
dir = "y_dir"
enable = "y_enable"
min_endstop = "y_any"
max_endstop = "no_endstop"

[[devices]]
kind = "output"
name = "e_step"
pin = 26

[[devices]]
kind = "output"
name = "e_dir"
pin = 28

[[devices]]
kind = "output"
name = "e_enable"
pin = 24

[[devices]]
kind = "stepper_simple"
name = "e_motor"
step = "e_step"
dir = "e_dir"
enable = "e_enable"
min_endstop = "no_endstop"
max_endstop = "no_endstop"

[[devices]]
kind = "output"
name = "fan_pin"
pin = 9

[[devices]]
kind = "pwm_software"
name = "fan_soft"
output = "fan_pin"

[[devices]]
kind = "pwm_kickstart"
name = "fan"
pwm = "fan_soft"
kick_ms = 200

[[devices]]
kind = "pwm_hardware"
name = "hotend_pwm"
pin = 10
frequency_hz = 500

[[devices]]
kind = "analog_input"
name = "hotend_adc"
pin = 13
oversample = 4

[[devices]]
kind = "temperature_table"
name = "thermistor"
points = [{ raw = 100, celsius = 300.0 }, { raw = 1000, celsius = 20.0 }]

[[devices]]
kind = "temperature"
name = "hotend_temp"
input = "hotend_adc"
table = "thermistor"

[[devices]]
kind = "heat_manager"
name = "hotend"
symbol = "T"
sensor = "hotend_temp"
output = "hotend_pwm"
p = 7.0
i = 0.5
d = 40.0

[[devices]]
kind = "tool_extruder"
name = "extruder0"
heater = "hotend"
stepper = "e_motor"
diameter = 1.75
resolution = 93.0
max_speed = 50.0
acceleration = 1000.0

[[devices]]
kind = "output"
name = "led"
pin = 11
"#;
