//! Board composition.
//!
//! A [`Board`] hands out the concrete pins, PWM channels, ADC inputs and
//! chip-select SPI devices behind pin numbers. A [`Composition`] turns a
//! validated [`DeviceTable`](crate::config::DeviceTable) into typed objects
//! in phases:
//!
//! 1. declare: [`Composition::declare`]
//! 2. define: [`Composition::define_endstops`], [`Composition::define_peripherals`],
//!    [`Composition::define_machine`]
//! 3. startup-init: [`Machine::startup_init`]
//! 4. settings-sync: [`Machine::sync_settings`]
//! 5. settings-update: [`Machine::apply_update`]

mod compose;
mod machine;
mod settings;

use core::fmt::{Debug, Write};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiDevice;
use heapless::String;

use crate::driver::{SimpleStepperDriver, SmartStepperDriver, Tmc2130};
use crate::endstop::{EndstopBank, EndstopHandle};
use crate::error::Error;
use crate::io::{AnalogInput, LogicalInput, LogicalOutput, PwmChannel, TemperatureChannel};

pub use compose::{Composition, Declaration, HeatManagerWiring, Peripherals};
pub use machine::{AxisDriver, Machine, MachineAxis, ToolWiring, MAX_AXES};
pub use settings::{DriverSettings, MemorySettings, SettingsStore, MAX_STORED_SETTINGS};

/// Hardware resources of one controller board.
///
/// Every call hands out a resource by board pin number. A board may refuse
/// (pin not routed, peripheral busy) with its own error type.
pub trait Board {
    /// Resource acquisition error.
    type Error: Debug;
    /// Digital output pin.
    type Output: OutputPin;
    /// Digital input pin.
    type Input: InputPin;
    /// ADC input.
    type Analog: AnalogInput;
    /// Hardware PWM channel.
    type Pwm: SetDutyCycle;
    /// SPI device bound to one chip-select line.
    type Spi: SpiDevice;
    /// Delay provider.
    type Delay: DelayNs;

    /// Digital output on `pin`.
    fn output(&mut self, pin: u8) -> Result<Self::Output, Self::Error>;

    /// Digital input on `pin`.
    fn input(&mut self, pin: u8) -> Result<Self::Input, Self::Error>;

    /// ADC input on `pin`.
    fn analog(&mut self, pin: u8) -> Result<Self::Analog, Self::Error>;

    /// Hardware PWM on `pin` at `frequency_hz`.
    fn pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<Self::Pwm, Self::Error>;

    /// SPI device selected by `cs_pin`.
    fn spi(&mut self, cs_pin: u8) -> Result<Self::Spi, Self::Error>;

    /// A delay provider.
    fn delay(&mut self) -> Self::Delay;
}

/// Logical output pin of a board.
pub type BoardOutput<B> = LogicalOutput<<B as Board>::Output>;
/// Logical input pin of a board.
pub type BoardInput<B> = LogicalInput<<B as Board>::Input>;
/// PWM channel of a board.
pub type BoardPwm<B> = PwmChannel<BoardOutput<B>, <B as Board>::Pwm>;
/// Temperature channel of a board.
pub type BoardTemperature<B> = TemperatureChannel<<B as Board>::Analog>;
/// Endstop bank of a board.
pub type BoardEndstops<B> = EndstopBank<BoardInput<B>>;
/// Endstop reference held by a board's drivers.
pub type BoardEndstop<'a, B> = EndstopHandle<'a, BoardInput<B>>;
/// Simple stepper driver of a board.
pub type BoardSimpleDriver<'a, B> =
    SimpleStepperDriver<BoardOutput<B>, BoardOutput<B>, BoardOutput<B>, BoardEndstop<'a, B>>;
/// TMC2130 stepper driver of a board.
pub type BoardSmartDriver<'a, B> = SmartStepperDriver<
    BoardOutput<B>,
    BoardOutput<B>,
    BoardOutput<B>,
    BoardEndstop<'a, B>,
    Tmc2130<<B as Board>::Spi>,
    <B as Board>::Delay,
>;

/// Wrap a board refusal into the crate error.
pub(crate) fn board_error<E: Debug>(resource: &str, pin: u8, err: E) -> Error {
    let mut msg = String::<64>::new();
    let _ = write!(msg, "{} {}: {:?}", resource, pin, err);
    Error::Board(msg)
}
