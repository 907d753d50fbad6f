//! Plain GPIO stepper driver (step/dir/enable) with endstop gating.

use embedded_hal::digital::{OutputPin, PinState};
use heapless::String;

use crate::endstop::Endstop;
use crate::error::{short_name, DriverError};

use super::{DriverResult, StepperDriver};

/// STEP, DIR and ENABLE lines of one motor.
#[derive(Debug)]
pub struct StepperPins<STEP, DIR, EN> {
    /// STEP pin (pulse to move one step).
    pub step: STEP,
    /// DIR pin (high = toward max).
    pub dir: DIR,
    /// ENABLE pin (logical high = enabled).
    pub enable: EN,
}

/// Open-loop stepper driver on three GPIO lines.
///
/// Generic over:
/// - `STEP`, `DIR`, `EN`: output pins (polarity applied at the pin level)
/// - `E`: endstop reference type for the min and max side
pub struct SimpleStepperDriver<STEP, DIR, EN, E> {
    label: String<32>,
    pins: StepperPins<STEP, DIR, EN>,
    min_endstop: E,
    max_endstop: E,
    direction: bool,
}

impl<STEP, DIR, EN, E> SimpleStepperDriver<STEP, DIR, EN, E>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    E: Endstop,
{
    /// Create a driver wired to its two endstops. Direction starts toward max.
    pub fn new(label: &str, pins: StepperPins<STEP, DIR, EN>, min_endstop: E, max_endstop: E) -> Self {
        Self {
            label: short_name(label),
            pins,
            min_endstop,
            max_endstop,
            direction: true,
        }
    }

    /// Release the pins.
    pub fn into_pins(self) -> StepperPins<STEP, DIR, EN> {
        self.pins
    }
}

impl<STEP, DIR, EN, E> StepperDriver for SimpleStepperDriver<STEP, DIR, EN, E>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    E: Endstop,
{
    type Endstop = E;

    #[inline]
    fn label(&self) -> &str {
        self.label.as_str()
    }

    #[inline]
    fn direction(&self) -> bool {
        self.direction
    }

    #[inline]
    fn min_endstop(&self) -> &E {
        &self.min_endstop
    }

    #[inline]
    fn max_endstop(&self) -> &E {
        &self.max_endstop
    }

    #[inline]
    fn step_cond(&mut self) -> DriverResult<bool> {
        if self.gating_endstop().triggered() {
            return Ok(true);
        }
        self.pins.step.set_high().map_err(|_| DriverError::Pin)?;
        Ok(false)
    }

    #[inline]
    fn step(&mut self) -> DriverResult<()> {
        self.pins.step.set_high().map_err(|_| DriverError::Pin)
    }

    #[inline]
    fn unstep(&mut self) -> DriverResult<()> {
        self.pins.step.set_low().map_err(|_| DriverError::Pin)
    }

    #[inline]
    fn dir(&mut self, d: bool) -> DriverResult<()> {
        self.pins.dir.set_state(PinState::from(d)).map_err(|_| DriverError::Pin)?;
        self.direction = d;
        Ok(())
    }

    #[inline]
    fn enable(&mut self) -> DriverResult<()> {
        self.pins.enable.set_high().map_err(|_| DriverError::Pin)
    }

    #[inline]
    fn disable(&mut self) -> DriverResult<()> {
        self.pins.enable.set_low().map_err(|_| DriverError::Pin)
    }
}
