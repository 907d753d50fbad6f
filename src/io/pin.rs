//! Pin primitives with board polarity applied.
//!
//! Boards wire some lines active-low (typically driver enable lines). The
//! inversion lives here so endstops and drivers only ever deal with logical
//! levels: `set_high()` on an enable line means "enabled" on every board.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Digital output with configurable active polarity.
#[derive(Debug)]
pub struct LogicalOutput<P> {
    pin: P,
    inverted: bool,
}

impl<P: OutputPin> LogicalOutput<P> {
    /// Wrap an output. With `inverted`, logical high drives the line low.
    #[inline]
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Whether the physical line is driven opposite to the logical level.
    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Release the underlying pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> ErrorType for LogicalOutput<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for LogicalOutput<P> {
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.inverted {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        }
    }
}

/// Digital input with configurable active polarity.
#[derive(Debug)]
pub struct LogicalInput<P> {
    pin: P,
    inverted: bool,
}

impl<P: InputPin> LogicalInput<P> {
    /// Wrap an input. With `inverted`, a low line reads as logical high.
    #[inline]
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Release the underlying pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> ErrorType for LogicalInput<P> {
    type Error = P::Error;
}

impl<P: InputPin> InputPin for LogicalInput<P> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high().map(|level| level != self.inverted)
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|level| !level)
    }
}

/// Raw analog sampling, the one pin capability embedded-hal 1.0 does not define.
pub trait AnalogInput {
    /// Error type of the ADC backend.
    type Error: core::fmt::Debug;

    /// Take one raw sample (ADC counts).
    fn sample(&mut self) -> Result<u16, Self::Error>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    #[inline]
    fn sample(&mut self) -> Result<u16, Self::Error> {
        T::sample(self)
    }
}
