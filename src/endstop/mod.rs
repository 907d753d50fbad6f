//! Endstops: logical sensors reporting that an axis reached a travel limit.
//!
//! Sampling has a side effect (a pin read) and every endstop caches the result
//! of its last sample, so a driver can gate a step on [`Endstop::triggered`] and
//! diagnostics can report [`Endstop::state`] without touching the hardware.
//!
//! Endstops are queried through `&self`: one physical switch may gate several
//! drivers (a gantry axis driven by two motors), so sources are shared by
//! reference and the pin sits behind a `RefCell`.

mod bank;

use core::cell::{Cell, RefCell};

use embedded_hal::digital::InputPin;
use serde::Deserialize;

pub use bank::{EndstopBank, EndstopHandle, EndstopId, MAX_ENDSTOPS};

/// Logical axis an endstop belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
    /// Extruder axis
    E,
}

/// Capability shared by all endstop variants.
pub trait Endstop {
    /// Sample the sensor and return `true` if the limit is reached.
    fn triggered(&self) -> bool;

    /// Result of the last [`triggered`](Endstop::triggered) call.
    fn state(&self) -> bool;
}

impl<T: Endstop + ?Sized> Endstop for &T {
    #[inline]
    fn triggered(&self) -> bool {
        T::triggered(self)
    }

    #[inline]
    fn state(&self) -> bool {
        T::state(self)
    }
}

/// Placeholder for an axis side without a switch. Never triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEndstop;

impl Endstop for NoEndstop {
    #[inline]
    fn triggered(&self) -> bool {
        false
    }

    #[inline]
    fn state(&self) -> bool {
        false
    }
}

/// Hardware switch on a digital input.
///
/// Active polarity is a property of the pin (see [`LogicalInput`](crate::io::LogicalInput)):
/// a logical high means the switch is pressed. A failed read counts as
/// triggered so motion stops rather than running into the frame.
#[derive(Debug)]
pub struct SwitchEndstop<P> {
    pin: RefCell<P>,
    axis: Axis,
    state: Cell<bool>,
}

impl<P: InputPin> SwitchEndstop<P> {
    /// Wrap an input pin as the endstop of `axis`.
    pub fn new(pin: P, axis: Axis) -> Self {
        Self {
            pin: RefCell::new(pin),
            axis,
            state: Cell::new(false),
        }
    }

    /// Axis this switch belongs to.
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }
}

impl<P: InputPin> Endstop for SwitchEndstop<P> {
    fn triggered(&self) -> bool {
        let level = match self.pin.try_borrow_mut() {
            Ok(mut pin) => pin.is_high().unwrap_or(true),
            // re-entered from an interrupt while sampling: report the last value
            Err(_) => return self.state.get(),
        };
        self.state.set(level);
        level
    }

    #[inline]
    fn state(&self) -> bool {
        self.state.get()
    }
}

/// Sample both sources without short circuit, cache and return their OR.
///
/// Shared by [`MergedEndstop`] and the merged slots of an [`EndstopBank`].
pub(crate) fn sample_merged<A, B>(first: &A, second: &B, state: &Cell<bool>) -> bool
where
    A: Endstop + ?Sized,
    B: Endstop + ?Sized,
{
    let first = first.triggered();
    let second = second.triggered();
    state.set(first || second);
    first || second
}

/// Logical OR of two endstops that sense the same limit.
///
/// Holds non-owning references; both sources are sampled on every query.
#[derive(Debug)]
pub struct MergedEndstop<'a, A: ?Sized, B: ?Sized> {
    first: &'a A,
    second: &'a B,
    state: Cell<bool>,
}

impl<'a, A, B> MergedEndstop<'a, A, B>
where
    A: Endstop + ?Sized,
    B: Endstop + ?Sized,
{
    /// Merge two sources.
    pub fn new(first: &'a A, second: &'a B) -> Self {
        Self {
            first,
            second,
            state: Cell::new(false),
        }
    }
}

impl<A, B> Endstop for MergedEndstop<'_, A, B>
where
    A: Endstop + ?Sized,
    B: Endstop + ?Sized,
{
    fn triggered(&self) -> bool {
        sample_merged(self.first, self.second, &self.state)
    }

    #[inline]
    fn state(&self) -> bool {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
    use proptest::prelude::*;

    struct Fixed {
        level: bool,
        samples: Cell<u32>,
    }

    impl Fixed {
        fn new(level: bool) -> Self {
            Self { level, samples: Cell::new(0) }
        }
    }

    impl Endstop for Fixed {
        fn triggered(&self) -> bool {
            self.samples.set(self.samples.get() + 1);
            self.level
        }

        fn state(&self) -> bool {
            self.level
        }
    }

    #[test]
    fn test_no_endstop_never_triggers() {
        let none = NoEndstop;
        assert!(!none.triggered());
        assert!(!none.state());
    }

    #[test]
    fn test_switch_caches_last_sample() {
        let mut pin = PinMock::new(&[Transaction::get(State::High), Transaction::get(State::Low)]);
        let switch = SwitchEndstop::new(pin.clone(), Axis::X);
        assert!(!switch.state());
        assert!(switch.triggered());
        assert!(switch.state());
        assert!(!switch.triggered());
        assert!(!switch.state());
        assert_eq!(switch.axis(), Axis::X);
        pin.done();
    }

    #[test]
    fn test_merged_samples_both_sources() {
        let a = Fixed::new(true);
        let b = Fixed::new(false);
        let merged = MergedEndstop::new(&a, &b);
        assert!(merged.triggered());
        assert_eq!(a.samples.get(), 1);
        assert_eq!(b.samples.get(), 1);
    }

    #[test]
    fn test_shared_source_in_two_merges() {
        let a = Fixed::new(false);
        let b = Fixed::new(true);
        let x_max = MergedEndstop::new(&a, &b);
        let y_max = MergedEndstop::new(&a, &b);
        assert!(x_max.triggered());
        assert!(y_max.triggered());
        assert_eq!(a.samples.get(), 2);
    }

    proptest! {
        #[test]
        fn prop_merged_is_logical_or(first in any::<bool>(), second in any::<bool>()) {
            let a = Fixed::new(first);
            let b = Fixed::new(second);
            let merged = MergedEndstop::new(&a, &b);
            prop_assert_eq!(merged.triggered(), first || second);
            prop_assert_eq!(merged.state(), first || second);
        }
    }
}
