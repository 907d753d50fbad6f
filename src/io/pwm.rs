//! PWM channels for fans and heaters.
//!
//! Duty cycles are 8-bit (0 = off, 255 = full power). Software channels toggle
//! a logical output from [`PwmChannel::tick`], which the caller drives from its
//! PWM timer; hardware channels forward to an embedded-hal `SetDutyCycle`.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::error::DriverError;

/// Full-scale 8-bit duty.
pub const FULL_DUTY: u8 = 255;

/// Software PWM over a digital output with a 256-tick period.
#[derive(Debug)]
pub struct SoftwarePwm<P> {
    pin: P,
    duty: u8,
    counter: u8,
}

impl<P: OutputPin> SoftwarePwm<P> {
    /// Create a channel, initially off.
    pub fn new(pin: P) -> Self {
        Self { pin, duty: 0, counter: 0 }
    }

    /// Current duty.
    #[inline]
    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// Store a new duty; the pin follows on the next tick.
    #[inline]
    pub fn set_duty(&mut self, duty: u8) {
        self.duty = duty;
    }

    /// Advance the PWM counter by one tick and update the pin.
    pub fn tick(&mut self) -> Result<(), P::Error> {
        self.counter = self.counter.wrapping_add(1);
        let on = self.duty == FULL_DUTY || self.counter < self.duty;
        if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}

/// Backing output of a PWM channel.
#[derive(Debug)]
pub enum PwmOutput<O, H> {
    /// Software PWM on a digital output.
    Software(SoftwarePwm<O>),
    /// Hardware PWM peripheral.
    Hardware(H),
}

#[derive(Debug, Clone, Copy)]
struct Kickstart {
    duration_ms: u32,
    remaining_ms: u32,
    pending: u8,
}

/// A named PWM channel with optional kickstart.
///
/// Kickstart runs a fan at full power for a fixed time when it is switched on
/// from zero, then falls back to the requested duty.
#[derive(Debug)]
pub struct PwmChannel<O, H> {
    output: PwmOutput<O, H>,
    kickstart: Option<Kickstart>,
    duty: u8,
}

impl<O, H> PwmChannel<O, H>
where
    O: OutputPin,
    H: SetDutyCycle,
{
    /// Software channel on a digital output.
    pub fn software(pin: O) -> Self {
        Self {
            output: PwmOutput::Software(SoftwarePwm::new(pin)),
            kickstart: None,
            duty: 0,
        }
    }

    /// Hardware channel.
    pub fn hardware(pwm: H) -> Self {
        Self {
            output: PwmOutput::Hardware(pwm),
            kickstart: None,
            duty: 0,
        }
    }

    /// Add kickstart with the given full-power time.
    pub fn with_kickstart(mut self, duration_ms: u32) -> Self {
        self.set_kickstart(duration_ms);
        self
    }

    /// Configure kickstart in place.
    pub fn set_kickstart(&mut self, duration_ms: u32) {
        self.kickstart = Some(Kickstart {
            duration_ms,
            remaining_ms: 0,
            pending: 0,
        });
    }

    /// Whether kickstart is configured.
    pub fn has_kickstart(&self) -> bool {
        self.kickstart.is_some()
    }

    /// Whether a kickstart burst is currently running.
    pub fn is_kicking(&self) -> bool {
        self.kickstart.map(|k| k.remaining_ms > 0).unwrap_or(false)
    }

    /// Requested duty (not the kickstart burst).
    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// Set the duty cycle.
    pub fn set_duty(&mut self, duty: u8) -> Result<(), DriverError> {
        let previous = self.duty;
        self.duty = duty;
        if let Some(kick) = self.kickstart.as_mut() {
            if previous == 0 && duty > 0 && duty < FULL_DUTY && kick.duration_ms > 0 {
                kick.remaining_ms = kick.duration_ms;
                kick.pending = duty;
                return self.apply(FULL_DUTY);
            }
            if kick.remaining_ms > 0 {
                if duty == 0 {
                    kick.remaining_ms = 0;
                } else {
                    kick.pending = duty;
                    return Ok(());
                }
            }
        }
        self.apply(duty)
    }

    /// Advance time. Software channels toggle once per call; kickstart counts down `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: u32) -> Result<(), DriverError> {
        let mut release = None;
        if let Some(kick) = self.kickstart.as_mut() {
            if kick.remaining_ms > 0 {
                kick.remaining_ms = kick.remaining_ms.saturating_sub(elapsed_ms);
                if kick.remaining_ms == 0 {
                    release = Some(kick.pending);
                }
            }
        }
        if let Some(duty) = release {
            self.apply(duty)?;
        }
        if let PwmOutput::Software(soft) = &mut self.output {
            soft.tick().map_err(|_| DriverError::Pin)?;
        }
        Ok(())
    }

    fn apply(&mut self, duty: u8) -> Result<(), DriverError> {
        match &mut self.output {
            PwmOutput::Software(soft) => {
                soft.set_duty(duty);
                Ok(())
            }
            PwmOutput::Hardware(pwm) => pwm
                .set_duty_cycle_fraction(u16::from(duty), u16::from(FULL_DUTY))
                .map_err(|_| DriverError::Pwm),
        }
    }

    /// Access the backing output.
    pub fn output(&self) -> &PwmOutput<O, H> {
        &self.output
    }
}
