//! Pin-level peripherals: logical pins, PWM channels and temperature channels.

pub mod pin;
pub mod pwm;
pub mod temperature;

pub use pin::{AnalogInput, LogicalInput, LogicalOutput};
pub use pwm::{PwmChannel, PwmOutput, SoftwarePwm};
pub use temperature::{TablePoint, TemperatureChannel, TemperatureTable};
