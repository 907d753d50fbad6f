//! Register-level capabilities of a programmable stepper driver chip.
//!
//! Register addresses and bit layouts belong to the chip implementation
//! ([`Tmc2130`](super::Tmc2130)); [`SmartStepperDriver`](super::SmartStepperDriver)
//! sequences these calls. Getters take `&mut self` because a read may be an
//! SPI transaction.

/// Programmable driver chip with stall detection.
pub trait SmartChip {
    /// Bus error type.
    type Error: core::fmt::Debug;

    /// Bring-up sequence: write power-on defaults to every register.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Connection test: 0 = ok, 1 = bus reads all ones, 2 = bus reads all zeros.
    fn test_connection(&mut self) -> Result<u8, Self::Error>;

    /// Silicon version.
    fn version(&mut self) -> Result<u8, Self::Error>;

    /// Whether the motor is at standstill.
    fn standstill(&mut self) -> Result<bool, Self::Error>;

    /// Use the analog input as current reference.
    fn set_analog_current_reference(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Internal microstep interpolation to 256 microsteps.
    fn set_interpolation(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Use internal sense resistors instead of external ones.
    fn set_internal_rsense(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Chopper mode (0 = spread cycle, 1 = constant off time).
    fn set_chopper_mode(&mut self, mode: u8) -> Result<(), Self::Error>;

    /// Chopper off time.
    fn set_off_time(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Comparator blank time.
    fn set_blank_time(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Coolstep activation speed.
    fn coolstep_speed(&mut self) -> Result<u32, Self::Error>;

    /// Set coolstep activation speed.
    fn set_coolstep_speed(&mut self, speed: u32) -> Result<(), Self::Error>;

    /// Upper speed threshold for stealth mode.
    fn stealth_max_speed(&mut self) -> Result<u32, Self::Error>;

    /// Set upper speed threshold for stealth mode.
    fn set_stealth_max_speed(&mut self, speed: u32) -> Result<(), Self::Error>;

    /// Whether stealth (quiet PWM) mode is enabled.
    fn stealth(&mut self) -> Result<bool, Self::Error>;

    /// Enable or disable stealth mode.
    fn set_stealth(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Stallguard threshold.
    fn stallguard_threshold(&mut self) -> Result<i8, Self::Error>;

    /// Set stallguard threshold (0 is neutral).
    fn set_stallguard_threshold(&mut self, threshold: i8) -> Result<(), Self::Error>;

    /// Stallguard result filtering.
    fn set_stallguard_filter(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Route the stall signal to the diagnostic output line.
    fn set_stall_output(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Drive the diagnostic output active high.
    fn set_stall_output_active_high(&mut self, active_high: bool) -> Result<(), Self::Error>;

    /// RMS motor current in mA.
    fn rms_current(&mut self) -> Result<u16, Self::Error>;

    /// Set RMS motor current in mA.
    fn set_rms_current(&mut self, milliamps: u16) -> Result<(), Self::Error>;

    /// Microsteps per full step.
    fn microsteps(&mut self) -> Result<u16, Self::Error>;

    /// Set microsteps per full step (power of two).
    fn set_microsteps(&mut self, microsteps: u16) -> Result<(), Self::Error>;

    /// One sample of the live driver status flags.
    fn drive_status(&mut self) -> Result<DriveStatus, Self::Error>;
}

/// Live status flags decoded from a single status register read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStatus {
    /// Motor at standstill.
    pub standstill: bool,
    /// Stallguard load value.
    pub stallguard_result: u16,
    /// Over-temperature shutdown.
    pub over_temperature: bool,
    /// Over-temperature prewarning.
    pub over_temperature_prewarning: bool,
    /// Actual current scale used by the chopper.
    pub current_scale: u8,
}
