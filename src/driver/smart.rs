//! Register-programmable stepper driver with stall detection.
//!
//! The GPIO side is a [`SimpleStepperDriver`]; stepping never touches SPI.
//! Configuration writes first wait for the chip to report standstill. The wait
//! is bounded by [`SmartDriverConfig::standstill_timeout_ms`] and polled through
//! an embedded-hal delay.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::units::Microsteps;
use crate::endstop::Endstop;
use crate::error::DriverError;

use super::chip::SmartChip;
use super::simple::{SimpleStepperDriver, StepperPins};
use super::state::{DriverState, HomingBackup};
use super::{DriverResult, DriverStatus, StepperDriver};

/// Interval between standstill polls.
pub const STANDSTILL_POLL_US: u32 = 100;

/// Chopper off time written at bring-up.
const OFF_TIME: u8 = 5;
/// Comparator blank time written at bring-up.
const BLANK_TIME: u8 = 2;

/// Static configuration of a smart driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartDriverConfig {
    /// Coolstep activation speed during normal operation.
    pub coolstep_speed: u32,
    /// Coolstep activation speed while homing (stall detection threshold).
    pub homing_coolstep_speed: u32,
    /// Upper speed for stealth mode.
    pub stealth_max_speed: u32,
    /// Enable stealth mode after bring-up.
    pub stealth: bool,
    /// RMS current applied at bring-up, in mA.
    pub current_ma: u16,
    /// Current that corresponds to 100 % in `set_motor_current_percent`.
    pub max_current_ma: u16,
    /// Microsteps applied at bring-up.
    pub microsteps: Microsteps,
    /// Upper bound for standstill waits.
    pub standstill_timeout_ms: u32,
}

impl Default for SmartDriverConfig {
    fn default() -> Self {
        Self {
            coolstep_speed: 300,
            homing_coolstep_speed: 300,
            stealth_max_speed: 0,
            stealth: false,
            current_ma: 800,
            max_current_ma: 1500,
            microsteps: Microsteps::SIXTEENTH,
            standstill_timeout_ms: 1000,
        }
    }
}

/// Stepper driver backed by a programmable chip (TMC2130 style).
///
/// Generic over:
/// - `STEP`, `DIR`, `EN`: output pins
/// - `E`: endstop reference type (a stall-detection endstop is an ordinary
///   switch on the chip's diagnostic line)
/// - `C`: the chip
/// - `D`: delay used for standstill polling
pub struct SmartStepperDriver<STEP, DIR, EN, E, C, D> {
    gpio: SimpleStepperDriver<STEP, DIR, EN, E>,
    chip: C,
    delay: D,
    config: SmartDriverConfig,
    state: DriverState,
    backup: Option<HomingBackup>,
    connection_test: u8,
}

#[inline]
fn spi<T>(_: T) -> DriverError {
    DriverError::Spi
}

impl<STEP, DIR, EN, E, C, D> SmartStepperDriver<STEP, DIR, EN, E, C, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    E: Endstop,
    C: SmartChip,
    D: DelayNs,
{
    /// Create an uninitialized driver.
    pub fn new(
        label: &str,
        pins: StepperPins<STEP, DIR, EN>,
        min_endstop: E,
        max_endstop: E,
        chip: C,
        delay: D,
        config: SmartDriverConfig,
    ) -> Self {
        Self {
            gpio: SimpleStepperDriver::new(label, pins, min_endstop, max_endstop),
            chip,
            delay,
            config,
            state: DriverState::Uninitialized,
            backup: None,
            connection_test: 0,
        }
    }

    /// Lifecycle state.
    #[inline]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Registers saved for the homing move in progress, if any.
    #[inline]
    pub fn homing_backup(&self) -> Option<HomingBackup> {
        self.backup
    }

    /// Static configuration.
    #[inline]
    pub fn config(&self) -> &SmartDriverConfig {
        &self.config
    }

    /// Result of the last connection test.
    #[inline]
    pub fn connection_test(&self) -> u8 {
        self.connection_test
    }

    /// Access the chip.
    pub fn chip(&self) -> &C {
        &self.chip
    }

    /// Mutable access to the chip. Bypasses standstill checks.
    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    /// Set the stallguard threshold used for stall detection.
    pub fn set_stallguard_threshold(&mut self, threshold: i8) -> DriverResult<()> {
        self.require_configurable()?;
        self.wait_for_standstill()?;
        self.chip.set_stallguard_threshold(threshold).map_err(spi)
    }

    /// Poll standstill until it is reported or the timeout expires.
    pub fn wait_for_standstill(&mut self) -> DriverResult<()> {
        let polls = self.config.standstill_timeout_ms.saturating_mul(1000) / STANDSTILL_POLL_US;
        for _ in 0..=polls {
            if self.chip.standstill().map_err(spi)? {
                return Ok(());
            }
            self.delay.delay_us(STANDSTILL_POLL_US);
        }
        warn!(
            "{}: no standstill after {} ms",
            self.gpio.label(),
            self.config.standstill_timeout_ms
        );
        Err(DriverError::StandstillTimeout)
    }

    fn require_configurable(&self) -> DriverResult<()> {
        match self.state {
            DriverState::Ready | DriverState::Homing => Ok(()),
            other => Err(DriverError::NotReady(other)),
        }
    }

    fn bring_up(&mut self) -> DriverResult<()> {
        self.gpio.disable()?;
        self.chip.begin().map_err(spi)?;
        let code = self.chip.test_connection().map_err(spi)?;
        self.connection_test = code;
        if code != 0 {
            error!("{}: SPI connection test failed with code {}", self.gpio.label(), code);
            return Err(DriverError::ConnectionFailed { code });
        }
        let version = self.chip.version().map_err(spi)?;
        info!("{}: chip version {}", self.gpio.label(), version);

        self.wait_for_standstill()?;
        let chip = &mut self.chip;
        chip.set_analog_current_reference(false).map_err(spi)?;
        chip.set_interpolation(false).map_err(spi)?;
        chip.set_internal_rsense(false).map_err(spi)?;
        chip.set_chopper_mode(0).map_err(spi)?;
        chip.set_off_time(OFF_TIME).map_err(spi)?;
        chip.set_blank_time(BLANK_TIME).map_err(spi)?;
        chip.set_coolstep_speed(self.config.coolstep_speed).map_err(spi)?;
        chip.set_stallguard_threshold(0).map_err(spi)?;
        chip.set_stall_output(true).map_err(spi)?;
        chip.set_stall_output_active_high(true).map_err(spi)?;
        chip.set_stealth_max_speed(self.config.stealth_max_speed).map_err(spi)?;
        chip.set_stealth(self.config.stealth).map_err(spi)?;
        chip.set_rms_current(self.config.current_ma).map_err(spi)?;
        chip.set_microsteps(self.config.microsteps.value()).map_err(spi)?;
        self.gpio.enable()
    }

    fn snapshot(&mut self) -> DriverResult<HomingBackup> {
        Ok(HomingBackup {
            coolstep_speed: self.chip.coolstep_speed().map_err(spi)?,
            stealth_max_speed: self.chip.stealth_max_speed().map_err(spi)?,
            stealth_enabled: self.chip.stealth().map_err(spi)?,
        })
    }

    fn configure_homing(&mut self) -> DriverResult<()> {
        self.wait_for_standstill()?;
        self.chip.set_stealth(false).map_err(spi)?;
        self.chip.set_stallguard_filter(false).map_err(spi)?;
        self.chip
            .set_coolstep_speed(self.config.homing_coolstep_speed)
            .map_err(spi)?;
        self.chip.set_stall_output(true).map_err(spi)
    }

    fn restore(&mut self, backup: HomingBackup) -> DriverResult<()> {
        self.wait_for_standstill()?;
        self.chip.set_coolstep_speed(backup.coolstep_speed).map_err(spi)?;
        self.chip.set_stealth_max_speed(backup.stealth_max_speed).map_err(spi)?;
        self.chip.set_stealth(backup.stealth_enabled).map_err(spi)
    }

    fn read_status(&mut self) -> DriverResult<DriverStatus> {
        let chip = &mut self.chip;
        // all live flags come from one status sample
        let drive = chip.drive_status().map_err(spi)?;
        let status = DriverStatus {
            label: crate::error::short_name(self.gpio.label()),
            version: chip.version().map_err(spi)?,
            connection_test: chip.test_connection().map_err(spi)?,
            current_ma: chip.rms_current().map_err(spi)?,
            microsteps: chip.microsteps().map_err(spi)?,
            stallguard_threshold: chip.stallguard_threshold().map_err(spi)?,
            stallguard_result: drive.stallguard_result,
            over_temperature: drive.over_temperature,
            over_temperature_prewarning: drive.over_temperature_prewarning,
            cs_active: drive.current_scale > 0,
        };
        self.connection_test = status.connection_test;
        Ok(status)
    }
}

impl<STEP, DIR, EN, E, C, D> StepperDriver for SmartStepperDriver<STEP, DIR, EN, E, C, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    E: Endstop,
    C: SmartChip,
    D: DelayNs,
{
    type Endstop = E;

    #[inline]
    fn label(&self) -> &str {
        self.gpio.label()
    }

    #[inline]
    fn direction(&self) -> bool {
        self.gpio.direction()
    }

    #[inline]
    fn min_endstop(&self) -> &E {
        self.gpio.min_endstop()
    }

    #[inline]
    fn max_endstop(&self) -> &E {
        self.gpio.max_endstop()
    }

    fn init(&mut self) -> DriverResult<()> {
        info!("{}: TMC2130 initialization", self.gpio.label());
        self.state = DriverState::Initializing;
        match self.bring_up() {
            Ok(()) => {
                self.state = DriverState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = DriverState::Faulted;
                Err(e)
            }
        }
    }

    #[inline]
    fn step_cond(&mut self) -> DriverResult<bool> {
        self.gpio.step_cond()
    }

    #[inline]
    fn step(&mut self) -> DriverResult<()> {
        self.gpio.step()
    }

    #[inline]
    fn unstep(&mut self) -> DriverResult<()> {
        self.gpio.unstep()
    }

    #[inline]
    fn dir(&mut self, d: bool) -> DriverResult<()> {
        self.gpio.dir(d)
    }

    #[inline]
    fn enable(&mut self) -> DriverResult<()> {
        self.gpio.enable()
    }

    #[inline]
    fn disable(&mut self) -> DriverResult<()> {
        self.gpio.disable()
    }

    fn implements_set_microsteps(&self) -> bool {
        true
    }

    fn implements_set_max_current(&self) -> bool {
        true
    }

    fn set_microsteps(&mut self, microsteps: Microsteps) -> DriverResult<()> {
        self.require_configurable()?;
        self.wait_for_standstill()?;
        self.chip.set_microsteps(microsteps.value()).map_err(spi)
    }

    fn set_motor_current(&mut self, milliamps: u16) -> DriverResult<()> {
        self.require_configurable()?;
        self.wait_for_standstill()?;
        self.chip.set_rms_current(milliamps).map_err(spi)
    }

    fn set_motor_current_percent(&mut self, percent: u8) -> DriverResult<()> {
        let percent = u32::from(percent.min(100));
        let milliamps = u32::from(self.config.max_current_ma) * percent / 100;
        self.set_motor_current(milliamps as u16)
    }

    fn before_homing(&mut self) -> DriverResult<()> {
        if self.state != DriverState::Ready {
            return Err(DriverError::NotReady(self.state));
        }
        self.state = DriverState::HomingPrep;
        let backup = match self.snapshot() {
            Ok(backup) => backup,
            Err(e) => {
                self.state = DriverState::Ready;
                return Err(e);
            }
        };
        self.backup = Some(backup);
        let result = self.configure_homing();
        // once the snapshot exists after_homing() is owed, even if prep failed
        self.state = DriverState::Homing;
        debug!("{}: homing mode", self.gpio.label());
        result
    }

    fn after_homing(&mut self) -> DriverResult<()> {
        debug_assert!(
            matches!(self.state, DriverState::Homing | DriverState::HomingRestore),
            "after_homing() without before_homing()"
        );
        let Some(backup) = self.backup else {
            return Err(DriverError::NotReady(self.state));
        };
        self.state = DriverState::HomingRestore;
        self.restore(backup)?;
        self.backup = None;
        self.state = DriverState::Ready;
        debug!("{}: homing registers restored", self.gpio.label());
        Ok(())
    }

    fn status(&mut self, out: Option<&mut DriverStatus>) -> DriverResult<()> {
        let Some(out) = out else {
            return Ok(());
        };
        *out = self.read_status()?;
        Ok(())
    }
}
