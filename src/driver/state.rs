//! Smart driver lifecycle state and homing register backup.

use core::fmt;

/// Lifecycle of a register-programmable driver.
///
/// `Uninitialized → Initializing → Ready → HomingPrep → Homing → HomingRestore → Ready`,
/// with `Faulted` entered when bring-up fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// `init()` has not run yet.
    #[default]
    Uninitialized,
    /// Bring-up sequence in progress.
    Initializing,
    /// Configured and accepting configuration writes.
    Ready,
    /// Snapshotting registers before homing.
    HomingPrep,
    /// Homing-safe register set active.
    Homing,
    /// Restoring registers after homing.
    HomingRestore,
    /// Bring-up failed; only GPIO enable/disable is meaningful.
    Faulted,
}

impl DriverState {
    /// Name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            DriverState::Uninitialized => "Uninitialized",
            DriverState::Initializing => "Initializing",
            DriverState::Ready => "Ready",
            DriverState::HomingPrep => "HomingPrep",
            DriverState::Homing => "Homing",
            DriverState::HomingRestore => "HomingRestore",
            DriverState::Faulted => "Faulted",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register values saved by `before_homing()` and restored by `after_homing()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HomingBackup {
    /// Coolstep activation speed (TCOOLTHRS).
    pub coolstep_speed: u32,
    /// Upper speed for stealth mode (TPWMTHRS).
    pub stealth_max_speed: u32,
    /// Whether stealth mode was enabled.
    pub stealth_enabled: bool,
}
