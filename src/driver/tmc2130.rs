//! TMC2130 register protocol over an embedded-hal [`SpiDevice`].
//!
//! Every access is one 40-bit datagram: an address byte (bit 7 set for
//! writes) followed by 32 data bits, big-endian. Replies are pipelined, the
//! data returned by a datagram belongs to the *previous* read request, so a
//! register read costs two transfers.
//!
//! Several registers are write-only; their last written value is kept in a
//! shadow copy and getters answer from it.

use embedded_hal::spi::SpiDevice;

use super::chip::{DriveStatus, SmartChip};

/// Register addresses and field layout.
pub mod reg {
    /// Global configuration.
    pub const GCONF: u8 = 0x00;
    /// Global status flags (write 1 to clear).
    pub const GSTAT: u8 = 0x01;
    /// Input pin states and silicon version.
    pub const IOIN: u8 = 0x04;
    /// Hold and run current.
    pub const IHOLD_IRUN: u8 = 0x10;
    /// Delay before power-down at standstill.
    pub const TPOWERDOWN: u8 = 0x11;
    /// Upper velocity threshold for stealth mode.
    pub const TPWMTHRS: u8 = 0x13;
    /// Lower velocity threshold for coolstep and stallguard.
    pub const TCOOLTHRS: u8 = 0x14;
    /// Chopper configuration.
    pub const CHOPCONF: u8 = 0x6C;
    /// Coolstep and stallguard configuration.
    pub const COOLCONF: u8 = 0x6D;
    /// Driver status flags.
    pub const DRV_STATUS: u8 = 0x6F;
    /// Stealth chopper configuration.
    pub const PWMCONF: u8 = 0x70;

    /// Address flag marking a write access.
    pub const WRITE: u8 = 0x80;

    /// GCONF: analog current reference on AIN.
    pub const GCONF_I_SCALE_ANALOG: u32 = 1 << 0;
    /// GCONF: internal sense resistors.
    pub const GCONF_INTERNAL_RSENSE: u32 = 1 << 1;
    /// GCONF: stealth mode.
    pub const GCONF_EN_PWM_MODE: u32 = 1 << 2;
    /// GCONF: stall signal on DIAG1.
    pub const GCONF_DIAG1_STALL: u32 = 1 << 8;
    /// GCONF: DIAG1 push-pull (active high).
    pub const GCONF_DIAG1_PUSHPULL: u32 = 1 << 13;

    /// CHOPCONF: off time field.
    pub const CHOPCONF_TOFF_MASK: u32 = 0xF;
    /// CHOPCONF: chopper mode bit.
    pub const CHOPCONF_CHM: u32 = 1 << 14;
    /// CHOPCONF: blank time shift.
    pub const CHOPCONF_TBL_SHIFT: u32 = 15;
    /// CHOPCONF: high sensitivity sense voltage.
    pub const CHOPCONF_VSENSE: u32 = 1 << 17;
    /// CHOPCONF: microstep resolution shift.
    pub const CHOPCONF_MRES_SHIFT: u32 = 24;
    /// CHOPCONF: interpolation to 256 microsteps.
    pub const CHOPCONF_INTPOL: u32 = 1 << 28;

    /// COOLCONF: stallguard threshold shift (7-bit signed).
    pub const COOLCONF_SGT_SHIFT: u32 = 16;
    /// COOLCONF: stallguard filter.
    pub const COOLCONF_SFILT: u32 = 1 << 24;

    /// DRV_STATUS: stallguard result mask.
    pub const DRV_STATUS_SG_RESULT_MASK: u32 = 0x3FF;
    /// DRV_STATUS: actual current scale shift.
    pub const DRV_STATUS_CS_ACTUAL_SHIFT: u32 = 16;
    /// DRV_STATUS: over-temperature.
    pub const DRV_STATUS_OT: u32 = 1 << 25;
    /// DRV_STATUS: over-temperature prewarning.
    pub const DRV_STATUS_OTPW: u32 = 1 << 26;
    /// DRV_STATUS: standstill.
    pub const DRV_STATUS_STST: u32 = 1 << 31;

    /// Velocity thresholds are 20 bits wide.
    pub const VELOCITY_MASK: u32 = 0xF_FFFF;
}

const CHOPCONF_DEFAULT: u32 = 0x0001_00C3;
const PWMCONF_DEFAULT: u32 = 0x0005_0480;
const IHOLD_IRUN_DEFAULT: u32 = 0x0006_1F0A;
const TPOWERDOWN_DEFAULT: u32 = 10;

/// Hold current as a fraction of run current.
const HOLD_MULTIPLIER: f32 = 0.5;
const VSENSE_LOW: f32 = 0.325;
const VSENSE_HIGH: f32 = 0.180;
const SQRT_2: f32 = core::f32::consts::SQRT_2;

/// Register-level TMC2130 driver.
pub struct Tmc2130<SPI> {
    spi: SPI,
    rsense_ohms: f32,
    spi_status: u8,
    gconf: u32,
    chopconf: u32,
    coolconf: u32,
    pwmconf: u32,
    ihold_irun: u32,
    tpwmthrs: u32,
    tcoolthrs: u32,
}

impl<SPI: SpiDevice> Tmc2130<SPI> {
    /// Wrap a chip-select-bound SPI device. `rsense_ohms` is the external sense resistor.
    pub fn new(spi: SPI, rsense_ohms: f32) -> Self {
        Self {
            spi,
            rsense_ohms,
            spi_status: 0,
            gconf: 0,
            chopconf: CHOPCONF_DEFAULT,
            coolconf: 0,
            pwmconf: PWMCONF_DEFAULT,
            ihold_irun: IHOLD_IRUN_DEFAULT,
            tpwmthrs: 0,
            tcoolthrs: 0,
        }
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Status byte returned with the last datagram.
    pub fn spi_status(&self) -> u8 {
        self.spi_status
    }

    fn datagram(&mut self, address: u8, value: u32) -> Result<u32, SPI::Error> {
        let data = value.to_be_bytes();
        let mut buf = [address, data[0], data[1], data[2], data[3]];
        self.spi.transfer_in_place(&mut buf)?;
        self.spi_status = buf[0];
        Ok(u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]))
    }

    /// Write a register.
    pub fn write_register(&mut self, address: u8, value: u32) -> Result<(), SPI::Error> {
        self.datagram(address | reg::WRITE, value).map(|_| ())
    }

    /// Read a register (two datagrams).
    pub fn read_register(&mut self, address: u8) -> Result<u32, SPI::Error> {
        let address = address & !reg::WRITE;
        self.datagram(address, 0)?;
        self.datagram(address, 0)
    }

    fn update_gconf(&mut self, mask: u32, set: bool) -> Result<(), SPI::Error> {
        self.gconf = with_bits(self.gconf, mask, set);
        self.write_register(reg::GCONF, self.gconf)
    }

    fn write_chopconf(&mut self, value: u32) -> Result<(), SPI::Error> {
        self.chopconf = value;
        self.write_register(reg::CHOPCONF, value)
    }

    fn write_coolconf(&mut self, value: u32) -> Result<(), SPI::Error> {
        self.coolconf = value;
        self.write_register(reg::COOLCONF, value)
    }

    fn drv_status(&mut self) -> Result<u32, SPI::Error> {
        self.read_register(reg::DRV_STATUS)
    }

    fn vsense_voltage(&self) -> f32 {
        if self.chopconf & reg::CHOPCONF_VSENSE != 0 {
            VSENSE_HIGH
        } else {
            VSENSE_LOW
        }
    }

    fn current_scale_for(&self, milliamps: u16, vsense: f32) -> f32 {
        32.0 * SQRT_2 * f32::from(milliamps) / 1000.0 * (self.rsense_ohms + 0.02) / vsense - 1.0
    }
}

#[inline]
fn with_bits(value: u32, mask: u32, set: bool) -> u32 {
    if set {
        value | mask
    } else {
        value & !mask
    }
}

impl<SPI: SpiDevice> SmartChip for Tmc2130<SPI> {
    type Error = SPI::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.write_register(reg::GSTAT, 0x7)?;
        self.gconf = 0;
        self.write_register(reg::GCONF, self.gconf)?;
        self.write_chopconf(CHOPCONF_DEFAULT)?;
        self.write_coolconf(0)?;
        self.pwmconf = PWMCONF_DEFAULT;
        self.write_register(reg::PWMCONF, self.pwmconf)?;
        self.ihold_irun = IHOLD_IRUN_DEFAULT;
        self.write_register(reg::IHOLD_IRUN, self.ihold_irun)?;
        self.write_register(reg::TPOWERDOWN, TPOWERDOWN_DEFAULT)?;
        self.tpwmthrs = 0;
        self.write_register(reg::TPWMTHRS, 0)?;
        self.tcoolthrs = 0;
        self.write_register(reg::TCOOLTHRS, 0)
    }

    fn test_connection(&mut self) -> Result<u8, Self::Error> {
        Ok(match self.read_register(reg::IOIN)? {
            0xFFFF_FFFF => 1,
            0 => 2,
            _ => 0,
        })
    }

    fn version(&mut self) -> Result<u8, Self::Error> {
        Ok((self.read_register(reg::IOIN)? >> 24) as u8)
    }

    fn standstill(&mut self) -> Result<bool, Self::Error> {
        Ok(self.drive_status()?.standstill)
    }

    fn set_analog_current_reference(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.update_gconf(reg::GCONF_I_SCALE_ANALOG, enabled)
    }

    fn set_interpolation(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.write_chopconf(with_bits(self.chopconf, reg::CHOPCONF_INTPOL, enabled))
    }

    fn set_internal_rsense(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.update_gconf(reg::GCONF_INTERNAL_RSENSE, enabled)
    }

    fn set_chopper_mode(&mut self, mode: u8) -> Result<(), Self::Error> {
        self.write_chopconf(with_bits(self.chopconf, reg::CHOPCONF_CHM, mode != 0))
    }

    fn set_off_time(&mut self, value: u8) -> Result<(), Self::Error> {
        let value = u32::from(value) & reg::CHOPCONF_TOFF_MASK;
        self.write_chopconf((self.chopconf & !reg::CHOPCONF_TOFF_MASK) | value)
    }

    fn set_blank_time(&mut self, value: u8) -> Result<(), Self::Error> {
        let mask = 0b11 << reg::CHOPCONF_TBL_SHIFT;
        let value = (u32::from(value) & 0b11) << reg::CHOPCONF_TBL_SHIFT;
        self.write_chopconf((self.chopconf & !mask) | value)
    }

    fn coolstep_speed(&mut self) -> Result<u32, Self::Error> {
        Ok(self.tcoolthrs)
    }

    fn set_coolstep_speed(&mut self, speed: u32) -> Result<(), Self::Error> {
        self.tcoolthrs = speed & reg::VELOCITY_MASK;
        self.write_register(reg::TCOOLTHRS, self.tcoolthrs)
    }

    fn stealth_max_speed(&mut self) -> Result<u32, Self::Error> {
        Ok(self.tpwmthrs)
    }

    fn set_stealth_max_speed(&mut self, speed: u32) -> Result<(), Self::Error> {
        self.tpwmthrs = speed & reg::VELOCITY_MASK;
        self.write_register(reg::TPWMTHRS, self.tpwmthrs)
    }

    fn stealth(&mut self) -> Result<bool, Self::Error> {
        Ok(self.gconf & reg::GCONF_EN_PWM_MODE != 0)
    }

    fn set_stealth(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.update_gconf(reg::GCONF_EN_PWM_MODE, enabled)
    }

    fn stallguard_threshold(&mut self) -> Result<i8, Self::Error> {
        let raw = ((self.coolconf >> reg::COOLCONF_SGT_SHIFT) & 0x7F) as u8;
        // sign-extend the 7-bit field
        Ok(((raw << 1) as i8) >> 1)
    }

    fn set_stallguard_threshold(&mut self, threshold: i8) -> Result<(), Self::Error> {
        let field = u32::from(threshold.clamp(-64, 63) as u8 & 0x7F) << reg::COOLCONF_SGT_SHIFT;
        let mask = 0x7F << reg::COOLCONF_SGT_SHIFT;
        self.write_coolconf((self.coolconf & !mask) | field)
    }

    fn set_stallguard_filter(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.write_coolconf(with_bits(self.coolconf, reg::COOLCONF_SFILT, enabled))
    }

    fn set_stall_output(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.update_gconf(reg::GCONF_DIAG1_STALL, enabled)
    }

    fn set_stall_output_active_high(&mut self, active_high: bool) -> Result<(), Self::Error> {
        self.update_gconf(reg::GCONF_DIAG1_PUSHPULL, active_high)
    }

    fn rms_current(&mut self) -> Result<u16, Self::Error> {
        let irun = (self.ihold_irun >> 8) & 0x1F;
        let milliamps =
            (irun + 1) as f32 / 32.0 * self.vsense_voltage() / (self.rsense_ohms + 0.02) / SQRT_2 * 1000.0;
        Ok(milliamps as u16)
    }

    fn set_rms_current(&mut self, milliamps: u16) -> Result<(), Self::Error> {
        let mut scale = self.current_scale_for(milliamps, VSENSE_LOW);
        let vsense = scale < 16.0;
        if vsense {
            scale = self.current_scale_for(milliamps, VSENSE_HIGH);
        }
        self.write_chopconf(with_bits(self.chopconf, reg::CHOPCONF_VSENSE, vsense))?;

        let irun = libm::floorf(scale).clamp(0.0, 31.0) as u32;
        let ihold = libm::floorf(irun as f32 * HOLD_MULTIPLIER) as u32;
        self.ihold_irun = (self.ihold_irun & !0x1F1F) | (irun << 8) | ihold;
        self.write_register(reg::IHOLD_IRUN, self.ihold_irun)
    }

    fn microsteps(&mut self) -> Result<u16, Self::Error> {
        let mres = (self.chopconf >> reg::CHOPCONF_MRES_SHIFT) & 0xF;
        Ok(256 >> mres.min(8))
    }

    fn set_microsteps(&mut self, microsteps: u16) -> Result<(), Self::Error> {
        // 256 -> 0 ... 1 -> 8
        let mres = 8 - (microsteps.clamp(1, 256).ilog2().min(8));
        let mask = 0xF << reg::CHOPCONF_MRES_SHIFT;
        self.write_chopconf((self.chopconf & !mask) | (mres << reg::CHOPCONF_MRES_SHIFT))
    }

    fn drive_status(&mut self) -> Result<DriveStatus, Self::Error> {
        Ok(decode_drv_status(self.drv_status()?))
    }
}

fn decode_drv_status(raw: u32) -> DriveStatus {
    DriveStatus {
        standstill: raw & reg::DRV_STATUS_STST != 0,
        stallguard_result: (raw & reg::DRV_STATUS_SG_RESULT_MASK) as u16,
        over_temperature: raw & reg::DRV_STATUS_OT != 0,
        over_temperature_prewarning: raw & reg::DRV_STATUS_OTPW != 0,
        current_scale: ((raw >> reg::DRV_STATUS_CS_ACTUAL_SHIFT) & 0x1F) as u8,
    }
}
