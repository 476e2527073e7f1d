// Linux sysfs PWM and IIO ADC access
//
// PWM channel layout: <chip>/pwm<N>/{period,duty_cycle,enable}, created by
// writing N to <chip>/export. Times are in nanoseconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Actuator, BatterySensor, HardwareError, Result};
use crate::config::{PwmChannels, SERVO_PWM_FREQ_HZ};
use crate::motion::{DriveFrame, MotorDuty};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Full scale of a 16-bit duty value
const DUTY_FULL: u64 = 0xFFFF;

/// udev may need a moment to make a freshly exported channel writable
const EXPORT_SETTLE: Duration = Duration::from_millis(50);

fn write_attr(path: &Path, value: impl ToString) -> Result<()> {
    fs::write(path, value.to_string()).map_err(|source| HardwareError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_attr(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| HardwareError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Period in nanoseconds for a frequency
fn period_ns(freq_hz: u32) -> Result<u64> {
    if freq_hz == 0 {
        return Err(HardwareError::Frequency(freq_hz));
    }
    Ok(NANOS_PER_SEC / u64::from(freq_hz))
}

/// Scale a 16-bit duty onto a period
fn duty_ns(period_ns: u64, duty: u16) -> u64 {
    period_ns * u64::from(duty) / DUTY_FULL
}

/// One exported PWM output
#[derive(Debug)]
pub struct PwmChannel {
    dir: PathBuf,
    period_ns: u64,
}

impl PwmChannel {
    /// Export (if needed), configure the period, start at zero duty and enable
    pub fn open(chip: &Path, channel: u32, freq_hz: u32) -> Result<Self> {
        let dir = chip.join(format!("pwm{}", channel));
        if !dir.exists() {
            debug!("Exporting PWM channel {} on {}", channel, chip.display());
            write_attr(&chip.join("export"), channel)?;
            sleep(EXPORT_SETTLE);
        }

        let period_ns = period_ns(freq_hz)?;
        let pwm = Self { dir, period_ns };

        // duty must never exceed the period, so clear it before changing the period
        pwm.write_duty_ns(0)?;
        write_attr(&pwm.dir.join("period"), period_ns)?;
        write_attr(&pwm.dir.join("enable"), 1)?;
        Ok(pwm)
    }

    fn write_duty_ns(&self, ns: u64) -> Result<()> {
        write_attr(&self.dir.join("duty_cycle"), ns)
    }

    /// Set the duty as a fraction of 0xFFFF
    pub fn set_duty_u16(&mut self, duty: u16) -> Result<()> {
        self.write_duty_ns(duty_ns(self.period_ns, duty))
    }
}

/// Both motors (one channel per direction) plus the pan servo
pub struct PwmActuator {
    left_fwd: PwmChannel,
    left_rev: PwmChannel,
    right_fwd: PwmChannel,
    right_rev: PwmChannel,
    servo: PwmChannel,
}

impl PwmActuator {
    /// Open every channel with the motors at rest and the servo at `head_start`
    pub fn open(
        chip: &Path,
        channels: PwmChannels,
        motor_freq_hz: u32,
        head_start: u16,
    ) -> Result<Self> {
        info!(
            "Opening PWM chip {} (motors {} Hz, servo {} Hz)",
            chip.display(),
            motor_freq_hz,
            SERVO_PWM_FREQ_HZ
        );
        let mut actuator = Self {
            left_fwd: PwmChannel::open(chip, channels.left_fwd, motor_freq_hz)?,
            left_rev: PwmChannel::open(chip, channels.left_rev, motor_freq_hz)?,
            right_fwd: PwmChannel::open(chip, channels.right_fwd, motor_freq_hz)?,
            right_rev: PwmChannel::open(chip, channels.right_rev, motor_freq_hz)?,
            servo: PwmChannel::open(chip, channels.servo, SERVO_PWM_FREQ_HZ)?,
        };
        actuator.servo.set_duty_u16(head_start)?;
        Ok(actuator)
    }

    /// Inactive direction is cleared before the active one is driven
    fn drive(fwd: &mut PwmChannel, rev: &mut PwmChannel, duty: MotorDuty) -> Result<()> {
        if duty.is_reverse() {
            fwd.set_duty_u16(0)?;
            rev.set_duty_u16(duty.reverse)
        } else {
            rev.set_duty_u16(0)?;
            fwd.set_duty_u16(duty.forward)
        }
    }
}

impl Actuator for PwmActuator {
    fn apply(&mut self, frame: &DriveFrame) -> Result<()> {
        Self::drive(&mut self.left_fwd, &mut self.left_rev, frame.left)?;
        Self::drive(&mut self.right_fwd, &mut self.right_rev, frame.right)?;
        self.servo.set_duty_u16(frame.head)
    }

    fn stop(&mut self) -> Result<()> {
        info!("Stopping both motors");
        for pwm in [
            &mut self.left_fwd,
            &mut self.left_rev,
            &mut self.right_fwd,
            &mut self.right_rev,
        ] {
            pwm.set_duty_u16(0)?;
        }
        Ok(())
    }
}

impl Drop for PwmActuator {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

/// Battery voltage divider on an IIO ADC input
#[derive(Debug, Clone)]
pub struct IioAdc {
    path: PathBuf,
    bits: u8,
}

impl IioAdc {
    /// `bits` is the native resolution; reads are widened to 16 bits
    pub fn new(path: PathBuf, bits: u8) -> Self {
        Self {
            path,
            bits: bits.clamp(1, 16),
        }
    }

    fn widen(&self, raw: u32) -> u16 {
        let shifted = u64::from(raw) << (16 - u32::from(self.bits));
        shifted.min(DUTY_FULL) as u16
    }
}

impl BatterySensor for IioAdc {
    fn read_u16(&mut self) -> Result<u16> {
        let text = read_attr(&self.path)?;
        let raw: u32 = text.trim().parse().map_err(|_| HardwareError::Parse {
            path: self.path.clone(),
            value: text.trim().to_string(),
        })?;
        Ok(self.widen(raw))
    }
}
