// Hardware collaborators of the control loop
//
// Provides:
// - Actuator / BatterySensor traits consumed by the runtime
// - Linux sysfs PWM + IIO ADC backend
// - Simulated backend for bench runs and tests

pub mod sim;
pub mod sysfs;

use std::path::PathBuf;

use crate::config::HardwareConfig;
use crate::motion::DriveFrame;

pub use sim::{SimulatedActuator, SimulatedSensor};
pub use sysfs::{IioAdc, PwmActuator, PwmChannel};

/// Error types for PWM and ADC access
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unreadable value {value:?} in {path}")]
    Parse { path: PathBuf, value: String },

    #[error("Invalid PWM frequency {0} Hz")]
    Frequency(u32),
}

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Applies motor duties and the servo position
pub trait Actuator: Send {
    fn apply(&mut self, frame: &DriveFrame) -> Result<()>;

    /// Zero both motors
    fn stop(&mut self) -> Result<()>;
}

/// Source of raw battery samples (0..=65535)
pub trait BatterySensor: Send {
    fn read_u16(&mut self) -> Result<u16>;
}

/// Open the actuator and sensor selected by the configuration
pub fn open(
    config: &HardwareConfig,
    head_start: u16,
) -> Result<(Box<dyn Actuator>, Box<dyn BatterySensor>)> {
    match config {
        HardwareConfig::Simulated { sample } => Ok((
            Box::new(SimulatedActuator::default()),
            Box::new(SimulatedSensor::new(*sample)),
        )),
        HardwareConfig::Sysfs {
            pwm_chip,
            channels,
            motor_freq_hz,
            adc_path,
            adc_bits,
        } => {
            let actuator = PwmActuator::open(pwm_chip, *channels, *motor_freq_hz, head_start)?;
            let sensor = IioAdc::new(adc_path.clone(), *adc_bits);
            Ok((Box::new(actuator), Box::new(sensor)))
        }
    }
}
