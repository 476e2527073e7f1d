// Periods, ranges, hardware revisions and the command line
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::motion::{CalibrationError, CalibrationTable};

// Control loop periods
pub const MOTOR_PERIOD: Duration = Duration::from_millis(100); // 10 Hz ramp/actuation tick
pub const TELEMETRY_PERIOD: Duration = Duration::from_millis(1000);

// Serial link to the companion computer
pub const DEFAULT_PORT: &str = "/dev/serial0";
pub const DEFAULT_BAUDRATE: u32 = 38_400;
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(300);

// Drive ramp
pub const MAX_SPEED: f32 = 7.0;
pub const SPEED_INC: f32 = 0.5;
/// Number of calibration entries: one per integer speed level 0..=MAX_SPEED
pub const SPEED_LEVELS: usize = 8;

// Pan servo duty range
pub const HEAD_POS_MIN: i32 = 3000;
pub const HEAD_POS_MAX: i32 = 6300;
pub const HEAD_POS_INIT: i32 = 4900;

// Battery report bounds
pub const BATTERY_MIN_V: f64 = 14.0;
pub const BATTERY_MAX_V: f64 = 16.4;
pub const BATTERY_UNIT: &str = "V";

pub const SERVO_PWM_FREQ_HZ: u32 = 50;

// Sysfs defaults (PWM chip 0, channels in left-fwd, left-rev, right-fwd, right-rev, servo order)
pub const DEFAULT_PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";
pub const DEFAULT_PWM_CHANNELS: [u32; 5] = [0, 1, 2, 3, 4];
pub const DEFAULT_ADC_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw";
pub const DEFAULT_ADC_BITS: u8 = 12;

// Sample returned by the simulated battery sensor (~14.9 V on mk1)
pub const SIMULATED_SAMPLE: u16 = 45_000;

// Mk1 calibration, measured in 16-bit duty
const MK1_LEFT: [u16; SPEED_LEVELS] = [0, 12800, 15360, 17920, 23040, 28160, 35840, 65535];
const MK1_RIGHT: [u16; SPEED_LEVELS] = [0, 10240, 13056, 15360, 19712, 23808, 35840, 65535];

// Mk2 calibration, measured in 8-bit duty and widened by 257 (255 -> 65535)
const MK2_LEFT: [u16; SPEED_LEVELS] = [0, 12850, 15420, 17990, 23130, 28270, 35980, 65535];
const MK2_RIGHT: [u16; SPEED_LEVELS] = [0, 10280, 13107, 15420, 19789, 23901, 35980, 65535];

/// Hardware revision of the robot. Each one carries its own measured constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Revision {
    Mk1,
    Mk2,
}

impl Revision {
    /// ADC sample to centivolt factor
    pub fn scale_factor(self) -> f64 {
        match self {
            Revision::Mk1 => 0.033076,
            Revision::Mk2 => 0.0477,
        }
    }

    /// Servo duty step per motor tick
    pub fn head_speed(self) -> i32 {
        match self {
            Revision::Mk1 => 120,
            Revision::Mk2 => 200,
        }
    }

    pub fn motor_pwm_freq_hz(self) -> u32 {
        match self {
            Revision::Mk1 | Revision::Mk2 => 2000,
        }
    }

    /// Calibration columns as (left, right)
    pub fn calibration(self) -> (&'static [u16], &'static [u16]) {
        match self {
            Revision::Mk1 => (&MK1_LEFT, &MK1_RIGHT),
            Revision::Mk2 => (&MK2_LEFT, &MK2_RIGHT),
        }
    }
}

/// Command line of the runtime binary
#[derive(Debug, Clone, Parser)]
#[command(name = "buddy-motion-runtime", about = "Motor and pan servo controller")]
pub struct Args {
    /// Hardware revision providing the default constants
    #[arg(long, value_enum, default_value = "mk1")]
    pub revision: Revision,

    /// Serial port carrying commands and telemetry
    #[arg(long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(long, default_value_t = DEFAULT_BAUDRATE)]
    pub baudrate: u32,

    /// Read commands from stdin and write telemetry to stdout instead of the serial port
    #[arg(long)]
    pub stdio: bool,

    /// Drive nothing; log actuation and report a fixed battery sample
    #[arg(long)]
    pub simulate: bool,

    /// Override the revision's servo step per tick
    #[arg(long)]
    pub head_speed: Option<i32>,

    /// Servo position at startup
    #[arg(long, default_value_t = HEAD_POS_INIT)]
    pub head_start: i32,

    /// Override the revision's battery scale factor
    #[arg(long)]
    pub scale_factor: Option<f64>,

    /// Override the left calibration column (comma separated, one entry per speed level)
    #[arg(long, value_delimiter = ',')]
    pub left_table: Option<Vec<u16>>,

    /// Override the right calibration column
    #[arg(long, value_delimiter = ',')]
    pub right_table: Option<Vec<u16>>,

    /// Stop the drive when no command arrived for this long (disabled when absent)
    #[arg(long)]
    pub cmd_timeout_ms: Option<u64>,

    #[arg(long, default_value = DEFAULT_PWM_CHIP)]
    pub pwm_chip: PathBuf,

    /// PWM channels: left-fwd, left-rev, right-fwd, right-rev, servo
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PWM_CHANNELS)]
    pub pwm_channels: Vec<u32>,

    #[arg(long, default_value = DEFAULT_ADC_PATH)]
    pub adc_path: PathBuf,

    /// Native resolution of the battery ADC
    #[arg(long, default_value_t = DEFAULT_ADC_BITS)]
    pub adc_bits: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error("Expected 5 PWM channels, got {0}")]
    PwmChannels(usize),

    #[error("Head speed {0} outside 1..={max}", max = HEAD_POS_MAX - HEAD_POS_MIN)]
    HeadSpeed(i32),

    #[error("Head start {0} outside {min}..={max}", min = HEAD_POS_MIN, max = HEAD_POS_MAX)]
    HeadStart(i32),

    #[error("Battery scale factor {0} must be finite and positive")]
    ScaleFactor(f64),
}

/// Where commands come from and telemetry goes
#[derive(Debug, Clone, PartialEq)]
pub enum LinkConfig {
    Serial { port: String, baudrate: u32 },
    Stdio,
}

/// PWM channel numbers on one sysfs chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannels {
    pub left_fwd: u32,
    pub left_rev: u32,
    pub right_fwd: u32,
    pub right_rev: u32,
    pub servo: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HardwareConfig {
    Simulated {
        sample: u16,
    },
    Sysfs {
        pwm_chip: PathBuf,
        channels: PwmChannels,
        motor_freq_hz: u32,
        adc_path: PathBuf,
        adc_bits: u8,
    },
}

/// Parameters of the motor tick
#[derive(Debug, Clone)]
pub struct MotionConfig {
    pub calibration: CalibrationTable,
    pub speed_step: f32,
    pub head_speed: i32,
    pub head_start: i32,
}

/// Parameters of the battery report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryConfig {
    pub scale_factor: f64,
    pub min_v: f64,
    pub max_v: f64,
}

impl TelemetryConfig {
    pub fn for_revision(revision: Revision) -> Self {
        Self {
            scale_factor: revision.scale_factor(),
            min_v: BATTERY_MIN_V,
            max_v: BATTERY_MAX_V,
        }
    }
}

/// Fully resolved and validated runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub link: LinkConfig,
    pub hardware: HardwareConfig,
    pub motion: MotionConfig,
    pub telemetry: TelemetryConfig,
    pub motor_period: Duration,
    pub telemetry_period: Duration,
    pub cmd_timeout: Option<Duration>,
}

impl Args {
    /// Resolve revision defaults and overrides. Fails on an unusable calibration
    /// table or an out-of-range head or battery constant.
    pub fn into_config(self) -> Result<RuntimeConfig, ConfigError> {
        let head_speed = self.head_speed.unwrap_or(self.revision.head_speed());
        if !(1..=HEAD_POS_MAX - HEAD_POS_MIN).contains(&head_speed) {
            return Err(ConfigError::HeadSpeed(head_speed));
        }
        if !(HEAD_POS_MIN..=HEAD_POS_MAX).contains(&self.head_start) {
            return Err(ConfigError::HeadStart(self.head_start));
        }
        let scale_factor = self.scale_factor.unwrap_or(self.revision.scale_factor());
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(ConfigError::ScaleFactor(scale_factor));
        }

        let (left, right) = self.revision.calibration();
        let left = self.left_table.as_deref().unwrap_or(left);
        let right = self.right_table.as_deref().unwrap_or(right);
        let calibration = CalibrationTable::new(left, right)?;

        let link = if self.stdio {
            LinkConfig::Stdio
        } else {
            LinkConfig::Serial {
                port: self.port,
                baudrate: self.baudrate,
            }
        };

        let hardware = if self.simulate {
            HardwareConfig::Simulated {
                sample: SIMULATED_SAMPLE,
            }
        } else {
            let &[left_fwd, left_rev, right_fwd, right_rev, servo] = self.pwm_channels.as_slice() else {
                return Err(ConfigError::PwmChannels(self.pwm_channels.len()));
            };
            HardwareConfig::Sysfs {
                pwm_chip: self.pwm_chip,
                channels: PwmChannels {
                    left_fwd,
                    left_rev,
                    right_fwd,
                    right_rev,
                    servo,
                },
                motor_freq_hz: self.revision.motor_pwm_freq_hz(),
                adc_path: self.adc_path,
                adc_bits: self.adc_bits,
            }
        };

        let telemetry = TelemetryConfig {
            scale_factor,
            ..TelemetryConfig::for_revision(self.revision)
        };

        Ok(RuntimeConfig {
            link,
            hardware,
            motion: MotionConfig {
                calibration,
                speed_step: SPEED_INC,
                head_speed,
                head_start: self.head_start,
            },
            telemetry,
            motor_period: MOTOR_PERIOD,
            telemetry_period: TELEMETRY_PERIOD,
            cmd_timeout: self.cmd_timeout_ms.map(Duration::from_millis),
        })
    }
}
