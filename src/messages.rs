// Message types for the serial link

use serde::{Deserialize, Serialize};

use crate::config::{TelemetryConfig, BATTERY_UNIT};

/// Keys held on the operator side, replaced as a whole by each valid command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandState {
    pub forward: bool,
    pub reverse: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub cam_up: bool,
    pub cam_down: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Malformed command: {0}")]
    Json(#[from] serde_json::Error),
}

// Command from the operator -> runtime
// {"controls":{"f":1,"b":0,"l":0,"r":0,"cam_up":0,"cam_down":0}}
#[derive(Debug, Deserialize)]
struct ControlMessage {
    controls: Controls,
}

#[derive(Debug, Deserialize)]
struct Controls {
    f: Flag,
    b: Flag,
    l: Flag,
    r: Flag,
    cam_up: Flag,
    cam_down: Flag,
}

/// A key flag; anything non-zero counts as held
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
            Flag::Float(f) => f != 0.0,
        }
    }
}

impl From<&Controls> for CommandState {
    fn from(c: &Controls) -> Self {
        Self {
            forward: c.f.is_set(),
            reverse: c.b.is_set(),
            turn_left: c.l.is_set(),
            turn_right: c.r.is_set(),
            cam_up: c.cam_up.is_set(),
            cam_down: c.cam_down.is_set(),
        }
    }
}

impl CommandState {
    /// Parse one command line. Every field of `controls` must be present.
    pub fn parse(line: &[u8]) -> Result<Self, CommandError> {
        let text = std::str::from_utf8(line)?;
        let msg: ControlMessage = serde_json::from_str(text.trim())?;
        Ok(Self::from(&msg.controls))
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Report status tag
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TelemetryStatus {
    #[serde(rename = "OK")]
    Ok,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenericData {
    pub status: TelemetryStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatteryReading {
    pub min: f64,
    pub max: f64,
    pub uom: &'static str,
    pub value: f64,
}

// Telemetry from runtime -> operator, once per telemetry tick
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TelemetryReport {
    #[serde(rename = "genericData")]
    pub generic_data: GenericData,
    pub battery: BatteryReading,
}

/// Battery volts from a raw 16-bit sample, rounded to centivolts
pub fn battery_voltage(sample: u16, scale_factor: f64) -> f64 {
    (f64::from(sample) * scale_factor).round() / 100.0
}

impl TelemetryReport {
    pub fn from_sample(sample: u16, config: &TelemetryConfig) -> Self {
        Self {
            generic_data: GenericData {
                status: TelemetryStatus::Ok,
            },
            battery: BatteryReading {
                min: config.min_v,
                max: config.max_v,
                uom: BATTERY_UNIT,
                value: battery_voltage(sample, config.scale_factor),
            },
        }
    }

    /// Compact JSON terminated by a newline
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
