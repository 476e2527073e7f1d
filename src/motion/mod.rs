// Motion control for the two-wheel base and the pan servo
//
// Provides:
// - Per-motor calibration curve (speed level -> PWM duty)
// - Rate-limited speed ramps
// - Pan servo position stepping
// - Key state -> wheel targets and the per-tick controller tying them together

pub mod calibration;
mod controller;
pub mod drive;
pub mod head;
pub mod ramp;

pub use calibration::{Axis, CalibrationError, CalibrationTable};
pub use controller::MotionController;
pub use drive::{derive_targets, AxisTargets, DriveFrame, MotorDuty};
pub use head::HeadController;
pub use ramp::AxisRamp;
