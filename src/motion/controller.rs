// One motor tick: targets -> ramps -> calibrated duty -> frame

use tracing::debug;

use super::calibration::{Axis, CalibrationTable};
use super::drive::{derive_targets, DriveFrame, MotorDuty};
use super::head::HeadController;
use super::ramp::AxisRamp;
use crate::config::{MotionConfig, MAX_SPEED};
use crate::messages::CommandState;

/// Owns both ramps and the head position. Only the motor task touches it.
pub struct MotionController {
    calibration: CalibrationTable,
    left: AxisRamp,
    right: AxisRamp,
    head: HeadController,
}

impl MotionController {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            calibration: config.calibration,
            left: AxisRamp::new(config.speed_step, MAX_SPEED),
            right: AxisRamp::new(config.speed_step, MAX_SPEED),
            head: HeadController::new(config.head_start, config.head_speed),
        }
    }

    /// Current ramped speeds (left, right)
    pub fn speeds(&self) -> (f32, f32) {
        (self.left.current(), self.right.current())
    }

    /// Servo duty before any tick has run
    pub fn head_duty(&self) -> u16 {
        self.head.duty()
    }

    /// Advance one tick using the latest command
    pub fn tick(&mut self, cmd: &CommandState) -> DriveFrame {
        let targets = derive_targets(cmd);
        let left_speed = self.left.tick(targets.left);
        let right_speed = self.right.tick(targets.right);

        let left_duty = self.calibration.interpolate(left_speed, Axis::Left);
        let right_duty = self.calibration.interpolate(right_speed, Axis::Right);

        self.head.tick(cmd.cam_up, cmd.cam_down);

        let frame = DriveFrame {
            left: MotorDuty::from_speed(left_speed, left_duty),
            right: MotorDuty::from_speed(right_speed, right_duty),
            head: self.head.duty(),
        };
        debug!(
            left_speed,
            right_speed,
            left = ?frame.left,
            right = ?frame.right,
            head = frame.head,
            "Motor tick"
        );
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Revision, HEAD_POS_INIT, SPEED_INC};

    fn controller() -> MotionController {
        let (left, right) = Revision::Mk1.calibration();
        MotionController::new(MotionConfig {
            calibration: CalibrationTable::new(left, right).unwrap(),
            speed_step: SPEED_INC,
            head_speed: 120,
            head_start: HEAD_POS_INIT,
        })
    }

    fn forward() -> CommandState {
        CommandState {
            forward: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_tick_from_rest() {
        let mut ctl = controller();
        let frame = ctl.tick(&forward());
        assert_eq!(ctl.speeds(), (0.5, 0.5));
        // half way to level 1 on each motor
        assert_eq!(frame.left.forward, 6400);
        assert_eq!(frame.right.forward, 5120);
        assert_eq!(frame.left.reverse, 0);
        assert_eq!(frame.right.reverse, 0);
        assert_eq!(frame.head, 4900);
    }

    #[test]
    fn test_full_forward() {
        let mut ctl = controller();
        let mut frame = ctl.tick(&forward());
        for _ in 0..20 {
            frame = ctl.tick(&forward());
        }
        assert_eq!(ctl.speeds(), (7.0, 7.0));
        assert_eq!(frame.left.forward, 65535);
        assert_eq!(frame.right.forward, 65535);
    }

    #[test]
    fn test_spin_uses_opposite_channels() {
        let mut ctl = controller();
        let spin = CommandState {
            turn_left: true,
            ..Default::default()
        };
        let mut frame = ctl.tick(&spin);
        for _ in 0..10 {
            frame = ctl.tick(&spin);
        }
        assert_eq!(ctl.speeds(), (-5.0, 5.0));
        assert_eq!(frame.left.forward, 0);
        assert_eq!(frame.left.reverse, 28160);
        assert_eq!(frame.right.forward, 23808);
        assert_eq!(frame.right.reverse, 0);
    }

    #[test]
    fn test_never_drives_both_directions() {
        let mut ctl = controller();
        let sequence = [
            forward(),
            CommandState {
                reverse: true,
                turn_right: true,
                ..Default::default()
            },
            CommandState {
                turn_left: true,
                ..Default::default()
            },
            CommandState::default(),
        ];
        for cmd in sequence {
            for _ in 0..30 {
                let frame = ctl.tick(&cmd);
                for duty in [frame.left, frame.right] {
                    assert!(duty.forward == 0 || duty.reverse == 0, "{:?}", duty);
                }
                let (left, right) = ctl.speeds();
                assert_eq!(frame.left.forward == 0 && frame.left.reverse == 0, left == 0.0);
                assert_eq!(
                    frame.right.forward == 0 && frame.right.reverse == 0,
                    right == 0.0
                );
            }
        }
    }

    #[test]
    fn test_release_decelerates_to_rest() {
        let mut ctl = controller();
        for _ in 0..14 {
            ctl.tick(&forward());
        }
        let mut frame = ctl.tick(&CommandState::default());
        assert_eq!(ctl.speeds(), (6.5, 6.5));
        for _ in 0..13 {
            frame = ctl.tick(&CommandState::default());
        }
        assert_eq!(ctl.speeds(), (0.0, 0.0));
        assert_eq!(frame.left, MotorDuty::default());
        assert_eq!(frame.right, MotorDuty::default());
    }

    #[test]
    fn test_camera_moves_head() {
        let mut ctl = controller();
        let up = CommandState {
            cam_up: true,
            ..Default::default()
        };
        let frame = ctl.tick(&up);
        assert_eq!(frame.head, 5020);
        assert_eq!(ctl.speeds(), (0.0, 0.0));
    }
}
