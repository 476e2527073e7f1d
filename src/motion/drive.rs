// Differential drive mapping
// Converts held keys into per-wheel target speeds, and ramped speeds into
// forward/reverse PWM duty pairs.

use crate::messages::CommandState;

/// Forward and turning speed levels
const CRUISE: f32 = 7.0;
const INNER_WHEEL: f32 = 4.0;
const SPIN: f32 = 5.0;

/// Target speed levels for the two wheels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisTargets {
    pub left: f32,
    pub right: f32,
}

impl AxisTargets {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Derive wheel targets from the held keys.
///
/// Forward beats reverse, and either one turns by slowing the inner wheel.
/// With neither held, left/right spin in place; if both are held right is
/// applied last and wins.
pub fn derive_targets(cmd: &CommandState) -> AxisTargets {
    if cmd.forward {
        if cmd.turn_left {
            AxisTargets::new(INNER_WHEEL, CRUISE)
        } else if cmd.turn_right {
            AxisTargets::new(CRUISE, INNER_WHEEL)
        } else {
            AxisTargets::new(CRUISE, CRUISE)
        }
    } else if cmd.reverse {
        if cmd.turn_left {
            AxisTargets::new(-CRUISE, -INNER_WHEEL)
        } else if cmd.turn_right {
            AxisTargets::new(-INNER_WHEEL, -CRUISE)
        } else {
            AxisTargets::new(-CRUISE, -CRUISE)
        }
    } else {
        let mut targets = AxisTargets::default();
        if cmd.turn_left {
            targets = AxisTargets::new(-SPIN, SPIN);
        }
        if cmd.turn_right {
            targets = AxisTargets::new(SPIN, -SPIN);
        }
        targets
    }
}

/// Duty for the two direction channels of one motor. At most one is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorDuty {
    pub forward: u16,
    pub reverse: u16,
}

impl MotorDuty {
    /// Route `duty` to the channel matching the sign of `speed` (zero counts as forward)
    pub fn from_speed(speed: f32, duty: u16) -> Self {
        if speed >= 0.0 {
            Self {
                forward: duty,
                reverse: 0,
            }
        } else {
            Self {
                forward: 0,
                reverse: duty,
            }
        }
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse != 0
    }
}

/// Everything the actuator applies in one motor tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveFrame {
    pub left: MotorDuty,
    pub right: MotorDuty,
    pub head: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(forward: bool, reverse: bool, turn_left: bool, turn_right: bool) -> CommandState {
        CommandState {
            forward,
            reverse,
            turn_left,
            turn_right,
            ..Default::default()
        }
    }

    #[test]
    fn test_target_table() {
        let rows = [
            (cmd(true, false, true, false), (4.0, 7.0)),
            (cmd(true, false, false, true), (7.0, 4.0)),
            (cmd(true, false, false, false), (7.0, 7.0)),
            (cmd(false, true, true, false), (-7.0, -4.0)),
            (cmd(false, true, false, true), (-4.0, -7.0)),
            (cmd(false, true, false, false), (-7.0, -7.0)),
            (cmd(false, false, true, false), (-5.0, 5.0)),
            (cmd(false, false, false, true), (5.0, -5.0)),
            (cmd(false, false, false, false), (0.0, 0.0)),
        ];
        for (state, (left, right)) in rows {
            assert_eq!(
                derive_targets(&state),
                AxisTargets::new(left, right),
                "{:?}",
                state
            );
        }
    }

    #[test]
    fn test_forward_beats_reverse() {
        assert_eq!(
            derive_targets(&cmd(true, true, false, false)),
            AxisTargets::new(7.0, 7.0)
        );
        assert_eq!(
            derive_targets(&cmd(true, true, false, true)),
            AxisTargets::new(7.0, 4.0)
        );
    }

    #[test]
    fn test_turn_left_wins_while_driving() {
        assert_eq!(
            derive_targets(&cmd(true, false, true, true)),
            AxisTargets::new(4.0, 7.0)
        );
        assert_eq!(
            derive_targets(&cmd(false, true, true, true)),
            AxisTargets::new(-7.0, -4.0)
        );
    }

    #[test]
    fn test_both_turns_in_place_right_wins() {
        assert_eq!(
            derive_targets(&cmd(false, false, true, true)),
            AxisTargets::new(5.0, -5.0)
        );
    }

    #[test]
    fn test_camera_keys_do_not_move_wheels() {
        let state = CommandState {
            cam_up: true,
            cam_down: true,
            ..Default::default()
        };
        assert_eq!(derive_targets(&state), AxisTargets::default());
    }

    #[test]
    fn test_duty_routing() {
        assert_eq!(
            MotorDuty::from_speed(3.5, 1000),
            MotorDuty {
                forward: 1000,
                reverse: 0
            }
        );
        let reverse = MotorDuty::from_speed(-0.5, 200);
        assert_eq!(reverse.forward, 0);
        assert_eq!(reverse.reverse, 200);
        assert!(reverse.is_reverse());
        assert_eq!(MotorDuty::from_speed(0.0, 0), MotorDuty::default());
    }
}
