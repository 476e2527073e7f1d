// Pan servo position, stepped while a camera key is held

use crate::config::{HEAD_POS_INIT, HEAD_POS_MAX, HEAD_POS_MIN};

#[derive(Debug, Clone)]
pub struct HeadController {
    position: i32,
    step: i32,
}

impl HeadController {
    /// Start at `position` (clamped into the servo range)
    pub fn new(position: i32, step: i32) -> Self {
        Self {
            position: position.clamp(HEAD_POS_MIN, HEAD_POS_MAX),
            step,
        }
    }

    pub fn with_step(step: i32) -> Self {
        Self::new(HEAD_POS_INIT, step)
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Servo duty for the current position
    pub fn duty(&self) -> u16 {
        // range is 3000..=6300
        self.position as u16
    }

    /// Step up or down (up wins when both are held) and clamp
    pub fn tick(&mut self, up: bool, down: bool) -> i32 {
        if up {
            self.position = self.position.saturating_add(self.step);
        } else if down {
            self.position = self.position.saturating_sub(self.step);
        }
        self.position = self.position.clamp(HEAD_POS_MIN, HEAD_POS_MAX);
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_then_clamp() {
        let mut head = HeadController::with_step(120);
        for _ in 0..10 {
            head.tick(true, false);
        }
        assert_eq!(head.position(), 6100);
        assert_eq!(head.tick(true, false), 6220);
        assert_eq!(head.tick(true, false), 6300);
        assert_eq!(head.tick(true, false), 6300);
        assert_eq!(head.duty(), 6300);
    }

    #[test]
    fn test_down_clamps_at_min() {
        let mut head = HeadController::with_step(200);
        for _ in 0..20 {
            head.tick(false, true);
        }
        assert_eq!(head.position(), 3000);
    }

    #[test]
    fn test_up_wins_over_down() {
        let mut head = HeadController::with_step(120);
        assert_eq!(head.tick(true, true), 5020);
    }

    #[test]
    fn test_idle_holds() {
        let mut head = HeadController::new(4000, 120);
        assert_eq!(head.tick(false, false), 4000);
    }

    #[test]
    fn test_huge_step_saturates() {
        let mut head = HeadController::with_step(i32::MAX);
        assert_eq!(head.tick(true, false), 6300);
        assert_eq!(head.tick(false, true), 3000);
    }

    #[test]
    fn test_start_clamped() {
        assert_eq!(HeadController::new(9000, 120).position(), 6300);
    }
}
