// Rate-limited speed for one drive motor
//
// Moves the current speed a fixed step per tick toward the target, so the
// acceleration is linear and only depends on the tick rate.

use crate::config::{MAX_SPEED, SPEED_INC};

#[derive(Debug, Clone)]
pub struct AxisRamp {
    current: f32,
    step: f32,
    limit: f32,
}

impl Default for AxisRamp {
    fn default() -> Self {
        Self::new(SPEED_INC, MAX_SPEED)
    }
}

impl AxisRamp {
    /// Ramp at rest, moving `step` per tick and never exceeding `limit` in magnitude
    pub fn new(step: f32, limit: f32) -> Self {
        Self {
            current: 0.0,
            step,
            limit,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advance one tick toward `target` and return the new speed
    pub fn tick(&mut self, target: f32) -> f32 {
        if target < self.current {
            self.current -= self.step;
        } else if target > self.current {
            self.current += self.step;
        }
        self.current = self.current.clamp(-self.limit, self.limit);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_speed_after_fourteen_ticks() {
        let mut ramp = AxisRamp::default();
        for _ in 0..13 {
            ramp.tick(7.0);
        }
        assert_eq!(ramp.current(), 6.5);
        assert_eq!(ramp.tick(7.0), 7.0);
        assert_eq!(ramp.tick(7.0), 7.0);
    }

    #[test]
    fn test_unreachable_target_saturates() {
        let mut ramp = AxisRamp::default();
        for _ in 0..40 {
            ramp.tick(-20.0);
        }
        assert_eq!(ramp.current(), -7.0);
    }

    #[test]
    fn test_rest_is_noop() {
        let mut ramp = AxisRamp::default();
        assert_eq!(ramp.tick(0.0), 0.0);
        assert_eq!(ramp.tick(0.0), 0.0);
    }

    #[test]
    fn test_converges_and_holds() {
        for target in [-7.0, -5.0, -4.0, 0.0, 4.0, 5.0, 7.0] {
            for start in [-7.0f32, 0.0, 7.0] {
                let mut ramp = AxisRamp::default();
                while ramp.current() != start {
                    ramp.tick(start);
                }
                let mut ticks = 0;
                while ramp.current() != target {
                    ramp.tick(target);
                    ticks += 1;
                    assert!(ticks <= 28, "{} -> {} did not converge", start, target);
                }
                for _ in 0..5 {
                    assert_eq!(ramp.tick(target), target);
                }
            }
        }
    }

    #[test]
    fn test_reverses_through_zero() {
        let mut ramp = AxisRamp::default();
        for _ in 0..4 {
            ramp.tick(7.0);
        }
        assert_eq!(ramp.current(), 2.0);
        let speeds: Vec<f32> = (0..6).map(|_| ramp.tick(-7.0)).collect();
        assert_eq!(speeds, vec![1.5, 1.0, 0.5, 0.0, -0.5, -1.0]);
    }
}
