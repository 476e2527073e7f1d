// Per-motor speed level -> PWM duty curve
//
// The two drive motors do not produce the same wheel speed for the same duty,
// so each one has its own measured duty per integer speed level. Fractional
// levels are linearly interpolated between neighbours.

use crate::config::SPEED_LEVELS;

/// Highest integer speed level present in the table
const TOP_LEVEL: usize = SPEED_LEVELS - 1;

/// Which drive motor a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Left,
    Right,
}

impl Axis {
    fn column(self) -> usize {
        match self {
            Axis::Left => 0,
            Axis::Right => 1,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibrationError {
    #[error("{axis:?} calibration has {actual} entries, expected {expected}")]
    Length {
        axis: Axis,
        expected: usize,
        actual: usize,
    },

    #[error("{axis:?} calibration must start at 0, found {value}")]
    NonZeroStart { axis: Axis, value: u16 },

    #[error("{axis:?} calibration decreases at level {level}")]
    NotMonotonic { axis: Axis, level: usize },

    #[error("Calibration columns end at different duties: left={left}, right={right}")]
    UnequalMaximum { left: u16, right: u16 },
}

/// Immutable table of (left, right) duty per speed level 0..=MAX_SPEED
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    entries: [[u16; 2]; SPEED_LEVELS],
}

impl CalibrationTable {
    /// Build and validate a table from its two columns
    pub fn new(left: &[u16], right: &[u16]) -> Result<Self, CalibrationError> {
        Self::check_column(Axis::Left, left)?;
        Self::check_column(Axis::Right, right)?;

        if left[TOP_LEVEL] != right[TOP_LEVEL] {
            return Err(CalibrationError::UnequalMaximum {
                left: left[TOP_LEVEL],
                right: right[TOP_LEVEL],
            });
        }

        let mut entries = [[0u16; 2]; SPEED_LEVELS];
        for (level, entry) in entries.iter_mut().enumerate() {
            *entry = [left[level], right[level]];
        }
        Ok(Self { entries })
    }

    fn check_column(axis: Axis, column: &[u16]) -> Result<(), CalibrationError> {
        if column.len() != SPEED_LEVELS {
            return Err(CalibrationError::Length {
                axis,
                expected: SPEED_LEVELS,
                actual: column.len(),
            });
        }
        if column[0] != 0 {
            return Err(CalibrationError::NonZeroStart {
                axis,
                value: column[0],
            });
        }
        if let Some(level) = column.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(CalibrationError::NotMonotonic {
                axis,
                level: level + 1,
            });
        }
        Ok(())
    }

    /// Measured duty at an integer speed level
    pub fn entry(&self, level: usize, axis: Axis) -> u16 {
        self.entries[level.min(TOP_LEVEL)][axis.column()]
    }

    /// Duty for a ramped speed. The sign is ignored; the caller picks the channel.
    /// Levels at or beyond the top saturate to the last entry.
    pub fn interpolate(&self, speed: f32, axis: Axis) -> u16 {
        let magnitude = speed.abs();
        let level = magnitude.floor() as usize;
        if level >= TOP_LEVEL {
            return self.entry(TOP_LEVEL, axis);
        }

        let frac = magnitude - level as f32;
        let lower = self.entry(level, axis);
        let upper = self.entry(level + 1, axis);
        let step = (f32::from(upper - lower) * frac).round() as u16;
        lower + step
    }
}
