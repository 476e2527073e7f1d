// Simulated hardware: logs what would be driven

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::{Actuator, BatterySensor, Result};
use crate::motion::{DriveFrame, MotorDuty};

#[derive(Debug, Default)]
struct Record {
    last: Option<DriveFrame>,
    applied: u64,
}

/// Keeps the last applied frame and a count of applies; clones share the record
#[derive(Debug, Clone, Default)]
pub struct SimulatedActuator {
    record: Arc<Mutex<Record>>,
}

impl SimulatedActuator {
    fn with_record<T>(&self, f: impl FnOnce(&mut Record) -> T) -> T {
        match self.record.lock() {
            Ok(mut record) => f(&mut record),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Most recent frame, including the one written by `stop`
    pub fn last_frame(&self) -> Option<DriveFrame> {
        self.with_record(|r| r.last)
    }

    /// Number of frames applied by the motor tick
    pub fn applied(&self) -> u64 {
        self.with_record(|r| r.applied)
    }
}

impl Actuator for SimulatedActuator {
    fn apply(&mut self, frame: &DriveFrame) -> Result<()> {
        debug!(
            "Simulated drive: left={:?}, right={:?}, head={}",
            frame.left, frame.right, frame.head
        );
        self.with_record(|r| {
            r.last = Some(*frame);
            r.applied += 1;
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        info!("Simulated stop");
        self.with_record(|r| {
            r.last = Some(DriveFrame {
                left: MotorDuty::default(),
                right: MotorDuty::default(),
                head: r.last.map(|f| f.head).unwrap_or(0),
            });
        });
        Ok(())
    }
}

/// Returns the same sample every read
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSensor {
    sample: u16,
}

impl SimulatedSensor {
    pub fn new(sample: u16) -> Self {
        Self { sample }
    }
}

impl BatterySensor for SimulatedSensor {
    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_frame_and_stops() {
        let mut actuator = SimulatedActuator::default();
        let observer = actuator.clone();
        assert_eq!(observer.last_frame(), None);

        let frame = DriveFrame {
            left: MotorDuty::from_speed(1.0, 12800),
            right: MotorDuty::from_speed(-1.0, 10240),
            head: 5020,
        };
        actuator.apply(&frame).unwrap();
        assert_eq!(observer.last_frame(), Some(frame));

        actuator.stop().unwrap();
        let stopped = observer.last_frame().unwrap();
        assert_eq!(stopped.left, MotorDuty::default());
        assert_eq!(stopped.right, MotorDuty::default());
        assert_eq!(stopped.head, 5020);
        assert_eq!(observer.applied(), 1);
    }

    #[test]
    fn test_long_run_holds_one_frame() {
        let mut actuator = SimulatedActuator::default();
        let observer = actuator.clone();
        // one hour at 10 Hz
        for i in 0..36_000u32 {
            let frame = DriveFrame {
                left: MotorDuty::from_speed(1.0, (i % 1000) as u16),
                right: MotorDuty::default(),
                head: 4900,
            };
            actuator.apply(&frame).unwrap();
        }
        assert_eq!(observer.applied(), 36_000);
        assert_eq!(observer.last_frame().unwrap().left.forward, 999);
    }

    #[test]
    fn test_sensor_fixed_sample() {
        let mut sensor = SimulatedSensor::new(1234);
        assert_eq!(sensor.read_u16().unwrap(), 1234);
        assert_eq!(sensor.read_u16().unwrap(), 1234);
    }
}
