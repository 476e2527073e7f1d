// 10 Hz motor task, 1 Hz telemetry task, command intake and telemetry writer threads
// Note: the optional watchdog stops the drive when the operator goes quiet,
// eg. when the companion computer crashes while a key is held

use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::{RuntimeConfig, TelemetryConfig};
use crate::hw::{self, Actuator, BatterySensor};
use crate::link::{run_intake, run_telemetry_writer, CommandSnapshot, Link};
use crate::messages::{CommandState, TelemetryReport};
use crate::motion::MotionController;

/// Reports waiting for the writer thread. When the link stalls, new reports
/// are dropped rather than queued without bound.
const TELEMETRY_QUEUE: usize = 4;

/// Whether commands are arriving recently enough to be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Ok,
    CmdStale,
}

/// Decides which command the motor tick acts on
pub struct CommandWatchdog {
    timeout: Option<Duration>,
    health: LinkHealth,
}

impl CommandWatchdog {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            health: LinkHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    /// Command to act on at `now`. Without a timeout the latest command always holds.
    pub fn effective(&mut self, snapshot: &CommandSnapshot, now: Instant) -> CommandState {
        let Some(received_at) = snapshot.received_at else {
            // No command ever received
            self.health = LinkHealth::CmdStale;
            return CommandState::default();
        };

        let cmd_age = now.saturating_duration_since(received_at);
        match self.timeout {
            Some(timeout) if cmd_age > timeout => {
                if self.health != LinkHealth::CmdStale {
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                }
                self.health = LinkHealth::CmdStale;
                CommandState::default()
            }
            _ => {
                if self.health != LinkHealth::Ok {
                    info!("Commands flowing");
                }
                self.health = LinkHealth::Ok;
                snapshot.state
            }
        }
    }
}

/// Ramp, interpolate and actuate once per period, whatever the command rate
pub async fn motor_task(
    mut controller: MotionController,
    mut actuator: Box<dyn Actuator>,
    commands: watch::Receiver<CommandSnapshot>,
    period: Duration,
    mut watchdog: CommandWatchdog,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;

        // Copy out so the intake thread is never blocked by the tick
        let snapshot = *commands.borrow();
        let cmd = watchdog.effective(&snapshot, Instant::now());
        let frame = controller.tick(&cmd);

        // sysfs attribute writes return once the kernel has the value; no device round trip
        if let Err(e) = actuator.apply(&frame) {
            warn!("Failed to apply drive frame: {}", e);
        }
    }
}

/// Sample the battery and queue one report per period for the writer thread.
/// Returns once the writer is gone.
pub async fn telemetry_task(
    mut sensor: Box<dyn BatterySensor>,
    reports: mpsc::Sender<String>,
    config: TelemetryConfig,
    period: Duration,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick.tick().await;

        let sample = match sensor.read_u16() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Failed to read battery: {}", e);
                continue;
            }
        };
        let report = TelemetryReport::from_sample(sample, &config);
        let line = match report.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode telemetry: {}", e);
                continue;
            }
        };
        match reports.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Telemetry link busy, dropping report"),
            Err(TrySendError::Closed(_)) => {
                warn!("Telemetry writer gone");
                return;
            }
        }
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let controller = MotionController::new(config.motion);
    let (actuator, sensor) = hw::open(&config.hardware, controller.head_duty())?;
    let Link { reader, writer } = Link::open(&config.link)?;

    let (cmd_tx, cmd_rx) = watch::channel(CommandSnapshot::default());

    // Plain thread: a blocking stdin read must not hold up shutdown
    let (intake_done_tx, intake_done_rx) = oneshot::channel();
    thread::Builder::new()
        .name("command-intake".into())
        .spawn(move || {
            let result = run_intake(reader, &cmd_tx);
            let _ = intake_done_tx.send(result);
        })?;

    let (report_tx, report_rx) = mpsc::channel(TELEMETRY_QUEUE);
    thread::Builder::new()
        .name("telemetry-writer".into())
        .spawn(move || run_telemetry_writer(writer, report_rx))?;

    let mut motor = tokio::spawn(motor_task(
        controller,
        actuator,
        cmd_rx,
        config.motor_period,
        CommandWatchdog::new(config.cmd_timeout),
    ));
    let mut telemetry = tokio::spawn(telemetry_task(
        sensor,
        report_tx,
        config.telemetry,
        config.telemetry_period,
    ));

    info!(
        "Runtime started: motor tick {}ms, telemetry tick {}ms, watchdog {}",
        config.motor_period.as_millis(),
        config.telemetry_period.as_millis(),
        config
            .cmd_timeout
            .map(|t| format!("{}ms", t.as_millis()))
            .unwrap_or_else(|| "off".to_string())
    );

    let outcome: Result<(), Box<dyn std::error::Error + Send + Sync>> = tokio::select! {
        res = &mut motor => Err(format!("motor task ended: {:?}", res).into()),
        res = &mut telemetry => Err(format!("telemetry task ended: {:?}", res).into()),
        res = intake_done_rx => match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err("command intake thread died".into()),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    // Dropping the motor task drops the actuator, which zeroes the motors
    motor.abort();
    telemetry.abort();
    let _ = motor.await;
    let _ = telemetry.await;

    outcome
}
