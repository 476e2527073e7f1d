// Keyboard teleop: WASD drive, Q/E camera up/down, Esc quit
//
// Usage: cargo run --example teleop -- [port]
// Without a port the command lines go to stdout, eg. to pipe into
// `buddy-motion-runtime --stdio --simulate`.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::info;

use buddy_motion_runtime::config::{DEFAULT_BAUDRATE, MOTOR_PERIOD};
use buddy_motion_runtime::messages::CommandState;

const KEY_HOLD: Duration = Duration::from_millis(150); // Terminals report no key release

/// Last press per key
#[derive(Default)]
struct Held {
    forward: Option<Instant>,
    reverse: Option<Instant>,
    left: Option<Instant>,
    right: Option<Instant>,
    cam_up: Option<Instant>,
    cam_down: Option<Instant>,
}

impl Held {
    fn state(&self) -> CommandState {
        let held = |t: Option<Instant>| t.is_some_and(|t| t.elapsed() < KEY_HOLD);
        CommandState {
            forward: held(self.forward),
            reverse: held(self.reverse),
            turn_left: held(self.left),
            turn_right: held(self.right),
            cam_up: held(self.cam_up),
            cam_down: held(self.cam_down),
        }
    }
}

fn command_line(cmd: &CommandState) -> String {
    let flag = |b: bool| u8::from(b);
    json!({
        "controls": {
            "f": flag(cmd.forward),
            "b": flag(cmd.reverse),
            "l": flag(cmd.turn_left),
            "r": flag(cmd.turn_right),
            "cam_up": flag(cmd.cam_up),
            "cam_down": flag(cmd.cam_down),
        }
    })
    .to_string()
        + "\n"
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(io::stderr)
        .init();

    let mut out: Box<dyn Write> = match std::env::args().nth(1) {
        Some(port) => {
            info!("Opening {} at {} baud", port, DEFAULT_BAUDRATE);
            Box::new(serialport::new(port, DEFAULT_BAUDRATE).open()?)
        }
        None => Box::new(io::stdout()),
    };

    info!("Controls: WASD=drive, Q/E=camera, Esc=quit");

    enable_raw_mode()?;
    let result = run_teleop(&mut out);
    disable_raw_mode()?;

    result
}

fn run_teleop(out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let mut held = Held::default();
    let mut last_sent = Instant::now();

    loop {
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let now = Some(Instant::now());

                match code {
                    KeyCode::Char('w') if pressed => held.forward = now,
                    KeyCode::Char('s') if pressed => held.reverse = now,
                    KeyCode::Char('a') if pressed => held.left = now,
                    KeyCode::Char('d') if pressed => held.right = now,
                    KeyCode::Char('q') if pressed => held.cam_up = now,
                    KeyCode::Char('e') if pressed => held.cam_down = now,
                    KeyCode::Esc if pressed => break,
                    _ => {}
                }
            }
        }

        // Same cadence as the robot's motor tick
        if last_sent.elapsed() >= MOTOR_PERIOD {
            out.write_all(command_line(&held.state()).as_bytes())?;
            out.flush()?;
            last_sent = Instant::now();
        }
    }

    // Leave the robot with nothing held
    out.write_all(command_line(&CommandState::default()).as_bytes())?;
    out.flush()?;
    Ok(())
}
