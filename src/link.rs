// Serial link to the operator: command intake and telemetry output

use std::io::{self, BufRead, BufReader, Write};
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::config::{LinkConfig, SERIAL_TIMEOUT};
use crate::messages::CommandState;

/// Latest accepted command and when it arrived
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommandSnapshot {
    pub state: CommandState,
    /// None until the first valid command
    pub received_at: Option<Instant>,
}

/// Both halves of the link
pub struct Link {
    pub reader: Box<dyn BufRead + Send>,
    pub writer: Box<dyn Write + Send>,
}

impl Link {
    /// Open the serial port (or stdio) described by the configuration
    pub fn open(config: &LinkConfig) -> Result<Self, serialport::Error> {
        match config {
            LinkConfig::Serial { port, baudrate } => {
                info!("Opening serial link {} at {} baud", port, baudrate);
                let reader = serialport::new(port, *baudrate)
                    .timeout(SERIAL_TIMEOUT)
                    .open()?;
                let writer = reader.try_clone()?;
                Ok(Self {
                    reader: Box::new(BufReader::new(reader)),
                    writer: Box::new(writer),
                })
            }
            LinkConfig::Stdio => {
                info!("Using stdin/stdout as the command link");
                Ok(Self {
                    reader: Box::new(BufReader::new(io::stdin())),
                    writer: Box::new(io::stdout()),
                })
            }
        }
    }
}

/// Apply one received line. Blank lines are ignored; malformed ones leave the state alone.
fn handle_line(line: &[u8], commands: &watch::Sender<CommandSnapshot>) {
    if line.trim_ascii().is_empty() {
        return;
    }
    match CommandState::parse(line) {
        Ok(state) => {
            info!("Received command: {:?}", state);
            commands.send_replace(CommandSnapshot {
                state,
                received_at: Some(Instant::now()),
            });
        }
        Err(e) => {
            warn!(
                "Failed to parse command {:?}: {}",
                String::from_utf8_lossy(line.trim_ascii()),
                e
            );
        }
    }
}

/// Read newline-framed commands until end of stream or until the control side is gone.
///
/// Read timeouts keep any partial line and try again, so a slow sender is
/// not cut in half.
pub fn run_intake<R: BufRead>(
    mut reader: R,
    commands: &watch::Sender<CommandSnapshot>,
) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        if commands.is_closed() {
            info!("Command consumer gone, stopping intake");
            return Ok(());
        }
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                info!("Command link closed");
                return Ok(());
            }
            Ok(_) => {
                handle_line(&line, commands);
                line.clear();
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Write queued telemetry lines until every sender is gone.
///
/// Runs on its own thread so a serial write stuck for the port timeout
/// never holds a runtime worker.
pub fn run_telemetry_writer<W: Write>(mut writer: W, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.blocking_recv() {
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            warn!("Failed to send telemetry: {}", e);
        }
    }
}
