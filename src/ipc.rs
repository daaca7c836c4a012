//! Host IPC: stdin command reader and stdout event emitter.
//!
//! The orchestrator talks to its host GUI process over JSON lines:
//! events use `{"event": "<name>", "data": {...}}` (orchestrator -> host),
//! commands use `{"command": "<name>", ...}` (host -> orchestrator).
//! A blocking stdin-reader thread feeds deserialized commands through an
//! mpsc channel into the async main loop.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// Events: orchestrator -> host (stdout)
// ---------------------------------------------------------------------------

/// All events emitted to the host via stdout as JSON lines.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    Starting {},
    Ready {},
    /// A phrase was taken from the channel and sent through routing.
    CommandDelivered { text: String },
    /// A global action was dispatched.
    ActionPerformed { action: String },
    /// A protected action was blocked by the auth gate.
    AuthDenied { action: String },
    ModeChange { mode: String },
    GameStarted { name: String },
    GameEnded { name: String },
    Error { message: String },
    Pong {},
    Stopping {},
}

// ---------------------------------------------------------------------------
// Commands: host -> orchestrator (stdin)
// ---------------------------------------------------------------------------

/// All commands received from the host via stdin as JSON lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum HostCommand {
    /// The host's login/logout flow completed.
    SetAuth { logged_in: bool },
    /// The host's active window/screen changed.
    SetContext { context: String },
    LaunchGame {
        name: String,
        #[serde(default = "default_auto_launch")]
        auto_launch: bool,
    },
    StopGame {},
    Ping {},
    Stop {},
}

fn default_auto_launch() -> bool {
    true
}

/// Emit a `HostEvent` as a JSON line on stdout and flush.
pub fn emit_event(event: &HostEvent) {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to serialize event: {}", e);
            return;
        }
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore write/flush errors — pipe may be closed.
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}

/// Convenience helper for emitting error events.
pub fn emit_error(message: &str) {
    emit_event(&HostEvent::Error {
        message: message.to_string(),
    });
}

/// Spawn a blocking thread that reads JSON lines from stdin, deserializes
/// them into `HostCommand`, and forwards them through the returned channel.
///
/// The thread exits when stdin is closed (host process gone) or on
/// unrecoverable read error.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<HostCommand> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        let reader = stdin.lock();
        for line in reader.lines() {
            match line {
                Ok(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HostCommand>(trimmed) {
                        Ok(cmd) => {
                            debug!(?cmd, "received host command");
                            if tx.send(cmd).is_err() {
                                break; // Receiver dropped — main task is gone.
                            }
                        }
                        Err(e) => {
                            error!("Invalid JSON command: {} — input: {}", e, trimmed);
                            emit_error(&format!("Invalid JSON command: {}", e));
                        }
                    }
                }
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break; // stdin closed
                }
            }
        }
        debug!("stdin reader thread exiting");
    });

    rx
}
