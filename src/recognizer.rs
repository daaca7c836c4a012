//! Supervisor for the external speech-recognition subprocess.
//!
//! The recognizer is a black box: it listens to the microphone and writes
//! recognized phrases into the shared command file. This side only owns
//! its lifecycle — launch with a fallback strategy, bounded-kill on stop.
//! It never reads the child's output and never verifies that phrases are
//! actually being produced.

use tokio::process::Child;
use tracing::{debug, error, info};

use crate::config::RecognizerConfig;
use crate::error::Result;
use crate::proc;

pub struct RecognizerSupervisor {
    config: RecognizerConfig,
    child: Option<Child>,
}

impl RecognizerSupervisor {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    /// Whether the tracked child is still alive.
    pub fn is_running(&mut self) -> bool {
        match self.child {
            Some(ref mut child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Start the recognizer. No-op if the tracked child is still running.
    ///
    /// Tries the interpreter + script strategy first, then the standalone
    /// executable. Success means the OS accepted the spawn; a recognizer
    /// that starts and then fails to produce output is indistinguishable
    /// from silence and is handled upstream as "no command this tick".
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            debug!("recognizer already running");
            return Ok(());
        }
        self.child = None;

        let workdir = self.config.workdir_path();
        match proc::spawn_first(
            &self.config.interpreter,
            self.config.script.as_deref(),
            self.config.executable.as_deref(),
            workdir.as_deref(),
        ) {
            Ok((child, spec)) => {
                info!(target = %spec.describe(), "recognizer started");
                self.child = Some(child);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "recognizer failed to start");
                Err(e)
            }
        }
    }

    /// Stop the recognizer: terminate, bounded wait, force-kill. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            proc::terminate(&mut child, self.config.stop_grace()).await;
            info!("recognizer stopped");
        }
    }
}
