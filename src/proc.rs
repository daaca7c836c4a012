//! Subprocess launch and bounded termination helpers.
//!
//! Both supervised subprocesses (the recognizer and per-game controllers)
//! use the same two launch strategies: interpreter + script path, falling
//! back to a standalone executable. Neither relies on the child's
//! stdin/stdout, so all standard streams are nulled.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command as ProcessCommand};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A concrete spawn recipe: program, arguments, working directory.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
}

impl LaunchSpec {
    fn interpreter(interpreter: &str, script: PathBuf, workdir: Option<PathBuf>) -> Self {
        Self {
            program: interpreter.to_string(),
            args: vec![script.to_string_lossy().into_owned()],
            workdir,
        }
    }

    fn executable(path: PathBuf, workdir: Option<PathBuf>) -> Self {
        Self {
            program: path.to_string_lossy().into_owned(),
            args: Vec::new(),
            workdir,
        }
    }

    pub fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Spawn the child. Success means the OS accepted the spawn call; the
    /// caller gets no guarantee the process does anything useful.
    pub fn spawn(&self) -> Result<Child> {
        let mut cmd = ProcessCommand::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(ref dir) = self.workdir {
            cmd.current_dir(dir);
        }
        cmd.spawn().map_err(|e| Error::SpawnFailed {
            target: self.describe(),
            reason: e.to_string(),
        })
    }
}

fn resolve_relative(path: &str, workdir: Option<&Path>) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        return p;
    }
    match workdir {
        Some(dir) => dir.join(p),
        None => p,
    }
}

/// Build the candidate launch specs for a script/executable pair, in
/// strategy order. Targets that do not exist on disk are skipped with a
/// note in `tried`; an empty result means neither target exists.
fn candidates(
    interpreter: &str,
    script: Option<&str>,
    executable: Option<&str>,
    workdir: Option<&Path>,
    tried: &mut Vec<String>,
) -> Vec<LaunchSpec> {
    let mut specs = Vec::new();
    let workdir_buf = workdir.map(Path::to_path_buf);

    if let Some(script) = script {
        let script_path = resolve_relative(script, workdir);
        if script_path.exists() {
            specs.push(LaunchSpec::interpreter(
                interpreter,
                script_path,
                workdir_buf.clone(),
            ));
        } else {
            tried.push(format!("{} (missing script)", script_path.display()));
        }
    }

    if let Some(executable) = executable {
        let exe_path = resolve_relative(executable, workdir);
        if exe_path.exists() {
            specs.push(LaunchSpec::executable(exe_path, workdir_buf));
        } else {
            tried.push(format!("{} (missing executable)", exe_path.display()));
        }
    }

    specs
}

/// Try each candidate in order, returning the first child the OS accepts.
pub fn spawn_first(
    interpreter: &str,
    script: Option<&str>,
    executable: Option<&str>,
    workdir: Option<&Path>,
) -> Result<(Child, LaunchSpec)> {
    let mut tried = Vec::new();
    for spec in candidates(interpreter, script, executable, workdir, &mut tried) {
        match spec.spawn() {
            Ok(child) => {
                info!(target = %spec.describe(), pid = ?child.id(), "subprocess started");
                return Ok((child, spec));
            }
            Err(e) => {
                warn!(target = %spec.describe(), error = %e, "launch strategy failed");
                tried.push(format!("{} ({})", spec.describe(), e));
            }
        }
    }
    Err(Error::MissingLaunchTarget { tried })
}

/// Terminate a child: signal, wait up to `grace`, then force-kill.
///
/// Safe to call on a child that has already exited.
pub async fn terminate(child: &mut Child, grace: Duration) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(?status, "subprocess already exited");
        return;
    }

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!(pid, error = %e, "SIGTERM failed");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(?status, "subprocess exited after terminate");
        }
        Ok(Err(e)) => {
            warn!(error = %e, "wait on terminating subprocess failed");
        }
        Err(_) => {
            warn!(grace = ?grace, "subprocess did not exit in time, force-killing");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}
