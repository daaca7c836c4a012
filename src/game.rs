//! Per-game voice session supervision.
//!
//! Launching a game hands the voice channel over to a dedicated controller
//! subprocess that talks to the game directly; the global poll loop is
//! paused for the session's lifetime. The supervisor watches the OS window
//! list for the game's title marker: a bounded wait for it to appear, then
//! a watch for it to disappear. Both paths end in the same teardown, which
//! must be safe to run from the monitor task itself, from a host command,
//! or from app shutdown — and must restore global monitoring exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::GameProfile;
use crate::coordinator::ModeCoordinator;
use crate::error::{Error, Result};
use crate::proc;
use crate::windows::WindowProbe;

/// Grace between terminating a controller subprocess and force-killing it.
const CONTROLLER_STOP_GRACE: Duration = Duration::from_secs(3);

/// Session lifecycle notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The game window was observed; the game owns voice input now.
    Started { name: String },
    /// The window never appeared within the startup timeout.
    StartTimeout { name: String },
    /// The session ended (window closed, external stop, or shutdown).
    Ended { name: String },
}

type EventHook = Arc<dyn Fn(GameEvent) + Send + Sync>;

/// The pieces of one session that teardown needs, shared between the
/// monitor task and external callers.
///
/// `torn_down` is a mutex, not an atomic: the monitor must observe-and-act
/// (check liveness, then flip the mode to GameActive) without an external
/// teardown's resume slipping in between, so both sides serialize on it.
#[derive(Clone)]
struct SessionParts {
    name: String,
    torn_down: Arc<Mutex<bool>>,
    cancel: Arc<AtomicBool>,
    child: Arc<tokio::sync::Mutex<Option<Child>>>,
}

impl SessionParts {
    fn is_torn_down(&self) -> bool {
        *self.torn_down.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct SessionHandle {
    parts: SessionParts,
    monitor: JoinHandle<()>,
}

struct GameInner {
    coordinator: ModeCoordinator,
    probe: Arc<dyn WindowProbe>,
    active: Mutex<Option<SessionHandle>>,
    event_hook: Mutex<Option<EventHook>>,
}

#[derive(Clone)]
pub struct GameSessionSupervisor {
    inner: Arc<GameInner>,
}

impl GameSessionSupervisor {
    pub fn new(coordinator: ModeCoordinator, probe: Arc<dyn WindowProbe>) -> Self {
        Self {
            inner: Arc::new(GameInner {
                coordinator,
                probe,
                active: Mutex::new(None),
                event_hook: Mutex::new(None),
            }),
        }
    }

    /// Register a callback for session lifecycle events.
    pub fn set_event_hook<F>(&self, hook: F)
    where
        F: Fn(GameEvent) + Send + Sync + 'static,
    {
        *self
            .inner
            .event_hook
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(hook));
    }

    /// Whether a session is live (monitor running, not torn down).
    pub fn is_active(&self) -> bool {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.parts.is_torn_down())
            .unwrap_or(false)
    }

    /// Start a game session: pause global monitoring, optionally spawn the
    /// controller subprocess, and begin watching for the game window.
    ///
    /// With `auto_launch` false the controller is assumed to be started by
    /// the operator; window monitoring runs either way.
    pub async fn launch(&self, profile: &GameProfile, auto_launch: bool) -> Result<()> {
        {
            let active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(ref handle) = *active {
                if !handle.parts.is_torn_down() {
                    return Err(Error::GameSessionActive);
                }
            }
        }

        info!(game = %profile.name, marker = %profile.window_marker, "launching game session");
        self.inner.coordinator.pause();

        let child = if auto_launch {
            let workdir = profile.workdir_path();
            match proc::spawn_first(
                &profile.interpreter,
                profile.script.as_deref(),
                profile.executable.as_deref(),
                workdir.as_deref(),
            ) {
                Ok((child, spec)) => {
                    info!(game = %profile.name, target = %spec.describe(), "controller started");
                    Some(child)
                }
                Err(e) => {
                    warn!(game = %profile.name, error = %e, "controller launch failed, restoring global mode");
                    self.inner.coordinator.resume();
                    return Err(e);
                }
            }
        } else {
            debug!(game = %profile.name, "auto_launch off, controller managed externally");
            None
        };

        let parts = SessionParts {
            name: profile.name.clone(),
            torn_down: Arc::new(Mutex::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            child: Arc::new(tokio::sync::Mutex::new(child)),
        };

        let monitor = tokio::spawn(Self::monitor(
            Arc::clone(&self.inner),
            parts.clone(),
            profile.window_marker.clone(),
            profile.startup_timeout(),
            profile.watch_interval(),
        ));

        *self.inner.active.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(SessionHandle { parts, monitor });
        Ok(())
    }

    /// Appearance wait, then disappearance watch, then teardown.
    async fn monitor(
        inner: Arc<GameInner>,
        parts: SessionParts,
        marker: String,
        startup_timeout: Duration,
        interval: Duration,
    ) {
        let deadline = Instant::now() + startup_timeout;
        let mut appeared = false;

        loop {
            if parts.cancel.load(Ordering::SeqCst) {
                // External teardown is already running and owns cleanup.
                return;
            }
            if inner.probe.marker_visible(&marker) {
                appeared = true;
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    marker = %marker,
                    timeout_secs = startup_timeout.as_secs(),
                    "game window did not appear before startup deadline"
                );
                Self::emit(&inner, GameEvent::StartTimeout {
                    name: parts.name.clone(),
                });
                break;
            }
            tokio::time::sleep(interval).await;
        }

        if appeared {
            // Flip to GameActive under the teardown lock so a racing
            // external teardown cannot resume global mode in between.
            {
                let torn_down = parts.torn_down.lock().unwrap_or_else(|e| e.into_inner());
                if *torn_down {
                    return;
                }
                info!(marker = %marker, "game window observed");
                inner.coordinator.mark_game_active();
            }
            Self::emit(&inner, GameEvent::Started {
                name: parts.name.clone(),
            });

            loop {
                if parts.cancel.load(Ordering::SeqCst) {
                    return;
                }
                if !inner.probe.marker_visible(&marker) {
                    info!(marker = %marker, "game window closed");
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }

        Self::run_teardown(&inner, &parts).await;
    }

    /// Tear down the active session. Idempotent; safe from any caller.
    pub async fn teardown(&self) {
        let parts = {
            self.inner
                .active
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_ref()
                .map(|h| h.parts.clone())
        };
        if let Some(parts) = parts {
            parts.cancel.store(true, Ordering::SeqCst);
            Self::run_teardown(&self.inner, &parts).await;
        }
    }

    /// The single teardown path. The guarded flip of `torn_down` guarantees
    /// the subprocess kill and the coordinator resume happen exactly once
    /// per session no matter how many callers race here.
    async fn run_teardown(inner: &Arc<GameInner>, parts: &SessionParts) {
        {
            let mut torn_down = parts.torn_down.lock().unwrap_or_else(|e| e.into_inner());
            if *torn_down {
                debug!(game = %parts.name, "teardown already done");
                return;
            }
            *torn_down = true;
        }
        parts.cancel.store(true, Ordering::SeqCst);

        {
            let mut slot = parts.child.lock().await;
            if let Some(mut child) = slot.take() {
                proc::terminate(&mut child, CONTROLLER_STOP_GRACE).await;
                info!(game = %parts.name, "controller stopped");
            }
        }

        inner.coordinator.resume();
        info!(game = %parts.name, "game session torn down");
        Self::emit(inner, GameEvent::Ended {
            name: parts.name.clone(),
        });
    }

    fn emit(inner: &Arc<GameInner>, event: GameEvent) {
        let hook = inner
            .event_hook
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(hook) = hook {
            hook(event);
        }
    }

    /// Wait for the current monitor task to finish. Test and shutdown aid.
    pub async fn join_monitor(&self) {
        let monitor = {
            self.inner
                .active
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take()
                .map(|h| h.monitor)
        };
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }
    }
}
