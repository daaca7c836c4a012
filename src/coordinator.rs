//! Mode coordination: who owns command delivery.
//!
//! The coordinator runs the single global poll loop over the command
//! channel and exposes pause/resume so a game session can take over voice
//! input for the game's lifetime. Ownership is structural, not
//! conventional: delivery requires the channel's unique consumer, which
//! lives in the coordinator, and a second `start_global_monitoring` while
//! a loop is active is rejected rather than silently racing.
//!
//! Cancellation follows the generation-counter pattern: `pause()` bumps
//! the generation, and the loop checks it every tick, so a stale task can
//! never deliver after a newer owner exists.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::channel::{ChannelConsumer, Command, CommandChannel};
use crate::error::{Error, Result};

/// Which consumer currently owns command delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    GlobalActive,
    Transitioning,
    GameActive,
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeState::GlobalActive => write!(f, "global_active"),
            ModeState::Transitioning => write!(f, "transitioning"),
            ModeState::GameActive => write!(f, "game_active"),
        }
    }
}

type OnCommand = Arc<dyn Fn(Command) + Send + Sync>;

struct Inner {
    consumer: Mutex<Option<ChannelConsumer>>,
    mode: Mutex<ModeState>,
    generation: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
    on_command: Mutex<Option<OnCommand>>,
    interval: Mutex<Duration>,
}

#[derive(Clone)]
pub struct ModeCoordinator {
    inner: Arc<Inner>,
}

impl ModeCoordinator {
    /// Take ownership of the channel; the coordinator holds its only
    /// consumer from here on.
    pub fn new(channel: CommandChannel) -> Self {
        Self {
            inner: Arc::new(Inner {
                consumer: Mutex::new(Some(channel.into_consumer())),
                mode: Mutex::new(ModeState::GlobalActive),
                generation: AtomicU64::new(0),
                task: Mutex::new(None),
                on_command: Mutex::new(None),
                interval: Mutex::new(Duration::from_millis(100)),
            }),
        }
    }

    pub fn mode(&self) -> ModeState {
        *self.inner.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_mode(&self, mode: ModeState) {
        let mut guard = self.inner.mode.lock().unwrap_or_else(|e| e.into_inner());
        if *guard != mode {
            info!(from = %*guard, to = %mode, "mode change");
            *guard = mode;
        }
    }

    /// Whether a poll loop is currently active.
    pub fn is_polling(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Begin the fixed-rate poll of the command channel.
    ///
    /// The callback is stored so `resume()` restarts the loop with the
    /// same contract. Returns [`Error::PollerActive`] if a loop is
    /// already running.
    pub fn start_global_monitoring<F>(&self, on_command: F, interval: Duration) -> Result<()>
    where
        F: Fn(Command) + Send + Sync + 'static,
    {
        let mut task = self.inner.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return Err(Error::PollerActive);
        }

        *self
            .inner
            .on_command
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(on_command));
        // tokio::time::interval panics on a zero period.
        *self.inner.interval.lock().unwrap_or_else(|e| e.into_inner()) =
            interval.max(Duration::from_millis(1));

        self.set_mode(ModeState::GlobalActive);
        *task = Some(self.spawn_poll_loop());
        debug!(interval_ms = interval.as_millis() as u64, "global monitoring started");
        Ok(())
    }

    fn spawn_poll_loop(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let my_gen = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let interval = *inner.interval.lock().unwrap_or_else(|e| e.into_inner());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if inner.generation.load(Ordering::SeqCst) != my_gen {
                    debug!("poll loop superseded, exiting");
                    break;
                }

                let command = {
                    let mut consumer = inner.consumer.lock().unwrap_or_else(|e| e.into_inner());
                    consumer.as_mut().and_then(|c| c.poll_take())
                };

                if let Some(command) = command {
                    debug!(text = %command.text, "command taken from channel");
                    let callback = inner
                        .on_command
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .clone();
                    if let Some(callback) = callback {
                        callback(command);
                    }
                }
            }
        })
    }

    /// Stop the poll loop and mark the channel as in handoff. Idempotent.
    pub fn pause(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("global monitoring paused");
        }
        self.set_mode(ModeState::Transitioning);
    }

    /// Restart the poll loop with the stored delivery callback. Idempotent;
    /// a resume before any `start_global_monitoring` is a no-op.
    pub fn resume(&self) {
        let mut task = self.inner.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            self.set_mode(ModeState::GlobalActive);
            return;
        }
        if self
            .inner
            .on_command
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
        {
            warn!("resume requested before monitoring was ever started");
            return;
        }

        self.set_mode(ModeState::GlobalActive);
        *task = Some(self.spawn_poll_loop());
        info!("global monitoring resumed");
    }

    /// Record that the game window has been observed and the game now owns
    /// voice input.
    pub fn mark_game_active(&self) {
        self.set_mode(ModeState::GameActive);
    }

    /// Terminal stop for application shutdown: cancel the loop and leave
    /// the mode at GlobalActive.
    pub fn shutdown(&self) {
        self.pause();
        self.set_mode(ModeState::GlobalActive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_channel(dir: &tempfile::TempDir) -> (CommandChannel, CommandChannel) {
        let path = dir.path().join("voice_listener.txt");
        (CommandChannel::new(&path), CommandChannel::new(&path))
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(Command) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |cmd: Command| {
            sink.lock().unwrap().push(cmd.text);
        })
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout");
    }

    #[tokio::test]
    async fn test_poll_loop_delivers_distinct_commands_once() {
        let dir = tempfile::tempdir().unwrap();
        let (producer, channel) = make_channel(&dir);
        let coordinator = ModeCoordinator::new(channel);
        let (seen, on_command) = collector();

        coordinator
            .start_global_monitoring(on_command, Duration::from_millis(5))
            .unwrap();
        assert_eq!(coordinator.mode(), ModeState::GlobalActive);

        producer.write("login").unwrap();
        wait_until(|| !seen.lock().unwrap().is_empty()).await;

        // Same phrase re-written: deduped against last_delivered.
        producer.write("login").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.lock().unwrap().as_slice(), ["login"]);

        producer.write("go home").unwrap();
        wait_until(|| seen.lock().unwrap().len() == 2).await;
        assert_eq!(seen.lock().unwrap().as_slice(), ["login", "go home"]);

        coordinator.shutdown();
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (_producer, channel) = make_channel(&dir);
        let coordinator = ModeCoordinator::new(channel);
        let (_seen, on_command) = collector();

        coordinator
            .start_global_monitoring(on_command, Duration::from_millis(5))
            .unwrap();
        let second = coordinator.start_global_monitoring(|_| {}, Duration::from_millis(5));
        assert!(matches!(second, Err(Error::PollerActive)));

        coordinator.shutdown();
    }

    #[tokio::test]
    async fn test_pause_stops_delivery_and_resume_restores_it() {
        let dir = tempfile::tempdir().unwrap();
        let (producer, channel) = make_channel(&dir);
        let coordinator = ModeCoordinator::new(channel);
        let (seen, on_command) = collector();

        coordinator
            .start_global_monitoring(on_command, Duration::from_millis(5))
            .unwrap();

        coordinator.pause();
        assert_eq!(coordinator.mode(), ModeState::Transitioning);
        assert!(!coordinator.is_polling());

        producer.write("settings").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.lock().unwrap().is_empty());

        coordinator.resume();
        assert_eq!(coordinator.mode(), ModeState::GlobalActive);
        assert!(coordinator.is_polling());
        wait_until(|| !seen.lock().unwrap().is_empty()).await;
        assert_eq!(seen.lock().unwrap().as_slice(), ["settings"]);

        coordinator.shutdown();
    }

    #[tokio::test]
    async fn test_pause_and_resume_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (_producer, channel) = make_channel(&dir);
        let coordinator = ModeCoordinator::new(channel);
        let (_seen, on_command) = collector();

        coordinator
            .start_global_monitoring(on_command, Duration::from_millis(5))
            .unwrap();

        coordinator.pause();
        coordinator.pause();
        assert_eq!(coordinator.mode(), ModeState::Transitioning);

        coordinator.resume();
        coordinator.resume();
        assert_eq!(coordinator.mode(), ModeState::GlobalActive);
        assert!(coordinator.is_polling());

        coordinator.shutdown();
    }

    #[tokio::test]
    async fn test_resume_before_start_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (_producer, channel) = make_channel(&dir);
        let coordinator = ModeCoordinator::new(channel);
        coordinator.resume();
        assert!(!coordinator.is_polling());
    }
}
