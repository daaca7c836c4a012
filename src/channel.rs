//! Shared-file command mailbox between the recognizer subprocess and the
//! orchestrator.
//!
//! The recognizer writes one lowercase phrase into a plain-text file; this
//! side polls it. The file is a single-slot mailbox, not a queue: a new
//! write overwrites the previous phrase, and the consumer truncates the
//! file after taking a command.
//!
//! There is no inter-process locking protocol, so every read must tolerate
//! contention: any I/O failure (missing file, transient lock, partial
//! write) is reported as "no command this tick", never as an error.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// A recognized voice command, normalized for comparison and dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
}

impl Command {
    /// Build a command from raw channel content. Returns `None` if the
    /// content normalizes to an empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = normalize(raw);
        if text.is_empty() {
            None
        } else {
            Some(Self { text })
        }
    }
}

/// Normalize a phrase: trim surrounding whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Handle to the shared command file.
pub struct CommandChannel {
    path: PathBuf,
}

impl CommandChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Producer-side primitive: overwrite the slot with one phrase.
    ///
    /// In production the recognizer subprocess owns this side; the
    /// orchestrator only calls it from tests.
    pub fn write(&self, text: &str) -> std::io::Result<()> {
        fs::write(&self.path, text)
    }

    /// Read the current slot content, normalized. Any I/O failure yields
    /// an empty string.
    pub fn read_raw(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(content) => normalize(&content),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "channel read failed");
                }
                String::new()
            }
        }
    }

    /// Truncate the slot. Best-effort: lock errors are swallowed.
    pub fn clear(&self) {
        if let Err(e) = fs::write(&self.path, "") {
            debug!(path = %self.path.display(), error = %e, "channel clear failed");
        }
    }

    /// Consume this handle and yield the channel's single consumer.
    ///
    /// Delivery (read + dedup + clear) is only possible through the
    /// consumer, so holding it is holding the right to poll.
    pub fn into_consumer(self) -> ChannelConsumer {
        ChannelConsumer {
            channel: self,
            last_delivered: None,
        }
    }
}

/// The unique consuming side of a [`CommandChannel`].
///
/// Tracks the last delivered phrase so a slot that still holds the same
/// text on the next tick is not delivered twice.
pub struct ChannelConsumer {
    channel: CommandChannel,
    last_delivered: Option<String>,
}

impl ChannelConsumer {
    /// Poll the slot once. Returns a command when the slot holds a
    /// non-empty phrase that differs from the last delivered one; the
    /// slot is cleared before returning.
    ///
    /// Clearing happens at take time, so a handler failure downstream
    /// does not cause redelivery. Handlers are expected to be idempotent
    /// regardless.
    pub fn poll_take(&mut self) -> Option<Command> {
        let text = self.channel.read_raw();
        if text.is_empty() {
            return None;
        }
        if self.last_delivered.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_delivered = Some(text.clone());
        self.channel.clear();
        Some(Command { text })
    }

    pub fn last_delivered(&self) -> Option<&str> {
        self.last_delivered.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_in(dir: &tempfile::TempDir) -> CommandChannel {
        CommandChannel::new(dir.path().join("voice_listener.txt"))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Go Home \n"), "go home");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_command_parse_rejects_empty() {
        assert!(Command::parse("  \n").is_none());
        assert_eq!(Command::parse(" LOGIN ").unwrap().text, "login");
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel_in(&dir);
        assert_eq!(channel.read_raw(), "");
    }

    #[test]
    fn test_write_read_clear() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel_in(&dir);
        channel.write("Open Settings").unwrap();
        assert_eq!(channel.read_raw(), "open settings");
        channel.clear();
        assert_eq!(channel.read_raw(), "");
    }

    #[test]
    fn test_consumer_delivers_once_per_distinct_write() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel_in(&dir);
        channel.write("login").unwrap();
        let mut consumer = CommandChannel::new(channel.path().to_path_buf()).into_consumer();

        let first = consumer.poll_take().unwrap();
        assert_eq!(first.text, "login");
        // Slot was cleared after delivery.
        assert_eq!(consumer.poll_take(), None);

        // Recognizer repeats the same phrase: suppressed by dedup.
        CommandChannel::new(dir.path().join("voice_listener.txt"))
            .write("login")
            .unwrap();
        assert_eq!(consumer.poll_take(), None);

        // A distinct phrase goes through.
        CommandChannel::new(dir.path().join("voice_listener.txt"))
            .write("logout")
            .unwrap();
        assert_eq!(consumer.poll_take().unwrap().text, "logout");
        assert_eq!(consumer.last_delivered(), Some("logout"));
    }

    #[test]
    fn test_consumer_ignores_whitespace_only_slot() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel_in(&dir);
        channel.write("   \n").unwrap();
        let mut consumer = channel.into_consumer();
        assert_eq!(consumer.poll_take(), None);
    }
}
