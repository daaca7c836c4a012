//! Error types and Result alias for voxgate operations.
//!
//! Channel I/O failures are deliberately NOT represented here: a locked or
//! missing channel file degrades to "no command this tick" inside
//! `channel::CommandChannel` and never reaches a caller as an error.

use thiserror::Error;

/// Result type alias for voxgate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Neither launch strategy had a usable target.
    #[error("no launch target available (tried: {})", .tried.join(", "))]
    MissingLaunchTarget { tried: Vec<String> },

    /// The OS rejected a spawn call.
    #[error("failed to spawn '{target}': {reason}")]
    SpawnFailed { target: String, reason: String },

    /// A second poll loop was requested while one is active.
    #[error("a channel poller is already active")]
    PollerActive,

    /// A second game session was requested while one is active.
    #[error("a game session is already active")]
    GameSessionActive,

    /// Biometric service request failed at the HTTP layer.
    #[error("biometric service error: {0}")]
    Http(#[from] reqwest::Error),
}
