//! Voxgate — voice command orchestration core.
//!
//! Supervises an external speech-recognition subprocess, polls the
//! shared-file command channel it writes into, routes recognized phrases
//! to context-aware handlers under an authentication gate, and arbitrates
//! exclusive ownership of the channel between global application control
//! and in-game voice control.
//!
//! The binary wires these pieces together and communicates with a host
//! GUI via JSON-line IPC on stdin/stdout; every component is also usable
//! on its own through this library.

pub mod auth;
pub mod biometric;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod game;
pub mod ipc;
pub mod logger;
pub mod proc;
pub mod recognizer;
pub mod router;
pub mod session;
pub mod windows;

pub use auth::AuthGate;
pub use channel::{Command, CommandChannel};
pub use coordinator::{ModeCoordinator, ModeState};
pub use error::{Error, Result};
pub use game::GameSessionSupervisor;
pub use recognizer::RecognizerSupervisor;
pub use router::CommandRouter;
pub use session::Session;
