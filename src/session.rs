//! Explicit session context.
//!
//! Everything the original kept as process-wide globals — the auth flag,
//! configuration — lives here and is passed to constructors, so tests can
//! run any number of independent orchestrators side by side.

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::channel::CommandChannel;
use crate::config::{GameProfile, OrchestratorConfig};

pub struct Session {
    auth: Arc<AuthGate>,
    config: OrchestratorConfig,
}

impl Session {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            auth: Arc::new(AuthGate::new()),
            config,
        }
    }

    pub fn auth(&self) -> Arc<AuthGate> {
        Arc::clone(&self.auth)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// A fresh handle to the shared command file.
    pub fn channel(&self) -> CommandChannel {
        CommandChannel::new(self.config.channel_path())
    }

    pub fn game_by_name(&self, name: &str) -> Option<&GameProfile> {
        self.config.game_by_name(name)
    }

    pub fn game_for_phrase(&self, phrase: &str) -> Option<&GameProfile> {
        self.config.game_for_phrase(phrase)
    }
}
