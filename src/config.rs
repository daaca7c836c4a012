//! Configuration reading and data directory paths.
//!
//! `voxgate.json` lives in the platform config directory. A missing or
//! corrupt file degrades to defaults with a warning; configuration
//! problems are never fatal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level voxgate.json shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Absolute path to the shared command file. Defaults to
    /// `voice_listener.txt` in the recognizer's working directory (or the
    /// data directory when no workdir is configured).
    #[serde(default)]
    pub channel_file: Option<String>,

    /// Global poll interval for the command channel, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub recognizer: RecognizerConfig,

    #[serde(default)]
    pub games: Vec<GameProfile>,

    /// Base URL of the face/voice biometric services, if deployed.
    #[serde(default)]
    pub biometric_url: Option<String>,
}

/// Launch configuration for the external recognizer subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Interpreter for launch strategy A.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Script path for strategy A, relative to `workdir` unless absolute.
    #[serde(default = "default_recognizer_script")]
    pub script: Option<String>,

    /// Standalone executable for strategy B.
    #[serde(default)]
    pub executable: Option<String>,

    /// Working directory for the subprocess; also where the default
    /// channel file lives.
    #[serde(default)]
    pub workdir: Option<String>,

    /// Bounded wait between terminate and force-kill, in milliseconds.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

/// Per-game configuration for in-game voice control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProfile {
    pub name: String,

    /// Phrases that launch this game (e.g. "open mr racer").
    #[serde(default)]
    pub launch_phrases: Vec<String>,

    /// Title substring identifying the game's main window.
    pub window_marker: String,

    /// Working directory for the per-game controller subprocess.
    #[serde(default)]
    pub workdir: Option<String>,

    /// Interpreter + script for the controller (strategy A).
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub script: Option<String>,

    /// Standalone controller executable (strategy B).
    #[serde(default)]
    pub executable: Option<String>,

    /// How long to wait for the game window to appear before giving up.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Interval between window checks, in milliseconds.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_recognizer_script() -> Option<String> {
    Some("voice_listener.py".to_string())
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_watch_interval_ms() -> u64 {
    1000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_file: None,
            poll_interval_ms: default_poll_interval_ms(),
            recognizer: RecognizerConfig::default(),
            games: Vec::new(),
            biometric_url: None,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_recognizer_script(),
            executable: None,
            workdir: None,
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl RecognizerConfig {
    pub fn workdir_path(&self) -> Option<PathBuf> {
        self.workdir.as_ref().map(PathBuf::from)
    }

    pub fn stop_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.stop_grace_ms)
    }
}

impl GameProfile {
    pub fn workdir_path(&self) -> Option<PathBuf> {
        self.workdir.as_ref().map(PathBuf::from)
    }

    pub fn startup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn watch_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.watch_interval_ms)
    }
}

impl OrchestratorConfig {
    /// Resolved path of the shared command file.
    pub fn channel_path(&self) -> PathBuf {
        if let Some(ref explicit) = self.channel_file {
            return PathBuf::from(explicit);
        }
        self.recognizer
            .workdir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(get_data_dir)
            .join("voice_listener.txt")
    }

    /// Find a game profile by its configured name (case-insensitive).
    pub fn game_by_name(&self, name: &str) -> Option<&GameProfile> {
        let needle = name.to_lowercase();
        self.games.iter().find(|g| g.name.to_lowercase() == needle)
    }

    /// Find the game profile whose launch phrases contain this phrase.
    pub fn game_for_phrase(&self, phrase: &str) -> Option<&GameProfile> {
        self.games
            .iter()
            .find(|g| g.launch_phrases.iter().any(|p| p == phrase))
    }
}

/// Data directory for config, the default channel file, and logs.
///
/// - Windows: `%APPDATA%\voxgate\`
/// - macOS:   `~/Library/Application Support/voxgate/`
/// - Linux:   `~/.config/voxgate/`
pub fn get_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxgate")
}

pub fn get_config_path() -> PathBuf {
    get_data_dir().join("voxgate.json")
}

pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Read voxgate.json from the data directory, falling back to defaults.
pub fn load() -> OrchestratorConfig {
    read_json_file(&get_config_path()).unwrap_or_default()
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.recognizer.interpreter, "python3");
        assert_eq!(
            config.recognizer.script.as_deref(),
            Some("voice_listener.py")
        );
        assert!(config.games.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "channel_file": "/tmp/voice_listener.txt",
            "poll_interval_ms": 50,
            "recognizer": {
                "interpreter": "python",
                "script": "listener.py",
                "workdir": "/opt/recognizer"
            },
            "games": [{
                "name": "mr-racer",
                "launch_phrases": ["open mr racer", "play mr racer"],
                "window_marker": "MR RACER",
                "script": "voice_game_controller.py",
                "workdir": "/opt/games/mr-racer"
            }],
            "biometric_url": "http://127.0.0.1:5000"
        }"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.channel_path(), PathBuf::from("/tmp/voice_listener.txt"));
        assert_eq!(config.poll_interval_ms, 50);

        let game = config.game_by_name("MR-Racer").unwrap();
        assert_eq!(game.window_marker, "MR RACER");
        assert_eq!(game.startup_timeout_secs, 30);
        assert_eq!(game.watch_interval_ms, 1000);

        assert!(config.game_for_phrase("play mr racer").is_some());
        assert!(config.game_for_phrase("play tetris").is_none());
    }

    #[test]
    fn test_channel_path_falls_back_to_workdir() {
        let config: OrchestratorConfig = serde_json::from_str(
            r#"{"recognizer": {"workdir": "/opt/recognizer"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.channel_path(),
            PathBuf::from("/opt/recognizer/voice_listener.txt")
        );
    }
}
