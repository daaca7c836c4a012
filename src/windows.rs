//! Window identity probing.
//!
//! Game detection only needs one question answered: "is something with
//! this title substring on screen?". The probe trait keeps the game
//! supervisor independent of any particular OS enumeration API and makes
//! the appearance/disappearance logic testable with an in-memory fake.

use sysinfo::{ProcessesToUpdate, System};

/// Source of visible window titles.
pub trait WindowProbe: Send + Sync {
    fn visible_titles(&self) -> Vec<String>;

    /// Case-insensitive substring match against every visible title.
    fn marker_visible(&self, marker: &str) -> bool {
        let needle = marker.to_lowercase();
        self.visible_titles()
            .iter()
            .any(|title| title.to_lowercase().contains(&needle))
    }
}

/// Production probe backed by process enumeration.
///
/// Games launched as their own process are identified by process name;
/// a fresh snapshot is taken on every call so the 1 s watch cadence sees
/// launches and exits promptly.
pub struct SystemWindowProbe;

impl SystemWindowProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemWindowProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowProbe for SystemWindowProbe {
    fn visible_titles(&self) -> Vec<String> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().into_owned())
            .collect()
    }
}
