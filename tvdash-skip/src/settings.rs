//! Persisted skip settings
//!
//! Settings are stored as one JSON document under [`SKIP_SETTINGS_KEY`]. They are
//! loaded once per session and overwritten wholesale on every save.

use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Storage key holding the serialized [`SkipSettings`]
pub const SKIP_SETTINGS_KEY: &str = "video-skip-settings";

/// Default intro length skipped when no value is stored
pub const DEFAULT_INTRO_SECONDS: f64 = 90.0;

/// Default outro length skipped when no value is stored
pub const DEFAULT_OUTRO_SECONDS: f64 = 90.0;

/// User-facing skip configuration
///
/// Seconds are expected to be non-negative; range checks belong to the settings UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipSettings {
    /// Auto-skip the intro at the start of playback
    #[serde(default)]
    pub intro_enabled: bool,

    /// Auto-skip the trailing outro window
    #[serde(default)]
    pub outro_enabled: bool,

    /// Intro length; the playhead jumps to this position
    #[serde(default = "default_intro_seconds")]
    pub intro_seconds: f64,

    /// Outro length measured back from the end of the media
    #[serde(default = "default_outro_seconds")]
    pub outro_seconds: f64,
}

fn default_intro_seconds() -> f64 {
    DEFAULT_INTRO_SECONDS
}

fn default_outro_seconds() -> f64 {
    DEFAULT_OUTRO_SECONDS
}

impl Default for SkipSettings {
    fn default() -> Self {
        Self {
            intro_enabled: false,
            outro_enabled: false,
            intro_seconds: DEFAULT_INTRO_SECONDS,
            outro_seconds: DEFAULT_OUTRO_SECONDS,
        }
    }
}

/// Loads and saves [`SkipSettings`] through an injected [`KeyValueStore`]
#[derive(Clone)]
pub struct SkipSettingsStore {
    backend: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for SkipSettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipSettingsStore")
            .field("key", &SKIP_SETTINGS_KEY)
            .finish_non_exhaustive()
    }
}

impl SkipSettingsStore {
    /// Wrap a storage backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read settings from storage
    ///
    /// Never fails: a missing key, a backend error or malformed JSON all yield
    /// [`SkipSettings::default`].
    pub fn load(&self) -> SkipSettings {
        let raw = match self.backend.get(SKIP_SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("No stored skip settings under '{}', using defaults", SKIP_SETTINGS_KEY);
                return SkipSettings::default();
            }
            Err(e) => {
                warn!("Failed to read skip settings: {}, using defaults", e);
                return SkipSettings::default();
            }
        };

        match serde_json::from_str::<SkipSettings>(&raw) {
            Ok(settings) => {
                debug!("Loaded skip settings: {:?}", settings);
                settings
            }
            Err(e) => {
                warn!("Malformed skip settings ({}), using defaults", e);
                SkipSettings::default()
            }
        }
    }

    /// Write settings verbatim
    ///
    /// Backend failures are logged and swallowed; the caller keeps the settings in
    /// memory for the rest of the session.
    pub fn save(&self, settings: &SkipSettings) {
        let raw = match serde_json::to_string(settings) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to encode skip settings: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.set(SKIP_SETTINGS_KEY, &raw) {
            error!("Failed to persist skip settings: {}", e);
        }
    }
}
