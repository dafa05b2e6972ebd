//! # tvdash Skip Controller (tvdash-skip)
//!
//! Decides when to jump the playhead of an already-playing media element past
//! an intro or to the end of an outro.
//!
//! **Architecture:**
//! - [`settings`]: persisted [`SkipSettings`] behind a [`KeyValueStore`]
//! - [`session`]: per-playback guard and "already applied" tracking
//! - [`engine`]: pure skip decisions over (time, duration, settings, session, now)
//! - [`controller`]: [`SkipController`] handle wiring host signals, the 200 ms
//!   time-update debounce timer and the settings store together
//!
//! The controller never reports errors to the embedding player; storage problems
//! degrade to default settings and are logged.

pub mod controller;
pub mod engine;
pub mod events;
pub mod host;
pub mod session;
pub mod settings;
pub mod store;

pub use controller::SkipController;
pub use engine::{Playhead, SkipAction, SkipKind};
pub use events::SkipEvent;
pub use host::MediaHost;
pub use session::SkipSessionState;
pub use settings::{SkipSettings, SkipSettingsStore, SKIP_SETTINGS_KEY};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
