//! Skip controller notifications
//!
//! Broadcast to every subscriber of
//! [`SkipController::subscribe`](crate::SkipController::subscribe). Sending never
//! blocks; events are dropped when nobody listens.

use crate::settings::SkipSettings;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkipEvent {
    /// Playhead moved past the intro
    IntroSkipped { from: f64, to: f64 },

    /// Playhead moved to just before the end
    OutroSkipped { from: f64, to: f64 },

    /// Settings were replaced by a save
    SettingsChanged { settings: SkipSettings },

    /// New media loaded; all per-session state cleared
    SessionReset { session_id: Uuid },

    /// Media ended after an outro skip; the host should advance
    SkipToNext,
}
