//! Per-playback skip session state
//!
//! One [`SkipSessionState`] exists per playing media item. It records whether each
//! skip already fired and tracks manual seeks and fullscreen toggles, which
//! suppress the intro skip for a short while.

use std::time::Duration;
use tokio::time::Instant;

/// Intro skip stays suppressed this long after a manual seek ends
pub const USER_SEEK_GUARD: Duration = Duration::from_millis(3000);

/// Intro skip stays suppressed this long after a fullscreen transition ends
pub const FULLSCREEN_GUARD: Duration = Duration::from_millis(2000);

/// Mutable state for one playback session
///
/// Timestamps are `None` until first stamped; `None` behaves as "long ago".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSessionState {
    /// Intro skip already fired this session
    pub intro_applied: bool,
    /// Outro skip already fired this session
    pub outro_applied: bool,
    /// Debounce anchor shared by intro and outro skips
    pub last_skip_action_at: Option<Instant>,
    /// User is scrubbing the timeline
    pub user_seeking: bool,
    /// Last manual seek start or end
    pub last_user_seek_at: Option<Instant>,
    /// Player is entering or leaving fullscreen
    pub fullscreen_transitioning: bool,
    /// Last fullscreen transition start or end
    pub last_fullscreen_change_at: Option<Instant>,
}

impl SkipSessionState {
    /// Fresh session state
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything about the previous media item
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn user_seek_start(&mut self, now: Instant) {
        self.user_seeking = true;
        self.last_user_seek_at = Some(now);
    }

    pub fn user_seek_end(&mut self, now: Instant) {
        self.user_seeking = false;
        self.last_user_seek_at = Some(now);
    }

    pub fn fullscreen_change_start(&mut self, now: Instant) {
        self.fullscreen_transitioning = true;
        self.last_fullscreen_change_at = Some(now);
    }

    pub fn fullscreen_change_end(&mut self, now: Instant) {
        self.fullscreen_transitioning = false;
        self.last_fullscreen_change_at = Some(now);
    }

    /// Whether the intro skip must be held back right now
    ///
    /// True while a manual seek or fullscreen transition is in progress, or if one
    /// ended less than [`USER_SEEK_GUARD`] / [`FULLSCREEN_GUARD`] ago.
    pub fn intro_guard_active(&self, now: Instant) -> bool {
        if self.user_seeking || within(self.last_user_seek_at, now, USER_SEEK_GUARD) {
            return true;
        }
        self.fullscreen_transitioning
            || within(self.last_fullscreen_change_at, now, FULLSCREEN_GUARD)
    }

    /// Time since the last skip, `None` if nothing was skipped this session
    pub fn since_last_skip(&self, now: Instant) -> Option<Duration> {
        self.last_skip_action_at
            .map(|at| now.saturating_duration_since(at))
    }
}

fn within(anchor: Option<Instant>, now: Instant, window: Duration) -> bool {
    anchor.is_some_and(|at| now.saturating_duration_since(at) < window)
}
