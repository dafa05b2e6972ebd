//! Skip decision engine
//!
//! Pure functions deciding whether the playhead should move. Callers pass the
//! current [`Playhead`], the settings, the session state and `now`; the functions
//! update the session state and return the seek to perform. Nothing here talks
//! to the player directly.
//!
//! **Order of evaluation** ([`apply_skip_settings`]):
//! 1. immediate intro skip (very start of playback)
//! 2. regular intro skip, only if step 1 did not fire
//! 3. outro skip, independent of the intro outcome

use crate::session::SkipSessionState;
use crate::settings::SkipSettings;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Trailing debounce applied to time-update signals
pub const TIME_UPDATE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Minimum time since the last skip before a regular intro skip
pub const INTRO_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Minimum time since the last skip before an outro skip
pub const OUTRO_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Immediate intro skip only fires within this many seconds of the start
pub const IMMEDIATE_INTRO_WINDOW: f64 = 1.0;

/// Outro skip stops firing this many seconds before the end
pub const OUTRO_END_MARGIN: f64 = 1.0;

/// Outro skip lands this many seconds before the end
pub const OUTRO_TARGET_OFFSET: f64 = 0.1;

/// Playback position snapshot, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playhead {
    pub current_time: f64,
    pub duration: f64,
}

impl Playhead {
    pub fn new(current_time: f64, duration: f64) -> Self {
        Self {
            current_time,
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    Intro,
    Outro,
}

/// Seek decided by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkipAction {
    pub kind: SkipKind,
    /// Playhead position when the decision was taken
    pub from: f64,
    /// Target playhead position
    pub to: f64,
}

/// Intro skip at the very start of playback
///
/// Fires when the intro skip is enabled and not yet applied, the guard is clear,
/// and the playhead is within the first [`IMMEDIATE_INTRO_WINDOW`] seconds and not
/// past the intro. Ignores the intro debounce.
pub fn try_immediate_intro_skip(
    state: &mut SkipSessionState,
    settings: &SkipSettings,
    playhead: Playhead,
    now: Instant,
) -> Option<SkipAction> {
    if !intro_eligible(state, settings, now) {
        return None;
    }
    let t = playhead.current_time;
    // A NaN playhead must not qualify
    if !(t <= IMMEDIATE_INTRO_WINDOW && t <= settings.intro_seconds) {
        return None;
    }
    Some(mark_intro(state, settings, t, now))
}

/// Intro skip anywhere inside the intro window
///
/// Same conditions as [`try_immediate_intro_skip`] but without the start-of-media
/// window, and at least [`INTRO_DEBOUNCE`] must have passed since the last skip.
pub fn try_regular_intro_skip(
    state: &mut SkipSessionState,
    settings: &SkipSettings,
    playhead: Playhead,
    now: Instant,
) -> Option<SkipAction> {
    if !intro_eligible(state, settings, now) {
        return None;
    }
    if state.since_last_skip(now).is_some_and(|d| d < INTRO_DEBOUNCE) {
        return None;
    }
    let t = playhead.current_time;
    if !(t <= settings.intro_seconds) {
        return None;
    }
    Some(mark_intro(state, settings, t, now))
}

/// Jump to just before the end once inside the outro window
///
/// The window is `[duration - outro_seconds, duration - OUTRO_END_MARGIN)`. Only
/// the [`OUTRO_DEBOUNCE`] applies; seek and fullscreen guards do not.
pub fn try_outro_skip(
    state: &mut SkipSessionState,
    settings: &SkipSettings,
    playhead: Playhead,
    now: Instant,
) -> Option<SkipAction> {
    if !settings.outro_enabled || state.outro_applied {
        return None;
    }
    let Playhead {
        current_time: t,
        duration,
    } = playhead;
    if !(duration > 0.0) {
        return None;
    }
    if state.since_last_skip(now).is_some_and(|d| d < OUTRO_DEBOUNCE) {
        return None;
    }

    let skip_point = duration - settings.outro_seconds;
    if !(t >= skip_point && t < duration - OUTRO_END_MARGIN) {
        return None;
    }

    state.outro_applied = true;
    state.last_skip_action_at = Some(now);
    Some(SkipAction {
        kind: SkipKind::Outro,
        from: t,
        to: duration - OUTRO_TARGET_OFFSET,
    })
}

/// Combined evaluation: immediate intro, else regular intro, then outro
///
/// Also used for debounced time updates; each step is a no-op once its skip has
/// been applied.
pub fn apply_skip_settings(
    state: &mut SkipSessionState,
    settings: &SkipSettings,
    playhead: Playhead,
    now: Instant,
) -> Vec<SkipAction> {
    let mut actions = Vec::with_capacity(2);

    let intro = try_immediate_intro_skip(state, settings, playhead, now)
        .or_else(|| try_regular_intro_skip(state, settings, playhead, now));
    actions.extend(intro);

    // Outro decision sees the playhead as it was before any intro seek
    actions.extend(try_outro_skip(state, settings, playhead, now));

    actions
}

fn intro_eligible(state: &SkipSessionState, settings: &SkipSettings, now: Instant) -> bool {
    settings.intro_enabled && !state.intro_applied && !state.intro_guard_active(now)
}

fn mark_intro(
    state: &mut SkipSessionState,
    settings: &SkipSettings,
    from: f64,
    now: Instant,
) -> SkipAction {
    state.intro_applied = true;
    state.last_skip_action_at = Some(now);
    SkipAction {
        kind: SkipKind::Intro,
        from,
        to: settings.intro_seconds,
    }
}
