//! Skip controller handle
//!
//! [`SkipController`] is owned by the playback view. The host wires its player
//! signals (time update, seek start/end, fullscreen start/end, media end,
//! teardown) to the matching methods; the controller decides when to seek and
//! calls [`MediaHost::set_current_time`].
//!
//! **Concurrency:**
//! - All decisions run under one mutex, so evaluations never interleave
//! - Host seeks and event broadcasts happen after the mutex is released
//! - At most one debounced time-update timer is pending; a new tick, a session
//!   reset or [`SkipController::cleanup`] cancels it
//! - Each timer carries a generation number; a timer that already woke up when it
//!   was cancelled sees a stale generation and does nothing

use crate::engine::{self, Playhead, SkipAction, SkipKind, TIME_UPDATE_DEBOUNCE};
use crate::events::SkipEvent;
use crate::host::MediaHost;
use crate::session::SkipSessionState;
use crate::settings::{SkipSettings, SkipSettingsStore};
use crate::store::KeyValueStore;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Callback fired when the host should advance to the next item
pub type SkipToNextCallback = Arc<dyn Fn() + Send + Sync>;

/// Buffered events per subscriber before lagging receivers drop old events
const EVENT_CHANNEL_CAPACITY: usize = 64;

struct Inner {
    settings: SkipSettings,
    state: SkipSessionState,
    session_id: Uuid,
    pending_tick: Option<JoinHandle<()>>,
    tick_generation: u64,
}

impl Inner {
    /// Abort the pending time-update timer and invalidate any that already woke
    fn cancel_pending_tick(&mut self) {
        if let Some(handle) = self.pending_tick.take() {
            handle.abort();
        }
        self.tick_generation = self.tick_generation.wrapping_add(1);
    }
}

/// Intro/outro auto-skip controller for one playback view
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SkipController {
    inner: Arc<Mutex<Inner>>,
    host: Arc<dyn MediaHost>,
    store: SkipSettingsStore,
    skip_to_next: Option<SkipToNextCallback>,
    events: broadcast::Sender<SkipEvent>,
}

impl fmt::Debug for SkipController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("SkipController")
            .field("session_id", &inner.session_id)
            .field("settings", &inner.settings)
            .field("state", &inner.state)
            .field("tick_pending", &inner.pending_tick.is_some())
            .finish_non_exhaustive()
    }
}

impl SkipController {
    /// Create a controller and load settings once from `store`
    pub fn new(host: Arc<dyn MediaHost>, store: Arc<dyn KeyValueStore>) -> Self {
        let store = SkipSettingsStore::new(store);
        let settings = store.load();
        let session_id = Uuid::new_v4();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(%session_id, ?settings, "Skip controller created");

        Self {
            inner: Arc::new(Mutex::new(Inner {
                settings,
                state: SkipSessionState::new(),
                session_id,
                pending_tick: None,
                tick_generation: 0,
            })),
            host,
            store,
            skip_to_next: None,
            events,
        }
    }

    /// Register the callback fired by [`on_media_ended`](Self::on_media_ended)
    pub fn with_skip_to_next<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.skip_to_next = Some(Arc::new(callback));
        self
    }

    /// Current settings
    pub fn settings(&self) -> SkipSettings {
        self.lock().settings
    }

    /// Snapshot of the session state
    pub fn session_state(&self) -> SkipSessionState {
        self.lock().state.clone()
    }

    /// Identifier of the current session (changes on every reset)
    pub fn session_id(&self) -> Uuid {
        self.lock().session_id
    }

    /// Whether a debounced time update is waiting to run
    pub fn has_pending_time_update(&self) -> bool {
        self.lock().pending_tick.is_some()
    }

    /// Subscribe to skip notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SkipEvent> {
        self.events.subscribe()
    }

    /// Replace and persist the settings, then re-evaluate at the current position
    ///
    /// The re-evaluation may seek immediately. A storage failure is logged and the
    /// new settings still apply for this session.
    pub fn save_settings(&self, settings: SkipSettings) -> Vec<SkipAction> {
        self.lock().settings = settings;
        self.store.save(&settings);
        debug!(?settings, "Skip settings saved");
        self.broadcast(SkipEvent::SettingsChanged { settings });

        self.apply_skip_settings()
    }

    /// Evaluate intro and outro skips now and perform any resulting seek
    pub fn apply_skip_settings(&self) -> Vec<SkipAction> {
        let playhead = self.playhead();
        let actions = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            engine::apply_skip_settings(&mut inner.state, &inner.settings, playhead, Instant::now())
        };
        self.perform(&actions);
        actions
    }

    /// Time-update signal from the host
    ///
    /// Trailing debounce: the evaluation runs [`TIME_UPDATE_DEBOUNCE`] after the
    /// last of a burst of signals. Without a tokio runtime the evaluation runs
    /// immediately instead.
    pub fn handle_time_update(&self) {
        let runtime = Handle::try_current();
        let mut inner = self.lock();
        inner.cancel_pending_tick();

        let Ok(runtime) = runtime else {
            drop(inner);
            debug!("No async runtime, evaluating time update immediately");
            self.apply_skip_settings();
            return;
        };

        let generation = inner.tick_generation;
        let controller = self.clone();
        inner.pending_tick = Some(runtime.spawn(async move {
            tokio::time::sleep(TIME_UPDATE_DEBOUNCE).await;
            controller.run_debounced_tick(generation);
        }));
    }

    /// Forget the previous media item; call on every new media load
    pub fn reset_skip_state(&self) {
        let session_id = {
            let mut inner = self.lock();
            inner.cancel_pending_tick();
            inner.state.reset();
            inner.session_id = Uuid::new_v4();
            inner.session_id
        };
        debug!(%session_id, "Skip session reset");
        self.broadcast(SkipEvent::SessionReset { session_id });
    }

    pub fn on_user_seek_start(&self) {
        self.lock().state.user_seek_start(Instant::now());
    }

    pub fn on_user_seek_end(&self) {
        self.lock().state.user_seek_end(Instant::now());
    }

    pub fn on_fullscreen_change_start(&self) {
        self.lock().state.fullscreen_change_start(Instant::now());
    }

    pub fn on_fullscreen_change_end(&self) {
        self.lock().state.fullscreen_change_end(Instant::now());
    }

    /// End-of-media signal from the host
    ///
    /// When this session's outro skip carried playback to the end, the
    /// skip-to-next callback fires so the host can advance. Returns whether it did.
    pub fn on_media_ended(&self) -> bool {
        if !self.lock().state.outro_applied {
            return false;
        }
        let Some(callback) = &self.skip_to_next else {
            return false;
        };

        info!("Media ended after outro skip, advancing to next");
        callback();
        self.broadcast(SkipEvent::SkipToNext);
        true
    }

    /// Cancel any pending timer; call when the playback view is torn down
    pub fn cleanup(&self) {
        self.lock().cancel_pending_tick();
        debug!("Skip controller cleaned up");
    }

    fn run_debounced_tick(&self, generation: u64) {
        let playhead = self.playhead();
        let actions = {
            let mut guard = self.lock();
            if guard.tick_generation != generation {
                return;
            }
            guard.pending_tick = None;

            let inner = &mut *guard;
            engine::apply_skip_settings(&mut inner.state, &inner.settings, playhead, Instant::now())
        };
        self.perform(&actions);
    }

    fn playhead(&self) -> Playhead {
        Playhead::new(self.host.current_time(), self.host.duration())
    }

    fn perform(&self, actions: &[SkipAction]) {
        for action in actions {
            match action.kind {
                SkipKind::Intro => {
                    info!("Skipping intro: {:.1}s -> {:.1}s", action.from, action.to);
                    self.host.set_current_time(action.to);
                    self.broadcast(SkipEvent::IntroSkipped {
                        from: action.from,
                        to: action.to,
                    });
                }
                SkipKind::Outro => {
                    info!("Skipping outro: {:.1}s -> {:.1}s", action.from, action.to);
                    self.host.set_current_time(action.to);
                    self.broadcast(SkipEvent::OutroSkipped {
                        from: action.from,
                        to: action.to,
                    });
                }
            }
        }
    }

    fn broadcast(&self, event: SkipEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
