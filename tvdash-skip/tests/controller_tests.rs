//! Integration tests for the skip controller
//!
//! Timer behaviour runs on a paused tokio clock (`start_paused = true`), so the
//! debounce and guard windows are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::time::sleep;
use tvdash_skip::{
    JsonFileStore, KeyValueStore, MediaHost, MemoryStore, SkipController, SkipEvent, SkipKind,
    SkipSessionState, SkipSettings, SKIP_SETTINGS_KEY,
};

/// Test helper: player stand-in recording every seek
#[derive(Default)]
struct FakeHost {
    position: Mutex<f64>,
    duration: Mutex<f64>,
    seeks: Mutex<Vec<f64>>,
    /// Controller to poke from inside `set_current_time`
    reenter: OnceLock<SkipController>,
}

impl FakeHost {
    fn new(position: f64, duration: f64) -> Arc<Self> {
        let host = Self::default();
        *host.position.lock().unwrap() = position;
        *host.duration.lock().unwrap() = duration;
        Arc::new(host)
    }

    fn set_position(&self, seconds: f64) {
        *self.position.lock().unwrap() = seconds;
    }

    fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

impl MediaHost for FakeHost {
    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn set_current_time(&self, seconds: f64) {
        self.seeks.lock().unwrap().push(seconds);
        *self.position.lock().unwrap() = seconds;
        if let Some(controller) = self.reenter.get() {
            controller.on_user_seek_start();
            controller.on_user_seek_end();
        }
    }

    fn duration(&self) -> f64 {
        *self.duration.lock().unwrap()
    }
}

/// Test helper: memory store pre-loaded with `settings`
fn store_with(settings: SkipSettings) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store
        .set(SKIP_SETTINGS_KEY, &serde_json::to_string(&settings).unwrap())
        .unwrap();
    Arc::new(store)
}

fn intro(seconds: f64) -> SkipSettings {
    SkipSettings {
        intro_enabled: true,
        intro_seconds: seconds,
        ..SkipSettings::default()
    }
}

fn outro(seconds: f64) -> SkipSettings {
    SkipSettings {
        outro_enabled: true,
        outro_seconds: seconds,
        ..SkipSettings::default()
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// =============================================================================
// Settings loading
// =============================================================================

#[tokio::test]
async fn test_new_controller_loads_stored_settings() {
    let host = FakeHost::new(0.0, 1200.0);
    let controller = SkipController::new(host, store_with(intro(75.0)));

    assert_eq!(controller.settings(), intro(75.0));
}

#[tokio::test]
async fn test_new_controller_with_empty_store_uses_defaults() {
    let host = FakeHost::new(0.0, 1200.0);
    let controller = SkipController::new(host, Arc::new(MemoryStore::new()));

    assert_eq!(controller.settings(), SkipSettings::default());
}

#[tokio::test]
async fn test_save_then_load_in_fresh_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skip.json");
    let settings = SkipSettings {
        intro_enabled: true,
        outro_enabled: true,
        intro_seconds: 42.0,
        outro_seconds: 61.5,
    };

    let first = SkipController::new(FakeHost::new(500.0, 1200.0), Arc::new(JsonFileStore::new(&path)));
    first.save_settings(settings);
    first.cleanup();

    let second = SkipController::new(FakeHost::new(0.0, 0.0), Arc::new(JsonFileStore::new(&path)));
    assert_eq!(second.settings(), settings);
}

// =============================================================================
// Time-update debounce
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_immediate_intro_skip_on_first_tick() {
    let host = FakeHost::new(0.3, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.handle_time_update();
    assert!(host.seeks().is_empty());

    sleep(ms(250)).await;
    assert_eq!(host.seeks(), vec![90.0]);
    assert!(controller.session_state().intro_applied);
    assert!(!controller.has_pending_time_update());
}

#[tokio::test(start_paused = true)]
async fn test_time_updates_coalesce_into_one_evaluation() {
    let host = FakeHost::new(40.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    for step in 0..4 {
        host.set_position(40.0 + step as f64 * 0.05);
        controller.handle_time_update();
        sleep(ms(50)).await;
    }

    // Last tick at 150ms; its timer fires at 350ms
    sleep(ms(140)).await;
    assert!(host.seeks().is_empty());
    assert!(controller.has_pending_time_update());

    sleep(ms(20)).await;
    assert_eq!(host.seeks(), vec![90.0]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_after_intro_applied_does_not_seek_again() {
    let host = FakeHost::new(0.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.handle_time_update();
    sleep(ms(250)).await;

    // User scrubs back into the intro
    host.set_position(10.0);
    controller.handle_time_update();
    sleep(ms(5_000)).await;

    assert_eq!(host.seeks(), vec![90.0]);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_cancels_pending_tick() {
    let host = FakeHost::new(0.2, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.handle_time_update();
    assert!(controller.has_pending_time_update());
    controller.cleanup();
    assert!(!controller.has_pending_time_update());

    sleep(ms(1_000)).await;
    assert!(host.seeks().is_empty());
    assert!(!controller.session_state().intro_applied);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_tick_and_starts_new_session() {
    let host = FakeHost::new(0.2, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.apply_skip_settings();
    assert!(controller.session_state().intro_applied);
    let first_session = controller.session_id();

    controller.handle_time_update();
    controller.reset_skip_state();
    assert!(!controller.has_pending_time_update());
    assert_ne!(controller.session_id(), first_session);
    assert_eq!(controller.session_state(), SkipSessionState::default());

    // Next episode starts: intro fires again
    host.set_position(0.0);
    controller.handle_time_update();
    sleep(ms(250)).await;
    assert_eq!(host.seeks(), vec![90.0, 90.0]);
}

#[test]
fn test_time_update_without_runtime_evaluates_immediately() {
    let host = FakeHost::new(0.5, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.handle_time_update();
    assert_eq!(host.seeks(), vec![90.0]);
    assert!(!controller.has_pending_time_update());
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_user_seeking_blocks_intro_skip() {
    let host = FakeHost::new(20.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.on_user_seek_start();
    controller.handle_time_update();
    sleep(ms(10_000)).await;
    assert!(controller.apply_skip_settings().is_empty());
    assert!(host.seeks().is_empty());

    controller.on_user_seek_end();
    sleep(ms(2_900)).await;
    assert!(controller.apply_skip_settings().is_empty());

    sleep(ms(200)).await;
    let actions = controller.apply_skip_settings();
    assert_eq!(actions.len(), 1);
    assert_eq!(host.seeks(), vec![90.0]);
}

#[tokio::test(start_paused = true)]
async fn test_fullscreen_guard_window() {
    let host = FakeHost::new(20.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));

    controller.on_fullscreen_change_start();
    controller.on_fullscreen_change_end();

    sleep(ms(1_000)).await;
    assert!(controller.apply_skip_settings().is_empty());

    sleep(ms(1_100)).await;
    assert_eq!(controller.apply_skip_settings().len(), 1);
    assert_eq!(host.seeks(), vec![90.0]);
}

#[tokio::test(start_paused = true)]
async fn test_outro_skip_ignores_user_seek_guard() {
    let host = FakeHost::new(1150.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(outro(90.0)));

    controller.on_user_seek_start();
    controller.handle_time_update();
    sleep(ms(250)).await;

    assert_eq!(host.seeks().len(), 1);
    assert!((host.seeks()[0] - 1199.9).abs() < 1e-9);
}

// =============================================================================
// Settings save
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_outro_scenario_from_save() {
    let host = FakeHost::new(1110.0, 1200.0);
    let controller = SkipController::new(host.clone(), Arc::new(MemoryStore::new()));

    let actions = controller.save_settings(outro(90.0));

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, SkipKind::Outro);
    assert!((actions[0].to - 1199.9).abs() < 1e-9);
    assert!(controller.session_state().outro_applied);
}

#[tokio::test(start_paused = true)]
async fn test_second_save_within_debounce_does_not_skip() {
    let host = FakeHost::new(1150.0, 1200.0);
    let controller = SkipController::new(host.clone(), Arc::new(MemoryStore::new()));

    assert_eq!(controller.save_settings(outro(90.0)).len(), 1);

    host.set_position(1150.0);
    sleep(ms(500)).await;
    assert!(controller.save_settings(outro(60.0)).is_empty());
    assert_eq!(host.seeks().len(), 1);
    assert_eq!(controller.settings(), outro(60.0));
}

#[tokio::test(start_paused = true)]
async fn test_save_enabling_intro_skips_immediately() {
    let host = FakeHost::new(12.0, 1200.0);
    let store = Arc::new(MemoryStore::new());
    let controller = SkipController::new(host.clone(), store.clone());

    assert!(controller.apply_skip_settings().is_empty());

    controller.save_settings(intro(30.0));
    assert_eq!(host.seeks(), vec![30.0]);

    let raw = store.get(SKIP_SETTINGS_KEY).unwrap().unwrap();
    assert!(raw.contains("\"introSeconds\":30"));
}

// =============================================================================
// Events and host callbacks
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_events_are_broadcast() {
    let host = FakeHost::new(0.0, 1200.0);
    let controller = SkipController::new(host.clone(), Arc::new(MemoryStore::new()));
    let mut rx = controller.subscribe();

    controller.save_settings(intro(90.0));
    controller.reset_skip_state();

    assert_eq!(
        rx.try_recv().unwrap(),
        SkipEvent::SettingsChanged {
            settings: intro(90.0)
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        SkipEvent::IntroSkipped { from: 0.0, to: 90.0 }
    );
    assert!(matches!(rx.try_recv().unwrap(), SkipEvent::SessionReset { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_media_end_after_outro_skip_advances() {
    let advanced = Arc::new(AtomicUsize::new(0));
    let counter = advanced.clone();
    let host = FakeHost::new(1150.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(outro(90.0)))
        .with_skip_to_next(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    // Natural end without an outro skip: host handles it
    assert!(!controller.on_media_ended());
    assert_eq!(advanced.load(Ordering::SeqCst), 0);

    controller.apply_skip_settings();
    assert!(controller.on_media_ended());
    assert_eq!(advanced.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_host_may_reenter_controller_while_seeking() {
    let host = FakeHost::new(0.0, 1200.0);
    let controller = SkipController::new(host.clone(), store_with(intro(90.0)));
    assert!(host.reenter.set(controller.clone()).is_ok());

    controller.handle_time_update();
    sleep(ms(250)).await;

    assert_eq!(host.seeks(), vec![90.0]);
    let state = controller.session_state();
    assert!(state.intro_applied);
    assert!(!state.user_seeking);
    assert!(state.last_user_seek_at.is_some());
}
