//! End-to-end alert flow: bring-up, motion, flash, cooldown.
//!
//! The main loop is `AlertStateMachine::tick`; the timer context is
//! simulated by calling `service_timers` in 10 ms steps.

use motion_alert::app::events::AppEvent;
use motion_alert::app::service::AlertStateMachine;
use motion_alert::config::DeviceConfig;
use motion_alert::connectivity::ConnectivityManager;
use motion_alert::fsm::SystemState;
use motion_alert::notify::NotificationClient;
use motion_alert::scheduler::TimerSlot;
use rand::rngs::SmallRng;

use crate::mock_hw::{
    MockHttp, MockPin, MockSensor, MockWifi, RecordingSink, SimBoard, TestCore, shared_core,
    test_config,
};

type App<'a> = AlertStateMachine<'a, MockWifi, MockHttp, MockPin, SmallRng>;

const TIMER_STEP_MS: u64 = 10;

fn make_app(shared: &TestCore, config: DeviceConfig, wifi: MockWifi, http: MockHttp) -> App<'_> {
    let connectivity = ConnectivityManager::new(wifi, &config);
    let notifier = NotificationClient::new(http, &config).unwrap();
    AlertStateMachine::new(config, shared, connectivity, notifier)
}

/// Start and run the first tick against a healthy network.
fn boot<'a>(shared: &'a TestCore, config: DeviceConfig) -> (App<'a>, SimBoard, RecordingSink) {
    let mut app = make_app(shared, config, MockWifi::connecting_on(1), MockHttp::ok());
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);
    assert_eq!(app.state(), SystemState::Idle);
    (app, board, sink)
}

/// Drive the timer context up to and including `until`.
fn run_timers(shared: &TestCore, board: &mut SimBoard, until: u64) {
    while board.now_ms < until {
        board.advance(TIMER_STEP_MS);
        shared.service_timers(board.now_ms);
        assert!(shared.invariant_holds());
    }
}

fn motion_posts(app: &App<'_>) -> usize {
    app.notifier().transport().posts_to("/api/motion_event").len()
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn healthy_boot_reaches_idle() {
    let shared = shared_core(MockPin::default());
    let (app, _board, sink) = boot(&shared, test_config());

    assert_eq!(shared.state(), SystemState::Idle);
    assert!(app.link_up());
    assert!(!shared.indicator_level());
    assert_eq!(sink.events[0], AppEvent::Started(SystemState::Init));
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::StateChanged {
                from: SystemState::Init,
                to: SystemState::Idle
            }
        )),
        1
    );
    assert_eq!(app.notifier().transport().gets(), 1);
}

#[test]
fn ready_signal_blinks_three_times() {
    let pin = MockPin::default();
    let shared = shared_core(pin.clone());
    let _ = boot(&shared, test_config());

    // Two connect pulses, then 2 to 6 pulses per ready repetition.
    let edges = pin.rising_edges();
    assert!((2 + 6..=2 + 18).contains(&edges), "{edges} pulses");
}

#[test]
fn link_down_stays_in_init_and_waits() {
    let shared = shared_core(MockPin::default());
    let config = test_config();
    let retry_ms = config.init_retry_delay_ms;
    let mut app = make_app(&shared, config, MockWifi::never_connecting(), MockHttp::ok());
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);

    assert_eq!(app.state(), SystemState::Init);
    assert_eq!(shared.state(), SystemState::Init);
    assert_eq!(sink.count(|e| *e == AppEvent::LinkFailed { attempts: 3 }), 1);
    assert!(app.notifier().transport().requests.is_empty());
    assert_eq!(board.delays.last(), Some(&retry_ms));
}

#[test]
fn missing_credentials_never_touch_the_radio() {
    let shared = shared_core(MockPin::default());
    let mut app = make_app(
        &shared,
        DeviceConfig::default(),
        MockWifi::connecting_on(1),
        MockHttp::ok(),
    );
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);

    assert_eq!(app.state(), SystemState::Init);
    assert_eq!(sink.count(|e| *e == AppEvent::LinkFailed { attempts: 0 }), 1);
    assert!(app.connectivity().driver().calls.is_empty());
}

#[test]
fn service_down_reports_once_and_retries() {
    let shared = shared_core(MockPin::default());
    let mut app = make_app(
        &shared,
        test_config(),
        MockWifi::connecting_on(1),
        MockHttp::ping_status(503),
    );
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);

    assert_eq!(app.state(), SystemState::Init);
    assert_eq!(sink.count(|e| *e == AppEvent::ServiceUnavailable), 1);
    let reports = app.notifier().transport().posts_to("/api/log_error");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].body.contains("503"));
    assert_eq!(motion_posts(&app), 0);

    // The next attempt reuses the link.
    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);
    assert_eq!(app.connectivity().driver().association_attempts(), 1);
    assert_eq!(app.notifier().transport().gets(), 2);
}

#[test]
fn service_recovers_on_a_later_attempt() {
    let shared = shared_core(MockPin::default());
    let mut http = MockHttp::ok();
    http.queued.push_back(Ok(502));
    // The error report consumes the next queued response.
    http.queued.push_back(Ok(200));
    let mut app = make_app(&shared, test_config(), MockWifi::connecting_on(1), http);
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);

    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);
    assert_eq!(app.state(), SystemState::Init);
    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);
    assert_eq!(app.state(), SystemState::Idle);
}

// ── Idle ──────────────────────────────────────────────────────

#[test]
fn quiet_sensor_sends_nothing() {
    let shared = shared_core(MockPin::default());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    let mut sensor = MockSensor::quiet();

    for _ in 0..100 {
        app.tick(&mut sensor, &mut board, &mut sink);
    }

    assert_eq!(app.state(), SystemState::Idle);
    assert_eq!(sensor.reads, 100);
    assert_eq!(motion_posts(&app), 0);
    assert_eq!(shared.live_timers(), 0);
}

// ── One alert cycle ───────────────────────────────────────────

#[test]
fn motion_runs_one_full_alert_cycle() {
    let shared = shared_core(MockPin::default());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    let mut sensor = MockSensor::with(&[true]);

    app.tick(&mut sensor, &mut board, &mut sink);
    let armed_at = board.now_ms;

    // Active immediately, one trigger, all three timers armed.
    assert_eq!(app.state(), SystemState::Active);
    assert_eq!(shared.state(), SystemState::Active);
    assert_eq!(motion_posts(&app), 1);
    assert_eq!(sink.count(|e| *e == AppEvent::MotionDetected), 1);
    assert_eq!(shared.live_timers(), 3);
    assert_eq!(shared.timer_deadline(TimerSlot::FlashStop), Some(armed_at + 8_000));
    assert_eq!(shared.timer_deadline(TimerSlot::Cooldown), Some(armed_at + 10_000));

    // Flashing until flash-stop.
    run_timers(&shared, &mut board, armed_at + 8_000 - TIMER_STEP_MS);
    assert!(shared.timer_live(TimerSlot::FlashToggle));
    assert_eq!(shared.state(), SystemState::Active);

    run_timers(&shared, &mut board, armed_at + 8_000);
    assert!(!shared.timer_live(TimerSlot::FlashToggle));
    assert!(!shared.timer_live(TimerSlot::FlashStop));
    assert!(!shared.indicator_level());

    // Dark until the cooldown ends.
    run_timers(&shared, &mut board, armed_at + 10_000 - TIMER_STEP_MS);
    assert_eq!(shared.state(), SystemState::Active);
    assert!(!shared.indicator_level());

    run_timers(&shared, &mut board, armed_at + 10_000);
    assert_eq!(shared.state(), SystemState::Idle);
    assert_eq!(shared.live_timers(), 0);

    // The main loop follows on its next tick.
    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);
    assert_eq!(app.state(), SystemState::Idle);
    assert_eq!(
        sink.count(|e| *e
            == AppEvent::StateChanged {
                from: SystemState::Active,
                to: SystemState::Idle
            }),
        1
    );
    assert_eq!(motion_posts(&app), 1);
}

#[test]
fn indicator_toggles_while_flashing() {
    let pin = MockPin::default();
    let shared = shared_core(pin.clone());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    let before = pin.rising_edges();

    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);
    let armed_at = board.now_ms;
    run_timers(&shared, &mut board, armed_at + 8_000);

    // 200 ms period over 8 s: about 20 on-phases.
    let flashes = pin.rising_edges() - before;
    assert!((19..=21).contains(&flashes), "{flashes} flashes");
}

#[test]
fn motion_while_active_is_ignored() {
    let shared = shared_core(MockPin::default());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);
    let armed_at = board.now_ms;

    let mut sensor = MockSensor::with(&[true; 20]);
    for _ in 0..20 {
        board.advance(50);
        shared.service_timers(board.now_ms);
        app.tick(&mut sensor, &mut board, &mut sink);
    }

    assert_eq!(sensor.reads, 0);
    assert_eq!(motion_posts(&app), 1);
    assert_eq!(shared.timer_deadline(TimerSlot::Cooldown), Some(armed_at + 10_000));
}

#[test]
fn next_motion_after_cooldown_alerts_again() {
    let shared = shared_core(MockPin::default());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);
    let armed_at = board.now_ms;
    run_timers(&shared, &mut board, armed_at + 10_000);

    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);

    assert_eq!(app.state(), SystemState::Active);
    assert_eq!(motion_posts(&app), 2);
    assert_eq!(shared.live_timers(), 3);
}

#[test]
fn failed_trigger_still_runs_the_alert() {
    let shared = shared_core(MockPin::default());
    let config = test_config();
    let mut http = MockHttp::ok();
    http.post_default = Ok(500);
    let mut app = make_app(&shared, config, MockWifi::connecting_on(1), http);
    let mut board = SimBoard::new();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    app.tick(&mut MockSensor::quiet(), &mut board, &mut sink);

    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);

    assert_eq!(app.state(), SystemState::Active);
    assert_eq!(shared.live_timers(), 3);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::NotificationFailed(_))),
        1
    );
    assert_eq!(motion_posts(&app), 1);
}

// ── Timing configuration ──────────────────────────────────────

#[test]
fn flash_longer_than_cooldown_is_clamped() {
    let shared = shared_core(MockPin::default());
    let mut config = test_config();
    config.apply_kv_str("flash_duration_ms=12000").unwrap();
    let (mut app, mut board, mut sink) = boot(&shared, config);

    assert_eq!(app.plan().flash_ms, 10_000 - 50);

    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);
    let armed_at = board.now_ms;
    let stop = shared.timer_deadline(TimerSlot::FlashStop).unwrap();
    let cooldown = shared.timer_deadline(TimerSlot::Cooldown).unwrap();
    assert!(stop < cooldown);

    run_timers(&shared, &mut board, armed_at + 10_000);
    assert_eq!(shared.state(), SystemState::Idle);
    assert!(!shared.indicator_level());
}

#[test]
fn flicker_pattern_ends_dark() {
    let shared = shared_core(MockPin::default());
    let mut config = test_config();
    config
        .apply_kv_str("flash_pattern=flicker\nflash_duration_ms=2000\ncooldown_duration_ms=3000")
        .unwrap();
    let (mut app, mut board, mut sink) = boot(&shared, config);

    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);
    let armed_at = board.now_ms;
    run_timers(&shared, &mut board, armed_at + 2_000);
    assert!(!shared.indicator_level());
    assert_eq!(shared.state(), SystemState::Active);

    run_timers(&shared, &mut board, armed_at + 3_000);
    assert_eq!(shared.state(), SystemState::Idle);
}

#[test]
fn late_service_fires_everything_due() {
    let shared = shared_core(MockPin::default());
    let (mut app, mut board, mut sink) = boot(&shared, test_config());
    app.tick(&mut MockSensor::with(&[true]), &mut board, &mut sink);

    board.advance(15_000);
    shared.service_timers(board.now_ms);

    assert_eq!(shared.state(), SystemState::Idle);
    assert_eq!(shared.live_timers(), 0);
    assert!(!shared.indicator_level());
}
