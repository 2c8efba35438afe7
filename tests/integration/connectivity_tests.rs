//! Link bring-up: bounded retries, backoff, idempotence and recovery.

use motion_alert::app::ports::LinkStatus;
use motion_alert::config::DeviceConfig;
use motion_alert::connectivity::{ConnectionState, ConnectivityManager};

use crate::mock_hw::{
    MockPin, MockWifi, RecordingProgress, SimBoard, TEST_ADDRESS, WifiCall, shared_core, test_config,
};

fn make_link(wifi: MockWifi, config: &DeviceConfig) -> ConnectivityManager<MockWifi> {
    ConnectivityManager::new(wifi, config)
}

fn backoff_delays(board: &SimBoard, poll_ms: u32) -> Vec<u32> {
    board.delays.iter().copied().filter(|&d| d != poll_ms).collect()
}

// ── Bounded retries ───────────────────────────────────────────

#[test]
fn unreachable_network_gives_up_after_retries() {
    let config = test_config();
    let mut link = make_link(MockWifi::never_connecting(), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(!link.ensure(&mut board, &mut progress));

    assert_eq!(link.driver().association_attempts(), 3);
    assert_eq!(link.last_attempts(), 3);
    assert_eq!(link.status(), ConnectionState::Failed);
    assert!(!link.link_up());
    assert_eq!(link.address(), None);
}

#[test]
fn backoff_doubles_between_cycles() {
    let config = test_config();
    let mut link = make_link(MockWifi::never_connecting(), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    link.ensure(&mut board, &mut progress);

    // No wait after the last cycle.
    assert_eq!(progress.backoffs, vec![(1, 2_000), (2, 4_000)]);
    assert_eq!(backoff_delays(&board, config.poll_interval_ms), vec![2_000, 4_000]);
    assert_eq!(progress.settled, vec![false]);
}

#[test]
fn backoff_is_capped_at_thirty_seconds() {
    let mut config = test_config();
    config.apply_kv_str("retries=5\nbackoff_s=10").unwrap();
    let mut link = make_link(MockWifi::never_connecting(), &config);
    let mut board = SimBoard::new();

    link.ensure(&mut board, &mut RecordingProgress::default());

    assert_eq!(
        backoff_delays(&board, config.poll_interval_ms),
        vec![10_000, 20_000, 30_000, 30_000]
    );
}

#[test]
fn each_cycle_waits_at_most_the_timeout() {
    let config = test_config();
    let mut link = make_link(MockWifi::never_connecting(), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    link.ensure(&mut board, &mut progress);

    let polls: u32 = board
        .delays
        .iter()
        .copied()
        .filter(|&d| d == config.poll_interval_ms)
        .sum();
    assert!(polls <= u32::from(config.retries) * config.timeout_s * 1_000);
    assert_eq!(progress.poll_ticks, 3 * 2);
}

// ── Missing credentials ───────────────────────────────────────

#[test]
fn missing_ssid_fails_without_a_cycle() {
    let config = DeviceConfig::default();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(!link.ensure(&mut board, &mut progress));

    assert_eq!(link.last_attempts(), 0);
    assert!(link.driver().calls.is_empty());
    assert!(board.delays.is_empty());
    assert_eq!(progress.poll_ticks, 0);
    assert!(progress.backoffs.is_empty());
    assert!(progress.settled.is_empty());
}

#[test]
fn missing_password_fails_without_a_cycle() {
    let mut config = DeviceConfig::default();
    config.apply_kv_str("ssid=testnet").unwrap();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(!link.ensure(&mut board, &mut progress));

    assert_eq!(link.last_attempts(), 0);
    assert_eq!(link.status(), ConnectionState::Failed);
    assert!(link.driver().calls.is_empty());
    assert!(board.delays.is_empty());
    assert!(progress.settled.is_empty());
}

// ── Success paths ─────────────────────────────────────────────

#[test]
fn first_cycle_success_has_no_backoff() {
    let config = test_config();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(link.ensure(&mut board, &mut progress));

    assert_eq!(link.status(), ConnectionState::Connected);
    assert_eq!(link.address(), Some(TEST_ADDRESS));
    assert!(board.delays.is_empty());
    assert_eq!(progress.settled, vec![true]);
    assert!(link.driver().calls.contains(&WifiCall::Associate {
        ssid: "testnet".into(),
        password: "password123".into(),
    }));
}

#[test]
fn second_cycle_success_after_one_backoff() {
    let config = test_config();
    let mut link = make_link(MockWifi::connecting_on(2), &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(link.ensure(&mut board, &mut progress));

    assert_eq!(link.last_attempts(), 2);
    assert_eq!(progress.backoffs, vec![(1, 2_000)]);
    // The failed cycle was torn down before the retry.
    assert!(link.driver().calls.contains(&WifiCall::Reset));
}

#[test]
fn ensure_is_idempotent_when_up() {
    let config = test_config();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    assert!(link.ensure(&mut board, &mut RecordingProgress::default()));
    let calls_after_connect = link.driver().calls.len();

    let mut progress = RecordingProgress::default();
    assert!(link.ensure(&mut board, &mut progress));

    assert_eq!(link.driver().calls.len(), calls_after_connect);
    assert!(progress.settled.is_empty());
    assert!(board.delays.is_empty());
}

#[test]
fn activation_error_counts_as_a_failed_cycle() {
    let config = test_config();
    let mut wifi = MockWifi::connecting_on(1);
    wifi.fail_activate = true;
    let mut link = make_link(wifi, &config);
    let mut board = SimBoard::new();
    let mut progress = RecordingProgress::default();

    assert!(!link.ensure(&mut board, &mut progress));

    assert_eq!(link.last_attempts(), 3);
    assert_eq!(link.driver().association_attempts(), 0);
    assert_eq!(progress.backoffs.len(), 2);
}

// ── Recovery ──────────────────────────────────────────────────

#[test]
fn lost_association_is_reestablished() {
    let config = test_config();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    assert!(link.ensure(&mut board, &mut RecordingProgress::default()));

    link.driver_mut().drop_association();
    assert!(!link.link_up());

    assert!(link.ensure(&mut board, &mut RecordingProgress::default()));
    assert_eq!(link.status(), ConnectionState::Connected);
    assert_eq!(link.driver().association_attempts(), 2);
}

#[test]
fn disconnect_powers_down() {
    let config = test_config();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    link.ensure(&mut board, &mut RecordingProgress::default());

    link.disconnect();

    assert_eq!(link.status(), ConnectionState::Disconnected);
    assert!(!link.link_up());
    assert_eq!(link.driver().calls.last(), Some(&WifiCall::Activate(false)));
}

// ── Static addressing ─────────────────────────────────────────

#[test]
fn static_address_is_applied_each_cycle() {
    let mut config = test_config();
    config
        .apply_kv_str("static_ip=192.168.5.40,255.255.255.0,192.168.5.1,8.8.8.8")
        .unwrap();
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();

    assert!(link.ensure(&mut board, &mut RecordingProgress::default()));
    assert!(link.driver().calls.contains(&WifiCall::StaticIp(TEST_ADDRESS)));
}

#[test]
fn static_address_failure_is_not_fatal() {
    let mut config = test_config();
    config
        .apply_kv_str("static_ip=192.168.5.40,255.255.255.0,192.168.5.1,8.8.8.8")
        .unwrap();
    let mut wifi = MockWifi::connecting_on(1);
    wifi.fail_static_ip = true;
    let mut link = make_link(wifi, &config);

    assert!(link.ensure(&mut SimBoard::new(), &mut RecordingProgress::default()));
}

// ── Indicator feedback ────────────────────────────────────────

#[test]
fn indicator_pulses_through_backoff() {
    let config = test_config();
    let pin = MockPin::default();
    let shared = shared_core(pin.clone());
    let mut link = make_link(MockWifi::connecting_on(2), &config);
    let mut board = SimBoard::new();

    assert!(link.ensure(&mut board, &mut &shared));

    // 2000 ms of 30/120 ms pulses, never a blind sleep.
    let pulse_delays: Vec<u32> = board
        .delays
        .iter()
        .copied()
        .filter(|&d| d != config.poll_interval_ms)
        .collect();
    assert!(!pulse_delays.contains(&2_000));
    assert!(pulse_delays.iter().all(|&d| d <= 120));
    // The whole backoff plus the 4 x 50 ms connect blink.
    assert_eq!(pulse_delays.iter().sum::<u32>(), 2_000 + 200);
    assert!(!shared.indicator_level());
}

#[test]
fn connect_ends_with_a_double_pulse() {
    let config = test_config();
    let pin = MockPin::default();
    let shared = shared_core(pin.clone());
    let mut link = make_link(MockWifi::connecting_on(1), &config);
    let mut board = SimBoard::new();
    let edges_before = pin.rising_edges();

    assert!(link.ensure(&mut board, &mut &shared));

    assert_eq!(pin.rising_edges() - edges_before, 2);
    assert_eq!(board.delays, vec![50, 50, 50, 50]);
    assert!(!shared.indicator_level());
}
