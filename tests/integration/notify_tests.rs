//! Notification client: liveness ping, motion trigger and error reports.

use motion_alert::error::{NotifyError, ServiceFailure, TransportError};
use motion_alert::notify::NotificationClient;
use serde_json::Value;

use crate::mock_hw::{Link, MockHttp, test_config};

const MOTION: &str = "/api/motion_event";
const LOG: &str = "/api/log_error";

fn make_client(http: MockHttp) -> NotificationClient<MockHttp> {
    NotificationClient::new(http, &test_config()).unwrap()
}

fn body(client: &NotificationClient<MockHttp>, path: &str) -> Value {
    let posts = client.transport().posts_to(path);
    assert_eq!(posts.len(), 1, "expected exactly one POST to {path}");
    serde_json::from_str(&posts[0].body).unwrap()
}

// ── Liveness ──────────────────────────────────────────────────

#[test]
fn ping_ok_sends_nothing_else() {
    let mut client = make_client(MockHttp::ok());

    assert!(client.check_liveness(&Link(true), 100));

    assert_eq!(client.transport().gets(), 1);
    assert_eq!(client.transport().requests.len(), 1);
    assert!(client.transport().requests[0].url.ends_with(MOTION));
    assert_eq!(client.last_failure(), None);
}

#[test]
fn ping_non_200_reports_once_with_code() {
    let mut client = make_client(MockHttp::ping_status(503));

    assert!(!client.check_liveness(&Link(true), 1_234));

    let report = body(&client, LOG);
    assert_eq!(report["error"], "API Ping Failed: Server returned HTTP 503");
    assert_eq!(report["device"], "ESP32_Motion_Sensor");
    assert_eq!(report["uptime_ms"], 1_234_u64);
    assert_eq!(client.last_failure(), Some(ServiceFailure::Status(503)));
}

#[test]
fn ping_transport_error_names_the_cause() {
    let mut http = MockHttp::ok();
    http.get_default = Err(TransportError::Timeout);
    let mut client = make_client(http);

    assert!(!client.check_liveness(&Link(true), 0));

    let report = body(&client, LOG);
    assert_eq!(report["error"], "API Ping Failed: request timed out");
}

#[test]
fn ping_failure_with_link_down_is_not_reported() {
    let mut client = make_client(MockHttp::ping_status(500));

    assert!(!client.check_liveness(&Link(false), 0));

    assert!(client.transport().posts_to(LOG).is_empty());
    assert_eq!(client.transport().requests.len(), 1);
}

// ── Motion trigger ────────────────────────────────────────────

#[test]
fn motion_event_is_one_post() {
    let mut client = make_client(MockHttp::ok());

    assert_eq!(client.send_motion_event(&Link(true), 42), Ok(()));

    let event = body(&client, MOTION);
    assert_eq!(event["event"], "motion_detected");
    assert_eq!(event["device"], "ESP32_Motion_Sensor");
    assert_eq!(event["uptime_ms"], 42_u64);
    assert!(client.transport().posts_to(LOG).is_empty());
}

#[test]
fn motion_event_rejection_is_reported_not_retried() {
    let mut http = MockHttp::ok();
    http.queued.push_back(Ok(500));
    let mut client = make_client(http);

    let result = client.send_motion_event(&Link(true), 7);

    assert_eq!(
        result,
        Err(NotifyError::Service(ServiceFailure::Status(500)))
    );
    assert_eq!(client.transport().posts_to(MOTION).len(), 1);
    assert_eq!(body(&client, LOG)["error"], "API POST Failed: HTTP 500");
}

#[test]
fn motion_event_connection_failure() {
    let mut http = MockHttp::ok();
    http.queued.push_back(Err(TransportError::Connection));
    let mut client = make_client(http);

    let result = client.send_motion_event(&Link(true), 0);

    assert_eq!(
        result,
        Err(NotifyError::Service(ServiceFailure::Transport(
            TransportError::Connection
        )))
    );
    assert_eq!(body(&client, LOG)["error"], "API POST Failed: connection failed");
}

#[test]
fn motion_event_attempted_with_link_down() {
    let mut client = make_client(MockHttp::ok());

    assert_eq!(client.send_motion_event(&Link(false), 0), Ok(()));
    assert_eq!(client.transport().posts_to(MOTION).len(), 1);
}

// ── Error reports ─────────────────────────────────────────────

#[test]
fn report_with_link_down_is_a_no_op() {
    let mut client = make_client(MockHttp::ok());

    assert_eq!(
        client.report_error(&Link(false), "boom", 0),
        Err(NotifyError::LinkDown)
    );
    assert!(client.transport().requests.is_empty());
}

#[test]
fn failed_report_is_not_reported_again() {
    let mut http = MockHttp::ok();
    http.post_default = Ok(500);
    let mut client = make_client(http);

    let result = client.report_error(&Link(true), "boom", 0);

    assert_eq!(result, Err(NotifyError::Service(ServiceFailure::Status(500))));
    assert_eq!(client.transport().requests.len(), 1);
}

#[test]
fn custom_device_id_and_base_address() {
    let mut config = test_config();
    config
        .apply_kv_str("device_id=porch\nremote_base_address=http://10.0.0.9:8080/")
        .unwrap();
    let mut client = NotificationClient::new(MockHttp::ok(), &config).unwrap();

    client.send_motion_event(&Link(true), 0).unwrap();

    let request = &client.transport().requests[0];
    assert_eq!(request.url, "http://10.0.0.9:8080/api/motion_event");
    assert!(request.body.contains("\"device\":\"porch\""));
}
