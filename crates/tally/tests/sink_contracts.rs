//! HTTP contracts of the notification sinks, against wiremock servers.

mod common;

use std::sync::Arc;
use std::time::Instant;

use common::{idle_input, silence_trip_event, start_monitor, LogBuffer};
use serde_json::json;
use tally::sinks::{ChatSink, DashboardSink, PushProfile, PushSink};
use tally::{build_sinks, Sink, SinkError};
use tallyconf::{ChatConfig, DashboardConfig, PushConfig, SinksConfig};
use wiremock::matchers::{body_json, body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn push_config(server: &MockServer, profile: PushProfile) -> PushConfig {
    let mut config = match profile {
        PushProfile::Alerts => PushConfig::alerts(),
        PushProfile::OnAir => PushConfig::onair(),
    };
    config.token = Some("app-token".to_string());
    config.user = Some("user-key".to_string());
    config.api_url = format!("{}/1/messages.json", server.uri());
    config
}

fn chat_config(server: &MockServer) -> ChatConfig {
    ChatConfig {
        webhook_url: Some(format!("{}/api/webhooks/1/abc", server.uri())),
        ..ChatConfig::default()
    }
}

fn dashboard_config(server: &MockServer) -> DashboardConfig {
    DashboardConfig {
        host: Some(server.uri()),
        path: Some("/api/studio-status".to_string()),
        ..DashboardConfig::default()
    }
}

#[tokio::test]
async fn push_posts_alert_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("token=app-token"))
        .and(body_string_contains("message=Silence+Detector+Tripped"))
        .and(body_string_contains("priority=1"))
        .and(body_string_contains("retry=30"))
        .and(body_string_contains("expire=180"))
        .and(body_string_contains("tags=RelayStatusSystem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let sink = PushSink::new(PushProfile::Alerts, &push_config(&server, PushProfile::Alerts)).unwrap();
    sink.deliver(&silence_trip_event()).await.unwrap();
}

#[tokio::test]
async fn push_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let sink = PushSink::new(PushProfile::Alerts, &push_config(&server, PushProfile::Alerts)).unwrap();
    let err = sink.deliver(&silence_trip_event()).await.unwrap_err();
    match err {
        SinkError::Status { status, body } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(body, "invalid token");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_requires_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/abc"))
        .and(body_partial_json(json!({
            "content": "",
            "embeds": [{
                "title": "Silence Detector",
                "color": 0xf71202,
                "footer": {"text": "On air: Studio A"}
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = ChatSink::new(&chat_config(&server)).unwrap();
    sink.deliver(&silence_trip_event()).await.unwrap();
}

#[tokio::test]
async fn chat_treats_plain_ok_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let sink = ChatSink::new(&chat_config(&server)).unwrap();
    let err = sink.deliver(&silence_trip_event()).await.unwrap_err();
    assert!(matches!(err, SinkError::Status { status, .. } if status.as_u16() == 200));
}

#[tokio::test]
async fn dashboard_posts_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/studio-status"))
        .and(body_json(json!({
            "onAirStudio": "StudioA",
            "studioAMicLive": false,
            "studioBMicLive": false,
            "studioCMicLive": false,
            "onSilence": true,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = DashboardSink::new(&dashboard_config(&server)).unwrap();
    sink.deliver(&silence_trip_event()).await.unwrap();
}

#[tokio::test]
async fn dashboard_requires_exactly_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let sink = DashboardSink::new(&dashboard_config(&server)).unwrap();
    assert!(sink.deliver(&silence_trip_event()).await.is_err());
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    let config = ChatConfig {
        webhook_url: Some("http://127.0.0.1:1/hook".to_string()),
        timeout_ms: 500,
        ..ChatConfig::default()
    };
    let sink = ChatSink::new(&config).unwrap();
    let err = sink.deliver(&silence_trip_event()).await.unwrap_err();
    assert!(matches!(err, SinkError::Transport(_)));
}

#[tokio::test]
async fn dashboard_outage_does_not_stop_push() {
    let logs = LogBuffer::default();
    let _guard = logs.install();

    let push_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&push_server)
        .await;

    let dashboard_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/studio-status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&dashboard_server)
        .await;

    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(
            PushSink::new(PushProfile::Alerts, &push_config(&push_server, PushProfile::Alerts))
                .unwrap(),
        ),
        Arc::new(DashboardSink::new(&dashboard_config(&dashboard_server)).unwrap()),
    ];

    let input = idle_input();
    let mut monitor = start_monitor(&input, sinks);
    let t0 = Instant::now();

    input.set("silence_detector", true);
    assert_eq!(monitor.poll_once(t0).unwrap().len(), 1);
    monitor.dispatcher().drain().await;

    let stats = monitor.dispatcher().stats();
    assert_eq!(stats.delivered(), 1);
    assert_eq!(stats.failed(), 1);

    assert!(logs.has_line(&["INFO", "push", " OK"]));
    assert!(logs.has_line(&["ERROR", "dashboard", "500"]));
    assert!(!logs.has_line(&["dashboard", " OK"]));

    // The next tick proceeds normally.
    input.set("silence_detector", false);
    let later = t0 + std::time::Duration::from_millis(100);
    assert_eq!(monitor.poll_once(later).unwrap().len(), 1);
    monitor.dispatcher().drain().await;

    assert_eq!(stats.delivered(), 2);
    assert_eq!(stats.failed(), 2);
}

#[tokio::test]
async fn built_sinks_follow_fixed_order() {
    let server = MockServer::start().await;
    let config = SinksConfig {
        push: push_config(&server, PushProfile::Alerts),
        push_onair: push_config(&server, PushProfile::OnAir),
        chat: chat_config(&server),
        dashboard: dashboard_config(&server),
    };

    let sinks = build_sinks(&config).unwrap();
    let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["push", "push_onair", "chat", "dashboard"]);
}

#[tokio::test]
async fn onair_push_is_silent_priority() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("priority=-2"))
        .and(body_string_contains("message=Studio+C+On+Air%3A+ON"))
        .and(body_string_contains("tags=OnAirStatus"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(
        PushSink::new(PushProfile::OnAir, &push_config(&server, PushProfile::OnAir)).unwrap(),
    )];
    let input = idle_input();
    let mut monitor = start_monitor(&input, sinks);

    input.set("studio_c_on_air", false);
    monitor.poll_once(Instant::now()).unwrap();
    monitor.dispatcher().drain().await;
}
