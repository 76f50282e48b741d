//! Exchanges against a stub analysis endpoint

use analysis_client::{
    AnalysisClient, AnalysisConfig, AnalysisOutcome, FrameAnalyzer, FrameCodec, StaticToken,
    TransportErrorKind,
};
use camera_capture::VideoFrame;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROCESS_PATH: &str = "/sleep_monitor/process_frame/";

fn config_for(server: &MockServer) -> AnalysisConfig {
    AnalysisConfig {
        endpoint: format!("{}{}", server.uri(), PROCESS_PATH),
        timeout_ms: 2_000,
        ..Default::default()
    }
}

fn sample_frame() -> VideoFrame {
    VideoFrame::new(vec![200; 8 * 8 * 3], 8, 8, 0, 1)
}

#[tokio::test]
async fn test_success_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROCESS_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("X-CSRFToken", "tok123"))
        .and(body_string_contains("image_data=data%3Aimage%2Fjpeg%3Bbase64%2C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ear": 0.25,
            "frames_closed": 3,
            "alert": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnalysisClient::new(config_for(&server), Arc::new(StaticToken::new("tok123"))).unwrap();
    let sample = FrameCodec::default().sample(&sample_frame()).unwrap();

    let outcome = client.analyze(&sample).await;
    assert_eq!(
        outcome,
        AnalysisOutcome::Success {
            ear: Some(0.25),
            frames_closed: 3,
            alert: false
        }
    );
}

#[tokio::test]
async fn test_no_token_header_when_cookie_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("X-CSRFToken"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ear": null,
            "frames_closed": 0,
            "alert": false
        })))
        .mount(&server)
        .await;

    let config = AnalysisConfig {
        cookies: Some("sessionid=abc".into()),
        ..config_for(&server)
    };
    let client = AnalysisClient::from_config(config).unwrap();
    let sample = FrameCodec::default().sample(&sample_frame()).unwrap();

    assert!(matches!(
        client.analyze(&sample).await,
        AnalysisOutcome::Success { ear: None, .. }
    ));
}

#[tokio::test]
async fn test_cookie_token_is_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-CSRFToken", "from/cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ear": 0.31,
            "frames_closed": 0,
            "alert": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = AnalysisConfig {
        cookies: Some("csrftoken=from%2Fcookie; other=1".into()),
        ..config_for(&server)
    };
    let client = AnalysisClient::from_config(config).unwrap();
    let sample = FrameCodec::default().sample(&sample_frame()).unwrap();
    assert_eq!(client.analyze(&sample).await.label(), "success");
}

#[tokio::test]
async fn test_server_error_message_on_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "model unavailable" })),
        )
        .mount(&server)
        .await;

    let client = AnalysisClient::from_config(config_for(&server)).unwrap();
    let payload = FrameCodec::default().encode(&sample_frame()).unwrap();

    assert_eq!(
        client.submit(&payload, None).await,
        AnalysisOutcome::ServerError {
            message: "model unavailable".into(),
            status: Some(500)
        }
    );
}

#[tokio::test]
async fn test_status_text_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(405).set_body_string("nope"))
        .mount(&server)
        .await;

    let client = AnalysisClient::from_config(config_for(&server)).unwrap();
    let payload = FrameCodec::default().encode(&sample_frame()).unwrap();

    assert_eq!(
        client.submit(&payload, None).await,
        AnalysisOutcome::TransportError {
            kind: TransportErrorKind::HttpStatus(405),
            detail: "HTTP 405: Method Not Allowed".into()
        }
    );
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let client = AnalysisClient::from_config(config_for(&server)).unwrap();
    let payload = FrameCodec::default().encode(&sample_frame()).unwrap();
    assert_eq!(client.submit(&payload, None).await.label(), "decode_failure");
}

#[tokio::test]
async fn test_timeout_is_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ear": 0.3, "frames_closed": 0, "alert": false }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = AnalysisConfig {
        timeout_ms: 50,
        ..config_for(&server)
    };
    let client = AnalysisClient::from_config(config).unwrap();
    let payload = FrameCodec::default().encode(&sample_frame()).unwrap();

    assert!(matches!(
        client.submit(&payload, None).await,
        AnalysisOutcome::TransportError {
            kind: TransportErrorKind::NetworkFailure,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unreachable_service() {
    let config = AnalysisConfig {
        endpoint: "http://127.0.0.1:9/process_frame/".into(),
        timeout_ms: 1_000,
        ..Default::default()
    };
    let client = AnalysisClient::from_config(config).unwrap();
    let payload = FrameCodec::default().encode(&sample_frame()).unwrap();
    assert_eq!(client.submit(&payload, None).await.label(), "network_failure");
}
