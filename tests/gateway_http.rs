// ABOUTME: End to end tests of the send route against fake sessions and a fake SMSC
// ABOUTME: Covers status mapping, validation and the real transceiver submit path

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{not_bound, wait_until, FakeSession, FakeSmsc, Outcome, Script};
use serde_json::Value;
use sms_api_server::client::{
    BindCredentials, SmppError, SmppSession, Transceiver, TransceiverConfig,
};
use sms_api_server::datatypes::CommandStatus;
use sms_api_server::gateway::{Authenticator, Gateway, GatewayError};
use sms_api_server::server::HttpListener;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn json_post(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn valid_request_submits_exactly_once() {
    let session = FakeSession::accepting();
    let app = Gateway::new(session.clone()).with_prefix("/api").routes();

    let (status, body) = call(
        &app,
        json_post("/api/send", r#"{"to":"+15551234567","body":"hi","from":"ACME"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_id"], "fake-1");

    let submits = session.submits();
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].to, "+15551234567");
    assert_eq!(submits[0].text, "hi");
    assert_eq!(submits[0].from, "ACME");
}

#[tokio::test]
async fn form_bodies_and_legacy_names_are_accepted() {
    let session = FakeSession::accepting();
    let app = Gateway::new(session.clone()).routes();

    let request = Request::post("/send")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("dst=%2B15551234567&text=hello+there&register=1"))
        .unwrap();
    let (status, _) = call(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let submits = session.submits();
    assert_eq!(submits[0].to, "+15551234567");
    assert_eq!(submits[0].text, "hello there");
    assert!(submits[0].register);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_session() {
    let session = FakeSession::accepting();
    let app = Gateway::new(session.clone()).with_prefix("/api").routes();

    let cases = [
        (json_post("/api/send", r#"{"body":"hi"}"#), StatusCode::BAD_REQUEST),
        (json_post("/api/send", r#"{"to":"+1555"}"#), StatusCode::BAD_REQUEST),
        (json_post("/api/send", r#"{"to":" ","body":"hi"}"#), StatusCode::BAD_REQUEST),
        (json_post("/api/send", "{not json"), StatusCode::BAD_REQUEST),
        (
            json_post("/api/send", &format!(r#"{{"to":"1","body":"{}"}}"#, "x".repeat(255))),
            StatusCode::BAD_REQUEST,
        ),
        (
            Request::post("/api/send")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("to=1"))
                .unwrap(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ),
        (
            Request::get("/api/send").body(Body::empty()).unwrap(),
            StatusCode::METHOD_NOT_ALLOWED,
        ),
    ];

    for (request, expected) in cases {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected);
    }

    assert!(session.submits().is_empty());
}

#[tokio::test]
async fn session_failures_map_to_gateway_errors() {
    let cases: [(Outcome, StatusCode, &str); 3] = [
        (not_bound, StatusCode::SERVICE_UNAVAILABLE, "smsc_unavailable"),
        (
            |_| Err(SmppError::Protocol(CommandStatus::MessageQueueFull)),
            StatusCode::BAD_GATEWAY,
            "smsc_rejected",
        ),
        (|_| Err(SmppError::Timeout), StatusCode::GATEWAY_TIMEOUT, "timeout"),
    ];

    for (outcome, expected, kind) in cases {
        let session = FakeSession::replying(outcome);
        let app = Gateway::new(session.clone()).routes();

        let (status, body) = call(&app, json_post("/send", r#"{"to":"1","body":"hi"}"#)).await;
        assert_eq!(status, expected);
        assert_eq!(body["error"], kind);
        assert!(body["detail"].is_string());
        assert_eq!(session.submits().len(), 1);
    }
}

#[tokio::test]
async fn slow_smsc_times_out() {
    let session = FakeSession::hanging();
    let app = Gateway::new(session.clone())
        .with_submit_timeout(Some(Duration::from_millis(50)))
        .routes();

    let (status, body) = call(&app, json_post("/send", r#"{"to":"1","body":"hi"}"#)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "timeout");
    assert_eq!(session.submits().len(), 1);
}

struct DenyAll;

impl Authenticator for DenyAll {
    fn authenticate(&self, _parts: &axum::http::request::Parts) -> Result<(), GatewayError> {
        Err(GatewayError::Forbidden("not allowed".to_string()))
    }
}

#[tokio::test]
async fn authenticator_runs_before_the_handler() {
    let session = FakeSession::accepting();
    let app = Gateway::new(session.clone())
        .with_authenticator(DenyAll)
        .routes();

    let (status, body) = call(&app, json_post("/send", r#"{"to":"1","body":"hi"}"#)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(session.submits().is_empty());
}

#[tokio::test]
async fn register_hands_back_status_events_once() {
    let session = FakeSession::accepting();
    let gateway = Gateway::new(session.clone()).with_prefix("/api/");

    let (_, events) = gateway.register(Router::new());
    assert!(events.is_some());

    let (_, events) = gateway.register(Router::new());
    assert!(events.is_none());
}

async fn bound_transceiver(smsc: &FakeSmsc) -> Arc<Transceiver> {
    let session = Arc::new(Transceiver::start(TransceiverConfig::new(
        smsc.address(),
        BindCredentials::new("esme", "secret"),
    )));
    assert!(wait_until(Duration::from_secs(5), || session.is_bound()).await);
    session
}

#[tokio::test]
async fn send_through_a_real_transceiver() {
    let smsc = FakeSmsc::start().await;
    let session = bound_transceiver(&smsc).await;

    let listener = HttpListener::bind("127.0.0.1:0", None).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Gateway::new(session.clone()).with_prefix("/api").routes();
    let server = tokio::spawn(listener.serve(app));

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/send"))
        .json(&serde_json::json!({"to": "+15551234567", "body": "hi"}))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.expect("invalid json");
    assert_eq!(body["message_id"], "msg-1");

    let submits = smsc.submits();
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].destination_addr, "+15551234567");
    assert_eq!(&submits[0].short_message[..], b"hi");

    session.close().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn smsc_rejections_are_bad_gateway() {
    let scripts = [
        Script {
            submit_status: Some(CommandStatus::MessageQueueFull),
            ..Default::default()
        },
        Script {
            nack_submits: true,
            ..Default::default()
        },
    ];

    for script in scripts {
        let smsc = FakeSmsc::scripted(script).await;
        let session = bound_transceiver(&smsc).await;
        let app = Gateway::new(session.clone()).routes();

        let (status, body) = call(&app, json_post("/send", r#"{"to":"1","body":"hi"}"#)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "smsc_rejected");
        assert_eq!(smsc.submits().len(), 1);
        // The link survives a rejected submit
        assert!(session.is_bound());

        session.close().await.unwrap();
    }
}
