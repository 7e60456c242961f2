// ABOUTME: Shutdown ordering: serving stops, the session closes exactly once, the monitor drains
// ABOUTME: Runs the server against a fake session on an ephemeral port

mod common;

use argh::FromArgs;
use common::{FakeSession, FakeSmsc};
use sms_api_server::client::{BindCredentials, SmppSession, Transceiver, TransceiverConfig};
use sms_api_server::config::{Args, Credentials, GatewayConfig};
use sms_api_server::server::{HttpListener, LifecycleState, Server, ServerError};
use std::sync::Arc;
use tokio::sync::oneshot;

fn gateway_config(flags: &[&str]) -> GatewayConfig {
    let args = Args::from_args(&["sms-api-server"], flags).unwrap();
    GatewayConfig::from_args(args, Credentials::default()).unwrap()
}

#[tokio::test]
async fn shutdown_closes_the_session_exactly_once() {
    let session = FakeSession::accepting();
    let server = Server::with_session(gateway_config(&["--log"]), session.clone());
    let mut states = server.subscribe();

    let listener = HttpListener::bind("127.0.0.1:0", None).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run_with_listener(listener, async {
        let _ = stopped.await;
    }));

    states
        .wait_for(|state| *state == LifecycleState::Serving)
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/send"))
        .json(&serde_json::json!({"to": "1", "body": "hi"}))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    stop.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(session.closes(), 1);
    assert_eq!(*states.borrow(), LifecycleState::Terminated);
}

#[tokio::test]
async fn bind_failure_still_closes_the_session() {
    let occupied = HttpListener::bind("127.0.0.1:0", None).await.unwrap();
    let addr = occupied.local_addr().unwrap();

    let session = FakeSession::accepting();
    let config = gateway_config(&["--http", &addr.to_string()]);
    let server = Server::with_session(config, session.clone());

    let result = server.run(std::future::pending::<()>()).await;

    assert!(matches!(result, Err(ServerError::Bind { .. })));
    assert_eq!(session.closes(), 1);
}

#[tokio::test]
async fn closing_a_transceiver_twice_is_harmless() {
    let smsc = FakeSmsc::start().await;
    let session = Arc::new(Transceiver::start(TransceiverConfig::new(
        smsc.address(),
        BindCredentials::new("esme", "secret"),
    )));
    let mut events = session.status_events().unwrap();

    while let Some(event) = events.recv().await {
        if event.status == sms_api_server::ConnStatus::Bound {
            break;
        }
    }

    session.close().await.unwrap();
    session.close().await.unwrap();

    // The stream ends with `closed` and then the channel closes
    let mut last = None;
    while let Some(event) = events.recv().await {
        last = Some(event.status);
    }
    assert_eq!(last, Some(sms_api_server::ConnStatus::Closed));
}
