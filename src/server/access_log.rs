// ABOUTME: Request log middleware writing one Apache combined format line per request
// ABOUTME: Lines go to the `access` tracing target

use axum::body::HttpBody;
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{CONTENT_LENGTH, REFERER, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri, Version};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, FixedOffset, Local};
use std::net::SocketAddr;
use tracing::info;

/// Middleware logging every request once its response is ready.
pub async fn access_log(request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let referer = header(request.headers(), REFERER);
    let user_agent = header(request.headers(), USER_AGENT);

    let response = next.run(request).await;

    let entry = AccessEntry {
        peer: peer.as_deref().unwrap_or("-"),
        time: Local::now().fixed_offset(),
        method: &method,
        uri: &uri,
        version,
        status: response.status(),
        bytes: response_bytes(&response),
        referer: &referer,
        user_agent: &user_agent,
    };
    info!(target: "access", "{}", entry.combined());

    response
}

fn header(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Content-Length when set, else the exact size of a buffered body. Streams
/// of unknown length and empty bodies log as `-`.
fn response_bytes(response: &Response) -> String {
    if let Some(length) = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
    {
        return length.to_string();
    }

    match response.body().size_hint().exact() {
        Some(0) | None => "-".to_string(),
        Some(length) => length.to_string(),
    }
}

struct AccessEntry<'a> {
    peer: &'a str,
    time: DateTime<FixedOffset>,
    method: &'a Method,
    uri: &'a Uri,
    version: Version,
    status: StatusCode,
    bytes: String,
    referer: &'a str,
    user_agent: &'a str,
}

impl AccessEntry<'_> {
    fn combined(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} {:?}\" {} {} \"{}\" \"{}\"",
            self.peer,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.uri,
            self.version,
            self.status.as_u16(),
            self.bytes,
            self.referer,
            self.user_agent,
        )
    }
}
