// ABOUTME: Serves a public directory for every path the gateway routes do not match
// ABOUTME: The route prefix is stripped before the file lookup

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;

struct StaticFiles {
    prefix: String,
    dir: ServeDir,
}

/// A router that only has a fallback serving files from `dir`. Paths must
/// start with `prefix`, which is removed before the lookup.
pub fn static_files(prefix: &str, dir: PathBuf) -> Router {
    let files = Arc::new(StaticFiles {
        prefix: prefix.to_string(),
        dir: ServeDir::new(dir),
    });

    Router::new().fallback(serve).with_state(files)
}

async fn serve(State(files): State<Arc<StaticFiles>>, request: Request) -> Response {
    let Some(uri) = strip_prefix(&files.prefix, request.uri()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let (mut parts, body) = request.into_parts();
    parts.uri = uri;
    let request = Request::from_parts(parts, body);

    let result: Result<_, Infallible> = files.dir.clone().oneshot(request).await;
    match result {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// `uri` with `prefix` removed from its path, or `None` if the path is
/// outside the prefix.
fn strip_prefix(prefix: &str, uri: &Uri) -> Option<Uri> {
    if prefix.is_empty() {
        return Some(uri.clone());
    }

    let rest = uri.path().strip_prefix(prefix)?;
    let path = match rest {
        "" => "/",
        rest if rest.starts_with('/') => rest,
        _ => return None,
    };

    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    debug!(from = %uri, to = %path_and_query, "stripped static file prefix");
    path_and_query.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fs;

    #[test]
    fn prefix_stripping() {
        let uri = Uri::from_static("/api/index.html?v=2");
        assert_eq!(
            strip_prefix("/api", &uri).unwrap(),
            Uri::from_static("/index.html?v=2")
        );
        assert_eq!(
            strip_prefix("/api", &Uri::from_static("/api")).unwrap(),
            Uri::from_static("/")
        );
        assert!(strip_prefix("/api", &Uri::from_static("/apix/a")).is_none());
        assert!(strip_prefix("/api", &Uri::from_static("/other")).is_none());
        assert_eq!(
            strip_prefix("", &Uri::from_static("/a.txt")).unwrap(),
            Uri::from_static("/a.txt")
        );
    }

    #[tokio::test]
    async fn serves_files_under_the_prefix() {
        let dir = std::env::temp_dir().join(format!("sms-api-static-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("hello.txt"), "hello").unwrap();

        let app = static_files("/api", dir.clone());

        let response = app
            .clone()
            .oneshot(Request::get("/api/hello.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"hello");

        let response = app
            .oneshot(Request::get("/hello.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        fs::remove_dir_all(&dir).unwrap();
    }
}
