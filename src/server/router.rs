// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! HTTP routes: static files, the live-reload client and its event stream

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, Stream};
use mime_guess::MimeGuess;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::LiveReload;

/// Server-sent events endpoint
pub const EVENTS_PATH: &str = "/__assetflow/events";

/// Client script endpoint
pub const CLIENT_PATH: &str = "/__assetflow/livereload.js";

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__assetflow/events");
  source.addEventListener("reload", function (message) {
    var event = JSON.parse(message.data);
    if (!event.css_only) {
      window.location.reload();
      return;
    }
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set("assetflow", Date.now());
      link.href = url.toString();
    });
  });
})();
"#;

#[derive(Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    inject: bool,
    live_reload: LiveReload,
}

/// Build the router serving `root`
pub fn router(root: PathBuf, inject: bool, live_reload: LiveReload) -> Router {
    let state = ServerState {
        root: Arc::new(root),
        inject,
        live_reload,
    };

    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_file)
        .with_state(state)
}

async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.live_reload.subscribe();
    tracing::debug!(sessions = state.live_reload.sessions(), "browser connected");

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let message = Event::default().event("reload").json_data(&event);
                    return Some((message, rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "browser session lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn serve_file(State(state): State<ServerState>, uri: Uri) -> Response {
    let Some(relative) = request_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut path = state.root.join(relative);
    if path.is_dir() {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = content_type(&path);
            let body = if state.inject && content_type.starts_with("text/html") {
                inject_client(&bytes)
            } else {
                bytes
            };
            (
                [
                    (header::CONTENT_TYPE, content_type.as_str()),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response()
        }
        Err(_) => {
            tracing::debug!(path = %uri.path(), "not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Map a request path to a path below the served directory
///
/// Returns `None` for anything that would climb out of it.
pub fn request_path(uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(uri_path)?;
    let mut out = PathBuf::new();

    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment.contains('\\') {
            return None;
        }
        match Path::new(segment).components().next() {
            Some(Component::Normal(part)) => out.push(part),
            _ => return None,
        }
    }

    Some(out)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Insert the client script before `</body>`, or append it
pub fn inject_client(html: &[u8]) -> Vec<u8> {
    let tag = format!("<script src=\"{}\"></script>", CLIENT_PATH);
    let text = String::from_utf8_lossy(html);

    let injected = match text.rfind("</body>") {
        Some(at) => format!("{}{}\n{}", &text[..at], tag, &text[at..]),
        None => format!("{}{}", text, tag),
    };
    injected.into_bytes()
}

/// Content type guessed from the file extension
///
/// Text types carry an explicit UTF-8 charset.
pub fn content_type(path: &Path) -> String {
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    let text = mime.type_() == mime_guess::mime::TEXT
        || matches!(mime.subtype().as_str(), "javascript" | "json" | "xml" | "manifest+json");
    if text && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/"), Some(PathBuf::new()));
        assert_eq!(request_path("/css/styles.css"), Some(PathBuf::from("css/styles.css")));
        assert_eq!(request_path("/img/my%20logo.png"), Some(PathBuf::from("img/my logo.png")));
        assert_eq!(request_path("/../secret"), None);
        assert_eq!(request_path("/css/%2e%2e/%2e%2e/secret"), None);
        assert_eq!(request_path("/bad%zz"), None);
    }

    #[test]
    fn test_inject_client() {
        let out = inject_client(b"<html><body><p>x</p></body></html>");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><p>x</p><script src=\"/__assetflow/livereload.js\"></script>\n</body></html>"
        );

        let fragment = inject_client(b"<p>x</p>");
        assert!(String::from_utf8(fragment).unwrap().ends_with("livereload.js\"></script>"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("img/a.webp")), "image/webp");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }

    #[test]
    fn test_content_type_beyond_web_basics() {
        assert_eq!(content_type(Path::new("pkg/app.wasm")), "application/wasm");
        assert_eq!(content_type(Path::new("media/intro.mp4")), "video/mp4");
        assert_eq!(content_type(Path::new("data/table.csv")), "text/csv; charset=utf-8");
        assert!(content_type(Path::new("js/bundle.js")).ends_with("javascript; charset=utf-8"));
    }
}
