//! HTTP server with live reload via Server-Sent Events.
//!
//! Serves files straight from the root directory, running each
//! JavaScript module through the specifier rewriter and injecting the
//! reload client into HTML pages on the way out.

use std::convert::Infallible;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response, Sse},
    routing::get,
    Router,
};
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{CliError, Result, ServeError};
use crate::server::static_files::{
    content_type_for, file_validator, is_js_module, is_navigation_request, not_modified,
    resolve_file,
};
use crate::server::{ServerState, SharedState};

/// Well-known endpoint for the reload event stream.
pub const EVENTS_PATH: &str = "/__modserve__/events";

/// Well-known endpoint for the injected reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__modserve__/reload.js";

const RELOAD_SCRIPT_TAG: &str = r#"<script src="/__modserve__/reload.js"></script>"#;

/// Development HTTP server.
pub struct DevServer {
    state: SharedState,
}

impl DevServer {
    /// Create a new server over shared state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Start the server and block until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind to the configured
    /// address.
    pub async fn start(self) -> Result<()> {
        let addr = self.state.config.addr;
        let server_url = self.state.config.server_url();

        let app = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        crate::ui::success(&format!("Serving at {}", server_url));

        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Build the axum router with all routes.
    fn build_router(self) -> Router {
        Router::new()
            .route(EVENTS_PATH, get(handle_events))
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback(handle_request)
            .layer(
                // CORS: allow all origins for dev
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state)
    }
}

/// Reload event stream tied to its registry entry.
///
/// Axum drops the stream when the SSE connection closes, and the drop
/// removes the subscription right away instead of leaving it in the
/// registry until some later broadcast fails to send.
struct SubscriberStream {
    inner: ReceiverStream<String>,
    state: SharedState,
    id: usize,
}

impl Stream for SubscriberStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        tracing::debug!("Reload subscriber {} disconnected", self.id);
        self.state.unregister_client(self.id);
    }
}

/// Handle SSE connections for reload events.
async fn handle_events(
    State(state): State<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<axum::response::sse::Event, Infallible>>>
{
    use axum::response::sse::Event;

    let (id, rx) = state.register_client();
    tracing::debug!("Reload subscriber {} connected", id);

    let stream = SubscriberStream {
        inner: ReceiverStream::new(rx),
        state,
        id,
    }
    .map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Serve the reload client script.
async fn handle_reload_script() -> impl IntoResponse {
    const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/javascript")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(RELOAD_SCRIPT))
        .unwrap()
}

/// Handle all other requests by serving from the root directory.
async fn handle_request(
    State(state): State<SharedState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    respond(&state, uri.path(), &headers).await
}

/// The full request pipeline: resolve, SPA-fallback, conditional check,
/// rewrite, inject, respond.
///
/// Every error is scoped to this one request; nothing here can take the
/// server down.
pub async fn respond(state: &ServerState, request_path: &str, headers: &HeaderMap) -> Response {
    match resolve_file(&state.config.root, request_path) {
        Ok(file) => serve_resolved(state, request_path, &file, headers).await,
        Err(ServeError::NotFound(_)) => {
            // Fallback substitution happens at most once: a missing
            // fallback document surfaces the original NotFound.
            if let Some(ref app_index) = state.config.app_index {
                if is_navigation_request(request_path, headers) {
                    let fallback = state.config.root.join(app_index);
                    if fallback.is_file() {
                        tracing::debug!(
                            "SPA fallback: {} -> {}",
                            request_path,
                            app_index.display()
                        );
                        let url = format!("/{}", app_index.to_string_lossy().replace('\\', "/"));
                        return serve_resolved(state, &url, &fallback, headers).await;
                    }
                }
            }
            not_found(request_path)
        }
        Err(ServeError::PathEscapesRoot(path)) => {
            tracing::warn!("Rejected path traversal attempt: {}", path);
            status_response(StatusCode::FORBIDDEN, "Forbidden")
        }
        Err(ServeError::Io(e)) => {
            tracing::error!("I/O error for {}: {}", request_path, e);
            status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Serve a resolved file: conditional short-circuit, then read, rewrite
/// (JS modules), inject (HTML), and send with a fresh validator.
async fn serve_resolved(
    state: &ServerState,
    url_path: &str,
    file: &Path,
    headers: &HeaderMap,
) -> Response {
    let meta = match tokio::fs::metadata(file).await {
        Ok(meta) => meta,
        Err(_) => return not_found(url_path),
    };

    let validator = file_validator(&meta);
    if not_modified(headers, &validator) {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, &validator)
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::empty())
            .unwrap();
    }

    let bytes = match tokio::fs::read(file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", file.display(), e);
            return status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let content_type = content_type_for(file);

    let bytes = if state.config.rewrite && is_js_module(file) {
        match String::from_utf8(bytes) {
            Ok(source) => {
                let outcome = modserve_resolve::rewrite_module(
                    &source,
                    url_path,
                    &state.config.root,
                    &state.resolutions,
                );
                // Unresolved specifiers are a diagnostic, not a request
                // failure: the module is served as-is for those spans.
                for diagnostic in &outcome.diagnostics {
                    tracing::warn!("{}", diagnostic);
                }
                outcome.source.into_bytes()
            }
            Err(e) => e.into_bytes(),
        }
    } else {
        bytes
    };

    let bytes = if state.config.watch && content_type.starts_with("text/html") {
        inject_reload_script(&bytes)
    } else {
        bytes
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &validator)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(bytes))
        .unwrap()
}

/// Inject the reload client script before the closing </body> tag,
/// appending at the end when no such tag exists.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + RELOAD_SCRIPT_TAG.len() + 10);
        result.push_str(&html[..pos]);
        result.push_str("\n  ");
        result.push_str(RELOAD_SCRIPT_TAG);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(RELOAD_SCRIPT_TAG);
    result.into_bytes()
}

fn not_found(request_path: &str) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(format!("File not found: {}", request_path)))
        .unwrap()
}

fn status_response(status: StatusCode, message: &'static str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(message))
        .unwrap()
}
