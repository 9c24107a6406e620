//! Integration tests for the server pipeline.
//!
//! Exercises the request pipeline (resolve, SPA fallback, conditional
//! cache, rewrite, injection) directly against temp-dir project
//! fixtures, plus the watcher end to end.

use std::path::Path;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use clap::Parser;
use modserve_cli::cli::Cli;
use modserve_cli::server::{respond, FileWatcher, ServerConfig, ServerState, SharedState};
use tempfile::TempDir;
use tokio::time::{timeout, Duration};

fn make_state(root: &Path, extra_args: &[&str]) -> SharedState {
    let mut args = vec!["modserve", root.to_str().unwrap(), "--port", "0"];
    args.extend_from_slice(extra_args);
    let cli = Cli::parse_from(args);
    let config = ServerConfig::from_args(&cli).unwrap();
    config.validate().unwrap();
    Arc::new(ServerState::new(config))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let state = make_state(temp.path(), &[]);

    let response = respond(&state, "/../../etc/passwd", &HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let temp = TempDir::new().unwrap();
    let state = make_state(temp.path(), &[]);

    let response = respond(&state, "/missing.js", &HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_percent_encoded_path_reaches_file() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "my notes.html", "<html><body>notes</body></html>");

    let state = make_state(root, &[]);
    let response = respond(&state, "/my%20notes.html", &HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("notes"));
}

#[tokio::test]
async fn test_encoded_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let state = make_state(temp.path(), &[]);

    let response = respond(&state, "/%2e%2e/%2e%2e/etc/passwd", &HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bare_specifier_rewritten_to_package_entry() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "src/app.js", "import {x} from 'foo'");
    write(
        root,
        "node_modules/foo/package.json",
        r#"{ "main": "index.js" }"#,
    );
    write(root, "node_modules/foo/index.js", "export const x = 1;");

    let state = make_state(root, &[]);
    let response = respond(&state, "/src/app.js", &HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
    assert_eq!(
        body_string(response).await,
        "import {x} from '../node_modules/foo/index.js'"
    );
}

#[tokio::test]
async fn test_relative_imports_served_unchanged() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = "import {x} from '../node_modules/foo/index.js';\nimport './local.js';\n";
    write(root, "src/app.js", source);

    let state = make_state(root, &[]);
    let response = respond(&state, "/src/app.js", &HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, source);
}

#[tokio::test]
async fn test_unresolved_specifier_still_served() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "app.js", "import missing from 'ghost';");

    let state = make_state(root, &[]);
    let response = respond(&state, "/app.js", &HeaderMap::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("'ghost'"));
}

#[tokio::test]
async fn test_no_rewrite_flag_serves_verbatim() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "app.js", "import {x} from 'foo'");
    write(
        root,
        "node_modules/foo/package.json",
        r#"{ "main": "index.js" }"#,
    );
    write(root, "node_modules/foo/index.js", "export const x = 1;");

    let state = make_state(root, &["--no-rewrite"]);
    let response = respond(&state, "/app.js", &HeaderMap::new()).await;

    assert_eq!(body_string(response).await, "import {x} from 'foo'");
}

#[tokio::test]
async fn test_conditional_request_round_trip() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "styles.css", "body { margin: 0; }");

    let state = make_state(root, &[]);

    let first = respond(&state, "/styles.css", &HeaderMap::new()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let validator = first
        .headers()
        .get(header::ETAG)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::IF_NONE_MATCH,
        HeaderValue::from_str(&validator).unwrap(),
    );
    let second = respond(&state, "/styles.css", &headers).await;
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert!(body_string(second).await.is_empty());

    // A modification (with a different length, so the validator changes
    // even within the same second) yields a fresh 200.
    write(root, "styles.css", "body { margin: 0; padding: 0; }");
    let third = respond(&state, "/styles.css", &headers).await;
    assert_eq!(third.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_spa_fallback_for_navigation_only() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "index.html", "<html><body><h1>app</h1></body></html>");

    let state = make_state(root, &["--app-index", "index.html"]);

    // Navigation-typed: no extension, no Accept hint
    let response = respond(&state, "/dashboard/settings", &HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("<h1>app</h1>"));

    // Subresource-typed: has an extension
    let response = respond(&state, "/dashboard/settings.png", &HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_html_gets_reload_script_injected() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "index.html", "<html><body><h1>hi</h1></body></html>");

    let state = make_state(root, &[]);
    let response = respond(&state, "/index.html", &HeaderMap::new()).await;

    let body = body_string(response).await;
    assert!(body.contains("/__modserve__/reload.js"));

    // Watch disabled: no injection
    let state = make_state(root, &["--no-watch"]);
    let response = respond(&state, "/index.html", &HeaderMap::new()).await;
    assert!(!body_string(response).await.contains("/__modserve__/reload.js"));
}

#[tokio::test]
async fn test_watcher_emits_change_event() {
    let temp = TempDir::new().unwrap();
    // Canonicalize so notify-reported paths pass the containment filter
    let root = temp.path().canonicalize().unwrap();

    let (_watcher, mut rx) = FileWatcher::new(root.clone(), vec![], 0).unwrap();

    // Give the watcher a moment to arm before producing the change
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(root.join("app.js"), "export {}").unwrap();

    let change = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no change event within timeout")
        .expect("watcher channel closed");
    assert!(change.path().ends_with("app.js"));
}
