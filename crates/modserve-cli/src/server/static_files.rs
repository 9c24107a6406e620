//! Static file resolution and the conditional-cache layer.
//!
//! Path normalization percent-decodes each segment, then runs purely
//! lexically before any filesystem access, so a traversal attempt
//! (encoded or not) is rejected without ever touching disk. The cache
//! validator is an ETag derived from the file's modification time
//! (second precision) and size, compared for exact equality against
//! `If-None-Match`.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use axum::http::{header, HeaderMap};
use percent_encoding::percent_decode_str;

use crate::error::ServeError;

/// Normalize a request path into root-relative segments.
///
/// Each segment is percent-decoded first, so `/my%20file.js` reaches
/// the file named `my file.js`. Empty and `.` segments collapse; `..`
/// (encoded or literal) pops the previous segment.
///
/// # Errors
///
/// Returns `PathEscapesRoot` when `..` pops past the root or a decoded
/// segment carries a path separator, and `NotFound` when a segment
/// does not decode to UTF-8. No filesystem access happens here.
pub fn normalize_path(request_path: &str) -> Result<Vec<String>, ServeError> {
    let mut segments: Vec<String> = Vec::new();
    for raw in request_path.split('/') {
        let segment = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| ServeError::NotFound(request_path.to_string()))?;
        match segment.as_ref() {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ServeError::PathEscapesRoot(request_path.to_string()));
                }
            }
            other => {
                // A decoded slash (or a backslash on Windows
                // filesystems) could smuggle extra separators past the
                // segment checks.
                if other.contains('/') || other.contains('\\') || other.contains('\0') {
                    return Err(ServeError::PathEscapesRoot(request_path.to_string()));
                }
                segments.push(other.to_string());
            }
        }
    }
    Ok(segments)
}

/// Resolve a request path to a file under the root.
///
/// Directory hits fall back to an `index.html` inside the directory.
///
/// # Errors
///
/// `PathEscapesRoot` from normalization, `NotFound` when nothing exists
/// at the resolved path.
pub fn resolve_file(root: &Path, request_path: &str) -> Result<PathBuf, ServeError> {
    let segments = normalize_path(request_path)?;
    let mut path = root.to_path_buf();
    for segment in &segments {
        path.push(segment);
    }

    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(meta) if meta.is_dir() => {
            let index = path.join("index.html");
            if index.is_file() {
                Ok(index)
            } else {
                Err(ServeError::NotFound(request_path.to_string()))
            }
        }
        _ => Err(ServeError::NotFound(request_path.to_string())),
    }
}

/// Compute the cache validator for a file.
///
/// Modification time truncated to seconds plus the byte length,
/// formatted as a quoted ETag.
pub fn file_validator(meta: &Metadata) -> String {
    let seconds = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("\"{}-{}\"", seconds, meta.len())
}

/// Whether the request's validator matches and a 304 short-circuit
/// applies. Exact string equality only.
pub fn not_modified(headers: &HeaderMap, validator: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == validator)
        .unwrap_or(false)
}

/// Whether a request looks like a page navigation rather than a
/// subresource fetch: an explicit `Accept: text/html` hint, or a path
/// with no file extension.
pub fn is_navigation_request(request_path: &str, headers: &HeaderMap) -> bool {
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
        if accept.contains("text/html") {
            return true;
        }
        if accept != "*/*" {
            return false;
        }
    }

    match request_path.rsplit('/').next() {
        Some(last) => !last.contains('.'),
        None => true,
    }
}

/// Determine content type from file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Whether a served path is a JavaScript module eligible for rewriting.
pub fn is_js_module(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js") | Some("mjs")
    )
}
