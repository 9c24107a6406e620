//! Offset-preserving rewriting of bare specifiers.
//!
//! The rewrite pass splices replacement URLs into the source at the
//! spans the scanner reported. Every byte outside a replaced specifier
//! is copied through verbatim, so line numbers and source maps for the
//! untouched regions stay meaningful.

use std::path::Path;

use crate::cache::ResolutionCache;
use crate::error::ResolveError;
use crate::scan::ModuleRecord;

/// Result of a rewrite pass over one module.
#[derive(Debug)]
pub struct RewriteOutcome {
    /// The (possibly unchanged) module source
    pub source: String,
    /// Number of specifiers rewritten
    pub rewritten: usize,
    /// Per-specifier failures; the module is still served with the
    /// offending specifiers intact
    pub diagnostics: Vec<ResolveError>,
}

/// Whether a specifier is bare (a package reference).
///
/// Relative (`./`, `../`), root-absolute (`/`), and scheme-prefixed
/// (`https:`, `data:`, ...) specifiers are not bare.
pub fn is_bare(specifier: &str) -> bool {
    if specifier.is_empty() || specifier.starts_with('.') || specifier.starts_with('/') {
        return false;
    }
    !has_scheme(specifier)
}

/// Detect a URL scheme prefix: an ASCII letter followed by letters,
/// digits, `+`, `-`, or `.`, terminated by `:` before any `/`.
fn has_scheme(specifier: &str) -> bool {
    let bytes = specifier.as_bytes();
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    for &b in &bytes[1..] {
        match b {
            b':' => return true,
            b if b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.' => continue,
            _ => return false,
        }
    }
    false
}

/// Rewrite every resolvable bare specifier in a served JavaScript module.
///
/// # Arguments
///
/// * `source` - the module source text
/// * `module_url_path` - the module's URL path as served (e.g. `/src/app.js`)
/// * `root` - the canonical serving root on disk
/// * `cache` - shared resolution cache
///
/// Unresolvable specifiers are reported in the outcome's diagnostics and
/// left byte-for-byte intact. A module with no bare specifiers comes back
/// unchanged.
pub fn rewrite_module(
    source: &str,
    module_url_path: &str,
    root: &Path,
    cache: &ResolutionCache,
) -> RewriteOutcome {
    let record = ModuleRecord::scan(source);

    let bare: Vec<_> = record
        .imports
        .iter()
        .filter(|span| is_bare(&span.specifier))
        .collect();

    if bare.is_empty() {
        return RewriteOutcome {
            source: source.to_string(),
            rewritten: 0,
            diagnostics: Vec::new(),
        };
    }

    let from_dir = match Path::new(module_url_path.trim_start_matches('/')).parent() {
        Some(parent) => root.join(parent),
        None => root.to_path_buf(),
    };

    let mut out = String::with_capacity(source.len() + 64);
    let mut diagnostics = Vec::new();
    let mut rewritten = 0;
    let mut last = 0;

    for span in bare {
        let replacement = cache
            .resolve(&span.specifier, &from_dir, root)
            .and_then(|resolved| {
                url_path_within(root, &resolved).ok_or_else(|| {
                    ResolveError::SpecifierUnresolved {
                        specifier: span.specifier.clone(),
                        importer: from_dir.clone(),
                    }
                })
            });

        match replacement {
            Ok(target_url) => {
                out.push_str(&source[last..span.start]);
                out.push_str(&relative_url(module_url_path, &target_url));
                last = span.end;
                rewritten += 1;
            }
            Err(e) => diagnostics.push(e),
        }
    }
    out.push_str(&source[last..]);

    RewriteOutcome {
        source: out,
        rewritten,
        diagnostics,
    }
}

/// Express an absolute file path as a root-relative URL path, or None
/// if the file is not a descendant of the root.
fn url_path_within(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut url = String::new();
    for component in relative.components() {
        url.push('/');
        url.push_str(component.as_os_str().to_str()?);
    }
    Some(url)
}

/// Compute `to` relative to the directory of `from`, both URL paths.
///
/// The result always starts with `./` or `../` so the browser treats it
/// as a relative module specifier.
pub fn relative_url(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut segments: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop(); // drop the file name
        segments
    };
    let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(to_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from_dir.len() - common;
    let mut result = String::new();
    if ups == 0 {
        result.push_str("./");
    } else {
        for _ in 0..ups {
            result.push_str("../");
        }
    }
    result.push_str(&to_segments[common..].join("/"));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install_package(root: &Path, name: &str, descriptor: &str, entry: &str) {
        let package_dir = root.join("node_modules").join(name);
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(package_dir.join("package.json"), descriptor).unwrap();
        std::fs::write(package_dir.join(entry), "export default 1;").unwrap();
    }

    #[test]
    fn test_is_bare() {
        assert!(is_bare("foo"));
        assert!(is_bare("@scope/pkg"));
        assert!(is_bare("foo/lib/util.js"));
        assert!(!is_bare("./local.js"));
        assert!(!is_bare("../up.js"));
        assert!(!is_bare("/absolute.js"));
        assert!(!is_bare("https://cdn.example.com/x.js"));
        assert!(!is_bare("data:text/javascript,export{}"));
        assert!(!is_bare(""));
    }

    #[test]
    fn test_relative_url_sibling_tree() {
        assert_eq!(
            relative_url("/src/app.js", "/node_modules/foo/index.js"),
            "../node_modules/foo/index.js"
        );
    }

    #[test]
    fn test_relative_url_from_root() {
        assert_eq!(
            relative_url("/app.js", "/node_modules/foo/index.js"),
            "./node_modules/foo/index.js"
        );
    }

    #[test]
    fn test_relative_url_shared_prefix() {
        assert_eq!(relative_url("/src/a/b.js", "/src/c/d.js"), "../c/d.js");
        assert_eq!(relative_url("/src/a.js", "/src/b.js"), "./b.js");
    }

    #[test]
    fn test_rewrite_module_resolves_bare_specifier() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        install_package(root, "foo", r#"{ "main": "index.js" }"#, "index.js");

        let cache = ResolutionCache::new();
        let outcome = rewrite_module(
            "import {x} from 'foo'",
            "/src/app.js",
            root,
            &cache,
        );

        assert_eq!(outcome.rewritten, 1);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            outcome.source,
            "import {x} from '../node_modules/foo/index.js'"
        );
    }

    #[test]
    fn test_rewrite_module_untouched_regions_preserved() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        install_package(root, "foo", r#"{ "main": "index.js" }"#, "index.js");

        let source = "const a = 1;\nimport 'foo';\nconst b = 2; // trailing\n";
        let cache = ResolutionCache::new();
        let outcome = rewrite_module(source, "/app.js", root, &cache);

        assert!(outcome.source.starts_with("const a = 1;\nimport '"));
        assert!(outcome.source.ends_with("';\nconst b = 2; // trailing\n"));
    }

    #[test]
    fn test_rewrite_module_idempotent_on_relative_specifiers() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let source = "import {x} from './node_modules/foo/index.js';\nimport y from '../up.js';";
        let cache = ResolutionCache::new();
        let outcome = rewrite_module(source, "/src/app.js", root, &cache);

        assert_eq!(outcome.source, source);
        assert_eq!(outcome.rewritten, 0);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_rewrite_module_unresolved_left_intact() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let source = "import missing from 'ghost';";
        let cache = ResolutionCache::new();
        let outcome = rewrite_module(source, "/app.js", root, &cache);

        assert_eq!(outcome.source, source);
        assert_eq!(outcome.rewritten, 0);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_rewrite_module_mixed_resolved_and_unresolved() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        install_package(root, "foo", r#"{ "main": "index.js" }"#, "index.js");

        let source = "import a from 'foo';\nimport b from 'ghost';";
        let cache = ResolutionCache::new();
        let outcome = rewrite_module(source, "/app.js", root, &cache);

        assert_eq!(outcome.rewritten, 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.source.contains("./node_modules/foo/index.js"));
        assert!(outcome.source.contains("'ghost'"));
    }

    #[test]
    fn test_rewrite_module_browser_field_redirection() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        install_package(
            root,
            "foo",
            r#"{ "main": "index.js", "browser": { "./index.js": "./index.browser.js" } }"#,
            "index.browser.js",
        );

        let cache = ResolutionCache::new();
        let outcome = rewrite_module("import 'foo';", "/app.js", root, &cache);

        assert_eq!(
            outcome.source,
            "import './node_modules/foo/index.browser.js';"
        );
    }

    #[test]
    fn test_rewrite_module_dynamic_import() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        install_package(root, "foo", r#"{ "main": "index.js" }"#, "index.js");

        let cache = ResolutionCache::new();
        let outcome = rewrite_module(
            "const m = await import(\"foo\");",
            "/src/app.js",
            root,
            &cache,
        );

        assert_eq!(
            outcome.source,
            "const m = await import(\"../node_modules/foo/index.js\");"
        );
    }
}
