//! Package descriptor loading and the bare-specifier resolution walk.
//!
//! Implements the subset of Node.js module resolution a browser dev
//! server needs: walk the importing file's ancestor directories for
//! `node_modules/<package>`, read the package descriptor, and pick the
//! declared entry file. The `browser` field is honored one level deep
//! (string form overrides `main`, map form redirects the chosen entry).

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ResolveError, Result};

/// Extensions tried when an entry or subpath has no exact file match.
pub const EXTENSIONS: &[&str] = &["js", "mjs", "json"];

/// The `browser` field of a package descriptor.
///
/// Either a replacement entry point (string form) or a one-level
/// redirection map from `./`-relative paths to their browser variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BrowserField {
    /// `"browser": "./browser.js"` - replaces the main entry
    Entry(String),
    /// `"browser": { "./index.js": "./index.browser.js" }` - redirects
    /// individual files (non-string values, e.g. `false`, are ignored)
    Map(HashMap<String, serde_json::Value>),
}

/// Parsed package.json descriptor.
///
/// Only the fields relevant to entry-file selection are kept; everything
/// else in the descriptor is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageDescriptor {
    /// Declared package name
    pub name: Option<String>,
    /// Declared entry file, relative to the package root
    pub main: Option<String>,
    /// Browser-specific entry override or redirection map
    pub browser: Option<BrowserField>,
}

impl PackageDescriptor {
    /// Load the descriptor from `<dir>/package.json`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the directory has no package.json.
    ///
    /// # Errors
    ///
    /// Returns `DescriptorInvalid` for unparseable JSON and `Io` for
    /// other read failures.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join("package.json");
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let descriptor =
            serde_json::from_str(&contents).map_err(|source| ResolveError::DescriptorInvalid {
                path,
                source,
            })?;

        Ok(Some(descriptor))
    }

    /// Select the entry file, relative to the package root.
    ///
    /// Order: `browser` string form, then `main`, then `index.js`.
    /// When `browser` is a map, the chosen entry (expressed as
    /// `./<path>`) is looked up exactly once and replaced if the mapped
    /// value is a string.
    pub fn entry_relative(&self) -> String {
        let mut entry = match &self.browser {
            Some(BrowserField::Entry(entry)) => entry.clone(),
            _ => self.main.clone().unwrap_or_else(|| "index.js".to_string()),
        };

        if let Some(BrowserField::Map(map)) = &self.browser {
            let key = if entry.starts_with("./") {
                entry.clone()
            } else {
                format!("./{entry}")
            };
            if let Some(serde_json::Value::String(redirected)) = map.get(&key) {
                entry = redirected.clone();
            }
        }

        entry.trim_start_matches("./").to_string()
    }
}

/// Split a bare specifier into package name and optional subpath.
///
/// Scoped packages keep both segments in the name:
/// `@scope/pkg/lib/util.js` splits into `@scope/pkg` + `lib/util.js`.
pub fn split_specifier(specifier: &str) -> (&str, Option<&str>) {
    let boundary = if specifier.starts_with('@') {
        // Scoped: the name spans the first two segments
        specifier
            .find('/')
            .and_then(|first| specifier[first + 1..].find('/').map(|second| first + 1 + second))
    } else {
        specifier.find('/')
    };

    match boundary {
        Some(idx) => (&specifier[..idx], Some(&specifier[idx + 1..])),
        None => (specifier, None),
    }
}

/// Resolve a bare specifier by walking ancestor node_modules directories.
///
/// The walk starts at `from_dir` (the importing module's directory) and
/// climbs toward `root`, inclusive. Each visited directory is
/// canonicalized and tracked so symlink cycles cannot loop the walk.
///
/// # Errors
///
/// Returns `SpecifierUnresolved` when no ancestor holds a matching
/// package with a resolvable entry file.
pub fn resolve_bare(specifier: &str, from_dir: &Path, root: &Path) -> Result<PathBuf> {
    let (name, subpath) = split_specifier(specifier);
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut dir = from_dir.to_path_buf();

    loop {
        // Symlink-cycle guard: canonicalize best-effort, fall back to
        // the lexical path for directories that cannot be resolved.
        let canonical = std::fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if !visited.insert(canonical) {
            break;
        }

        let package_dir = dir.join("node_modules").join(name);
        if package_dir.is_dir() {
            if let Some(resolved) = resolve_in_package(&package_dir, subpath)? {
                return Ok(resolved);
            }
        }

        if dir == root || !dir.starts_with(root) {
            break;
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }

    Err(ResolveError::SpecifierUnresolved {
        specifier: specifier.to_string(),
        importer: from_dir.to_path_buf(),
    })
}

/// Resolve the target file inside a located package directory.
///
/// With a subpath the descriptor is bypassed and the subpath is joined
/// to the package root; otherwise the descriptor's entry is used.
/// Extension and index-file fallbacks apply in both cases.
fn resolve_in_package(package_dir: &Path, subpath: Option<&str>) -> Result<Option<PathBuf>> {
    let relative = match subpath {
        Some(sub) => sub.to_string(),
        None => match PackageDescriptor::load(package_dir)? {
            Some(descriptor) => descriptor.entry_relative(),
            None => "index.js".to_string(),
        },
    };

    Ok(resolve_file_like(&package_dir.join(relative)))
}

/// Try a candidate path as a file, then with known extensions, then as
/// a directory containing an index file.
fn resolve_file_like(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }

    for ext in EXTENSIONS {
        let with_ext = PathBuf::from(format!("{}.{ext}", candidate.display()));
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }

    if candidate.is_dir() {
        for ext in EXTENSIONS {
            let index = candidate.join(format!("index.{ext}"));
            if index.is_file() {
                return Some(index);
            }
        }
    }

    None
}
